//! lattice-ecs - sparse-set entity/component storage engine.
//!
//! A miniature columnar database for in-process use: rows are entities,
//! columns are component types, and cached *groups* are incrementally
//! maintained views over conjunctions of component types.
//!
//! # Key Concepts
//!
//! - **Entity**: a versioned index identifying one logical row
//! - **Component**: a typed value attached to at most one entity, stored
//!   column-wise in lazily allocated chunks
//! - **Group**: the cached set of entities owning a fixed conjunction of
//!   component types, built once and kept current on every mutation
//! - **View**: a cursor over one group plus the columns of its types
//!
//! # Example
//!
//! ```
//! use lattice_ecs::World;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Position { x: f32, y: f32 }
//! #[derive(Debug, Clone, PartialEq)]
//! struct Velocity { x: f32, y: f32 }
//!
//! let mut world = World::new();
//! let entity = world.create_with((Position { x: 0.0, y: 0.0 }, Velocity { x: 1.0, y: 2.0 })).unwrap();
//!
//! let mut moving = world.view_mut::<(Position, Velocity)>();
//! moving.for_each(|_, (position, velocity)| {
//!     position.x += velocity.x;
//!     position.y += velocity.y;
//! });
//! drop(moving);
//!
//! assert_eq!(world.get::<(Position,)>(entity).0, &Position { x: 1.0, y: 2.0 });
//! ```

mod component;
mod entity;
mod error;
mod group;
mod mask;
mod sparse;
mod storage;
mod view;
mod world;

pub use component::{Component, ComponentRegistry, TypePosition};
pub use entity::{Entity, EntityIndex, Version};
pub use error::{WorldError, WorldResult};
pub use mask::BitMask;
pub use sparse::SparseSet;
pub use storage::ChunkedColumn;
pub use view::{ComponentSet, ComponentSetMut, View, ViewMut};
pub use world::{Bundle, CloneBundle, World};

#[doc(hidden)]
pub use storage::AnyColumn;
#[doc(hidden)]
pub use view::PositionList;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Component, Entity, View, ViewMut, World, WorldError, WorldResult};
}
