//! Read and write cursors over cached entity groups.
//!
//! A view bundles one group's member set with direct references to the
//! columns of its requested component types. Views are created by
//! [`World::view`] / [`World::view_mut`] and borrow the world: structural
//! mutation requires dropping the view first, while the underlying group
//! persists and stays synchronized, so re-acquiring a view afterwards is
//! O(1) and observes live state.
//!
//! Component sets are written as tuples, one-tuples included:
//! `world.view::<(Position,)>()`, `world.view::<(Position, Velocity)>()`.

use smallvec::SmallVec;

use crate::{
    component::{Component, ComponentRegistry, TypePosition},
    entity::Entity,
    sparse::SparseSet,
    storage::{AnyColumn, ChunkedColumn},
    world::World,
};

/// Resolved positions of a requested component tuple.
#[doc(hidden)]
pub type PositionList = SmallVec<[TypePosition; 8]>;

pub(crate) const LIVENESS_MSG: &str = "presence bit set without a constructed value";

/// A tuple of component types that can be resolved against a world for
/// shared access.
///
/// Implemented for tuples of up to eight distinct component types.
/// Requesting the same type twice is a contract violation and panics.
pub trait ComponentSet: 'static {
    /// Shared column references, one per requested type.
    type Columns<'w>;
    /// Shared component references in requested order.
    type Refs<'w>;

    #[doc(hidden)]
    fn register(world: &mut World) -> PositionList;

    #[doc(hidden)]
    fn lookup(registry: &ComponentRegistry) -> Option<PositionList>;

    #[doc(hidden)]
    fn columns<'w>(world: &'w World, positions: &PositionList) -> Self::Columns<'w>;

    #[doc(hidden)]
    fn fetch<'w>(columns: &Self::Columns<'w>, index: u32) -> Self::Refs<'w>;
}

/// A tuple of component types that can be resolved for exclusive access.
pub trait ComponentSetMut: ComponentSet {
    /// Exclusive column references, one per requested type.
    type ColumnsMut<'w>;
    /// Exclusive component references in requested order.
    type RefsMut<'a>;

    #[doc(hidden)]
    fn columns_mut<'w>(
        columns: &'w mut [Box<dyn AnyColumn>],
        positions: &PositionList,
    ) -> Self::ColumnsMut<'w>;

    #[doc(hidden)]
    fn fetch_mut<'a, 'w>(columns: &'a mut Self::ColumnsMut<'w>, index: u32) -> Self::RefsMut<'a>;
}

/// Panic if a requested tuple names the same type twice.
pub(crate) fn assert_unique(positions: &[TypePosition]) {
    for (i, a) in positions.iter().enumerate() {
        for b in &positions[i + 1..] {
            assert!(a != b, "duplicate component type in request");
        }
    }
}

macro_rules! impl_component_set {
    ($(($name:ident, $idx:tt)),+) => {
        impl<$($name: Component),+> ComponentSet for ($($name,)+) {
            type Columns<'w> = ($(&'w ChunkedColumn<$name>,)+);
            type Refs<'w> = ($(&'w $name,)+);

            fn register(world: &mut World) -> PositionList {
                let positions: PositionList =
                    smallvec::smallvec![$(world.accommodate::<$name>()),+];
                assert_unique(&positions);
                positions
            }

            fn lookup(registry: &ComponentRegistry) -> Option<PositionList> {
                let positions: PositionList =
                    smallvec::smallvec![$(registry.lookup::<$name>()?),+];
                assert_unique(&positions);
                Some(positions)
            }

            fn columns<'w>(world: &'w World, positions: &PositionList) -> Self::Columns<'w> {
                ($(world.typed_column::<$name>(positions[$idx]),)+)
            }

            fn fetch<'w>(columns: &Self::Columns<'w>, index: u32) -> Self::Refs<'w> {
                ($({
                    let column: &'w ChunkedColumn<$name> = columns.$idx;
                    column.get(index).expect(LIVENESS_MSG)
                },)+)
            }
        }

        impl<$($name: Component),+> ComponentSetMut for ($($name,)+) {
            type ColumnsMut<'w> = ($(&'w mut ChunkedColumn<$name>,)+);
            type RefsMut<'a> = ($(&'a mut $name,)+);

            fn columns_mut<'w>(
                columns: &'w mut [Box<dyn AnyColumn>],
                positions: &PositionList,
            ) -> Self::ColumnsMut<'w> {
                // Split the column table into disjoint exclusive borrows;
                // positions are distinct, so each entry is taken once.
                let mut split: rustc_hash::FxHashMap<usize, &'w mut Box<dyn AnyColumn>> = columns
                    .iter_mut()
                    .enumerate()
                    .filter(|(index, _)| positions.iter().any(|p| p.index() == *index))
                    .collect();
                ($(
                    split
                        .remove(&positions[$idx].index())
                        .expect("requested column missing from storage")
                        .as_any_mut()
                        .downcast_mut::<ChunkedColumn<$name>>()
                        .expect("column type does not match its registered position"),
                )+)
            }

            fn fetch_mut<'a, 'w>(
                columns: &'a mut Self::ColumnsMut<'w>,
                index: u32,
            ) -> Self::RefsMut<'a> {
                ($(columns.$idx.get_mut(index).expect(LIVENESS_MSG),)+)
            }
        }
    };
}

impl_component_set!((A, 0));
impl_component_set!((A, 0), (B, 1));
impl_component_set!((A, 0), (B, 1), (C, 2));
impl_component_set!((A, 0), (B, 1), (C, 2), (D, 3));
impl_component_set!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4));
impl_component_set!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5));
impl_component_set!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6));
impl_component_set!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6), (H, 7));

/// Read cursor over the entities owning every type in `S`.
pub struct View<'w, S: ComponentSet> {
    entities: &'w SparseSet,
    columns: S::Columns<'w>,
}

impl<'w, S: ComponentSet> View<'w, S> {
    pub(crate) fn new(entities: &'w SparseSet, columns: S::Columns<'w>) -> Self {
        Self { entities, columns }
    }

    /// Iterate the viewed entities in the group's dense order (insertion
    /// order). The iterator is double-ended; `.rev()` yields the exact
    /// mirror of forward order.
    pub fn iter(&self) -> std::iter::Copied<std::slice::Iter<'w, Entity>> {
        self.entities.as_slice().iter().copied()
    }

    /// The viewed entities as a slice, for callers that partition the
    /// iteration themselves.
    #[must_use]
    pub fn entities(&self) -> &'w [Entity] {
        self.entities.as_slice()
    }

    /// Check if an entity is part of this view.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.contains(entity)
    }

    /// Number of viewed entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if no entities match the view.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Get an entity's components, as references in requested order.
    ///
    /// # Panics
    ///
    /// Panics if the entity is not part of this view.
    #[must_use]
    pub fn get(&self, entity: Entity) -> S::Refs<'w> {
        assert!(
            self.contains(entity),
            "view does not contain entity {entity:?}"
        );
        S::fetch(&self.columns, entity.index())
    }
}

impl<'w, 'a, S: ComponentSet> IntoIterator for &'a View<'w, S> {
    type Item = Entity;
    type IntoIter = std::iter::Copied<std::slice::Iter<'w, Entity>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Write cursor over the entities owning every type in `S`.
///
/// Only component *values* can be mutated through a view; presence is
/// structural and requires the world.
pub struct ViewMut<'w, S: ComponentSetMut> {
    entities: &'w SparseSet,
    columns: S::ColumnsMut<'w>,
}

impl<'w, S: ComponentSetMut> ViewMut<'w, S> {
    pub(crate) fn new(entities: &'w SparseSet, columns: S::ColumnsMut<'w>) -> Self {
        Self { entities, columns }
    }

    /// Iterate the viewed entities in the group's dense order.
    pub fn iter(&self) -> std::iter::Copied<std::slice::Iter<'w, Entity>> {
        self.entities.as_slice().iter().copied()
    }

    /// The viewed entities as a slice.
    #[must_use]
    pub fn entities(&self) -> &'w [Entity] {
        self.entities.as_slice()
    }

    /// Check if an entity is part of this view.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.contains(entity)
    }

    /// Number of viewed entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if no entities match the view.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Get an entity's components, as exclusive references in requested
    /// order.
    ///
    /// # Panics
    ///
    /// Panics if the entity is not part of this view.
    #[must_use]
    pub fn get_mut(&mut self, entity: Entity) -> S::RefsMut<'_> {
        assert!(
            self.contains(entity),
            "view does not contain entity {entity:?}"
        );
        S::fetch_mut(&mut self.columns, entity.index())
    }

    /// Visit every viewed entity in dense order.
    pub fn for_each(&mut self, mut f: impl for<'a> FnMut(Entity, S::RefsMut<'a>)) {
        for &entity in self.entities.as_slice() {
            f(entity, S::fetch_mut(&mut self.columns, entity.index()));
        }
    }

    /// Visit every viewed entity in reverse dense order.
    pub fn for_each_rev(&mut self, mut f: impl for<'a> FnMut(Entity, S::RefsMut<'a>)) {
        for &entity in self.entities.as_slice().iter().rev() {
            f(entity, S::fetch_mut(&mut self.columns, entity.index()));
        }
    }
}

impl<'w, 'a, S: ComponentSetMut> IntoIterator for &'a ViewMut<'w, S> {
    type Item = Entity;
    type IntoIter = std::iter::Copied<std::slice::Iter<'w, Entity>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
