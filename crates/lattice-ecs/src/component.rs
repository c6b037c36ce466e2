//! Component type registration.
//!
//! Every distinct component type used with a world receives a stable,
//! densely-assigned position on first reference. Positions index the
//! world's presence rows and column stores, and serve as bit positions in
//! group filters. The registry is owned by its world; two worlds assign
//! positions independently.

use std::{any::TypeId, fmt};

use rustc_hash::FxHashMap;

/// Marker trait for types that can be attached to entities as components.
pub trait Component: Send + Sync + 'static {}

// Blanket implementation for all suitable types
impl<T: Send + Sync + 'static> Component for T {}

/// Stable position of a component type within one world.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypePosition(u32);

impl TypePosition {
    /// Create a position from a raw value.
    #[must_use]
    pub const fn from_raw(position: u32) -> Self {
        Self(position)
    }

    /// Get the raw position value.
    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self.0
    }

    /// Get the position as a collection index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for TypePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypePosition({})", self.0)
    }
}

/// Registry mapping component types to their positions.
///
/// Positions are assigned in discovery order (first assignment, storage
/// reservation, or view creation) and are never reclaimed for the lifetime
/// of the owning world.
#[derive(Default)]
pub struct ComponentRegistry {
    /// Map from Rust type to its position.
    positions: FxHashMap<TypeId, TypePosition>,
    /// Type names indexed by position, for diagnostics.
    names: Vec<&'static str>,
}

impl ComponentRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component type, returning its position.
    ///
    /// Idempotent: re-registering a known type returns the existing
    /// position.
    pub fn register<T: Component>(&mut self) -> TypePosition {
        let type_id = TypeId::of::<T>();

        if let Some(&position) = self.positions.get(&type_id) {
            return position;
        }

        let position = TypePosition(self.names.len() as u32);
        self.positions.insert(type_id, position);
        self.names.push(std::any::type_name::<T>());
        position
    }

    /// Get the position for a type, if it has been registered.
    #[must_use]
    pub fn lookup<T: Component>(&self) -> Option<TypePosition> {
        self.positions.get(&TypeId::of::<T>()).copied()
    }

    /// Get the name of the type at a position.
    #[must_use]
    pub fn name(&self, position: TypePosition) -> &'static str {
        self.names[position.index()]
    }

    /// Number of registered component types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if no types have been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("count", &self.len())
            .field("types", &self.names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Position {
        _x: f32,
        _y: f32,
    }

    struct Velocity {
        _x: f32,
        _y: f32,
    }

    #[test]
    fn test_positions_assigned_densely() {
        let mut registry = ComponentRegistry::new();

        let p0 = registry.register::<Position>();
        let p1 = registry.register::<Velocity>();

        assert_eq!(p0.as_raw(), 0);
        assert_eq!(p1.as_raw(), 1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_idempotent_registration() {
        let mut registry = ComponentRegistry::new();

        let first = registry.register::<Position>();
        let second = registry.register::<Position>();

        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookup() {
        let mut registry = ComponentRegistry::new();

        assert_eq!(registry.lookup::<Position>(), None);
        let position = registry.register::<Position>();
        assert_eq!(registry.lookup::<Position>(), Some(position));
        assert_eq!(registry.lookup::<Velocity>(), None);
    }

    #[test]
    fn test_independent_registries() {
        let mut a = ComponentRegistry::new();
        let mut b = ComponentRegistry::new();

        a.register::<Position>();
        let pos_in_a = a.register::<Velocity>();
        let pos_in_b = b.register::<Velocity>();

        // Positions are per-registry, not process-wide.
        assert_eq!(pos_in_a.as_raw(), 1);
        assert_eq!(pos_in_b.as_raw(), 0);
    }
}
