//! World - the entity/component storage engine.
//!
//! The world owns the entity directory, the per-type presence rows and
//! column stores, and the group cache. It provides the primary API for
//! creating and destroying entities, assigning and removing components,
//! and acquiring views over cached groups.
//!
//! The engine is single-writer: structural operations take `&mut self`
//! and are serialized by the borrow checker. Iterating a [`View`] is a
//! shared borrow and may be partitioned across threads by the caller.

use tracing::{debug, trace};

use crate::{
    component::{Component, ComponentRegistry, TypePosition},
    entity::{Entity, EntityAllocator},
    error::{WorldError, WorldResult},
    group::GroupCache,
    mask::BitMask,
    sparse::SparseSet,
    storage::{AnyColumn, ChunkedColumn},
    view::{ComponentSet, ComponentSetMut, PositionList, View, ViewMut, LIVENESS_MSG},
};

/// A tuple of component values that can be attached to or detached from an
/// entity as one unit. Implemented for single-to-eight element tuples of
/// distinct component types.
pub trait Bundle: 'static {
    /// Assign every value in the bundle to the entity.
    fn insert(self, world: &mut World, entity: Entity);

    /// Remove every type in the bundle from the entity, returning the
    /// values.
    fn take(world: &mut World, entity: Entity) -> Self;
}

/// A bundle whose components can be copied off an existing entity.
pub trait CloneBundle: Bundle + Clone {
    /// Read the bundle's values from an entity by cloning them.
    fn read(world: &World, entity: Entity) -> Self;
}

macro_rules! impl_bundle {
    ($(($name:ident, $idx:tt)),+) => {
        impl<$($name: Component),+> Bundle for ($($name,)+) {
            fn insert(self, world: &mut World, entity: Entity) {
                $(world.assign::<$name>(entity, self.$idx);)+
            }

            fn take(world: &mut World, entity: Entity) -> Self {
                ($(world.remove_one::<$name>(entity),)+)
            }
        }

        impl<$($name: Component + Clone),+> CloneBundle for ($($name,)+) {
            fn read(world: &World, entity: Entity) -> Self {
                ($(world.get::<($name,)>(entity).0.clone(),)+)
            }
        }
    };
}

impl_bundle!((A, 0));
impl_bundle!((A, 0), (B, 1));
impl_bundle!((A, 0), (B, 1), (C, 2));
impl_bundle!((A, 0), (B, 1), (C, 2), (D, 3));
impl_bundle!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4));
impl_bundle!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5));
impl_bundle!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6));
impl_bundle!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6), (H, 7));

/// The storage engine: entities, columns, presence rows, and cached
/// groups.
pub struct World {
    /// Entity directory: versions plus the free list.
    entities: EntityAllocator,
    /// Component type registry, owned by this world.
    registry: ComponentRegistry,
    /// One presence row per registered type, indexed by position.
    presence: Vec<BitMask>,
    /// One column store per registered type, indexed by position.
    columns: Vec<Box<dyn AnyColumn>>,
    /// Cached groups keyed by filter.
    groups: GroupCache,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Create a new empty world.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: EntityAllocator::new(),
            registry: ComponentRegistry::new(),
            presence: Vec::new(),
            columns: Vec::new(),
            groups: GroupCache::new(),
        }
    }

    /// Create a world with directory capacity for `entity_capacity` slots.
    #[must_use]
    pub fn with_capacity(entity_capacity: usize) -> Self {
        Self {
            entities: EntityAllocator::with_capacity(entity_capacity),
            registry: ComponentRegistry::new(),
            presence: Vec::new(),
            columns: Vec::new(),
            groups: GroupCache::new(),
        }
    }

    // ==================== Entity Operations ====================

    /// Create a new entity with no components.
    ///
    /// Reuses the most recently destroyed index if one is available,
    /// keeping the version it was left at; otherwise appends a fresh
    /// version-0 slot.
    ///
    /// # Errors
    ///
    /// [`WorldError::IndexSpaceExhausted`] when no index is left.
    pub fn create(&mut self) -> WorldResult<Entity> {
        self.entities.allocate()
    }

    /// Create a new entity carrying the bundled component values.
    ///
    /// # Errors
    ///
    /// [`WorldError::IndexSpaceExhausted`] when no index is left.
    pub fn create_with<B: Bundle>(&mut self, bundle: B) -> WorldResult<Entity> {
        let entity = self.create()?;
        bundle.insert(self, entity);
        Ok(entity)
    }

    /// Create `n` entities with no components.
    ///
    /// # Errors
    ///
    /// [`WorldError::IndexSpaceExhausted`] when the index space runs out
    /// mid-batch; entities created so far remain alive.
    pub fn create_many(&mut self, n: usize) -> WorldResult<Vec<Entity>> {
        (0..n).map(|_| self.create()).collect()
    }

    /// Create `n` entities, each carrying a clone of the bundle.
    ///
    /// # Errors
    ///
    /// [`WorldError::IndexSpaceExhausted`] when the index space runs out
    /// mid-batch.
    pub fn create_many_with<B: Bundle + Clone>(
        &mut self,
        bundle: B,
        n: usize,
    ) -> WorldResult<Vec<Entity>> {
        (0..n).map(|_| self.create_with(bundle.clone())).collect()
    }

    /// Create a new entity as a copy of `original`, cloning the listed
    /// component types.
    ///
    /// # Panics
    ///
    /// Panics if `original` is invalid or lacks any listed component.
    ///
    /// # Errors
    ///
    /// [`WorldError::IndexSpaceExhausted`] when no index is left.
    pub fn clone_entity<B: CloneBundle>(&mut self, original: Entity) -> WorldResult<Entity> {
        assert!(
            self.valid(original),
            "clone: entity {original:?} does not belong to this world"
        );
        let values = B::read(self, original);
        let entity = self.create()?;
        values.insert(self, entity);
        Ok(entity)
    }

    /// Create `n` copies of `original`.
    ///
    /// # Errors
    ///
    /// [`WorldError::IndexSpaceExhausted`] when the index space runs out
    /// mid-batch.
    pub fn clone_many<B: CloneBundle>(
        &mut self,
        original: Entity,
        n: usize,
    ) -> WorldResult<Vec<Entity>> {
        (0..n).map(|_| self.clone_entity::<B>(original)).collect()
    }

    /// Destroy an entity: destruct all its components, leave every group,
    /// bump the slot version, and put the index up for reuse.
    ///
    /// # Panics
    ///
    /// Panics if the entity is invalid; destroying a stale identifier is a
    /// bug at the call site, not a no-op.
    ///
    /// # Errors
    ///
    /// [`WorldError::VersionExhausted`] when the slot's version counter is
    /// saturated. The world is unmodified in that case.
    pub fn destroy(&mut self, entity: Entity) -> WorldResult<()> {
        assert!(
            self.valid(entity),
            "destroy: entity {entity:?} does not belong to this world"
        );
        if entity.version().get() == u32::MAX {
            return Err(WorldError::VersionExhausted {
                index: entity.index(),
            });
        }

        self.orphan(entity);
        self.entities.recycle(entity);
        Ok(())
    }

    /// Destroy every entity in the slice.
    ///
    /// # Errors
    ///
    /// Stops at the first [`WorldError::VersionExhausted`]; earlier
    /// entities stay destroyed.
    pub fn destroy_many(&mut self, entities: &[Entity]) -> WorldResult<()> {
        for &entity in entities {
            self.destroy(entity)?;
        }
        Ok(())
    }

    /// Check if an entity identifier is current for this world.
    #[must_use]
    pub fn valid(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Check if every entity in the slice is valid.
    #[must_use]
    pub fn valid_all(&self, entities: &[Entity]) -> bool {
        entities.iter().all(|&entity| self.valid(entity))
    }

    /// Remove all components from an entity and drop it from every group,
    /// without destroying the identifier.
    ///
    /// # Panics
    ///
    /// Panics if the entity is invalid.
    pub fn orphan(&mut self, entity: Entity) {
        assert!(
            self.valid(entity),
            "orphan: entity {entity:?} does not belong to this world"
        );

        let index = entity.index();
        for (position, row) in self.presence.iter_mut().enumerate() {
            if row.test(index) {
                row.clear(index);
                self.columns[position].discard(index);
            }
        }
        self.groups.on_destroyed(entity);
    }

    /// Remove all components from every entity in the slice.
    pub fn orphan_many(&mut self, entities: &[Entity]) {
        for &entity in entities {
            self.orphan(entity);
        }
    }

    // ==================== Component Operations ====================

    /// Assign a component to an entity, returning a reference to the
    /// stored value.
    ///
    /// Updates every cached group whose filter references `T`.
    ///
    /// # Panics
    ///
    /// Panics if the entity is invalid or already has `T`.
    pub fn assign<T: Component>(&mut self, entity: Entity, value: T) -> &mut T {
        assert!(
            self.valid(entity),
            "assign: entity {entity:?} does not belong to this world"
        );
        assert!(
            !self.has::<(T,)>(entity),
            "assign: entity {entity:?} already has {}",
            std::any::type_name::<T>()
        );

        let position = self.accommodate::<T>();
        let index = entity.index();

        // Presence first, then group membership, then the value itself:
        // group re-tests read the rows, so they must already be current.
        self.presence[position.index()].set(index);
        let Self {
            groups, presence, ..
        } = self;
        groups.on_assigned(entity, position, presence);

        self.typed_column_mut::<T>(position).insert(index, value)
    }

    /// Assign a component, or replace the entity's current value in place.
    ///
    /// # Panics
    ///
    /// Panics if the entity is invalid.
    pub fn assign_or_replace<T: Component>(&mut self, entity: Entity, value: T) -> &mut T {
        assert!(
            self.valid(entity),
            "assign_or_replace: entity {entity:?} does not belong to this world"
        );
        if self.has::<(T,)>(entity) {
            let slot = self.get_mut::<T>(entity);
            *slot = value;
            return slot;
        }
        self.assign(entity, value)
    }

    /// Remove a component bundle from an entity, returning the values.
    ///
    /// Each removed type updates every cached group whose filter
    /// references it.
    ///
    /// # Panics
    ///
    /// Panics if the entity is invalid or lacks any requested component.
    pub fn remove<B: Bundle>(&mut self, entity: Entity) -> B {
        B::take(self, entity)
    }

    /// Remove a single component type from every entity in the slice,
    /// dropping the values.
    ///
    /// # Panics
    ///
    /// Panics if any entity is invalid or lacks the component.
    pub fn remove_from<T: Component>(&mut self, entities: &[Entity]) {
        for &entity in entities {
            let _ = self.remove_one::<T>(entity);
        }
    }

    /// Single-type removal primitive behind [`World::remove`].
    pub(crate) fn remove_one<T: Component>(&mut self, entity: Entity) -> T {
        assert!(
            self.valid(entity),
            "remove: entity {entity:?} does not belong to this world"
        );
        assert!(
            self.has::<(T,)>(entity),
            "remove: entity {entity:?} does not have {}",
            std::any::type_name::<T>()
        );

        let position = self
            .registry
            .lookup::<T>()
            .expect("has() implies the type is registered");
        let index = entity.index();

        self.presence[position.index()].clear(index);
        self.groups.on_removed(entity, position);
        self.typed_column_mut::<T>(position)
            .take(index)
            .expect(LIVENESS_MSG)
    }

    /// Check if an entity owns every component type in `S`.
    ///
    /// Invalid entities and unregistered types test false; this predicate
    /// never panics on them.
    #[must_use]
    pub fn has<S: ComponentSet>(&self, entity: Entity) -> bool {
        if !self.valid(entity) {
            return false;
        }
        let Some(positions) = S::lookup(&self.registry) else {
            return false;
        };
        positions
            .iter()
            .all(|p| self.presence[p.index()].test(entity.index()))
    }

    /// Get an entity's components, as shared references in requested
    /// order.
    ///
    /// # Panics
    ///
    /// Panics if the entity is invalid or lacks any requested component.
    #[must_use]
    pub fn get<S: ComponentSet>(&self, entity: Entity) -> S::Refs<'_> {
        assert!(
            self.has::<S>(entity),
            "get: entity {entity:?} is missing requested components"
        );
        let positions = S::lookup(&self.registry).expect("has() implies the types are registered");
        let columns = S::columns(self, &positions);
        S::fetch(&columns, entity.index())
    }

    /// Get an exclusive reference to an entity's component.
    ///
    /// Exclusive access to several components at once goes through
    /// [`World::view_mut`].
    ///
    /// # Panics
    ///
    /// Panics if the entity is invalid or lacks the component.
    #[must_use]
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> &mut T {
        assert!(
            self.has::<(T,)>(entity),
            "get_mut: entity {entity:?} does not have {}",
            std::any::type_name::<T>()
        );
        let position = self
            .registry
            .lookup::<T>()
            .expect("has() implies the type is registered");
        self.typed_column_mut::<T>(position)
            .get_mut(entity.index())
            .expect(LIVENESS_MSG)
    }

    // ==================== Introspection ====================

    /// Number of alive entities owning every component type in `S`.
    #[must_use]
    pub fn count<S: ComponentSet>(&self) -> usize {
        let Some(positions) = S::lookup(&self.registry) else {
            return 0;
        };
        self.entities
            .slots()
            .filter(|entity| {
                positions
                    .iter()
                    .all(|p| self.presence[p.index()].test(entity.index()))
            })
            .count()
    }

    /// Number of live values in `T`'s column.
    ///
    /// # Panics
    ///
    /// Panics if `T` is not managed by this world.
    #[must_use]
    pub fn size<T: Component>(&self) -> usize {
        let position = self.registered::<T>("size");
        self.columns[position.index()].live()
    }

    /// Number of slots in `T`'s currently allocated chunks.
    ///
    /// # Panics
    ///
    /// Panics if `T` is not managed by this world.
    #[must_use]
    pub fn capacity<T: Component>(&self) -> usize {
        let position = self.registered::<T>("capacity");
        self.columns[position.index()].capacity()
    }

    /// Check if `T`'s column holds no live values.
    ///
    /// # Panics
    ///
    /// Panics if `T` is not managed by this world.
    #[must_use]
    pub fn is_empty<T: Component>(&self) -> bool {
        self.size::<T>() == 0
    }

    /// Check if every type in `S` is managed by this world.
    #[must_use]
    pub fn contains<S: ComponentSet>(&self) -> bool {
        S::lookup(&self.registry).is_some()
    }

    /// Pre-allocate storage for `slots` entity indices in every type of
    /// `S`, registering types that are new to this world.
    pub fn reserve<S: ComponentSet>(&mut self, slots: u32) {
        let positions = S::register(self);
        for position in &positions {
            self.presence[position.index()].reserve(slots);
            self.columns[position.index()].reserve(slots);
        }
    }

    /// Release unused storage held for every type in `S`.
    ///
    /// # Panics
    ///
    /// Panics if any type in `S` is not managed by this world.
    pub fn shrink_to_fit<S: ComponentSet>(&mut self) {
        let positions = S::lookup(&self.registry)
            .expect("shrink_to_fit: a requested type is not managed by this world");
        for position in &positions {
            self.presence[position.index()].shrink_to_fit();
            self.columns[position.index()].shrink_to_fit();
        }
    }

    /// Number of component types managed by this world.
    #[must_use]
    pub fn num_component_types(&self) -> usize {
        self.registry.len()
    }

    /// Total number of directory slots ever created.
    #[must_use]
    pub fn num_entities(&self) -> usize {
        self.entities.num_slots()
    }

    /// Number of entities that have not been destroyed.
    #[must_use]
    pub fn num_alive(&self) -> usize {
        self.entities.num_alive()
    }

    /// Number of destroyed indices awaiting reuse.
    #[must_use]
    pub fn num_reusable(&self) -> usize {
        self.entities.num_reusable()
    }

    // ==================== Views ====================

    /// Get a read view over the entities owning every type in `S`.
    ///
    /// The first request for a distinct type set scans the directory once
    /// to build its group; the group is then kept current by every
    /// structural mutation, so later requests are O(1). The same group
    /// backs any request order of the same types.
    pub fn view<S: ComponentSet>(&mut self) -> View<'_, S> {
        let positions = S::register(self);
        let filter = self.ensure_group(&positions);

        let this = &*self;
        let members = this.groups.get(&filter).expect("group was just ensured");
        let columns = S::columns(this, &positions);
        View::new(members, columns)
    }

    /// Get a write view over the entities owning every type in `S`.
    ///
    /// Component values can be mutated in place through the view;
    /// presence cannot.
    pub fn view_mut<S: ComponentSetMut>(&mut self) -> ViewMut<'_, S> {
        let positions = S::register(self);
        let filter = self.ensure_group(&positions);

        let Self {
            groups, columns, ..
        } = self;
        let members = groups.get(&filter).expect("group was just ensured");
        let columns = S::columns_mut(columns.as_mut_slice(), &positions);
        ViewMut::new(members, columns)
    }

    // ==================== Internals ====================

    /// Ensure `T` is managed: register it and create its presence row and
    /// column on first reference.
    pub(crate) fn accommodate<T: Component>(&mut self) -> TypePosition {
        if let Some(position) = self.registry.lookup::<T>() {
            return position;
        }
        let position = self.registry.register::<T>();
        self.presence.push(BitMask::new());
        self.columns.push(Box::new(ChunkedColumn::<T>::new()));
        debug_assert_eq!(self.presence.len(), self.registry.len());
        debug_assert_eq!(self.columns.len(), self.registry.len());
        trace!(
            component = self.registry.name(position),
            position = position.as_raw(),
            "registered component type"
        );
        position
    }

    /// Resolve or build the group for a filter, returning the filter key.
    fn ensure_group(&mut self, positions: &PositionList) -> BitMask {
        let filter = GroupCache::filter_for(positions);
        if self.groups.get(&filter).is_some() {
            return filter;
        }

        // First request for this filter: the one O(population) scan.
        let mut members = SparseSet::new();
        for entity in self.entities.slots() {
            let qualifies = positions
                .iter()
                .all(|p| self.presence[p.index()].test(entity.index()));
            if qualifies {
                members.insert(entity);
            }
        }
        debug!(
            filter = ?filter,
            members = members.len(),
            groups = self.groups.len() + 1,
            "built entity group"
        );
        self.groups.insert(filter.clone(), members);
        filter
    }

    pub(crate) fn typed_column<T: Component>(&self, position: TypePosition) -> &ChunkedColumn<T> {
        self.columns[position.index()]
            .as_any()
            .downcast_ref()
            .expect("column type does not match its registered position")
    }

    pub(crate) fn typed_column_mut<T: Component>(
        &mut self,
        position: TypePosition,
    ) -> &mut ChunkedColumn<T> {
        self.columns[position.index()]
            .as_any_mut()
            .downcast_mut()
            .expect("column type does not match its registered position")
    }

    fn registered<T: Component>(&self, operation: &str) -> TypePosition {
        match self.registry.lookup::<T>() {
            Some(position) => position,
            None => panic!(
                "{operation}: {} is not managed by this world",
                std::any::type_name::<T>()
            ),
        }
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("alive", &self.num_alive())
            .field("slots", &self.num_entities())
            .field("component_types", &self.num_component_types())
            .field("groups", &self.groups.len())
            .finish()
    }
}
