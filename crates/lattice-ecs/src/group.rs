//! The group cache: memoized filter-to-member-set entries.
//!
//! A group is the set of entities currently owning every component type
//! named by its filter. Groups are built once by a full directory scan
//! when a view first requests their filter, then maintained incrementally
//! on every assignment, removal, and destruction that touches a referenced
//! type. Entries persist for the lifetime of the world.

use hashbrown::HashMap;

use crate::{component::TypePosition, entity::Entity, mask::BitMask, sparse::SparseSet};

/// Cache of groups keyed by filter value.
#[derive(Default)]
pub(crate) struct GroupCache {
    groups: HashMap<BitMask, SparseSet>,
}

impl GroupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the filter key for a set of type positions.
    ///
    /// Keyed purely on the bitset value, so request order cannot produce
    /// distinct entries for the same type set.
    pub fn filter_for(positions: &[TypePosition]) -> BitMask {
        BitMask::from_bits(positions.iter().map(|p| p.as_raw()))
    }

    pub fn get(&self, filter: &BitMask) -> Option<&SparseSet> {
        self.groups.get(filter)
    }

    pub fn insert(&mut self, filter: BitMask, members: SparseSet) {
        self.groups.insert(filter, members);
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// An entity gained the type at `position`: add it to every cached
    /// group whose filter it now fully satisfies.
    ///
    /// All filter bits are re-tested against the presence rows, not just
    /// the newly satisfied one.
    pub fn on_assigned(&mut self, entity: Entity, position: TypePosition, presence: &[BitMask]) {
        for (filter, group) in &mut self.groups {
            if !filter.test(position.as_raw()) {
                continue;
            }
            if group.contains(entity) {
                continue;
            }
            let satisfied = filter
                .ones()
                .all(|bit| presence[bit as usize].test(entity.index()));
            if satisfied {
                group.insert(entity);
            }
        }
    }

    /// An entity lost the type at `position`: a filter requiring it can no
    /// longer be satisfied, so erase unconditionally from those groups.
    pub fn on_removed(&mut self, entity: Entity, position: TypePosition) {
        for (filter, group) in &mut self.groups {
            if filter.test(position.as_raw()) {
                group.erase(entity);
            }
        }
    }

    /// An entity is being destroyed: erase it from every cached group.
    pub fn on_destroyed(&mut self, entity: Entity) {
        for group in self.groups.values_mut() {
            group.erase(entity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Version;

    fn entity(index: u32) -> Entity {
        Entity::new(index, Version::new())
    }

    fn position(raw: u32) -> TypePosition {
        TypePosition::from_raw(raw)
    }

    #[test]
    fn test_filter_identity_is_order_insensitive() {
        let forward = GroupCache::filter_for(&[position(0), position(3)]);
        let backward = GroupCache::filter_for(&[position(3), position(0)]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_on_assigned_requires_every_filter_bit() {
        let mut cache = GroupCache::new();
        cache.insert(GroupCache::filter_for(&[position(0), position(1)]), SparseSet::new());

        // Entity 5 owns only type 0.
        let mut presence = vec![BitMask::new(), BitMask::new()];
        presence[0].set(5);

        cache.on_assigned(entity(5), position(0), &presence);
        let filter = GroupCache::filter_for(&[position(0), position(1)]);
        assert_eq!(cache.get(&filter).unwrap().len(), 0);

        // Now it owns both.
        presence[1].set(5);
        cache.on_assigned(entity(5), position(1), &presence);
        assert_eq!(cache.get(&filter).unwrap().len(), 1);

        // Re-notification is idempotent.
        cache.on_assigned(entity(5), position(1), &presence);
        assert_eq!(cache.get(&filter).unwrap().len(), 1);
    }

    #[test]
    fn test_on_removed_only_touches_referencing_filters() {
        let mut cache = GroupCache::new();
        let with_a = GroupCache::filter_for(&[position(0)]);
        let with_b = GroupCache::filter_for(&[position(1)]);

        let mut members = SparseSet::new();
        members.insert(entity(2));
        cache.insert(with_a.clone(), members);

        let mut members = SparseSet::new();
        members.insert(entity(2));
        cache.insert(with_b.clone(), members);

        cache.on_removed(entity(2), position(0));
        assert_eq!(cache.get(&with_a).unwrap().len(), 0);
        assert_eq!(cache.get(&with_b).unwrap().len(), 1);
    }

    #[test]
    fn test_on_destroyed_erases_everywhere() {
        let mut cache = GroupCache::new();
        for positions in [&[position(0)][..], &[position(1)][..]] {
            let mut members = SparseSet::new();
            members.insert(entity(9));
            cache.insert(GroupCache::filter_for(positions), members);
        }

        cache.on_destroyed(entity(9));
        assert_eq!(cache.get(&GroupCache::filter_for(&[position(0)])).unwrap().len(), 0);
        assert_eq!(cache.get(&GroupCache::filter_for(&[position(1)])).unwrap().len(), 0);
    }
}
