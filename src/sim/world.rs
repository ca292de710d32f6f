//! Entity store
//!
//! Entities are generational handles; components live in one sparse set per
//! type. A handle whose entity was despawned (and whose slot may have been
//! reused) simply stops resolving, so systems can hold handles across frames
//! and detect staleness instead of dangling.
//!
//! Systems that despawn while iterating take a snapshot of handles first
//! (`enemy_entities`, `body_entities`, ...) and re-resolve each one.

use serde::{Deserialize, Serialize};

use super::components::{
    EnemyAgent, FallingState, LootBox, PhysicsBody, Platform, PlatformConstraint, Player,
    Transform,
};
use super::events::EventQueue;

/// Opaque entity identity: slot index plus generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    /// Slot index (stable while the entity lives; used for pair ordering)
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Hands out entity slots and recycles them with a bumped generation
#[derive(Debug, Default)]
struct EntityAllocator {
    generations: Vec<u32>,
    alive: Vec<bool>,
    free: Vec<u32>,
}

impl EntityAllocator {
    fn allocate(&mut self) -> Entity {
        if let Some(index) = self.free.pop() {
            let slot = index as usize;
            self.alive[slot] = true;
            return Entity {
                index,
                generation: self.generations[slot],
            };
        }
        let index = self.generations.len() as u32;
        self.generations.push(0);
        self.alive.push(true);
        Entity {
            index,
            generation: 0,
        }
    }

    fn is_alive(&self, entity: Entity) -> bool {
        let slot = entity.index as usize;
        slot < self.alive.len() && self.alive[slot] && self.generations[slot] == entity.generation
    }

    fn free(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        let slot = entity.index as usize;
        self.alive[slot] = false;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.free.push(entity.index);
        true
    }

    fn live_count(&self) -> usize {
        self.alive.iter().filter(|a| **a).count()
    }
}

/// Sparse-set storage for one component type
#[derive(Debug, Clone)]
pub struct ComponentStore<T> {
    /// Entity slot -> dense index
    sparse: Vec<Option<usize>>,
    dense: Vec<T>,
    owners: Vec<Entity>,
}

impl<T> Default for ComponentStore<T> {
    fn default() -> Self {
        Self {
            sparse: Vec::new(),
            dense: Vec::new(),
            owners: Vec::new(),
        }
    }
}

impl<T> ComponentStore<T> {
    /// Attach (or replace) a component, returning the previous value
    pub fn insert(&mut self, entity: Entity, value: T) -> Option<T> {
        let slot = entity.index as usize;
        if slot >= self.sparse.len() {
            self.sparse.resize(slot + 1, None);
        }
        if let Some(dense_idx) = self.sparse[slot] {
            // Slot reused by a newer generation: overwrite the stale owner too
            self.owners[dense_idx] = entity;
            return Some(std::mem::replace(&mut self.dense[dense_idx], value));
        }
        self.sparse[slot] = Some(self.dense.len());
        self.dense.push(value);
        self.owners.push(entity);
        None
    }

    /// Detach a component (swap-remove keeps the dense array packed)
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let dense_idx = self.dense_index(entity)?;
        let slot = entity.index as usize;
        self.sparse[slot] = None;
        let last = self.dense.len() - 1;
        if dense_idx != last {
            let moved = self.owners[last];
            self.sparse[moved.index as usize] = Some(dense_idx);
        }
        self.owners.swap_remove(dense_idx);
        Some(self.dense.swap_remove(dense_idx))
    }

    fn dense_index(&self, entity: Entity) -> Option<usize> {
        let dense_idx = (*self.sparse.get(entity.index as usize)?)?;
        (self.owners[dense_idx] == entity).then_some(dense_idx)
    }

    #[inline]
    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.dense_index(entity).map(|i| &self.dense[i])
    }

    #[inline]
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.dense_index(entity).map(|i| &mut self.dense[i])
    }

    #[inline]
    pub fn contains(&self, entity: Entity) -> bool {
        self.dense_index(entity).is_some()
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.owners.iter().copied().zip(self.dense.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.owners.iter().copied().zip(self.dense.iter_mut())
    }

    /// Owners in slot order, detached from the store's borrow
    pub fn entities(&self) -> Vec<Entity> {
        let mut out = self.owners.clone();
        out.sort_unstable();
        out
    }
}

/// Shared mutable world: every entity, its components and the event queue
#[derive(Debug, Default)]
pub struct World {
    allocator: EntityAllocator,
    pub transforms: ComponentStore<Transform>,
    pub bodies: ComponentStore<PhysicsBody>,
    pub enemies: ComponentStore<EnemyAgent>,
    pub falling: ComponentStore<FallingState>,
    pub players: ComponentStore<Player>,
    pub loot_boxes: ComponentStore<LootBox>,
    pub platforms: ComponentStore<Platform>,
    pub events: EventQueue,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh entity with no components
    pub fn spawn(&mut self) -> Entity {
        self.allocator.allocate()
    }

    /// Destroy an entity and every component attached to it.
    ///
    /// Returns false for handles that were already stale.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if !self.allocator.free(entity) {
            return false;
        }
        self.transforms.remove(entity);
        self.bodies.remove(entity);
        self.enemies.remove(entity);
        self.falling.remove(entity);
        self.players.remove(entity);
        self.loot_boxes.remove(entity);
        self.platforms.remove(entity);
        true
    }

    #[inline]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.allocator.is_alive(entity)
    }

    pub fn entity_count(&self) -> usize {
        self.allocator.live_count()
    }

    /// The (single) player entity, if it exists
    pub fn player_entity(&self) -> Option<Entity> {
        self.players.iter().map(|(e, _)| e).next()
    }

    /// Entities with Transform + PhysicsBody + EnemyAgent
    pub fn enemy_entities(&self) -> Vec<Entity> {
        self.enemies
            .entities()
            .into_iter()
            .filter(|e| self.transforms.contains(*e) && self.bodies.contains(*e))
            .collect()
    }

    /// Entities with Transform + PhysicsBody
    pub fn body_entities(&self) -> Vec<Entity> {
        self.bodies
            .entities()
            .into_iter()
            .filter(|e| self.transforms.contains(*e))
            .collect()
    }

    pub fn loot_box_entities(&self) -> Vec<Entity> {
        self.loot_boxes.entities()
    }

    /// Number of live enemies (falling ones included until removed)
    pub fn enemy_count(&self) -> usize {
        self.enemies.len()
    }

    pub fn is_falling(&self, entity: Entity) -> bool {
        self.falling.get(entity).is_some_and(|f| f.is_falling)
    }

    /// Boundary data read from a platform entity's transform and scale
    pub fn platform_constraint(&self, platform: Entity) -> Option<PlatformConstraint> {
        let model = self.platforms.get(platform)?;
        let transform = self.transforms.get(platform)?;
        Some(PlatformConstraint {
            center: transform.translation,
            half_size: model.base_half_extent * transform.scale,
            surface_y: transform.translation.y,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn despawned_handle_stops_resolving() {
        let mut world = World::new();
        let e = world.spawn();
        world.transforms.insert(e, Transform::at(Vec3::ONE));
        assert!(world.transforms.get(e).is_some());

        assert!(world.despawn(e));
        assert!(!world.is_alive(e));
        assert!(world.transforms.get(e).is_none());
        assert!(!world.despawn(e), "double despawn is a no-op");
    }

    #[test]
    fn reused_slot_gets_new_generation() {
        let mut world = World::new();
        let old = world.spawn();
        world.transforms.insert(old, Transform::at(Vec3::X));
        world.despawn(old);

        let new = world.spawn();
        assert_eq!(old.index(), new.index());
        assert_ne!(old.generation(), new.generation());

        world.transforms.insert(new, Transform::at(Vec3::Y));
        assert!(world.transforms.get(old).is_none());
        assert_eq!(world.transforms.get(new).map(|t| t.translation), Some(Vec3::Y));
    }

    #[test]
    fn swap_remove_keeps_other_entries() {
        let mut store = ComponentStore::default();
        let mut world = World::new();
        let a = world.spawn();
        let b = world.spawn();
        let c = world.spawn();
        store.insert(a, 1);
        store.insert(b, 2);
        store.insert(c, 3);

        assert_eq!(store.remove(a), Some(1));
        assert_eq!(store.get(b), Some(&2));
        assert_eq!(store.get(c), Some(&3));
        assert_eq!(store.len(), 2);
        assert_eq!(store.entities(), vec![b, c]);
    }

    #[test]
    fn platform_constraint_uses_scale() {
        let mut world = World::new();
        let p = world.spawn();
        let mut transform = Transform::at(Vec3::new(1.0, 2.0, 3.0));
        transform.scale = 4.0;
        world.transforms.insert(p, transform);
        world.platforms.insert(p, Platform { base_half_extent: 2.5 });

        let c = world.platform_constraint(p).unwrap();
        assert_eq!(c.half_size, 10.0);
        assert_eq!(c.surface_y, 2.0);
        assert_eq!(c.center, Vec3::new(1.0, 2.0, 3.0));
    }
}
