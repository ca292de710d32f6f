//! Collision detection and push response
//!
//! Player-enemy contacts exchange velocity impulses: each side pushes the
//! other by `base × strength × (pusher mass / target mass) / resistance`.
//! Enemy-enemy contacts only move the pair apart so they never overlap;
//! momentum is untouched.
//!
//! Enemy-enemy checks run over a cached candidate list in rotating batches so
//! the per-frame cost stays bounded when the governor is under load.

use std::collections::HashSet;

use glam::Vec3;

use super::clock::SimulationContext;
use super::events::GameEvent;
use super::perf::PerformanceGovernor;
use super::progression::UpgradeKind;
use super::state::GameState;
use super::world::{Entity, World};
use crate::tuning::CollisionTuning;
use crate::{facing_rotation, planar_direction, planar_distance};

/// One side of a push
#[derive(Debug, Clone, Copy)]
pub struct PushParams {
    pub strength: f32,
    pub pusher_mass: f32,
    pub target_mass: f32,
    pub target_resistance: f32,
}

/// Velocity change for a pushed body.
///
/// `direction` points from the pusher toward the target. Non-positive mass
/// or resistance yields no impulse.
pub fn push_impulse(direction: Vec3, base_force: f32, params: &PushParams) -> Vec3 {
    if params.target_mass <= 0.0 || params.target_resistance <= 0.0 {
        return Vec3::ZERO;
    }
    let magnitude = base_force * params.strength * (params.pusher_mass / params.target_mass)
        / params.target_resistance;
    direction * magnitude
}

/// Planar direction from `a` to `b`, +X when they coincide
fn separation_axis(a: Vec3, b: Vec3) -> Vec3 {
    let dir = planar_direction(a, b);
    if dir == Vec3::ZERO { Vec3::X } else { dir }
}

/// Impulses for a player-enemy contact: `(on_player, on_enemy)`
pub fn player_enemy_impulses(
    player_pos: Vec3,
    enemy_pos: Vec3,
    base_force: f32,
    player_push: &PushParams,
    enemy_push: &PushParams,
) -> (Vec3, Vec3) {
    let toward_enemy = separation_axis(player_pos, enemy_pos);
    let on_enemy = push_impulse(toward_enemy, base_force, player_push);
    let on_player = push_impulse(-toward_enemy, base_force, enemy_push);
    (on_player, on_enemy)
}

/// Result of an enemy-enemy overlap check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Separation {
    pub hit: bool,
    /// Translation to apply to the first enemy
    pub first: Vec3,
    /// Translation to apply to the second enemy
    pub second: Vec3,
}

impl Separation {
    pub fn miss() -> Self {
        Self {
            hit: false,
            first: Vec3::ZERO,
            second: Vec3::ZERO,
        }
    }
}

/// Positional correction pushing two overlapping enemies apart, half each
pub fn separate_enemies(a: Vec3, b: Vec3, radius: f32) -> Separation {
    let distance = planar_distance(a, b);
    if distance >= radius {
        return Separation::miss();
    }
    let overlap = radius - distance;
    let axis = separation_axis(a, b);
    Separation {
        hit: true,
        first: -axis * overlap * 0.5,
        second: axis * overlap * 0.5,
    }
}

/// Enemies eligible for collision checks, rebuilt every few frames
#[derive(Debug, Clone, Default)]
pub struct CollisionCache {
    candidates: Vec<Entity>,
    built_at: Option<u64>,
    cursor: usize,
}

impl CollisionCache {
    /// Rebuild the candidate list if it is older than the governor allows
    pub fn refresh(&mut self, world: &World, governor: &PerformanceGovernor, player_pos: Vec3, frame: u64) {
        let fresh = self
            .built_at
            .is_some_and(|built| frame.saturating_sub(built) < governor.cache_refresh_frames());
        if fresh {
            return;
        }
        let lod = governor.lod_distance();
        self.candidates = world
            .enemy_entities()
            .into_iter()
            .filter(|e| !world.is_falling(*e))
            .filter(|e| match (lod, world.transforms.get(*e)) {
                (Some(lod), Some(t)) => planar_distance(t.translation, player_pos) <= lod,
                _ => true,
            })
            .collect();
        self.built_at = Some(frame);
        if self.cursor >= self.candidates.len() {
            self.cursor = 0;
        }
    }

    pub fn candidates(&self) -> &[Entity] {
        &self.candidates
    }

    /// Force a rebuild on the next refresh; call when enemies come or go
    pub fn invalidate(&mut self) {
        self.built_at = None;
    }

    /// Next `size` candidates, wrapping around the list
    fn next_batch(&mut self, size: usize) -> Vec<Entity> {
        let len = self.candidates.len();
        if size >= len {
            self.cursor = 0;
            return self.candidates.clone();
        }
        let batch = (0..size)
            .map(|i| self.candidates[(self.cursor + i) % len])
            .collect();
        self.cursor = (self.cursor + size) % len;
        batch
    }
}

fn resolve_player_contacts(state: &mut GameState, ctx: &SimulationContext) {
    let player = state.player;
    if state.world.is_falling(player) {
        return;
    }
    let (Some(player_pos), Some(player_mass), Some(progression)) = (
        state.world.transforms.get(player).map(|t| t.translation),
        state.world.bodies.get(player).map(|b| b.mass()),
        state.world.players.get(player).map(|p| &p.progression),
    ) else {
        return;
    };
    let strength =
        state.tuning.collision.player_base_strength * progression.multiplier(UpgradeKind::Force);
    let resilience = progression.multiplier(UpgradeKind::Resilience);
    let tuning: &CollisionTuning = &state.tuning.collision;
    let cooldown = f64::from(tuning.hit_cooldown);

    let mut contacts = Vec::new();
    for &enemy in state.collision_cache.candidates() {
        if state.world.is_falling(enemy) {
            continue;
        }
        let (Some(agent), Some(t), Some(body)) = (
            state.world.enemies.get(enemy),
            state.world.transforms.get(enemy),
            state.world.bodies.get(enemy),
        ) else {
            continue;
        };
        if planar_distance(player_pos, t.translation) >= tuning.player_enemy_radius {
            continue;
        }
        if agent.last_hit_at.is_some_and(|at| ctx.now - at < cooldown) {
            continue;
        }
        let player_push = PushParams {
            strength,
            pusher_mass: player_mass,
            target_mass: body.mass(),
            target_resistance: tuning.enemy_resistance,
        };
        let enemy_push = PushParams {
            strength: agent.push_force,
            pusher_mass: body.mass(),
            target_mass: player_mass,
            target_resistance: resilience,
        };
        let (on_player, on_enemy) = player_enemy_impulses(
            player_pos,
            t.translation,
            tuning.base_force,
            &player_push,
            &enemy_push,
        );
        contacts.push((enemy, t.translation, on_player, on_enemy));
    }

    for (enemy, enemy_pos, on_player, on_enemy) in contacts {
        if let Some(body) = state.world.bodies.get_mut(enemy) {
            body.apply_impulse(on_enemy);
        }
        if let Some(agent) = state.world.enemies.get_mut(enemy) {
            agent.last_hit_at = Some(ctx.now);
        }
        if let Some(body) = state.world.bodies.get_mut(player) {
            body.apply_impulse(on_player);
        }
        if let Some(t) = state.world.transforms.get_mut(player) {
            t.rotation = facing_rotation(t.translation, enemy_pos);
        }
        state.world.events.push(GameEvent::PlayerEnemyCollision);
        state.world.events.push(GameEvent::PlayerAttack { enemy });
    }
}

fn resolve_enemy_overlaps(state: &mut GameState, ctx: &SimulationContext) {
    if ctx.frame % state.governor.collision_interval().max(1) != 0 {
        return;
    }
    let batch = state.collision_cache.next_batch(state.governor.batch_size());
    let in_batch: HashSet<Entity> = batch.iter().copied().collect();
    let radius = state.tuning.collision.enemy_enemy_radius;
    let world = &mut state.world;

    for &a in &batch {
        for &b in state.collision_cache.candidates() {
            // Each pair once: lower handle first, unless the partner is outside this batch
            if a == b || !(a < b || !in_batch.contains(&b)) {
                continue;
            }
            if world.is_falling(a) || world.is_falling(b) {
                continue;
            }
            let (Some(pa), Some(pb)) = (
                world.transforms.get(a).map(|t| t.translation),
                world.transforms.get(b).map(|t| t.translation),
            ) else {
                continue;
            };
            let sep = separate_enemies(pa, pb, radius);
            if !sep.hit {
                continue;
            }
            if let Some(t) = world.transforms.get_mut(a) {
                t.translation += sep.first;
            }
            if let Some(t) = world.transforms.get_mut(b) {
                t.translation += sep.second;
            }
        }
    }
}

/// Per-frame collision pass
pub fn update(state: &mut GameState, ctx: &SimulationContext) {
    if ctx.paused {
        return;
    }
    let player_pos = state
        .world
        .transforms
        .get(state.player)
        .map_or(Vec3::ZERO, |t| t.translation);
    state
        .collision_cache
        .refresh(&state.world, &state.governor, player_pos, ctx.frame);

    resolve_player_contacts(state, ctx);
    resolve_enemy_overlaps(state, ctx);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tuning;
    use crate::sim::components::EnemyTier;
    use crate::sim::spawner;

    fn ctx(frame: u64, now: f64) -> SimulationContext {
        SimulationContext {
            paused: false,
            now,
            dt: 1.0 / 60.0,
            frame,
        }
    }

    #[test]
    fn test_push_impulse_formula() {
        let params = PushParams {
            strength: 0.5,
            pusher_mass: 2.0,
            target_mass: 1.0,
            target_resistance: 2.0,
        };
        let v = push_impulse(Vec3::X, 12.0, &params);
        assert!((v.x - 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_push_impulse_guards_zero_mass() {
        let params = PushParams {
            strength: 1.0,
            pusher_mass: 1.0,
            target_mass: 0.0,
            target_resistance: 1.0,
        };
        assert_eq!(push_impulse(Vec3::X, 12.0, &params), Vec3::ZERO);
    }

    #[test]
    fn test_impulses_point_apart() {
        let params = PushParams {
            strength: 1.0,
            pusher_mass: 1.0,
            target_mass: 1.0,
            target_resistance: 1.0,
        };
        let (on_player, on_enemy) =
            player_enemy_impulses(Vec3::ZERO, Vec3::new(0.5, 0.0, 0.0), 10.0, &params, &params);
        assert!(on_player.x < 0.0);
        assert!(on_enemy.x > 0.0);
        assert_eq!(on_player, -on_enemy);
    }

    #[test]
    fn test_coincident_positions_use_fallback_axis() {
        let sep = separate_enemies(Vec3::ONE, Vec3::ONE, 1.0);
        assert!(sep.hit);
        assert_eq!(sep.first, Vec3::new(-0.5, 0.0, 0.0));
        assert_eq!(sep.second, Vec3::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn test_separation_splits_overlap() {
        let sep = separate_enemies(Vec3::ZERO, Vec3::new(0.6, 3.0, 0.0), 1.0);
        assert!((sep.first.x + 0.2).abs() < 1e-5);
        assert!((sep.second.x - 0.2).abs() < 1e-5);
        assert_eq!(separate_enemies(Vec3::ZERO, Vec3::X * 2.0, 1.0), Separation::miss());
    }

    #[test]
    fn test_contact_pushes_both_and_emits_events() {
        let mut state = GameState::new(1, Tuning::default()).unwrap();
        let enemy = spawner::spawn_enemy(&mut state, Vec3::new(1.0, 0.0, 0.0)).unwrap();
        state.drain_events();

        update(&mut state, &ctx(0, 1.0));
        let pv = state.world.bodies.get(state.player).unwrap().velocity;
        let ev = state.world.bodies.get(enemy).unwrap().velocity;
        // 12 * 0.3 * (1 / 1) / 1
        assert!((pv.x + 3.6).abs() < 1e-5);
        // 12 * 1 * (1 / 1) / 1
        assert!((ev.x - 12.0).abs() < 1e-5);
        assert_eq!(
            state.drain_events(),
            vec![GameEvent::PlayerEnemyCollision, GameEvent::PlayerAttack { enemy }]
        );

        // Cooldown: no second hit right away
        update(&mut state, &ctx(1, 1.1));
        assert!(state.drain_events().is_empty());
    }

    #[test]
    fn test_enemy_pairs_separated_without_velocity() {
        let mut state = GameState::new(1, Tuning::default()).unwrap();
        let a = spawner::spawn_enemy(&mut state, Vec3::new(5.0, 0.0, 5.0)).unwrap();
        let b = spawner::spawn_enemy(&mut state, Vec3::new(5.4, 0.0, 5.0)).unwrap();

        update(&mut state, &ctx(0, 1.0));
        let pa = state.world.transforms.get(a).unwrap().translation;
        let pb = state.world.transforms.get(b).unwrap().translation;
        assert!((planar_distance(pa, pb) - 1.0).abs() < 1e-4);
        assert_eq!(state.world.bodies.get(a).unwrap().velocity, Vec3::ZERO);
        assert_eq!(state.world.bodies.get(b).unwrap().velocity, Vec3::ZERO);
    }

    /// Player velocity after an enemy spawns next to an already-built cache
    fn knockback_after_late_spawn(governor_enabled: bool) -> Vec3 {
        let mut tuning = Tuning::default();
        tuning.performance.enabled = governor_enabled;
        let mut state = GameState::new(1, tuning).unwrap();
        update(&mut state, &ctx(0, 1.0));
        spawner::spawn_enemy_of_tier(&mut state, EnemyTier::One, Vec3::new(0.5, 0.0, 0.0)).unwrap();
        update(&mut state, &ctx(1, 1.0 + 1.0 / 60.0));
        state.world.bodies.get(state.player).unwrap().velocity
    }

    #[test]
    fn test_governor_does_not_delay_new_contacts() {
        let with_governor = knockback_after_late_spawn(true);
        let without = knockback_after_late_spawn(false);
        assert!((with_governor.x + 3.6).abs() < 1e-5);
        assert_eq!(with_governor, without);
    }

    #[test]
    fn test_batches_rotate_through_candidates() {
        let mut cache = CollisionCache::default();
        let mut world = World::new();
        cache.candidates = (0..5).map(|_| world.spawn()).collect();
        let first = cache.next_batch(2);
        let second = cache.next_batch(2);
        let third = cache.next_batch(2);
        assert_eq!(first, cache.candidates[0..2].to_vec());
        assert_eq!(second, cache.candidates[2..4].to_vec());
        assert_eq!(third, vec![cache.candidates[4], cache.candidates[0]]);
    }
}
