//! Knock-off sequences
//!
//! Crossing the platform edge doesn't remove an entity straight away. It
//! enters a timed fall (sinking, tumbling, and for enemies shrinking), and
//! the gameplay consequence is applied once the fall completes: score and
//! removal for an enemy, game over for the player.

use glam::{Quat, Vec3};

use super::clock::SimulationContext;
use super::components::{FallKind, FallingState};
use super::events::GameEvent;
use super::state::{GamePhase, GameState};
use super::world::{Entity, World};
use crate::tuning::FallTuning;

/// Put `entity` into its fall sequence.
///
/// Velocity is zeroed and the entity stops taking input. Returns false if it
/// is already falling or is neither the player nor an enemy.
pub fn begin_fall(world: &mut World, entity: Entity, now: f64) -> bool {
    if world.is_falling(entity) {
        return false;
    }
    let kind = if world.players.contains(entity) {
        FallKind::Player
    } else if world.enemies.contains(entity) {
        FallKind::Enemy
    } else {
        return false;
    };
    let Some(transform) = world.transforms.get(entity).copied() else {
        log::warn!("Entity {entity:?} fell without a transform");
        return false;
    };
    if let Some(body) = world.bodies.get_mut(entity) {
        body.velocity = Vec3::ZERO;
        body.on_ground = false;
    }
    if let Some(agent) = world.enemies.get_mut(entity) {
        agent.has_fallen = true;
        agent.active = false;
    }
    world
        .falling
        .insert(entity, FallingState::begin(kind, now, &transform));
    log::debug!("{kind:?} {entity:?} started falling");
    true
}

fn duration(kind: FallKind, tuning: &FallTuning) -> f32 {
    match kind {
        FallKind::Enemy => tuning.enemy_duration,
        FallKind::Player => tuning.player_duration,
    }
}

/// Advance one fall's progress to `now`.
///
/// Returns true while the fall has completed but its consequence has not
/// been applied yet.
pub fn advance_fall(fall: &mut FallingState, now: f64, duration: f32) -> bool {
    let elapsed = (now - fall.started_at).max(0.0);
    let ratio = if duration > 0.0 {
        elapsed / f64::from(duration)
    } else {
        1.0
    };
    fall.progress = ratio.min(1.0) as f32;
    if ratio >= 1.0 {
        fall.trigger = true;
    }
    fall.trigger && !fall.triggered
}

/// Mark the consequence of `entity`'s completed fall as applied.
///
/// True at most once per fall; false if the fall hasn't completed.
fn claim_completion(world: &mut World, entity: Entity) -> bool {
    match world.falling.get_mut(entity) {
        Some(fall) if fall.trigger && !fall.triggered => {
            fall.triggered = true;
            true
        }
        _ => false,
    }
}

/// Cosmetic pose for a fall at its current progress
fn apply_pose(fall: &FallingState, tuning: &FallTuning) -> (Vec3, Quat, f32) {
    let p = fall.progress;
    let drop = tuning.descent_distance * p * p;
    let translation = fall.start_translation - Vec3::Y * drop;
    let rotation = fall.start_rotation * Quat::from_rotation_x(tuning.spin * p);
    let scale = match fall.kind {
        FallKind::Enemy => fall.start_scale * (1.0 + (tuning.enemy_end_scale - 1.0) * p),
        FallKind::Player => fall.start_scale,
    };
    (translation, rotation, scale)
}

/// Score, count and remove an enemy whose fall completed
pub fn complete_enemy_fall(state: &mut GameState, entity: Entity) {
    if !claim_completion(&mut state.world, entity) {
        return;
    }
    let Some(agent) = state.world.enemies.get(entity) else {
        log::warn!("Fall completed for {entity:?} but it has no enemy data");
        state.world.despawn(entity);
        return;
    };
    let points = (agent.score_value as f32 * state.wave.multipliers.score).round() as u64;
    state.wave.record_defeat();
    state
        .world
        .events
        .push(GameEvent::EnemyDefeated { score: points });
    state.add_score(points);

    if let Some(player) = state.world.players.get_mut(state.player) {
        player.power_ups.saved_speeds.retain(|(e, _)| *e != entity);
    }
    state.world.despawn(entity);
    state.collision_cache.invalidate();
    log::debug!(
        "Enemy defeated for {points} points ({} left in wave {})",
        state.wave.remaining,
        state.wave.number
    );
}

/// End the run once the player's fall completed
pub fn complete_player_fall(state: &mut GameState) {
    if !claim_completion(&mut state.world, state.player) {
        return;
    }
    let score = state.score();
    let wave = state.wave.number;
    state.world.events.push(GameEvent::PlayerFell);
    state.world.events.push(GameEvent::GameOver { score, wave });
    state.phase = GamePhase::GameOver;
    log::info!("Game over: score {score}, wave {wave}");
}

/// Advance every fall and apply completions
pub fn update(state: &mut GameState, ctx: &SimulationContext) {
    if ctx.paused {
        return;
    }
    let tuning = state.tuning.falling.clone();
    let mut completed = Vec::new();

    for entity in state.world.falling.entities() {
        let Some(fall) = state.world.falling.get_mut(entity) else {
            continue;
        };
        if !fall.is_falling {
            continue;
        }
        let kind = fall.kind;
        if advance_fall(fall, ctx.now, duration(kind, &tuning)) {
            completed.push((entity, kind));
        }
        let (translation, rotation, scale) = apply_pose(fall, &tuning);
        if let Some(transform) = state.world.transforms.get_mut(entity) {
            transform.translation = translation;
            transform.rotation = rotation;
            transform.scale = scale;
        }
    }

    for (entity, kind) in completed {
        match kind {
            FallKind::Enemy => complete_enemy_fall(state, entity),
            FallKind::Player => complete_player_fall(state),
        }
    }
}
