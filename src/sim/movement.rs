//! Player input and enemy steering
//!
//! Both turn intent into acceleration on the body; physics does the rest.

use glam::{Vec2, Vec3};

use super::clock::SimulationContext;
use super::progression::UpgradeKind;
use super::state::GameState;
use crate::{facing_rotation, planar_direction, planar_distance};

/// Apply the player's movement input as acceleration.
///
/// Ignored while the player is falling or locked by a shockwave.
pub fn apply_player_input(state: &mut GameState, movement: Vec2, ctx: &SimulationContext) {
    let player = state.player;
    if state.world.is_falling(player) {
        return;
    }
    let Some(p) = state.world.players.get(player) else {
        return;
    };
    if p.is_locked(ctx.now) {
        return;
    }
    let speed = p.progression.multiplier(UpgradeKind::Speed);
    let input = movement.clamp_length_max(1.0);
    if input == Vec2::ZERO || !input.is_finite() {
        return;
    }

    let accel = state.tuning.physics.player_acceleration * speed;
    let dir = Vec3::new(input.x, 0.0, input.y);
    if let Some(body) = state.world.bodies.get_mut(player) {
        body.velocity += dir * accel * ctx.dt;
    }
    if let Some(transform) = state.world.transforms.get_mut(player) {
        let from = transform.translation;
        transform.rotation = facing_rotation(from, from + dir);
    }
}

/// Autopilot for idle/demo mode: stay central, chase the nearest enemy
pub fn autopilot(state: &GameState) -> Vec2 {
    let Some(pos) = state.world.transforms.get(state.player).map(|t| t.translation) else {
        return Vec2::ZERO;
    };
    let Some(platform) = state.world.platform_constraint(state.platform) else {
        return Vec2::ZERO;
    };

    let to_center = planar_direction(pos, platform.center);
    if planar_distance(pos, platform.center) > platform.half_size * 0.5 {
        return Vec2::new(to_center.x, to_center.z);
    }

    let nearest = state
        .world
        .enemies
        .iter()
        .filter(|(e, _)| !state.world.is_falling(*e))
        .filter_map(|(e, _)| state.world.transforms.get(e))
        .map(|t| t.translation)
        .min_by(|a, b| planar_distance(pos, *a).total_cmp(&planar_distance(pos, *b)));

    match nearest {
        Some(target) => {
            let dir = planar_direction(pos, target);
            Vec2::new(dir.x, dir.z)
        }
        None => Vec2::new(to_center.x, to_center.z) * 0.5,
    }
}

/// Steer every standing enemy toward its target
pub fn steer_enemies(state: &mut GameState, ctx: &SimulationContext) {
    let accel = state.tuning.physics.enemy_acceleration;
    let world = &mut state.world;
    let governor = &state.governor;

    for entity in world.enemy_entities() {
        if world.is_falling(entity) {
            continue;
        }
        let stale = world
            .enemies
            .get(entity)
            .is_some_and(|a| a.target.is_none_or(|t| !world.is_alive(t)));
        if stale {
            let target = world.player_entity();
            if let Some(agent) = world.enemies.get_mut(entity) {
                agent.target = target;
                agent.active = target.is_some();
            }
        }

        let Some(agent) = world.enemies.get(entity) else {
            continue;
        };
        let Some(target_pos) = agent
            .target
            .and_then(|t| world.transforms.get(t))
            .map(|t| t.translation)
        else {
            continue;
        };
        let speed = agent.speed;
        let Some(pos) = world.transforms.get(entity).map(|t| t.translation) else {
            continue;
        };

        let distance = planar_distance(pos, target_pos);
        if !governor.should_update(distance, ctx.frame, u64::from(entity.index())) {
            continue;
        }
        let stride = match governor.lod_distance() {
            Some(lod) if distance > lod => governor.distant_stride() as f32,
            _ => 1.0,
        };

        let dir = planar_direction(pos, target_pos);
        if let Some(body) = world.bodies.get_mut(entity) {
            body.velocity += dir * speed * accel * ctx.dt * stride;
        }
        if let Some(transform) = world.transforms.get_mut(entity) {
            transform.rotation = facing_rotation(pos, target_pos);
        }
    }
}

/// Per-frame movement: player input (or autopilot) then enemy steering
pub fn update(state: &mut GameState, movement: Vec2, idle_mode: bool, ctx: &SimulationContext) {
    if ctx.paused {
        return;
    }
    let movement = if idle_mode { autopilot(state) } else { movement };
    apply_player_input(state, movement, ctx);
    steer_enemies(state, ctx);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tuning;
    use crate::sim::spawner;

    fn ctx(now: f64) -> SimulationContext {
        SimulationContext {
            paused: false,
            now,
            dt: 0.1,
            frame: 0,
        }
    }

    #[test]
    fn input_is_clamped_to_unit_length() {
        let mut state = GameState::new(1, Tuning::default()).unwrap();
        apply_player_input(&mut state, Vec2::new(10.0, 0.0), &ctx(0.0));
        let v = state.world.bodies.get(state.player).unwrap().velocity;
        // 30 accel * 1.0 input * 0.1 dt
        assert!((v.x - 3.0).abs() < 1e-5);
        assert_eq!(v.z, 0.0);
    }

    #[test]
    fn locked_player_ignores_input() {
        let mut state = GameState::new(1, Tuning::default()).unwrap();
        let player = state.player;
        state.world.players.get_mut(player).unwrap().locked_until = Some(1.0);
        apply_player_input(&mut state, Vec2::X, &ctx(0.5));
        assert_eq!(state.world.bodies.get(player).unwrap().velocity, Vec3::ZERO);

        apply_player_input(&mut state, Vec2::X, &ctx(1.0));
        assert!(state.world.bodies.get(player).unwrap().velocity.x > 0.0);
    }

    #[test]
    fn enemies_acquire_and_chase_player() {
        let mut state = GameState::new(1, Tuning::default()).unwrap();
        let enemy = spawner::spawn_enemy(&mut state, Vec3::new(5.0, 0.0, 0.0)).unwrap();
        steer_enemies(&mut state, &ctx(0.0));

        let agent = state.world.enemies.get(enemy).unwrap();
        assert_eq!(agent.target, Some(state.player));
        assert!(agent.active);
        let v = state.world.bodies.get(enemy).unwrap().velocity;
        assert!(v.x < 0.0, "moves toward the player at the origin");
    }

    #[test]
    fn autopilot_returns_to_center() {
        let mut state = GameState::new(1, Tuning::default()).unwrap();
        state.world.transforms.get_mut(state.player).unwrap().translation = Vec3::new(8.0, 0.5, 0.0);
        let steer = autopilot(&state);
        assert!(steer.x < 0.0);
    }
}
