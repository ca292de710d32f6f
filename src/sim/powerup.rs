//! Loot boxes and temporary power-ups
//!
//! Time-slow scales every live enemy's speed down for a window; the original
//! speeds are saved once per enemy so re-collecting only extends the window.
//! Shockwave throws nearby enemies outward and briefly locks the player.

use glam::Vec3;

use super::clock::SimulationContext;
use super::components::PowerUpKind;
use super::events::GameEvent;
use super::progression::{ProgressionState, UpgradeKind};
use super::state::GameState;
use super::world::Entity;
use crate::tuning::PowerUpTuning;
use crate::{planar_direction, planar_distance};

/// Time-slow length after the player's slow-duration upgrades
pub fn slow_duration(tuning: &PowerUpTuning, progression: &ProgressionState) -> f32 {
    tuning.slow_duration * progression.multiplier(UpgradeKind::SlowDuration)
}

/// Slow every live enemy and open (or extend) the slow window
pub fn activate_time_slow(state: &mut GameState, now: f64) {
    let factor = state.tuning.power_ups.slow_factor;
    let Some(player) = state.world.players.get_mut(state.player) else {
        log::warn!("Time slow collected without a player");
        return;
    };
    let duration = slow_duration(&state.tuning.power_ups, &player.progression);
    let saved = &mut player.power_ups.saved_speeds;

    for (entity, agent) in state.world.enemies.iter_mut() {
        if saved.iter().any(|(e, _)| *e == entity) {
            continue;
        }
        saved.push((entity, agent.speed));
        agent.speed *= factor;
    }

    let end_time = now + f64::from(duration);
    let end_time = match player.power_ups.slow_until {
        Some(existing) if existing > end_time => existing,
        _ => end_time,
    };
    player.power_ups.slow_until = Some(end_time);
    state
        .world
        .events
        .push(GameEvent::TimeSlowActivated { end_time, duration });
    log::debug!("Time slow until {end_time:.2}");
}

/// Restore saved enemy speeds once the slow window has passed
pub fn expire_time_slow(state: &mut GameState, now: f64) {
    let Some(player) = state.world.players.get_mut(state.player) else {
        return;
    };
    let Some(end) = player.power_ups.slow_until else {
        return;
    };
    if now < end {
        return;
    }
    player.power_ups.slow_until = None;
    for (entity, speed) in player.power_ups.saved_speeds.drain(..) {
        if let Some(agent) = state.world.enemies.get_mut(entity) {
            agent.speed = speed;
        }
    }
    state.world.events.push(GameEvent::TimeSlowEnded);
    log::debug!("Time slow ended");
}

/// Throw standing enemies near the player outward and lock the player
pub fn trigger_shockwave(state: &mut GameState, now: f64) {
    let player = state.player;
    let tuning = &state.tuning.power_ups;
    let (Some(origin), Some(power)) = (
        state.world.transforms.get(player).map(|t| t.translation),
        state
            .world
            .players
            .get(player)
            .map(|p| p.progression.multiplier(UpgradeKind::ShockwavePower)),
    ) else {
        log::warn!("Shockwave triggered without a player");
        return;
    };

    let mut hits = 0;
    for entity in state.world.enemy_entities() {
        if state.world.is_falling(entity) {
            continue;
        }
        let Some(pos) = state.world.transforms.get(entity).map(|t| t.translation) else {
            continue;
        };
        if planar_distance(origin, pos) > tuning.shockwave_radius {
            continue;
        }
        let mut dir = planar_direction(origin, pos);
        if dir == Vec3::ZERO {
            dir = Vec3::X;
        }
        if let Some(body) = state.world.bodies.get_mut(entity) {
            body.apply_impulse(dir * tuning.shockwave_force * power);
            hits += 1;
        }
    }

    if let Some(p) = state.world.players.get_mut(player) {
        p.locked_until = Some(now + f64::from(tuning.shockwave_lock));
    }
    if let Some(body) = state.world.bodies.get_mut(player) {
        body.velocity = Vec3::ZERO;
    }
    state.world.events.push(GameEvent::ShockwaveTriggered {
        origin,
        radius: tuning.shockwave_radius,
    });
    log::debug!("Shockwave hit {hits} enemies");
}

/// Pick up a loot box and apply its effect
pub fn collect(state: &mut GameState, entity: Entity, now: f64) {
    let Some(kind) = state.world.loot_boxes.get(entity).map(|l| l.kind) else {
        return;
    };
    state.world.despawn(entity);
    state.world.events.push(GameEvent::PowerUpCollected {
        name: kind.name().to_string(),
    });
    match kind {
        PowerUpKind::TimeSlow => activate_time_slow(state, now),
        PowerUpKind::Shockwave => trigger_shockwave(state, now),
    }
}

/// Drop, expire and collect loot boxes
fn update_loot_boxes(state: &mut GameState, now: f64) {
    let drop_duration = f64::from(state.tuning.loot.drop_duration.max(f32::EPSILON));
    let drop_height = state.tuning.loot.drop_height;
    let pickup_radius = state.tuning.loot.pickup_radius;
    let player_pos = if state.world.is_falling(state.player) {
        None
    } else {
        state.world.transforms.get(state.player).map(|t| t.translation)
    };

    for entity in state.world.loot_box_entities() {
        let Some(loot) = state.world.loot_boxes.get_mut(entity) else {
            continue;
        };
        if loot.is_expired(now) {
            let kind = loot.kind;
            state.world.despawn(entity);
            state.world.events.push(GameEvent::LootBoxExpired { kind });
            log::debug!("{} loot box expired", kind.name());
            continue;
        }

        let landing_y = loot.landing_y;
        let t = ((now - loot.spawned_at) / drop_duration).min(1.0) as f32;
        if loot.elevated && t >= 1.0 {
            loot.lower();
        }
        let elevated = loot.elevated;
        let Some(transform) = state.world.transforms.get_mut(entity) else {
            continue;
        };
        transform.translation.y = if elevated {
            landing_y + drop_height * (1.0 - t)
        } else {
            landing_y
        };
        let pos = transform.translation;

        if elevated {
            continue;
        }
        if player_pos.is_some_and(|p| planar_distance(p, pos) <= pickup_radius) {
            collect(state, entity, now);
        }
    }
}

/// Per-frame power-up pass: loot boxes, then time-slow expiry
pub fn update(state: &mut GameState, ctx: &SimulationContext) {
    if ctx.paused {
        return;
    }
    update_loot_boxes(state, ctx.now);
    expire_time_slow(state, ctx.now);
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
            dt: 1.0 / 60.0,
            frame: 0,
        }
    }

    #[test]
    fn slow_saves_once_and_restores() {
        let mut state = GameState::new(1, Tuning::default()).unwrap();
        let enemy = spawner::spawn_enemy(&mut state, Vec3::new(4.0, 0.0, 0.0)).unwrap();

        activate_time_slow(&mut state, 0.0);
        assert!((state.world.enemies.get(enemy).unwrap().speed - 1.5).abs() < 1e-6);

        // Re-collecting extends without compounding
        activate_time_slow(&mut state, 2.0);
        assert!((state.world.enemies.get(enemy).unwrap().speed - 1.5).abs() < 1e-6);
        let until = state.player_state().unwrap().power_ups.slow_until;
        assert_eq!(until, Some(5.0));

        expire_time_slow(&mut state, 4.9);
        assert!((state.world.enemies.get(enemy).unwrap().speed - 1.5).abs() < 1e-6);
        expire_time_slow(&mut state, 5.0);
        assert!((state.world.enemies.get(enemy).unwrap().speed - 3.0).abs() < 1e-6);
        assert!(state.player_state().unwrap().power_ups.saved_speeds.is_empty());
    }

    #[test]
    fn shockwave_pushes_nearby_and_locks_player() {
        let mut state = GameState::new(1, Tuning::default()).unwrap();
        let near = spawner::spawn_enemy(&mut state, Vec3::new(0.0, 0.0, 3.0)).unwrap();
        let far = spawner::spawn_enemy(&mut state, Vec3::new(0.0, 0.0, -8.0)).unwrap();

        trigger_shockwave(&mut state, 1.0);
        let v = state.world.bodies.get(near).unwrap().velocity;
        assert!((v.z - 15.0).abs() < 1e-5);
        assert_eq!(state.world.bodies.get(far).unwrap().velocity, Vec3::ZERO);
        assert!(state.player_state().unwrap().is_locked(1.5));
        assert!(!state.player_state().unwrap().is_locked(1.6));
    }

    #[test]
    fn loot_lowers_then_can_be_collected() {
        let mut state = GameState::new(1, Tuning::default()).unwrap();
        let loot = spawner::spawn_loot_box(&mut state, PowerUpKind::Shockwave, 0.0).unwrap();
        let pos = state.world.transforms.get(loot).unwrap().translation;
        state.world.transforms.get_mut(state.player).unwrap().translation =
            Vec3::new(pos.x, 0.5, pos.z);
        state.drain_events();

        update(&mut state, &ctx(0.25));
        assert!(state.world.is_alive(loot), "still dropping");

        update(&mut state, &ctx(0.5));
        assert!(!state.world.is_alive(loot));
        let events = state.drain_events();
        assert_eq!(
            events[0],
            GameEvent::PowerUpCollected {
                name: "Shockwave".to_string()
            }
        );
        assert!(matches!(events[1], GameEvent::ShockwaveTriggered { .. }));
    }

    #[test]
    fn uncollected_loot_expires() {
        let mut state = GameState::new(1, Tuning::default()).unwrap();
        let loot = spawner::spawn_loot_box(&mut state, PowerUpKind::TimeSlow, 0.0).unwrap();
        state.drain_events();
        update(&mut state, &ctx(10.0));
        assert!(!state.world.is_alive(loot));
        assert_eq!(
            state.drain_events(),
            vec![GameEvent::LootBoxExpired {
                kind: PowerUpKind::TimeSlow
            }]
        );
    }
}
