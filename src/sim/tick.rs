//! Per-frame simulation tick
//!
//! Runs every system once, in a fixed order: movement, physics, collision,
//! falling, wave, spawning, power-ups. Deferred events whose time has come
//! are promoted at the end, so the caller drains a complete frame.
//!
//! `dt` is simulated time. Rendered frame time is the driver's business and
//! goes to `PerformanceGovernor::record_frame` once per rendered frame.

use glam::Vec2;

use super::clock::SimulationContext;
use super::state::{GamePhase, GameState};
use super::{collision, falling, movement, physics, powerup, spawner, wave};

/// Input commands for a single frame
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Analog movement on the ground plane (x, z); clamped to unit length
    pub movement: Vec2,
    /// Pause toggle
    pub pause: bool,
    /// Idle/demo mode - autopilot drives the player
    pub idle_mode: bool,
}

/// Advance the game state by one frame of `dt` seconds
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    // Handle pause toggle
    if input.pause {
        match state.phase {
            GamePhase::Playing => {
                state.phase = GamePhase::Paused;
                log::info!("Paused at {:.2}s", state.clock.now());
                return;
            }
            GamePhase::Paused => {
                state.phase = GamePhase::Playing;
                log::info!("Resumed at {:.2}s", state.clock.now());
            }
            GamePhase::GameOver => {}
        }
    }

    // Don't tick if paused or game over
    match state.phase {
        GamePhase::Paused | GamePhase::GameOver => return,
        GamePhase::Playing => {}
    }

    state.clock.advance(dt);
    let ctx = SimulationContext::from_clock(&state.clock, dt.max(0.0), false);

    movement::update(state, input.movement, input.idle_mode, &ctx);
    physics::update(state, &ctx);
    collision::update(state, &ctx);
    falling::update(state, &ctx);
    if state.phase == GamePhase::Playing {
        wave::update(state, &ctx);
        spawner::update(state, &ctx);
        spawner::update_loot(state, &ctx);
        powerup::update(state, &ctx);
    }

    let enemies = state.world.enemy_count();
    state.governor.set_enemy_count(enemies);
    state.world.events.promote_due(ctx.now);
}
