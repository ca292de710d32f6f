//! Body integration and platform bounds
//!
//! Every frame each body loses a fixed fraction of its velocity to friction
//! and moves by `velocity * dt`. Bodies standing on a platform are held at
//! the surface height until they leave its bounds, at which point they start
//! falling instead of being clamped back.

use glam::Vec3;

use super::clock::SimulationContext;
use super::components::{PhysicsBody, PlatformConstraint, Transform};
use super::falling;
use super::state::GameState;
use crate::tuning::PhysicsTuning;

/// What one integration step decided about a body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Grounded,
    Airborne,
    /// Past the platform edge or below the kill height
    Fell,
}

/// Integrate one body for `dt` seconds.
///
/// `constraint` is the body's platform, if it has one and it resolved.
pub fn integrate(
    body: &mut PhysicsBody,
    transform: &mut Transform,
    constraint: Option<&PlatformConstraint>,
    tuning: &PhysicsTuning,
    dt: f32,
) -> StepOutcome {
    body.velocity *= body.friction();

    let Some(constraint) = constraint else {
        body.velocity.y -= tuning.gravity * dt;
        transform.translation += body.velocity * dt;
        body.on_ground = false;
        return if transform.translation.y < tuning.fall_threshold_y {
            StepOutcome::Fell
        } else {
            StepOutcome::Airborne
        };
    };

    body.velocity.y = 0.0;
    transform.translation += body.velocity * dt;
    if constraint.is_beyond_edge(transform.translation, tuning.edge_buffer) {
        return StepOutcome::Fell;
    }
    transform.translation.y = constraint.surface_y + body.ground_level;
    body.on_ground = true;
    if transform.translation.y < tuning.fall_threshold_y {
        return StepOutcome::Fell;
    }
    StepOutcome::Grounded
}

/// Move every body that isn't already falling
pub fn update(state: &mut GameState, ctx: &SimulationContext) {
    if ctx.paused {
        return;
    }
    let world = &mut state.world;
    let mut fallen = Vec::new();

    for entity in world.body_entities() {
        if world.is_falling(entity) {
            continue;
        }
        let constraint = match world.bodies.get(entity).and_then(|b| b.platform) {
            Some(platform) => {
                let c = world.platform_constraint(platform);
                if c.is_none() {
                    log::warn!("Body {entity:?} references missing platform {platform:?}");
                }
                c
            }
            None => None,
        };
        let (Some(body), Some(transform)) =
            (world.bodies.get_mut(entity), world.transforms.get_mut(entity))
        else {
            continue;
        };
        if integrate(body, transform, constraint.as_ref(), &state.tuning.physics, ctx.dt)
            == StepOutcome::Fell
        {
            fallen.push(entity);
        }
    }

    for entity in fallen {
        falling::begin_fall(world, entity, ctx.now);
    }
}
