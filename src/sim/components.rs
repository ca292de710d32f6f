//! Component types attached to entities
//!
//! Composition only: the player is a Transform + PhysicsBody + Player,
//! an enemy a Transform + PhysicsBody + EnemyAgent, and so on.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::progression::ProgressionState;
use super::world::Entity;
use crate::SimError;

/// Position, orientation and uniform scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: f32,
}

impl Transform {
    pub fn at(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::IDENTITY,
            scale: 1.0,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::at(Vec3::ZERO)
    }
}

/// Velocity, mass and friction for anything that moves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsBody {
    pub velocity: Vec3,
    mass: f32,
    friction: f32,
    pub on_ground: bool,
    /// Height of the entity origin above the platform surface
    pub ground_level: f32,
    /// Platform whose bounds constrain this body
    pub platform: Option<Entity>,
}

impl PhysicsBody {
    /// Create a body; rejects `mass <= 0` and friction outside (0, 1)
    pub fn new(mass: f32, friction: f32) -> Result<Self, SimError> {
        if !(mass > 0.0 && mass.is_finite() && friction > 0.0 && friction < 1.0) {
            return Err(SimError::InvalidBody { mass, friction });
        }
        Ok(Self {
            velocity: Vec3::ZERO,
            mass,
            friction,
            on_ground: true,
            ground_level: 0.0,
            platform: None,
        })
    }

    pub fn on_platform(mut self, platform: Entity, ground_level: f32) -> Self {
        self.platform = Some(platform);
        self.ground_level = ground_level;
        self
    }

    #[inline]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    #[inline]
    pub fn friction(&self) -> f32 {
        self.friction
    }

    /// Add an instantaneous velocity change
    #[inline]
    pub fn apply_impulse(&mut self, delta_v: Vec3) {
        self.velocity += delta_v;
    }
}

/// Square platform bounds derived from the platform entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlatformConstraint {
    pub center: Vec3,
    pub half_size: f32,
    pub surface_y: f32,
}

impl PlatformConstraint {
    /// True once `pos` is past the edge by more than `edge_buffer` on either axis
    pub fn is_beyond_edge(&self, pos: Vec3, edge_buffer: f32) -> bool {
        let limit = self.half_size + edge_buffer;
        (pos.x - self.center.x).abs() > limit || (pos.z - self.center.z).abs() > limit
    }

    /// Half-extent of the region kept `margin` away from the edges
    pub fn interior_half(&self, margin: f32) -> f32 {
        (self.half_size - margin).max(0.0)
    }
}

/// Platform model marker; the scale lives on the entity's Transform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub base_half_extent: f32,
}

/// Enemy difficulty class, weakest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EnemyTier {
    One,
    Two,
    Three,
    Four,
    Five,
}

impl EnemyTier {
    pub const ALL: [EnemyTier; 5] = [
        EnemyTier::One,
        EnemyTier::Two,
        EnemyTier::Three,
        EnemyTier::Four,
        EnemyTier::Five,
    ];

    /// 1-based ordinal
    pub fn ordinal(self) -> u8 {
        self as u8 + 1
    }
}

/// Enemy behaviour state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyAgent {
    pub tier: EnemyTier,
    /// Current steering speed (time-slow scales this)
    pub speed: f32,
    pub push_force: f32,
    /// Points awarded before the wave score multiplier
    pub score_value: u32,
    /// Target acquired and chasing
    pub active: bool,
    /// Cached player handle; re-acquired when stale
    pub target: Option<Entity>,
    pub has_fallen: bool,
    /// Clock time of this enemy's last push on the player
    pub last_hit_at: Option<f64>,
}

impl EnemyAgent {
    pub fn new(tier: EnemyTier, speed: f32, push_force: f32, score_value: u32) -> Self {
        Self {
            tier,
            speed,
            push_force,
            score_value,
            active: false,
            target: None,
            has_fallen: false,
            last_hit_at: None,
        }
    }
}

/// Which removal sequence a falling entity runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FallKind {
    Enemy,
    Player,
}

/// Timed knock-off sequence, decoupled from normal physics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallingState {
    pub kind: FallKind,
    pub is_falling: bool,
    pub started_at: f64,
    /// Fraction of the animation elapsed, [0, 1]
    pub progress: f32,
    pub start_translation: Vec3,
    pub start_rotation: Quat,
    pub start_scale: f32,
    /// Completion reached; side effect pending
    pub trigger: bool,
    /// Completion side effect already applied
    pub triggered: bool,
}

impl FallingState {
    pub fn begin(kind: FallKind, now: f64, transform: &Transform) -> Self {
        Self {
            kind,
            is_falling: true,
            started_at: now,
            progress: 0.0,
            start_translation: transform.translation,
            start_rotation: transform.rotation,
            start_scale: transform.scale,
            trigger: false,
            triggered: false,
        }
    }
}

/// Pickup-able power-up types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerUpKind {
    TimeSlow,
    Shockwave,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 2] = [PowerUpKind::TimeSlow, PowerUpKind::Shockwave];

    pub fn name(&self) -> &'static str {
        match self {
            PowerUpKind::TimeSlow => "Time Slow",
            PowerUpKind::Shockwave => "Shockwave",
        }
    }
}

/// A collectible crate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootBox {
    pub kind: PowerUpKind,
    pub spawned_at: f64,
    pub lifetime: f32,
    /// Still hovering at drop height
    pub elevated: bool,
    /// Resting Y once lowered
    pub landing_y: f32,
}

impl LootBox {
    pub fn is_expired(&self, now: f64) -> bool {
        now - self.spawned_at >= f64::from(self.lifetime)
    }

    /// Settle onto the surface. Returns false if it was never elevated.
    pub fn lower(&mut self) -> bool {
        if !self.elevated {
            log::warn!("Tried to lower a {:?} loot box that is not elevated", self.kind);
            return false;
        }
        self.elevated = false;
        true
    }
}

/// Temporary effect bookkeeping on the player
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerUpState {
    /// Clock time at which the current time-slow ends
    pub slow_until: Option<f64>,
    /// Pre-slow speed of every enemy currently slowed
    pub saved_speeds: Vec<(Entity, f32)>,
}

impl PowerUpState {
    pub fn is_slow_active(&self, now: f64) -> bool {
        self.slow_until.is_some_and(|end| now < end)
    }
}

/// Player-only state: score, effects and upgrades
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub score: u64,
    pub power_ups: PowerUpState,
    pub progression: ProgressionState,
    /// Movement input is ignored until this clock time
    pub locked_until: Option<f64>,
}

impl Player {
    pub fn is_locked(&self, now: f64) -> bool {
        self.locked_until.is_some_and(|end| now < end)
    }
}
