//! Deterministic simulation module
//!
//! All gameplay logic lives here:
//! - Seeded RNG only
//! - Stable iteration order (snapshots sorted by entity handle)
//! - Systems run in a fixed order once per frame (see [`tick`])
//! - No rendering, audio or platform dependencies

pub mod clock;
pub mod collision;
pub mod components;
pub mod events;
pub mod falling;
pub mod movement;
pub mod perf;
pub mod physics;
pub mod powerup;
pub mod prefabs;
pub mod progression;
pub mod spawner;
pub mod state;
pub mod tick;
pub mod wave;
pub mod world;

pub use clock::{SimClock, SimulationContext};
pub use collision::{CollisionCache, PushParams, Separation, push_impulse, separate_enemies};
pub use components::{
    EnemyAgent, EnemyTier, FallKind, FallingState, LootBox, PhysicsBody, Platform,
    PlatformConstraint, Player, PowerUpKind, PowerUpState, Transform,
};
pub use events::{EventQueue, GameEvent};
pub use perf::PerformanceGovernor;
pub use prefabs::{BuiltinPrefabs, EnemyTemplate, LootBoxTemplate, PrefabProvider};
pub use progression::{ProgressionState, UpgradeKind};
pub use spawner::{BurstState, SpawnerState};
pub use state::{GamePhase, GameState};
pub use tick::{TickInput, tick};
pub use wave::{WaveMultipliers, WaveState};
pub use world::{ComponentStore, Entity, World};
