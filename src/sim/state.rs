//! Game state and top-level simulation types
//!
//! [`GameState`] owns the world plus every scheduler that lives outside the
//! entity store (wave, spawner, governor, RNG, clock). Systems take it by
//! `&mut` for the duration of one pass.

use glam::Vec3;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::clock::SimClock;
use super::collision::CollisionCache;
use super::components::{PhysicsBody, Platform, Player, Transform};
use super::events::GameEvent;
use super::perf::PerformanceGovernor;
use super::prefabs::{BuiltinPrefabs, PrefabProvider};
use super::progression::{ProgressionState, UpgradeKind};
use super::spawner::SpawnerState;
use super::wave::{self, WaveState};
use super::world::{Entity, World};
use crate::{SimError, Tuning};

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Active gameplay (including inter-wave breathers)
    Playing,
    /// Simulation frozen; clock stopped
    Paused,
    /// Player finished falling
    GameOver,
}

/// Complete simulation state
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub tuning: Tuning,
    pub world: World,
    pub clock: SimClock,
    pub phase: GamePhase,
    pub rng: Pcg32,
    pub wave: WaveState,
    pub spawner: SpawnerState,
    pub governor: PerformanceGovernor,
    pub collision_cache: CollisionCache,
    /// Upgrade choices offered after the last cleared wave
    pub pending_upgrades: Vec<UpgradeKind>,
    pub player: Entity,
    pub platform: Entity,
    prefabs: Box<dyn PrefabProvider>,
}

impl std::fmt::Debug for GameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameState")
            .field("seed", &self.seed)
            .field("phase", &self.phase)
            .field("now", &self.clock.now())
            .field("wave", &self.wave)
            .field("entities", &self.world.entity_count())
            .finish_non_exhaustive()
    }
}

impl GameState {
    /// Create a game with the built-in templates and start wave 1
    pub fn new(seed: u64, tuning: Tuning) -> Result<Self, SimError> {
        let prefabs = Box::new(BuiltinPrefabs::from_tuning(&tuning));
        Self::with_prefabs(seed, tuning, prefabs)
    }

    /// Create a game with a custom template provider
    pub fn with_prefabs(
        seed: u64,
        tuning: Tuning,
        prefabs: Box<dyn PrefabProvider>,
    ) -> Result<Self, SimError> {
        tuning.validate()?;

        let mut world = World::new();

        let platform = world.spawn();
        let mut platform_transform =
            Transform::at(Vec3::new(0.0, tuning.platform.surface_y, 0.0));
        platform_transform.scale = tuning.platform.scale;
        world.transforms.insert(platform, platform_transform);
        world.platforms.insert(
            platform,
            Platform {
                base_half_extent: tuning.platform.base_half_extent,
            },
        );

        let physics = &tuning.physics;
        let player = world.spawn();
        let body = PhysicsBody::new(physics.player_mass, physics.player_friction)?
            .on_platform(platform, physics.ground_level);
        world.transforms.insert(
            player,
            Transform::at(Vec3::new(
                0.0,
                tuning.platform.surface_y + physics.ground_level,
                0.0,
            )),
        );
        world.bodies.insert(player, body);
        world.players.insert(player, Player::default());

        let governor = PerformanceGovernor::new(tuning.performance.clone());
        let mut state = Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            world,
            clock: SimClock::new(),
            phase: GamePhase::Playing,
            wave: WaveState::default(),
            spawner: SpawnerState::default(),
            governor,
            collision_cache: CollisionCache::default(),
            pending_upgrades: Vec::new(),
            player,
            platform,
            prefabs,
            tuning,
        };

        wave::start_wave(&mut state, 1, 0.0);
        log::info!("Game initialized with seed {seed}");
        Ok(state)
    }

    pub fn prefabs(&self) -> &dyn PrefabProvider {
        self.prefabs.as_ref()
    }

    pub fn player_state(&self) -> Option<&Player> {
        self.world.players.get(self.player)
    }

    pub fn progression(&self) -> Option<&ProgressionState> {
        self.player_state().map(|p| &p.progression)
    }

    pub fn score(&self) -> u64 {
        self.player_state().map_or(0, |p| p.score)
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Add points to the player's total and announce the new total
    pub fn add_score(&mut self, points: u64) {
        let Some(player) = self.world.players.get_mut(self.player) else {
            log::warn!("Score award of {points} dropped: no player");
            return;
        };
        player.score += points;
        let total = player.score;
        self.world.events.push(GameEvent::ScoreChanged { total });
    }

    /// Apply one of the offered upgrades.
    ///
    /// Returns the multiplier increment that was added.
    pub fn choose_upgrade(&mut self, kind: UpgradeKind) -> Result<f32, SimError> {
        if !self.pending_upgrades.contains(&kind) {
            return Err(SimError::UpgradeNotOffered(kind));
        }
        let player = self
            .world
            .players
            .get_mut(self.player)
            .ok_or(SimError::MissingPlayer)?;
        let increment = player
            .progression
            .apply(kind, &self.tuning.progression)
            .ok_or(SimError::UpgradeMaxed(kind))?;
        self.pending_upgrades.clear();
        log::info!("Player upgraded {kind:?} (+{increment:.3})");
        self.world
            .events
            .push(GameEvent::PlayerUpgraded { upgrade: kind });
        Ok(increment)
    }

    /// Hand every ready event to the presentation layer
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.world.events.drain()
    }
}
