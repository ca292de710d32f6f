//! Enemy and loot box spawning
//!
//! Enemies come out one at a time on the wave's interval, capped by the
//! wave's concurrency limit. From the burst threshold onward a spawn may
//! instead open a burst: a small cluster dropped in quick succession around
//! one point. Loot boxes roll on their own timer and are placed by a grid
//! search that keeps them apart from each other and from the player.

use glam::Vec3;
use rand::Rng;

use super::clock::SimulationContext;
use super::components::{
    EnemyAgent, EnemyTier, LootBox, PhysicsBody, PlatformConstraint, PowerUpKind, Transform,
};
use super::events::GameEvent;
use super::state::GameState;
use super::wave;
use super::world::Entity;
use crate::planar_distance;
use crate::tuning::LootTuning;

/// A cluster spawn in progress
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BurstState {
    pub active: bool,
    /// Enemies this burst will drop in total
    pub size: u32,
    pub spawned: u32,
    pub center: Vec3,
    pub next_at: f64,
    /// No new burst may open before this time
    pub cooldown_until: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpawnerState {
    pub last_spawn_at: f64,
    pub last_loot_roll_at: f64,
    pub burst: BurstState,
}

impl SpawnerState {
    /// Restart the enemy cadence for a new wave; burst cooldown carries over
    pub fn reset(&mut self, now: f64) {
        self.last_spawn_at = now;
        self.burst.active = false;
        self.burst.size = 0;
        self.burst.spawned = 0;
    }
}

/// Uniform point inside the platform, `margin` away from every edge
pub fn random_interior_point<R: Rng + ?Sized>(
    constraint: &PlatformConstraint,
    margin: f32,
    rng: &mut R,
) -> Vec3 {
    let half = constraint.interior_half(margin);
    if half <= 0.0 {
        return Vec3::new(constraint.center.x, constraint.surface_y, constraint.center.z);
    }
    Vec3::new(
        constraint.center.x + rng.random_range(-half..=half),
        constraint.surface_y,
        constraint.center.z + rng.random_range(-half..=half),
    )
}

fn is_clear(pos: Vec3, occupied: &[Vec3], player: Vec3, spacing: f32, exclusion: f32) -> bool {
    planar_distance(pos, player) >= exclusion
        && occupied.iter().all(|o| planar_distance(pos, *o) >= spacing)
}

/// Pick a loot box position.
///
/// Tries free grid cells first, then a bounded number of random points with
/// halved distance requirements, then any random interior point.
pub fn find_loot_position<R: Rng + ?Sized>(
    constraint: &PlatformConstraint,
    margin: f32,
    occupied: &[Vec3],
    player: Vec3,
    loot: &LootTuning,
    rng: &mut R,
) -> Vec3 {
    let half = constraint.interior_half(margin);
    let cell = loot.cell_size.max(0.1);
    let cells_per_side = ((half * 2.0) / cell).floor() as i32;

    let mut free = Vec::new();
    for ix in 0..cells_per_side {
        for iz in 0..cells_per_side {
            let pos = Vec3::new(
                constraint.center.x - half + (ix as f32 + 0.5) * cell,
                constraint.surface_y,
                constraint.center.z - half + (iz as f32 + 0.5) * cell,
            );
            if is_clear(pos, occupied, player, loot.min_spacing, loot.player_exclusion) {
                free.push(pos);
            }
        }
    }
    if !free.is_empty() {
        return free[rng.random_range(0..free.len())];
    }

    for _ in 0..loot.fallback_attempts {
        let pos = random_interior_point(constraint, margin, rng);
        if is_clear(
            pos,
            occupied,
            player,
            loot.min_spacing * 0.5,
            loot.player_exclusion * 0.5,
        ) {
            log::debug!("Loot placed by relaxed fallback");
            return pos;
        }
    }

    log::warn!("No free loot position after {} attempts, placing randomly", loot.fallback_attempts);
    random_interior_point(constraint, margin, rng)
}

/// Spawn one enemy of a wave-weighted tier at `position` (planar).
///
/// A tier without a template falls back to the lowest tier that has one. If
/// nothing can be spawned the slot is forfeited against the wave quota.
pub fn spawn_enemy(state: &mut GameState, position: Vec3) -> Option<Entity> {
    let picked = wave::pick_tier(state.wave.number, &mut state.rng);
    let prefabs = state.prefabs();
    let tier = if prefabs.enemy(picked).is_some() {
        Some(picked)
    } else {
        EnemyTier::ALL
            .into_iter()
            .find(|tier| prefabs.enemy(*tier).is_some())
    };
    let spawned = match tier {
        Some(tier) => {
            if tier != picked {
                log::debug!("No template for {picked:?}, spawning {tier:?} instead");
            }
            spawn_enemy_of_tier(state, tier, position)
        }
        None => None,
    };
    if spawned.is_none() {
        forfeit_spawn(state);
    }
    spawned
}

/// Count a spawn that could not happen as spawned and defeated
fn forfeit_spawn(state: &mut GameState) {
    if state.wave.left_to_spawn() == 0 {
        return;
    }
    state.wave.spawned += 1;
    state.wave.record_defeat();
    log::warn!(
        "Enemy spawn forfeited in wave {} ({} left)",
        state.wave.number,
        state.wave.remaining
    );
}

/// Spawn an enemy of a fixed tier; returns None if no template exists
pub fn spawn_enemy_of_tier(state: &mut GameState, tier: EnemyTier, position: Vec3) -> Option<Entity> {
    let Some(template) = state.prefabs().enemy(tier) else {
        log::warn!("No enemy template for {tier:?}, skipping spawn");
        return None;
    };
    let body = match PhysicsBody::new(template.stats.mass, template.stats.friction) {
        Ok(body) => body.on_platform(state.platform, state.tuning.physics.ground_level),
        Err(err) => {
            log::warn!("Enemy template {tier:?} rejected: {err}");
            return None;
        }
    };
    let surface_y = state
        .world
        .platform_constraint(state.platform)
        .map_or(state.tuning.platform.surface_y, |c| c.surface_y);

    let mut transform = Transform::at(Vec3::new(
        position.x,
        surface_y + state.tuning.physics.ground_level,
        position.z,
    ));
    transform.scale = template.stats.scale;

    let speed = template.stats.speed * state.wave.multipliers.speed;
    let agent = EnemyAgent::new(tier, speed, template.stats.push_force, template.stats.score);

    let entity = state.world.spawn();
    state.world.transforms.insert(entity, transform);
    state.world.bodies.insert(entity, body);
    state.world.enemies.insert(entity, agent);
    state.collision_cache.invalidate();
    state.wave.spawned += 1;
    state.world.events.push(GameEvent::EnemySpawned { tier });
    log::debug!("Spawned {tier:?} enemy at ({:.1}, {:.1})", position.x, position.z);
    Some(entity)
}

/// Enemies still on the platform (falling ones no longer count)
fn standing_enemies(state: &GameState) -> usize {
    state
        .world
        .enemies
        .iter()
        .filter(|(e, _)| !state.world.is_falling(*e))
        .count()
}

fn at_capacity(state: &GameState) -> bool {
    standing_enemies(state) >= state.wave.max_concurrent(&state.tuning.spawner)
}

fn continue_burst(state: &mut GameState, constraint: &PlatformConstraint, now: f64) {
    let burst = &state.spawner.burst;
    if now < burst.next_at || at_capacity(state) {
        return;
    }
    if burst.spawned >= burst.size || state.wave.left_to_spawn() == 0 {
        state.spawner.burst.active = false;
        return;
    }

    let spread = state.tuning.spawner.burst_spread;
    let half = constraint.interior_half(state.tuning.spawner.spawn_margin);
    let center = burst.center;
    let offset_x = state.rng.random_range(-spread..=spread);
    let offset_z = state.rng.random_range(-spread..=spread);
    let pos = Vec3::new(
        (center.x + offset_x).clamp(constraint.center.x - half, constraint.center.x + half),
        center.y,
        (center.z + offset_z).clamp(constraint.center.z - half, constraint.center.z + half),
    );

    spawn_enemy(state, pos);
    let stagger = f64::from(state.tuning.spawner.burst_stagger);
    let burst = &mut state.spawner.burst;
    burst.spawned += 1;
    burst.next_at = now + stagger;
    if burst.spawned >= burst.size {
        burst.active = false;
    }
}

fn try_open_burst(state: &mut GameState, constraint: &PlatformConstraint, now: f64) -> bool {
    let tuning = &state.tuning.spawner;
    if state.wave.number < tuning.burst_wave_threshold
        || now < state.spawner.burst.cooldown_until
        || !state.rng.random_bool(tuning.burst_chance.clamp(0.0, 1.0))
    {
        return false;
    }
    let max = tuning.burst_max.max(2);
    let size = state.rng.random_range(2..=max).min(state.wave.left_to_spawn());
    if size < 2 {
        return false;
    }

    let center = random_interior_point(constraint, tuning.spawn_margin, &mut state.rng);
    let cooldown = f64::from(tuning.burst_cooldown);
    state.spawner.burst = BurstState {
        active: true,
        size,
        spawned: 0,
        center,
        next_at: now,
        cooldown_until: now + cooldown,
    };
    log::debug!("Burst of {size} opened in wave {}", state.wave.number);
    continue_burst(state, constraint, now);
    true
}

/// Per-frame enemy spawning
pub fn update(state: &mut GameState, ctx: &SimulationContext) {
    if ctx.paused || !state.wave.active {
        return;
    }
    let Some(constraint) = state.world.platform_constraint(state.platform) else {
        log::warn!("Spawner has no platform to spawn on");
        return;
    };
    let now = ctx.now;

    if state.spawner.burst.active {
        continue_burst(state, &constraint, now);
        return;
    }
    if state.wave.left_to_spawn() == 0 {
        return;
    }
    let interval = f64::from(wave::spawn_interval(state.wave.number, &state.tuning.spawner));
    if now - state.spawner.last_spawn_at < interval || at_capacity(state) {
        return;
    }
    state.spawner.last_spawn_at = now;

    if try_open_burst(state, &constraint, now) {
        return;
    }
    let pos = random_interior_point(&constraint, state.tuning.spawner.spawn_margin, &mut state.rng);
    spawn_enemy(state, pos);
}

/// Spawn a loot box of `kind`, hovering above a free spot
pub fn spawn_loot_box(state: &mut GameState, kind: PowerUpKind, now: f64) -> Option<Entity> {
    let Some(template) = state.prefabs().loot_box(kind) else {
        log::warn!("No loot box template for {kind:?}, skipping drop");
        return None;
    };
    let constraint = state.world.platform_constraint(state.platform)?;
    let occupied: Vec<Vec3> = state
        .world
        .loot_boxes
        .iter()
        .filter_map(|(e, _)| state.world.transforms.get(e).map(|t| t.translation))
        .collect();
    let player_pos = state
        .world
        .transforms
        .get(state.player)
        .map_or(constraint.center, |t| t.translation);

    let pos = find_loot_position(
        &constraint,
        state.tuning.spawner.spawn_margin,
        &occupied,
        player_pos,
        &state.tuning.loot,
        &mut state.rng,
    );
    let landing_y = constraint.surface_y + state.tuning.physics.ground_level;
    let entity = state.world.spawn();
    state.world.transforms.insert(
        entity,
        Transform::at(Vec3::new(pos.x, landing_y + state.tuning.loot.drop_height, pos.z)),
    );
    state.world.loot_boxes.insert(
        entity,
        LootBox {
            kind,
            spawned_at: now,
            lifetime: template.lifetime,
            elevated: true,
            landing_y,
        },
    );
    state.world.events.push(GameEvent::LootBoxSpawned { kind });
    log::debug!("{} loot box dropped at ({:.1}, {:.1})", kind.name(), pos.x, pos.z);
    Some(entity)
}

/// Roll for a loot drop on the loot timer
pub fn update_loot(state: &mut GameState, ctx: &SimulationContext) {
    if ctx.paused {
        return;
    }
    let loot = &state.tuning.loot;
    if ctx.now - state.spawner.last_loot_roll_at < f64::from(loot.spawn_interval) {
        return;
    }
    state.spawner.last_loot_roll_at = ctx.now;
    if state.world.loot_boxes.len() >= loot.max_active {
        return;
    }
    if !state.rng.random_bool(loot.spawn_chance.clamp(0.0, 1.0)) {
        return;
    }
    let kind = PowerUpKind::ALL[state.rng.random_range(0..PowerUpKind::ALL.len())];
    spawn_loot_box(state, kind, ctx.now);
}
