//! Wave scheduler
//!
//! A wave has a fixed quota of enemies. It ends when every one of them has
//! been knocked off; the next wave starts after a breather, during which the
//! player is offered upgrades.

use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;

use super::clock::SimulationContext;
use super::components::EnemyTier;
use super::events::GameEvent;
use super::state::GameState;
use crate::tuning::{SpawnerTuning, WaveTuning};

/// Difficulty scalars derived from the wave number
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveMultipliers {
    /// Applied to tier speed at spawn
    pub speed: f32,
    /// Applied to tier score on defeat
    pub score: f32,
    /// Applied to the base concurrent enemy cap
    pub concurrency: f32,
}

impl WaveMultipliers {
    pub fn for_wave(wave: u32, waves: &WaveTuning) -> Self {
        let steps = wave.saturating_sub(1) as f32;
        Self {
            speed: 1.0 + steps * waves.speed_increment,
            score: 1.0 + steps * waves.score_increment,
            concurrency: 1.0 + steps * waves.concurrency_increment,
        }
    }
}

impl Default for WaveMultipliers {
    fn default() -> Self {
        Self {
            speed: 1.0,
            score: 1.0,
            concurrency: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaveState {
    /// 1-based; 0 before the first wave starts
    pub number: u32,
    pub enemies_in_wave: u32,
    /// Enemies spawned so far this wave
    pub spawned: u32,
    /// Enemies not yet defeated; only ever decreases within a wave
    pub remaining: u32,
    pub active: bool,
    pub started_at: f64,
    pub completed_at: Option<f64>,
    pub multipliers: WaveMultipliers,
}

impl WaveState {
    /// Quota still to be spawned this wave
    pub fn left_to_spawn(&self) -> u32 {
        self.enemies_in_wave.saturating_sub(self.spawned)
    }

    /// Count one defeat. Returns false if nothing was outstanding.
    pub fn record_defeat(&mut self) -> bool {
        if self.remaining == 0 {
            log::warn!("Enemy defeat recorded with none remaining in wave {}", self.number);
            return false;
        }
        self.remaining -= 1;
        true
    }

    pub fn max_concurrent(&self, spawner: &SpawnerTuning) -> usize {
        ((spawner.base_max_concurrent as f32) * self.multipliers.concurrency).floor() as usize
    }
}

/// Enemies in wave `wave`: `base × growth^(wave - 1)`, rounded, at least 1
pub fn wave_quota(wave: u32, tuning: &WaveTuning) -> u32 {
    let exp = wave.saturating_sub(1) as i32;
    let quota = tuning.base_quota * tuning.growth_rate.powi(exp);
    quota.round().max(1.0) as u32
}

/// Effective spawn interval for a wave: the base shrinks linearly, down to
/// `min_ratio` of itself, and never below `min_interval`
pub fn spawn_interval(wave: u32, spawner: &SpawnerTuning) -> f32 {
    let steps = wave.saturating_sub(1) as f32;
    let ratio = (1.0 - steps * spawner.reduction_per_wave).max(spawner.min_ratio);
    (spawner.base_interval * ratio).max(spawner.min_interval)
}

/// Bonus for clearing `wave`; the first wave earns none
pub fn wave_bonus(wave: u32, tuning: &WaveTuning) -> u64 {
    if wave <= 1 {
        return 0;
    }
    let exp = (wave - 1) as i32;
    (tuning.base_bonus * tuning.bonus_diminishing.powi(exp)).round().max(0.0) as u64
}

/// Tier draw table for a wave
pub fn tier_weights(wave: u32) -> &'static [(EnemyTier, f64)] {
    use EnemyTier::*;
    match wave {
        0..=2 => &[(One, 1.0)],
        3..=4 => &[(One, 0.6), (Two, 0.4)],
        5..=6 => &[(One, 0.3), (Two, 0.7)],
        7..=8 => &[(Two, 0.5), (Three, 0.5)],
        9..=10 => &[(Two, 0.3), (Three, 0.6), (Four, 0.1)],
        11..=12 => &[(Three, 0.4), (Four, 0.6)],
        13..=15 => &[(Three, 0.2), (Four, 0.6), (Five, 0.2)],
        _ => &[(Four, 0.4), (Five, 0.6)],
    }
}

/// Weighted random tier for a wave
pub fn pick_tier<R: Rng + ?Sized>(wave: u32, rng: &mut R) -> EnemyTier {
    let table = tier_weights(wave);
    match WeightedIndex::<f64>::new(table.iter().map(|(_, w)| *w)) {
        Ok(dist) => table[dist.sample(rng)].0,
        Err(err) => {
            log::warn!("Tier table for wave {wave} unusable ({err}), using first entry");
            table.first().map_or(EnemyTier::One, |(tier, _)| *tier)
        }
    }
}

/// Begin wave `number` at clock time `now`
pub fn start_wave(state: &mut GameState, number: u32, now: f64) {
    let quota = wave_quota(number, &state.tuning.wave);
    state.wave = WaveState {
        number,
        enemies_in_wave: quota,
        spawned: 0,
        remaining: quota,
        active: true,
        started_at: now,
        completed_at: None,
        multipliers: WaveMultipliers::for_wave(number, &state.tuning.wave),
    };
    state.spawner.reset(now);
    state.world.events.push(GameEvent::WaveStarted { wave: number });
    log::info!("Wave {number} started ({quota} enemies)");
}

fn complete_wave(state: &mut GameState, now: f64) {
    let number = state.wave.number;
    state.wave.active = false;
    state.wave.completed_at = Some(now);

    let choices = match state.world.players.get_mut(state.player) {
        Some(player) => {
            player.progression.waves_completed += 1;
            player.progression.generate_choices(&mut state.rng)
        }
        None => {
            log::warn!("Wave {number} completed without a player");
            Vec::new()
        }
    };

    let bonus = wave_bonus(number, &state.tuning.wave);
    if bonus > 0 {
        state.world.events.push(GameEvent::WaveBonus { points: bonus });
        state.add_score(bonus);
    }

    log::info!("Wave {number} complete (bonus {bonus}, choices {choices:?})");
    if !choices.is_empty() {
        let due = now + f64::from(state.tuning.wave.upgrade_prompt_delay);
        state.world.events.schedule(
            due,
            GameEvent::ShowUpgradeChoice {
                choices: choices.clone(),
            },
        );
    }
    state.pending_upgrades = choices;
}

/// Detect wave completion and start the next wave after the breather
pub fn update(state: &mut GameState, ctx: &SimulationContext) {
    if ctx.paused {
        return;
    }
    if state.wave.active {
        if state.wave.remaining == 0 {
            complete_wave(state, ctx.now);
        }
        return;
    }
    let Some(done_at) = state.wave.completed_at else {
        return;
    };
    if ctx.now - done_at >= f64::from(state.tuning.wave.inter_wave_delay) {
        let next = state.wave.number + 1;
        start_wave(state, next, ctx.now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tuning;
    use crate::sim::clock::SimClock;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn ctx_at(now: f64) -> SimulationContext {
        SimulationContext {
            paused: false,
            now,
            dt: 1.0 / 60.0,
            frame: 0,
        }
    }

    #[test]
    fn quota_grows_exponentially() {
        let tuning = WaveTuning::default();
        assert_eq!(wave_quota(1, &tuning), 5);
        assert_eq!(wave_quota(2, &tuning), 6);
        assert_eq!(wave_quota(3, &tuning), 8);
        assert_eq!(wave_quota(5, &tuning), 12);
    }

    #[test]
    fn interval_is_floored() {
        let spawner = SpawnerTuning::default();
        assert!((spawn_interval(1, &spawner) - 1.5).abs() < 1e-6);
        assert!((spawn_interval(5, &spawner) - 0.9).abs() < 1e-6);
        // ratio floor: 1.5 * 0.3
        assert!((spawn_interval(40, &spawner) - 0.45).abs() < 1e-6);
    }

    #[test]
    fn bonus_skips_first_wave() {
        let tuning = WaveTuning::default();
        assert_eq!(wave_bonus(1, &tuning), 0);
        assert_eq!(wave_bonus(2, &tuning), 90);
        assert_eq!(wave_bonus(3, &tuning), 81);
    }

    #[test]
    fn tier_table_weights_sum_to_one() {
        for wave in 1..=20 {
            let total: f64 = tier_weights(wave).iter().map(|(_, w)| w).sum();
            assert!((total - 1.0).abs() < 1e-9, "wave {wave}");
        }
    }

    #[test]
    fn late_waves_never_draw_tier_one() {
        let mut rng = Pcg32::seed_from_u64(3);
        for _ in 0..500 {
            assert!(pick_tier(16, &mut rng) >= EnemyTier::Four);
        }
    }

    #[test]
    fn wave_completes_then_next_starts_after_delay() {
        let mut state = GameState::new(9, Tuning::default()).unwrap();
        state.drain_events();
        state.wave.remaining = 0;

        update(&mut state, &ctx_at(10.0));
        assert!(!state.wave.active);
        assert_eq!(state.wave.completed_at, Some(10.0));
        assert_eq!(state.pending_upgrades.len(), 3);
        assert_eq!(state.world.events.deferred_len(), 1);

        update(&mut state, &ctx_at(14.9));
        assert_eq!(state.wave.number, 1);

        update(&mut state, &ctx_at(15.0));
        assert_eq!(state.wave.number, 2);
        assert!(state.wave.active);
        assert_eq!(state.wave.remaining, 6);
        assert!(state.drain_events().contains(&GameEvent::WaveStarted { wave: 2 }));
    }

    #[test]
    fn second_wave_clear_awards_bonus() {
        let mut state = GameState::new(9, Tuning::default()).unwrap();
        start_wave(&mut state, 2, 0.0);
        state.drain_events();
        state.wave.remaining = 0;
        update(&mut state, &ctx_at(1.0));
        assert_eq!(state.score(), 90);
        let events = state.drain_events();
        assert_eq!(events[0], GameEvent::WaveBonus { points: 90 });
        assert_eq!(events[1], GameEvent::ScoreChanged { total: 90 });
    }

    #[test]
    fn paused_context_does_nothing() {
        let mut state = GameState::new(9, Tuning::default()).unwrap();
        state.wave.remaining = 0;
        let ctx = SimulationContext::from_clock(&SimClock::new(), 0.1, true);
        update(&mut state, &ctx);
        assert!(state.wave.active);
    }

    #[test]
    fn defeat_never_underflows() {
        let mut wave = WaveState {
            remaining: 1,
            ..WaveState::default()
        };
        assert!(wave.record_defeat());
        assert!(!wave.record_defeat());
        assert_eq!(wave.remaining, 0);
    }
}
