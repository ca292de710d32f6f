//! Property tests for the simulation rules

use arena_push::Tuning;
use arena_push::sim::clock::SimulationContext;
use arena_push::sim::collision::player_enemy_impulses;
use arena_push::sim::components::{EnemyTier, PhysicsBody, PlatformConstraint, Transform};
use arena_push::sim::falling::{self, begin_fall, complete_enemy_fall};
use arena_push::sim::physics::{StepOutcome, integrate};
use arena_push::sim::spawner::spawn_enemy_of_tier;
use arena_push::sim::wave::{pick_tier, spawn_interval, tier_weights, wave_quota};
use arena_push::sim::{GameEvent, GameState, ProgressionState, PushParams, UpgradeKind};
use arena_push::tuning::{PhysicsTuning, ProgressionTuning, SpawnerTuning, WaveTuning};
use glam::Vec3;
use proptest::prelude::*;
use rand::SeedableRng;
use rand_pcg::Pcg32;

fn upgrade_kind() -> impl Strategy<Value = UpgradeKind> {
    prop::sample::select(UpgradeKind::ALL.to_vec())
}

proptest! {
    #[test]
    fn friction_scales_velocity_each_frame(
        friction in 0.01f32..0.99,
        vx in -20.0f32..20.0,
        vz in -20.0f32..20.0,
    ) {
        let mut body = PhysicsBody::new(1.0, friction).unwrap();
        body.velocity = Vec3::new(vx, 0.0, vz);
        let mut transform = Transform::default();
        let platform = PlatformConstraint { center: Vec3::ZERO, half_size: 100.0, surface_y: 0.0 };

        let outcome = integrate(&mut body, &mut transform, Some(&platform), &PhysicsTuning::default(), 1.0 / 60.0);
        prop_assert_eq!(outcome, StepOutcome::Grounded);
        prop_assert!((body.velocity.x - vx * friction).abs() < 1e-4);
        prop_assert!((body.velocity.z - vz * friction).abs() < 1e-4);
    }

    #[test]
    fn friction_decay_never_speeds_up_and_settles(
        friction in 0.05f32..0.99,
        vx in -20.0f32..20.0,
        vz in -20.0f32..20.0,
    ) {
        let mut body = PhysicsBody::new(1.0, friction).unwrap();
        body.velocity = Vec3::new(vx, 0.0, vz);
        let mut transform = Transform::default();
        let platform = PlatformConstraint { center: Vec3::ZERO, half_size: 1000.0, surface_y: 0.0 };
        let tuning = PhysicsTuning::default();

        // Ticks until speed * friction^n drops under the rest threshold
        let rest = 1e-3f32;
        let start = body.velocity.length();
        let bound = ((start.max(rest) / rest).ln() / -friction.ln()).ceil() as usize + 1;

        let mut last = start;
        for _ in 0..bound {
            integrate(&mut body, &mut transform, Some(&platform), &tuning, 1.0 / 60.0);
            let speed = body.velocity.length();
            prop_assert!(speed <= last);
            last = speed;
        }
        prop_assert!(last < rest * 1.01, "speed {} after {} ticks", last, bound);
    }

    #[test]
    fn symmetric_push_is_equal_and_opposite(
        ex in -3.0f32..3.0,
        ez in -3.0f32..3.0,
        strength in 0.1f32..3.0,
        mass in 0.5f32..4.0,
    ) {
        let params = PushParams { strength, pusher_mass: mass, target_mass: mass, target_resistance: 1.0 };
        let (on_player, on_enemy) =
            player_enemy_impulses(Vec3::ZERO, Vec3::new(ex, 0.0, ez), 12.0, &params, &params);
        prop_assert!((on_player + on_enemy).length() < 1e-4);
        prop_assert!((on_enemy.length() - 12.0 * strength).abs() < 1e-3);
        prop_assert_eq!(on_enemy.y, 0.0);
    }

    #[test]
    fn resistance_divides_impulse(resistance in 0.5f32..5.0) {
        let base = PushParams { strength: 0.3, pusher_mass: 1.0, target_mass: 1.0, target_resistance: 1.0 };
        let resisted = PushParams { target_resistance: resistance, ..base };
        let (weak, _) = player_enemy_impulses(Vec3::ZERO, Vec3::X, 12.0, &base, &base);
        let (strong, _) = player_enemy_impulses(Vec3::ZERO, Vec3::X, 12.0, &resisted, &base);
        prop_assert!((strong.length() * resistance - weak.length()).abs() < 1e-4);
    }

    #[test]
    fn quota_never_shrinks(wave in 1u32..40, growth in 1.0f32..1.6) {
        let tuning = WaveTuning { growth_rate: growth, ..WaveTuning::default() };
        prop_assert!(wave_quota(wave + 1, &tuning) >= wave_quota(wave, &tuning));
    }

    #[test]
    fn spawn_interval_floored_and_non_increasing(wave in 1u32..60) {
        let spawner = SpawnerTuning::default();
        let now = spawn_interval(wave, &spawner);
        prop_assert!(now >= spawner.min_interval);
        prop_assert!(spawn_interval(wave + 1, &spawner) <= now);
    }

    #[test]
    fn drawn_tier_is_in_wave_table(wave in 1u32..30, seed in any::<u64>()) {
        let mut rng = Pcg32::seed_from_u64(seed);
        let tier = pick_tier(wave, &mut rng);
        prop_assert!(tier_weights(wave).iter().any(|(t, _)| *t == tier));
    }

    #[test]
    fn upgrades_diminish_and_cap(kind in upgrade_kind(), picks in 1usize..10) {
        let tuning = ProgressionTuning::default();
        let mut state = ProgressionState::default();
        let mut last = f32::INFINITY;
        for _ in 0..picks {
            if let Some(inc) = state.apply(kind, &tuning) {
                prop_assert!(inc < last);
                last = inc;
            }
        }
        let levels = picks.min(5) as i32;
        let expected: f32 = (0..levels)
            .map(|i| kind.base_increment(&tuning) * tuning.diminishing_factor.powi(i))
            .sum();
        prop_assert!((state.multiplier(kind) - 1.0 - expected).abs() < 1e-5);
        prop_assert!(state.level(kind) <= 5);
    }

    #[test]
    fn choices_are_distinct_and_not_maxed(
        levels in prop::collection::vec(0u32..=5, 5),
        seed in any::<u64>(),
    ) {
        let tuning = ProgressionTuning::default();
        let mut state = ProgressionState::default();
        for (kind, level) in UpgradeKind::ALL.into_iter().zip(levels) {
            for _ in 0..level {
                state.apply(kind, &tuning);
            }
        }
        let mut rng = Pcg32::seed_from_u64(seed);
        let choices = state.generate_choices(&mut rng);

        prop_assert_eq!(choices.len(), state.eligible().len().min(3));
        prop_assert!(choices.iter().all(|k| !state.is_maxed(*k)));
        let mut dedup = choices.clone();
        dedup.sort();
        dedup.dedup();
        prop_assert_eq!(dedup.len(), choices.len());
    }

    #[test]
    fn progression_survives_json(
        picks in prop::collection::vec(upgrade_kind(), 0..20),
        waves in 0u32..50,
    ) {
        let tuning = ProgressionTuning::default();
        let mut state = ProgressionState::default();
        for kind in picks {
            state.apply(kind, &tuning);
        }
        state.waves_completed = waves;

        let json = serde_json::to_string(&state).unwrap();
        let restored: ProgressionState = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(&restored, &state);
        for kind in UpgradeKind::ALL {
            prop_assert_eq!(restored.multiplier(kind), state.multiplier(kind));
            prop_assert_eq!(restored.level(kind), state.level(kind));
        }
    }

    #[test]
    fn fall_completion_applies_once(steps in prop::collection::vec(0.0f64..0.5, 1..40)) {
        let mut state = GameState::new(1, Tuning::default()).unwrap();
        let enemy =
            spawn_enemy_of_tier(&mut state, EnemyTier::One, Vec3::new(2.0, 0.0, 0.0)).unwrap();
        begin_fall(&mut state.world, enemy, 0.0);
        state.drain_events();

        let mut now = 0.0;
        let mut defeats = 0;
        for step in steps {
            now += step;
            let ctx = SimulationContext { paused: false, now, dt: 1.0 / 60.0, frame: 0 };
            falling::update(&mut state, &ctx);
            // Re-entrant cleanup must be a no-op
            complete_enemy_fall(&mut state, enemy);
            defeats += state
                .drain_events()
                .iter()
                .filter(|e| matches!(e, GameEvent::EnemyDefeated { .. }))
                .count();
        }
        prop_assert!(defeats <= 1);
        prop_assert_eq!(defeats == 1, now >= 1.0);
        prop_assert_eq!(state.score(), if defeats == 1 { 10 } else { 0 });
        prop_assert_eq!(state.world.is_alive(enemy), defeats == 0);
    }
}
