//! Arena Push headless driver
//!
//! Runs the simulation in idle mode (autopilot) for a fixed stretch of
//! simulated time and logs what happened. Usage:
//!
//! ```text
//! arena-push [SECONDS] [TUNING_JSON] [SEED]
//! ```
//!
//! Set `RUST_LOG=debug` to see spawns, pickups and governor changes.

use std::process::ExitCode;
use std::time::Instant;

use arena_push::consts::*;
use arena_push::sim::{GameEvent, GamePhase, GameState, TickInput, tick};
use arena_push::{SimError, Tuning};

/// Game instance holding all state
struct Game {
    state: GameState,
    accumulator: f32,
    last_frame: Instant,
    input: TickInput,
    upgrades_taken: u32,
}

impl Game {
    fn new(seed: u64, tuning: Tuning) -> Result<Self, SimError> {
        Ok(Self {
            state: GameState::new(seed, tuning)?,
            accumulator: 0.0,
            last_frame: Instant::now(),
            input: TickInput {
                idle_mode: true,
                ..Default::default()
            },
            upgrades_taken: 0,
        })
    }

    /// Run simulation ticks for one rendered frame
    fn update(&mut self, dt: f32) {
        let dt = dt.min(0.1);
        self.accumulator += dt;

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            tick(&mut self.state, &self.input, SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;
            self.handle_events();
        }

        // Track real frame time for the performance governor
        let now = Instant::now();
        let real_dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.state.governor.record_frame(real_dt);
    }

    fn handle_events(&mut self) {
        for event in self.state.drain_events() {
            match event {
                GameEvent::WaveStarted { wave } => log::info!("Wave {wave}"),
                GameEvent::WaveBonus { points } => log::info!("Wave bonus +{points}"),
                GameEvent::ShowUpgradeChoice { choices } => {
                    // Autopilot takes the first offer
                    if let Some(choice) = choices.first().copied() {
                        match self.state.choose_upgrade(choice) {
                            Ok(_) => self.upgrades_taken += 1,
                            Err(err) => log::warn!("Upgrade failed: {err}"),
                        }
                    }
                }
                GameEvent::PowerUpCollected { name } => log::info!("Collected {name}"),
                GameEvent::GameOver { score, wave } => {
                    log::info!("Game over at wave {wave} with {score} points")
                }
                other => log::trace!("{other:?}"),
            }
        }
    }
}

fn load_tuning(path: Option<&str>) -> Result<Tuning, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)?;
            Ok(Tuning::from_json(&json)?)
        }
        None => Ok(Tuning::default()),
    }
}

fn main() -> ExitCode {
    env_logger::init();
    log::info!("Arena Push (headless) starting...");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let seconds: f32 = args.first().and_then(|s| s.parse().ok()).unwrap_or(120.0);
    let seed: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(42);

    let tuning = match load_tuning(args.get(1).map(String::as_str)) {
        Ok(tuning) => tuning,
        Err(err) => {
            log::error!("Could not load tuning: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut game = match Game::new(seed, tuning) {
        Ok(game) => game,
        Err(err) => {
            log::error!("Could not start game: {err}");
            return ExitCode::FAILURE;
        }
    };
    log::info!("Game initialized with seed: {seed}");

    let frames = (seconds / SIM_DT).ceil() as u64;
    for _ in 0..frames {
        game.update(SIM_DT);
        if game.state.phase == GamePhase::GameOver {
            break;
        }
    }

    let state = &game.state;
    println!(
        "seed {seed}: {:.1}s simulated, wave {}, score {}, {} enemies on platform, {} upgrades, {}",
        state.now(),
        state.wave.number,
        state.score(),
        state.world.enemy_count(),
        game.upgrades_taken,
        if state.phase == GamePhase::GameOver {
            "player fell"
        } else {
            "still standing"
        }
    );
    ExitCode::SUCCESS
}
