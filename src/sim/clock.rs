//! Simulation time
//!
//! Every timer in the game compares against [`SimClock::now`], which only
//! advances while the game is running. Pausing therefore freezes fall
//! animations, power-up windows, cooldowns and deferred events alike.

/// Pausable simulation clock
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now: f64,
    frame: u64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulation seconds elapsed while unpaused
    #[inline]
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Frames simulated while unpaused
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Advance by one frame. Negative or non-finite deltas are ignored.
    pub fn advance(&mut self, dt: f32) {
        if dt.is_finite() && dt > 0.0 {
            self.now += f64::from(dt);
        }
        self.frame += 1;
    }
}

/// Read-only frame parameters handed to every system
#[derive(Debug, Clone, Copy)]
pub struct SimulationContext {
    /// Systems must no-op when set
    pub paused: bool,
    pub now: f64,
    pub dt: f32,
    pub frame: u64,
}

impl SimulationContext {
    pub fn from_clock(clock: &SimClock, dt: f32, paused: bool) -> Self {
        Self {
            paused,
            now: clock.now(),
            dt: if paused { 0.0 } else { dt },
            frame: clock.frame(),
        }
    }
}
