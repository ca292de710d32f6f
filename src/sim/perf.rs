//! Performance governor
//!
//! Tracks a rolling FPS estimate and the live enemy count, and flips into
//! "aggressive" mode when either crosses its threshold. Consumers read the
//! derived knobs (collision cadence, batch size, cache refresh, distant
//! update throttling). Only frame cost changes; the rules do not.

use std::collections::VecDeque;

use crate::tuning::PerformanceTuning;

#[derive(Debug, Clone)]
pub struct PerformanceGovernor {
    settings: PerformanceTuning,
    /// Wall-clock timestamps of recent frames (seconds)
    frame_times: VecDeque<f64>,
    wall_time: f64,
    enemy_count: usize,
    aggressive: bool,
}

impl PerformanceGovernor {
    pub fn new(settings: PerformanceTuning) -> Self {
        Self {
            frame_times: VecDeque::with_capacity(settings.fps_window),
            settings,
            wall_time: 0.0,
            enemy_count: 0,
            aggressive: false,
        }
    }

    /// Record one rendered frame of `real_dt` wall seconds.
    ///
    /// Runs even while paused so the estimate stays current.
    pub fn record_frame(&mut self, real_dt: f32) {
        if real_dt.is_finite() && real_dt > 0.0 {
            self.wall_time += f64::from(real_dt);
        }
        self.frame_times.push_back(self.wall_time);
        while self.frame_times.len() > self.settings.fps_window {
            self.frame_times.pop_front();
        }
        self.reevaluate();
    }

    pub fn set_enemy_count(&mut self, count: usize) {
        self.enemy_count = count;
        self.reevaluate();
    }

    /// Frames per second over the window, once two frames exist
    pub fn fps(&self) -> Option<f32> {
        let (first, last) = (self.frame_times.front()?, self.frame_times.back()?);
        let elapsed = last - first;
        if self.frame_times.len() < 2 || elapsed <= 0.0 {
            return None;
        }
        Some(((self.frame_times.len() - 1) as f64 / elapsed) as f32)
    }

    fn reevaluate(&mut self) {
        let was = self.aggressive;
        let slow = self.fps().is_some_and(|fps| fps < self.settings.low_fps);
        let crowded = self.enemy_count > self.settings.high_enemy_count;
        self.aggressive = self.settings.enabled && (slow || crowded);
        if was != self.aggressive {
            log::debug!(
                "Performance governor {} (fps {:?}, enemies {})",
                if self.aggressive { "engaged" } else { "released" },
                self.fps(),
                self.enemy_count
            );
        }
    }

    pub fn is_aggressive(&self) -> bool {
        self.aggressive
    }

    /// Frames between enemy-enemy collision passes
    pub fn collision_interval(&self) -> u64 {
        if !self.settings.enabled {
            1
        } else if self.aggressive {
            self.settings.aggressive_collision_interval
        } else {
            self.settings.collision_interval
        }
    }

    /// Enemies processed per enemy-enemy pass
    pub fn batch_size(&self) -> usize {
        if !self.settings.enabled {
            usize::MAX
        } else if self.aggressive {
            self.settings.aggressive_batch_size.max(1)
        } else {
            self.settings.batch_size.max(1)
        }
    }

    /// Frames between rebuilds of the collision candidate cache
    pub fn cache_refresh_frames(&self) -> u64 {
        if !self.settings.enabled {
            1
        } else if self.aggressive {
            self.settings.aggressive_cache_refresh_frames.max(1)
        } else {
            self.settings.cache_refresh_frames.max(1)
        }
    }

    /// Distance beyond which an enemy counts as distant, if LOD is active
    pub fn lod_distance(&self) -> Option<f32> {
        self.aggressive.then_some(self.settings.lod_distance)
    }

    /// Frame stride for distant enemies (1 when not throttling)
    pub fn distant_stride(&self) -> u64 {
        if self.aggressive {
            self.settings.distant_update_every.max(1)
        } else {
            1
        }
    }

    /// Whether an entity at `distance` from the player updates this frame.
    ///
    /// `salt` staggers entities so throttled ones don't all update together.
    pub fn should_update(&self, distance: f32, frame: u64, salt: u64) -> bool {
        match self.lod_distance() {
            Some(lod) if distance > lod => (frame + salt) % self.distant_stride() == 0,
            _ => true,
        }
    }
}
