//! Typed event queue
//!
//! Systems push events while they run; the presentation layer drains the
//! queue once per frame after every system has finished, so observers never
//! see a half-updated frame. Deferred events wait in a separate list until
//! the simulation clock reaches their due time.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::components::{EnemyTier, PowerUpKind};
use super::progression::UpgradeKind;
use super::world::Entity;

/// Everything the simulation tells the outside world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Enemy knocked off and removed; payload is the points awarded
    EnemyDefeated { score: u64 },
    /// Player finished falling (game over trigger)
    PlayerFell,
    ScoreChanged { total: u64 },
    WaveStarted { wave: u32 },
    WaveBonus { points: u64 },
    ShowUpgradeChoice { choices: Vec<UpgradeKind> },
    PlayerUpgraded { upgrade: UpgradeKind },
    PowerUpCollected { name: String },
    TimeSlowActivated { end_time: f64, duration: f32 },
    /// Impact sound cue
    PlayerEnemyCollision,

    /// Player should face the enemy and play its attack animation
    PlayerAttack { enemy: Entity },
    ShockwaveTriggered { origin: Vec3, radius: f32 },
    TimeSlowEnded,
    EnemySpawned { tier: EnemyTier },
    LootBoxSpawned { kind: PowerUpKind },
    LootBoxExpired { kind: PowerUpKind },
    GameOver { score: u64, wave: u32 },
}

#[derive(Debug, Clone)]
struct Deferred {
    due: f64,
    event: GameEvent,
}

/// Per-frame event buffer with deferred one-shot posts
#[derive(Debug, Default)]
pub struct EventQueue {
    ready: Vec<GameEvent>,
    deferred: Vec<Deferred>,
}

impl EventQueue {
    /// Post an event visible at the end of this frame
    pub fn push(&mut self, event: GameEvent) {
        self.ready.push(event);
    }

    /// Post an event once the simulation clock reaches `due`
    pub fn schedule(&mut self, due: f64, event: GameEvent) {
        self.deferred.push(Deferred { due, event });
    }

    /// Move deferred events whose time has come into the ready buffer.
    ///
    /// Called at the tick boundary; preserves scheduling order among events
    /// that become due on the same frame.
    pub fn promote_due(&mut self, now: f64) {
        if self.deferred.is_empty() {
            return;
        }
        let (due, pending): (Vec<_>, Vec<_>) =
            self.deferred.drain(..).partition(|d| d.due <= now);
        self.deferred = pending;
        self.ready.extend(due.into_iter().map(|d| d.event));
    }

    /// Take every ready event
    pub fn drain(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.ready)
    }

    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_empties_queue() {
        let mut q = EventQueue::default();
        q.push(GameEvent::PlayerFell);
        q.push(GameEvent::ScoreChanged { total: 5 });
        assert_eq!(q.drain().len(), 2);
        assert!(q.drain().is_empty());
    }

    #[test]
    fn deferred_waits_for_clock() {
        let mut q = EventQueue::default();
        q.schedule(2.0, GameEvent::WaveStarted { wave: 2 });
        q.schedule(1.0, GameEvent::WaveStarted { wave: 1 });

        q.promote_due(0.5);
        assert!(q.drain().is_empty());

        q.promote_due(1.0);
        assert_eq!(q.drain(), vec![GameEvent::WaveStarted { wave: 1 }]);
        assert_eq!(q.deferred_len(), 1);

        q.promote_due(5.0);
        assert_eq!(q.drain(), vec![GameEvent::WaveStarted { wave: 2 }]);
        assert_eq!(q.deferred_len(), 0);
    }
}
