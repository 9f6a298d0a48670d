//! Pre-match queue and countdown.
//!
//! Players pool up while no match runs. Reaching the minimum starts a
//! countdown; hitting zero hands the roster to the engine. Dropping back
//! below the minimum cancels the countdown, and operators can pause, resume,
//! or restart it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use blast_core::participant::ParticipantId;

use crate::RosterEntry;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    pub countdown_secs: u64,
    pub min_players: usize,
    pub max_players: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            countdown_secs: 30,
            min_players: 2,
            max_players: 16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueuePhase {
    #[default]
    Waiting,
    Countdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined(usize),
    AlreadyQueued,
    MatchInProgress,
    Full,
}

/// What one countdown second produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueTick {
    Idle,
    /// Announce the remaining seconds to the queued players.
    Announce(u64),
    /// The countdown lost too many players and was called off.
    Cancelled,
    /// Countdown finished: seat this roster.
    Launch(Vec<RosterEntry>),
}

#[derive(Debug, Default)]
pub struct QueueCoordinator {
    config: QueueConfig,
    pool: Vec<RosterEntry>,
    phase: QueuePhase,
    seconds_left: u64,
    paused: bool,
}

impl QueueCoordinator {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            pool: Vec::new(),
            phase: QueuePhase::Waiting,
            seconds_left: 0,
            paused: false,
        }
    }

    /// Add a player to the pool. Joining is refused while a match runs so
    /// mid-match arrivals spectate instead of corrupting the roster.
    pub fn handle_join(
        &mut self,
        id: ParticipantId,
        name: impl Into<String>,
        match_active: bool,
    ) -> JoinOutcome {
        if match_active {
            return JoinOutcome::MatchInProgress;
        }
        if self.pool.iter().any(|e| e.id == id) {
            return JoinOutcome::AlreadyQueued;
        }
        if self.pool.len() >= self.config.max_players {
            return JoinOutcome::Full;
        }
        self.pool.push(RosterEntry {
            id,
            name: name.into(),
        });
        if self.phase == QueuePhase::Waiting && self.pool.len() >= self.config.min_players {
            self.phase = QueuePhase::Countdown;
            self.seconds_left = self.config.countdown_secs;
            debug!(players = self.pool.len(), "queue countdown started");
        }
        JoinOutcome::Joined(self.pool.len())
    }

    /// Drop a player from the pool. Returns true when this cancelled an
    /// active countdown.
    pub fn handle_quit(&mut self, id: ParticipantId) -> bool {
        let before = self.pool.len();
        self.pool.retain(|e| e.id != id);
        if self.pool.len() == before {
            return false;
        }
        if self.phase == QueuePhase::Countdown && self.pool.len() < self.config.min_players {
            self.phase = QueuePhase::Waiting;
            self.seconds_left = 0;
            debug!("queue countdown cancelled, not enough players");
            return true;
        }
        false
    }

    /// Advance the countdown by one second.
    pub fn tick_second(&mut self) -> QueueTick {
        if self.paused || self.phase == QueuePhase::Waiting {
            return QueueTick::Idle;
        }
        if self.pool.len() < self.config.min_players {
            self.phase = QueuePhase::Waiting;
            self.seconds_left = 0;
            return QueueTick::Cancelled;
        }
        self.seconds_left = self.seconds_left.saturating_sub(1);
        if self.seconds_left == 0 {
            self.phase = QueuePhase::Waiting;
            return QueueTick::Launch(std::mem::take(&mut self.pool));
        }
        if self.seconds_left % 10 == 0 || self.seconds_left <= 5 {
            return QueueTick::Announce(self.seconds_left);
        }
        QueueTick::Idle
    }

    /// Put a roster back after a refused launch. The countdown stays off
    /// until the pool changes again.
    pub fn requeue(&mut self, roster: Vec<RosterEntry>) {
        self.pool = roster;
        self.phase = QueuePhase::Waiting;
        self.seconds_left = 0;
    }

    /// Freeze the countdown in place.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Rewind an active countdown to its full duration.
    pub fn restart(&mut self) {
        if self.phase == QueuePhase::Countdown {
            self.seconds_left = self.config.countdown_secs;
        }
    }

    pub fn phase(&self) -> QueuePhase {
        self.phase
    }

    pub fn seconds_left(&self) -> u64 {
        self.seconds_left
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.pool.iter().any(|e| e.id == id)
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}
