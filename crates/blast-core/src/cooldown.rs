use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::participant::ParticipantId;

/// Action kinds with independent cooldowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CooldownKind {
    Basic,
    Big,
    Scatter,
    Range,
    Strike,
    Dash,
}

#[derive(Debug, Clone, Copy)]
struct CooldownEntry {
    ends_at_ms: u64,
    duration_ms: u64,
}

/// Per-participant, per-action-kind timer store. Pure time arithmetic: every
/// query takes an explicit `now_ms`, nothing here reads a clock. Entries are
/// overwritten on use and never deleted; a stale entry simply reads as ready.
#[derive(Debug, Default)]
pub struct CooldownTracker {
    entries: HashMap<(ParticipantId, CooldownKind), CooldownEntry>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a cooldown expiring at `now_ms + duration_ms`. Durations are
    /// clamped to at least 1 ms so a zero or negative input can never make
    /// an action instantly reusable.
    pub fn start(&mut self, id: ParticipantId, kind: CooldownKind, duration_ms: u64, now_ms: u64) {
        let duration = duration_ms.max(1);
        self.entries.insert(
            (id, kind),
            CooldownEntry {
                ends_at_ms: now_ms.saturating_add(duration),
                duration_ms: duration,
            },
        );
    }

    pub fn is_ready(&self, id: ParticipantId, kind: CooldownKind, now_ms: u64) -> bool {
        self.remaining_ms(id, kind, now_ms) == 0
    }

    pub fn remaining_ms(&self, id: ParticipantId, kind: CooldownKind, now_ms: u64) -> u64 {
        match self.entries.get(&(id, kind)) {
            Some(entry) => entry.ends_at_ms.saturating_sub(now_ms),
            None => 0,
        }
    }

    pub fn duration_ms(&self, id: ParticipantId, kind: CooldownKind) -> u64 {
        self.entries
            .get(&(id, kind))
            .map_or(0, |entry| entry.duration_ms)
    }

    /// Fraction of the cooldown elapsed, clamped to `[0, 1]`. No entry or an
    /// expired entry reads as 1.0.
    pub fn progress(&self, id: ParticipantId, kind: CooldownKind, now_ms: u64) -> f64 {
        let duration = self.duration_ms(id, kind);
        if duration == 0 {
            return 1.0;
        }
        let remaining = self.remaining_ms(id, kind, now_ms);
        if remaining == 0 {
            return 1.0;
        }
        (1.0 - remaining as f64 / duration as f64).clamp(0.0, 1.0)
    }

    /// Drop every entry for one participant (quit or match end).
    pub fn clear_participant(&mut self, id: ParticipantId) {
        self.entries.retain(|(pid, _), _| *pid != id);
    }

    pub fn clear_all(&mut self) {
        self.entries.clear();
    }
}
