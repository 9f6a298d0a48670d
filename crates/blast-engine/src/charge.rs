//! Wind-up tracking for charged abilities.
//!
//! A charge is begun when a participant starts holding an ability, completes
//! after its full wind-up has elapsed, and is cancelled if the holder gets
//! eliminated mid-wind-up. The host polls and consumes terminal states; the
//! table never fires anything itself.

use std::collections::HashMap;

use blast_core::participant::ParticipantId;

/// One participant's wind-up state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeState {
    Idle,
    Charging { started_ms: u64, duration_ms: u64 },
    Completed,
    Cancelled,
}

#[derive(Debug, Default)]
pub struct ChargeTable {
    states: HashMap<ParticipantId, ChargeState>,
}

impl ChargeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, id: ParticipantId) -> ChargeState {
        self.states.get(&id).copied().unwrap_or(ChargeState::Idle)
    }

    /// Begin a wind-up. A participant already charging keeps their original
    /// start; terminal states must be consumed before a new charge begins.
    pub fn begin(&mut self, id: ParticipantId, duration_ms: u64, now_ms: u64) -> bool {
        match self.state(id) {
            ChargeState::Idle => {
                self.states.insert(
                    id,
                    ChargeState::Charging {
                        started_ms: now_ms,
                        duration_ms: duration_ms.max(1),
                    },
                );
                true
            }
            _ => false,
        }
    }

    /// Advance the state machine: a wind-up whose duration has elapsed
    /// becomes `Completed`. Returns the state after the transition.
    pub fn poll(&mut self, id: ParticipantId, now_ms: u64) -> ChargeState {
        if let ChargeState::Charging {
            started_ms,
            duration_ms,
        } = self.state(id)
            && now_ms.saturating_sub(started_ms) >= duration_ms
        {
            self.states.insert(id, ChargeState::Completed);
        }
        self.state(id)
    }

    /// Cancel an in-flight wind-up. Completed charges stay completed; a
    /// finished ability is owed its effect even if the holder dies after.
    pub fn request_cancel(&mut self, id: ParticipantId) {
        if matches!(self.state(id), ChargeState::Charging { .. }) {
            self.states.insert(id, ChargeState::Cancelled);
        }
    }

    /// Take a terminal state, resetting the participant to `Idle`. Returns
    /// `None` while idle or still charging.
    pub fn consume(&mut self, id: ParticipantId) -> Option<ChargeState> {
        match self.state(id) {
            terminal @ (ChargeState::Completed | ChargeState::Cancelled) => {
                self.states.insert(id, ChargeState::Idle);
                Some(terminal)
            }
            _ => None,
        }
    }

    pub fn clear_participant(&mut self, id: ParticipantId) {
        self.states.remove(&id);
    }

    pub fn clear_all(&mut self) {
        self.states.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blast_core::test_helpers::pid;

    #[test]
    fn charge_completes_after_duration() {
        let mut table = ChargeTable::new();
        assert!(table.begin(pid(1), 1_000, 0));
        assert!(matches!(table.poll(pid(1), 999), ChargeState::Charging { .. }));
        assert_eq!(table.poll(pid(1), 1_000), ChargeState::Completed);
    }

    #[test]
    fn begin_while_charging_is_refused() {
        let mut table = ChargeTable::new();
        assert!(table.begin(pid(1), 1_000, 0));
        assert!(!table.begin(pid(1), 500, 100));
        assert_eq!(table.poll(pid(1), 1_000), ChargeState::Completed);
    }

    #[test]
    fn cancel_only_affects_in_flight_charges() {
        let mut table = ChargeTable::new();
        table.request_cancel(pid(1));
        assert_eq!(table.state(pid(1)), ChargeState::Idle);

        table.begin(pid(1), 1_000, 0);
        table.poll(pid(1), 2_000);
        table.request_cancel(pid(1));
        assert_eq!(table.state(pid(1)), ChargeState::Completed);

        table.clear_all();
        table.begin(pid(1), 1_000, 0);
        table.request_cancel(pid(1));
        assert_eq!(table.state(pid(1)), ChargeState::Cancelled);
    }

    #[test]
    fn consume_resets_to_idle() {
        let mut table = ChargeTable::new();
        table.begin(pid(1), 100, 0);
        assert_eq!(table.consume(pid(1)), None);
        table.poll(pid(1), 100);
        assert_eq!(table.consume(pid(1)), Some(ChargeState::Completed));
        assert_eq!(table.state(pid(1)), ChargeState::Idle);
        assert!(table.begin(pid(1), 100, 200));
    }
}
