//! The simulation task.
//!
//! One tokio task owns the engine and the queue outright. Collaborators talk
//! to it over a command channel and consume the engine's side effects from an
//! event channel, so no lock ever guards match state. A 1 Hz interval drives
//! the queue countdown and the match clock; tests shrink the interval to keep
//! runs fast.

use std::collections::HashSet;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use blast_core::cooldown::CooldownKind;
use blast_core::events::EngineEvent;
use blast_core::map::{Location, MapStore};
use blast_core::participant::ParticipantId;
use blast_core::powerup::PowerupKind;
use blast_engine::combat::DamageKind;
use blast_engine::queue::{JoinOutcome, QueueConfig, QueueCoordinator, QueueTick};
use blast_engine::{EngineConfig, MatchEngine, PREFIX};

use crate::stats::MatchRecord;

/// Everything the simulation task needs up front.
pub struct SimSettings {
    pub engine: EngineConfig,
    pub queue: QueueConfig,
    pub map_store: MapStore,
    /// Preferred map; empty falls back to the first configured one.
    pub map_name: String,
    /// One wall second per tick in production.
    pub tick_interval: Duration,
    pub stats_tx: Option<mpsc::UnboundedSender<MatchRecord>>,
}

/// Commands sent from connection handlers to the simulation task.
#[derive(Debug)]
pub enum SimCommand {
    Join {
        id: ParticipantId,
        name: String,
    },
    Quit {
        id: ParticipantId,
    },
    Hit {
        attacker: ParticipantId,
        victim: ParticipantId,
        kind: DamageKind,
    },
    InstantElim {
        attacker: ParticipantId,
        victim: ParticipantId,
        kind: DamageKind,
    },
    Aoe {
        attacker: ParticipantId,
        center: Location,
        radius: f64,
        /// Victims already resolved by an earlier overlapping blast.
        exclude: Vec<ParticipantId>,
        kind: DamageKind,
    },
    UpdateLocation {
        id: ParticipantId,
        location: Location,
    },
    /// Gate an ability on its cooldown, arming it when ready.
    UseAbility {
        id: ParticipantId,
        kind: CooldownKind,
        base_ms: u64,
    },
    BeginCharge {
        id: ParticipantId,
        duration_ms: u64,
    },
    CancelCharge {
        id: ParticipantId,
    },
    Purchase {
        id: ParticipantId,
        kind: PowerupKind,
        cost: u32,
    },
    AddCurrency {
        id: ParticipantId,
        amount: u32,
    },
    /// Operator override: finish the current match on the spot.
    EndMatch,
    Shutdown,
}

/// Spawn the simulation task. Returns the command sender, the event stream,
/// and the task handle.
pub fn spawn_sim_loop(
    settings: SimSettings,
) -> (
    mpsc::UnboundedSender<SimCommand>,
    mpsc::UnboundedReceiver<EngineEvent>,
    JoinHandle<()>,
) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(run_sim_loop(settings, cmd_rx, event_tx));
    (cmd_tx, event_rx, handle)
}

async fn run_sim_loop(
    settings: SimSettings,
    mut cmd_rx: mpsc::UnboundedReceiver<SimCommand>,
    event_tx: mpsc::UnboundedSender<EngineEvent>,
) {
    let mut sim = SimLoop {
        engine: MatchEngine::new(settings.engine, settings.map_store),
        queue: QueueCoordinator::new(settings.queue),
        map_name: settings.map_name,
        event_tx,
        stats_tx: settings.stats_tx,
        epoch: Instant::now(),
        active_since: None,
    };

    let mut interval = tokio::time::interval(settings.tick_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(SimCommand::Shutdown) | None => {
                        sim.engine.end_match(
                            blast_core::events::MatchOutcome::Aborted,
                            "Server shutting down.",
                        );
                        sim.flush_events();
                        info!("simulation task stopping");
                        return;
                    }
                    Some(cmd) => sim.handle_command(cmd),
                }
            }
            _ = interval.tick() => sim.tick_second(),
        }
        sim.flush_events();
    }
}

struct SimLoop {
    engine: MatchEngine,
    queue: QueueCoordinator,
    map_name: String,
    event_tx: mpsc::UnboundedSender<EngineEvent>,
    stats_tx: Option<mpsc::UnboundedSender<MatchRecord>>,
    epoch: Instant,
    /// Map name and start instant of the running match.
    active_since: Option<(String, Instant)>,
}

impl SimLoop {
    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn handle_command(&mut self, cmd: SimCommand) {
        match cmd {
            SimCommand::Join { id, name } => self.handle_join(id, name),
            SimCommand::Quit { id } => {
                if self.queue.handle_quit(id) {
                    self.send(EngineEvent::broadcast(format!(
                        "{PREFIX}§fCountdown cancelled, waiting for more players."
                    )));
                }
                self.engine.handle_quit(id);
            }
            SimCommand::Hit {
                attacker,
                victim,
                kind,
            } => {
                self.engine.apply_hit(attacker, victim, kind);
            }
            SimCommand::InstantElim {
                attacker,
                victim,
                kind,
            } => {
                self.engine.apply_instant_elim(attacker, victim, kind);
            }
            SimCommand::Aoe {
                attacker,
                center,
                radius,
                exclude,
                kind,
            } => {
                let mut processed: HashSet<ParticipantId> = exclude.into_iter().collect();
                self.engine
                    .apply_aoe(attacker, &center, radius, &mut processed, kind);
            }
            SimCommand::UpdateLocation { id, location } => {
                self.engine.update_location(id, location);
            }
            SimCommand::UseAbility { id, kind, base_ms } => {
                let now = self.now_ms();
                self.engine.try_begin_cooldown(id, kind, base_ms, now);
            }
            SimCommand::BeginCharge { id, duration_ms } => {
                let now = self.now_ms();
                self.engine.begin_charge(id, duration_ms, now);
            }
            SimCommand::CancelCharge { id } => {
                self.engine.cancel_charge(id);
            }
            SimCommand::Purchase { id, kind, cost } => {
                self.engine.purchase_powerup(id, kind, cost);
            }
            SimCommand::AddCurrency { id, amount } => {
                self.engine.add_currency(id, amount);
            }
            SimCommand::EndMatch => {
                self.engine.end_match(
                    blast_core::events::MatchOutcome::Aborted,
                    "Match ended by an operator.",
                );
            }
            SimCommand::Shutdown => unreachable!("handled by the select loop"),
        }
    }

    fn handle_join(&mut self, id: ParticipantId, name: String) {
        let text = match self.queue.handle_join(id, &name, self.engine.is_active()) {
            JoinOutcome::Joined(count) => {
                format!("{PREFIX}§f{name} §ejoined the queue ({count} waiting).")
            }
            JoinOutcome::AlreadyQueued => format!("{PREFIX}§fYou are already queued."),
            JoinOutcome::MatchInProgress => {
                format!("{PREFIX}§fA match is in progress, try again soon.")
            }
            JoinOutcome::Full => format!("{PREFIX}§fThe queue is full."),
        };
        self.send(EngineEvent::broadcast(text));
    }

    fn tick_second(&mut self) {
        if self.engine.is_active() {
            self.engine.tick_second();
            let now = self.now_ms();
            self.engine.poll_completed_charges(now);
            return;
        }
        match self.queue.tick_second() {
            QueueTick::Idle => {}
            QueueTick::Announce(secs) => {
                let unit = if secs == 1 { "second" } else { "seconds" };
                self.send(EngineEvent::broadcast(format!(
                    "{PREFIX}§fMatch begins in §e{secs} §f{unit}!"
                )));
            }
            QueueTick::Cancelled => {
                self.send(EngineEvent::broadcast(format!(
                    "{PREFIX}§fCountdown cancelled, waiting for more players."
                )));
            }
            QueueTick::Launch(roster) => {
                match self.engine.start_from_roster(&roster, &self.map_name) {
                    Ok(_) => {}
                    Err(refusal) => {
                        warn!(%refusal, "match start refused");
                        self.send(EngineEvent::broadcast(format!(
                            "{PREFIX}§fCould not start the match: {refusal}."
                        )));
                        self.queue.requeue(roster);
                    }
                }
            }
        }
    }

    /// Forward pending engine events, noting match boundaries for the
    /// history sink along the way.
    fn flush_events(&mut self) {
        for event in self.engine.take_events() {
            match &event {
                EngineEvent::MatchStarted { map, .. } => {
                    self.active_since = Some((map.clone(), Instant::now()));
                }
                EngineEvent::MatchEnded {
                    outcome,
                    reason,
                    participants,
                } => {
                    if let Some(stats_tx) = &self.stats_tx {
                        let (map, played_secs) = match self.active_since.take() {
                            Some((map, started)) => (map, started.elapsed().as_secs()),
                            None => (String::new(), 0),
                        };
                        let record = MatchRecord {
                            map,
                            outcome: *outcome,
                            reason: reason.clone(),
                            played_secs,
                            participants: participants.len(),
                            ended_at_secs: unix_now_secs(),
                        };
                        if stats_tx.send(record).is_err() {
                            warn!("stats worker is gone, dropping match record");
                        }
                    }
                }
                _ => {}
            }
            if self.event_tx.send(event).is_err() {
                return;
            }
        }
    }

    fn send(&self, event: EngineEvent) {
        let _ = self.event_tx.send(event);
    }
}

fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blast_core::events::MatchOutcome;
    use blast_core::test_helpers::{pid, single_map_store};
    use tokio::time::timeout;

    fn fast_settings() -> SimSettings {
        SimSettings {
            engine: EngineConfig::default(),
            queue: QueueConfig {
                countdown_secs: 2,
                min_players: 2,
                max_players: 16,
            },
            map_store: single_map_store(),
            map_name: "canyon".to_string(),
            tick_interval: Duration::from_millis(5),
            stats_tx: None,
        }
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<EngineEvent>) -> EngineEvent {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("event within deadline")
            .expect("event channel open")
    }

    async fn wait_for(
        rx: &mut mpsc::UnboundedReceiver<EngineEvent>,
        mut pred: impl FnMut(&EngineEvent) -> bool,
    ) -> EngineEvent {
        loop {
            let event = next_event(rx).await;
            if pred(&event) {
                return event;
            }
        }
    }

    #[tokio::test]
    async fn queue_counts_down_and_match_starts() {
        let (cmd_tx, mut event_rx, handle) = spawn_sim_loop(fast_settings());
        cmd_tx
            .send(SimCommand::Join {
                id: pid(1),
                name: "Ada".to_string(),
            })
            .unwrap();
        cmd_tx
            .send(SimCommand::Join {
                id: pid(2),
                name: "Brin".to_string(),
            })
            .unwrap();

        let started = wait_for(&mut event_rx, |e| {
            matches!(e, EngineEvent::MatchStarted { .. })
        })
        .await;
        match started {
            EngineEvent::MatchStarted { map, participants } => {
                assert_eq!(map, "canyon");
                assert_eq!(participants.len(), 2);
            }
            _ => unreachable!(),
        }

        cmd_tx.send(SimCommand::Shutdown).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn combat_commands_flow_through_to_events() {
        let (cmd_tx, mut event_rx, handle) = spawn_sim_loop(fast_settings());
        for (n, name) in [(1, "Ada"), (2, "Brin")] {
            cmd_tx
                .send(SimCommand::Join {
                    id: pid(n),
                    name: name.to_string(),
                })
                .unwrap();
        }
        wait_for(&mut event_rx, |e| {
            matches!(e, EngineEvent::MatchStarted { .. })
        })
        .await;

        cmd_tx
            .send(SimCommand::InstantElim {
                attacker: pid(1),
                victim: pid(2),
                kind: DamageKind::StrikeBlaster,
            })
            .unwrap();
        wait_for(&mut event_rx, |e| {
            matches!(
                e,
                EngineEvent::Message { text, .. } if text.contains("back to spawn")
            )
        })
        .await;

        cmd_tx.send(SimCommand::Shutdown).unwrap();
        let ended = wait_for(&mut event_rx, |e| {
            matches!(e, EngineEvent::MatchEnded { .. })
        })
        .await;
        assert!(matches!(
            ended,
            EngineEvent::MatchEnded {
                outcome: MatchOutcome::Aborted,
                ..
            }
        ));
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn join_during_match_is_refused() {
        let (cmd_tx, mut event_rx, handle) = spawn_sim_loop(fast_settings());
        for (n, name) in [(1, "Ada"), (2, "Brin")] {
            cmd_tx
                .send(SimCommand::Join {
                    id: pid(n),
                    name: name.to_string(),
                })
                .unwrap();
        }
        wait_for(&mut event_rx, |e| {
            matches!(e, EngineEvent::MatchStarted { .. })
        })
        .await;

        cmd_tx
            .send(SimCommand::Join {
                id: pid(3),
                name: "Cleo".to_string(),
            })
            .unwrap();
        wait_for(&mut event_rx, |e| {
            matches!(
                e,
                EngineEvent::Message { text, .. } if text.contains("match is in progress")
            )
        })
        .await;

        cmd_tx.send(SimCommand::Shutdown).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn charges_complete_on_the_tick() {
        let (cmd_tx, mut event_rx, handle) = spawn_sim_loop(fast_settings());
        for (n, name) in [(1, "Ada"), (2, "Brin")] {
            cmd_tx
                .send(SimCommand::Join {
                    id: pid(n),
                    name: name.to_string(),
                })
                .unwrap();
        }
        wait_for(&mut event_rx, |e| {
            matches!(e, EngineEvent::MatchStarted { .. })
        })
        .await;

        cmd_tx
            .send(SimCommand::BeginCharge {
                id: pid(1),
                duration_ms: 1,
            })
            .unwrap();
        wait_for(&mut event_rx, |e| {
            matches!(
                e,
                EngineEvent::ChargeComplete { participant } if *participant == pid(1)
            )
        })
        .await;

        cmd_tx.send(SimCommand::Shutdown).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn dropping_the_command_sender_stops_the_task() {
        let (cmd_tx, _event_rx, handle) = spawn_sim_loop(fast_settings());
        drop(cmd_tx);
        timeout(Duration::from_secs(5), handle)
            .await
            .expect("task exits")
            .unwrap();
    }
}
