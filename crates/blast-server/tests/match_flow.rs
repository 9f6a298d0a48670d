//! End-to-end runs of the simulation task: queue, countdown, combat, and the
//! match history sink, all driven over the public channels.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use blast_core::events::{EngineEvent, MatchOutcome};
use blast_core::team::Team;
use blast_core::test_helpers::{pid, single_map_store};
use blast_engine::EngineConfig;
use blast_engine::combat::DamageKind;
use blast_engine::queue::QueueConfig;
use blast_server::sim::{SimCommand, SimSettings, spawn_sim_loop};
use blast_server::stats::MatchRecord;

fn settings(
    engine: EngineConfig,
    stats_tx: Option<mpsc::UnboundedSender<MatchRecord>>,
) -> SimSettings {
    SimSettings {
        engine,
        queue: QueueConfig {
            countdown_secs: 2,
            min_players: 2,
            max_players: 16,
        },
        map_store: single_map_store(),
        map_name: "canyon".to_string(),
        tick_interval: Duration::from_millis(5),
        stats_tx,
    }
}

async fn wait_for(
    rx: &mut mpsc::UnboundedReceiver<EngineEvent>,
    mut pred: impl FnMut(&EngineEvent) -> bool,
) -> EngineEvent {
    loop {
        let event = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("event within deadline")
            .expect("event channel open");
        if pred(&event) {
            return event;
        }
    }
}

fn join(cmd_tx: &mpsc::UnboundedSender<SimCommand>, n: u128, name: &str) {
    cmd_tx
        .send(SimCommand::Join {
            id: pid(n),
            name: name.to_string(),
        })
        .unwrap();
}

#[tokio::test]
async fn full_match_runs_to_a_winner_and_is_recorded() {
    let (stats_tx, mut stats_rx) = mpsc::unbounded_channel();
    let engine = EngineConfig {
        starting_lives: 1,
        ..EngineConfig::default()
    };
    let (cmd_tx, mut event_rx, handle) = spawn_sim_loop(settings(engine, Some(stats_tx)));

    join(&cmd_tx, 1, "Ada");
    join(&cmd_tx, 2, "Brin");
    wait_for(&mut event_rx, |e| {
        matches!(e, EngineEvent::MatchStarted { .. })
    })
    .await;

    // One life each: a single direct hit finishes green and ends the match.
    cmd_tx
        .send(SimCommand::InstantElim {
            attacker: pid(1),
            victim: pid(2),
            kind: DamageKind::StrikeBlaster,
        })
        .unwrap();

    let ended = wait_for(&mut event_rx, |e| {
        matches!(e, EngineEvent::MatchEnded { .. })
    })
    .await;
    assert!(matches!(
        ended,
        EngineEvent::MatchEnded {
            outcome: MatchOutcome::Winner(Team::Red),
            ..
        }
    ));

    let record = timeout(Duration::from_secs(5), stats_rx.recv())
        .await
        .expect("record within deadline")
        .expect("stats channel open");
    assert_eq!(record.map, "canyon");
    assert_eq!(record.outcome, MatchOutcome::Winner(Team::Red));
    assert_eq!(record.participants, 2);

    cmd_tx.send(SimCommand::Shutdown).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn queue_cancel_and_refill_still_launches() {
    let (cmd_tx, mut event_rx, handle) = spawn_sim_loop(settings(EngineConfig::default(), None));

    join(&cmd_tx, 1, "Ada");
    join(&cmd_tx, 2, "Brin");
    cmd_tx.send(SimCommand::Quit { id: pid(2) }).unwrap();
    wait_for(&mut event_rx, |e| {
        matches!(
            e,
            EngineEvent::Message { text, .. } if text.contains("Countdown cancelled")
        )
    })
    .await;

    join(&cmd_tx, 3, "Cleo");
    let started = wait_for(&mut event_rx, |e| {
        matches!(e, EngineEvent::MatchStarted { .. })
    })
    .await;
    match started {
        EngineEvent::MatchStarted { participants, .. } => {
            assert_eq!(participants, vec![pid(1), pid(3)]);
        }
        _ => unreachable!(),
    }

    cmd_tx.send(SimCommand::Shutdown).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn mid_match_quit_forfeits_and_the_queue_reopens() {
    let (cmd_tx, mut event_rx, handle) = spawn_sim_loop(settings(EngineConfig::default(), None));

    join(&cmd_tx, 1, "Ada");
    join(&cmd_tx, 2, "Brin");
    wait_for(&mut event_rx, |e| {
        matches!(e, EngineEvent::MatchStarted { .. })
    })
    .await;

    cmd_tx.send(SimCommand::Quit { id: pid(1) }).unwrap();
    let ended = wait_for(&mut event_rx, |e| {
        matches!(e, EngineEvent::MatchEnded { .. })
    })
    .await;
    assert!(matches!(
        ended,
        EngineEvent::MatchEnded {
            outcome: MatchOutcome::Winner(Team::Green),
            ..
        }
    ));

    // With the match over the queue accepts players again.
    join(&cmd_tx, 3, "Cleo");
    wait_for(&mut event_rx, |e| {
        matches!(
            e,
            EngineEvent::Message { text, .. } if text.contains("joined the queue")
        )
    })
    .await;

    cmd_tx.send(SimCommand::Shutdown).unwrap();
    handle.await.unwrap();
}
