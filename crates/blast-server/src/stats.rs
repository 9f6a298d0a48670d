//! Match history sink.
//!
//! Finished matches are handed to a background task over a channel so disk
//! latency never stalls the simulation. A failed write is logged and dropped;
//! match history is best effort by design of the callers.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use blast_core::events::MatchOutcome;

/// One finished match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub map: String,
    pub outcome: MatchOutcome,
    pub reason: String,
    /// Wall seconds the match actually ran.
    pub played_secs: u64,
    pub participants: usize,
    /// Unix timestamp of the match end.
    pub ended_at_secs: u64,
}

pub trait StatsBackend: Send {
    fn record(&mut self, record: &MatchRecord) -> std::io::Result<()>;
}

/// Drops everything; used when stats are disabled.
#[derive(Debug, Default)]
pub struct NullBackend;

impl StatsBackend for NullBackend {
    fn record(&mut self, _record: &MatchRecord) -> std::io::Result<()> {
        Ok(())
    }
}

/// Appends one JSON object per line.
pub struct JsonlBackend {
    writer: BufWriter<File>,
}

impl JsonlBackend {
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl StatsBackend for JsonlBackend {
    fn record(&mut self, record: &MatchRecord) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

/// Spawn the history worker. The returned sender is cheap to clone; dropping
/// every clone ends the worker.
pub fn spawn_stats_worker(
    mut backend: Box<dyn StatsBackend>,
) -> (mpsc::UnboundedSender<MatchRecord>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<MatchRecord>();
    let handle = tokio::spawn(async move {
        while let Some(record) = rx.recv().await {
            if let Err(e) = backend.record(&record) {
                tracing::warn!(error = %e, map = %record.map, "failed to record match");
            }
        }
    });
    (tx, handle)
}
