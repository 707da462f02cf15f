use std::io::Write;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::engine::state::{BatchSource, ClickIntent};
use crate::errors::GridPilotResult;

/// One line of the session JSONL log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: u64,
    pub ts: i64,
    pub source: BatchSource,
    pub description: String,
    pub action_plan: String,
    pub clicks: Vec<ClickIntent>,
}

/// Per-run session directory holding the iteration log and the annotated
/// frames that were sent to the model.
pub struct SessionHistory {
    pub session_id: String,
    dir: PathBuf,
    log_path: PathBuf,
    entries: Vec<IterationRecord>,
}

impl SessionHistory {
    pub fn new() -> GridPilotResult<Self> {
        let session_id = uuid::Uuid::new_v4().to_string();
        let dir = data_dir_or_cwd().join(format!("session_{session_id}"));
        std::fs::create_dir_all(&dir)?;
        let log_path = dir.join("play_session.jsonl");
        tracing::info!(session = %session_id, dir = %dir.display(), "session started");
        Ok(Self {
            session_id,
            dir,
            log_path,
            entries: Vec::new(),
        })
    }

    pub fn push(&mut self, entry: IterationRecord) {
        self.entries.push(entry);
    }

    /// Append the latest entry to the JSONL file.
    pub fn flush(&self) -> GridPilotResult<()> {
        if let Some(last) = self.entries.last() {
            let line = serde_json::to_string(last)?;
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.log_path)?;
            writeln!(file, "{}", line)?;
            tracing::debug!(path = %self.log_path.display(), "history entry flushed");
        }
        Ok(())
    }

    /// Store the annotated frame that was shown to the model this iteration.
    pub fn save_frame(&self, iteration: u64, png_bytes: &[u8]) -> GridPilotResult<()> {
        let path = self.dir.join(format!("iter_{iteration:04}_shot.png"));
        std::fs::write(&path, png_bytes)?;
        tracing::debug!(path = %path.display(), "frame saved");
        Ok(())
    }
}

/// `~/.local/share/gridpilot/sessions` (or the platform equivalent), falling
/// back to the current working directory.
fn data_dir_or_cwd() -> PathBuf {
    if let Some(data_dir) = dirs::data_local_dir() {
        return data_dir.join("gridpilot").join("sessions");
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
