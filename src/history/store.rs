//! Durable history slot
//!
//! One JSON file holds the whole serialized log. Loads never fail the
//! caller: a missing or corrupt slot yields an empty log (corruption is
//! logged, not surfaced). Saves report their error so the controller can
//! turn it into a non-fatal warning.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::log::HistoryLog;

/// Fixed slot file name under the configured storage directory
pub const HISTORY_SLOT_FILE: &str = "voice-analysis-history.json";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to write history slot {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize history: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub struct HistoryStore {
    slot_path: PathBuf,
}

impl HistoryStore {
    pub fn new(storage_dir: impl AsRef<Path>) -> Self {
        Self {
            slot_path: storage_dir.as_ref().join(HISTORY_SLOT_FILE),
        }
    }

    /// Read the durable slot; never fails the caller
    pub fn load(&self) -> HistoryLog {
        let raw = match fs::read_to_string(&self.slot_path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No history slot at {}, starting empty", self.slot_path.display());
                return HistoryLog::new();
            }
            Err(e) => {
                warn!(
                    "Failed to read history slot {}: {}. Starting empty.",
                    self.slot_path.display(),
                    e
                );
                return HistoryLog::new();
            }
        };

        match serde_json::from_str::<HistoryLog>(&raw) {
            Ok(log) => {
                info!("Loaded {} history entrie(s)", log.len());
                log
            }
            Err(e) => {
                warn!(
                    "History slot {} is corrupt: {}. Starting empty.",
                    self.slot_path.display(),
                    e
                );
                HistoryLog::new()
            }
        }
    }

    /// Overwrite the durable slot with the full serialized log
    pub fn save(&self, log: &HistoryLog) -> Result<(), PersistenceError> {
        if let Some(dir) = self.slot_path.parent() {
            fs::create_dir_all(dir).map_err(|e| PersistenceError::Write {
                path: self.slot_path.clone(),
                source: e,
            })?;
        }

        let serialized = serde_json::to_string_pretty(log)?;
        fs::write(&self.slot_path, serialized).map_err(|e| PersistenceError::Write {
            path: self.slot_path.clone(),
            source: e,
        })?;

        debug!("Saved {} history entrie(s)", log.len());
        Ok(())
    }

    pub fn slot_path(&self) -> &Path {
        &self.slot_path
    }
}
