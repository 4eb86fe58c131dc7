use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisResult;

use super::entry::HistoryEntry;

/// Maximum entries retained; insertion at capacity evicts the oldest
pub const HISTORY_CAPACITY: usize = 10;

/// Ordered, bounded sequence of history entries, newest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryLog(Vec<HistoryEntry>);

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend an entry, truncating to capacity. Pure: returns the new log.
    pub fn append(&self, entry: HistoryEntry) -> Self {
        let mut entries = Vec::with_capacity((self.0.len() + 1).min(HISTORY_CAPACITY));
        entries.push(entry);
        entries.extend(self.0.iter().take(HISTORY_CAPACITY - 1).cloned());
        Self(entries)
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.0
    }

    /// Verdicts only, for use as prior-analysis context. Entry ids and audio
    /// URIs are stripped by construction.
    pub fn results(&self) -> Vec<AnalysisResult> {
        self.0.iter().map(|e| e.result.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
