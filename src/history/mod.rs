pub mod entry;
pub mod log;
pub mod store;

pub use entry::HistoryEntry;
pub use log::{HistoryLog, HISTORY_CAPACITY};
pub use store::{HistoryStore, PersistenceError, HISTORY_SLOT_FILE};
