pub mod controller;
pub mod state;

pub use controller::{AnalyzeOutcome, SessionController, SessionError};
pub use state::{SessionState, SessionStatus};
