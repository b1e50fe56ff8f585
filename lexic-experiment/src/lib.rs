pub mod conditions;
pub mod config;
pub mod output;
pub mod state;
pub mod summary;

pub use conditions::{load_conditions, ConditionError};
pub use config::{DialogError, SessionConfig, SessionTiming};
pub use output::{write_results, OutputError};
pub use state::{SessionEvent, SessionStateMachine};
pub use summary::{summarize, SessionSummary, SummaryError};
