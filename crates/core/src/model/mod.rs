mod history;
mod ids;
mod policy;
mod session;
mod word;

pub use ids::{HistoryId, ParseIdError, WordId};

pub use history::{HistoryEntry, HistoryError};
pub use policy::{
    Direction, PolicyError, RetryPolicy, SessionPolicy, SessionPolicyDraft, Termination,
};
pub use session::SessionSummary;
pub use word::{Word, WordError};
