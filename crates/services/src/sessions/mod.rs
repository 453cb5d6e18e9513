mod engine;
mod plan;
mod progress;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use engine::{AnswerFeedback, MistakeUpdate, Question, SessionEngine};
pub use plan::{SessionBuilder, SessionPlan, scheduled_count};
pub use progress::SessionProgress;
pub use view::{HistoryListItem, HistoryService};
pub use workflow::{SessionAnswerResult, SessionLoopService};
