#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod import_service;
pub mod library_service;
pub mod sessions;

pub use leksika_core::Clock;
pub use sessions as session;

pub use app_services::AppServices;
pub use error::{AppServicesError, ImportServiceError, LibraryError, SessionError};
pub use import_service::{ImportReport, ImportService};
pub use library_service::{LibraryOverview, LibraryService, ScopeCount};

pub use sessions::{
    AnswerFeedback, HistoryListItem, HistoryService, MistakeUpdate, Question, SessionAnswerResult,
    SessionEngine, SessionLoopService, SessionProgress,
};
