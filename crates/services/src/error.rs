//! Shared error types for the services crate.

use std::collections::BTreeSet;

use thiserror::Error;

use leksika_core::model::PolicyError;
use leksika_storage::repository::StorageError;
use leksika_storage::sqlite::SqliteInitError;

/// Errors emitted by session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no words match units [{}] and category {}", join_units(.units), show_category(.category))]
    EmptyPool {
        units: BTreeSet<String>,
        category: String,
    },
    #[error("session is not finished yet")]
    NotFinished,
    #[error("session already completed")]
    Completed,
    #[error("choice {index} is out of range for {len} options")]
    InvalidChoice { index: usize, len: usize },
    #[error(transparent)]
    Policy(#[from] PolicyError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

fn join_units(units: &BTreeSet<String>) -> String {
    if units.is_empty() {
        return String::from("*");
    }
    units.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

fn show_category(category: &str) -> &str {
    if category.is_empty() { "*" } else { category }
}

/// Errors emitted by `ImportService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ImportServiceError {
    #[error("import has {count} rejected line(s); review them or force the import")]
    Rejected { count: usize },
    #[error("import contains no words")]
    Empty,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `LibraryService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LibraryError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pool_message_names_scope() {
        let err = SessionError::EmptyPool {
            units: BTreeSet::from([String::from("Animals"), String::from("Colors")]),
            category: String::from("Pets"),
        };
        assert_eq!(
            err.to_string(),
            "no words match units [Animals, Colors] and category Pets"
        );
    }

    #[test]
    fn empty_pool_message_marks_open_scope() {
        let err = SessionError::EmptyPool {
            units: BTreeSet::new(),
            category: String::new(),
        };
        assert_eq!(err.to_string(), "no words match units [*] and category *");
    }
}
