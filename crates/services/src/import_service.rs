use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use leksika_core::model::WordId;
use leksika_core::{ParseOutcome, parse};
use leksika_storage::repository::WordRepository;

use crate::error::ImportServiceError;

/// Result of storing the words of a parsed import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub inserted: Vec<WordId>,
    /// Lines that were rejected by the parser and therefore not stored.
    pub rejected: usize,
}

/// Two-step word list import: parse for review, then commit.
#[derive(Clone)]
pub struct ImportService {
    words: Arc<dyn WordRepository>,
}

impl ImportService {
    #[must_use]
    pub fn new(words: Arc<dyn WordRepository>) -> Self {
        Self { words }
    }

    /// Parse `text` without touching storage.
    #[must_use]
    pub fn preview(&self, text: &str) -> ParseOutcome {
        parse(text)
    }

    /// Store every parsed record of `outcome`, even when some lines were
    /// rejected.
    ///
    /// # Errors
    ///
    /// Returns `ImportServiceError::Empty` if there is nothing to store.
    /// Returns `ImportServiceError::Storage` if persistence fails.
    pub async fn commit(&self, outcome: &ParseOutcome) -> Result<ImportReport, ImportServiceError> {
        if outcome.records.is_empty() {
            return Err(ImportServiceError::Empty);
        }

        let inserted = self.words.insert_words(&outcome.records).await?;
        debug!(
            inserted = inserted.len(),
            rejected = outcome.errors.len(),
            units = outcome.units.len(),
            "import committed"
        );
        Ok(ImportReport {
            inserted,
            rejected: outcome.errors.len(),
        })
    }

    /// Store a reviewed outcome; unless `force` is set, an outcome with
    /// rejected lines is not stored.
    ///
    /// # Errors
    ///
    /// Returns `ImportServiceError::Rejected` for an unforced outcome with
    /// rejected lines, otherwise the errors of [`ImportService::commit`].
    pub async fn commit_reviewed(
        &self,
        outcome: &ParseOutcome,
        force: bool,
    ) -> Result<ImportReport, ImportServiceError> {
        if !force && !outcome.is_clean() {
            return Err(ImportServiceError::Rejected {
                count: outcome.errors.len(),
            });
        }
        self.commit(outcome).await
    }

    /// Parse and store in one step, see [`ImportService::commit_reviewed`].
    ///
    /// # Errors
    ///
    /// Same as [`ImportService::commit_reviewed`].
    pub async fn import_text(
        &self,
        text: &str,
        force: bool,
    ) -> Result<ImportReport, ImportServiceError> {
        let outcome = self.preview(text);
        self.commit_reviewed(&outcome, force).await
    }
}
