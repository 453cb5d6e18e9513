use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::SessionSummary;
use crate::model::ids::HistoryId;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum HistoryError {
    #[error("correct answers ({correct}) exceed total answers ({total})")]
    CountMismatch { correct: u32, total: u32 },

    #[error("invalid time value: {0}")]
    InvalidTime(f64),
}

/// One persisted line of quiz history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    id: Option<HistoryId>,
    completed_at: DateTime<Utc>,
    unit_names: String,
    correct: u32,
    total: u32,
    total_time_secs: f64,
    avg_time_secs: f64,
}

impl HistoryEntry {
    /// Derive the history line for a finished session.
    ///
    /// `total` counts every answer, so a word missed twice adds two.
    #[must_use]
    pub fn from_summary(
        summary: &SessionSummary,
        unit_names: impl Into<String>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            completed_at,
            unit_names: unit_names.into(),
            correct: summary.correct_count(),
            total: summary.total_answers(),
            total_time_secs: summary.total_time_seconds(),
            avg_time_secs: summary.avg_time_seconds(),
        }
    }

    /// Rehydrate an entry from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError` if the counts disagree or a time is negative or not finite.
    pub fn from_persisted(
        id: HistoryId,
        completed_at: DateTime<Utc>,
        unit_names: String,
        correct: u32,
        total: u32,
        total_time_secs: f64,
        avg_time_secs: f64,
    ) -> Result<Self, HistoryError> {
        if correct > total {
            return Err(HistoryError::CountMismatch { correct, total });
        }
        for value in [total_time_secs, avg_time_secs] {
            if !value.is_finite() || value < 0.0 {
                return Err(HistoryError::InvalidTime(value));
            }
        }

        Ok(Self {
            id: Some(id),
            completed_at,
            unit_names,
            correct,
            total,
            total_time_secs,
            avg_time_secs,
        })
    }

    #[must_use]
    pub fn assign_id(mut self, id: HistoryId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn id(&self) -> Option<HistoryId> {
        self.id
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn unit_names(&self) -> &str {
        &self.unit_names
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn total_time_secs(&self) -> f64 {
        self.total_time_secs
    }

    #[must_use]
    pub fn avg_time_secs(&self) -> f64 {
        self.avg_time_secs
    }
}
