use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use leksika_core::model::{HistoryEntry, HistoryId};
use leksika_storage::repository::{HistoryRepository, InMemoryRepository};

use crate::Clock;
use crate::error::SessionError;

/// Presentation-agnostic list item for a finished session.
///
/// No pre-formatted strings; the host formats timestamps and percentages.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryListItem {
    pub id: Option<HistoryId>,
    pub completed_at: DateTime<Utc>,
    pub unit_names: String,
    pub correct: u32,
    pub total: u32,
    pub total_time_secs: f64,
    pub avg_time_secs: f64,
}

impl HistoryListItem {
    #[must_use]
    pub fn from_entry(entry: &HistoryEntry) -> Self {
        Self {
            id: entry.id(),
            completed_at: entry.completed_at(),
            unit_names: entry.unit_names().to_owned(),
            correct: entry.correct(),
            total: entry.total(),
            total_time_secs: entry.total_time_secs(),
            avg_time_secs: entry.avg_time_secs(),
        }
    }

    /// Share of correct answers in percent, `None` for an empty session.
    #[must_use]
    pub fn accuracy_percent(&self) -> Option<f64> {
        (self.total > 0).then(|| f64::from(self.correct) * 100.0 / f64::from(self.total))
    }
}

/// Read-side facade over quiz history.
#[derive(Clone)]
pub struct HistoryService {
    clock: Clock,
    history: Arc<dyn HistoryRepository>,
}

impl HistoryService {
    #[must_use]
    pub fn new(clock: Clock, history: Arc<dyn HistoryRepository>) -> Self {
        Self { clock, history }
    }

    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::new(clock, Arc::new(InMemoryRepository::new()))
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Most recent sessions first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn list_recent(&self, limit: u32) -> Result<Vec<HistoryListItem>, SessionError> {
        let entries = self.history.list_history(limit).await?;
        Ok(entries.iter().map(HistoryListItem::from_entry).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leksika_core::model::{SessionSummary, Word};
    use leksika_core::time::fixed_now;
    use std::time::Duration;

    #[tokio::test]
    async fn lists_recent_history_items() {
        let repo = Arc::new(InMemoryRepository::new());
        let service = HistoryService::new(Clock::fixed(fixed_now()), repo.clone());
        assert_eq!(service.now(), fixed_now());
        assert!(service.list_recent(10).await.unwrap().is_empty());

        let miss = Word::new("dog", "it", "Animals", "Pets").unwrap();
        let summary = SessionSummary::new(3, vec![miss], Duration::from_secs(12), 1);
        repo.append_history(&HistoryEntry::from_summary(&summary, "Animals", fixed_now()))
            .await
            .unwrap();

        let items = service.list_recent(10).await.unwrap();
        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.unit_names, "Animals");
        assert_eq!(item.correct, 3);
        assert_eq!(item.total, 4);
        assert!((item.avg_time_secs - 3.0).abs() < 1e-9);
        assert_eq!(item.accuracy_percent(), Some(75.0));
    }

    #[test]
    fn empty_session_has_no_accuracy() {
        let summary = SessionSummary::new(0, Vec::new(), Duration::ZERO, 0);
        let entry = HistoryEntry::from_summary(&summary, "*", fixed_now());
        assert_eq!(HistoryListItem::from_entry(&entry).accuracy_percent(), None);
    }
}
