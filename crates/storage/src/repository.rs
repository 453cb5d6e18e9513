use async_trait::async_trait;
use leksika_core::model::{HistoryEntry, HistoryId, Word, WordId};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for vocabulary words.
#[async_trait]
pub trait WordRepository: Send + Sync {
    /// Every stored word, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the words cannot be read.
    async fn list_words(&self) -> Result<Vec<Word>, StorageError>;

    /// Store new words and return their assigned ids in input order.
    ///
    /// Any `id` already set on the input is ignored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the batch cannot be stored; no word of a failed
    /// batch is kept.
    async fn insert_words(&self, words: &[Word]) -> Result<Vec<WordId>, StorageError>;

    /// Raise the stored mistake counter of a word to `count`.
    ///
    /// A lower `count` than the stored one leaves the counter unchanged, so late
    /// or reordered write-backs cannot move it backwards.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the word does not exist.
    async fn update_mistake_count(&self, id: WordId, count: u32) -> Result<(), StorageError>;
}

/// Repository contract for quiz history.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Append a finished session and return its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the entry cannot be stored.
    async fn append_history(&self, entry: &HistoryEntry) -> Result<HistoryId, StorageError>;

    /// Most recent entries first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the entries cannot be read.
    async fn list_history(&self, limit: u32) -> Result<Vec<HistoryEntry>, StorageError>;
}

#[derive(Default)]
struct MemoryState {
    words: BTreeMap<WordId, Word>,
    history: Vec<HistoryEntry>,
    next_word_id: u64,
    next_history_id: u64,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WordRepository for InMemoryRepository {
    async fn list_words(&self) -> Result<Vec<Word>, StorageError> {
        let guard = self
            .state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.words.values().cloned().collect())
    }

    async fn insert_words(&self, words: &[Word]) -> Result<Vec<WordId>, StorageError> {
        let mut guard = self
            .state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut ids = Vec::with_capacity(words.len());
        for word in words {
            guard.next_word_id += 1;
            let id = WordId::new(guard.next_word_id);
            guard.words.insert(id, word.clone().assign_id(id));
            ids.push(id);
        }
        Ok(ids)
    }

    async fn update_mistake_count(&self, id: WordId, count: u32) -> Result<(), StorageError> {
        let mut guard = self
            .state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let word = guard.words.get_mut(&id).ok_or(StorageError::NotFound)?;
        while word.mistake_count() < count {
            word.record_mistake();
        }
        Ok(())
    }
}

#[async_trait]
impl HistoryRepository for InMemoryRepository {
    async fn append_history(&self, entry: &HistoryEntry) -> Result<HistoryId, StorageError> {
        let mut guard = self
            .state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.next_history_id += 1;
        let id = HistoryId::new(guard.next_history_id);
        guard.history.push(entry.clone().assign_id(id));
        Ok(id)
    }

    async fn list_history(&self, limit: u32) -> Result<Vec<HistoryEntry>, StorageError> {
        let guard = self
            .state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let mut entries = guard.history.clone();
        entries.sort_by(|a, b| {
            b.completed_at()
                .cmp(&a.completed_at())
                .then_with(|| b.id().cmp(&a.id()))
        });
        entries.truncate(limit);
        Ok(entries)
    }
}

/// Aggregates word and history repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub words: Arc<dyn WordRepository>,
    pub history: Arc<dyn HistoryRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let words: Arc<dyn WordRepository> = Arc::new(repo.clone());
        let history: Arc<dyn HistoryRepository> = Arc::new(repo);
        Self { words, history }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leksika_core::model::SessionSummary;
    use leksika_core::time::fixed_now;
    use std::time::Duration;

    fn build_word(source: &str) -> Word {
        Word::new(source, format!("{source}-t"), "Unit", "Cat").unwrap()
    }

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let repo = InMemoryRepository::new();
        let ids = repo
            .insert_words(&[build_word("a"), build_word("b")])
            .await
            .unwrap();
        assert_eq!(ids, vec![WordId::new(1), WordId::new(2)]);

        let words = repo.list_words().await.unwrap();
        assert_eq!(words.len(), 2);
        assert_eq!(words[1].id(), Some(WordId::new(2)));
        assert_eq!(words[1].source_term(), "b");
    }

    #[tokio::test]
    async fn mistake_count_never_decreases() {
        let repo = InMemoryRepository::new();
        let ids = repo.insert_words(&[build_word("a")]).await.unwrap();

        repo.update_mistake_count(ids[0], 3).await.unwrap();
        repo.update_mistake_count(ids[0], 1).await.unwrap();

        let words = repo.list_words().await.unwrap();
        assert_eq!(words[0].mistake_count(), 3);
    }

    #[tokio::test]
    async fn unknown_word_update_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = repo
            .update_mistake_count(WordId::new(9), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn history_lists_newest_first() {
        let repo = InMemoryRepository::new();
        let summary = SessionSummary::new(1, Vec::new(), Duration::from_secs(2), 0);
        let older = HistoryEntry::from_summary(&summary, "A", fixed_now());
        let newer =
            HistoryEntry::from_summary(&summary, "B", fixed_now() + chrono::Duration::minutes(5));

        repo.append_history(&older).await.unwrap();
        let newer_id = repo.append_history(&newer).await.unwrap();

        let entries = repo.list_history(10).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id(), Some(newer_id));
        assert_eq!(entries[0].unit_names(), "B");

        let limited = repo.list_history(1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }
}
