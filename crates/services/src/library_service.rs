use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use leksika_core::model::Word;
use leksika_storage::repository::WordRepository;

use crate::error::LibraryError;

/// A unit or category label with the number of stored words carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeCount {
    pub name: String,
    pub words: u32,
}

/// Stored labels available for scope selection, sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryOverview {
    pub total_words: u32,
    pub units: Vec<ScopeCount>,
    pub categories: Vec<ScopeCount>,
}

impl LibraryOverview {
    #[must_use]
    pub fn from_words(words: &[Word]) -> Self {
        let mut units: BTreeMap<&str, u32> = BTreeMap::new();
        let mut categories: BTreeMap<&str, u32> = BTreeMap::new();
        for word in words {
            *units.entry(word.unit()).or_default() += 1;
            *categories.entry(word.category()).or_default() += 1;
        }

        Self {
            total_words: u32::try_from(words.len()).unwrap_or(u32::MAX),
            units: into_counts(units),
            categories: into_counts(categories),
        }
    }
}

fn into_counts(map: BTreeMap<&str, u32>) -> Vec<ScopeCount> {
    map.into_iter()
        .map(|(name, words)| ScopeCount {
            name: name.to_owned(),
            words,
        })
        .collect()
}

/// Read-only access to the stored vocabulary.
#[derive(Clone)]
pub struct LibraryService {
    words: Arc<dyn WordRepository>,
}

impl LibraryService {
    #[must_use]
    pub fn new(words: Arc<dyn WordRepository>) -> Self {
        Self { words }
    }

    /// All stored words ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::Storage` if repository access fails.
    pub async fn list_words(&self) -> Result<Vec<Word>, LibraryError> {
        Ok(self.words.list_words().await?)
    }

    /// Units and categories currently stored, with word counts.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::Storage` if repository access fails.
    pub async fn overview(&self) -> Result<LibraryOverview, LibraryError> {
        let words = self.words.list_words().await?;
        Ok(LibraryOverview::from_words(&words))
    }
}
