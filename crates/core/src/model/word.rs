use serde::Serialize;
use thiserror::Error;

use crate::model::ids::WordId;
use crate::model::policy::Direction;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WordError {
    #[error("source term cannot be empty")]
    EmptySource,

    #[error("target term cannot be empty")]
    EmptyTarget,

    #[error("unit label cannot be empty")]
    EmptyUnit,

    #[error("category label cannot be empty")]
    EmptyCategory,
}

//
// ─── WORD ──────────────────────────────────────────────────────────────────────
//

/// A vocabulary record: one source/target pair with its grouping labels and
/// mistake counter.
///
/// `id` is `None` until storage assigns one; before that a word is identified
/// by its position in the import output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Word {
    id: Option<WordId>,
    source_term: String,
    target_term: String,
    unit: String,
    category: String,
    mistake_count: u32,
}

impl Word {
    /// Build a fresh, unpersisted word with a zero mistake count.
    ///
    /// All fields are trimmed before validation.
    ///
    /// # Errors
    ///
    /// Returns `WordError` if any term or label is empty after trimming.
    pub fn new(
        source_term: impl Into<String>,
        target_term: impl Into<String>,
        unit: impl Into<String>,
        category: impl Into<String>,
    ) -> Result<Self, WordError> {
        let source_term = normalize(source_term.into()).ok_or(WordError::EmptySource)?;
        let target_term = normalize(target_term.into()).ok_or(WordError::EmptyTarget)?;
        let unit = normalize(unit.into()).ok_or(WordError::EmptyUnit)?;
        let category = normalize(category.into()).ok_or(WordError::EmptyCategory)?;

        Ok(Self {
            id: None,
            source_term,
            target_term,
            unit,
            category,
            mistake_count: 0,
        })
    }

    /// Rehydrate a word from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `WordError` if the stored terms or labels are empty.
    pub fn from_persisted(
        id: WordId,
        source_term: String,
        target_term: String,
        unit: String,
        category: String,
        mistake_count: u32,
    ) -> Result<Self, WordError> {
        let mut word = Self::new(source_term, target_term, unit, category)?;
        word.id = Some(id);
        word.mistake_count = mistake_count;
        Ok(word)
    }

    /// Attach the storage identifier.
    #[must_use]
    pub fn assign_id(mut self, id: WordId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn id(&self) -> Option<WordId> {
        self.id
    }

    #[must_use]
    pub fn source_term(&self) -> &str {
        &self.source_term
    }

    #[must_use]
    pub fn target_term(&self) -> &str {
        &self.target_term
    }

    #[must_use]
    pub fn unit(&self) -> &str {
        &self.unit
    }

    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub fn mistake_count(&self) -> u32 {
        self.mistake_count
    }

    /// The term shown to the learner for the given direction.
    #[must_use]
    pub fn prompt_term(&self, direction: Direction) -> &str {
        match direction {
            Direction::SourceToTarget => &self.source_term,
            Direction::TargetToSource => &self.target_term,
        }
    }

    /// The term the learner has to pick for the given direction.
    #[must_use]
    pub fn answer_term(&self, direction: Direction) -> &str {
        match direction {
            Direction::SourceToTarget => &self.target_term,
            Direction::TargetToSource => &self.source_term,
        }
    }

    /// Count one more mistake and return the new total.
    ///
    /// The counter never decreases; it saturates at `u32::MAX`.
    pub fn record_mistake(&mut self) -> u32 {
        self.mistake_count = self.mistake_count.saturating_add(1);
        self.mistake_count
    }
}

fn normalize(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_word_trims_and_starts_without_mistakes() {
        let word = Word::new("  cat ", "mushuk", "Animals", " Pets").unwrap();
        assert_eq!(word.source_term(), "cat");
        assert_eq!(word.category(), "Pets");
        assert_eq!(word.mistake_count(), 0);
        assert_eq!(word.id(), None);
    }

    #[test]
    fn empty_terms_are_rejected() {
        assert_eq!(
            Word::new(" ", "x", "u", "c").unwrap_err(),
            WordError::EmptySource
        );
        assert_eq!(
            Word::new("x", "", "u", "c").unwrap_err(),
            WordError::EmptyTarget
        );
        assert_eq!(
            Word::new("x", "y", "", "c").unwrap_err(),
            WordError::EmptyUnit
        );
    }

    #[test]
    fn direction_picks_prompt_and_answer() {
        let word = Word::new("dog", "it", "Animals", "Pets").unwrap();
        assert_eq!(word.prompt_term(Direction::SourceToTarget), "dog");
        assert_eq!(word.answer_term(Direction::SourceToTarget), "it");
        assert_eq!(word.prompt_term(Direction::TargetToSource), "it");
        assert_eq!(word.answer_term(Direction::TargetToSource), "dog");
    }

    #[test]
    fn mistakes_only_grow() {
        let mut word =
            Word::from_persisted(WordId::new(3), "a".into(), "b".into(), "u".into(), "c".into(), 4)
                .unwrap();
        assert_eq!(word.record_mistake(), 5);
        assert_eq!(word.mistake_count(), 5);
        assert_eq!(word.id(), Some(WordId::new(3)));
    }
}
