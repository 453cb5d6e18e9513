use std::time::Duration;

use serde::Serialize;

use crate::model::Word;

/// Result of a finished quiz session.
///
/// Built once when the session terminates and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    correct_count: u32,
    mistakes: Vec<Word>,
    total_time_seconds: f64,
    avg_time_seconds: f64,
}

impl SessionSummary {
    /// Build a summary from the final session counters.
    ///
    /// The average divides the total time by the number of distinct words the
    /// learner dealt with (`correct_count + distinct_missed`), never by zero.
    #[must_use]
    pub fn new(
        correct_count: u32,
        mistakes: Vec<Word>,
        total_time: Duration,
        distinct_missed: usize,
    ) -> Self {
        let total_time_seconds = total_time.as_secs_f64();
        let attempted = u64::from(correct_count)
            .saturating_add(u64::try_from(distinct_missed).unwrap_or(u64::MAX))
            .max(1);
        #[allow(clippy::cast_precision_loss)]
        let avg_time_seconds = total_time_seconds / attempted as f64;

        Self {
            correct_count,
            mistakes,
            total_time_seconds,
            avg_time_seconds,
        }
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    /// Every miss in answer order; a word missed twice appears twice.
    #[must_use]
    pub fn mistakes(&self) -> &[Word] {
        &self.mistakes
    }

    #[must_use]
    pub fn total_time_seconds(&self) -> f64 {
        self.total_time_seconds
    }

    #[must_use]
    pub fn avg_time_seconds(&self) -> f64 {
        self.avg_time_seconds
    }

    /// Answers given, counting each miss separately.
    #[must_use]
    pub fn total_answers(&self) -> u32 {
        let misses = u32::try_from(self.mistakes.len()).unwrap_or(u32::MAX);
        self.correct_count.saturating_add(misses)
    }
}
