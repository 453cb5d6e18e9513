use std::collections::VecDeque;

use rand::Rng;
use rand::seq::SliceRandom;

use leksika_core::model::{SessionPolicy, Termination, Word};

use crate::error::SessionError;

/// Selection result for a session build.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPlan {
    /// Words inside the policy scope; distractors are drawn from here.
    pub pool: Vec<Word>,
    /// Scheduled pool indices in asking order.
    pub queue: VecDeque<usize>,
}

impl SessionPlan {
    /// Number of distinct words scheduled for the session.
    #[must_use]
    pub fn scheduled(&self) -> usize {
        self.queue.len()
    }
}

/// Builds a session by filtering the stored words to the policy scope and
/// picking the covered subset in random order.
pub struct SessionBuilder<'a> {
    policy: &'a SessionPolicy,
}

impl<'a> SessionBuilder<'a> {
    #[must_use]
    pub fn new(policy: &'a SessionPolicy) -> Self {
        Self { policy }
    }

    /// Build a session plan from the stored words.
    ///
    /// - Words outside the unit/category scope are dropped.
    /// - `coverage_percent` of the remaining words is scheduled, at least one.
    /// - `CountLimit` additionally caps the schedule at `limit_value`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyPool` when no word matches the scope.
    pub fn build<R: Rng + ?Sized>(
        self,
        words: impl IntoIterator<Item = Word>,
        rng: &mut R,
    ) -> Result<SessionPlan, SessionError> {
        let pool: Vec<Word> = words
            .into_iter()
            .filter(|w| self.policy.matches(w.unit(), w.category()))
            .collect();

        if pool.is_empty() {
            return Err(SessionError::EmptyPool {
                units: self.policy.units().clone(),
                category: self.policy.category().to_owned(),
            });
        }

        let take = scheduled_count(self.policy, pool.len());
        let mut order: Vec<usize> = (0..pool.len()).collect();
        order.as_mut_slice().shuffle(rng);
        order.truncate(take);

        Ok(SessionPlan {
            pool,
            queue: order.into_iter().collect(),
        })
    }
}

/// Distinct words to schedule out of `pool_len` matching ones.
///
/// Coverage rounds half up, never drops below one and never exceeds the pool.
#[must_use]
pub fn scheduled_count(policy: &SessionPolicy, pool_len: usize) -> usize {
    let pool = u64::try_from(pool_len).unwrap_or(u64::MAX);
    let covered = pool
        .saturating_mul(u64::from(policy.coverage_percent()))
        .saturating_add(50)
        / 100;
    let covered = usize::try_from(covered).unwrap_or(usize::MAX).clamp(1, pool_len.max(1));

    match (policy.termination(), policy.limit_value()) {
        (Termination::CountLimit, Some(limit)) => {
            covered.min(usize::try_from(limit).unwrap_or(usize::MAX))
        }
        _ => covered,
    }
}
