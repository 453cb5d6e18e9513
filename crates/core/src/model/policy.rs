use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PolicyError {
    #[error("option count must be at least 2 (got {0})")]
    InvalidOptionCount(u32),

    #[error("coverage percent must be between 0 and 100 (got {0})")]
    InvalidCoverage(u32),

    #[error("count limit requires a limit value")]
    MissingLimit,

    #[error("limit value must be at least 1")]
    InvalidLimit,

    #[error("time limit requires a timer greater than 0 seconds")]
    MissingTimer,
}

//
// ─── ENUMS ─────────────────────────────────────────────────────────────────────
//

/// Which side of a word is asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    /// Show the source term, pick the target term.
    #[default]
    #[serde(rename = "EN_TO_TARGET")]
    SourceToTarget,
    /// Show the target term, pick the source term.
    #[serde(rename = "TARGET_TO_EN")]
    TargetToSource,
}

/// Where a missed word goes back into the pending queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RetryPolicy {
    #[default]
    #[serde(rename = "REQUEUE_AT_END")]
    RequeueAtEnd,
    #[serde(rename = "REQUEUE_RANDOM")]
    RequeueRandom,
}

/// When a session stops accepting answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Termination {
    #[default]
    #[serde(rename = "FINISH_ALL")]
    FinishAll,
    #[serde(rename = "TIME_LIMIT")]
    TimeLimit,
    #[serde(rename = "COUNT_LIMIT")]
    CountLimit,
}

//
// ─── POLICY ────────────────────────────────────────────────────────────────────
//

/// Unvalidated session configuration as supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionPolicyDraft {
    pub units: BTreeSet<String>,
    pub category: String,
    pub direction: Direction,
    pub timer_seconds: u32,
    pub option_count: u32,
    pub retry_policy: RetryPolicy,
    pub termination: Termination,
    pub limit_value: Option<u32>,
    pub coverage_percent: u32,
}

impl Default for SessionPolicyDraft {
    fn default() -> Self {
        Self {
            units: BTreeSet::new(),
            category: String::new(),
            direction: Direction::default(),
            timer_seconds: 0,
            option_count: 4,
            retry_policy: RetryPolicy::default(),
            termination: Termination::default(),
            limit_value: None,
            coverage_percent: 100,
        }
    }
}

impl SessionPolicyDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and normalize the draft.
    ///
    /// Unit and category labels are trimmed and empty units dropped. A
    /// `limit_value` given with a termination other than `CountLimit` is
    /// discarded.
    ///
    /// # Errors
    ///
    /// Returns `PolicyError` when an invariant of the policy does not hold.
    pub fn validate(self) -> Result<SessionPolicy, PolicyError> {
        if self.option_count < 2 {
            return Err(PolicyError::InvalidOptionCount(self.option_count));
        }
        if self.coverage_percent > 100 {
            return Err(PolicyError::InvalidCoverage(self.coverage_percent));
        }

        let limit_value = match self.termination {
            Termination::CountLimit => match self.limit_value {
                None => return Err(PolicyError::MissingLimit),
                Some(0) => return Err(PolicyError::InvalidLimit),
                Some(n) => Some(n),
            },
            Termination::TimeLimit | Termination::FinishAll => None,
        };

        if self.termination == Termination::TimeLimit && self.timer_seconds == 0 {
            return Err(PolicyError::MissingTimer);
        }

        let units = self
            .units
            .into_iter()
            .map(|unit| unit.trim().to_owned())
            .filter(|unit| !unit.is_empty())
            .collect();

        Ok(SessionPolicy {
            units,
            category: self.category.trim().to_owned(),
            direction: self.direction,
            timer_seconds: self.timer_seconds,
            option_count: self.option_count,
            retry_policy: self.retry_policy,
            termination: self.termination,
            limit_value,
            coverage_percent: self.coverage_percent,
        })
    }
}

/// Validated description of how a quiz run behaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "SessionPolicyDraft")]
pub struct SessionPolicy {
    units: BTreeSet<String>,
    category: String,
    direction: Direction,
    timer_seconds: u32,
    option_count: u32,
    retry_policy: RetryPolicy,
    termination: Termination,
    limit_value: Option<u32>,
    coverage_percent: u32,
}

impl TryFrom<SessionPolicyDraft> for SessionPolicy {
    type Error = PolicyError;

    fn try_from(draft: SessionPolicyDraft) -> Result<Self, Self::Error> {
        draft.validate()
    }
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            units: BTreeSet::new(),
            category: String::new(),
            direction: Direction::default(),
            timer_seconds: 0,
            option_count: 4,
            retry_policy: RetryPolicy::default(),
            termination: Termination::default(),
            limit_value: None,
            coverage_percent: 100,
        }
    }
}

impl SessionPolicy {
    /// Unit scope; empty means every unit.
    #[must_use]
    pub fn units(&self) -> &BTreeSet<String> {
        &self.units
    }

    /// Category scope; empty means every category.
    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[must_use]
    pub fn timer_seconds(&self) -> u32 {
        self.timer_seconds
    }

    #[must_use]
    pub fn option_count(&self) -> u32 {
        self.option_count
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    #[must_use]
    pub fn termination(&self) -> Termination {
        self.termination
    }

    #[must_use]
    pub fn limit_value(&self) -> Option<u32> {
        self.limit_value
    }

    #[must_use]
    pub fn coverage_percent(&self) -> u32 {
        self.coverage_percent
    }

    /// Whether a word with the given labels falls inside the scope filter.
    #[must_use]
    pub fn matches(&self, unit: &str, category: &str) -> bool {
        let unit_ok = self.units.is_empty() || self.units.contains(unit);
        let category_ok = self.category.is_empty() || self.category == category;
        unit_ok && category_ok
    }

    /// Whole-session time budget, only for `Termination::TimeLimit`.
    #[must_use]
    pub fn session_time_limit(&self) -> Option<Duration> {
        match self.termination {
            Termination::TimeLimit => Some(Duration::from_secs(u64::from(self.timer_seconds))),
            Termination::FinishAll | Termination::CountLimit => None,
        }
    }

    /// Per-question countdown, used when the timer is not the session budget.
    #[must_use]
    pub fn question_timer(&self) -> Option<Duration> {
        match self.termination {
            Termination::TimeLimit => None,
            Termination::FinishAll | Termination::CountLimit if self.timer_seconds > 0 => {
                Some(Duration::from_secs(u64::from(self.timer_seconds)))
            }
            Termination::FinishAll | Termination::CountLimit => None,
        }
    }

    /// Human-readable scope label used in history entries.
    #[must_use]
    pub fn unit_names(&self) -> String {
        if self.units.is_empty() {
            return String::from("*");
        }
        self.units.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
