use std::collections::{BTreeSet, HashSet, VecDeque};
use std::fmt;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use leksika_core::SessionClock;
use leksika_core::model::{HistoryId, RetryPolicy, SessionPolicy, SessionSummary, Word, WordId};

use super::plan::SessionBuilder;
use super::progress::SessionProgress;
use crate::error::SessionError;

//
// ─── QUESTION & FEEDBACK ───────────────────────────────────────────────────────
//

/// One multiple-choice question for the word at the head of the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    word_id: Option<WordId>,
    prompt: String,
    options: Vec<String>,
    #[serde(skip)]
    correct_index: usize,
}

impl Question {
    #[must_use]
    pub fn word_id(&self) -> Option<WordId> {
        self.word_id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Candidate answers; exactly one of them is correct.
    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }
}

/// New mistake counter for a stored word, to be written back to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MistakeUpdate {
    pub word_id: WordId,
    pub mistake_count: u32,
}

/// Outcome of grading one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerFeedback {
    pub correct: bool,
    pub correct_answer: String,
    /// The question was graded because its timer ran out.
    pub timed_out: bool,
    /// Present for every miss on a word that has a storage id.
    pub write_back: Option<MistakeUpdate>,
    pub is_finished: bool,
}

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

/// In-memory quiz session over a filtered word pool.
///
/// Steps through a shuffled queue of pool indices. Misses are re-queued
/// according to the retry policy, so a word can appear more than once. The
/// engine never touches storage: misses surface as [`MistakeUpdate`]s for the
/// caller to persist.
pub struct SessionEngine {
    policy: SessionPolicy,
    pool: Vec<Word>,
    queue: VecDeque<usize>,
    scheduled: usize,
    current: Option<Question>,
    correct_count: u32,
    missed: BTreeSet<usize>,
    mistakes: Vec<Word>,
    answered: usize,
    total_time: Duration,
    clock: SessionClock,
    started: Duration,
    question_shown: Duration,
    finished: bool,
    rng: StdRng,
    history_id: Option<HistoryId>,
}

impl SessionEngine {
    /// Start a session with a fresh random order and a monotonic clock.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyPool` if no word matches the policy scope.
    pub fn new(policy: SessionPolicy, pool: Vec<Word>) -> Result<Self, SessionError> {
        let rng = StdRng::from_rng(&mut rand::rng());
        Self::with_parts(policy, pool, rng, SessionClock::monotonic())
    }

    /// Start a session whose order and options are reproducible from `seed`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyPool` if no word matches the policy scope.
    pub fn with_seed(
        policy: SessionPolicy,
        pool: Vec<Word>,
        seed: u64,
    ) -> Result<Self, SessionError> {
        Self::with_parts(
            policy,
            pool,
            StdRng::seed_from_u64(seed),
            SessionClock::monotonic(),
        )
    }

    /// Start a session with an explicit random source and clock.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyPool` if no word matches the policy scope.
    pub fn with_parts(
        policy: SessionPolicy,
        pool: Vec<Word>,
        mut rng: StdRng,
        clock: SessionClock,
    ) -> Result<Self, SessionError> {
        let plan = SessionBuilder::new(&policy).build(pool, &mut rng)?;
        let started = clock.elapsed();

        let mut engine = Self {
            policy,
            scheduled: plan.scheduled(),
            pool: plan.pool,
            queue: plan.queue,
            current: None,
            correct_count: 0,
            missed: BTreeSet::new(),
            mistakes: Vec::new(),
            answered: 0,
            total_time: Duration::ZERO,
            clock,
            started,
            question_shown: started,
            finished: false,
            rng,
            history_id: None,
        };
        engine.advance();
        Ok(engine)
    }

    #[must_use]
    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    /// Distinct words scheduled at start.
    #[must_use]
    pub fn scheduled(&self) -> usize {
        self.scheduled
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    #[must_use]
    pub fn history_id(&self) -> Option<HistoryId> {
        self.history_id
    }

    pub(crate) fn set_history_id(&mut self, id: HistoryId) {
        self.history_id = Some(id);
    }

    /// The open question, or `None` once the session has finished.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        if self.is_finished() {
            return None;
        }
        self.current.as_ref()
    }

    /// Whether the session has ended, by exhausting the queue or by running
    /// out of session time.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished || self.deadline_reached()
    }

    /// Grade the option at `choice` for the open question and move on.
    ///
    /// Once the session time has run out nothing is graded, even for a
    /// question that was shown before the limit.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the session has already finished and
    /// `SessionError::InvalidChoice` if `choice` is not an option index.
    pub fn submit_answer(&mut self, choice: usize) -> Result<AnswerFeedback, SessionError> {
        let question = self.open_question()?;
        let len = question.options.len();
        let Some(chosen) = question.options.get(choice) else {
            return Err(SessionError::InvalidChoice { index: choice, len });
        };
        let correct = answer_key(chosen) == answer_key(&question.options[question.correct_index]);
        self.grade(correct, false)
    }

    /// Grade the open question as a miss because its per-question timer ran out.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the session has already finished.
    pub fn expire_current(&mut self) -> Result<AnswerFeedback, SessionError> {
        self.open_question()?;
        self.grade(false, true)
    }

    /// Time left on the per-question timer, if the policy has one.
    #[must_use]
    pub fn question_deadline_remaining(&self) -> Option<Duration> {
        let timer = self.policy.question_timer()?;
        self.current_question()?;
        let spent = self.clock.elapsed().saturating_sub(self.question_shown);
        Some(timer.saturating_sub(spent))
    }

    /// Time left in a `TimeLimit` session.
    #[must_use]
    pub fn session_time_remaining(&self) -> Option<Duration> {
        self.policy
            .session_time_limit()
            .map(|limit| limit.saturating_sub(self.session_elapsed()))
    }

    /// Summary of a finished session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFinished` while the session is still running.
    pub fn summary(&self) -> Result<SessionSummary, SessionError> {
        if !self.is_finished() {
            return Err(SessionError::NotFinished);
        }
        Ok(SessionSummary::new(
            self.correct_count,
            self.mistakes.clone(),
            self.total_time,
            self.missed.len(),
        ))
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            scheduled: self.scheduled,
            answered: self.answered,
            remaining: self.queue.len(),
            correct: self.correct_count,
            is_finished: self.is_finished(),
        }
    }

    fn open_question(&self) -> Result<&Question, SessionError> {
        if self.is_finished() {
            return Err(SessionError::Completed);
        }
        self.current.as_ref().ok_or(SessionError::Completed)
    }

    fn grade(&mut self, correct: bool, timed_out: bool) -> Result<AnswerFeedback, SessionError> {
        let Some(idx) = self.queue.pop_front() else {
            return Err(SessionError::Completed);
        };

        let spent = self.clock.elapsed().saturating_sub(self.question_shown);
        self.total_time = self.total_time.saturating_add(spent);
        self.answered += 1;

        let correct_answer = self.pool[idx]
            .answer_term(self.policy.direction())
            .to_owned();

        let mut write_back = None;
        if correct {
            // A retired miss was already counted once.
            if !self.missed.contains(&idx) {
                self.correct_count = self.correct_count.saturating_add(1);
            }
        } else {
            let word = &mut self.pool[idx];
            let mistake_count = word.record_mistake();
            write_back = word.id().map(|word_id| MistakeUpdate {
                word_id,
                mistake_count,
            });
            self.mistakes.push(word.clone());
            self.missed.insert(idx);
            self.requeue(idx);
        }

        self.advance();

        Ok(AnswerFeedback {
            correct,
            correct_answer,
            timed_out,
            write_back,
            is_finished: self.finished,
        })
    }

    fn requeue(&mut self, idx: usize) {
        match self.policy.retry_policy() {
            RetryPolicy::RequeueAtEnd => self.queue.push_back(idx),
            RetryPolicy::RequeueRandom => {
                let len = self.queue.len();
                let at = if len == 0 {
                    0
                } else {
                    self.rng.random_range(1..=len)
                };
                self.queue.insert(at, idx);
            }
        }
    }

    /// Latch the finished state or prepare the question for the new head.
    fn advance(&mut self) {
        let head = if self.deadline_reached() {
            None
        } else {
            self.queue.front().copied()
        };

        match head {
            Some(idx) => {
                self.current = Some(self.build_question(idx));
                self.question_shown = self.clock.elapsed();
            }
            None => {
                self.current = None;
                self.finished = true;
            }
        }
    }

    fn build_question(&mut self, idx: usize) -> Question {
        let direction = self.policy.direction();
        let word = &self.pool[idx];
        let word_id = word.id();
        let prompt = word.prompt_term(direction).to_owned();
        let correct = word.answer_term(direction).to_owned();

        let mut seen = HashSet::from([answer_key(&correct)]);
        let mut options = Vec::new();
        for (i, other) in self.pool.iter().enumerate() {
            if i == idx {
                continue;
            }
            let term = other.answer_term(direction);
            if seen.insert(answer_key(term)) {
                options.push(term.to_owned());
            }
        }

        let distractors = usize::try_from(self.policy.option_count())
            .unwrap_or(usize::MAX)
            .saturating_sub(1);
        options.shuffle(&mut self.rng);
        options.truncate(distractors);

        let correct_index = self.rng.random_range(0..=options.len());
        options.insert(correct_index, correct);

        Question {
            word_id,
            prompt,
            options,
            correct_index,
        }
    }

    fn session_elapsed(&self) -> Duration {
        self.clock.elapsed().saturating_sub(self.started)
    }

    fn deadline_reached(&self) -> bool {
        self.policy
            .session_time_limit()
            .is_some_and(|limit| self.session_elapsed() >= limit)
    }
}

fn answer_key(term: &str) -> String {
    term.trim().to_lowercase()
}

impl fmt::Debug for SessionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionEngine")
            .field("pool_len", &self.pool.len())
            .field("scheduled", &self.scheduled)
            .field("queue_len", &self.queue.len())
            .field("answered", &self.answered)
            .field("correct_count", &self.correct_count)
            .field("missed", &self.missed.len())
            .field("finished", &self.finished)
            .field("history_id", &self.history_id)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
