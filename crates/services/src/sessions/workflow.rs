use std::sync::{Arc, Mutex, PoisonError};

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use leksika_core::SessionClock;
use leksika_core::model::{HistoryEntry, HistoryId, SessionPolicy};
use leksika_storage::repository::{HistoryRepository, WordRepository};

use super::engine::{AnswerFeedback, MistakeUpdate, SessionEngine};
use crate::Clock;
use crate::error::SessionError;

/// Result of grading a single question in a persisted session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionAnswerResult {
    pub feedback: AnswerFeedback,
    pub is_finished: bool,
    pub history_id: Option<HistoryId>,
}

/// Orchestrates session start, mistake write-back and history persistence.
///
/// Mistake counters are written back on spawned tasks so grading never waits
/// on storage; a failed write-back is logged and dropped.
#[derive(Clone)]
pub struct SessionLoopService {
    clock: Clock,
    words: Arc<dyn WordRepository>,
    history: Arc<dyn HistoryRepository>,
    write_backs: Arc<Mutex<JoinSet<()>>>,
}

impl SessionLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        words: Arc<dyn WordRepository>,
        history: Arc<dyn HistoryRepository>,
    ) -> Self {
        Self {
            clock,
            words,
            history,
            write_backs: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    /// Start a new session over the stored words.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for storage failures or an empty scope.
    pub async fn start_session(&self, policy: SessionPolicy) -> Result<SessionEngine, SessionError> {
        let rng = StdRng::from_rng(&mut rand::rng());
        self.start_session_with(policy, rng, SessionClock::monotonic())
            .await
    }

    /// Start a new session whose order is reproducible from `seed`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for storage failures or an empty scope.
    pub async fn start_session_seeded(
        &self,
        policy: SessionPolicy,
        seed: u64,
    ) -> Result<SessionEngine, SessionError> {
        self.start_session_with(policy, StdRng::seed_from_u64(seed), SessionClock::monotonic())
            .await
    }

    /// Start a new session with an explicit random source and session clock.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for storage failures or an empty scope.
    pub async fn start_session_with(
        &self,
        policy: SessionPolicy,
        rng: StdRng,
        clock: SessionClock,
    ) -> Result<SessionEngine, SessionError> {
        let words = self.words.list_words().await?;
        let stored = words.len();
        let session = SessionEngine::with_parts(policy, words, rng, clock)?;
        debug!(
            stored,
            scheduled = session.scheduled(),
            units = %session.policy().unit_names(),
            "session started"
        );
        Ok(session)
    }

    /// Grade the open question and persist the history entry when the session
    /// finishes.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for protocol misuse or a failed history append.
    pub async fn answer_current(
        &self,
        session: &mut SessionEngine,
        choice: usize,
    ) -> Result<SessionAnswerResult, SessionError> {
        let feedback = session.submit_answer(choice)?;
        self.after_grade(session, feedback).await
    }

    /// Grade the open question as a timed-out miss.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for protocol misuse or a failed history append.
    pub async fn expire_current(
        &self,
        session: &mut SessionEngine,
    ) -> Result<SessionAnswerResult, SessionError> {
        let feedback = session.expire_current()?;
        self.after_grade(session, feedback).await
    }

    async fn after_grade(
        &self,
        session: &mut SessionEngine,
        feedback: AnswerFeedback,
    ) -> Result<SessionAnswerResult, SessionError> {
        if let Some(update) = feedback.write_back {
            self.spawn_write_back(update);
        }

        if session.is_finished() && session.history_id().is_none() {
            self.finalize_history(session).await?;
        }

        Ok(SessionAnswerResult {
            feedback,
            is_finished: session.is_finished(),
            history_id: session.history_id(),
        })
    }

    /// Persist the history entry of a finished session.
    ///
    /// Returns the existing id if the entry was already stored, so it can be
    /// retried after a failed append or called for a session that ran out of
    /// time without a final answer.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFinished` if the session is still running.
    /// Returns `SessionError::Storage` if persistence fails.
    pub async fn finalize_history(
        &self,
        session: &mut SessionEngine,
    ) -> Result<HistoryId, SessionError> {
        if let Some(id) = session.history_id() {
            return Ok(id);
        }

        let summary = session.summary()?;
        let entry =
            HistoryEntry::from_summary(&summary, session.policy().unit_names(), self.clock.now());
        let id = self.history.append_history(&entry).await?;
        session.set_history_id(id);
        debug!(
            history_id = %id,
            correct = entry.correct(),
            total = entry.total(),
            "session finished"
        );
        Ok(id)
    }

    /// Wait for every pending mistake write-back; returns how many completed.
    pub async fn drain_write_backs(&self) -> usize {
        let mut pending = {
            let mut guard = self
                .write_backs
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *guard)
        };

        let mut done = 0;
        while let Some(joined) = pending.join_next().await {
            if let Err(err) = joined {
                warn!(error = %err, "mistake write-back task aborted");
            }
            done += 1;
        }
        done
    }

    fn spawn_write_back(&self, update: MistakeUpdate) {
        let words = Arc::clone(&self.words);
        let mut tasks = self
            .write_backs
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while tasks.try_join_next().is_some() {}

        tasks.spawn(async move {
            if let Err(err) = words
                .update_mistake_count(update.word_id, update.mistake_count)
                .await
            {
                warn!(
                    word_id = %update.word_id,
                    mistake_count = update.mistake_count,
                    error = %err,
                    "mistake write-back failed"
                );
            }
        });
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use leksika_core::model::{SessionPolicyDraft, Termination, Word, WordId};
    use leksika_core::time::fixed_now;
    use leksika_storage::repository::{InMemoryRepository, StorageError};
    use std::time::Duration;

    fn build_word(source: &str) -> Word {
        Word::new(source, format!("{source}-t"), "Unit", "Cat").unwrap()
    }

    async fn seeded_repo(n: usize) -> InMemoryRepository {
        let repo = InMemoryRepository::new();
        let words: Vec<Word> = (0..n).map(|i| build_word(&format!("w{i}"))).collect();
        repo.insert_words(&words).await.unwrap();
        repo
    }

    fn service(repo: &InMemoryRepository) -> SessionLoopService {
        SessionLoopService::new(
            Clock::fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
    }

    fn choice_for(session: &SessionEngine, correct: bool) -> usize {
        let question = session.current_question().unwrap();
        let id = question.word_id().unwrap().value();
        let answer = format!("w{}-t", id - 1);
        let right = question
            .options()
            .iter()
            .position(|o| *o == answer)
            .unwrap();
        if correct {
            right
        } else {
            (right + 1) % question.options().len()
        }
    }

    struct FailingWords {
        inner: InMemoryRepository,
    }

    #[async_trait]
    impl WordRepository for FailingWords {
        async fn list_words(&self) -> Result<Vec<Word>, StorageError> {
            self.inner.list_words().await
        }

        async fn insert_words(&self, words: &[Word]) -> Result<Vec<WordId>, StorageError> {
            self.inner.insert_words(words).await
        }

        async fn update_mistake_count(&self, _id: WordId, _count: u32) -> Result<(), StorageError> {
            Err(StorageError::Connection("offline".into()))
        }
    }

    #[tokio::test]
    async fn misses_are_written_back_in_background() {
        let repo = seeded_repo(3).await;
        let svc = service(&repo);
        let mut session = svc
            .start_session_seeded(SessionPolicy::default(), 7)
            .await
            .unwrap();

        let missed = session.current_question().unwrap().word_id().unwrap();
        let choice = choice_for(&session, false);
        let result = svc.answer_current(&mut session, choice).await.unwrap();
        assert!(!result.feedback.correct);
        assert!(result.history_id.is_none());

        assert_eq!(svc.drain_write_backs().await, 1);
        let stored = repo.list_words().await.unwrap();
        let word = stored.iter().find(|w| w.id() == Some(missed)).unwrap();
        assert_eq!(word.mistake_count(), 1);
    }

    #[tokio::test]
    async fn failed_write_back_does_not_abort_session() {
        let inner = seeded_repo(2).await;
        let svc = SessionLoopService::new(
            Clock::fixed(fixed_now()),
            Arc::new(FailingWords {
                inner: inner.clone(),
            }),
            Arc::new(inner.clone()),
        );
        let mut session = svc
            .start_session_seeded(SessionPolicy::default(), 1)
            .await
            .unwrap();

        let choice = choice_for(&session, false);
        svc.answer_current(&mut session, choice).await.unwrap();
        while !session.is_finished() {
            let choice = choice_for(&session, true);
            svc.answer_current(&mut session, choice).await.unwrap();
        }
        assert_eq!(svc.drain_write_backs().await, 1);

        assert!(session.history_id().is_some());
        let summary = session.summary().unwrap();
        assert_eq!(summary.mistakes().len(), 1);
        assert_eq!(summary.mistakes()[0].mistake_count(), 1);
        assert!(inner.list_words().await.unwrap().iter().all(|w| w.mistake_count() == 0));
    }

    #[tokio::test]
    async fn finished_session_appends_history_once() {
        let repo = seeded_repo(2).await;
        let svc = service(&repo);
        let mut session = svc
            .start_session_seeded(SessionPolicy::default(), 3)
            .await
            .unwrap();

        let mut last = None;
        while !session.is_finished() {
            let choice = choice_for(&session, true);
            last = Some(svc.answer_current(&mut session, choice).await.unwrap());
        }
        let last = last.unwrap();
        assert!(last.is_finished);
        let id = last.history_id.unwrap();

        assert_eq!(svc.finalize_history(&mut session).await.unwrap(), id);
        let entries = repo.list_history(10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].unit_names(), "*");
        assert_eq!(entries[0].correct(), 2);
        assert_eq!(entries[0].total(), 2);
        assert_eq!(entries[0].completed_at(), fixed_now());
    }

    #[tokio::test]
    async fn time_limited_session_is_finalized_without_answer() {
        let repo = seeded_repo(4).await;
        let svc = service(&repo);
        let policy = SessionPolicyDraft {
            termination: Termination::TimeLimit,
            timer_seconds: 30,
            ..SessionPolicyDraft::default()
        }
        .validate()
        .unwrap();
        let clock = SessionClock::manual();
        let mut session = svc
            .start_session_with(policy, StdRng::seed_from_u64(2), clock.clone())
            .await
            .unwrap();

        assert!(matches!(
            svc.finalize_history(&mut session).await,
            Err(SessionError::NotFinished)
        ));

        clock.advance(Duration::from_secs(31));
        let id = svc.finalize_history(&mut session).await.unwrap();
        assert_eq!(session.history_id(), Some(id));
        let entries = repo.list_history(1).await.unwrap();
        assert_eq!(entries[0].total(), 0);
    }

    #[tokio::test]
    async fn time_limited_session_stays_closed_after_history() {
        let repo = seeded_repo(3).await;
        let svc = service(&repo);
        let policy = SessionPolicyDraft {
            termination: Termination::TimeLimit,
            timer_seconds: 5,
            ..SessionPolicyDraft::default()
        }
        .validate()
        .unwrap();
        let clock = SessionClock::manual();
        let mut session = svc
            .start_session_with(policy, StdRng::seed_from_u64(4), clock.clone())
            .await
            .unwrap();
        let wrong = choice_for(&session, false);

        clock.advance(Duration::from_secs(6));
        svc.finalize_history(&mut session).await.unwrap();

        assert!(matches!(
            svc.answer_current(&mut session, wrong).await,
            Err(SessionError::Completed)
        ));
        assert!(matches!(
            svc.expire_current(&mut session).await,
            Err(SessionError::Completed)
        ));
        assert_eq!(svc.drain_write_backs().await, 0);

        let entries = repo.list_history(5).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].total(), 0);
        let stored = repo.list_words().await.unwrap();
        assert!(stored.iter().all(|w| w.mistake_count() == 0));
    }

    #[tokio::test]
    async fn expired_question_is_written_back() {
        let repo = seeded_repo(2).await;
        let svc = service(&repo);
        let policy = SessionPolicyDraft {
            timer_seconds: 5,
            ..SessionPolicyDraft::default()
        }
        .validate()
        .unwrap();
        let mut session = svc.start_session_seeded(policy, 0).await.unwrap();

        let missed = session.current_question().unwrap().word_id().unwrap();
        let result = svc.expire_current(&mut session).await.unwrap();
        assert!(result.feedback.timed_out);
        svc.drain_write_backs().await;

        let stored = repo.list_words().await.unwrap();
        let word = stored.iter().find(|w| w.id() == Some(missed)).unwrap();
        assert_eq!(word.mistake_count(), 1);
    }

    #[tokio::test]
    async fn empty_store_cannot_start() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo);
        let err = svc
            .start_session(SessionPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::EmptyPool { .. }));
    }
}
