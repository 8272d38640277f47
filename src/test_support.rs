use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::core::config::SessionSettings;
use crate::services::session::controller::SessionQuestion;
use crate::services::session::registry::SessionRegistry;
use crate::services::session::store::{AnswerRecord, AttemptOutcome, AttemptStore, NewAttempt};

/// Serializes tests that mutate process environment variables.
pub(crate) fn env_lock() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(())).lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub(crate) fn session_settings() -> SessionSettings {
    SessionSettings {
        max_concurrent_sessions: 100,
        default_time_limit_minutes: 60,
        finished_ttl_seconds: 900,
        reap_interval_seconds: 60,
        submit_grace_seconds: 5,
    }
}

pub(crate) fn registry(settings: SessionSettings) -> SessionRegistry {
    SessionRegistry::new(settings, Arc::new(InMemoryAttemptStore::new()))
}

/// Questions "q0".."qN", four choices each, first choice correct.
pub(crate) fn sample_questions(count: usize) -> Vec<SessionQuestion> {
    (0..count)
        .map(|index| SessionQuestion {
            id: format!("q{index}"),
            choice_count: 4,
            correct_index: 0,
        })
        .collect()
}

#[derive(Debug, Clone)]
pub(crate) struct StoredAttempt {
    pub(crate) exam_id: String,
    pub(crate) total_questions: u32,
    pub(crate) answers: Vec<AnswerRecord>,
    pub(crate) finalized: bool,
    pub(crate) correct_count: u32,
    pub(crate) score_percent: u32,
}

/// In-memory stand-in for the Postgres attempt store. `fail_*` flags make
/// individual calls error; a gated store blocks `create_attempt` until
/// `release()` so tests can observe the Submitting state.
pub(crate) struct InMemoryAttemptStore {
    pub(crate) fail_create: AtomicBool,
    pub(crate) fail_finalize: AtomicBool,
    gate: Option<Arc<Semaphore>>,
    next_id: AtomicU32,
    attempts: Mutex<HashMap<String, StoredAttempt>>,
}

impl InMemoryAttemptStore {
    pub(crate) fn new() -> Self {
        Self {
            fail_create: AtomicBool::new(false),
            fail_finalize: AtomicBool::new(false),
            gate: None,
            next_id: AtomicU32::new(1),
            attempts: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn gated() -> Arc<Self> {
        let mut store = Self::new();
        store.gate = Some(Arc::new(Semaphore::new(0)));
        Arc::new(store)
    }

    pub(crate) fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub(crate) fn attempt(&self, id: &str) -> Option<StoredAttempt> {
        self.lock().get(id).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, StoredAttempt>> {
        self.attempts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl AttemptStore for InMemoryAttemptStore {
    async fn create_attempt(&self, attempt: &NewAttempt) -> anyhow::Result<String> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate semaphore closed").forget();
        }
        if self.fail_create.load(Ordering::SeqCst) {
            anyhow::bail!("injected create failure");
        }

        let id = format!("attempt-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.lock().insert(
            id.clone(),
            StoredAttempt {
                exam_id: attempt.exam_id.clone(),
                total_questions: attempt.total_questions,
                answers: Vec::new(),
                finalized: false,
                correct_count: 0,
                score_percent: 0,
            },
        );
        Ok(id)
    }

    async fn record_answers(
        &self,
        attempt_id: &str,
        answers: &[AnswerRecord],
    ) -> anyhow::Result<()> {
        let mut attempts = self.lock();
        let attempt = attempts
            .get_mut(attempt_id)
            .ok_or_else(|| anyhow::anyhow!("unknown attempt {attempt_id}"))?;
        attempt.answers.extend_from_slice(answers);
        Ok(())
    }

    async fn finalize_attempt(
        &self,
        attempt_id: &str,
        outcome: AttemptOutcome,
    ) -> anyhow::Result<()> {
        if self.fail_finalize.load(Ordering::SeqCst) {
            anyhow::bail!("injected finalize failure");
        }

        let mut attempts = self.lock();
        let attempt = attempts
            .get_mut(attempt_id)
            .ok_or_else(|| anyhow::anyhow!("unknown attempt {attempt_id}"))?;
        if attempt.finalized {
            anyhow::bail!("attempt {attempt_id} already finalized");
        }
        attempt.finalized = true;
        attempt.correct_count = outcome.correct_count;
        attempt.score_percent = outcome.score_percent;
        Ok(())
    }
}
