use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

use anyhow::Context;
use metrics::counter;
use thiserror::Error;

use crate::core::config::SessionSettings;
use crate::core::time::primitive_now_utc;
use crate::services::session::answers::{RecordOutcome, ScoreSummary};
use crate::services::session::controller::{
    BeginSubmit, EventRejected, ExamSession, SessionConfig, SessionQuestion, SessionSnapshot,
    SubmitPlan, SubmitTrigger,
};
use crate::services::session::store::{AttemptOutcome, AttemptStore};
use crate::services::session::timer::{self, TimerHandle};

#[derive(Debug, Error)]
pub(crate) enum SessionError {
    #[error("session {0} not found")]
    NotFound(String),
    #[error("maximum number of concurrent sessions reached")]
    CapacityExceeded,
    #[error("session does not accept this in its current state")]
    Rejected(EventRejected),
    #[error("failed to persist attempt")]
    Persist(#[source] anyhow::Error),
}

#[derive(Debug)]
pub(crate) enum SubmitOutcome {
    Finished { attempt_id: String, score: ScoreSummary },
    NeedsConfirmation { answered: u32, total: u32 },
    AlreadySubmitting,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Navigate {
    Next,
    Previous,
    Jump(usize),
}

struct SessionSlot {
    session: Mutex<ExamSession>,
    timer: Mutex<Option<TimerHandle>>,
    deadline: Instant,
    finished_at: Mutex<Option<Instant>>,
}

/// Registry of live exam sessions. Sessions are in-memory only; a finished
/// session's results live on as an Attempt row, the slot itself is evicted
/// by the reaper after a TTL.
#[derive(Clone)]
pub(crate) struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    settings: SessionSettings,
    store: Arc<dyn AttemptStore>,
    sessions: Mutex<HashMap<String, Arc<SessionSlot>>>,
}

fn lock<'a, T>(mutex: &'a Mutex<T>) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SessionRegistry {
    pub(crate) fn new(settings: SessionSettings, store: Arc<dyn AttemptStore>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                settings,
                store,
                sessions: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub(crate) fn start(
        &self,
        exam_id: String,
        questions: Vec<SessionQuestion>,
        config: SessionConfig,
    ) -> Result<(String, SessionSnapshot), SessionError> {
        let id = uuid::Uuid::new_v4().to_string();

        let mut session = ExamSession::new(exam_id, questions, config);
        session.begin(primitive_now_utc());
        let snapshot = session.snapshot();

        let slot = Arc::new(SessionSlot {
            session: Mutex::new(session),
            timer: Mutex::new(None),
            deadline: Instant::now()
                + Duration::from_secs(
                    u64::from(config.time_limit_seconds) + self.inner.settings.submit_grace_seconds,
                ),
            finished_at: Mutex::new(None),
        });

        {
            let mut sessions = lock(&self.inner.sessions);
            if sessions.len() as u64 >= self.inner.settings.max_concurrent_sessions {
                return Err(SessionError::CapacityExceeded);
            }
            sessions.insert(id.clone(), Arc::clone(&slot));
        }

        let tick_slot = Arc::downgrade(&slot);
        let registry = self.clone();
        let expire_id = id.clone();
        let handle = timer::start(
            config.time_limit_seconds,
            move |remaining| {
                if let Some(slot) = tick_slot.upgrade() {
                    lock(&slot.session).on_tick(remaining);
                }
            },
            move || {
                tokio::spawn(async move {
                    if let Err(err) =
                        registry.submit(&expire_id, SubmitTrigger::Timer, true).await
                    {
                        tracing::error!(
                            session_id = %expire_id,
                            error = %err,
                            "timer-driven submit failed"
                        );
                    }
                });
            },
        );
        *lock(&slot.timer) = Some(handle);

        counter!("exam_sessions_started_total").increment(1);
        Ok((id, snapshot))
    }

    pub(crate) fn view(&self, id: &str) -> Result<SessionSnapshot, SessionError> {
        let slot = self.slot(id)?;
        let snapshot = lock(&slot.session).snapshot();
        Ok(snapshot)
    }

    pub(crate) fn answer(
        &self,
        id: &str,
        question_id: &str,
        choice: usize,
    ) -> Result<RecordOutcome, SessionError> {
        let slot = self.slot(id)?;
        let outcome = lock(&slot.session)
            .record_answer(question_id, choice)
            .map_err(SessionError::Rejected)?;
        Ok(outcome)
    }

    pub(crate) fn navigate(
        &self,
        id: &str,
        action: Navigate,
    ) -> Result<SessionSnapshot, SessionError> {
        let slot = self.slot(id)?;
        let mut session = lock(&slot.session);
        match action {
            Navigate::Next => session.next(),
            Navigate::Previous => session.previous(),
            Navigate::Jump(index) => session.jump_to(index),
        }
        .map_err(SessionError::Rejected)?;
        Ok(session.snapshot())
    }

    pub(crate) async fn submit(
        &self,
        id: &str,
        trigger: SubmitTrigger,
        confirmed: bool,
    ) -> Result<SubmitOutcome, SessionError> {
        let slot = self.slot(id)?;

        let begin = lock(&slot.session).begin_submit(trigger, confirmed, primitive_now_utc());

        match begin {
            BeginSubmit::Plan(plan) => match self.persist(&plan).await {
                Ok(attempt_id) => {
                    lock(&slot.session).complete_submit(attempt_id.clone());
                    if let Some(timer) = lock(&slot.timer).take() {
                        timer.stop();
                    }
                    *lock(&slot.finished_at) = Some(Instant::now());

                    counter!("exam_sessions_finished_total", "trigger" => trigger.as_str())
                        .increment(1);
                    tracing::info!(
                        session_id = %id,
                        trigger = trigger.as_str(),
                        score_percent = plan.score.percent,
                        "exam session finished"
                    );
                    Ok(SubmitOutcome::Finished { attempt_id, score: plan.score })
                }
                Err(err) => {
                    lock(&slot.session).fail_submit();
                    Err(SessionError::Persist(err))
                }
            },
            BeginSubmit::NeedsConfirmation { answered, total } => {
                Ok(SubmitOutcome::NeedsConfirmation { answered, total })
            }
            BeginSubmit::AlreadySubmitting => Ok(SubmitOutcome::AlreadySubmitting),
            BeginSubmit::AlreadyFinished { attempt_id, score } => {
                Ok(SubmitOutcome::Finished { attempt_id, score })
            }
            BeginSubmit::NotStarted => Err(SessionError::NotFound(id.to_string())),
        }
    }

    /// Evicts finished sessions past their TTL and force-submits sessions
    /// whose deadline passed without the timer firing.
    pub(crate) async fn sweep(&self) {
        let now = Instant::now();
        let ttl = Duration::from_secs(self.inner.settings.finished_ttl_seconds);
        let mut overdue = Vec::new();

        {
            let mut sessions = lock(&self.inner.sessions);
            sessions.retain(|id, slot| match *lock(&slot.finished_at) {
                Some(finished_at) => {
                    let keep = now.duration_since(finished_at) < ttl;
                    if !keep {
                        tracing::debug!(session_id = %id, "evicting finished session");
                    }
                    keep
                }
                None => {
                    if now >= slot.deadline {
                        overdue.push(id.clone());
                    }
                    true
                }
            });
        }

        for id in overdue {
            match self.submit(&id, SubmitTrigger::Timer, true).await {
                Ok(_) => {
                    tracing::warn!(session_id = %id, "force-submitted session past its deadline")
                }
                Err(err) => tracing::error!(
                    session_id = %id,
                    error = %err,
                    "failed to force-submit overdue session"
                ),
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        lock(&self.inner.sessions).len()
    }

    async fn persist(&self, plan: &SubmitPlan) -> anyhow::Result<String> {
        let store = &self.inner.store;
        let attempt_id =
            store.create_attempt(&plan.attempt).await.context("failed to create attempt")?;
        store
            .record_answers(&attempt_id, &plan.answers)
            .await
            .context("failed to record answers")?;
        store
            .finalize_attempt(
                &attempt_id,
                AttemptOutcome {
                    correct_count: plan.score.correct_count,
                    score_percent: plan.score.percent,
                    ended_at: plan.ended_at,
                },
            )
            .await
            .context("failed to finalize attempt")?;
        Ok(attempt_id)
    }

    fn slot(&self, id: &str) -> Result<Arc<SessionSlot>, SessionError> {
        lock(&self.inner.sessions)
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }
}
