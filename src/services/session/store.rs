use async_trait::async_trait;
use time::PrimitiveDateTime;

#[derive(Debug, Clone)]
pub(crate) struct NewAttempt {
    pub(crate) exam_id: String,
    pub(crate) total_questions: u32,
    pub(crate) started_at: PrimitiveDateTime,
}

#[derive(Debug, Clone)]
pub(crate) struct AnswerRecord {
    pub(crate) question_id: String,
    pub(crate) submitted_choice: usize,
    pub(crate) is_correct: bool,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct AttemptOutcome {
    pub(crate) correct_count: u32,
    pub(crate) score_percent: u32,
    pub(crate) ended_at: PrimitiveDateTime,
}

/// Persistence boundary for finished sessions. The Postgres implementation
/// lives in `repositories::attempts`; tests use an in-memory fake.
#[async_trait]
pub(crate) trait AttemptStore: Send + Sync {
    async fn create_attempt(&self, attempt: &NewAttempt) -> anyhow::Result<String>;

    async fn record_answers(
        &self,
        attempt_id: &str,
        answers: &[AnswerRecord],
    ) -> anyhow::Result<()>;

    async fn finalize_attempt(
        &self,
        attempt_id: &str,
        outcome: AttemptOutcome,
    ) -> anyhow::Result<()>;
}
