use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::core::time::primitive_now_utc;
use crate::db::models::{Attempt, AttemptAnswer};
use crate::services::session::store::{AnswerRecord, AttemptOutcome, AttemptStore, NewAttempt};

pub(crate) const COLUMNS: &str = "\
    id, exam_id, total_questions, correct_count, score_percent, \
    started_at, ended_at, is_completed, created_at, updated_at";

pub(crate) const ANSWER_COLUMNS: &str =
    "id, attempt_id, question_id, submitted_choice, is_correct, created_at";

pub(crate) async fn create(
    pool: &PgPool,
    id: &str,
    exam_id: &str,
    total_questions: i32,
    started_at: PrimitiveDateTime,
    now: PrimitiveDateTime,
) -> Result<Attempt, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "INSERT INTO attempts (
            id, exam_id, total_questions, correct_count, score_percent,
            started_at, ended_at, is_completed, created_at, updated_at
         ) VALUES ($1,$2,$3,0,0,$4,NULL,FALSE,$5,$5)
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(exam_id)
    .bind(total_questions)
    .bind(started_at)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub(crate) async fn record_answers(
    pool: &PgPool,
    attempt_id: &str,
    answers: &[AnswerRecord],
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    if answers.is_empty() {
        return Ok(());
    }

    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO attempt_answers (
            id, attempt_id, question_id, submitted_choice, is_correct, created_at
         ) ",
    );
    builder.push_values(answers, |mut row, answer| {
        row.push_bind(uuid::Uuid::new_v4().to_string())
            .push_bind(attempt_id)
            .push_bind(&answer.question_id)
            .push_bind(answer.submitted_choice as i32)
            .push_bind(answer.is_correct)
            .push_bind(now);
    });

    builder.build().execute(pool).await?;
    Ok(())
}

/// Marks the attempt completed. Completed attempts are immutable, so the
/// guard keeps a stray second finalize from rewriting the score.
pub(crate) async fn finalize(
    pool: &PgPool,
    attempt_id: &str,
    correct_count: i32,
    score_percent: i32,
    ended_at: PrimitiveDateTime,
    now: PrimitiveDateTime,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "UPDATE attempts SET
            correct_count = $2,
            score_percent = $3,
            ended_at = $4,
            is_completed = TRUE,
            updated_at = $5
         WHERE id = $1 AND is_completed = FALSE
         RETURNING {COLUMNS}"
    ))
    .bind(attempt_id)
    .bind(correct_count)
    .bind(score_percent)
    .bind(ended_at)
    .bind(now)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!("SELECT {COLUMNS} FROM attempts WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_answers(
    pool: &PgPool,
    attempt_id: &str,
) -> Result<Vec<AttemptAnswer>, sqlx::Error> {
    sqlx::query_as::<_, AttemptAnswer>(&format!(
        "SELECT {ANSWER_COLUMNS} FROM attempt_answers WHERE attempt_id = $1 ORDER BY created_at, id"
    ))
    .bind(attempt_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_completed_by_exam(
    pool: &PgPool,
    exam_id: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM attempts \
         WHERE exam_id = $1 AND is_completed = TRUE \
         ORDER BY created_at DESC OFFSET $2 LIMIT $3"
    ))
    .bind(exam_id)
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_completed_by_exam(
    pool: &PgPool,
    exam_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM attempts WHERE exam_id = $1 AND is_completed = TRUE",
    )
    .bind(exam_id)
    .fetch_one(pool)
    .await
}

/// Postgres side of the session persistence boundary.
pub(crate) struct PgAttemptStore {
    pool: PgPool,
}

impl PgAttemptStore {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttemptStore for PgAttemptStore {
    async fn create_attempt(&self, attempt: &NewAttempt) -> anyhow::Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        create(
            &self.pool,
            &id,
            &attempt.exam_id,
            attempt.total_questions as i32,
            attempt.started_at,
            primitive_now_utc(),
        )
        .await?;
        Ok(id)
    }

    async fn record_answers(
        &self,
        attempt_id: &str,
        answers: &[AnswerRecord],
    ) -> anyhow::Result<()> {
        record_answers(&self.pool, attempt_id, answers, primitive_now_utc()).await?;
        Ok(())
    }

    async fn finalize_attempt(
        &self,
        attempt_id: &str,
        outcome: AttemptOutcome,
    ) -> anyhow::Result<()> {
        let finalized = finalize(
            &self.pool,
            attempt_id,
            outcome.correct_count as i32,
            outcome.score_percent as i32,
            outcome.ended_at,
            primitive_now_utc(),
        )
        .await?;

        if finalized.is_none() {
            anyhow::bail!("attempt {attempt_id} is missing or already completed");
        }
        Ok(())
    }
}
