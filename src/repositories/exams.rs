use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::Exam;
use crate::db::types::DifficultyLevel;

pub(crate) const COLUMNS: &str = "\
    id, title, description, category, subcategory, part, difficulty, \
    time_limit_minutes, test_number, total_questions, created_at, updated_at";

pub(crate) struct CreateExam<'a> {
    pub(crate) id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) description: &'a str,
    pub(crate) category: &'a str,
    pub(crate) subcategory: &'a str,
    pub(crate) part: Option<&'a str>,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) time_limit_minutes: i32,
    pub(crate) test_number: i32,
    pub(crate) total_questions: i32,
    pub(crate) now: PrimitiveDateTime,
}

#[derive(Debug, Default)]
pub(crate) struct UpdateExamMetadata<'a> {
    pub(crate) title: Option<&'a str>,
    pub(crate) description: Option<&'a str>,
    pub(crate) difficulty: Option<DifficultyLevel>,
    pub(crate) time_limit_minutes: Option<i32>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ExamListRow {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) category: String,
    pub(crate) subcategory: String,
    pub(crate) part: Option<String>,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) time_limit_minutes: i32,
    pub(crate) test_number: i32,
    pub(crate) total_questions: i32,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) total_count: i64,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateExam<'_>,
) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "INSERT INTO exams (
            id, title, description, category, subcategory, part, difficulty,
            time_limit_minutes, test_number, total_questions, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.title)
    .bind(params.description)
    .bind(params.category)
    .bind(params.subcategory)
    .bind(params.part)
    .bind(params.difficulty)
    .bind(params.time_limit_minutes)
    .bind(params.test_number)
    .bind(params.total_questions)
    .bind(params.now)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list(
    pool: &PgPool,
    category: Option<&str>,
    subcategory: Option<&str>,
    skip: i64,
    limit: i64,
) -> Result<Vec<ExamListRow>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT id, title, category, subcategory, part, difficulty, time_limit_minutes, \
         test_number, total_questions, created_at, COUNT(*) OVER() AS total_count \
         FROM exams WHERE 1=1",
    );

    if let Some(category) = category {
        builder.push(" AND category = ");
        builder.push_bind(category);
    }
    if let Some(subcategory) = subcategory {
        builder.push(" AND subcategory = ");
        builder.push_bind(subcategory);
    }

    builder.push(" ORDER BY category, subcategory, test_number, created_at OFFSET ");
    builder.push_bind(skip);
    builder.push(" LIMIT ");
    builder.push_bind(limit);

    builder.build_query_as::<ExamListRow>().fetch_all(pool).await
}

/// Exams are immutable after import apart from presentation metadata.
pub(crate) async fn update_metadata(
    pool: &PgPool,
    id: &str,
    update: UpdateExamMetadata<'_>,
    now: PrimitiveDateTime,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "UPDATE exams SET
            title = COALESCE($2, title),
            description = COALESCE($3, description),
            difficulty = COALESCE($4, difficulty),
            time_limit_minutes = COALESCE($5, time_limit_minutes),
            updated_at = $6
         WHERE id = $1
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(update.title)
    .bind(update.description)
    .bind(update.difficulty)
    .bind(update.time_limit_minutes)
    .bind(now)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete_by_id(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM exams WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
