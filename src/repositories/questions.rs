use sqlx::types::Json as SqlxJson;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Question;

pub(crate) const COLUMNS: &str = "\
    id, exam_id, order_num, question_text, choices, correct_index, \
    explanation, part, passage, blank_number, created_at";

pub(crate) struct InsertQuestion<'a> {
    pub(crate) id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) order_num: i32,
    pub(crate) question_text: &'a str,
    pub(crate) choices: &'a [String],
    pub(crate) correct_index: i32,
    pub(crate) explanation: Option<&'a str>,
    pub(crate) part: Option<&'a str>,
    pub(crate) passage: Option<&'a str>,
    pub(crate) blank_number: Option<i32>,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) async fn insert(
    executor: impl sqlx::PgExecutor<'_>,
    params: InsertQuestion<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO questions (
            id, exam_id, order_num, question_text, choices, correct_index,
            explanation, part, passage, blank_number, created_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)",
    )
    .bind(params.id)
    .bind(params.exam_id)
    .bind(params.order_num)
    .bind(params.question_text)
    .bind(SqlxJson(params.choices))
    .bind(params.correct_index)
    .bind(params.explanation)
    .bind(params.part)
    .bind(params.passage)
    .bind(params.blank_number)
    .bind(params.now)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn list_by_exam(
    pool: &PgPool,
    exam_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE exam_id = $1 ORDER BY order_num, id"
    ))
    .bind(exam_id)
    .fetch_all(pool)
    .await
}

