use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::pagination::{clamp_page, default_limit, PaginatedResponse};
use crate::core::state::AppState;
use crate::core::time::{format_primitive, primitive_now_utc};
use crate::db::models::{Attempt, Exam, Question};
use crate::repositories;
use crate::schemas::exam::{
    ExamCreate, ExamResponse, ExamSummaryResponse, ExamUpdate, MAX_TIME_LIMIT_MINUTES,
};
use crate::services::import::parser::{
    default_header, to_default_row, validate_passages, ParsedQuestion,
};
use crate::services::import::{save_exam, NewExam};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_exams).post(create_exam))
        .route("/:exam_id", get(get_exam).patch(update_exam).delete(delete_exam))
        .route("/:exam_id/export", get(export_exam))
        .route("/:exam_id/attempts", get(list_exam_attempts))
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExamListQuery {
    pub(crate) category: Option<String>,
    pub(crate) subcategory: Option<String>,
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "default_limit")]
    pub(crate) limit: i64,
}

async fn create_exam(
    State(state): State<AppState>,
    Json(payload): Json<ExamCreate>,
) -> Result<(StatusCode, Json<ExamResponse>), ApiError> {
    payload.validate().map_err(|err| ApiError::BadRequest(err.to_string()))?;

    let mut questions = Vec::with_capacity(payload.questions.len());
    for (position, question) in payload.questions.iter().enumerate() {
        if question.correct_index >= question.choices.len() {
            return Err(ApiError::BadRequest(format!(
                "question {}: correct_index is out of range",
                position + 1
            )));
        }
        questions.push(ParsedQuestion {
            order_num: question.order_num.unwrap_or((position + 1) as i32),
            question_text: question.question_text.trim().to_string(),
            choices: question.choices.clone(),
            correct_index: question.correct_index,
            explanation: question.explanation.clone().filter(|text| !text.trim().is_empty()),
            part: question.part.clone().filter(|text| !text.trim().is_empty()),
            passage: question.passage.clone().filter(|text| !text.trim().is_empty()),
            blank_number: question.blank_number,
        });
    }
    validate_passages(&questions).map_err(|err| ApiError::BadRequest(err.to_string()))?;

    let time_limit_minutes = payload
        .time_limit_minutes
        .unwrap_or(state.settings().session().default_time_limit_minutes as i32);
    if !(1..=MAX_TIME_LIMIT_MINUTES).contains(&time_limit_minutes) {
        return Err(ApiError::BadRequest("time_limit_minutes is out of range".to_string()));
    }

    let exam = save_exam(
        state.db(),
        NewExam {
            title: &payload.title,
            description: &payload.description,
            category: &payload.category,
            subcategory: &payload.subcategory,
            part: payload.part.as_deref(),
            difficulty: payload.difficulty,
            time_limit_minutes,
            test_number: payload.test_number,
        },
        &questions,
    )
    .await
    .map_err(|err| ApiError::internal(err, "Failed to create exam"))?;

    let stored = load_exam_with_questions(&state, &exam.id).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn list_exams(
    State(state): State<AppState>,
    Query(query): Query<ExamListQuery>,
) -> Result<Json<PaginatedResponse<ExamSummaryResponse>>, ApiError> {
    let (skip, limit) = clamp_page(query.skip, query.limit);
    let rows = repositories::exams::list(
        state.db(),
        query.category.as_deref(),
        query.subcategory.as_deref(),
        skip,
        limit,
    )
    .await
    .map_err(|err| ApiError::internal(err, "Failed to list exams"))?;

    let total_count = rows.first().map(|row| row.total_count).unwrap_or(0);
    let items = rows
        .into_iter()
        .map(|row| ExamSummaryResponse {
            id: row.id,
            title: row.title,
            category: row.category,
            subcategory: row.subcategory,
            part: row.part,
            difficulty: row.difficulty,
            time_limit_minutes: row.time_limit_minutes,
            test_number: row.test_number,
            total_questions: row.total_questions,
            created_at: format_primitive(row.created_at),
        })
        .collect();

    Ok(Json(PaginatedResponse { items, total_count, skip, limit }))
}

async fn get_exam(
    State(state): State<AppState>,
    Path(exam_id): Path<String>,
) -> Result<Json<ExamResponse>, ApiError> {
    let exam = load_exam_with_questions(&state, &exam_id).await?;
    Ok(Json(exam))
}

async fn update_exam(
    State(state): State<AppState>,
    Path(exam_id): Path<String>,
    Json(payload): Json<ExamUpdate>,
) -> Result<Json<ExamResponse>, ApiError> {
    payload.validate().map_err(|err| ApiError::BadRequest(err.to_string()))?;

    let updated = repositories::exams::update_metadata(
        state.db(),
        &exam_id,
        repositories::exams::UpdateExamMetadata {
            title: payload.title.as_deref(),
            description: payload.description.as_deref(),
            difficulty: payload.difficulty,
            time_limit_minutes: payload.time_limit_minutes,
        },
        primitive_now_utc(),
    )
    .await
    .map_err(|err| ApiError::internal(err, "Failed to update exam"))?;

    if updated.is_none() {
        return Err(ApiError::NotFound(format!("Exam {exam_id} not found")));
    }

    let exam = load_exam_with_questions(&state, &exam_id).await?;
    Ok(Json(exam))
}

async fn delete_exam(
    State(state): State<AppState>,
    Path(exam_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let deleted = repositories::exams::delete_by_id(state.db(), &exam_id)
        .await
        .map_err(|err| ApiError::internal(err, "Failed to delete exam"))?;

    if !deleted {
        return Err(ApiError::NotFound(format!("Exam {exam_id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Streams the exam back out in the 8-column default sheet shape, so an
/// exported file re-imports to the same questions.
async fn export_exam(
    State(state): State<AppState>,
    Path(exam_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (exam, questions) = fetch_exam(&state, &exam_id).await?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(default_header())
        .map_err(|err| ApiError::internal(err, "Failed to write export header"))?;
    for question in &questions {
        let parsed = question_to_parsed(question);
        writer
            .write_record(to_default_row(&parsed))
            .map_err(|err| ApiError::internal(err, "Failed to write export row"))?;
    }
    let body = writer
        .into_inner()
        .map_err(|err| ApiError::internal(err, "Failed to finish export"))?;

    let disposition = format!("attachment; filename=\"exam-{}.csv\"", exam.id);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

#[derive(Debug, Deserialize)]
pub(crate) struct AttemptListQuery {
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "default_limit")]
    pub(crate) limit: i64,
}

async fn list_exam_attempts(
    State(state): State<AppState>,
    Path(exam_id): Path<String>,
    Query(query): Query<AttemptListQuery>,
) -> Result<Json<PaginatedResponse<crate::schemas::attempt::AttemptSummaryResponse>>, ApiError> {
    if repositories::exams::find_by_id(state.db(), &exam_id)
        .await
        .map_err(|err| ApiError::internal(err, "Failed to load exam"))?
        .is_none()
    {
        return Err(ApiError::NotFound(format!("Exam {exam_id} not found")));
    }

    let (skip, limit) = clamp_page(query.skip, query.limit);
    let attempts: Vec<Attempt> =
        repositories::attempts::list_completed_by_exam(state.db(), &exam_id, skip, limit)
            .await
            .map_err(|err| ApiError::internal(err, "Failed to list attempts"))?;

    let total_count = repositories::attempts::count_completed_by_exam(state.db(), &exam_id)
        .await
        .map_err(|err| ApiError::internal(err, "Failed to count attempts"))?;
    let items = attempts
        .into_iter()
        .map(crate::schemas::attempt::AttemptSummaryResponse::from_model)
        .collect();

    Ok(Json(PaginatedResponse { items, total_count, skip, limit }))
}

pub(in crate::api) fn question_to_parsed(question: &Question) -> ParsedQuestion {
    ParsedQuestion {
        order_num: question.order_num,
        question_text: question.question_text.clone(),
        choices: question.choices.0.clone(),
        correct_index: question.correct_index.max(0) as usize,
        explanation: question.explanation.clone(),
        part: question.part.clone(),
        passage: question.passage.clone(),
        blank_number: question.blank_number,
    }
}

pub(in crate::api) async fn fetch_exam(
    state: &AppState,
    exam_id: &str,
) -> Result<(Exam, Vec<Question>), ApiError> {
    let exam = repositories::exams::find_by_id(state.db(), exam_id)
        .await
        .map_err(|err| ApiError::internal(err, "Failed to load exam"))?
        .ok_or_else(|| ApiError::NotFound(format!("Exam {exam_id} not found")))?;

    let questions = repositories::questions::list_by_exam(state.db(), exam_id)
        .await
        .map_err(|err| ApiError::internal(err, "Failed to load questions"))?;

    Ok((exam, questions))
}

async fn load_exam_with_questions(
    state: &AppState,
    exam_id: &str,
) -> Result<ExamResponse, ApiError> {
    let (exam, questions) = fetch_exam(state, exam_id).await?;
    Ok(ExamResponse::from_model(exam, questions))
}
