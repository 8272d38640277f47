use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::exams::fetch_exam;
use crate::core::state::AppState;
use crate::schemas::session::{
    AnswerAck, AnswerSubmit, NavigationAction, NavigationRequest, ScoreResponse, SessionStart,
    SessionView, SubmitRequest, SubmitResponse,
};
use crate::services::session::answers::{AnswerPolicy, RecordOutcome};
use crate::services::session::controller::{SessionConfig, SessionQuestion, SubmitTrigger};
use crate::services::session::registry::{Navigate, SessionError, SubmitOutcome};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(start_session))
        .route("/:session_id", get(view_session))
        .route("/:session_id/answers", post(submit_answer))
        .route("/:session_id/navigation", post(navigate))
        .route("/:session_id/submit", post(submit_session))
}

async fn start_session(
    State(state): State<AppState>,
    Json(payload): Json<SessionStart>,
) -> Result<(StatusCode, Json<SessionView>), ApiError> {
    payload.validate().map_err(|err| ApiError::BadRequest(err.to_string()))?;
    if !payload.group_size_is_valid() {
        return Err(ApiError::BadRequest("group_size must be 1 or 4".to_string()));
    }

    let (exam, questions) = fetch_exam(&state, &payload.exam_id).await?;
    if questions.is_empty() {
        return Err(ApiError::Conflict(format!("Exam {} has no questions", exam.id)));
    }

    let session_questions: Vec<SessionQuestion> = questions
        .iter()
        .map(|question| SessionQuestion {
            id: question.id.clone(),
            choice_count: question.choices.0.len(),
            correct_index: question.correct_index.max(0) as usize,
        })
        .collect();

    let time_limit_minutes = if exam.time_limit_minutes > 0 {
        exam.time_limit_minutes as u32
    } else {
        state.settings().session().default_time_limit_minutes
    };

    let config = SessionConfig {
        answer_policy: if payload.lock_answers {
            AnswerPolicy::LockOnSubmit
        } else {
            AnswerPolicy::EditableUntilFinish
        },
        group_size: payload.group_size,
        time_limit_seconds: time_limit_seconds(time_limit_minutes),
    };

    let (session_id, snapshot) = state
        .sessions()
        .start(exam.id, session_questions, config)
        .map_err(session_error_response)?;

    Ok((StatusCode::CREATED, Json(SessionView::from_snapshot(session_id, snapshot))))
}

async fn view_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    let snapshot = state.sessions().view(&session_id).map_err(session_error_response)?;
    Ok(Json(SessionView::from_snapshot(session_id, snapshot)))
}

async fn submit_answer(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(payload): Json<AnswerSubmit>,
) -> Result<Json<AnswerAck>, ApiError> {
    payload.validate().map_err(|err| ApiError::BadRequest(err.to_string()))?;

    let outcome = state
        .sessions()
        .answer(&session_id, &payload.question_id, payload.choice)
        .map_err(session_error_response)?;

    let outcome = match outcome {
        RecordOutcome::Recorded => "recorded",
        // a locked question keeps its first answer; not an error
        RecordOutcome::Locked => "locked",
        RecordOutcome::UnknownQuestion => {
            return Err(ApiError::NotFound(format!(
                "Question {} is not part of this session",
                payload.question_id
            )))
        }
        RecordOutcome::InvalidChoice => {
            return Err(ApiError::BadRequest("choice is out of range".to_string()))
        }
    };

    let snapshot = state.sessions().view(&session_id).map_err(session_error_response)?;
    Ok(Json(AnswerAck { outcome, answered_count: snapshot.answered_count }))
}

async fn navigate(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(payload): Json<NavigationRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let action = match payload.action {
        NavigationAction::Next => Navigate::Next,
        NavigationAction::Previous => Navigate::Previous,
        NavigationAction::Jump => {
            let index = payload
                .index
                .ok_or_else(|| ApiError::BadRequest("jump requires an index".to_string()))?;
            Navigate::Jump(index)
        }
    };

    let snapshot =
        state.sessions().navigate(&session_id, action).map_err(session_error_response)?;
    Ok(Json(SessionView::from_snapshot(session_id, snapshot)))
}

async fn submit_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(payload): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let outcome = state
        .sessions()
        .submit(&session_id, SubmitTrigger::User, payload.confirmed)
        .await
        .map_err(session_error_response)?;

    let response = match outcome {
        SubmitOutcome::Finished { attempt_id, score } => SubmitResponse::Finished {
            attempt_id,
            score: ScoreResponse::from_summary(score),
        },
        SubmitOutcome::NeedsConfirmation { answered, total } => {
            SubmitResponse::NeedsConfirmation { answered, total }
        }
        SubmitOutcome::AlreadySubmitting => SubmitResponse::AlreadySubmitting,
    };
    Ok(Json(response))
}

/// Saturates instead of wrapping: stored time limits predate the schema
/// bound and must not panic the session start.
fn time_limit_seconds(minutes: u32) -> u32 {
    minutes.saturating_mul(60)
}

fn session_error_response(err: SessionError) -> ApiError {
    match err {
        SessionError::NotFound(id) => ApiError::NotFound(format!("Session {id} not found")),
        SessionError::CapacityExceeded => {
            ApiError::TooManyRequests("Too many concurrent sessions; try again later")
        }
        SessionError::Rejected(_) => {
            ApiError::Conflict("Session does not accept changes in its current state".to_string())
        }
        SessionError::Persist(err) => {
            tracing::error!(error = %err, "attempt persistence failed");
            ApiError::ServiceUnavailable(
                "Could not save the attempt; the session is still in progress".to_string(),
            )
        }
    }
}
