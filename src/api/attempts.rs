use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::attempt::AttemptResponse;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/:attempt_id", get(get_attempt))
}

async fn get_attempt(
    State(state): State<AppState>,
    Path(attempt_id): Path<String>,
) -> Result<Json<AttemptResponse>, ApiError> {
    let attempt = repositories::attempts::find_by_id(state.db(), &attempt_id)
        .await
        .map_err(|err| ApiError::internal(err, "Failed to load attempt"))?
        .ok_or_else(|| ApiError::NotFound(format!("Attempt {attempt_id} not found")))?;

    let answers = repositories::attempts::list_answers(state.db(), &attempt_id)
        .await
        .map_err(|err| ApiError::internal(err, "Failed to load attempt answers"))?;

    Ok(Json(AttemptResponse::from_model(attempt, answers)))
}
