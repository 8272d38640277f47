use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::session::answers::ScoreSummary;
use crate::services::session::controller::SessionSnapshot;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SessionStart {
    #[serde(alias = "examId")]
    #[validate(length(min = 1, message = "exam_id must not be empty"))]
    pub(crate) exam_id: String,
    /// false = answers stay editable until the final submit
    #[serde(default)]
    #[serde(alias = "lockAnswers")]
    pub(crate) lock_answers: bool,
    #[serde(default = "default_group_size")]
    #[serde(alias = "groupSize")]
    pub(crate) group_size: usize,
}

impl SessionStart {
    pub(crate) fn group_size_is_valid(&self) -> bool {
        matches!(self.group_size, 1 | 4)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionView {
    pub(crate) session_id: String,
    pub(crate) exam_id: String,
    pub(crate) state: &'static str,
    pub(crate) current_position: usize,
    pub(crate) position_count: usize,
    pub(crate) answered_count: u32,
    pub(crate) total_questions: u32,
    pub(crate) remaining_seconds: u32,
    pub(crate) attempt_id: Option<String>,
    pub(crate) score: Option<ScoreResponse>,
}

impl SessionView {
    pub(crate) fn from_snapshot(session_id: String, snapshot: SessionSnapshot) -> Self {
        Self {
            session_id,
            exam_id: snapshot.exam_id,
            state: snapshot.state.as_str(),
            current_position: snapshot.current_position,
            position_count: snapshot.position_count,
            answered_count: snapshot.answered_count,
            total_questions: snapshot.total_questions,
            remaining_seconds: snapshot.remaining_seconds,
            attempt_id: snapshot.attempt_id,
            score: snapshot.score.map(ScoreResponse::from_summary),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ScoreResponse {
    pub(crate) correct_count: u32,
    pub(crate) total_questions: u32,
    pub(crate) percent: u32,
}

impl ScoreResponse {
    pub(crate) fn from_summary(score: ScoreSummary) -> Self {
        Self {
            correct_count: score.correct_count,
            total_questions: score.total_questions,
            percent: score.percent,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AnswerSubmit {
    #[serde(alias = "questionId")]
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub(crate) question_id: String,
    /// zero-based index into the question's choices
    pub(crate) choice: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct AnswerAck {
    pub(crate) outcome: &'static str,
    pub(crate) answered_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum NavigationAction {
    Next,
    Previous,
    Jump,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NavigationRequest {
    pub(crate) action: NavigationAction,
    #[serde(default)]
    pub(crate) index: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitRequest {
    #[serde(default)]
    pub(crate) confirmed: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub(crate) enum SubmitResponse {
    Finished { attempt_id: String, score: ScoreResponse },
    NeedsConfirmation { answered: u32, total: u32 },
    AlreadySubmitting,
}

fn default_group_size() -> usize {
    1
}
