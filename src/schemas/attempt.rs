use serde::Serialize;

use crate::core::time::format_primitive;
use crate::db::models::{Attempt, AttemptAnswer};

#[derive(Debug, Serialize)]
pub(crate) struct AttemptAnswerResponse {
    pub(crate) question_id: String,
    pub(crate) submitted_choice: i32,
    pub(crate) is_correct: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptSummaryResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) total_questions: i32,
    pub(crate) correct_count: i32,
    pub(crate) score_percent: i32,
    pub(crate) started_at: String,
    pub(crate) ended_at: Option<String>,
}

impl AttemptSummaryResponse {
    pub(crate) fn from_model(attempt: Attempt) -> Self {
        Self {
            id: attempt.id,
            exam_id: attempt.exam_id,
            total_questions: attempt.total_questions,
            correct_count: attempt.correct_count,
            score_percent: attempt.score_percent,
            started_at: format_primitive(attempt.started_at),
            ended_at: attempt.ended_at.map(format_primitive),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) total_questions: i32,
    pub(crate) correct_count: i32,
    pub(crate) score_percent: i32,
    pub(crate) started_at: String,
    pub(crate) ended_at: Option<String>,
    pub(crate) is_completed: bool,
    pub(crate) answers: Vec<AttemptAnswerResponse>,
}

impl AttemptResponse {
    pub(crate) fn from_model(attempt: Attempt, answers: Vec<AttemptAnswer>) -> Self {
        Self {
            id: attempt.id,
            exam_id: attempt.exam_id,
            total_questions: attempt.total_questions,
            correct_count: attempt.correct_count,
            score_percent: attempt.score_percent,
            started_at: format_primitive(attempt.started_at),
            ended_at: attempt.ended_at.map(format_primitive),
            is_completed: attempt.is_completed,
            answers: answers
                .into_iter()
                .map(|answer| AttemptAnswerResponse {
                    question_id: answer.question_id,
                    submitted_choice: answer.submitted_choice,
                    is_correct: answer.is_correct,
                })
                .collect(),
        }
    }
}
