use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::DifficultyLevel;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Exam {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) category: String,
    pub(crate) subcategory: String,
    pub(crate) part: Option<String>,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) time_limit_minutes: i32,
    pub(crate) test_number: i32,
    pub(crate) total_questions: i32,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) order_num: i32,
    pub(crate) question_text: String,
    pub(crate) choices: Json<Vec<String>>,
    pub(crate) correct_index: i32,
    pub(crate) explanation: Option<String>,
    pub(crate) part: Option<String>,
    pub(crate) passage: Option<String>,
    pub(crate) blank_number: Option<i32>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Attempt {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) total_questions: i32,
    pub(crate) correct_count: i32,
    pub(crate) score_percent: i32,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) ended_at: Option<PrimitiveDateTime>,
    pub(crate) is_completed: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct AttemptAnswer {
    pub(crate) id: String,
    pub(crate) attempt_id: String,
    pub(crate) question_id: String,
    pub(crate) submitted_choice: i32,
    pub(crate) is_correct: bool,
    pub(crate) created_at: PrimitiveDateTime,
}
