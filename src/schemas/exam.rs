use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Exam, Question};
use crate::db::types::DifficultyLevel;
use crate::services::import::encoding::index_to_letter;

/// One week, in minutes. Upper bound for an exam's time limit.
pub(crate) const MAX_TIME_LIMIT_MINUTES: i32 = 10_080;

#[derive(Debug, Deserialize, Serialize, Validate)]
pub(crate) struct QuestionCreate {
    #[serde(default)]
    #[serde(alias = "orderNum")]
    pub(crate) order_num: Option<i32>,
    #[serde(alias = "questionText", alias = "text")]
    #[validate(length(min = 1, message = "question_text must not be empty"))]
    pub(crate) question_text: String,
    #[validate(length(min = 2, max = 5, message = "choices must hold 2 to 5 entries"))]
    pub(crate) choices: Vec<String>,
    #[serde(alias = "correctIndex")]
    pub(crate) correct_index: usize,
    #[serde(default)]
    pub(crate) explanation: Option<String>,
    #[serde(default)]
    pub(crate) part: Option<String>,
    #[serde(default)]
    pub(crate) passage: Option<String>,
    #[serde(default)]
    #[serde(alias = "blankNumber")]
    #[validate(range(min = 1, max = 4, message = "blank_number must be within 1..=4"))]
    pub(crate) blank_number: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamCreate {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: String,
    #[validate(length(min = 1, message = "category must not be empty"))]
    pub(crate) category: String,
    #[validate(length(min = 1, message = "subcategory must not be empty"))]
    pub(crate) subcategory: String,
    #[serde(default)]
    pub(crate) part: Option<String>,
    #[serde(default = "default_difficulty")]
    pub(crate) difficulty: DifficultyLevel,
    #[serde(default)]
    #[serde(alias = "timeLimitMinutes")]
    #[validate(range(min = 1, max = 10080, message = "time_limit_minutes is out of range"))]
    pub(crate) time_limit_minutes: Option<i32>,
    #[serde(default = "default_test_number")]
    #[serde(alias = "testNumber")]
    #[validate(range(min = 1, message = "test_number must be positive"))]
    pub(crate) test_number: i32,
    #[validate(length(min = 1, message = "an exam needs at least one question"))]
    #[validate(nested)]
    pub(crate) questions: Vec<QuestionCreate>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamUpdate {
    #[serde(default)]
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) difficulty: Option<DifficultyLevel>,
    #[serde(default)]
    #[serde(alias = "timeLimitMinutes")]
    #[validate(range(min = 1, max = 10080, message = "time_limit_minutes is out of range"))]
    pub(crate) time_limit_minutes: Option<i32>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) order_num: i32,
    pub(crate) question_text: String,
    pub(crate) choices: Vec<String>,
    pub(crate) correct_index: i32,
    pub(crate) correct_letter: String,
    pub(crate) explanation: Option<String>,
    pub(crate) part: Option<String>,
    pub(crate) passage: Option<String>,
    pub(crate) blank_number: Option<i32>,
}

impl QuestionResponse {
    pub(crate) fn from_model(question: Question) -> Self {
        let correct_letter = index_to_letter(question.correct_index.max(0) as usize).to_string();
        Self {
            id: question.id,
            order_num: question.order_num,
            question_text: question.question_text,
            choices: question.choices.0,
            correct_index: question.correct_index,
            correct_letter,
            explanation: question.explanation,
            part: question.part,
            passage: question.passage,
            blank_number: question.blank_number,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamResponse {
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
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
    pub(crate) questions: Vec<QuestionResponse>,
}

impl ExamResponse {
    pub(crate) fn from_model(exam: Exam, questions: Vec<Question>) -> Self {
        Self {
            id: exam.id,
            title: exam.title,
            description: exam.description,
            category: exam.category,
            subcategory: exam.subcategory,
            part: exam.part,
            difficulty: exam.difficulty,
            time_limit_minutes: exam.time_limit_minutes,
            test_number: exam.test_number,
            total_questions: exam.total_questions,
            created_at: format_primitive(exam.created_at),
            updated_at: format_primitive(exam.updated_at),
            questions: questions.into_iter().map(QuestionResponse::from_model).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamSummaryResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) category: String,
    pub(crate) subcategory: String,
    pub(crate) part: Option<String>,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) time_limit_minutes: i32,
    pub(crate) test_number: i32,
    pub(crate) total_questions: i32,
    pub(crate) created_at: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct UploadResponse {
    pub(crate) exam_id: String,
    pub(crate) source: String,
    pub(crate) layout_questions: usize,
    pub(crate) title: String,
}

fn default_difficulty() -> DifficultyLevel {
    DifficultyLevel::Medium
}

fn default_test_number() -> i32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn exam_create_accepts_camel_case_aliases() {
        let payload = serde_json::json!({
            "title": "Mock",
            "category": "toeic",
            "subcategory": "full",
            "timeLimitMinutes": 120,
            "testNumber": 2,
            "questions": [
                {
                    "questionText": "Pick",
                    "choices": ["a", "b"],
                    "correctIndex": 1
                }
            ]
        });
        let parsed: ExamCreate = serde_json::from_value(payload).expect("deserialize");
        assert_eq!(parsed.time_limit_minutes, Some(120));
        assert_eq!(parsed.test_number, 2);
        assert_eq!(parsed.questions[0].correct_index, 1);
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn exam_create_rejects_empty_question_list() {
        let payload = serde_json::json!({
            "title": "Mock",
            "category": "toeic",
            "subcategory": "full",
            "questions": []
        });
        let parsed: ExamCreate = serde_json::from_value(payload).expect("deserialize");
        assert!(parsed.validate().is_err());
    }

    #[test]
    fn time_limit_is_bounded_both_ways() {
        let payload = serde_json::json!({ "timeLimitMinutes": 2_000_000_000 });
        let parsed: ExamUpdate = serde_json::from_value(payload).expect("deserialize");
        assert!(parsed.validate().is_err());

        let payload = serde_json::json!({ "timeLimitMinutes": 0 });
        let parsed: ExamUpdate = serde_json::from_value(payload).expect("deserialize");
        assert!(parsed.validate().is_err());

        let payload = serde_json::json!({ "timeLimitMinutes": MAX_TIME_LIMIT_MINUTES });
        let parsed: ExamUpdate = serde_json::from_value(payload).expect("deserialize");
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn question_create_validates_choice_count_and_blank() {
        let payload = serde_json::json!({
            "questionText": "Pick",
            "choices": ["only"],
            "correctIndex": 0,
            "blankNumber": 9
        });
        let parsed: QuestionCreate = serde_json::from_value(payload).expect("deserialize");
        assert!(parsed.validate().is_err());
    }
}
