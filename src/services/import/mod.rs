pub(crate) mod encoding;
pub(crate) mod layout;
pub(crate) mod parser;
pub(crate) mod readers;

use metrics::counter;
use serde::Deserialize;
use sqlx::PgPool;

use crate::core::time::primitive_now_utc;
use crate::db::models::Exam;
use crate::db::types::DifficultyLevel;
use crate::repositories;
use crate::services::import::encoding::parse_answer;
use crate::services::import::parser::{unique_orders, validate_passages, ParsedQuestion};
pub(crate) use crate::services::import::parser::ImportError;

/// Exam-level fields a structured JSON upload may carry. File uploads in
/// row formats carry none of these; the upload form supplies them instead.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ImportMetadata {
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) category: Option<String>,
    pub(crate) subcategory: Option<String>,
    pub(crate) part: Option<String>,
    pub(crate) difficulty: Option<DifficultyLevel>,
    #[serde(alias = "timeLimitMinutes")]
    pub(crate) time_limit_minutes: Option<i32>,
    #[serde(alias = "testNumber")]
    pub(crate) test_number: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct ExamImport {
    #[serde(flatten)]
    metadata: ImportMetadata,
    questions: Vec<QuestionImport>,
}

#[derive(Debug, Deserialize)]
struct QuestionImport {
    #[serde(alias = "orderNum")]
    order_num: Option<i32>,
    #[serde(alias = "questionText", alias = "text")]
    question_text: String,
    choices: Vec<String>,
    #[serde(alias = "correctIndex")]
    correct_index: Option<usize>,
    #[serde(alias = "correctAnswer")]
    correct_answer: Option<String>,
    explanation: Option<String>,
    part: Option<String>,
    passage: Option<String>,
    #[serde(alias = "blankNumber")]
    blank_number: Option<i32>,
}

#[derive(Debug)]
pub(crate) struct ImportedExam {
    pub(crate) source: &'static str,
    pub(crate) metadata: ImportMetadata,
    pub(crate) questions: Vec<ParsedQuestion>,
}

/// Turns an uploaded file into exam questions. Row formats (.csv/.xlsx/.xls)
/// go through the layout parser; JSON is already structured and is validated
/// strictly instead of row-skipped.
pub(crate) fn parse_upload(extension: &str, bytes: &[u8]) -> Result<ImportedExam, ImportError> {
    let imported = match extension {
        "json" => {
            let exam: ExamImport =
                serde_json::from_slice(bytes).map_err(ImportError::InvalidJson)?;
            let questions = convert_json_questions(exam.questions)?;
            ImportedExam { source: "json", metadata: exam.metadata, questions }
        }
        "csv" => {
            let rows = readers::rows_from_csv(bytes)?;
            let (_, questions) = parser::parse_rows(&rows)?;
            ImportedExam { source: "csv", metadata: ImportMetadata::default(), questions }
        }
        "xlsx" | "xls" => {
            let rows = readers::rows_from_workbook(bytes)?;
            let (_, questions) = parser::parse_rows(&rows)?;
            ImportedExam {
                source: if extension == "xlsx" { "xlsx" } else { "xls" },
                metadata: ImportMetadata::default(),
                questions,
            }
        }
        other => return Err(ImportError::UnsupportedExtension(other.to_string())),
    };

    if imported.questions.is_empty() {
        return Err(ImportError::NoQuestions);
    }

    counter!("exam_import_questions_total", "source" => imported.source)
        .increment(imported.questions.len() as u64);

    Ok(imported)
}

pub(crate) struct NewExam<'a> {
    pub(crate) title: &'a str,
    pub(crate) description: &'a str,
    pub(crate) category: &'a str,
    pub(crate) subcategory: &'a str,
    pub(crate) part: Option<&'a str>,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) time_limit_minutes: i32,
    pub(crate) test_number: i32,
}

/// Writes the exam and its questions in one transaction; a failing insert
/// leaves nothing behind.
pub(crate) async fn save_exam(
    pool: &PgPool,
    exam: NewExam<'_>,
    questions: &[ParsedQuestion],
) -> anyhow::Result<Exam> {
    let now = primitive_now_utc();
    let exam_id = uuid::Uuid::new_v4().to_string();

    let mut tx = pool.begin().await?;

    let created = repositories::exams::create(
        &mut *tx,
        repositories::exams::CreateExam {
            id: &exam_id,
            title: exam.title,
            description: exam.description,
            category: exam.category,
            subcategory: exam.subcategory,
            part: exam.part,
            difficulty: exam.difficulty,
            time_limit_minutes: exam.time_limit_minutes,
            test_number: exam.test_number,
            total_questions: questions.len() as i32,
            now,
        },
    )
    .await?;

    let orders = unique_orders(questions);
    for (question, order_num) in questions.iter().zip(orders) {
        repositories::questions::insert(
            &mut *tx,
            repositories::questions::InsertQuestion {
                id: &uuid::Uuid::new_v4().to_string(),
                exam_id: &exam_id,
                order_num,
                question_text: &question.question_text,
                choices: &question.choices,
                correct_index: question.correct_index as i32,
                explanation: question.explanation.as_deref(),
                part: question.part.as_deref(),
                passage: question.passage.as_deref(),
                blank_number: question.blank_number,
                now,
            },
        )
        .await?;
    }

    tx.commit().await?;

    tracing::info!(
        exam_id = %created.id,
        questions = questions.len(),
        "imported exam"
    );

    Ok(created)
}

fn convert_json_questions(
    questions: Vec<QuestionImport>,
) -> Result<Vec<ParsedQuestion>, ImportError> {
    let mut converted = Vec::with_capacity(questions.len());

    for (position, question) in questions.into_iter().enumerate() {
        let order_num = question.order_num.unwrap_or((position + 1) as i32);

        if question.question_text.trim().is_empty() {
            return Err(ImportError::InvalidQuestion {
                order: order_num,
                reason: "question text is empty".to_string(),
            });
        }
        let choices: Vec<String> =
            question.choices.iter().map(|choice| choice.trim().to_string()).collect();
        if choices.len() < 2 || choices.len() > 5 || choices.iter().any(String::is_empty) {
            return Err(ImportError::InvalidQuestion {
                order: order_num,
                reason: "expected 2 to 5 non-empty choices".to_string(),
            });
        }

        let correct_index = match (question.correct_index, question.correct_answer.as_deref()) {
            (Some(index), _) if index < choices.len() => index,
            (None, Some(raw)) => parse_answer(raw, choices.len()).ok_or_else(|| {
                ImportError::InvalidQuestion {
                    order: order_num,
                    reason: format!("unrecognized correct answer {raw:?}"),
                }
            })?,
            _ => {
                return Err(ImportError::InvalidQuestion {
                    order: order_num,
                    reason: "correct answer missing or out of range".to_string(),
                })
            }
        };

        converted.push(ParsedQuestion {
            order_num,
            question_text: question.question_text.trim().to_string(),
            choices,
            correct_index,
            explanation: question.explanation.filter(|text| !text.trim().is_empty()),
            part: question.part.filter(|text| !text.trim().is_empty()),
            passage: question.passage.filter(|text| !text.trim().is_empty()),
            blank_number: question.blank_number,
        });
    }

    validate_passages(&converted)?;
    Ok(converted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_upload_with_camel_case_fields() {
        let payload = serde_json::json!({
            "title": "TOEIC Mock 1",
            "category": "toeic",
            "timeLimitMinutes": 90,
            "questions": [
                {
                    "questionText": "Pick one",
                    "choices": ["a", "b", "c", "d"],
                    "correctAnswer": "B",
                    "explanation": "because"
                }
            ]
        });
        let imported = parse_upload("json", payload.to_string().as_bytes()).expect("json import");
        assert_eq!(imported.source, "json");
        assert_eq!(imported.metadata.title.as_deref(), Some("TOEIC Mock 1"));
        assert_eq!(imported.metadata.time_limit_minutes, Some(90));
        assert_eq!(imported.questions.len(), 1);
        assert_eq!(imported.questions[0].correct_index, 1);
        assert_eq!(imported.questions[0].order_num, 1);
    }

    #[test]
    fn json_upload_rejects_bad_choice_list() {
        let payload = serde_json::json!({
            "questions": [
                { "questionText": "Pick", "choices": ["only one"], "correctIndex": 0 }
            ]
        });
        let err = parse_upload("json", payload.to_string().as_bytes()).unwrap_err();
        assert!(matches!(err, ImportError::InvalidQuestion { .. }));
    }

    #[test]
    fn json_upload_rejects_out_of_range_index() {
        let payload = serde_json::json!({
            "questions": [
                { "questionText": "Pick", "choices": ["a", "b"], "correctIndex": 2 }
            ]
        });
        let err = parse_upload("json", payload.to_string().as_bytes()).unwrap_err();
        assert!(matches!(err, ImportError::InvalidQuestion { .. }));
    }

    #[test]
    fn malformed_json_aborts() {
        let err = parse_upload("json", b"{not json").unwrap_err();
        assert!(matches!(err, ImportError::InvalidJson(_)));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = parse_upload("pdf", b"whatever").unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedExtension(ext) if ext == "pdf"));
    }

    #[test]
    fn csv_upload_goes_through_the_layout_parser() {
        let csv = "no,question,a,b,c,d,answer,explanation\n1,What is 2+2?,3,4,5,6,B,\n";
        let imported = parse_upload("csv", csv.as_bytes()).expect("csv import");
        assert_eq!(imported.source, "csv");
        assert_eq!(imported.questions.len(), 1);
        assert_eq!(imported.questions[0].correct_index, 1);
    }
}
