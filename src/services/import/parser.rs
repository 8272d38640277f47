use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::services::import::encoding::{index_to_letter, parse_answer};
use crate::services::import::layout::Layout;

#[derive(Debug, Error)]
pub(crate) enum ImportError {
    #[error("the file contains no rows")]
    EmptySheet,
    #[error("no questions found in the file")]
    NoQuestions,
    #[error("invalid JSON exam payload: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("question {order}: {reason}")]
    InvalidQuestion { order: i32, reason: String },
    #[error("could not read workbook: {0}")]
    UnreadableWorkbook(String),
    #[error("could not read csv: {0}")]
    UnreadableCsv(#[source] csv::Error),
    #[error("unsupported file extension: {0}")]
    UnsupportedExtension(String),
    #[error("passage {passage:?} has duplicate or out-of-range blank numbers")]
    InvalidPassage { passage: String },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParsedQuestion {
    pub(crate) order_num: i32,
    pub(crate) question_text: String,
    pub(crate) choices: Vec<String>,
    pub(crate) correct_index: usize,
    pub(crate) explanation: Option<String>,
    pub(crate) part: Option<String>,
    pub(crate) passage: Option<String>,
    pub(crate) blank_number: Option<i32>,
}

/// Parses a row grid (header + data rows) into questions. Rows that are
/// individually broken (empty text, too few choices, unparseable answer) are
/// skipped; structural problems abort the whole import.
pub(crate) fn parse_rows(
    rows: &[Vec<String>],
) -> Result<(Layout, Vec<ParsedQuestion>), ImportError> {
    let Some((header, data)) = rows.split_first() else {
        return Err(ImportError::EmptySheet);
    };

    let layout = Layout::detect(header);

    let mut questions = Vec::new();
    for (index, row) in data.iter().enumerate() {
        let position = index + 1;
        if let Some(question) = parse_row(layout, row, position) {
            questions.push(question);
        } else {
            tracing::debug!(layout = layout.as_str(), row = position, "skipping unusable row");
        }
    }

    if questions.is_empty() {
        return Err(ImportError::NoQuestions);
    }

    validate_passages(&questions)?;

    Ok((layout, questions))
}

fn parse_row(layout: Layout, row: &[String], position: usize) -> Option<ParsedQuestion> {
    let question_text = cell(row, layout.text_column());
    if question_text.is_empty() {
        return None;
    }

    let mut choices = Vec::new();
    for column in layout.choice_columns() {
        let value = cell(row, column);
        if value.is_empty() {
            if layout.requires_all_choices() {
                return None;
            }
            continue;
        }
        choices.push(value);
    }
    if choices.len() < 2 || choices.len() > 5 {
        return None;
    }

    let answer_raw = cell(row, layout.answer_column());
    let correct_index = if answer_raw.is_empty() {
        // sheets sometimes leave the answer cell blank meaning "first choice"
        0
    } else {
        parse_answer(&answer_raw, choices.len())?
    };

    let order_num = cell(row, 0).parse::<i32>().ok().filter(|n| *n > 0).unwrap_or(position as i32);

    let (part, passage, blank_number) = if layout == Layout::Extended11 {
        (
            non_empty(cell(row, 1)),
            non_empty(cell(row, 2)),
            cell(row, 4).parse::<i32>().ok(),
        )
    } else {
        (None, None, None)
    };

    Some(ParsedQuestion {
        order_num,
        question_text,
        choices,
        correct_index,
        explanation: non_empty(cell(row, layout.explanation_column())),
        part,
        passage,
        blank_number,
    })
}

/// Within one passage, blank numbers must be unique and within 1..=4. A
/// broken passage corrupts its whole group, so this aborts the import
/// instead of skipping rows.
pub(crate) fn validate_passages(questions: &[ParsedQuestion]) -> Result<(), ImportError> {
    let mut seen: HashMap<&str, HashSet<i32>> = HashMap::new();

    for question in questions {
        let (Some(passage), Some(blank)) = (question.passage.as_deref(), question.blank_number)
        else {
            continue;
        };

        if !(1..=4).contains(&blank) || !seen.entry(passage).or_default().insert(blank) {
            return Err(ImportError::InvalidPassage { passage: passage.to_string() });
        }
    }

    Ok(())
}

/// Order numbers stored per exam must be unique. The first question claiming
/// a number keeps it; later collisions are moved to the lowest free positive
/// number, preserving the relative order of everything else.
pub(crate) fn unique_orders(questions: &[ParsedQuestion]) -> Vec<i32> {
    let mut taken: HashSet<i32> = HashSet::new();
    let keeps_own: Vec<bool> =
        questions.iter().map(|question| taken.insert(question.order_num)).collect();

    let mut next_free = 1;
    questions
        .iter()
        .zip(keeps_own)
        .map(|(question, keeps)| {
            if keeps {
                return question.order_num;
            }
            while !taken.insert(next_free) {
                next_free += 1;
            }
            next_free
        })
        .collect()
}

pub(crate) fn default_header() -> Vec<String> {
    ["no", "question", "choice_a", "choice_b", "choice_c", "choice_d", "answer", "explanation"]
        .iter()
        .map(|cell| cell.to_string())
        .collect()
}

/// Serializes a question back into the 8-column default row shape; inverse
/// of the Default8 parse and the basis of the CSV export.
pub(crate) fn to_default_row(question: &ParsedQuestion) -> Vec<String> {
    let mut row = vec![question.order_num.to_string(), question.question_text.clone()];
    for index in 0..4 {
        row.push(question.choices.get(index).cloned().unwrap_or_default());
    }
    row.push(index_to_letter(question.correct_index).to_string());
    row.push(question.explanation.clone().unwrap_or_default());
    row
}

fn cell(row: &[String], column: usize) -> String {
    row.get(column).map(|value| value.trim().to_string()).unwrap_or_default()
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}
