use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::db::types::DifficultyLevel;
use crate::schemas::exam::{UploadResponse, MAX_TIME_LIMIT_MINUTES};
use crate::services::import::{parse_upload, save_exam, ImportError, NewExam};

/// Default exam title for uploaded files that carry no title of their own
/// ("exam set from file").
const DEFAULT_UPLOAD_TITLE: &str = "ชุดข้อสอบจากไฟล์";

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", post(upload_exam))
}

#[derive(Debug, Default)]
struct UploadForm {
    file_bytes: Option<Vec<u8>>,
    filename: Option<String>,
    title: Option<String>,
    description: Option<String>,
    category: Option<String>,
    subcategory: Option<String>,
    part: Option<String>,
    difficulty: Option<String>,
    time_limit_minutes: Option<i32>,
    test_number: Option<i32>,
}

async fn upload_exam(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let max_bytes = state.settings().upload().max_upload_size_mb * 1024 * 1024;
    let mut form = UploadForm::default();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            form.filename = field.file_name().map(|s| s.to_string());
            let mut bytes = Vec::new();
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|_| ApiError::BadRequest("Failed to read file".to_string()))?
            {
                let next_size = bytes.len() as u64 + chunk.len() as u64;
                if next_size > max_bytes {
                    return Err(ApiError::BadRequest(format!(
                        "File size exceeds {}MB limit",
                        state.settings().upload().max_upload_size_mb
                    )));
                }
                bytes.extend_from_slice(&chunk);
            }
            form.file_bytes = Some(bytes);
        } else {
            let text = field
                .text()
                .await
                .map_err(|_| ApiError::BadRequest(format!("Invalid value for field {name}")))?;
            let text = text.trim().to_string();
            if text.is_empty() {
                continue;
            }
            match name.as_str() {
                "title" => form.title = Some(text),
                "description" => form.description = Some(text),
                "category" => form.category = Some(text),
                "subcategory" => form.subcategory = Some(text),
                "part" => form.part = Some(text),
                "difficulty" => form.difficulty = Some(text),
                "time_limit_minutes" => {
                    form.time_limit_minutes = Some(text.parse::<i32>().map_err(|_| {
                        ApiError::BadRequest(
                            "time_limit_minutes must be a valid integer".to_string(),
                        )
                    })?);
                }
                "test_number" => {
                    form.test_number = Some(text.parse::<i32>().map_err(|_| {
                        ApiError::BadRequest("test_number must be a valid integer".to_string())
                    })?);
                }
                _ => {}
            }
        }
    }

    let file_bytes =
        form.file_bytes.ok_or_else(|| ApiError::BadRequest("File is required".to_string()))?;
    let filename = form.filename.unwrap_or_default();
    let extension = file_extension(&filename)
        .ok_or_else(|| ApiError::BadRequest("File has no recognizable extension".to_string()))?;

    if !state.settings().upload().allowed_extensions.iter().any(|allowed| allowed == &extension) {
        return Err(ApiError::BadRequest(format!("File extension .{extension} is not allowed")));
    }

    let imported = parse_upload(&extension, &file_bytes).map_err(import_error_response)?;

    // form fields win over metadata embedded in the file
    let metadata = imported.metadata;
    let title = form
        .title
        .or(metadata.title)
        .unwrap_or_else(|| DEFAULT_UPLOAD_TITLE.to_string());
    let description = form.description.or(metadata.description).unwrap_or_default();
    let category = form
        .category
        .or(metadata.category)
        .ok_or_else(|| ApiError::BadRequest("category is required".to_string()))?;
    let subcategory = form
        .subcategory
        .or(metadata.subcategory)
        .ok_or_else(|| ApiError::BadRequest("subcategory is required".to_string()))?;
    let part = form.part.or(metadata.part);
    let difficulty = match form.difficulty.as_deref() {
        Some(raw) => parse_difficulty(raw)
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown difficulty {raw:?}")))?,
        None => metadata.difficulty.unwrap_or_default(),
    };
    let time_limit_minutes = form
        .time_limit_minutes
        .or(metadata.time_limit_minutes)
        .unwrap_or(state.settings().session().default_time_limit_minutes as i32);
    if !(1..=MAX_TIME_LIMIT_MINUTES).contains(&time_limit_minutes) {
        return Err(ApiError::BadRequest("time_limit_minutes is out of range".to_string()));
    }
    let test_number = form.test_number.or(metadata.test_number).unwrap_or(1);

    let exam = save_exam(
        state.db(),
        NewExam {
            title: &title,
            description: &description,
            category: &category,
            subcategory: &subcategory,
            part: part.as_deref(),
            difficulty,
            time_limit_minutes,
            test_number,
        },
        &imported.questions,
    )
    .await
    .map_err(|err| ApiError::internal(err, "Failed to save imported exam"))?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            exam_id: exam.id,
            source: imported.source.to_string(),
            layout_questions: imported.questions.len(),
            title: exam.title,
        }),
    ))
}

fn file_extension(filename: &str) -> Option<String> {
    let extension = filename.rsplit_once('.')?.1.trim().to_ascii_lowercase();
    (!extension.is_empty()).then_some(extension)
}

fn parse_difficulty(raw: &str) -> Option<DifficultyLevel> {
    match raw.to_ascii_lowercase().as_str() {
        "easy" => Some(DifficultyLevel::Easy),
        "medium" => Some(DifficultyLevel::Medium),
        "hard" => Some(DifficultyLevel::Hard),
        _ => None,
    }
}

fn import_error_response(err: ImportError) -> ApiError {
    match err {
        ImportError::UnsupportedExtension(_) => ApiError::BadRequest(err.to_string()),
        _ => ApiError::BadRequest(format!("Import failed: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_extension_is_lowercased() {
        assert_eq!(file_extension("Exam.XLSX"), Some("xlsx".to_string()));
        assert_eq!(file_extension("archive.tar.gz"), Some("gz".to_string()));
        assert_eq!(file_extension("no_extension"), None);
        assert_eq!(file_extension("trailing."), None);
    }

    #[test]
    fn difficulty_parses_case_insensitively() {
        assert_eq!(parse_difficulty("Easy"), Some(DifficultyLevel::Easy));
        assert_eq!(parse_difficulty("HARD"), Some(DifficultyLevel::Hard));
        assert_eq!(parse_difficulty("extreme"), None);
    }
}
