//! Flag HTTP handlers.

use super::load_document;
use crate::{error::HttpError, AppError, AppState};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use textflag_core::models::flag::{Flag, NewFlag};
use textflag_core::text::normalize_optional_nonempty;
use textflag_core::transfer::{parse_csv, write_csv};

/// Query parameters for CSV export.
#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    /// Download file name; defaults to `flags-{id}.csv`.
    pub filename: Option<String>,
}

fn export_filename(requested: Option<String>, document_id: u64) -> String {
    normalize_optional_nonempty(requested)
        .filter(|name| {
            name.chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_'))
        })
        .unwrap_or_else(|| format!("flags-{}.csv", document_id))
}

/// List a document's flags sorted by start offset.
///
/// # Errors
/// Returns 404 when the document does not exist.
pub async fn list_flags(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Vec<Flag>>, HttpError> {
    let document = load_document(&state, id)?;
    Ok(Json(state.db.flags.list(document.id)?))
}

/// Create a flag.
///
/// # Returns
/// `201 Created` with the stored flag.
///
/// # Errors
/// - 400 when the range or text does not match the document.
/// - 409 when the range overlaps an existing flag.
pub async fn create_flag(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(req): Json<NewFlag>,
) -> Result<(StatusCode, Json<Flag>), HttpError> {
    let document = load_document(&state, id)?;
    let flag = state.db.flags.create(&document, req)?;
    Ok((StatusCode::CREATED, Json(flag)))
}

/// Delete every flag of a document.
///
/// # Returns
/// `{"deleted": n}`.
///
/// # Errors
/// Returns 404 when the document does not exist.
pub async fn clear_flags(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Value>, HttpError> {
    let document = load_document(&state, id)?;
    let deleted = state.db.flags.delete_all(document.id)?;
    Ok(Json(json!({ "deleted": deleted })))
}

/// Delete one flag.
///
/// # Returns
/// `204 No Content` on success.
///
/// # Errors
/// Returns 404 when the flag does not exist.
pub async fn delete_flag(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, HttpError> {
    if state.db.flags.delete(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound.into())
    }
}

/// Import flags from a CSV body (`Text,Color,StartOffset,EndOffset`).
///
/// # Returns
/// `{"imported": n}`; nothing is stored unless every row is valid.
///
/// # Errors
/// - 400 for malformed CSV, invalid rows, or too many rows.
/// - 409 when a row overlaps a stored flag.
pub async fn import_flags(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    body: String,
) -> Result<Json<Value>, HttpError> {
    let document = load_document(&state, id)?;
    let rows = parse_csv(&body, state.config.max_import_rows)?;
    let imported = state.db.flags.import_bulk(&document, rows)?;
    Ok(Json(json!({ "imported": imported })))
}

/// Export a document's flags as a CSV attachment.
///
/// # Errors
/// Returns 404 when the document does not exist.
pub async fn export_flags(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, HttpError> {
    let document = load_document(&state, id)?;
    let flags = state.db.flags.list(document.id)?;
    let csv = write_csv(&flags)?;
    let filename = export_filename(query.filename, document.id);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        csv,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::export_filename;

    #[test]
    fn export_filename_defaults_and_rejects_unsafe_names() {
        assert_eq!(export_filename(None, 3), "flags-3.csv");
        assert_eq!(export_filename(Some("  ".to_string()), 3), "flags-3.csv");
        assert_eq!(
            export_filename(Some(" review.csv ".to_string()), 3),
            "review.csv"
        );
        assert_eq!(
            export_filename(Some("../etc\"x".to_string()), 3),
            "flags-3.csv"
        );
    }
}
