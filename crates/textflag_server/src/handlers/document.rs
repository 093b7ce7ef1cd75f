//! Document HTTP handlers.

use super::load_document;
use crate::{error::HttpError, AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use textflag_core::highlight::{render, RenderedDocument};
use textflag_core::html::ContainerTree;
use textflag_core::models::document::{CreateDocumentRequest, Document, PlainTextResponse};

/// List all documents.
///
/// # Errors
/// Returns an error if storage access fails.
pub async fn list_documents(
    State(state): State<AppState>,
) -> Result<Json<Vec<Document>>, HttpError> {
    Ok(Json(state.db.documents.list()?))
}

/// Create a document from HTML content.
///
/// # Returns
/// `201 Created` with the stored document.
///
/// # Errors
/// Returns 400 for empty, oversized or untokenizable content.
pub async fn create_document(
    State(state): State<AppState>,
    Json(req): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<Document>), HttpError> {
    let document = state
        .db
        .documents
        .create(&req.content, state.config.max_document_size)?;
    tracing::info!(id = document.id, bytes = document.content.len(), "created document");
    Ok((StatusCode::CREATED, Json(document)))
}

/// Fetch a document by id.
///
/// # Errors
/// Returns 404 when the document does not exist.
pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Document>, HttpError> {
    Ok(Json(load_document(&state, id)?))
}

/// Plain-text projection of a document; flag offsets index into this text.
///
/// # Errors
/// Returns 404 for a missing document or 400 if its markup cannot be parsed.
pub async fn get_plain_text(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<PlainTextResponse>, HttpError> {
    let document = load_document(&state, id)?;
    let tree = ContainerTree::parse(&document.content)?;
    Ok(Json(PlainTextResponse {
        text: tree.plain_text().to_string(),
        length: tree.plain_len(),
    }))
}

/// Document content with every stored flag wrapped in a marker.
///
/// Flags that no longer map onto the content are reported under `skipped`.
///
/// # Errors
/// Returns 404 for a missing document or 400 if its markup cannot be parsed.
pub async fn get_rendered(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<RenderedDocument>, HttpError> {
    let document = load_document(&state, id)?;
    let flags = state.db.flags.list(document.id)?;
    Ok(Json(render(&document.content, &flags)?))
}
