//! HTTP request handlers.

/// Document endpoints, including plain-text and rendered views.
pub mod document;
/// Flag endpoints, including CSV import/export.
pub mod flag;
/// Selection resolution endpoint.
pub mod selection;

use crate::{error::HttpError, AppState};
use textflag_core::models::document::Document;

/// Load a document, seeding the default one on first access.
pub(crate) fn load_document(state: &AppState, id: u64) -> Result<Document, HttpError> {
    Ok(state.db.documents.get_or_seed(id)?)
}
