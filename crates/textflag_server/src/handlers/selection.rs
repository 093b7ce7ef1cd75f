//! Selection resolution: turn a UI selection into flag offsets.

use super::load_document;
use crate::{error::HttpError, AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use textflag_core::html::ContainerTree;
use textflag_core::offsets::{DomPoint, SelectionRange};
use textflag_core::selection::{SelectionController, SelectionOutcome};

/// Selection reported by a client, in container-tree coordinates.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionRequest {
    pub start: DomPoint,
    /// Focus point; defaults to `start` advanced by the text length within
    /// the same node, or to `start` itself when that would overflow.
    pub end: Option<DomPoint>,
    pub text: String,
    #[serde(default = "default_check_overlap")]
    pub check_overlap: bool,
}

fn default_check_overlap() -> bool {
    true
}

impl SelectionRequest {
    fn into_range(self) -> SelectionRange {
        let end = self.end.unwrap_or_else(|| DomPoint {
            node: self.start.node,
            offset: self
                .start
                .offset
                .checked_add(self.text.chars().count())
                .unwrap_or(self.start.offset),
        });
        SelectionRange {
            start: self.start,
            end,
            text: self.text,
        }
    }
}

fn rejection(status: StatusCode, kind: &str, message: String) -> Response {
    (
        status,
        Json(json!({ "rejected": kind, "message": message })),
    )
        .into_response()
}

/// Resolve a selection against a document and its stored flags.
///
/// # Returns
/// - `200` with `{text, start, end}` when accepted.
/// - `409` with `{rejected, message}` when it overlaps a stored flag.
/// - `422` with `{rejected, message}` for every silent rejection.
///
/// # Errors
/// Returns 404 for a missing document or 400 if its markup cannot be parsed.
pub async fn resolve_selection(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(req): Json<SelectionRequest>,
) -> Result<Response, HttpError> {
    let document = load_document(&state, id)?;
    let flags = state.db.flags.list(document.id)?;
    let tree = ContainerTree::parse(&document.content)?;

    let check_overlap = req.check_overlap;
    let range = req.into_range();
    let mut controller = SelectionController::new(|text: &str, start: usize, end: usize| {
        tracing::debug!(document_id = id, start, end, chars = text.chars().count(), "selection resolved");
    })
    .with_overlap_check(check_overlap);
    controller.bind_tree(Arc::new(tree));

    let response = match controller.handle_pointer_up(Some(&range), &flags) {
        SelectionOutcome::Accepted(resolved) => Json(resolved).into_response(),
        SelectionOutcome::Idle => rejection(
            StatusCode::UNPROCESSABLE_ENTITY,
            "idle",
            "No selection inside the document".to_string(),
        ),
        SelectionOutcome::Rejected(err) => {
            let status = if err.is_user_visible() {
                StatusCode::CONFLICT
            } else {
                StatusCode::UNPROCESSABLE_ENTITY
            };
            rejection(status, err.kind(), err.to_string())
        }
    };
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::SelectionRequest;
    use textflag_core::offsets::DomPoint;

    fn request(offset: usize, text: &str) -> SelectionRequest {
        SelectionRequest {
            start: DomPoint { node: 2, offset },
            end: None,
            text: text.to_string(),
            check_overlap: true,
        }
    }

    #[test]
    fn implied_focus_advances_by_text_length() {
        let range = request(6, "wörld").into_range();
        assert_eq!(range.end, DomPoint { node: 2, offset: 11 });
    }

    #[test]
    fn implied_focus_saturates_to_anchor_on_overflow() {
        let range = request(usize::MAX, "world").into_range();
        assert_eq!(range.end, range.start);
    }
}
