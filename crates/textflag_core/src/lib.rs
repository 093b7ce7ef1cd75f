//! Core library for textflag: offset mapping, highlight rendering, selection
//! validation, CSV transfer and redb storage.

/// Configuration loading and defaults.
pub mod config;
/// Shared constants.
pub mod constants;
/// Database access layer.
pub mod db;
/// Test-only environment helpers.
pub mod env;
/// Application error types.
pub mod error;
/// Highlight rendering and marker removal.
pub mod highlight;
/// Parsed container tree and plain-text projection.
pub mod html;
/// Data models for API requests and persistence.
pub mod models;
/// Selection position <-> absolute offset mapping.
pub mod offsets;
/// Pointer-up selection handling.
pub mod selection;
/// Text helpers.
pub mod text;
/// CSV import/export.
pub mod transfer;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::Config;
pub use db::Database;
pub use error::AppError;
pub use highlight::{render, strip_markers, RenderedDocument, SkippedFlag};
pub use html::ContainerTree;
pub use offsets::{locate_range, locate_selection, DomPoint, DomRange, SelectionError, SelectionRange};
pub use selection::{SelectionController, SelectionOutcome, SelectionState};
