//! Data models for persistence and API payloads.

/// Flag highlight colors.
pub mod color;
/// Document rows.
pub mod document;
/// Flag rows and create/import payloads.
pub mod flag;
