//! Shared test-only helpers for textflag_core.

use crate::models::document::Document;
use crate::Database;
use tempfile::TempDir;

/// Creates an isolated temporary database and returns it with the temp dir.
///
/// Keep the [`TempDir`] alive for the full test to preserve the backing file.
///
/// # Panics
/// Panics if temp-dir creation, path conversion, or database initialization
/// fails in the test environment.
pub(crate) fn setup_temp_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().expect("temp dir");
    let db_path = temp_dir.path().join("db");
    let db = Database::new(db_path.to_str().expect("db path")).expect("db");
    (db, temp_dir)
}

/// Stores a document with `content` and returns it.
///
/// # Panics
/// Panics if the document cannot be created.
pub(crate) fn create_document(db: &Database, content: &str) -> Document {
    db.documents
        .create(content, crate::constants::DEFAULT_MAX_DOCUMENT_SIZE)
        .expect("create document")
}
