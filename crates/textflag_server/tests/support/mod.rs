//! Shared integration-test server bootstrap helpers.

use axum_test::TestServer;
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;
use textflag_core::constants::DEFAULT_MAX_IMPORT_ROWS;
use textflag_server::{create_app, AppState, Config, Database};

pub(crate) fn test_config_for_db_path(db_path: &Path) -> Config {
    Config {
        port: 0,
        db_path: db_path.to_str().expect("db path").to_string(),
        max_document_size: 1_000_000,
        max_import_rows: DEFAULT_MAX_IMPORT_ROWS,
    }
}

pub(crate) fn test_server_for_config(config: Config) -> TestServer {
    let db = Database::new(config.db_path.as_str()).expect("open db");
    let state = AppState::new(config, db);
    TestServer::new(create_app(state, false)).expect("server")
}

pub(crate) fn setup_test_server() -> (TestServer, TempDir) {
    let temp_dir = TempDir::new().expect("temp dir");
    let config = test_config_for_db_path(&temp_dir.path().join("db"));
    (test_server_for_config(config), temp_dir)
}

/// Creates a document and returns its id.
pub(crate) async fn create_document(server: &TestServer, content: &str) -> u64 {
    let response = server
        .post("/api/documents")
        .json(&json!({ "content": content }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    let document: Value = response.json();
    document["id"].as_u64().expect("document id")
}
