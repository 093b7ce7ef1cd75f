//! Document rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored HTML document. Content is never edited after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: u64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request payload for creating a document.
#[derive(Debug, Deserialize)]
pub struct CreateDocumentRequest {
    pub content: String,
}

/// Plain-text projection response.
#[derive(Debug, Serialize, Deserialize)]
pub struct PlainTextResponse {
    pub text: String,
    pub length: usize,
}

impl Document {
    /// Create a document row with the given id and content.
    pub fn new(id: u64, content: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            content,
            created_at: now,
            updated_at: now,
        }
    }
}
