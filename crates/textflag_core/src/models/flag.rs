//! Flag rows and the payloads that create them.

use super::color::FlagColor;
use crate::error::AppError;
use crate::text::char_slice;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A colored annotation over `[start_offset, end_offset)` of a document's
/// plain-text projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flag {
    pub id: u64,
    pub document_id: u64,
    pub text: String,
    pub color: FlagColor,
    pub start_offset: usize,
    pub end_offset: usize,
    pub created_at: DateTime<Utc>,
}

/// Request payload for creating a flag; also one row of a bulk import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFlag {
    pub text: String,
    pub color: FlagColor,
    pub start_offset: usize,
    pub end_offset: usize,
}

/// Half-open interval overlap test.
pub fn ranges_overlap(a_start: usize, a_end: usize, b_start: usize, b_end: usize) -> bool {
    a_start < b_end && b_start < a_end
}

impl Flag {
    /// Build a flag row from a validated payload.
    pub fn new(id: u64, document_id: u64, new_flag: NewFlag) -> Self {
        Self {
            id,
            document_id,
            text: new_flag.text,
            color: new_flag.color,
            start_offset: new_flag.start_offset,
            end_offset: new_flag.end_offset,
            created_at: Utc::now(),
        }
    }

    /// Whether this flag's range intersects `[start, end)`.
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        ranges_overlap(self.start_offset, self.end_offset, start, end)
    }
}

impl NewFlag {
    /// Check the payload against a document's plain-text projection.
    ///
    /// The text is trimmed first; the trimmed text must equal the projection
    /// slice at `[start_offset, end_offset)` exactly.
    ///
    /// # Returns
    /// The payload with its text trimmed.
    ///
    /// # Errors
    /// Returns [`AppError::BadRequest`] for empty text, an inverted range, a
    /// range past the end of the document, or a text mismatch.
    pub fn validated_against(mut self, plain_text: &str) -> Result<Self, AppError> {
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            return Err(AppError::BadRequest("Flag text must not be empty".to_string()));
        }
        if self.start_offset >= self.end_offset {
            return Err(AppError::BadRequest(format!(
                "Flag range [{}, {}) is empty or inverted",
                self.start_offset, self.end_offset
            )));
        }
        let Some(slice) = char_slice(plain_text, self.start_offset, self.end_offset) else {
            return Err(AppError::BadRequest(format!(
                "Flag range [{}, {}) exceeds document length {}",
                self.start_offset,
                self.end_offset,
                plain_text.chars().count()
            )));
        };
        if slice != trimmed {
            return Err(AppError::BadRequest(format!(
                "Flag text does not match document text at [{}, {}): expected {:?}",
                self.start_offset, self.end_offset, slice
            )));
        }
        if trimmed.len() != self.text.len() {
            self.text = trimmed.to_string();
        }
        Ok(self)
    }
}
