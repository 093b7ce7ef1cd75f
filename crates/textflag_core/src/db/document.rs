//! Document storage operations backed by redb.

use super::next_id;
use super::tables::{DOCUMENTS, DOCUMENT_SEQUENCE, SEQUENCES};
use crate::constants::{DEFAULT_DOCUMENT_CONTENT, DEFAULT_DOCUMENT_ID};
use crate::error::AppError;
use crate::html::ContainerTree;
use crate::models::document::Document;
use redb::{ReadableDatabase, ReadableTable};
use std::sync::Arc;

/// Accessor for the documents table.
pub struct DocumentDb {
    db: Arc<redb::Database>,
}

pub(crate) fn deserialize_document(bytes: &[u8]) -> Result<Document, AppError> {
    Ok(bincode::deserialize(bytes)?)
}

impl DocumentDb {
    /// Initialize document tables and reserve the default document id.
    ///
    /// # Errors
    /// Returns an error when redb transaction/table initialization fails.
    pub fn new(db: Arc<redb::Database>) -> Result<Self, AppError> {
        let write_txn = db.begin_write()?;
        {
            write_txn.open_table(DOCUMENTS)?;
            let mut sequences = write_txn.open_table(SEQUENCES)?;
            let current = sequences
                .get(DOCUMENT_SEQUENCE)?
                .map(|guard| guard.value())
                .unwrap_or(0);
            if current < DEFAULT_DOCUMENT_ID {
                sequences.insert(DOCUMENT_SEQUENCE, DEFAULT_DOCUMENT_ID)?;
            }
        }
        write_txn.commit()?;
        Ok(Self { db })
    }

    /// Fetch a document by id.
    ///
    /// # Returns
    /// `Ok(Some(document))` when found, `Ok(None)` when missing.
    ///
    /// # Errors
    /// Returns an error when storage access or deserialization fails.
    pub fn get(&self, id: u64) -> Result<Option<Document>, AppError> {
        let read_txn = self.db.begin_read()?;
        let documents = read_txn.open_table(DOCUMENTS)?;
        match documents.get(id)? {
            Some(value) => Ok(Some(deserialize_document(value.value())?)),
            None => Ok(None),
        }
    }

    /// Fetch a document, seeding the default document on first access.
    ///
    /// # Errors
    /// Returns [`AppError::NotFound`] for any other missing id, or a storage
    /// error.
    pub fn get_or_seed(&self, id: u64) -> Result<Document, AppError> {
        if let Some(document) = self.get(id)? {
            return Ok(document);
        }
        if id != DEFAULT_DOCUMENT_ID {
            return Err(AppError::NotFound);
        }

        let write_txn = self.db.begin_write()?;
        let document = {
            let mut documents = write_txn.open_table(DOCUMENTS)?;
            // Another handle may have seeded between the read and this write.
            let existing = documents
                .get(id)?
                .map(|guard| deserialize_document(guard.value()))
                .transpose()?;
            match existing {
                Some(document) => document,
                None => {
                    let document = Document::new(id, DEFAULT_DOCUMENT_CONTENT.to_string());
                    let encoded = bincode::serialize(&document)?;
                    documents.insert(id, encoded.as_slice())?;
                    tracing::info!(id, "seeded default document");
                    document
                }
            }
        };
        write_txn.commit()?;
        Ok(document)
    }

    /// Store a new document.
    ///
    /// # Arguments
    /// - `content`: HTML markup.
    /// - `max_size`: Upper bound on `content` in bytes.
    ///
    /// # Errors
    /// Returns [`AppError::BadRequest`] for empty or oversized content,
    /// [`AppError::Html`] when the markup cannot be tokenized, or a storage
    /// error.
    pub fn create(&self, content: &str, max_size: usize) -> Result<Document, AppError> {
        if content.trim().is_empty() {
            return Err(AppError::BadRequest(
                "Document content must not be empty".to_string(),
            ));
        }
        if content.len() > max_size {
            return Err(AppError::BadRequest(format!(
                "Document is too large: {} bytes (max {})",
                content.len(),
                max_size
            )));
        }
        ContainerTree::parse(content)?;

        let write_txn = self.db.begin_write()?;
        let document = {
            let id = next_id(&write_txn, DOCUMENT_SEQUENCE)?;
            let document = Document::new(id, content.to_string());
            let encoded = bincode::serialize(&document)?;
            let mut documents = write_txn.open_table(DOCUMENTS)?;
            if documents.get(id)?.is_some() {
                return Err(AppError::StorageMessage(format!(
                    "Document id {} already exists",
                    id
                )));
            }
            documents.insert(id, encoded.as_slice())?;
            document
        };
        write_txn.commit()?;
        Ok(document)
    }

    /// List all documents ordered by id.
    ///
    /// # Errors
    /// Returns an error when storage access or deserialization fails.
    pub fn list(&self) -> Result<Vec<Document>, AppError> {
        let read_txn = self.db.begin_read()?;
        let documents = read_txn.open_table(DOCUMENTS)?;
        let mut out = Vec::new();
        for item in documents.iter()? {
            let (_, value) = item?;
            out.push(deserialize_document(value.value())?);
        }
        Ok(out)
    }
}
