//! Storage layer: documents and flags in a single redb file.

/// Document storage operations.
pub mod document;
/// Flag storage operations.
pub mod flag;
/// redb table definitions.
pub mod tables;

use crate::error::AppError;
use redb::ReadableTable;
use std::path::Path;
use std::sync::Arc;

pub use document::DocumentDb;
pub use flag::FlagDb;

/// Open database plus accessors for each record family.
pub struct Database {
    pub db: Arc<redb::Database>,
    pub documents: DocumentDb,
    pub flags: FlagDb,
}

impl Database {
    /// Build accessors over an already open redb handle.
    ///
    /// # Returns
    /// A [`Database`] sharing `db` with every other handle built from it.
    ///
    /// # Errors
    /// Returns an error when table initialization fails.
    pub fn from_shared(db: Arc<redb::Database>) -> Result<Self, AppError> {
        Ok(Self {
            documents: DocumentDb::new(db.clone())?,
            flags: FlagDb::new(db.clone())?,
            db,
        })
    }

    /// Another handle over the same open database.
    pub fn share(&self) -> Result<Self, AppError> {
        Self::from_shared(self.db.clone())
    }

    /// Open (or create) the database inside the directory `path`.
    ///
    /// # Returns
    /// A fully initialized [`Database`].
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created, another process
    /// holds the database, or table initialization fails.
    pub fn new(path: &str) -> Result<Self, AppError> {
        let dir = Path::new(path);
        std::fs::create_dir_all(dir).map_err(|err| {
            AppError::StorageMessage(format!(
                "Failed to create database directory '{}': {}",
                dir.display(),
                err
            ))
        })?;

        let file = dir.join(tables::REDB_FILE_NAME);
        let db = match redb::Database::create(&file) {
            Ok(db) => db,
            Err(redb::DatabaseError::DatabaseAlreadyOpen) => {
                return Err(AppError::StorageMessage(format!(
                    "Database '{}' is already open in another process. \
                     Stop the other textflag server or set DB_PATH to a different directory.",
                    file.display()
                )));
            }
            Err(err) => return Err(err.into()),
        };
        tracing::debug!(path = %file.display(), "opened database");
        Self::from_shared(Arc::new(db))
    }
}

/// Allocate the next id of `sequence` inside `write_txn`.
pub(crate) fn next_id(write_txn: &redb::WriteTransaction, sequence: &str) -> Result<u64, AppError> {
    let mut sequences = write_txn.open_table(tables::SEQUENCES)?;
    let current = sequences.get(sequence)?.map(|guard| guard.value()).unwrap_or(0);
    let next = current
        .checked_add(1)
        .ok_or_else(|| AppError::StorageMessage(format!("Sequence '{}' exhausted", sequence)))?;
    sequences.insert(sequence, next)?;
    Ok(next)
}

#[cfg(test)]
mod tests;
