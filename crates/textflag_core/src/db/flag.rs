//! Flag storage operations backed by redb.
//!
//! Flags live in [`FLAGS`] keyed by id, with a per-document index in
//! [`FLAGS_BY_DOCUMENT`] keyed by `(document_id, start_offset, flag_id)` so a
//! range scan yields a document's flags already sorted by start offset.
//! Overlap checks and inserts share one write transaction.

use super::next_id;
use super::tables::{FLAGS, FLAGS_BY_DOCUMENT, FLAG_SEQUENCE};
use crate::error::AppError;
use crate::html::ContainerTree;
use crate::models::document::Document;
use crate::models::flag::{ranges_overlap, Flag, NewFlag};
use redb::{ReadableDatabase, ReadableTable};
use std::sync::Arc;

type FlagIndex<'txn> = redb::Table<'txn, (u64, u64, u64), ()>;
type FlagRows<'txn> = redb::Table<'txn, u64, &'static [u8]>;

/// Accessor for flag tables.
pub struct FlagDb {
    db: Arc<redb::Database>,
}

pub(crate) fn deserialize_flag(bytes: &[u8]) -> Result<Flag, AppError> {
    Ok(bincode::deserialize(bytes)?)
}

fn index_key(flag: &Flag) -> (u64, u64, u64) {
    (flag.document_id, flag.start_offset as u64, flag.id)
}

/// First stored flag of `document_id` intersecting `[start, end)`.
///
/// Only index entries starting before `end` can intersect, so the scan stops
/// there.
fn stored_overlap(
    index: &FlagIndex<'_>,
    rows: &FlagRows<'_>,
    document_id: u64,
    start: usize,
    end: usize,
) -> Result<Option<Flag>, AppError> {
    for item in index.range((document_id, 0, 0)..(document_id, end as u64, 0))? {
        let (key, _) = item?;
        let (_, _, flag_id) = key.value();
        let Some(guard) = rows.get(flag_id)? else {
            continue;
        };
        let flag = deserialize_flag(guard.value())?;
        if flag.overlaps(start, end) {
            return Ok(Some(flag));
        }
    }
    Ok(None)
}

fn overlap_error(candidate: &NewFlag, existing: &Flag) -> AppError {
    AppError::Overlap {
        start: candidate.start_offset,
        end: candidate.end_offset,
        existing_id: existing.id,
        existing_start: existing.start_offset,
        existing_end: existing.end_offset,
    }
}

impl FlagDb {
    /// Initialize flag tables if they do not exist yet.
    ///
    /// # Errors
    /// Returns an error when redb transaction/table initialization fails.
    pub fn new(db: Arc<redb::Database>) -> Result<Self, AppError> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(FLAGS)?;
        write_txn.open_table(FLAGS_BY_DOCUMENT)?;
        write_txn.commit()?;
        Ok(Self { db })
    }

    /// Fetch a flag by id.
    ///
    /// # Errors
    /// Returns an error when storage access or deserialization fails.
    pub fn get(&self, id: u64) -> Result<Option<Flag>, AppError> {
        let read_txn = self.db.begin_read()?;
        let rows = read_txn.open_table(FLAGS)?;
        match rows.get(id)? {
            Some(value) => Ok(Some(deserialize_flag(value.value())?)),
            None => Ok(None),
        }
    }

    /// List a document's flags sorted by start offset.
    ///
    /// # Errors
    /// Returns an error when storage access or deserialization fails.
    pub fn list(&self, document_id: u64) -> Result<Vec<Flag>, AppError> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(FLAGS_BY_DOCUMENT)?;
        let rows = read_txn.open_table(FLAGS)?;
        let mut flags = Vec::new();

        for item in index.range((document_id, 0, 0)..=(document_id, u64::MAX, u64::MAX))? {
            let (key, _) = item?;
            let (_, _, flag_id) = key.value();
            let Some(guard) = rows.get(flag_id)? else {
                tracing::warn!(flag_id, document_id, "index entry without flag row");
                continue;
            };
            flags.push(deserialize_flag(guard.value())?);
        }
        Ok(flags)
    }

    /// Create a flag on `document`.
    ///
    /// # Arguments
    /// - `document`: Document the flag belongs to.
    /// - `new_flag`: Text, color and `[start, end)` range.
    ///
    /// # Returns
    /// The stored flag, with its text trimmed.
    ///
    /// # Errors
    /// - [`AppError::BadRequest`] when the range or text does not match the
    ///   document.
    /// - [`AppError::Overlap`] when the range intersects a stored flag.
    pub fn create(&self, document: &Document, new_flag: NewFlag) -> Result<Flag, AppError> {
        let tree = ContainerTree::parse(&document.content)?;
        let new_flag = new_flag.validated_against(tree.plain_text())?;

        let write_txn = self.db.begin_write()?;
        let flag = {
            let id = next_id(&write_txn, FLAG_SEQUENCE)?;
            let mut rows = write_txn.open_table(FLAGS)?;
            let mut index = write_txn.open_table(FLAGS_BY_DOCUMENT)?;

            if let Some(existing) = stored_overlap(
                &index,
                &rows,
                document.id,
                new_flag.start_offset,
                new_flag.end_offset,
            )? {
                return Err(overlap_error(&new_flag, &existing));
            }

            let flag = Flag::new(id, document.id, new_flag);
            let encoded = bincode::serialize(&flag)?;
            rows.insert(flag.id, encoded.as_slice())?;
            index.insert(index_key(&flag), ())?;
            flag
        };
        write_txn.commit()?;
        tracing::debug!(
            flag_id = flag.id,
            document_id = flag.document_id,
            start = flag.start_offset,
            end = flag.end_offset,
            "created flag"
        );
        Ok(flag)
    }

    /// Delete a flag by id.
    ///
    /// # Returns
    /// `true` when a row was deleted, otherwise `false`.
    ///
    /// # Errors
    /// Returns an error when storage or deserialization fails.
    pub fn delete(&self, id: u64) -> Result<bool, AppError> {
        let write_txn = self.db.begin_write()?;
        let deleted = {
            let mut rows = write_txn.open_table(FLAGS)?;
            let mut index = write_txn.open_table(FLAGS_BY_DOCUMENT)?;

            let Some(guard) = rows.get(id)? else {
                return Ok(false);
            };
            let flag = deserialize_flag(guard.value())?;
            drop(guard);

            let _ = index.remove(index_key(&flag))?;
            let _ = rows.remove(id)?;
            true
        };
        write_txn.commit()?;
        Ok(deleted)
    }

    /// Delete every flag of a document.
    ///
    /// # Returns
    /// Number of flags removed.
    ///
    /// # Errors
    /// Returns an error when storage access fails.
    pub fn delete_all(&self, document_id: u64) -> Result<usize, AppError> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut rows = write_txn.open_table(FLAGS)?;
            let mut index = write_txn.open_table(FLAGS_BY_DOCUMENT)?;

            let keys = index
                .range((document_id, 0, 0)..=(document_id, u64::MAX, u64::MAX))?
                .map(|item| item.map(|(key, _)| key.value()))
                .collect::<Result<Vec<_>, _>>()?;
            for key in &keys {
                let _ = index.remove(*key)?;
                let _ = rows.remove(key.2)?;
            }
            keys.len()
        };
        write_txn.commit()?;
        tracing::debug!(document_id, removed, "cleared flags");
        Ok(removed)
    }

    /// Import many flags into `document` atomically.
    ///
    /// Each row is validated like [`FlagDb::create`], against stored flags and
    /// against the other rows. Either every row is stored or none is.
    ///
    /// # Returns
    /// Number of flags imported.
    ///
    /// # Errors
    /// - [`AppError::Format`] naming the 1-based row that failed validation or
    ///   overlaps an earlier row.
    /// - [`AppError::Overlap`] when a row intersects a stored flag.
    pub fn import_bulk(&self, document: &Document, rows: Vec<NewFlag>) -> Result<usize, AppError> {
        let tree = ContainerTree::parse(&document.content)?;
        let mut validated = Vec::with_capacity(rows.len());
        for (index, row) in rows.into_iter().enumerate() {
            let row_number = index + 1;
            let flag = row
                .validated_against(tree.plain_text())
                .map_err(|err| AppError::Format {
                    row: row_number,
                    message: match err {
                        AppError::BadRequest(message) => message,
                        other => other.to_string(),
                    },
                })?;
            validated.push((row_number, flag));
        }

        let mut by_start: Vec<&(usize, NewFlag)> = validated.iter().collect();
        by_start.sort_by_key(|(_, flag)| (flag.start_offset, flag.end_offset));
        for pair in by_start.windows(2) {
            let (earlier_row, earlier) = pair[0];
            let (later_row, later) = pair[1];
            if ranges_overlap(
                earlier.start_offset,
                earlier.end_offset,
                later.start_offset,
                later.end_offset,
            ) {
                return Err(AppError::Format {
                    row: (*earlier_row).max(*later_row),
                    message: format!(
                        "range overlaps row {}",
                        (*earlier_row).min(*later_row)
                    ),
                });
            }
        }

        let imported = validated.len();
        let write_txn = self.db.begin_write()?;
        {
            let mut ids = Vec::with_capacity(validated.len());
            for _ in 0..imported {
                ids.push(next_id(&write_txn, FLAG_SEQUENCE)?);
            }
            let mut flag_rows = write_txn.open_table(FLAGS)?;
            let mut index = write_txn.open_table(FLAGS_BY_DOCUMENT)?;

            for ((_, new_flag), id) in validated.into_iter().zip(ids) {
                if let Some(existing) = stored_overlap(
                    &index,
                    &flag_rows,
                    document.id,
                    new_flag.start_offset,
                    new_flag.end_offset,
                )? {
                    return Err(overlap_error(&new_flag, &existing));
                }
                let flag = Flag::new(id, document.id, new_flag);
                let encoded = bincode::serialize(&flag)?;
                flag_rows.insert(flag.id, encoded.as_slice())?;
                index.insert(index_key(&flag), ())?;
            }
        }
        write_txn.commit()?;
        tracing::info!(document_id = document.id, imported, "imported flags");
        Ok(imported)
    }
}
