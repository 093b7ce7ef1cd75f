//! redb table definitions shared by storage modules.

use redb::TableDefinition;

/// File name for the redb database within the configured DB directory.
pub const REDB_FILE_NAME: &str = "data.redb";

/// Document rows (`Document`, bincode-encoded).
pub const DOCUMENTS: TableDefinition<u64, &[u8]> = TableDefinition::new("documents");
/// Flag rows (`Flag`, bincode-encoded).
pub const FLAGS: TableDefinition<u64, &[u8]> = TableDefinition::new("flags");

/// Per-document flag index ordered by start offset then flag id.
pub const FLAGS_BY_DOCUMENT: TableDefinition<(u64, u64, u64), ()> =
    TableDefinition::new("flags_by_document");
/// Last allocated id per sequence name.
pub const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

pub(crate) const DOCUMENT_SEQUENCE: &str = "documents";
pub(crate) const FLAG_SEQUENCE: &str = "flags";
