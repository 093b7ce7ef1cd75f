//! Shared constants used across textflag crates.

/// Default API port for textflag.
pub const DEFAULT_PORT: u16 = 38419;

/// Default maximum document size accepted by the API layer.
pub const DEFAULT_MAX_DOCUMENT_SIZE: usize = 10 * 1024 * 1024;

/// Default upper bound on rows accepted by a single CSV import.
pub const DEFAULT_MAX_IMPORT_ROWS: usize = 10_000;

/// Default base URL for CLI/API clients.
pub const DEFAULT_CLI_SERVER_URL: &str = "http://localhost:38419";

/// Id of the document seeded on first access.
pub const DEFAULT_DOCUMENT_ID: u64 = 1;

/// Content of the seeded default document.
pub const DEFAULT_DOCUMENT_CONTENT: &str = "<h1>Review Draft</h1>\n\
<p>Select any passage in this document and flag it for review. Flags are \
stored as character offsets into the document text, so they survive \
re-rendering.</p>\n\
<p>Use <strong>red</strong> for problems, <em>yellow</em> for questions and \
green for approved wording.</p>";

/// CSS class carried by every highlight marker.
pub const MARKER_CLASS: &str = "textflag-marker";

/// Header row used for CSV import/export.
pub const CSV_HEADERS: [&str; 4] = ["Text", "Color", "StartOffset", "EndOffset"];
