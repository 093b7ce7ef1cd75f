//! CSV import and export of flags (`Text,Color,StartOffset,EndOffset`).

use crate::constants::CSV_HEADERS;
use crate::error::AppError;
use crate::models::color::FlagColor;
use crate::models::flag::{Flag, NewFlag};

/// Serialize flags as CSV, sorted by start offset.
///
/// # Errors
/// Returns [`AppError::StorageMessage`] if the CSV writer fails.
pub fn write_csv(flags: &[Flag]) -> Result<String, AppError> {
    let mut ordered: Vec<&Flag> = flags.iter().collect();
    ordered.sort_by_key(|flag| (flag.start_offset, flag.id));

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADERS).map_err(csv_error)?;
    for flag in ordered {
        writer
            .write_record([
                flag.text.clone(),
                flag.color.to_string(),
                flag.start_offset.to_string(),
                flag.end_offset.to_string(),
            ])
            .map_err(csv_error)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| AppError::StorageMessage(format!("CSV export failed: {}", err)))?;
    String::from_utf8(bytes)
        .map_err(|err| AppError::StorageMessage(format!("CSV export produced invalid UTF-8: {}", err)))
}

/// Parse CSV rows into flag payloads.
///
/// Columns are matched by header name, case-insensitively and in any order.
/// Rows are numbered from 1, not counting the header.
///
/// # Errors
/// - [`AppError::Format`] for a missing column or a malformed row.
/// - [`AppError::BadRequest`] for an empty input or more than `max_rows`
///   data rows.
pub fn parse_csv(input: &str, max_rows: usize) -> Result<Vec<NewFlag>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(input.as_bytes());

    let headers = reader
        .headers()
        .map_err(|err| AppError::Format {
            row: 0,
            message: err.to_string(),
        })?
        .clone();
    if headers.is_empty() || headers.iter().all(str::is_empty) {
        return Err(AppError::BadRequest("CSV input is empty".to_string()));
    }

    let column = |name: &str| -> Result<usize, AppError> {
        headers
            .iter()
            .position(|header| header.eq_ignore_ascii_case(name))
            .ok_or_else(|| AppError::Format {
                row: 0,
                message: format!("missing column '{}'", name),
            })
    };
    let [text_col, color_col, start_col, end_col] = [
        column(CSV_HEADERS[0])?,
        column(CSV_HEADERS[1])?,
        column(CSV_HEADERS[2])?,
        column(CSV_HEADERS[3])?,
    ];

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let row = index + 1;
        if row > max_rows {
            return Err(AppError::BadRequest(format!(
                "CSV import is limited to {} rows",
                max_rows
            )));
        }
        let record = record.map_err(|err| AppError::Format {
            row,
            message: err.to_string(),
        })?;
        let offset = |col: usize, name: &str| -> Result<usize, AppError> {
            let raw = record_field(&record, row, col, name)?.trim();
            raw.parse().map_err(|_| AppError::Format {
                row,
                message: format!("'{}' is not a valid {}", raw, name),
            })
        };

        let color = record_field(&record, row, color_col, "Color")?
            .parse::<FlagColor>()
            .map_err(|err| AppError::Format {
                row,
                message: err.to_string(),
            })?;
        rows.push(NewFlag {
            text: record_field(&record, row, text_col, "Text")?.to_string(),
            color,
            start_offset: offset(start_col, "StartOffset")?,
            end_offset: offset(end_col, "EndOffset")?,
        });
    }

    tracing::debug!(rows = rows.len(), "parsed CSV import");
    Ok(rows)
}

fn record_field<'r>(
    record: &'r csv::StringRecord,
    row: usize,
    col: usize,
    name: &str,
) -> Result<&'r str, AppError> {
    record.get(col).ok_or_else(|| AppError::Format {
        row,
        message: format!("missing value for '{}'", name),
    })
}

fn csv_error(err: csv::Error) -> AppError {
    AppError::StorageMessage(format!("CSV export failed: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(id: u64, text: &str, color: FlagColor, start: usize, end: usize) -> Flag {
        Flag::new(
            id,
            1,
            NewFlag {
                text: text.to_string(),
                color,
                start_offset: start,
                end_offset: end,
            },
        )
    }

    #[test]
    fn export_writes_header_and_sorted_rows() {
        let csv = write_csv(&[
            stored(2, "world", FlagColor::Red, 6, 11),
            stored(1, "Hello, \"you\"", FlagColor::Custom("#00ff00".to_string()), 0, 12),
        ])
        .expect("csv");
        assert_eq!(
            csv,
            "Text,Color,StartOffset,EndOffset\n\"Hello, \"\"you\"\"\",#00ff00,0,12\nworld,red,6,11\n"
        );
    }

    #[test]
    fn import_matches_columns_by_name_in_any_order() {
        let input = "startoffset, Color ,TEXT,EndOffset\n6,Red,world,11\n";
        let rows = parse_csv(input, 10).expect("rows");
        assert_eq!(
            rows,
            vec![NewFlag {
                text: "world".to_string(),
                color: FlagColor::Red,
                start_offset: 6,
                end_offset: 11,
            }]
        );
    }

    #[test]
    fn export_then_import_preserves_payloads() {
        let flags = [
            stored(1, "a, b", FlagColor::Yellow, 0, 4),
            stored(2, "line\nbreak", FlagColor::Green, 10, 20),
        ];
        let rows = parse_csv(&write_csv(&flags).expect("csv"), 10).expect("rows");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text, "a, b");
        assert_eq!(rows[1].text, "line\nbreak");
        assert_eq!(rows[1].color, FlagColor::Green);
    }

    #[test]
    fn malformed_rows_report_their_row_number() {
        let input = "Text,Color,StartOffset,EndOffset\nok,red,0,2\nbad,purple,3,4\n";
        match parse_csv(input, 10) {
            Err(AppError::Format { row, message }) => {
                assert_eq!(row, 2);
                assert!(message.contains("purple"));
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let input = "Text,Color,StartOffset,EndOffset\nx,red,-1,2\n";
        assert!(matches!(
            parse_csv(input, 10),
            Err(AppError::Format { row: 1, .. })
        ));

        let input = "Text,Color,StartOffset,EndOffset\nx,red,1\n";
        assert!(matches!(
            parse_csv(input, 10),
            Err(AppError::Format { row: 1, .. })
        ));
    }

    #[test]
    fn missing_columns_and_empty_input_are_rejected() {
        assert!(matches!(
            parse_csv("Text,Color,StartOffset\nx,red,1\n", 10),
            Err(AppError::Format { row: 0, .. })
        ));
        assert!(matches!(parse_csv("", 10), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn row_limit_is_enforced() {
        let input = "Text,Color,StartOffset,EndOffset\na,red,0,1\nb,red,1,2\nc,red,2,3\n";
        assert_eq!(parse_csv(input, 3).expect("rows").len(), 3);
        assert!(matches!(parse_csv(input, 2), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn header_only_input_yields_no_rows() {
        let rows = parse_csv("Text,Color,StartOffset,EndOffset\n", 10).expect("rows");
        assert!(rows.is_empty());
    }
}
