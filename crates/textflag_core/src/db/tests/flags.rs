//! Flag store tests.

use super::*;
use crate::models::flag::Flag;

const HELLO: &str = "<p>Hello world</p>";

#[test]
fn create_list_delete_roundtrip() {
    let (db, _temp) = setup_temp_db();
    let document = create_document(&db, HELLO);

    let flag = db
        .flags
        .create(&document, new_flag("world", 6, 11))
        .expect("create");
    assert_eq!(flag.document_id, document.id);
    assert_eq!((flag.start_offset, flag.end_offset), (6, 11));
    assert_eq!(db.flags.get(flag.id).expect("get"), Some(flag.clone()));
    assert_eq!(db.flags.list(document.id).expect("list"), vec![flag.clone()]);

    assert!(db.flags.delete(flag.id).expect("delete"));
    assert!(!db.flags.delete(flag.id).expect("second delete"));
    assert!(db.flags.list(document.id).expect("list").is_empty());
}

#[test]
fn list_is_sorted_by_start_and_scoped_to_the_document() {
    let (db, _temp) = setup_temp_db();
    let document = create_document(&db, "<p>abcdefghij</p>");
    let other = create_document(&db, "<p>abcdefghij</p>");

    db.flags.create(&document, new_flag("ghij", 6, 10)).expect("late");
    db.flags.create(&document, new_flag("ab", 0, 2)).expect("early");
    db.flags.create(&other, new_flag("cd", 2, 4)).expect("other doc");

    let starts: Vec<usize> = db
        .flags
        .list(document.id)
        .expect("list")
        .iter()
        .map(|flag| flag.start_offset)
        .collect();
    assert_eq!(starts, vec![0, 6]);
    assert_eq!(db.flags.list(other.id).expect("list").len(), 1);
}

#[test]
fn overlapping_create_is_rejected_but_touching_is_accepted() {
    let (db, _temp) = setup_temp_db();
    let document = create_document(&db, "<p>abcdefghij</p>");
    let first = db.flags.create(&document, new_flag("abcde", 0, 5)).expect("A");

    match db.flags.create(&document, new_flag("defgh", 3, 8)) {
        Err(AppError::Overlap {
            existing_id,
            existing_start,
            existing_end,
            ..
        }) => {
            assert_eq!(existing_id, first.id);
            assert_eq!((existing_start, existing_end), (0, 5));
        }
        other => panic!("expected overlap, got {:?}", other),
    }

    db.flags.create(&document, new_flag("fgh", 5, 8)).expect("C touches A");
    assert_eq!(db.flags.list(document.id).expect("list").len(), 2);
}

#[test]
fn create_validates_text_and_range_against_the_projection() {
    let (db, _temp) = setup_temp_db();
    let document = create_document(&db, HELLO);
    for bad in [
        new_flag("World", 6, 11),
        new_flag("world", 6, 12),
        new_flag("", 0, 0),
    ] {
        assert!(matches!(
            db.flags.create(&document, bad),
            Err(AppError::BadRequest(_))
        ));
    }
}

#[test]
fn delete_all_only_clears_the_given_document() {
    let (db, _temp) = setup_temp_db();
    let document = create_document(&db, HELLO);
    let other = create_document(&db, HELLO);
    db.flags.create(&document, new_flag("Hello", 0, 5)).expect("a");
    db.flags.create(&document, new_flag("world", 6, 11)).expect("b");
    db.flags.create(&other, new_flag("world", 6, 11)).expect("c");

    assert_eq!(db.flags.delete_all(document.id).expect("clear"), 2);
    assert!(db.flags.list(document.id).expect("list").is_empty());
    assert_eq!(db.flags.list(other.id).expect("list").len(), 1);
    assert_eq!(db.flags.delete_all(document.id).expect("clear again"), 0);
}

#[test]
fn import_matches_interactive_creation() {
    let (db, _temp) = setup_temp_db();
    let document = create_document(&db, HELLO);
    let interactive = db
        .flags
        .create(&document, new_flag("world", 6, 11))
        .expect("create");
    db.flags.delete_all(document.id).expect("clear");

    let imported = db
        .flags
        .import_bulk(&document, vec![new_flag("world", 6, 11)])
        .expect("import");
    assert_eq!(imported, 1);

    let stored: Vec<Flag> = db.flags.list(document.id).expect("list");
    assert_eq!(stored.len(), 1);
    let row = &stored[0];
    assert_eq!(row.text, interactive.text);
    assert_eq!(row.color, interactive.color);
    assert_eq!(row.document_id, interactive.document_id);
    assert_eq!(
        (row.start_offset, row.end_offset),
        (interactive.start_offset, interactive.end_offset)
    );
}

#[test]
fn import_is_all_or_nothing() {
    let (db, _temp) = setup_temp_db();
    let document = create_document(&db, "<p>abcdefghij</p>");
    db.flags.create(&document, new_flag("ij", 8, 10)).expect("stored");

    let result = db.flags.import_bulk(
        &document,
        vec![new_flag("ab", 0, 2), new_flag("hi", 7, 9)],
    );
    assert!(matches!(result, Err(AppError::Overlap { .. })));
    assert_eq!(db.flags.list(document.id).expect("list").len(), 1);

    let result = db.flags.import_bulk(
        &document,
        vec![new_flag("ab", 0, 2), new_flag("xx", 3, 5)],
    );
    assert!(matches!(result, Err(AppError::Format { row: 2, .. })));
    assert_eq!(db.flags.list(document.id).expect("list").len(), 1);
}

#[test]
fn import_rejects_rows_overlapping_each_other() {
    let (db, _temp) = setup_temp_db();
    let document = create_document(&db, "<p>abcdefghij</p>");
    let result = db.flags.import_bulk(
        &document,
        vec![new_flag("defgh", 3, 8), new_flag("abcde", 0, 5)],
    );
    match result {
        Err(AppError::Format { row, message }) => {
            assert_eq!(row, 2);
            assert!(message.contains("row 1"));
        }
        other => panic!("expected format error, got {:?}", other),
    }
    assert!(db.flags.list(document.id).expect("list").is_empty());
}
