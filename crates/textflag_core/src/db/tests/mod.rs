//! Database integration tests.

use super::*;
use crate::error::AppError;
use crate::models::color::FlagColor;
use crate::models::flag::NewFlag;
use crate::test_support::{create_document, setup_temp_db};

fn new_flag(text: &str, start: usize, end: usize) -> NewFlag {
    NewFlag {
        text: text.to_string(),
        color: FlagColor::Red,
        start_offset: start,
        end_offset: end,
    }
}

mod flags;
