//! Shared text normalization helpers.

/// Trim an optional string and drop empty values.
///
/// # Returns
/// `None` when the input is missing or whitespace-only; otherwise the trimmed
/// string.
pub fn normalize_optional_nonempty(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Trim leading/trailing whitespace and report how many chars were dropped
/// from the front.
///
/// # Returns
/// The trimmed slice and the number of leading `char`s removed.
pub fn trim_with_leading_count(value: &str) -> (&str, usize) {
    let without_leading = value.trim_start();
    let leading = value[..value.len() - without_leading.len()].chars().count();
    (without_leading.trim_end(), leading)
}

/// Slice `text` by `char` positions `[start, end)`.
///
/// # Returns
/// `None` when the range is inverted or extends past the end of `text`.
pub fn char_slice(text: &str, start: usize, end: usize) -> Option<&str> {
    if start > end {
        return None;
    }
    let mut indices = text
        .char_indices()
        .map(|(idx, _)| idx)
        .chain(std::iter::once(text.len()));
    let start_byte = indices.nth(start)?;
    if start == end {
        return Some(&text[start_byte..start_byte]);
    }
    let end_byte = indices.nth(end - start - 1)?;
    Some(&text[start_byte..end_byte])
}
