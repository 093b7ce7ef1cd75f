//! Mapping between tree positions and absolute plain-text offsets.
//!
//! Forward mapping turns a selection expressed as (node, in-node offset) into
//! a `[start, end)` range over the plain-text projection; inverse mapping
//! finds the text nodes and in-node offsets for a stored range.

use crate::html::{ContainerTree, NodeId};
use crate::models::flag::Flag;
use crate::text::{char_slice, trim_with_leading_count};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A position inside the tree.
///
/// For text nodes `offset` counts chars into the node's text; for the
/// container or an element it is a child index, as with DOM ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomPoint {
    pub node: NodeId,
    pub offset: usize,
}

/// Start and end anchors produced by [`locate_range`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomRange {
    pub start: DomPoint,
    pub end: DomPoint,
}

/// Selection as reported by the hosting UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRange {
    pub start: DomPoint,
    pub end: DomPoint,
    /// The raw selected string, before trimming.
    pub text: String,
}

/// A selection that mapped cleanly onto the projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSelection {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Why a selection was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("No text selected")]
    EmptySelection,

    #[error("Selection is outside the document")]
    OutOfContainer,

    #[error("Selected text does not match the document at [{start}, {end})")]
    OffsetMismatch { start: usize, end: usize },

    #[error("Selection overlaps an existing flag")]
    OverlapConflict {
        start: usize,
        end: usize,
        existing_id: u64,
    },
}

impl SelectionError {
    /// Only overlap conflicts are reported to the user; every other rejection
    /// is silently ignored.
    pub fn is_user_visible(&self) -> bool {
        matches!(self, SelectionError::OverlapConflict { .. })
    }

    /// Stable identifier used in API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            SelectionError::EmptySelection => "empty_selection",
            SelectionError::OutOfContainer => "out_of_container",
            SelectionError::OffsetMismatch { .. } => "offset_mismatch",
            SelectionError::OverlapConflict { .. } => "overlap_conflict",
        }
    }
}

impl SelectionRange {
    /// Build the selection a UI would report for the span between two points.
    ///
    /// # Returns
    /// `None` when either point is not in `tree` or `end` precedes `start`.
    pub fn from_points(tree: &ContainerTree, start: DomPoint, end: DomPoint) -> Option<Self> {
        let start_abs = absolute_offset(tree, start)?;
        let end_abs = absolute_offset(tree, end)?;
        let text = char_slice(tree.plain_text(), start_abs, end_abs)?.to_string();
        Some(Self { start, end, text })
    }

    /// Whether start and end are the same point.
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// Absolute projection offset of a single tree position.
///
/// Text node positions walk the text nodes in document order, accumulating
/// their lengths until the anchor node is reached. Element positions resolve
/// through their child index.
///
/// # Returns
/// `None` when the node is unknown or the offset lies past the node's end.
pub fn absolute_offset(tree: &ContainerTree, point: DomPoint) -> Option<usize> {
    let node = tree.node(point.node)?;
    if node.as_text().is_some() {
        let mut cursor = 0usize;
        for &text_id in tree.text_nodes() {
            let text = tree.text_node(text_id)?;
            if text_id == point.node {
                if point.offset > text.char_len() {
                    return None;
                }
                tracing::trace!(node = text_id, cursor, offset = point.offset, "matched anchor");
                return Some(cursor + point.offset);
            }
            cursor += text.char_len();
        }
        return None;
    }

    let children = node.children();
    match point.offset {
        index if index < children.len() => Some(tree.plain_offset_at_or_after(children[index])),
        index if index == children.len() => {
            Some(tree.plain_offset_at_or_after(tree.subtree_end(point.node)?))
        }
        _ => None,
    }
}

/// Find the first flag in `flags` that intersects `[start, end)`.
pub fn find_overlap(flags: &[Flag], start: usize, end: usize) -> Option<&Flag> {
    flags.iter().find(|flag| flag.overlaps(start, end))
}

/// Convert a UI selection into an absolute `[start, end)` range.
///
/// The start anchor fixes the position; the end is derived from the length
/// of the trimmed selection text, so selections that the UI reports across
/// odd element boundaries still yield a single contiguous range. The range
/// is accepted only if the projection slice equals the trimmed text exactly.
///
/// # Arguments
/// - `tree`: Container the selection was made in.
/// - `range`: Selection reported by the UI.
/// - `existing`: Flags to test for overlap, or `None` to skip the check.
///
/// # Errors
/// Returns the [`SelectionError`] describing why the selection is rejected.
pub fn locate_selection(
    tree: &ContainerTree,
    range: &SelectionRange,
    existing: Option<&[Flag]>,
) -> Result<ResolvedSelection, SelectionError> {
    if !tree.contains(range.start.node) || !tree.contains(range.end.node) {
        return Err(SelectionError::OutOfContainer);
    }

    let (trimmed, leading) = trim_with_leading_count(&range.text);
    if trimmed.is_empty() {
        return Err(SelectionError::EmptySelection);
    }

    let anchor = absolute_offset(tree, range.start).ok_or(SelectionError::OutOfContainer)?;
    let start = anchor + leading;
    let end = start + trimmed.chars().count();

    match char_slice(tree.plain_text(), start, end) {
        Some(slice) if slice == trimmed => {}
        _ => {
            tracing::debug!(start, end, "selection text does not match projection");
            return Err(SelectionError::OffsetMismatch { start, end });
        }
    }

    if let Some(flag) = existing.and_then(|flags| find_overlap(flags, start, end)) {
        return Err(SelectionError::OverlapConflict {
            start,
            end,
            existing_id: flag.id,
        });
    }

    Ok(ResolvedSelection {
        text: trimmed.to_string(),
        start,
        end,
    })
}

/// Locate the text nodes holding `[abs_start, abs_end)`.
///
/// The start anchor is the first text node whose span extends past
/// `abs_start`; the end anchor is the first whose span reaches `abs_end`.
///
/// # Returns
/// `None` for an empty or inverted range, or when either boundary lies
/// outside all text nodes.
pub fn locate_range(tree: &ContainerTree, abs_start: usize, abs_end: usize) -> Option<DomRange> {
    if abs_start >= abs_end || abs_end > tree.plain_len() {
        return None;
    }

    let mut start = None;
    for &text_id in tree.text_nodes() {
        let text = tree.text_node(text_id)?;
        let node_start = text.plain_start();
        let node_end = node_start + text.char_len();

        if start.is_none() && abs_start < node_end {
            start = Some(DomPoint {
                node: text_id,
                offset: abs_start - node_start,
            });
        }
        if start.is_some() && abs_end <= node_end {
            return Some(DomRange {
                start: start?,
                end: DomPoint {
                    node: text_id,
                    offset: abs_end - node_start,
                },
            });
        }
    }
    None
}

/// Text covered by a [`DomRange`], read back through forward mapping.
pub fn text_in_range(tree: &ContainerTree, range: &DomRange) -> Option<String> {
    let start = absolute_offset(tree, range.start)?;
    let end = absolute_offset(tree, range.end)?;
    char_slice(tree.plain_text(), start, end).map(str::to_string)
}
