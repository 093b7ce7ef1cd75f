//! Highlight rendering: splice flag markers into document markup.
//!
//! Rendering always starts from a fresh parse of the canonical content, so it
//! is a pure function of `(content, flags)`. Markers are inserted at source
//! byte positions taken from the parsed tree; everything outside a marker
//! tag is copied through byte-for-byte.

use crate::constants::MARKER_CLASS;
use crate::error::AppError;
use crate::html::{end_tag_name, scan_markup, source_offset, tag_name, ContainerTree, NodeId};
use crate::models::flag::Flag;
use crate::offsets::locate_range;
use crate::text::char_slice;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use serde::{Deserialize, Serialize};

/// Parents whose text fragments are never wrapped: raw-text elements and
/// elements where an inline `<mark>` child is not allowed.
const UNWRAPPABLE_PARENTS: [&str; 14] = [
    "script", "style", "textarea", "title", "table", "thead", "tbody", "tfoot", "tr", "ul", "ol",
    "select", "head", "html",
];

/// Result of a render pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedDocument {
    pub html: String,
    /// Ids of flags that produced at least one marker.
    pub applied: Vec<u64>,
    pub skipped: Vec<SkippedFlag>,
}

/// A flag dropped from the current render pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedFlag {
    pub flag_id: u64,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Edge {
    Close,
    Open,
}

struct Insertion {
    pos: usize,
    edge: Edge,
    seq: usize,
    markup: String,
}

/// Render `content` with every flag wrapped in a marker.
///
/// # Arguments
/// - `content`: Canonical document markup.
/// - `flags`: Flags of the document, in any order.
///
/// # Returns
/// The highlighted markup plus the ids of applied and skipped flags.
///
/// # Errors
/// Returns [`AppError::Html`] if `content` cannot be tokenized.
pub fn render(content: &str, flags: &[Flag]) -> Result<RenderedDocument, AppError> {
    let tree = ContainerTree::parse(content)?;
    Ok(render_tree(&tree, flags))
}

/// Render an already parsed tree. See [`render`].
pub fn render_tree(tree: &ContainerTree, flags: &[Flag]) -> RenderedDocument {
    let mut ordered: Vec<&Flag> = flags.iter().collect();
    ordered.sort_by_key(|flag| (flag.start_offset, flag.end_offset, flag.id));

    let mut insertions = Vec::new();
    let mut applied = Vec::new();
    let mut skipped = Vec::new();

    for flag in ordered {
        match flag_insertions(tree, flag, &mut insertions) {
            Ok(()) => applied.push(flag.id),
            Err(reason) => {
                tracing::warn!(
                    flag_id = flag.id,
                    start = flag.start_offset,
                    end = flag.end_offset,
                    reason = %reason,
                    "skipping flag during render"
                );
                skipped.push(SkippedFlag {
                    flag_id: flag.id,
                    reason,
                });
            }
        }
    }

    insertions.sort_by_key(|insertion| (insertion.pos, insertion.edge, insertion.seq));
    RenderedDocument {
        html: splice(tree.source(), &insertions),
        applied,
        skipped,
    }
}

fn flag_insertions(
    tree: &ContainerTree,
    flag: &Flag,
    insertions: &mut Vec<Insertion>,
) -> Result<(), String> {
    let range = locate_range(tree, flag.start_offset, flag.end_offset).ok_or_else(|| {
        format!(
            "range [{}, {}) has no anchors in a document of length {}",
            flag.start_offset,
            flag.end_offset,
            tree.plain_len()
        )
    })?;

    let current = char_slice(tree.plain_text(), flag.start_offset, flag.end_offset);
    if current != Some(flag.text.as_str()) {
        return Err("flag text no longer matches the document".to_string());
    }

    let text_nodes = tree.text_nodes();
    let first = text_nodes
        .binary_search(&range.start.node)
        .map_err(|_| "start anchor is not a text node".to_string())?;
    let last = text_nodes
        .binary_search(&range.end.node)
        .map_err(|_| "end anchor is not a text node".to_string())?;

    let open = marker_open_tag(flag);
    let mut wrapped = 0usize;
    for &node_id in &text_nodes[first..=last] {
        let Some(text) = tree.text_node(node_id) else {
            continue;
        };
        let from = if node_id == range.start.node { range.start.offset } else { 0 };
        let to = if node_id == range.end.node { range.end.offset } else { text.char_len() };
        if from >= to || !can_wrap(tree, node_id) {
            continue;
        }
        let (Some(open_at), Some(close_at)) = (text.source_offset(from), text.source_offset(to))
        else {
            continue;
        };
        let seq = insertions.len();
        insertions.push(Insertion {
            pos: open_at,
            edge: Edge::Open,
            seq,
            markup: open.clone(),
        });
        insertions.push(Insertion {
            pos: close_at,
            edge: Edge::Close,
            seq: seq + 1,
            markup: "</mark>".to_string(),
        });
        wrapped += 1;
    }

    if wrapped == 0 {
        return Err("range covers no wrappable text".to_string());
    }
    Ok(())
}

fn can_wrap(tree: &ContainerTree, node_id: NodeId) -> bool {
    tree.parent_element_name(node_id)
        .map_or(true, |name| !UNWRAPPABLE_PARENTS.contains(&name))
}

fn splice(source: &str, insertions: &[Insertion]) -> String {
    let extra: usize = insertions.iter().map(|insertion| insertion.markup.len()).sum();
    let mut out = String::with_capacity(source.len() + extra);
    let mut copied = 0usize;
    for insertion in insertions {
        out.push_str(&source[copied..insertion.pos]);
        out.push_str(&insertion.markup);
        copied = insertion.pos;
    }
    out.push_str(&source[copied..]);
    out
}

/// CSS applied to a marker: a translucent tint plus a solid underline.
pub fn marker_style(flag: &Flag) -> String {
    let (r, g, b) = flag.color.rgb();
    format!(
        "background-color: rgba({}, {}, {}, 0.25); border-bottom: 2px solid {};",
        r,
        g,
        b,
        flag.color.hex()
    )
}

/// Opening tag of the marker element for `flag`.
pub fn marker_open_tag(flag: &Flag) -> String {
    let color = flag.color.to_string();
    format!(
        "<mark class=\"{}\" data-flag-id=\"{}\" data-flag-color=\"{}\" style=\"{}\">",
        MARKER_CLASS,
        flag.id,
        escape(color.as_str()),
        marker_style(flag)
    )
}

/// Remove every marker produced by [`render`], keeping the wrapped text.
///
/// Other `<mark>` elements are left alone.
///
/// # Errors
/// Returns [`AppError::Html`] if `html` cannot be tokenized.
pub fn strip_markers(html: &str) -> Result<String, AppError> {
    let mut removals: Vec<(usize, usize)> = Vec::new();
    let mut open_marks: Vec<bool> = Vec::new();

    scan_markup(html, |event| {
        match event {
            Event::Start(tag) if tag_name(tag) == "mark" => {
                let is_marker = tag
                    .html_attributes()
                    .flatten()
                    .filter(|attr| attr.key.as_ref().eq_ignore_ascii_case(b"class"))
                    .any(|attr| {
                        String::from_utf8_lossy(&attr.value)
                            .split_ascii_whitespace()
                            .any(|class| class == MARKER_CLASS)
                    });
                if is_marker {
                    if let Some(start) = source_offset(html, tag) {
                        removals.push((start - 1, start + tag.len() + 1));
                    }
                }
                open_marks.push(is_marker);
            }
            Event::End(tag) if end_tag_name(tag) == "mark" => {
                if open_marks.pop() == Some(true) {
                    if let Some(start) = source_offset(html, tag) {
                        let close = html[start..]
                            .find('>')
                            .map_or(html.len(), |idx| start + idx + 1);
                        removals.push((start - 2, close));
                    }
                }
            }
            _ => {}
        }
        Ok(())
    })?;

    removals.sort_unstable();
    let mut out = String::with_capacity(html.len());
    let mut copied = 0usize;
    for (start, end) in removals {
        out.push_str(&html[copied..start]);
        copied = end;
    }
    out.push_str(&html[copied..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::color::FlagColor;
    use crate::models::flag::NewFlag;

    const RED_MARK: &str = "<mark class=\"textflag-marker\" data-flag-id=\"1\" data-flag-color=\"red\" style=\"background-color: rgba(239, 83, 80, 0.25); border-bottom: 2px solid #ef5350;\">";

    fn flag(id: u64, color: FlagColor, text: &str, start: usize, end: usize) -> Flag {
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
    fn hello_world_wraps_exactly_the_flagged_text() {
        let rendered = render(
            "<p>Hello world</p>",
            &[flag(1, FlagColor::Red, "world", 6, 11)],
        )
        .expect("render");
        assert_eq!(
            rendered.html,
            format!("<p>Hello {}world</mark></p>", RED_MARK)
        );
        assert_eq!(rendered.applied, vec![1]);
        assert!(rendered.skipped.is_empty());
    }

    #[test]
    fn ranges_across_elements_are_wrapped_per_fragment() {
        let content = "<p>Hello <b class=\"x\">big</b> world</p>";
        let rendered =
            render(content, &[flag(2, FlagColor::Green, "o big wo", 4, 12)]).expect("render");

        let html = &rendered.html;
        assert_eq!(html.matches("<mark ").count(), 3);
        assert_eq!(html.matches("</mark>").count(), 3);
        assert!(html.starts_with("<p>Hell<mark "));
        assert!(html.contains("<b class=\"x\"><mark "));
        assert!(html.contains(">big</mark></b><mark "));
        assert!(html.ends_with("> wo</mark>rld</p>"));
        assert_eq!(strip_markers(html).expect("strip"), content);
    }

    #[test]
    fn markers_never_split_character_references() {
        let content = "<p>Fish &amp; chips</p>";
        let rendered = render(content, &[flag(3, FlagColor::Yellow, "& chips", 5, 12)])
            .expect("render");
        assert!(rendered.html.starts_with("<p>Fish <mark "));
        assert!(rendered.html.ends_with(">&amp; chips</mark></p>"));
    }

    #[test]
    fn rendering_is_idempotent_and_preserves_projection() {
        let content = "<h1>Title</h1>\n<p>Some <em>emphasised</em> text &lt;here&gt;.</p>";
        let flags = [
            flag(5, FlagColor::Red, "Some emph", 6, 15),
            flag(4, FlagColor::Green, "Title", 0, 5),
            flag(6, FlagColor::Custom("#123abc".to_string()), "<here>", 27, 33),
        ];
        let first = render(content, &flags).expect("render");
        let second = render(content, &flags).expect("render");
        assert_eq!(first, second);
        assert_eq!(first.applied, vec![4, 5, 6]);

        let original = ContainerTree::parse(content).expect("parse");
        let highlighted = ContainerTree::parse(&first.html).expect("parse");
        assert_eq!(highlighted.plain_text(), original.plain_text());
        assert_eq!(strip_markers(&first.html).expect("strip"), content);
    }

    #[test]
    fn touching_flags_close_before_the_next_opens() {
        let rendered = render(
            "<p>abcdefgh</p>",
            &[
                flag(2, FlagColor::Green, "fgh", 5, 8),
                flag(1, FlagColor::Red, "abcde", 0, 5),
            ],
        )
        .expect("render");
        assert!(rendered.html.contains(">abcde</mark><mark "));
        assert!(rendered.html.ends_with(">fgh</mark></p>"));
    }

    #[test]
    fn stale_flags_are_skipped_and_rendering_continues() {
        let flags = [
            flag(1, FlagColor::Red, "world", 6, 11),
            flag(2, FlagColor::Red, "gone", 20, 24),
            flag(3, FlagColor::Red, "Hallo", 0, 5),
        ];
        let rendered = render("<p>Hello world</p>", &flags).expect("render");
        assert_eq!(rendered.applied, vec![1]);
        let skipped: Vec<u64> = rendered.skipped.iter().map(|s| s.flag_id).collect();
        assert_eq!(skipped, vec![3, 2]);
        assert_eq!(rendered.html.matches("</mark>").count(), 1);
    }

    #[test]
    fn table_structure_whitespace_is_not_wrapped() {
        let content = "<table><tr><td>a</td>\n<td>b</td></tr></table>";
        let rendered =
            render(content, &[flag(1, FlagColor::Red, "a\nb", 0, 3)]).expect("render");
        assert_eq!(rendered.html.matches("<mark ").count(), 2);
        assert!(rendered.html.contains("</mark></td>\n<td>"));
        assert_eq!(strip_markers(&rendered.html).expect("strip"), content);
    }

    #[test]
    fn flags_over_unwrappable_text_only_are_skipped() {
        let content = "<ul>\n<li>item</li></ul>";
        let rendered = render(content, &[flag(9, FlagColor::Red, "\n", 0, 1)]).expect("render");
        assert!(rendered.applied.is_empty());
        assert_eq!(rendered.skipped.len(), 1);
        assert_eq!(rendered.html, content);
    }

    #[test]
    fn strip_markers_keeps_foreign_marks() {
        let content = "<p><mark>keep</mark> me</p>";
        let rendered = render(content, &[flag(1, FlagColor::Red, "me", 5, 7)]).expect("render");
        assert_eq!(
            rendered.html,
            format!("<p><mark>keep</mark> {}me</mark></p>", RED_MARK)
        );
        assert_eq!(strip_markers(&rendered.html).expect("strip"), content);
    }

    #[test]
    fn stray_angle_brackets_are_wrapped_and_restored_verbatim() {
        let content = "<p>if 1 < 2 and 3 > 2</p>";
        let rendered =
            render(content, &[flag(1, FlagColor::Red, "1 < 2", 3, 8)]).expect("render");
        assert_eq!(
            rendered.html,
            format!("<p>if {}1 < 2</mark> and 3 > 2</p>", RED_MARK)
        );
        assert_eq!(strip_markers(&rendered.html).expect("strip"), content);
    }

    #[test]
    fn custom_colors_use_their_own_channels() {
        let custom = flag(7, FlagColor::Custom("#00ff00".to_string()), "x", 0, 1);
        assert_eq!(
            marker_style(&custom),
            "background-color: rgba(0, 255, 0, 0.25); border-bottom: 2px solid #00ff00;"
        );
        assert!(marker_open_tag(&custom).contains("data-flag-color=\"#00ff00\""));
    }
}
