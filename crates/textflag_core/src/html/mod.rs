//! Parsed, immutable view of document markup.
//!
//! [`ContainerTree`] stands in for the rendered container element: a node
//! tree of elements and text nodes built from the document's HTML, plus the
//! plain-text projection (all text nodes concatenated in document order).
//! Every text node remembers where each of its decoded characters starts in
//! the source, so callers can splice markup into the original string without
//! re-serializing anything.

mod entities;

use crate::error::AppError;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;

/// Index of a node inside a [`ContainerTree`].
///
/// Ids are assigned in document order, so iterating ids ascending is an
/// in-order depth-first walk.
pub type NodeId = usize;

/// Elements whose content is never projected into plain text.
const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

/// Elements that never have children or an end tag.
const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// A node in the container tree.
#[derive(Debug, Clone)]
pub struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    subtree_end: NodeId,
    kind: NodeKind,
}

/// What a [`Node`] represents.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Synthetic root standing in for the host container element.
    Container,
    /// An element, by lowercase tag name.
    Element { name: String },
    /// A text run.
    Text(TextNode),
}

/// Decoded text of a text node with its position in the projection.
#[derive(Debug, Clone)]
pub struct TextNode {
    text: String,
    plain_start: usize,
    char_len: usize,
    boundaries: Vec<usize>,
}

impl TextNode {
    /// Decoded text (character references resolved).
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Offset of this node's first char in the plain-text projection.
    pub fn plain_start(&self) -> usize {
        self.plain_start
    }

    /// Length in chars.
    pub fn char_len(&self) -> usize {
        self.char_len
    }

    /// Source byte offset of the char boundary at `offset` (0..=len).
    pub fn source_offset(&self, offset: usize) -> Option<usize> {
        self.boundaries.get(offset).copied()
    }
}

impl Node {
    /// Parent node, `None` for the container root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child node ids in document order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Node kind.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Text payload when this is a text node.
    pub fn as_text(&self) -> Option<&TextNode> {
        match &self.kind {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Lowercase tag name when this is an element.
    pub fn element_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { name } => Some(name.as_str()),
            _ => None,
        }
    }
}

/// Immutable parsed document with its plain-text projection.
#[derive(Debug, Clone)]
pub struct ContainerTree {
    source: String,
    nodes: Vec<Node>,
    text_nodes: Vec<NodeId>,
    plain_text: String,
    plain_len: usize,
}

impl ContainerTree {
    /// Root container id.
    pub const ROOT: NodeId = 0;

    /// Parse `html` into a container tree.
    ///
    /// Parsing is lenient: unclosed elements are closed at end of input and
    /// stray end tags are ignored.
    ///
    /// # Errors
    /// Returns [`AppError::Html`] when the markup cannot be tokenized.
    pub fn parse(html: &str) -> Result<Self, AppError> {
        let mut builder = TreeBuilder::new();

        scan_markup(html, |event| {
            match event {
                Event::Start(tag) => {
                    let name = tag_name(tag);
                    if VOID_ELEMENTS.contains(&name.as_str()) {
                        builder.push_leaf_element(name);
                    } else {
                        builder.open_element(name);
                    }
                }
                Event::Empty(tag) => builder.push_leaf_element(tag_name(tag)),
                Event::End(tag) => builder.close_element(&end_tag_name(tag)),
                Event::Text(text) if !text.is_empty() => {
                    let start = source_offset(html, text).ok_or_else(|| detached_event("text"))?;
                    builder.push_text(&html[start..start + text.len()], start);
                }
                // Comments, doctype, CDATA and processing instructions carry
                // no projected text.
                _ => {}
            }
            Ok(())
        })?;

        Ok(builder.finish(html))
    }

    /// Original markup this tree was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Plain-text projection of the document.
    pub fn plain_text(&self) -> &str {
        &self.plain_text
    }

    /// Length of the plain-text projection in chars.
    pub fn plain_len(&self) -> usize {
        self.plain_len
    }

    /// Look up a node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Whether `id` is a node of this tree.
    pub fn contains(&self, id: NodeId) -> bool {
        id < self.nodes.len()
    }

    /// Number of nodes, including the container root.
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Text node ids in document order.
    pub fn text_nodes(&self) -> &[NodeId] {
        &self.text_nodes
    }

    /// Text payload of node `id`, if it is a text node.
    pub fn text_node(&self, id: NodeId) -> Option<&TextNode> {
        self.node(id).and_then(Node::as_text)
    }

    /// First node id after the subtree rooted at `id`.
    pub fn subtree_end(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).map(|node| node.subtree_end)
    }

    /// Projection offset of the first text at or after node `id`.
    ///
    /// # Returns
    /// The plain-text length when no text node follows `id`.
    pub fn plain_offset_at_or_after(&self, id: NodeId) -> usize {
        let index = self.text_nodes.partition_point(|&text_id| text_id < id);
        self.text_nodes
            .get(index)
            .and_then(|&text_id| self.text_node(text_id))
            .map(TextNode::plain_start)
            .unwrap_or(self.plain_len)
    }

    /// Nearest element ancestor name of node `id`.
    pub fn parent_element_name(&self, id: NodeId) -> Option<&str> {
        let parent = self.node(id)?.parent?;
        self.node(parent)?.element_name()
    }
}

struct TreeBuilder {
    nodes: Vec<Node>,
    open: Vec<NodeId>,
    text_nodes: Vec<NodeId>,
    plain_text: String,
    plain_len: usize,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                subtree_end: 1,
                kind: NodeKind::Container,
            }],
            open: vec![ContainerTree::ROOT],
            text_nodes: Vec::new(),
            plain_text: String::new(),
            plain_len: 0,
        }
    }

    fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or(ContainerTree::ROOT)
    }

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = self.nodes.len();
        let parent = self.current();
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            subtree_end: id + 1,
            kind,
        });
        self.nodes[parent].children.push(id);
        id
    }

    fn open_element(&mut self, name: String) {
        let id = self.push_node(NodeKind::Element { name });
        self.open.push(id);
    }

    fn push_leaf_element(&mut self, name: String) {
        self.push_node(NodeKind::Element { name });
    }

    fn close_element(&mut self, name: &str) {
        // Index 0 is the container root and never matches an end tag.
        let Some(depth) = self.open.iter().rposition(|&id| {
            id != ContainerTree::ROOT && self.nodes[id].element_name() == Some(name)
        }) else {
            tracing::trace!(tag = name, "ignoring unmatched end tag");
            return;
        };
        let end = self.nodes.len();
        for id in self.open.drain(depth..) {
            self.nodes[id].subtree_end = end;
        }
    }

    fn push_text(&mut self, raw: &str, raw_start: usize) {
        let (text, boundaries) = entities::decode_text(raw, raw_start);
        let char_len = boundaries.len() - 1;
        let plain_start = self.plain_len;
        self.plain_text.push_str(&text);
        self.plain_len += char_len;
        let id = self.push_node(NodeKind::Text(TextNode {
            text,
            plain_start,
            char_len,
            boundaries,
        }));
        self.text_nodes.push(id);
    }

    fn finish(mut self, source: &str) -> ContainerTree {
        let end = self.nodes.len();
        for id in self.open.drain(..) {
            self.nodes[id].subtree_end = end;
        }
        ContainerTree {
            source: source.to_string(),
            nodes: self.nodes,
            text_nodes: self.text_nodes,
            plain_text: self.plain_text,
            plain_len: self.plain_len,
        }
    }
}

/// Walk the markup events of `html`, skipping raw-text element bodies.
///
/// Text between tags is handed over verbatim as one [`Event::Text`]; a `<`
/// only opens markup when followed by an ASCII letter, `/`, `!` or `?`, so
/// stray angle brackets stay part of the text. Each tag is read by a fresh
/// reader positioned at its `<`.
///
/// Every event slice handed to `visit` borrows from `html`, so
/// [`source_offset`] can recover its byte position.
pub(crate) fn scan_markup<'h, F>(html: &'h str, mut visit: F) -> Result<(), AppError>
where
    F: FnMut(&Event<'h>) -> Result<(), AppError>,
{
    let mut pos = 0usize;

    while pos < html.len() {
        let tag_start = find_markup_open(html, pos).unwrap_or(html.len());
        if tag_start > pos {
            visit(&Event::Text(BytesText::from_escaped(&html[pos..tag_start])))?;
        }
        if tag_start == html.len() {
            break;
        }

        let mut reader = html_reader(&html[tag_start..]);
        let event = reader.read_event().map_err(|err| {
            AppError::Html(format!(
                "invalid markup near byte {}: {}",
                tag_start + reader.error_position() as usize,
                err
            ))
        })?;
        let consumed = reader.buffer_position() as usize;
        if consumed == 0 || matches!(event, Event::Eof) {
            return Err(AppError::Html(format!(
                "unterminated markup at byte {}",
                tag_start
            )));
        }
        pos = tag_start + consumed;
        visit(&event)?;

        let Event::Start(tag) = &event else {
            continue;
        };
        let name = tag_name(tag);
        if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
            // The body is never tokenized; scanning resumes at the end tag.
            match find_closing_tag(html, pos, &name) {
                Some(close) => pos = close,
                None => return Ok(()),
            }
        }
    }
    Ok(())
}

/// Byte offset of the next `<` at or after `from` that opens markup.
fn find_markup_open(html: &str, from: usize) -> Option<usize> {
    let bytes = html.as_bytes();
    (from..bytes.len()).find(|&idx| {
        bytes[idx] == b'<'
            && bytes
                .get(idx + 1)
                .is_some_and(|next| next.is_ascii_alphabetic() || matches!(next, b'/' | b'!' | b'?'))
    })
}

/// Build a lenient reader over HTML markup.
pub(crate) fn html_reader(input: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(input);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    config.trim_text(false);
    reader
}

pub(crate) fn tag_name(tag: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(tag.name().as_ref()).to_ascii_lowercase()
}

pub(crate) fn end_tag_name(tag: &BytesEnd<'_>) -> String {
    String::from_utf8_lossy(tag.name().as_ref()).to_ascii_lowercase()
}

/// Byte offset of `bytes` inside `source`, when the reader handed back a
/// borrowed slice of the input.
pub(crate) fn source_offset(source: &str, bytes: &[u8]) -> Option<usize> {
    let start = (bytes.as_ptr() as usize).checked_sub(source.as_ptr() as usize)?;
    (start + bytes.len() <= source.len()).then_some(start)
}

fn detached_event(what: &str) -> AppError {
    AppError::Html(format!("{} event is not backed by the source markup", what))
}

/// Byte offset of the `</name` that closes a raw-text element.
fn find_closing_tag(html: &str, from: usize, name: &str) -> Option<usize> {
    let bytes = html.as_bytes();
    let name = name.as_bytes();
    let mut pos = from;
    while pos + 2 + name.len() <= bytes.len() {
        let candidate = &bytes[pos..];
        if candidate.starts_with(b"</") && candidate[2..2 + name.len()].eq_ignore_ascii_case(name)
        {
            return Some(pos);
        }
        pos += 1;
    }
    None
}

#[cfg(test)]
mod tests;
