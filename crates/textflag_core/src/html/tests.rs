//! Container tree parsing tests.

use super::{ContainerTree, NodeId, NodeKind, TextNode};

fn text_of(tree: &ContainerTree, index: usize) -> &str {
    let id = tree.text_nodes()[index];
    tree.text_node(id).expect("text node").text()
}

/// Concatenated text of every text node under `id`.
fn text_content(tree: &ContainerTree, id: NodeId) -> String {
    let end = tree.subtree_end(id).expect("node");
    tree.text_nodes()
        .iter()
        .filter(|&&text_id| text_id > id && text_id < end)
        .filter_map(|&text_id| tree.text_node(text_id))
        .map(TextNode::text)
        .collect()
}

#[test]
fn projection_concatenates_text_nodes_in_document_order() {
    let tree = ContainerTree::parse("<p>Hello <b>big</b> world</p>").expect("parse");
    assert_eq!(tree.plain_text(), "Hello big world");
    assert_eq!(tree.plain_len(), 15);
    assert_eq!(tree.text_nodes().len(), 3);
    assert_eq!(text_of(&tree, 0), "Hello ");
    assert_eq!(text_of(&tree, 1), "big");
    assert_eq!(text_of(&tree, 2), " world");

    let starts: Vec<usize> = tree
        .text_nodes()
        .iter()
        .map(|&id| tree.text_node(id).expect("text").plain_start())
        .collect();
    assert_eq!(starts, vec![0, 6, 9]);
}

#[test]
fn node_ids_follow_document_order_with_parent_links() {
    let tree = ContainerTree::parse("<div><p>a</p><p>b</p></div>").expect("parse");
    let root = tree.node(ContainerTree::ROOT).expect("root");
    assert!(matches!(root.kind(), NodeKind::Container));
    assert_eq!(root.children(), &[1]);

    let div = tree.node(1).expect("div");
    assert_eq!(div.element_name(), Some("div"));
    assert_eq!(div.children(), &[2, 4]);
    assert_eq!(tree.subtree_end(1), Some(6));
    assert_eq!(tree.parent_element_name(3), Some("p"));
    assert_eq!(text_content(&tree, 1), "ab");
}

#[test]
fn whitespace_between_blocks_is_part_of_the_projection() {
    let tree = ContainerTree::parse("<h1>Title</h1>\n<p>Body</p>").expect("parse");
    assert_eq!(tree.plain_text(), "Title\nBody");
}

#[test]
fn entities_decode_and_keep_source_positions() {
    let html = "<p>Fish &amp; chips</p>";
    let tree = ContainerTree::parse(html).expect("parse");
    assert_eq!(tree.plain_text(), "Fish & chips");

    let text = tree.text_node(tree.text_nodes()[0]).expect("text");
    // "c" of "chips" is the 8th char; it starts right after "&amp; ".
    let byte = text.source_offset(7).expect("boundary");
    assert_eq!(&html[byte..byte + 5], "chips");
    assert_eq!(text.source_offset(text.char_len()), Some(html.len() - 4));
}

#[test]
fn void_and_self_closing_elements_have_no_children() {
    let tree = ContainerTree::parse("<p>one<br>two<img src=\"x.png\"/>three</p>").expect("parse");
    assert_eq!(tree.plain_text(), "onetwothree");
    let p = tree.node(1).expect("p");
    assert_eq!(p.children().len(), 5);
}

#[test]
fn script_and_style_bodies_are_skipped() {
    let html = "<style>p { color: red; }</style><p>shown</p><script>if (a < b) { x(); }</script>";
    let tree = ContainerTree::parse(html).expect("parse");
    assert_eq!(tree.plain_text(), "shown");
    assert_eq!(tree.text_nodes().len(), 1);
}

#[test]
fn comments_and_doctype_contribute_no_text() {
    let tree = ContainerTree::parse("<!DOCTYPE html><!-- note --><p>kept</p>").expect("parse");
    assert_eq!(tree.plain_text(), "kept");
}

#[test]
fn stray_end_tags_are_ignored_and_open_elements_closed_at_eof() {
    let tree = ContainerTree::parse("</span><div><p>open").expect("parse");
    assert_eq!(tree.plain_text(), "open");
    assert_eq!(tree.subtree_end(1), Some(tree.len()));
}

#[test]
fn plain_offset_at_or_after_falls_back_to_length() {
    let tree = ContainerTree::parse("<p>ab</p><hr><p>cd</p>").expect("parse");
    // ids: 1 p, 2 "ab", 3 hr, 4 p, 5 "cd"
    assert_eq!(tree.plain_offset_at_or_after(3), 2);
    assert_eq!(tree.plain_offset_at_or_after(6), 4);
}

#[test]
fn empty_markup_yields_an_empty_tree() {
    let tree = ContainerTree::parse("").expect("parse");
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.plain_len(), 0);
}

#[test]
fn stray_angle_brackets_stay_in_the_text() {
    let tree = ContainerTree::parse("<p>1 < 2 and 3 > 2</p>").expect("parse");
    assert_eq!(tree.plain_text(), "1 < 2 and 3 > 2");
    assert_eq!(tree.text_nodes().len(), 1);

    let tree = ContainerTree::parse("<p>a<b>x</b> <3 and a<=b</p><").expect("parse");
    assert_eq!(tree.plain_text(), "ax <3 and a<=b<");
    assert_eq!(text_content(&tree, 1), "ax <3 and a<=b");
    assert_eq!(tree.parent_element_name(tree.text_nodes()[2]), Some("p"));
}

#[test]
fn markup_openers_still_start_tags() {
    let tree =
        ContainerTree::parse("<p>x<!-- c --><?pi?></p><P>y</P><br/>z").expect("parse");
    assert_eq!(tree.plain_text(), "xyz");
    assert_eq!(tree.node(3).and_then(|node| node.element_name()), Some("p"));
}

#[test]
fn legacy_entities_decode_like_a_browser() {
    let html = "<p>a &amp b &lt 3</p>";
    let tree = ContainerTree::parse(html).expect("parse");
    assert_eq!(tree.plain_text(), "a & b < 3");

    let text = tree.text_node(tree.text_nodes()[0]).expect("text");
    let byte = text.source_offset(4).expect("boundary");
    assert_eq!(&html[byte..byte + 1], "b");
}
