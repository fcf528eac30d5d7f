use crate::document::{Mark, Node, NodeType};

/// Inline runs of `block` reduced to what a step title accepts: plain text
/// with only the italic mark kept.
pub(crate) fn title_inline_from(block: &Node) -> Vec<Node> {
    let mut runs = Vec::new();
    block.descendants(&mut |node, _| {
        if node.is_text() {
            let marks = node
                .marks()
                .iter()
                .copied()
                .filter(|mark| *mark == Mark::Italic)
                .collect();
            runs.push(Node::styled_text(node.as_text(), marks));
        }
        true
    });
    runs
}

/// Inline runs for a title given as plain text.
pub(crate) fn title_inline_from_text(text: &str) -> Vec<Node> {
    if text.is_empty() {
        Vec::new()
    } else {
        vec![Node::text(text)]
    }
}

/// Heading carrying the title's text, or `None` for an untitled step.
pub(crate) fn title_heading(title: &Node, level: u8) -> Option<Node> {
    if title.text_content().is_empty() {
        return None;
    }
    Some(Node::heading(level, title.content().to_vec()))
}

pub(crate) fn block_has_text(block: &Node) -> bool {
    !block.text_content().is_empty()
}

/// Content blocks worth keeping when the step is dissolved.
pub(crate) fn preserved_content(content: &Node) -> Vec<Node> {
    if content.content().iter().any(block_has_text) {
        content.content().to_vec()
    } else {
        Vec::new()
    }
}

/// Prose a step item turns into: its title as a heading followed by its
/// content blocks, each only when it carries text.
pub(crate) fn step_prose(item: &Node, heading_level: u8) -> Vec<Node> {
    let mut prose = Vec::new();
    if let Some(title) = item.child(0) {
        prose.extend(title_heading(title, heading_level));
    }
    if let Some(content) = item.child(1) {
        prose.extend(preserved_content(content));
    }
    prose
}

/// Exactly one textblock without inline content.
pub(crate) fn content_is_empty(content: &Node) -> bool {
    matches!(content.content(), [only] if only.is_empty_textblock())
}

/// Untitled step whose content is still the initial empty block.
pub(crate) fn step_is_empty(item: &Node) -> bool {
    let title_empty = item
        .child(0)
        .is_some_and(|title| title.text_content().is_empty());
    title_empty && item.child(1).is_some_and(content_is_empty)
}

pub(crate) fn empty_paragraph() -> Node {
    Node::new(NodeType::Paragraph, Vec::new())
}

/// Builds a step item. Missing or empty content becomes one empty paragraph.
pub(crate) fn new_step_item(title: Vec<Node>, content: Vec<Node>) -> Node {
    let content = if content.is_empty() {
        vec![empty_paragraph()]
    } else {
        content
    };
    Node::step_item(Node::step_title(title), Node::step_content(content))
}
