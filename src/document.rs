//! Tree-structured document model.
//!
//! Every node except text occupies an opening token, its content and a
//! closing token in the flattened position space; a text node occupies one
//! position per character. The root `doc` node contributes no tokens, so
//! document positions run from `0` to [`Node::content_size`].

use std::collections::BTreeMap;

use serde_json::Value;

mod schema;
mod position;
mod selection;

pub mod bridge;
pub mod html;
pub mod json;

pub use position::{NodeRange, ResolvedPos};
pub use schema::{Mark, NodeType, SchemaError};
pub use selection::{Bias, Selection};
pub(crate) use selection::textblock_ranges;

pub type Attrs = BTreeMap<String, Value>;

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    kind: NodeType,
    attrs: Attrs,
    content: Vec<Node>,
    text: String,
    marks: Vec<Mark>,
}

impl Node {
    pub fn new(kind: NodeType, content: Vec<Node>) -> Self {
        let content = if kind.is_textblock() {
            normalize_inline(content)
        } else {
            content
        };
        Self {
            kind,
            attrs: Attrs::new(),
            content,
            text: String::new(),
            marks: Vec::new(),
        }
    }

    pub fn doc(blocks: Vec<Node>) -> Self {
        Self::new(NodeType::Doc, blocks)
    }

    pub fn paragraph(inline: Vec<Node>) -> Self {
        Self::new(NodeType::Paragraph, inline)
    }

    pub fn heading(level: u8, inline: Vec<Node>) -> Self {
        Self::new(NodeType::Heading, inline).with_attr("level", Value::from(level))
    }

    pub fn code_block(text: &str) -> Self {
        let content = if text.is_empty() {
            Vec::new()
        } else {
            vec![Node::text(text)]
        };
        Self::new(NodeType::CodeBlock, content)
    }

    pub fn blockquote(blocks: Vec<Node>) -> Self {
        Self::new(NodeType::Blockquote, blocks)
    }

    pub fn bullet_list(items: Vec<Node>) -> Self {
        Self::new(NodeType::BulletList, items)
    }

    pub fn ordered_list(items: Vec<Node>) -> Self {
        Self::new(NodeType::OrderedList, items)
    }

    pub fn list_item(blocks: Vec<Node>) -> Self {
        Self::new(NodeType::ListItem, blocks)
    }

    pub fn steps(items: Vec<Node>) -> Self {
        Self::new(NodeType::Steps, items)
    }

    pub fn step_item(title: Node, content: Node) -> Self {
        Self::new(NodeType::StepItem, vec![title, content])
    }

    pub fn step_title(inline: Vec<Node>) -> Self {
        Self::new(NodeType::StepTitle, inline)
    }

    pub fn step_content(blocks: Vec<Node>) -> Self {
        Self::new(NodeType::StepContent, blocks)
    }

    pub fn text(text: &str) -> Self {
        Self::styled_text(text, Vec::new())
    }

    pub fn styled_text(text: &str, mut marks: Vec<Mark>) -> Self {
        marks.sort();
        marks.dedup();
        Self {
            kind: NodeType::Text,
            attrs: Attrs::new(),
            content: Vec::new(),
            text: text.to_string(),
            marks,
        }
    }

    pub fn with_attr(mut self, key: &str, value: Value) -> Self {
        self.attrs.insert(key.to_string(), value);
        self
    }

    pub fn with_attrs(mut self, attrs: Attrs) -> Self {
        self.attrs = attrs;
        self
    }

    /// Same type and attributes, different children.
    pub fn copy_with(&self, content: Vec<Node>) -> Self {
        let content = if self.kind.is_textblock() {
            normalize_inline(content)
        } else {
            content
        };
        Self {
            kind: self.kind,
            attrs: self.attrs.clone(),
            content,
            text: String::new(),
            marks: Vec::new(),
        }
    }

    pub fn kind(&self) -> NodeType {
        self.kind
    }

    pub fn is(&self, kind: NodeType) -> bool {
        self.kind == kind
    }

    pub fn is_text(&self) -> bool {
        self.kind.is_text()
    }

    pub fn is_textblock(&self) -> bool {
        self.kind.is_textblock()
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    pub fn heading_level(&self) -> Option<u8> {
        if self.kind != NodeType::Heading {
            return None;
        }
        self.attr("level")
            .and_then(Value::as_u64)
            .and_then(|level| u8::try_from(level).ok())
    }

    pub fn content(&self) -> &[Node] {
        &self.content
    }

    pub(crate) fn content_mut(&mut self) -> &mut Vec<Node> {
        &mut self.content
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.content.get(index)
    }

    pub fn child_count(&self) -> usize {
        self.content.len()
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.content.first()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.content.last()
    }

    /// Raw text of a text node; empty for every other node.
    pub fn as_text(&self) -> &str {
        &self.text
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn content_size(&self) -> usize {
        self.content.iter().map(Node::node_size).sum()
    }

    pub fn node_size(&self) -> usize {
        if self.is_text() {
            self.char_len()
        } else {
            self.content_size() + 2
        }
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        if self.is_text() {
            return self.text.clone();
        }
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.content {
            if child.is_text() {
                out.push_str(&child.text);
            } else {
                child.collect_text(out);
            }
        }
    }

    /// Textblock without inline content.
    pub fn is_empty_textblock(&self) -> bool {
        self.is_textblock() && self.content.is_empty()
    }

    /// Offset of child `index` relative to the start of this node's content.
    pub fn child_offset(&self, index: usize) -> usize {
        self.content[..index.min(self.content.len())]
            .iter()
            .map(Node::node_size)
            .sum()
    }

    /// Visits every descendant with its position relative to this node's
    /// content start. Returning `false` skips the descendant's children.
    pub fn descendants<F>(&self, f: &mut F)
    where
        F: FnMut(&Node, usize) -> bool,
    {
        self.walk(0, f);
    }

    fn walk<F>(&self, base: usize, f: &mut F)
    where
        F: FnMut(&Node, usize) -> bool,
    {
        let mut pos = base;
        for child in &self.content {
            if f(child, pos) && !child.is_text() {
                child.walk(pos + 1, f);
            }
            pos += child.node_size();
        }
    }

    /// All descendants of `kind` with their positions.
    pub fn find_all(&self, kind: NodeType) -> Vec<(usize, &Node)> {
        let mut found = Vec::new();
        self.find_into(0, kind, &mut found);
        found
    }

    fn find_into<'a>(&'a self, base: usize, kind: NodeType, found: &mut Vec<(usize, &'a Node)>) {
        let mut pos = base;
        for child in &self.content {
            if child.kind == kind {
                found.push((pos, child));
            }
            if !child.is_text() {
                child.find_into(pos + 1, kind, found);
            }
            pos += child.node_size();
        }
    }

    /// The node that starts exactly at `pos`, if any.
    pub fn node_at(&self, pos: usize) -> Option<&Node> {
        let mut node = self;
        let mut pos = pos;
        loop {
            let mut offset = 0;
            let mut next = None;
            for child in &node.content {
                let end = offset + child.node_size();
                if pos < end {
                    next = Some((child, offset));
                    break;
                }
                offset = end;
            }
            let (child, offset) = next?;
            if offset == pos || child.is_text() {
                return Some(child);
            }
            node = child;
            pos -= offset + 1;
        }
    }

    /// Validates this node and all descendants against the schema.
    pub fn check(&self) -> Result<(), SchemaError> {
        if self.is_text() {
            return if self.text.is_empty() {
                Err(SchemaError::EmptyText)
            } else {
                Ok(())
            };
        }
        if self.kind == NodeType::Heading {
            let level = self.attr("level").and_then(Value::as_u64).unwrap_or(0);
            if !(1..=6).contains(&level) {
                return Err(SchemaError::InvalidHeadingLevel(level));
            }
        }
        self.kind.check_content(&self.content)?;
        self.content.iter().try_for_each(Node::check)
    }

    /// Index path of node references from this node down to the given child
    /// path; used by the transaction to reach the node it rewrites.
    pub(crate) fn descend_mut(&mut self, indices: &[usize]) -> Option<&mut Node> {
        let mut node = self;
        for &index in indices {
            node = node.content.get_mut(index)?;
        }
        Some(node)
    }
}

/// Merges adjacent text runs with identical marks and drops empty runs.
pub fn normalize_inline(nodes: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if node.is_text() && node.text.is_empty() {
            continue;
        }
        if let Some(last) = out.last_mut()
            && last.is_text()
            && node.is_text()
            && last.marks == node.marks
        {
            last.text.push_str(&node.text);
            continue;
        }
        out.push(node);
    }
    out
}

/// Takes the part of `content` between the content-relative offsets `from`
/// and `to`. Offsets may fall inside text runs but must otherwise lie on child
/// boundaries.
pub(crate) fn cut_content(content: &[Node], from: usize, to: usize) -> Option<Vec<Node>> {
    let mut out = Vec::new();
    let mut pos = 0;
    for child in content {
        let size = child.node_size();
        let end = pos + size;
        if end <= from || pos >= to {
            pos = end;
            continue;
        }
        if pos >= from && end <= to {
            out.push(child.clone());
        } else if child.is_text() {
            let start = from.saturating_sub(pos);
            let stop = to.min(end) - pos;
            let text = child.text.chars().skip(start).take(stop - start).collect::<String>();
            out.push(Node::styled_text(&text, child.marks.clone()));
        } else {
            return None;
        }
        pos = end;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        Node::doc(vec![
            Node::paragraph(vec![Node::text("Intro")]),
            Node::steps(vec![Node::step_item(
                Node::step_title(vec![Node::text("One")]),
                Node::step_content(vec![Node::paragraph(vec![Node::text("Body")])]),
            )]),
        ])
    }

    #[test]
    fn sizes_follow_token_counting() {
        let doc = sample();
        // p: 5 + 2, title: 3 + 2, content: (4 + 2) + 2, item: 13 + 2, steps: 15 + 2
        assert_eq!(doc.child(0).map(Node::node_size), Some(7));
        assert_eq!(doc.child(1).map(Node::node_size), Some(17));
        assert_eq!(doc.content_size(), 24);
    }

    #[test]
    fn node_at_finds_nested_nodes() {
        let doc = sample();
        assert_eq!(doc.node_at(0).map(Node::kind), Some(NodeType::Paragraph));
        assert_eq!(doc.node_at(7).map(Node::kind), Some(NodeType::Steps));
        assert_eq!(doc.node_at(8).map(Node::kind), Some(NodeType::StepItem));
        assert_eq!(doc.node_at(9).map(Node::kind), Some(NodeType::StepTitle));
        assert_eq!(doc.node_at(14).map(Node::kind), Some(NodeType::StepContent));
        assert_eq!(doc.node_at(24), None);
    }

    #[test]
    fn find_all_reports_positions() {
        let doc = sample();
        let titles = doc.find_all(NodeType::StepTitle);
        assert_eq!(titles.len(), 1);
        assert_eq!(titles[0].0, 9);
        assert_eq!(titles[0].1.text_content(), "One");
    }

    #[test]
    fn normalize_merges_equal_runs() {
        let merged = normalize_inline(vec![
            Node::text("a"),
            Node::text(""),
            Node::text("b"),
            Node::styled_text("c", vec![Mark::Italic]),
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].as_text(), "ab");
    }

    #[test]
    fn cut_splits_text_runs() {
        let content = vec![Node::text("Step "), Node::styled_text("Title", vec![Mark::Italic])];
        let tail = cut_content(&content, 3, 10).unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].as_text(), "p ");
        assert_eq!(tail[1].as_text(), "Title");
    }

    #[test]
    fn check_rejects_malformed_step_items() {
        let bad = Node::doc(vec![Node::steps(vec![Node::new(
            NodeType::StepItem,
            vec![Node::step_title(vec![])],
        )])]);
        assert!(bad.check().is_err());
        assert!(sample().check().is_ok());
    }
}
