//! Conversion between [`Node`] trees and `tdoc` documents, which is how FTML
//! and Markdown files are read and written.
//!
//! `tdoc` has no step lists. On export a step list becomes an ordered list
//! whose entries hold the title as a paragraph followed by the step body, so
//! reading the file back yields plain prose.

use std::io::Cursor;

use tdoc::{ChecklistItem, Document, InlineStyle, Paragraph, Span, markdown, writer::Writer};

use super::{Mark, Node, NodeType};
use crate::error::{Result, StepsError};

// ============================================================================
// tdoc -> Node
// ============================================================================

pub fn from_tdoc(document: &Document) -> Node {
    Node::doc(document.paragraphs.iter().flat_map(block_from).collect())
}

fn block_from(paragraph: &Paragraph) -> Option<Node> {
    let node = match paragraph {
        Paragraph::Text { content } => Node::paragraph(inline_from(content)),
        Paragraph::Header1 { content } => Node::heading(1, inline_from(content)),
        Paragraph::Header2 { content } => Node::heading(2, inline_from(content)),
        Paragraph::Header3 { content } => Node::heading(3, inline_from(content)),
        Paragraph::CodeBlock { content } => Node::code_block(&plain_text(content)),
        Paragraph::Quote { children } => Node::blockquote(blocks_from(children)),
        Paragraph::OrderedList { entries } => {
            if entries.is_empty() {
                return None;
            }
            Node::ordered_list(entries.iter().map(|entry| Node::list_item(blocks_from(entry))).collect())
        }
        Paragraph::UnorderedList { entries } => {
            if entries.is_empty() {
                return None;
            }
            Node::bullet_list(entries.iter().map(|entry| Node::list_item(blocks_from(entry))).collect())
        }
        Paragraph::Checklist { items } => {
            if items.is_empty() {
                return None;
            }
            Node::bullet_list(items.iter().map(checklist_entry).collect())
        }
    };
    Some(node)
}

/// Checked state has no counterpart; the item keeps its text and children.
fn checklist_entry(item: &ChecklistItem) -> Node {
    let mut blocks = vec![Node::paragraph(inline_from(&item.content))];
    if !item.children.is_empty() {
        blocks.push(Node::bullet_list(item.children.iter().map(checklist_entry).collect()));
    }
    Node::list_item(blocks)
}

fn blocks_from(paragraphs: &[Paragraph]) -> Vec<Node> {
    let blocks = paragraphs.iter().flat_map(block_from).collect::<Vec<_>>();
    if blocks.is_empty() {
        vec![Node::paragraph(Vec::new())]
    } else {
        blocks
    }
}

fn mark_from(style: InlineStyle) -> Option<Mark> {
    match style {
        InlineStyle::Bold => Some(Mark::Bold),
        InlineStyle::Italic => Some(Mark::Italic),
        InlineStyle::Underline => Some(Mark::Underline),
        InlineStyle::Strike => Some(Mark::Strike),
        InlineStyle::Code => Some(Mark::Code),
        InlineStyle::None | InlineStyle::Highlight | InlineStyle::Link => None,
    }
}

fn inline_from(spans: &[Span]) -> Vec<Node> {
    let mut runs = Vec::new();
    for span in spans {
        collect_span(span, &[], &mut runs);
    }
    runs
}

fn collect_span(span: &Span, marks: &[Mark], out: &mut Vec<Node>) {
    let mut marks = marks.to_vec();
    marks.extend(mark_from(span.style));
    if !span.text.is_empty() {
        out.push(Node::styled_text(&span.text, marks.clone()));
    }
    for child in &span.children {
        collect_span(child, &marks, out);
    }
}

fn plain_text(spans: &[Span]) -> String {
    spans
        .iter()
        .map(|span| format!("{}{}", span.text, plain_text(&span.children)))
        .collect()
}

// ============================================================================
// Node -> tdoc
// ============================================================================

pub fn to_tdoc(node: &Node) -> Document {
    Document::new().with_paragraphs(node.content().iter().map(paragraph_from).collect())
}

fn paragraph_from(node: &Node) -> Paragraph {
    match node.kind() {
        NodeType::Heading => {
            let content = spans_from(node.content());
            match node.heading_level().unwrap_or(1) {
                1 => Paragraph::Header1 { content },
                2 => Paragraph::Header2 { content },
                _ => Paragraph::Header3 { content },
            }
        }
        NodeType::CodeBlock => Paragraph::CodeBlock {
            content: vec![Span::new_text(&node.text_content())],
        },
        NodeType::Blockquote => Paragraph::Quote {
            children: node.content().iter().map(paragraph_from).collect(),
        },
        NodeType::BulletList => Paragraph::UnorderedList {
            entries: node.content().iter().map(entry_from).collect(),
        },
        NodeType::OrderedList => Paragraph::OrderedList {
            entries: node.content().iter().map(entry_from).collect(),
        },
        NodeType::Steps => Paragraph::OrderedList {
            entries: node.content().iter().map(step_entry).collect(),
        },
        _ => Paragraph::Text {
            content: spans_from(node.content()),
        },
    }
}

fn entry_from(item: &Node) -> Vec<Paragraph> {
    item.content().iter().map(paragraph_from).collect()
}

fn step_entry(item: &Node) -> Vec<Paragraph> {
    let mut entry = Vec::new();
    if let Some(title) = item.child(0).filter(|title| title.child_count() > 0) {
        entry.push(Paragraph::Text {
            content: spans_from(title.content()),
        });
    }
    if let Some(content) = item.child(1) {
        entry.extend(content.content().iter().map(paragraph_from));
    }
    entry
}

fn style_for(mark: Mark) -> InlineStyle {
    match mark {
        Mark::Bold => InlineStyle::Bold,
        Mark::Italic => InlineStyle::Italic,
        Mark::Underline => InlineStyle::Underline,
        Mark::Strike => InlineStyle::Strike,
        Mark::Code => InlineStyle::Code,
    }
}

fn spans_from(runs: &[Node]) -> Vec<Span> {
    runs.iter()
        .filter(|run| run.is_text())
        .map(|run| {
            run.marks()
                .iter()
                .rev()
                .fold(None, |inner: Option<Span>, mark| {
                    let styled = Span::new_styled(style_for(*mark));
                    Some(match inner {
                        Some(inner) => styled.with_children(vec![inner]),
                        None => styled.with_text(run.as_text()),
                    })
                })
                .unwrap_or_else(|| Span::new_text(run.as_text()))
        })
        .collect()
}

// ============================================================================
// Files
// ============================================================================

fn checked(node: Node) -> Result<Node> {
    node.check()?;
    Ok(node)
}

pub fn parse_ftml(input: &str) -> Result<Node> {
    let document =
        tdoc::parse(Cursor::new(input.to_string())).map_err(|err| StepsError::Parse(err.to_string()))?;
    checked(from_tdoc(&document))
}

pub fn parse_markdown(input: &str) -> Result<Node> {
    let document = markdown::parse(Cursor::new(input.to_string()))
        .map_err(|err| StepsError::Parse(err.to_string()))?;
    checked(from_tdoc(&document))
}

pub fn write_ftml(node: &Node) -> Result<String> {
    Writer::new()
        .write_to_string(&to_tdoc(node))
        .map_err(|err| StepsError::Parse(err.to_string()))
}

pub fn write_markdown(node: &Node) -> Result<String> {
    let mut contents = Vec::new();
    markdown::write(&mut contents, &to_tdoc(node)).map_err(|err| StepsError::Parse(err.to_string()))?;
    String::from_utf8(contents).map_err(|err| StepsError::Parse(err.to_string()))
}
