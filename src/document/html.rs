//! HTML form of a document.
//!
//! Step nodes carry a `data-type` attribute so they survive a trip through
//! plain HTML: `ol[data-type=steps]`, `li[data-type=step-item]`,
//! `div[data-type=step-title]` and `div[data-type=step-content]`.

use std::collections::BTreeMap;

use scraper::{ElementRef, Html, Node as HtmlNode};
use serde_json::Value;

use super::{Attrs, Mark, Node, NodeType};
use crate::config::StepsOptions;
use crate::error::Result;

const DATA_TYPE: &str = "data-type";
const DATA_PLACEHOLDER: &str = "data-placeholder";

fn data_type(kind: NodeType) -> Option<&'static str> {
    match kind {
        NodeType::Steps => Some("steps"),
        NodeType::StepItem => Some("step-item"),
        NodeType::StepTitle => Some("step-title"),
        NodeType::StepContent => Some("step-content"),
        _ => None,
    }
}

// ============================================================================
// Serialization
// ============================================================================

pub fn to_html(node: &Node, options: &StepsOptions) -> String {
    let mut out = String::new();
    write_node(&mut out, node, options);
    out
}

fn write_node(out: &mut String, node: &Node, options: &StepsOptions) {
    match node.kind() {
        NodeType::Doc => write_children(out, node, options),
        NodeType::Text => write_text(out, node),
        NodeType::Paragraph => write_element(out, "p", &BTreeMap::new(), node, options),
        NodeType::Heading => {
            let tag = format!("h{}", node.heading_level().unwrap_or(1).clamp(1, 6));
            write_element(out, &tag, &BTreeMap::new(), node, options);
        }
        NodeType::Blockquote => write_element(out, "blockquote", &BTreeMap::new(), node, options),
        NodeType::BulletList => write_element(out, "ul", &BTreeMap::new(), node, options),
        NodeType::OrderedList => write_element(out, "ol", &BTreeMap::new(), node, options),
        NodeType::ListItem => write_element(out, "li", &BTreeMap::new(), node, options),
        NodeType::CodeBlock => {
            out.push_str("<pre><code>");
            escape_into(out, &node.text_content(), false);
            out.push_str("</code></pre>");
        }
        NodeType::Steps => write_element(out, "ol", &step_attributes(node, options), node, options),
        NodeType::StepItem => write_element(out, "li", &step_attributes(node, options), node, options),
        NodeType::StepTitle | NodeType::StepContent => {
            write_element(out, "div", &step_attributes(node, options), node, options);
        }
    }
}

fn write_element(
    out: &mut String,
    tag: &str,
    attributes: &BTreeMap<String, String>,
    node: &Node,
    options: &StepsOptions,
) {
    out.push('<');
    out.push_str(tag);
    for (name, value) in attributes {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_into(out, value, true);
        out.push('"');
    }
    out.push('>');
    write_children(out, node, options);
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn write_children(out: &mut String, node: &Node, options: &StepsOptions) {
    for child in node.content() {
        write_node(out, child, options);
    }
}

fn mark_tag(mark: Mark) -> &'static str {
    match mark {
        Mark::Bold => "strong",
        Mark::Italic => "em",
        Mark::Underline => "u",
        Mark::Strike => "s",
        Mark::Code => "code",
    }
}

fn write_text(out: &mut String, node: &Node) {
    for mark in node.marks() {
        out.push('<');
        out.push_str(mark_tag(*mark));
        out.push('>');
    }
    escape_into(out, node.as_text(), false);
    for mark in node.marks().iter().rev() {
        out.push_str("</");
        out.push_str(mark_tag(*mark));
        out.push('>');
    }
}

/// `data-type`, then configured attributes, then the placeholder of an empty
/// node, then the node's own attributes. Later entries win.
fn step_attributes(node: &Node, options: &StepsOptions) -> BTreeMap<String, String> {
    let mut attributes = BTreeMap::new();
    if let Some(data_type) = data_type(node.kind()) {
        attributes.insert(DATA_TYPE.to_string(), data_type.to_string());
    }
    if let Some(configured) = options.html_attributes_for(node.kind()) {
        attributes.extend(configured.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    let is_empty = match node.kind() {
        NodeType::StepTitle => node.content().is_empty(),
        NodeType::StepContent => {
            matches!(node.content(), [only] if only.is_empty_textblock())
        }
        _ => false,
    };
    if is_empty && let Some(placeholder) = options.placeholder_for(node.kind()) {
        attributes.insert(DATA_PLACEHOLDER.to_string(), placeholder.to_string());
    }
    for (name, value) in node.attrs() {
        let value = match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        attributes.insert(name.clone(), value);
    }
    attributes
}

fn escape_into(out: &mut String, text: &str, attribute: bool) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Parses an HTML fragment into a validated document. Step nodes missing a
/// required child get an empty one; step lists outside the top level become
/// ordered lists.
pub fn from_html(input: &str) -> Result<Node> {
    from_html_with(input, &StepsOptions::default())
}

/// Like [`from_html`], but step attributes equal to the ones `options`
/// configures are dropped, since serialization adds them back.
pub fn from_html_with(input: &str, options: &StepsOptions) -> Result<Node> {
    let fragment = Html::parse_fragment(input);
    let mut doc = Node::doc(blocks_of(fragment.root_element(), true));
    strip_configured(&mut doc, options);
    doc.check()?;
    Ok(doc)
}

fn strip_configured(node: &mut Node, options: &StepsOptions) {
    if data_type(node.kind).is_some()
        && let Some(configured) = options.html_attributes_for(node.kind)
    {
        node.attrs.retain(|name, value| {
            configured
                .get(name)
                .is_none_or(|configured| value.as_str() != Some(configured.as_str()))
        });
    }
    for child in &mut node.content {
        strip_configured(child, options);
    }
}

fn is_block_tag(name: &str) -> bool {
    matches!(
        name,
        "p" | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "blockquote"
            | "ul"
            | "ol"
            | "li"
            | "pre"
            | "div"
            | "section"
            | "article"
            | "main"
            | "header"
            | "footer"
            | "body"
            | "html"
    )
}

fn blocks_of(element: ElementRef<'_>, top_level: bool) -> Vec<Node> {
    let mut blocks = Vec::new();
    let mut pending = Vec::new();
    for child in element.children() {
        match child.value() {
            HtmlNode::Text(text) => {
                if !text.trim().is_empty() {
                    pending.push(Node::text(text));
                }
            }
            HtmlNode::Element(_) => {
                let Some(el) = ElementRef::wrap(child) else {
                    continue;
                };
                if is_block_tag(el.value().name()) {
                    flush_inline(&mut pending, &mut blocks);
                    blocks.extend(block_from(el, top_level));
                } else {
                    collect_element(el, &[], &mut pending);
                }
            }
            _ => {}
        }
    }
    flush_inline(&mut pending, &mut blocks);
    blocks
}

fn flush_inline(pending: &mut Vec<Node>, blocks: &mut Vec<Node>) {
    if pending.is_empty() {
        return;
    }
    blocks.push(Node::paragraph(std::mem::take(pending)));
}

fn block_from(el: ElementRef<'_>, top_level: bool) -> Vec<Node> {
    let name = el.value().name();
    if let Some(level) = heading_level(name) {
        return vec![Node::heading(level, inline_of(el, NodeType::Heading))];
    }
    match name {
        "p" => vec![Node::paragraph(inline_of(el, NodeType::Paragraph))],
        "blockquote" => vec![Node::blockquote(or_empty_paragraph(blocks_of(el, false)))],
        "ul" => list_from(el, NodeType::BulletList).into_iter().collect(),
        "ol" if el.value().attr(DATA_TYPE) == Some("steps") => {
            if top_level {
                steps_from(el).into_iter().collect()
            } else {
                nested_steps_from(el).into_iter().collect()
            }
        }
        "ol" => list_from(el, NodeType::OrderedList).into_iter().collect(),
        "pre" => vec![Node::code_block(&el.text().collect::<String>())],
        _ => blocks_of(el, top_level),
    }
}

fn heading_level(name: &str) -> Option<u8> {
    name.strip_prefix('h')
        .and_then(|level| level.parse::<u8>().ok())
        .filter(|level| (1..=6).contains(level))
}

fn or_empty_paragraph(blocks: Vec<Node>) -> Vec<Node> {
    if blocks.is_empty() {
        vec![Node::paragraph(Vec::new())]
    } else {
        blocks
    }
}

fn child_elements<'a>(el: ElementRef<'a>, tag: &'a str) -> impl Iterator<Item = ElementRef<'a>> {
    el.children()
        .filter_map(ElementRef::wrap)
        .filter(move |child| child.value().name() == tag)
}

fn list_from(el: ElementRef<'_>, kind: NodeType) -> Option<Node> {
    let items = child_elements(el, "li")
        .map(|li| Node::list_item(or_empty_paragraph(blocks_of(li, false))))
        .collect::<Vec<_>>();
    if items.is_empty() {
        return None;
    }
    Some(Node::new(kind, items))
}

fn steps_from(el: ElementRef<'_>) -> Option<Node> {
    let items = child_elements(el, "li").map(step_item_from).collect::<Vec<_>>();
    if items.is_empty() {
        return None;
    }
    Some(Node::steps(items).with_attrs(kept_attributes(el)))
}

fn step_item_from(li: ElementRef<'_>) -> Node {
    let mut title = None;
    let mut content = None;
    for child in li.children().filter_map(ElementRef::wrap) {
        match child.value().attr(DATA_TYPE) {
            Some("step-title") if title.is_none() => {
                title = Some(
                    Node::step_title(inline_of(child, NodeType::StepTitle))
                        .with_attrs(kept_attributes(child)),
                );
            }
            Some("step-content") if content.is_none() => {
                content = Some(
                    Node::step_content(or_empty_paragraph(blocks_of(child, false)))
                        .with_attrs(kept_attributes(child)),
                );
            }
            _ => {}
        }
    }
    if title.is_none() && content.is_none() {
        content = Some(Node::step_content(or_empty_paragraph(blocks_of(li, false))));
    }
    let title = title.unwrap_or_else(|| Node::step_title(Vec::new()));
    let content =
        content.unwrap_or_else(|| Node::step_content(vec![Node::paragraph(Vec::new())]));
    Node::step_item(title, content).with_attrs(kept_attributes(li))
}

/// A step list where steps may not appear: each step becomes a list item
/// holding its title as a paragraph followed by its body.
fn nested_steps_from(el: ElementRef<'_>) -> Option<Node> {
    let items = child_elements(el, "li")
        .map(|li| {
            let step = step_item_from(li);
            let mut blocks = Vec::new();
            if let Some(title) = step.child(0).filter(|title| title.child_count() > 0) {
                blocks.push(Node::paragraph(title.content().to_vec()));
            }
            if let Some(content) = step.child(1) {
                blocks.extend(content.content().iter().cloned());
            }
            Node::list_item(blocks)
        })
        .collect::<Vec<_>>();
    if items.is_empty() {
        return None;
    }
    Some(Node::ordered_list(items))
}

/// Attributes of a step element other than the ones the serializer derives.
fn kept_attributes(el: ElementRef<'_>) -> Attrs {
    el.value()
        .attrs()
        .filter(|(name, _)| *name != DATA_TYPE && *name != DATA_PLACEHOLDER)
        .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
        .collect()
}

fn mark_for(tag: &str) -> Option<Mark> {
    match tag {
        "strong" | "b" => Some(Mark::Bold),
        "em" | "i" => Some(Mark::Italic),
        "u" => Some(Mark::Underline),
        "s" | "strike" | "del" => Some(Mark::Strike),
        "code" => Some(Mark::Code),
        _ => None,
    }
}

/// Inline content of `el`, keeping only the marks `parent` allows.
fn inline_of(el: ElementRef<'_>, parent: NodeType) -> Vec<Node> {
    let mut runs = Vec::new();
    collect_children(el, &[], &mut runs);
    runs.into_iter()
        .map(|run| {
            let marks = run
                .marks()
                .iter()
                .copied()
                .filter(|mark| parent.allows_mark(*mark))
                .collect();
            Node::styled_text(run.as_text(), marks)
        })
        .collect()
}

fn collect_children(el: ElementRef<'_>, marks: &[Mark], out: &mut Vec<Node>) {
    for child in el.children() {
        match child.value() {
            HtmlNode::Text(text) => {
                if !(text.trim().is_empty() && text.contains('\n')) {
                    out.push(Node::styled_text(text, marks.to_vec()));
                }
            }
            HtmlNode::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_element(child, marks, out);
                }
            }
            _ => {}
        }
    }
}

fn collect_element(el: ElementRef<'_>, marks: &[Mark], out: &mut Vec<Node>) {
    let mut marks = marks.to_vec();
    marks.extend(mark_for(el.value().name()));
    collect_children(el, &marks, out);
}
