use crate::document::{Node, NodeType, ResolvedPos, Selection, textblock_ranges};

/// A node located in the document together with where it starts.
#[derive(Clone, Copy, Debug)]
pub struct FoundNode<'a> {
    /// Position directly before the node.
    pub pos: usize,
    pub depth: usize,
    pub node: &'a Node,
}

/// Structural offsets of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub start: usize,
    pub end: usize,
    pub content_start: usize,
    pub content_end: usize,
}

impl FoundNode<'_> {
    pub fn bounds(&self) -> Bounds {
        bounds_of(self)
    }

    pub fn content_start(&self) -> usize {
        self.pos + 1
    }

    pub fn content_end(&self) -> usize {
        self.pos + 1 + self.node.content_size()
    }

    pub fn end(&self) -> usize {
        self.pos + self.node.node_size()
    }
}

pub fn bounds_of(found: &FoundNode<'_>) -> Bounds {
    Bounds {
        start: found.pos,
        end: found.end(),
        content_start: found.content_start(),
        content_end: found.content_end(),
    }
}

/// Nearest ancestor of `kind` around the selection's start.
pub fn find_ancestor_of_type<'a>(
    doc: &'a Node,
    selection: Selection,
    kind: NodeType,
) -> Option<FoundNode<'a>> {
    find_ancestor_at(doc, selection.from(), kind)
}

pub fn find_ancestor_at(doc: &Node, pos: usize, kind: NodeType) -> Option<FoundNode<'_>> {
    let resolved = ResolvedPos::resolve(doc, pos).ok()?;
    ancestor_in(&resolved, kind)
}

pub(crate) fn ancestor_in<'a>(resolved: &ResolvedPos<'a>, kind: NodeType) -> Option<FoundNode<'a>> {
    resolved
        .ancestors()
        .filter(|(depth, _)| *depth > 0)
        .find(|(_, node)| node.kind() == kind)
        .and_then(|(depth, node)| {
            Some(FoundNode {
                pos: resolved.before(depth)?,
                depth,
                node,
            })
        })
}

/// Children of `parent` with their absolute positions.
pub(crate) fn children_of<'a>(parent: &FoundNode<'a>) -> Vec<FoundNode<'a>> {
    let mut pos = parent.content_start();
    parent
        .node
        .content()
        .iter()
        .map(|node| {
            let found = FoundNode {
                pos,
                depth: parent.depth + 1,
                node,
            };
            pos += node.node_size();
            found
        })
        .collect()
}

/// Index of the child starting at `pos` inside `parent`.
pub(crate) fn child_index_at(parent: &FoundNode<'_>, pos: usize) -> Option<usize> {
    children_of(parent).iter().position(|child| child.pos == pos)
}

/// Title and content of a step item, in that order.
pub(crate) fn step_parts<'a>(item: &FoundNode<'a>) -> Option<(FoundNode<'a>, FoundNode<'a>)> {
    match children_of(item).as_slice() {
        [title, content]
            if title.node.is(NodeType::StepTitle) && content.node.is(NodeType::StepContent) =>
        {
            Some((*title, *content))
        }
        _ => None,
    }
}

/// First cursor position inside `found`.
pub(crate) fn first_text_position(doc: &Node, found: &FoundNode<'_>) -> Option<usize> {
    textblock_ranges(doc)
        .into_iter()
        .find(|(start, end)| *start >= found.pos && *end <= found.end())
        .map(|(start, _)| start)
}

/// Last cursor position inside `found`.
pub(crate) fn last_text_position(doc: &Node, found: &FoundNode<'_>) -> Option<usize> {
    textblock_ranges(doc)
        .into_iter()
        .rev()
        .find(|(start, end)| *start >= found.pos && *end <= found.end())
        .map(|(_, end)| end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Node {
        Node::doc(vec![
            Node::paragraph(vec![Node::text("Intro")]),
            Node::steps(vec![
                Node::step_item(
                    Node::step_title(vec![Node::text("One")]),
                    Node::step_content(vec![Node::paragraph(vec![Node::text("a")])]),
                ),
                Node::step_item(
                    Node::step_title(vec![Node::text("Two")]),
                    Node::step_content(vec![Node::paragraph(vec![Node::text("b")])]),
                ),
            ]),
        ])
    }

    #[test]
    fn finds_enclosing_step_nodes() {
        let doc = doc();
        // p 0..7, steps 7, item 8, title 9, title text 10..13
        let selection = Selection::cursor(11);
        let item = find_ancestor_of_type(&doc, selection, NodeType::StepItem).unwrap();
        assert_eq!(item.pos, 8);
        assert_eq!(item.depth, 2);
        let steps = find_ancestor_of_type(&doc, selection, NodeType::Steps).unwrap();
        assert_eq!(steps.pos, 7);
        let title = find_ancestor_of_type(&doc, selection, NodeType::StepTitle).unwrap();
        assert_eq!(
            title.bounds(),
            Bounds {
                start: 9,
                end: 14,
                content_start: 10,
                content_end: 13,
            }
        );
    }

    #[test]
    fn missing_ancestor_is_none() {
        let doc = doc();
        assert!(find_ancestor_of_type(&doc, Selection::cursor(2), NodeType::Steps).is_none());
        assert!(find_ancestor_at(&doc, 10_000, NodeType::Steps).is_none());
    }

    #[test]
    fn step_parts_and_text_positions() {
        let doc = doc();
        let steps = find_ancestor_at(&doc, 11, NodeType::Steps).unwrap();
        let items = children_of(&steps);
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].pos, 20);
        assert_eq!(child_index_at(&steps, 20), Some(1));

        let (title, content) = step_parts(&items[1]).unwrap();
        assert_eq!(title.pos, 21);
        assert_eq!(content.pos, 26);
        assert_eq!(first_text_position(&doc, &items[1]), Some(22));
        assert_eq!(last_text_position(&doc, &items[1]), Some(29));
    }
}
