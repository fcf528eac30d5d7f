use super::Node;
use crate::error::{Result, StepsError};

#[derive(Clone, Copy, Debug)]
struct Level<'a> {
    node: &'a Node,
    /// Child index inside `node` that the position points at or into.
    index: usize,
    /// Absolute position where child `index` starts.
    offset: usize,
    /// Absolute position where `node`'s content starts.
    start: usize,
}

/// A document position resolved into its chain of ancestors.
#[derive(Clone, Debug)]
pub struct ResolvedPos<'a> {
    pos: usize,
    path: Vec<Level<'a>>,
    parent_offset: usize,
}

impl<'a> ResolvedPos<'a> {
    pub fn resolve(doc: &'a Node, pos: usize) -> Result<Self> {
        let size = doc.content_size();
        if pos > size {
            return Err(StepsError::PositionOutOfRange { pos, size });
        }

        let mut path = Vec::new();
        let mut node = doc;
        let mut start = 0;
        let mut parent_offset = pos;
        loop {
            let (index, offset) = find_index(node, parent_offset);
            let rem = parent_offset - offset;
            path.push(Level {
                node,
                index,
                offset: start + offset,
                start,
            });
            if rem == 0 {
                break;
            }
            let Some(child) = node.child(index) else {
                break;
            };
            if child.is_text() {
                break;
            }
            node = child;
            parent_offset = rem - 1;
            start += offset + 1;
        }

        Ok(Self {
            pos,
            path,
            parent_offset,
        })
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    pub fn parent(&self) -> &'a Node {
        self.path[self.depth()].node
    }

    pub fn parent_offset(&self) -> usize {
        self.parent_offset
    }

    pub fn node(&self, depth: usize) -> &'a Node {
        self.path[depth.min(self.depth())].node
    }

    pub fn index(&self, depth: usize) -> usize {
        self.path[depth.min(self.depth())].index
    }

    /// Offset into the text node the position points into, zero between nodes.
    pub fn text_offset(&self) -> usize {
        self.pos - self.path[self.depth()].offset
    }

    pub fn index_after(&self, depth: usize) -> usize {
        let depth = depth.min(self.depth());
        let bump = if depth == self.depth() && self.text_offset() == 0 {
            0
        } else {
            1
        };
        self.index(depth) + bump
    }

    pub fn start(&self, depth: usize) -> usize {
        self.path[depth.min(self.depth())].start
    }

    pub fn end(&self, depth: usize) -> usize {
        self.start(depth) + self.node(depth).content_size()
    }

    /// Position directly before the ancestor at `depth`.
    pub fn before(&self, depth: usize) -> Option<usize> {
        if depth == 0 {
            return None;
        }
        if depth == self.depth() + 1 {
            return Some(self.pos);
        }
        self.path.get(depth - 1).map(|level| level.offset)
    }

    /// Position directly after the ancestor at `depth`.
    pub fn after(&self, depth: usize) -> Option<usize> {
        if depth == 0 {
            return None;
        }
        if depth == self.depth() + 1 {
            return Some(self.pos);
        }
        let outer = self.path.get(depth - 1)?;
        let node = self.path.get(depth)?.node;
        Some(outer.offset + node.node_size())
    }

    /// The node directly after the position, when it sits between siblings.
    pub fn node_after(&self) -> Option<&'a Node> {
        if self.text_offset() != 0 {
            return None;
        }
        self.parent().child(self.index(self.depth()))
    }

    /// The node directly before the position, when it sits between siblings.
    pub fn node_before(&self) -> Option<&'a Node> {
        if self.text_offset() != 0 {
            return None;
        }
        let index = self.index(self.depth());
        index.checked_sub(1).and_then(|i| self.parent().child(i))
    }

    /// Ancestors from the innermost outwards, with the depth they live at.
    pub fn ancestors(&self) -> impl Iterator<Item = (usize, &'a Node)> + '_ {
        (0..=self.depth()).rev().map(|depth| (depth, self.path[depth].node))
    }

    /// Range of sibling blocks around `self..other` under the deepest ancestor
    /// accepted by `pred`.
    pub fn block_range<P>(&self, other: &ResolvedPos<'a>, pred: P) -> Option<NodeRange>
    where
        P: Fn(&Node) -> bool,
    {
        if other.pos < self.pos {
            return other.block_range(self, pred);
        }
        let skip_inline = self.parent().is_textblock() || self.pos == other.pos;
        let top = if skip_inline {
            self.depth().checked_sub(1)?
        } else {
            self.depth()
        };
        (0..=top)
            .rev()
            .find(|&depth| other.pos <= self.end(depth) && pred(self.node(depth)))
            .and_then(|depth| NodeRange::new(self, other, depth))
    }
}

fn find_index(node: &Node, pos: usize) -> (usize, usize) {
    if pos == 0 {
        return (0, 0);
    }
    let mut cur = 0;
    for (index, child) in node.content().iter().enumerate() {
        let end = cur + child.node_size();
        if end >= pos {
            if end == pos {
                return (index + 1, end);
            }
            return (index, cur);
        }
        cur = end;
    }
    (node.child_count(), cur)
}

/// A flat run of siblings `start_index..end_index` inside the node at `depth`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeRange {
    pub depth: usize,
    pub start: usize,
    pub end: usize,
    pub start_index: usize,
    pub end_index: usize,
}

impl NodeRange {
    fn new(from: &ResolvedPos<'_>, to: &ResolvedPos<'_>, depth: usize) -> Option<Self> {
        Some(Self {
            depth,
            start: from.before(depth + 1)?,
            end: to.after(depth + 1)?,
            start_index: from.index(depth),
            end_index: to.index_after(depth),
        })
    }
}
