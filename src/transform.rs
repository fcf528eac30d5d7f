//! Atomic edit batches.
//!
//! A [`Transaction`] works on a private copy of the document. Every edit is
//! applied immediately to that copy and recorded in a [`Mapping`], so later
//! edits in the same batch can translate positions taken before earlier
//! edits. Nothing becomes visible until [`Transaction::finish`] validates the
//! result and hands it back to the editor.

use tracing::trace;

use crate::document::{Bias, Node, NodeType, ResolvedPos, Selection, cut_content};
use crate::error::{Result, StepsError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct MapRange {
    start: usize,
    old_size: usize,
    new_size: usize,
}

impl MapRange {
    fn map(&self, pos: usize, bias: Bias) -> usize {
        let end = self.start + self.old_size;
        if pos < self.start {
            return pos;
        }
        if pos > end {
            return pos - self.old_size + self.new_size;
        }
        if self.old_size == 0 {
            return match bias {
                Bias::Backward => self.start,
                Bias::Forward => self.start + self.new_size,
            };
        }
        if pos == self.start {
            self.start
        } else if pos == end {
            self.start + self.new_size
        } else {
            match bias {
                Bias::Backward => self.start,
                Bias::Forward => self.start + self.new_size,
            }
        }
    }
}

/// Position changes made by the edits of one transaction, in order.
#[derive(Clone, Debug, Default)]
pub struct Mapping {
    ranges: Vec<MapRange>,
}

impl Mapping {
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn map(&self, pos: usize, bias: Bias) -> usize {
        self.map_from(0, pos, bias)
    }

    /// Maps a position taken after the first `from` edits through the rest.
    pub fn map_from(&self, from: usize, pos: usize, bias: Bias) -> usize {
        self.ranges
            .iter()
            .skip(from)
            .fold(pos, |pos, range| range.map(pos, bias))
    }

    fn push(&mut self, range: MapRange) {
        self.ranges.push(range);
    }
}

#[derive(Clone, Debug)]
pub struct Transaction {
    doc: Node,
    selection: Selection,
    mapping: Mapping,
}

impl Transaction {
    pub fn new(doc: &Node, selection: Selection) -> Self {
        Self {
            doc: doc.clone(),
            selection,
            mapping: Mapping::default(),
        }
    }

    pub fn doc(&self) -> &Node {
        &self.doc
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn doc_changed(&self) -> bool {
        !self.mapping.is_empty()
    }

    pub fn resolve(&self, pos: usize) -> Result<ResolvedPos<'_>> {
        ResolvedPos::resolve(&self.doc, pos)
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
    }

    /// Replaces `from..to` with `nodes`. Both ends must share a parent; they
    /// may fall inside text runs of a textblock.
    pub fn replace(&mut self, from: usize, to: usize, nodes: Vec<Node>) -> Result<()> {
        if from > to {
            return Err(StepsError::InvalidReplace {
                from,
                to,
                reason: "range is reversed",
            });
        }
        let (indices, start) = {
            let rfrom = self.resolve(from)?;
            let rto = self.resolve(to)?;
            let depth = rfrom.depth();
            if rto.depth() != depth || rto.start(depth) != rfrom.start(depth) {
                return Err(StepsError::InvalidReplace {
                    from,
                    to,
                    reason: "ends lie in different parents",
                });
            }
            let indices = (0..depth).map(|d| rfrom.index(d)).collect::<Vec<_>>();
            (indices, rfrom.start(depth))
        };

        let inserted = nodes.iter().map(Node::node_size).sum::<usize>();
        let parent = self
            .doc
            .descend_mut(&indices)
            .ok_or(StepsError::InvalidReplace {
                from,
                to,
                reason: "parent not found",
            })?;
        let size = parent.content_size();
        let head = cut_content(parent.content(), 0, from - start);
        let tail = cut_content(parent.content(), to - start, size);
        let (Some(mut content), Some(tail)) = (head, tail) else {
            return Err(StepsError::InvalidReplace {
                from,
                to,
                reason: "ends cut through a node",
            });
        };
        content.extend(nodes);
        content.extend(tail);
        *parent = parent.copy_with(content);

        trace!(from, to, inserted, "replace");
        self.record(MapRange {
            start: from,
            old_size: to - from,
            new_size: inserted,
        });
        Ok(())
    }

    pub fn delete(&mut self, from: usize, to: usize) -> Result<()> {
        self.replace(from, to, Vec::new())
    }

    pub fn insert(&mut self, pos: usize, nodes: Vec<Node>) -> Result<()> {
        self.replace(pos, pos, nodes)
    }

    pub fn insert_text(&mut self, pos: usize, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        let parent = self.resolve(pos)?.parent().kind();
        if !parent.is_textblock() {
            return Err(StepsError::InvalidReplace {
                from: pos,
                to: pos,
                reason: "text needs a textblock",
            });
        }
        self.insert(pos, vec![Node::text(text)])
    }

    /// Whether the nodes on both sides of `pos` can merge into one.
    pub fn can_join(&self, pos: usize) -> bool {
        let Ok(resolved) = self.resolve(pos) else {
            return false;
        };
        match (resolved.node_before(), resolved.node_after()) {
            (Some(before), Some(after)) => {
                before.kind() == after.kind() && !before.is_text() && !before.is_textblock()
            }
            _ => false,
        }
    }

    /// Merges the two sibling nodes meeting at `pos`.
    pub fn join(&mut self, pos: usize) -> Result<()> {
        if !self.can_join(pos) {
            return Err(StepsError::InvalidJoin(pos));
        }
        let (indices, index) = {
            let resolved = self.resolve(pos)?;
            let depth = resolved.depth();
            let indices = (0..depth).map(|d| resolved.index(d)).collect::<Vec<_>>();
            (indices, resolved.index(depth))
        };
        let parent = self
            .doc
            .descend_mut(&indices)
            .ok_or(StepsError::InvalidJoin(pos))?;
        let children = parent.content_mut();
        let after = children.remove(index);
        let before = &mut children[index - 1];
        let mut merged = before.content().to_vec();
        merged.extend(after.content().iter().cloned());
        *before = before.copy_with(merged);

        trace!(pos, "join");
        self.record(MapRange {
            start: pos - 1,
            old_size: 2,
            new_size: 0,
        });
        Ok(())
    }

    fn record(&mut self, range: MapRange) {
        self.mapping.push(range);
        self.selection = Selection::range(
            range.map(self.selection.anchor, Bias::Forward),
            range.map(self.selection.head, Bias::Forward),
        );
    }

    /// Validates the edited document and returns it with the final
    /// selection. A document left without blocks gets one empty paragraph.
    pub fn finish(mut self) -> Result<(Node, Selection)> {
        if self.doc.content().is_empty() {
            self.doc
                .content_mut()
                .push(Node::new(NodeType::Paragraph, Vec::new()));
        }
        self.doc.check()?;
        let selection = self.selection.normalized(&self.doc);
        Ok((self.doc, selection))
    }
}
