use super::Node;

/// Direction preference when a position has to move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bias {
    Backward,
    Forward,
}

/// A text selection. `anchor` stays put while `head` follows the cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn cursor(pos: usize) -> Self {
        Self {
            anchor: pos,
            head: pos,
        }
    }

    pub fn range(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// Spans the whole document.
    pub fn all(doc: &Node) -> Self {
        Self::range(0, doc.content_size())
    }

    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    pub fn is_all(&self, doc: &Node) -> bool {
        self.from() == 0 && self.to() == doc.content_size()
    }

    /// Cursor at the nearest position inside a textblock, searching in the
    /// `bias` direction first.
    pub fn near(doc: &Node, pos: usize, bias: Bias) -> Self {
        Self::cursor(nearest_text_position(doc, pos, bias))
    }

    /// Moves both ends onto valid text positions. A full-document selection
    /// is kept as is.
    pub fn normalized(self, doc: &Node) -> Self {
        let size = doc.content_size();
        let clamped = Self::range(self.anchor.min(size), self.head.min(size));
        if !clamped.is_empty() && clamped.is_all(doc) {
            return clamped;
        }
        let anchor_bias = if clamped.anchor <= clamped.head {
            Bias::Forward
        } else {
            Bias::Backward
        };
        let head_bias = if clamped.anchor <= clamped.head {
            Bias::Backward
        } else {
            Bias::Forward
        };
        let anchor = nearest_text_position(doc, clamped.anchor, anchor_bias);
        let head = if clamped.is_empty() {
            anchor
        } else {
            nearest_text_position(doc, clamped.head, head_bias)
        };
        Self::range(anchor, head)
    }
}

/// Content ranges `(start, end)` of every textblock, in document order.
pub(crate) fn textblock_ranges(doc: &Node) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    doc.descendants(&mut |node, pos| {
        if node.is_textblock() {
            ranges.push((pos + 1, pos + 1 + node.content_size()));
            return false;
        }
        !node.is_text()
    });
    ranges
}

fn nearest_text_position(doc: &Node, pos: usize, bias: Bias) -> usize {
    let ranges = textblock_ranges(doc);
    if ranges.iter().any(|(start, end)| *start <= pos && pos <= *end) {
        return pos;
    }
    let forward = || ranges.iter().find(|(start, _)| *start >= pos).map(|r| r.0);
    let backward = || ranges.iter().rev().find(|(_, end)| *end <= pos).map(|r| r.1);
    let found = match bias {
        Bias::Forward => forward().or_else(backward),
        Bias::Backward => backward().or_else(forward),
    };
    found.unwrap_or(pos.min(doc.content_size()))
}
