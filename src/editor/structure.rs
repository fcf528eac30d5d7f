use std::ops::Range;

use tracing::trace;

use super::content::{new_step_item, step_prose, title_inline_from_text};
use super::inspect::{ancestor_in, child_index_at, find_ancestor_at};
use crate::config::StepsOptions;
use crate::document::{Bias, Node, NodeType, Selection};
use crate::error::{Result, StepsError};
use crate::transform::Transaction;

/// Arguments of [`DocumentEditor::insert_step`](crate::editor::DocumentEditor::insert_step).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InsertStepOptions {
    /// Plain-text title; absent or empty leaves the title empty.
    pub title: Option<String>,
    /// Blocks for the step body; absent or empty yields one empty paragraph.
    pub content: Option<Vec<Node>>,
    /// Insert before the current step instead of after it.
    pub before: bool,
}

impl InsertStepOptions {
    pub fn before() -> Self {
        Self {
            before: true,
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn with_content(mut self, content: Vec<Node>) -> Self {
        self.content = Some(content);
        self
    }
}

/// A step about to be written into the document.
#[derive(Clone, Debug, Default)]
pub(crate) struct StepDraft {
    pub title: Vec<Node>,
    pub content: Vec<Node>,
    pub before: bool,
}

impl From<&InsertStepOptions> for StepDraft {
    fn from(options: &InsertStepOptions) -> Self {
        Self {
            title: title_inline_from_text(options.title.as_deref().unwrap_or_default()),
            content: options.content.clone().unwrap_or_default(),
            before: options.before,
        }
    }
}

// ============================================================================
// Insertion
// ============================================================================

/// Inserts a step next to the current one, or in a fresh container at the
/// start of the selected top-level blocks when the selection is not in a step.
pub(crate) fn insert_step(tr: &mut Transaction, draft: StepDraft) -> Result<()> {
    let (pos, wrap) = {
        let selection = tr.selection();
        let from = tr.resolve(selection.from())?;
        let to = tr.resolve(selection.to())?;
        from.block_range(&to, |_| true)
            .ok_or(StepsError::NoBlockRange)?;
        match ancestor_in(&from, NodeType::StepItem) {
            Some(item) if draft.before => (item.pos, false),
            Some(item) => (item.end(), false),
            None => {
                let range = from
                    .block_range(&to, |node| node.is(NodeType::Doc))
                    .ok_or(StepsError::NoBlockRange)?;
                (range.start, true)
            }
        }
    };
    place_step(tr, pos, wrap, draft)
}

/// Writes the drafted step at `pos`, wrapped in its own container when
/// `wrap` is set, merges neighbouring containers and focuses the new title.
pub(crate) fn place_step(tr: &mut Transaction, pos: usize, wrap: bool, draft: StepDraft) -> Result<()> {
    let item = new_step_item(draft.title, draft.content);
    let (node, focus) = if wrap {
        (Node::steps(vec![item]), pos + 3)
    } else {
        (item, pos + 2)
    };
    tr.insert(pos, vec![node])?;

    let mark = tr.mapping().len();
    join_list_backwards(tr, focus)?;
    let focus = tr.mapping().map_from(mark, focus, Bias::Forward);
    let mark = tr.mapping().len();
    join_list_forwards(tr, focus)?;
    let focus = tr.mapping().map_from(mark, focus, Bias::Forward);

    trace!(pos, wrap, focus, "placed step");
    tr.set_selection(Selection::cursor(focus));
    Ok(())
}

// ============================================================================
// Removal
// ============================================================================

/// Dissolves the step around the selection back into prose.
pub(crate) fn remove_step(tr: &mut Transaction, options: &StepsOptions) -> Result<()> {
    let (steps_pos, index, prose) = {
        let from = tr.resolve(tr.selection().from())?;
        let item = ancestor_in(&from, NodeType::StepItem)
            .ok_or(StepsError::NoAncestor(NodeType::StepItem))?;
        let steps = ancestor_in(&from, NodeType::Steps)
            .ok_or(StepsError::NoAncestor(NodeType::Steps))?;
        let index = child_index_at(&steps, item.pos)
            .ok_or(StepsError::NoAncestor(NodeType::StepItem))?;
        (
            steps.pos,
            index,
            step_prose(item.node, options.heading_level),
        )
    };
    let splice = splice_items(tr, steps_pos, index..index + 1, prose)?;
    settle(tr, &splice)
}

/// Where a splice wrote its output, in positions of the edited document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Splice {
    /// Where the container started.
    pub start: usize,
    /// The blocks that took the items' place. Empty ranges mark the spot the
    /// items were removed from.
    pub blocks: Range<usize>,
    /// End of everything written in place of the container.
    pub end: usize,
}

/// Replaces the items `items` of the container at `steps_pos` with `blocks`.
/// Items on either side stay in step lists around the blocks; a container
/// left without items disappears.
pub(crate) fn splice_items(
    tr: &mut Transaction,
    steps_pos: usize,
    items: Range<usize>,
    blocks: Vec<Node>,
) -> Result<Splice> {
    let steps = tr
        .doc()
        .node_at(steps_pos)
        .filter(|node| node.is(NodeType::Steps))
        .cloned()
        .ok_or(StepsError::NoAncestor(NodeType::Steps))?;
    if items.is_empty() || items.end > steps.child_count() {
        return Err(StepsError::InvalidReplace {
            from: steps_pos,
            to: steps_pos + steps.node_size(),
            reason: "item range outside the container",
        });
    }

    let leading = steps.content()[..items.start].to_vec();
    let trailing = steps.content()[items.end..].to_vec();
    let blocks_size = blocks.iter().map(Node::node_size).sum::<usize>();
    let mut nodes = Vec::new();
    let blocks_start = if blocks.is_empty() {
        let remaining = leading.into_iter().chain(trailing).collect::<Vec<_>>();
        if remaining.is_empty() {
            steps_pos
        } else {
            nodes.push(steps.copy_with(remaining));
            steps_pos + 1 + steps.child_offset(items.start)
        }
    } else {
        if !leading.is_empty() {
            nodes.push(steps.copy_with(leading));
        }
        let at = steps_pos + nodes.iter().map(Node::node_size).sum::<usize>();
        nodes.extend(blocks);
        if !trailing.is_empty() {
            nodes.push(steps.copy_with(trailing));
        }
        at
    };
    let end = steps_pos + nodes.iter().map(Node::node_size).sum::<usize>();

    trace!(steps_pos, ?items, blocks_start, end, "splice items");
    tr.replace(steps_pos, steps_pos + steps.node_size(), nodes)?;
    Ok(Splice {
        start: steps_pos,
        blocks: blocks_start..blocks_start + blocks_size,
        end,
    })
}

/// Joins containers left touching the splice and moves the cursor onto the
/// inserted blocks, or to the nearest text before the vacated spot.
pub(crate) fn settle(tr: &mut Transaction, splice: &Splice) -> Result<()> {
    let mark = tr.mapping().len();
    join_at(tr, splice.end)?;
    join_at(tr, splice.start)?;
    let pos = tr
        .mapping()
        .map_from(mark, splice.blocks.start, Bias::Backward);
    let bias = if splice.blocks.is_empty() {
        Bias::Backward
    } else {
        Bias::Forward
    };
    let selection = Selection::near(tr.doc(), pos, bias);
    tr.set_selection(selection);
    Ok(())
}

// ============================================================================
// Joins
// ============================================================================

/// Merges the container around `inside` into an identical container
/// directly before it.
pub(crate) fn join_list_backwards(tr: &mut Transaction, inside: usize) -> Result<bool> {
    let Some(start) = find_ancestor_at(tr.doc(), inside, NodeType::Steps).map(|steps| steps.pos)
    else {
        return Ok(false);
    };
    join_at(tr, start)
}

/// Merges an identical container directly after the one around `inside`
/// into it.
pub(crate) fn join_list_forwards(tr: &mut Transaction, inside: usize) -> Result<bool> {
    let Some(end) = find_ancestor_at(tr.doc(), inside, NodeType::Steps).map(|steps| steps.end())
    else {
        return Ok(false);
    };
    join_at(tr, end)
}

/// Joins the two step lists meeting at `pos`, if that is what meets there.
pub(crate) fn join_at(tr: &mut Transaction, pos: usize) -> Result<bool> {
    let touching = {
        let resolved = tr.resolve(pos)?;
        matches!(
            (resolved.node_before(), resolved.node_after()),
            (Some(before), Some(after)) if before.is(NodeType::Steps) && after.is(NodeType::Steps)
        )
    };
    if !touching || !tr.can_join(pos) {
        return Ok(false);
    }
    tr.join(pos)?;
    Ok(true)
}
