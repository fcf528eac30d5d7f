use std::ops::Range;

use tracing::trace;

use super::content::{step_prose, title_inline_from};
use super::inspect::{FoundNode, ancestor_in, children_of, first_text_position, last_text_position};
use super::structure::{StepDraft, place_step, remove_step, settle, splice_items};
use crate::config::StepsOptions;
use crate::document::{Bias, Node, NodeType, Selection};
use crate::error::{Result, StepsError};
use crate::transform::Transaction;

/// Turns the selected prose into a step, or the selected steps back into
/// prose when the selection starts inside a step list.
pub(crate) fn toggle_steps(tr: &mut Transaction, options: &StepsOptions) -> Result<()> {
    if starts_in_steps(tr)? {
        unwrap_steps(tr, options)
    } else {
        wrap_in_steps(tr, options)
    }
}

pub(crate) fn set_steps(tr: &mut Transaction, options: &StepsOptions) -> Result<()> {
    if starts_in_steps(tr)? {
        return Err(StepsError::NotApplicable);
    }
    wrap_in_steps(tr, options)
}

pub(crate) fn unset_steps(tr: &mut Transaction, options: &StepsOptions) -> Result<()> {
    if !starts_in_steps(tr)? {
        return Err(StepsError::NoAncestor(NodeType::Steps));
    }
    unwrap_steps(tr, options)
}

/// A selection starting between top-level blocks counts from the first text
/// position after it.
fn starts_in_steps(tr: &Transaction) -> Result<bool> {
    let from = tr.selection().from();
    let probe = if tr.resolve(from)?.depth() == 0 {
        Selection::near(tr.doc(), from, Bias::Forward).head
    } else {
        from
    };
    let resolved = tr.resolve(probe)?;
    Ok(ancestor_in(&resolved, NodeType::Steps).is_some())
}

// ============================================================================
// Prose to steps
// ============================================================================

fn wrap_in_steps(tr: &mut Transaction, options: &StepsOptions) -> Result<()> {
    let (start, end, blocks) = {
        let selection = tr.selection();
        let from = tr.resolve(selection.from())?;
        let to = tr.resolve(selection.to())?;
        let range = from
            .block_range(&to, |node| node.is(NodeType::Doc))
            .ok_or(StepsError::NoBlockRange)?;
        let blocks = tr.doc().content()[range.start_index..range.end_index].to_vec();
        (range.start, range.end, blocks)
    };
    let draft = draft_from_blocks(dissolve_steps(blocks, options.heading_level));
    trace!(start, end, "wrap in steps");
    tr.delete(start, end)?;
    place_step(tr, start, true, draft)
}

/// Step lists inside a selection being wrapped become prose first.
fn dissolve_steps(blocks: Vec<Node>, heading_level: u8) -> Vec<Node> {
    blocks
        .into_iter()
        .flat_map(|block| {
            if block.is(NodeType::Steps) {
                block
                    .content()
                    .iter()
                    .flat_map(|item| step_prose(item, heading_level))
                    .collect()
            } else {
                vec![block]
            }
        })
        .collect()
}

/// The first paragraph or heading names the step; everything else is body.
fn draft_from_blocks(mut blocks: Vec<Node>) -> StepDraft {
    let titled = blocks
        .first()
        .is_some_and(|first| matches!(first.kind(), NodeType::Paragraph | NodeType::Heading));
    if !titled {
        return StepDraft {
            content: blocks,
            ..StepDraft::default()
        };
    }
    let first = blocks.remove(0);
    StepDraft {
        title: title_inline_from(&first),
        content: blocks,
        before: false,
    }
}

// ============================================================================
// Steps to prose
// ============================================================================

/// Items of one container that the selection covers completely.
struct Covered {
    steps_pos: usize,
    items: Range<usize>,
    prose: Vec<Node>,
}

fn unwrap_steps(tr: &mut Transaction, options: &StepsOptions) -> Result<()> {
    let covered = covered_items(tr.doc(), tr.selection(), options.heading_level);
    if covered.is_empty() {
        trace!("no step fully selected, removing the current one");
        return remove_step(tr, options);
    }

    // Back to front, so earlier container positions stay valid.
    for plan in covered.into_iter().rev() {
        let splice = splice_items(tr, plan.steps_pos, plan.items, plan.prose)?;
        settle(tr, &splice)?;
    }
    Ok(())
}

fn covered_items(doc: &Node, selection: Selection, heading_level: u8) -> Vec<Covered> {
    let (from, to) = (selection.from(), selection.to());
    let mut covered = Vec::new();
    for (pos, node) in doc.find_all(NodeType::Steps) {
        let steps = FoundNode {
            pos,
            depth: 1,
            node,
        };
        if steps.end() <= from || steps.pos >= to {
            continue;
        }
        let indices = children_of(&steps)
            .iter()
            .enumerate()
            .filter(|(_, item)| {
                let first = first_text_position(doc, item);
                let last = last_text_position(doc, item);
                matches!((first, last), (Some(first), Some(last)) if first >= from && last <= to)
            })
            .map(|(index, _)| index)
            .collect::<Vec<_>>();
        let (Some(&first), Some(&last)) = (indices.first(), indices.last()) else {
            continue;
        };
        let prose = node.content()[first..=last]
            .iter()
            .flat_map(|item| step_prose(item, heading_level))
            .collect();
        covered.push(Covered {
            steps_pos: pos,
            items: first..last + 1,
            prose,
        });
    }
    covered
}
