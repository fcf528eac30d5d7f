use std::fmt;
use std::str::FromStr;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use serde::Deserialize;
use thiserror::Error;
use tracing::trace;

use super::content::{empty_paragraph, step_is_empty};
use super::inspect::{ancestor_in, child_index_at, step_parts};
use super::structure::{StepDraft, insert_step, remove_step, settle, splice_items};
use crate::config::StepsOptions;
use crate::document::{Bias, Node, NodeType, Selection, cut_content};
use crate::error::{Result, StepsError};
use crate::transform::Transaction;

// ============================================================================
// Shortcuts
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShortcutError {
    #[error("empty shortcut")]
    Empty,
    #[error("unknown modifier {0:?}")]
    UnknownModifier(String),
    #[error("unknown key {0:?}")]
    UnknownKey(String),
}

/// A key chord such as `ctrl+alt+s`. `-` works as separator too, and `mod`
/// is read as `ctrl`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Shortcut {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl Shortcut {
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    pub fn matches(&self, event: &KeyEvent) -> bool {
        if event.kind != KeyEventKind::Press || event.modifiers != self.modifiers {
            return false;
        }
        match (event.code, self.code) {
            (KeyCode::Char(pressed), KeyCode::Char(expected)) => {
                pressed.to_ascii_lowercase() == expected
            }
            (pressed, expected) => pressed == expected,
        }
    }
}

impl Default for Shortcut {
    fn default() -> Self {
        Self::new(KeyCode::Char('s'), KeyModifiers::CONTROL | KeyModifiers::ALT)
    }
}

impl FromStr for Shortcut {
    type Err = ShortcutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens = s
            .split(['+', '-'])
            .map(|token| token.trim().to_ascii_lowercase())
            .collect::<Vec<_>>();
        let Some((key, modifiers)) = tokens.split_last() else {
            return Err(ShortcutError::Empty);
        };
        if key.is_empty() {
            return Err(ShortcutError::Empty);
        }

        let modifiers = modifiers
            .iter()
            .try_fold(KeyModifiers::NONE, |acc, token| {
                let modifier = match token.as_str() {
                    "ctrl" | "control" | "mod" => KeyModifiers::CONTROL,
                    "alt" | "option" => KeyModifiers::ALT,
                    "shift" => KeyModifiers::SHIFT,
                    "super" | "cmd" => KeyModifiers::SUPER,
                    "meta" => KeyModifiers::META,
                    other => return Err(ShortcutError::UnknownModifier(other.to_string())),
                };
                Ok(acc | modifier)
            })?;

        let code = match key.as_str() {
            "enter" | "return" => KeyCode::Enter,
            "backspace" => KeyCode::Backspace,
            "delete" | "del" => KeyCode::Delete,
            "tab" => KeyCode::Tab,
            "esc" | "escape" => KeyCode::Esc,
            "space" => KeyCode::Char(' '),
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => KeyCode::Char(ch),
                    _ => other
                        .strip_prefix('f')
                        .and_then(|n| n.parse::<u8>().ok())
                        .filter(|n| (1..=12).contains(n))
                        .map(KeyCode::F)
                        .ok_or_else(|| ShortcutError::UnknownKey(other.to_string()))?,
                }
            }
        };
        Ok(Self::new(code, modifiers))
    }
}

impl TryFrom<String> for Shortcut {
    type Error = ShortcutError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, name) in [
            (KeyModifiers::CONTROL, "ctrl"),
            (KeyModifiers::ALT, "alt"),
            (KeyModifiers::SHIFT, "shift"),
            (KeyModifiers::SUPER, "super"),
            (KeyModifiers::META, "meta"),
        ] {
            if self.modifiers.contains(flag) {
                write!(f, "{name}+")?;
            }
        }
        match self.code {
            KeyCode::Char(' ') => write!(f, "space"),
            KeyCode::Char(ch) => write!(f, "{ch}"),
            KeyCode::F(n) => write!(f, "f{n}"),
            other => write!(f, "{}", format!("{other:?}").to_ascii_lowercase()),
        }
    }
}

/// Keys the step nodes react to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepsKey {
    Enter,
    Backspace,
    ToggleSteps,
}

impl StepsKey {
    pub fn from_event(event: &KeyEvent, options: &StepsOptions) -> Option<Self> {
        if options.toggle_shortcut.matches(event) {
            return Some(StepsKey::ToggleSteps);
        }
        if event.kind != KeyEventKind::Press || !event.modifiers.is_empty() {
            return None;
        }
        match event.code {
            KeyCode::Enter => Some(StepsKey::Enter),
            KeyCode::Backspace => Some(StepsKey::Backspace),
            _ => None,
        }
    }
}

// ============================================================================
// Enter and Backspace
// ============================================================================

/// Where the cursor sits relative to the step around it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Context {
    Title,
    Content,
}

fn context_of(tr: &Transaction) -> Result<Context> {
    let selection = tr.selection();
    let from = tr.resolve(selection.from())?;
    let to = tr.resolve(selection.to())?;
    if from.parent().is(NodeType::StepTitle) {
        if from.start(from.depth()) != to.start(to.depth()) {
            return Err(StepsError::NotApplicable);
        }
        return Ok(Context::Title);
    }
    let depth = from.depth();
    if depth > 0 && from.parent().is_textblock() && from.node(depth - 1).is(NodeType::StepContent) {
        return Ok(Context::Content);
    }
    Err(StepsError::NotApplicable)
}

/// Positions of the step around a cursor in its title.
struct TitleSpot {
    cursor: usize,
    steps_pos: usize,
    index: usize,
    is_first: bool,
    is_last: bool,
    title_start: usize,
    title_end: usize,
    title_has_text: bool,
    item_is_empty: bool,
    content_pos: usize,
}

fn title_spot(tr: &Transaction) -> Result<TitleSpot> {
    let cursor = tr.selection().head;
    let resolved = tr.resolve(cursor)?;
    let steps = ancestor_in(&resolved, NodeType::Steps)
        .ok_or(StepsError::NoAncestor(NodeType::Steps))?;
    let item = ancestor_in(&resolved, NodeType::StepItem)
        .ok_or(StepsError::NoAncestor(NodeType::StepItem))?;
    let (title, content) = step_parts(&item).ok_or(StepsError::NoAncestor(NodeType::StepTitle))?;
    let index = child_index_at(&steps, item.pos).ok_or(StepsError::NoAncestor(NodeType::StepItem))?;
    Ok(TitleSpot {
        cursor,
        steps_pos: steps.pos,
        index,
        is_first: index == 0,
        is_last: index + 1 == steps.node.child_count(),
        title_start: title.content_start(),
        title_end: title.content_end(),
        title_has_text: !title.node.text_content().is_empty(),
        item_is_empty: step_is_empty(item.node),
        content_pos: content.pos,
    })
}

pub(crate) fn enter(tr: &mut Transaction) -> Result<()> {
    match context_of(tr)? {
        Context::Title => enter_in_title(tr),
        Context::Content => enter_in_content(tr),
    }
}

fn enter_in_title(tr: &mut Transaction) -> Result<()> {
    let selection = tr.selection();
    if !selection.is_empty() {
        tr.delete(selection.from(), selection.to())?;
        tr.set_selection(Selection::cursor(selection.from()));
    }
    let spot = title_spot(tr)?;
    let at_start = spot.cursor == spot.title_start;

    if at_start && spot.is_first {
        trace!("enter at start of the first title");
        tr.insert(spot.steps_pos, vec![empty_paragraph()])?;
        tr.set_selection(Selection::cursor(spot.steps_pos + 1));
        return Ok(());
    }
    if at_start && spot.title_has_text {
        trace!("enter at start of a title");
        return insert_step(
            tr,
            StepDraft {
                before: true,
                ..StepDraft::default()
            },
        );
    }
    if spot.is_last && spot.item_is_empty {
        trace!("enter in the empty last step");
        let splice = splice_items(
            tr,
            spot.steps_pos,
            spot.index..spot.index + 1,
            vec![empty_paragraph()],
        )?;
        return settle(tr, &splice);
    }
    if spot.cursor == spot.title_end {
        trace!("enter at end of a title");
        let selection = Selection::near(tr.doc(), spot.content_pos, Bias::Forward);
        tr.set_selection(selection);
        return Ok(());
    }
    split_title(tr, &spot)
}

/// Moves the title text after the cursor to the front of the step body.
fn split_title(tr: &mut Transaction, spot: &TitleSpot) -> Result<()> {
    let (moved, first_block) = {
        let resolved = tr.resolve(spot.cursor)?;
        let title = resolved.parent();
        let moved = cut_content(
            title.content(),
            spot.cursor - spot.title_start,
            title.content_size(),
        )
        .ok_or(StepsError::InvalidReplace {
            from: spot.cursor,
            to: spot.title_end,
            reason: "title cut through a node",
        })?;
        let first_block = tr
            .doc()
            .node_at(spot.content_pos + 1)
            .map(Node::kind)
            .ok_or(StepsError::NoAncestor(NodeType::StepContent))?;
        (moved, first_block)
    };
    let removed = spot.title_end - spot.cursor;

    // Insert into the body first; it lies after the title.
    let focus = match first_block {
        NodeType::Paragraph | NodeType::Heading => {
            let at = spot.content_pos + 2;
            tr.insert(at, moved)?;
            at - removed
        }
        NodeType::CodeBlock => {
            let at = spot.content_pos + 2;
            let text = moved.iter().map(Node::as_text).collect::<String>();
            tr.insert_text(at, &text)?;
            at - removed
        }
        _ => {
            let at = spot.content_pos + 1;
            tr.insert(at, vec![Node::paragraph(moved)])?;
            at - removed + 1
        }
    };
    tr.delete(spot.cursor, spot.title_end)?;
    trace!(cursor = spot.cursor, removed, focus, "split title");
    tr.set_selection(Selection::cursor(focus));
    Ok(())
}

fn enter_in_content(tr: &mut Transaction) -> Result<()> {
    let selection = tr.selection();
    if !selection.is_empty() {
        return Err(StepsError::NotApplicable);
    }
    let (block_pos, only_block) = {
        let resolved = tr.resolve(selection.head)?;
        let block = resolved.parent();
        let content = ancestor_in(&resolved, NodeType::StepContent)
            .ok_or(StepsError::NoAncestor(NodeType::StepContent))?;
        let is_last = resolved.index(content.depth) + 1 == content.node.child_count();
        if !is_last || !block.is_empty_textblock() {
            return Err(StepsError::NotApplicable);
        }
        let block_pos = resolved
            .before(resolved.depth())
            .ok_or(StepsError::NotApplicable)?;
        (block_pos, content.node.child_count() == 1)
    };

    if !only_block {
        trace!(block_pos, "dropping trailing empty block");
        tr.delete(block_pos, block_pos + 2)?;
        let selection = Selection::near(tr.doc(), block_pos, Bias::Backward);
        tr.set_selection(selection);
    }
    insert_step(tr, StepDraft::default())
}

pub(crate) fn backspace(tr: &mut Transaction, options: &StepsOptions) -> Result<()> {
    let selection = tr.selection();
    if !selection.is_empty() {
        return Err(StepsError::NotApplicable);
    }
    match context_of(tr)? {
        Context::Title => {
            let spot = title_spot(tr)?;
            if spot.cursor != spot.title_start {
                return Err(StepsError::NotApplicable);
            }
            trace!("backspace at start of a title");
            remove_step(tr, options)
        }
        Context::Content => {
            let title_end = {
                let resolved = tr.resolve(selection.head)?;
                let content = ancestor_in(&resolved, NodeType::StepContent)
                    .ok_or(StepsError::NoAncestor(NodeType::StepContent))?;
                if selection.head != content.content_start() + 1 {
                    return Err(StepsError::NotApplicable);
                }
                content.pos - 1
            };
            trace!(title_end, "backspace at start of a step body");
            tr.set_selection(Selection::cursor(title_end));
            Ok(())
        }
    }
}
