use crossterm::event::KeyEvent;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::StepsOptions;
use crate::document::{Bias, Node, NodeType, Selection, html};
use crate::error::{Result, StepsError};
use crate::transform::Transaction;

mod content;
mod inspect;
mod keymap;
mod structure;
mod toggle;

pub use inspect::{Bounds, FoundNode, bounds_of, find_ancestor_at, find_ancestor_of_type};
pub use keymap::{Shortcut, ShortcutError, StepsKey};
pub use structure::InsertStepOptions;

use structure::StepDraft;

/// A document plus selection, edited through the step commands.
///
/// Every command builds one [`Transaction`] against the current state and
/// either commits it whole or leaves document and selection untouched.
#[derive(Clone, Debug)]
pub struct DocumentEditor {
    document: Node,
    selection: Selection,
    options: StepsOptions,
}

impl DocumentEditor {
    pub fn new(document: Node) -> Self {
        Self::with_options(document, StepsOptions::default())
    }

    pub fn with_options(mut document: Node, options: StepsOptions) -> Self {
        if document.content().is_empty() {
            document
                .content_mut()
                .push(Node::new(NodeType::Paragraph, Vec::new()));
        }
        let selection = Selection::near(&document, 0, Bias::Forward);
        Self {
            document,
            selection,
            options,
        }
    }

    pub fn document(&self) -> &Node {
        &self.document
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn options(&self) -> &StepsOptions {
        &self.options
    }

    /// Sets the selection, moving both ends onto text positions.
    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection.normalized(&self.document);
    }

    pub fn move_to(&mut self, pos: usize) {
        self.set_selection(Selection::cursor(pos));
    }

    pub fn select_all(&mut self) {
        self.selection = Selection::all(&self.document);
    }

    pub fn focus_start(&mut self) {
        self.selection = Selection::near(&self.document, 0, Bias::Forward);
    }

    pub fn focus_end(&mut self) {
        let end = self.document.content_size();
        self.selection = Selection::near(&self.document, end, Bias::Backward);
    }

    /// Replaces the selection with `text`. Both ends must lie in the same
    /// textblock.
    pub fn insert_text(&mut self, text: &str) -> bool {
        let text = text.to_string();
        self.run("insert_text", move |tr, _| {
            let selection = tr.selection();
            let (from, to) = (selection.from(), selection.to());
            if from != to {
                tr.delete(from, to)?;
            }
            tr.insert_text(from, &text)?;
            tr.set_selection(Selection::cursor(from + text.chars().count()));
            Ok(())
        })
    }

    // ------------------------------------------------------------------------
    // Step commands
    // ------------------------------------------------------------------------

    pub fn toggle_steps(&mut self) -> bool {
        self.run("toggle_steps", toggle::toggle_steps)
    }

    pub fn can_toggle_steps(&self) -> bool {
        self.dry_run("toggle_steps", toggle::toggle_steps)
    }

    pub fn set_steps(&mut self) -> bool {
        self.run("set_steps", toggle::set_steps)
    }

    pub fn can_set_steps(&self) -> bool {
        self.dry_run("set_steps", toggle::set_steps)
    }

    pub fn unset_steps(&mut self) -> bool {
        self.run("unset_steps", toggle::unset_steps)
    }

    pub fn can_unset_steps(&self) -> bool {
        self.dry_run("unset_steps", toggle::unset_steps)
    }

    pub fn insert_step(&mut self, options: InsertStepOptions) -> bool {
        let draft = StepDraft::from(&options);
        self.run("insert_step", move |tr, _| structure::insert_step(tr, draft))
    }

    pub fn can_insert_step(&self, options: &InsertStepOptions) -> bool {
        let draft = StepDraft::from(options);
        self.dry_run("insert_step", move |tr, _| structure::insert_step(tr, draft))
    }

    pub fn remove_step(&mut self) -> bool {
        self.run("remove_step", structure::remove_step)
    }

    pub fn can_remove_step(&self) -> bool {
        self.dry_run("remove_step", structure::remove_step)
    }

    // ------------------------------------------------------------------------
    // Keys
    // ------------------------------------------------------------------------

    /// Returns `true` when the event was consumed; `false` leaves it to the
    /// host's default editing.
    pub fn handle_key_event(&mut self, event: &KeyEvent) -> bool {
        match StepsKey::from_event(event, &self.options) {
            Some(StepsKey::ToggleSteps) => self.toggle_steps(),
            Some(StepsKey::Enter) => self.handle_enter(),
            Some(StepsKey::Backspace) => self.handle_backspace(),
            None => false,
        }
    }

    pub fn handle_enter(&mut self) -> bool {
        self.run("enter", |tr, _| keymap::enter(tr))
    }

    pub fn handle_backspace(&mut self) -> bool {
        self.run("backspace", keymap::backspace)
    }

    // ------------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------------

    pub fn to_html(&self) -> String {
        html::to_html(&self.document, &self.options)
    }

    pub fn to_json(&self) -> Value {
        self.document.to_json()
    }

    fn run<F>(&mut self, name: &'static str, build: F) -> bool
    where
        F: FnOnce(&mut Transaction, &StepsOptions) -> Result<()>,
    {
        match self.execute(name, build) {
            Some((document, selection)) => {
                self.document = document;
                self.selection = selection;
                true
            }
            None => false,
        }
    }

    fn dry_run<F>(&self, name: &'static str, build: F) -> bool
    where
        F: FnOnce(&mut Transaction, &StepsOptions) -> Result<()>,
    {
        self.execute(name, build).is_some()
    }

    fn execute<F>(&self, name: &'static str, build: F) -> Option<(Node, Selection)>
    where
        F: FnOnce(&mut Transaction, &StepsOptions) -> Result<()>,
    {
        let mut tr = Transaction::new(&self.document, self.selection);
        let outcome = build(&mut tr, &self.options).and_then(|()| tr.finish());
        match outcome {
            Ok(state) => Some(state),
            Err(err) if err.is_precondition() => {
                debug!(command = name, %err, "command declined");
                None
            }
            Err(err) => {
                warn!(command = name, %err, "command failed");
                None
            }
        }
    }
}

impl Default for DocumentEditor {
    fn default() -> Self {
        Self::new(Node::doc(Vec::new()))
    }
}

impl TryFrom<Value> for DocumentEditor {
    type Error = StepsError;

    fn try_from(value: Value) -> Result<Self> {
        Ok(Self::new(Node::from_json(&value)?))
    }
}

#[cfg(test)]
#[path = "editor_tests.rs"]
mod editor_tests;
