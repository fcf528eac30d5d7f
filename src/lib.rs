//! Step lists for a rich-text document model: an ordered container of steps,
//! each with a single-line title and a block body, plus the commands and key
//! handling that create, split and dissolve them.

pub mod config;
pub mod document;
pub mod editor;
pub mod error;
pub mod transform;

pub use config::StepsOptions;
pub use document::{Node, Selection};
pub use editor::{DocumentEditor, InsertStepOptions};
pub use error::StepsError;
