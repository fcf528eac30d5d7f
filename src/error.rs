use thiserror::Error;

use crate::document::{NodeType, SchemaError};

/// Reasons a step command declines or fails to build its transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepsError {
    #[error("selection does not resolve to a block range")]
    NoBlockRange,
    #[error("no enclosing {0:?} around the selection")]
    NoAncestor(NodeType),
    #[error("position {pos} is outside the document (size {size})")]
    PositionOutOfRange { pos: usize, size: usize },
    #[error("cannot replace {from}..{to}: {reason}")]
    InvalidReplace {
        from: usize,
        to: usize,
        reason: &'static str,
    },
    #[error("cannot join at {0}")]
    InvalidJoin(usize),
    #[error("command does not apply here")]
    NotApplicable,
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("parse error: {0}")]
    Parse(String),
}

impl StepsError {
    /// Precondition failures are expected during normal editing; everything
    /// else points at a malformed document or a bad edit sequence.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            StepsError::NoBlockRange | StepsError::NoAncestor(_) | StepsError::NotApplicable
        )
    }
}

pub type Result<T, E = StepsError> = std::result::Result<T, E>;
