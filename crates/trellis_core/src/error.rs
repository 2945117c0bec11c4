//! Error taxonomy
//!
//! Every fallible operation surfaces synchronously at the call that triggered
//! it. Only [`TrellisError::InvalidPropertyValue`] is expected at runtime; the
//! other variants signal a defect in the calling code.

use std::thread::ThreadId;

use thiserror::Error;

use crate::drag::DragError;
use crate::NodeId;

/// Layout phase a node was executing when an error was raised
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayoutPhase {
    Measure,
    Arrange,
    Render,
    Lifecycle,
}

/// Structural rule a tree mutation would have broken
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeViolation {
    #[error("node {0:?} does not exist")]
    UnknownNode(NodeId),

    #[error("node {child:?} already has parent {parent:?}")]
    AlreadyParented { child: NodeId, parent: NodeId },

    #[error("node {0:?} cannot be its own child")]
    SelfParent(NodeId),

    #[error("attaching {child:?} under {parent:?} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },

    #[error("node {0:?} is the tree root and cannot become a child")]
    RootAsChild(NodeId),

    #[error("node {0:?} has a parent and cannot become the root")]
    ParentedRoot(NodeId),

    #[error("node {parent:?} already holds the maximum of {max} children")]
    TooManyChildren { parent: NodeId, max: usize },

    #[error("node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("index {index} out of bounds for {len} children")]
    IndexOutOfBounds { index: usize, len: usize },
}

/// Errors raised by the property store, layout engine and tree
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrellisError {
    /// A convert hook or kind check rejected a value; the previous value is kept
    #[error("invalid value for {property}: {reason}")]
    InvalidPropertyValue { property: String, reason: String },

    /// A value outside the closed set reached a layout algorithm
    #[error("unsupported layout case in {context}: {detail}")]
    UnsupportedLayoutCase { context: &'static str, detail: String },

    #[error("tree integrity violation: {0}")]
    TreeIntegrityViolation(#[from] TreeViolation),

    #[error("tree owned by thread {owner:?} was mutated from thread {current:?}")]
    ThreadAffinityViolation { owner: ThreadId, current: ThreadId },

    #[error("node {node:?} re-entered {phase:?} while already running it")]
    Reentrancy { node: NodeId, phase: LayoutPhase },

    #[error(transparent)]
    Drag(#[from] DragError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl TrellisError {
    /// Shorthand for [`TrellisError::UnsupportedLayoutCase`]
    pub fn unsupported(context: &'static str, detail: impl Into<String>) -> Self {
        TrellisError::UnsupportedLayoutCase {
            context,
            detail: detail.into(),
        }
    }

    /// Whether the caller can keep going after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TrellisError::InvalidPropertyValue { .. } | TrellisError::Drag(_)
        )
    }
}

/// Result type for Trellis operations
pub type Result<T> = std::result::Result<T, TrellisError>;
