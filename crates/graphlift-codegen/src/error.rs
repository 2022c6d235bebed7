//! Re-lowering error types.

use graphlift_core::{CoreError, NodeId};
use graphlift_lift::LiftError;

/// Errors that stop a graph from being re-lowered to source.
#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    /// A call node whose title the registry does not know and which is not
    /// a composite instance.
    #[error("node {node} has title '{title}', which names no known node kind")]
    UnknownNodeTitle { node: NodeId, title: String },

    /// Flow that cannot be expressed with `if`/`match`/`for`/`break`.
    #[error("flow at node {node} is not structured: {reason}")]
    UnstructuredFlow { node: NodeId, reason: String },

    #[error(transparent)]
    Core(#[from] CoreError),

    /// Lifting failed during a round-trip check.
    #[error(transparent)]
    Lift(#[from] LiftError),
}
