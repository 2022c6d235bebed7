//! Core error types for graphlift-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering the
//! failure modes of graph construction and registry loading. Statement-level
//! lifting problems are not errors; they surface as diagnostics one layer up.

use thiserror::Error;

use crate::id::NodeId;

/// Which side of a node a port lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortSide {
    Input,
    Output,
}

impl std::fmt::Display for PortSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortSide::Input => write!(f, "input"),
            PortSide::Output => write!(f, "output"),
        }
    }
}

/// Core errors produced by the graphlift-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A node id was not found in the graph.
    #[error("node not found: NodeId({id})", id = id.0)]
    NodeNotFound { id: NodeId },

    /// A named port does not exist on the node.
    #[error("{side} port '{port}' not found on NodeId({id})", id = node.0)]
    PortNotFound {
        node: NodeId,
        port: String,
        side: PortSide,
    },

    /// An edge connects ports of the wrong kind (data into flow or the reverse).
    #[error("port '{port}' on NodeId({id}) is not a {expected} port", id = node.0)]
    PortKindMismatch {
        node: NodeId,
        port: String,
        expected: &'static str,
    },

    /// A data input port already has a producer.
    #[error("data input '{port}' on NodeId({id}) already has an incoming edge", id = node.0)]
    DuplicateDataInput { node: NodeId, port: String },

    /// A variadic range declaration could not be parsed.
    #[error("invalid variadic range: '{declaration}'")]
    InvalidVariadicRange { declaration: String },

    /// A registry document failed to deserialize.
    #[error("invalid registry document: {0}")]
    Registry(#[from] serde_json::Error),
}
