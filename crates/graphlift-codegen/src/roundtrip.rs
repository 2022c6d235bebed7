//! Lift, re-lower, lift again, and compare.
//!
//! Re-lowering is idempotent when the second lift has the same
//! [`Topology`] as the first.

use graphlift_core::{Graph, NodeRegistry};
use graphlift_lift::unit::COMPOSITE_CLASS;
use graphlift_lift::{lift_graph_module, lift_graph_source, Diagnostics, LiftConfig, LiftError};
use graphlift_syntax::{parse_module, Module, Stmt, StmtKind};
use serde::Serialize;

use crate::error::CodegenError;
use crate::lower::{relower, render};
use crate::options::CodegenOptions;
use crate::topology::Topology;

/// Outcome of [`check_roundtrip`].
#[derive(Debug, Clone, Serialize)]
pub struct RoundTrip {
    /// The re-lowered source that was lifted the second time.
    pub relowered: String,
    pub before: Topology,
    pub after: Topology,
    /// Diagnostics of the second lift.
    pub diagnostics: Diagnostics,
}

impl RoundTrip {
    pub fn is_idempotent(&self) -> bool {
        self.before == self.after
    }

    pub fn differences(&self) -> Vec<String> {
        self.before.differences(&self.after)
    }
}

/// Re-lowers `graph` and prepends the composite classes of `original`, so
/// instances the graph calls still resolve when the result is lifted on its
/// own.
pub fn relower_with_composites(
    original: &Module,
    graph: &Graph,
    registry: &dyn NodeRegistry,
    options: &CodegenOptions,
) -> Result<String, CodegenError> {
    let mut module = relower(graph, registry, options)?;
    let composites: Vec<Stmt> = original
        .body
        .iter()
        .filter(|stmt| {
            matches!(&stmt.kind, StmtKind::ClassDef(class) if class.decorator(COMPOSITE_CLASS).is_some())
        })
        .cloned()
        .collect();
    module.body.splice(0..0, composites);
    Ok(render(&module, options.indent))
}

/// Lifts the graph unit in `source`, re-lowers it and lifts the result.
///
/// The event-method prefix always follows `config`, so the second lift
/// finds the handlers the first one produced.
pub fn check_roundtrip(
    source: &str,
    registry: &dyn NodeRegistry,
    config: &LiftConfig,
    options: &CodegenOptions,
) -> Result<RoundTrip, CodegenError> {
    let options = CodegenOptions {
        event_method_prefix: config.event_method_prefix.clone(),
        ..options.clone()
    };
    let module = parse_module(source).map_err(LiftError::from)?;
    let first = lift_graph_module(&module, registry, config)?;
    let relowered = relower_with_composites(&module, &first.graph, registry, &options)?;
    let second = lift_graph_source(&relowered, registry, config)?;

    let round_trip = RoundTrip {
        relowered,
        before: Topology::of(&first.graph),
        after: Topology::of(&second.graph),
        diagnostics: second.diagnostics,
    };
    tracing::debug!(
        idempotent = round_trip.is_idempotent(),
        nodes = round_trip.after.node_count,
        "round trip finished"
    );
    Ok(round_trip)
}
