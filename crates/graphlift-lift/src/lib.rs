//! Lifting compiler from the statement grammar to the graph IR.
//!
//! [`unit::lift_graph_source`] and [`unit::lift_composite_source`] are the
//! entry points; [`Lifter`] lowers a single statement list and is usable on
//! its own with any [`graphlift_core::NodeRegistry`].

pub mod analysis;
pub mod args;
pub mod config;
pub mod constants;
pub mod diagnostics;
pub mod env;
pub mod error;
pub mod factory;
mod flatten;
mod flow;
pub mod frontier;
pub mod lifter;
mod local_var;
pub mod pins;
pub mod unit;
pub mod usage;

pub use analysis::VariableAnalysis;
pub use config::LiftConfig;
pub use constants::ConstantCache;
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, Diagnostics};
pub use env::{Producer, VarEnv};
pub use error::LiftError;
pub use frontier::FlowFrontier;
pub use lifter::{CompositeInstances, LiftContext, Lifter};
pub use pins::{MethodKind, PinDeclaration};
pub use unit::{
    lift_composite_module, lift_composite_source, lift_graph_module, lift_graph_source,
    CompositeUnit, LiftOutput,
};
pub use usage::UsageTracker;
