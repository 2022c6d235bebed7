//! Re-lowering: turns a lifted graph unit back into source.
//!
//! [`relower`] recovers structured statements from a graph produced by
//! `graphlift-lift`: flow order becomes statement order, branch and loop
//! nodes become `if`/`match`/`for`, local-variable nodes become plain
//! assignments. Lifting the re-lowered source reproduces the graph's
//! [`Topology`], which [`check_roundtrip`] verifies.

pub mod error;
mod lower;
mod names;
pub mod options;
pub mod roundtrip;
mod structure;
pub mod topology;

pub use error::CodegenError;
pub use lower::{relower, relower_source, render};
pub use options::CodegenOptions;
pub use roundtrip::{check_roundtrip, relower_with_composites, RoundTrip};
pub use topology::{EdgeSignature, Topology};
