//! Node and port types for the lifted graph.
//!
//! A [`Node`] is either an instance of a registry entry (resolved by title)
//! or one of the synthetic kinds in [`crate::builtin`]: event entry points,
//! branch and loop nodes, and local-variable get/set pairs.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::builtin;
use crate::id::NodeId;
use crate::value::Literal;

/// Type name that marks a port as a flow (execution sequencing) port.
pub const FLOW_TYPE: &str = "flow";

/// Type name used when a data port declares no concrete type.
pub const GENERIC_TYPE: &str = "generic";

/// A named port. Flow-ness is implied by the type name, not tagged separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    #[serde(rename = "type", default = "generic_type")]
    pub type_name: String,
}

fn generic_type() -> String {
    GENERIC_TYPE.to_string()
}

impl Port {
    pub fn flow(name: impl Into<String>) -> Self {
        Port {
            name: name.into(),
            type_name: FLOW_TYPE.to_string(),
        }
    }

    pub fn data(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Port {
            name: name.into(),
            type_name: type_name.into(),
        }
    }

    /// A data port with the generic type.
    pub fn generic(name: impl Into<String>) -> Self {
        Port::data(name, GENERIC_TYPE)
    }

    pub fn is_flow(&self) -> bool {
        self.type_name == FLOW_TYPE
    }
}

/// Coarse node classification used by renderers and by lifting decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    /// Entry point of an event handler.
    Event,
    /// Side-effecting node sequenced by flow edges.
    Execution,
    /// Pure data node (no flow ports).
    Query,
    /// Branch and loop nodes.
    ControlFlow,
    /// Synthesized local-variable get/set nodes.
    LocalVariable,
    /// Instance of a reusable composite.
    Composite,
}

/// Link from a composite node to the composite definition it instantiates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeRef {
    pub composite_id: String,
    /// Attribute name the owning class stores the instance under.
    pub instance: String,
    /// Method invoked on the instance.
    pub method: String,
}

/// Inclusive 1-based source line range a node was lifted from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    pub line: u32,
    pub end_line: u32,
}

impl SourceSpan {
    pub fn new(line: u32, end_line: u32) -> Self {
        SourceSpan { line, end_line }
    }
}

/// A node in the lifted graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub title: String,
    pub category: NodeCategory,
    pub inputs: SmallVec<[Port; 4]>,
    pub outputs: SmallVec<[Port; 4]>,
    /// Input port name -> inlined constant argument.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub constants: IndexMap<String, Literal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composite: Option<CompositeRef>,
    /// Output port name -> variable name the author bound it to.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub var_names: IndexMap<String, String>,
    #[serde(default)]
    pub span: SourceSpan,
    /// Root original of a layout copy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_of: Option<NodeId>,
}

impl Node {
    /// Creates a node with no ports.
    pub fn new(title: impl Into<String>, category: NodeCategory) -> Self {
        Node {
            title: title.into(),
            category,
            inputs: SmallVec::new(),
            outputs: SmallVec::new(),
            constants: IndexMap::new(),
            composite: None,
            var_names: IndexMap::new(),
            span: SourceSpan::default(),
            copy_of: None,
        }
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = span;
        self
    }

    pub fn input(&self, name: &str) -> Option<&Port> {
        self.inputs.iter().find(|p| p.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&Port> {
        self.outputs.iter().find(|p| p.name == name)
    }

    /// Appends an input port unless one with the same name exists.
    pub fn add_input(&mut self, port: Port) {
        if self.input(&port.name).is_none() {
            self.inputs.push(port);
        }
    }

    /// Appends an output port unless one with the same name exists.
    pub fn add_output(&mut self, port: Port) {
        if self.output(&port.name).is_none() {
            self.outputs.push(port);
        }
    }

    pub fn flow_inputs(&self) -> impl Iterator<Item = &Port> {
        self.inputs.iter().filter(|p| p.is_flow())
    }

    pub fn flow_outputs(&self) -> impl Iterator<Item = &Port> {
        self.outputs.iter().filter(|p| p.is_flow())
    }

    pub fn data_inputs(&self) -> impl Iterator<Item = &Port> {
        self.inputs.iter().filter(|p| !p.is_flow())
    }

    pub fn data_outputs(&self) -> impl Iterator<Item = &Port> {
        self.outputs.iter().filter(|p| !p.is_flow())
    }

    /// `true` if the node participates in flow sequencing at all.
    pub fn is_flow_node(&self) -> bool {
        self.inputs.iter().chain(self.outputs.iter()).any(Port::is_flow)
    }

    /// `true` for pure data nodes.
    pub fn is_pure(&self) -> bool {
        !self.is_flow_node()
    }

    pub fn is_branch(&self) -> bool {
        self.title == builtin::DOUBLE_BRANCH || self.title == builtin::MULTI_BRANCH
    }

    pub fn is_loop(&self) -> bool {
        self.title == builtin::FINITE_LOOP || self.title == builtin::LIST_LOOP
    }

    /// The flow output a frontier element without a forced port attaches from.
    ///
    /// `flow_out` when declared, `loop_done` for loops, otherwise the first
    /// flow output.
    pub fn default_flow_output(&self) -> Option<&str> {
        if let Some(port) = self.output(builtin::FLOW_OUT).filter(|p| p.is_flow()) {
            return Some(&port.name);
        }
        if self.is_loop() {
            if let Some(port) = self.output(builtin::LOOP_DONE) {
                return Some(&port.name);
            }
        }
        self.flow_outputs().next().map(|p| p.name.as_str())
    }

    /// The flow input incoming sequencing attaches to.
    ///
    /// A composite node entered through a named method uses the flow input of
    /// that name when it exists.
    pub fn flow_entry_port(&self) -> Option<&str> {
        if let Some(composite) = &self.composite {
            if let Some(port) = self.input(&composite.method).filter(|p| p.is_flow()) {
                return Some(&port.name);
            }
        }
        if let Some(port) = self.input(builtin::FLOW_IN).filter(|p| p.is_flow()) {
            return Some(&port.name);
        }
        self.flow_inputs().next().map(|p| p.name.as_str())
    }

    /// The condition/subject port of a branch node.
    pub fn condition_port(&self) -> Option<&str> {
        match self.title.as_str() {
            builtin::DOUBLE_BRANCH => Some(builtin::CONDITION),
            builtin::MULTI_BRANCH => Some(builtin::SUBJECT),
            _ => None,
        }
    }
}
