//! Variable environment threaded through one body lift.

use std::collections::{HashMap, HashSet};

use graphlift_core::{Literal, NodeId};

/// Key prefix under which a synthesized local variable's handle is stored.
/// Not a legal identifier, so it never collides with an authored name.
const LOCAL_HANDLE_PREFIX: &str = "@handle:";

/// An output port a variable is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Producer {
    pub node: NodeId,
    pub port: String,
}

impl Producer {
    pub fn new(node: NodeId, port: impl Into<String>) -> Self {
        Producer {
            node,
            port: port.into(),
        }
    }
}

/// Variable bindings, local constants, the loop context stack and the set of
/// multi-assign candidates for one body.
///
/// A name is bound either to a producer or to a constant, never both:
/// rebinding one kind clears the other. Reading an unbound name returns
/// `None`; reporting it is left to downstream validation.
#[derive(Debug, Clone, Default)]
pub struct VarEnv {
    variables: HashMap<String, Producer>,
    constants: HashMap<String, Literal>,
    loops: Vec<NodeId>,
    multi_assign: HashSet<String>,
}

impl VarEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, producer: Producer) {
        let name = name.into();
        self.constants.remove(&name);
        self.variables.insert(name, producer);
    }

    pub fn get(&self, name: &str) -> Option<&Producer> {
        self.variables.get(name)
    }

    pub fn set_constant(&mut self, name: impl Into<String>, value: Literal) {
        let name = name.into();
        self.variables.remove(&name);
        self.constants.insert(name, value);
    }

    pub fn get_constant(&self, name: &str) -> Option<&Literal> {
        self.constants.get(name)
    }

    // -------------------------------------------------------------------------
    // Loop context
    // -------------------------------------------------------------------------

    pub fn push_loop(&mut self, node: NodeId) {
        self.loops.push(node);
    }

    pub fn pop_loop(&mut self) -> Option<NodeId> {
        self.loops.pop()
    }

    pub fn current_loop(&self) -> Option<NodeId> {
        self.loops.last().copied()
    }

    // -------------------------------------------------------------------------
    // Local-variable bookkeeping
    // -------------------------------------------------------------------------

    pub fn mark_multi_assign_candidate(&mut self, name: impl Into<String>) {
        self.multi_assign.insert(name.into());
    }

    pub fn is_multi_assign_candidate(&self, name: &str) -> bool {
        self.multi_assign.contains(name)
    }

    /// Records the handle output of the get node synthesized for `name`.
    pub fn set_handle(&mut self, name: &str, handle: Producer) {
        self.variables
            .insert(format!("{LOCAL_HANDLE_PREFIX}{name}"), handle);
    }

    pub fn handle(&self, name: &str) -> Option<&Producer> {
        self.variables.get(&format!("{LOCAL_HANDLE_PREFIX}{name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebinding_switches_between_producer_and_constant() {
        let mut env = VarEnv::new();
        env.set("hp", Producer::new(NodeId(1), "value"));
        assert_eq!(env.get("hp"), Some(&Producer::new(NodeId(1), "value")));

        env.set_constant("hp", Literal::Int(10));
        assert!(env.get("hp").is_none());
        assert_eq!(env.get_constant("hp"), Some(&Literal::Int(10)));

        env.set("hp", Producer::new(NodeId(2), "result"));
        assert!(env.get_constant("hp").is_none());
        assert_eq!(env.get("hp").map(|p| p.node), Some(NodeId(2)));
    }

    #[test]
    fn loop_stack_is_lifo() {
        let mut env = VarEnv::new();
        assert_eq!(env.current_loop(), None);
        env.push_loop(NodeId(3));
        env.push_loop(NodeId(7));
        assert_eq!(env.current_loop(), Some(NodeId(7)));
        assert_eq!(env.pop_loop(), Some(NodeId(7)));
        assert_eq!(env.current_loop(), Some(NodeId(3)));
    }

    #[test]
    fn handles_do_not_shadow_variables() {
        let mut env = VarEnv::new();
        env.set("x", Producer::new(NodeId(4), "value"));
        env.set_handle("x", Producer::new(NodeId(4), "handle"));
        assert_eq!(env.get("x").map(|p| p.port.as_str()), Some("value"));
        assert_eq!(env.handle("x").map(|p| p.port.as_str()), Some("handle"));
        assert!(env.handle("y").is_none());
    }

    #[test]
    fn multi_assign_candidates() {
        let mut env = VarEnv::new();
        env.mark_multi_assign_candidate("total");
        assert!(env.is_multi_assign_candidate("total"));
        assert!(!env.is_multi_assign_candidate("other"));
    }
}
