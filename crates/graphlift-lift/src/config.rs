//! Lifting configuration.

use graphlift_syntax::{Expr, ExprKind};
use serde::{Deserialize, Serialize};

use crate::error::LiftError;

/// Tunables for one lift. Every field has a default, so a config file only
/// needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiftConfig {
    /// Context argument names, bare or as `self.<name>`, skipped when
    /// binding positional arguments.
    pub reserved_arguments: Vec<String>,
    /// Graph-class methods with this prefix become event handlers.
    pub event_method_prefix: String,
    /// Pin declaration helpers inside composite methods.
    pub pin_marker_functions: Vec<String>,
    /// Initial value of the suppress-once flag.
    pub suppress_initial_flow_edge: bool,
}

impl Default for LiftConfig {
    fn default() -> Self {
        LiftConfig {
            reserved_arguments: vec![
                "game".to_string(),
                "owner_entity".to_string(),
                "self".to_string(),
            ],
            event_method_prefix: "on_".to_string(),
            pin_marker_functions: vec![
                "flow_in".to_string(),
                "flow_out".to_string(),
                "data_in".to_string(),
                "data_out".to_string(),
            ],
            suppress_initial_flow_edge: false,
        }
    }
}

impl LiftConfig {
    pub fn from_json(text: &str) -> Result<Self, LiftError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn is_reserved_name(&self, name: &str) -> bool {
        self.reserved_arguments.iter().any(|r| r == name)
    }

    /// `true` for `game`, `self`, `self.game` and the like.
    pub fn is_reserved_argument(&self, expr: &Expr) -> bool {
        match &expr.kind {
            ExprKind::Name(name) => self.is_reserved_name(name),
            _ => expr
                .self_attribute()
                .is_some_and(|attr| self.is_reserved_name(attr)),
        }
    }

    pub fn is_pin_marker(&self, name: &str) -> bool {
        self.pin_marker_functions.iter().any(|m| m == name)
    }

    /// Event name of a graph-class method, if it is an event handler.
    pub fn event_name<'a>(&self, method: &'a str) -> Option<&'a str> {
        method
            .strip_prefix(self.event_method_prefix.as_str())
            .filter(|rest| !rest.is_empty())
    }
}
