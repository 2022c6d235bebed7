//! Re-lowering options.

use graphlift_syntax::Expr;
use serde::{Deserialize, Serialize};

/// How re-lowered source is shaped. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodegenOptions {
    /// Passed as the first argument of every call, e.g. `self.game`.
    pub context_argument: Option<String>,
    /// Spaces per indentation level.
    pub indent: usize,
    /// Prefix of event-handler method names.
    pub event_method_prefix: String,
    /// `__init__` parameters, each stored as `self.<name>`.
    pub init_arguments: Vec<String>,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        CodegenOptions {
            context_argument: Some("self.game".to_string()),
            indent: 4,
            event_method_prefix: "on_".to_string(),
            init_arguments: vec!["game".to_string(), "owner_entity".to_string()],
        }
    }
}

impl CodegenOptions {
    /// The context argument as an expression: `self.game` becomes an
    /// attribute access on `self`.
    pub fn context_expr(&self) -> Option<Expr> {
        let text = self.context_argument.as_deref()?;
        let mut parts = text.split('.').filter(|part| !part.is_empty());
        let head = Expr::name(parts.next()?);
        Some(parts.fold(head, |expr, part| Expr::attribute(expr, part)))
    }
}
