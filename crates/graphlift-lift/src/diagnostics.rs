//! Statement-level diagnostics.
//!
//! Nothing that goes wrong inside a single statement aborts a lift. The
//! lifter reports it through a [`DiagnosticSink`] and keeps going; severity
//! is decided downstream.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Callee name not in the registry.
    UnresolvedCall,
    /// `break` outside any loop.
    MalformedBreak,
    /// Match over a composite call whose cases do not line up with its exits.
    AmbiguousMatchDispatch,
    /// A virtual pin with no anchor; marked as permitted unmapped.
    UnmappedPin,
    NativeMethodCall,
    UnsupportedStatement,
    UnsupportedExpression,
    LiteralAssignment,
    UnknownPort,
    DuplicateDataInput,
    TooManyVariadicArguments,
    NestedFlowCall,
    MissingFlowPort,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::UnresolvedCall => "unresolved_call",
            DiagnosticKind::MalformedBreak => "malformed_break",
            DiagnosticKind::AmbiguousMatchDispatch => "ambiguous_match_dispatch",
            DiagnosticKind::UnmappedPin => "unmapped_pin",
            DiagnosticKind::NativeMethodCall => "native_method_call",
            DiagnosticKind::UnsupportedStatement => "unsupported_statement",
            DiagnosticKind::UnsupportedExpression => "unsupported_expression",
            DiagnosticKind::LiteralAssignment => "literal_assignment",
            DiagnosticKind::UnknownPort => "unknown_port",
            DiagnosticKind::DuplicateDataInput => "duplicate_data_input",
            DiagnosticKind::TooManyVariadicArguments => "too_many_variadic_arguments",
            DiagnosticKind::NestedFlowCall => "nested_flow_call",
            DiagnosticKind::MissingFlowPort => "missing_flow_port",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Diagnostic {
            kind,
            line: None,
            message: message.into(),
        }
    }

    pub fn at(mut self, line: u32) -> Self {
        if line > 0 {
            self.line = Some(line);
        }
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {line}: [{}] {}", self.kind, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

/// Receiver for diagnostics raised while lifting.
pub trait DiagnosticSink {
    fn warn(&mut self, diagnostic: Diagnostic);
}

/// Collects diagnostics in order and mirrors each one to `tracing`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.items.iter().filter(|d| d.kind == kind).count()
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> Vec<&Diagnostic> {
        self.items.iter().filter(|d| d.kind == kind).collect()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

/// Appends already-reported diagnostics without logging them again.
impl Extend<Diagnostic> for Diagnostics {
    fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

impl DiagnosticSink for Diagnostics {
    fn warn(&mut self, diagnostic: Diagnostic) {
        tracing::warn!(
            kind = diagnostic.kind.as_str(),
            line = ?diagnostic.line,
            "{}",
            diagnostic.message
        );
        self.items.push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collector_keeps_order_and_counts() {
        let mut sink = Diagnostics::new();
        sink.warn(Diagnostic::new(DiagnosticKind::UnresolvedCall, "no node named 'foo'").at(3));
        sink.warn(Diagnostic::new(DiagnosticKind::MalformedBreak, "break outside loop"));
        sink.warn(Diagnostic::new(DiagnosticKind::UnresolvedCall, "no node named 'bar'").at(0));

        assert_eq!(sink.len(), 3);
        assert_eq!(sink.count(DiagnosticKind::UnresolvedCall), 2);
        let unresolved = sink.of_kind(DiagnosticKind::UnresolvedCall);
        assert_eq!(unresolved[0].line, Some(3));
        assert_eq!(unresolved[1].line, None);
    }

    #[test]
    fn display_includes_line_and_kind() {
        let diagnostic = Diagnostic::new(DiagnosticKind::MalformedBreak, "break outside loop").at(7);
        assert_eq!(
            diagnostic.to_string(),
            "line 7: [malformed_break] break outside loop"
        );
    }

    #[test]
    fn serializes_as_plain_list() {
        let mut sink = Diagnostics::new();
        sink.warn(Diagnostic::new(DiagnosticKind::UnknownPort, "no port 'x'").at(2));
        insta::assert_json_snapshot!(sink, @r#"
        [
          {
            "kind": "unknown_port",
            "line": 2,
            "message": "no port 'x'"
          }
        ]
        "#);
    }
}
