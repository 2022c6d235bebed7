//! Literal values carried in node constant maps.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A constant argument value.
///
/// Serializes untagged so registry and graph JSON read naturally
/// (`1`, `"text"`, `[1, 2]`, `null`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Literal>),
}

impl Literal {
    /// Returns the string payload, if this is a string literal.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns `true` for numeric literals.
    pub fn is_number(&self) -> bool {
        matches!(self, Literal::Int(_) | Literal::Float(_))
    }

    /// Negates a numeric literal; other kinds yield `None`.
    pub fn negated(&self) -> Option<Literal> {
        match self {
            Literal::Int(v) => v.checked_neg().map(Literal::Int),
            Literal::Float(v) => Some(Literal::Float(-v)),
            _ => None,
        }
    }

    /// The text used for this literal when it names a port (case labels).
    pub fn label(&self) -> String {
        match self {
            Literal::Str(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Renders source syntax: `None`, `True`, `3`, `2.5`, `"text"`, `[1, 2]`.
impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::None => write!(f, "None"),
            Literal::Bool(true) => write!(f, "True"),
            Literal::Bool(false) => write!(f, "False"),
            Literal::Int(v) => write!(f, "{v}"),
            Literal::Float(v) => {
                if v.is_finite() && v.fract() == 0.0 {
                    write!(f, "{v:.1}")
                } else {
                    write!(f, "{v}")
                }
            }
            Literal::Str(s) => {
                write!(f, "\"")?;
                for ch in s.chars() {
                    match ch {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        '\n' => write!(f, "\\n")?,
                        '\t' => write!(f, "\\t")?,
                        c => write!(f, "{c}")?,
                    }
                }
                write!(f, "\"")
            }
            Literal::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_renders_source_syntax() {
        assert_eq!(Literal::None.to_string(), "None");
        assert_eq!(Literal::Bool(true).to_string(), "True");
        assert_eq!(Literal::Int(-4).to_string(), "-4");
        assert_eq!(Literal::Float(2.0).to_string(), "2.0");
        assert_eq!(Literal::Float(0.25).to_string(), "0.25");
        assert_eq!(Literal::Str("a\"b".into()).to_string(), r#""a\"b""#);
        assert_eq!(
            Literal::List(vec![Literal::Int(1), Literal::Str("x".into())]).to_string(),
            r#"[1, "x"]"#
        );
    }

    #[test]
    fn label_strips_quotes_from_strings() {
        assert_eq!(Literal::Str("red".into()).label(), "red");
        assert_eq!(Literal::Int(3).label(), "3");
    }

    #[test]
    fn negation_only_applies_to_numbers() {
        assert_eq!(Literal::Int(5).negated(), Some(Literal::Int(-5)));
        assert_eq!(Literal::Float(1.5).negated(), Some(Literal::Float(-1.5)));
        assert_eq!(Literal::Str("x".into()).negated(), None);
    }

    #[test]
    fn untagged_json_shape() {
        let value = Literal::List(vec![Literal::Int(1), Literal::None, Literal::Bool(false)]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, "[1,null,false]");
        let back: Literal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn integers_deserialize_as_int() {
        let back: Literal = serde_json::from_str("7").unwrap();
        assert_eq!(back, Literal::Int(7));
        let back: Literal = serde_json::from_str("7.5").unwrap();
        assert_eq!(back, Literal::Float(7.5));
    }
}
