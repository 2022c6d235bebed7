use graphlift_core::CoreError;
use graphlift_syntax::ParseError;
use thiserror::Error;

/// Unit-level failures. Statement-level problems are diagnostics, not errors.
#[derive(Debug, Error)]
pub enum LiftError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("no graph class found in module")]
    NoGraphClass,

    #[error("no class decorated with @composite_class found in module")]
    NoCompositeClass,

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}
