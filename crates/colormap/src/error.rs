use thiserror::Error;

#[derive(Error, Debug)]
pub enum StyleError {
    #[error("Invalid hex color '{0}'")]
    InvalidHex(String),

    #[error("A palette needs at least one color")]
    EmptyPalette,

    #[error("Unknown style operator '{0}'")]
    UnknownOperator(String),

    #[error("Operator '{op}' expects {expected} arguments, got {found}")]
    Arity {
        op: String,
        expected: &'static str,
        found: usize,
    },

    #[error("Invalid style expression: {0}")]
    InvalidExpression(String),

    #[error("Band {band} referenced, {available} bands available (plus alpha)")]
    BandOutOfRange { band: usize, available: usize },

    #[error("Input bands differ in size: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StyleError>;
