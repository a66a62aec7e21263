use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown engine type tag: {0}")]
    UnknownTypeTag(String),

    #[error("Row {row} has {found} values but the schema has {expected} columns")]
    ArityMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Cannot coerce value {value} in column '{column}' (row {row})")]
    Coercion {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Polars error: {0}")]
    Polars(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<polars::error::PolarsError> for EvalError {
    fn from(err: polars::error::PolarsError) -> Self {
        EvalError::Polars(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EvalError>;
