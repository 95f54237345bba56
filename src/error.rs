use thiserror::Error;

/// Errors raised while selecting stars from a [`DataSource`](crate::data::source::DataSource).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SelectError {
    #[error("column '{0}' not found in data source")]
    MissingColumn(String),

    #[error("column '{column}' has {found} rows, expected {expected}")]
    ShapeMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("row {index} is out of range for column '{column}' of {len} rows")]
    RowOutOfRange {
        column: String,
        index: usize,
        len: usize,
    },

    #[error("column '{column}' holds {kind} values, expected numbers")]
    NotNumeric { column: String, kind: &'static str },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, SelectError>;
