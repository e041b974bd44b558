use thiserror::Error;

/// Rejections raised while building company records.
#[derive(Debug, Error, PartialEq)]
pub enum TrendingError {
    #[error("field `{0}` must not be empty")]
    EmptyField(&'static str),

    #[error("field `{field}` must be non-negative, got {value}")]
    NegativeAmount { field: &'static str, value: f64 },

    #[error("field `{0}` must be a finite number")]
    NonFinite(&'static str),
}

pub type Result<T> = std::result::Result<T, TrendingError>;
