use thiserror::Error;

/// Core-level errors: malformed domain values caught before they reach a store.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(&'static str),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
