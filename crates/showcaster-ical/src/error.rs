use thiserror::Error;

/// Codec and recurrence-expansion errors.
#[derive(Error, Debug)]
pub enum IcalError {
    #[error("parse error: {0}")]
    ParseError(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("rrule validation error: {0}")]
    RRuleValidationError(#[from] rrule::ValidationError),

    #[error(transparent)]
    CoreError(#[from] showcaster_core::error::CoreError),
}

pub type IcalResult<T> = std::result::Result<T, IcalError>;
