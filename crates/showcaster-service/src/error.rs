use thiserror::Error;

use crate::calstore::CalStoreError;

/// Error taxonomy for the Event/Show Coordinators (§7): every other layer's error
/// is absorbed into one of these five kinds so the HTTP boundary can map them to
/// status codes (`validation`→400, `not-found`→404, `store`/`calendar`→502, else 500)
/// without re-deriving the mapping here.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("store error: {0}")]
    Store(#[from] showcaster_db::error::DbError),

    #[error("calendar error: {0}")]
    Calendar(#[from] CalStoreError),

    #[error("invariant violation: {0}")]
    InvariantViolation(&'static str),

    #[error(transparent)]
    Core(#[from] showcaster_core::error::CoreError),

    #[error("diesel error: {0}")]
    Diesel(#[from] diesel::result::Error),
}

impl From<showcaster_ical::IcalError> for ServiceError {
    fn from(err: showcaster_ical::IcalError) -> Self {
        match err {
            showcaster_ical::IcalError::ParseError(msg) => Self::Calendar(CalStoreError::Xml(msg)),
            showcaster_ical::IcalError::ValidationError(msg) => Self::Validation(msg),
            showcaster_ical::IcalError::RRuleValidationError(err) => {
                Self::Validation(err.to_string())
            }
            showcaster_ical::IcalError::CoreError(err) => Self::Core(err),
        }
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
