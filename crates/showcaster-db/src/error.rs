use thiserror::Error;

/// RelStore Gateway (C5) errors: the infrastructure/validation split the spec's
/// "Store" vs "Validation" error kinds build on (§4.5, §7).
#[derive(Error, Debug)]
pub enum DbError {
    #[error("database error: {0}")]
    DatabaseError(#[from] diesel::result::Error),

    #[error("pool error: {0}")]
    PoolError(#[from] diesel_async::pooled_connection::bb8::RunError),

    #[error(transparent)]
    CoreError(#[from] showcaster_core::error::CoreError),
}

pub type DbResult<T> = std::result::Result<T, DbError>;
