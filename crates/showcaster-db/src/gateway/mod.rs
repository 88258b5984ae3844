//! C5 RelStore Gateway: typed CRUD against the `shows`/`events` tables. Each module
//! exposes free functions taking a borrowed connection, so callers control the
//! transaction scope (see [`crate::db::transaction::with_transaction`]).

pub mod event;
pub mod show;
