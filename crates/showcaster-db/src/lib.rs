//! C5 RelStore Gateway: a typed wrapper around the relational half of Show/Event
//! (identity, type, ownership) with transaction scopes, count/find/create/update/delete,
//! and the multi-row operations the Show Coordinator needs for a rename cascade.

pub mod db;
pub mod error;
pub mod filter;
pub mod gateway;
pub mod model;
pub mod schema;

pub use db::connection::{DbConnection, DbPool, create_pool};
pub use db::transaction::with_transaction;
pub use error::{DbError, DbResult};
