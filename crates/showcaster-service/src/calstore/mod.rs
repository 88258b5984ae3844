pub mod client;
pub mod error;

pub use client::CalStoreClient;
pub use error::{CalStoreError, CalStoreResult};
