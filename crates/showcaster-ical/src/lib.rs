pub mod codec;
pub mod error;
pub mod expand;
pub mod model;

pub use codec::{decode, encode};
pub use error::{IcalError, IcalResult};
pub use expand::expand;
pub use model::CalEvent;
