//! Wire-format models shared by every transport built on the core (§6).

pub mod errors;
pub mod requests;
pub mod responses;

pub use errors::{ApiError, ApiResult};
pub use requests::*;
pub use responses::*;
