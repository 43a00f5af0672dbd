//! API layer for the casualty-generation service: wire models shared across
//! transports, plus the REST transport itself (§6).

#[cfg(feature = "http")]
pub mod middleware;
pub mod models;
#[cfg(feature = "http")]
pub mod rest;

pub use models::{ApiError, ApiResult};
