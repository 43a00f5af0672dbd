//! Unified API error type, convertible to an HTTP status code and mapped
//! from the core's `SimError` taxonomy (§7).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{OutputError, SimError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    #[cfg(feature = "http")]
    pub fn to_http_status(&self) -> axum::http::StatusCode {
        match self.code.as_str() {
            "NOT_FOUND" => axum::http::StatusCode::NOT_FOUND,
            "NOT_READY" => axum::http::StatusCode::CONFLICT,
            "VALIDATION_ERROR" | "BAD_REQUEST" => axum::http::StatusCode::BAD_REQUEST,
            "RATE_LIMIT_EXCEEDED" => axum::http::StatusCode::TOO_MANY_REQUESTS,
            _ => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<SimError> for ApiError {
    fn from(err: SimError) -> Self {
        match &err {
            SimError::Validation(_) => ApiError::new("VALIDATION_ERROR", err.to_string()),
            SimError::NotFound(_) => ApiError::new("NOT_FOUND", err.to_string()),
            SimError::NotReady(_) => ApiError::new("NOT_READY", err.to_string()),
            SimError::Output(OutputError::Encryption(_)) => {
                ApiError::new("INTERNAL_ERROR", err.sanitized_message())
            }
            _ => ApiError::new("INTERNAL_ERROR", err.sanitized_message()),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
