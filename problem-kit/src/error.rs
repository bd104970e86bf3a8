//! Framework error type
//!
//! These are failures of the crate's own plumbing (loading configuration, binding and
//! serving). Handler failures use [`ApiError`](crate::handlers::ApiError) instead.

use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::handlers::unexpected_failure_response;

/// Result type alias using the framework error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the framework
///
/// Large error variants are boxed to reduce stack size
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

/// Framework errors never carry client-facing detail: they render as the generic 500.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        unexpected_failure_response(&self).into_response()
    }
}
