//! # problem-kit
//!
//! RFC 7807 problem-details error responses and request metadata middleware for axum
//! services.
//!
//! ## Features
//!
//! - **Problem details**: every failure reaching the HTTP boundary becomes an
//!   `application/problem+json` document with `type`, `status`, `title`, `detail` and
//!   optional per-field `errors`
//! - **Error taxonomy**: a closed set of named client/server errors with fixed status,
//!   title, default detail and registry `type` URI
//! - **Validation errors**: error lists translated into a 422 with one entry per field
//! - **Request metadata**: `X-Correlation-ID`, `X-Request-ID` and `X-Process-Time`
//!   middlewares, with accessors that recover the ids outside the handler
//! - **Safety net**: an outermost layer that turns panics into the generic 500 document
//!
//! ## Example
//!
//! ```rust,no_run
//! use problem_kit::prelude::*;
//!
//! async fn find_user(Path(id): Path<u64>) -> ApiResult<String> {
//!     if id == 0 {
//!         return Err(HttpError::not_found()
//!             .with_detail(format!("No user with id {id}"))
//!             .into());
//!     }
//!     Ok(format!("user {id}"))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let app = Router::new().route("/users/{id}", get(find_user));
//!
//!     Server::new(config).serve(app).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod http_error;
pub mod middleware;
pub mod observability;
pub mod problem;
pub mod server;
pub mod time;
pub mod validation;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use error::{Error, Result};
pub use handlers::{ApiError, ApiResult};
pub use http_error::{ErrorKind, HttpError};
pub use problem::{ErrorDetail, ProblemDetails, ProblemDetailsResponse};
pub use server::Server;
pub use validation::{ValidationErrors, ValidationIssue};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, MiddlewareConfig, ServiceConfig};
    pub use crate::context::{
        current_correlation_id, current_request_id, get_correlation_id, get_request_id,
        CorrelationIdHeader, RequestContext, RequestIdHeader, CORRELATION_ID,
        CORRELATION_ID_HEADER, REQUEST_ID, REQUEST_ID_HEADER,
    };
    pub use crate::error::{Error, Result};
    pub use crate::handlers::{ApiError, ApiResult, ValidatedJson};
    pub use crate::http_error::{ErrorKind, HttpError};
    pub use crate::middleware::{apply_middleware, ExceptionLayer, PROCESS_TIME_HEADER};
    pub use crate::observability::init_tracing;
    pub use crate::problem::{
        BackgroundTask, ErrorDetail, ProblemDetails, ProblemDetailsResponse,
        APPLICATION_PROBLEM_JSON,
    };
    pub use crate::server::Server;
    pub use crate::time::{dt_to_utc_str, utc_now, utc_now_str};
    pub use crate::validation::{LocSegment, ValidationErrors, ValidationIssue};

    pub use axum::{
        extract::{Path, Query, State},
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::{delete, get, patch, post, put},
        Json, Router,
    };
}
