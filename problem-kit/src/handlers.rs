//! Failure translation into problem responses
//!
//! Handlers return `Result<T, ApiError>`. [`ApiError`] is a closed set of failure kinds
//! and its `IntoResponse` picks the matching builder:
//!
//! | failure | status | title | type |
//! |---|---|---|---|
//! | [`HttpError`] | kind's status | kind's title | registry URI from the title |
//! | plain status | given status | canonical reason | `about:blank` |
//! | [`ValidationErrors`] | 422 | `Validation Error` | validation registry URI |
//! | unexpected (`anyhow::Error`) | 500 | generic | `about:blank` |
//!
//! Unexpected failures are logged in full and answered with the generic document, so
//! internal error text never reaches the client. The catch-all
//! [`ExceptionLayer`](crate::middleware::ExceptionLayer) uses the same builder.
//!
//! # Example
//!
//! ```rust,no_run
//! use axum::{routing::post, Json, Router};
//! use problem_kit::prelude::*;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct CreateUser {
//!     email: String,
//! }
//!
//! async fn create_user(ValidatedJson(user): ValidatedJson<CreateUser>) -> ApiResult<String> {
//!     if user.email == "taken@example.com" {
//!         return Err(HttpError::already_exists().into());
//!     }
//!     Ok(user.email)
//! }
//!
//! let app: Router = Router::new().route("/users", post(create_user));
//! ```

use std::fmt;

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::http_error::HttpError;
use crate::problem::{ProblemDetails, ProblemDetailsResponse, ABOUT_BLANK};
use crate::validation::{
    ValidationErrors, ValidationIssue, VALIDATION_ERROR_TITLE, VALIDATION_ERROR_TYPE,
};

/// Result type for request handlers
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Failure returned by a request handler
#[derive(Debug, Error)]
pub enum ApiError {
    /// Taxonomy error
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Plain HTTP error without a registry entry
    #[error("{status}")]
    Status {
        status: StatusCode,
        detail: Option<String>,
        headers: Option<HeaderMap>,
    },

    /// Validation error list
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// Anything else
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl ApiError {
    /// Plain HTTP error with the canonical reason as detail
    pub fn status(status: StatusCode) -> Self {
        Self::Status {
            status,
            detail: None,
            headers: None,
        }
    }

    /// Plain HTTP error with an explicit detail
    pub fn status_with_detail(status: StatusCode, detail: impl Into<String>) -> Self {
        Self::Status {
            status,
            detail: Some(detail.into()),
            headers: None,
        }
    }

    /// Wrap any error as an unexpected failure
    pub fn unexpected<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Unexpected(anyhow::Error::new(err))
    }

    /// Status code the response will carry
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Http(err) => err.status_code(),
            Self::Status { status, .. } => *status,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<crate::error::Error> for ApiError {
    fn from(err: crate::error::Error) -> Self {
        Self::unexpected(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => {
                tracing::debug!(error = %err, "Request body failed validation");
                Self::Validation(
                    ValidationErrors::for_subject("request body").with_issue(
                        ValidationIssue::new("json_invalid", err.body_text(), ["body"]),
                    ),
                )
            }
            other => Self::status_with_detail(other.status(), other.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Http(err) => http_error_response(err).into_response(),
            Self::Status {
                status,
                detail,
                headers,
            } => status_error_response(status, detail, headers).into_response(),
            Self::Validation(errors) => validation_error_response(&errors).into_response(),
            Self::Unexpected(err) => unexpected_failure_response(&err).into_response(),
        }
    }
}

/// Generic 500 response for a failure whose details must stay server-side.
///
/// The failure is logged with its full text before the generic document is returned.
pub fn unexpected_failure_response<E>(err: &E) -> ProblemDetailsResponse
where
    E: fmt::Display + fmt::Debug + ?Sized,
{
    tracing::error!(error = %err, details = ?err, "Unhandled error while processing request");
    ProblemDetailsResponse::new(ProblemDetails::internal_server_error())
}

/// Response for a taxonomy error: the kind's status, title and type, the override
/// detail or the default, and the error's headers.
pub fn http_error_response(err: HttpError) -> ProblemDetailsResponse {
    let (kind, detail, headers) = err.into_parts();

    let problem = ProblemDetails::new(kind.title())
        .with_status(kind.status_code())
        .with_type(kind.type_uri())
        .with_detail(detail.unwrap_or_else(|| kind.default_detail().to_string()));

    let response = ProblemDetailsResponse::new(problem);
    match headers {
        Some(headers) => response.with_headers(headers),
        None => response,
    }
}

/// Response for a plain HTTP error: canonical reason as title, `about:blank` type.
pub fn status_error_response(
    status: StatusCode,
    detail: Option<String>,
    headers: Option<HeaderMap>,
) -> ProblemDetailsResponse {
    let title = status.canonical_reason().unwrap_or("Unknown Status");
    let problem = ProblemDetails::new(title)
        .with_status(status)
        .with_type(ABOUT_BLANK)
        .with_detail(detail.unwrap_or_else(|| title.to_string()));

    let response = ProblemDetailsResponse::new(problem);
    match headers {
        Some(headers) => response.with_headers(headers),
        None => response,
    }
}

/// 422 response listing every validation failure.
pub fn validation_error_response(errors: &ValidationErrors) -> ProblemDetailsResponse {
    let problem = ProblemDetails::new(VALIDATION_ERROR_TITLE)
        .with_status(StatusCode::UNPROCESSABLE_ENTITY)
        .with_type(VALIDATION_ERROR_TYPE)
        .with_detail(errors.to_string())
        .with_errors(errors.error_details());

    ProblemDetailsResponse::new(problem)
}

/// JSON body extractor whose rejections are problem responses.
///
/// A body that parses but does not match `T` becomes a 422 validation problem; other
/// rejections (syntax, content type, size) keep their status with an `about:blank` type.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}
