//! RFC 7807 problem details: wire model and response type
//!
//! Every failure that reaches the HTTP boundary is rendered as a [`ProblemDetails`]
//! document and sent with `Content-Type: application/problem+json`.
//!
//! ```rust
//! use axum::http::StatusCode;
//! use problem_kit::problem::{ErrorDetail, ProblemDetails};
//!
//! let problem = ProblemDetails::new("Not Found")
//!     .with_status(StatusCode::NOT_FOUND)
//!     .with_detail("No user with id 42")
//!     .with_errors(vec![ErrorDetail::new("[missing] user", Some("/id".to_string()))]);
//!
//! assert_eq!(problem.status, StatusCode::NOT_FOUND);
//! assert_eq!(problem.type_uri, "about:blank");
//! ```

use std::fmt;
use std::future::Future;

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::{future::BoxFuture, StreamExt};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Media type of every problem response.
pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";

/// Problem type used when no registry entry describes the failure.
pub const ABOUT_BLANK: &str = "about:blank";

/// Title of the generic document returned for unexpected failures.
pub const HTTP_500_TITLE: &str = "Internal Server Error";

/// Detail of the generic document returned for unexpected failures.
pub const HTTP_500_DETAIL: &str = "An unexpected error occurred while processing the request";

fn serialize_status<S>(status: &StatusCode, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u16(status.as_u16())
}

fn deserialize_status<'de, D>(deserializer: D) -> Result<StatusCode, D::Error>
where
    D: Deserializer<'de>,
{
    let code = u16::deserialize(deserializer)?;
    StatusCode::from_u16(code).map_err(serde::de::Error::custom)
}

fn default_type() -> String {
    ABOUT_BLANK.to_string()
}

fn default_status() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

/// A single field-level failure inside a problem document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Human-readable description of the failure
    pub detail: String,
    /// JSON-pointer-like location of the offending field, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,
}

impl ErrorDetail {
    /// Create a new error detail
    pub fn new(detail: impl Into<String>, pointer: Option<String>) -> Self {
        Self {
            detail: detail.into(),
            pointer,
        }
    }
}

/// Problem details document.
///
/// `status` is stored as a [`StatusCode`] so it is always a valid HTTP status,
/// and serialized as a plain integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub struct ProblemDetails {
    /// URI identifying the problem type, `about:blank` when unspecified
    #[serde(rename = "type", default = "default_type")]
    pub type_uri: String,
    /// HTTP status code of this occurrence
    #[serde(
        serialize_with = "serialize_status",
        deserialize_with = "deserialize_status",
        default = "default_status"
    )]
    pub status: StatusCode,
    /// Short human-readable summary
    pub title: String,
    /// Longer explanation specific to this occurrence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Per-field failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ErrorDetail>>,
}

impl ProblemDetails {
    /// Create a document with the given title, status 500 and type `about:blank`.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            type_uri: default_type(),
            status: default_status(),
            title: title.into(),
            detail: None,
            errors: None,
        }
    }

    /// The generic document for failures whose details must not reach the client.
    pub fn internal_server_error() -> Self {
        Self::new(HTTP_500_TITLE)
            .with_status(StatusCode::INTERNAL_SERVER_ERROR)
            .with_detail(HTTP_500_DETAIL)
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_type(mut self, type_uri: impl Into<String>) -> Self {
        self.type_uri = type_uri.into();
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_errors(mut self, errors: Vec<ErrorDetail>) -> Self {
        self.errors = Some(errors);
        self
    }
}

/// Side effect attached to a problem response.
///
/// The task is spawned on the current tokio runtime when the response body has been
/// fully read or dropped, i.e. after the client was answered or went away. Attaching a
/// task turns the body into a stream, so such responses carry no `Content-Length`.
pub struct BackgroundTask(BoxFuture<'static, ()>);

impl BackgroundTask {
    /// Wrap a future to be run after the response is built
    pub fn new<F>(task: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self(Box::pin(task))
    }

    fn spawn(self) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(self.0);
            }
            Err(e) => {
                tracing::warn!(error = %e, "No async runtime available, dropping background task");
            }
        }
    }
}

/// Spawns the held task when dropped together with the body stream that owns it
struct SpawnOnDrop(Option<BackgroundTask>);

impl Drop for SpawnOnDrop {
    fn drop(&mut self) {
        if let Some(task) = self.0.take() {
            task.spawn();
        }
    }
}

fn run_after_body(response: Response, task: BackgroundTask) -> Response {
    let guard = SpawnOnDrop(Some(task));
    response.map(|body| {
        Body::from_stream(body.into_data_stream().map(move |chunk| {
            let _guard = &guard;
            chunk
        }))
    })
}

impl fmt::Debug for BackgroundTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BackgroundTask")
    }
}

/// HTTP response carrying a [`ProblemDetails`] body.
///
/// The status line always equals the document's `status`, and `Content-Type` is
/// always `application/problem+json`, whatever the caller-supplied headers say.
/// Other caller headers are passed through unchanged.
#[derive(Debug)]
#[must_use]
pub struct ProblemDetailsResponse {
    problem: ProblemDetails,
    headers: HeaderMap,
    background: Option<BackgroundTask>,
}

impl ProblemDetailsResponse {
    pub fn new(problem: ProblemDetails) -> Self {
        Self {
            problem,
            headers: HeaderMap::new(),
            background: None,
        }
    }

    /// Merge extra response headers; later values replace earlier ones per name.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn with_background(mut self, task: BackgroundTask) -> Self {
        self.background = Some(task);
        self
    }

    pub fn problem(&self) -> &ProblemDetails {
        &self.problem
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn background(&self) -> Option<&BackgroundTask> {
        self.background.as_ref()
    }
}

impl From<ProblemDetails> for ProblemDetailsResponse {
    fn from(problem: ProblemDetails) -> Self {
        Self::new(problem)
    }
}

impl IntoResponse for ProblemDetails {
    fn into_response(self) -> Response {
        ProblemDetailsResponse::new(self).into_response()
    }
}

impl IntoResponse for ProblemDetailsResponse {
    fn into_response(self) -> Response {
        let status = self.problem.status;
        let mut response = (status, Json(self.problem)).into_response();

        let headers = response.headers_mut();
        headers.extend(self.headers);
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(APPLICATION_PROBLEM_JSON),
        );

        match self.background {
            Some(task) => run_after_body(response, task),
            None => response,
        }
    }
}
