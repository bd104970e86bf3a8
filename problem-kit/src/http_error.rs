//! Closed taxonomy of application-level HTTP errors
//!
//! Each [`ErrorKind`] binds a fixed status code, title and default detail. An
//! [`HttpError`] is one occurrence of a kind, optionally carrying a detail override
//! and extra response headers.
//!
//! The problem `type` of a kind is derived from its title: lower-cased, spaces
//! replaced by hyphens, placed under the problems registry. The derivation is part
//! of the wire contract and must not change.
//!
//! # Example
//!
//! ```rust
//! use problem_kit::http_error::{ErrorKind, HttpError};
//!
//! let err = HttpError::not_found().with_detail("No user with id 42");
//! assert_eq!(err.kind(), ErrorKind::NotFound);
//! assert_eq!(err.status_code().as_u16(), 404);
//! assert_eq!(
//!     err.type_uri(),
//!     "https://problems-registry.smartbear.com/not-found/"
//! );
//! ```

use std::fmt;

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

/// Base URL of the problem type registry
pub const PROBLEMS_REGISTRY: &str = "https://problems-registry.smartbear.com";

/// Derive the registry slug for a problem title ("Not Found" -> "not-found").
pub fn problem_slug(title: &str) -> String {
    title.to_lowercase().replace(' ', "-")
}

/// Derive the registry type URI for a problem title.
pub fn problem_type_uri(title: &str) -> String {
    format!("{}/{}/", PROBLEMS_REGISTRY, problem_slug(title))
}

/// Kind of application error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The resource to create already exists (409)
    AlreadyExists,
    /// The request is invalid and unprocessable (422)
    ValidationError,
    /// The request failed business rule checks (422)
    BusinessRuleViolation,
    /// The resource does not exist (404)
    NotFound,
    /// Credentials are missing or malformed (401)
    Unauthorized,
    /// The request is not allowed for the resource (403)
    Forbidden,
    /// The request is malformed (400)
    BadRequest,
    /// A dependency is unavailable (503)
    ServiceUnavailable,
    /// Generic server failure (500)
    ServerError,
}

impl ErrorKind {
    /// Every kind, in declaration order
    pub const ALL: [ErrorKind; 9] = [
        Self::AlreadyExists,
        Self::ValidationError,
        Self::BusinessRuleViolation,
        Self::NotFound,
        Self::Unauthorized,
        Self::Forbidden,
        Self::BadRequest,
        Self::ServiceUnavailable,
        Self::ServerError,
    ];

    /// HTTP status code for this kind
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::AlreadyExists => StatusCode::CONFLICT,
            Self::ValidationError | Self::BusinessRuleViolation => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short human-readable title
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::AlreadyExists => "Already Exists",
            Self::ValidationError => "Validation Error",
            Self::BusinessRuleViolation => "Business Rule Violation",
            Self::NotFound => "Not Found",
            Self::Unauthorized => "Unauthorized",
            Self::Forbidden => "Forbidden",
            Self::BadRequest => "Bad Request",
            Self::ServiceUnavailable => "Service Unavailable",
            Self::ServerError => "Server Error",
        }
    }

    /// Detail used when the caller supplies none
    #[must_use]
    pub const fn default_detail(&self) -> &'static str {
        match self {
            Self::AlreadyExists => {
                "The request attempted to create a resource that already exists"
            }
            Self::ValidationError => "The request is invalid and deemed unprocessable",
            Self::BusinessRuleViolation => {
                "The request is deemed invalid as it failed business rule checks"
            }
            Self::NotFound => "The requested resource could not be found",
            Self::Unauthorized => "The client request missed or malformed its credentials",
            Self::Forbidden => "The request is not authorized for the resource",
            Self::BadRequest => "The client request is invalid or malformed",
            Self::ServiceUnavailable => "The requested service is currently unavailable",
            Self::ServerError => "The server encountered an unexpected error",
        }
    }

    /// Registry slug derived from the title
    #[must_use]
    pub fn slug(&self) -> String {
        problem_slug(self.title())
    }

    /// Problem type URI derived from the title
    #[must_use]
    pub fn type_uri(&self) -> String {
        problem_type_uri(self.title())
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// An occurrence of an [`ErrorKind`].
///
/// Built where a handler detects the failure and consumed once when the response is
/// produced. `Unauthorized` always starts with `WWW-Authenticate: Bearer`; headers
/// merged later with [`HttpError::with_headers`] win for the same name.
#[derive(Debug, Clone)]
#[must_use]
pub struct HttpError {
    kind: ErrorKind,
    detail: Option<String>,
    headers: Option<HeaderMap>,
}

impl HttpError {
    /// Create an error of the given kind with the default detail
    pub fn new(kind: ErrorKind) -> Self {
        let headers = match kind {
            ErrorKind::Unauthorized => {
                let mut headers = HeaderMap::new();
                headers.insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                Some(headers)
            }
            _ => None,
        };

        Self {
            kind,
            detail: None,
            headers,
        }
    }

    pub fn already_exists() -> Self {
        Self::new(ErrorKind::AlreadyExists)
    }

    pub fn validation_error() -> Self {
        Self::new(ErrorKind::ValidationError)
    }

    pub fn business_rule_violation() -> Self {
        Self::new(ErrorKind::BusinessRuleViolation)
    }

    pub fn not_found() -> Self {
        Self::new(ErrorKind::NotFound)
    }

    pub fn unauthorized() -> Self {
        Self::new(ErrorKind::Unauthorized)
    }

    pub fn forbidden() -> Self {
        Self::new(ErrorKind::Forbidden)
    }

    pub fn bad_request() -> Self {
        Self::new(ErrorKind::BadRequest)
    }

    pub fn service_unavailable() -> Self {
        Self::new(ErrorKind::ServiceUnavailable)
    }

    pub fn server_error() -> Self {
        Self::new(ErrorKind::ServerError)
    }

    /// Override the default detail. An empty string keeps the default.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        self.detail = (!detail.is_empty()).then_some(detail);
        self
    }

    /// Merge extra response headers
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.get_or_insert_with(HeaderMap::new).extend(headers);
        self
    }

    /// Add a single response header; invalid values are ignored
    pub fn with_header(mut self, name: header::HeaderName, value: &str) -> Self {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.get_or_insert_with(HeaderMap::new).insert(name, value);
            }
            Err(e) => {
                tracing::warn!(header = %name, error = %e, "Ignoring invalid header value");
            }
        }
        self
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.kind.status_code()
    }

    #[must_use]
    pub fn title(&self) -> &'static str {
        self.kind.title()
    }

    /// The override if one was supplied, else the kind's default
    #[must_use]
    pub fn detail(&self) -> &str {
        self.detail
            .as_deref()
            .unwrap_or_else(|| self.kind.default_detail())
    }

    #[must_use]
    pub fn type_uri(&self) -> String {
        self.kind.type_uri()
    }

    /// Extra response headers, `None` if none were ever supplied
    #[must_use]
    pub fn headers(&self) -> Option<&HeaderMap> {
        self.headers.as_ref()
    }

    pub(crate) fn into_parts(self) -> (ErrorKind, Option<String>, Option<HeaderMap>) {
        (self.kind, self.detail, self.headers)
    }
}

impl From<ErrorKind> for HttpError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {}",
            self.status_code().as_u16(),
            self.title(),
            self.detail()
        )
    }
}

impl std::error::Error for HttpError {}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        crate::handlers::http_error_response(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderName;

    #[test]
    fn test_server_error_defaults() {
        let err = HttpError::server_error();
        let detail = "The server encountered an unexpected error";

        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.title(), "Server Error");
        assert_eq!(err.detail(), detail);
        assert_eq!(
            err.type_uri(),
            "https://problems-registry.smartbear.com/server-error/"
        );
        assert_eq!(err.to_string(), format!("500 Server Error: {}", detail));
        assert!(err.headers().is_none());
    }

    #[test]
    fn test_status_codes() {
        let expected = [
            (ErrorKind::AlreadyExists, 409),
            (ErrorKind::ValidationError, 422),
            (ErrorKind::BusinessRuleViolation, 422),
            (ErrorKind::NotFound, 404),
            (ErrorKind::Unauthorized, 401),
            (ErrorKind::Forbidden, 403),
            (ErrorKind::BadRequest, 400),
            (ErrorKind::ServiceUnavailable, 503),
            (ErrorKind::ServerError, 500),
        ];

        for (kind, status) in expected {
            assert_eq!(kind.status_code().as_u16(), status, "{:?}", kind);
        }
    }

    #[test]
    fn test_default_detail_without_override() {
        for kind in ErrorKind::ALL {
            let err = HttpError::new(kind);
            assert_eq!(err.detail(), kind.default_detail());
        }
    }

    #[test]
    fn test_override_detail() {
        for kind in ErrorKind::ALL {
            let err = HttpError::new(kind).with_detail("something went wrong");
            assert_eq!(err.detail(), "something went wrong");
        }
    }

    #[test]
    fn test_empty_override_keeps_default() {
        let err = HttpError::not_found().with_detail("");
        assert_eq!(err.detail(), ErrorKind::NotFound.default_detail());
    }

    #[test]
    fn test_slug_derivation() {
        assert_eq!(problem_slug("Not Found"), "not-found");
        assert_eq!(problem_slug("Business Rule Violation"), "business-rule-violation");
        assert_eq!(problem_slug("Not Found"), problem_slug("Not Found"));
        assert_eq!(
            ErrorKind::ServiceUnavailable.type_uri(),
            "https://problems-registry.smartbear.com/service-unavailable/"
        );
        assert_eq!(
            ErrorKind::AlreadyExists.type_uri(),
            "https://problems-registry.smartbear.com/already-exists/"
        );
    }

    #[test]
    fn test_type_uris_are_unique_per_title() {
        let mut uris: Vec<String> = ErrorKind::ALL.iter().map(ErrorKind::type_uri).collect();
        uris.sort();
        uris.dedup();
        assert_eq!(uris.len(), ErrorKind::ALL.len());
    }

    #[test]
    fn test_caller_headers_are_kept() {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("meaning-of-life"),
            HeaderValue::from_static("42"),
        );
        headers.insert(HeaderName::from_static("foo"), HeaderValue::from_static("bar"));

        let err = HttpError::bad_request().with_headers(headers);
        let headers = err.headers().unwrap();

        assert_eq!(headers["meaning-of-life"], "42");
        assert_eq!(headers["foo"], "bar");
    }

    #[test]
    fn test_empty_headers_are_some() {
        let err = HttpError::forbidden().with_headers(HeaderMap::new());
        assert!(err.headers().unwrap().is_empty());
    }

    #[test]
    fn test_unauthorized_always_has_bearer_challenge() {
        let mut other = HeaderMap::new();
        other.insert(
            HeaderName::from_static("meaning-of-life"),
            HeaderValue::from_static("42"),
        );

        let mut with_bearer = HeaderMap::new();
        with_bearer.insert(HeaderName::from_static("foo"), HeaderValue::from_static("bar"));
        with_bearer.insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));

        let cases = [
            HttpError::unauthorized(),
            HttpError::unauthorized().with_headers(HeaderMap::new()),
            HttpError::unauthorized().with_headers(other),
            HttpError::unauthorized().with_headers(with_bearer),
        ];

        for err in cases {
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
            assert_eq!(err.headers().unwrap()[header::WWW_AUTHENTICATE], "Bearer");
        }
    }

    #[test]
    fn test_unauthorized_caller_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::WWW_AUTHENTICATE,
            HeaderValue::from_static("Bearer realm=\"api\""),
        );
        headers.insert(HeaderName::from_static("foo"), HeaderValue::from_static("bar"));

        let err = HttpError::unauthorized().with_headers(headers);
        let headers = err.headers().unwrap();

        assert_eq!(headers[header::WWW_AUTHENTICATE], "Bearer realm=\"api\"");
        assert_eq!(headers.get_all(header::WWW_AUTHENTICATE).iter().count(), 1);
        assert_eq!(headers["foo"], "bar");
    }

    #[test]
    fn test_with_header_ignores_invalid_value() {
        let err = HttpError::bad_request().with_header(HeaderName::from_static("x-bad"), "a\nb");
        assert!(err.headers().is_none());

        let err = HttpError::bad_request().with_header(HeaderName::from_static("x-ok"), "fine");
        assert_eq!(err.headers().unwrap()["x-ok"], "fine");
    }

    #[test]
    fn test_unauthorized_defaults() {
        let err = HttpError::unauthorized();
        assert_eq!(err.title(), "Unauthorized");
        assert_eq!(
            err.detail(),
            "The client request missed or malformed its credentials"
        );
    }
}
