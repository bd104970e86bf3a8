//! Request-scoped identifiers and the accessors that read them back
//!
//! The tagging middlewares stash a [`RequestContext`] in the request extensions and run the
//! rest of the chain inside the [`CORRELATION_ID`] / [`REQUEST_ID`] task-local scopes.
//! Handlers can take the context directly as an extractor; code holding only a request
//! handle, or nothing at all, uses [`get_correlation_id`] / [`get_request_id`].
//!
//! Lookup order of both accessors:
//! 1. the value stashed on the request's [`RequestContext`]
//! 2. the raw inbound header
//! 3. the ambient task-local, if one was passed
//!
//! ```rust
//! use axum::http::Request;
//! use problem_kit::context::{get_correlation_id, CORRELATION_ID};
//!
//! let request = Request::builder()
//!     .header("x-correlation-id", "abc-123")
//!     .body(())
//!     .unwrap();
//!
//! assert_eq!(
//!     get_correlation_id(Some(&request), Some(&CORRELATION_ID)).as_deref(),
//!     Some("abc-123")
//! );
//! assert_eq!(get_correlation_id::<Request<()>>(None, None), None);
//! ```

use std::convert::Infallible;
use std::time::Instant;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, Extensions, HeaderMap, Request},
};
use tokio::task::LocalKey;

/// Correlation id header, inbound and outbound
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Request id header, inbound and outbound
pub const REQUEST_ID_HEADER: &str = "x-request-id";

tokio::task_local! {
    /// Correlation id of the request being served by the current task
    pub static CORRELATION_ID: String;

    /// Request id of the request being served by the current task
    pub static REQUEST_ID: String;
}

/// Per-request metadata recorded by the tagging middlewares.
///
/// Stored as a request extension; each middleware fills in its own field.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    correlation_id: Option<String>,
    request_id: Option<String>,
    started_at: Option<Instant>,
}

impl RequestContext {
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// When the process-time middleware started its clock
    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    pub(crate) fn set_correlation_id(&mut self, id: String) {
        self.correlation_id = Some(id);
    }

    pub(crate) fn set_request_id(&mut self, id: String) {
        self.request_id = Some(id);
    }

    pub(crate) fn set_started_at(&mut self, at: Instant) {
        self.started_at = Some(at);
    }

    /// Modify the context stored in `extensions`, creating it first if missing.
    pub(crate) fn update(extensions: &mut Extensions, f: impl FnOnce(&mut RequestContext)) {
        let mut context = extensions.get::<RequestContext>().cloned().unwrap_or_default();
        f(&mut context);
        extensions.insert(context);
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_default())
    }
}

/// Anything that exposes a request's extensions and headers
pub trait RequestHandle {
    fn extensions(&self) -> &Extensions;
    fn headers(&self) -> &HeaderMap;
}

impl<B> RequestHandle for Request<B> {
    fn extensions(&self) -> &Extensions {
        Request::extensions(self)
    }

    fn headers(&self) -> &HeaderMap {
        Request::headers(self)
    }
}

impl RequestHandle for Parts {
    fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

fn ambient_value(key: Option<&'static LocalKey<String>>) -> Option<String> {
    key.and_then(|key| key.try_with(Clone::clone).ok())
}

fn lookup<R>(
    request: Option<&R>,
    ambient: Option<&'static LocalKey<String>>,
    stashed: impl Fn(&RequestContext) -> Option<&str>,
    header: &str,
) -> Option<String>
where
    R: RequestHandle + ?Sized,
{
    if let Some(request) = request {
        let from_request = request
            .extensions()
            .get::<RequestContext>()
            .and_then(|context| stashed(context).map(str::to_owned))
            .or_else(|| header_value(request.headers(), header));

        if from_request.is_some() {
            return from_request;
        }
    }

    ambient_value(ambient)
}

/// Correlation id of `request`, falling back to its header and then to `ambient`.
pub fn get_correlation_id<R>(
    request: Option<&R>,
    ambient: Option<&'static LocalKey<String>>,
) -> Option<String>
where
    R: RequestHandle + ?Sized,
{
    lookup(
        request,
        ambient,
        RequestContext::correlation_id,
        CORRELATION_ID_HEADER,
    )
}

/// Request id of `request`, falling back to its header and then to `ambient`.
pub fn get_request_id<R>(
    request: Option<&R>,
    ambient: Option<&'static LocalKey<String>>,
) -> Option<String>
where
    R: RequestHandle + ?Sized,
{
    lookup(request, ambient, RequestContext::request_id, REQUEST_ID_HEADER)
}

/// Correlation id of the request served by the current task, if any
pub fn current_correlation_id() -> Option<String> {
    get_correlation_id::<Parts>(None, Some(&CORRELATION_ID))
}

/// Request id of the request served by the current task, if any
pub fn current_request_id() -> Option<String> {
    get_request_id::<Parts>(None, Some(&REQUEST_ID))
}

/// Raw inbound `X-Correlation-ID` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationIdHeader(pub Option<String>);

impl<S> FromRequestParts<S> for CorrelationIdHeader
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(header_value(&parts.headers, CORRELATION_ID_HEADER)))
    }
}

/// Raw inbound `X-Request-ID` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIdHeader(pub Option<String>);

impl<S> FromRequestParts<S> for RequestIdHeader
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(header_value(&parts.headers, REQUEST_ID_HEADER)))
    }
}
