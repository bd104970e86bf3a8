//! Correlation id and request id tracking
//!
//! Each id is handled by three layers, outermost first:
//!
//! 1. `SetRequestIdLayer` keeps the inbound header or writes a fresh UUID v4 into it
//! 2. `PropagateRequestIdLayer` echoes the request header onto the response
//! 3. a `from_fn` step that records the id on [`RequestContext`], scopes the task-local
//!    and tracing span around the downstream call, and turns a downstream panic into the
//!    generic 500 response so the echo in step 2 still happens
//!
//! Both ids share tower-http's `RequestId` extension type, so the recording step reads the
//! header that step 1 guarantees rather than the extension.

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderName},
    middleware::{from_fn, Next},
    response::Response,
    Router,
};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::Instrument;

use crate::context::{
    RequestContext, CORRELATION_ID, CORRELATION_ID_HEADER, REQUEST_ID, REQUEST_ID_HEADER,
};
use crate::middleware::exception::run_catching_panics;

/// Layer that fills in a missing `X-Correlation-ID` with a UUID v4
pub fn correlation_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(HeaderName::from_static(CORRELATION_ID_HEADER), MakeRequestUuid)
}

/// Layer that copies `X-Correlation-ID` from the request to the response
pub fn correlation_id_propagation_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(HeaderName::from_static(CORRELATION_ID_HEADER))
}

/// Layer that fills in a missing `X-Request-ID` with a UUID v4
pub fn request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

/// Layer that copies `X-Request-ID` from the request to the response
pub fn request_id_propagation_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

/// Install correlation id tracking around everything already on `router`.
pub fn track_correlation_id<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(from_fn(correlation_id_middleware))
        .layer(correlation_id_propagation_layer())
        .layer(correlation_id_layer())
}

/// Install request id tracking around everything already on `router`.
pub fn track_request_id<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(from_fn(request_id_middleware))
        .layer(request_id_propagation_layer())
        .layer(request_id_layer())
}

fn header_id(headers: &HeaderMap, header: &str) -> Option<String> {
    headers
        .get(header)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
}

/// Record the correlation id set by [`correlation_id_layer`] and run downstream in its scope
pub async fn correlation_id_middleware(mut request: Request, next: Next) -> Response {
    let Some(correlation_id) = header_id(request.headers(), CORRELATION_ID_HEADER) else {
        return run_catching_panics(request, next).await;
    };

    RequestContext::update(request.extensions_mut(), |ctx| {
        ctx.set_correlation_id(correlation_id.clone())
    });

    let span = tracing::info_span!("correlation", correlation_id = %correlation_id);
    CORRELATION_ID
        .scope(
            correlation_id,
            run_catching_panics(request, next).instrument(span),
        )
        .await
}

/// Record the request id set by [`request_id_layer`] and run downstream in its scope
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let Some(request_id) = header_id(request.headers(), REQUEST_ID_HEADER) else {
        return run_catching_panics(request, next).await;
    };

    RequestContext::update(request.extensions_mut(), |ctx| {
        ctx.set_request_id(request_id.clone())
    });

    let span = tracing::info_span!("request", request_id = %request_id);
    REQUEST_ID
        .scope(request_id, run_catching_panics(request, next).instrument(span))
        .await
}
