//! Catch-all layer for failures that escape typed error handling
//!
//! Handler failures are normally `ApiError` values and become precise problem responses.
//! [`ExceptionLayer`] handles what is left: panics anywhere inside the wrapped stack and
//! errors returned by inner services. Both are logged and answered with the generic 500
//! document, so the client never sees a reset connection or an internal error message.
//!
//! Install it as the outermost layer so that it wraps every other middleware.
//!
//! The tagging middlewares run their downstream through [`run_catching_panics`], so a
//! panicking handler is already a generic 500 response when they add their headers.
//! [`ExceptionLayer`] then only sees failures raised outside them.

use std::any::Any;
use std::convert::Infallible;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    http::{Method, Request, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::future::{BoxFuture, FutureExt};
use tower::{Layer, Service, ServiceExt};

use crate::handlers::unexpected_failure_response;

/// Layer converting panics and service errors into the generic 500 problem response
#[derive(Debug, Clone, Copy, Default)]
pub struct ExceptionLayer;

impl ExceptionLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for ExceptionLayer {
    type Service = ExceptionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ExceptionService { inner }
    }
}

/// Service produced by [`ExceptionLayer`]
#[derive(Debug, Clone)]
pub struct ExceptionService<S> {
    inner: S,
}

impl<S, B> Service<Request<B>> for ExceptionService<S>
where
    S: Service<Request<B>> + Clone + Send + 'static,
    S::Response: IntoResponse + Send,
    S::Error: fmt::Display + fmt::Debug + Send,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Readiness of the inner service is driven by `oneshot` inside the call.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        let inner = self.inner.clone();
        let method = request.method().clone();
        let uri = request.uri().clone();

        async move {
            let outcome = AssertUnwindSafe(inner.oneshot(request))
                .catch_unwind()
                .await;

            let response = match outcome {
                Ok(Ok(response)) => response.into_response(),
                Ok(Err(err)) => tracing::error_span!("unhandled_error", %method, %uri)
                    .in_scope(|| unexpected_failure_response(&err))
                    .into_response(),
                Err(payload) => panic_response(payload.as_ref(), &method, &uri),
            };

            Ok(response)
        }
        .boxed()
    }
}

/// Run the rest of a `from_fn` chain, answering a panic with the generic 500 response.
pub async fn run_catching_panics(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(payload) => panic_response(payload.as_ref(), &method, &uri),
    }
}

fn panic_response(payload: &(dyn Any + Send), method: &Method, uri: &Uri) -> Response {
    let message = panic_message(payload);
    tracing::error_span!("unhandled_panic", %method, %uri)
        .in_scope(|| unexpected_failure_response(message))
        .into_response()
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "panic with non-string payload"
    }
}
