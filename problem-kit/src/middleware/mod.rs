//! Request metadata middlewares and the catch-all failure layer
//!
//! Chain order, outermost first:
//!
//! ```text
//! ExceptionLayer -> correlation id -> request id -> process time -> handler
//! ```
//!
//! Each id step is tower-http's `SetRequestIdLayer` and `PropagateRequestIdLayer` around a
//! small recording middleware, see [`request_tracking`]. Every tagging step catches panics
//! from further down, so a panicking handler still gets all enabled headers on its 500.
//!
//! [`apply_middleware`] installs the whole chain on a router according to
//! [`MiddlewareConfig`]. [`Server`](crate::server::Server) puts its HTTP layers
//! (trace, compression, CORS) between the tagging middlewares and the exception layer.

pub mod exception;
pub mod process_time;
pub mod request_tracking;

use axum::{middleware::from_fn, Router};

use crate::config::MiddlewareConfig;

pub use exception::{run_catching_panics, ExceptionLayer, ExceptionService};
pub use process_time::{format_process_time, process_time_middleware, PROCESS_TIME_HEADER};
pub use request_tracking::{
    correlation_id_middleware, request_id_middleware, track_correlation_id, track_request_id,
};

/// Install the enabled tagging middlewares. Layers added later wrap earlier ones, so the
/// innermost (process time) goes first.
pub fn apply_request_tracking<S>(router: Router<S>, config: &MiddlewareConfig) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let mut router = router;

    if config.process_time {
        router = router.layer(from_fn(process_time_middleware));
    }
    if config.request_id {
        router = track_request_id(router);
    }
    if config.correlation_id {
        router = track_correlation_id(router);
    }

    router
}

/// Install the catch-all layer if enabled. Call this last.
///
/// Without it, handler panics are still answered by the tagging middlewares that are
/// enabled. A panic or service error outside them, for example in a layer added by the
/// caller or with every tagging middleware disabled, then reaches hyper, which drops the
/// connection instead of sending the 500 problem document.
pub fn apply_exception_layer<S>(router: Router<S>, config: &MiddlewareConfig) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    if config.catch_unhandled {
        router.layer(ExceptionLayer::new())
    } else {
        router
    }
}

/// Install the full chain: tagging middlewares wrapped by the exception layer.
pub fn apply_middleware<S>(router: Router<S>, config: &MiddlewareConfig) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    apply_exception_layer(apply_request_tracking(router, config), config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{CORRELATION_ID_HEADER, REQUEST_ID_HEADER};
    use crate::http_error::HttpError;
    use crate::problem::{APPLICATION_PROBLEM_JSON, HTTP_500_TITLE};
    use crate::validation::{ValidationErrors, ValidationIssue};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
        routing::get,
    };
    use tower::ServiceExt;

    async fn explode() -> &'static str {
        panic!("boom")
    }

    fn app(config: &MiddlewareConfig) -> Router {
        let router = Router::new()
            .route("/ok", get(|| async { "ok" }))
            .route("/unauthorized", get(|| async { HttpError::unauthorized() }))
            .route(
                "/invalid",
                get(|| async {
                    ValidationErrors::new().with_issue(ValidationIssue::new(
                        "missing",
                        "Field required",
                        ["query", "page"],
                    ))
                }),
            )
            .route("/panic", get(explode));
        apply_middleware(router, config)
    }

    async fn call(router: Router, uri: &str) -> Response {
        router
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn assert_generic_500(response: Response) {
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            APPLICATION_PROBLEM_JSON
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["title"], HTTP_500_TITLE);
    }

    #[tokio::test]
    async fn test_full_chain_sets_all_headers() {
        let response = call(app(&MiddlewareConfig::default()), "/ok").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(CORRELATION_ID_HEADER));
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
        assert!(response.headers().contains_key(PROCESS_TIME_HEADER));
    }

    #[tokio::test]
    async fn test_taxonomy_error_through_chain() {
        let response = call(app(&MiddlewareConfig::default()), "/unauthorized").await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            APPLICATION_PROBLEM_JSON
        );
        assert!(response.headers().contains_key(CORRELATION_ID_HEADER));
        assert!(response.headers().contains_key(PROCESS_TIME_HEADER));
    }

    #[tokio::test]
    async fn test_validation_error_through_chain() {
        let response = call(app(&MiddlewareConfig::default()), "/invalid").await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn test_panic_keeps_tracking_headers() {
        let request = Request::get("/panic")
            .header(CORRELATION_ID_HEADER, "trace-me")
            .header(REQUEST_ID_HEADER, "req-7")
            .body(Body::empty())
            .unwrap();
        let response = app(&MiddlewareConfig::default())
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.headers()[CORRELATION_ID_HEADER], "trace-me");
        assert_eq!(response.headers()[REQUEST_ID_HEADER], "req-7");
        assert!(response.headers().contains_key(PROCESS_TIME_HEADER));
        assert_generic_500(response).await;
    }

    #[tokio::test]
    async fn test_panic_caught_by_outermost_layer() {
        let config = MiddlewareConfig {
            correlation_id: false,
            request_id: false,
            process_time: false,
            ..MiddlewareConfig::default()
        };
        let response = call(app(&config), "/panic").await;

        assert_generic_500(response).await;
    }

    #[tokio::test]
    async fn test_panic_answered_without_exception_layer() {
        let config = MiddlewareConfig {
            catch_unhandled: false,
            ..MiddlewareConfig::default()
        };
        let request = Request::get("/panic")
            .header(CORRELATION_ID_HEADER, "no-net")
            .body(Body::empty())
            .unwrap();
        let response = app(&config).oneshot(request).await.unwrap();

        assert_eq!(response.headers()[CORRELATION_ID_HEADER], "no-net");
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
        assert_generic_500(response).await;
    }

    #[tokio::test]
    async fn test_disabled_middlewares_are_skipped() {
        let config = MiddlewareConfig {
            correlation_id: false,
            request_id: false,
            process_time: false,
            ..MiddlewareConfig::default()
        };
        let response = call(app(&config), "/ok").await;

        assert!(!response.headers().contains_key(CORRELATION_ID_HEADER));
        assert!(!response.headers().contains_key(REQUEST_ID_HEADER));
        assert!(!response.headers().contains_key(PROCESS_TIME_HEADER));
    }
}
