//! `X-Process-Time` middleware

use std::time::{Duration, Instant};

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

use crate::context::RequestContext;
use crate::middleware::exception::run_catching_panics;

/// Elapsed handling time header, in seconds
pub const PROCESS_TIME_HEADER: &str = "x-process-time";

/// Seconds with six decimal places, e.g. `0.001234`
pub fn format_process_time(elapsed: Duration) -> String {
    format!("{:.6}", elapsed.as_secs_f64())
}

/// Time the rest of the chain and report it on the response.
///
/// A panic further down is answered with the generic 500 response, which still gets the
/// header.
pub async fn process_time_middleware(mut request: Request, next: Next) -> Response {
    let started_at = Instant::now();
    RequestContext::update(request.extensions_mut(), |ctx| ctx.set_started_at(started_at));

    let mut response = run_catching_panics(request, next).await;

    let elapsed = format_process_time(started_at.elapsed());
    tracing::debug!(process_time = %elapsed, status = %response.status(), "Request handled");
    if let Ok(value) = HeaderValue::from_str(&elapsed) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(PROCESS_TIME_HEADER), value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::ApiError;
    use axum::{body::Body, http::StatusCode, middleware::from_fn, routing::get, Router};
    use tower::ServiceExt;

    #[test]
    fn test_format_process_time() {
        assert_eq!(format_process_time(Duration::from_micros(1234)), "0.001234");
        assert_eq!(format_process_time(Duration::from_secs(2)), "2.000000");
        assert_eq!(format_process_time(Duration::ZERO), "0.000000");
    }

    fn assert_six_decimals(value: &str) {
        let (whole, fraction) = value.split_once('.').unwrap();
        assert!(whole.parse::<u64>().is_ok());
        assert_eq!(fraction.len(), 6);
    }

    #[tokio::test]
    async fn test_header_on_success_and_failure() {
        let app = Router::new()
            .route("/ok", get(|| async { "ok" }))
            .route(
                "/fail",
                get(|| async { Err::<(), _>(ApiError::from(anyhow::anyhow!("boom"))) }),
            )
            .layer(from_fn(process_time_middleware));

        for uri in ["/ok", "/fail"] {
            let response = app
                .clone()
                .oneshot(axum::http::Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();

            let value = response.headers()[PROCESS_TIME_HEADER].to_str().unwrap();
            assert_six_decimals(value);
        }
    }

    async fn explode() -> &'static str {
        panic!("handler bug")
    }

    #[tokio::test]
    async fn test_header_when_handler_panics() {
        let app = Router::new()
            .route("/", get(explode))
            .layer(from_fn(process_time_middleware));

        let response = app
            .oneshot(axum::http::Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let value = response.headers()[PROCESS_TIME_HEADER].to_str().unwrap();
        assert_six_decimals(value);
    }

    #[tokio::test]
    async fn test_start_recorded_on_context() {
        let app = Router::new()
            .route(
                "/",
                get(|context: RequestContext| async move {
                    context.started_at().is_some().to_string()
                }),
            )
            .layer(from_fn(process_time_middleware));

        let response = app
            .oneshot(axum::http::Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"true");
    }
}
