//! Metrics middleware for all routes.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::metrics::{
    normalize_path, HTTP_REQUESTS_IN_FLIGHT, HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION,
};

/// Metrics middleware that tracks HTTP request duration and counts.
///
/// This middleware records:
/// - Request duration (histogram)
/// - Request count (counter)
/// - Requests in flight (gauge)
///
/// For progress streams the duration covers the time to the response head,
/// not the lifetime of the stream.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());

    HTTP_REQUESTS_IN_FLIGHT.inc();

    let response = next.run(request).await;

    HTTP_REQUESTS_IN_FLIGHT.dec();

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUEST_DURATION
        .with_label_values(&[&method, &path, &status])
        .observe(duration);
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::StatusCode,
        middleware,
        routing::{get, post},
        Router,
    };
    use tower::ServiceExt;

    async fn dummy_handler() -> &'static str {
        "OK"
    }

    async fn rejecting_handler() -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn app() -> Router {
        Router::new()
            .route("/middleware-test/ok", get(dummy_handler))
            .route("/middleware-test/bad", post(rejecting_handler))
            .layer(middleware::from_fn(metrics_middleware))
    }

    #[tokio::test]
    async fn test_counts_requests_by_status() {
        let ok = HTTP_REQUESTS_TOTAL.with_label_values(&["GET", "/middleware-test/ok", "200"]);
        let bad = HTTP_REQUESTS_TOTAL.with_label_values(&["POST", "/middleware-test/bad", "400"]);
        let ok_before = ok.get();
        let bad_before = bad.get();

        let request = Request::builder()
            .uri("/middleware-test/ok")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let request = Request::builder()
            .method("POST")
            .uri("/middleware-test/bad")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        assert_eq!(ok.get(), ok_before + 1);
        assert_eq!(bad.get(), bad_before + 1);
    }
}
