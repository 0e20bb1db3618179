//! Correlation-id middleware.
//!
//! Every request gets a correlation id: taken from the `X-Correlation-ID`
//! header when the client supplies one, generated otherwise. The id is
//! stored in request extensions (for the [`crate::CorrelationId`]
//! extractor), wrapped around the handler in a tracing span, and echoed
//! back in the response header.
//!
//! Install with `axum::middleware::from_fn`:
//!
//! ```ignore
//! let app = Router::new()
//!     .route("/api/orders", post(create_order))
//!     .layer(axum::middleware::from_fn(propagate_correlation_id));
//! ```

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Instrument;
use uuid::Uuid;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Correlation-id middleware function.
///
/// Extracts or generates the id, stores it in request extensions, runs the
/// rest of the stack inside a tracing span carrying it, and injects it into
/// the response header.
pub async fn propagate_correlation_id(mut req: Request, next: Next) -> Response {
    let correlation_id = req
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    req.extensions_mut().insert(correlation_id);

    let span = tracing::info_span!(
        "http_request",
        correlation_id = %correlation_id,
        method = %req.method(),
        uri = %req.uri(),
    );

    let mut response = next.run(req).instrument(span).await;

    if let Ok(header_value) = HeaderValue::from_str(&correlation_id.to_string()) {
        response
            .headers_mut()
            .insert(CORRELATION_ID_HEADER, header_value);
    }

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request as HttpRequest, routing::get, Router};
    use tower::ServiceExt;

    fn test_app() -> Router {
        Router::new()
            .route("/test", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn(propagate_correlation_id))
    }

    #[tokio::test]
    async fn test_correlation_id_generated_if_missing() {
        let request = HttpRequest::builder()
            .uri("/test")
            .body(Body::empty())
            .unwrap();

        let response = test_app().oneshot(request).await.unwrap();
        let header = response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .expect("correlation id header missing");
        Uuid::parse_str(header.to_str().unwrap()).expect("header is not a UUID");
    }

    #[tokio::test]
    async fn test_correlation_id_echoed_back() {
        let id = Uuid::new_v4();
        let request = HttpRequest::builder()
            .uri("/test")
            .header(CORRELATION_ID_HEADER, id.to_string())
            .body(Body::empty())
            .unwrap();

        let response = test_app().oneshot(request).await.unwrap();
        let header = response.headers().get(CORRELATION_ID_HEADER).unwrap();
        assert_eq!(header.to_str().unwrap(), id.to_string());
    }
}
