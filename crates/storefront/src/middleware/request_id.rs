//! Request IDs for log and error correlation.
//!
//! An `x-request-id` from an upstream proxy is reused when it looks sane;
//! anything else is replaced with a fresh UUID v4. The ID ends up in the
//! request span, the Sentry scope, the request extensions and the response.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_LEN: usize = 128;

/// Request ID stored in the request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Whether an upstream request ID can be passed through to logs and headers.
fn is_acceptable(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

fn resolve(incoming: Option<&str>) -> String {
    incoming
        .filter(|id| is_acceptable(id))
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_owned)
}

/// Middleware that gives every request an ID.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = resolve(
        request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|h| h.to_str().ok()),
    );

    Span::current().record("request_id", &request_id);
    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });
    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_id_is_kept() {
        assert_eq!(resolve(Some("abc-123")), "abc-123");
        assert_eq!(resolve(Some("cf.ray_9f2")), "cf.ray_9f2");
    }

    #[test]
    fn test_missing_or_odd_ids_are_replaced() {
        for incoming in [None, Some(""), Some("has space"), Some("<script>")] {
            let id = resolve(incoming);
            assert!(Uuid::parse_str(&id).is_ok(), "{incoming:?} -> {id}");
        }

        let long = "a".repeat(MAX_LEN + 1);
        assert_ne!(resolve(Some(&long)), long);
    }
}
