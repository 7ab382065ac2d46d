use axum::{
    body::Body,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tower_governor::{governor::GovernorConfigBuilder, GovernorError, GovernorLayer};

/// Type alias for the public governor layer (IP-based rate limiting)
pub type PublicGovernorLayer = GovernorLayer<
    tower_governor::key_extractor::PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware<governor::clock::QuantaInstant>,
    Body,
>;

/// Create a GovernorLayer for unauthenticated routes (per IP address)
/// - 100 requests per minute (one token every 600ms)
/// - Keeps credential stuffing against the auth endpoints in check
pub fn create_public_governor() -> PublicGovernorLayer {
    let config = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(600) // One token every 600ms (100 per minute)
            .burst_size(100)      // Max capacity of the "window"
            .finish()
            .unwrap(),
    );

    GovernorLayer::new(config).error_handler(rate_limit_error_handler)
}

/// Translate governor rejections into the API's JSON error bodies
pub fn rate_limit_error_handler(error: GovernorError) -> Response {
    match error {
        GovernorError::TooManyRequests { wait_time, headers } => {
            let body = serde_json::json!({
                "error": "Too many requests",
                "retry_after_secs": wait_time,
            });
            json_response(StatusCode::TOO_MANY_REQUESTS, body, headers)
        }
        GovernorError::UnableToExtractKey => json_response(
            StatusCode::UNAUTHORIZED,
            serde_json::json!({ "error": "Unable to identify client" }),
            None,
        ),
        GovernorError::Other { code, msg, headers } => {
            let body = serde_json::json!({
                "error": msg.unwrap_or_else(|| "Rate limiting error".to_string()),
            });
            json_response(code, body, headers)
        }
    }
}

fn json_response(
    status: StatusCode,
    body: serde_json::Value,
    extra_headers: Option<axum::http::HeaderMap>,
) -> Response {
    let mut response = (status, Json(body)).into_response();

    if let Some(headers) = extra_headers {
        response.headers_mut().extend(headers);
    }

    response
}
