//! HTTP handlers for the gateway
//!
//! # API Endpoints
//!
//! ## POST /requests
//!
//! Fetch a batch of URLs.
//!
//! ### Request Body
//!
//! ```json
//! ["https://example.com", "https://example.org"]
//! ```
//!
//! ### Response
//!
//! A JSON array of the fetched bodies, same order and length as the input:
//!
//! ```json
//! ["<body of example.com>", "<body of example.org>"]
//! ```
//!
//! Error statuses: 405 (wrong method), 400 (malformed body or invalid URL
//! count), 500 (any fetch failed), 429 (rate limit exceeded). Error bodies
//! are plain status text; the underlying cause is logged, never returned.
//!
//! ## GET /health
//!
//! Health check endpoint. Returns "OK" with 200 status.
//!
//! ## GET /metrics
//!
//! Prometheus text metrics.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use bytes::Bytes;
use serde::Deserialize;

use crate::fanout::Dispatcher;
use crate::limiter::RateLimiter;
use crate::metrics::Metrics;

/// Path of the batch-fetch endpoint
pub const ENDPOINT_REQUESTS: &str = "/requests";

/// Shared state behind every handler
pub struct AppState {
    pub limiter: RateLimiter,
    pub dispatcher: Dispatcher,
    pub metrics: Metrics,
    pub max_urls: usize,
}

/// An ordered batch of URLs to fetch
///
/// Deserialized straight from the request body; anything that is not a JSON
/// array of strings is a decode failure, including structurally valid JSON
/// of the wrong element type.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct BatchRequest(pub Vec<String>);

impl BatchRequest {
    /// Enforce `0 < len <= max_urls`
    ///
    /// Empty and oversized batches map to the same rejection.
    pub fn validate(&self, max_urls: usize) -> Result<(), &'static str> {
        if self.0.is_empty() || self.0.len() > max_urls {
            return Err("invalid count of URLs");
        }

        Ok(())
    }
}

/// Admission-control middleware
///
/// Runs strictly before the handler: a rejected request never reaches the
/// batch endpoint and never consumes outbound capacity.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    state.metrics.requests_total.fetch_add(1, Ordering::Relaxed);

    if !state.limiter.allow() {
        state.metrics.requests_rejected.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("request shed by rate limiter");
        return (StatusCode::TOO_MANY_REQUESTS, "Too Many Requests").into_response();
    }

    next.run(request).await
}

/// `POST /requests`: decode, validate, fan out, encode
pub async fn handle_batch(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Vec<String>>, (StatusCode, &'static str)> {
    let batch: BatchRequest = serde_json::from_slice(&body).map_err(|err| {
        state.metrics.requests_invalid.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(error = %err, "malformed batch body");
        (StatusCode::BAD_REQUEST, "malformed request")
    })?;

    batch.validate(state.max_urls).map_err(|reason| {
        state.metrics.requests_invalid.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(count = batch.0.len(), "batch size rejected");
        (StatusCode::BAD_REQUEST, reason)
    })?;

    match state.dispatcher.dispatch(&batch.0).await {
        Ok(bodies) => {
            state.metrics.batches_succeeded.fetch_add(1, Ordering::Relaxed);
            state
                .metrics
                .urls_fetched
                .fetch_add(bodies.len() as u64, Ordering::Relaxed);
            Ok(Json(bodies))
        }
        Err(err) => {
            state.metrics.batches_failed.fetch_add(1, Ordering::Relaxed);
            // The failing URL stays in the logs; callers only learn that
            // the batch failed.
            tracing::error!(url = err.url(), error = %err, "batch fan-out failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "internal error"))
        }
    }
}

/// `GET /health`
pub async fn health() -> &'static str {
    "OK"
}

/// `GET /metrics`
pub async fn metrics(State(state): State<Arc<AppState>>) -> String {
    state.metrics.export_prometheus()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_list_of_strings() {
        let batch: BatchRequest =
            serde_json::from_slice(br#"["https://a.example", "https://b.example"]"#).unwrap();
        assert_eq!(batch.0.len(), 2);
        assert_eq!(batch.0[0], "https://a.example");
    }

    #[test]
    fn test_decode_rejects_wrong_element_type() {
        // Structurally valid JSON of the wrong shape is a decode failure,
        // not a validation failure.
        assert!(serde_json::from_slice::<BatchRequest>(br#"[1, 2, 3]"#).is_err());
        assert!(serde_json::from_slice::<BatchRequest>(br#"{"urls": []}"#).is_err());
        assert!(serde_json::from_slice::<BatchRequest>(br#"null"#).is_err());
        assert!(serde_json::from_slice::<BatchRequest>(b"not json at all").is_err());
    }

    #[test]
    fn test_validate_bounds() {
        let empty = BatchRequest(vec![]);
        assert!(empty.validate(20).is_err());

        let one = BatchRequest(vec!["https://a.example".to_string()]);
        assert!(one.validate(20).is_ok());

        let full = BatchRequest(vec!["https://a.example".to_string(); 20]);
        assert!(full.validate(20).is_ok());

        let oversized = BatchRequest(vec!["https://a.example".to_string(); 21]);
        assert!(oversized.validate(20).is_err());
    }

    #[test]
    fn test_empty_and_oversized_share_classification() {
        let empty = BatchRequest(vec![]);
        let oversized = BatchRequest(vec!["https://a.example".to_string(); 21]);

        assert_eq!(
            empty.validate(20).unwrap_err(),
            oversized.validate(20).unwrap_err()
        );
    }
}
