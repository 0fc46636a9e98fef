//! # Fangate
//!
//! A small HTTP gateway that accepts a batch of target URLs, fetches them
//! concurrently with a bounded fan-out, and returns the aggregated response
//! bodies. The gateway protects itself from overload with a token-bucket
//! rate limiter applied before any request handling.
//!
//! ## Quick Start
//!
//! ```bash
//! # Start with defaults (listens on 0.0.0.0:8080)
//! fangate
//!
//! # Custom listen address and fan-out width
//! fangate --addr 127.0.0.1:9090 --max-concurrent 8
//! ```
//!
//! Submit a batch:
//!
//! ```bash
//! curl -X POST http://localhost:8080/requests \
//!   -H "Content-Type: application/json" \
//!   -d '["https://example.com", "https://example.org"]'
//! ```
//!
//! The response is a JSON array of the fetched bodies, in the same order as
//! the submitted URLs. A batch is all-or-nothing: if any single fetch fails,
//! the remaining in-flight fetches are cancelled and the whole batch fails
//! with status 500.
//!
//! ## Configuration
//!
//! Configure via CLI arguments or environment variables (CLI takes
//! precedence):
//!
//! ```bash
//! export FANGATE_ADDR=0.0.0.0:8080
//! export FANGATE_RATE_BURST=100
//! export FANGATE_MAX_CONCURRENT=4
//! fangate
//! ```
//!
//! ## Endpoints
//!
//! - `POST /requests`: fetch a batch of URLs (rate limited)
//! - `GET /health`: liveness probe
//! - `GET /metrics`: Prometheus text metrics
//!
//! ## Architecture
//!
//! ```text
//!                    ┌────────────┐
//!   inbound request  │ RateLimiter│  token bucket, lazy refill
//!  ─────────────────▶│ middleware │──▶ 429 when no token
//!                    └─────┬──────┘
//!                          │
//!                    ┌─────▼──────┐
//!                    │   Batch    │  decode ▸ validate ▸ encode
//!                    │  handler   │
//!                    └─────┬──────┘
//!                          │
//!                    ┌─────▼──────┐
//!                    │ Dispatcher │  ≤ max_concurrent outbound GETs,
//!                    │  (fan-out) │  fail-fast, order-preserving
//!                    └────────────┘
//! ```
//!
//! Shutdown is orthogonal to the data path: an OS interrupt stops the accept
//! loop immediately and gives in-flight connections a bounded grace period
//! to drain before the server exits.

pub mod config;
pub mod error;
pub mod fanout;
pub mod handlers;
pub mod limiter;
pub mod metrics;
pub mod server;

#[cfg(test)]
mod fanout_tests;
