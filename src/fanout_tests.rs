//! Dispatcher tests against stub upstreams on ephemeral ports

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;

use crate::error::FetchError;
use crate::fanout::Dispatcher;

async fn spawn_upstream(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    addr
}

fn dispatcher(max_concurrent: usize) -> Dispatcher {
    Dispatcher::new(Duration::from_secs(10), max_concurrent).unwrap()
}

#[tokio::test]
async fn test_results_preserve_input_order() {
    let router = Router::new()
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                "slow"
            }),
        )
        .route("/fast", get(|| async { "fast" }));
    let addr = spawn_upstream(router).await;

    let urls = vec![
        format!("http://{addr}/slow"),
        format!("http://{addr}/fast"),
        format!("http://{addr}/slow"),
    ];

    let bodies = dispatcher(4).dispatch(&urls).await.unwrap();

    // The fast URL completes first but its slot is still the middle one.
    assert_eq!(bodies, vec!["slow", "fast", "slow"]);
}

#[derive(Default)]
struct InFlightGauge {
    current: AtomicUsize,
    high_water: AtomicUsize,
}

async fn tracked(State(gauge): State<Arc<InFlightGauge>>) -> &'static str {
    let now = gauge.current.fetch_add(1, Ordering::SeqCst) + 1;
    gauge.high_water.fetch_max(now, Ordering::SeqCst);

    tokio::time::sleep(Duration::from_millis(50)).await;

    gauge.current.fetch_sub(1, Ordering::SeqCst);
    "ok"
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrency_never_exceeds_limit() {
    let gauge = Arc::new(InFlightGauge::default());
    let router = Router::new()
        .route("/tracked", get(tracked))
        .with_state(gauge.clone());
    let addr = spawn_upstream(router).await;

    let urls = vec![format!("http://{addr}/tracked"); 12];

    let bodies = dispatcher(3).dispatch(&urls).await.unwrap();

    assert_eq!(bodies.len(), 12);
    assert!(
        gauge.high_water.load(Ordering::SeqCst) <= 3,
        "high-water mark {} exceeded the limit",
        gauge.high_water.load(Ordering::SeqCst)
    );
}

#[tokio::test]
async fn test_limit_holds_for_small_batches() {
    let gauge = Arc::new(InFlightGauge::default());
    let router = Router::new()
        .route("/tracked", get(tracked))
        .with_state(gauge.clone());
    let addr = spawn_upstream(router).await;

    // Fewer URLs than the limit still works.
    let urls = vec![format!("http://{addr}/tracked"); 2];

    let bodies = dispatcher(8).dispatch(&urls).await.unwrap();

    assert_eq!(bodies.len(), 2);
    assert!(gauge.high_water.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn test_error_status_fails_the_batch() {
    let router = Router::new()
        .route("/ok", get(|| async { "ok" }))
        .route("/boom", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
    let addr = spawn_upstream(router).await;

    let urls = vec![format!("http://{addr}/ok"), format!("http://{addr}/boom")];

    let err = dispatcher(4).dispatch(&urls).await.unwrap_err();

    match err {
        FetchError::Status { ref url, status } => {
            assert!(url.ends_with("/boom"));
            assert_eq!(status.as_u16(), 500);
        }
        other => panic!("expected status error, got: {other}"),
    }
}

#[tokio::test]
async fn test_connection_error_fails_the_batch() {
    // Bind and immediately drop to get a port nobody listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let urls = vec![format!("http://{addr}/nothing")];

    let err = dispatcher(4).dispatch(&urls).await.unwrap_err();

    assert!(matches!(err, FetchError::Request { .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_first_error_cancels_outstanding_work() {
    let router = Router::new()
        .route(
            "/hang",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "hung"
            }),
        )
        .route("/boom", get(|| async { StatusCode::BAD_GATEWAY }));
    let addr = spawn_upstream(router).await;

    let urls = vec![
        format!("http://{addr}/hang"),
        format!("http://{addr}/boom"),
        format!("http://{addr}/hang"),
        format!("http://{addr}/hang"),
    ];

    let started = Instant::now();
    let err = dispatcher(2).dispatch(&urls).await.unwrap_err();

    // The failure surfaces without waiting for the hanging fetches, which
    // are dropped rather than driven to completion.
    assert!(matches!(err, FetchError::Status { .. }));
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "dispatch did not fail fast: {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn test_client_timeout_fails_the_batch() {
    let router = Router::new().route(
        "/hang",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            "hung"
        }),
    );
    let addr = spawn_upstream(router).await;

    let urls = vec![format!("http://{addr}/hang")];

    let tight = Dispatcher::new(Duration::from_millis(100), 4).unwrap();
    let err = tight.dispatch(&urls).await.unwrap_err();

    assert!(matches!(err, FetchError::Request { .. }));
}
