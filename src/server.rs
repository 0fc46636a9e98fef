//! Server lifecycle
//!
//! A [`Server`] moves through four states:
//!
//! ```text
//! Created ──bind──▶ Listening ──signal──▶ ShuttingDown ──drain──▶ Stopped
//! ```
//!
//! [`Server::run`] blocks until an OS interrupt (SIGINT or SIGTERM) arrives,
//! then stops accepting connections and gives in-flight ones a bounded grace
//! period to finish. The grace period is a fresh deadline, deliberately
//! distinct from the shutdown signal that triggered it; once it expires the
//! serve loop is abandoned so `run` can return, and the process teardown
//! that follows cuts whatever connections remain along with their outbound
//! fetches.
//!
//! A deliberate shutdown is a success; any other listener failure is
//! returned to the caller.

use std::net::SocketAddr;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::oneshot;

use crate::config::Config;
use crate::fanout::Dispatcher;
use crate::handlers::{self, AppState, ENDPOINT_REQUESTS};
use crate::limiter::RateLimiter;
use crate::metrics::Metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Listening,
    ShuttingDown,
    Stopped,
}

/// The gateway server
pub struct Server {
    listener: TcpListener,
    router: Router,
    addr: SocketAddr,
    shutdown_grace: Duration,
    state: Lifecycle,
}

impl Server {
    /// Build all components, assemble the router, and bind the listener
    ///
    /// The batch endpoint sits behind the rate-limit middleware; `/health`
    /// and `/metrics` are registered outside it so probes are never shed.
    pub async fn bind(config: &Config) -> Result<Server> {
        let state = Arc::new(AppState {
            limiter: RateLimiter::new(config.rate_interval, config.rate_burst),
            dispatcher: Dispatcher::new(config.request_timeout, config.max_concurrent)?,
            metrics: Metrics::new(),
            max_urls: config.max_urls,
        });

        let router = Router::new()
            .route(ENDPOINT_REQUESTS, post(handlers::handle_batch))
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                handlers::rate_limit,
            ))
            .route("/health", get(handlers::health))
            .route("/metrics", get(handlers::metrics))
            .with_state(state);

        let listener = TcpListener::bind(config.addr).await?;
        let addr = listener.local_addr()?;

        let mut server = Server {
            listener,
            router,
            addr,
            shutdown_grace: config.shutdown_grace,
            state: Lifecycle::Created,
        };
        transition(&mut server.state, Lifecycle::Listening);
        tracing::info!("server listening on {}", addr);

        Ok(server)
    }

    /// The address the listener is bound to
    ///
    /// Useful when binding to port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serve until an OS interrupt arrives, then drain and return
    pub async fn run(self) -> Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Serve until `shutdown` resolves, then drain and return
    ///
    /// Returns `Ok(())` for a deliberate shutdown; a listener failure
    /// before the signal is returned as an error.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let Server {
            listener,
            router,
            addr: _,
            shutdown_grace,
            mut state,
        } = self;

        let (drain_tx, drain_rx) = oneshot::channel::<()>();

        let serve = axum::serve(listener, router).with_graceful_shutdown(async move {
            let _ = drain_rx.await;
        });
        let mut serve = pin!(serve.into_future());

        tokio::select! {
            result = &mut serve => {
                // The listener failed underneath us; there is nothing to
                // drain.
                transition(&mut state, Lifecycle::Stopped);
                return result.map_err(Into::into);
            }
            () = shutdown => {
                transition(&mut state, Lifecycle::ShuttingDown);
                tracing::info!("shutdown signal received, draining connections");
                let _ = drain_tx.send(());
            }
        }

        // Drain under a fresh bounded deadline rather than the already
        // fired shutdown signal.
        match tokio::time::timeout(shutdown_grace, &mut serve).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(
                    grace_ms = shutdown_grace.as_millis() as u64,
                    "grace period expired, aborting open connections"
                );
            }
        }

        transition(&mut state, Lifecycle::Stopped);
        tracing::info!("server stopped");

        Ok(())
    }
}

fn transition(state: &mut Lifecycle, next: Lifecycle) {
    tracing::debug!(from = ?*state, to = ?next, "lifecycle transition");
    *state = next;
}

/// Wait for SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
