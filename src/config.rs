//! Gateway configuration and CLI argument parsing
//!
//! Configuration follows this precedence order:
//! 1. CLI arguments (highest priority)
//! 2. Environment variables with the `FANGATE_` prefix
//! 3. Default values (lowest priority)
//!
//! The parsed arguments are converted into a single immutable [`Config`]
//! value that is constructed once at startup and passed by reference into
//! each component's constructor.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Result, anyhow};
use clap::Parser;

pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_RATE_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_RATE_BURST: u64 = 100;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_CONCURRENT: usize = 4;
pub const DEFAULT_MAX_URLS: usize = 20;
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Command-line arguments for the gateway
///
/// All arguments can also be set via environment variables with the
/// `FANGATE_` prefix. CLI arguments take precedence over environment
/// variables.
#[derive(Parser, Debug)]
#[command(
    name = "fangate",
    about = "Rate-limited batch URL fetch gateway",
    long_about = "A small HTTP gateway that fetches a batch of URLs with bounded concurrency\nand returns the aggregated bodies.\n\nEnvironment variables with the FANGATE_ prefix are supported. CLI arguments\ntake precedence over environment variables."
)]
pub struct Args {
    #[arg(
        long,
        value_name = "ADDR",
        help = "Listen address",
        default_value = DEFAULT_ADDR,
        env = "FANGATE_ADDR"
    )]
    pub addr: String,

    #[arg(
        long,
        value_name = "MS",
        help = "Token bucket refill interval in milliseconds",
        default_value_t = DEFAULT_RATE_INTERVAL.as_millis() as u64,
        env = "FANGATE_RATE_INTERVAL_MS"
    )]
    pub rate_interval_ms: u64,

    #[arg(
        long,
        value_name = "N",
        help = "Token bucket burst capacity",
        default_value_t = DEFAULT_RATE_BURST,
        env = "FANGATE_RATE_BURST"
    )]
    pub rate_burst: u64,

    #[arg(
        long,
        value_name = "MS",
        help = "Outbound request timeout in milliseconds",
        default_value_t = DEFAULT_REQUEST_TIMEOUT.as_millis() as u64,
        env = "FANGATE_REQUEST_TIMEOUT_MS"
    )]
    pub request_timeout_ms: u64,

    #[arg(
        long,
        value_name = "N",
        help = "Maximum concurrent outbound requests per batch",
        default_value_t = DEFAULT_MAX_CONCURRENT,
        env = "FANGATE_MAX_CONCURRENT"
    )]
    pub max_concurrent: usize,

    #[arg(
        long,
        value_name = "N",
        help = "Maximum URLs per batch",
        default_value_t = DEFAULT_MAX_URLS,
        env = "FANGATE_MAX_URLS"
    )]
    pub max_urls: usize,

    #[arg(
        long,
        value_name = "MS",
        help = "Grace period for draining connections on shutdown, in milliseconds",
        default_value_t = DEFAULT_SHUTDOWN_GRACE.as_millis() as u64,
        env = "FANGATE_SHUTDOWN_GRACE_MS"
    )]
    pub shutdown_grace_ms: u64,

    #[arg(
        long,
        value_name = "LEVEL",
        help = "Log level: error, warn, info, debug, trace",
        default_value = "info",
        env = "FANGATE_LOG_LEVEL"
    )]
    pub log_level: String,
}

/// Immutable gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP listener binds to
    pub addr: SocketAddr,
    /// Token bucket refill interval (one token per interval)
    pub rate_interval: Duration,
    /// Token bucket burst capacity
    pub rate_burst: u64,
    /// Timeout applied to every outbound request
    pub request_timeout: Duration,
    /// Maximum in-flight outbound requests per batch
    pub max_concurrent: usize,
    /// Maximum number of URLs accepted in one batch
    pub max_urls: usize,
    /// How long in-flight connections may drain after the shutdown signal
    pub shutdown_grace: Duration,
    /// Logging level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            addr: DEFAULT_ADDR.parse().expect("default address is valid"),
            rate_interval: DEFAULT_RATE_INTERVAL,
            rate_burst: DEFAULT_RATE_BURST,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            max_urls: DEFAULT_MAX_URLS,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Build configuration from environment variables and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if the listen address does not parse or any value
    /// fails validation.
    pub fn from_env_and_args() -> Result<Self> {
        // Clap resolves the precedence: CLI arguments, then environment
        // variables, then defaults.
        Self::from_args(Args::parse())
    }

    fn from_args(args: Args) -> Result<Self> {
        let addr: SocketAddr = args
            .addr
            .parse()
            .map_err(|_| anyhow!("invalid listen address: {}", args.addr))?;

        let config = Config {
            addr,
            rate_interval: Duration::from_millis(args.rate_interval_ms),
            rate_burst: args.rate_burst,
            request_timeout: Duration::from_millis(args.request_timeout_ms),
            max_concurrent: args.max_concurrent,
            max_urls: args.max_urls,
            shutdown_grace: Duration::from_millis(args.shutdown_grace_ms),
            log_level: args.log_level,
        };

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.rate_interval.is_zero() {
            return Err(anyhow!("rate interval must be positive"));
        }
        if self.rate_burst == 0 {
            return Err(anyhow!("rate burst must be at least 1"));
        }
        if self.request_timeout.is_zero() {
            return Err(anyhow!("request timeout must be positive"));
        }
        if self.max_concurrent == 0 {
            return Err(anyhow!("max concurrent requests must be at least 1"));
        }
        if self.max_urls == 0 {
            return Err(anyhow!("max URLs per batch must be at least 1"));
        }

        Ok(())
    }
}
