use anyhow::Result;

use fangate::config::Config;
use fangate::server::Server;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse configuration from environment variables and CLI arguments
    let config = Config::from_env_and_args()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("fangate={}", config.log_level).parse()?),
        )
        .init();

    let server = Server::bind(&config).await?;

    tracing::info!(
        rate_burst = config.rate_burst,
        rate_interval_ms = config.rate_interval.as_millis() as u64,
        max_concurrent = config.max_concurrent,
        max_urls = config.max_urls,
        "gateway started"
    );

    server.run().await
}
