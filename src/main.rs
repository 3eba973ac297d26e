use tracing_subscriber::EnvFilter;

use api_warden::config;
use api_warden::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (ignore if absent)
    dotenvy::dotenv().ok();

    let config = config::load_from_env()?;

    init_tracing(&config.log_level, &config.log_format);
    config.print_summary();

    server::run(config).await
}

/// Initializes the tracing subscriber with the configured level and format.
///
/// `RUST_LOG` takes priority over the configured level when set.
fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
