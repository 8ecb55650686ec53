use clap::Parser;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use turnstile::config::{LogFormat, LoggingConfig, TurnstileConfig};
use turnstile::http::HttpServer;
use turnstile::ratelimit::RateLimiter;

/// Fixed-window token bucket in front of an HTTP handler.
#[derive(Debug, Parser)]
#[command(name = "turnstile", version, about)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Refills per second
    #[arg(long)]
    rate: Option<f64>,

    /// Bucket size (largest burst between refills)
    #[arg(long)]
    capacity: Option<u64>,

    /// Log filter directive, e.g. `info` or `turnstile=debug`
    #[arg(long)]
    log_level: Option<String>,

    /// Log output format
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration.
    fn apply(self, config: &mut TurnstileConfig) {
        if let Some(addr) = self.listen {
            config.server.http_addr = addr;
        }
        if let Some(rate) = self.rate {
            config.limiter.rate = rate;
        }
        if let Some(capacity) = self.capacity {
            config.limiter.capacity = capacity;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = TurnstileConfig::load(cli.config.as_deref())?;
    let source = config_source(cli.config.as_deref());
    cli.apply(&mut config);
    config.validate()?;

    init_tracing(&config.logging)?;

    info!("Starting Turnstile");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        source = %source,
        http_addr = %config.server.http_addr,
        rate = config.limiter.rate,
        capacity = config.limiter.capacity,
        "Configuration loaded"
    );

    let rate_limiter = Arc::new(RateLimiter::from_config(&config.limiter)?);

    let server = HttpServer::new(config.server.http_addr, Arc::clone(&rate_limiter));

    // Stop accepting requests on Ctrl+C or SIGTERM, then stop refilling
    server
        .serve_with_shutdown(shutdown_signal(Arc::clone(&rate_limiter)))
        .await?;

    rate_limiter.shutdown();
    info!("Turnstile stopped");
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&logging.level))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true);

    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
    Ok(())
}

/// Describe where the settings were read from, for the startup log.
fn config_source(path: Option<&Path>) -> String {
    match path {
        Some(path) => format!("{}, environment, flags", path.display()),
        None => "defaults, environment, flags".to_string(),
    }
}

/// Resolve once Ctrl+C or SIGTERM arrives, logging what the limiter still holds.
async fn shutdown_signal(limiter: Arc<RateLimiter>) {
    let signal = received_signal().await;
    info!(
        signal,
        available = limiter.available(),
        capacity = limiter.capacity(),
        refills = limiter.refill_count(),
        "Shutdown requested, draining in-flight requests"
    );
}

/// Name of the first termination signal received.
///
/// A handler that cannot be installed is logged and never fires, so the other
/// one still can.
async fn received_signal() -> &'static str {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => "SIGINT",
            Err(e) => {
                error!(error = %e, "Cannot listen for Ctrl+C");
                std::future::pending().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                "SIGTERM"
            }
            Err(e) => {
                error!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<&'static str>();

    tokio::select! {
        name = ctrl_c => name,
        name = terminate => name,
    }
}
