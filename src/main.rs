//! endpoint-config: checks a REST endpoint configuration file.
//!
//! Initializes tracing, loads the TOML configuration, runs the endpoint
//! assembler and logs the resulting settings. Exits with an error when the
//! configuration is missing keys or TLS cannot be set up.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use endpoint_config::config::{DEFAULT_CONFIG_PATH, DEFAULT_LOG_FILTER, DEFAULT_LOG_FORMAT};
use endpoint_config::{ConfigAssembler, Configuration};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Validate a REST endpoint configuration
#[derive(Parser, Debug)]
#[command(name = "endpoint-config", version, about)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log level filter (e.g., "endpoint_config=debug")
    #[arg(short, long)]
    log_level: Option<String>,

    /// Log output format
    #[arg(long, value_enum, default_value = DEFAULT_LOG_FORMAT)]
    log_format: LogFormat,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize tracing with priority: CLI > env > default
    let log_filter = args
        .log_level
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

    let registry =
        tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(&log_filter));
    match args.log_format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }

    let config = Configuration::load(&args.config)?;
    if config.is_empty() {
        tracing::warn!(path = %args.config.display(), "Configuration file is empty");
    }
    tracing::info!(
        path = %args.config.display(),
        keys = config.len(),
        "Loaded configuration"
    );

    let endpoint = ConfigAssembler::new().assemble(&config)?;

    tracing::info!(
        address = %endpoint.address(),
        bind_address = endpoint.bind_address().unwrap_or("*"),
        port = endpoint.bind_port(),
        tls = endpoint.tls_engine().is_some(),
        upload_dir = %endpoint.upload_dir().display(),
        max_content_length = endpoint.max_content_length(),
        "REST endpoint configuration is valid"
    );

    if let Some(engine) = endpoint.tls_engine() {
        tracing::info!(
            protocols = ?engine.protocols(),
            cipher_suites = ?engine.cipher_suites(),
            "TLS settings"
        );
    }

    for (name, value) in endpoint.response_headers().iter() {
        tracing::info!(%name, %value, "Response header");
    }

    Ok(())
}
