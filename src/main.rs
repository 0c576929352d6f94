use anyhow::Context;
use clap::{Parser, Subcommand};
use ops_mock_providers::{
    build_host, metrics::MetricsRegistry, Capability, MockConfig, ProviderRequest,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "mockops")]
#[command(about = "Query the in-memory mock ops providers", version, long_about = None)]
struct Cli {
    /// Configuration file layered over the built-in defaults
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Emit JSON formatted logs on stderr
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered providers with their capabilities and operations
    Providers,

    /// Report provider health
    Health,

    /// Send one request through the plugin host
    Invoke {
        #[arg(value_name = "CAPABILITY")]
        capability: Capability,

        #[arg(value_name = "OPERATION")]
        operation: String,

        /// Request parameters as a JSON object
        #[arg(short, long, default_value = "{}")]
        params: String,

        /// Bypass routing and call this provider directly
        #[arg(long, value_name = "ID")]
        provider: Option<String>,
    },

    /// Print the effective configuration as TOML
    Config,

    /// Print Prometheus metrics after seeding
    Metrics,
}

fn init_tracing(config: &MockConfig, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_filter));

    if json || config.observability.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => MockConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => MockConfig::load().context("failed to load configuration")?,
    };

    init_tracing(&config, cli.json_logs);
    tracing::debug!("mockops v{}", env!("CARGO_PKG_VERSION"));

    let metrics = MetricsRegistry::new(config.observability.prometheus_enabled);
    if let Err(e) = metrics.init() {
        tracing::warn!("Failed to initialize metrics: {}", e);
    }

    if let Commands::Config = cli.command {
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    let host = build_host(&config).context("failed to build plugin host")?;

    match cli.command {
        Commands::Providers => print_json(&host.describe())?,

        Commands::Health => print_json(&host.health().await)?,

        Commands::Invoke {
            capability,
            operation,
            params,
            provider,
        } => {
            let params: serde_json::Value =
                serde_json::from_str(&params).context("--params must be valid JSON")?;
            let request = ProviderRequest::new(capability, operation, params);

            let response = match provider {
                Some(id) => host.invoke_on(&id, request).await,
                None => host.invoke(request).await,
            };
            print_json(&response)?;

            if !response.ok {
                std::process::exit(1);
            }
        }

        Commands::Metrics => {
            if !metrics.is_enabled() {
                anyhow::bail!("prometheus metrics are disabled in configuration");
            }
            print!("{}", metrics.export());
        }

        Commands::Config => unreachable!("handled before the host is built"),
    }

    Ok(())
}
