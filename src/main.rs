//! S3 Console - Web Console for S3-Compatible Object Storage
//!
//! Serves a browser console for managing buckets and objects.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use s3console::api::ConsoleServer;
use s3console::config::{Backend, ConsoleConfig};
use s3console::storage::resolver_for;

const DEFAULT_CONFIG: &str = "s3console.toml";

/// S3 Console - web console for S3-compatible object storage
#[derive(Parser)]
#[command(name = "s3console")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the console
    Serve {
        /// Address to listen on (overrides server.bind_address)
        #[arg(short, long)]
        bind: Option<String>,

        /// Use the in-memory backend instead of S3
        #[arg(long)]
        memory: bool,
    },

    /// Write a default configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,

    /// Show the effective configuration
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind, memory } => {
            let config = load_config(&cli.config)?;
            let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
            init_logging(level, &config.logging.format);
            run_serve(config, bind, memory).await
        }
        Commands::Init { output } => run_init(&output),
        Commands::Validate => run_validate(&cli.config),
        Commands::Info => run_info(&cli.config),
    }
}

/// Initialize logging
fn init_logging(level: &str, format: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    let registry = tracing_subscriber::registry().with(env_filter);
    if format == "compact" {
        registry.with(tracing_subscriber::fmt::layer().compact()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Load the configuration, falling back to defaults when the default file is absent
fn load_config(path: &Path) -> Result<ConsoleConfig> {
    if !path.exists() && path == Path::new(DEFAULT_CONFIG) {
        return Ok(ConsoleConfig::default());
    }

    ConsoleConfig::from_file(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

/// Run the console server
async fn run_serve(mut config: ConsoleConfig, bind: Option<String>, memory: bool) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind_address = bind;
    }
    if memory {
        config.provider.backend = Backend::Memory;
    }
    config.validate()?;

    tracing::info!("Starting S3 console");
    tracing::info!("Backend: {}", config.provider.backend);
    if config.provider.backend == Backend::Memory {
        tracing::warn!("In-memory backend: contents are lost on restart");
    }

    let resolver = resolver_for(&config.provider);
    let server = ConsoleServer::new(config, resolver);
    server.start().await?;

    Ok(())
}

/// Initialize a new configuration file
fn run_init(output: &Path) -> Result<()> {
    let config_content = format!(
        "# S3 Console Configuration\n# Generated configuration file\n\n{}",
        ConsoleConfig::default().to_toml()?
    );

    std::fs::write(output, config_content)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Configuration written to: {}", output.display());

    Ok(())
}

/// Validate configuration file
fn run_validate(config_path: &Path) -> Result<()> {
    match ConsoleConfig::from_file(config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!("  Bind Address: {}", config.server.bind_address);
            println!("  Backend: {}", config.provider.backend);
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration error: {}", e);
            Err(e.into())
        }
    }
}

/// Show the effective configuration
fn run_info(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;

    println!("S3 Console Information");
    println!("======================");
    println!();
    println!("Server:");
    println!("  Bind Address:   {}", config.server.bind_address);
    println!("  Max Upload:     {} MB", config.server.max_upload_mb);
    println!();
    println!("Provider:");
    println!("  Backend:        {}", config.provider.backend);
    println!("  Region:         {}", config.provider.region);
    println!(
        "  Endpoint:       {}",
        config.provider.endpoint.as_deref().unwrap_or("(provider default)")
    );
    println!(
        "  Profile:        {}",
        config.provider.profile.as_deref().unwrap_or("(ambient)")
    );
    println!("  Path Style:     {}", config.provider.path_style);
    println!();
    println!("Logging:");
    println!("  Level:          {}", config.logging.level);
    println!("  Format:         {}", config.logging.format);

    Ok(())
}
