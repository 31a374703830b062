use anyhow::Result;
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use modkit::runtime::{run, RunOptions, ShutdownOptions};
use modkit::{ModuleCtxBuilder, ModuleRegistry};
use runtime::{AppConfig, AppConfigProvider, CliArgs};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Bookshelf Server - books of upstream owners grouped by age category
#[derive(Parser)]
#[command(name = "bookshelf-server")]
#[command(about = "Bookshelf Server - books of upstream owners grouped by age category")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // CLI args passed down to config/app
    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);
    default_ingress_bind_addr(&mut config);

    let logging_config = config
        .logging
        .clone()
        .unwrap_or_else(runtime::default_logging_config);
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Bookshelf Server starting");

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(config).await,
    }
}

/// Without an explicit `bind_addr` the ingress listens on `server.host:server.port`.
fn default_ingress_bind_addr(config: &mut AppConfig) {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let section = config
        .modules
        .entry(api_ingress::MODULE_NAME.to_string())
        .or_insert_with(|| serde_json::json!({}));
    if let Some(obj) = section.as_object_mut() {
        obj.entry("bind_addr")
            .or_insert(serde_json::Value::String(bind_addr));
    }
}

/// Modules in start order; stop runs in reverse.
fn build_registry() -> Result<ModuleRegistry> {
    let ingress = Arc::new(api_ingress::ApiIngress::default());
    let owners = Arc::new(book_owners::BookOwnersModule::new());

    let registry = ModuleRegistry::builder()
        .register_core(api_ingress::MODULE_NAME, ingress.clone())
        .register_rest_host(api_ingress::MODULE_NAME, ingress.clone())
        .register_stateful(api_ingress::MODULE_NAME, ingress)
        .register_core(book_owners::MODULE_NAME, owners.clone())
        .register_rest(book_owners::MODULE_NAME, owners)
        .build()?;
    Ok(registry)
}

async fn run_server(config: AppConfig) -> Result<()> {
    tracing::info!("Initializing modules...");

    let run_options = RunOptions {
        registry: build_registry()?,
        modules_cfg: Arc::new(AppConfigProvider::new(config)),
        shutdown: ShutdownOptions::Signals,
    };

    run(run_options).await
}

async fn check_config(config: AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    // Module init validates each module's section without binding or fetching anything
    let registry = build_registry()?;
    let ctx = ModuleCtxBuilder::new(CancellationToken::new())
        .with_config_provider(Arc::new(AppConfigProvider::new(config.clone())))
        .build();
    registry.run_init_phase(&ctx).await?;

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("{}", config.to_yaml()?);

    Ok(())
}
