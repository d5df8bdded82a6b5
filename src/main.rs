//! Static export server.
//!
//! Serves a directory produced by a static site export, where page files
//! named like `[id].html` or `[...slug].html` stand for dynamic routes.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────────────┐
//!                  │                 STATIC EXPORT SERVER                 │
//!                  │                                                      │
//!   startup        │  ┌─────────┐    ┌─────────┐    ┌──────────────┐      │
//!   ───────────────┼─▶│  store  │───▶│ routing │───▶│  RouteTable  │      │
//!                  │  │  walk   │    │ compile │    │  (immutable) │      │
//!                  │  └─────────┘    └─────────┘    └──────┬───────┘      │
//!                  │                                       │              │
//!   request        │  ┌─────────┐    ┌──────────┐   ┌──────▼───────┐      │
//!   ───────────────┼─▶│  http   │───▶│ resolve  │──▶│ store: stat  │      │
//!                  │  │ server  │    │ policy   │   │    + open    │      │
//!   response       │  └────▲────┘    └──────────┘   └──────┬───────┘      │
//!   ◀──────────────┼───────┴──── http::response ◀───────────┘              │
//!                  │                                                      │
//!                  │  config · observability · lifecycle                  │
//!                  └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use static_export_server::config::validation::validate_config;
use static_export_server::config::{load_config, ConfigError, ServerConfig};
use static_export_server::lifecycle::{signals, startup, Shutdown};
use static_export_server::observability::logging;
use static_export_server::resolve::ResolvePolicy;

#[derive(Parser)]
#[command(name = "static-export-server", version)]
#[command(about = "Serve a static site export with dynamic page routes", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the site (default)
    Serve(ServeArgs),
    /// Print the compiled route table in match order
    Routes(SiteArgs),
}

#[derive(Args, Default)]
struct SiteArgs {
    /// Directory containing the exported site
    #[arg(long)]
    root: Option<PathBuf>,

    /// How request paths resolve to files
    #[arg(long, value_enum)]
    policy: Option<ResolvePolicy>,
}

#[derive(Args, Default)]
struct ServeArgs {
    #[command(flatten)]
    site: SiteArgs,

    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(long)]
    bind: Option<String>,
}

fn load(
    path: Option<&PathBuf>,
    site: &SiteArgs,
    bind: Option<&String>,
) -> Result<ServerConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };

    if let Some(root) = &site.root {
        config.site.root = root.clone();
    }
    if let Some(policy) = site.policy {
        config.site.policy = policy;
    }
    if let Some(bind) = bind {
        config.listener.bind_address = bind.clone();
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve(ServeArgs::default())) {
        Command::Routes(site) => {
            let config = load(cli.config.as_ref(), &site, None)?;
            let resolver = startup::build_resolver(&config.site)?;
            for route in resolver.routes() {
                println!("{}\t{}", route.pattern(), route.target_file());
            }
        }
        Command::Serve(args) => {
            let config = load(cli.config.as_ref(), &args.site, args.bind.as_ref())?;
            logging::init_logging(&config.observability)?;

            tracing::info!(
                version = env!("CARGO_PKG_VERSION"),
                bind_address = %config.listener.bind_address,
                root = %config.site.root.display(),
                request_timeout_secs = config.timeouts.request_secs,
                "static-export-server starting"
            );

            let shutdown = Shutdown::new();
            signals::spawn_signal_listener(shutdown.clone());

            if let Err(e) = startup::run(config, shutdown).await {
                tracing::error!(error = %e, "Server failed");
                return Err(e.into());
            }
            tracing::info!("Shutdown complete");
        }
    }

    Ok(())
}
