use crate::{
    config::AppConfig,
    demo::{build_dispatcher, jwt_codec},
    logging,
    runtime_config::RuntimeConfig,
    server::{AppService, HttpServer, ServerHandle},
};
use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Command-line interface for oxrouter
#[derive(Parser, Debug)]
#[command(name = "oxrouter")]
#[command(about = "Coroutine HTTP router with onion middleware", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the reference application
    Serve {
        /// YAML configuration file
        #[arg(short, long, env = "OXR_CONFIG")]
        config: Option<PathBuf>,

        /// Listen address, overriding the configuration
        #[arg(long)]
        addr: Option<String>,
    },
    /// Print the routing table of the reference application
    Routes {
        #[arg(short, long, env = "OXR_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Issue a bearer token for a user id, for manual testing
    Token {
        #[arg(long)]
        user_id: u64,

        #[arg(short, long, env = "OXR_CONFIG")]
        config: Option<PathBuf>,
    },
}

/// Parse the command line and run the selected command.
///
/// # Errors
///
/// Configuration, route registration and socket binding failures.
pub fn run_cli() -> anyhow::Result<()> {
    run(Cli::parse())
}

/// Run an already parsed command line.
///
/// # Errors
///
/// See [`run_cli`].
pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve { config, addr } => {
            logging::init_logging()?;
            let mut config = AppConfig::load(config.as_deref())?;
            if let Some(addr) = addr {
                config.http.addr = addr;
            }
            let addr = config.socket_addr()?;

            RuntimeConfig::from_env().apply();
            let dispatcher = build_dispatcher(&config)?;
            dispatcher.dump_routes();

            let service = AppService::new(Arc::new(dispatcher))
                .max_body_bytes(config.http.max_body_bytes);
            let handle = HttpServer(service)
                .start(addr)
                .with_context(|| format!("failed to bind {addr}"))?;
            wait_for_shutdown(handle)
        }
        Commands::Routes { config } => {
            let config = AppConfig::load(config.as_deref())?;
            let dispatcher = build_dispatcher(&config)?;
            for router in dispatcher.routers() {
                for entry in router.table().entries() {
                    println!(
                        "{:<8} {:<24} {:<10} {}",
                        entry.method.as_str(),
                        entry.pattern.as_str(),
                        router.name(),
                        entry.name.as_deref().unwrap_or("-"),
                    );
                }
            }
            Ok(())
        }
        Commands::Token { user_id, config } => {
            let config = AppConfig::load(config.as_deref())?;
            let token = jwt_codec(&config).encode(&json!({ "user_id": user_id }))?;
            println!("{token}");
            Ok(())
        }
    }
}

#[cfg(unix)]
fn wait_for_shutdown(handle: ServerHandle) -> anyhow::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals =
        Signals::new([SIGINT, SIGTERM]).context("failed to install signal handlers")?;
    if let Some(signal) = signals.forever().next() {
        info!(signal, "Shutdown signal received");
    }
    handle.stop();
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown(handle: ServerHandle) -> anyhow::Result<()> {
    handle
        .join()
        .map_err(|e| anyhow::anyhow!("server coroutine panicked: {e:?}"))
}
