//! Product assistant entry point

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use prodassist::app::AppContext;
use prodassist::cli::{Args, Commands};
use prodassist::config::{ApiKeys, AppConfig};
use prodassist::{api, logging, mcp};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if let Err(message) = args.validate() {
        eprintln!("{}", message);
        std::process::exit(2);
    }

    let level = args.verbosity().log_level();

    // The MCP server owns stdout for protocol frames; its logs go to stderr.
    if matches!(args.command, Some(Commands::McpServer)) {
        logging::init_stderr_logging(level)?;
    } else {
        logging::init_logging(level)?;
    }

    let mut config =
        AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    match args.command {
        Some(Commands::Serve { host, port }) => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            let context = AppContext::initialize(config).await?;
            api::serve(Arc::new(context)).await?;
        }
        Some(Commands::McpServer) => {
            let keys = ApiKeys::resolve(&config);
            mcp::server::run(&config, &keys).await?;
        }
        Some(Commands::Config) => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
        None => {
            if let Some(query) = args.query {
                let context = AppContext::initialize(config).await?;
                let answer = context.controller().run(&query, &args.thread).await?;
                println!("{}", answer);
            }
        }
    }

    Ok(())
}
