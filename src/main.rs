//! Everything MCP Server - Rust Implementation
//!
//! A Model Context Protocol (MCP) server for the Everything (voidtools) file
//! search engine, speaking JSON-RPC over stdio.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use everything_mcp_server::config::Config;
use everything_mcp_server::everything::client::{EverythingClient, Searcher};
use everything_mcp_server::everything::utils::render_results;
use everything_mcp_server::mcp::lifecycle::StopReason;
use everything_mcp_server::mcp::methods::everything_dispatcher;
use everything_mcp_server::mcp::server::McpServer;
use everything_mcp_server::mcp::tools::ToolHandler;

/// Everything MCP Server
#[derive(Parser)]
#[command(name = "everything-mcp")]
#[command(author, version, about = "Everything MCP Server - A Model Context Protocol server for Everything file search")]
struct Cli {
    /// Everything HTTP server URL (overrides EVERYTHING_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Everything HTTP server port (overrides EVERYTHING_PORT)
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Verbose logging on stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one search against Everything and print the results
    Search {
        /// Everything query, e.g. "ext:pdf report"
        query: String,

        /// Maximum number of results
        #[arg(long, default_value_t = 20)]
        max_results: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration; CLI flags win over the environment
    let mut config = Config::from_env().context("failed to load configuration")?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    config.debug |= cli.debug;
    config.validate().context("invalid configuration")?;

    // Initialize logging; stdout carries protocol traffic only
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref(), config.debug))
        .with_writer(std::io::stderr)
        .init();

    let client = EverythingClient::new(&config).context("failed to create Everything client")?;
    info!(base_url = %client.base_url(), authenticated = config.has_credentials(), "Everything client ready");

    match cli.command {
        Some(Commands::Search { query, max_results }) => {
            let results = client
                .search(&query, max_results)
                .await
                .with_context(|| format!("search for {:?} failed", query))?;
            print!(
                "{}",
                render_results(&format!("Search query: {}", query), &results, max_results as usize, true)
            );
            Ok(())
        }
        None => {
            // The stdin reader may still be parked in a blocking read, so
            // leave through process::exit rather than runtime shutdown
            match run_server(config, client).await {
                Ok(()) => std::process::exit(0),
                Err(e) => {
                    error!("{:#}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}

/// `RUST_LOG` directives over an INFO default; `debug` raises everything to DEBUG
fn log_filter(rust_log: Option<&str>, debug: bool) -> EnvFilter {
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .parse_lossy(rust_log.unwrap_or_default());
    if debug {
        filter.add_directive(Level::DEBUG.into())
    } else {
        filter
    }
}

async fn run_server(config: Config, client: EverythingClient) -> anyhow::Result<()> {
    let tools = Arc::new(ToolHandler::new(Arc::new(client)));
    let dispatcher = everything_dispatcher(tools)?;

    let mut server = McpServer::new(dispatcher).with_handler_timeout(config.handler_timeout);
    let reason = server.run_stdio().await.context("MCP server failed")?;
    if reason == StopReason::Signalled {
        info!("Shutdown signal received");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn test_log_filter_defaults_to_info() {
        assert_eq!(log_filter(None, false).max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(log_filter(Some(""), false).max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn test_rust_log_can_raise_level() {
        assert_eq!(log_filter(Some("debug"), false).max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(log_filter(Some("trace"), false).max_level_hint(), Some(LevelFilter::TRACE));
    }

    #[test]
    fn test_debug_flag_raises_level() {
        assert_eq!(log_filter(None, true).max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(log_filter(Some("warn"), true).max_level_hint(), Some(LevelFilter::DEBUG));
    }
}
