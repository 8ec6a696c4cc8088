//! Serve command - runs the gateway over stdio or HTTP.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use bud_mcp::serve_stdio;
use bud_server::HttpServer;
use clap::Args;
use tracing::info;

use super::Context;
use crate::gateway::Gateway;

/// Arguments for the serve command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Serve HTTP instead of stdio, optionally on ADDR (default from config)
    #[arg(long, value_name = "ADDR", num_args = 0..=1, default_missing_value = "")]
    pub http: Option<String>,

    /// Path to the .mcp.json child server file (overrides config)
    #[arg(long, env = "BUD_MCP_CONFIG")]
    pub mcp_config: Option<PathBuf>,
}

/// Run the serve command.
pub async fn run(args: ServeArgs, ctx: &Context) -> Result<()> {
    let server = ctx.config.server();
    let proxy = ctx.proxy_config(args.mcp_config);
    let gateway = Gateway::start(&server, &proxy).await?;

    let result = match args.http {
        Some(addr) => {
            let addr = if addr.is_empty() {
                server.http_addr.clone()
            } else {
                addr
            };
            let http = HttpServer::new(gateway.dispatcher());
            tokio::select! {
                served = http.run(&addr) => served.context("HTTP server failed"),
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupt received, shutting down");
                    Ok(())
                }
            }
        }
        None => serve_stdio(&gateway.dispatcher())
            .await
            .context("stdio transport failed"),
    };

    gateway.shutdown().await;
    result
}
