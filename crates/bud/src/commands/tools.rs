//! Tools command - prints the merged tool list, then exits.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use super::Context;
use crate::gateway::Gateway;

/// Arguments for the tools command.
#[derive(Args, Debug)]
pub struct ToolsArgs {
    /// Path to the .mcp.json child server file (overrides config)
    #[arg(long, env = "BUD_MCP_CONFIG")]
    pub mcp_config: Option<PathBuf>,
}

/// Run the tools command.
pub async fn run(args: ToolsArgs, ctx: &Context) -> Result<()> {
    let proxy = ctx.proxy_config(args.mcp_config);
    let gateway = Gateway::start(&ctx.config.server(), &proxy).await?;

    let printed = if ctx.json_output {
        print_json(&gateway)
    } else {
        print_table(&gateway, ctx.verbose);
        Ok(())
    };

    gateway.shutdown().await;
    printed
}

/// Print the tool list in `tools/list` wire form.
fn print_json(gateway: &Gateway) -> Result<()> {
    let tools = gateway.registry().to_wire();
    println!("{}", serde_json::to_string_pretty(&tools)?);
    Ok(())
}

/// Print the tool list as a table.
fn print_table(gateway: &Gateway, verbose: bool) {
    println!("{:<30} DESCRIPTION", "NAME");
    println!("{}", "-".repeat(80));

    for definition in gateway.registry().definitions() {
        println!("{:<30} {}", definition.name, first_line(&definition.description));
        if verbose {
            for (name, property) in &definition.properties {
                let marker = if definition.required.contains(name) { "*" } else { " " };
                println!("  {marker}{name}: {}", property.type_tag);
            }
        }
    }

    println!();
    let children = gateway.child_names();
    if children.is_empty() {
        println!("{} tools, no child servers", gateway.registry().len());
    } else {
        println!(
            "{} tools, child servers: {}",
            gateway.registry().len(),
            children.join(", ")
        );
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}
