//! Node commands (client nodes of the cluster).

use anyhow::Result;
use clap::{Args, Subcommand};
use nh_client::{ClientError, NodeSummary};
use serde::Serialize;
use tabled::Tabled;

use crate::error::CliError;
use crate::output::{print_output, print_single, OutputFormat};

use super::CommandContext;

/// Node commands.
#[derive(Debug, Args)]
pub struct NodesCommand {
    #[command(subcommand)]
    command: NodesSubcommand,
}

#[derive(Debug, Subcommand)]
enum NodesSubcommand {
    /// List all nodes in the region.
    List,

    /// Get node details.
    Get(GetNodeArgs),
}

#[derive(Debug, Args)]
struct GetNodeArgs {
    /// Node ID.
    node: String,
}

impl NodesCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            NodesSubcommand::List => list_nodes(ctx).await,
            NodesSubcommand::Get(args) => get_node(ctx, args).await,
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
struct NodeRow {
    #[tabled(rename = "ID")]
    id: String,

    #[tabled(rename = "Name")]
    name: String,

    #[tabled(rename = "DC")]
    datacenter: String,

    #[tabled(rename = "Class", display = "display_class")]
    node_class: String,

    #[tabled(rename = "Drain")]
    drain: bool,

    #[tabled(rename = "Status")]
    status: String,
}

fn display_class(class: &String) -> String {
    if class.is_empty() {
        "-".to_string()
    } else {
        class.clone()
    }
}

impl From<NodeSummary> for NodeRow {
    fn from(node: NodeSummary) -> Self {
        Self {
            id: node.id,
            name: node.name,
            datacenter: node.datacenter,
            node_class: node.node_class,
            drain: node.drain,
            status: node.status,
        }
    }
}

/// List all nodes.
async fn list_nodes(ctx: CommandContext) -> Result<()> {
    let nodes = ctx.client()?.nodes().await?;

    match ctx.format {
        OutputFormat::Table => {
            let rows: Vec<NodeRow> = nodes.into_iter().map(NodeRow::from).collect();
            print_output(&rows, ctx.format);
        }
        OutputFormat::Json => print_single(&nodes),
    }
    Ok(())
}

/// Get node details.
async fn get_node(ctx: CommandContext, args: GetNodeArgs) -> Result<()> {
    let node = ctx
        .client()?
        .node_status(&args.node)
        .await
        .map_err(|e| match e {
            ClientError::Api { status: 404, .. } => {
                anyhow::Error::from(CliError::NotFound(format!("node '{}'", args.node)))
            }
            other => other.into(),
        })?;

    print_single(&node);
    Ok(())
}
