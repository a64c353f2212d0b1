//! Allocation commands (list, inspect, watch).

use std::time::Duration;

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use nh_client::{Allocation, ReconnectPolicy};
use serde::Serialize;
use tabled::Tabled;
use tracing::info;

use crate::output::{print_output, print_single, OutputFormat};

use super::CommandContext;

/// Allocation commands.
#[derive(Debug, Args)]
pub struct AllocsCommand {
    #[command(subcommand)]
    command: AllocsSubcommand,
}

#[derive(Debug, Subcommand)]
enum AllocsSubcommand {
    /// List the allocations of a job.
    List(ListAllocsArgs),

    /// Show one allocation.
    Get(GetAllocArgs),

    /// Follow a job's allocations until interrupted.
    Watch(WatchAllocsArgs),
}

#[derive(Debug, Args)]
struct ListAllocsArgs {
    /// Job name.
    job: String,

    /// Print only this field of each allocation (e.g. ClientStatus).
    #[arg(long)]
    property: Option<String>,
}

#[derive(Debug, Args)]
struct GetAllocArgs {
    /// Allocation ID.
    id: String,
}

#[derive(Debug, Args)]
struct WatchAllocsArgs {
    /// Job name.
    job: String,

    /// Seconds the scheduler may hold each request (defaults to config).
    #[arg(long)]
    wait: Option<u64>,

    /// Back off between failed requests and give up after this many in a row.
    #[arg(long)]
    max_errors: Option<u32>,
}

impl AllocsCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            AllocsSubcommand::List(args) => list_allocs(ctx, args).await,
            AllocsSubcommand::Get(args) => get_alloc(ctx, args).await,
            AllocsSubcommand::Watch(args) => watch_allocs(ctx, args).await,
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
struct AllocRow {
    #[tabled(rename = "ID")]
    id: String,

    #[tabled(rename = "Group")]
    task_group: String,

    #[tabled(rename = "Node")]
    node: String,

    #[tabled(rename = "Desired")]
    desired: String,

    #[tabled(rename = "Status")]
    status: String,
}

impl From<&Allocation> for AllocRow {
    fn from(alloc: &Allocation) -> Self {
        Self {
            id: short_id(&alloc.id).to_string(),
            task_group: alloc.task_group.clone(),
            node: short_id(&alloc.node_id).to_string(),
            desired: alloc.desired_status.clone(),
            status: alloc.client_status.clone(),
        }
    }
}

/// Scheduler IDs are UUIDs; the first block is enough to tell them apart.
fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn print_allocations(allocations: &[Allocation], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            let rows: Vec<AllocRow> = allocations.iter().map(AllocRow::from).collect();
            print_output(&rows, format);
        }
        OutputFormat::Json => print_single(allocations),
    }
}

async fn list_allocs(ctx: CommandContext, args: ListAllocsArgs) -> Result<()> {
    let allocations = ctx.client()?.allocations(&args.job).await?;

    let Some(field) = args.property else {
        print_allocations(&allocations.allocations, ctx.format);
        return Ok(());
    };

    let values = allocations.property(&field);
    match ctx.format {
        OutputFormat::Json => print_single(&values),
        OutputFormat::Table => {
            for value in values {
                match value.as_str() {
                    Some(text) => println!("{text}"),
                    None => println!("{value}"),
                }
            }
        }
    }
    Ok(())
}

async fn get_alloc(ctx: CommandContext, args: GetAllocArgs) -> Result<()> {
    let alloc = ctx.client()?.allocation(&args.id).await?;
    print_single(&alloc);
    Ok(())
}

async fn watch_allocs(ctx: CommandContext, args: WatchAllocsArgs) -> Result<()> {
    let wait = args.wait.map(Duration::from_secs).unwrap_or_else(|| ctx.wait());
    let format = ctx.format;

    let mut watcher = ctx.client()?.watch_allocations(&args.job, wait);
    if let Some(max_errors) = args.max_errors {
        watcher = watcher.with_policy(ReconnectPolicy::Backoff {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(30),
            max_consecutive_errors: max_errors,
        });
    }

    if format == OutputFormat::Table {
        eprintln!(
            "{}",
            format!("Watching allocations of '{}' (Ctrl-C to stop)", args.job).dimmed()
        );
    }

    let handle = watcher.spawn(move |allocations| print_allocations(&allocations, format));
    let stop = handle.stop_handle();
    let finished = handle.join();
    tokio::pin!(finished);

    tokio::select! {
        result = &mut finished => result?,
        _ = tokio::signal::ctrl_c() => {
            info!(job = %args.job, "Interrupted, cancelling watch");
            stop.cancel();
            finished.await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("5d2f4f6c-1a2b-3c4d-5e6f-708192a3b4c5", "5d2f4f6c")]
    #[case("abc", "abc")]
    #[case("", "")]
    fn short_id_keeps_first_block(#[case] id: &str, #[case] expected: &str) {
        assert_eq!(short_id(id), expected);
    }

    #[test]
    fn row_from_allocation() {
        let alloc: Allocation = serde_json::from_value(serde_json::json!({
            "ID": "5d2f4f6c-1a2b-3c4d-5e6f-708192a3b4c5",
            "NodeID": "0e1f2a3b-0000-0000-0000-000000000000",
            "TaskGroup": "api",
            "DesiredStatus": "run",
            "ClientStatus": "running"
        }))
        .unwrap();

        let row = AllocRow::from(&alloc);
        assert_eq!(row.id, "5d2f4f6c");
        assert_eq!(row.node, "0e1f2a3b");
        assert_eq!(row.task_group, "api");
        assert_eq!(row.status, "running");
    }
}
