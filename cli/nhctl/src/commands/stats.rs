//! Stats command (host resource usage of a client agent).

use anyhow::Result;
use clap::Args;
use serde_json::Value;

use crate::output::{print_single, OutputFormat};

use super::CommandContext;

/// Show host resource usage reported by a client agent.
#[derive(Debug, Args)]
pub struct StatsCommand {
    /// Client agent address (defaults to the scheduler address).
    #[arg(long)]
    agent: Option<String>,
}

impl StatsCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let agent = self.agent.as_deref().unwrap_or(ctx.address());
        let stats = ctx.client()?.resource_usage(agent).await?;

        match ctx.format {
            OutputFormat::Json => print_single(&stats),
            OutputFormat::Table => {
                for line in summary(&stats) {
                    println!("{line}");
                }
            }
        }
        Ok(())
    }
}

const MIB: f64 = 1024.0 * 1024.0;

/// One line per headline figure; fields the agent did not report are skipped.
fn summary(stats: &Value) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(uptime) = stats["Uptime"].as_u64() {
        lines.push(format!("Uptime:  {}h{:02}m", uptime / 3600, uptime % 3600 / 60));
    }

    if let Some(cpus) = stats["CPU"].as_array() {
        let idle: Vec<f64> = cpus.iter().filter_map(|cpu| cpu["Idle"].as_f64()).collect();
        if !idle.is_empty() {
            let busy = 100.0 - idle.iter().sum::<f64>() / idle.len() as f64;
            lines.push(format!("CPU:     {} cores, {busy:.1}% busy", cpus.len()));
        }
    }

    let memory = &stats["Memory"];
    if let (Some(used), Some(total)) = (memory["Used"].as_f64(), memory["Total"].as_f64()) {
        lines.push(format!("Memory:  {:.0} / {:.0} MiB", used / MIB, total / MIB));
    }

    if let Some(disks) = stats["DiskStats"].as_array() {
        for disk in disks {
            if let (Some(mount), Some(percent)) =
                (disk["Mountpoint"].as_str(), disk["UsedPercent"].as_f64())
            {
                lines.push(format!("Disk:    {mount} {percent:.1}% used"));
            }
        }
    }

    lines
}
