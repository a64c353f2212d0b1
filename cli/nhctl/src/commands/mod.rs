//! CLI commands.

mod allocs;
mod config;
mod jobs;
mod logs;
mod nodes;
mod stats;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use nh_client::SchedulerClient;

use crate::config::Config;
use crate::output::OutputFormat;

/// nh - build, submit and follow scheduler jobs.
#[derive(Debug, Parser)]
#[command(name = "nh")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format (table or json).
    #[arg(long, global = true, default_value = "table")]
    format: String,

    /// Scheduler address, overriding the saved config.
    #[arg(long, global = true)]
    address: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Build, submit and inspect jobs.
    Jobs(jobs::JobsCommand),

    /// Inspect and watch allocations.
    Allocs(allocs::AllocsCommand),

    /// Inspect client nodes.
    Nodes(nodes::NodesCommand),

    /// Show host resource usage of a client agent.
    Stats(stats::StatsCommand),

    /// Follow the logs of a task.
    Logs(logs::LogsCommand),

    /// Show or update saved CLI configuration.
    Config(config::ConfigCommand),

    /// Show CLI version.
    Version,
}

impl Cli {
    /// Run the CLI command.
    pub async fn run(self) -> Result<()> {
        let config = Config::load()?;

        let ctx = CommandContext {
            config,
            format: OutputFormat::parse(&self.format),
            address: self.address,
        };

        match self.command {
            Commands::Jobs(cmd) => cmd.run(ctx).await,
            Commands::Allocs(cmd) => cmd.run(ctx).await,
            Commands::Nodes(cmd) => cmd.run(ctx).await,
            Commands::Stats(cmd) => cmd.run(ctx).await,
            Commands::Logs(cmd) => cmd.run(ctx).await,
            Commands::Config(cmd) => cmd.run(ctx).await,
            Commands::Version => {
                println!("nh {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub config: Config,
    pub format: OutputFormat,
    address: Option<String>,
}

impl CommandContext {
    /// Scheduler address, preferring the flag over the saved config.
    pub fn address(&self) -> &str {
        self.address.as_deref().unwrap_or(&self.config.address)
    }

    /// Long-poll wait from config.
    pub fn wait(&self) -> Duration {
        self.config.wait()
    }

    /// Get a scheduler client seeded with the configured job templates.
    pub fn client(&self) -> Result<SchedulerClient> {
        let client = SchedulerClient::new(self.address())
            .with_context(|| format!("Failed to build scheduler client for '{}'", self.address()))?;
        Ok(client.with_templates(self.config.templates()?))
    }
}
