//! Config commands (saved scheduler address and watch settings).

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::config::config_path;
use crate::output::{print_single, print_success, OutputFormat};

use super::CommandContext;

/// Show or update saved CLI configuration.
#[derive(Debug, Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Debug, Subcommand)]
enum ConfigSubcommand {
    /// Show the effective configuration.
    Show,

    /// Save the scheduler address.
    SetAddress(SetAddressArgs),
}

#[derive(Debug, Args)]
struct SetAddressArgs {
    /// `host:port` or a full URL.
    address: String,
}

#[derive(Debug, Serialize)]
struct ConfigView {
    path: String,
    address: String,
    wait_secs: u64,
    template_dir: Option<String>,
}

impl ConfigCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            ConfigSubcommand::Show => show(ctx),
            ConfigSubcommand::SetAddress(args) => set_address(ctx, args),
        }
    }
}

fn show(ctx: CommandContext) -> Result<()> {
    let view = ConfigView {
        path: config_path()?.display().to_string(),
        address: ctx.address().to_string(),
        wait_secs: ctx.config.wait_secs,
        template_dir: ctx
            .config
            .template_dir
            .as_ref()
            .map(|dir| dir.display().to_string()),
    };

    match ctx.format {
        OutputFormat::Json => print_single(&view),
        OutputFormat::Table => {
            println!("path: {}", view.path);
            println!("address: {}", view.address);
            println!("wait_secs: {}", view.wait_secs);
            println!("template_dir: {}", view.template_dir.as_deref().unwrap_or("-"));
        }
    }

    Ok(())
}

fn set_address(mut ctx: CommandContext, args: SetAddressArgs) -> Result<()> {
    // Reject addresses the client cannot use before persisting them.
    nh_client::SchedulerClient::new(&args.address)?;

    ctx.config.address = args.address;
    ctx.config.save()?;

    match ctx.format {
        OutputFormat::Json => print_single(&serde_json::json!({ "address": ctx.config.address })),
        OutputFormat::Table => print_success(&format!("Scheduler address set to {}", ctx.config.address)),
    }

    Ok(())
}
