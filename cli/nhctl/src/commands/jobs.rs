//! Job commands (list, inspect, submit, plan, scaffold).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use nh_client::JobSummary;
use nh_jobspec::JobTemplate;
use serde::Serialize;
use tabled::Tabled;

use crate::error::CliError;
use crate::output::{print_info, print_output, print_single, print_success, OutputFormat};
use crate::scaffold::ScaffoldArgs;

use super::CommandContext;

/// Job commands.
#[derive(Debug, Args)]
pub struct JobsCommand {
    #[command(subcommand)]
    command: JobsSubcommand,
}

#[derive(Debug, Subcommand)]
enum JobsSubcommand {
    /// List registered jobs.
    List,

    /// Show a job document.
    Get(JobNameArgs),

    /// Deregister a job.
    Delete(JobNameArgs),

    /// Submit a job document from a file.
    Run(JobFileArgs),

    /// Dry-run a job document from a file and show the plan.
    Plan(JobFileArgs),

    /// Write a new job document built from templates.
    Init(InitArgs),
}

#[derive(Debug, Args)]
struct JobNameArgs {
    /// Job name.
    name: String,
}

#[derive(Debug, Args)]
struct JobFileArgs {
    /// Path to a `{"Job": {...}}` JSON document.
    file: PathBuf,
}

#[derive(Debug, Args)]
struct InitArgs {
    #[command(flatten)]
    job: ScaffoldArgs,

    /// Write the document here instead of stdout.
    #[arg(long, short)]
    output: Option<PathBuf>,
}

impl JobsCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            JobsSubcommand::List => list_jobs(ctx).await,
            JobsSubcommand::Get(args) => get_job(ctx, args).await,
            JobsSubcommand::Delete(args) => delete_job(ctx, args).await,
            JobsSubcommand::Run(args) => run_job(ctx, args).await,
            JobsSubcommand::Plan(args) => plan_job(ctx, args).await,
            JobsSubcommand::Init(args) => init_job(ctx, args),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
struct JobRow {
    #[tabled(rename = "ID")]
    id: String,

    #[tabled(rename = "Type")]
    job_type: String,

    #[tabled(rename = "Priority")]
    priority: i64,

    #[tabled(rename = "Status")]
    status: String,
}

impl From<JobSummary> for JobRow {
    fn from(job: JobSummary) -> Self {
        Self {
            id: job.id,
            job_type: job.job_type,
            priority: job.priority,
            status: job.status,
        }
    }
}

async fn list_jobs(ctx: CommandContext) -> Result<()> {
    let jobs = ctx.client()?.jobs().await?;

    match ctx.format {
        OutputFormat::Table => {
            let rows: Vec<JobRow> = jobs.into_iter().map(JobRow::from).collect();
            print_output(&rows, ctx.format);
        }
        OutputFormat::Json => print_single(&jobs),
    }
    Ok(())
}

async fn get_job(ctx: CommandContext, args: JobNameArgs) -> Result<()> {
    let job = ctx
        .client()?
        .find_job(&args.name)
        .await?
        .ok_or_else(|| CliError::NotFound(format!("job '{}'", args.name)))?;

    print_single(job.job());
    Ok(())
}

async fn delete_job(ctx: CommandContext, args: JobNameArgs) -> Result<()> {
    let eval = ctx.client()?.delete_job(&args.name).await?;

    match ctx.format {
        OutputFormat::Json => print_single(&eval),
        OutputFormat::Table => {
            print_success(&format!("Deregistered job '{}'", args.name));
            print_info(&format!("Evaluation: {}", eval.eval_id));
        }
    }
    Ok(())
}

fn read_job(path: &Path) -> Result<JobTemplate> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read job file {:?}", path))?;
    JobTemplate::from_json(&contents).with_context(|| format!("Failed to parse job file {:?}", path))
}

async fn run_job(ctx: CommandContext, args: JobFileArgs) -> Result<()> {
    let job = read_job(&args.file)?;
    let eval = ctx.client()?.submit_job(&job).await?;

    match ctx.format {
        OutputFormat::Json => print_single(&eval),
        OutputFormat::Table => {
            print_success(&format!("Submitted job '{}'", job.id()));
            print_info(&format!("Evaluation: {}", eval.eval_id));
            print_info(&format!("Watch it with: nh allocs watch {}", job.id()));
        }
    }
    Ok(())
}

async fn plan_job(ctx: CommandContext, args: JobFileArgs) -> Result<()> {
    let job = read_job(&args.file)?;
    let plan = ctx.client()?.plan_job(&job, job.id()).await?;

    print_single(&plan);
    Ok(())
}

fn init_job(ctx: CommandContext, args: InitArgs) -> Result<()> {
    let job = args.job.build(ctx.config.templates()?)?;
    let document = job.to_json_pretty()?;

    match args.output {
        Some(path) => {
            fs::write(&path, format!("{document}\n"))
                .with_context(|| format!("Failed to write job file {:?}", path))?;
            print_success(&format!("Wrote job '{}' to {}", job.id(), path.display()));
        }
        None => println!("{document}"),
    }
    Ok(())
}
