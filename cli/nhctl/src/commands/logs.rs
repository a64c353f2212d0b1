//! Logs command (follow a task's output).

use std::io::Write;

use anyhow::Result;
use clap::Args;
use nh_client::{LogFraming, LogType};
use tracing::info;

use super::CommandContext;

/// Follow the logs of one task in an allocation until interrupted.
#[derive(Debug, Args)]
pub struct LogsCommand {
    /// Allocation ID.
    alloc: String,

    /// Task name within the allocation.
    #[arg(long, short)]
    task: String,

    /// Follow stderr instead of stdout.
    #[arg(long)]
    stderr: bool,

    /// Request JSON-framed output instead of raw chunks.
    #[arg(long)]
    json_frames: bool,
}

impl LogsCommand {
    fn log_type(&self) -> LogType {
        if self.stderr {
            LogType::Stderr
        } else {
            LogType::Stdout
        }
    }

    fn framing(&self) -> LogFraming {
        if self.json_frames {
            LogFraming::Json
        } else {
            LogFraming::Plain
        }
    }

    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let client = ctx.client()?;
        let mut stdout = std::io::stdout();

        let stream = client.stream_logs(
            &self.alloc,
            &self.task,
            self.log_type(),
            self.framing(),
            |text| {
                // A closed stdout (e.g. piped into `head`) just drops output.
                let _ = stdout.write_all(text.as_bytes());
                let _ = stdout.flush();
            },
        );

        tokio::select! {
            result = stream => result?,
            _ = tokio::signal::ctrl_c() => {
                info!(alloc = %self.alloc, task = %self.task, "Interrupted, closing log stream");
            }
        }
        Ok(())
    }
}
