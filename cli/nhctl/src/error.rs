//! Error handling and display for the CLI.

use colored::Colorize;
use nh_client::{ClientError, WatchError};
use nh_jobspec::JobSpecError;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {:#}", "Error:".red().bold(), err);

    if let Some(hint) = hint_for(err) {
        eprintln!("\n{}", format!("Hint: {hint}").yellow());
    }
}

fn hint_for(err: &anyhow::Error) -> Option<&'static str> {
    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        return match cli_err {
            CliError::NotFound(_) => Some("Run `nh jobs list` to see registered jobs."),
            CliError::InvalidArgument(_) => None,
        };
    }

    if let Some(client_err) = err.downcast_ref::<ClientError>() {
        return match client_err {
            ClientError::Transport(_) => Some(
                "Check that the scheduler is reachable. Set it with --address, NOMAD_ADDR or `nh config set-address`.",
            ),
            ClientError::InvalidAddress(_) => {
                Some("Addresses look like `127.0.0.1:4646` or `https://nomad.example.com`.")
            }
            ClientError::Api { status: 403, .. } => {
                Some("The scheduler refused the request. Check its ACL policy.")
            }
            ClientError::Api { status: 404, .. } => {
                Some("The scheduler does not know this resource. Check the ID.")
            }
            _ => None,
        };
    }

    if let Some(spec_err) = err.downcast_ref::<JobSpecError>() {
        return match spec_err {
            JobSpecError::NotFound { .. } => {
                Some("Group and task names must match ones already in the job.")
            }
            JobSpecError::MissingNetwork { .. } => {
                Some("Ports and bandwidth need a network block in the task's Resources.")
            }
            _ => None,
        };
    }

    if let Some(watch_err) = err.downcast_ref::<WatchError>() {
        return match watch_err {
            WatchError::TooManyErrors { .. } => {
                Some("The scheduler kept failing. Check its health with `nh nodes list`.")
            }
            WatchError::Rejected { .. } => Some("Run `nh jobs list` to see registered jobs."),
            WatchError::Join(_) => None,
        };
    }

    None
}
