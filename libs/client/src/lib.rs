//! # nh-client
//!
//! Thin client for a Nomad-style scheduler HTTP API.
//!
//! - [`SchedulerClient`]: one-shot calls (jobs, allocations, nodes, stats)
//! - [`AllocationWatcher`]: blocking-query loop over a job's allocations
//! - [`SchedulerClient::stream_logs`]: follow a task's stdout/stderr
//!
//! Job documents themselves come from [`nh_jobspec`], re-exported here as
//! [`jobspec`].

mod client;
mod error;
mod logs;
mod types;
mod watch;

pub use client::{SchedulerClient, INDEX_HEADER};
pub use error::{ClientError, WatchError};
pub use logs::{LogDecoder, LogFraming, LogType};
pub use types::{Allocation, AllocationList, BlockingResponse, EvalResponse, JobSummary, NodeSummary};
pub use watch::{
    AllocationSource, AllocationWatcher, ReconnectPolicy, StopHandle, WatchCursor, WatchHandle,
    WatchState,
};

pub use nh_jobspec as jobspec;
