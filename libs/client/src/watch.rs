//! Long-poll watcher for a job's allocations.
//!
//! The watcher issues blocking queries back to back, carrying the cursor
//! from each response into the next request, and hands every response to a
//! callback. A transient failure (a dropped connection, a timeout) resets
//! the cursor to 0 and the request is reissued; the callback never sees the
//! error. Any other failure, such as the scheduler answering 404 for an
//! unknown job, ends the watch with [`WatchError::Rejected`].
//!
//! ```text
//!            ┌──────── success: cursor = index header, callback ───────┐
//!            ▼                                                          │
//!   start ─► WATCHING ── request(cursor, wait) ──────────────────────────┤
//!            ▲                                                          │
//!            └──── transient error: cursor = 0 (optionally back off) ───┘
//!
//!   rejected → STOPPED with WatchError::Rejected
//!
//!   stop()   → STOPPED before the next request; an in-flight request
//!              still completes and may deliver one last callback
//!   cancel() → STOPPED immediately; the in-flight request is dropped
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::client::SchedulerClient;
use crate::error::{ClientError, WatchError};
use crate::types::{Allocation, BlockingResponse};

/// Where the watcher gets allocation snapshots from.
#[async_trait]
pub trait AllocationSource: Send + Sync + 'static {
    type Error: fmt::Display + Send;

    /// Blocking query for `job`'s allocations past `index`, held for at most `wait`.
    async fn fetch_allocations(
        &self,
        job: &str,
        index: u64,
        wait: Duration,
    ) -> Result<BlockingResponse<Vec<Allocation>>, Self::Error>;

    /// Whether a failed request is worth reissuing. Non-transient errors end
    /// the watch.
    fn is_transient(_error: &Self::Error) -> bool {
        true
    }
}

#[async_trait]
impl AllocationSource for SchedulerClient {
    type Error = ClientError;

    async fn fetch_allocations(
        &self,
        job: &str,
        index: u64,
        wait: Duration,
    ) -> Result<BlockingResponse<Vec<Allocation>>, ClientError> {
        self.allocations_blocking(job, index, wait).await
    }

    fn is_transient(error: &ClientError) -> bool {
        matches!(error, ClientError::Transport(_) | ClientError::Decode(_))
    }
}

/// Lifecycle state of a watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// A request is in flight or about to be issued.
    Watching,
    /// Terminal; no further requests are issued.
    Stopped,
}

/// Cursor bookkeeping for a blocking-query loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchCursor {
    index: u64,
    state: WatchState,
    consecutive_errors: u32,
}

impl WatchCursor {
    pub fn new() -> Self {
        Self {
            index: 0,
            state: WatchState::Watching,
            consecutive_errors: 0,
        }
    }

    /// Index to send with the next request.
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    pub fn is_stopped(&self) -> bool {
        self.state == WatchState::Stopped
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    /// Record a successful response carrying `index`.
    pub fn on_success(&mut self, index: u64) {
        self.index = index;
        self.consecutive_errors = 0;
    }

    /// Record a failed request; the next request starts from index 0.
    /// Returns the number of consecutive failures so far.
    pub fn on_error(&mut self) -> u32 {
        self.index = 0;
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);
        self.consecutive_errors
    }

    pub fn stop(&mut self) {
        self.state = WatchState::Stopped;
    }
}

impl Default for WatchCursor {
    fn default() -> Self {
        Self::new()
    }
}

/// What to do after a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconnectPolicy {
    /// Reissue immediately, forever.
    #[default]
    Immediate,
    /// Exponential backoff from `initial` up to `max`; give up after
    /// `max_consecutive_errors` failures in a row.
    Backoff {
        initial: Duration,
        max: Duration,
        max_consecutive_errors: u32,
    },
}

impl ReconnectPolicy {
    /// Delay before the next attempt after `consecutive_errors` failures,
    /// or `None` once the policy gives up.
    pub fn delay_after(&self, consecutive_errors: u32) -> Option<Duration> {
        match *self {
            ReconnectPolicy::Immediate => Some(Duration::ZERO),
            ReconnectPolicy::Backoff {
                initial,
                max,
                max_consecutive_errors,
            } => {
                if consecutive_errors >= max_consecutive_errors {
                    return None;
                }
                let exponent = consecutive_errors.saturating_sub(1).min(31);
                Some(initial.saturating_mul(1 << exponent).min(max))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Run,
    Stop,
    Cancel,
}

/// Stops a watch. Cloneable, so a callback can hold one.
#[derive(Debug, Clone)]
pub struct StopHandle {
    signal: Arc<watch::Sender<Signal>>,
}

impl StopHandle {
    /// Suppress the next request. A request already in flight still completes.
    pub fn stop(&self) {
        self.signal.send_if_modified(|signal| {
            if *signal == Signal::Run {
                *signal = Signal::Stop;
                true
            } else {
                false
            }
        });
    }

    /// Stop and drop the in-flight request; no further callback is delivered.
    pub fn cancel(&self) {
        self.signal.send_replace(Signal::Cancel);
    }
}

/// A watch running on its own task.
#[derive(Debug)]
pub struct WatchHandle {
    stop: StopHandle,
    task: JoinHandle<Result<(), WatchError>>,
}

impl WatchHandle {
    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn cancel(&self) {
        self.stop.cancel();
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Wait for the watch loop to finish.
    pub async fn join(self) -> Result<(), WatchError> {
        self.task.await?
    }
}

/// Long-poll watcher over one job's allocations.
pub struct AllocationWatcher<S> {
    source: Arc<S>,
    job: String,
    wait: Duration,
    policy: ReconnectPolicy,
    signal: Arc<watch::Sender<Signal>>,
}

impl<S: AllocationSource> AllocationWatcher<S> {
    /// `wait` bounds how long the scheduler may hold each request.
    pub fn new(source: Arc<S>, job: impl Into<String>, wait: Duration) -> Self {
        let (signal, _) = watch::channel(Signal::Run);
        Self {
            source,
            job: job.into(),
            wait,
            policy: ReconnectPolicy::default(),
            signal: Arc::new(signal),
        }
    }

    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// A handle that can stop the watch, available before it starts.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            signal: Arc::clone(&self.signal),
        }
    }

    /// Run the watch on a new task.
    pub fn spawn<F>(self, on_change: F) -> WatchHandle
    where
        F: FnMut(Vec<Allocation>) + Send + 'static,
    {
        let stop = self.stop_handle();
        let task = tokio::spawn(self.run(on_change));
        WatchHandle { stop, task }
    }

    /// Run the watch on the current task until stopped, cancelled, or the
    /// reconnect policy gives up.
    pub async fn run<F>(self, mut on_change: F) -> Result<(), WatchError>
    where
        F: FnMut(Vec<Allocation>) + Send + 'static,
    {
        let mut signal = self.signal.subscribe();
        let mut cursor = WatchCursor::new();

        info!(job = %self.job, wait_secs = self.wait.as_secs(), "Starting allocation watch");

        loop {
            let running = *signal.borrow() == Signal::Run;
            if !running {
                cursor.stop();
                break;
            }

            let fetch = self
                .source
                .fetch_allocations(&self.job, cursor.index(), self.wait);
            let result = tokio::select! {
                result = fetch => result,
                _ = cancelled(&mut signal) => {
                    cursor.stop();
                    break;
                }
            };

            match result {
                Ok(response) => {
                    debug!(
                        job = %self.job,
                        index = response.index,
                        allocations = response.value.len(),
                        "Allocation watch received update"
                    );
                    cursor.on_success(response.index);
                    on_change(response.value);
                }
                Err(e) if !S::is_transient(&e) => {
                    warn!(job = %self.job, error = %e, "Allocation watch rejected, stopping");
                    cursor.stop();
                    return Err(WatchError::Rejected {
                        job: self.job.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    let consecutive_errors = cursor.on_error();
                    if consecutive_errors <= 3 {
                        warn!(job = %self.job, error = %e, consecutive_errors, "Allocation watch request failed, reconnecting");
                    } else {
                        error!(job = %self.job, error = %e, consecutive_errors, "Allocation watch failing repeatedly");
                    }

                    let Some(delay) = self.policy.delay_after(consecutive_errors) else {
                        cursor.stop();
                        return Err(WatchError::TooManyErrors {
                            job: self.job.clone(),
                            errors: consecutive_errors,
                        });
                    };
                    if !delay.is_zero() {
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = cancelled(&mut signal) => {
                                cursor.stop();
                                break;
                            }
                        }
                    }
                }
            }
        }

        info!(job = %self.job, "Allocation watch stopped");
        Ok(())
    }
}

impl SchedulerClient {
    /// Watch `job`'s allocations with this client as the source.
    pub fn watch_allocations(&self, job: &str, wait: Duration) -> AllocationWatcher<SchedulerClient> {
        AllocationWatcher::new(Arc::new(self.clone()), job, wait)
    }
}

/// Resolves once the watch is cancelled. Never resolves if every handle is gone.
async fn cancelled(signal: &mut watch::Receiver<Signal>) {
    let closed = signal.wait_for(|s| *s == Signal::Cancel).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}
