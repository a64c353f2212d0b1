//! Allocation watcher behaviour against a scripted allocation source.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nh_client::{
    Allocation, AllocationSource, AllocationWatcher, BlockingResponse, ReconnectPolicy, WatchError,
};
use tokio::sync::{mpsc, Notify};

#[derive(Debug)]
enum FetchError {
    Hangup,
    UnknownJob,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Hangup => f.write_str("socket hang up"),
            FetchError::UnknownJob => f.write_str("job not found"),
        }
    }
}

enum Step {
    Respond(u64, Vec<Allocation>),
    Hangup,
    UnknownJob,
    /// Respond once the gate is opened.
    Gated(Arc<Notify>, u64, Vec<Allocation>),
}

/// Replays a fixed script of responses; blocks forever once it runs out.
struct ScriptedSource {
    steps: Mutex<VecDeque<Step>>,
    requested: Mutex<Vec<u64>>,
    entered: mpsc::UnboundedSender<u64>,
}

impl ScriptedSource {
    fn new(steps: Vec<Step>) -> (Arc<Self>, mpsc::UnboundedReceiver<u64>) {
        let (entered, rx) = mpsc::unbounded_channel();
        let source = Arc::new(Self {
            steps: Mutex::new(steps.into()),
            requested: Mutex::new(Vec::new()),
            entered,
        });
        (source, rx)
    }

    fn requested(&self) -> Vec<u64> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl AllocationSource for ScriptedSource {
    type Error = FetchError;

    async fn fetch_allocations(
        &self,
        job: &str,
        index: u64,
        _wait: Duration,
    ) -> Result<BlockingResponse<Vec<Allocation>>, FetchError> {
        assert_eq!(job, "web");
        self.requested.lock().unwrap().push(index);
        let _ = self.entered.send(index);

        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Respond(index, value)) => Ok(BlockingResponse { index, value }),
            Some(Step::Hangup) => Err(FetchError::Hangup),
            Some(Step::UnknownJob) => Err(FetchError::UnknownJob),
            Some(Step::Gated(gate, index, value)) => {
                gate.notified().await;
                Ok(BlockingResponse { index, value })
            }
            None => std::future::pending().await,
        }
    }

    fn is_transient(error: &FetchError) -> bool {
        matches!(error, FetchError::Hangup)
    }
}

fn alloc(id: &str) -> Allocation {
    serde_json::from_value(serde_json::json!({ "ID": id, "ClientStatus": "running" })).unwrap()
}

fn ids(allocations: &[Allocation]) -> Vec<String> {
    allocations.iter().map(|a| a.id.clone()).collect()
}

#[tokio::test]
async fn reconnects_after_error_with_reset_index_and_stops() {
    let (source, _entered) = ScriptedSource::new(vec![
        Step::Respond(5, vec![alloc("a1")]),
        Step::Hangup,
        Step::Respond(9, vec![alloc("a1"), alloc("a2")]),
        Step::Respond(12, vec![]),
    ]);

    let watcher = AllocationWatcher::new(Arc::clone(&source), "web", Duration::from_secs(30));
    let stop = watcher.stop_handle();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&seen);
    watcher
        .run(move |allocations| {
            let mut seen = sink.lock().unwrap();
            seen.push(ids(&allocations));
            if seen.len() == 2 {
                stop.stop();
            }
        })
        .await
        .unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![vec!["a1".to_string()], vec!["a1".to_string(), "a2".to_string()]]
    );
    // Cursor: 0 initially, 5 after the first response, back to 0 after the hangup.
    assert_eq!(source.requested(), vec![0, 5, 0]);
}

#[tokio::test]
async fn stop_lets_in_flight_request_deliver_one_last_callback() {
    let gate = Arc::new(Notify::new());
    let (source, mut entered) = ScriptedSource::new(vec![Step::Gated(
        Arc::clone(&gate),
        4,
        vec![alloc("a1")],
    )]);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = AllocationWatcher::new(Arc::clone(&source), "web", Duration::from_secs(30))
        .spawn(move |allocations| {
            let _ = tx.send(ids(&allocations));
        });

    assert_eq!(entered.recv().await, Some(0));
    handle.stop();
    gate.notify_one();
    handle.join().await.unwrap();

    assert_eq!(rx.recv().await, Some(vec!["a1".to_string()]));
    assert!(rx.recv().await.is_none());
    assert_eq!(source.requested(), vec![0]);
}

#[tokio::test]
async fn cancel_drops_in_flight_request() {
    let (source, mut entered) = ScriptedSource::new(vec![Step::Respond(3, vec![alloc("a1")])]);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = AllocationWatcher::new(Arc::clone(&source), "web", Duration::from_secs(30))
        .spawn(move |allocations| {
            let _ = tx.send(ids(&allocations));
        });

    assert_eq!(rx.recv().await, Some(vec!["a1".to_string()]));
    // Second request blocks forever on the exhausted script.
    assert_eq!(entered.recv().await, Some(0));
    assert_eq!(entered.recv().await, Some(3));
    handle.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle.join())
        .await
        .expect("cancel should end the watch")
        .unwrap();

    assert!(rx.recv().await.is_none());
    assert_eq!(source.requested(), vec![0, 3]);
}

#[tokio::test]
async fn stop_before_start_issues_no_request() {
    let (source, _entered) = ScriptedSource::new(vec![Step::Respond(1, vec![])]);
    let watcher = AllocationWatcher::new(Arc::clone(&source), "web", Duration::from_secs(30));
    watcher.stop_handle().stop();

    watcher.run(|_| panic!("no callback expected")).await.unwrap();
    assert!(source.requested().is_empty());
}

#[tokio::test(start_paused = true)]
async fn backoff_policy_gives_up_after_consecutive_errors() {
    let (source, _entered) =
        ScriptedSource::new(vec![Step::Hangup, Step::Hangup, Step::Hangup]);

    let started = tokio::time::Instant::now();
    let result = AllocationWatcher::new(Arc::clone(&source), "web", Duration::from_secs(30))
        .with_policy(ReconnectPolicy::Backoff {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(10),
            max_consecutive_errors: 3,
        })
        .run(|_| panic!("no callback expected"))
        .await;

    assert!(matches!(
        result,
        Err(WatchError::TooManyErrors { errors: 3, .. })
    ));
    assert_eq!(source.requested(), vec![0, 0, 0]);
    // Slept 1s then 2s between the three attempts.
    assert!(started.elapsed() >= Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn backoff_resets_after_success() {
    let (source, _entered) = ScriptedSource::new(vec![
        Step::Hangup,
        Step::Respond(2, vec![alloc("a1")]),
        Step::Hangup,
        Step::Respond(6, vec![alloc("a2")]),
    ]);

    let watcher = AllocationWatcher::new(Arc::clone(&source), "web", Duration::from_secs(30))
        .with_policy(ReconnectPolicy::Backoff {
            initial: Duration::from_millis(100),
            max: Duration::from_secs(1),
            max_consecutive_errors: 2,
        });
    let stop = watcher.stop_handle();
    let calls = Arc::new(Mutex::new(0));

    let counter = Arc::clone(&calls);
    watcher
        .run(move |_| {
            let mut calls = counter.lock().unwrap();
            *calls += 1;
            if *calls == 2 {
                stop.stop();
            }
        })
        .await
        .unwrap();

    assert_eq!(*calls.lock().unwrap(), 2);
    assert_eq!(source.requested(), vec![0, 0, 2, 0]);
}

#[tokio::test]
async fn rejected_request_ends_watch_without_retry() {
    let (source, _entered) = ScriptedSource::new(vec![
        Step::Respond(4, vec![alloc("a1")]),
        Step::UnknownJob,
        Step::Respond(5, vec![alloc("a2")]),
    ]);
    let calls = Arc::new(Mutex::new(0));

    let counter = Arc::clone(&calls);
    let result = AllocationWatcher::new(Arc::clone(&source), "web", Duration::from_secs(30))
        .run(move |_| *counter.lock().unwrap() += 1)
        .await;

    match result {
        Err(WatchError::Rejected { job, reason }) => {
            assert_eq!(job, "web");
            assert_eq!(reason, "job not found");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert_eq!(*calls.lock().unwrap(), 1);
    assert_eq!(source.requested(), vec![0, 4]);
}
