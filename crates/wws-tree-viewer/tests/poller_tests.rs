//! Poll loop timing, failure and teardown behaviour, run on paused time.

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use wws_discussion::SourceNode;
use wws_tree_viewer::{poll_once, FetchError, PollPhase, Poller, SharedTreeState, TreeSource};
use wws_tree_viewer::poller::PollOutcome;

/// Source that records when each fetch started and replays a script.
/// `None` entries fail; past the end of the script the last entry repeats.
#[derive(Clone)]
struct ScriptedSource {
    started: Arc<Mutex<Vec<Duration>>>,
    origin: Instant,
    script: Arc<Vec<Option<SourceNode>>>,
    delay: Duration,
    hang_first: bool,
}

impl ScriptedSource {
    fn new(script: Vec<Option<SourceNode>>) -> Self {
        Self {
            started: Arc::new(Mutex::new(Vec::new())),
            origin: Instant::now(),
            script: Arc::new(script),
            delay: Duration::ZERO,
            hang_first: false,
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// First call never resolves, like a server that accepts and goes quiet.
    fn hanging_first(mut self) -> Self {
        self.hang_first = true;
        self
    }

    fn starts_ms(&self) -> Vec<u128> {
        self.started
            .lock()
            .unwrap()
            .iter()
            .map(|d| d.as_millis())
            .collect()
    }
}

impl TreeSource for ScriptedSource {
    async fn fetch(&self) -> Result<SourceNode, FetchError> {
        let call = {
            let mut started = self.started.lock().unwrap();
            started.push(self.origin.elapsed());
            started.len() - 1
        };
        if self.hang_first && call == 0 {
            std::future::pending::<()>().await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let entry = self
            .script
            .get(call)
            .or_else(|| self.script.last())
            .cloned()
            .flatten();
        entry.ok_or_else(|| FetchError::Io {
            path: "scripted".into(),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "scripted failure"),
        })
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

fn tree(name: &str) -> SourceNode {
    let mut root = SourceNode::leaf(name);
    root.author = Some("A".into());
    root.children.push(SourceNode::leaf("reply"));
    root
}

#[tokio::test(start_paused = true)]
async fn test_fetches_at_mount_and_every_interval() {
    let source = ScriptedSource::new(vec![Some(tree("root"))]);
    let state = SharedTreeState::default();
    let handle = Poller::new(source.clone(), Duration::from_millis(2000), state.clone()).spawn();

    tokio::time::sleep(Duration::from_millis(4500)).await;

    assert_eq!(source.starts_ms(), [0, 2000, 4000]);
    let st = state.read().await;
    assert_eq!(st.generation, 3);
    assert_eq!(st.phase, PollPhase::Idle);
    let forest = st.forest.as_ref().expect("forest after refresh");
    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].name.as_deref(), Some("root"));
    drop(st);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_tick_keeps_previous_tree() {
    let source = ScriptedSource::new(vec![Some(tree("first")), None]);
    let state = SharedTreeState::default();
    let handle = Poller::new(source.clone(), Duration::from_millis(2000), state.clone()).spawn();

    tokio::time::sleep(Duration::from_millis(100)).await;
    let before = state.read().await.forest.clone();
    assert!(before.is_some());

    tokio::time::sleep(Duration::from_millis(2000)).await;
    assert_eq!(source.starts_ms(), [0, 2000]);

    let st = state.read().await;
    assert_eq!(st.forest, before);
    assert_eq!(st.generation, 1);
    assert_eq!(st.consecutive_failures, 1);
    drop(st);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_recovers_on_next_scheduled_tick() {
    let source = ScriptedSource::new(vec![None, Some(tree("late"))]);
    let state = SharedTreeState::default();
    let handle = Poller::new(source.clone(), Duration::from_millis(2000), state.clone()).spawn();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(state.read().await.forest.is_none());

    tokio::time::sleep(Duration::from_millis(2000)).await;
    let st = state.read().await;
    assert_eq!(st.consecutive_failures, 0);
    assert_eq!(
        st.forest.as_ref().map(|f| f[0].name.clone()),
        Some(Some("late".to_string()))
    );
    drop(st);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_no_fetch_after_shutdown() {
    let source = ScriptedSource::new(vec![Some(tree("root"))]);
    let state = SharedTreeState::default();
    let handle = Poller::new(source.clone(), Duration::from_millis(2000), state.clone()).spawn();

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(source.starts_ms().len(), 2);

    handle.shutdown().await;
    tokio::time::sleep(Duration::from_millis(10_000)).await;
    assert_eq!(source.starts_ms().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_handle_stops_timer() {
    let source = ScriptedSource::new(vec![Some(tree("root"))]);
    let handle = Poller::new(
        source.clone(),
        Duration::from_millis(2000),
        SharedTreeState::default(),
    )
    .spawn();

    tokio::time::sleep(Duration::from_millis(500)).await;
    drop(handle);
    tokio::time::sleep(Duration::from_millis(10_000)).await;
    assert_eq!(source.starts_ms(), [0]);
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_ticks_are_dropped() {
    let source = ScriptedSource::new(vec![Some(tree("slow"))]).with_delay(Duration::from_millis(5000));
    let state = SharedTreeState::default();
    let handle = Poller::new(source.clone(), Duration::from_millis(2000), state.clone()).spawn();

    tokio::time::sleep(Duration::from_millis(3000)).await;
    assert_eq!(state.read().await.phase, PollPhase::Fetching);

    tokio::time::sleep(Duration::from_millis(6000)).await;
    // Ticks at 2000 and 4000 found a fetch in flight; 6000 started the next one.
    assert_eq!(source.starts_ms(), [0, 6000]);
    assert_eq!(state.read().await.generation, 1);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_result_after_shutdown_is_discarded() {
    let source = ScriptedSource::new(vec![Some(tree("late"))]).with_delay(Duration::from_millis(1000));
    let state = SharedTreeState::default();
    let handle = Poller::new(source.clone(), Duration::from_millis(2000), state.clone()).spawn();

    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.shutdown().await;
    tokio::time::sleep(Duration::from_millis(2000)).await;

    let st = state.read().await;
    assert_eq!(source.starts_ms(), [0]);
    assert!(st.forest.is_none());
    assert_eq!(st.phase, PollPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_now_triggers_extra_tick() {
    let source = ScriptedSource::new(vec![Some(tree("root"))]);
    let state = SharedTreeState::default();
    let handle = Poller::new(source.clone(), Duration::from_secs(60), state.clone()).spawn();

    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.refresh_now();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(source.starts_ms(), [0, 100]);
    assert!(handle.is_running());
    handle.shutdown().await;
}

#[tokio::test]
async fn test_poll_once_skips_while_fetching() {
    let source = ScriptedSource::new(vec![Some(tree("root"))]);
    let state = SharedTreeState::default();
    state.write().await.phase = PollPhase::Fetching;

    assert_eq!(poll_once(&source, &state).await, PollOutcome::Skipped);
    assert!(source.starts_ms().is_empty());

    state.write().await.phase = PollPhase::Idle;
    assert_eq!(poll_once(&source, &state).await, PollOutcome::Refreshed);
    assert_eq!(state.read().await.generation, 1);
}

#[tokio::test(start_paused = true)]
async fn test_hung_fetch_times_out_and_next_tick_refreshes() {
    let source = ScriptedSource::new(vec![Some(tree("recovered"))]).hanging_first();
    let state = SharedTreeState::default();
    let handle = Poller::new(source.clone(), Duration::from_millis(2000), state.clone())
        .with_fetch_timeout(Duration::from_millis(3000))
        .spawn();

    tokio::time::sleep(Duration::from_millis(2500)).await;
    // Tick at 2000 found the hung fetch still in flight.
    assert_eq!(source.starts_ms(), [0]);
    assert_eq!(state.read().await.phase, PollPhase::Fetching);

    tokio::time::sleep(Duration::from_millis(1000)).await;
    {
        let st = state.read().await;
        assert_eq!(st.phase, PollPhase::Idle);
        assert_eq!(st.consecutive_failures, 1);
        assert!(st.forest.is_none());
    }

    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(source.starts_ms(), [0, 4000]);
    let st = state.read().await;
    assert_eq!(st.generation, 1);
    assert_eq!(st.consecutive_failures, 0);
    assert_eq!(
        st.forest.as_ref().map(|f| f[0].name.clone()),
        Some(Some("recovered".to_string()))
    );
    drop(st);

    handle.shutdown().await;
}
