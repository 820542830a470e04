//! Fixed-interval refresh of the discussion tree.
//!
//! One poll tick = fetch the document, transform it, replace the render
//! forest. A tick that arrives while the previous fetch is still in flight
//! is dropped, so completions never race each other. Failed ticks leave
//! the last good forest in place; the next scheduled tick is the only retry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use wws_discussion::{into_forest, transform, RenderForest};

use crate::error::FetchError;
use crate::source::{TreeSource, FETCH_TIMEOUT};

/// Poller state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PollPhase {
    /// Timer armed, no request outstanding.
    #[default]
    Idle,
    /// A fetch is in flight.
    Fetching,
}

/// Render state shared between the poller and the view.
#[derive(Debug, Clone, Default)]
pub struct TreeState {
    pub phase: PollPhase,
    /// `None` until the first successful fetch.
    pub forest: Option<RenderForest>,
    pub last_refresh: Option<DateTime<Utc>>,
    /// Number of successful refreshes so far.
    pub generation: u64,
    pub consecutive_failures: u32,
}

pub type SharedTreeState = Arc<RwLock<TreeState>>;

/// What a single poll tick ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Refreshed,
    Failed,
    /// Another fetch was already in flight.
    Skipped,
    /// The fetch finished after shutdown and its result was dropped.
    Discarded,
}

/// Run one guarded fetch-and-replace cycle.
pub async fn poll_once<S: TreeSource>(source: &S, state: &SharedTreeState) -> PollOutcome {
    poll_guarded(source, state, FETCH_TIMEOUT, &AtomicBool::new(false)).await
}

async fn poll_guarded<S: TreeSource>(
    source: &S,
    state: &SharedTreeState,
    fetch_timeout: Duration,
    stopped: &AtomicBool,
) -> PollOutcome {
    {
        let mut st = state.write().await;
        if st.phase == PollPhase::Fetching {
            tracing::debug!(source = %source.describe(), "previous fetch still in flight, dropping tick");
            return PollOutcome::Skipped;
        }
        st.phase = PollPhase::Fetching;
    }

    let result = match tokio::time::timeout(fetch_timeout, source.fetch()).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout {
            source_desc: source.describe(),
            after: fetch_timeout,
        }),
    };

    let mut st = state.write().await;
    st.phase = PollPhase::Idle;

    if stopped.load(Ordering::SeqCst) {
        tracing::debug!("poller stopped while fetching, discarding result");
        return PollOutcome::Discarded;
    }

    match result {
        Ok(root) => {
            let render = transform(&root);
            let nodes = render.node_count();
            st.forest = Some(into_forest(render));
            st.generation += 1;
            st.last_refresh = Some(Utc::now());
            st.consecutive_failures = 0;
            tracing::debug!(generation = st.generation, nodes, "discussion tree refreshed");
            PollOutcome::Refreshed
        }
        Err(e) => {
            st.consecutive_failures += 1;
            tracing::warn!(
                source = %source.describe(),
                failures = st.consecutive_failures,
                error = %e,
                "failed to fetch discussion tree"
            );
            PollOutcome::Failed
        }
    }
}

/// Repeating fetch task.
pub struct Poller<S> {
    source: Arc<S>,
    interval: Duration,
    fetch_timeout: Duration,
    state: SharedTreeState,
}

impl<S: TreeSource> Poller<S> {
    pub fn new(source: S, interval: Duration, state: SharedTreeState) -> Self {
        Self {
            source: Arc::new(source),
            interval,
            fetch_timeout: FETCH_TIMEOUT,
            state,
        }
    }

    /// Give up on a fetch after `timeout` instead of [`FETCH_TIMEOUT`].
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Start polling. The first tick fires immediately.
    pub fn spawn(self) -> PollerHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (refresh_tx, refresh_rx) = mpsc::channel(1);
        let stopped = Arc::new(AtomicBool::new(false));

        tracing::info!(
            source = %self.source.describe(),
            interval_ms = self.interval.as_millis() as u64,
            "starting discussion tree poller"
        );

        let task = tokio::spawn(self.run(shutdown_rx, refresh_rx, stopped.clone()));

        PollerHandle {
            shutdown_tx: Some(shutdown_tx),
            refresh_tx,
            stopped,
            task,
        }
    }

    async fn run(
        self,
        mut shutdown_rx: oneshot::Receiver<()>,
        mut refresh_rx: mpsc::Receiver<()>,
        stopped: Arc<AtomicBool>,
    ) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown_rx => break,
                _ = ticker.tick() => self.dispatch(&stopped),
                Some(()) = refresh_rx.recv() => {
                    tracing::debug!("manual refresh requested");
                    self.dispatch(&stopped);
                }
            }
        }

        stopped.store(true, Ordering::SeqCst);
        tracing::info!("discussion tree poller stopped");
    }

    /// Fetch in a separate task so the timer keeps its cadence while a slow
    /// request is outstanding.
    fn dispatch(&self, stopped: &Arc<AtomicBool>) {
        let source = self.source.clone();
        let state = self.state.clone();
        let fetch_timeout = self.fetch_timeout;
        let stopped = stopped.clone();
        tokio::spawn(async move {
            poll_guarded(source.as_ref(), &state, fetch_timeout, &stopped).await;
        });
    }
}

/// Control handle for a running [`Poller`]. Dropping it stops the timer.
pub struct PollerHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    refresh_tx: mpsc::Sender<()>,
    stopped: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Ask for an out-of-band tick. At most one request is queued.
    pub fn refresh_now(&self) {
        if self.refresh_tx.try_send(()).is_err() {
            tracing::debug!("refresh already pending");
        }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Cancel the repeating timer and wait for the loop to exit. An
    /// in-flight fetch runs to completion but its result is discarded.
    pub async fn shutdown(mut self) {
        self.stopped.store(true, Ordering::SeqCst);
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "poller task ended abnormally");
        }
    }
}
