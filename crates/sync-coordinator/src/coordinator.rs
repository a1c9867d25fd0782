use crate::cadence::{Cadence, CadencePolicy};
use crate::error::{CoordinatorError, CoordinatorResult};
use serde::Serialize;
use std::time::Duration;
use sync_config_and_utils::Config;
use sync_queue_engine::{SyncQueue, SyncSummary};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Timer settings for the coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Sleep between drains while drains find work.
    pub active_interval: Duration,
    /// Sleep between drains once the queue has been quiet for a while.
    pub idle_interval: Duration,
    /// Consecutive empty drains before switching to `idle_interval`.
    pub idle_threshold: u32,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            active_interval: Duration::from_secs(60),
            idle_interval: Duration::from_secs(300),
            idle_threshold: 3,
        }
    }
}

impl From<&Config> for CoordinatorConfig {
    fn from(config: &Config) -> Self {
        Self {
            active_interval: config.active_interval(),
            idle_interval: config.idle_interval(),
            idle_threshold: config.idle_threshold,
        }
    }
}

/// Snapshot of the coordinator loop, published after every change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoordinatorState {
    pub cadence: Cadence,
    pub suspended: bool,
    /// Drains run by the coordinator since start.
    pub drains: u64,
    pub last_summary: Option<SyncSummary>,
}

impl Default for CoordinatorState {
    fn default() -> Self {
        Self {
            cadence: Cadence::Active,
            suspended: false,
            drains: 0,
            last_summary: None,
        }
    }
}

enum Command {
    Suspend,
    Resume,
    SyncNow(oneshot::Sender<SyncSummary>),
    Shutdown,
}

/// Handle to the background drain loop.
///
/// Dropping the handle aborts the loop; [`SyncCoordinator::shutdown`] stops
/// it after any drain in flight finishes.
pub struct SyncCoordinator {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<CoordinatorState>,
    handle: Option<JoinHandle<()>>,
}

impl SyncCoordinator {
    /// Spawn the loop on the current Tokio runtime. The first drain runs
    /// immediately.
    pub fn start(queue: SyncQueue, config: CoordinatorConfig) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(CoordinatorState::default());

        info!(
            active_secs = config.active_interval.as_secs(),
            idle_secs = config.idle_interval.as_secs(),
            idle_threshold = config.idle_threshold,
            "Starting sync coordinator"
        );
        let handle = tokio::spawn(run(queue, config, receiver, state_tx));

        Self {
            commands,
            state,
            handle: Some(handle),
        }
    }

    /// Pause the timer. Manual [`sync_now`](Self::sync_now) calls still run.
    pub fn suspend(&self) -> CoordinatorResult<()> {
        self.send(Command::Suspend)
    }

    /// Restart the timer and drain at once.
    pub fn resume(&self) -> CoordinatorResult<()> {
        self.send(Command::Resume)
    }

    /// Run a drain now and wait for its summary.
    pub async fn sync_now(&self) -> CoordinatorResult<SyncSummary> {
        let (reply, response) = oneshot::channel();
        self.send(Command::SyncNow(reply))?;
        response.await.map_err(|_| CoordinatorError::Stopped)
    }

    pub fn state(&self) -> CoordinatorState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<CoordinatorState> {
        self.state.clone()
    }

    /// Stop the loop and wait for it to exit.
    pub async fn shutdown(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                warn!(error = %err, "Sync coordinator task ended abnormally");
            }
        }
        info!("Sync coordinator stopped");
    }

    fn send(&self, command: Command) -> CoordinatorResult<()> {
        self.commands
            .send(command)
            .map_err(|_| CoordinatorError::Stopped)
    }
}

impl Drop for SyncCoordinator {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn run(
    queue: SyncQueue,
    config: CoordinatorConfig,
    mut commands: mpsc::UnboundedReceiver<Command>,
    state: watch::Sender<CoordinatorState>,
) {
    let mut policy = CadencePolicy::new(
        config.active_interval,
        config.idle_interval,
        config.idle_threshold,
    );
    let mut suspended = false;
    let timer = sleep(Duration::ZERO);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            _ = &mut timer, if !suspended => {
                let (_, next) = drain(&queue, &mut policy, &state).await;
                timer.as_mut().reset(Instant::now() + next);
            }
            command = commands.recv() => match command {
                Some(Command::Suspend) => {
                    if !suspended {
                        info!("Sync coordinator suspended");
                    }
                    suspended = true;
                    state.send_modify(|s| s.suspended = true);
                }
                Some(Command::Resume) => {
                    if suspended {
                        info!("Sync coordinator resumed");
                    }
                    suspended = false;
                    state.send_modify(|s| s.suspended = false);
                    let (_, next) = drain(&queue, &mut policy, &state).await;
                    timer.as_mut().reset(Instant::now() + next);
                }
                Some(Command::SyncNow(reply)) => {
                    let (summary, next) = drain(&queue, &mut policy, &state).await;
                    timer.as_mut().reset(Instant::now() + next);
                    if reply.send(summary).is_err() {
                        debug!("sync_now caller went away before the drain finished");
                    }
                }
                Some(Command::Shutdown) | None => break,
            }
        }
    }
}

async fn drain(
    queue: &SyncQueue,
    policy: &mut CadencePolicy,
    state: &watch::Sender<CoordinatorState>,
) -> (SyncSummary, Duration) {
    let summary = queue.process_queue().await;
    let previous = policy.cadence();
    let next = policy.record(&summary);
    let cadence = policy.cadence();

    if cadence != previous {
        info!(?cadence, interval_secs = next.as_secs(), "Sync cadence changed");
    }
    debug!(
        attempted = summary.attempted,
        succeeded = summary.succeeded,
        failed = summary.failed,
        next_secs = next.as_secs(),
        "Coordinator drain finished"
    );

    state.send_modify(|s| {
        s.cadence = cadence;
        s.drains += 1;
        s.last_summary = Some(summary);
    });
    (summary, next)
}
