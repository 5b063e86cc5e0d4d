//! Background Operations
//!
//! Runs blocking work (admin lookups, connection tests) on a tokio blocking
//! worker so the host stays responsive. A wait indicator is shown only when
//! the work outlives a short delay, and the user may cancel while it is up.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinError;

/// How long work may run before the wait indicator appears
pub const DEFAULT_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum OperationError {
    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Failed(anyhow::Error),

    #[error("background worker failed: {0}")]
    Join(#[from] JoinError),
}

/// Cooperative cancellation flag handed to the worker, which must poll it
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Requests cancellation of a pending operation
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<watch::Sender<bool>>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

/// Create a cancel handle and the receiver `run_with_delayed_cancel` waits on
pub fn cancel_channel() -> (CancelHandle, watch::Receiver<bool>) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle(Arc::new(tx)), rx)
}

/// Something that can show a cancelable "please wait" notice
pub trait WaitIndicator {
    fn show(&mut self, title: &str, message: &str);

    fn hide(&mut self);
}

/// Title, message and delay of the wait indicator
#[derive(Debug, Clone)]
pub struct DelayedCancel {
    pub title: String,
    pub message: String,
    pub delay: Duration,
}

impl DelayedCancel {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            delay: DEFAULT_DELAY,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Run `op` on a blocking worker, showing `indicator` once `options.delay`
/// has passed. A cancel request raises the worker's flag and returns
/// `Cancelled` without waiting for the worker to wind down.
pub async fn run_with_delayed_cancel<T, F>(
    options: &DelayedCancel,
    op: F,
    indicator: &mut dyn WaitIndicator,
    mut cancel: watch::Receiver<bool>,
) -> Result<T, OperationError>
where
    F: FnOnce(CancelFlag) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let flag = CancelFlag::new();
    let worker_flag = flag.clone();
    let mut handle = tokio::task::spawn_blocking(move || op(worker_flag));

    if let Ok(joined) = tokio::time::timeout(options.delay, &mut handle).await {
        return joined?.map_err(OperationError::Failed);
    }

    tracing::debug!(title = %options.title, "operation still running, showing wait indicator");
    indicator.show(&options.title, &options.message);

    let outcome = tokio::select! {
        joined = &mut handle => match joined {
            Ok(result) => result.map_err(OperationError::Failed),
            Err(e) => Err(OperationError::Join(e)),
        },
        _ = cancel_requested(&mut cancel) => {
            flag.cancel();
            tracing::info!(title = %options.title, "operation cancelled by user");
            Err(OperationError::Cancelled)
        }
    };

    indicator.hide();
    outcome
}

/// Resolves once cancel is requested; never resolves if the sender is gone
async fn cancel_requested(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|cancelled| *cancelled).await.is_err() {
        std::future::pending::<()>().await;
    }
}
