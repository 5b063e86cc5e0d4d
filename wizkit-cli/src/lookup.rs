//! Admin lookups run off the prompt thread
//!
//! Wraps the JSON entity registry so every lookup goes through
//! `run_with_delayed_cancel`: a spinner appears if the lookup is slow and
//! Ctrl-C abandons it.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use wizkit_common::session::{AdminSession, InMemorySession};
use wizkit_runtime::{cancel_channel, run_with_delayed_cancel, CancelFlag, DelayedCancel, OperationError, WaitIndicator};

/// Spinner shown while a lookup is pending
pub struct SpinnerIndicator {
    silent: bool,
    bar: Option<ProgressBar>,
}

impl SpinnerIndicator {
    pub fn new(silent: bool) -> Self {
        Self { silent, bar: None }
    }
}

impl WaitIndicator for SpinnerIndicator {
    fn show(&mut self, title: &str, message: &str) {
        if self.silent {
            return;
        }

        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}") {
            bar.set_style(style);
        }
        bar.set_message(format!("{title}: {message} (Ctrl-C to cancel)"));
        bar.enable_steady_tick(Duration::from_millis(100));
        self.bar = Some(bar);
    }

    fn hide(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

/// Registry-backed session whose lookups run on a blocking worker
pub struct BackgroundSession {
    registry: Arc<InMemorySession>,
    runtime: Runtime,
    delay: Duration,
    silent: bool,
}

impl BackgroundSession {
    pub fn new(registry: InMemorySession, delay: Duration, silent: bool) -> Result<Self> {
        Ok(Self {
            registry: Arc::new(registry),
            runtime: Runtime::new()?,
            delay,
            silent,
        })
    }

    fn run<T, F>(&self, message: String, op: F) -> Result<T>
    where
        F: FnOnce(CancelFlag) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let options = DelayedCancel::new("Admin lookup", message).with_delay(self.delay);
        let mut indicator = SpinnerIndicator::new(self.silent);
        let (cancel, rx) = cancel_channel();

        let outcome = self.runtime.block_on(async {
            let interrupt = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            });
            let outcome = run_with_delayed_cancel(&options, op, &mut indicator, rx).await;
            interrupt.abort();
            outcome
        });

        match outcome {
            Ok(value) => Ok(value),
            Err(OperationError::Cancelled) => anyhow::bail!("lookup cancelled"),
            Err(OperationError::Failed(e)) => Err(e),
            Err(e) => Err(e.into()),
        }
    }
}

impl AdminSession for BackgroundSession {
    fn entity_exists(&self, kind: &str, name: &str) -> Result<bool> {
        let registry = self.registry.clone();
        let (kind, name) = (kind.to_string(), name.to_string());
        tracing::debug!(%kind, %name, "checking for existing entity");

        self.run(format!("checking {kind} names"), move |flag| {
            if flag.is_cancelled() {
                anyhow::bail!("lookup cancelled");
            }
            registry.entity_exists(&kind, &name)
        })
    }

    fn list_entities(&self, kind: &str) -> Result<Vec<String>> {
        let registry = self.registry.clone();
        let kind = kind.to_string();

        self.run(format!("loading {kind} list"), move |_| registry.list_entities(&kind))
    }
}
