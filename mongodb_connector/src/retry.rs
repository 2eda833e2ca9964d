use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio_util::sync::CancellationToken;

use crate::{ConnectionError, ErrorDecision, ErrorHandler};

/// Retry bookkeeping shared by every operation issued through one client.
///
/// Clones share the running flag, so closing any clone stops them all.
#[derive(Clone)]
pub(crate) struct RetryState {
    name: String,
    error_handler: Arc<dyn ErrorHandler>,
    running: Arc<AtomicBool>,
    backoff: Duration,
    cancellation: CancellationToken,
}

impl RetryState {
    pub(crate) fn new(
        name: String,
        error_handler: Arc<dyn ErrorHandler>,
        backoff: Duration,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            name,
            error_handler,
            running: Arc::new(AtomicBool::new(true)),
            backoff,
            cancellation,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn backoff(&self) -> Duration {
        self.backoff
    }

    pub(crate) fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn close(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub(crate) fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Runs one attempt, abandoning it as soon as cancellation is requested.
    pub(crate) async fn attempt<T, Fut>(&self, attempt: Fut) -> Result<anyhow::Result<T>, ConnectionError>
    where
        Fut: Future<Output = anyhow::Result<T>>,
    {
        if self.cancellation.is_cancelled() {
            return Err(ConnectionError::Interrupted);
        }
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(ConnectionError::Interrupted),
            outcome = attempt => Ok(outcome),
        }
    }

    /// Decides what follows failed attempt number `attempt`.
    ///
    /// Returns `Ok(())` once the backoff pause has elapsed and the operation should be
    /// tried again, and the error to return to the caller otherwise.
    pub(crate) async fn after_failure(
        &self,
        description: &str,
        attempt: u64,
        error: anyhow::Error,
    ) -> Result<(), ConnectionError> {
        if ConnectionError::is_interrupted(&error) {
            return Err(ConnectionError::Interrupted);
        }
        // A shut down pool never hands out clients again.
        if ConnectionError::is_pool_closed(&error) {
            return Err(ConnectionError::PoolClosed);
        }

        if self.error_handler.on_error(description, &error) == ErrorDecision::Fatal {
            return Err(ConnectionError::Fatal {
                description: description.to_string(),
                source: error,
            });
        }

        if !self.is_running() {
            return Err(ConnectionError::Terminated {
                replica_set: self.name.clone(),
                source: error,
            });
        }

        tracing::debug!(
            "Attempt {} to {} on '{}' failed, retrying in {:?}",
            attempt,
            description,
            self.name,
            self.backoff
        );
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(ConnectionError::Interrupted),
            _ = tokio::time::sleep(self.backoff) => Ok(()),
        }
    }
}

impl std::fmt::Debug for RetryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryState")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .field("backoff", &self.backoff)
            .finish()
    }
}
