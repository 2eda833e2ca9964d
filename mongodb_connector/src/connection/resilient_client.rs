use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, Span};
use uuid::Uuid;

use crate::{
    retry::RetryState, ClientLease, ConnectionError, DocumentClient, ErrorHandler, FailFast,
    Filters, ReadPreference, ReplicaSetRef,
};

/// Pause between failed attempts to reach a replica set member.
pub const DEFAULT_CONNECT_BACKOFF: Duration = Duration::from_secs(1);

/// Finds a client for a replica set member matching a read preference.
#[async_trait]
pub trait ClientResolver: Send + Sync {
    async fn resolve(
        &self,
        replica_set: &ReplicaSetRef,
        preference: ReadPreference,
    ) -> Result<ClientLease, ConnectionError>;
}

/**
A client bound to one replica set and read preference that keeps retrying.

Every attempt resolves a fresh client, so an election or a restarted member is picked up
on the next try. A failed attempt goes to the error handler: [`ErrorDecision::Retry`]
pauses for the backoff interval and tries again, [`ErrorDecision::Fatal`] ends the call.
Attempts are not counted against a limit; once [`ResilientClient::close`] has been called,
the next failure ends the call with [`ConnectionError::Terminated`]. A shut down pool ends
it with [`ConnectionError::PoolClosed`] without consulting the handler.

Clones share the running flag and the cancellation token.

[`ErrorDecision::Retry`]: crate::ErrorDecision::Retry
[`ErrorDecision::Fatal`]: crate::ErrorDecision::Fatal
*/
#[derive(Clone)]
pub struct ResilientClient {
    replica_set: ReplicaSetRef,
    preference: ReadPreference,
    resolver: Arc<dyn ClientResolver>,
    filters: Arc<Filters>,
    retry: RetryState,
}

impl ResilientClient {
    /// Creates a client. Without an `error_handler` every failure is fatal.
    pub fn new(
        replica_set: ReplicaSetRef,
        preference: ReadPreference,
        resolver: Arc<dyn ClientResolver>,
        filters: Arc<Filters>,
        error_handler: Option<Arc<dyn ErrorHandler>>,
        cancellation: CancellationToken,
    ) -> Self {
        let retry = RetryState::new(
            replica_set.to_string(),
            error_handler.unwrap_or_else(|| Arc::new(FailFast)),
            DEFAULT_CONNECT_BACKOFF,
            cancellation,
        );
        Self {
            replica_set,
            preference,
            resolver,
            filters,
            retry,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.retry = self.retry.with_backoff(backoff);
        self
    }

    pub fn replica_set(&self) -> &ReplicaSetRef {
        &self.replica_set
    }

    pub fn preference(&self) -> ReadPreference {
        self.preference
    }

    /// The filters the capturing task applies to what it reads through this client. The
    /// client itself never consults them.
    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn backoff(&self) -> Duration {
        self.retry.backoff()
    }

    /// Runs `operation` against a freshly resolved client until it succeeds or the retry
    /// loop is ended.
    #[instrument(
        level = "debug",
        name = "ResilientClient - Execute",
        skip(self, operation),
        fields(replica_set = %self.replica_set, correlation_id)
    )]
    pub async fn execute<T, F, Fut>(
        &self,
        description: &str,
        mut operation: F,
    ) -> Result<T, ConnectionError>
    where
        F: FnMut(Arc<dyn DocumentClient>) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        Span::current().record("correlation_id", Uuid::new_v4().to_string().as_str());

        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome = self
                .retry
                .attempt(async {
                    let lease = self
                        .resolver
                        .resolve(&self.replica_set, self.preference)
                        .await?;
                    operation(lease.client()).await
                })
                .await?;

            match outcome {
                Ok(value) => return Ok(value),
                Err(error) => self.retry.after_failure(description, attempt, error).await?,
            }
        }
    }

    /// Stops retrying. An attempt already running is not interrupted.
    pub fn close(&self) {
        self.retry.close();
    }

    pub fn is_running(&self) -> bool {
        self.retry.is_running()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        self.retry.cancellation_token()
    }
}

impl std::fmt::Debug for ResilientClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientClient")
            .field("replica_set", &self.replica_set)
            .field("preference", &self.preference)
            .field("retry", &self.retry)
            .finish()
    }
}
