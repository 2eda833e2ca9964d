use std::{collections::BTreeSet, future::Future, sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::{instrument, Span};
use uuid::Uuid;

use crate::{
    retry::RetryState, CaptureScope, ClientLease, CollectionId, ConnectionContext,
    ConnectionError, ConnectionTarget, DocumentClient, ErrorHandler, FailFast, Filters, Timestamp,
};

/// Pause between failed operations, keeping a failing server from being hammered.
pub const PAUSE_AFTER_ERROR: Duration = Duration::from_millis(500);

/// Database used for the liveness probe when no database passes the filters.
const DEFAULT_ADMIN_DATABASE: &str = "admin";

/// A per-task connection that applies the configured database and collection filters.
///
/// Operations run through the same retry discipline as [`ResilientClient`](crate::ResilientClient),
/// pausing [`PAUSE_AFTER_ERROR`] between failures. Calls are sequential: each one leases a
/// client, runs and releases it before returning.
pub struct FilteredConnection {
    context: Arc<ConnectionContext>,
    target: ConnectionTarget,
    filters: Arc<Filters>,
    capture_scope: CaptureScope,
    capture_target: Option<String>,
    retry: RetryState,
}

impl FilteredConnection {
    pub(crate) fn new(
        context: Arc<ConnectionContext>,
        target: ConnectionTarget,
        name: String,
        error_handler: Option<Arc<dyn ErrorHandler>>,
        cancellation: CancellationToken,
    ) -> Self {
        let config = context.config();
        let capture_scope = config.capture_scope;
        let capture_target = config.capture_target.clone();
        let filters = context.filters();
        let retry = RetryState::new(
            name,
            error_handler.unwrap_or_else(|| Arc::new(FailFast)),
            PAUSE_AFTER_ERROR,
            cancellation,
        );
        Self {
            context,
            target,
            filters,
            capture_scope,
            capture_target,
            retry,
        }
    }

    pub fn name(&self) -> &str {
        self.retry.name()
    }

    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    /// Leases a client for this connection's target, without retrying.
    pub async fn connect(&self) -> Result<ClientLease, ConnectionError> {
        self.context.pool().client_for(&self.target).await
    }

    /// Runs `operation` until it succeeds, the error handler gives up, or the connection
    /// has been closed.
    #[instrument(
        level = "debug",
        name = "FilteredConnection - Execute",
        skip(self, operation),
        fields(connection = %self.name(), correlation_id)
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
                    let lease = self.connect().await?;
                    operation(lease.client()).await
                })
                .await?;

            match outcome {
                Ok(value) => return Ok(value),
                Err(error) => self.retry.after_failure(description, attempt, error).await?,
            }
        }
    }

    /// Returns the databases passing the database filter.
    ///
    /// When capture is scoped to one database no server call is made.
    #[instrument(level = "debug", skip(self))]
    pub async fn database_names(&self) -> Result<BTreeSet<String>, ConnectionError> {
        if self.capture_scope == CaptureScope::Database {
            return Ok(self
                .capture_target
                .iter()
                .filter(|db| self.filters.database_filter(db))
                .cloned()
                .collect());
        }

        let names = self
            .execute("get database names", |client| async move {
                client.list_database_names().await
            })
            .await?;
        Ok(names
            .into_iter()
            .filter(|db| self.filters.database_filter(db))
            .collect())
    }

    /// Returns the collections of every filtered database that pass the collection filter.
    #[instrument(level = "debug", skip(self))]
    pub async fn collections(&self) -> Result<Vec<CollectionId>, ConnectionError> {
        let databases = self.database_names().await?;
        let filters = self.filters.clone();

        self.execute("get collections in databases", |client| {
            let databases = databases.clone();
            let filters = filters.clone();
            async move {
                let mut collections = Vec::new();
                for database in databases {
                    for collection in client.list_collection_names(&database).await? {
                        let id = CollectionId::new(database.as_str(), collection);
                        if filters.collection_filter(&id) {
                            collections.push(id);
                        }
                    }
                }
                Ok::<_, anyhow::Error>(collections)
            }
        })
        .await
    }

    /// Runs the liveness command on the first available database and returns the server's
    /// operation time.
    #[instrument(level = "debug", skip(self))]
    pub async fn ping(&self) -> Result<Timestamp, ConnectionError> {
        let database = self
            .database_names()
            .await?
            .into_iter()
            .next()
            .unwrap_or_else(|| DEFAULT_ADMIN_DATABASE.to_string());

        self.execute("ping on first available database", |client| {
            let database = database.clone();
            async move { client.hello(&database).await }
        })
        .await
    }

    /// Stops retrying. The next failed attempt ends its `execute` call.
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
