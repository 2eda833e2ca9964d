use std::{
    collections::HashMap,
    ops::Deref,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

use tokio::sync::{OnceCell, RwLock};
use tracing::instrument;

use crate::{ClientFactory, ClientSettings, ConnectionError, ConnectionTarget, DocumentClient};

type ClientCell = Arc<OnceCell<Arc<dyn DocumentClient>>>;

/// Long-lived driver clients keyed by [`ConnectionTarget`].
///
/// Lookups are concurrent; a client is created at most once per target, and creating one
/// target's client never holds up lookups of the others. The pool is owned by one
/// [`ConnectionContext`](crate::ConnectionContext) and torn down with [`ClientPool::clear`].
pub struct ClientPool {
    factory: Arc<dyn ClientFactory>,
    settings: ClientSettings,
    clients: RwLock<HashMap<ConnectionTarget, ClientCell>>,
    closed: AtomicBool,
    active_leases: Arc<AtomicUsize>,
}

impl ClientPool {
    pub fn new(factory: Arc<dyn ClientFactory>, settings: ClientSettings) -> Self {
        Self {
            factory,
            settings,
            clients: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
            active_leases: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Leases the client for `target`, creating it on first use.
    ///
    /// Concurrent callers for the same target wait for one creation. A failed creation is
    /// retried by the next caller.
    #[instrument(level = "debug", name = "ClientPool - Client For", skip(self))]
    pub async fn client_for(&self, target: &ConnectionTarget) -> Result<ClientLease, ConnectionError> {
        let cell = self.cell_for(target).await?;

        let created = AtomicBool::new(false);
        let client = cell
            .get_or_try_init(|| async {
                created.store(true, Ordering::SeqCst);
                tracing::debug!("Creating client for `{}`", target);
                self.factory.create(target, &self.settings).await
            })
            .await?
            .clone();

        if self.is_closed() {
            // Cleared while this client was being created, so `clear` never saw it.
            if created.load(Ordering::SeqCst) {
                close_client(target, client.as_ref()).await;
            }
            return Err(ConnectionError::PoolClosed);
        }
        Ok(self.lease(target, client))
    }

    /// Closes every pooled client. Failures are logged and the remaining clients are still
    /// closed. Calling this again has no effect.
    #[instrument(level = "debug", name = "ClientPool - Clear", skip(self))]
    pub async fn clear(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            tracing::trace!("Client pool already cleared");
            return;
        }

        let drained = self.clients.write().await.drain().collect::<Vec<_>>();
        for (target, cell) in drained {
            if let Some(client) = cell.get() {
                close_client(&target, client.as_ref()).await;
            }
        }
    }

    async fn cell_for(&self, target: &ConnectionTarget) -> Result<ClientCell, ConnectionError> {
        if self.is_closed() {
            return Err(ConnectionError::PoolClosed);
        }
        if let Some(cell) = self.clients.read().await.get(target) {
            return Ok(cell.clone());
        }

        let mut clients = self.clients.write().await;
        // `clear` flags the pool before draining it, so nothing is inserted after the drain.
        if self.is_closed() {
            return Err(ConnectionError::PoolClosed);
        }
        Ok(clients.entry(target.clone()).or_default().clone())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// The number of clients created and not yet closed.
    pub async fn len(&self) -> usize {
        self.clients
            .read()
            .await
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// The number of leases handed out and not yet dropped.
    pub fn active_leases(&self) -> usize {
        self.active_leases.load(Ordering::SeqCst)
    }

    fn lease(&self, target: &ConnectionTarget, client: Arc<dyn DocumentClient>) -> ClientLease {
        self.active_leases.fetch_add(1, Ordering::SeqCst);
        ClientLease {
            client,
            target: target.clone(),
            active_leases: self.active_leases.clone(),
        }
    }
}

async fn close_client(target: &ConnectionTarget, client: &dyn DocumentClient) {
    tracing::trace!("Closing client for `{}`", target);
    if let Err(e) = client.close().await {
        tracing::error!(
            "Unexpected error closing the client for `{}`. Caused by: {:#}",
            target,
            e
        );
    }
}

/// A client checked out of the pool for the duration of one attempt.
///
/// The lease is released when dropped, whichever way the attempt ends.
pub struct ClientLease {
    client: Arc<dyn DocumentClient>,
    target: ConnectionTarget,
    active_leases: Arc<AtomicUsize>,
}

impl ClientLease {
    pub fn client(&self) -> Arc<dyn DocumentClient> {
        self.client.clone()
    }

    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }
}

impl Deref for ClientLease {
    type Target = dyn DocumentClient;

    fn deref(&self) -> &Self::Target {
        self.client.as_ref()
    }
}

impl Drop for ClientLease {
    fn drop(&mut self) {
        self.active_leases.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!("Released client lease for `{}`", self.target);
    }
}

impl std::fmt::Debug for ClientLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientLease")
            .field("target", &self.target)
            .finish()
    }
}
