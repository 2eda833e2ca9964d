//! Finding the replica sets behind the seed address, once or continuously.

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::{host_utils, ConnectionContext, ConnectionError, ReplicaSetRef, TopologySet};

const ADMIN_DATABASE: &str = "admin";
const ROUTER_MESSAGE: &str = "isdbgrid";

#[derive(Debug, Deserialize)]
struct ShardEntry {
    #[serde(rename = "_id")]
    id: String,
    host: String,
}

#[derive(Debug, Deserialize)]
struct ListShardsReply {
    shards: Vec<ShardEntry>,
}

/// Asks the seed address which replica sets make up the cluster.
#[derive(Debug, Clone)]
pub struct ReplicaSetDiscovery {
    context: Arc<ConnectionContext>,
}

impl ReplicaSetDiscovery {
    pub fn new(context: Arc<ConnectionContext>) -> Self {
        Self { context }
    }

    /// Returns every replica set reachable through the seed.
    ///
    /// A router reports one replica set per shard. A replica set member reports its own set,
    /// and anything else is treated as a standalone server.
    #[instrument(level = "debug", name = "ReplicaSetDiscovery - Replica Sets", skip(self))]
    pub async fn replica_sets(&self) -> Result<TopologySet, ConnectionError> {
        let client = self.context.client_for_seed().await?;

        let hello = client
            .run_command(ADMIN_DATABASE, json!({ "hello": 1 }))
            .await
            .context("Failed to run 'hello' against the seed")?;

        if hello.get("msg").and_then(Value::as_str) == Some(ROUTER_MESSAGE) {
            let reply = client
                .run_command(ADMIN_DATABASE, json!({ "listShards": 1 }))
                .await
                .context("Failed to list the shards of the cluster")?;
            let shards: ListShardsReply = serde_json::from_value(reply)
                .map_err(|e| ConnectionError::Discovery(format!("malformed 'listShards' reply: {}", e)))?;
            tracing::debug!("Router reports {} shard(s)", shards.shards.len());
            return shards
                .shards
                .iter()
                .map(shard_replica_set)
                .collect::<Result<Vec<_>, _>>()
                .map(TopologySet::from_refs);
        }

        let replica_set = match hello.get("setName").and_then(Value::as_str) {
            Some(name) => ReplicaSetRef::named(name),
            None => ReplicaSetRef::standalone(),
        };
        Ok(TopologySet::from_refs([replica_set]))
    }
}

fn shard_replica_set(shard: &ShardEntry) -> Result<ReplicaSetRef, ConnectionError> {
    let spec = host_utils::parse_spec(&shard.host).ok_or_else(|| {
        ConnectionError::Discovery(format!("shard '{}' has no host", shard.id))
    })?;
    Ok(ReplicaSetRef::new(
        spec.replica_set.map(str::to_string),
        Some(shard.id.clone()),
    ))
}

/**
Re-runs discovery on an interval and publishes topology changes.

Subscribers see the empty topology until the first discovery succeeds. A new value is
only published when a replica set was added or removed. Failed rounds are logged and the
next tick tries again.
*/
pub struct TopologyMonitor {
    receiver: watch::Receiver<TopologySet>,
    cancellation: CancellationToken,
    handle: JoinHandle<()>,
}

impl TopologyMonitor {
    pub fn spawn(
        discovery: ReplicaSetDiscovery,
        interval: Duration,
        cancellation: CancellationToken,
    ) -> Self {
        let (sender, receiver) = watch::channel(TopologySet::empty());
        let token = cancellation.clone();
        let handle = tokio::spawn(async move {
            // `interval` panics on a zero period.
            let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                let discovered = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => tokio::select! {
                        biased;
                        _ = token.cancelled() => break,
                        discovered = discovery.replica_sets() => discovered,
                    },
                };

                match discovered {
                    Ok(topology) => {
                        sender.send_if_modified(|current| {
                            if !topology.changed_since(current) {
                                return false;
                            }
                            tracing::info!("Cluster topology changed to '{}'", topology);
                            *current = topology;
                            true
                        });
                    }
                    Err(e) => tracing::warn!(
                        error.cause_chain = ?e,
                        "Unable to discover replica sets, retrying in {:?}",
                        interval
                    ),
                }
            }
            tracing::debug!("Topology monitor stopped");
        });

        Self {
            receiver,
            cancellation,
            handle,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<TopologySet> {
        self.receiver.clone()
    }

    /// The most recently published topology.
    pub fn current(&self) -> TopologySet {
        self.receiver.borrow().clone()
    }

    /// Cancels polling and waits for the task to finish.
    pub async fn stop(self) {
        self.cancellation.cancel();
        if let Err(e) = self.handle.await {
            tracing::error!(error.cause_chain = ?e, "Topology monitor task failed");
        }
    }
}

impl std::fmt::Debug for TopologyMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopologyMonitor")
            .field("current", &*self.receiver.borrow())
            .field("stopped", &self.cancellation.is_cancelled())
            .finish()
    }
}
