/*!
mongodb_connector is the topology and connection layer of a change-data-capture
connector for sharded or replicated MongoDB clusters.

It discovers the replica sets that make up the source cluster, splits them into
stable groups for parallel capture tasks, and hands out connections that keep
re-resolving the right cluster member while elections, restarts and network
blips come and go.

The low-level driver is injected through the [`ClientFactory`] and
[`DocumentClient`] traits. A single [`ConnectionContext`] owns the pool of those
clients for the lifetime of the connector, and every capture task asks it for a
[`ResilientClient`] or a [`FilteredConnection`].

# Example
```rust,ignore
use std::sync::Arc;
use mongodb_connector::{ConnectionContext, ConnectorConfig, RetryTransient, TopologySet};

let config = ConnectorConfig::builder()
    .set_hosts("rs0/mongo1:27017,mongo2:27017")
    .build()?;
let context = Arc::new(ConnectionContext::new(config, Arc::new(MyDriverFactory))?);

let topology = TopologySet::parse("rs0/mongo1:27017;rs1/mongo3:27017");
topology.subdivide(2, |group| {
    // spawn one capture task per group
});

context.shutdown().await;
```
*/

mod client;
mod config;
mod connection;
mod connection_context;
mod discovery;
mod error_handler;
mod filters;
mod read_preference;
mod replica_set;
mod retry;
mod topology_set;

pub mod connection_string;
pub mod host_utils;

#[cfg(test)]
mod testing;

pub use client::*;
pub use config::*;
pub use connection::*;
pub use connection_context::*;
pub use discovery::*;
pub use error_handler::*;
pub use filters::*;
pub use read_preference::*;
pub use replica_set::*;
pub use topology_set::*;

pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}
