use std::{cmp::Ordering, fmt};

use serde::{Deserialize, Serialize};

/// Identifies one replica set and, when the cluster is sharded, the shard it backs.
///
/// A ref without a replica set name stands for a standalone server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReplicaSetRef {
    replica_set_name: Option<String>,
    shard_name: Option<String>,
}

impl ReplicaSetRef {
    pub fn new(replica_set_name: Option<String>, shard_name: Option<String>) -> Self {
        Self {
            replica_set_name,
            shard_name,
        }
    }

    /// A replica set that does not back a shard.
    pub fn named(replica_set_name: impl Into<String>) -> Self {
        Self::new(Some(replica_set_name.into()), None)
    }

    pub fn standalone() -> Self {
        Self::new(None, None)
    }

    /// Returns the replica set name, or `None` for a standalone server.
    pub fn replica_set_name(&self) -> Option<&str> {
        self.replica_set_name.as_deref()
    }

    /// Returns the shard name, or `None` when the replica set is not used as a shard.
    pub fn shard_name(&self) -> Option<&str> {
        self.shard_name.as_deref()
    }

    pub fn has_replica_set_name(&self) -> bool {
        self.replica_set_name.is_some()
    }

    /// Renders the `shard=replicaSet/` prefix of the address grammar.
    ///
    /// Missing parts are left out, so a standalone ref renders as an empty string.
    pub fn address_prefix(&self) -> String {
        let mut prefix = String::new();
        if let Some(shard) = &self.shard_name {
            prefix.push_str(shard);
            prefix.push('=');
        }
        if let Some(name) = &self.replica_set_name {
            prefix.push_str(name);
            prefix.push('/');
        }
        prefix
    }
}

impl Ord for ReplicaSetRef {
    // Standalone refs (no name) sort ahead of named ones.
    fn cmp(&self, other: &Self) -> Ordering {
        self.replica_set_name
            .cmp(&other.replica_set_name)
            .then_with(|| self.shard_name.cmp(&other.shard_name))
    }
}

impl PartialOrd for ReplicaSetRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ReplicaSetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.replica_set_name {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "standalone"),
        }
    }
}
