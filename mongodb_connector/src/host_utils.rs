//! Parsing for the host specification grammar `((shard=)?(replicaSet/))?hostList`.
//!
//! Three shapes are accepted:
//! * `shard=replicaSet/host1:27017,host2:27017`
//! * `replicaSet/host1:27017,host2:27017`
//! * `host1:27017,host2:27017` (standalone)
//!
//! A shard name is only recognised together with a replica set name. Input that fits none
//! of the shapes yields `None` and the caller decides on a fallback.

use crate::ReplicaSetRef;

/// The parts of a host specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSpec<'a> {
    pub shard: Option<&'a str>,
    pub replica_set: Option<&'a str>,
    pub hosts: &'a str,
}

impl<'a> HostSpec<'a> {
    pub fn replica_set_ref(&self) -> ReplicaSetRef {
        ReplicaSetRef::new(
            self.replica_set.map(str::to_string),
            self.shard.map(str::to_string),
        )
    }
}

/// Splits `spec` into its shard, replica set and host list parts.
pub fn parse_spec(spec: &str) -> Option<HostSpec<'_>> {
    if spec.is_empty() {
        return None;
    }
    Some(
        sharded(spec)
            .or_else(|| replica_set(spec))
            .unwrap_or(HostSpec {
                shard: None,
                replica_set: None,
                hosts: spec,
            }),
    )
}

/// Returns the replica set named by `spec`, or a standalone ref for a bare host list.
pub fn parse(spec: &str) -> Option<ReplicaSetRef> {
    parse_spec(spec).map(|s| s.replica_set_ref())
}

/// Returns the host list part of `spec`.
pub fn parse_host(spec: &str) -> Option<&str> {
    parse_spec(spec).map(|s| s.hosts)
}

// `shard=replicaSet/hosts`
fn sharded(spec: &str) -> Option<HostSpec<'_>> {
    let (shard, rest) = spec.split_once('=')?;
    if shard.is_empty() {
        return None;
    }
    let inner = replica_set(rest)?;
    Some(HostSpec {
        shard: Some(shard),
        ..inner
    })
}

// `replicaSet/hosts`
fn replica_set(spec: &str) -> Option<HostSpec<'_>> {
    let (name, hosts) = spec.split_once('/')?;
    if name.is_empty() || hosts.is_empty() {
        return None;
    }
    Some(HostSpec {
        shard: None,
        replica_set: Some(name),
        hosts,
    })
}
