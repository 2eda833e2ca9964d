use std::{fmt, sync::Arc};

use crate::{host_utils, ReplicaSetRef};

const REPLICA_SET_DELIMITER: char = ';';

/// An immutable, sorted and deduplicated set of replica sets.
///
/// Cloning is cheap and shares the backing storage. A topology change always produces a
/// new instance; compare instances with [`TopologySet::changed_since`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TopologySet {
    replica_sets: Arc<Vec<ReplicaSetRef>>,
}

impl TopologySet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_refs<I>(refs: I) -> Self
    where
        I: IntoIterator<Item = ReplicaSetRef>,
    {
        let mut replica_sets = refs.into_iter().collect::<Vec<_>>();
        replica_sets.sort();
        replica_sets.dedup();
        Self {
            replica_sets: Arc::new(replica_sets),
        }
    }

    /// Builds a set from `;`-separated host specifications, skipping any that do not parse.
    pub fn parse(hosts: &str) -> Self {
        hosts
            .split(REPLICA_SET_DELIMITER)
            .map(str::trim)
            .filter_map(host_utils::parse)
            .collect()
    }

    pub fn size(&self) -> usize {
        self.replica_sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replica_sets.is_empty()
    }

    /// Returns a copy of every member in sort order.
    pub fn all(&self) -> Vec<ReplicaSetRef> {
        self.replica_sets.as_ref().clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReplicaSetRef> {
        self.replica_sets.iter()
    }

    pub fn for_each<F>(&self, visitor: F)
    where
        F: FnMut(&ReplicaSetRef),
    {
        self.replica_sets.iter().for_each(visitor);
    }

    /// Returns `true` when a replica set was added or removed relative to `prior`.
    pub fn changed_since(&self, prior: &TopologySet) -> bool {
        self.replica_sets != prior.replica_sets
    }

    /// Returns `true` when both instances share the same backing storage.
    pub fn ptr_eq(&self, other: &TopologySet) -> bool {
        Arc::ptr_eq(&self.replica_sets, &other.replica_sets)
    }

    /// Splits the set into at most `max_groups` groups and hands each to `consumer`.
    ///
    /// Groups are contiguous runs of the sorted members and their sizes differ by at most
    /// one, with the larger groups first. The same topology always yields the same groups.
    /// When `max_groups <= 1` or there is a single member the set itself is passed through.
    /// An empty set split into several groups yields no groups at all.
    pub fn subdivide<F>(&self, max_groups: usize, mut consumer: F)
    where
        F: FnMut(TopologySet),
    {
        if max_groups <= 1 || self.size() == 1 {
            consumer(self.clone());
            return;
        }

        let group_count = self.size().min(max_groups);
        if group_count == 0 {
            return;
        }

        let per_group = self.size() / group_count;
        let leftover = self.size() % group_count;
        let mut start = 0;
        for group in 0..group_count {
            let len = if group < leftover {
                per_group + 1
            } else {
                per_group
            };
            let members = self.replica_sets[start..start + len].to_vec();
            start += len;
            consumer(Self {
                replica_sets: Arc::new(members),
            });
        }
    }
}

impl FromIterator<ReplicaSetRef> for TopologySet {
    fn from_iter<T: IntoIterator<Item = ReplicaSetRef>>(iter: T) -> Self {
        Self::from_refs(iter)
    }
}

impl fmt::Display for TopologySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self
            .replica_sets
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        write!(f, "{}", names.join(";"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use std::collections::HashSet;

    use crate::{ReplicaSetRef, TopologySet};

    fn topology(names: &[&str]) -> TopologySet {
        names.iter().map(|n| ReplicaSetRef::named(*n)).collect()
    }

    fn collect_groups(set: &TopologySet, max_groups: usize) -> Vec<TopologySet> {
        let mut groups = Vec::new();
        set.subdivide(max_groups, |g| groups.push(g));
        groups
    }

    #[test]
    fn from_refs_sorts_and_deduplicates() {
        let set = topology(&["rs2", "rs0", "rs2", "rs1"]);

        let names = set
            .iter()
            .filter_map(|r| r.replica_set_name())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["rs0", "rs1", "rs2"]);
    }

    #[test]
    fn parse_reads_semicolon_separated_specs() {
        let set = TopologySet::parse("rs1/host1:27017,host2:27017;shardA=rs0/host3:27017");

        assert_eq!(set.size(), 2);
        assert_eq!(
            set.all(),
            vec![
                ReplicaSetRef::new(Some("rs0".to_string()), Some("shardA".to_string())),
                ReplicaSetRef::named("rs1"),
            ]
        );
    }

    #[test]
    fn all_returns_a_snapshot() {
        let set = topology(&["rs0"]);
        let mut snapshot = set.all();
        snapshot.push(ReplicaSetRef::named("rs9"));

        assert_eq!(set.size(), 1);
    }

    #[test]
    fn changed_since_is_false_for_same_contents_in_any_order() {
        let a = topology(&["rs0", "rs1", "rs2"]);
        let b = topology(&["rs2", "rs0", "rs1"]);

        assert!(!a.changed_since(&a));
        assert!(!a.changed_since(&b));
    }

    #[test]
    fn changed_since_detects_added_and_removed_members() {
        let base = topology(&["rs0", "rs1"]);

        assert!(topology(&["rs0", "rs1", "rs2"]).changed_since(&base));
        assert!(topology(&["rs0"]).changed_since(&base));
        assert!(TopologySet::empty().changed_since(&base));
    }

    #[test]
    fn subdivide_into_one_group_passes_the_set_through() {
        let set = topology(&["rs0", "rs1", "rs2"]);

        let groups = collect_groups(&set, 1);

        assert_eq!(groups.len(), 1);
        assert!(groups[0].ptr_eq(&set));
        assert!(!groups[0].changed_since(&set));
    }

    #[test]
    fn subdivide_single_member_passes_the_set_through() {
        let set = topology(&["rs0"]);

        let groups = collect_groups(&set, 4);

        assert_eq!(groups.len(), 1);
        assert!(groups[0].ptr_eq(&set));
    }

    #[test]
    fn subdivide_three_into_two_groups() {
        // Arrange
        let set = topology(&["rs0", "rs1", "rs2"]);

        // Act
        let groups = collect_groups(&set, 2);

        // Assert
        let sizes = groups.iter().map(TopologySet::size).collect::<Vec<_>>();
        assert_eq!(sizes, vec![2, 1]);
        let members = groups.iter().flat_map(|g| g.all()).collect::<Vec<_>>();
        assert_eq!(members, set.all());
    }

    #[test]
    fn subdivide_balances_group_sizes_and_covers_every_member_once() {
        let names = (0..11).map(|i| format!("rs{:02}", i)).collect::<Vec<_>>();
        let set = names
            .iter()
            .map(|n| ReplicaSetRef::named(n.as_str()))
            .collect::<TopologySet>();

        for k in 2..=set.size() {
            let groups = collect_groups(&set, k);
            assert_eq!(groups.len(), k);

            let sizes = groups.iter().map(TopologySet::size).collect::<Vec<_>>();
            let largest = sizes.iter().max().unwrap();
            let smallest = sizes.iter().min().unwrap();
            assert!(largest - smallest <= 1, "unbalanced groups for k={}", k);

            let mut seen = HashSet::new();
            for member in groups.iter().flat_map(|g| g.all()) {
                assert!(seen.insert(member), "member assigned twice for k={}", k);
            }
            assert_eq!(seen.len(), set.size());
        }
    }

    #[test]
    fn subdivide_with_more_groups_than_members_yields_one_group_per_member() {
        let set = topology(&["rs0", "rs1", "rs2"]);

        let groups = collect_groups(&set, 10);

        assert_eq!(groups.len(), 3);
        assert!(groups.iter().all(|g| g.size() == 1));
    }

    #[test]
    fn subdivide_is_deterministic() {
        let set = topology(&["rs3", "rs1", "rs0", "rs2", "rs4"]);

        assert_eq!(collect_groups(&set, 3), collect_groups(&set, 3));
    }

    #[test]
    fn subdivide_empty_set() {
        let empty = TopologySet::empty();

        assert!(collect_groups(&empty, 3).is_empty());

        let passed = collect_groups(&empty, 1);
        assert_eq!(passed.len(), 1);
        assert!(passed[0].is_empty());
    }

    #[test]
    fn display_joins_members_with_semicolons() {
        assert_eq!(topology(&["rs1", "rs0"]).to_string(), "rs0;rs1");
    }
}
