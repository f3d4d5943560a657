//! Grouping of fix trees that can share a build.
//!
//! Two trees conflict when they annotate a common declaration or when the
//! regions their annotations can affect overlap. Trees in the same group are
//! applied together and each is measured only over its own regions.

use std::collections::BTreeSet;

use crate::domain::models::{DeclLocation, Region};

/// One tree to place in a group.
#[derive(Debug, Clone, Default)]
pub struct ConflictNode {
    pub locations: BTreeSet<DeclLocation>,
    pub regions: BTreeSet<Region>,
}

impl ConflictNode {
    pub fn conflicts_with(&self, other: &Self) -> bool {
        !self.locations.is_disjoint(&other.locations) || !self.regions.is_disjoint(&other.regions)
    }
}

/// Conflict graph over a batch of nodes.
#[derive(Debug, Default)]
pub struct ConflictGraph {
    nodes: Vec<ConflictNode>,
}

impl ConflictGraph {
    pub const fn new(nodes: Vec<ConflictNode>) -> Self {
        Self { nodes }
    }

    pub fn node(&self, index: usize) -> Option<&ConflictNode> {
        self.nodes.get(index)
    }

    /// Greedy coloring in insertion order. Every group is conflict-free and
    /// holds at most `max_group_size` node indices.
    pub fn groups(&self, max_group_size: usize) -> Vec<Vec<usize>> {
        let capacity = max_group_size.max(1);
        let mut groups: Vec<Vec<usize>> = Vec::new();

        for (index, node) in self.nodes.iter().enumerate() {
            let slot = groups.iter().position(|group| {
                group.len() < capacity
                    && group
                        .iter()
                        .all(|&member| !self.nodes[member].conflicts_with(node))
            });
            match slot {
                Some(slot) => groups[slot].push(index),
                None => groups.push(vec![index]),
            }
        }

        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(field: &str, regions: &[&str]) -> ConflictNode {
        ConflictNode {
            locations: BTreeSet::from([DeclLocation::field("a.B", field)]),
            regions: regions.iter().map(|m| Region::member("a.B", *m)).collect(),
        }
    }

    #[test]
    fn test_independent_nodes_share_a_group() {
        let graph = ConflictGraph::new(vec![node("f", &["run()"]), node("g", &["stop()"])]);
        assert_eq!(graph.groups(8), vec![vec![0, 1]]);
    }

    #[test]
    fn test_overlapping_regions_split_groups() {
        let graph = ConflictGraph::new(vec![
            node("f", &["run()"]),
            node("g", &["run()", "stop()"]),
            node("h", &["go()"]),
        ]);
        assert_eq!(graph.groups(8), vec![vec![0, 2], vec![1]]);
    }

    #[test]
    fn test_shared_location_conflicts() {
        let graph = ConflictGraph::new(vec![node("f", &["a()"]), node("f", &["b()"])]);
        assert_eq!(graph.groups(8).len(), 2);
    }

    #[test]
    fn test_group_size_cap() {
        let nodes = (0..5).map(|i| node(&format!("f{i}"), &[])).collect();
        let graph = ConflictGraph::new(nodes);
        let groups = graph.groups(2);
        assert_eq!(groups.len(), 3);
        assert!(groups.iter().all(|g| g.len() <= 2));
    }
}
