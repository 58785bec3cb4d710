use std::collections::HashSet;

use crate::dataset::Edge;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AdjacencyEntry {
    pub neighbor: usize,
    pub edge: usize,
}

/// Bidirectional neighbor lookup built once per edge set.
#[derive(Clone, Debug, Default)]
pub struct AdjacencyIndex {
    entries: Vec<Vec<AdjacencyEntry>>,
}

impl AdjacencyIndex {
    pub fn build(node_count: usize, edges: &[Edge]) -> Self {
        let mut entries = vec![Vec::new(); node_count];
        for (edge_index, edge) in edges.iter().enumerate() {
            let (source, target) = (edge.source_index, edge.target_index);
            if source >= node_count || target >= node_count || source == target {
                continue;
            }

            entries[source].push(AdjacencyEntry {
                neighbor: target,
                edge: edge_index,
            });
            entries[target].push(AdjacencyEntry {
                neighbor: source,
                edge: edge_index,
            });
        }

        Self { entries }
    }

    pub fn entries(&self, index: usize) -> &[AdjacencyEntry] {
        self.entries.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn neighbor_set(&self, index: usize) -> HashSet<usize> {
        self.entries(index)
            .iter()
            .map(|entry| entry.neighbor)
            .collect()
    }

    pub fn incident_edge_set(&self, index: usize) -> HashSet<usize> {
        self.entries(index).iter().map(|entry| entry.edge).collect()
    }

    pub fn degree(&self, index: usize) -> usize {
        self.entries(index).len()
    }

    pub fn directed_entry_count(&self) -> usize {
        self.entries.iter().map(Vec::len).sum()
    }

    pub fn node_count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{RelationType, palette::Rgb};

    fn edge(source_index: usize, target_index: usize) -> Edge {
        Edge {
            source_index,
            target_index,
            relation_type: RelationType::Reference,
            color: Rgb(0xaaaaaa),
            strength: 0.5,
            is_inferred: false,
            shared_tags: Vec::new(),
        }
    }

    #[test]
    fn every_edge_lands_in_both_endpoint_lists() {
        let edges = vec![edge(0, 1), edge(1, 2), edge(3, 0)];
        let adjacency = AdjacencyIndex::build(4, &edges);

        assert_eq!(adjacency.directed_entry_count(), edges.len() * 2);
        for edge_index in 0..edges.len() {
            let holders = (0..4)
                .filter(|&node| {
                    adjacency
                        .entries(node)
                        .iter()
                        .any(|entry| entry.edge == edge_index)
                })
                .count();
            assert_eq!(holders, 2);
        }
        assert_eq!(adjacency.neighbor_set(0), HashSet::from([1, 3]));
        assert_eq!(adjacency.incident_edge_set(1), HashSet::from([0, 1]));
    }

    #[test]
    fn out_of_range_lookups_are_empty() {
        let adjacency = AdjacencyIndex::build(2, &[edge(0, 1)]);
        assert!(adjacency.entries(9).is_empty());
        assert_eq!(adjacency.degree(9), 0);
    }
}
