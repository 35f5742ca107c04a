//! Structural comparison of two frozen heap graphs
//!
//! Nodes are matched by heap object id, which is stable across snapshots
//! for as long as the underlying value lives. The comparison is total: any
//! two finalized graphs produce a summary, including a graph against
//! itself (all counts zero).

use std::collections::HashMap;

use profile_types::{HeapGraph, HeapNodeType, HeapObjectId, SnapshotDiff, SnapshotDiffEntry};

#[derive(Debug, Default, Clone, Copy)]
struct TypeDelta {
    added_count: u32,
    removed_count: u32,
    size_delta: i64,
}

pub(crate) fn diff_graphs(before: &HeapGraph, after: &HeapGraph) -> SnapshotDiff {
    let before_nodes: HashMap<HeapObjectId, (HeapNodeType, u64)> = before
        .nodes
        .iter()
        .map(|n| (n.id, (n.node_type, n.self_size)))
        .collect();
    let after_nodes: HashMap<HeapObjectId, (HeapNodeType, u64)> = after
        .nodes
        .iter()
        .map(|n| (n.id, (n.node_type, n.self_size)))
        .collect();

    let mut by_type: HashMap<HeapNodeType, TypeDelta> = HashMap::new();
    let mut nodes_added = 0u32;
    let mut nodes_removed = 0u32;
    let mut size_added = 0u64;
    let mut size_removed = 0u64;

    for (id, (node_type, self_size)) in &after_nodes {
        if !before_nodes.contains_key(id) {
            nodes_added += 1;
            size_added += self_size;
            let delta = by_type.entry(*node_type).or_default();
            delta.added_count += 1;
            delta.size_delta += *self_size as i64;
        }
    }
    for (id, (node_type, self_size)) in &before_nodes {
        if !after_nodes.contains_key(id) {
            nodes_removed += 1;
            size_removed += self_size;
            let delta = by_type.entry(*node_type).or_default();
            delta.removed_count += 1;
            delta.size_delta -= *self_size as i64;
        }
    }

    let mut entries: Vec<SnapshotDiffEntry> = by_type
        .into_iter()
        .map(|(node_type, delta)| SnapshotDiffEntry {
            node_type,
            added_count: delta.added_count,
            removed_count: delta.removed_count,
            size_delta: delta.size_delta,
        })
        .collect();
    entries.sort_by_key(|entry| entry.node_type.index());

    SnapshotDiff {
        nodes_added,
        nodes_removed,
        size_added,
        size_removed,
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use profile_types::HeapNode;

    fn graph_with_ids(ids: &[(u64, u64)]) -> HeapGraph {
        HeapGraph {
            strings: vec!["node".to_string()],
            nodes: ids
                .iter()
                .map(|&(id, size)| HeapNode {
                    node_type: HeapNodeType::Object,
                    name_index: 0,
                    id: HeapObjectId(id),
                    self_size: size,
                    edge_count: 0,
                })
                .collect(),
            edges: Vec::new(),
            samples: Vec::new(),
        }
    }

    #[test]
    fn test_self_diff_is_zero() {
        let graph = graph_with_ids(&[(3, 100), (5, 200)]);
        let diff = diff_graphs(&graph, &graph);
        assert_eq!(diff.nodes_added, 0);
        assert_eq!(diff.nodes_removed, 0);
        assert_eq!(diff.size_added, 0);
        assert_eq!(diff.size_removed, 0);
        assert!(diff.entries.is_empty());
    }

    #[test]
    fn test_added_and_removed_nodes() {
        let before = graph_with_ids(&[(3, 100), (5, 200)]);
        let after = graph_with_ids(&[(3, 100), (7, 400)]);
        let diff = diff_graphs(&before, &after);
        assert_eq!(diff.nodes_added, 1);
        assert_eq!(diff.nodes_removed, 1);
        assert_eq!(diff.size_added, 400);
        assert_eq!(diff.size_removed, 200);
        assert_eq!(diff.entries.len(), 1);
        assert_eq!(diff.entries[0].size_delta, 200);
    }

    #[test]
    fn test_diff_is_directional() {
        let before = graph_with_ids(&[(3, 100)]);
        let after = graph_with_ids(&[(3, 100), (5, 50)]);
        let forward = diff_graphs(&before, &after);
        let backward = diff_graphs(&after, &before);
        assert_eq!(forward.nodes_added, backward.nodes_removed);
        assert_eq!(forward.size_added, backward.size_removed);
    }
}
