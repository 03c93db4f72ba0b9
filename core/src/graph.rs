use std::collections::{HashMap, HashSet};

use crate::accessor::GraphAccessor;
use crate::error::AccessError;

/// Opaque node identifier. The id space may be extremely sparse.
pub type NodeId = u64;

/// In-memory graph: adjacency lists plus the node registry in insertion order.
///
/// Edges are stored in both directions: `outgoing[a]` contains targets of a,
/// `incoming[b]` contains sources of b. Both are populated on load.
pub struct Graph {
    outgoing: HashMap<NodeId, Vec<NodeId>>,
    incoming: HashMap<NodeId, Vec<NodeId>>,
    nodes: Vec<NodeId>,
    node_index: HashSet<NodeId>,
}

impl Graph {
    pub fn new() -> Self {
        Self {
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
            nodes: Vec::new(),
            node_index: HashSet::new(),
        }
    }

    /// Pre-allocate for a known graph size.
    pub fn with_capacity(node_count: usize, edge_count: usize) -> Self {
        Self {
            outgoing: HashMap::with_capacity(node_count.min(edge_count)),
            incoming: HashMap::with_capacity(node_count.min(edge_count)),
            nodes: Vec::with_capacity(node_count),
            node_index: HashSet::with_capacity(node_count),
        }
    }

    /// Register a node. Returns false if it already existed.
    pub fn add_node(&mut self, id: NodeId) -> bool {
        if self.node_index.insert(id) {
            self.nodes.push(id);
            true
        } else {
            false
        }
    }

    /// Add a directed edge, registering both endpoints.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
        self.add_node(from);
        self.add_node(to);
        self.outgoing.entry(from).or_default().push(to);
        self.incoming.entry(to).or_default().push(from);
    }

    /// Bulk load from an iterator of (from, to) pairs.
    pub fn load_edges<I>(&mut self, edges: I)
    where
        I: IntoIterator<Item = (NodeId, NodeId)>,
    {
        for (from, to) in edges {
            self.add_edge(from, to);
        }
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.node_index.contains(&id)
    }

    /// Get outgoing targets for a node.
    pub fn neighbors_out(&self, id: NodeId) -> &[NodeId] {
        self.outgoing.get(&id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Get incoming sources for a node.
    pub fn neighbors_in(&self, id: NodeId) -> &[NodeId] {
        self.incoming.get(&id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Node ids in insertion order.
    pub fn node_ids(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.outgoing.values().map(|v| v.len()).sum()
    }

    /// Approximate memory usage in bytes.
    pub fn memory_usage(&self) -> usize {
        use std::mem::size_of;

        let nodes_mem = self.nodes.len() * size_of::<NodeId>() * 2;
        let out_edges: usize = self.outgoing.values().map(|v| v.len() * size_of::<NodeId>()).sum();
        let in_edges: usize = self.incoming.values().map(|v| v.len() * size_of::<NodeId>()).sum();
        let map_overhead = (self.outgoing.len() + self.incoming.len()) * 40;

        nodes_mem + out_edges + in_edges + map_overhead
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

/// Neighbours of one node, outgoing first, then incoming.
pub struct AdjacencyIter<'a> {
    inner: std::iter::Chain<std::slice::Iter<'a, NodeId>, std::slice::Iter<'a, NodeId>>,
}

impl Iterator for AdjacencyIter<'_> {
    type Item = Result<NodeId, AccessError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|&id| Ok(id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// All node ids in insertion order.
pub struct NodeIdIter<'a> {
    inner: std::slice::Iter<'a, NodeId>,
}

impl Iterator for NodeIdIter<'_> {
    type Item = Result<NodeId, AccessError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|&id| Ok(id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl GraphAccessor for Graph {
    type Neighbors<'a> = AdjacencyIter<'a>;
    type NodeIds<'a> = NodeIdIter<'a>;

    fn node_exists(&self, node: NodeId) -> Result<bool, AccessError> {
        Ok(self.contains_node(node))
    }

    fn neighbors_of(&self, node: NodeId) -> Result<AdjacencyIter<'_>, AccessError> {
        Ok(AdjacencyIter {
            inner: self
                .neighbors_out(node)
                .iter()
                .chain(self.neighbors_in(node).iter()),
        })
    }

    fn all_node_ids(&self) -> Result<NodeIdIter<'_>, AccessError> {
        Ok(NodeIdIter {
            inner: self.node_ids().iter(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_star(center: u64, leaves: u64) -> Graph {
        let mut g = Graph::new();
        g.load_edges((1..=leaves).map(|i| (center, center + i)));
        g
    }

    #[test]
    fn test_graph_counts() {
        let g = make_star(0, 50);
        assert_eq!(g.node_count(), 51);
        assert_eq!(g.edge_count(), 50);
    }

    #[test]
    fn test_add_node_is_idempotent() {
        let mut g = Graph::new();
        assert!(g.add_node(9));
        assert!(!g.add_node(9));
        assert_eq!(g.node_count(), 1);
        assert!(g.neighbors_out(9).is_empty());
    }

    #[test]
    fn test_edges_stored_both_ways() {
        let mut g = Graph::new();
        g.add_edge(1, 2);
        assert_eq!(g.neighbors_out(1), &[2]);
        assert_eq!(g.neighbors_in(2), &[1]);
        assert!(g.neighbors_out(2).is_empty());
        assert_eq!(g.node_ids(), &[1, 2]);
    }

    #[test]
    fn test_accessor_ignores_direction() {
        let mut g = Graph::new();
        g.load_edges(vec![(1, 2), (3, 1), (1, 1)]);
        let neighbors: Vec<NodeId> = g
            .neighbors_of(1)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        // outgoing 2 and self-loop, then incoming 3 and self-loop
        assert_eq!(neighbors, vec![2, 1, 3, 1]);
    }

    #[test]
    fn test_accessor_node_scan_in_insertion_order() {
        let mut g = Graph::new();
        g.add_node(30);
        g.add_edge(10, 20);
        let ids: Vec<NodeId> = g
            .all_node_ids()
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(ids, vec![30, 10, 20]);
        assert!(g.node_exists(20).unwrap());
        assert!(!g.node_exists(99).unwrap());
    }

    #[test]
    fn test_unknown_node_has_no_neighbors() {
        let g = make_star(0, 3);
        assert_eq!(g.neighbors_of(999).unwrap().count(), 0);
    }

    #[test]
    fn test_memory_usage_nonzero() {
        let g = make_star(0, 10);
        assert!(g.memory_usage() > 0);
    }
}
