//! Storage-collaborator boundary.
//!
//! The engine never owns the graph. It asks a [`GraphAccessor`] for the
//! neighbours of a node (any relationship, either direction), for node
//! existence, and for a full node scan.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::AccessError;
use crate::graph::NodeId;

/// Read-only access to the external graph store.
///
/// Iterators may fail part-way; the first `Err` aborts the traversal.
/// The parallel expander additionally requires `Sync`.
pub trait GraphAccessor {
    type Neighbors<'a>: Iterator<Item = Result<NodeId, AccessError>>
    where
        Self: 'a;

    type NodeIds<'a>: Iterator<Item = Result<NodeId, AccessError>>
    where
        Self: 'a;

    fn node_exists(&self, node: NodeId) -> Result<bool, AccessError>;

    /// All nodes connected to `node` by any relationship. Parallel edges
    /// and self-loops are reported as stored.
    fn neighbors_of(&self, node: NodeId) -> Result<Self::Neighbors<'_>, AccessError>;

    /// Every node id, in a deterministic storage order.
    fn all_node_ids(&self) -> Result<Self::NodeIds<'_>, AccessError>;
}

impl<T: GraphAccessor + ?Sized> GraphAccessor for &T {
    type Neighbors<'a> = T::Neighbors<'a> where Self: 'a;
    type NodeIds<'a> = T::NodeIds<'a> where Self: 'a;

    fn node_exists(&self, node: NodeId) -> Result<bool, AccessError> {
        (**self).node_exists(node)
    }

    fn neighbors_of(&self, node: NodeId) -> Result<Self::Neighbors<'_>, AccessError> {
        (**self).neighbors_of(node)
    }

    fn all_node_ids(&self) -> Result<Self::NodeIds<'_>, AccessError> {
        (**self).all_node_ids()
    }
}

/// Accessor wrapper that injects storage failures.
///
/// `fail_on` makes reads of one node's relationships fail after
/// `fail_after` neighbours were yielded (0 = fail before the first one).
/// `fail_scan_after` does the same for the full node scan.
pub struct FailingAccessor<A> {
    inner: A,
    fail_on: Option<NodeId>,
    fail_after: usize,
    fail_scan_after: Option<usize>,
    reads: AtomicUsize,
}

impl<A: GraphAccessor> FailingAccessor<A> {
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            fail_on: None,
            fail_after: 0,
            fail_scan_after: None,
            reads: AtomicUsize::new(0),
        }
    }

    /// Fail while reading the relationships of `node`.
    pub fn fail_on(mut self, node: NodeId, after: usize) -> Self {
        self.fail_on = Some(node);
        self.fail_after = after;
        self
    }

    /// Fail the full node scan after `after` ids.
    pub fn fail_scan_after(mut self, after: usize) -> Self {
        self.fail_scan_after = Some(after);
        self
    }

    /// Number of `neighbors_of` calls served so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }
}

/// Iterator that yields `remaining` items of `inner`, then one error.
pub struct FailingIter<I> {
    inner: I,
    remaining: Option<usize>,
    error: Option<AccessError>,
}

impl<I> Iterator for FailingIter<I>
where
    I: Iterator<Item = Result<NodeId, AccessError>>,
{
    type Item = Result<NodeId, AccessError>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.remaining {
            Some(0) => self.error.take().map(Err),
            Some(n) => {
                *n -= 1;
                self.inner.next()
            }
            None => self.inner.next(),
        }
    }
}

impl<A: GraphAccessor> GraphAccessor for FailingAccessor<A> {
    type Neighbors<'a> = FailingIter<A::Neighbors<'a>> where Self: 'a;
    type NodeIds<'a> = FailingIter<A::NodeIds<'a>> where Self: 'a;

    fn node_exists(&self, node: NodeId) -> Result<bool, AccessError> {
        self.inner.node_exists(node)
    }

    fn neighbors_of(&self, node: NodeId) -> Result<Self::Neighbors<'_>, AccessError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let failing = self.fail_on == Some(node);
        Ok(FailingIter {
            inner: self.inner.neighbors_of(node)?,
            remaining: failing.then_some(self.fail_after),
            error: failing.then(|| AccessError::Read {
                node,
                message: "injected read failure".into(),
            }),
        })
    }

    fn all_node_ids(&self) -> Result<Self::NodeIds<'_>, AccessError> {
        Ok(FailingIter {
            inner: self.inner.all_node_ids()?,
            remaining: self.fail_scan_after,
            error: self.fail_scan_after.map(|_| AccessError::Scan {
                message: "injected scan failure".into(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;

    fn triangle() -> Graph {
        let mut g = Graph::new();
        g.load_edges(vec![(1, 2), (2, 3), (3, 1)]);
        g
    }

    #[test]
    fn test_failing_accessor_passes_through_other_nodes() {
        let g = triangle();
        let acc = FailingAccessor::new(&g).fail_on(1, 0);
        let ids: Result<Vec<NodeId>, _> = acc.neighbors_of(2).unwrap().collect();
        assert_eq!(ids.unwrap(), vec![3, 1]);
        assert_eq!(acc.reads(), 1);
    }

    #[test]
    fn test_failing_accessor_fails_mid_iteration() {
        let g = triangle();
        let acc = FailingAccessor::new(&g).fail_on(1, 1);
        let mut iter = acc.neighbors_of(1).unwrap();
        assert_eq!(iter.next(), Some(Ok(2)));
        assert!(matches!(iter.next(), Some(Err(AccessError::Read { node: 1, .. }))));
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn test_failing_scan() {
        let g = triangle();
        let acc = FailingAccessor::new(&g).fail_scan_after(2);
        let ids: Result<Vec<NodeId>, _> = acc.all_node_ids().unwrap().collect();
        assert!(matches!(ids, Err(AccessError::Scan { .. })));
        assert!(acc.node_exists(3).unwrap());
    }

    #[test]
    fn test_reference_is_an_accessor() {
        fn count<A: GraphAccessor>(acc: A) -> usize {
            acc.all_node_ids().unwrap().count()
        }
        let g = triangle();
        assert_eq!(count(&g), 3);
    }
}
