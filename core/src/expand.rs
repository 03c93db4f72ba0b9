//! One-hop frontier expansion.
//!
//! [`expand`] is the kernel shared by every orchestrator. [`HopExpander`]
//! wraps it behind one interface with a single-threaded implementation
//! here and a sharded one in [`crate::parallel`].

use crate::accessor::GraphAccessor;
use crate::error::{AccessError, Result};
use crate::frontier::FrontierSet;
use crate::graph::NodeId;

/// Advance `frontier_in` by one hop into `frontier_out`.
///
/// 1. drop ids already in `seen` from `frontier_in`
/// 2. merge what is left into `seen`
/// 3. clear `frontier_out`
/// 4. add every neighbour of every id in `frontier_in` to `frontier_out`
///
/// `frontier_out` may contain seen ids; they are dropped by step 1 of the
/// next call.
pub fn expand<A: GraphAccessor>(
    accessor: &A,
    frontier_in: &mut FrontierSet,
    seen: &mut FrontierSet,
    frontier_out: &mut FrontierSet,
) -> Result<(), AccessError> {
    frontier_in.difference_with(seen);
    seen.union_with(frontier_in);
    frontier_out.clear();
    collect_neighbors(accessor, frontier_in, frontier_out)
}

/// Add the neighbours of every id in `frontier` to `out`.
pub(crate) fn collect_neighbors<A: GraphAccessor>(
    accessor: &A,
    frontier: &FrontierSet,
    out: &mut FrontierSet,
) -> Result<(), AccessError> {
    for node in frontier {
        for neighbor in accessor.neighbors_of(node)? {
            out.add(neighbor?);
        }
    }
    Ok(())
}

/// The two ping-ponged frontier buffers of one traversal.
///
/// After seeding, B holds the first frontier. Hop 1 expands B into A, hop 2
/// A into B, and so on: after an odd number of hops A holds the most recent
/// frontier, after an even number B does.
#[derive(Debug, Default)]
pub struct FrontierPair {
    a: FrontierSet,
    b: FrontierSet,
    hops: u32,
}

impl FrontierPair {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.a.clear();
        self.b.clear();
        self.hops = 0;
    }

    pub fn hops_completed(&self) -> u32 {
        self.hops
    }

    /// The most recently produced frontier, not yet merged into seen.
    pub fn pending(&self) -> &FrontierSet {
        if self.hops % 2 == 1 {
            &self.a
        } else {
            &self.b
        }
    }

    pub fn pending_mut(&mut self) -> &mut FrontierSet {
        if self.hops % 2 == 1 {
            &mut self.a
        } else {
            &mut self.b
        }
    }

    /// The input of the last completed hop.
    pub fn previous(&self) -> &FrontierSet {
        if self.hops % 2 == 1 {
            &self.b
        } else {
            &self.a
        }
    }

    /// (input, output) buffers for the next hop.
    fn buffers(&mut self) -> (&mut FrontierSet, &mut FrontierSet) {
        if self.hops % 2 == 1 {
            (&mut self.a, &mut self.b)
        } else {
            (&mut self.b, &mut self.a)
        }
    }

    /// Run one hop with [`expand`]. Returns the size of the new frontier.
    pub fn hop<A: GraphAccessor>(
        &mut self,
        accessor: &A,
        seen: &mut FrontierSet,
    ) -> Result<u64, AccessError> {
        let (input, output) = self.buffers();
        expand(accessor, input, seen, output)?;
        self.hops += 1;
        Ok(self.pending().cardinality())
    }

    /// Run one hop without touching `seen`: the deduped input stays in
    /// [`previous`](Self::previous) for the caller to merge later.
    pub fn hop_unmerged<A: GraphAccessor>(
        &mut self,
        accessor: &A,
        seen: &FrontierSet,
    ) -> Result<(), AccessError> {
        let (input, output) = self.buffers();
        input.difference_with(seen);
        output.clear();
        collect_neighbors(accessor, input, output)?;
        self.hops += 1;
        Ok(())
    }
}

/// One hop of frontier expansion, sequential or sharded.
///
/// The caller owns `seen`; the expander owns the frontier buffers. A
/// traversal is `seed`, any number of `hop`s, then `drain_pending`.
pub trait HopExpander<A: GraphAccessor> {
    /// Discard previous state and load the neighbours of `start` as the
    /// first frontier. Does not touch `seen`.
    fn seed(&mut self, accessor: &A, start: NodeId) -> Result<()>;

    /// Expand the pending frontier by one hop, merging its unseen ids into
    /// `seen`. Returns the size of the newly produced frontier.
    fn hop(&mut self, accessor: &A, seen: &mut FrontierSet) -> Result<u64>;

    /// Merge the pending frontier into `seen` and release the buffers.
    fn drain_pending(&mut self, seen: &mut FrontierSet);

    fn hops_completed(&self) -> u32;
}

/// Single-threaded expander over one [`FrontierPair`].
#[derive(Debug, Default)]
pub struct SequentialHopExpander {
    frontiers: FrontierPair,
}

impl SequentialHopExpander {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<A: GraphAccessor> HopExpander<A> for SequentialHopExpander {
    fn seed(&mut self, accessor: &A, start: NodeId) -> Result<()> {
        self.frontiers.reset();
        let first = self.frontiers.pending_mut();
        for neighbor in accessor.neighbors_of(start)? {
            first.add(neighbor?);
        }
        Ok(())
    }

    fn hop(&mut self, accessor: &A, seen: &mut FrontierSet) -> Result<u64> {
        Ok(self.frontiers.hop(accessor, seen)?)
    }

    fn drain_pending(&mut self, seen: &mut FrontierSet) {
        seen.union_with(self.frontiers.pending());
        self.frontiers.reset();
    }

    fn hops_completed(&self) -> u32 {
        self.frontiers.hops_completed()
    }
}
