//! Weakly connected components by fixed-point frontier expansion.

use tracing::{debug, warn};

use crate::accessor::GraphAccessor;
use crate::error::{Result, TraversalError};
use crate::expand::HopExpander;
use crate::frontier::FrontierSet;
use crate::graph::NodeId;
use crate::interrupt::{HopProgress, Interrupt};

/// Expand from `start` until a hop produces an empty frontier, merging the
/// whole component into `seen`. Returns how many ids were added to `seen`.
///
/// `seen` may already hold other components; their ids are never
/// re-expanded.
pub fn expand_component<A, E>(
    accessor: &A,
    expander: &mut E,
    start: NodeId,
    seen: &mut FrontierSet,
    interrupt: &dyn Interrupt,
) -> Result<u64>
where
    A: GraphAccessor,
    E: HopExpander<A> + ?Sized,
{
    let before = seen.cardinality();
    seen.add(start);
    expander.seed(accessor, start)?;

    loop {
        let frontier = expander.hop(accessor, seen)?;
        if frontier == 0 {
            break;
        }
        let progress = HopProgress {
            hops_completed: expander.hops_completed(),
            seen: seen.cardinality(),
            frontier,
        };
        if interrupt.should_stop(&progress) {
            warn!(start, hops = progress.hops_completed, "component: interrupted");
            return Err(TraversalError::Interrupted {
                hops_completed: progress.hops_completed,
            });
        }
    }

    debug!(
        start,
        hops = expander.hops_completed(),
        "component: fixed point reached"
    );
    expander.drain_pending(seen);
    Ok(seen.cardinality() - before)
}

/// Size of the weakly connected component containing `start`, excluding
/// `start`. `Ok(None)` when `start` does not exist.
pub fn component_size<A, E>(
    accessor: &A,
    expander: &mut E,
    start: NodeId,
    interrupt: &dyn Interrupt,
) -> Result<Option<u64>>
where
    A: GraphAccessor,
    E: HopExpander<A> + ?Sized,
{
    if !accessor.node_exists(start)? {
        debug!(start, "component: start node not found, empty result");
        return Ok(None);
    }
    let mut seen = FrontierSet::new();
    let added = expand_component(accessor, expander, start, &mut seen, interrupt)?;
    Ok(Some(added - 1))
}

/// Number of weakly connected components in the whole graph.
///
/// One pass over `all_node_ids()` with a single seen set shared by every
/// component expansion, so each node is expanded at most once.
pub fn components_count<A, E>(
    accessor: &A,
    expander: &mut E,
    interrupt: &dyn Interrupt,
) -> Result<u64>
where
    A: GraphAccessor,
    E: HopExpander<A> + ?Sized,
{
    let mut seen = FrontierSet::new();
    let mut components = 0u64;

    for node in accessor.all_node_ids()? {
        let node = node?;
        if seen.contains(node) {
            continue;
        }
        components += 1;
        let size = expand_component(accessor, expander, node, &mut seen, interrupt)?;
        debug!(start = node, size, components, "component: discovered");
        let progress = HopProgress {
            hops_completed: 0,
            seen: seen.cardinality(),
            frontier: 0,
        };
        if interrupt.should_stop(&progress) {
            warn!(components, "component: scan interrupted");
            return Err(TraversalError::Interrupted { hops_completed: 0 });
        }
    }

    Ok(components)
}
