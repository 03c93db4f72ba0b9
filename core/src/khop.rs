use tracing::{debug, warn};

use crate::accessor::GraphAccessor;
use crate::error::{Result, TraversalError};
use crate::expand::HopExpander;
use crate::frontier::FrontierSet;
use crate::graph::NodeId;
use crate::interrupt::{HopProgress, Interrupt};

/// Number of distinct nodes reachable from `start` within `distance` hops,
/// ignoring edge direction and excluding `start` itself.
///
/// Returns `Ok(None)` (no result row) when `distance < 1` or `start` does
/// not exist. Works with any [`HopExpander`]; the sequential and parallel
/// expanders give identical counts.
pub fn khop_count<A, E>(
    accessor: &A,
    expander: &mut E,
    start: NodeId,
    distance: i64,
    interrupt: &dyn Interrupt,
) -> Result<Option<u64>>
where
    A: GraphAccessor,
    E: HopExpander<A> + ?Sized,
{
    if distance < 1 {
        debug!(start, distance, "khop: distance below 1, empty result");
        return Ok(None);
    }
    if !accessor.node_exists(start)? {
        debug!(start, "khop: start node not found, empty result");
        return Ok(None);
    }

    let mut seen = FrontierSet::new();
    seen.add(start);
    expander.seed(accessor, start)?;

    // Up to distance - 1 hops; the pending buffer alternates B, A, B, ...
    for _ in 1..distance {
        let frontier = expander.hop(accessor, &mut seen)?;
        let progress = HopProgress {
            hops_completed: expander.hops_completed(),
            seen: seen.cardinality(),
            frontier,
        };
        debug!(
            start,
            hop = progress.hops_completed,
            frontier = progress.frontier,
            seen = progress.seen,
            "khop: hop complete"
        );
        if interrupt.should_stop(&progress) {
            warn!(start, distance, hops = progress.hops_completed, "khop: interrupted");
            return Err(TraversalError::Interrupted {
                hops_completed: progress.hops_completed,
            });
        }
        // An empty frontier stays empty: no later hop can add ids
        if frontier == 0 {
            break;
        }
    }

    expander.drain_pending(&mut seen);
    seen.remove(start);
    Ok(Some(seen.cardinality()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::FailingAccessor;
    use crate::error::AccessError;
    use crate::expand::SequentialHopExpander;
    use crate::graph::Graph;
    use crate::interrupt::{CancelFlag, Never};
    use crate::parallel::{build_pool, ParallelHopExpander};

    fn make_chain(n: u64) -> Graph {
        let mut g = Graph::new();
        g.load_edges((1..n).map(|i| (i, i + 1)));
        g
    }

    fn make_star(center: u64, leaves: u64) -> Graph {
        let mut g = Graph::new();
        g.load_edges((1..=leaves).map(|i| (center, center + i)));
        g
    }

    fn make_cycle(n: u64) -> Graph {
        let mut g = Graph::new();
        g.load_edges((0..n).map(|i| (i, (i + 1) % n)));
        g
    }

    fn khop(g: &Graph, start: NodeId, distance: i64) -> Option<u64> {
        let mut expander = SequentialHopExpander::new();
        khop_count(g, &mut expander, start, distance, &Never).unwrap()
    }

    fn parallel_khop(g: &Graph, start: NodeId, distance: i64) -> Option<u64> {
        let pool = build_pool(4, "khop-test").unwrap();
        let mut expander = ParallelHopExpander::new(&pool);
        khop_count(g, &mut expander, start, distance, &Never).unwrap()
    }

    #[test]
    fn test_khop_chain() {
        let g = make_chain(5);
        assert_eq!(khop(&g, 1, 1), Some(1));
        assert_eq!(khop(&g, 1, 2), Some(2));
        assert_eq!(khop(&g, 1, 3), Some(3));
        assert_eq!(khop(&g, 1, 4), Some(4));
        assert_eq!(khop(&g, 1, 10), Some(4));
    }

    #[test]
    fn test_khop_chain_from_middle() {
        let g = make_chain(5);
        assert_eq!(khop(&g, 3, 1), Some(2));
        assert_eq!(khop(&g, 3, 2), Some(4));
    }

    #[test]
    fn test_khop_star() {
        let g = make_star(100, 10);
        assert_eq!(khop(&g, 100, 1), Some(10));
        assert_eq!(khop(&g, 100, 2), Some(10));
        // Leaf: center at 1 hop, other leaves at 2
        assert_eq!(khop(&g, 101, 1), Some(1));
        assert_eq!(khop(&g, 101, 2), Some(10));
    }

    #[test]
    fn test_khop_cycle_no_infinite_loop() {
        let g = make_cycle(6);
        assert_eq!(khop(&g, 0, 2), Some(4));
        assert_eq!(khop(&g, 0, 3), Some(5));
        assert_eq!(khop(&g, 0, 100), Some(5));
    }

    #[test]
    fn test_khop_huge_distance_stops_at_exhaustion() {
        let g = make_chain(3);
        let hops = std::cell::Cell::new(0u32);
        let track = |p: &HopProgress| {
            hops.set(p.hops_completed);
            false
        };
        let mut expander = SequentialHopExpander::new();
        assert_eq!(
            khop_count(&g, &mut expander, 1, i64::MAX, &track).unwrap(),
            Some(2)
        );
        // {2} -> {1, 3} -> {2} -> {}
        assert_eq!(hops.get(), 3);

        let pool = build_pool(2, "khop-test").unwrap();
        let mut parallel = ParallelHopExpander::new(&pool);
        assert_eq!(
            khop_count(&g, &mut parallel, 1, i64::MAX, &track).unwrap(),
            Some(2)
        );
        assert_eq!(hops.get(), 3);
        assert_eq!(khop(&make_cycle(6), 0, i64::MAX), Some(5));
    }

    #[test]
    fn test_khop_distance_below_one() {
        let g = make_chain(5);
        assert_eq!(khop(&g, 1, 0), None);
        assert_eq!(khop(&g, 1, -3), None);
        assert_eq!(parallel_khop(&g, 1, 0), None);
    }

    #[test]
    fn test_khop_start_not_in_graph() {
        let g = make_chain(5);
        assert_eq!(khop(&g, 999, 2), None);
        assert_eq!(parallel_khop(&g, 999, 2), None);
    }

    #[test]
    fn test_khop_self_loop_excluded() {
        let mut g = Graph::new();
        g.load_edges(vec![(0, 0), (0, 1)]);
        assert_eq!(khop(&g, 0, 1), Some(1));
        assert_eq!(khop(&g, 0, 2), Some(1));
    }

    #[test]
    fn test_khop_isolated_node() {
        let mut g = Graph::new();
        g.add_node(7);
        assert_eq!(khop(&g, 7, 1), Some(0));
        assert_eq!(khop(&g, 7, 5), Some(0));
    }

    #[test]
    fn test_khop_parallel_edges_counted_once() {
        let mut g = Graph::new();
        g.load_edges(vec![(0, 1), (0, 1), (1, 0)]);
        assert_eq!(khop(&g, 0, 1), Some(1));
    }

    #[test]
    fn test_khop_ignores_direction() {
        let mut g = Graph::new();
        g.load_edges(vec![(2, 1), (3, 2)]);
        assert_eq!(khop(&g, 1, 2), Some(2));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut g = make_cycle(40);
        g.load_edges(vec![(0, 20), (5, 33), (100, 101)]);
        for start in [0, 5, 17, 100] {
            for distance in 1..8 {
                assert_eq!(
                    khop(&g, start, distance),
                    parallel_khop(&g, start, distance),
                    "start={} distance={}",
                    start,
                    distance
                );
            }
        }
    }

    #[test]
    fn test_khop_access_failure_aborts() {
        let g = make_chain(5);
        let acc = FailingAccessor::new(&g).fail_on(3, 0);
        let mut expander = SequentialHopExpander::new();
        // 3 is only read on the second hop
        assert_eq!(khop_count(&acc, &mut expander, 1, 2, &Never).unwrap(), Some(2));
        let err = khop_count(&acc, &mut expander, 1, 3, &Never).unwrap_err();
        assert!(matches!(
            err,
            TraversalError::Access(AccessError::Read { node: 3, .. })
        ));
    }

    #[test]
    fn test_khop_parallel_access_failure_aborts() {
        let g = make_star(0, 16);
        let acc = FailingAccessor::new(&g).fail_on(9, 0);
        let pool = build_pool(4, "khop-test").unwrap();
        let mut expander = ParallelHopExpander::new(&pool);
        let err = khop_count(&acc, &mut expander, 0, 2, &Never).unwrap_err();
        assert!(matches!(err, TraversalError::WorkerFailed { .. }));
    }

    #[test]
    fn test_khop_interrupt_between_hops() {
        let g = make_chain(10);
        let mut expander = SequentialHopExpander::new();
        let stop_after_two = |p: &HopProgress| p.hops_completed >= 2;
        let err = khop_count(&g, &mut expander, 1, 8, &stop_after_two).unwrap_err();
        assert!(matches!(
            err,
            TraversalError::Interrupted { hops_completed: 2 }
        ));

        let flag = CancelFlag::new();
        flag.cancel();
        // distance 1 never hops, so the flag is never consulted
        assert_eq!(khop_count(&g, &mut expander, 1, 1, &flag).unwrap(), Some(1));
        assert!(khop_count(&g, &mut expander, 1, 2, &flag).is_err());
    }
}
