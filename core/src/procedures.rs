//! Callable operations over one graph accessor.
//!
//! Every operation returns zero rows (`None`) on invalid input or a missing
//! start node, one [`LongResult`] row otherwise, and an error when the
//! storage layer or a worker fails.

use rayon::ThreadPool;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::accessor::GraphAccessor;
use crate::component;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::expand::SequentialHopExpander;
use crate::graph::NodeId;
use crate::interrupt::{Deadline, Interrupt, Never};
use crate::khop;
use crate::parallel::{build_pool, ParallelHopExpander};

/// Single-column result row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongResult {
    pub value: u64,
}

impl From<u64> for LongResult {
    fn from(value: u64) -> Self {
        Self { value }
    }
}

pub struct Procedures<A> {
    accessor: A,
    config: EngineConfig,
    pool: ThreadPool,
}

impl<A: GraphAccessor + Sync> Procedures<A> {
    /// Validate `config` and start the worker pool used by `parallel_khop`.
    pub fn new(accessor: A, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let pool = build_pool(config.resolved_workers(), &config.thread_name_prefix)?;
        Ok(Self {
            accessor,
            config,
            pool,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Distinct nodes within `distance` hops of `start`, excluding `start`.
    pub fn khop(&self, start: NodeId, distance: Option<i64>) -> Result<Option<LongResult>> {
        let distance = distance.unwrap_or(self.config.default_distance);
        debug!(start, distance, "procedure khop");
        let mut expander = SequentialHopExpander::new();
        let count = self.with_interrupt(|interrupt| {
            khop::khop_count(&self.accessor, &mut expander, start, distance, interrupt)
        })?;
        Ok(count.map(LongResult::from))
    }

    /// Same as [`khop`](Self::khop), with each hop sharded over the pool.
    pub fn parallel_khop(
        &self,
        start: NodeId,
        distance: Option<i64>,
    ) -> Result<Option<LongResult>> {
        let distance = distance.unwrap_or(self.config.default_distance);
        debug!(start, distance, "procedure parallel_khop");
        let mut expander = ParallelHopExpander::new(&self.pool);
        let count = self.with_interrupt(|interrupt| {
            khop::khop_count(&self.accessor, &mut expander, start, distance, interrupt)
        })?;
        Ok(count.map(LongResult::from))
    }

    /// Size of `start`'s weakly connected component, excluding `start`.
    pub fn component_size(&self, start: NodeId) -> Result<Option<LongResult>> {
        debug!(start, "procedure component_size");
        let mut expander = SequentialHopExpander::new();
        let size = self.with_interrupt(|interrupt| {
            component::component_size(&self.accessor, &mut expander, start, interrupt)
        })?;
        Ok(size.map(LongResult::from))
    }

    /// Number of weakly connected components in the graph. Always one row.
    pub fn components_count(&self) -> Result<Option<LongResult>> {
        debug!("procedure components_count");
        let mut expander = SequentialHopExpander::new();
        let count = self.with_interrupt(|interrupt| {
            component::components_count(&self.accessor, &mut expander, interrupt)
        })?;
        Ok(Some(LongResult::from(count)))
    }

    /// Run `f` under the configured per-call deadline, if any.
    fn with_interrupt<T>(&self, f: impl FnOnce(&dyn Interrupt) -> T) -> T {
        match self.config.timeout() {
            Some(timeout) => f(&Deadline::after(timeout)),
            None => f(&Never),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::accessor::FailingAccessor;
    use crate::error::{AccessError, TraversalError};
    use crate::graph::Graph;

    fn make_chain(n: u64) -> Graph {
        let mut g = Graph::new();
        g.load_edges((1..n).map(|i| (i, i + 1)));
        g
    }

    fn procedures(g: &Graph) -> Procedures<&Graph> {
        let config = EngineConfig {
            workers: 2,
            ..EngineConfig::default()
        };
        Procedures::new(g, config).unwrap()
    }

    fn value(row: Option<LongResult>) -> Option<u64> {
        row.map(|r| r.value)
    }

    #[test]
    fn test_khop_default_distance_is_one() {
        let g = make_chain(5);
        let p = procedures(&g);
        assert_eq!(value(p.khop(1, None).unwrap()), Some(1));
        assert_eq!(value(p.parallel_khop(1, None).unwrap()), Some(1));
        assert_eq!(value(p.khop(1, Some(4)).unwrap()), Some(4));
        assert_eq!(value(p.parallel_khop(1, Some(4)).unwrap()), Some(4));
    }

    #[test]
    fn test_configured_default_distance() {
        let g = make_chain(5);
        let config = EngineConfig {
            workers: 1,
            default_distance: 2,
            ..EngineConfig::default()
        };
        let p = Procedures::new(&g, config).unwrap();
        assert_eq!(value(p.khop(1, None).unwrap()), Some(2));
    }

    #[test]
    fn test_zero_rows_on_invalid_input() {
        let g = make_chain(5);
        let p = procedures(&g);
        assert_eq!(p.khop(1, Some(0)).unwrap(), None);
        assert_eq!(p.parallel_khop(1, Some(-1)).unwrap(), None);
        assert_eq!(p.khop(42, Some(2)).unwrap(), None);
        assert_eq!(p.component_size(42).unwrap(), None);
    }

    #[test]
    fn test_component_procedures() {
        let mut g = make_chain(5);
        g.add_node(9);
        let p = procedures(&g);
        assert_eq!(value(p.component_size(1).unwrap()), Some(4));
        assert_eq!(value(p.component_size(9).unwrap()), Some(0));
        assert_eq!(value(p.components_count().unwrap()), Some(2));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let g = make_chain(3);
        let config = EngineConfig {
            default_distance: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            Procedures::new(&g, config),
            Err(TraversalError::Config(_))
        ));
    }

    #[test]
    fn test_storage_failure_propagates() {
        let g = make_chain(5);
        let acc = FailingAccessor::new(&g).fail_on(2, 0);
        let p = Procedures::new(acc, EngineConfig::default()).unwrap();
        assert!(p.khop(1, Some(2)).is_err());
        assert!(p.parallel_khop(1, Some(2)).is_err());
        assert!(p.components_count().is_err());
        // Node 2 is only read after the first hop
        assert_eq!(value(p.khop(1, Some(1)).unwrap()), Some(1));
    }

    /// Sleeps before every relationship read so a short deadline is always
    /// past by the first between-hop check.
    struct SlowAccessor<'g> {
        graph: &'g Graph,
        delay: Duration,
    }

    impl GraphAccessor for SlowAccessor<'_> {
        type Neighbors<'a> = <Graph as GraphAccessor>::Neighbors<'a> where Self: 'a;
        type NodeIds<'a> = <Graph as GraphAccessor>::NodeIds<'a> where Self: 'a;

        fn node_exists(&self, node: NodeId) -> Result<bool, AccessError> {
            self.graph.node_exists(node)
        }

        fn neighbors_of(&self, node: NodeId) -> Result<Self::Neighbors<'_>, AccessError> {
            std::thread::sleep(self.delay);
            self.graph.neighbors_of(node)
        }

        fn all_node_ids(&self) -> Result<Self::NodeIds<'_>, AccessError> {
            self.graph.all_node_ids()
        }
    }

    #[test]
    fn test_timeout_interrupts_calls() {
        let g = make_chain(10);
        let acc = SlowAccessor {
            graph: &g,
            delay: Duration::from_millis(5),
        };
        let config = EngineConfig {
            workers: 2,
            timeout_ms: Some(1),
            ..EngineConfig::default()
        };
        let p = Procedures::new(acc, config).unwrap();

        for result in [
            p.khop(1, Some(5)),
            p.parallel_khop(1, Some(5)),
            p.component_size(1),
            p.components_count(),
        ] {
            assert!(
                matches!(result, Err(TraversalError::Interrupted { .. })),
                "{:?}",
                result
            );
        }
        // distance 1 never hops, so the deadline is never consulted
        assert_eq!(value(p.khop(1, Some(1)).unwrap()), Some(1));
    }

    #[test]
    fn test_row_serializes() {
        let row = LongResult::from(12);
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"{"value":12}"#);
    }
}
