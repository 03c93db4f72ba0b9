//! hop-count-core: frontier/bitmap BFS engine over an external graph.
//!
//! Counts the distinct nodes reachable from a start node within a bounded
//! number of hops, and finds weakly connected component sizes and counts.
//! The graph is reached through the [`GraphAccessor`] trait; [`Graph`] is an
//! in-memory implementation for testing and benchmarking.
//!
//! Traversals keep their state in [`FrontierSet`]s, a segmented bitmap over
//! sparse 64-bit ids. Each hop is driven by a [`HopExpander`]: either the
//! single-threaded [`SequentialHopExpander`] or the sharded
//! [`ParallelHopExpander`], which joins all shards at a per-hop barrier.

mod accessor;
mod component;
mod config;
mod error;
mod expand;
mod frontier;
mod graph;
mod interrupt;
mod khop;
mod parallel;
mod procedures;

pub use accessor::{FailingAccessor, FailingIter, GraphAccessor};
pub use component::{component_size, components_count, expand_component};
pub use config::{EngineConfig, MAX_DISTANCE, MAX_WORKERS};
pub use error::{AccessError, ConfigError, Result, TraversalError};
pub use expand::{expand, FrontierPair, HopExpander, SequentialHopExpander};
pub use frontier::{FrontierSet, Iter};
pub use graph::{AdjacencyIter, Graph, NodeId, NodeIdIter};
pub use interrupt::{CancelFlag, Deadline, HopProgress, Interrupt, Never};
pub use khop::khop_count;
pub use parallel::{build_pool, ParallelHopExpander};
pub use procedures::{LongResult, Procedures};
