//! Sharded hop expansion on a fixed-size worker pool.
//!
//! Each shard owns a private [`FrontierPair`]. A hop submits one task per
//! shard into a pool scope; the scope end is the per-hop rendezvous: the
//! orchestrator thread blocks until every task finished, then inspects every
//! outcome before anything is merged. `seen` is only read by workers and only
//! written on the orchestrator thread, between hops.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{info, warn};

use crate::accessor::GraphAccessor;
use crate::error::{AccessError, Result, TraversalError};
use crate::expand::{FrontierPair, HopExpander};
use crate::frontier::FrontierSet;
use crate::graph::NodeId;

/// Build the worker pool. `workers == 0` means one per hardware thread.
pub fn build_pool(workers: usize, thread_name_prefix: &str) -> Result<ThreadPool> {
    let prefix = thread_name_prefix.to_string();
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(move |i| format!("{}-{}", prefix, i))
        .build()?;
    info!(
        workers = pool.current_num_threads(),
        "hop-count: worker pool started"
    );
    Ok(pool)
}

type TaskOutcome = std::thread::Result<Result<(), AccessError>>;

/// Expander that splits every frontier across one shard per pool thread.
pub struct ParallelHopExpander<'p> {
    pool: &'p ThreadPool,
    shards: Vec<FrontierPair>,
    claimed: FrontierSet,
    hops: u32,
}

impl<'p> ParallelHopExpander<'p> {
    pub fn new(pool: &'p ThreadPool) -> Self {
        let shards = (0..pool.current_num_threads().max(1))
            .map(|_| FrontierPair::new())
            .collect();
        Self {
            pool,
            shards,
            claimed: FrontierSet::new(),
            hops: 0,
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Pending frontier size per shard.
    pub fn shard_sizes(&self) -> Vec<u64> {
        self.shards
            .iter()
            .map(|shard| shard.pending().cardinality())
            .collect()
    }

    fn reset(&mut self) {
        for shard in &mut self.shards {
            shard.reset();
        }
        self.claimed.clear();
        self.hops = 0;
    }

    /// Run one task per shard and wait for all of them.
    fn run_shards<A>(&mut self, accessor: &A, seen: &FrontierSet) -> Vec<Option<TaskOutcome>>
    where
        A: GraphAccessor + Sync,
    {
        let mut outcomes: Vec<Option<TaskOutcome>> = self.shards.iter().map(|_| None).collect();
        let shards = &mut self.shards;

        self.pool.scope(|scope| {
            for (shard, slot) in shards.iter_mut().zip(outcomes.iter_mut()) {
                scope.spawn(move |_| {
                    *slot = Some(panic::catch_unwind(AssertUnwindSafe(|| {
                        shard.hop_unmerged(accessor, seen)
                    })));
                });
            }
        });

        outcomes
    }

    /// Keep each pending id in exactly one shard, the lowest-indexed one
    /// that produced it.
    fn disjoin_pending(&mut self) -> u64 {
        self.claimed.clear();
        let mut total = 0;
        for shard in &mut self.shards {
            let pending = shard.pending_mut();
            pending.difference_with(&self.claimed);
            self.claimed.union_with(pending);
            total += pending.cardinality();
        }
        self.claimed.clear();
        total
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

impl<A> HopExpander<A> for ParallelHopExpander<'_>
where
    A: GraphAccessor + Sync,
{
    /// Distinct neighbours of `start` are dealt round-robin in enumeration
    /// order. Repeats (parallel edges, a->b plus b->a) stay in the shard that
    /// got them first.
    fn seed(&mut self, accessor: &A, start: NodeId) -> Result<()> {
        self.reset();
        let width = self.shards.len();
        let mut dealt = 0usize;
        for neighbor in accessor.neighbors_of(start)? {
            let neighbor = neighbor?;
            if self.claimed.add(neighbor) {
                self.shards[dealt % width].pending_mut().add(neighbor);
                dealt += 1;
            }
        }
        self.claimed.clear();
        Ok(())
    }

    fn hop(&mut self, accessor: &A, seen: &mut FrontierSet) -> Result<u64> {
        let outcomes = self.run_shards(accessor, seen);

        // Barrier passed: every task has finished. Nothing is merged unless
        // all of them succeeded.
        for (shard, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Some(Ok(Ok(()))) => {}
                Some(Ok(Err(source))) => {
                    warn!(shard, error = %source, "hop-count: shard failed");
                    return Err(TraversalError::WorkerFailed { shard, source });
                }
                Some(Err(payload)) => {
                    let message = panic_message(payload.as_ref());
                    warn!(shard, %message, "hop-count: shard panicked");
                    return Err(TraversalError::WorkerPanicked { shard, message });
                }
                None => {
                    return Err(TraversalError::WorkerPanicked {
                        shard,
                        message: "task did not report an outcome".to_string(),
                    });
                }
            }
        }

        for shard in &self.shards {
            seen.union_with(shard.previous());
        }
        self.hops += 1;
        Ok(self.disjoin_pending())
    }

    fn drain_pending(&mut self, seen: &mut FrontierSet) {
        for shard in &self.shards {
            seen.union_with(shard.pending());
        }
        self.reset();
    }

    fn hops_completed(&self) -> u32 {
        self.hops
    }
}
