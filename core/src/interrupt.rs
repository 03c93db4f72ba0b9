//! Early-stop hooks consulted by the orchestrators between hops.
//!
//! The engine has no timeout of its own. A caller that wants one passes an
//! [`Interrupt`]; when it returns true the call fails with
//! [`TraversalError::Interrupted`](crate::TraversalError::Interrupted).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Traversal state handed to an [`Interrupt`] after every completed hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HopProgress {
    pub hops_completed: u32,
    /// Nodes accounted for so far, including the start node.
    pub seen: u64,
    /// Size of the most recently produced frontier (may contain seen ids).
    pub frontier: u64,
}

pub trait Interrupt {
    fn should_stop(&self, progress: &HopProgress) -> bool;
}

/// Runs every traversal to completion.
#[derive(Debug, Clone, Copy, Default)]
pub struct Never;

impl Interrupt for Never {
    fn should_stop(&self, _progress: &HopProgress) -> bool {
        false
    }
}

/// Stops once a wall-clock instant has passed.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn at(at: Instant) -> Self {
        Self { at }
    }

    pub fn after(timeout: Duration) -> Self {
        Self::at(Instant::now() + timeout)
    }
}

impl Interrupt for Deadline {
    fn should_stop(&self, _progress: &HopProgress) -> bool {
        Instant::now() >= self.at
    }
}

/// Shared flag another thread can trip to stop a running traversal.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl Interrupt for CancelFlag {
    fn should_stop(&self, _progress: &HopProgress) -> bool {
        self.is_cancelled()
    }
}

impl<F> Interrupt for F
where
    F: Fn(&HopProgress) -> bool,
{
    fn should_stop(&self, progress: &HopProgress) -> bool {
        self(progress)
    }
}
