//! Rebuild scheduling.
//!
//! Mutations mark the engine dirty at the earliest pipeline stage they
//! invalidate. The scheduler coalesces everything that arrives within one
//! debounce window into a single rebuild from that stage, and holds the
//! continuations waiting for that rebuild to finish.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use horizon_grid_core::logging::targets;
use horizon_grid_core::{Clock, DebounceTimer, TaskId, TaskQueue};

use crate::config::GridConfig;
use crate::error::Result;

/// Pipeline stages in execution order.
///
/// A rebuild from a stage reruns that stage and everything after it, so the
/// earliest pending stage wins when several mutations coalesce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RebuildStage {
    /// Rows or group levels changed.
    Group,
    /// Filter values or cells changed.
    Filter,
    /// Sort column changed.
    Sort,
    /// Only selection or collapse flags changed.
    Flatten,
}

/// Coalesces rebuild requests for one engine instance.
///
/// `C` is the context continuations receive, normally the engine itself.
pub struct RebuildScheduler<C> {
    timer: DebounceTimer,
    pending: Option<RebuildStage>,
    continuations: TaskQueue<C>,
}

impl<C> RebuildScheduler<C> {
    /// Creates a scheduler with the debounce settings of `config`.
    pub fn new(clock: Arc<dyn Clock>, config: &GridConfig) -> Self {
        Self::with_timer(DebounceTimer::new(clock, config.debounce()).with_max_wait(config.max_wait()))
    }

    /// Creates a scheduler around an existing timer.
    pub fn with_timer(timer: DebounceTimer) -> Self {
        Self {
            timer,
            pending: None,
            continuations: TaskQueue::new(),
        }
    }

    /// Requests a rebuild starting no later than `stage`.
    pub fn mark_dirty(&mut self, stage: RebuildStage) {
        let stage = self.pending.map_or(stage, |pending| pending.min(stage));
        tracing::trace!(target: targets::SCHEDULER, ?stage, "marked dirty");
        self.pending = Some(stage);
        self.timer.trigger();
    }

    /// Whether a rebuild is pending.
    pub fn is_dirty(&self) -> bool {
        self.pending.is_some()
    }

    /// The stage the pending rebuild will start from.
    pub fn pending_stage(&self) -> Option<RebuildStage> {
        self.pending
    }

    /// Time left before the pending rebuild is due.
    pub fn time_until_rebuild(&self) -> Option<Duration> {
        self.pending.and(self.timer.time_until_fire())
    }

    /// Takes the pending stage if the debounce window has elapsed.
    pub fn take_due(&mut self) -> Option<RebuildStage> {
        if self.pending.is_some() && self.timer.fire_if_expired() {
            self.pending.take()
        } else {
            None
        }
    }

    /// Takes the pending stage immediately, closing the debounce window.
    pub fn take_now(&mut self) -> Option<RebuildStage> {
        self.timer.cancel();
        self.pending.take()
    }

    /// Queues a continuation for the end of the next rebuild.
    pub fn defer<F>(&mut self, continuation: F) -> TaskId
    where
        F: FnOnce(&mut C) + Send + 'static,
    {
        let id = self.continuations.post(continuation);
        tracing::trace!(
            target: targets::SCHEDULER,
            id = id.as_u64(),
            queued = self.continuations.pending_count(),
            "continuation deferred"
        );
        id
    }

    /// Removes a queued continuation.
    pub fn cancel(&mut self, id: TaskId) -> Result<()> {
        Ok(self.continuations.cancel(id)?)
    }

    /// Number of queued continuations.
    pub fn pending_continuations(&self) -> usize {
        self.continuations.pending_count()
    }

    /// Detaches the queued continuations so the owner can run them.
    pub fn take_continuations(&mut self) -> TaskQueue<C> {
        self.continuations.take()
    }
}

impl<C> fmt::Debug for RebuildScheduler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RebuildScheduler")
            .field("timer", &self.timer)
            .field("pending", &self.pending)
            .field("continuations", &self.continuations.pending_count())
            .finish()
    }
}
