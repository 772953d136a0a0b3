//! One-shot continuation queue.
//!
//! Continuations are posted while some piece of work is pending and run
//! exactly once, in posting order, when the owner decides the work has
//! settled. Each continuation receives a mutable context (typically the
//! object that owns the queue) so it can act on the settled state.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{CoreError, Result};

/// A unique identifier for a queued continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    /// Get the raw u64 value of this task ID.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Global counter for generating unique task IDs.
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

fn next_task_id() -> TaskId {
    TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
}

/// A boxed continuation closure.
pub type BoxedTask<C> = Box<dyn FnOnce(&mut C) + Send + 'static>;

struct TaskData<C> {
    id: TaskId,
    task: BoxedTask<C>,
}

/// FIFO queue of one-shot continuations over a context `C`.
pub struct TaskQueue<C> {
    tasks: VecDeque<TaskData<C>>,
}

impl<C> TaskQueue<C> {
    /// Create a new, empty queue.
    pub fn new() -> Self {
        Self {
            tasks: VecDeque::new(),
        }
    }

    /// Post a continuation.
    ///
    /// Returns the task ID that can be used to cancel it before it runs.
    pub fn post<F>(&mut self, task: F) -> TaskId
    where
        F: FnOnce(&mut C) + Send + 'static,
    {
        let id = next_task_id();
        self.tasks.push_back(TaskData {
            id,
            task: Box::new(task),
        });
        id
    }

    /// Cancel a pending continuation.
    pub fn cancel(&mut self, id: TaskId) -> Result<()> {
        let pos = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(CoreError::InvalidTask(id))?;
        self.tasks.remove(pos);
        Ok(())
    }

    /// Check if there are any pending continuations.
    pub fn has_pending(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Get the number of pending continuations.
    pub fn pending_count(&self) -> usize {
        self.tasks.len()
    }

    /// Detach every pending continuation into a new queue, leaving this one empty.
    ///
    /// Owners that live inside their own context use this to release the
    /// borrow before calling [`process_all`](Self::process_all).
    pub fn take(&mut self) -> Self {
        Self {
            tasks: std::mem::take(&mut self.tasks),
        }
    }

    /// Run all pending continuations in posting order, consuming them.
    ///
    /// Returns the number of continuations processed.
    pub fn process_all(mut self, ctx: &mut C) -> usize {
        let count = self.tasks.len();
        while let Some(task_data) = self.tasks.pop_front() {
            tracing::trace!(target: "horizon_grid_core::task", id = task_data.id.as_u64(), "running continuation");
            (task_data.task)(ctx);
        }
        count
    }
}

impl<C> Default for TaskQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for TaskQueue<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("pending", &self.tasks.len())
            .finish()
    }
}
