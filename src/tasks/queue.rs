//! # The serialized work queue.
//!
//! [`TaskQueue`] is the single pipeline between every event producer and
//! the one task runner. It is an internally synchronized FIFO with two
//! extras the pipeline depends on:
//!
//! - **Head insertion** ([`TaskQueue::push`]) — used only by the runner to
//!   interpose a delay task ahead of a task that just failed, so the same
//!   task is retried after the delay instead of being skipped.
//! - **Change gating** ([`TaskQueue::changes_disable`] /
//!   [`TaskQueue::changes_enable`]) — composition phases append many tasks
//!   as one batch; gating collapses the watcher notifications for the
//!   whole batch into a single one at enable time.
//!
//! ## Ordering contract
//!
//! `peek` followed by `pop` returns the same task as long as nothing was
//! pushed at the head in between. Producers only ever [`TaskQueue::add`]
//! at the tail and only the runner pushes, so with a single runner the
//! head identity between its `peek` and its `pop` always holds.
//!
//! ## Watchers
//!
//! Watchers are notified synchronously inside the mutating call, under
//! the queue lock, and receive a snapshot of the queue contents. A
//! watcher must not call back into the queue (the lock is not reentrant).
//! A panicking watcher does not take the queue down: the lock recovers
//! from poisoning on the next operation.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::tasks::task::Task;

/// Receiver of queue-change notifications.
///
/// Implementations get a snapshot of the queue after each committed
/// mutation (or one aggregate snapshot at gate-enable time). They must
/// not block for long and must not re-enter queue methods.
pub trait QueueWatcher: Send + Sync {
    /// Called after a committed mutation while changes are enabled.
    fn on_queue_changed(&self, snapshot: &[Task]);
}

struct Inner {
    tasks: VecDeque<Task>,
    changes_enabled: bool,
    changed_while_disabled: bool,
    watchers: Vec<Arc<dyn QueueWatcher>>,
}

/// Internally synchronized FIFO of [`Task`]s with head-push and gated
/// watcher notification.
pub struct TaskQueue {
    inner: Mutex<Inner>,
}

impl TaskQueue {
    /// Creates an empty queue with changes enabled and no watchers.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                tasks: VecDeque::new(),
                changes_enabled: true,
                changed_while_disabled: false,
                watchers: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A watcher panic poisons the mutex; the queue itself is still
        // consistent because mutations commit before notification.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a task at the tail.
    pub fn add(&self, task: Task) {
        let mut inner = self.lock();
        inner.tasks.push_back(task);
        Self::notify(&mut inner);
    }

    /// Prepends a task at the head.
    ///
    /// Reserved for the runner: interposes a delay ahead of the failed
    /// head so the retry happens after the delay.
    pub fn push(&self, task: Task) {
        let mut inner = self.lock();
        inner.tasks.push_front(task);
        Self::notify(&mut inner);
    }

    /// Returns a copy of the head task without removing it.
    pub fn peek(&self) -> Option<Task> {
        self.lock().tasks.front().cloned()
    }

    /// Removes and returns the head task.
    pub fn pop(&self) -> Option<Task> {
        let mut inner = self.lock();
        let head = inner.tasks.pop_front();
        if head.is_some() {
            Self::notify(&mut inner);
        }
        head
    }

    /// Returns whether the queue holds no tasks.
    pub fn is_empty(&self) -> bool {
        self.lock().tasks.is_empty()
    }

    /// Returns the number of queued tasks.
    pub fn len(&self) -> usize {
        self.lock().tasks.len()
    }

    /// Records one more failed attempt on the head task and returns the
    /// new count.
    ///
    /// The counter changes in place: the queued task keeps its identity
    /// across retries. Watchers are not notified (the queue order did
    /// not change).
    pub fn increment_head_failures(&self) -> Option<u32> {
        let mut inner = self.lock();
        inner.tasks.front_mut().map(|task| {
            task.increment_failure_count();
            task.failure_count()
        })
    }

    /// Suppresses watcher notification until re-enabled.
    pub fn changes_disable(&self) {
        self.lock().changes_enabled = false;
    }

    /// Re-enables watcher notification.
    ///
    /// With `fire_once = true`, fires exactly one aggregate notification
    /// if any mutation happened while notifications were suppressed.
    pub fn changes_enable(&self, fire_once: bool) {
        let mut inner = self.lock();
        inner.changes_enabled = true;
        let pending = std::mem::replace(&mut inner.changed_while_disabled, false);
        if fire_once && pending {
            Self::notify(&mut inner);
        }
    }

    /// Registers a watcher for committed mutations.
    pub fn add_watcher(&self, watcher: Arc<dyn QueueWatcher>) {
        self.lock().watchers.push(watcher);
    }

    fn notify(inner: &mut Inner) {
        if !inner.changes_enabled {
            inner.changed_while_disabled = true;
            return;
        }
        let snapshot: Vec<Task> = inner.tasks.iter().cloned().collect();
        for watcher in &inner.watchers {
            watcher.on_queue_changed(&snapshot);
        }
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
