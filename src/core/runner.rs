//! # The task runner.
//!
//! Single consumer of the queue. Strictly sequential: one task is in
//! flight at any moment, and a failing task blocks everything behind it
//! until it succeeds or is allowed to fail.
//!
//! ## Drain discipline
//!
//! ```text
//! loop:
//!   queue empty?  → sleep queue_is_empty_delay, try again
//!   while head = peek():
//!     dispatch by kind
//!       success      → pop
//!       failure      → bump failure count, push Delay ahead of the task
//!       Delay        → sleep its duration, pop
//! ```
//!
//! Because the delay is pushed at the head, the failed task is still the
//! next real task after the delay: retry happens in place, the task is
//! never re-queued at the tail and never skipped. Retries are unbounded;
//! only `allow_failure` (hook tasks) turns a failure into a pop.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::ModuleError;
use crate::managers::module::ModuleManager;
use crate::tasks::{Task, TaskKind, TaskQueue};

/// Single consumer loop over the task queue.
pub(crate) struct TaskRunner {
    queue: Arc<TaskQueue>,
    modules: Arc<dyn ModuleManager>,
    queue_is_empty_delay: Duration,
    failed_hook_delay: Duration,
    failed_module_delay: Duration,
}

impl TaskRunner {
    pub(crate) fn new(cfg: &Config, queue: Arc<TaskQueue>, modules: Arc<dyn ModuleManager>) -> Self {
        Self {
            queue,
            modules,
            queue_is_empty_delay: cfg.queue_is_empty_delay,
            failed_hook_delay: cfg.failed_hook_delay,
            failed_module_delay: cfg.failed_module_delay,
        }
    }

    /// Runs until `token` is cancelled. Tasks in flight are not awaited
    /// past cancellation; the queue keeps whatever was not popped.
    pub(crate) async fn run(self, token: CancellationToken) {
        loop {
            if token.is_cancelled() {
                break;
            }
            if self.queue.is_empty() {
                debug!("queue is empty, waiting for tasks");
                tokio::select! {
                    _ = time::sleep(self.queue_is_empty_delay) => {}
                    _ = token.cancelled() => break,
                }
                continue;
            }
            while !token.is_cancelled() {
                let Some(head) = self.queue.peek() else {
                    break;
                };
                self.dispatch(head, &token).await;
            }
        }
    }

    /// Executes one head task and applies the retry/delay policy.
    async fn dispatch(&self, task: Task, token: &CancellationToken) {
        match task.kind() {
            TaskKind::ModuleRun => match self.modules.run_module(task.name()).await {
                Ok(()) => {
                    self.queue.pop();
                }
                Err(err) => self.retry_later(&task, self.failed_module_delay, &err),
            },
            TaskKind::ModuleDelete => match self.modules.delete_module(task.name()).await {
                Ok(()) => {
                    self.queue.pop();
                }
                Err(err) => self.retry_later(&task, self.failed_module_delay, &err),
            },
            TaskKind::ModuleHookRun => {
                let res = self
                    .modules
                    .run_module_hook(task.name(), task.binding(), task.binding_context())
                    .await;
                match res {
                    Ok(()) => {
                        self.queue.pop();
                    }
                    Err(err) if task.allow_failure() => {
                        warn!(hook = task.name(), label = err.as_label(), %err,
                            "module hook failed, failure is allowed");
                        self.queue.pop();
                    }
                    Err(err) => self.retry_later(&task, self.failed_module_delay, &err),
                }
            }
            TaskKind::GlobalHookRun => {
                let res = self
                    .modules
                    .run_global_hook(task.name(), task.binding(), task.binding_context())
                    .await;
                match res {
                    Ok(()) => {
                        self.queue.pop();
                    }
                    Err(err) if task.allow_failure() => {
                        warn!(hook = task.name(), label = err.as_label(), %err,
                            "global hook failed, failure is allowed");
                        self.queue.pop();
                    }
                    Err(err) => self.retry_later(&task, self.failed_hook_delay, &err),
                }
            }
            TaskKind::Delay(delay) => {
                tokio::select! {
                    _ = time::sleep(delay) => {
                        self.queue.pop();
                    }
                    _ = token.cancelled() => {}
                }
            }
        }
    }

    /// Leaves the failed task at the head and interposes a delay before
    /// it, so the same task is retried after the delay.
    fn retry_later(&self, task: &Task, delay: Duration, err: &ModuleError) {
        let failures = self.queue.increment_head_failures().unwrap_or_default();
        debug!(
            kind = task.kind().as_str(),
            name = task.name(),
            failures,
            label = err.as_label(),
            %err,
            "task failed, will retry after delay",
        );
        self.queue.push(Task::delay(delay));
    }
}
