//! # Work items for the serialized pipeline.
//!
//! A [`Task`] is one unit of queued work: reconcile a module, delete a
//! module, run a hook, or wait out a delay. Tasks are built by kind and
//! name, then refined with `with_*` modifiers:
//!
//! ```rust
//! use modvisor::{Binding, Task, TaskKind};
//!
//! let task = Task::new(TaskKind::GlobalHookRun, "cluster-dns")
//!     .with_binding(Binding::Schedule)
//!     .with_allow_failure(true);
//!
//! assert_eq!(task.name(), "cluster-dns");
//! assert!(task.allow_failure());
//! ```
//!
//! ## Rules
//! - A [`Task::delay`] task carries only its duration; no name, no binding.
//! - After a task is queued, only its failure counter may change. Retries
//!   re-examine the same queued task, they never rebuild it.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::tasks::binding::Binding;

/// Discriminates what a queued task does when it reaches the head.
///
/// Only `Delay` carries a payload: the duration the runner must wait
/// before looking at the next task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskKind {
    /// Reconcile one module (install or upgrade its chart, run its hooks).
    ModuleRun,
    /// Remove one module from the cluster.
    ModuleDelete,
    /// Run a single module hook.
    ModuleHookRun,
    /// Run a single global hook.
    GlobalHookRun,
    /// Block the pipeline for the given duration, then continue.
    Delay(Duration),
}

impl TaskKind {
    /// Returns a stable label for logs and the queue dump.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::ModuleRun => "ModuleRun",
            TaskKind::ModuleDelete => "ModuleDelete",
            TaskKind::ModuleHookRun => "ModuleHookRun",
            TaskKind::GlobalHookRun => "GlobalHookRun",
            TaskKind::Delay(_) => "Delay",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record of the event that caused a hook task to be queued.
///
/// Passed through to the hook invocation so the hook program can inspect
/// what happened in the cluster.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingContext {
    /// Name of the binding (or of the named event configuration).
    pub binding: String,
    /// Event verb: `add`, `update` or `delete`.
    pub resource_event: String,
    /// Namespace of the affected resource.
    pub resource_namespace: String,
    /// Kind of the affected resource.
    pub resource_kind: String,
    /// Name of the affected resource.
    pub resource_name: String,
}

/// A unit of serialized work.
///
/// Value-like: cloning is cheap enough for queue snapshots, and apart
/// from [`Task::increment_failure_count`] a task never changes once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    kind: TaskKind,
    name: String,
    binding: Option<Binding>,
    allow_failure: bool,
    failure_count: u32,
    binding_context: Vec<BindingContext>,
}

impl Task {
    /// Creates a task of the given kind targeting `name`.
    ///
    /// Use [`Task::delay`] for delay tasks; they have no target.
    pub fn new(kind: TaskKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            binding: None,
            allow_failure: false,
            failure_count: 0,
            binding_context: Vec::new(),
        }
    }

    /// Creates a delay task that blocks the pipeline for `delay`.
    pub fn delay(delay: Duration) -> Self {
        Self {
            kind: TaskKind::Delay(delay),
            name: String::new(),
            binding: None,
            allow_failure: false,
            failure_count: 0,
            binding_context: Vec::new(),
        }
    }

    /// Attaches the binding that caused this task.
    pub fn with_binding(mut self, binding: Binding) -> Self {
        self.binding = Some(binding);
        self
    }

    /// Marks a failing execution as acceptable: the task is dropped from
    /// the queue instead of retried. Honored for hook tasks only.
    pub fn with_allow_failure(mut self, allow: bool) -> Self {
        self.allow_failure = allow;
        self
    }

    /// Attaches the records describing the triggering event.
    pub fn with_binding_context(mut self, context: Vec<BindingContext>) -> Self {
        self.binding_context = context;
        self
    }

    /// Returns the task kind (with the delay payload for delay tasks).
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Returns the target name; empty for delay tasks.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the binding that caused this task, if any.
    pub fn binding(&self) -> Option<Binding> {
        self.binding
    }

    /// Returns whether a failing execution still pops the task.
    pub fn allow_failure(&self) -> bool {
        self.allow_failure
    }

    /// Returns how many attempts have failed so far.
    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    /// Returns the records describing the triggering event.
    pub fn binding_context(&self) -> &[BindingContext] {
        &self.binding_context
    }

    /// Records one more failed attempt.
    pub fn increment_failure_count(&mut self) {
        self.failure_count += 1;
    }

    /// One-line human-readable form used by the queue dump.
    pub fn describe(&self) -> String {
        if let TaskKind::Delay(d) = self.kind {
            return format!("{} delay={:?}", self.kind.as_str(), d);
        }
        let mut line = format!("{} name={}", self.kind.as_str(), self.name);
        if let Some(binding) = self.binding {
            line.push_str(&format!(" binding={binding}"));
        }
        if self.allow_failure {
            line.push_str(" allowFailure=true");
        }
        if self.failure_count > 0 {
            line.push_str(&format!(" failures={}", self.failure_count));
        }
        line
    }
}
