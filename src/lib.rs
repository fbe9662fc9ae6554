//! # modvisor
//!
//! **Modvisor** is a cluster-resident operator core that keeps a set of
//! declarative extensions ("modules" — a packaged chart plus executable
//! hooks) reconciled against a live cluster.
//!
//! Heterogeneous manager signals (image pushes, config/values changes,
//! node events, schedule ticks, resource events) are fanned into one
//! serialized task pipeline that drives module installation, upgrade,
//! deletion, and hook invocation.
//!
//! | Area                | Description                                                   | Key types / traits                          |
//! |---------------------|---------------------------------------------------------------|---------------------------------------------|
//! | **Pipeline**        | FIFO work queue with head-push retries and gated watchers.    | [`TaskQueue`], [`Task`], [`QueueWatcher`]   |
//! | **Operator**        | Process identity, startup composition, actor wiring.          | [`Operator`], [`Collaborators`]             |
//! | **Hook wiring**     | Schedule-id and cluster-event lookup tables for hooks.        | [`ScheduleHookRegistry`], [`KubeEventsController`] |
//! | **Collaborators**   | Interfaces the external managers must honor.                  | [`ModuleManager`], [`KubeClient`], [`ChartInstaller`], [`KubeEventsManager`] |
//! | **Values**          | Chart-values layering helpers.                                | [`merge_values`]                            |
//! | **Errors**          | Typed errors per concern, with stable log labels.             | [`InitError`], [`ModuleError`], [`LookupError`], [`ClusterError`] |
//!
//! ## Wiring
//!
//! The embedding process constructs the collaborators, creates one mpsc
//! channel per signal source, and hands the operator the receiving
//! halves:
//!
//! ```text
//! let operator = Operator::init(Config::default(), collaborators).await?;
//! operator.run(ManagerChannels { image_updated, module_events,
//!     node_changed, schedule_events, kube_events }).await?;   // blocks until SIGTERM
//! ```
//!
//! `run` returns for a clean signal-driven shutdown (exit 0). A
//! successful self-deployment update instead exits the process non-zero
//! so the surrounding orchestrator restarts it on the new image.
//!
//! ## Pipeline semantics
//!
//! - Exactly one task is in flight at any moment.
//! - A failing task is retried in place: a delay task is pushed ahead of
//!   it, and after the delay the same task runs again. Later tasks never
//!   overtake a failing one.
//! - Hook tasks may opt out with `allow_failure`; module reconcile and
//!   delete tasks always retry until they succeed.

mod config;
mod core;
mod error;

pub mod hooks;
pub mod managers;
pub mod tasks;
pub mod values;

// ---- Public re-exports ----

pub use config::Config;
pub use crate::core::{Collaborators, ManagerChannels, Operator};
pub use error::{ClusterError, InitError, LookupError, ModuleError};
pub use hooks::{KubeEventsController, ScheduleHook, ScheduleHookRegistry};
pub use managers::{
    ChangeType, ChartInstaller, HookInfo, ImageId, KubeClient, KubeEvent, KubeEventEntry,
    KubeEventsManager, ModuleChange, ModuleEvent, ModuleManager, NodeChange, ScheduleEntry,
    ScheduleId,
};
pub use tasks::{Binding, BindingContext, QueueDumper, QueueWatcher, Task, TaskKind, TaskQueue};
pub use values::merge_values;
