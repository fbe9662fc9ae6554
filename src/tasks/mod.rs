//! Task model and the serialized work queue.
//!
//! - [`task`] — work-item envelope: kinds, bindings, failure counters
//! - [`queue`] — synchronized FIFO with head-push and gated notification
//! - [`dump`] — diagnostic queue dump watcher
//! - [`binding`] — symbolic hook triggers

pub mod binding;
pub mod dump;
pub mod queue;
pub mod task;

pub use binding::Binding;
pub use dump::QueueDumper;
pub use queue::{QueueWatcher, TaskQueue};
pub use task::{BindingContext, Task, TaskKind};
