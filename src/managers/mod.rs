//! Collaborator interfaces.
//!
//! The core treats every manager as an opaque collaborator behind a
//! small trait or a channel payload type:
//!
//! - [`module`] — module/values manager: orderings, hook metadata,
//!   run/delete/hook execution, change events
//! - [`kube`] — cluster client (self-deployment update)
//! - [`helm`] — chart installer
//! - [`events`] — cluster event watch (informer subscriptions)
//! - [`registry`] — container-registry watcher (new image ids)
//! - [`node`] — node watcher (node-set-changed marker)
//! - [`schedule`] — schedule dispatcher (schedule ids)
//!
//! Call-based collaborators are trait objects owned by the operator;
//! signal-based ones hand the operator the receiving half of an mpsc
//! channel and are driven by the embedding process.

pub mod events;
pub mod helm;
pub mod kube;
pub mod module;
pub mod node;
pub mod registry;
pub mod schedule;

pub use events::{KubeEvent, KubeEventsManager};
pub use helm::ChartInstaller;
pub use kube::KubeClient;
pub use module::{
    ChangeType, HookInfo, KubeEventEntry, ModuleChange, ModuleEvent, ModuleManager,
    NamespaceSelector, ScheduleEntry,
};
pub use node::NodeChange;
pub use registry::ImageId;
pub use schedule::ScheduleId;
