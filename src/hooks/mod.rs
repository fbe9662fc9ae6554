//! Event-driven hook wiring.
//!
//! - [`schedule`] — schedule id → hooks lookup table
//! - [`kube_event`] — informer subscriptions for `kubeEvents` hooks

pub mod kube_event;
pub mod schedule;

pub use kube_event::{KubeEventHook, KubeEventsController};
pub use schedule::{ScheduleHook, ScheduleHookRegistry};
