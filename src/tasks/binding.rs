//! # Hook binding types.
//!
//! A [`Binding`] names the trigger that caused a hook task to be queued.
//! The binding is passed down to the module manager when the hook runs,
//! so the hook program can tell a startup invocation from a schedule tick
//! or a cluster event.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Symbolic cause of a queued hook task.
///
/// The wire form (and the form hooks receive in their invocation context)
/// is the camel-case name, e.g. `onStartup` or `kubeEvents`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Binding {
    /// First run of the operator process.
    OnStartup,
    /// Global hooks executed before any module is reconciled.
    BeforeAll,
    /// Global hooks executed after every module is reconciled.
    AfterAll,
    /// Node set changed in the cluster.
    OnKubeNodeChange,
    /// Schedule tick from the schedule dispatcher.
    Schedule,
    /// Resource event from the cluster watch.
    KubeEvents,
}

impl Binding {
    /// Returns the stable camel-case name used in hook invocation contexts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Binding::OnStartup => "onStartup",
            Binding::BeforeAll => "beforeAll",
            Binding::AfterAll => "afterAll",
            Binding::OnKubeNodeChange => "onKubeNodeChange",
            Binding::Schedule => "schedule",
            Binding::KubeEvents => "kubeEvents",
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
