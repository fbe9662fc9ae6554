//! # Module manager interface.
//!
//! The module manager is the collaborator that owns module configs,
//! merged values, and hook execution. The core never looks inside it:
//! it queries hook/module orderings when composing tasks, asks it to run
//! or delete things when dispatching, and listens to its event channel
//! for module/values changes.
//!
//! Hook metadata ([`HookInfo`]) is exposed so the schedule registry and
//! the kube-event hooks controller can be (re)built from the manager
//! alone.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{LookupError, ModuleError};
use crate::tasks::{Binding, BindingContext};

/// How a module's state changed in the last config/values sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeType {
    /// The module became enabled and must be reconciled.
    Enabled,
    /// The module's config or values changed; reconcile again.
    Changed,
    /// The module became disabled and must be deleted.
    Disabled,
}

/// One module's change record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleChange {
    /// The affected module.
    pub name: String,
    /// What happened to it.
    pub change: ChangeType,
}

/// Event published by the module manager on its channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModuleEvent {
    /// Individual modules changed state; one record per module, in the
    /// order the manager discovered them.
    ModulesChanged(Vec<ModuleChange>),
    /// Global values changed; every module must be reloaded.
    GlobalChanged,
}

/// One schedule binding of a hook.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    /// Crontab-style schedule token; doubles as the schedule id the
    /// dispatcher fires.
    pub crontab: String,
    /// Whether a failing run of this hook may be dropped instead of
    /// retried.
    #[serde(default)]
    pub allow_failure: bool,
}

/// Which namespaces a kube-event binding watches.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceSelector {
    /// Watch all namespaces.
    #[serde(default)]
    pub any: bool,
    /// Watch exactly these namespaces (ignored when `any` is set).
    #[serde(default)]
    pub match_names: Vec<String>,
}

/// One kube-event binding of a hook.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubeEventEntry {
    /// Optional name for this binding, reported back to the hook in its
    /// invocation context.
    #[serde(default)]
    pub name: Option<String>,
    /// Event verbs to watch: `add`, `update`, `delete`.
    #[serde(default)]
    pub event_types: Vec<String>,
    /// Resource kind to watch.
    pub kind: String,
    /// Namespaces to watch.
    #[serde(default)]
    pub namespace_selector: NamespaceSelector,
    /// Optional label selector.
    #[serde(default)]
    pub selector: Option<String>,
    /// Optional jq filter applied to the watched object.
    #[serde(default)]
    pub jq_filter: Option<String>,
    /// Whether a failing run of this hook may be dropped instead of
    /// retried.
    #[serde(default)]
    pub allow_failure: bool,
}

/// Hook metadata exposed by the module manager.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HookInfo {
    /// The hook's registered name.
    pub name: String,
    /// Schedule bindings declared by the hook.
    pub schedules: Vec<ScheduleEntry>,
    /// Kube-event bindings declared by the hook.
    pub kube_events: Vec<KubeEventEntry>,
}

/// The module/values collaborator.
///
/// Lookup methods are synchronous in-memory queries; run/delete/hook
/// methods do real work (chart installs, hook processes) and are async.
#[async_trait]
pub trait ModuleManager: Send + Sync {
    /// Loads configs and values from `work_dir`, using `temp_dir` for
    /// scratch files. Must be called once before anything else.
    async fn init(&self, work_dir: &Path, temp_dir: &Path) -> Result<(), ModuleError>;

    /// Runs the manager's own config/values watchers until they stop.
    async fn run(&self);

    /// Global hook names bound to `binding`, in declaration order.
    fn global_hooks_in_order(&self, binding: Binding) -> Result<Vec<String>, LookupError>;

    /// `module`'s hook names bound to `binding`, in declaration order.
    fn module_hooks_in_order(
        &self,
        module: &str,
        binding: Binding,
    ) -> Result<Vec<String>, LookupError>;

    /// All module names, in declared order.
    fn module_names_in_order(&self) -> Vec<String>;

    /// Resolves a global hook by name.
    fn global_hook(&self, name: &str) -> Result<HookInfo, LookupError>;

    /// Resolves a module hook by name.
    fn module_hook(&self, name: &str) -> Result<HookInfo, LookupError>;

    /// Reconciles one module: merged values, chart install/upgrade, and
    /// the module's own hooks.
    async fn run_module(&self, name: &str) -> Result<(), ModuleError>;

    /// Deletes one module from the cluster.
    async fn delete_module(&self, name: &str) -> Result<(), ModuleError>;

    /// Runs one module hook with the given invocation context.
    async fn run_module_hook(
        &self,
        name: &str,
        binding: Option<Binding>,
        context: &[BindingContext],
    ) -> Result<(), ModuleError>;

    /// Runs one global hook with the given invocation context.
    async fn run_global_hook(
        &self,
        name: &str,
        binding: Option<Binding>,
        context: &[BindingContext],
    ) -> Result<(), ModuleError>;
}
