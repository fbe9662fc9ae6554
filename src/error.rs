//! # Error types used by the operator core and its collaborators.
//!
//! Four enums, one per concern:
//!
//! - [`InitError`] — fatal startup failures; the process must not enter
//!   its run loop after one of these.
//! - [`ModuleError`] — failures of module reconciliation, deletion, and
//!   hook execution. These never propagate past the task runner: they
//!   feed the retry-with-delay policy.
//! - [`LookupError`] — a hook, module, or event configuration could not
//!   be resolved. Producers log these and skip the offending phase.
//! - [`ClusterError`] — cluster client failures (self-deployment update).
//!
//! Each type provides `as_label()` — a short stable snake_case name for
//! logs.

use thiserror::Error;

use crate::tasks::Binding;

/// Fatal initialization failures.
///
/// Raised only before the run loop starts; every variant ends the
/// process with a logged error and a non-zero exit.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum InitError {
    /// The current working directory could not be determined.
    #[error("cannot determine working dir")]
    WorkingDir(#[source] std::io::Error),

    /// A temporary directory could not be created.
    #[error("cannot create temporary dir")]
    TempDir(#[source] std::io::Error),

    /// The OS hostname (pod identity) could not be read.
    #[error("cannot read hostname")]
    Hostname(#[source] std::io::Error),

    /// The chart installer could not be initialized.
    #[error("chart installer init failed in namespace '{namespace}': {reason}")]
    Installer {
        /// Namespace the installer was pointed at.
        namespace: String,
        /// Installer-reported reason.
        reason: String,
    },

    /// The module manager could not be initialized.
    #[error("module manager init failed")]
    ModuleManager(#[source] ModuleError),

    /// The cluster client could not be initialized.
    #[error("cluster client init failed")]
    Cluster(#[source] ClusterError),
}

impl InitError {
    /// Returns a short stable label (snake_case) for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            InitError::WorkingDir(_) => "init_working_dir",
            InitError::TempDir(_) => "init_temp_dir",
            InitError::Hostname(_) => "init_hostname",
            InitError::Installer { .. } => "init_installer",
            InitError::ModuleManager(_) => "init_module_manager",
            InitError::Cluster(_) => "init_cluster",
        }
    }
}

/// Failures reported by the module manager.
///
/// The task runner converts all of these into retry-with-delay (or a
/// plain pop for allow-failure hook tasks); they carry detail for logs
/// only.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ModuleError {
    /// The module manager itself failed to start.
    #[error("module manager start failed: {reason}")]
    InitFailed {
        /// Manager-reported reason.
        reason: String,
    },

    /// Reconciling a module failed.
    #[error("module '{module}' run failed: {reason}")]
    RunFailed {
        /// The module being reconciled.
        module: String,
        /// Manager-reported reason.
        reason: String,
    },

    /// Deleting a module failed.
    #[error("module '{module}' delete failed: {reason}")]
    DeleteFailed {
        /// The module being deleted.
        module: String,
        /// Manager-reported reason.
        reason: String,
    },

    /// Executing a hook failed.
    #[error("hook '{hook}' failed: {reason}")]
    HookFailed {
        /// The failing hook.
        hook: String,
        /// Manager-reported reason.
        reason: String,
    },
}

impl ModuleError {
    /// Returns a short stable label (snake_case) for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ModuleError::InitFailed { .. } => "module_manager_init_failed",
            ModuleError::RunFailed { .. } => "module_run_failed",
            ModuleError::DeleteFailed { .. } => "module_delete_failed",
            ModuleError::HookFailed { .. } => "hook_failed",
        }
    }
}

/// A name did not resolve to a known hook, module, or event config.
///
/// Producer-side only: the offending descriptor or phase is logged and
/// skipped, composition continues.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LookupError {
    /// No global hook registered under this name.
    #[error("global hook '{name}' is not registered")]
    GlobalHookNotFound {
        /// The unresolved hook name.
        name: String,
    },

    /// No module hook registered under this name.
    #[error("module hook '{name}' is not registered")]
    ModuleHookNotFound {
        /// The unresolved hook name.
        name: String,
    },

    /// No module registered under this name.
    #[error("module '{module}' is not registered")]
    ModuleNotFound {
        /// The unresolved module name.
        module: String,
    },

    /// The hook list for a binding could not be produced.
    #[error("cannot list hooks for binding '{binding}': {reason}")]
    HooksUnavailable {
        /// The binding whose hook list was requested.
        binding: Binding,
        /// Manager-reported reason.
        reason: String,
    },

    /// A cluster event arrived with a config id nobody registered.
    #[error("no hook subscription registered for config id '{config_id}'")]
    UnknownEventConfig {
        /// The unresolved subscription id.
        config_id: String,
    },
}

impl LookupError {
    /// Returns a short stable label (snake_case) for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            LookupError::GlobalHookNotFound { .. } => "global_hook_not_found",
            LookupError::ModuleHookNotFound { .. } => "module_hook_not_found",
            LookupError::ModuleNotFound { .. } => "module_not_found",
            LookupError::HooksUnavailable { .. } => "hooks_unavailable",
            LookupError::UnknownEventConfig { .. } => "unknown_event_config",
        }
    }
}

/// Failures reported by the cluster client.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ClusterError {
    /// The cluster API could not be reached.
    #[error("cluster connection failed: {reason}")]
    Connect {
        /// Client-reported reason.
        reason: String,
    },

    /// The operator's own deployment could not be updated to a new image.
    #[error("deployment update to image '{image}' failed: {reason}")]
    DeploymentUpdate {
        /// The image the deployment was being moved to.
        image: String,
        /// Client-reported reason.
        reason: String,
    },

    /// An event subscription could not be started or stopped.
    #[error("event subscription '{config_id}' failed: {reason}")]
    EventSubscription {
        /// Subscription id (empty when starting a new one failed).
        config_id: String,
        /// Client-reported reason.
        reason: String,
    },
}

impl ClusterError {
    /// Returns a short stable label (snake_case) for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ClusterError::Connect { .. } => "cluster_connect_failed",
            ClusterError::DeploymentUpdate { .. } => "deployment_update_failed",
            ClusterError::EventSubscription { .. } => "event_subscription_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        let err = ModuleError::RunFailed {
            module: "ingress".to_string(),
            reason: "helm exited 1".to_string(),
        };
        assert_eq!(err.as_label(), "module_run_failed");
        assert_eq!(err.to_string(), "module 'ingress' run failed: helm exited 1");

        let err = LookupError::HooksUnavailable {
            binding: Binding::BeforeAll,
            reason: "config not loaded".to_string(),
        };
        assert_eq!(err.as_label(), "hooks_unavailable");
        assert!(err.to_string().contains("beforeAll"));
    }

    #[test]
    fn init_errors_carry_sources() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = InitError::WorkingDir(io);
        assert_eq!(err.as_label(), "init_working_dir");
        assert!(std::error::Error::source(&err).is_some());
    }
}
