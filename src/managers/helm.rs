//! # Chart installer interface.
//!
//! The installer owns chart releases. The core only initializes it;
//! actual installs happen inside the module manager's reconcile.

use async_trait::async_trait;

use crate::error::ClusterError;

/// The chart-release collaborator.
#[async_trait]
pub trait ChartInstaller: Send + Sync {
    /// Prepares the installer in the operator's namespace (installs the
    /// in-cluster helper if it is missing). Called once during init.
    async fn init(&self, tiller_namespace: &str) -> Result<(), ClusterError>;
}
