//! # Cluster client interface.
//!
//! The only things the core ever asks of the cluster directly: connect
//! at startup, and move the operator's own deployment to a new image
//! when the registry watcher reports one.

use async_trait::async_trait;

use crate::error::ClusterError;

/// Minimal cluster-API surface used by the core.
#[async_trait]
pub trait KubeClient: Send + Sync {
    /// Establishes the cluster connection. Called once during init.
    async fn init(&self) -> Result<(), ClusterError>;

    /// Rolls the operator's own deployment to `image`.
    ///
    /// On success the process restarts itself (the surrounding
    /// orchestrator brings it back up on the new image), so callers
    /// should not expect to continue after a successful update.
    async fn update_deployment(&self, image: &str) -> Result<(), ClusterError>;
}
