//! # Cluster event-watch interface.
//!
//! The events manager runs informers against the cluster API. The core
//! subscribes hook bindings to it through the
//! [`KubeEventsController`](crate::hooks::KubeEventsController) and
//! receives [`KubeEvent`]s on a channel; each event names the
//! subscription (`config_id`) that produced it.

use async_trait::async_trait;

use crate::error::ClusterError;
use crate::managers::module::KubeEventEntry;

/// One batch of resource events from a single subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KubeEvent {
    /// Id of the subscription that fired, as returned by
    /// [`KubeEventsManager::subscribe`].
    pub config_id: String,
    /// Event verbs observed, in order (`add`, `update`, `delete`).
    pub events: Vec<String>,
    /// Namespace of the affected resource.
    pub namespace: String,
    /// Kind of the affected resource.
    pub kind: String,
    /// Name of the affected resource.
    pub name: String,
}

/// The informer-owning collaborator.
#[async_trait]
pub trait KubeEventsManager: Send + Sync {
    /// Starts an informer for one kube-event binding in one namespace
    /// (`None` = all namespaces). Returns the subscription id that
    /// future [`KubeEvent`]s will carry.
    async fn subscribe(
        &self,
        entry: &KubeEventEntry,
        namespace: Option<&str>,
    ) -> Result<String, ClusterError>;

    /// Stops the informer behind `config_id`.
    async fn unsubscribe(&self, config_id: &str) -> Result<(), ClusterError>;
}
