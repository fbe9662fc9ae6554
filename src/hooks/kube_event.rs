//! # Kube-event hooks controller.
//!
//! Bridges hook declarations to the cluster event watch. For every hook
//! bound to `kubeEvents` the controller starts one informer subscription
//! per watched namespace, remembers which hook is behind each
//! subscription id, and turns incoming [`KubeEvent`]s back into hook
//! tasks for the queue.
//!
//! Global hooks are enabled once at startup; module hooks follow the
//! module's enabled state (enabled on `Enabled`, dropped on `Disabled`).

use std::collections::HashMap;

use tracing::{debug, error};

use crate::error::{ClusterError, LookupError};
use crate::managers::events::{KubeEvent, KubeEventsManager};
use crate::managers::module::{KubeEventEntry, ModuleManager};
use crate::tasks::{Binding, BindingContext, Task, TaskKind};

/// What the controller remembers about one informer subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KubeEventHook {
    /// The hook to run when this subscription fires.
    pub hook_name: String,
    /// Optional binding name from the hook's config, reported to the
    /// hook in its invocation context instead of the generic binding.
    pub binding_name: Option<String>,
    /// Whether a failing run may be dropped instead of retried.
    pub allow_failure: bool,
}

impl KubeEventHook {
    fn from_entry(hook_name: &str, entry: &KubeEventEntry) -> Self {
        Self {
            hook_name: hook_name.to_string(),
            binding_name: entry.name.clone(),
            allow_failure: entry.allow_failure,
        }
    }
}

/// Owns the `subscription id → hook` maps for global and module hooks.
pub struct KubeEventsController {
    global_hooks: HashMap<String, KubeEventHook>,
    module_hooks: HashMap<String, KubeEventHook>,
    enabled_modules: Vec<String>,
}

impl KubeEventsController {
    /// Creates a controller with no subscriptions.
    pub fn new() -> Self {
        Self {
            global_hooks: HashMap::new(),
            module_hooks: HashMap::new(),
            enabled_modules: Vec::new(),
        }
    }

    /// Starts informers for every global hook bound to `kubeEvents`.
    ///
    /// Hooks that fail to resolve are logged and skipped; a subscription
    /// failure aborts (the caller decides whether to continue degraded).
    pub async fn enable_global_hooks(
        &mut self,
        modules: &dyn ModuleManager,
        events: &dyn KubeEventsManager,
    ) -> Result<(), ClusterError> {
        let names = match modules.global_hooks_in_order(Binding::KubeEvents) {
            Ok(names) => names,
            Err(err) => {
                error!(label = err.as_label(), %err, "cannot list global kube-event hooks");
                return Ok(());
            }
        };

        for name in names {
            let info = match modules.global_hook(&name) {
                Ok(info) => info,
                Err(err) => {
                    error!(hook = %name, label = err.as_label(), %err,
                        "cannot resolve global kube-event hook");
                    continue;
                }
            };
            for entry in &info.kube_events {
                for namespace in Self::namespaces(entry) {
                    let config_id = events.subscribe(entry, namespace.as_deref()).await?;
                    debug!(hook = %name, config_id = %config_id, "informer started for global hook");
                    self.global_hooks
                        .insert(config_id, KubeEventHook::from_entry(&name, entry));
                }
            }
        }
        Ok(())
    }

    /// Starts informers for `module`'s hooks bound to `kubeEvents`.
    ///
    /// Idempotent: a module that is already enabled is left alone.
    pub async fn enable_module_hooks(
        &mut self,
        module: &str,
        modules: &dyn ModuleManager,
        events: &dyn KubeEventsManager,
    ) -> Result<(), ClusterError> {
        if self.enabled_modules.iter().any(|m| m == module) {
            return Ok(());
        }

        let names = match modules.module_hooks_in_order(module, Binding::KubeEvents) {
            Ok(names) => names,
            Err(err) => {
                error!(module, label = err.as_label(), %err,
                    "cannot list module kube-event hooks");
                return Ok(());
            }
        };

        for name in names {
            let info = match modules.module_hook(&name) {
                Ok(info) => info,
                Err(err) => {
                    error!(module, hook = %name, label = err.as_label(), %err,
                        "cannot resolve module kube-event hook");
                    continue;
                }
            };
            for entry in &info.kube_events {
                for namespace in Self::namespaces(entry) {
                    let config_id = events.subscribe(entry, namespace.as_deref()).await?;
                    debug!(module, hook = %name, config_id = %config_id, "informer started for module hook");
                    self.module_hooks
                        .insert(config_id, KubeEventHook::from_entry(&name, entry));
                }
            }
        }

        self.enabled_modules.push(module.to_string());
        Ok(())
    }

    /// Stops the informers behind `module`'s hooks.
    pub async fn disable_module_hooks(
        &mut self,
        module: &str,
        modules: &dyn ModuleManager,
        events: &dyn KubeEventsManager,
    ) -> Result<(), ClusterError> {
        let Some(position) = self.enabled_modules.iter().position(|m| m == module) else {
            return Ok(());
        };
        self.enabled_modules.remove(position);

        let names = match modules.module_hooks_in_order(module, Binding::KubeEvents) {
            Ok(names) => names,
            Err(err) => {
                error!(module, label = err.as_label(), %err,
                    "cannot list module kube-event hooks for disable");
                return Ok(());
            }
        };

        let stale: Vec<String> = self
            .module_hooks
            .iter()
            .filter(|(_, hook)| names.iter().any(|n| *n == hook.hook_name))
            .map(|(config_id, _)| config_id.clone())
            .collect();

        for config_id in stale {
            events.unsubscribe(&config_id).await?;
            self.module_hooks.remove(&config_id);
            debug!(module, config_id = %config_id, "informer stopped");
        }
        Ok(())
    }

    /// Translates one cluster event into the hook task it triggers.
    ///
    /// Module subscriptions are checked before global ones; an id nobody
    /// registered is a lookup error the fan-in logs and drops.
    pub fn handle_event(&self, event: &KubeEvent) -> Result<Vec<Task>, LookupError> {
        let (hook, kind) = if let Some(hook) = self.module_hooks.get(&event.config_id) {
            (hook, TaskKind::ModuleHookRun)
        } else if let Some(hook) = self.global_hooks.get(&event.config_id) {
            (hook, TaskKind::GlobalHookRun)
        } else {
            return Err(LookupError::UnknownEventConfig {
                config_id: event.config_id.clone(),
            });
        };

        let binding_name = hook
            .binding_name
            .clone()
            .unwrap_or_else(|| Binding::KubeEvents.as_str().to_string());

        let context: Vec<BindingContext> = event
            .events
            .iter()
            .map(|verb| BindingContext {
                binding: binding_name.clone(),
                resource_event: verb.clone(),
                resource_namespace: event.namespace.clone(),
                resource_kind: event.kind.clone(),
                resource_name: event.name.clone(),
            })
            .collect();

        Ok(vec![
            Task::new(kind, &hook.hook_name)
                .with_binding(Binding::KubeEvents)
                .with_allow_failure(hook.allow_failure)
                .with_binding_context(context),
        ])
    }

    fn namespaces(entry: &KubeEventEntry) -> Vec<Option<String>> {
        if entry.namespace_selector.any {
            vec![None]
        } else {
            entry
                .namespace_selector
                .match_names
                .iter()
                .cloned()
                .map(Some)
                .collect()
        }
    }
}

impl Default for KubeEventsController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::managers::module::testing::FakeModuleManager;
    use crate::managers::module::{HookInfo, NamespaceSelector};

    /// Hands out sequential subscription ids and logs calls.
    #[derive(Default)]
    struct FakeEventsManager {
        next_id: AtomicUsize,
        subscribed: Mutex<Vec<String>>,
        unsubscribed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl KubeEventsManager for FakeEventsManager {
        async fn subscribe(
            &self,
            entry: &KubeEventEntry,
            namespace: Option<&str>,
        ) -> Result<String, ClusterError> {
            let id = format!("cfg-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
            self.subscribed
                .lock()
                .unwrap()
                .push(format!("{}/{}", entry.kind, namespace.unwrap_or("*")));
            Ok(id)
        }

        async fn unsubscribe(&self, config_id: &str) -> Result<(), ClusterError> {
            self.unsubscribed.lock().unwrap().push(config_id.to_string());
            Ok(())
        }
    }

    fn pod_watch_info(hook: &str, allow_failure: bool) -> HookInfo {
        HookInfo {
            name: hook.to_string(),
            schedules: Vec::new(),
            kube_events: vec![KubeEventEntry {
                name: None,
                event_types: vec!["add".to_string()],
                kind: "Pod".to_string(),
                namespace_selector: NamespaceSelector {
                    any: true,
                    match_names: Vec::new(),
                },
                selector: None,
                jq_filter: None,
                allow_failure,
            }],
        }
    }

    fn pod_event(config_id: &str) -> KubeEvent {
        KubeEvent {
            config_id: config_id.to_string(),
            events: vec!["add".to_string(), "update".to_string()],
            namespace: "kube-system".to_string(),
            kind: "Pod".to_string(),
            name: "coredns-0".to_string(),
        }
    }

    #[tokio::test]
    async fn global_event_becomes_global_hook_task_with_context() {
        let manager = FakeModuleManager::new()
            .with_global_hooks(Binding::KubeEvents, &["on-pod"])
            .with_global_hook_info(pod_watch_info("on-pod", true));
        let events = FakeEventsManager::default();

        let mut controller = KubeEventsController::new();
        controller
            .enable_global_hooks(&manager, &events)
            .await
            .unwrap();

        let tasks = controller.handle_event(&pod_event("cfg-0")).unwrap();
        assert_eq!(tasks.len(), 1);
        let task = &tasks[0];
        assert_eq!(task.kind(), TaskKind::GlobalHookRun);
        assert_eq!(task.name(), "on-pod");
        assert_eq!(task.binding(), Some(Binding::KubeEvents));
        assert!(task.allow_failure());
        assert_eq!(task.binding_context().len(), 2);
        assert_eq!(task.binding_context()[0].binding, "kubeEvents");
        assert_eq!(task.binding_context()[0].resource_event, "add");
        assert_eq!(task.binding_context()[1].resource_event, "update");
        assert_eq!(task.binding_context()[0].resource_name, "coredns-0");
    }

    #[tokio::test]
    async fn module_subscriptions_shadow_global_ones() {
        let manager = FakeModuleManager::new()
            .with_module_hooks("ingress", Binding::KubeEvents, &["ingress/on-pod"])
            .with_module_hook_info(pod_watch_info("ingress/on-pod", false));
        let events = FakeEventsManager::default();

        let mut controller = KubeEventsController::new();
        controller
            .enable_module_hooks("ingress", &manager, &events)
            .await
            .unwrap();

        let tasks = controller.handle_event(&pod_event("cfg-0")).unwrap();
        assert_eq!(tasks[0].kind(), TaskKind::ModuleHookRun);
        assert_eq!(tasks[0].name(), "ingress/on-pod");
    }

    #[tokio::test]
    async fn enable_module_hooks_is_idempotent() {
        let manager = FakeModuleManager::new()
            .with_module_hooks("ingress", Binding::KubeEvents, &["ingress/on-pod"])
            .with_module_hook_info(pod_watch_info("ingress/on-pod", false));
        let events = FakeEventsManager::default();

        let mut controller = KubeEventsController::new();
        controller
            .enable_module_hooks("ingress", &manager, &events)
            .await
            .unwrap();
        controller
            .enable_module_hooks("ingress", &manager, &events)
            .await
            .unwrap();

        assert_eq!(events.subscribed.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn disable_module_hooks_unsubscribes_and_forgets() {
        let manager = FakeModuleManager::new()
            .with_module_hooks("ingress", Binding::KubeEvents, &["ingress/on-pod"])
            .with_module_hook_info(pod_watch_info("ingress/on-pod", false));
        let events = FakeEventsManager::default();

        let mut controller = KubeEventsController::new();
        controller
            .enable_module_hooks("ingress", &manager, &events)
            .await
            .unwrap();
        controller
            .disable_module_hooks("ingress", &manager, &events)
            .await
            .unwrap();

        assert_eq!(events.unsubscribed.lock().unwrap().as_slice(), ["cfg-0"]);
        assert!(matches!(
            controller.handle_event(&pod_event("cfg-0")),
            Err(LookupError::UnknownEventConfig { .. })
        ));

        // Disabled module can be enabled again.
        controller
            .enable_module_hooks("ingress", &manager, &events)
            .await
            .unwrap();
        assert_eq!(events.subscribed.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn named_namespaces_get_one_subscription_each() {
        let mut info = pod_watch_info("on-pod", false);
        info.kube_events[0].namespace_selector = NamespaceSelector {
            any: false,
            match_names: vec!["default".to_string(), "kube-system".to_string()],
        };
        let manager = FakeModuleManager::new()
            .with_global_hooks(Binding::KubeEvents, &["on-pod"])
            .with_global_hook_info(info);
        let events = FakeEventsManager::default();

        let mut controller = KubeEventsController::new();
        controller
            .enable_global_hooks(&manager, &events)
            .await
            .unwrap();

        assert_eq!(
            events.subscribed.lock().unwrap().as_slice(),
            ["Pod/default", "Pod/kube-system"]
        );
    }

    #[test]
    fn unknown_config_id_is_a_lookup_error() {
        let controller = KubeEventsController::new();
        let err = controller.handle_event(&pod_event("cfg-42")).unwrap_err();
        assert_eq!(err.as_label(), "unknown_event_config");
    }
}
