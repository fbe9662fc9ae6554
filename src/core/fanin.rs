//! # Manager-events fan-in.
//!
//! One loop multiplexes every manager channel and translates each signal
//! into queued tasks. It is the only producer of non-delay tasks, and it
//! never pops: the queue's single-consumer contract belongs to the
//! runner.
//!
//! Signal → task translation:
//!
//! | Signal | Reaction |
//! |--------|----------|
//! | new image id | update own deployment; on success exit for restart |
//! | modules changed | `ModuleRun` / `ModuleDelete` per change, registry rebuild |
//! | global values changed | gated reload-all sequence |
//! | node set changed | gated `GlobalHookRun(onKubeNodeChange)` per hook |
//! | schedule fired | registry lookup, global-first resolution per hook |
//! | cluster event | controller lookup, hook task with binding context |

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::core::compose;
use crate::hooks::kube_event::KubeEventsController;
use crate::hooks::schedule::ScheduleHookRegistry;
use crate::managers::events::{KubeEvent, KubeEventsManager};
use crate::managers::kube::KubeClient;
use crate::managers::module::{ChangeType, ModuleEvent, ModuleManager};
use crate::managers::node::NodeChange;
use crate::managers::registry::ImageId;
use crate::managers::schedule::ScheduleId;
use crate::tasks::{Binding, Task, TaskKind, TaskQueue};

/// Receiving halves of every manager channel.
///
/// The embedding process creates the channels, hands the senders to the
/// managers it runs, and passes this bundle to
/// [`Operator::run`](crate::Operator::run).
pub struct ManagerChannels {
    /// New operator images from the registry watcher.
    pub image_updated: mpsc::Receiver<ImageId>,
    /// Module/values change events from the module manager.
    pub module_events: mpsc::Receiver<ModuleEvent>,
    /// Node-set-changed signals from the node watcher.
    pub node_changed: mpsc::Receiver<NodeChange>,
    /// Schedule ids from the schedule dispatcher.
    pub schedule_events: mpsc::Receiver<ScheduleId>,
    /// Resource events from the cluster watch.
    pub kube_events: mpsc::Receiver<KubeEvent>,
}

/// The fan-in actor.
pub(crate) struct EventsFanIn {
    queue: Arc<TaskQueue>,
    modules: Arc<dyn ModuleManager>,
    cluster: Arc<dyn KubeClient>,
    events_manager: Arc<dyn KubeEventsManager>,
    schedule_hooks: Arc<ScheduleHookRegistry>,
    kube_hooks: KubeEventsController,
}

impl EventsFanIn {
    pub(crate) fn new(
        queue: Arc<TaskQueue>,
        modules: Arc<dyn ModuleManager>,
        cluster: Arc<dyn KubeClient>,
        events_manager: Arc<dyn KubeEventsManager>,
        schedule_hooks: Arc<ScheduleHookRegistry>,
        kube_hooks: KubeEventsController,
    ) -> Self {
        Self {
            queue,
            modules,
            cluster,
            events_manager,
            schedule_hooks,
            kube_hooks,
        }
    }

    /// Multiplexes the manager channels until cancellation (or until
    /// every channel closed).
    pub(crate) async fn run(mut self, mut channels: ManagerChannels, token: CancellationToken) {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                Some(image) = channels.image_updated.recv() => {
                    if self.on_image_updated(&image).await {
                        info!(image = %image, "deployment image updated, exiting for restart");
                        std::process::exit(1);
                    }
                }
                Some(event) = channels.module_events.recv() => {
                    self.on_module_event(event).await;
                }
                Some(NodeChange) = channels.node_changed.recv() => {
                    self.on_node_change();
                }
                Some(schedule_id) = channels.schedule_events.recv() => {
                    self.on_schedule_event(&schedule_id);
                }
                Some(event) = channels.kube_events.recv() => {
                    self.on_kube_event(&event);
                }
                else => break,
            }
        }
    }

    /// Rolls the operator's own deployment to `image`. Returns whether
    /// the process should exit for restart.
    async fn on_image_updated(&self, image: &str) -> bool {
        match self.cluster.update_deployment(image).await {
            Ok(()) => true,
            Err(err) => {
                error!(image, label = err.as_label(), %err, "deployment update failed");
                false
            }
        }
    }

    async fn on_module_event(&mut self, event: ModuleEvent) {
        match event {
            ModuleEvent::ModulesChanged(changes) => {
                debug!(changes = changes.len(), "modules changed");
                // The module set changed, so schedule lookups must be
                // rebuilt before any of the new tasks run.
                self.schedule_hooks.rebuild(self.modules.as_ref());
                for change in changes {
                    match change.change {
                        ChangeType::Enabled | ChangeType::Changed => {
                            if let Err(err) = self
                                .kube_hooks
                                .enable_module_hooks(
                                    &change.name,
                                    self.modules.as_ref(),
                                    self.events_manager.as_ref(),
                                )
                                .await
                            {
                                error!(module = %change.name, label = err.as_label(), %err,
                                    "cannot enable module kube-event hooks");
                            }
                            self.queue.add(Task::new(TaskKind::ModuleRun, &change.name));
                        }
                        ChangeType::Disabled => {
                            if let Err(err) = self
                                .kube_hooks
                                .disable_module_hooks(
                                    &change.name,
                                    self.modules.as_ref(),
                                    self.events_manager.as_ref(),
                                )
                                .await
                            {
                                error!(module = %change.name, label = err.as_label(), %err,
                                    "cannot disable module kube-event hooks");
                            }
                            self.queue
                                .add(Task::new(TaskKind::ModuleDelete, &change.name));
                        }
                    }
                }
            }
            ModuleEvent::GlobalChanged => {
                debug!("global values changed, reloading all modules");
                self.queue.changes_disable();
                compose::create_reload_all_tasks(&self.queue, self.modules.as_ref());
                self.queue.changes_enable(true);
            }
        }
    }

    fn on_node_change(&self) {
        self.queue.changes_disable();
        match self.modules.global_hooks_in_order(Binding::OnKubeNodeChange) {
            Ok(hooks) => {
                for hook in hooks {
                    self.queue.add(
                        Task::new(TaskKind::GlobalHookRun, &hook)
                            .with_binding(Binding::OnKubeNodeChange),
                    );
                    debug!(hook = %hook, "node change: queued global hook");
                }
            }
            Err(err) => {
                error!(label = err.as_label(), %err, "node change tasks: cannot get global hooks");
            }
        }
        self.queue.changes_enable(true);
    }

    /// Resolves the hooks registered for a schedule id. Per descriptor
    /// the name is tried as a global hook first, then as a module hook;
    /// the first resolution wins.
    fn on_schedule_event(&self, schedule_id: &str) {
        for hook in self.schedule_hooks.get(schedule_id) {
            if self.modules.global_hook(&hook.name).is_ok() {
                self.queue.add(
                    Task::new(TaskKind::GlobalHookRun, &hook.name)
                        .with_binding(Binding::Schedule)
                        .with_allow_failure(hook.allow_failure),
                );
                debug!(schedule_id, hook = %hook.name, "schedule: queued global hook");
            } else if self.modules.module_hook(&hook.name).is_ok() {
                self.queue.add(
                    Task::new(TaskKind::ModuleHookRun, &hook.name)
                        .with_binding(Binding::Schedule)
                        .with_allow_failure(hook.allow_failure),
                );
                debug!(schedule_id, hook = %hook.name, "schedule: queued module hook");
            } else {
                error!(
                    schedule_id,
                    hook = hook.name,
                    "hook is scheduled but not known to the module manager",
                );
            }
        }
    }

    fn on_kube_event(&self, event: &KubeEvent) {
        match self.kube_hooks.handle_event(event) {
            Ok(tasks) => {
                for task in tasks {
                    debug!(config_id = %event.config_id, hook = task.name(), "kube event: queued hook");
                    self.queue.add(task);
                }
            }
            Err(err) => {
                error!(config_id = %event.config_id, label = err.as_label(), %err,
                    "cannot map kube event to a hook");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::module::testing::FakeModuleManager;
    use crate::managers::module::{HookInfo, ModuleChange, ScheduleEntry};
    use crate::managers::testing::{FakeEventsManager, FakeKubeClient};

    fn fan_in(modules: Arc<FakeModuleManager>) -> (EventsFanIn, Arc<TaskQueue>) {
        fan_in_with_cluster(modules, Arc::new(FakeKubeClient::default()))
    }

    fn fan_in_with_cluster(
        modules: Arc<FakeModuleManager>,
        cluster: Arc<FakeKubeClient>,
    ) -> (EventsFanIn, Arc<TaskQueue>) {
        let queue = Arc::new(TaskQueue::new());
        let schedule_hooks = Arc::new(ScheduleHookRegistry::new());
        schedule_hooks.rebuild(modules.as_ref());
        let fan_in = EventsFanIn::new(
            queue.clone(),
            modules,
            cluster,
            Arc::new(FakeEventsManager::default()),
            schedule_hooks,
            KubeEventsController::new(),
        );
        (fan_in, queue)
    }

    fn drain(queue: &TaskQueue) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(task) = queue.pop() {
            out.push(task.describe());
        }
        out
    }

    #[tokio::test]
    async fn module_changes_map_to_run_and_delete_tasks_in_order() {
        let modules = Arc::new(FakeModuleManager::new().with_modules(&["a", "b"]));
        let (mut fan_in, queue) = fan_in(modules);

        fan_in
            .on_module_event(ModuleEvent::ModulesChanged(vec![
                ModuleChange {
                    name: "a".to_string(),
                    change: ChangeType::Enabled,
                },
                ModuleChange {
                    name: "b".to_string(),
                    change: ChangeType::Disabled,
                },
            ]))
            .await;

        assert_eq!(
            drain(&queue),
            vec!["ModuleRun name=a", "ModuleDelete name=b"]
        );
    }

    #[tokio::test]
    async fn global_change_appends_reload_all_behind_current_work() {
        let modules = Arc::new(
            FakeModuleManager::new()
                .with_modules(&["a", "b"])
                .with_global_hooks(Binding::BeforeAll, &["gb1"])
                .with_global_hooks(Binding::AfterAll, &["ga1"]),
        );
        let (mut fan_in, queue) = fan_in(modules);

        queue.add(Task::new(TaskKind::ModuleRun, "a"));
        fan_in.on_module_event(ModuleEvent::GlobalChanged).await;

        assert_eq!(
            drain(&queue),
            vec![
                "ModuleRun name=a",
                "GlobalHookRun name=gb1 binding=beforeAll",
                "ModuleRun name=a",
                "ModuleRun name=b",
                "GlobalHookRun name=ga1 binding=afterAll",
            ]
        );
    }

    #[tokio::test]
    async fn modules_changed_rebuilds_schedule_registry() {
        // The initial registry is built against an empty manager; the
        // change event must pick up the new schedule hook.
        let modules = Arc::new(
            FakeModuleManager::new()
                .with_global_hooks(Binding::Schedule, &["tick"])
                .with_global_hook_info(HookInfo {
                    name: "tick".to_string(),
                    schedules: vec![ScheduleEntry {
                        crontab: "* * * * *".to_string(),
                        allow_failure: false,
                    }],
                    kube_events: Vec::new(),
                }),
        );
        let queue = Arc::new(TaskQueue::new());
        let schedule_hooks = Arc::new(ScheduleHookRegistry::new());
        let mut fan_in = EventsFanIn::new(
            queue.clone(),
            modules,
            Arc::new(FakeKubeClient::default()),
            Arc::new(FakeEventsManager::default()),
            schedule_hooks.clone(),
            KubeEventsController::new(),
        );
        assert!(schedule_hooks.is_empty());

        fan_in
            .on_module_event(ModuleEvent::ModulesChanged(Vec::new()))
            .await;

        assert_eq!(schedule_hooks.get("* * * * *").len(), 1);
    }

    #[tokio::test]
    async fn node_change_queues_bound_global_hooks_in_order() {
        let modules = Arc::new(
            FakeModuleManager::new().with_global_hooks(Binding::OnKubeNodeChange, &["n1", "n2"]),
        );
        let (fan_in, queue) = fan_in(modules);

        fan_in.on_node_change();

        assert_eq!(
            drain(&queue),
            vec![
                "GlobalHookRun name=n1 binding=onKubeNodeChange",
                "GlobalHookRun name=n2 binding=onKubeNodeChange",
            ]
        );
    }

    #[tokio::test]
    async fn schedule_resolution_is_global_first_module_second_skip_unknown() {
        let schedule = |name: &str, allow_failure: bool| HookInfo {
            name: name.to_string(),
            schedules: vec![ScheduleEntry {
                crontab: "*/5 * * * *".to_string(),
                allow_failure,
            }],
            kube_events: Vec::new(),
        };
        // The registry was built while "ghost" still existed; at fire
        // time the runtime manager no longer knows it.
        let build_time = FakeModuleManager::new()
            .with_modules(&["ingress"])
            .with_global_hooks(Binding::Schedule, &["g-tick"])
            .with_module_hooks("ingress", Binding::Schedule, &["m-tick", "ghost"])
            .with_global_hook_info(schedule("g-tick", true))
            .with_module_hook_info(schedule("m-tick", false))
            .with_module_hook_info(schedule("ghost", false));
        let registry = Arc::new(ScheduleHookRegistry::new());
        registry.rebuild(&build_time);

        let runtime = Arc::new(
            FakeModuleManager::new()
                .with_global_hooks(Binding::Schedule, &["g-tick"])
                .with_module_hooks("ingress", Binding::Schedule, &["m-tick"])
                .with_global_hook_info(schedule("g-tick", true))
                .with_module_hook_info(schedule("m-tick", false)),
        );
        let queue = Arc::new(TaskQueue::new());
        let fan_in = EventsFanIn::new(
            queue.clone(),
            runtime,
            Arc::new(FakeKubeClient::default()),
            Arc::new(FakeEventsManager::default()),
            registry,
            KubeEventsController::new(),
        );

        fan_in.on_schedule_event("*/5 * * * *");

        assert_eq!(
            drain(&queue),
            vec![
                "GlobalHookRun name=g-tick binding=schedule allowFailure=true",
                "ModuleHookRun name=m-tick binding=schedule",
            ]
        );
    }

    #[tokio::test]
    async fn unknown_schedule_id_queues_nothing() {
        let modules = Arc::new(FakeModuleManager::new());
        let (fan_in, queue) = fan_in(modules);

        fan_in.on_schedule_event("0 0 * * *");
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn failed_deployment_update_keeps_the_process_running() {
        let cluster = Arc::new(FakeKubeClient::failing());
        let modules = Arc::new(FakeModuleManager::new());
        let (fan_in, queue) = fan_in_with_cluster(modules, cluster.clone());

        queue.add(Task::new(TaskKind::ModuleRun, "a"));
        let exit = fan_in.on_image_updated("registry.local/op:v2").await;

        assert!(!exit);
        assert_eq!(cluster.updates(), vec!["registry.local/op:v2"]);
        // Queue untouched by the failed self-update.
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn successful_deployment_update_requests_exit() {
        let cluster = Arc::new(FakeKubeClient::default());
        let modules = Arc::new(FakeModuleManager::new());
        let (fan_in, _queue) = fan_in_with_cluster(modules, cluster.clone());

        assert!(fan_in.on_image_updated("registry.local/op:v2").await);
    }

    #[tokio::test]
    async fn run_loop_translates_channel_signals() {
        let modules = Arc::new(FakeModuleManager::new());
        let (fan_in, queue) = fan_in(modules);
        let token = CancellationToken::new();

        let (module_tx, module_events) = mpsc::channel(8);
        let (_image_tx, image_updated) = mpsc::channel(8);
        let (_node_tx, node_changed) = mpsc::channel(8);
        let (_schedule_tx, schedule_events) = mpsc::channel(8);
        let (_kube_tx, kube_events) = mpsc::channel(8);

        let handle = tokio::spawn(fan_in.run(
            ManagerChannels {
                image_updated,
                module_events,
                node_changed,
                schedule_events,
                kube_events,
            },
            token.clone(),
        ));

        module_tx
            .send(ModuleEvent::ModulesChanged(vec![ModuleChange {
                name: "a".to_string(),
                change: ChangeType::Enabled,
            }]))
            .await
            .unwrap();

        while queue.is_empty() {
            tokio::task::yield_now().await;
        }
        token.cancel();
        handle.await.unwrap();

        assert_eq!(drain(&queue), vec!["ModuleRun name=a"]);
    }
}
