//! # The operator context and lifecycle.
//!
//! [`Operator`] groups everything that used to be process-wide state —
//! working dir, temp dir, pod identity, the queue, the schedule
//! registry, the collaborator handles — into one value built by
//! [`Operator::init`] and consumed by [`Operator::run`].
//!
//! ## Lifecycle
//!
//! ```text
//! Operator::init(cfg, collaborators)
//!   ├─ resolve working dir / temp dir / hostname   (fatal on failure)
//!   ├─ cluster.init(); installer.init(namespace)   (fatal on failure)
//!   ├─ modules.init(work_dir, temp_dir)            (fatal on failure)
//!   ├─ queue + dump watcher
//!   └─ schedule registry rebuild
//!
//! Operator::run(channels)
//!   ├─ gate queue; onStartup tasks + reload-all tasks; ungate
//!   ├─ enable global kube-event hooks
//!   ├─ spawn: module manager watchers, fan-in, task runner
//!   ├─ block on termination signal
//!   └─ cancel everything, join, return (exit code 0)
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::core::compose;
use crate::core::fanin::{EventsFanIn, ManagerChannels};
use crate::core::runner::TaskRunner;
use crate::core::shutdown;
use crate::error::InitError;
use crate::hooks::kube_event::KubeEventsController;
use crate::hooks::schedule::ScheduleHookRegistry;
use crate::managers::events::KubeEventsManager;
use crate::managers::helm::ChartInstaller;
use crate::managers::kube::KubeClient;
use crate::managers::module::ModuleManager;
use crate::tasks::{QueueDumper, TaskQueue};

/// Handles to the call-based collaborators.
pub struct Collaborators {
    /// Module/values manager.
    pub modules: Arc<dyn ModuleManager>,
    /// Cluster client.
    pub cluster: Arc<dyn KubeClient>,
    /// Chart installer.
    pub installer: Arc<dyn ChartInstaller>,
    /// Cluster event watch.
    pub events: Arc<dyn KubeEventsManager>,
}

/// The operator: process identity plus the serialized work pipeline.
pub struct Operator {
    cfg: Config,
    work_dir: PathBuf,
    temp_dir: TempDir,
    hostname: String,
    queue: Arc<TaskQueue>,
    schedule_hooks: Arc<ScheduleHookRegistry>,
    collaborators: Collaborators,
}

impl Operator {
    /// Resolves process identity, initializes every collaborator, and
    /// builds the empty pipeline. Any error here is fatal: the caller
    /// should log it and exit non-zero without calling [`Operator::run`].
    pub async fn init(cfg: Config, collaborators: Collaborators) -> Result<Self, InitError> {
        let work_dir = std::env::current_dir().map_err(InitError::WorkingDir)?;
        debug!(path = %work_dir.display(), "working dir");

        let temp_dir = tempfile::Builder::new()
            .prefix(&cfg.temp_dir_prefix)
            .tempdir()
            .map_err(InitError::TempDir)?;
        debug!(path = %temp_dir.path().display(), "temporary dir");

        // The pod's hostname doubles as the operator's identity for
        // self-deployment lookups.
        let hostname = hostname::get()
            .map_err(InitError::Hostname)?
            .to_string_lossy()
            .into_owned();
        debug!(hostname = %hostname, "pod identity");

        collaborators
            .cluster
            .init()
            .await
            .map_err(InitError::Cluster)?;

        debug!(namespace = %cfg.tiller_namespace, "chart installer namespace");
        collaborators
            .installer
            .init(&cfg.tiller_namespace)
            .await
            .map_err(|err| InitError::Installer {
                namespace: cfg.tiller_namespace.clone(),
                reason: err.to_string(),
            })?;

        collaborators
            .modules
            .init(&work_dir, temp_dir.path())
            .await
            .map_err(InitError::ModuleManager)?;

        let queue = Arc::new(TaskQueue::new());
        debug!(path = %cfg.queue_dump_path.display(), "tasks queue dump file");
        queue.add_watcher(Arc::new(QueueDumper::new(&cfg.queue_dump_path)));

        let schedule_hooks = Arc::new(ScheduleHookRegistry::new());
        schedule_hooks.rebuild(collaborators.modules.as_ref());

        Ok(Self {
            cfg,
            work_dir,
            temp_dir,
            hostname,
            queue,
            schedule_hooks,
            collaborators,
        })
    }

    /// Runs the pipeline until the process receives a termination
    /// signal. Returns `Ok(())` for a clean (exit code 0) shutdown.
    ///
    /// A successful self-deployment update exits the process with a
    /// non-zero status from inside the fan-in instead of returning.
    pub async fn run(self, channels: ManagerChannels) -> std::io::Result<()> {
        let token = CancellationToken::new();
        let work = tokio::spawn(self.run_until(channels, token.clone()));

        let signal = shutdown::wait_for_termination().await?;
        info!(signal, "termination signal received, shutting down");
        token.cancel();
        let _ = work.await;
        Ok(())
    }

    /// Runs the pipeline until `token` is cancelled.
    ///
    /// For embedders that own their shutdown story; [`Operator::run`]
    /// wires this to OS signals.
    pub async fn run_until(self, channels: ManagerChannels, token: CancellationToken) {
        info!(hostname = %self.hostname, "run main loop");

        // Startup composition: onStartup hooks, then the full reload-all
        // sequence, as one gated batch.
        info!("queueing onStartup, beforeAll, module and afterAll tasks");
        self.queue.changes_disable();
        compose::create_onstartup_tasks(&self.queue, self.collaborators.modules.as_ref());
        compose::create_reload_all_tasks(&self.queue, self.collaborators.modules.as_ref());
        self.queue.changes_enable(true);

        let mut kube_hooks = KubeEventsController::new();
        if let Err(err) = kube_hooks
            .enable_global_hooks(
                self.collaborators.modules.as_ref(),
                self.collaborators.events.as_ref(),
            )
            .await
        {
            error!(label = err.as_label(), %err, "cannot enable global kube-event hooks");
        }

        let modules = self.collaborators.modules.clone();
        let watcher_token = token.clone();
        let watchers = tokio::spawn(async move {
            tokio::select! {
                _ = modules.run() => {}
                _ = watcher_token.cancelled() => {}
            }
        });

        let fan_in = EventsFanIn::new(
            self.queue.clone(),
            self.collaborators.modules.clone(),
            self.collaborators.cluster.clone(),
            self.collaborators.events.clone(),
            self.schedule_hooks.clone(),
            kube_hooks,
        );
        let fan_in = tokio::spawn(fan_in.run(channels, token.clone()));

        let runner = TaskRunner::new(
            &self.cfg,
            self.queue.clone(),
            self.collaborators.modules.clone(),
        );
        let runner = tokio::spawn(runner.run(token.clone()));

        let _ = tokio::join!(watchers, fan_in, runner);
    }

    /// The queue behind the pipeline.
    pub fn queue(&self) -> &Arc<TaskQueue> {
        &self.queue
    }

    /// The schedule-hook registry.
    pub fn schedule_hooks(&self) -> &Arc<ScheduleHookRegistry> {
        &self.schedule_hooks
    }

    /// The operator's working directory.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// The operator's scratch directory (removed on drop).
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// The pod identity.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }
}
