//! # Deterministic task composition.
//!
//! Two builders append well-known task sequences to the queue:
//!
//! - [`create_onstartup_tasks`] — every global hook bound to `onStartup`.
//! - [`create_reload_all_tasks`] — the reload-all sequence: `beforeAll`
//!   hooks, every module in declared order, `afterAll` hooks.
//!
//! Callers gate the queue around these builders
//! (`changes_disable` … `changes_enable(true)`) so the whole batch lands
//! contiguously and watchers see a single aggregate change.
//!
//! A failing hook-list lookup skips that phase and keeps composing; a
//! half-built reload is more useful than none.

use tracing::{debug, error};

use crate::managers::module::ModuleManager;
use crate::tasks::{Binding, Task, TaskKind, TaskQueue};

/// Appends a `GlobalHookRun` for every global hook bound to `onStartup`.
pub(crate) fn create_onstartup_tasks(queue: &TaskQueue, modules: &dyn ModuleManager) {
    let hooks = match modules.global_hooks_in_order(Binding::OnStartup) {
        Ok(hooks) => hooks,
        Err(err) => {
            error!(label = err.as_label(), %err, "onStartup tasks: cannot get global hooks");
            return;
        }
    };

    for hook in hooks {
        queue.add(Task::new(TaskKind::GlobalHookRun, &hook).with_binding(Binding::OnStartup));
        debug!(hook = %hook, "onStartup: queued global hook");
    }
}

/// Appends the reload-all sequence: `beforeAll` hooks, every module,
/// `afterAll` hooks.
pub(crate) fn create_reload_all_tasks(queue: &TaskQueue, modules: &dyn ModuleManager) {
    match modules.global_hooks_in_order(Binding::BeforeAll) {
        Ok(hooks) => {
            for hook in hooks {
                queue.add(Task::new(TaskKind::GlobalHookRun, &hook).with_binding(Binding::BeforeAll));
                debug!(hook = %hook, "reloadAll beforeAll: queued global hook");
            }
        }
        Err(err) => {
            error!(label = err.as_label(), %err, "reloadAll beforeAll tasks: cannot get global hooks");
        }
    }

    for module in modules.module_names_in_order() {
        queue.add(Task::new(TaskKind::ModuleRun, &module));
        debug!(module = %module, "reloadAll: queued module");
    }

    match modules.global_hooks_in_order(Binding::AfterAll) {
        Ok(hooks) => {
            for hook in hooks {
                queue.add(Task::new(TaskKind::GlobalHookRun, &hook).with_binding(Binding::AfterAll));
                debug!(hook = %hook, "reloadAll afterAll: queued global hook");
            }
        }
        Err(err) => {
            error!(label = err.as_label(), %err, "reloadAll afterAll tasks: cannot get global hooks");
        }
    }
}
