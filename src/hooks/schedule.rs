//! # Schedule-hook registry.
//!
//! Maps a schedule id (the crontab token owned by the dispatcher) to the
//! ordered hooks that must run when it fires. The registry answers
//! lookups only; enqueueing is the fan-in's business.
//!
//! The map is rebuilt from the module manager whenever the module set
//! changes: global hooks bound to `schedule` first, then each module's
//! schedule-bound hooks in module order. A rebuild publishes the whole
//! map at once, so the fan-in never observes a half-built registry.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tracing::{debug, error};

use crate::managers::module::ModuleManager;
use crate::managers::schedule::ScheduleId;
use crate::tasks::Binding;

/// One hook to trigger when a schedule fires.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduleHook {
    /// Hook name, resolvable as a global hook or a module hook.
    pub name: String,
    /// Whether a failing run may be dropped instead of retried.
    pub allow_failure: bool,
}

/// Lookup table from schedule id to the hooks it triggers.
pub struct ScheduleHookRegistry {
    hooks: RwLock<HashMap<ScheduleId, Vec<ScheduleHook>>>,
}

impl ScheduleHookRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            hooks: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the hooks registered for `id`, in registration order.
    pub fn get(&self, id: &str) -> Vec<ScheduleHook> {
        self.hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns how many schedule ids are registered.
    pub fn len(&self) -> usize {
        self.hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns whether no schedule id is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rebuilds the whole map from the module manager.
    ///
    /// Walks global hooks bound to `schedule`, then each module's
    /// schedule-bound hooks in module order. A hook whose metadata
    /// cannot be resolved is logged and skipped; the rebuild continues.
    pub fn rebuild(&self, modules: &dyn ModuleManager) {
        let mut rebuilt: HashMap<ScheduleId, Vec<ScheduleHook>> = HashMap::new();

        match modules.global_hooks_in_order(Binding::Schedule) {
            Ok(names) => {
                for name in names {
                    match modules.global_hook(&name) {
                        Ok(info) => Self::register(&mut rebuilt, &name, info.schedules),
                        Err(err) => {
                            error!(hook = %name, label = err.as_label(), %err,
                                "schedule registry: cannot resolve global hook");
                        }
                    }
                }
            }
            Err(err) => {
                error!(label = err.as_label(), %err,
                    "schedule registry: cannot list global schedule hooks");
            }
        }

        for module in modules.module_names_in_order() {
            let names = match modules.module_hooks_in_order(&module, Binding::Schedule) {
                Ok(names) => names,
                Err(err) => {
                    error!(module = %module, label = err.as_label(), %err,
                        "schedule registry: cannot list module schedule hooks");
                    continue;
                }
            };
            for name in names {
                match modules.module_hook(&name) {
                    Ok(info) => Self::register(&mut rebuilt, &name, info.schedules),
                    Err(err) => {
                        error!(module = %module, hook = %name, label = err.as_label(), %err,
                            "schedule registry: cannot resolve module hook");
                    }
                }
            }
        }

        debug!(schedules = rebuilt.len(), "schedule registry rebuilt");
        *self.hooks.write().unwrap_or_else(PoisonError::into_inner) = rebuilt;
    }

    fn register(
        map: &mut HashMap<ScheduleId, Vec<ScheduleHook>>,
        hook_name: &str,
        entries: Vec<crate::managers::module::ScheduleEntry>,
    ) {
        for entry in entries {
            map.entry(entry.crontab).or_default().push(ScheduleHook {
                name: hook_name.to_string(),
                allow_failure: entry.allow_failure,
            });
        }
    }
}

impl Default for ScheduleHookRegistry {
    fn default() -> Self {
        Self::new()
    }
}
