//! # Diagnostic queue dump.
//!
//! [`QueueDumper`] is a [`QueueWatcher`] that rewrites a text file with the
//! current queue contents after every committed mutation. The file is a
//! debugging aid for `kubectl exec` sessions; it is never read back, and a
//! failed write never disturbs the queue.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::error;

use crate::tasks::queue::QueueWatcher;
use crate::tasks::task::Task;

/// Writes a human-readable queue listing to a fixed path on every change.
pub struct QueueDumper {
    path: PathBuf,
}

impl QueueDumper {
    /// Creates a dumper targeting `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the dump file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn render(snapshot: &[Task]) -> String {
        if snapshot.is_empty() {
            return String::from("-- empty --\n");
        }
        let mut out = String::new();
        for task in snapshot {
            out.push_str(&task.describe());
            out.push('\n');
        }
        out
    }
}

impl QueueWatcher for QueueDumper {
    fn on_queue_changed(&self, snapshot: &[Task]) {
        if let Err(err) = fs::write(&self.path, Self::render(snapshot)) {
            error!(path = %self.path.display(), %err, "cannot dump tasks queue");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;
    use crate::tasks::binding::Binding;
    use crate::tasks::queue::TaskQueue;
    use crate::tasks::task::TaskKind;

    #[test]
    fn dump_tracks_queue_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks-queue");

        let queue = TaskQueue::new();
        queue.add_watcher(Arc::new(QueueDumper::new(&path)));

        queue.add(Task::new(TaskKind::GlobalHookRun, "gs1").with_binding(Binding::OnStartup));
        queue.add(Task::new(TaskKind::ModuleRun, "ingress"));

        let dumped = fs::read_to_string(&path).unwrap();
        assert_eq!(
            dumped,
            "GlobalHookRun name=gs1 binding=onStartup\nModuleRun name=ingress\n"
        );

        queue.pop();
        queue.pop();
        let dumped = fs::read_to_string(&path).unwrap();
        assert_eq!(dumped, "-- empty --\n");
    }

    #[test]
    fn dump_reflects_interposed_delay() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks-queue");

        let queue = TaskQueue::new();
        queue.add_watcher(Arc::new(QueueDumper::new(&path)));

        queue.add(Task::new(TaskKind::ModuleRun, "ingress"));
        queue.increment_head_failures();
        queue.push(Task::delay(Duration::from_secs(5)));

        let dumped = fs::read_to_string(&path).unwrap();
        assert_eq!(dumped, "Delay delay=5s\nModuleRun name=ingress failures=1\n");
    }

    #[test]
    fn unwritable_path_is_ignored() {
        let queue = TaskQueue::new();
        queue.add_watcher(Arc::new(QueueDumper::new("/nonexistent-dir/tasks-queue")));

        // The write fails; the mutation must still commit.
        queue.add(Task::new(TaskKind::ModuleRun, "ingress"));
        assert_eq!(queue.len(), 1);
    }
}
