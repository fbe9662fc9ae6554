//! # Operator configuration.
//!
//! [`Config`] carries the few knobs the pipeline has: the runner's delay
//! discipline, the queue dump path, the temp-dir prefix, and the
//! namespace handed to the chart installer. There are no CLI flags; the
//! embedding process builds a `Config` (usually [`Config::default`]) and
//! passes it to [`Operator::init`](crate::Operator::init).
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use modvisor::Config;
//!
//! let mut cfg = Config::default();
//! cfg.failed_module_delay = Duration::from_secs(10);
//!
//! assert_eq!(cfg.queue_is_empty_delay, Duration::from_secs(3));
//! ```

use std::path::PathBuf;
use std::time::Duration;

/// Pipeline configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Runner sleep when the queue is empty.
    pub queue_is_empty_delay: Duration,
    /// Delay interposed ahead of a failed hook task.
    pub failed_hook_delay: Duration,
    /// Delay interposed ahead of a failed module task.
    pub failed_module_delay: Duration,
    /// Path of the diagnostic queue dump file.
    pub queue_dump_path: PathBuf,
    /// Prefix for the operator's temporary directory.
    pub temp_dir_prefix: String,
    /// Namespace handed to the chart installer.
    pub tiller_namespace: String,
}

impl Default for Config {
    /// Provides the stock configuration:
    /// - `queue_is_empty_delay = 3s`
    /// - `failed_hook_delay = 5s`
    /// - `failed_module_delay = 5s`
    /// - `queue_dump_path = /tmp/modvisor-tasks-queue`
    /// - `temp_dir_prefix = "modvisor-"`
    /// - `tiller_namespace = "modvisor"`
    fn default() -> Self {
        Self {
            queue_is_empty_delay: Duration::from_secs(3),
            failed_hook_delay: Duration::from_secs(5),
            failed_module_delay: Duration::from_secs(5),
            queue_dump_path: PathBuf::from("/tmp/modvisor-tasks-queue"),
            temp_dir_prefix: String::from("modvisor-"),
            tiller_namespace: String::from("modvisor"),
        }
    }
}
