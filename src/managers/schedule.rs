//! # Schedule dispatcher interface.
//!
//! The dispatcher owns crontab parsing and timers; the core only
//! receives schedule ids on a channel and resolves them through the
//! [`ScheduleHookRegistry`](crate::hooks::ScheduleHookRegistry). The id
//! is the crontab token itself — an opaque string as far as the core is
//! concerned.

/// Opaque schedule identifier fired by the dispatcher.
pub type ScheduleId = String;
