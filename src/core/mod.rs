//! Operator core: the serialized work pipeline.
//!
//! Everything the operator does funnels through one queue drained by one
//! runner. The public API from here is [`Operator`] (plus the
//! [`ManagerChannels`] bundle it consumes); the rest are internal
//! building blocks the operator wires together.
//!
//! ## Files & responsibilities
//! - **operator.rs**: process identity (work dir, temp dir, hostname),
//!   collaborator init, startup composition, actor spawning, shutdown.
//! - **fanin.rs**: the single multiplex over every manager channel;
//!   translates signals into queued tasks. Sole producer of non-delay
//!   tasks.
//! - **runner.rs**: the single consumer; dispatches the head task to the
//!   module manager and applies the retry-with-delay policy.
//! - **compose.rs**: deterministic builders for the startup and
//!   reload-all sequences, always used under a change gate.
//! - **shutdown.rs**: OS signal wait.
//!
//! ## Dataflow
//! ```text
//! registry watcher ─┐
//! module manager  ──┤                        ┌──────────────┐
//! node watcher    ──┼─► EventsFanIn ── add ─►│  TaskQueue   │── peek/pop ─► TaskRunner
//! schedule disp.  ──┤     (select!)          │ (+ watchers) │◄─ push Delay ──┘
//! cluster events  ──┘                        └──────┬───────┘
//!                                                   └─► QueueDumper (diagnostic file)
//! ```
//!
//! ## Why one consumer
//!
//! `peek` → dispatch → `pop` is only safe because nobody else touches
//! the head: producers append at the tail, and the sole head-push is the
//! runner's own retry delay. A second runner would need an atomic
//! take-head primitive on the queue; the pipeline deliberately does not
//! offer one.
//!
//! ## Shutdown timeline
//! ```text
//! OS signal → cancel runtime token
//!   → fan-in stops multiplexing (pending signals stay in channels)
//!   → runner stops between tasks (queue keeps undrained tasks)
//!   → process exits 0; dump file keeps the last committed queue state
//! ```

mod compose;
mod fanin;
mod operator;
mod runner;
mod shutdown;

pub use fanin::ManagerChannels;
pub use operator::{Collaborators, Operator};
