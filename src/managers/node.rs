//! # Node watcher interface.
//!
//! The node watcher reports that the cluster's node set changed. The
//! signal carries no payload: the reaction is always the same (run every
//! global hook bound to `onKubeNodeChange`), so the event is a bare
//! marker.

/// Marker signal: the cluster node set changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NodeChange;
