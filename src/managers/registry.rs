//! # Container-registry watcher interface.
//!
//! The registry watcher polls the operator's own image tag. Its whole
//! interface is one channel: each message is the id of a newly pushed
//! image for the operator's deployment. The watcher process itself is
//! run by the embedder; the core only consumes the channel.

/// Identifier of a container image (registry digest or tag).
pub type ImageId = String;
