//! Frame-pipelined GPU resources.
//!
//! This module contains resources whose GPU copies must never be written
//! while an in-flight frame may read them:
//! - [`VersionedResource`] - N per-slot replicas of a small host-written block
//! - [`VersionedUniform`] - typed wrapper over a `bytemuck::Pod` value
//!
//! Resources hold an `Arc<GraphicsDevice>` and destroy their GPU objects when
//! dropped, or hand them to the retirement queue.

mod versioned;

pub use versioned::{VersionedResource, VersionedUniform};
