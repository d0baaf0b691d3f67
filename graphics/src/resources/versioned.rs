//! Multi-versioned host-written resources.
//!
//! A [`VersionedResource`] keeps one authoritative CPU-side value and N GPU
//! replicas, one per frame slot. Writes only touch the authoritative value and
//! mark every replica stale. A replica is refreshed lazily, the first time its
//! slot is consumed after a write, which is exactly when the GPU is known to be
//! done with that slot's previous frame.
//!
//! ```text
//! set_value(A)            dirty = [1 1 1]
//! consume(slot 1)  copy   dirty = [1 0 1]
//! consume(slot 0)  copy   dirty = [0 0 1]
//! consume(slot 1)  ----   dirty = [0 0 1]
//! consume(slot 2)  copy   dirty = [0 0 0]
//! ```
//!
//! Several writes between two consumes of a slot collapse into one copy of the
//! last value.

use std::marker::PhantomData;
use std::sync::Arc;

use bytemuck::Pod;
use fixedbitset::FixedBitSet;

use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::frame::{FrameContext, FrameSlot};
use crate::retire::{RetiredResource, RetirementQueue};
use crate::types::{BufferDescriptor, BufferHandle};

/// N per-slot replicas of a fixed-size byte block.
///
/// # Invariant
///
/// Bit `s` of the dirty mask is set exactly when replica `s` does not hold the
/// authoritative value.
#[derive(Debug)]
pub struct VersionedResource {
    device: Arc<GraphicsDevice>,
    label: String,
    authoritative: Vec<u8>,
    replicas: Vec<BufferHandle>,
    dirty: FixedBitSet,
}

impl VersionedResource {
    /// Create a resource of `size` bytes with one replica per frame slot.
    ///
    /// The initial value is all zeroes and every replica starts dirty.
    ///
    /// # Errors
    ///
    /// Returns an error if `size` is zero or a replica cannot be created.
    /// Replicas created before the failure are destroyed.
    pub fn new(
        device: &Arc<GraphicsDevice>,
        frames: &FrameContext,
        size: usize,
        label: impl Into<String>,
    ) -> Result<Self, GraphicsError> {
        let label = label.into();
        if size == 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "versioned resource {label:?} cannot be empty"
            )));
        }

        let n = frames.frames_in_flight();
        let mut replicas = Vec::with_capacity(n);
        for slot in frames.slots() {
            let descriptor = BufferDescriptor::host_visible_uniform(size as u64)
                .with_label(format!("{label}[{}]", slot.index()));
            match device.create_buffer(&descriptor) {
                Ok(buffer) => replicas.push(buffer),
                Err(e) => {
                    for buffer in replicas {
                        if let Err(destroy_err) = device.destroy_buffer(buffer) {
                            log::error!("Failed to destroy {buffer} of {label:?}: {destroy_err}");
                        }
                    }
                    return Err(e);
                }
            }
        }

        let mut dirty = FixedBitSet::with_capacity(n);
        dirty.insert_range(..);

        log::debug!("Created versioned resource {label:?} ({size} bytes x {n} slots)");

        Ok(Self {
            device: Arc::clone(device),
            label,
            authoritative: vec![0; size],
            replicas,
            dirty,
        })
    }

    /// Replace the authoritative value and mark every replica stale.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` does not have exactly [`size`](Self::size) bytes.
    pub fn set_value(&mut self, bytes: &[u8]) {
        assert_eq!(
            bytes.len(),
            self.authoritative.len(),
            "value size mismatch for versioned resource {:?}",
            self.label
        );
        self.authoritative.copy_from_slice(bytes);
        self.dirty.insert_range(..);
    }

    /// Make the replica for `slot` current and return it for binding.
    ///
    /// Copies the authoritative value into the replica only if it is stale.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if the copy fails. The replica stays marked
    /// stale, so the next consume retries.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range for this resource.
    pub fn consume(&mut self, slot: FrameSlot) -> Result<BufferHandle, GraphicsError> {
        let index = slot.index();
        assert!(
            index < self.replicas.len(),
            "{slot} out of range for versioned resource {:?} ({} slots)",
            self.label,
            self.replicas.len()
        );

        let replica = self.replicas[index];
        if self.dirty.contains(index) {
            self.device.write_buffer(replica, 0, &self.authoritative)?;
            self.dirty.set(index, false);
            log::trace!("Propagated {:?} into {slot}", self.label);
        }
        Ok(replica)
    }

    /// The current authoritative value.
    pub fn read_authoritative(&self) -> &[u8] {
        &self.authoritative
    }

    /// Returns true if the replica for `slot` is stale.
    pub fn is_dirty(&self, slot: FrameSlot) -> bool {
        self.dirty.contains(slot.index())
    }

    /// Number of stale replicas.
    pub fn dirty_count(&self) -> usize {
        self.dirty.count_ones(..)
    }

    /// Size of the value in bytes.
    pub fn size(&self) -> usize {
        self.authoritative.len()
    }

    /// Number of replicas.
    pub fn frames_in_flight(&self) -> usize {
        self.replicas.len()
    }

    /// Debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Replica handles in slot order.
    pub fn replicas(&self) -> &[BufferHandle] {
        &self.replicas
    }

    /// Hand every replica to the retirement queue instead of destroying it now.
    ///
    /// Use this when the resource goes away while frames that bound it may
    /// still be in flight.
    pub fn retire(mut self, queue: &mut RetirementQueue) {
        for buffer in std::mem::take(&mut self.replicas) {
            queue.retire(RetiredResource::Buffer(buffer));
        }
    }
}

impl Drop for VersionedResource {
    fn drop(&mut self) {
        for buffer in self.replicas.drain(..) {
            if let Err(e) = self.device.destroy_buffer(buffer) {
                log::error!("Failed to destroy {buffer} of {:?}: {e}", self.label);
            }
        }
    }
}

/// A [`VersionedResource`] holding a single `T`.
///
/// Edits go through [`update`](Self::update), which reads the authoritative
/// value, applies the closure and writes the result back. Replica memory is
/// never modified directly.
#[derive(Debug)]
pub struct VersionedUniform<T: Pod> {
    inner: VersionedResource,
    _marker: PhantomData<T>,
}

impl<T: Pod> VersionedUniform<T> {
    /// Create a zero-initialised uniform.
    pub fn new(
        device: &Arc<GraphicsDevice>,
        frames: &FrameContext,
        label: impl Into<String>,
    ) -> Result<Self, GraphicsError> {
        Ok(Self {
            inner: VersionedResource::new(device, frames, std::mem::size_of::<T>(), label)?,
            _marker: PhantomData,
        })
    }

    /// Create a uniform with an initial value.
    pub fn with_value(
        device: &Arc<GraphicsDevice>,
        frames: &FrameContext,
        label: impl Into<String>,
        value: &T,
    ) -> Result<Self, GraphicsError> {
        let mut uniform = Self::new(device, frames, label)?;
        uniform.set(value);
        Ok(uniform)
    }

    /// Replace the value.
    pub fn set(&mut self, value: &T) {
        self.inner.set_value(bytemuck::bytes_of(value));
    }

    /// Get a copy of the authoritative value.
    pub fn get(&self) -> T {
        bytemuck::pod_read_unaligned(self.inner.read_authoritative())
    }

    /// Read-modify-write the value.
    pub fn update(&mut self, f: impl FnOnce(&mut T)) {
        let mut value = self.get();
        f(&mut value);
        self.set(&value);
    }

    /// See [`VersionedResource::consume`].
    pub fn consume(&mut self, slot: FrameSlot) -> Result<BufferHandle, GraphicsError> {
        self.inner.consume(slot)
    }

    /// The untyped resource.
    pub fn resource(&self) -> &VersionedResource {
        &self.inner
    }

    /// Hand every replica to the retirement queue.
    pub fn retire(self, queue: &mut RetirementQueue) {
        self.inner.retire(queue);
    }
}
