//! Buffer types and descriptors.

use bitflags::bitflags;

bitflags! {
    /// Usage flags for buffers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Buffer can be used as a vertex buffer.
        const VERTEX = 1 << 0;
        /// Buffer can be used as an index buffer.
        const INDEX = 1 << 1;
        /// Buffer can be used as a uniform buffer.
        const UNIFORM = 1 << 2;
        /// Buffer can be used as a storage buffer.
        const STORAGE = 1 << 3;
        /// Buffer can be copied to.
        const COPY_DST = 1 << 4;
        /// Buffer memory is host visible and written directly by the CPU.
        const HOST_VISIBLE = 1 << 5;
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Descriptor for creating a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BufferDescriptor {
    /// Debug label for the buffer.
    pub label: Option<String>,
    /// Size in bytes.
    pub size: u64,
    /// Usage flags.
    pub usage: BufferUsage,
}

impl BufferDescriptor {
    /// Create a new buffer descriptor.
    pub fn new(size: u64, usage: BufferUsage) -> Self {
        Self {
            label: None,
            size,
            usage,
        }
    }

    /// Create a host-visible uniform buffer descriptor.
    ///
    /// This is the layout used for the per-slot replicas of a
    /// [`VersionedResource`](crate::resources::VersionedResource).
    pub fn host_visible_uniform(size: u64) -> Self {
        Self::new(size, BufferUsage::UNIFORM | BufferUsage::HOST_VISIBLE)
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_visible_uniform() {
        let desc = BufferDescriptor::host_visible_uniform(64).with_label("camera[0]");
        assert_eq!(desc.size, 64);
        assert!(desc.usage.contains(BufferUsage::UNIFORM));
        assert!(desc.usage.contains(BufferUsage::HOST_VISIBLE));
        assert_eq!(desc.label.as_deref(), Some("camera[0]"));
    }
}
