//! Opaque handles to backend-owned GPU objects.
//!
//! Handles are plain ids: copying one never duplicates the underlying object.
//! Ownership of the object is tracked by whoever holds the handle and is
//! responsible for destroying it (a resource owner or the retirement queue).

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-wide unique handle id.
///
/// Backends use this so that handles of different kinds never collide,
/// which keeps journals and retirement keys unambiguous.
pub fn next_handle_id() -> u64 {
    NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed)
}

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw backend id.
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// Get the raw backend id.
            pub const fn raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($kind, "#{}"), self.0)
            }
        }
    };
}

define_handle!(
    /// Handle to a GPU buffer.
    BufferHandle,
    "buffer"
);
define_handle!(
    /// Handle to a 2D image and its default view.
    ImageHandle,
    "image"
);
define_handle!(
    /// Handle to a texture sampler.
    SamplerHandle,
    "sampler"
);
define_handle!(
    /// Handle to a render pass object.
    RenderPassHandle,
    "render-pass"
);
define_handle!(
    /// Handle to a framebuffer.
    FramebufferHandle,
    "framebuffer"
);
define_handle!(
    /// Handle to a graphics pipeline object.
    PipelineHandle,
    "pipeline"
);
define_handle!(
    /// Handle under which a texture is registered with the UI layer.
    DisplayHandle,
    "display"
);
define_handle!(
    /// Identity of a render target generation.
    TargetId,
    "target"
);

/// Identity of any destroyable GPU object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceId {
    Buffer(BufferHandle),
    Image(ImageHandle),
    Sampler(SamplerHandle),
    RenderPass(RenderPassHandle),
    Framebuffer(FramebufferHandle),
    Pipeline(PipelineHandle),
    Display(DisplayHandle),
    Target(TargetId),
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buffer(h) => h.fmt(f),
            Self::Image(h) => h.fmt(f),
            Self::Sampler(h) => h.fmt(f),
            Self::RenderPass(h) => h.fmt(f),
            Self::Framebuffer(h) => h.fmt(f),
            Self::Pipeline(h) => h.fmt(f),
            Self::Display(h) => h.fmt(f),
            Self::Target(h) => h.fmt(f),
        }
    }
}

macro_rules! impl_from_handle {
    ($($handle:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$handle> for ResourceId {
                fn from(handle: $handle) -> Self {
                    Self::$variant(handle)
                }
            }
        )*
    };
}

impl_from_handle! {
    BufferHandle => Buffer,
    ImageHandle => Image,
    SamplerHandle => Sampler,
    RenderPassHandle => RenderPass,
    FramebufferHandle => Framebuffer,
    PipelineHandle => Pipeline,
    DisplayHandle => Display,
    TargetId => Target,
}

static_assertions::assert_eq_size!(BufferHandle, u64);
static_assertions::assert_impl_all!(ResourceId: Send, Sync, Copy);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_ids_are_unique() {
        let a = next_handle_id();
        let b = next_handle_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_display_format() {
        assert_eq!(BufferHandle::from_raw(7).to_string(), "buffer#7");
        assert_eq!(
            ResourceId::from(RenderPassHandle::from_raw(3)).to_string(),
            "render-pass#3"
        );
    }
}
