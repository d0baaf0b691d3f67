//! # Vista Graphics
//!
//! Frame-pipelined lifetime management for GPU resources.
//!
//! ## Overview
//!
//! A renderer with N frames in flight cannot overwrite or destroy anything an
//! earlier, still executing frame may read. This crate provides:
//! - [`VersionedResource`] - per-slot replicas of host-written data, propagated
//!   lazily on first use after a write
//! - [`RetirementQueue`] - deferred destruction with a countdown of N + 1 ticks
//! - [`RenderTargetManager`] - atomic replacement of render targets on resize
//! - [`FramePipeline`] - the frame scheduler producing `(slot, image, valid)`
//! - [`GpuBackend`] / [`DisplayRegistry`] - the seams to the GPU API and UI,
//!   with a journaled [`DummyBackend`] for testing
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use vista_graphics::{
//!     CommandStream, DummyBackend, Extent2d, FrameContext, FramePipeline, GraphicsDevice,
//!     RenderTargetConfig, RenderTargetManager, RetirementQueue, VersionedUniform,
//! };
//!
//! let backend = Arc::new(DummyBackend::new());
//! let device = GraphicsDevice::with_dummy(&backend);
//! let frames = FrameContext::new(2, device.swapchain_image_count());
//!
//! let mut pipeline = FramePipeline::new(&device, frames);
//! let mut retirement = RetirementQueue::new(&device, &frames);
//! let targets = RenderTargetManager::new(
//!     &device,
//!     &frames,
//!     RenderTargetConfig::default(),
//!     Extent2d::new(640, 480),
//! )?;
//! let mut tint = VersionedUniform::<[f32; 4]>::new(&device, &frames, "tint")?;
//!
//! tint.set(&[1.0, 0.5, 0.25, 1.0]);
//!
//! let tick = pipeline.begin_frame()?;
//! if tick.valid {
//!     let buffer = tint.consume(tick.slot)?;
//!     let mut stream = CommandStream::for_tick(&tick);
//!     targets.begin_pass(&mut stream);
//!     stream.bind_uniform_buffer(0, buffer);
//!     stream.draw(3, 1);
//!     targets.end_pass(&mut stream);
//!     retirement.tick()?;
//!     device.submit(stream)?;
//!     device.present(tick.image_index)?;
//!     pipeline.end_frame();
//! }
//! # Ok::<(), vista_graphics::GraphicsError>(())
//! ```

pub mod backend;
pub mod command;
pub mod device;
pub mod display;
pub mod error;
pub mod events;
pub mod frame;
pub mod pipeline;
pub mod resize;
pub mod resources;
pub mod retire;
pub mod target;
pub mod types;

// Re-export main types for convenience
pub use backend::{DummyBackend, DummyEvent, GpuBackend};
pub use command::{Command, CommandStream};
pub use device::{DeviceCapabilities, GraphicsDevice};
pub use display::DisplayRegistry;
pub use error::GraphicsError;
pub use events::{EventChannel, Subscription};
pub use frame::{FrameContext, FrameSlot, FrameTick};
pub use pipeline::FramePipeline;
pub use resize::{ResizeEvent, ResizeManager};
pub use resources::{VersionedResource, VersionedUniform};
pub use retire::{RetiredItem, RetiredResource, RetirementQueue};
pub use target::{
    RebuildStatus, RenderTarget, RenderTargetConfig, RenderTargetManager, SkipReason,
    TargetLifecycle, TargetState,
};
pub use types::{
    BufferDescriptor, BufferHandle, BufferUsage, ClearValue, DisplayHandle, Extent2d,
    FramebufferHandle, ImageHandle, PipelineDescriptor, PipelineHandle, RenderPassHandle,
    ResourceId, SamplerDescriptor, SamplerHandle, TextureDescriptor, TextureFormat, TextureUsage,
};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
///
/// This should be called before using any graphics functionality.
pub fn init() {
    log::info!("Vista Graphics v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_dummy_device() {
        let backend = Arc::new(DummyBackend::new());
        let device = GraphicsDevice::with_dummy(&backend);
        assert_eq!(device.name(), "Dummy");
        assert_eq!(device.swapchain_image_count(), 3);
    }
}
