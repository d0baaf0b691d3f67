//! GPU backend abstraction layer.
//!
//! This module provides a trait-based abstraction over the GPU API, so the
//! lifecycle components can be driven by a real driver or by the journaled
//! [`DummyBackend`] used in tests and headless runs.
//!
//! # Architecture
//!
//! Each backend implements the [`GpuBackend`] trait, which provides:
//! - Resource creation and destruction (buffers, images, samplers, render
//!   passes, framebuffers, pipelines)
//! - Host writes into mapped buffers
//! - Swapchain image acquisition, submission and presentation
//! - Device idle waits
//!
//! Backends never decide when an object is safe to destroy. They destroy
//! immediately when asked; deferring destruction past in-flight frames is the
//! job of the [`RetirementQueue`](crate::retire::RetirementQueue).

pub mod dummy;

pub use dummy::{DummyBackend, DummyEvent};

use crate::command::CommandStream;
use crate::device::DeviceCapabilities;
use crate::error::GraphicsError;
use crate::types::{
    BufferDescriptor, BufferHandle, FramebufferDescriptor, FramebufferHandle, ImageHandle,
    PipelineDescriptor, PipelineHandle, RenderPassDescriptor, RenderPassHandle, SamplerDescriptor,
    SamplerHandle, TextureDescriptor,
};

/// A GPU API implementation.
///
/// All methods take `&self`; implementations synchronize their own
/// bookkeeping.
pub trait GpuBackend: Send + Sync + std::fmt::Debug {
    /// Human readable backend name.
    fn name(&self) -> &'static str;

    /// Limits and supported formats of the device.
    fn capabilities(&self) -> DeviceCapabilities;

    /// Create a buffer.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferHandle, GraphicsError>;

    /// Copy `data` into a host-visible buffer at `offset`.
    fn write_buffer(
        &self,
        buffer: BufferHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError>;

    /// Destroy a buffer.
    fn destroy_buffer(&self, buffer: BufferHandle) -> Result<(), GraphicsError>;

    /// Create a 2D image and its default view.
    fn create_image(&self, descriptor: &TextureDescriptor) -> Result<ImageHandle, GraphicsError>;

    /// Destroy an image and its view.
    fn destroy_image(&self, image: ImageHandle) -> Result<(), GraphicsError>;

    /// Create a sampler.
    fn create_sampler(&self, descriptor: &SamplerDescriptor)
    -> Result<SamplerHandle, GraphicsError>;

    /// Destroy a sampler.
    fn destroy_sampler(&self, sampler: SamplerHandle) -> Result<(), GraphicsError>;

    /// Create a render pass.
    fn create_render_pass(
        &self,
        descriptor: &RenderPassDescriptor,
    ) -> Result<RenderPassHandle, GraphicsError>;

    /// Destroy a render pass.
    fn destroy_render_pass(&self, render_pass: RenderPassHandle) -> Result<(), GraphicsError>;

    /// Create a framebuffer.
    fn create_framebuffer(
        &self,
        descriptor: &FramebufferDescriptor,
    ) -> Result<FramebufferHandle, GraphicsError>;

    /// Destroy a framebuffer.
    fn destroy_framebuffer(&self, framebuffer: FramebufferHandle) -> Result<(), GraphicsError>;

    /// Create a graphics pipeline.
    fn create_pipeline(
        &self,
        descriptor: &PipelineDescriptor,
    ) -> Result<PipelineHandle, GraphicsError>;

    /// Destroy a graphics pipeline.
    fn destroy_pipeline(&self, pipeline: PipelineHandle) -> Result<(), GraphicsError>;

    /// Number of images owned by the presentation surface.
    fn swapchain_image_count(&self) -> u32;

    /// Acquire the next swapchain image.
    ///
    /// Returns `Ok(None)` while the surface is unavailable (minimized or lost).
    fn acquire_image(&self) -> Result<Option<u32>, GraphicsError>;

    /// Submit a recorded command stream.
    fn submit(&self, commands: CommandStream) -> Result<(), GraphicsError>;

    /// Present a swapchain image.
    fn present(&self, image_index: u32) -> Result<(), GraphicsError>;

    /// Block until the GPU has finished all submitted work.
    fn wait_idle(&self) -> Result<(), GraphicsError>;
}
