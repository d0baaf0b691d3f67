//! Common types and descriptors for graphics resources.
//!
//! This module contains handles, format enums, usage flags, and descriptor
//! structs used throughout the graphics system.

mod buffer;
mod common;
mod handle;
mod pass;
mod sampler;
mod texture;

pub use buffer::{BufferDescriptor, BufferUsage};
pub use common::{ClearValue, Extent2d, ScissorRect, Viewport};
pub use handle::{
    next_handle_id, BufferHandle, DisplayHandle, FramebufferHandle, ImageHandle, PipelineHandle,
    RenderPassHandle, ResourceId, SamplerHandle, TargetId,
};
pub use pass::{FramebufferDescriptor, PassClearValues, PipelineDescriptor, RenderPassDescriptor};
pub use sampler::{AddressMode, FilterMode, SamplerDescriptor};
pub use texture::{TextureDescriptor, TextureFormat, TextureUsage};
