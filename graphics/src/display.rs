//! Registration of render target images with the UI layer.
//!
//! The UI samples render target images to show them inside panels. Each
//! registration yields a [`DisplayHandle`] that stays valid until it is
//! unregistered. A registration must be removed before its backing image is
//! destroyed.

use crate::error::GraphicsError;
use crate::types::{DisplayHandle, ImageHandle, SamplerHandle};

/// A UI layer that can display GPU images.
pub trait DisplayRegistry: Send + Sync + std::fmt::Debug {
    /// Register an image for display, sampled with `sampler`.
    fn register_texture(
        &self,
        sampler: SamplerHandle,
        image: ImageHandle,
    ) -> Result<DisplayHandle, GraphicsError>;

    /// Remove a registration.
    fn unregister_texture(&self, handle: DisplayHandle) -> Result<(), GraphicsError>;
}
