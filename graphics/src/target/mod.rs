//! Render targets and their rebuild lifecycle.
//!
//! A [`RenderTarget`] bundles everything needed to render a scene into
//! offscreen images: one render pass plus, per swapchain image, a color image,
//! a depth image, an optional resolve image, a framebuffer and an optional
//! display registration. The [`RenderTargetManager`] owns the current target
//! and replaces it on resize.
//!
//! # Lifecycle
//!
//! ```text
//! Building ──► Current ──► Retiring ──► Destroyed
//!     │                                     ▲
//!     └──────────── (build failed) ─────────┘
//! ```
//!
//! Any other transition is a bug and panics.

mod config;
mod manager;

pub use config::RenderTargetConfig;
pub use manager::{RebuildStatus, RenderTargetManager, SkipReason};

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::types::{
    next_handle_id, DisplayHandle, Extent2d, FramebufferHandle, ImageHandle, RenderPassHandle,
    SamplerHandle, TargetId,
};

/// State of a render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetState {
    /// Sub-resources are being created; not visible to any consumer.
    Building,
    /// Published; recorded against by new frames.
    Current,
    /// Replaced; waiting in the retirement queue.
    Retiring,
    /// All sub-resources destroyed.
    Destroyed,
}

impl TargetState {
    /// Returns true if moving from `self` to `next` is allowed.
    pub fn can_advance_to(self, next: TargetState) -> bool {
        matches!(
            (self, next),
            (Self::Building, Self::Current)
                | (Self::Building, Self::Destroyed)
                | (Self::Current, Self::Retiring)
                | (Self::Retiring, Self::Destroyed)
        )
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Building => "building",
            Self::Current => "current",
            Self::Retiring => "retiring",
            Self::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}

/// Shared view of a render target's state.
///
/// Clones observe the same state, so the state of a target can still be
/// inspected after the target itself moved into the retirement queue.
#[derive(Debug, Clone)]
pub struct TargetLifecycle(Arc<Mutex<TargetState>>);

impl TargetLifecycle {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(TargetState::Building)))
    }

    /// Current state.
    pub fn state(&self) -> TargetState {
        *self.0.lock()
    }

    fn advance(&self, next: TargetState) {
        let mut state = self.0.lock();
        assert!(
            state.can_advance_to(next),
            "illegal render target transition {} -> {next}",
            *state
        );
        *state = next;
    }
}

/// Sampler shared by the display registrations of every target generation.
///
/// The manager and each target hold a reference. Whichever holder releases
/// the last reference destroys the sampler, so it outlives every retired
/// target whose registrations still sample through it.
#[derive(Debug, Clone)]
pub(crate) struct SharedSampler {
    handle: SamplerHandle,
    holder: Option<Arc<()>>,
}

impl SharedSampler {
    pub(crate) fn new(handle: SamplerHandle) -> Self {
        Self {
            handle,
            holder: Some(Arc::new(())),
        }
    }

    pub(crate) fn handle(&self) -> SamplerHandle {
        self.handle
    }

    /// Give up this reference. Destroys the sampler if it was the last one.
    ///
    /// Releasing twice is a no-op.
    pub(crate) fn release(&mut self, device: &GraphicsDevice) -> Result<(), GraphicsError> {
        match self.holder.take().and_then(Arc::into_inner) {
            Some(()) => {
                log::debug!(
                    "Last display sampler reference released, destroying {}",
                    self.handle
                );
                device.destroy_sampler(self.handle)
            }
            None => Ok(()),
        }
    }
}

/// The GPU objects of one render target generation.
#[derive(Debug)]
pub struct RenderTarget {
    id: TargetId,
    generation: u64,
    extent: Extent2d,
    render_pass: RenderPassHandle,
    color_images: Vec<ImageHandle>,
    depth_images: Vec<ImageHandle>,
    resolve_images: Vec<ImageHandle>,
    framebuffers: Vec<FramebufferHandle>,
    display_handles: Vec<DisplayHandle>,
    sampler: SharedSampler,
    lifecycle: TargetLifecycle,
}

impl RenderTarget {
    fn building(
        generation: u64,
        extent: Extent2d,
        render_pass: RenderPassHandle,
        sampler: SharedSampler,
    ) -> Self {
        Self {
            id: TargetId::from_raw(next_handle_id()),
            generation,
            extent,
            render_pass,
            color_images: Vec::new(),
            depth_images: Vec::new(),
            resolve_images: Vec::new(),
            framebuffers: Vec::new(),
            display_handles: Vec::new(),
            sampler,
            lifecycle: TargetLifecycle::new(),
        }
    }

    /// Identity of this target.
    pub fn id(&self) -> TargetId {
        self.id
    }

    /// Rebuild generation, starting at 1 for the target created at startup.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Size of every attachment.
    pub fn extent(&self) -> Extent2d {
        self.extent
    }

    /// Render pass shared by all framebuffers.
    pub fn render_pass(&self) -> RenderPassHandle {
        self.render_pass
    }

    /// Per-image color attachments.
    pub fn color_images(&self) -> &[ImageHandle] {
        &self.color_images
    }

    /// Per-image depth attachments.
    pub fn depth_images(&self) -> &[ImageHandle] {
        &self.depth_images
    }

    /// Per-image resolve attachments (empty without multisampling).
    pub fn resolve_images(&self) -> &[ImageHandle] {
        &self.resolve_images
    }

    /// Per-image framebuffers.
    pub fn framebuffers(&self) -> &[FramebufferHandle] {
        &self.framebuffers
    }

    /// Per-image display registrations (empty if not registered for display).
    pub fn display_handles(&self) -> &[DisplayHandle] {
        &self.display_handles
    }

    /// Sampler the display registrations use.
    pub fn sampler(&self) -> SamplerHandle {
        self.sampler.handle()
    }

    /// Framebuffer for a swapchain image.
    ///
    /// # Panics
    ///
    /// Panics if `image_index` is out of range.
    pub fn framebuffer(&self, image_index: u32) -> FramebufferHandle {
        let index = image_index as usize;
        assert!(
            index < self.framebuffers.len(),
            "image index {image_index} out of range ({} framebuffers)",
            self.framebuffers.len()
        );
        self.framebuffers[index]
    }

    /// Number of swapchain images covered.
    pub fn image_count(&self) -> usize {
        self.framebuffers.len()
    }

    /// Lifecycle state.
    pub fn state(&self) -> TargetState {
        self.lifecycle.state()
    }

    /// Shared handle to the lifecycle state.
    pub fn lifecycle(&self) -> TargetLifecycle {
        self.lifecycle.clone()
    }

    /// Destroy every sub-resource.
    ///
    /// Display registrations are removed first, then framebuffers, the render
    /// pass and finally the images, so nothing is destroyed while something
    /// else still refers to it. The target's sampler reference goes last and
    /// destroys the shared sampler if no other holder remains. Teardown
    /// continues past failures and reports the first one.
    pub(crate) fn destroy(&mut self, device: &GraphicsDevice) -> Result<(), GraphicsError> {
        self.lifecycle.advance(TargetState::Destroyed);
        log::debug!(
            "Destroying render target {} (generation {}, {})",
            self.id,
            self.generation,
            self.extent
        );

        let mut first_error: Option<GraphicsError> = None;
        let mut record = |result: Result<(), GraphicsError>| {
            if let Err(e) = result {
                log::error!("Render target teardown failed: {e}");
                first_error.get_or_insert(e);
            }
        };

        for handle in self.display_handles.drain(..) {
            record(device.unregister_display(handle));
        }
        for framebuffer in self.framebuffers.drain(..) {
            record(device.destroy_framebuffer(framebuffer));
        }
        record(device.destroy_render_pass(self.render_pass));
        for image in self
            .color_images
            .drain(..)
            .chain(self.depth_images.drain(..))
            .chain(self.resolve_images.drain(..))
        {
            record(device.destroy_image(image));
        }
        record(self.sampler.release(device));

        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for RenderTarget {
    fn drop(&mut self) {
        let state = self.lifecycle.state();
        if state != TargetState::Destroyed {
            log::warn!(
                "Render target {} dropped while {state}, its GPU objects leak",
                self.id
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_transitions() {
        let lifecycle = TargetLifecycle::new();
        assert_eq!(lifecycle.state(), TargetState::Building);
        lifecycle.advance(TargetState::Current);
        lifecycle.advance(TargetState::Retiring);
        lifecycle.advance(TargetState::Destroyed);
        assert_eq!(lifecycle.state(), TargetState::Destroyed);
    }

    #[test]
    fn test_failed_build_goes_straight_to_destroyed() {
        assert!(TargetState::Building.can_advance_to(TargetState::Destroyed));
        assert!(!TargetState::Current.can_advance_to(TargetState::Destroyed));
        assert!(!TargetState::Retiring.can_advance_to(TargetState::Current));
    }

    #[test]
    #[should_panic(expected = "illegal render target transition current -> building")]
    fn test_illegal_transition_panics() {
        let lifecycle = TargetLifecycle::new();
        lifecycle.advance(TargetState::Current);
        lifecycle.advance(TargetState::Building);
    }

    #[test]
    fn test_last_sampler_reference_destroys() {
        use crate::backend::DummyBackend;
        use crate::types::SamplerDescriptor;

        let backend = Arc::new(DummyBackend::new());
        let device = GraphicsDevice::with_dummy(&backend);
        let handle = device.create_sampler(&SamplerDescriptor::linear()).unwrap();

        let mut first = SharedSampler::new(handle);
        let mut second = first.clone();
        first.release(&device).unwrap();
        first.release(&device).unwrap();
        assert!(backend.is_live(handle));

        second.release(&device).unwrap();
        assert!(!backend.is_live(handle));
        assert_eq!(backend.destroy_count(handle), 1);
    }

    #[test]
    fn test_clones_share_state() {
        let lifecycle = TargetLifecycle::new();
        let observer = lifecycle.clone();
        lifecycle.advance(TargetState::Current);
        assert_eq!(observer.state(), TargetState::Current);
    }
}
