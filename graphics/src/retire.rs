//! Deferred destruction of GPU objects.
//!
//! GPU commands execute asynchronously: the GPU may still be reading an object
//! several frames after the CPU stopped using it. Objects that are replaced
//! while frames are in flight are therefore moved into a [`RetirementQueue`]
//! instead of being destroyed, and only destroyed once every frame that could
//! reference them has completed.
//!
//! # Countdown
//!
//! ```text
//! retire(T1)        countdown = N + 1
//! tick()            countdown = N
//! ...
//! tick()            countdown = 0  ──►  destroy(T1), removed
//! ```
//!
//! The queue is pure garbage collection: nothing is ever handed back out.

use std::sync::Arc;

use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::frame::FrameContext;
use crate::target::RenderTarget;
use crate::types::{
    BufferHandle, DisplayHandle, FramebufferHandle, ImageHandle, PipelineHandle,
    RenderPassHandle, ResourceId, SamplerHandle,
};

/// A GPU object pending destruction.
#[derive(Debug)]
pub enum RetiredResource {
    Buffer(BufferHandle),
    Image(ImageHandle),
    Sampler(SamplerHandle),
    RenderPass(RenderPassHandle),
    Framebuffer(FramebufferHandle),
    Pipeline(PipelineHandle),
    Display(DisplayHandle),
    /// A whole render target, destroyed as one unit.
    Target(RenderTarget),
}

impl RetiredResource {
    /// Identity used to detect double retirement.
    pub fn id(&self) -> ResourceId {
        match self {
            Self::Buffer(h) => (*h).into(),
            Self::Image(h) => (*h).into(),
            Self::Sampler(h) => (*h).into(),
            Self::RenderPass(h) => (*h).into(),
            Self::Framebuffer(h) => (*h).into(),
            Self::Pipeline(h) => (*h).into(),
            Self::Display(h) => (*h).into(),
            Self::Target(target) => target.id().into(),
        }
    }

    /// Destroy the object now.
    ///
    /// The caller must ensure the GPU is no longer using it.
    pub fn destroy(self, device: &GraphicsDevice) -> Result<(), GraphicsError> {
        match self {
            Self::Buffer(h) => device.destroy_buffer(h),
            Self::Image(h) => device.destroy_image(h),
            Self::Sampler(h) => device.destroy_sampler(h),
            Self::RenderPass(h) => device.destroy_render_pass(h),
            Self::Framebuffer(h) => device.destroy_framebuffer(h),
            Self::Pipeline(h) => device.destroy_pipeline(h),
            Self::Display(h) => device.unregister_display(h),
            Self::Target(mut target) => target.destroy(device),
        }
    }
}

/// A retired object and the number of ticks it still has to survive.
#[derive(Debug)]
pub struct RetiredItem {
    /// The object.
    pub resource: RetiredResource,
    /// Remaining ticks before destruction.
    pub countdown: u32,
}

/// Holds replaced GPU objects until no in-flight frame can reference them.
///
/// # Tick discipline
///
/// [`tick`](Self::tick) must be called exactly once per valid frame, after the
/// frame's commands were recorded. Ticks are not called for frames that were
/// skipped because the surface was unavailable.
///
/// # Example
///
/// ```ignore
/// let mut retirement = RetirementQueue::new(&device, &frames);
///
/// loop {
///     let tick = pipeline.begin_frame()?;
///     // ... record, possibly retiring replaced objects ...
///     retirement.tick()?;
///     device.submit(stream)?;
/// }
/// ```
#[derive(Debug)]
pub struct RetirementQueue {
    device: Arc<GraphicsDevice>,
    items: Vec<RetiredItem>,
    lifetime: u32,
    tick_count: u64,
    destroyed_count: u64,
}

impl RetirementQueue {
    /// Create an empty queue. Retired objects survive `N + 1` ticks.
    pub fn new(device: &Arc<GraphicsDevice>, frames: &FrameContext) -> Self {
        Self {
            device: Arc::clone(device),
            items: Vec::new(),
            lifetime: frames.retirement_lifetime(),
            tick_count: 0,
            destroyed_count: 0,
        }
    }

    /// Take ownership of an object and schedule its destruction.
    ///
    /// # Panics
    ///
    /// Panics if the same object is already pending.
    pub fn retire(&mut self, resource: RetiredResource) {
        let id = resource.id();
        assert!(
            !self.items.iter().any(|item| item.resource.id() == id),
            "{id} retired twice"
        );
        log::debug!("Retiring {id} (countdown {})", self.lifetime);
        self.items.push(RetiredItem {
            resource,
            countdown: self.lifetime,
        });
    }

    /// Advance by one frame and destroy every object whose countdown reached zero.
    ///
    /// Returns the number of destroyed objects.
    ///
    /// # Errors
    ///
    /// Returns the first destroy failure. All expired objects are still
    /// attempted. A destroy failure means GPU state can no longer be trusted
    /// and should be treated as fatal.
    pub fn tick(&mut self) -> Result<usize, GraphicsError> {
        self.tick_count += 1;

        let mut expired = Vec::new();
        let mut pending = Vec::with_capacity(self.items.len());
        for mut item in self.items.drain(..) {
            item.countdown -= 1;
            if item.countdown == 0 {
                expired.push(item.resource);
            } else {
                pending.push(item);
            }
        }
        self.items = pending;

        let count = expired.len();
        self.destroy_all(expired)?;
        if count > 0 {
            log::debug!(
                "Retirement tick {}: destroyed {count}, {} pending",
                self.tick_count,
                self.items.len()
            );
        }
        Ok(count)
    }

    /// Destroy everything regardless of countdown.
    ///
    /// Only valid once the device is idle, e.g. after
    /// [`GraphicsDevice::wait_idle`] at shutdown.
    pub fn flush_all(&mut self) -> Result<usize, GraphicsError> {
        let expired: Vec<RetiredResource> =
            self.items.drain(..).map(|item| item.resource).collect();
        let count = expired.len();
        self.destroy_all(expired)?;
        if count > 0 {
            log::debug!("Flushed {count} retired objects");
        }
        Ok(count)
    }

    fn destroy_all(&mut self, resources: Vec<RetiredResource>) -> Result<(), GraphicsError> {
        let mut first_error = None;
        for resource in resources {
            let id = resource.id();
            match resource.destroy(&self.device) {
                Ok(()) => {
                    self.destroyed_count += 1;
                    log::trace!("Destroyed retired {id}");
                }
                Err(e) => {
                    log::error!("Failed to destroy retired {id}: {e}");
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Number of objects waiting for destruction.
    pub fn pending_count(&self) -> usize {
        self.items.len()
    }

    /// Returns true if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Remaining countdown of every pending object, in retirement order.
    pub fn countdowns(&self) -> Vec<(ResourceId, u32)> {
        self.items
            .iter()
            .map(|item| (item.resource.id(), item.countdown))
            .collect()
    }

    /// Remaining countdown of one pending object.
    pub fn countdown_of(&self, id: impl Into<ResourceId>) -> Option<u32> {
        let id = id.into();
        self.items
            .iter()
            .find(|item| item.resource.id() == id)
            .map(|item| item.countdown)
    }

    /// Number of ticks processed.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Number of objects destroyed so far.
    pub fn destroyed_count(&self) -> u64 {
        self.destroyed_count
    }

    /// Countdown given to newly retired objects (`N + 1`).
    pub fn lifetime(&self) -> u32 {
        self.lifetime
    }
}

impl Drop for RetirementQueue {
    fn drop(&mut self) {
        if self.items.is_empty() {
            return;
        }
        log::debug!(
            "RetirementQueue dropped with {} pending objects, waiting for idle",
            self.items.len()
        );
        if let Err(e) = self.device.wait_idle() {
            log::error!("Failed to wait for device idle: {e}");
        }
        if let Err(e) = self.flush_all() {
            log::error!("Failed to flush retirement queue: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use crate::types::{BufferDescriptor, BufferUsage};

    fn setup(n: usize) -> (Arc<DummyBackend>, Arc<GraphicsDevice>, RetirementQueue) {
        let backend = Arc::new(DummyBackend::new().with_frames_in_flight(n));
        let device = GraphicsDevice::with_dummy(&backend);
        let queue = RetirementQueue::new(&device, &FrameContext::new(n, 3));
        (backend, device, queue)
    }

    fn buffer(device: &GraphicsDevice) -> BufferHandle {
        device
            .create_buffer(&BufferDescriptor::new(16, BufferUsage::UNIFORM))
            .unwrap()
    }

    #[test]
    fn test_countdown_starts_at_n_plus_one() {
        let (_backend, device, mut queue) = setup(2);
        let buffer = buffer(&device);
        queue.retire(RetiredResource::Buffer(buffer));
        assert_eq!(queue.countdown_of(buffer), Some(3));
        assert_eq!(queue.lifetime(), 3);
    }

    #[test]
    fn test_destroyed_after_lifetime_ticks() {
        let (backend, device, mut queue) = setup(2);
        let buffer = buffer(&device);
        queue.retire(RetiredResource::Buffer(buffer));

        assert_eq!(queue.tick().unwrap(), 0);
        assert_eq!(queue.tick().unwrap(), 0);
        assert!(backend.is_live(buffer));
        assert_eq!(queue.tick().unwrap(), 1);
        assert!(!backend.is_live(buffer));
        assert!(queue.is_empty());
    }

    #[test]
    #[should_panic(expected = "retired twice")]
    fn test_double_retire_panics() {
        let (_backend, device, mut queue) = setup(2);
        let buffer = buffer(&device);
        queue.retire(RetiredResource::Buffer(buffer));
        queue.retire(RetiredResource::Buffer(buffer));
    }

    #[test]
    fn test_destroy_failure_is_reported() {
        let (backend, device, mut queue) = setup(1);
        let failing = buffer(&device);
        let healthy = buffer(&device);
        backend.fail_destroy(failing);
        queue.retire(RetiredResource::Buffer(failing));
        queue.retire(RetiredResource::Buffer(healthy));

        queue.tick().unwrap();
        let result = queue.tick();
        assert!(matches!(result, Err(GraphicsError::DestroyFailed(_))));
        assert!(!backend.is_live(healthy));
    }

    #[test]
    fn test_flush_all() {
        let (backend, device, mut queue) = setup(3);
        let buffers: Vec<_> = (0..3).map(|_| buffer(&device)).collect();
        for b in &buffers {
            queue.retire(RetiredResource::Buffer(*b));
        }
        device.wait_idle().unwrap();
        assert_eq!(queue.flush_all().unwrap(), 3);
        assert!(buffers.iter().all(|b| !backend.is_live(*b)));
    }

    #[test]
    fn test_drop_flushes() {
        let (backend, device, mut queue) = setup(2);
        let buffer = buffer(&device);
        queue.retire(RetiredResource::Buffer(buffer));
        drop(queue);
        assert_eq!(backend.destroy_count(buffer), 1);
    }
}
