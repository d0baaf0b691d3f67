//! Render target rebuilds.

use std::sync::Arc;

use crate::command::CommandStream;
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::events::{EventChannel, Subscription};
use crate::frame::FrameContext;
use crate::resize::ResizeEvent;
use crate::retire::{RetiredResource, RetirementQueue};
use crate::types::{
    DisplayHandle, Extent2d, FramebufferDescriptor, SamplerDescriptor, SamplerHandle,
    ScissorRect, TextureDescriptor, TextureUsage, Viewport,
};

use super::{RenderTarget, RenderTargetConfig, SharedSampler, TargetState};

/// Why a rebuild request left the current target in place.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The requested extent has a zero dimension (e.g. minimized window).
    Degenerate(Extent2d),
    /// Creating one of the new target's objects failed.
    ConstructionFailed(GraphicsError),
}

/// Outcome of [`RenderTargetManager::rebuild`].
#[derive(Debug, Clone, PartialEq)]
pub enum RebuildStatus {
    /// A new target was published; the previous one was retired.
    Rebuilt {
        /// Generation of the new current target.
        generation: u64,
    },
    /// Nothing changed.
    Skipped(SkipReason),
}

impl RebuildStatus {
    /// Returns true if a new target was published.
    pub fn is_rebuilt(&self) -> bool {
        matches!(self, Self::Rebuilt { .. })
    }
}

/// Owns the current [`RenderTarget`] and replaces it on demand.
///
/// Consumers only ever see a fully built target through
/// [`current`](Self::current). A rebuild constructs the replacement
/// completely, swaps it in, and moves the old target into the
/// [`RetirementQueue`] as one unit, so frames still in flight keep using
/// valid objects.
///
/// # Rejections
///
/// After startup a rebuild never fails the frame loop: a degenerate extent
/// or a construction failure returns [`RebuildStatus::Skipped`] and the
/// current target stays untouched. Objects created by the failed attempt
/// were never referenced by the GPU and are destroyed immediately.
///
/// # Shutdown
///
/// Dropping the manager waits for the device to go idle and destroys the
/// current target. The sampler shared by all display registrations is
/// reference counted across target generations: it is destroyed together
/// with the last target that uses it, which may still be waiting in the
/// retirement queue. The manager and the queue can therefore be dropped in
/// either order.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use vista_graphics::backend::DummyBackend;
/// use vista_graphics::device::GraphicsDevice;
/// use vista_graphics::frame::FrameContext;
/// use vista_graphics::retire::RetirementQueue;
/// use vista_graphics::target::{RenderTargetConfig, RenderTargetManager};
/// use vista_graphics::types::Extent2d;
///
/// let backend = Arc::new(DummyBackend::new());
/// let device = GraphicsDevice::with_dummy(&backend);
/// let frames = FrameContext::new(2, 3);
///
/// let mut retirement = RetirementQueue::new(&device, &frames);
/// let mut targets = RenderTargetManager::new(
///     &device,
///     &frames,
///     RenderTargetConfig::default(),
///     Extent2d::new(800, 600),
/// )
/// .unwrap();
///
/// let status = targets.rebuild(Extent2d::new(1024, 768), &mut retirement);
/// assert!(status.is_rebuilt());
/// assert_eq!(retirement.pending_count(), 1);
/// ```
#[derive(Debug)]
pub struct RenderTargetManager {
    device: Arc<GraphicsDevice>,
    frames: FrameContext,
    config: RenderTargetConfig,
    sampler: SharedSampler,
    current: RenderTarget,
    resize_events: Option<Subscription<ResizeEvent>>,
    rebuild_count: u64,
    skipped_count: u64,
}

impl RenderTargetManager {
    /// Create the manager and build the first target.
    ///
    /// # Errors
    ///
    /// Any failure here is fatal: the configuration is unsupported, the
    /// extent is degenerate, or an object could not be created.
    pub fn new(
        device: &Arc<GraphicsDevice>,
        frames: &FrameContext,
        config: RenderTargetConfig,
        extent: Extent2d,
    ) -> Result<Self, GraphicsError> {
        config.validate(device.capabilities())?;
        if extent.is_degenerate() {
            return Err(GraphicsError::InvalidParameter(format!(
                "initial render target extent {extent} is degenerate"
            )));
        }

        let mut sampler = SharedSampler::new(device.create_sampler(
            &SamplerDescriptor::linear().with_label(format!("{}.sampler", config.label)),
        )?);

        let target = match Self::build(device, frames, &config, sampler.clone(), 1, extent) {
            Ok(target) => target,
            Err(e) => {
                if let Err(destroy_err) = sampler.release(device) {
                    log::error!("Failed to destroy {}: {destroy_err}", sampler.handle());
                }
                return Err(e);
            }
        };
        target.lifecycle.advance(TargetState::Current);

        log::info!(
            "Render target {:?} created: {extent}, {} images, {:?}/{:?}, {}x msaa",
            config.label,
            frames.image_count(),
            config.color_format,
            config.depth_format,
            config.sample_count
        );

        Ok(Self {
            device: Arc::clone(device),
            frames: *frames,
            config,
            sampler,
            current: target,
            resize_events: None,
            rebuild_count: 0,
            skipped_count: 0,
        })
    }

    fn build(
        device: &GraphicsDevice,
        frames: &FrameContext,
        config: &RenderTargetConfig,
        sampler: SharedSampler,
        generation: u64,
        extent: Extent2d,
    ) -> Result<RenderTarget, GraphicsError> {
        let render_pass = device.create_render_pass(&config.render_pass_descriptor())?;
        let mut target = RenderTarget::building(generation, extent, render_pass, sampler);

        if let Err(e) = Self::populate(device, frames, config, &mut target) {
            log::debug!(
                "Render target generation {generation} failed to build, cleaning up: {e}"
            );
            if let Err(cleanup_err) = target.destroy(device) {
                log::error!("Failed to clean up partial render target: {cleanup_err}");
            }
            return Err(e);
        }
        Ok(target)
    }

    fn populate(
        device: &GraphicsDevice,
        frames: &FrameContext,
        config: &RenderTargetConfig,
        target: &mut RenderTarget,
    ) -> Result<(), GraphicsError> {
        let extent = target.extent;
        let label = &config.label;
        let multisampled = config.is_multisampled();

        let color_usage = if multisampled {
            TextureUsage::RENDER_ATTACHMENT
        } else {
            TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING
        };

        for i in 0..frames.image_count() {
            let color = device.create_image(
                &TextureDescriptor::new_2d(extent, config.color_format, color_usage)
                    .with_sample_count(config.sample_count)
                    .with_label(format!("{label}.color[{i}]")),
            )?;
            target.color_images.push(color);

            let depth = device.create_image(
                &TextureDescriptor::new_2d(
                    extent,
                    config.depth_format,
                    TextureUsage::RENDER_ATTACHMENT,
                )
                .with_sample_count(config.sample_count)
                .with_label(format!("{label}.depth[{i}]")),
            )?;
            target.depth_images.push(depth);

            let mut attachments = vec![color, depth];
            let displayed = if multisampled {
                let resolve = device.create_image(
                    &TextureDescriptor::new_2d(
                        extent,
                        config.color_format,
                        TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
                    )
                    .with_label(format!("{label}.resolve[{i}]")),
                )?;
                target.resolve_images.push(resolve);
                attachments.push(resolve);
                resolve
            } else {
                color
            };

            let framebuffer = device.create_framebuffer(
                &FramebufferDescriptor::new(target.render_pass, attachments, extent)
                    .with_label(format!("{label}.framebuffer[{i}]")),
            )?;
            target.framebuffers.push(framebuffer);

            if config.register_display {
                let handle = device.register_display(target.sampler(), displayed)?;
                target.display_handles.push(handle);
            }
        }
        Ok(())
    }

    /// Build a target of `extent`, publish it and retire the previous one.
    ///
    /// Each successful call retires exactly one target, including repeated
    /// calls within a single tick and calls with the current extent.
    pub fn rebuild(&mut self, extent: Extent2d, retirement: &mut RetirementQueue) -> RebuildStatus {
        if extent.is_degenerate() {
            log::warn!("Skipping render target rebuild: degenerate extent {extent}");
            self.skipped_count += 1;
            return RebuildStatus::Skipped(SkipReason::Degenerate(extent));
        }

        let generation = self.current.generation() + 1;
        match Self::build(
            &self.device,
            &self.frames,
            &self.config,
            self.sampler.clone(),
            generation,
            extent,
        ) {
            Ok(target) => {
                target.lifecycle.advance(TargetState::Current);
                let previous = std::mem::replace(&mut self.current, target);
                previous.lifecycle.advance(TargetState::Retiring);
                log::debug!(
                    "Render target rebuilt: {} -> {extent} (generation {generation})",
                    previous.extent()
                );
                retirement.retire(RetiredResource::Target(previous));
                self.rebuild_count += 1;
                RebuildStatus::Rebuilt { generation }
            }
            Err(e) => {
                log::warn!("Skipping render target rebuild to {extent}: {e}");
                self.skipped_count += 1;
                RebuildStatus::Skipped(SkipReason::ConstructionFailed(e))
            }
        }
    }

    /// Receive resize requests from `channel`.
    pub fn subscribe(&mut self, channel: &EventChannel<ResizeEvent>) {
        self.resize_events = Some(channel.subscribe());
    }

    /// Apply pending resize events.
    ///
    /// All events received since the last call collapse into one rebuild to
    /// the most recent size. Returns `None` if nothing was pending or the
    /// manager is not subscribed.
    pub fn handle_resize_events(
        &mut self,
        retirement: &mut RetirementQueue,
    ) -> Option<RebuildStatus> {
        let event = self.resize_events.as_ref()?.latest()?;
        Some(self.rebuild(event.extent(), retirement))
    }

    /// Begin the scene pass for the stream's swapchain image.
    ///
    /// Sets viewport and scissor to the full target and clears with the
    /// configured values.
    pub fn begin_pass(&self, stream: &mut CommandStream) {
        let target = &self.current;
        let extent = target.extent();
        stream.begin_render_pass(
            target.render_pass(),
            target.framebuffer(stream.image_index()),
            extent,
            self.config.clear_values(),
        );
        stream.set_viewport(Viewport::from_extent(extent));
        stream.set_scissor(ScissorRect::from_extent(extent));
    }

    /// End the scene pass.
    pub fn end_pass(&self, stream: &mut CommandStream) {
        stream.end_render_pass();
    }

    /// The published target.
    pub fn current(&self) -> &RenderTarget {
        &self.current
    }

    /// Generation of the published target.
    pub fn generation(&self) -> u64 {
        self.current.generation()
    }

    /// Extent of the published target.
    pub fn extent(&self) -> Extent2d {
        self.current.extent()
    }

    /// UI handle of the published target's image for a swapchain image.
    pub fn display_handle(&self, image_index: u32) -> Option<DisplayHandle> {
        self.current
            .display_handles()
            .get(image_index as usize)
            .copied()
    }

    /// Sampler shared by all display registrations.
    pub fn sampler(&self) -> SamplerHandle {
        self.sampler.handle()
    }

    /// Target configuration.
    pub fn config(&self) -> &RenderTargetConfig {
        &self.config
    }

    /// Number of successful rebuilds.
    pub fn rebuild_count(&self) -> u64 {
        self.rebuild_count
    }

    /// Number of rejected rebuilds.
    pub fn skipped_count(&self) -> u64 {
        self.skipped_count
    }
}

impl Drop for RenderTargetManager {
    fn drop(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            log::error!("Failed to wait for device idle: {e}");
        }
        self.current.lifecycle.advance(TargetState::Retiring);
        if let Err(e) = self.current.destroy(&self.device) {
            log::error!("Failed to destroy render target: {e}");
        }
        if let Err(e) = self.sampler.release(&self.device) {
            log::error!("Failed to destroy {}: {e}", self.sampler.handle());
        }
    }
}
