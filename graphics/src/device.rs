//! Graphics device.
//!
//! The [`GraphicsDevice`] is the main interface for creating and destroying
//! GPU objects. It validates descriptors against the [`DeviceCapabilities`]
//! before forwarding to the backend, and is injected into every lifecycle
//! component as an `Arc<GraphicsDevice>`.

use std::sync::Arc;

use crate::backend::GpuBackend;
use crate::command::CommandStream;
use crate::display::DisplayRegistry;
use crate::error::GraphicsError;
use crate::types::{
    BufferDescriptor, BufferHandle, DisplayHandle, FramebufferDescriptor, FramebufferHandle,
    ImageHandle, PipelineDescriptor, PipelineHandle, RenderPassDescriptor, RenderPassHandle,
    SamplerDescriptor, SamplerHandle, TextureDescriptor, TextureFormat,
};

/// Capabilities of a graphics device.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceCapabilities {
    /// Maximum texture dimension.
    pub max_texture_dimension: u32,
    /// Maximum buffer size.
    pub max_buffer_size: u64,
    /// Maximum multisample count for render attachments.
    pub max_sample_count: u32,
    /// Formats usable as color attachments.
    pub color_formats: Vec<TextureFormat>,
    /// Formats usable as depth attachments.
    pub depth_formats: Vec<TextureFormat>,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            max_texture_dimension: 16384,
            max_buffer_size: 1 << 30, // 1 GB
            max_sample_count: 8,
            color_formats: vec![
                TextureFormat::Rgba8Unorm,
                TextureFormat::Rgba8UnormSrgb,
                TextureFormat::Bgra8Unorm,
                TextureFormat::Bgra8UnormSrgb,
                TextureFormat::Rgba16Float,
            ],
            depth_formats: vec![
                TextureFormat::Depth16Unorm,
                TextureFormat::Depth24PlusStencil8,
                TextureFormat::Depth32Float,
            ],
        }
    }
}

impl DeviceCapabilities {
    /// Set the maximum texture dimension.
    pub fn with_max_texture_dimension(mut self, max: u32) -> Self {
        self.max_texture_dimension = max;
        self
    }

    /// Set the maximum sample count.
    pub fn with_max_sample_count(mut self, max: u32) -> Self {
        self.max_sample_count = max;
        self
    }

    /// Replace the supported color formats.
    pub fn with_color_formats(mut self, formats: impl Into<Vec<TextureFormat>>) -> Self {
        self.color_formats = formats.into();
        self
    }

    /// Replace the supported depth formats.
    pub fn with_depth_formats(mut self, formats: impl Into<Vec<TextureFormat>>) -> Self {
        self.depth_formats = formats.into();
        self
    }

    /// Returns true if `format` can be used as a color attachment.
    pub fn supports_color_format(&self, format: TextureFormat) -> bool {
        !format.is_depth_stencil() && self.color_formats.contains(&format)
    }

    /// Returns true if `format` can be used as a depth attachment.
    pub fn supports_depth_format(&self, format: TextureFormat) -> bool {
        format.is_depth_stencil() && self.depth_formats.contains(&format)
    }

    /// Returns true if attachments may use `count` samples.
    pub fn supports_sample_count(&self, count: u32) -> bool {
        count.is_power_of_two() && count <= self.max_sample_count
    }
}

/// A graphics device for creating GPU objects.
///
/// # Thread Safety
///
/// `GraphicsDevice` is `Send + Sync` and can be shared across threads. The
/// lifecycle components themselves are driven from a single recording thread.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use vista_graphics::backend::DummyBackend;
/// use vista_graphics::device::GraphicsDevice;
/// use vista_graphics::types::{BufferDescriptor, BufferUsage};
///
/// let backend = Arc::new(DummyBackend::new());
/// let device = GraphicsDevice::with_dummy(&backend);
/// let buffer = device
///     .create_buffer(&BufferDescriptor::new(256, BufferUsage::UNIFORM))
///     .unwrap();
/// assert!(backend.is_live(buffer));
/// ```
#[derive(Debug)]
pub struct GraphicsDevice {
    backend: Arc<dyn GpuBackend>,
    display: Arc<dyn DisplayRegistry>,
    capabilities: DeviceCapabilities,
}

impl GraphicsDevice {
    /// Create a device over a backend and a display registry.
    pub fn new(backend: Arc<dyn GpuBackend>, display: Arc<dyn DisplayRegistry>) -> Self {
        let capabilities = backend.capabilities();
        log::info!(
            "GraphicsDevice: using {} (max texture {}, max samples {})",
            backend.name(),
            capabilities.max_texture_dimension,
            capabilities.max_sample_count
        );
        Self {
            backend,
            display,
            capabilities,
        }
    }

    /// Create a device backed by a [`DummyBackend`](crate::backend::DummyBackend),
    /// which also acts as the display registry.
    pub fn with_dummy(backend: &Arc<crate::backend::DummyBackend>) -> Arc<Self> {
        let gpu: Arc<dyn GpuBackend> = Arc::clone(backend) as Arc<dyn GpuBackend>;
        let display: Arc<dyn DisplayRegistry> = Arc::clone(backend) as Arc<dyn DisplayRegistry>;
        Arc::new(Self::new(gpu, display))
    }

    /// Get the backend name.
    pub fn name(&self) -> &'static str {
        self.backend.name()
    }

    /// Get the device capabilities.
    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    /// Create a GPU buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer size is zero, exceeds device limits or
    /// allocation fails.
    pub fn create_buffer(
        &self,
        descriptor: &BufferDescriptor,
    ) -> Result<BufferHandle, GraphicsError> {
        if descriptor.size > self.capabilities.max_buffer_size {
            return Err(GraphicsError::InvalidParameter(format!(
                "buffer size {} exceeds maximum {}",
                descriptor.size, self.capabilities.max_buffer_size
            )));
        }

        if descriptor.size == 0 {
            return Err(GraphicsError::InvalidParameter(
                "buffer size cannot be zero".to_string(),
            ));
        }

        let buffer = self.backend.create_buffer(descriptor)?;
        log::trace!(
            "GraphicsDevice: created {buffer} {:?}, size={}",
            descriptor.label,
            descriptor.size
        );
        Ok(buffer)
    }

    /// Write bytes into a host-visible buffer.
    pub fn write_buffer(
        &self,
        buffer: BufferHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        self.backend.write_buffer(buffer, offset, data)
    }

    /// Destroy a buffer.
    pub fn destroy_buffer(&self, buffer: BufferHandle) -> Result<(), GraphicsError> {
        log::trace!("GraphicsDevice: destroying {buffer}");
        self.backend.destroy_buffer(buffer)
    }

    /// Create a GPU image with its default view.
    ///
    /// # Errors
    ///
    /// Returns an error if the dimensions are zero or exceed device limits,
    /// the sample count is unsupported, or allocation fails.
    pub fn create_image(&self, descriptor: &TextureDescriptor) -> Result<ImageHandle, GraphicsError> {
        let max_dim = self.capabilities.max_texture_dimension;
        if descriptor.size.width > max_dim || descriptor.size.height > max_dim {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture dimension {} exceeds maximum {max_dim}",
                descriptor.size
            )));
        }

        if descriptor.size.is_degenerate() {
            return Err(GraphicsError::InvalidParameter(
                "texture dimensions cannot be zero".to_string(),
            ));
        }

        if !self.capabilities.supports_sample_count(descriptor.sample_count) {
            return Err(GraphicsError::FeatureNotSupported(format!(
                "sample count {}",
                descriptor.sample_count
            )));
        }

        let image = self.backend.create_image(descriptor)?;
        log::trace!(
            "GraphicsDevice: created {image} {:?}, size={}, format={:?}",
            descriptor.label,
            descriptor.size,
            descriptor.format
        );
        Ok(image)
    }

    /// Destroy an image.
    pub fn destroy_image(&self, image: ImageHandle) -> Result<(), GraphicsError> {
        log::trace!("GraphicsDevice: destroying {image}");
        self.backend.destroy_image(image)
    }

    /// Create a texture sampler.
    pub fn create_sampler(
        &self,
        descriptor: &SamplerDescriptor,
    ) -> Result<SamplerHandle, GraphicsError> {
        let sampler = self.backend.create_sampler(descriptor)?;
        log::trace!("GraphicsDevice: created {sampler} {:?}", descriptor.label);
        Ok(sampler)
    }

    /// Destroy a sampler.
    pub fn destroy_sampler(&self, sampler: SamplerHandle) -> Result<(), GraphicsError> {
        log::trace!("GraphicsDevice: destroying {sampler}");
        self.backend.destroy_sampler(sampler)
    }

    /// Create a render pass.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::FeatureNotSupported`] if a format or the
    /// sample count is not supported by the device.
    pub fn create_render_pass(
        &self,
        descriptor: &RenderPassDescriptor,
    ) -> Result<RenderPassHandle, GraphicsError> {
        if !self.capabilities.supports_color_format(descriptor.color_format) {
            return Err(GraphicsError::FeatureNotSupported(format!(
                "color attachment format {:?}",
                descriptor.color_format
            )));
        }
        if !self.capabilities.supports_depth_format(descriptor.depth_format) {
            return Err(GraphicsError::FeatureNotSupported(format!(
                "depth attachment format {:?}",
                descriptor.depth_format
            )));
        }
        if !self.capabilities.supports_sample_count(descriptor.sample_count) {
            return Err(GraphicsError::FeatureNotSupported(format!(
                "sample count {}",
                descriptor.sample_count
            )));
        }

        let render_pass = self.backend.create_render_pass(descriptor)?;
        log::trace!(
            "GraphicsDevice: created {render_pass} {:?}",
            descriptor.label
        );
        Ok(render_pass)
    }

    /// Destroy a render pass.
    pub fn destroy_render_pass(&self, render_pass: RenderPassHandle) -> Result<(), GraphicsError> {
        log::trace!("GraphicsDevice: destroying {render_pass}");
        self.backend.destroy_render_pass(render_pass)
    }

    /// Create a framebuffer.
    pub fn create_framebuffer(
        &self,
        descriptor: &FramebufferDescriptor,
    ) -> Result<FramebufferHandle, GraphicsError> {
        if descriptor.attachments.is_empty() {
            return Err(GraphicsError::InvalidParameter(
                "framebuffer needs at least one attachment".to_string(),
            ));
        }
        if descriptor.extent.is_degenerate() {
            return Err(GraphicsError::InvalidParameter(
                "framebuffer dimensions cannot be zero".to_string(),
            ));
        }

        let framebuffer = self.backend.create_framebuffer(descriptor)?;
        log::trace!(
            "GraphicsDevice: created {framebuffer} {:?}, {} attachments",
            descriptor.label,
            descriptor.attachments.len()
        );
        Ok(framebuffer)
    }

    /// Destroy a framebuffer.
    pub fn destroy_framebuffer(&self, framebuffer: FramebufferHandle) -> Result<(), GraphicsError> {
        log::trace!("GraphicsDevice: destroying {framebuffer}");
        self.backend.destroy_framebuffer(framebuffer)
    }

    /// Create a graphics pipeline.
    pub fn create_pipeline(
        &self,
        descriptor: &PipelineDescriptor,
    ) -> Result<PipelineHandle, GraphicsError> {
        let pipeline = self.backend.create_pipeline(descriptor)?;
        log::trace!(
            "GraphicsDevice: created {pipeline} {:?} (shader {:?})",
            descriptor.label,
            descriptor.shader
        );
        Ok(pipeline)
    }

    /// Destroy a graphics pipeline.
    pub fn destroy_pipeline(&self, pipeline: PipelineHandle) -> Result<(), GraphicsError> {
        log::trace!("GraphicsDevice: destroying {pipeline}");
        self.backend.destroy_pipeline(pipeline)
    }

    /// Register an image with the UI layer.
    pub fn register_display(
        &self,
        sampler: SamplerHandle,
        image: ImageHandle,
    ) -> Result<DisplayHandle, GraphicsError> {
        let handle = self.display.register_texture(sampler, image)?;
        log::trace!("GraphicsDevice: registered {image} as {handle}");
        Ok(handle)
    }

    /// Remove a UI registration.
    pub fn unregister_display(&self, handle: DisplayHandle) -> Result<(), GraphicsError> {
        log::trace!("GraphicsDevice: unregistering {handle}");
        self.display.unregister_texture(handle)
    }

    /// Number of swapchain images.
    pub fn swapchain_image_count(&self) -> u32 {
        self.backend.swapchain_image_count()
    }

    /// Acquire the next swapchain image, or `None` if the surface is unavailable.
    pub fn acquire_image(&self) -> Result<Option<u32>, GraphicsError> {
        self.backend.acquire_image()
    }

    /// Submit a finished command stream.
    ///
    /// # Panics
    ///
    /// Panics if the stream still has an open render pass.
    pub fn submit(&self, commands: CommandStream) -> Result<(), GraphicsError> {
        assert!(
            !commands.is_in_pass(),
            "submitted a command stream with an open render pass"
        );
        log::trace!(
            "GraphicsDevice: submitting {} commands ({}, image {})",
            commands.len(),
            commands.slot(),
            commands.image_index()
        );
        self.backend.submit(commands)
    }

    /// Present a swapchain image.
    pub fn present(&self, image_index: u32) -> Result<(), GraphicsError> {
        self.backend.present(image_index)
    }

    /// Block until the GPU has finished all submitted work.
    pub fn wait_idle(&self) -> Result<(), GraphicsError> {
        log::trace!("GraphicsDevice: waiting for idle");
        self.backend.wait_idle()
    }
}

static_assertions::assert_impl_all!(GraphicsDevice: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use crate::types::{BufferUsage, Extent2d, TextureUsage};

    fn device() -> (Arc<DummyBackend>, Arc<GraphicsDevice>) {
        let backend = Arc::new(DummyBackend::new());
        let device = GraphicsDevice::with_dummy(&backend);
        (backend, device)
    }

    #[test]
    fn test_create_buffer() {
        let (backend, device) = device();
        let buffer = device
            .create_buffer(&BufferDescriptor::new(1024, BufferUsage::UNIFORM))
            .unwrap();
        assert!(backend.is_live(buffer));
    }

    #[test]
    fn test_create_buffer_zero_size() {
        let (_backend, device) = device();
        let result = device.create_buffer(&BufferDescriptor::new(0, BufferUsage::UNIFORM));
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
    }

    #[test]
    fn test_create_image_too_large() {
        let (_backend, device) = device();
        let result = device.create_image(&TextureDescriptor::new_2d(
            Extent2d::new(100_000, 16),
            TextureFormat::Rgba8Unorm,
            TextureUsage::RENDER_ATTACHMENT,
        ));
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
    }

    #[test]
    fn test_unsupported_depth_format() {
        let backend = Arc::new(DummyBackend::new().with_capabilities(
            DeviceCapabilities::default().with_depth_formats([TextureFormat::Depth16Unorm]),
        ));
        let device = GraphicsDevice::with_dummy(&backend);
        let result = device.create_render_pass(&RenderPassDescriptor::new(
            TextureFormat::Rgba8Unorm,
            TextureFormat::Depth32Float,
        ));
        assert!(matches!(result, Err(GraphicsError::FeatureNotSupported(_))));
    }

    #[test]
    fn test_sample_count_support() {
        let caps = DeviceCapabilities::default().with_max_sample_count(4);
        assert!(caps.supports_sample_count(1));
        assert!(caps.supports_sample_count(4));
        assert!(!caps.supports_sample_count(3));
        assert!(!caps.supports_sample_count(8));
    }
}
