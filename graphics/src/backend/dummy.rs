//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't perform actual GPU operations. Instead it keeps an
//! ordered journal of everything it was asked to do and models the GPU's view
//! of in-flight work, so tests can check lifetime rules without hardware:
//!
//! - Destroying or writing to an object referenced by a submission that may
//!   still be executing is recorded as a [`DummyEvent::Hazard`].
//! - Destroying an image that is still attached to a live framebuffer or
//!   registered for display is a hazard as well.
//! - Destroying an object that is not live fails with
//!   [`GraphicsError::DestroyFailed`].
//!
//! Failures can be injected for image creation, buffer writes, individual
//! destroys and swapchain acquisition.

use std::collections::{HashMap, HashSet, VecDeque};

use parking_lot::Mutex;

use crate::command::{Command, CommandStream};
use crate::device::DeviceCapabilities;
use crate::display::DisplayRegistry;
use crate::error::GraphicsError;
use crate::types::{
    next_handle_id, BufferDescriptor, BufferHandle, DisplayHandle, FramebufferDescriptor,
    FramebufferHandle, ImageHandle, PipelineDescriptor, PipelineHandle, RenderPassDescriptor,
    RenderPassHandle, ResourceId, SamplerDescriptor, SamplerHandle, TextureDescriptor,
};

use super::GpuBackend;

/// An entry in the [`DummyBackend`] journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DummyEvent {
    /// A GPU object was created.
    Created(ResourceId),
    /// A GPU object was destroyed.
    Destroyed(ResourceId),
    /// Bytes were written into a buffer.
    BufferWritten { buffer: BufferHandle, bytes: Vec<u8> },
    /// An image was registered for display.
    DisplayRegistered {
        handle: DisplayHandle,
        image: ImageHandle,
    },
    /// A display registration was removed.
    DisplayUnregistered(DisplayHandle),
    /// A command stream was submitted.
    Submitted {
        slot: usize,
        image_index: u32,
        commands: usize,
    },
    /// A swapchain image was presented.
    Presented(u32),
    /// The device was waited on until idle.
    WaitIdle,
    /// A lifetime rule was broken.
    Hazard { resource: ResourceId, reason: String },
}

#[derive(Debug)]
struct DummyState {
    journal: Vec<DummyEvent>,
    live: HashSet<ResourceId>,
    buffers: HashMap<BufferHandle, Vec<u8>>,
    framebuffers: HashMap<FramebufferHandle, Vec<ImageHandle>>,
    /// Sampler and image behind each display registration.
    displays: HashMap<DisplayHandle, (SamplerHandle, ImageHandle)>,
    /// Objects referenced by submissions the GPU may still be executing.
    in_flight: VecDeque<HashSet<ResourceId>>,
    failing_image_creations: u32,
    image_creations_before_failure: u32,
    failing_buffer_writes: u32,
    failing_destroys: HashSet<ResourceId>,
    surface_available: bool,
    next_image: u32,
    submissions: u64,
    presents: u64,
    last_submission: Option<CommandStream>,
}

impl DummyState {
    fn new() -> Self {
        Self {
            journal: Vec::new(),
            live: HashSet::new(),
            buffers: HashMap::new(),
            framebuffers: HashMap::new(),
            displays: HashMap::new(),
            in_flight: VecDeque::new(),
            failing_image_creations: 0,
            image_creations_before_failure: 0,
            failing_buffer_writes: 0,
            failing_destroys: HashSet::new(),
            surface_available: true,
            next_image: 0,
            submissions: 0,
            presents: 0,
            last_submission: None,
        }
    }

    fn create(&mut self, id: ResourceId) {
        self.live.insert(id);
        self.journal.push(DummyEvent::Created(id));
    }

    fn hazard(&mut self, resource: ResourceId, reason: impl Into<String>) {
        let reason = reason.into();
        log::warn!("DummyBackend: hazard on {resource}: {reason}");
        self.journal.push(DummyEvent::Hazard { resource, reason });
    }

    fn check_in_flight(&mut self, id: ResourceId, action: &str) {
        if self.in_flight.iter().any(|refs| refs.contains(&id)) {
            self.hazard(id, format!("{action} while referenced by an in-flight submission"));
        }
    }

    fn destroy(&mut self, id: ResourceId) -> Result<(), GraphicsError> {
        if self.failing_destroys.remove(&id) {
            return Err(GraphicsError::DestroyFailed(format!(
                "{id}: injected failure"
            )));
        }
        if !self.live.remove(&id) {
            return Err(GraphicsError::DestroyFailed(format!("{id} is not live")));
        }
        self.check_in_flight(id, "destroyed");
        self.journal.push(DummyEvent::Destroyed(id));
        Ok(())
    }
}

/// Dummy GPU backend.
///
/// Implements both [`GpuBackend`] and [`DisplayRegistry`].
#[derive(Debug)]
pub struct DummyBackend {
    state: Mutex<DummyState>,
    capabilities: DeviceCapabilities,
    image_count: u32,
    frames_in_flight: usize,
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DummyBackend {
    /// Create a new dummy backend with three swapchain images and two frames
    /// in flight.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DummyState::new()),
            capabilities: DeviceCapabilities::default(),
            image_count: 3,
            frames_in_flight: 2,
        }
    }

    /// Override the reported capabilities.
    pub fn with_capabilities(mut self, capabilities: DeviceCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Set the number of swapchain images.
    pub fn with_image_count(mut self, image_count: u32) -> Self {
        assert!(image_count > 0, "image_count must be at least 1");
        self.image_count = image_count;
        self
    }

    /// Set how many submissions the simulated GPU may still be executing.
    ///
    /// At the start of a frame the oldest of N submissions has completed, so
    /// the last N - 1 submissions are treated as in flight.
    pub fn with_frames_in_flight(mut self, frames_in_flight: usize) -> Self {
        assert!(frames_in_flight > 0, "frames_in_flight must be at least 1");
        self.frames_in_flight = frames_in_flight;
        self
    }

    /// Snapshot of the journal.
    pub fn journal(&self) -> Vec<DummyEvent> {
        self.state.lock().journal.clone()
    }

    /// Clear the journal. Live objects are kept.
    pub fn clear_journal(&self) {
        self.state.lock().journal.clear();
    }

    /// Returns true if the object exists.
    pub fn is_live(&self, id: impl Into<ResourceId>) -> bool {
        self.state.lock().live.contains(&id.into())
    }

    /// Number of live objects, including display registrations.
    pub fn live_count(&self) -> usize {
        self.state.lock().live.len()
    }

    /// All live objects, sorted.
    pub fn live_resources(&self) -> Vec<ResourceId> {
        let mut live: Vec<ResourceId> = self.state.lock().live.iter().copied().collect();
        live.sort_unstable();
        live
    }

    /// How many times the object was destroyed (or unregistered).
    pub fn destroy_count(&self, id: impl Into<ResourceId>) -> usize {
        let id = id.into();
        self.state
            .lock()
            .journal
            .iter()
            .filter(|event| match event {
                DummyEvent::Destroyed(destroyed) => *destroyed == id,
                DummyEvent::DisplayUnregistered(handle) => ResourceId::Display(*handle) == id,
                _ => false,
            })
            .count()
    }

    /// Current contents of a buffer.
    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<Vec<u8>> {
        self.state.lock().buffers.get(&buffer).cloned()
    }

    /// Number of writes into a buffer.
    pub fn write_count(&self, buffer: BufferHandle) -> usize {
        self.state
            .lock()
            .journal
            .iter()
            .filter(|event| matches!(event, DummyEvent::BufferWritten { buffer: b, .. } if *b == buffer))
            .count()
    }

    /// Every recorded hazard.
    pub fn hazards(&self) -> Vec<DummyEvent> {
        self.state
            .lock()
            .journal
            .iter()
            .filter(|event| matches!(event, DummyEvent::Hazard { .. }))
            .cloned()
            .collect()
    }

    /// Number of submitted command streams.
    pub fn submission_count(&self) -> u64 {
        self.state.lock().submissions
    }

    /// Number of presented images.
    pub fn present_count(&self) -> u64 {
        self.state.lock().presents
    }

    /// The most recently submitted command stream.
    pub fn last_submission(&self) -> Option<CommandStream> {
        self.state.lock().last_submission.clone()
    }

    /// Make the next `count` image creations fail with out-of-memory.
    pub fn fail_next_image_creations(&self, count: u32) {
        self.fail_image_creations_after(0, count);
    }

    /// Let `skip` image creations succeed, then fail the following `count`.
    pub fn fail_image_creations_after(&self, skip: u32, count: u32) {
        let mut state = self.state.lock();
        state.image_creations_before_failure = skip;
        state.failing_image_creations = count;
    }

    /// Make the next `count` buffer writes fail.
    pub fn fail_next_buffer_writes(&self, count: u32) {
        self.state.lock().failing_buffer_writes = count;
    }

    /// Make the next destruction of `id` fail.
    pub fn fail_destroy(&self, id: impl Into<ResourceId>) {
        self.state.lock().failing_destroys.insert(id.into());
    }

    /// Simulate the surface being minimized or lost.
    pub fn set_surface_available(&self, available: bool) {
        self.state.lock().surface_available = available;
    }
}

impl GpuBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy"
    }

    fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities.clone()
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferHandle, GraphicsError> {
        log::trace!(
            "DummyBackend: creating buffer {:?} (size: {})",
            descriptor.label,
            descriptor.size
        );
        let buffer = BufferHandle::from_raw(next_handle_id());
        let mut state = self.state.lock();
        state.create(buffer.into());
        state
            .buffers
            .insert(buffer, vec![0; descriptor.size as usize]);
        Ok(buffer)
    }

    fn write_buffer(
        &self,
        buffer: BufferHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        let mut state = self.state.lock();
        if state.failing_buffer_writes > 0 {
            state.failing_buffer_writes -= 1;
            return Err(GraphicsError::Internal(format!(
                "{buffer}: injected write failure"
            )));
        }
        state.check_in_flight(buffer.into(), "written");

        let contents = state
            .buffers
            .get_mut(&buffer)
            .ok_or_else(|| GraphicsError::InvalidParameter(format!("{buffer} is not live")))?;
        let start = offset as usize;
        let end = start + data.len();
        if end > contents.len() {
            return Err(GraphicsError::InvalidParameter(format!(
                "write of {} bytes at offset {offset} overflows {buffer} ({} bytes)",
                data.len(),
                contents.len()
            )));
        }
        contents[start..end].copy_from_slice(data);
        state.journal.push(DummyEvent::BufferWritten {
            buffer,
            bytes: data.to_vec(),
        });
        Ok(())
    }

    fn destroy_buffer(&self, buffer: BufferHandle) -> Result<(), GraphicsError> {
        let mut state = self.state.lock();
        state.destroy(buffer.into())?;
        state.buffers.remove(&buffer);
        Ok(())
    }

    fn create_image(&self, descriptor: &TextureDescriptor) -> Result<ImageHandle, GraphicsError> {
        log::trace!(
            "DummyBackend: creating image {:?} ({}, {:?}, {}x msaa)",
            descriptor.label,
            descriptor.size,
            descriptor.format,
            descriptor.sample_count
        );
        let mut state = self.state.lock();
        if state.image_creations_before_failure > 0 {
            state.image_creations_before_failure -= 1;
        } else if state.failing_image_creations > 0 {
            state.failing_image_creations -= 1;
            return Err(GraphicsError::OutOfMemory);
        }
        let image = ImageHandle::from_raw(next_handle_id());
        state.create(image.into());
        Ok(image)
    }

    fn destroy_image(&self, image: ImageHandle) -> Result<(), GraphicsError> {
        let mut state = self.state.lock();
        if state.framebuffers.values().any(|attachments| attachments.contains(&image)) {
            state.hazard(image.into(), "destroyed while attached to a live framebuffer");
        }
        if state.displays.values().any(|(_, displayed)| *displayed == image) {
            state.hazard(image.into(), "destroyed while registered for display");
        }
        state.destroy(image.into())
    }

    fn create_sampler(
        &self,
        descriptor: &SamplerDescriptor,
    ) -> Result<SamplerHandle, GraphicsError> {
        log::trace!("DummyBackend: creating sampler {:?}", descriptor.label);
        let sampler = SamplerHandle::from_raw(next_handle_id());
        self.state.lock().create(sampler.into());
        Ok(sampler)
    }

    fn destroy_sampler(&self, sampler: SamplerHandle) -> Result<(), GraphicsError> {
        let mut state = self.state.lock();
        if state.displays.values().any(|(used, _)| *used == sampler) {
            state.hazard(
                sampler.into(),
                "destroyed while a display registration samples through it",
            );
        }
        state.destroy(sampler.into())
    }

    fn create_render_pass(
        &self,
        descriptor: &RenderPassDescriptor,
    ) -> Result<RenderPassHandle, GraphicsError> {
        log::trace!(
            "DummyBackend: creating render pass {:?} ({:?}/{:?})",
            descriptor.label,
            descriptor.color_format,
            descriptor.depth_format
        );
        let render_pass = RenderPassHandle::from_raw(next_handle_id());
        self.state.lock().create(render_pass.into());
        Ok(render_pass)
    }

    fn destroy_render_pass(&self, render_pass: RenderPassHandle) -> Result<(), GraphicsError> {
        self.state.lock().destroy(render_pass.into())
    }

    fn create_framebuffer(
        &self,
        descriptor: &FramebufferDescriptor,
    ) -> Result<FramebufferHandle, GraphicsError> {
        log::trace!(
            "DummyBackend: creating framebuffer {:?} ({})",
            descriptor.label,
            descriptor.extent
        );
        let mut state = self.state.lock();
        if !state.live.contains(&descriptor.render_pass.into()) {
            return Err(GraphicsError::InvalidParameter(format!(
                "{} is not live",
                descriptor.render_pass
            )));
        }
        if let Some(missing) = descriptor
            .attachments
            .iter()
            .find(|image| !state.live.contains(&(**image).into()))
        {
            return Err(GraphicsError::InvalidParameter(format!(
                "attachment {missing} is not live"
            )));
        }
        let framebuffer = FramebufferHandle::from_raw(next_handle_id());
        state.create(framebuffer.into());
        state
            .framebuffers
            .insert(framebuffer, descriptor.attachments.clone());
        Ok(framebuffer)
    }

    fn destroy_framebuffer(&self, framebuffer: FramebufferHandle) -> Result<(), GraphicsError> {
        let mut state = self.state.lock();
        state.destroy(framebuffer.into())?;
        state.framebuffers.remove(&framebuffer);
        Ok(())
    }

    fn create_pipeline(
        &self,
        descriptor: &PipelineDescriptor,
    ) -> Result<PipelineHandle, GraphicsError> {
        log::trace!(
            "DummyBackend: creating pipeline {:?} (shader {:?})",
            descriptor.label,
            descriptor.shader
        );
        let pipeline = PipelineHandle::from_raw(next_handle_id());
        self.state.lock().create(pipeline.into());
        Ok(pipeline)
    }

    fn destroy_pipeline(&self, pipeline: PipelineHandle) -> Result<(), GraphicsError> {
        self.state.lock().destroy(pipeline.into())
    }

    fn swapchain_image_count(&self) -> u32 {
        self.image_count
    }

    fn acquire_image(&self) -> Result<Option<u32>, GraphicsError> {
        let mut state = self.state.lock();
        if !state.surface_available {
            log::trace!("DummyBackend: surface unavailable");
            return Ok(None);
        }
        let image_index = state.next_image;
        state.next_image = (image_index + 1) % self.image_count;
        Ok(Some(image_index))
    }

    fn submit(&self, commands: CommandStream) -> Result<(), GraphicsError> {
        let mut state = self.state.lock();

        let mut references: HashSet<ResourceId> = HashSet::new();
        for command in commands.commands() {
            for id in command.resources() {
                if !state.live.contains(&id) {
                    return Err(GraphicsError::InvalidParameter(format!(
                        "submitted commands reference destroyed {id}"
                    )));
                }
                references.insert(id);
            }
            if let Command::BeginRenderPass { framebuffer, .. } = command {
                if let Some(attachments) = state.framebuffers.get(framebuffer) {
                    references.extend(attachments.iter().map(|image| ResourceId::Image(*image)));
                }
            }
        }

        log::trace!(
            "DummyBackend: submitted {} commands ({}, image {})",
            commands.len(),
            commands.slot(),
            commands.image_index()
        );

        state.journal.push(DummyEvent::Submitted {
            slot: commands.slot().index(),
            image_index: commands.image_index(),
            commands: commands.len(),
        });
        state.submissions += 1;
        state.in_flight.push_back(references);
        while state.in_flight.len() > self.frames_in_flight - 1 {
            state.in_flight.pop_front();
        }
        state.last_submission = Some(commands);
        Ok(())
    }

    fn present(&self, image_index: u32) -> Result<(), GraphicsError> {
        if image_index >= self.image_count {
            return Err(GraphicsError::InvalidParameter(format!(
                "image index {image_index} out of range ({} images)",
                self.image_count
            )));
        }
        let mut state = self.state.lock();
        if !state.surface_available {
            return Err(GraphicsError::SurfaceLost);
        }
        state.presents += 1;
        state.journal.push(DummyEvent::Presented(image_index));
        Ok(())
    }

    fn wait_idle(&self) -> Result<(), GraphicsError> {
        let mut state = self.state.lock();
        state.in_flight.clear();
        state.journal.push(DummyEvent::WaitIdle);
        Ok(())
    }
}

impl DisplayRegistry for DummyBackend {
    fn register_texture(
        &self,
        sampler: SamplerHandle,
        image: ImageHandle,
    ) -> Result<DisplayHandle, GraphicsError> {
        let mut state = self.state.lock();
        if !state.live.contains(&sampler.into()) || !state.live.contains(&image.into()) {
            return Err(GraphicsError::InvalidParameter(format!(
                "cannot register {image} with {sampler}: not live"
            )));
        }
        let handle = DisplayHandle::from_raw(next_handle_id());
        state.live.insert(handle.into());
        state.displays.insert(handle, (sampler, image));
        state
            .journal
            .push(DummyEvent::DisplayRegistered { handle, image });
        Ok(handle)
    }

    fn unregister_texture(&self, handle: DisplayHandle) -> Result<(), GraphicsError> {
        let mut state = self.state.lock();
        let id = ResourceId::Display(handle);
        if state.failing_destroys.remove(&id) {
            return Err(GraphicsError::DestroyFailed(format!(
                "{handle}: injected failure"
            )));
        }
        if !state.live.remove(&id) {
            return Err(GraphicsError::DestroyFailed(format!("{handle} is not registered")));
        }
        state.displays.remove(&handle);
        state.journal.push(DummyEvent::DisplayUnregistered(handle));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameContext;
    use crate::types::{BufferUsage, Extent2d, TextureFormat, TextureUsage};

    fn image_descriptor() -> TextureDescriptor {
        TextureDescriptor::new_2d(
            Extent2d::new(8, 8),
            TextureFormat::Rgba8Unorm,
            TextureUsage::RENDER_ATTACHMENT,
        )
    }

    #[test]
    fn test_dummy_backend_name() {
        let backend = DummyBackend::new();
        assert_eq!(backend.name(), "Dummy");
    }

    #[test]
    fn test_buffer_write_and_journal() {
        let backend = DummyBackend::new();
        let buffer = backend
            .create_buffer(&BufferDescriptor::new(4, BufferUsage::UNIFORM))
            .unwrap();
        backend.write_buffer(buffer, 0, &[1, 2, 3, 4]).unwrap();

        assert_eq!(backend.buffer_contents(buffer), Some(vec![1, 2, 3, 4]));
        assert_eq!(backend.write_count(buffer), 1);
        assert!(backend.write_buffer(buffer, 2, &[0; 4]).is_err());
    }

    #[test]
    fn test_double_destroy_fails() {
        let backend = DummyBackend::new();
        let image = backend.create_image(&image_descriptor()).unwrap();
        backend.destroy_image(image).unwrap();
        assert!(matches!(
            backend.destroy_image(image),
            Err(GraphicsError::DestroyFailed(_))
        ));
        assert_eq!(backend.destroy_count(image), 1);
    }

    #[test]
    fn test_injected_image_failure() {
        let backend = DummyBackend::new();
        backend.fail_next_image_creations(1);
        assert_eq!(
            backend.create_image(&image_descriptor()),
            Err(GraphicsError::OutOfMemory)
        );
        assert!(backend.create_image(&image_descriptor()).is_ok());
    }

    #[test]
    fn test_acquire_rotates_images() {
        let backend = DummyBackend::new().with_image_count(2);
        assert_eq!(backend.acquire_image().unwrap(), Some(0));
        assert_eq!(backend.acquire_image().unwrap(), Some(1));
        assert_eq!(backend.acquire_image().unwrap(), Some(0));
        backend.set_surface_available(false);
        assert_eq!(backend.acquire_image().unwrap(), None);
    }

    #[test]
    fn test_destroy_in_flight_is_hazard() {
        let backend = DummyBackend::new().with_frames_in_flight(2);
        let buffer = backend
            .create_buffer(&BufferDescriptor::new(16, BufferUsage::UNIFORM))
            .unwrap();
        let frames = FrameContext::new(2, 3);
        let mut stream = CommandStream::new(frames.slot(0), 0);
        stream.bind_uniform_buffer(0, buffer);
        backend.submit(stream).unwrap();

        backend.destroy_buffer(buffer).unwrap();
        assert_eq!(backend.hazards().len(), 1);
    }

    #[test]
    fn test_destroy_after_wait_idle_is_safe() {
        let backend = DummyBackend::new().with_frames_in_flight(3);
        let buffer = backend
            .create_buffer(&BufferDescriptor::new(16, BufferUsage::UNIFORM))
            .unwrap();
        let frames = FrameContext::new(3, 3);
        let mut stream = CommandStream::new(frames.slot(0), 0);
        stream.bind_uniform_buffer(0, buffer);
        backend.submit(stream).unwrap();
        backend.wait_idle().unwrap();

        backend.destroy_buffer(buffer).unwrap();
        assert!(backend.hazards().is_empty());
    }

    #[test]
    fn test_display_registration() {
        let backend = DummyBackend::new();
        let sampler = backend.create_sampler(&SamplerDescriptor::linear()).unwrap();
        let image = backend.create_image(&image_descriptor()).unwrap();
        let handle = backend.register_texture(sampler, image).unwrap();
        assert!(backend.is_live(handle));

        backend.unregister_texture(handle).unwrap();
        assert!(!backend.is_live(handle));
        assert_eq!(backend.destroy_count(handle), 1);
        assert!(backend.unregister_texture(handle).is_err());
    }

    #[test]
    fn test_destroy_sampler_with_registration_is_hazard() {
        let backend = DummyBackend::new();
        let sampler = backend.create_sampler(&SamplerDescriptor::linear()).unwrap();
        let image = backend.create_image(&image_descriptor()).unwrap();
        let handle = backend.register_texture(sampler, image).unwrap();

        backend.destroy_sampler(sampler).unwrap();
        assert_eq!(backend.hazards().len(), 1);

        backend.unregister_texture(handle).unwrap();
        backend.destroy_image(image).unwrap();
        assert_eq!(backend.hazards().len(), 1);
    }
}
