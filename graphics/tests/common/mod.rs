//! Common utilities for lifecycle integration tests.
//!
//! Every test runs against the journaled [`DummyBackend`], configured with
//! the same number of frames in flight as the components under test so that
//! its hazard detection matches the pipelining depth.

#![allow(dead_code)]

use std::sync::Arc;

use vista_graphics::{
    CommandStream, DummyBackend, DummyEvent, Extent2d, FrameContext, FramePipeline, FrameTick,
    GraphicsDevice, GraphicsError, RenderTargetConfig, RenderTargetManager, ResourceId,
    RetirementQueue, VersionedUniform,
};

pub const INITIAL_EXTENT: Extent2d = Extent2d::new(320, 240);

/// Initialise logging once for the test binary.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A dummy device set up for a given pipelining depth.
pub struct TestContext {
    pub backend: Arc<DummyBackend>,
    pub device: Arc<GraphicsDevice>,
    pub frames: FrameContext,
}

impl TestContext {
    pub fn new(frames_in_flight: usize) -> Self {
        Self::with_images(frames_in_flight, 3)
    }

    pub fn with_images(frames_in_flight: usize, image_count: u32) -> Self {
        init_logging();
        let backend = Arc::new(
            DummyBackend::new()
                .with_frames_in_flight(frames_in_flight)
                .with_image_count(image_count),
        );
        let device = GraphicsDevice::with_dummy(&backend);
        let frames = FrameContext::new(frames_in_flight, image_count);
        Self {
            backend,
            device,
            frames,
        }
    }

    pub fn retirement(&self) -> RetirementQueue {
        RetirementQueue::new(&self.device, &self.frames)
    }

    pub fn targets(&self) -> RenderTargetManager {
        self.targets_with(RenderTargetConfig::default())
    }

    pub fn targets_with(&self, config: RenderTargetConfig) -> RenderTargetManager {
        RenderTargetManager::new(&self.device, &self.frames, config, INITIAL_EXTENT)
            .expect("initial render target")
    }

    pub fn pipeline(&self) -> FramePipeline {
        FramePipeline::new(&self.device, self.frames)
    }

    /// Every `Destroyed` and `DisplayUnregistered` entry, in journal order.
    pub fn teardown_order(&self) -> Vec<ResourceId> {
        self.backend
            .journal()
            .into_iter()
            .filter_map(|event| match event {
                DummyEvent::Destroyed(id) => Some(id),
                DummyEvent::DisplayUnregistered(handle) => Some(ResourceId::Display(handle)),
                _ => None,
            })
            .collect()
    }

    /// Number of objects created since the journal was last cleared.
    pub fn created_count(&self) -> usize {
        self.backend
            .journal()
            .iter()
            .filter(|event| matches!(event, DummyEvent::Created(_)))
            .count()
    }
}

/// Record and submit one frame in the standard order.
///
/// Returns `Ok(None)` for an invalid tick, in which case nothing is recorded
/// or retired.
pub fn run_frame(
    ctx: &TestContext,
    pipeline: &mut FramePipeline,
    targets: &RenderTargetManager,
    retirement: &mut RetirementQueue,
    uniform: &mut VersionedUniform<[f32; 4]>,
) -> Result<Option<FrameTick>, GraphicsError> {
    let tick = pipeline.begin_frame()?;
    if !tick.valid {
        return Ok(None);
    }

    let buffer = uniform.consume(tick.slot)?;

    let mut stream = CommandStream::for_tick(&tick);
    targets.begin_pass(&mut stream);
    stream.bind_uniform_buffer(0, buffer);
    stream.draw(3, 1);
    targets.end_pass(&mut stream);

    retirement.tick()?;
    ctx.device.submit(stream)?;
    ctx.device.present(tick.image_index)?;
    pipeline.end_frame();
    Ok(Some(tick))
}
