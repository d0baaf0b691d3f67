//! Headless visualization application and its tick loop.

use std::fmt;
use std::sync::Arc;

use glam::Vec3;

use vista_graphics::{
    CommandStream, DummyBackend, EventChannel, FrameContext, FramePipeline, FrameTick,
    GraphicsDevice, PipelineDescriptor, PipelineHandle, RebuildStatus, RenderTargetConfig,
    RenderTargetManager, ResizeEvent, ResizeManager, RetiredResource, RetirementQueue,
    VersionedUniform,
};

use crate::args::{AppArgs, ScriptedResize};
use crate::error::AppError;
use crate::scene::{
    CAMERA_BINDING, CameraUniform, LIGHT_BINDING, LightEdit, LightUniform, OrbitCamera, Shape,
};

const SHAPE_SHADER: &str = "shapes";
const ORBIT_SPEED: f32 = 0.01;
const LIGHT_SPEED: f32 = 0.02;

/// What a call to [`VisualizationApp::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A frame was recorded, submitted and presented.
    Rendered(FrameTick),
    /// The surface was unavailable; nothing was recorded or retired.
    Skipped,
}

/// Counters reported at shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppStats {
    /// Ticks that recorded and submitted a frame.
    pub frames: u64,
    /// Ticks skipped because the surface was unavailable.
    pub skipped_frames: u64,
    /// Render target rebuilds that published a new target.
    pub rebuilds: u64,
    /// Rebuild requests that left the target in place.
    pub skipped_rebuilds: u64,
    /// Shape pipeline reloads.
    pub reloads: u64,
    /// Retired objects destroyed so far.
    pub destroyed: u64,
}

impl fmt::Display for AppStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} frames ({} skipped), {} rebuilds ({} rejected), {} reloads, {} objects retired",
            self.frames,
            self.skipped_frames,
            self.rebuilds,
            self.skipped_rebuilds,
            self.reloads,
            self.destroyed
        )
    }
}

/// A lit shape scene rendered through the frame pipeline.
///
/// Per tick, in order:
/// 1. scripted window events are applied,
/// 2. the scheduler yields the frame slot and swapchain image,
/// 3. debounced resizes rebuild the render target,
/// 4. camera and light uniforms are updated and consumed for the slot,
/// 5. the scene pass is recorded against the current target,
/// 6. the retirement queue is ticked,
/// 7. the commands are submitted and the image presented.
pub struct VisualizationApp {
    retirement: RetirementQueue,
    targets: RenderTargetManager,
    camera_uniform: VersionedUniform<CameraUniform>,
    light_uniform: VersionedUniform<LightUniform>,
    shape_pipeline: Option<PipelineHandle>,
    pipeline: FramePipeline,
    resize: ResizeManager,
    resize_events: EventChannel<ResizeEvent>,
    camera: OrbitCamera,
    light_angle: f32,
    resizes: Vec<ScriptedResize>,
    surface_loss_ticks: Vec<u64>,
    reload_ticks: Vec<u64>,
    tick_index: u64,
    reloads: u64,
    device: Arc<GraphicsDevice>,
    backend: Arc<DummyBackend>,
}

impl VisualizationApp {
    /// Create the device, uniforms, render target and shape pipeline.
    pub fn new(args: &impl AppArgs) -> Result<Self, AppError> {
        let frames_in_flight = args.frames_in_flight();
        if frames_in_flight == 0 {
            return Err(AppError::InvalidArgument(
                "frames in flight must be at least 1".into(),
            ));
        }
        if args.image_count() == 0 {
            return Err(AppError::InvalidArgument(
                "swapchain image count must be at least 1".into(),
            ));
        }
        let scene_size = args.scene_size();
        if scene_size.is_degenerate() {
            return Err(AppError::InvalidArgument(format!(
                "initial scene size {scene_size} is empty"
            )));
        }

        let backend = Arc::new(
            DummyBackend::new()
                .with_frames_in_flight(frames_in_flight)
                .with_image_count(args.image_count()),
        );
        let device = GraphicsDevice::with_dummy(&backend);
        let frames = FrameContext::new(frames_in_flight, args.image_count());

        let config = RenderTargetConfig::default()
            .with_label("scene")
            .with_sample_count(args.sample_count())
            .with_clear_color([0.08, 0.08, 0.1, 1.0]);
        let mut targets = RenderTargetManager::new(&device, &frames, config, scene_size)?;
        let retirement = RetirementQueue::new(&device, &frames);

        let camera = OrbitCamera::default();
        let camera_uniform =
            VersionedUniform::with_value(&device, &frames, "camera", &camera.uniform(scene_size))?;
        let light_uniform =
            VersionedUniform::with_value(&device, &frames, "light", &LightUniform::default())?;

        let shape_pipeline = device.create_pipeline(
            &PipelineDescriptor::for_pass(SHAPE_SHADER, &targets.config().render_pass_descriptor())
                .with_label("shapes"),
        )?;

        let resize_events = EventChannel::new();
        targets.subscribe(&resize_events);

        log::info!(
            "Visualization ready: {scene_size}, {frames_in_flight} frames in flight, {} images, {}x MSAA",
            args.image_count(),
            args.sample_count()
        );

        Ok(Self {
            retirement,
            targets,
            camera_uniform,
            light_uniform,
            shape_pipeline: Some(shape_pipeline),
            pipeline: FramePipeline::new(&device, frames),
            resize: ResizeManager::new(scene_size, args.resize_debounce()),
            resize_events,
            camera,
            light_angle: 0.0,
            resizes: args.resizes().to_vec(),
            surface_loss_ticks: args.surface_loss_ticks().to_vec(),
            reload_ticks: args.reload_ticks().to_vec(),
            tick_index: 0,
            reloads: 0,
            device,
            backend,
        })
    }

    /// Run one tick of the frame loop.
    pub fn tick(&mut self) -> Result<TickOutcome, AppError> {
        let tick_index = self.tick_index;
        self.tick_index += 1;
        self.apply_script(tick_index)?;

        let tick = self.pipeline.begin_frame()?;
        if !tick.valid {
            log::warn!("Tick {tick_index}: surface unavailable, frame skipped");
            return Ok(TickOutcome::Skipped);
        }

        let resized = self.resize.update();
        if let Some(event) = resized {
            self.resize_events.publish(event);
        }
        if let Some(status) = self.targets.handle_resize_events(&mut self.retirement) {
            match status {
                RebuildStatus::Rebuilt { generation } => log::info!(
                    "Scene target resized to {} (generation {generation})",
                    self.targets.extent()
                ),
                RebuildStatus::Skipped(reason) => {
                    log::warn!("Scene target kept at {}: {reason:?}", self.targets.extent());
                    if let Some(event) = resized {
                        self.resize.reject(&event);
                    }
                }
            }
        }

        self.update_scene();
        let camera = self.camera_uniform.consume(tick.slot)?;
        let light = self.light_uniform.consume(tick.slot)?;

        let mut stream = CommandStream::for_tick(&tick);
        self.targets.begin_pass(&mut stream);
        if let Some(pipeline) = self.shape_pipeline {
            stream.bind_pipeline(pipeline);
            stream.bind_uniform_buffer(CAMERA_BINDING, camera);
            stream.bind_uniform_buffer(LIGHT_BINDING, light);
            for shape in Shape::ALL {
                stream.draw(shape.vertex_count(), 1);
            }
        }
        self.targets.end_pass(&mut stream);

        self.retirement.tick()?;
        self.device.submit(stream)?;
        self.device.present(tick.image_index)?;
        self.pipeline.end_frame();

        Ok(TickOutcome::Rendered(tick))
    }

    /// Run `max_frames` ticks.
    pub fn run(&mut self, max_frames: u64) -> Result<(), AppError> {
        for _ in 0..max_frames {
            self.tick()?;
        }
        log::info!("Reached max frames limit ({max_frames}), exiting");
        Ok(())
    }

    /// Replace the shape pipeline. The old one is retired, not waited on.
    pub fn reload_pipeline(&mut self) -> Result<PipelineHandle, AppError> {
        let descriptor = PipelineDescriptor::for_pass(
            SHAPE_SHADER,
            &self.targets.config().render_pass_descriptor(),
        )
        .with_label("shapes");
        let pipeline = self.device.create_pipeline(&descriptor)?;

        if let Some(old) = self.shape_pipeline.replace(pipeline) {
            log::debug!("Shape pipeline reloaded: {old} -> {pipeline}");
            self.retirement.retire(RetiredResource::Pipeline(old));
        }
        self.reloads += 1;
        Ok(pipeline)
    }

    /// Apply a lighting edit through a read-modify-write of the light block.
    pub fn edit_light(&mut self, edit: LightEdit) {
        self.light_uniform.update(|light| edit.apply(light));
    }

    /// Wait for the device, destroy everything retired and report counters.
    pub fn shutdown(mut self) -> Result<AppStats, AppError> {
        self.device.wait_idle()?;
        if let Some(pipeline) = self.shape_pipeline.take() {
            self.retirement.retire(RetiredResource::Pipeline(pipeline));
        }
        self.retirement.flush_all()?;

        let stats = self.stats();
        log::info!("Shutdown: {stats}");
        Ok(stats)
    }

    /// Counters so far.
    pub fn stats(&self) -> AppStats {
        AppStats {
            frames: self.pipeline.frame_count(),
            skipped_frames: self.pipeline.skipped_count(),
            rebuilds: self.targets.rebuild_count(),
            skipped_rebuilds: self.targets.skipped_count(),
            reloads: self.reloads,
            destroyed: self.retirement.destroyed_count(),
        }
    }

    /// The journaling device backend.
    pub fn backend(&self) -> &Arc<DummyBackend> {
        &self.backend
    }

    /// The scene render target manager.
    pub fn targets(&self) -> &RenderTargetManager {
        &self.targets
    }

    /// Objects waiting for the GPU to finish with them.
    pub fn retirement(&self) -> &RetirementQueue {
        &self.retirement
    }

    /// Per-slot camera block.
    pub fn camera_uniform(&self) -> &VersionedUniform<CameraUniform> {
        &self.camera_uniform
    }

    /// Per-slot light block.
    pub fn light_uniform(&self) -> &VersionedUniform<LightUniform> {
        &self.light_uniform
    }

    /// Current shape pipeline, `None` once handed to the retirement queue.
    pub fn shape_pipeline(&self) -> Option<PipelineHandle> {
        self.shape_pipeline
    }

    fn apply_script(&mut self, tick_index: u64) -> Result<(), AppError> {
        let surface_available = !self.surface_loss_ticks.contains(&tick_index);
        self.backend.set_surface_available(surface_available);

        for resize in self.resizes.iter().filter(|r| r.tick == tick_index) {
            self.resize
                .on_resize_event(resize.extent.width, resize.extent.height);
        }

        if self.reload_ticks.contains(&tick_index) {
            self.reload_pipeline()?;
        }
        Ok(())
    }

    // Camera and light are re-derived every tick.
    fn update_scene(&mut self) {
        self.camera.orbit(ORBIT_SPEED, 0.0);
        self.camera_uniform
            .set(&self.camera.uniform(self.targets.extent()));

        self.light_angle = (self.light_angle + LIGHT_SPEED) % std::f32::consts::TAU;
        let (sin, cos) = self.light_angle.sin_cos();
        self.edit_light(LightEdit::Direction(Vec3::new(cos, -1.0, sin)));
    }
}

impl Drop for VisualizationApp {
    fn drop(&mut self) {
        if let Some(pipeline) = self.shape_pipeline.take() {
            self.retirement.retire(RetiredResource::Pipeline(pipeline));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::DefaultAppArgs;
    use vista_graphics::Extent2d;

    #[test]
    fn test_rejects_zero_frames_in_flight() {
        let args = DefaultAppArgs::default().with_frames_in_flight(0);
        assert!(matches!(
            VisualizationApp::new(&args),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_rejects_empty_scene() {
        let args = DefaultAppArgs::default().with_size(0, 720);
        assert!(matches!(
            VisualizationApp::new(&args),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_unsupported_sample_count_is_fatal() {
        let args = DefaultAppArgs::default().with_sample_count(3);
        assert!(matches!(
            VisualizationApp::new(&args),
            Err(AppError::Graphics(_))
        ));
    }

    #[test]
    fn test_tick_renders() {
        let mut app = VisualizationApp::new(&DefaultAppArgs::default()).unwrap();
        let outcome = app.tick().unwrap();
        assert!(matches!(outcome, TickOutcome::Rendered(tick) if tick.slot.index() == 0));
        assert_eq!(app.backend().submission_count(), 1);
        assert_eq!(app.backend().present_count(), 1);
    }

    #[test]
    fn test_uniforms_propagate_every_tick() {
        let mut app = VisualizationApp::new(&DefaultAppArgs::default()).unwrap();
        let replica = app.camera_uniform().resource().replicas()[0];
        for _ in 0..4 {
            app.tick().unwrap();
        }
        assert_eq!(app.backend().write_count(replica), 2);
    }

    #[test]
    fn test_edit_light_is_read_modify_write() {
        let mut app = VisualizationApp::new(&DefaultAppArgs::default()).unwrap();
        let before = app.light_uniform().get();
        app.edit_light(LightEdit::Ambient(0.5));

        let after = app.light_uniform().get();
        assert_eq!(after.ambient_strength, 0.5);
        assert_eq!(after.direction, before.direction);
        assert_eq!(after.color, before.color);
    }

    #[test]
    fn test_rejected_resize_is_retried() {
        let args = DefaultAppArgs::default()
            .with_resize_debounce(0)
            .with_resize(800, 600, 1)
            .with_resize(800, 600, 3);
        let mut app = VisualizationApp::new(&args).unwrap();
        app.tick().unwrap();

        app.backend().fail_next_image_creations(1);
        app.tick().unwrap();
        assert_eq!(app.targets().skipped_count(), 1);
        assert_eq!(app.targets().extent(), Extent2d::new(1280, 720));
        assert_eq!(app.resize.current_size(), Extent2d::new(1280, 720));

        app.tick().unwrap();
        app.tick().unwrap();
        assert_eq!(app.targets().rebuild_count(), 1);
        assert_eq!(app.targets().extent(), Extent2d::new(800, 600));
        assert!(app.backend().hazards().is_empty());
    }

    #[test]
    fn test_shutdown_releases_everything() {
        let args = DefaultAppArgs::default().with_reload(1);
        let mut app = VisualizationApp::new(&args).unwrap();
        app.run(5).unwrap();
        let backend = Arc::clone(app.backend());

        let stats = app.shutdown().unwrap();
        assert_eq!(stats.frames, 5);
        assert_eq!(stats.reloads, 1);
        assert_eq!(backend.live_count(), 0);
        assert!(backend.hazards().is_empty());
    }
}
