//! Frame scheduling.
//!
//! This module provides [`FramePipeline`], the frame scheduler that hands out
//! one [`FrameTick`] per loop iteration: which frame slot to record into and
//! which swapchain image to render for.
//!
//! # Per-tick control flow
//!
//! ```text
//! ┌──────────────────────┐
//! │ pipeline.begin_frame │  (slot, image_index, valid)
//! └──────────┬───────────┘
//!            │ valid
//!            ▼
//! ┌──────────────────────┐
//! │ consume(slot)        │  versioned resources propagate lazily
//! ├──────────────────────┤
//! │ record commands      │  against the current render target
//! ├──────────────────────┤
//! │ retirement.tick()    │  destroy what no frame can reference anymore
//! ├──────────────────────┤
//! │ submit + present     │
//! ├──────────────────────┤
//! │ pipeline.end_frame   │  advance to the next slot
//! └──────────────────────┘
//! ```
//!
//! When the surface is unavailable (minimized, lost) `begin_frame` returns an
//! invalid tick. Nothing is recorded, retired or submitted for it and the slot
//! does not advance.
//!
//! # Frame Overlap (Pipelining)
//!
//! With 2 frames in flight, the CPU and GPU work in parallel:
//!
//! ```text
//! Frame 0: [CPU build] [submit] ─────────────────────────────────────────────►
//!                               [GPU execute frame 0] ───────────────────────►
//!
//! Frame 1:              [CPU build] [submit] ────────────────────────────────►
//!                                            [GPU execute frame 1] ──────────►
//!
//! Frame 2:                          [wait F0] [CPU build] [submit] ──────────►
//!                                                         [GPU execute F2] ──►
//! ```
//!
//! # Choosing Frames in Flight
//!
//! | Count | Behavior |
//! |-------|----------|
//! | 1 | CPU waits for GPU every frame. Simple but slow. |
//! | 2 | Good balance. CPU can work on N+1 while GPU renders N. |
//! | 3 | More overlap, higher latency. Useful for heavy CPU work. |
//!
//! More frames = more throughput but higher input latency and memory usage
//! (each frame needs its own uniform replicas, and retired objects live longer).

use std::sync::Arc;

use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::frame::{FrameContext, FrameTick};

/// The frame scheduler.
///
/// # Thread Safety
///
/// `FramePipeline` is **not thread-safe**. It should be owned by the
/// recording thread.
#[derive(Debug)]
pub struct FramePipeline {
    device: Arc<GraphicsDevice>,
    frames: FrameContext,

    /// Current frame slot index (0 to frames_in_flight - 1).
    current_slot: usize,

    /// Whether a valid frame was begun and not yet ended.
    in_frame: bool,

    /// Total valid frames started.
    frame_count: u64,

    /// Iterations skipped because no image could be acquired.
    skipped_count: u64,
}

impl FramePipeline {
    /// Create a new frame pipeline.
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    /// use vista_graphics::backend::DummyBackend;
    /// use vista_graphics::device::GraphicsDevice;
    /// use vista_graphics::frame::FrameContext;
    /// use vista_graphics::pipeline::FramePipeline;
    ///
    /// let device = GraphicsDevice::with_dummy(&Arc::new(DummyBackend::new()));
    /// let pipeline = FramePipeline::new(&device, FrameContext::new(2, 3));
    /// assert_eq!(pipeline.frames_in_flight(), 2);
    /// ```
    pub fn new(device: &Arc<GraphicsDevice>, frames: FrameContext) -> Self {
        Self {
            device: Arc::clone(device),
            frames,
            current_slot: 0,
            in_frame: false,
            frame_count: 0,
            skipped_count: 0,
        }
    }

    /// Begin a new frame.
    ///
    /// Acquires the next swapchain image. Returns an invalid tick if the
    /// surface is unavailable; in that case [`end_frame`](Self::end_frame)
    /// must not be called.
    ///
    /// # Panics
    ///
    /// Panics if the previous valid frame was not ended.
    pub fn begin_frame(&mut self) -> Result<FrameTick, GraphicsError> {
        assert!(!self.in_frame, "begin_frame called twice without end_frame");
        let slot = self.frames.slot(self.current_slot);

        match self.device.acquire_image()? {
            Some(image_index) => {
                self.frame_count += 1;
                self.in_frame = true;
                log::trace!(
                    "Begin frame {} ({slot}, image {image_index})",
                    self.frame_count
                );
                Ok(FrameTick::new(slot, image_index))
            }
            None => {
                self.skipped_count += 1;
                log::trace!("Surface unavailable, skipping frame ({slot})");
                Ok(FrameTick::invalid(slot))
            }
        }
    }

    /// End the current frame and advance to the next slot.
    ///
    /// # Panics
    ///
    /// Panics if no valid frame is in progress.
    pub fn end_frame(&mut self) {
        assert!(self.in_frame, "end_frame called without a valid begin_frame");
        log::trace!(
            "End frame {} (slot {})",
            self.frame_count,
            self.current_slot
        );
        self.in_frame = false;
        self.current_slot = (self.current_slot + 1) % self.frames.frames_in_flight();
    }

    /// Wait for all in-flight GPU work to complete.
    ///
    /// # When to Call
    ///
    /// - Application shutdown
    /// - Before flushing the retirement queue
    pub fn wait_idle(&self) -> Result<(), GraphicsError> {
        log::trace!(
            "Waiting for GPU idle ({} slots)",
            self.frames.frames_in_flight()
        );
        self.device.wait_idle()
    }

    /// Pipelining context.
    pub fn frames(&self) -> &FrameContext {
        &self.frames
    }

    /// Get the number of frames in flight.
    pub fn frames_in_flight(&self) -> usize {
        self.frames.frames_in_flight()
    }

    /// Get the current frame slot index.
    pub fn current_slot(&self) -> usize {
        self.current_slot
    }

    /// Get the total number of valid frames started.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Get the number of iterations skipped for an unavailable surface.
    pub fn skipped_count(&self) -> u64 {
        self.skipped_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    fn pipeline(frames_in_flight: usize) -> (Arc<DummyBackend>, FramePipeline) {
        let backend = Arc::new(DummyBackend::new());
        let device = GraphicsDevice::with_dummy(&backend);
        let pipeline = FramePipeline::new(&device, FrameContext::new(frames_in_flight, 3));
        (backend, pipeline)
    }

    #[test]
    fn test_new() {
        let (_backend, pipeline) = pipeline(2);
        assert_eq!(pipeline.frames_in_flight(), 2);
        assert_eq!(pipeline.current_slot(), 0);
        assert_eq!(pipeline.frame_count(), 0);
    }

    #[test]
    fn test_end_frame_advances_slot() {
        let (_backend, mut pipeline) = pipeline(3);

        let mut slots = Vec::new();
        for _ in 0..4 {
            let tick = pipeline.begin_frame().unwrap();
            assert!(tick.valid);
            slots.push(tick.slot.index());
            pipeline.end_frame();
        }
        assert_eq!(slots, vec![0, 1, 2, 0]);
        assert_eq!(pipeline.frame_count(), 4);
    }

    #[test]
    fn test_invalid_tick_does_not_advance() {
        let (backend, mut pipeline) = pipeline(2);
        let tick = pipeline.begin_frame().unwrap();
        pipeline.end_frame();
        assert_eq!(tick.slot.index(), 0);

        backend.set_surface_available(false);
        let tick = pipeline.begin_frame().unwrap();
        assert!(!tick.valid);
        assert_eq!(tick.slot.index(), 1);
        let tick = pipeline.begin_frame().unwrap();
        assert!(!tick.valid);
        assert_eq!(pipeline.skipped_count(), 2);

        backend.set_surface_available(true);
        let tick = pipeline.begin_frame().unwrap();
        assert!(tick.valid);
        assert_eq!(tick.slot.index(), 1);
        assert_eq!(pipeline.frame_count(), 2);
    }

    #[test]
    #[should_panic(expected = "without a valid begin_frame")]
    fn test_end_without_begin_panics() {
        let (_backend, mut pipeline) = pipeline(2);
        pipeline.end_frame();
    }

    #[test]
    fn test_wait_idle() {
        let (backend, pipeline) = pipeline(2);
        pipeline.wait_idle().unwrap();
        assert!(backend.journal().contains(&crate::backend::DummyEvent::WaitIdle));
    }
}
