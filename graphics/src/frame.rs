//! Frame pipelining context.
//!
//! A [`FrameContext`] carries the two numbers every lifecycle component needs:
//! how many frames may be in flight at once (N) and how many swapchain images
//! the presentation surface owns. It is passed by value to the components that
//! need it instead of living in a global.
//!
//! ```text
//! frames_in_flight = 3
//!
//! Slot 0: [Frame 0] ──► [Frame 3] ──► [Frame 6] ──►
//! Slot 1: [Frame 1] ──► [Frame 4] ──► [Frame 7] ──►
//! Slot 2: [Frame 2] ──► [Frame 5] ──► [Frame 8] ──►
//! ```

use std::fmt;

/// Index of one of the N frames in flight.
///
/// Slots are only handed out by a [`FrameContext`], so a slot obtained from
/// one context is always in range for that context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameSlot(usize);

impl FrameSlot {
    /// Get the slot index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FrameSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot {}", self.0)
    }
}

/// Pipelining parameters shared by all frame-pipelined resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameContext {
    frames_in_flight: usize,
    image_count: u32,
}

impl FrameContext {
    /// Create a new frame context.
    ///
    /// # Panics
    ///
    /// Panics if `frames_in_flight` or `image_count` is 0.
    pub fn new(frames_in_flight: usize, image_count: u32) -> Self {
        assert!(frames_in_flight > 0, "frames_in_flight must be at least 1");
        assert!(image_count > 0, "image_count must be at least 1");
        Self {
            frames_in_flight,
            image_count,
        }
    }

    /// Number of frames that may be in flight simultaneously (N).
    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    /// Number of swapchain images.
    pub fn image_count(&self) -> u32 {
        self.image_count
    }

    /// Number of ticks a retired resource must survive before destruction.
    ///
    /// One more than the pipelining depth: the tick that retires a resource
    /// may still have recorded commands against it.
    pub fn retirement_lifetime(&self) -> u32 {
        self.frames_in_flight as u32 + 1
    }

    /// Get the slot with the given index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= frames_in_flight`.
    pub fn slot(&self, index: usize) -> FrameSlot {
        assert!(
            index < self.frames_in_flight,
            "frame slot {index} out of range (frames in flight: {})",
            self.frames_in_flight
        );
        FrameSlot(index)
    }

    /// Iterate over all slots in order.
    pub fn slots(&self) -> impl Iterator<Item = FrameSlot> {
        (0..self.frames_in_flight).map(FrameSlot)
    }
}

/// Output of the frame scheduler for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTick {
    /// Frame slot to record into.
    pub slot: FrameSlot,
    /// Swapchain image acquired for this tick.
    pub image_index: u32,
    /// `false` when the surface is unavailable. Nothing may be recorded,
    /// submitted or retired on an invalid tick.
    pub valid: bool,
}

impl FrameTick {
    /// Create a valid tick.
    pub fn new(slot: FrameSlot, image_index: u32) -> Self {
        Self {
            slot,
            image_index,
            valid: true,
        }
    }

    /// Create a tick for an iteration where no image could be acquired.
    pub fn invalid(slot: FrameSlot) -> Self {
        Self {
            slot,
            image_index: 0,
            valid: false,
        }
    }
}
