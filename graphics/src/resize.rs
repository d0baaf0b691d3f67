//! Window resize debouncing.
//!
//! This module provides [`ResizeManager`] for turning a burst of window size
//! changes into a single render target rebuild.
//!
//! # The Problem
//!
//! During window drag-resize, the OS sends many resize events rapidly:
//!
//! ```text
//! Tick:    0     1     2     3    ...   30 (user stops dragging)
//! Events:  R     R     R     R    ...    R
//! Sizes:  800   820   850   900   ...  1200
//! ```
//!
//! Rebuilding on every event would create and retire dozens of full render
//! targets, each of which stays alive for N + 1 ticks.
//!
//! # Solution: Deferred Resize
//!
//! Buffer resize events and only publish once the size has been stable for a
//! number of ticks:
//!
//! ```text
//! Events:  R  R  R  R  R  R  ... R [quiet ticks]
//!          └──────────────────────┘      │
//!            (events buffered)           ▼
//!                              One ResizeEvent published
//! ```
//!
//! Zero sizes (minimized windows) are forwarded like any other size; the
//! render target manager decides to reject them. A rejected event should be
//! handed back through [`ResizeManager::reject`], so that the same size is
//! accepted again the next time the window reports it.
//!
//! # Example
//!
//! ```
//! use vista_graphics::events::EventChannel;
//! use vista_graphics::resize::ResizeManager;
//! use vista_graphics::types::Extent2d;
//!
//! let channel = EventChannel::new();
//! let subscription = channel.subscribe();
//! let mut resize = ResizeManager::new(Extent2d::new(800, 600), 1);
//!
//! resize.on_resize_event(1024, 768);
//! assert!(!resize.update_and_publish(&channel));
//! assert!(resize.update_and_publish(&channel));
//! assert_eq!(subscription.latest().unwrap().extent(), Extent2d::new(1024, 768));
//! ```

use crate::events::EventChannel;
use crate::types::Extent2d;

/// A debounced change of the presentation size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeEvent {
    /// New width in pixels.
    pub width: u32,
    /// New height in pixels.
    pub height: u32,
    /// Previous width in pixels.
    pub previous_width: u32,
    /// Previous height in pixels.
    pub previous_height: u32,
}

impl ResizeEvent {
    /// New size.
    pub fn extent(&self) -> Extent2d {
        Extent2d::new(self.width, self.height)
    }

    /// Previous size.
    pub fn previous_extent(&self) -> Extent2d {
        Extent2d::new(self.previous_width, self.previous_height)
    }
}

/// Manages window resize events with debouncing.
///
/// `ResizeManager` buffers resize events and only reports a resize after the
/// size has not changed for a configurable number of ticks.
///
/// ```text
/// ┌─────────────────────────────────────────────────────────────────┐
/// │                     ResizeManager                               │
/// ├─────────────────────────────────────────────────────────────────┤
/// │  on_resize_event()  ──►  [Pending Size, quiet ticks = 0]        │
/// │                                    │                            │
/// │  update() once per tick  ──►  quiet ticks + 1                   │
/// │     │                                                           │
/// │     └──►  ResizeEvent when quiet ticks reach the debounce       │
/// └─────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug)]
pub struct ResizeManager {
    /// Pending resize size (buffered, not yet applied).
    pending_size: Option<Extent2d>,

    /// Ticks since the last resize event.
    quiet_ticks: u32,

    /// How many quiet ticks to wait before applying a resize.
    debounce_ticks: u32,

    /// Last applied size.
    current_size: Extent2d,
}

impl ResizeManager {
    /// Create a new resize manager.
    ///
    /// With `debounce_ticks == 0` a pending size is applied by the next
    /// [`update`](Self::update).
    pub fn new(initial_size: Extent2d, debounce_ticks: u32) -> Self {
        Self {
            pending_size: None,
            quiet_ticks: 0,
            debounce_ticks,
            current_size: initial_size,
        }
    }

    /// Set the debounce length in ticks.
    pub fn set_debounce(&mut self, debounce_ticks: u32) {
        self.debounce_ticks = debounce_ticks;
    }

    /// Handle a window resize event.
    ///
    /// Events repeating the pending or current size are ignored.
    pub fn on_resize_event(&mut self, width: u32, height: u32) {
        let new_size = Extent2d::new(width, height);

        if Some(new_size) == self.pending_size {
            return;
        }
        if new_size == self.current_size {
            // Back to the applied size: nothing to do anymore.
            self.pending_size = None;
            return;
        }

        self.pending_size = Some(new_size);
        self.quiet_ticks = 0;

        log::trace!(
            "Resize event: {new_size} (pending, debounce={} ticks)",
            self.debounce_ticks
        );
    }

    /// Advance by one tick.
    ///
    /// Returns `Some(ResizeEvent)` once a pending size has been stable for the
    /// debounce period.
    pub fn update(&mut self) -> Option<ResizeEvent> {
        let size = self.pending_size?;
        if self.quiet_ticks < self.debounce_ticks {
            self.quiet_ticks += 1;
            return None;
        }
        self.pending_size = None;
        Some(self.apply(size, "applied"))
    }

    /// Advance by one tick and publish a resulting resize on `channel`.
    ///
    /// Returns true if an event was published.
    pub fn update_and_publish(&mut self, channel: &EventChannel<ResizeEvent>) -> bool {
        match self.update() {
            Some(event) => {
                channel.publish(event);
                true
            }
            None => false,
        }
    }

    /// Apply a pending resize immediately.
    ///
    /// # Returns
    ///
    /// - `Some(ResizeEvent)` if there was a pending resize
    /// - `None` if no resize was pending
    pub fn force_resize(&mut self) -> Option<ResizeEvent> {
        let size = self.pending_size.take()?;
        Some(self.apply(size, "forced"))
    }

    fn apply(&mut self, size: Extent2d, how: &str) -> ResizeEvent {
        let previous = self.current_size;
        self.current_size = size;
        self.quiet_ticks = 0;

        log::debug!("Resize {how}: {previous} -> {size}");

        ResizeEvent {
            width: size.width,
            height: size.height,
            previous_width: previous.width,
            previous_height: previous.height,
        }
    }

    /// Undo an applied resize that the consumer could not honor.
    ///
    /// Restores the size from before `event`, so a later event repeating
    /// `event`'s size is no longer ignored. Does nothing and returns false if
    /// a newer size has been applied since.
    pub fn reject(&mut self, event: &ResizeEvent) -> bool {
        if self.current_size != event.extent() {
            return false;
        }
        self.current_size = event.previous_extent();
        log::debug!(
            "Resize rejected: {} -> {} reverted",
            event.previous_extent(),
            event.extent()
        );
        true
    }

    /// Last applied size.
    pub fn current_size(&self) -> Extent2d {
        self.current_size
    }

    /// Size that will be applied after the debounce period, if any.
    pub fn pending_size(&self) -> Option<Extent2d> {
        self.pending_size
    }

    /// Returns true while a resize is pending.
    pub fn is_resizing(&self) -> bool {
        self.pending_size.is_some()
    }

    /// Ticks left before the pending resize is applied.
    pub fn remaining_debounce(&self) -> u32 {
        if self.pending_size.is_some() {
            self.debounce_ticks.saturating_sub(self.quiet_ticks)
        } else {
            0
        }
    }

    /// Cancel any pending resize.
    pub fn cancel_pending(&mut self) {
        self.pending_size = None;
        self.quiet_ticks = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let manager = ResizeManager::new(Extent2d::new(1920, 1080), 3);
        assert_eq!(manager.current_size(), Extent2d::new(1920, 1080));
        assert!(!manager.is_resizing());
        assert!(manager.pending_size().is_none());
    }

    #[test]
    fn test_resize_event_sets_pending() {
        let mut manager = ResizeManager::new(Extent2d::new(1920, 1080), 3);
        manager.on_resize_event(1024, 768);
        assert!(manager.is_resizing());
        assert_eq!(manager.pending_size(), Some(Extent2d::new(1024, 768)));
        assert_eq!(manager.remaining_debounce(), 3);
    }

    #[test]
    fn test_same_size_ignored() {
        let mut manager = ResizeManager::new(Extent2d::new(1920, 1080), 3);
        manager.on_resize_event(1920, 1080);
        assert!(!manager.is_resizing());
    }

    #[test]
    fn test_debounce_in_ticks() {
        let mut manager = ResizeManager::new(Extent2d::new(800, 600), 2);
        manager.on_resize_event(1024, 768);

        assert!(manager.update().is_none());
        assert!(manager.update().is_none());
        let event = manager.update().unwrap();
        assert_eq!(event.extent(), Extent2d::new(1024, 768));
        assert_eq!(event.previous_extent(), Extent2d::new(800, 600));
        assert!(manager.update().is_none());
    }

    #[test]
    fn test_new_event_restarts_debounce() {
        let mut manager = ResizeManager::new(Extent2d::new(800, 600), 1);
        manager.on_resize_event(900, 600);
        assert!(manager.update().is_none());
        manager.on_resize_event(1000, 600);
        assert!(manager.update().is_none());
        assert_eq!(manager.update().unwrap().width, 1000);
    }

    #[test]
    fn test_zero_size_forwarded() {
        let mut manager = ResizeManager::new(Extent2d::new(800, 600), 0);
        manager.on_resize_event(0, 0);
        let event = manager.update().unwrap();
        assert!(event.extent().is_degenerate());

        manager.on_resize_event(800, 600);
        assert_eq!(manager.update().unwrap().extent(), Extent2d::new(800, 600));
    }

    #[test]
    fn test_rejected_size_is_accepted_again() {
        let mut manager = ResizeManager::new(Extent2d::new(800, 600), 0);
        manager.on_resize_event(1024, 768);
        let event = manager.update().unwrap();

        assert!(manager.reject(&event));
        assert_eq!(manager.current_size(), Extent2d::new(800, 600));

        manager.on_resize_event(1024, 768);
        assert_eq!(manager.update(), Some(event));
    }

    #[test]
    fn test_reject_after_newer_resize_is_ignored() {
        let mut manager = ResizeManager::new(Extent2d::new(800, 600), 0);
        manager.on_resize_event(1024, 768);
        let stale = manager.update().unwrap();
        manager.on_resize_event(640, 480);
        manager.update().unwrap();

        assert!(!manager.reject(&stale));
        assert_eq!(manager.current_size(), Extent2d::new(640, 480));
    }

    #[test]
    fn test_force_resize() {
        let mut manager = ResizeManager::new(Extent2d::new(800, 600), 10);
        manager.on_resize_event(1024, 768);
        let event = manager.force_resize().unwrap();
        assert_eq!(event.width, 1024);
        assert!(!manager.is_resizing());
        assert!(manager.force_resize().is_none());
    }

    #[test]
    fn test_cancel_pending() {
        let mut manager = ResizeManager::new(Extent2d::new(800, 600), 1);
        manager.on_resize_event(1024, 768);
        manager.cancel_pending();
        assert!(manager.update().is_none());
        assert_eq!(manager.current_size(), Extent2d::new(800, 600));
    }
}
