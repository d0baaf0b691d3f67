//! # Vista App
//!
//! Headless shape visualization built on the Vista frame pipeline.
//!
//! A lit scene of basic shapes is rendered into a multi-buffered render target
//! on the journaling dummy device. Window events (resizes, minimization,
//! surface loss and shader reloads) are scripted by tick, so every run is
//! reproducible and can be checked against the device journal.
//!
//! ## Overview
//!
//! - [`VisualizationApp`] - Owns the device, uniforms, render target and retirement queue
//! - [`AppArgs`] - Trait for parsing command line arguments
//! - [`scene`] - Camera and light uniform layouts
//!
//! ## Example
//!
//! ```
//! use vista_app::{DefaultAppArgs, VisualizationApp};
//!
//! let args = DefaultAppArgs::default()
//!     .with_frames_in_flight(3)
//!     .with_resize(800, 600, 2)
//!     .with_resize_debounce(1);
//!
//! let mut app = VisualizationApp::new(&args).unwrap();
//! app.run(10).unwrap();
//!
//! let stats = app.shutdown().unwrap();
//! assert_eq!(stats.frames, 10);
//! assert_eq!(stats.rebuilds, 1);
//! ```

mod app;
mod args;
mod error;
pub mod scene;

pub use app::{AppStats, TickOutcome, VisualizationApp};
pub use args::{AppArgs, DefaultAppArgs, ScriptedResize};
pub use error::AppError;

/// App library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the app subsystem.
pub fn init() {
    log::info!("Vista App v{} initialized", VERSION);
}
