//! Command line arguments trait and default implementation.
//!
//! Uses clap for CLI parsing with:
//! - Help text (`--help`)
//! - Validation and clear error messages
//! - Scripted window events for headless runs

use std::str::FromStr;

use vista_graphics::Extent2d;

use crate::error::AppError;

/// A window resize injected at a given tick, written as `WxH@tick`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptedResize {
    pub extent: Extent2d,
    pub tick: u64,
}

impl FromStr for ScriptedResize {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::InvalidArgument(format!("expected WxH@tick, got '{s}'"));

        let (size, tick) = s.split_once('@').ok_or_else(invalid)?;
        let (width, height) = size.split_once(['x', 'X']).ok_or_else(invalid)?;
        Ok(Self {
            extent: Extent2d::new(
                width.trim().parse().map_err(|_| invalid())?,
                height.trim().parse().map_err(|_| invalid())?,
            ),
            tick: tick.trim().parse().map_err(|_| invalid())?,
        })
    }
}

/// Trait for parsing command line arguments.
///
/// Every method has a default, so implementations only override the options
/// they care about.
///
/// # Example
///
/// ```
/// use vista_app::AppArgs;
///
/// struct TripleBuffered;
///
/// impl AppArgs for TripleBuffered {
///     fn parse() -> Self {
///         TripleBuffered
///     }
///
///     fn frames_in_flight(&self) -> usize {
///         3
///     }
/// }
///
/// assert_eq!(TripleBuffered.frames_in_flight(), 3);
/// assert_eq!(TripleBuffered.max_frames(), 600);
/// ```
pub trait AppArgs: Sized {
    /// Parse command line arguments.
    fn parse() -> Self;

    /// Number of frames the CPU may record ahead of the GPU.
    ///
    /// Default: 2
    fn frames_in_flight(&self) -> usize {
        2
    }

    /// Number of swapchain images.
    ///
    /// Default: 3
    fn image_count(&self) -> u32 {
        3
    }

    /// Initial size of the scene view.
    ///
    /// Default: 1280x720
    fn scene_size(&self) -> Extent2d {
        Extent2d::new(1280, 720)
    }

    /// MSAA sample count for the scene target.
    ///
    /// Default: 1
    fn sample_count(&self) -> u32 {
        1
    }

    /// Number of ticks to run before exiting.
    ///
    /// Default: 600
    fn max_frames(&self) -> u64 {
        600
    }

    /// Ticks a window size must stay unchanged before it is applied.
    ///
    /// Default: 3
    fn resize_debounce(&self) -> u32 {
        3
    }

    /// Window resizes to inject.
    fn resizes(&self) -> &[ScriptedResize] {
        &[]
    }

    /// Ticks during which the surface is unavailable.
    fn surface_loss_ticks(&self) -> &[u64] {
        &[]
    }

    /// Ticks at which the shape pipeline is reloaded.
    fn reload_ticks(&self) -> &[u64] {
        &[]
    }
}

// ============================================================================
// Default App Args (with clap)
// ============================================================================

/// Default command line arguments implementation.
///
/// # Examples
///
/// ```bash
/// # Show help
/// vista --help
///
/// # Triple-buffered, 4x MSAA, 120 ticks
/// vista --frames-in-flight 3 --samples 4 --max-frames 120
///
/// # Drag the window a few times, minimize, reload shaders
/// vista --resize 1024x768@10 --resize 800x600@11 --resize 0x0@40 --reload 60
/// ```
#[derive(Debug, Clone)]
pub struct DefaultAppArgs {
    frames_in_flight: usize,
    image_count: u32,
    scene_size: Extent2d,
    sample_count: u32,
    max_frames: u64,
    resize_debounce: u32,
    resizes: Vec<ScriptedResize>,
    surface_loss_ticks: Vec<u64>,
    reload_ticks: Vec<u64>,
}

impl Default for DefaultAppArgs {
    fn default() -> Self {
        Self {
            frames_in_flight: 2,
            image_count: 3,
            scene_size: Extent2d::new(1280, 720),
            sample_count: 1,
            max_frames: 600,
            resize_debounce: 3,
            resizes: Vec::new(),
            surface_loss_ticks: Vec::new(),
            reload_ticks: Vec::new(),
        }
    }
}

impl DefaultAppArgs {
    /// Set the number of frames in flight.
    pub fn with_frames_in_flight(mut self, frames_in_flight: usize) -> Self {
        self.frames_in_flight = frames_in_flight;
        self
    }

    /// Set the number of swapchain images.
    pub fn with_image_count(mut self, image_count: u32) -> Self {
        self.image_count = image_count;
        self
    }

    /// Set the initial scene size.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.scene_size = Extent2d::new(width, height);
        self
    }

    /// Set the MSAA sample count.
    pub fn with_sample_count(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }

    /// Set the maximum number of frames.
    pub fn with_max_frames(mut self, max_frames: u64) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Set the resize debounce period in ticks.
    pub fn with_resize_debounce(mut self, ticks: u32) -> Self {
        self.resize_debounce = ticks;
        self
    }

    /// Inject a window resize at `tick`.
    pub fn with_resize(mut self, width: u32, height: u32, tick: u64) -> Self {
        self.resizes.push(ScriptedResize {
            extent: Extent2d::new(width, height),
            tick,
        });
        self
    }

    /// Make the surface unavailable at `tick`.
    pub fn with_surface_loss(mut self, tick: u64) -> Self {
        self.surface_loss_ticks.push(tick);
        self
    }

    /// Reload the shape pipeline at `tick`.
    pub fn with_reload(mut self, tick: u64) -> Self {
        self.reload_ticks.push(tick);
        self
    }

    /// Parse from an explicit argument list.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        use clap::Parser;
        native::ClapArgs::try_parse_from(args).map(Into::into)
    }
}

impl AppArgs for DefaultAppArgs {
    fn parse() -> Self {
        use clap::Parser;
        native::ClapArgs::parse().into()
    }

    fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    fn image_count(&self) -> u32 {
        self.image_count
    }

    fn scene_size(&self) -> Extent2d {
        self.scene_size
    }

    fn sample_count(&self) -> u32 {
        self.sample_count
    }

    fn max_frames(&self) -> u64 {
        self.max_frames
    }

    fn resize_debounce(&self) -> u32 {
        self.resize_debounce
    }

    fn resizes(&self) -> &[ScriptedResize] {
        &self.resizes
    }

    fn surface_loss_ticks(&self) -> &[u64] {
        &self.surface_loss_ticks
    }

    fn reload_ticks(&self) -> &[u64] {
        &self.reload_ticks
    }
}

// ============================================================================
// Clap parser
// ============================================================================

mod native {
    use super::*;
    use clap::Parser;

    /// Vista shape visualization arguments.
    #[derive(Parser, Debug)]
    #[command(
        name = "vista",
        about = "Headless shape visualization on the Vista frame pipeline",
        long_about = "Renders a lit shape scene through the frame-pipelined resource \
            lifecycle manager on a journaling dummy device.\n\n\
            Window events are scripted by tick so that resizes, minimization \
            and shader reloads can be reproduced exactly.\n\
            \n\
            EXAMPLES:\n\
              # Triple buffering with 4x MSAA\n\
              vista --frames-in-flight 3 --samples 4\n\
            \n\
              # Resize twice in a row, then minimize\n\
              vista --resize 1024x768@10 --resize 800x600@11 --resize 0x0@40",
        version
    )]
    pub(super) struct ClapArgs {
        /// Frames the CPU may record ahead of the GPU.
        #[arg(long, default_value = "2")]
        pub frames_in_flight: usize,

        /// Number of swapchain images.
        #[arg(long, default_value = "3")]
        pub images: u32,

        /// Initial scene width in pixels.
        #[arg(long, default_value = "1280")]
        pub width: u32,

        /// Initial scene height in pixels.
        #[arg(long, default_value = "720")]
        pub height: u32,

        /// MSAA sample count for the scene target.
        #[arg(long, default_value = "1")]
        pub samples: u32,

        /// Exit after N ticks.
        #[arg(long, default_value = "600")]
        pub max_frames: u64,

        /// Ticks a new window size must stay unchanged before it is applied.
        #[arg(long, default_value = "3")]
        pub debounce: u32,

        /// Resize the window at a tick, as WxH@tick. Repeatable.
        #[arg(long, value_name = "WxH@TICK")]
        pub resize: Vec<ScriptedResize>,

        /// Make the surface unavailable at a tick. Repeatable.
        #[arg(long, value_name = "TICK")]
        pub lose_surface: Vec<u64>,

        /// Reload the shape pipeline at a tick. Repeatable.
        #[arg(long, value_name = "TICK")]
        pub reload: Vec<u64>,
    }

    impl From<ClapArgs> for DefaultAppArgs {
        fn from(args: ClapArgs) -> Self {
            if args.images < args.frames_in_flight as u32 {
                log::warn!(
                    "{} swapchain images for {} frames in flight: frames will wait on presentation",
                    args.images,
                    args.frames_in_flight
                );
            }

            Self {
                frames_in_flight: args.frames_in_flight,
                image_count: args.images,
                scene_size: Extent2d::new(args.width, args.height),
                sample_count: args.samples,
                max_frames: args.max_frames,
                resize_debounce: args.debounce,
                resizes: args.resize,
                surface_loss_ticks: args.lose_surface,
                reload_ticks: args.reload,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scripted_resize() {
        let resize: ScriptedResize = "1024x768@12".parse().unwrap();
        assert_eq!(resize.extent, Extent2d::new(1024, 768));
        assert_eq!(resize.tick, 12);
    }

    #[test]
    fn test_parse_zero_sized_resize() {
        let resize: ScriptedResize = "0x0@3".parse().unwrap();
        assert!(resize.extent.is_degenerate());
    }

    #[test]
    fn test_reject_malformed_resize() {
        for input in ["1024x768", "1024@3", "ax768@3", "1024x768@-1", ""] {
            assert!(input.parse::<ScriptedResize>().is_err(), "{input}");
        }
    }

    #[test]
    fn test_cli_defaults() {
        let args = DefaultAppArgs::try_parse_from(["vista"]).unwrap();
        assert_eq!(args.frames_in_flight(), 2);
        assert_eq!(args.image_count(), 3);
        assert_eq!(args.scene_size(), Extent2d::new(1280, 720));
        assert_eq!(args.max_frames(), 600);
        assert!(args.resizes().is_empty());
    }

    #[test]
    fn test_cli_scripted_events() {
        let args = DefaultAppArgs::try_parse_from([
            "vista",
            "--frames-in-flight",
            "3",
            "--resize",
            "800x600@5",
            "--resize",
            "0x0@9",
            "--lose-surface",
            "20",
            "--reload",
            "30",
        ])
        .unwrap();

        assert_eq!(args.frames_in_flight(), 3);
        assert_eq!(args.resizes().len(), 2);
        assert_eq!(args.resizes()[1].extent, Extent2d::new(0, 0));
        assert_eq!(args.surface_loss_ticks(), &[20]);
        assert_eq!(args.reload_ticks(), &[30]);
    }

    #[test]
    fn test_cli_rejects_bad_resize() {
        assert!(DefaultAppArgs::try_parse_from(["vista", "--resize", "big@1"]).is_err());
    }
}
