//! Common types shared across the graphics system.

// ============================================================================
// Extent2d
// ============================================================================

/// 2D extent of a render target or image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2d {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Extent2d {
    /// Create a new extent.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns true if either dimension is zero.
    ///
    /// A minimized window reports a zero-sized extent; nothing can be
    /// rendered into it.
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width divided by height, or 1.0 for degenerate extents.
    pub fn aspect_ratio(&self) -> f32 {
        if self.is_degenerate() {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

impl std::fmt::Display for Extent2d {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

// ============================================================================
// Viewport
// ============================================================================

/// Viewport configuration for rendering.
///
/// Defines the rectangular region of the framebuffer that will be rendered to,
/// along with the depth range mapping. Depth uses the `[0, 1]` convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// X coordinate of the viewport's top-left corner.
    pub x: f32,
    /// Y coordinate of the viewport's top-left corner.
    pub y: f32,
    /// Width of the viewport.
    pub width: f32,
    /// Height of the viewport.
    pub height: f32,
    /// Minimum depth value (default: 0.0).
    pub min_depth: f32,
    /// Maximum depth value (default: 1.0).
    pub max_depth: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

impl Viewport {
    /// Create a new viewport with standard `[0, 1]` depth range.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }

    /// Create a viewport covering a whole extent, origin at (0, 0).
    pub fn from_extent(extent: Extent2d) -> Self {
        Self::new(0.0, 0.0, extent.width as f32, extent.height as f32)
    }
}

// ============================================================================
// Scissor Rectangle
// ============================================================================

/// Scissor rectangle for clipping rendering.
///
/// Pixels outside the scissor rectangle are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScissorRect {
    /// X coordinate of the top-left corner.
    pub x: i32,
    /// Y coordinate of the top-left corner.
    pub y: i32,
    /// Width of the scissor rectangle.
    pub width: u32,
    /// Height of the scissor rectangle.
    pub height: u32,
}

impl ScissorRect {
    /// Create a new scissor rectangle.
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a scissor rectangle covering a whole extent.
    pub fn from_extent(extent: Extent2d) -> Self {
        Self::new(0, 0, extent.width, extent.height)
    }
}

// ============================================================================
// Clear values
// ============================================================================

/// Clear value for render target attachments.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ClearValue {
    /// No clear operation.
    #[default]
    None,
    /// Clear color attachment with RGBA values.
    Color { r: f32, g: f32, b: f32, a: f32 },
    /// Clear depth and stencil attachments.
    DepthStencil { depth: f32, stencil: u32 },
}

impl ClearValue {
    /// Create a color clear value.
    pub fn color(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self::Color { r, g, b, a }
    }

    /// Create a depth clear value with a zero stencil.
    pub fn depth(depth: f32) -> Self {
        Self::DepthStencil { depth, stencil: 0 }
    }
}
