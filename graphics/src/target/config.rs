//! Render target configuration.

use crate::device::DeviceCapabilities;
use crate::error::GraphicsError;
use crate::types::{ClearValue, PassClearValues, RenderPassDescriptor, TextureFormat};

/// Formats, multisampling and clear values of the targets built by a
/// [`RenderTargetManager`](super::RenderTargetManager).
///
/// The configuration is fixed for the lifetime of the manager; only the
/// extent changes between rebuilds.
///
/// # Example
///
/// ```
/// use vista_graphics::target::RenderTargetConfig;
/// use vista_graphics::types::TextureFormat;
///
/// let config = RenderTargetConfig::new()
///     .with_color_format(TextureFormat::Rgba16Float)
///     .with_sample_count(4)
///     .with_clear_color([0.1, 0.1, 0.12, 1.0]);
/// assert_eq!(config.sample_count, 4);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTargetConfig {
    /// Debug label prefix for created objects.
    pub label: String,
    /// Color attachment format.
    pub color_format: TextureFormat,
    /// Depth attachment format.
    pub depth_format: TextureFormat,
    /// Sample count of the color and depth attachments.
    pub sample_count: u32,
    /// Color the color attachment is cleared to.
    pub clear_color: [f32; 4],
    /// Value the depth attachment is cleared to.
    pub clear_depth: f32,
    /// Register each per-image color result with the display registry.
    pub register_display: bool,
}

impl Default for RenderTargetConfig {
    fn default() -> Self {
        Self {
            label: "scene".to_string(),
            color_format: TextureFormat::Rgba8Unorm,
            depth_format: TextureFormat::Depth32Float,
            sample_count: 1,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            clear_depth: 1.0,
            register_display: true,
        }
    }
}

impl RenderTargetConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the debug label prefix.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the color format.
    pub fn with_color_format(mut self, format: TextureFormat) -> Self {
        self.color_format = format;
        self
    }

    /// Set the depth format.
    pub fn with_depth_format(mut self, format: TextureFormat) -> Self {
        self.depth_format = format;
        self
    }

    /// Set the sample count.
    pub fn with_sample_count(mut self, count: u32) -> Self {
        self.sample_count = count;
        self
    }

    /// Set the clear color.
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    /// Set the clear depth.
    pub fn with_clear_depth(mut self, depth: f32) -> Self {
        self.clear_depth = depth;
        self
    }

    /// Enable or disable display registration.
    pub fn with_display_registration(mut self, enabled: bool) -> Self {
        self.register_display = enabled;
        self
    }

    /// Check the configuration against device capabilities.
    pub fn validate(&self, capabilities: &DeviceCapabilities) -> Result<(), GraphicsError> {
        if !capabilities.supports_color_format(self.color_format) {
            return Err(GraphicsError::FeatureNotSupported(format!(
                "color format {:?}",
                self.color_format
            )));
        }
        if !capabilities.supports_depth_format(self.depth_format) {
            return Err(GraphicsError::FeatureNotSupported(format!(
                "depth format {:?}",
                self.depth_format
            )));
        }
        if !capabilities.supports_sample_count(self.sample_count) {
            return Err(GraphicsError::FeatureNotSupported(format!(
                "sample count {} (max {})",
                self.sample_count, capabilities.max_sample_count
            )));
        }
        if !(0.0..=1.0).contains(&self.clear_depth) {
            return Err(GraphicsError::InvalidParameter(format!(
                "clear depth {} outside [0, 1]",
                self.clear_depth
            )));
        }
        Ok(())
    }

    /// Returns true if targets carry a resolve attachment.
    pub fn is_multisampled(&self) -> bool {
        self.sample_count > 1
    }

    /// Render pass layout matching this configuration.
    pub fn render_pass_descriptor(&self) -> RenderPassDescriptor {
        RenderPassDescriptor::new(self.color_format, self.depth_format)
            .with_sample_count(self.sample_count)
            .with_label(format!("{}.pass", self.label))
    }

    /// Clear values applied at the start of every pass.
    pub fn clear_values(&self) -> PassClearValues {
        let [r, g, b, a] = self.clear_color;
        PassClearValues {
            color: ClearValue::color(r, g, b, a),
            depth: ClearValue::depth(self.clear_depth),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = RenderTargetConfig::default();
        assert!(config.validate(&DeviceCapabilities::default()).is_ok());
        assert!(!config.is_multisampled());
    }

    #[test]
    fn test_depth_format_as_color_rejected() {
        let config = RenderTargetConfig::new().with_color_format(TextureFormat::Depth32Float);
        assert!(matches!(
            config.validate(&DeviceCapabilities::default()),
            Err(GraphicsError::FeatureNotSupported(_))
        ));
    }

    #[test]
    fn test_sample_count_above_limit_rejected() {
        let config = RenderTargetConfig::new().with_sample_count(8);
        let caps = DeviceCapabilities::default().with_max_sample_count(4);
        assert!(config.validate(&caps).is_err());
    }

    #[test]
    fn test_clear_values() {
        let config = RenderTargetConfig::new()
            .with_clear_color([0.2, 0.3, 0.4, 1.0])
            .with_clear_depth(0.0);
        let clear = config.clear_values();
        assert_eq!(clear.color, ClearValue::color(0.2, 0.3, 0.4, 1.0));
        assert_eq!(clear.depth, ClearValue::depth(0.0));
    }
}
