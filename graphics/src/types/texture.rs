//! Texture types and descriptors.

use super::Extent2d;
use bitflags::bitflags;

/// Texture format enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum TextureFormat {
    /// 8-bit RGBA channels, unsigned normalized.
    #[default]
    Rgba8Unorm,
    /// 8-bit RGBA channels, sRGB.
    Rgba8UnormSrgb,
    /// 8-bit BGRA channels, unsigned normalized.
    Bgra8Unorm,
    /// 8-bit BGRA channels, sRGB.
    Bgra8UnormSrgb,
    /// 16-bit RGBA channels, float.
    Rgba16Float,
    /// 16-bit depth.
    Depth16Unorm,
    /// 24-bit depth with 8-bit stencil.
    Depth24PlusStencil8,
    /// 32-bit depth, float.
    Depth32Float,
}

impl TextureFormat {
    /// Returns true if this is a depth or stencil format.
    pub fn is_depth_stencil(&self) -> bool {
        matches!(
            self,
            Self::Depth16Unorm | Self::Depth24PlusStencil8 | Self::Depth32Float
        )
    }
}

bitflags! {
    /// Usage flags for textures.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// Texture can be copied from.
        const COPY_SRC = 1 << 0;
        /// Texture can be copied to.
        const COPY_DST = 1 << 1;
        /// Texture can be sampled in a shader.
        const TEXTURE_BINDING = 1 << 2;
        /// Texture can be used as a color or depth attachment.
        const RENDER_ATTACHMENT = 1 << 3;
    }
}

impl Default for TextureUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Descriptor for creating a 2D image together with its default view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    /// Debug label for the texture.
    pub label: Option<String>,
    /// Size of the texture.
    pub size: Extent2d,
    /// Sample count for multisampling.
    pub sample_count: u32,
    /// Texture format.
    pub format: TextureFormat,
    /// Usage flags.
    pub usage: TextureUsage,
}

impl TextureDescriptor {
    /// Create a new 2D texture descriptor.
    pub fn new_2d(size: Extent2d, format: TextureFormat, usage: TextureUsage) -> Self {
        Self {
            label: None,
            size,
            sample_count: 1,
            format,
            usage,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the sample count for multisampling.
    pub fn with_sample_count(mut self, count: u32) -> Self {
        self.sample_count = count;
        self
    }
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            size: Extent2d::default(),
            sample_count: 1,
            format: TextureFormat::default(),
            usage: TextureUsage::empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_formats() {
        assert!(TextureFormat::Depth32Float.is_depth_stencil());
        assert!(TextureFormat::Depth24PlusStencil8.is_depth_stencil());
        assert!(!TextureFormat::Bgra8UnormSrgb.is_depth_stencil());
    }

    #[test]
    fn test_descriptor_builder() {
        let desc = TextureDescriptor::new_2d(
            Extent2d::new(640, 480),
            TextureFormat::Rgba16Float,
            TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
        )
        .with_label("scene_color")
        .with_sample_count(4);

        assert_eq!(desc.size, Extent2d::new(640, 480));
        assert_eq!(desc.sample_count, 4);
        assert_eq!(desc.label.as_deref(), Some("scene_color"));
    }
}
