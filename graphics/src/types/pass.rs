//! Render pass, framebuffer and pipeline descriptors.

use super::{ClearValue, Extent2d, ImageHandle, RenderPassHandle, TextureFormat};

/// Descriptor for a render pass with one color and one depth attachment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderPassDescriptor {
    /// Debug label.
    pub label: Option<String>,
    /// Format of the color attachment.
    pub color_format: TextureFormat,
    /// Format of the depth attachment.
    pub depth_format: TextureFormat,
    /// Sample count of the color and depth attachments.
    ///
    /// Values above 1 add a single-sampled resolve attachment.
    pub sample_count: u32,
}

impl RenderPassDescriptor {
    /// Create a new render pass descriptor.
    pub fn new(color_format: TextureFormat, depth_format: TextureFormat) -> Self {
        Self {
            label: None,
            color_format,
            depth_format,
            sample_count: 1,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the sample count.
    pub fn with_sample_count(mut self, count: u32) -> Self {
        self.sample_count = count;
        self
    }

    /// Returns true if the pass resolves a multisampled color attachment.
    pub fn has_resolve(&self) -> bool {
        self.sample_count > 1
    }

    /// Number of attachments a compatible framebuffer must provide.
    pub fn attachment_count(&self) -> usize {
        if self.has_resolve() { 3 } else { 2 }
    }
}

/// Descriptor for a framebuffer.
///
/// Attachments are ordered color, depth, then the resolve target if the
/// render pass has one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FramebufferDescriptor {
    /// Debug label.
    pub label: Option<String>,
    /// Render pass the framebuffer is compatible with.
    pub render_pass: RenderPassHandle,
    /// Attachment images.
    pub attachments: Vec<ImageHandle>,
    /// Size of every attachment.
    pub extent: Extent2d,
}

impl FramebufferDescriptor {
    /// Create a new framebuffer descriptor.
    pub fn new(render_pass: RenderPassHandle, attachments: Vec<ImageHandle>, extent: Extent2d) -> Self {
        Self {
            label: None,
            render_pass,
            attachments,
            extent,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Descriptor for a graphics pipeline.
///
/// Shader modules are referenced by name; compiling them is the backend's
/// concern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineDescriptor {
    /// Debug label.
    pub label: Option<String>,
    /// Name of the shader program.
    pub shader: String,
    /// Color format of the render pass the pipeline draws into.
    pub color_format: TextureFormat,
    /// Depth format of the render pass the pipeline draws into.
    pub depth_format: TextureFormat,
    /// Sample count of the render pass the pipeline draws into.
    pub sample_count: u32,
}

impl PipelineDescriptor {
    /// Create a pipeline descriptor compatible with the given render pass layout.
    pub fn for_pass(shader: impl Into<String>, pass: &RenderPassDescriptor) -> Self {
        Self {
            label: None,
            shader: shader.into(),
            color_format: pass.color_format,
            depth_format: pass.depth_format,
            sample_count: pass.sample_count,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Clear values used at the start of a render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassClearValues {
    /// Clear value of the color attachment.
    pub color: ClearValue,
    /// Clear value of the depth attachment.
    pub depth: ClearValue,
}

impl Default for PassClearValues {
    fn default() -> Self {
        Self {
            color: ClearValue::color(0.0, 0.0, 0.0, 1.0),
            depth: ClearValue::depth(1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_count() {
        let pass = RenderPassDescriptor::new(TextureFormat::Rgba8Unorm, TextureFormat::Depth32Float);
        assert_eq!(pass.attachment_count(), 2);
        assert_eq!(pass.with_sample_count(4).attachment_count(), 3);
    }

    #[test]
    fn test_pipeline_matches_pass() {
        let pass = RenderPassDescriptor::new(TextureFormat::Bgra8Unorm, TextureFormat::Depth24PlusStencil8)
            .with_sample_count(4);
        let pipeline = PipelineDescriptor::for_pass("shapes", &pass);
        assert_eq!(pipeline.color_format, TextureFormat::Bgra8Unorm);
        assert_eq!(pipeline.sample_count, 4);
    }
}
