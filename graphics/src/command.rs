//! Command recording.
//!
//! A [`CommandStream`] collects the commands of one tick for one
//! `(slot, image_index)` pair. Streams are plain data: recording never touches
//! the backend, and submission hands the whole stream over at once.

use crate::frame::{FrameSlot, FrameTick};
use crate::types::{
    BufferHandle, Extent2d, FramebufferHandle, PassClearValues, PipelineHandle, RenderPassHandle,
    ResourceId, ScissorRect, Viewport,
};

/// A recorded GPU command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Set the viewport.
    SetViewport(Viewport),
    /// Set the scissor rectangle.
    SetScissor(ScissorRect),
    /// Begin a render pass into a framebuffer.
    BeginRenderPass {
        render_pass: RenderPassHandle,
        framebuffer: FramebufferHandle,
        extent: Extent2d,
        clear_values: PassClearValues,
    },
    /// End the current render pass.
    EndRenderPass,
    /// Bind a graphics pipeline.
    BindPipeline(PipelineHandle),
    /// Bind a uniform buffer to a binding slot.
    BindUniformBuffer { binding: u32, buffer: BufferHandle },
    /// Draw non-indexed primitives.
    Draw {
        vertex_count: u32,
        instance_count: u32,
    },
}

impl Command {
    /// GPU objects this command reads from or writes to.
    pub fn resources(&self) -> Vec<ResourceId> {
        match self {
            Self::BeginRenderPass {
                render_pass,
                framebuffer,
                ..
            } => vec![(*render_pass).into(), (*framebuffer).into()],
            Self::BindPipeline(pipeline) => vec![(*pipeline).into()],
            Self::BindUniformBuffer { buffer, .. } => vec![(*buffer).into()],
            Self::SetViewport(_) | Self::SetScissor(_) | Self::EndRenderPass | Self::Draw { .. } => {
                Vec::new()
            }
        }
    }
}

/// Commands recorded for a single tick.
///
/// # Panics
///
/// Recording methods panic on unbalanced or nested render passes and on
/// draws outside a pass. These are bugs in the recording code.
#[derive(Debug, Clone)]
pub struct CommandStream {
    slot: FrameSlot,
    image_index: u32,
    commands: Vec<Command>,
    in_pass: bool,
}

impl CommandStream {
    /// Create an empty stream for a frame slot and swapchain image.
    pub fn new(slot: FrameSlot, image_index: u32) -> Self {
        Self {
            slot,
            image_index,
            commands: Vec::new(),
            in_pass: false,
        }
    }

    /// Create an empty stream for a scheduler tick.
    ///
    /// # Panics
    ///
    /// Panics if the tick is invalid.
    pub fn for_tick(tick: &FrameTick) -> Self {
        assert!(tick.valid, "cannot record commands for an invalid tick");
        Self::new(tick.slot, tick.image_index)
    }

    /// Frame slot the stream records for.
    pub fn slot(&self) -> FrameSlot {
        self.slot
    }

    /// Swapchain image the stream renders to.
    pub fn image_index(&self) -> u32 {
        self.image_index
    }

    /// Recorded commands in order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Number of recorded commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Returns true while a render pass is open.
    pub fn is_in_pass(&self) -> bool {
        self.in_pass
    }

    /// Every GPU object referenced by the stream, deduplicated.
    pub fn referenced_resources(&self) -> Vec<ResourceId> {
        let mut resources: Vec<ResourceId> =
            self.commands.iter().flat_map(Command::resources).collect();
        resources.sort_unstable();
        resources.dedup();
        resources
    }

    /// Set the viewport.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.commands.push(Command::SetViewport(viewport));
    }

    /// Set the scissor rectangle.
    pub fn set_scissor(&mut self, scissor: ScissorRect) {
        self.commands.push(Command::SetScissor(scissor));
    }

    /// Begin a render pass.
    pub fn begin_render_pass(
        &mut self,
        render_pass: RenderPassHandle,
        framebuffer: FramebufferHandle,
        extent: Extent2d,
        clear_values: PassClearValues,
    ) {
        assert!(!self.in_pass, "render pass already open");
        self.in_pass = true;
        self.commands.push(Command::BeginRenderPass {
            render_pass,
            framebuffer,
            extent,
            clear_values,
        });
    }

    /// End the open render pass.
    pub fn end_render_pass(&mut self) {
        assert!(self.in_pass, "no render pass open");
        self.in_pass = false;
        self.commands.push(Command::EndRenderPass);
    }

    /// Bind a graphics pipeline.
    pub fn bind_pipeline(&mut self, pipeline: PipelineHandle) {
        self.commands.push(Command::BindPipeline(pipeline));
    }

    /// Bind a uniform buffer.
    pub fn bind_uniform_buffer(&mut self, binding: u32, buffer: BufferHandle) {
        self.commands
            .push(Command::BindUniformBuffer { binding, buffer });
    }

    /// Record a draw call.
    pub fn draw(&mut self, vertex_count: u32, instance_count: u32) {
        assert!(self.in_pass, "draw recorded outside of a render pass");
        self.commands.push(Command::Draw {
            vertex_count,
            instance_count,
        });
    }
}
