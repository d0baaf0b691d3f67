//! Sampler types and descriptors.

/// Texture addressing mode outside the `[0, 1]` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    /// Clamp coordinates to the edge texel.
    #[default]
    ClampToEdge,
    /// Repeat the texture.
    Repeat,
    /// Repeat the texture, mirroring every other tile.
    MirrorRepeat,
}

/// Texel filtering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    /// Nearest neighbour.
    #[default]
    Nearest,
    /// Linear interpolation.
    Linear,
}

/// Descriptor for creating a sampler.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SamplerDescriptor {
    /// Debug label for the sampler.
    pub label: Option<String>,
    /// Address mode for U and V coordinates.
    pub address_mode: AddressMode,
    /// Magnification filter.
    pub mag_filter: FilterMode,
    /// Minification filter.
    pub min_filter: FilterMode,
}

impl SamplerDescriptor {
    /// Create a new sampler descriptor with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a linear filtering sampler.
    ///
    /// Used to blit render targets into UI panels.
    pub fn linear() -> Self {
        Self {
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            ..Default::default()
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}
