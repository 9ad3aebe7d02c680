//! Texture, sampler and view resources

use crate::rhi::state::descriptors::SamplerData;
use crate::rhi::types::{GlName, ImageFormat, TextureTarget};

use super::SamplerHandle;

/// Texture creation parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDesc {
    /// Binding target
    pub target: TextureTarget,
    /// Width of mip 0
    pub width: u32,
    /// Height of mip 0
    pub height: u32,
    /// Depth or array size
    pub depth: u32,
    /// Number of mip levels
    pub num_mips: u32,
    /// Depth format; attached as depth (or depth-stencil) in framebuffers
    pub is_depth: bool,
    /// Depth format carries stencil
    pub has_stencil: bool,
    /// Debug label
    pub label: Option<String>,
}

impl TextureDesc {
    /// A 2D color texture
    pub fn texture_2d(width: u32, height: u32, num_mips: u32) -> Self {
        Self {
            target: TextureTarget::Texture2D,
            width,
            height,
            depth: 1,
            num_mips,
            is_depth: false,
            has_stencil: false,
            label: None,
        }
    }

    /// A 2D depth-stencil texture
    pub fn depth_stencil(width: u32, height: u32) -> Self {
        Self {
            is_depth: true,
            has_stencil: true,
            ..Self::texture_2d(width, height, 1)
        }
    }

    /// A cube texture
    pub fn cube(size: u32, num_mips: u32) -> Self {
        Self {
            target: TextureTarget::TextureCube,
            ..Self::texture_2d(size, size, num_mips)
        }
    }

    /// Attach a debug label
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Texture
#[derive(Debug, Clone)]
pub struct Texture {
    /// Driver name
    pub name: GlName,
    /// Creation parameters
    pub desc: TextureDesc,
    /// Sampler whose parameters were last written into the texture object
    ///
    /// Only used when sampler objects are unavailable.
    pub(crate) applied_sampler: Option<SamplerHandle>,
}

impl Texture {
    /// Whether every dimension is a power of two
    pub const fn is_power_of_two(&self) -> bool {
        self.desc.width.is_power_of_two() && self.desc.height.is_power_of_two()
    }

    /// Whether the texture has more than one mip level
    pub const fn has_mips(&self) -> bool {
        self.desc.num_mips > 1
    }
}

/// Sampler state
///
/// `name` is 0 when sampler objects are unavailable; the parameters are then
/// written into each texture at bind time.
#[derive(Debug, Clone)]
pub struct SamplerState {
    /// Driver name of the sampler object
    pub name: GlName,
    /// Sampling parameters
    pub data: SamplerData,
}

/// Read-only view of a texture or buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderResourceView {
    /// Binding target, usually a texture buffer
    pub target: TextureTarget,
    /// Driver name of the viewed object
    pub resource: GlName,
    /// Single mip the view is restricted to
    pub limit_mip: Option<u32>,
}

/// Read-write image view for compute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnorderedAccessView {
    /// Driver name of the viewed texture
    pub resource: GlName,
    /// Image unit format
    pub format: ImageFormat,
}
