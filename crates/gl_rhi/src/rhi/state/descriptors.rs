//! Immutable state descriptors
//!
//! Plain value objects the engine hands to the `set_*` entry points. They
//! carry GL-level meaning already (a cull mode is a GL face, a depth bias is
//! still in normalized units), so commit code only has to diff and issue.

use serde::{Serialize, Deserialize};

use crate::rhi::types::*;

/// Rasterizer state
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RasterizerStateData {
    /// Polygon fill mode
    pub fill_mode: FillMode,
    /// Culled face
    pub cull_mode: CullMode,
    /// Constant depth bias in normalized depth units
    pub depth_bias: f32,
    /// Slope-scaled depth bias
    pub slope_scale_depth_bias: f32,
}

/// Stencil function and operations for one face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StencilFaceState {
    /// Comparison against the reference value
    pub func: CompareFunction,
    /// Operation when the stencil test fails
    pub fail: StencilOp,
    /// Operation when stencil passes and depth fails
    pub z_fail: StencilOp,
    /// Operation when both pass
    pub pass: StencilOp,
}

impl Default for StencilFaceState {
    fn default() -> Self {
        Self {
            func: CompareFunction::Always,
            fail: StencilOp::Keep,
            z_fail: StencilOp::Keep,
            pass: StencilOp::Keep,
        }
    }
}

/// Depth and stencil state
///
/// With `two_sided_stencil`, `stencil` applies to back faces and
/// `ccw_stencil` to front faces; otherwise `stencil` applies to both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthStencilStateData {
    /// Depth test enable
    pub z_enable: bool,
    /// Depth write enable
    pub z_write_enable: bool,
    /// Depth comparison
    pub z_func: CompareFunction,
    /// Stencil test enable
    pub stencil_enable: bool,
    /// Separate front and back stencil state
    pub two_sided_stencil: bool,
    /// Primary (back in two-sided mode) face stencil state
    pub stencil: StencilFaceState,
    /// Counter-clockwise (front) face stencil state
    pub ccw_stencil: StencilFaceState,
    /// Stencil read mask
    pub stencil_read_mask: u32,
    /// Stencil write mask
    pub stencil_write_mask: u32,
}

impl Default for DepthStencilStateData {
    fn default() -> Self {
        Self {
            z_enable: false,
            z_write_enable: true,
            z_func: CompareFunction::Less,
            stencil_enable: false,
            two_sided_stencil: false,
            stencil: StencilFaceState::default(),
            ccw_stencil: StencilFaceState::default(),
            stencil_read_mask: u32::MAX,
            stencil_write_mask: u32::MAX,
        }
    }
}

/// Blend setup of one render target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderTargetBlendState {
    /// Blending enable
    pub alpha_blend_enable: bool,
    /// Color equation
    pub color_blend_op: BlendOp,
    /// Color source factor
    pub color_source_blend_factor: BlendFactor,
    /// Color destination factor
    pub color_dest_blend_factor: BlendFactor,
    /// Alpha uses its own factors and equation
    pub separate_alpha_blend_enable: bool,
    /// Alpha equation
    pub alpha_blend_op: BlendOp,
    /// Alpha source factor
    pub alpha_source_blend_factor: BlendFactor,
    /// Alpha destination factor
    pub alpha_dest_blend_factor: BlendFactor,
    /// Channel write mask
    #[serde(with = "color_write_mask_bits")]
    pub color_write_mask: ColorWriteMask,
}

impl RenderTargetBlendState {
    /// Standard premultiplied-free alpha blending
    pub const fn alpha_blended() -> Self {
        Self {
            alpha_blend_enable: true,
            color_blend_op: BlendOp::Add,
            color_source_blend_factor: BlendFactor::SourceAlpha,
            color_dest_blend_factor: BlendFactor::InverseSourceAlpha,
            separate_alpha_blend_enable: false,
            alpha_blend_op: BlendOp::Add,
            alpha_source_blend_factor: BlendFactor::One,
            alpha_dest_blend_factor: BlendFactor::Zero,
            color_write_mask: ColorWriteMask::ALL,
        }
    }

    /// Additive blending
    pub const fn additive() -> Self {
        Self {
            color_source_blend_factor: BlendFactor::One,
            color_dest_blend_factor: BlendFactor::One,
            ..Self::alpha_blended()
        }
    }
}

impl Default for RenderTargetBlendState {
    fn default() -> Self {
        Self {
            alpha_blend_enable: false,
            color_blend_op: BlendOp::Add,
            color_source_blend_factor: BlendFactor::One,
            color_dest_blend_factor: BlendFactor::Zero,
            separate_alpha_blend_enable: false,
            alpha_blend_op: BlendOp::Add,
            alpha_source_blend_factor: BlendFactor::One,
            alpha_dest_blend_factor: BlendFactor::Zero,
            color_write_mask: ColorWriteMask::ALL,
        }
    }
}

/// Blend state for every render target slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlendStateData {
    /// Per-target blend setup
    pub render_targets: [RenderTargetBlendState; MAX_SIMULTANEOUS_RENDER_TARGETS],
}

impl BlendStateData {
    /// Same blend setup on every target
    pub const fn uniform(state: RenderTargetBlendState) -> Self {
        Self {
            render_targets: [state; MAX_SIMULTANEOUS_RENDER_TARGETS],
        }
    }
}

/// Sampler parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplerData {
    /// S coordinate wrap
    pub wrap_s: TextureWrap,
    /// T coordinate wrap
    pub wrap_t: TextureWrap,
    /// R coordinate wrap
    pub wrap_r: TextureWrap,
    /// Mip level bias
    pub lod_bias: f32,
    /// Minification filter
    pub min_filter: TextureFilter,
    /// Magnification filter
    pub mag_filter: TextureFilter,
    /// Maximum anisotropy, 1 disables
    pub max_anisotropy: f32,
    /// Depth comparison mode
    pub compare_mode: TextureCompareMode,
    /// Depth comparison function
    pub compare_func: CompareFunction,
}

impl SamplerData {
    /// Point sampling, clamped; used for shader resource views
    pub const fn point_clamp() -> Self {
        Self {
            wrap_s: TextureWrap::ClampToEdge,
            wrap_t: TextureWrap::ClampToEdge,
            wrap_r: TextureWrap::ClampToEdge,
            lod_bias: 0.0,
            min_filter: TextureFilter::Nearest,
            mag_filter: TextureFilter::Nearest,
            max_anisotropy: 1.0,
            compare_mode: TextureCompareMode::None,
            compare_func: CompareFunction::Always,
        }
    }

    /// Trilinear sampling, repeating
    pub const fn trilinear_wrap() -> Self {
        Self {
            wrap_s: TextureWrap::Repeat,
            wrap_t: TextureWrap::Repeat,
            wrap_r: TextureWrap::Repeat,
            min_filter: TextureFilter::LinearMipmapLinear,
            mag_filter: TextureFilter::Linear,
            ..Self::point_clamp()
        }
    }
}

impl Default for SamplerData {
    fn default() -> Self {
        Self::trilinear_wrap()
    }
}

mod color_write_mask_bits {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::rhi::types::ColorWriteMask;

    pub fn serialize<S: Serializer>(mask: &ColorWriteMask, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(mask.bits())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ColorWriteMask, D::Error> {
        u8::deserialize(deserializer).map(ColorWriteMask::from_bits_truncate)
    }
}
