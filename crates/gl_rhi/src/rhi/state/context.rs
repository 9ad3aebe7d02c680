//! Per-context driver mirror
//!
//! A [`ContextState`] records what one GL context currently has bound and
//! enabled. Fields whose driver value is unknown are `None`; comparing a
//! pending value against `None` always fails, so the next commit issues the
//! call and the field becomes known again.
//!
//! Buffer, program and texture names are stored as [`TrackedName`]s so that
//! deleting an object invalidates every cached reference to it.

use crate::rhi::capabilities::GraphicsBackendCapabilities;
use crate::rhi::driver::{AttributeFormat, GlDriver};
use crate::rhi::resources::SamplerHandle;
use crate::rhi::types::*;

use super::descriptors::{BlendStateData, RasterizerStateData, StencilFaceState};
use super::tracking::{NameGenerations, TrackedName};

/// The GL contexts a device renders with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKind {
    /// Resource creation context
    Shared,
    /// Rendering context
    Rendering,
}

impl ContextKind {
    /// Slot of the context in per-context tables
    pub const fn index(self) -> usize {
        match self {
            Self::Shared => 0,
            Self::Rendering => 1,
        }
    }
}

/// Cached stencil function and operations of one face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StencilFaceCache {
    /// Comparison function
    pub func: Option<CompareFunction>,
    /// Stencil fail operation
    pub fail: Option<StencilOp>,
    /// Depth fail operation
    pub z_fail: Option<StencilOp>,
    /// Pass operation
    pub pass: Option<StencilOp>,
}

impl StencilFaceCache {
    /// Every field unknown
    pub const UNKNOWN: Self = Self { func: None, fail: None, z_fail: None, pass: None };

    /// Cache holding a known face state
    pub const fn known(state: StencilFaceState) -> Self {
        Self {
            func: Some(state.func),
            fail: Some(state.fail),
            z_fail: Some(state.z_fail),
            pass: Some(state.pass),
        }
    }

    /// Whether the operations match a face state
    pub fn ops_match(&self, state: &StencilFaceState) -> bool {
        self.fail == Some(state.fail) && self.z_fail == Some(state.z_fail) && self.pass == Some(state.pass)
    }
}

/// Cached depth and stencil state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthStencilCache {
    /// Depth test enable
    pub z_enable: bool,
    /// Depth write enable
    pub z_write_enable: bool,
    /// Depth comparison
    pub z_func: Option<CompareFunction>,
    /// Stencil test enable
    pub stencil_enable: bool,
    /// Separate front and back stencil
    pub two_sided_stencil: bool,
    /// Back (or both, one-sided) face
    pub stencil: StencilFaceCache,
    /// Front face in two-sided mode
    pub ccw_stencil: StencilFaceCache,
    /// Stencil read mask
    pub stencil_read_mask: Option<u32>,
    /// Stencil write mask
    pub stencil_write_mask: u32,
    /// Stencil reference value
    pub stencil_ref: u32,
}

impl Default for DepthStencilCache {
    fn default() -> Self {
        Self {
            z_enable: false,
            z_write_enable: true,
            z_func: Some(CompareFunction::Less),
            stencil_enable: false,
            two_sided_stencil: false,
            stencil: StencilFaceCache::known(StencilFaceState::default()),
            ccw_stencil: StencilFaceCache::known(StencilFaceState::default()),
            stencil_read_mask: Some(u32::MAX),
            stencil_write_mask: u32::MAX,
            stencil_ref: 0,
        }
    }
}

/// Texture bound on one unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedTextureStage {
    /// Bound target, `None` when nothing is bound
    pub target: Option<TextureTarget>,
    /// Bound object
    pub resource: TrackedName,
    /// Base level restriction last written
    pub limit_mip: Option<u32>,
    /// Mip count last written
    pub num_mips: u32,
    /// Sampler last applied to a texture-less (buffer view) stage
    pub applied_sampler: Option<SamplerHandle>,
}

impl Default for CachedTextureStage {
    fn default() -> Self {
        Self {
            target: None,
            resource: TrackedName::NONE,
            limit_mip: None,
            num_mips: 0,
            applied_sampler: None,
        }
    }
}

/// Image bound on one image unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedUavStage {
    /// Image format
    pub format: ImageFormat,
    /// Bound texture
    pub resource: TrackedName,
}

impl Default for CachedUavStage {
    fn default() -> Self {
        Self { format: ImageFormat::R32F, resource: TrackedName::NONE }
    }
}

/// Pointer setup of one vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeBinding {
    /// Array buffer the pointer reads from, `NONE` for client memory
    pub buffer: TrackedName,
    /// Byte offset into the buffer, or the client address
    pub pointer: usize,
    /// Bytes between vertices
    pub stride: u32,
    /// Memory layout
    pub format: AttributeFormat,
    /// Instance divisor
    pub divisor: u32,
    /// Integer attribute (I-pointer path)
    pub integer: bool,
}

/// Cached state of one vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CachedAttribute {
    /// Attribute array enabled
    pub enabled: bool,
    /// Last pointer setup, `None` when unknown
    pub binding: Option<AttributeBinding>,
}

/// What one GL context holds
#[derive(Debug, Clone)]
pub struct ContextState {
    /// Rasterizer state
    pub rasterizer: RasterizerStateData,
    /// Depth-stencil state
    pub depth_stencil: DepthStencilCache,
    /// Blend state per render target
    pub blend: BlendStateData,
    /// Constant blend color
    pub blend_factor: LinearColor,

    /// Viewport rectangle
    pub viewport: IntRect,
    /// Near depth
    pub depth_min_z: f32,
    /// Far depth
    pub depth_max_z: f32,
    /// Scissor test enable
    pub scissor_enabled: bool,
    /// Scissor rectangle
    pub scissor: IntRect,

    /// Bound framebuffer, `None` when unknown
    pub framebuffer: Option<GlName>,
    /// Bound program
    pub program: Option<TrackedName>,

    /// Texture per unit
    pub textures: Vec<CachedTextureStage>,
    /// Active texture unit
    pub active_texture: Option<u32>,
    /// Image per image unit
    pub uavs: Vec<CachedUavStage>,
    /// Seamless cube map filtering
    pub seamless_cubemap_enabled: bool,

    /// Vertex attribute setup
    pub vertex_attributes: Vec<CachedAttribute>,
    /// `GL_ARRAY_BUFFER` binding
    pub array_buffer: Option<TrackedName>,
    /// `GL_ELEMENT_ARRAY_BUFFER` binding
    pub element_array_buffer: Option<TrackedName>,
    /// Generic `GL_UNIFORM_BUFFER` binding
    pub uniform_buffer: Option<TrackedName>,
    /// `GL_PIXEL_UNPACK_BUFFER` binding
    pub pixel_unpack_buffer: Option<TrackedName>,
    /// Indexed uniform buffer bindings
    pub uniform_buffers: Vec<Option<TrackedName>>,

    /// Clear color
    pub clear_color: LinearColor,
    /// Clear depth
    pub clear_depth: f32,
    /// Clear stencil
    pub clear_stencil: u32,

    /// Color target recorded by the render target switch heuristic
    pub last_es2_color_render_target: Option<GlName>,
    /// Depth target recorded by the render target switch heuristic
    pub last_es2_depth_render_target: Option<GlName>,
}

impl ContextState {
    /// State of a freshly created GL context
    pub fn new(caps: &GraphicsBackendCapabilities) -> Self {
        Self {
            rasterizer: RasterizerStateData::default(),
            depth_stencil: DepthStencilCache::default(),
            blend: BlendStateData::default(),
            blend_factor: LinearColor::TRANSPARENT,
            viewport: IntRect::default(),
            depth_min_z: 0.0,
            depth_max_z: 1.0,
            scissor_enabled: false,
            scissor: IntRect::default(),
            framebuffer: Some(0),
            program: Some(TrackedName::NONE),
            textures: vec![CachedTextureStage::default(); caps.texture_stage_count()],
            active_texture: Some(0),
            uavs: vec![CachedUavStage::default(); caps.max_compute_uav_units as usize],
            seamless_cubemap_enabled: false,
            vertex_attributes: vec![CachedAttribute::default(); caps.max_vertex_attributes as usize],
            array_buffer: Some(TrackedName::NONE),
            element_array_buffer: Some(TrackedName::NONE),
            uniform_buffer: Some(TrackedName::NONE),
            pixel_unpack_buffer: Some(TrackedName::NONE),
            uniform_buffers: vec![Some(TrackedName::NONE); caps.uniform_buffer_binding_count()],
            clear_color: LinearColor::TRANSPARENT,
            clear_depth: 1.0,
            clear_stencil: 0,
            last_es2_color_render_target: None,
            last_es2_depth_render_target: None,
        }
    }

    /// Cached binding slot of a buffer target
    pub fn buffer_binding(&self, target: BufferBindingTarget) -> Option<TrackedName> {
        match target {
            BufferBindingTarget::Array => self.array_buffer,
            BufferBindingTarget::ElementArray => self.element_array_buffer,
            BufferBindingTarget::Uniform => self.uniform_buffer,
            BufferBindingTarget::PixelUnpack => self.pixel_unpack_buffer,
        }
    }

    fn buffer_binding_mut(&mut self, target: BufferBindingTarget) -> &mut Option<TrackedName> {
        match target {
            BufferBindingTarget::Array => &mut self.array_buffer,
            BufferBindingTarget::ElementArray => &mut self.element_array_buffer,
            BufferBindingTarget::Uniform => &mut self.uniform_buffer,
            BufferBindingTarget::PixelUnpack => &mut self.pixel_unpack_buffer,
        }
    }

    /// Bind a buffer unless the cache says it is already bound
    pub fn cached_bind_buffer<D: GlDriver>(
        &mut self,
        driver: &mut D,
        buffers: &NameGenerations,
        target: BufferBindingTarget,
        name: GlName,
    ) {
        let tracked = buffers.track(name);
        let slot = self.buffer_binding_mut(target);
        if *slot != Some(tracked) {
            driver.bind_buffer(target, name);
            *slot = Some(tracked);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rhi::driver::{GlCall, RecordingDriver};

    #[test]
    fn test_cached_bind_skips_redundant_binds() {
        let caps = GraphicsBackendCapabilities::desktop_gl4();
        let mut context = ContextState::new(&caps);
        let generations = NameGenerations::new();
        let mut driver = RecordingDriver::new();

        context.cached_bind_buffer(&mut driver, &generations, BufferBindingTarget::Array, 3);
        context.cached_bind_buffer(&mut driver, &generations, BufferBindingTarget::Array, 3);
        context.cached_bind_buffer(&mut driver, &generations, BufferBindingTarget::ElementArray, 3);

        assert_eq!(
            driver.calls(),
            &[
                GlCall::BindBuffer { target: BufferBindingTarget::Array, name: 3 },
                GlCall::BindBuffer { target: BufferBindingTarget::ElementArray, name: 3 },
            ]
        );
    }

    #[test]
    fn test_cached_bind_after_retire_rebinds() {
        let caps = GraphicsBackendCapabilities::desktop_gl4();
        let mut context = ContextState::new(&caps);
        let mut generations = NameGenerations::new();
        let mut driver = RecordingDriver::new();

        context.cached_bind_buffer(&mut driver, &generations, BufferBindingTarget::Uniform, 5);
        generations.retire(5);
        context.cached_bind_buffer(&mut driver, &generations, BufferBindingTarget::Uniform, 5);
        assert_eq!(driver.calls().len(), 2);
    }

    #[test]
    fn test_new_context_binds_nothing() {
        let caps = GraphicsBackendCapabilities::es2();
        let context = ContextState::new(&caps);
        assert_eq!(context.buffer_binding(BufferBindingTarget::Array), Some(TrackedName::NONE));
        assert_eq!(context.vertex_attributes.len(), 8);
        assert!(context.uavs.is_empty());
    }
}
