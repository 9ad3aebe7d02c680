//! Pending state
//!
//! Everything the engine has asked for since the last submission. Only the
//! `set_*` entry points write here; commit code reads it and brings the
//! current [`super::ContextState`] in line.

use crate::rhi::capabilities::GraphicsBackendCapabilities;
use crate::rhi::resources::{
    BoundShaderStateHandle, ComputeShaderHandle, SamplerHandle, TextureHandle, UniformBufferHandle,
    VertexBufferHandle,
};
use crate::rhi::shader_params::ShaderParameterCache;
use crate::rhi::types::*;

use super::descriptors::{BlendStateData, DepthStencilStateData, RasterizerStateData};

/// Color or depth render target binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTargetView {
    /// Texture rendered to
    pub texture: TextureHandle,
    /// Mip level rendered to
    pub mip_index: u32,
    /// Array slice or cube face, `None` for the whole texture
    pub array_slice: Option<u32>,
}

impl RenderTargetView {
    /// Mip 0 of a texture
    pub const fn new(texture: TextureHandle) -> Self {
        Self { texture, mip_index: 0, array_slice: None }
    }
}

/// Texture bound to one texture unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureStage {
    /// Texture object, `None` for buffer views and empty stages
    pub texture: Option<TextureHandle>,
    /// Binding target, `None` for an empty stage
    pub target: Option<TextureTarget>,
    /// Driver name of the bound object
    pub resource: GlName,
    /// Single mip the stage is restricted to
    pub limit_mip: Option<u32>,
    /// Mip count of the bound object, 0 when unknown
    pub num_mips: u32,
    /// Whether mip filtering may be used
    pub has_mips: bool,
}

impl Default for TextureStage {
    fn default() -> Self {
        Self {
            texture: None,
            target: None,
            resource: 0,
            limit_mip: None,
            num_mips: 0,
            has_mips: true,
        }
    }
}

/// Image bound to one compute image unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UavStage {
    /// Image format
    pub format: ImageFormat,
    /// Driver name of the texture
    pub resource: GlName,
}

/// One vertex stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VertexStream {
    /// Source buffer, `None` when unbound
    pub buffer: Option<VertexBufferHandle>,
    /// Bytes between vertices
    pub stride: u32,
    /// Byte offset of the first vertex
    pub offset: u32,
}

/// Where an immediate-mode draw's data lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmediateSource {
    /// Regions locked from the dynamic vertex and index rings
    DynamicRing,
    /// Growable scratch heap buffers read through client pointers
    Heap,
}

/// Index data of an indexed immediate-mode draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImmediateIndices {
    /// Smallest vertex index referenced
    pub min_vertex_index: u32,
    /// Number of indices
    pub num_indices: u32,
    /// Index type
    pub index_type: IndexType,
}

/// An immediate-mode draw between begin and end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImmediateDraw {
    /// Primitive topology
    pub primitive_type: PrimitiveType,
    /// Primitives to draw, never 0
    pub num_primitives: u32,
    /// Vertices written by the caller
    pub num_vertices: u32,
    /// Bytes per vertex
    pub vertex_stride: u32,
    /// Storage the caller writes into
    pub source: ImmediateSource,
    /// Index data for indexed draws
    pub indices: Option<ImmediateIndices>,
}

impl ImmediateDraw {
    /// Bytes of vertex data
    pub const fn vertex_data_size(&self) -> usize {
        self.num_vertices as usize * self.vertex_stride as usize
    }

    /// Bytes of index data
    pub const fn index_data_size(&self) -> usize {
        match self.indices {
            Some(indices) => indices.num_indices as usize * indices.index_type.size_in_bytes() as usize,
            None => 0,
        }
    }
}

/// State requested by the engine and not yet committed
#[derive(Debug)]
pub struct PendingState {
    /// Color render targets by slot
    pub render_targets: [Option<RenderTargetView>; MAX_SIMULTANEOUS_RENDER_TARGETS],
    /// Depth-stencil target
    pub depth_stencil: Option<RenderTargetView>,
    /// First slot holding a color target
    pub first_nonzero_render_target: Option<usize>,
    /// Framebuffer matching the render targets
    pub framebuffer: GlName,
    /// No color and no depth target is bound
    pub framebuffer_setup_invalid: bool,
    /// Width of the first color target at its mip
    pub render_target_width: u32,
    /// Height of the first color target at its mip
    pub render_target_height: u32,

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

    /// Rasterizer state
    pub rasterizer: RasterizerStateData,
    /// Depth-stencil state
    pub depth_stencil_state: DepthStencilStateData,
    /// Stencil reference value
    pub stencil_ref: u32,
    /// Blend state
    pub blend: BlendStateData,
    /// Constant blend color
    pub blend_factor: LinearColor,

    /// Graphics pipeline shaders
    pub bound_shader_state: Option<BoundShaderStateHandle>,
    /// Compute shader of the last `set_compute_shader`
    pub current_compute_shader: Option<ComputeShaderHandle>,

    /// Texture per unit
    pub textures: Vec<TextureStage>,
    /// Sampler per unit, only tracked without sampler objects
    pub samplers: Vec<Option<SamplerHandle>>,
    /// Image per compute image unit
    pub uavs: Vec<UavStage>,
    /// Uniform buffer per slot, per stage
    pub uniform_buffers: [Vec<Option<UniformBufferHandle>>; ShaderStage::COUNT],
    /// Packed uniform storage per stage
    pub shader_parameters: [ShaderParameterCache; ShaderStage::COUNT],

    /// Vertex streams
    pub streams: [VertexStream; MAX_VERTEX_STREAMS],
    /// Seamless cube map filtering
    pub seamless_cubemap_enabled: bool,

    /// Open immediate-mode draw
    pub immediate: Option<ImmediateDraw>,
    /// Scratch vertex storage for immediate draws without fast buffer uploads
    pub up_vertex_data: Vec<u8>,
    /// Scratch index storage for immediate draws without fast buffer uploads
    pub up_index_data: Vec<u8>,
}

impl PendingState {
    /// Default pending state sized for a capability set
    pub fn new(caps: &GraphicsBackendCapabilities) -> Self {
        let texture_units = caps.texture_stage_count();
        let bindings = caps.max_uniform_buffer_bindings as usize;
        Self {
            render_targets: [None; MAX_SIMULTANEOUS_RENDER_TARGETS],
            depth_stencil: None,
            first_nonzero_render_target: None,
            framebuffer: 0,
            framebuffer_setup_invalid: false,
            render_target_width: 0,
            render_target_height: 0,
            viewport: IntRect::default(),
            depth_min_z: 0.0,
            depth_max_z: 1.0,
            scissor_enabled: false,
            scissor: IntRect::default(),
            rasterizer: RasterizerStateData::default(),
            depth_stencil_state: DepthStencilStateData::default(),
            stencil_ref: 0,
            blend: BlendStateData::default(),
            blend_factor: LinearColor::WHITE,
            bound_shader_state: None,
            current_compute_shader: None,
            textures: vec![TextureStage::default(); texture_units],
            samplers: vec![None; texture_units],
            uavs: vec![UavStage::default(); caps.max_compute_uav_units as usize],
            uniform_buffers: std::array::from_fn(|_| vec![None; bindings]),
            shader_parameters: std::array::from_fn(|_| ShaderParameterCache::new(caps.packed_uniform_array_size)),
            streams: [VertexStream::default(); MAX_VERTEX_STREAMS],
            seamless_cubemap_enabled: caps.supports_seamless_cube_map,
            immediate: None,
            up_vertex_data: Vec::new(),
            up_index_data: Vec::new(),
        }
    }

    /// Color target in the first occupied slot
    pub fn first_render_target(&self) -> Option<RenderTargetView> {
        self.first_nonzero_render_target
            .and_then(|slot| self.render_targets[slot])
    }

    /// Number of consecutive occupied color slots starting at slot 0
    pub fn bound_render_target_count(&self) -> usize {
        self.render_targets.iter().take_while(|target| target.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_sized_from_capabilities() {
        let caps = GraphicsBackendCapabilities::desktop_gl4();
        let pending = PendingState::new(&caps);
        assert_eq!(pending.textures.len(), 80);
        assert_eq!(pending.uavs.len(), 8);
        assert_eq!(pending.uniform_buffers[ShaderStage::Pixel.index()].len(), 12);
        assert!(pending.seamless_cubemap_enabled);
        assert!(pending.immediate.is_none());
    }

    #[test]
    fn test_immediate_data_sizes() {
        let draw = ImmediateDraw {
            primitive_type: PrimitiveType::TriangleList,
            num_primitives: 2,
            num_vertices: 4,
            vertex_stride: 20,
            source: ImmediateSource::Heap,
            indices: Some(ImmediateIndices {
                min_vertex_index: 0,
                num_indices: 6,
                index_type: IndexType::U16,
            }),
        };
        assert_eq!(draw.vertex_data_size(), 80);
        assert_eq!(draw.index_data_size(), 12);
    }
}
