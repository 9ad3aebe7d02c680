//! Resource registry
//!
//! Generational handles for every GPU object the state layer references.
//! Pending state stores handles, never raw names, so a released resource is
//! detected as stale instead of silently aliasing whatever reuses its name.
//!
//! Creation and release go through [`crate::rhi::OpenGlRhi`], which owns the
//! driver and fires the matching deletion callbacks.

pub mod buffer;
pub mod framebuffer_cache;
pub mod shader;
pub mod texture;
pub mod uniform_pool;

pub use buffer::{BufferUsage, IndexBuffer, UniformBuffer, VertexBuffer};
pub use framebuffer_cache::{AttachmentKey, FramebufferCache, FramebufferKey};
pub use shader::{
    BoundShaderState, BoundShaderStateDesc, ComputeShader, LinkedProgram, PackedArrayInfo,
    PackedUniform, ProgramDesc, ShaderBindings, StageUniforms, UniformBufferCopyInfo,
    VertexDeclaration, VertexElement,
};
pub use texture::{SamplerState, ShaderResourceView, Texture, TextureDesc, UnorderedAccessView};
pub use uniform_pool::UniformBufferPool;

use slotmap::SlotMap;

use super::{RhiError, RhiResult};

slotmap::new_key_type! {
    /// Handle to a vertex buffer
    pub struct VertexBufferHandle;
    /// Handle to an index buffer
    pub struct IndexBufferHandle;
    /// Handle to a uniform buffer
    pub struct UniformBufferHandle;
    /// Handle to a texture
    pub struct TextureHandle;
    /// Handle to a sampler state
    pub struct SamplerHandle;
    /// Handle to a shader resource view
    pub struct ShaderResourceViewHandle;
    /// Handle to an unordered access view
    pub struct UnorderedAccessViewHandle;
    /// Handle to a bound shader state
    pub struct BoundShaderStateHandle;
    /// Handle to a compute shader
    pub struct ComputeShaderHandle;
}

/// Storage for every live resource
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    /// Vertex buffers
    pub vertex_buffers: SlotMap<VertexBufferHandle, VertexBuffer>,
    /// Index buffers
    pub index_buffers: SlotMap<IndexBufferHandle, IndexBuffer>,
    /// Uniform buffers
    pub uniform_buffers: SlotMap<UniformBufferHandle, UniformBuffer>,
    /// Textures
    pub textures: SlotMap<TextureHandle, Texture>,
    /// Sampler states
    pub samplers: SlotMap<SamplerHandle, SamplerState>,
    /// Shader resource views
    pub shader_resource_views: SlotMap<ShaderResourceViewHandle, ShaderResourceView>,
    /// Unordered access views
    pub unordered_access_views: SlotMap<UnorderedAccessViewHandle, UnorderedAccessView>,
    /// Bound shader states
    pub bound_shader_states: SlotMap<BoundShaderStateHandle, BoundShaderState>,
    /// Compute shaders
    pub compute_shaders: SlotMap<ComputeShaderHandle, ComputeShader>,
}

impl ResourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a vertex buffer
    pub fn vertex_buffer(&self, handle: VertexBufferHandle) -> RhiResult<&VertexBuffer> {
        self.vertex_buffers.get(handle).ok_or(RhiError::StaleHandle { kind: "vertex buffer" })
    }

    /// Look up an index buffer
    pub fn index_buffer(&self, handle: IndexBufferHandle) -> RhiResult<&IndexBuffer> {
        self.index_buffers.get(handle).ok_or(RhiError::StaleHandle { kind: "index buffer" })
    }

    /// Look up a uniform buffer
    pub fn uniform_buffer(&self, handle: UniformBufferHandle) -> RhiResult<&UniformBuffer> {
        self.uniform_buffers.get(handle).ok_or(RhiError::StaleHandle { kind: "uniform buffer" })
    }

    /// Look up a texture
    pub fn texture(&self, handle: TextureHandle) -> RhiResult<&Texture> {
        self.textures.get(handle).ok_or(RhiError::StaleHandle { kind: "texture" })
    }

    /// Look up a sampler state
    pub fn sampler(&self, handle: SamplerHandle) -> RhiResult<&SamplerState> {
        self.samplers.get(handle).ok_or(RhiError::StaleHandle { kind: "sampler state" })
    }

    /// Look up a shader resource view
    pub fn shader_resource_view(&self, handle: ShaderResourceViewHandle) -> RhiResult<&ShaderResourceView> {
        self.shader_resource_views
            .get(handle)
            .ok_or(RhiError::StaleHandle { kind: "shader resource view" })
    }

    /// Look up an unordered access view
    pub fn unordered_access_view(&self, handle: UnorderedAccessViewHandle) -> RhiResult<&UnorderedAccessView> {
        self.unordered_access_views
            .get(handle)
            .ok_or(RhiError::StaleHandle { kind: "unordered access view" })
    }

    /// Look up a bound shader state
    pub fn bound_shader_state(&self, handle: BoundShaderStateHandle) -> RhiResult<&BoundShaderState> {
        self.bound_shader_states
            .get(handle)
            .ok_or(RhiError::StaleHandle { kind: "bound shader state" })
    }

    /// Look up a compute shader
    pub fn compute_shader(&self, handle: ComputeShaderHandle) -> RhiResult<&ComputeShader> {
        self.compute_shaders.get(handle).ok_or(RhiError::StaleHandle { kind: "compute shader" })
    }
}
