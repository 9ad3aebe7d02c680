//! Resource creation, release and deletion notifications
//!
//! Release deletes the driver object and fires the matching `on_*_deletion`
//! notification. Engines that delete GL objects themselves call the
//! notifications directly so the context mirrors stop trusting the name.

use crate::rhi::driver::GlDriver;
use crate::rhi::resources::{
    BoundShaderState, BoundShaderStateDesc, BoundShaderStateHandle, BufferUsage, ComputeShader, ComputeShaderHandle,
    IndexBuffer, IndexBufferHandle, LinkedProgram, ProgramDesc, SamplerHandle, SamplerState, ShaderBindings,
    ShaderResourceView, ShaderResourceViewHandle, Texture, TextureDesc, TextureHandle, UniformBuffer,
    UniformBufferHandle, UniformBufferPool, UnorderedAccessView, UnorderedAccessViewHandle, VertexBuffer,
    VertexBufferHandle,
};
use crate::rhi::state::{ContextState, NameGenerations, SamplerData};
use crate::rhi::types::{BufferBindingTarget, BufferUsageHint, GlName, ImageFormat, IndexType, TextureTarget};
use crate::rhi::{RhiError, RhiResult};

use super::OpenGlRhi;

fn stale(kind: &'static str) -> RhiError {
    RhiError::StaleHandle { kind }
}

impl<D: GlDriver> OpenGlRhi<D> {
    /// Create a vertex buffer of `size` bytes
    ///
    /// Zero-stride buffers stay on the CPU; `data` is their shared value and
    /// a GL buffer is only made when a draw expands it.
    pub fn create_vertex_buffer(
        &mut self,
        size: u32,
        usage: BufferUsage,
        data: Option<&[u8]>,
    ) -> RhiResult<VertexBufferHandle> {
        if let Some(data) = data {
            if data.len() > size as usize {
                return Err(RhiError::ContractViolation(format!(
                    "{} bytes of initial data for a {size} byte vertex buffer",
                    data.len()
                )));
            }
        }

        let buffer = if usage.contains(BufferUsage::ZERO_STRIDE) {
            let mut value = vec![0; size as usize];
            if let Some(data) = data {
                value[..data.len()].copy_from_slice(data);
            }
            VertexBuffer { name: 0, size, usage, zero_stride_data: Some(value) }
        } else {
            let name = self.create_gl_buffer(BufferBindingTarget::Array, size as usize, data, usage.gl_hint());
            VertexBuffer { name, size, usage, zero_stride_data: None }
        };
        log::trace!("Created vertex buffer {} ({} bytes, {:?})", buffer.name, size, usage);
        Ok(self.registry.vertex_buffers.insert(buffer))
    }

    /// Release a vertex buffer and any zero-stride expansion made from it
    pub fn release_vertex_buffer(&mut self, handle: VertexBufferHandle) -> RhiResult<()> {
        let buffer = self.registry.vertex_buffers.remove(handle).ok_or_else(|| stale("vertex buffer"))?;
        if let Some(expansion) = self.zero_stride.remove_source(handle) {
            self.delete_buffer(expansion);
        }
        if buffer.name != 0 {
            self.driver.delete_buffer(buffer.name);
            self.on_vertex_buffer_deletion(buffer.name);
        }
        Ok(())
    }

    /// Create an index buffer with 2 or 4 byte indices
    pub fn create_index_buffer(
        &mut self,
        size: u32,
        stride: u32,
        usage: BufferUsage,
        data: Option<&[u8]>,
    ) -> RhiResult<IndexBufferHandle> {
        if IndexType::from_stride(stride).is_none() {
            return Err(RhiError::ContractViolation(format!("index stride {stride} is neither 2 nor 4")));
        }
        let name = self.create_gl_buffer(BufferBindingTarget::ElementArray, size as usize, data, usage.gl_hint());
        log::trace!("Created index buffer {} ({} bytes, stride {})", name, size, stride);
        Ok(self.registry.index_buffers.insert(IndexBuffer { name, size, stride, usage }))
    }

    /// Release an index buffer
    pub fn release_index_buffer(&mut self, handle: IndexBufferHandle) -> RhiResult<()> {
        let buffer = self.registry.index_buffers.remove(handle).ok_or_else(|| stale("index buffer"))?;
        self.driver.delete_buffer(buffer.name);
        self.on_index_buffer_deletion(buffer.name);
        Ok(())
    }

    /// Create a uniform buffer holding `data`
    ///
    /// Storage comes from the pool when a buffer of the same bucket and usage
    /// is free. With emulated uniform buffers only a CPU shadow is kept.
    pub fn create_uniform_buffer(&mut self, data: &[u8], stream_draw: bool) -> RhiResult<UniformBufferHandle> {
        let size = u32::try_from(data.len())
            .map_err(|_| RhiError::ContractViolation(format!("{} byte uniform buffer", data.len())))?;
        let unique_id = self.next_uniform_buffer_id();

        let mut reused = false;
        let mut buffer = if self.config.capabilities.uses_emulated_uniform_buffers {
            UniformBuffer { name: 0, size, allocated_size: size, stream_draw, unique_id, shadow: Vec::new() }
        } else {
            let pooled = self.uniform_pool.acquire(size, stream_draw);
            reused = pooled.is_some();
            let (name, allocated_size) = match pooled {
                Some(pooled) => (pooled.name, pooled.allocated_size),
                None => {
                    let allocated_size = UniformBufferPool::bucket_size(size);
                    let hint = if stream_draw { BufferUsageHint::StreamDraw } else { BufferUsageHint::StaticDraw };
                    let name = self.create_gl_buffer(BufferBindingTarget::Uniform, allocated_size as usize, None, hint);
                    (name, allocated_size)
                }
            };
            UniformBuffer { name, size, allocated_size, stream_draw, unique_id, shadow: Vec::new() }
        };
        let Self { driver, contexts, current_context, generations, .. } = self;
        upload_uniform_data(driver, &mut contexts[current_context.index()], &generations.buffers, &mut buffer, data);
        log::trace!(
            "Created uniform buffer {} ({} of {} bytes, reused: {})",
            buffer.name,
            size,
            buffer.allocated_size,
            reused
        );
        Ok(self.registry.uniform_buffers.insert(buffer))
    }

    /// Replace the contents of a uniform buffer
    ///
    /// `data` may not exceed the size the buffer was created with.
    pub fn update_uniform_buffer(&mut self, handle: UniformBufferHandle, data: &[u8]) -> RhiResult<()> {
        let unique_id = self.next_uniform_buffer_id();
        let Self { driver, contexts, current_context, generations, registry, .. } = self;
        let buffer = registry.uniform_buffers.get_mut(handle).ok_or_else(|| stale("uniform buffer"))?;
        if data.len() > buffer.size as usize {
            return Err(RhiError::ContractViolation(format!(
                "{} bytes written to a {} byte uniform buffer",
                data.len(),
                buffer.size
            )));
        }
        buffer.unique_id = unique_id;
        upload_uniform_data(driver, &mut contexts[current_context.index()], &generations.buffers, buffer, data);
        Ok(())
    }

    /// Release a uniform buffer, parking its storage in the pool
    pub fn release_uniform_buffer(&mut self, handle: UniformBufferHandle) -> RhiResult<()> {
        let buffer = self.registry.uniform_buffers.remove(handle).ok_or_else(|| stale("uniform buffer"))?;
        if buffer.name != 0 {
            self.on_uniform_buffer_deletion(buffer.name, buffer.allocated_size, buffer.stream_draw);
        }
        Ok(())
    }

    /// Create a texture object
    ///
    /// Only the object is created; uploading texels is the engine's job.
    pub fn create_texture(&mut self, desc: TextureDesc) -> TextureHandle {
        let name = self.driver.gen_texture();
        log::trace!("Created {:?} texture {} ({}x{}, {} mips)", desc.target, name, desc.width, desc.height, desc.num_mips);
        self.registry.textures.insert(Texture { name, desc, applied_sampler: None })
    }

    /// Release a texture and every cached framebuffer it is attached to
    pub fn release_texture(&mut self, handle: TextureHandle) -> RhiResult<()> {
        let texture = self.registry.textures.remove(handle).ok_or_else(|| stale("texture"))?;
        for framebuffer in self.framebuffer_cache.release_texture(texture.name) {
            self.delete_framebuffer(framebuffer);
        }
        self.driver.delete_texture(texture.name);
        self.generations.textures.retire(texture.name);
        Ok(())
    }

    /// Create a sampler state
    ///
    /// A sampler object is only made when the driver has them; otherwise the
    /// parameters are written into textures at bind time.
    pub fn create_sampler_state(&mut self, data: SamplerData) -> SamplerHandle {
        let name = if self.config.capabilities.supports_sampler_objects {
            let name = self.driver.gen_sampler();
            self.driver.sampler_parameters(name, &data);
            name
        } else {
            0
        };
        self.registry.samplers.insert(SamplerState { name, data })
    }

    /// Release a sampler state
    pub fn release_sampler_state(&mut self, handle: SamplerHandle) -> RhiResult<()> {
        let sampler = self.registry.samplers.remove(handle).ok_or_else(|| stale("sampler"))?;
        if sampler.name != 0 {
            self.driver.delete_sampler(sampler.name);
        }
        Ok(())
    }

    /// Create a view of a whole texture, or of a single mip
    pub fn create_texture_shader_resource_view(
        &mut self,
        texture: TextureHandle,
        mip: Option<u32>,
    ) -> RhiResult<ShaderResourceViewHandle> {
        let texture = self.registry.texture(texture)?;
        if let Some(mip) = mip {
            if texture.desc.num_mips != 0 && mip >= texture.desc.num_mips {
                return Err(RhiError::ContractViolation(format!(
                    "view of mip {mip} of a texture with {} mips",
                    texture.desc.num_mips
                )));
            }
        }
        let view = ShaderResourceView { target: texture.desc.target, resource: texture.name, limit_mip: mip };
        Ok(self.registry.shader_resource_views.insert(view))
    }

    /// Create a view of a buffer texture object made by the engine
    pub fn create_buffer_shader_resource_view(&mut self, buffer_texture: GlName) -> ShaderResourceViewHandle {
        self.registry.shader_resource_views.insert(ShaderResourceView {
            target: TextureTarget::TextureBuffer,
            resource: buffer_texture,
            limit_mip: None,
        })
    }

    /// Release a shader resource view
    pub fn release_shader_resource_view(&mut self, handle: ShaderResourceViewHandle) -> RhiResult<()> {
        self.registry
            .shader_resource_views
            .remove(handle)
            .map(|_| ())
            .ok_or_else(|| stale("shader resource view"))
    }

    /// Create a read-write image view of a texture
    pub fn create_unordered_access_view(
        &mut self,
        texture: TextureHandle,
        format: ImageFormat,
    ) -> RhiResult<UnorderedAccessViewHandle> {
        let resource = self.registry.texture(texture)?.name;
        Ok(self.registry.unordered_access_views.insert(UnorderedAccessView { resource, format }))
    }

    /// Release an unordered access view
    pub fn release_unordered_access_view(&mut self, handle: UnorderedAccessViewHandle) -> RhiResult<()> {
        self.registry
            .unordered_access_views
            .remove(handle)
            .map(|_| ())
            .ok_or_else(|| stale("unordered access view"))
    }

    /// Link a graphics program and register its shader state
    pub fn create_bound_shader_state(&mut self, mut desc: BoundShaderStateDesc) -> BoundShaderStateHandle {
        let name = self.driver.create_program();
        let program = LinkedProgram::new(name, std::mem::take(&mut desc.program));
        log::debug!(
            "Linked program {} ({} vertex elements, {} texture units)",
            name,
            desc.declaration.elements.len(),
            program.max_texture_stage.map_or(0, |unit| unit + 1)
        );
        self.registry.bound_shader_states.insert(BoundShaderState::new(program, desc))
    }

    /// Release a bound shader state and delete its program
    ///
    /// Unbinds it from the pending state when it is the current one.
    pub fn release_bound_shader_state(&mut self, handle: BoundShaderStateHandle) -> RhiResult<()> {
        let state = self.registry.bound_shader_states.remove(handle).ok_or_else(|| stale("bound shader state"))?;
        if self.pending.bound_shader_state == Some(handle) {
            self.pending.bound_shader_state = None;
        }
        self.driver.delete_program(state.program.name);
        self.on_program_deletion(state.program.name);
        Ok(())
    }

    /// Link a compute program
    pub fn create_compute_shader(
        &mut self,
        bindings: ShaderBindings,
        program: ProgramDesc,
    ) -> RhiResult<ComputeShaderHandle> {
        if !self.config.capabilities.supports_compute_shaders {
            return Err(RhiError::UnsupportedCapability("compute shaders"));
        }
        let name = self.driver.create_program();
        log::debug!("Linked compute program {}", name);
        Ok(self
            .registry
            .compute_shaders
            .insert(ComputeShader { program: LinkedProgram::new(name, program), bindings }))
    }

    /// Release a compute shader and delete its program
    pub fn release_compute_shader(&mut self, handle: ComputeShaderHandle) -> RhiResult<()> {
        let shader = self.registry.compute_shaders.remove(handle).ok_or_else(|| stale("compute shader"))?;
        if self.pending.current_compute_shader == Some(handle) {
            self.pending.current_compute_shader = None;
        }
        self.driver.delete_program(shader.program.name);
        self.on_program_deletion(shader.program.name);
        Ok(())
    }

    /// A program object was deleted
    pub fn on_program_deletion(&mut self, name: GlName) {
        self.generations.programs.retire(name);
        log::trace!("Program {} deleted", name);
    }

    /// A vertex buffer object was deleted
    pub fn on_vertex_buffer_deletion(&mut self, name: GlName) {
        self.generations.buffers.retire(name);
        log::trace!("Vertex buffer {} deleted", name);
    }

    /// An index buffer object was deleted
    pub fn on_index_buffer_deletion(&mut self, name: GlName) {
        self.generations.buffers.retire(name);
        log::trace!("Index buffer {} deleted", name);
    }

    /// A pixel buffer object was deleted
    pub fn on_pixel_buffer_deletion(&mut self, name: GlName) {
        self.generations.buffers.retire(name);
        log::trace!("Pixel buffer {} deleted", name);
    }

    /// A uniform buffer was freed; its storage goes back to the pool
    pub fn on_uniform_buffer_deletion(&mut self, name: GlName, allocated_size: u32, stream_draw: bool) {
        self.generations.buffers.retire(name);
        self.uniform_pool.release(name, allocated_size, stream_draw);
    }

    fn create_gl_buffer(
        &mut self,
        target: BufferBindingTarget,
        size: usize,
        data: Option<&[u8]>,
        hint: BufferUsageHint,
    ) -> GlName {
        let name = self.driver.gen_buffer();
        let Self { driver, contexts, current_context, generations, .. } = self;
        contexts[current_context.index()].cached_bind_buffer(driver, &generations.buffers, target, name);
        driver.buffer_data(target, size, data, hint);
        name
    }

    fn next_uniform_buffer_id(&mut self) -> u64 {
        let id = self.next_uniform_buffer_id;
        self.next_uniform_buffer_id += 1;
        id
    }
}

/// Upload uniform data, or keep it as the CPU shadow for buffers without
/// GL storage
fn upload_uniform_data<D: GlDriver>(
    driver: &mut D,
    context: &mut ContextState,
    generations: &NameGenerations,
    buffer: &mut UniformBuffer,
    data: &[u8],
) {
    if buffer.name == 0 {
        buffer.store(data);
        return;
    }
    context.cached_bind_buffer(driver, generations, BufferBindingTarget::Uniform, buffer.name);
    if !data.is_empty() {
        driver.buffer_sub_data(BufferBindingTarget::Uniform, 0, data);
    }
}
