//! Draw submission
//!
//! Every draw commits state in the same order before issuing the call:
//! framebuffer, blend, viewport, scissor, rasterizer, depth-stencil, program
//! and uniform buffers, textures, constants, element array, vertex arrays.

use crate::rhi::commit::blend::commit_blend;
use crate::rhi::commit::depth_stencil::commit_depth_stencil;
use crate::rhi::commit::framebuffer::commit_framebuffer;
use crate::rhi::commit::rasterizer::commit_rasterizer;
use crate::rhi::commit::shader::{bind_pending_shader_state, commit_graphics_constants};
use crate::rhi::commit::textures::setup_textures_for_draw;
use crate::rhi::commit::vertex_arrays::{resolve_streams, setup_vertex_arrays, StreamBinding};
use crate::rhi::commit::viewport::{commit_scissor, commit_viewport};
use crate::rhi::driver::{DataSource, GlDriver};
use crate::rhi::resources::{IndexBufferHandle, ResourceRegistry, VertexBufferHandle};
use crate::rhi::types::*;
use crate::rhi::{RhiError, RhiResult};

use super::OpenGlRhi;

/// Where a draw's vertex attributes read from
#[derive(Debug, Clone, Copy)]
pub(super) enum VertexSource {
    /// The pending stream table
    Streams,
    /// A region of the dynamic vertex ring, fed to stream 0
    Ring {
        /// Ring buffer name
        name: GlName,
        /// Byte offset of the region
        offset: usize,
        /// Bytes between vertices
        stride: u32,
    },
    /// The first `size` bytes of the heap scratch buffer, fed to every stream
    Heap {
        /// Bytes of vertex data
        size: usize,
        /// Bytes between vertices
        stride: u32,
    },
}

impl<D: GlDriver> OpenGlRhi<D> {
    /// Draw non-indexed primitives from the bound vertex streams
    pub fn draw_primitive(
        &mut self,
        primitive_type: PrimitiveType,
        base_vertex_index: u32,
        num_primitives: u32,
        num_instances: u32,
    ) -> RhiResult<()> {
        self.check_instancing(num_instances)?;
        let params = primitive_type.draw_parameters(num_primitives);

        self.commit_draw_state()?;
        self.bind_element_array(0);
        self.setup_vertex_source(VertexSource::Streams, base_vertex_index, params.num_elements)?;
        self.set_patch_size(params);

        self.register_draw(
            primitive_type,
            num_primitives.saturating_mul(num_instances),
            params.num_elements.saturating_mul(num_instances),
        );
        if num_instances > 1 {
            self.driver.draw_arrays_instanced(params.mode, 0, params.num_elements, num_instances);
        } else {
            self.driver.draw_arrays(params.mode, 0, params.num_elements);
        }
        Ok(())
    }

    /// Draw indexed primitives
    ///
    /// `start_index` is the first index read from `index_buffer`; indices
    /// reference vertices in `[min_index, min_index + num_vertices]`.
    pub fn draw_indexed_primitive(
        &mut self,
        index_buffer: IndexBufferHandle,
        primitive_type: PrimitiveType,
        base_vertex_index: u32,
        min_index: u32,
        num_vertices: u32,
        start_index: u32,
        num_primitives: u32,
        num_instances: u32,
    ) -> RhiResult<()> {
        self.check_instancing(num_instances)?;
        let buffer = self.registry.index_buffer(index_buffer)?;
        let index_buffer_name = buffer.name;
        let index_type = IndexType::from_stride(buffer.stride).ok_or_else(|| {
            RhiError::ContractViolation(format!("index buffer stride {} is neither 2 nor 4", buffer.stride))
        })?;
        let params = primitive_type.draw_parameters(num_primitives);

        self.commit_draw_state()?;
        self.bind_element_array(index_buffer_name);
        self.setup_vertex_source(
            VertexSource::Streams,
            base_vertex_index,
            num_vertices.saturating_add(start_index),
        )?;
        self.set_patch_size(params);

        let offset = start_index as usize * index_type.size_in_bytes() as usize;
        self.register_draw(
            primitive_type,
            num_primitives.saturating_mul(num_instances),
            params.num_elements.saturating_mul(num_instances),
        );
        let indices = DataSource::BufferOffset(offset);
        if num_instances > 1 {
            self.driver
                .draw_elements_instanced(params.mode, params.num_elements, index_type, indices, num_instances);
        } else if self.config.capabilities.supports_draw_index_offset {
            self.driver.draw_range_elements(
                params.mode,
                min_index,
                min_index.saturating_add(num_vertices),
                params.num_elements,
                index_type,
                indices,
            );
        } else {
            self.driver.draw_elements(params.mode, params.num_elements, index_type, indices);
        }
        Ok(())
    }

    /// Indirect draws are not implemented on OpenGL
    pub fn draw_primitive_indirect(
        &mut self,
        _primitive_type: PrimitiveType,
        _argument_buffer: VertexBufferHandle,
        _argument_offset: u32,
    ) -> RhiResult<()> {
        self.indirect_not_implemented("draw_primitive_indirect")
    }

    /// Indirect draws are not implemented on OpenGL
    pub fn draw_indexed_indirect(
        &mut self,
        _index_buffer: IndexBufferHandle,
        _primitive_type: PrimitiveType,
        _arguments_buffer: VertexBufferHandle,
        _draw_arguments_index: u32,
        _num_instances: u32,
    ) -> RhiResult<()> {
        self.indirect_not_implemented("draw_indexed_indirect")
    }

    /// Indirect draws are not implemented on OpenGL
    pub fn draw_indexed_primitive_indirect(
        &mut self,
        _primitive_type: PrimitiveType,
        _index_buffer: IndexBufferHandle,
        _argument_buffer: VertexBufferHandle,
        _argument_offset: u32,
    ) -> RhiResult<()> {
        self.indirect_not_implemented("draw_indexed_primitive_indirect")
    }

    pub(super) fn indirect_not_implemented(&mut self, operation: &'static str) -> RhiResult<()> {
        log::error!("{} is not supported by the OpenGL RHI", operation);
        self.profiler.register_gpu_work(0, 0);
        Err(RhiError::NotImplemented { operation })
    }

    fn check_instancing(&self, num_instances: u32) -> RhiResult<()> {
        if num_instances > 1 && !self.config.capabilities.supports_instancing {
            return Err(RhiError::UnsupportedCapability("instancing"));
        }
        Ok(())
    }

    /// Commit everything a draw needs up to and including shader constants
    pub(super) fn commit_draw_state(&mut self) -> RhiResult<()> {
        let Self {
            driver,
            config,
            pending,
            contexts,
            current_context,
            registry,
            generations,
            dummy_uniform_buffer,
            warnings,
            ..
        } = self;
        let caps = &config.capabilities;
        let context = &mut contexts[current_context.index()];

        commit_framebuffer(driver, caps, pending, context);
        commit_blend(driver, caps, pending, context)?;
        commit_viewport(driver, pending, context);
        commit_scissor(driver, pending, context);
        commit_rasterizer(driver, caps, pending, context);
        commit_depth_stencil(driver, pending, context);
        bind_pending_shader_state(driver, caps, pending, context, registry, generations, dummy_uniform_buffer)?;

        let handle = pending.bound_shader_state.ok_or(RhiError::NoBoundShaderState)?;
        let ResourceRegistry { textures, samplers, bound_shader_states, .. } = &mut *registry;
        let state = bound_shader_states
            .get(handle)
            .ok_or(RhiError::StaleHandle { kind: "bound shader state" })?;
        setup_textures_for_draw(
            driver,
            caps,
            pending,
            context,
            &generations.textures,
            &state.program,
            caps.max_combined_texture_image_units(),
            textures,
            samplers,
            warnings,
        )?;

        commit_graphics_constants(driver, caps, pending, registry)
    }

    pub(super) fn bind_element_array(&mut self, name: GlName) {
        let Self { driver, contexts, current_context, generations, .. } = self;
        contexts[current_context.index()].cached_bind_buffer(
            driver,
            &generations.buffers,
            BufferBindingTarget::ElementArray,
            name,
        );
    }

    /// Point the bound shader's attributes at `source`
    ///
    /// Zero-stride expansions replaced by larger ones are deleted here.
    pub(super) fn setup_vertex_source(
        &mut self,
        source: VertexSource,
        base_vertex_index: u32,
        max_vertices: u32,
    ) -> RhiResult<()> {
        let Self { driver, config, pending, contexts, current_context, registry, generations, zero_stride, .. } =
            self;
        let handle = pending.bound_shader_state.ok_or(RhiError::NoBoundShaderState)?;
        let state = registry.bound_shader_state(handle)?;

        let streams = match source {
            VertexSource::Streams => resolve_streams(&pending.streams, &registry.vertex_buffers)?,
            VertexSource::Ring { name, offset, stride } => vec![StreamBinding::Buffer { name, stride, offset }],
            VertexSource::Heap { size, stride } => {
                let data = pending.up_vertex_data.get(..size).ok_or_else(|| {
                    RhiError::ContractViolation(format!("{size} bytes of immediate vertex data were never allocated"))
                })?;
                vec![StreamBinding::Client { data, stride }; MAX_VERTEX_STREAMS]
            }
        };

        let replaced = setup_vertex_arrays(
            driver,
            &config.capabilities,
            &mut contexts[current_context.index()],
            &generations.buffers,
            zero_stride,
            state,
            &streams,
            base_vertex_index,
            max_vertices,
        )?;
        for name in replaced {
            self.delete_buffer(name);
        }
        Ok(())
    }

    pub(super) fn set_patch_size(&mut self, params: DrawParameters) {
        if self.config.capabilities.supports_tessellation && params.mode == DrawMode::Patches {
            self.driver.patch_vertices(params.patch_size);
        }
    }

    pub(super) fn register_draw(&mut self, primitive_type: PrimitiveType, primitives: u32, vertices: u32) {
        self.profiler.register_draw_call(primitive_type, primitives);
        self.profiler.register_gpu_work(primitives, vertices);
        log::trace!("{:?} draw: {} primitives, {} vertices", primitive_type, primitives, vertices);
    }
}
