//! Driver seam
//!
//! [`GlDriver`] names every OpenGL entry point the state layer issues. The
//! RHI never talks to GL directly: a platform backend implements this trait on
//! top of its function loader, and tests use [`RecordingDriver`].
//!
//! Methods take typed arguments rather than raw `GLenum`s. Translating to the
//! numeric constants is the backend's job.

pub mod recording;

pub use recording::{GlCall, RecordingDriver};

use super::state::descriptors::SamplerData;
use super::types::*;

/// Where a vertex attribute or index fetch reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource<'a> {
    /// Byte offset into the buffer bound to the matching target
    BufferOffset(usize),
    /// Client memory (immediate-mode draws without a bound buffer)
    Client(&'a [u8]),
}

/// Memory layout of one vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeFormat {
    /// Components per vertex
    pub components: ComponentCount,
    /// Component type
    pub component_type: VertexComponentType,
    /// Normalize fixed-point values to `[0, 1]` / `[-1, 1]`
    pub normalized: bool,
}

/// OpenGL entry points used by the RHI state layer
///
/// # Design Notes
///
/// Object creation returns the driver's name directly. Drivers are free to
/// reuse a deleted name for the next object of the same kind; the state cache
/// copes with that through generation counters, not through this trait.
pub trait GlDriver {
    // Object names

    /// `glGenBuffers`
    fn gen_buffer(&mut self) -> GlName;
    /// `glDeleteBuffers`
    fn delete_buffer(&mut self, name: GlName);
    /// `glGenTextures`
    fn gen_texture(&mut self) -> GlName;
    /// `glDeleteTextures`
    fn delete_texture(&mut self, name: GlName);
    /// `glGenSamplers`
    fn gen_sampler(&mut self) -> GlName;
    /// `glDeleteSamplers`
    fn delete_sampler(&mut self, name: GlName);
    /// `glCreateProgram` (linking is the shader compiler's business)
    fn create_program(&mut self) -> GlName;
    /// `glDeleteProgram`
    fn delete_program(&mut self, name: GlName);
    /// `glGenFramebuffers`
    fn gen_framebuffer(&mut self) -> GlName;
    /// `glDeleteFramebuffers`
    fn delete_framebuffer(&mut self, name: GlName);

    // Buffers

    /// `glBindBuffer`
    fn bind_buffer(&mut self, target: BufferBindingTarget, name: GlName);
    /// `glBindBufferBase`
    fn bind_buffer_base(&mut self, target: BufferBindingTarget, index: u32, name: GlName);
    /// `glBufferData`; `data` of `None` allocates uninitialized storage
    fn buffer_data(&mut self, target: BufferBindingTarget, size: usize, data: Option<&[u8]>, usage: BufferUsageHint);
    /// `glBufferSubData`
    fn buffer_sub_data(&mut self, target: BufferBindingTarget, offset: usize, data: &[u8]);

    // Fixed function state

    /// `glEnable`
    fn enable(&mut self, capability: Capability);
    /// `glDisable`
    fn disable(&mut self, capability: Capability);
    /// `glEnablei`
    fn enable_indexed(&mut self, capability: Capability, index: u32);
    /// `glDisablei`
    fn disable_indexed(&mut self, capability: Capability, index: u32);
    /// `glPolygonMode`
    fn polygon_mode(&mut self, face: Face, mode: FillMode);
    /// `glCullFace`
    fn cull_face(&mut self, face: Face);
    /// `glPolygonOffset`
    fn polygon_offset(&mut self, factor: f32, units: f32);
    /// `glViewport`
    fn viewport(&mut self, x: u32, y: u32, width: u32, height: u32);
    /// `glDepthRangef`
    fn depth_range(&mut self, near: f32, far: f32);
    /// `glScissor`
    fn scissor(&mut self, x: u32, y: u32, width: u32, height: u32);
    /// `glDepthMask`
    fn depth_mask(&mut self, write: bool);
    /// `glDepthFunc`
    fn depth_func(&mut self, func: CompareFunction);
    /// `glStencilFunc`
    fn stencil_func(&mut self, func: CompareFunction, reference: u32, mask: u32);
    /// `glStencilFuncSeparate`
    fn stencil_func_separate(&mut self, face: Face, func: CompareFunction, reference: u32, mask: u32);
    /// `glStencilOp`
    fn stencil_op(&mut self, fail: StencilOp, z_fail: StencilOp, pass: StencilOp);
    /// `glStencilOpSeparate`
    fn stencil_op_separate(&mut self, face: Face, fail: StencilOp, z_fail: StencilOp, pass: StencilOp);
    /// `glStencilMask`
    fn stencil_mask(&mut self, mask: u32);

    // Blending

    /// `glBlendFunc`
    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor);
    /// `glBlendFuncSeparate`
    fn blend_func_separate(&mut self, src_color: BlendFactor, dst_color: BlendFactor, src_alpha: BlendFactor, dst_alpha: BlendFactor);
    /// `glBlendEquation`
    fn blend_equation(&mut self, op: BlendOp);
    /// `glBlendEquationSeparate`
    fn blend_equation_separate(&mut self, color_op: BlendOp, alpha_op: BlendOp);
    /// `glBlendFunci`
    fn blend_func_indexed(&mut self, index: u32, src: BlendFactor, dst: BlendFactor);
    /// `glBlendFuncSeparatei`
    fn blend_func_separate_indexed(&mut self, index: u32, src_color: BlendFactor, dst_color: BlendFactor, src_alpha: BlendFactor, dst_alpha: BlendFactor);
    /// `glBlendEquationi`
    fn blend_equation_indexed(&mut self, index: u32, op: BlendOp);
    /// `glBlendEquationSeparatei`
    fn blend_equation_separate_indexed(&mut self, index: u32, color_op: BlendOp, alpha_op: BlendOp);
    /// `glBlendColor`
    fn blend_color(&mut self, color: LinearColor);
    /// `glColorMaski`
    fn color_mask_indexed(&mut self, index: u32, mask: ColorWriteMask);
    /// `glFlush`
    fn flush(&mut self);

    // Programs and textures

    /// `glUseProgram`
    fn use_program(&mut self, program: GlName);
    /// `glActiveTexture(GL_TEXTURE0 + unit)`
    fn active_texture(&mut self, unit: u32);
    /// `glBindTexture`
    fn bind_texture(&mut self, target: TextureTarget, name: GlName);
    /// `glTexParameter*` on the texture bound to `target` on the active unit
    fn tex_parameter(&mut self, target: TextureTarget, parameter: TextureParameter);
    /// `glSamplerParameter*` for every field of `data`
    fn sampler_parameters(&mut self, sampler: GlName, data: &SamplerData);
    /// `glBindSampler`
    fn bind_sampler(&mut self, unit: u32, sampler: GlName);
    /// `glBindImageTexture(unit, name, 0, GL_FALSE, 0, GL_READ_WRITE, format)`
    fn bind_image_texture(&mut self, unit: u32, name: GlName, format: ImageFormat);

    // Vertex input

    /// `glEnableVertexAttribArray`
    fn enable_vertex_attrib_array(&mut self, index: u32);
    /// `glDisableVertexAttribArray`
    fn disable_vertex_attrib_array(&mut self, index: u32);
    /// `glVertexAttribPointer`
    fn vertex_attrib_pointer(&mut self, index: u32, format: AttributeFormat, stride: u32, source: DataSource<'_>);
    /// `glVertexAttribIPointer`
    fn vertex_attrib_integer_pointer(&mut self, index: u32, format: AttributeFormat, stride: u32, source: DataSource<'_>);
    /// `glVertexAttribDivisor`
    fn vertex_attrib_divisor(&mut self, index: u32, divisor: u32);
    /// `glVertexAttrib4fv`
    fn vertex_attrib_4f(&mut self, index: u32, value: [f32; 4]);

    // Uniforms

    /// `glUniform4fv`; `values.len()` is a multiple of four
    fn uniform_4fv(&mut self, location: i32, values: &[f32]);
    /// `glUniform4iv`
    fn uniform_4iv(&mut self, location: i32, values: &[i32]);
    /// `glUniform4uiv`
    fn uniform_4uiv(&mut self, location: i32, values: &[u32]);

    // Framebuffers

    /// `glBindFramebuffer(GL_FRAMEBUFFER, name)`
    fn bind_framebuffer(&mut self, name: GlName);
    /// `glFramebufferTexture*`
    fn framebuffer_texture(&mut self, attachment: FramebufferAttachment, target: TextureTarget, texture: GlName, mip_level: u32, layer: Option<u32>);
    /// `glReadBuffer`
    fn read_buffer(&mut self, buffer: DrawBuffer);
    /// `glDrawBuffers`
    fn draw_buffers(&mut self, buffers: &[DrawBuffer]);
    /// `glInvalidateFramebuffer` / `glDiscardFramebufferEXT`
    fn invalidate_framebuffer(&mut self, attachments: &[FramebufferAttachment]);

    // Clears

    /// `glClearBufferfv(GL_COLOR, draw_buffer, color)`
    fn clear_buffer_color(&mut self, draw_buffer: u32, color: LinearColor);
    /// `glClearBufferfv(GL_DEPTH, 0, &depth)`
    fn clear_buffer_depth(&mut self, depth: f32);
    /// `glClearBufferiv(GL_STENCIL, 0, &stencil)`
    fn clear_buffer_stencil(&mut self, stencil: u32);
    /// `glClearBufferfi(GL_DEPTH_STENCIL, 0, depth, stencil)`
    fn clear_buffer_depth_stencil(&mut self, depth: f32, stencil: u32);
    /// `glClearColor`
    fn clear_color(&mut self, color: LinearColor);
    /// `glClearDepthf`
    fn clear_depth(&mut self, depth: f32);
    /// `glClearStencil`
    fn clear_stencil(&mut self, stencil: u32);
    /// `glClear`
    fn clear(&mut self, flags: ClearFlags);

    // Draws and dispatch

    /// `glPatchParameteri(GL_PATCH_VERTICES, count)`
    fn patch_vertices(&mut self, count: u32);
    /// `glDrawArrays`
    fn draw_arrays(&mut self, mode: DrawMode, first: u32, count: u32);
    /// `glDrawArraysInstanced`
    fn draw_arrays_instanced(&mut self, mode: DrawMode, first: u32, count: u32, instances: u32);
    /// `glDrawElements`
    fn draw_elements(&mut self, mode: DrawMode, count: u32, index_type: IndexType, indices: DataSource<'_>);
    /// `glDrawRangeElements`
    fn draw_range_elements(&mut self, mode: DrawMode, start: u32, end: u32, count: u32, index_type: IndexType, indices: DataSource<'_>);
    /// `glDrawElementsInstanced`
    fn draw_elements_instanced(&mut self, mode: DrawMode, count: u32, index_type: IndexType, indices: DataSource<'_>, instances: u32);
    /// `glDispatchCompute`
    fn dispatch_compute(&mut self, x: u32, y: u32, z: u32);
    /// `glMemoryBarrier`
    fn memory_barrier(&mut self, barriers: BarrierFlags);

    // Diagnostics

    /// Debug label attached to an object, if the driver exposes `KHR_debug`
    fn object_label(&self, _name: GlName) -> Option<String> {
        None
    }

    /// GPU time of the last completed frame in cycles, if timer queries are available
    fn gpu_frame_cycles(&mut self) -> Option<u32> {
        None
    }
}
