//! Recording driver
//!
//! A [`GlDriver`] that performs no rendering and instead records every call.
//! Used by the unit tests and by the demo binary to observe exactly which GL
//! calls the state cache lets through.
//!
//! Deleted names go back onto a per-namespace free list and are handed out
//! again first, mimicking how real drivers recycle names.

use std::collections::HashMap;

use super::{AttributeFormat, DataSource, GlDriver};
use crate::rhi::state::descriptors::SamplerData;
use crate::rhi::types::*;

/// One recorded GL call
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum GlCall {
    GenBuffer(GlName),
    DeleteBuffer(GlName),
    GenTexture(GlName),
    DeleteTexture(GlName),
    GenSampler(GlName),
    DeleteSampler(GlName),
    CreateProgram(GlName),
    DeleteProgram(GlName),
    GenFramebuffer(GlName),
    DeleteFramebuffer(GlName),
    BindBuffer { target: BufferBindingTarget, name: GlName },
    BindBufferBase { target: BufferBindingTarget, index: u32, name: GlName },
    BufferData { target: BufferBindingTarget, size: usize, initialized: bool, usage: BufferUsageHint },
    BufferSubData { target: BufferBindingTarget, offset: usize, data: Vec<u8> },
    Enable(Capability),
    Disable(Capability),
    EnableIndexed(Capability, u32),
    DisableIndexed(Capability, u32),
    PolygonMode(Face, FillMode),
    CullFace(Face),
    PolygonOffset { factor: f32, units: f32 },
    Viewport { x: u32, y: u32, width: u32, height: u32 },
    DepthRange { near: f32, far: f32 },
    Scissor { x: u32, y: u32, width: u32, height: u32 },
    DepthMask(bool),
    DepthFunc(CompareFunction),
    StencilFunc { func: CompareFunction, reference: u32, mask: u32 },
    StencilFuncSeparate { face: Face, func: CompareFunction, reference: u32, mask: u32 },
    StencilOp { fail: StencilOp, z_fail: StencilOp, pass: StencilOp },
    StencilOpSeparate { face: Face, fail: StencilOp, z_fail: StencilOp, pass: StencilOp },
    StencilMask(u32),
    BlendFunc { src: BlendFactor, dst: BlendFactor },
    BlendFuncSeparate { src_color: BlendFactor, dst_color: BlendFactor, src_alpha: BlendFactor, dst_alpha: BlendFactor },
    BlendEquation(BlendOp),
    BlendEquationSeparate { color_op: BlendOp, alpha_op: BlendOp },
    BlendFuncIndexed { index: u32, src: BlendFactor, dst: BlendFactor },
    BlendFuncSeparateIndexed { index: u32, src_color: BlendFactor, dst_color: BlendFactor, src_alpha: BlendFactor, dst_alpha: BlendFactor },
    BlendEquationIndexed { index: u32, op: BlendOp },
    BlendEquationSeparateIndexed { index: u32, color_op: BlendOp, alpha_op: BlendOp },
    BlendColor(LinearColor),
    ColorMaskIndexed { index: u32, mask: ColorWriteMask },
    Flush,
    UseProgram(GlName),
    ActiveTexture(u32),
    BindTexture { target: TextureTarget, name: GlName },
    TexParameter { target: TextureTarget, parameter: TextureParameter },
    SamplerParameters { sampler: GlName, data: SamplerData },
    BindSampler { unit: u32, sampler: GlName },
    BindImageTexture { unit: u32, name: GlName, format: ImageFormat },
    EnableVertexAttribArray(u32),
    DisableVertexAttribArray(u32),
    VertexAttribPointer { index: u32, format: AttributeFormat, stride: u32, offset: Option<usize>, integer: bool },
    VertexAttribDivisor { index: u32, divisor: u32 },
    VertexAttrib4f { index: u32, value: [f32; 4] },
    Uniform4fv { location: i32, values: Vec<f32> },
    Uniform4iv { location: i32, values: Vec<i32> },
    Uniform4uiv { location: i32, values: Vec<u32> },
    BindFramebuffer(GlName),
    FramebufferTexture { attachment: FramebufferAttachment, target: TextureTarget, texture: GlName, mip_level: u32, layer: Option<u32> },
    ReadBuffer(DrawBuffer),
    DrawBuffers(Vec<DrawBuffer>),
    InvalidateFramebuffer(Vec<FramebufferAttachment>),
    ClearBufferColor { draw_buffer: u32, color: LinearColor },
    ClearBufferDepth(f32),
    ClearBufferStencil(u32),
    ClearBufferDepthStencil { depth: f32, stencil: u32 },
    ClearColor(LinearColor),
    ClearDepth(f32),
    ClearStencil(u32),
    Clear(ClearFlags),
    PatchVertices(u32),
    DrawArrays { mode: DrawMode, first: u32, count: u32 },
    DrawArraysInstanced { mode: DrawMode, first: u32, count: u32, instances: u32 },
    DrawElements { mode: DrawMode, count: u32, index_type: IndexType, offset: Option<usize> },
    DrawRangeElements { mode: DrawMode, start: u32, end: u32, count: u32, index_type: IndexType, offset: Option<usize> },
    DrawElementsInstanced { mode: DrawMode, count: u32, index_type: IndexType, offset: Option<usize>, instances: u32 },
    DispatchCompute { x: u32, y: u32, z: u32 },
    MemoryBarrier(BarrierFlags),
}

impl GlCall {
    /// Whether the call submits GPU work (draw or dispatch)
    pub const fn is_draw(&self) -> bool {
        matches!(
            self,
            Self::DrawArrays { .. }
                | Self::DrawArraysInstanced { .. }
                | Self::DrawElements { .. }
                | Self::DrawRangeElements { .. }
                | Self::DrawElementsInstanced { .. }
                | Self::DispatchCompute { .. }
        )
    }

    /// Whether the call clears framebuffer contents
    pub const fn is_clear(&self) -> bool {
        matches!(
            self,
            Self::ClearBufferColor { .. }
                | Self::ClearBufferDepth(_)
                | Self::ClearBufferStencil(_)
                | Self::ClearBufferDepthStencil { .. }
                | Self::Clear(_)
        )
    }
}

/// Name allocator for one GL object namespace
#[derive(Debug, Default)]
struct NamePool {
    next: GlName,
    free: Vec<GlName>,
}

impl NamePool {
    fn allocate(&mut self) -> GlName {
        self.free.pop().unwrap_or_else(|| {
            self.next += 1;
            self.next
        })
    }

    fn release(&mut self, name: GlName) {
        if name != 0 && !self.free.contains(&name) {
            self.free.push(name);
        }
    }
}

/// Driver that records calls instead of executing them
#[derive(Debug, Default)]
pub struct RecordingDriver {
    calls: Vec<GlCall>,
    buffers: NamePool,
    textures: NamePool,
    samplers: NamePool,
    programs: NamePool,
    framebuffers: NamePool,
    labels: HashMap<GlName, String>,
    gpu_frame_cycles: Option<u32>,
}

impl RecordingDriver {
    /// Create an empty recording driver
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls recorded since creation or the last [`Self::clear_calls`]
    pub fn calls(&self) -> &[GlCall] {
        &self.calls
    }

    /// Forget recorded calls
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Take recorded calls, leaving the log empty
    pub fn take_calls(&mut self) -> Vec<GlCall> {
        std::mem::take(&mut self.calls)
    }

    /// Count recorded calls matching a predicate
    pub fn count(&self, predicate: impl Fn(&GlCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    /// Number of draw and dispatch calls recorded
    pub fn draw_call_count(&self) -> usize {
        self.count(GlCall::is_draw)
    }

    /// Attach a debug label to an object name
    pub fn set_object_label(&mut self, name: GlName, label: impl Into<String>) {
        self.labels.insert(name, label.into());
    }

    /// Value returned by the next GPU frame timing query
    pub fn set_gpu_frame_cycles(&mut self, cycles: Option<u32>) {
        self.gpu_frame_cycles = cycles;
    }

    fn record(&mut self, call: GlCall) {
        log::trace!("GL {:?}", call);
        self.calls.push(call);
    }
}

fn offset_of(source: DataSource<'_>) -> Option<usize> {
    match source {
        DataSource::BufferOffset(offset) => Some(offset),
        DataSource::Client(_) => None,
    }
}

impl GlDriver for RecordingDriver {
    fn gen_buffer(&mut self) -> GlName {
        let name = self.buffers.allocate();
        self.record(GlCall::GenBuffer(name));
        name
    }

    fn delete_buffer(&mut self, name: GlName) {
        self.buffers.release(name);
        self.record(GlCall::DeleteBuffer(name));
    }

    fn gen_texture(&mut self) -> GlName {
        let name = self.textures.allocate();
        self.record(GlCall::GenTexture(name));
        name
    }

    fn delete_texture(&mut self, name: GlName) {
        self.textures.release(name);
        self.labels.remove(&name);
        self.record(GlCall::DeleteTexture(name));
    }

    fn gen_sampler(&mut self) -> GlName {
        let name = self.samplers.allocate();
        self.record(GlCall::GenSampler(name));
        name
    }

    fn delete_sampler(&mut self, name: GlName) {
        self.samplers.release(name);
        self.record(GlCall::DeleteSampler(name));
    }

    fn create_program(&mut self) -> GlName {
        let name = self.programs.allocate();
        self.record(GlCall::CreateProgram(name));
        name
    }

    fn delete_program(&mut self, name: GlName) {
        self.programs.release(name);
        self.record(GlCall::DeleteProgram(name));
    }

    fn gen_framebuffer(&mut self) -> GlName {
        let name = self.framebuffers.allocate();
        self.record(GlCall::GenFramebuffer(name));
        name
    }

    fn delete_framebuffer(&mut self, name: GlName) {
        self.framebuffers.release(name);
        self.record(GlCall::DeleteFramebuffer(name));
    }

    fn bind_buffer(&mut self, target: BufferBindingTarget, name: GlName) {
        self.record(GlCall::BindBuffer { target, name });
    }

    fn bind_buffer_base(&mut self, target: BufferBindingTarget, index: u32, name: GlName) {
        self.record(GlCall::BindBufferBase { target, index, name });
    }

    fn buffer_data(&mut self, target: BufferBindingTarget, size: usize, data: Option<&[u8]>, usage: BufferUsageHint) {
        self.record(GlCall::BufferData { target, size, initialized: data.is_some(), usage });
    }

    fn buffer_sub_data(&mut self, target: BufferBindingTarget, offset: usize, data: &[u8]) {
        self.record(GlCall::BufferSubData { target, offset, data: data.to_vec() });
    }

    fn enable(&mut self, capability: Capability) {
        self.record(GlCall::Enable(capability));
    }

    fn disable(&mut self, capability: Capability) {
        self.record(GlCall::Disable(capability));
    }

    fn enable_indexed(&mut self, capability: Capability, index: u32) {
        self.record(GlCall::EnableIndexed(capability, index));
    }

    fn disable_indexed(&mut self, capability: Capability, index: u32) {
        self.record(GlCall::DisableIndexed(capability, index));
    }

    fn polygon_mode(&mut self, face: Face, mode: FillMode) {
        self.record(GlCall::PolygonMode(face, mode));
    }

    fn cull_face(&mut self, face: Face) {
        self.record(GlCall::CullFace(face));
    }

    fn polygon_offset(&mut self, factor: f32, units: f32) {
        self.record(GlCall::PolygonOffset { factor, units });
    }

    fn viewport(&mut self, x: u32, y: u32, width: u32, height: u32) {
        self.record(GlCall::Viewport { x, y, width, height });
    }

    fn depth_range(&mut self, near: f32, far: f32) {
        self.record(GlCall::DepthRange { near, far });
    }

    fn scissor(&mut self, x: u32, y: u32, width: u32, height: u32) {
        self.record(GlCall::Scissor { x, y, width, height });
    }

    fn depth_mask(&mut self, write: bool) {
        self.record(GlCall::DepthMask(write));
    }

    fn depth_func(&mut self, func: CompareFunction) {
        self.record(GlCall::DepthFunc(func));
    }

    fn stencil_func(&mut self, func: CompareFunction, reference: u32, mask: u32) {
        self.record(GlCall::StencilFunc { func, reference, mask });
    }

    fn stencil_func_separate(&mut self, face: Face, func: CompareFunction, reference: u32, mask: u32) {
        self.record(GlCall::StencilFuncSeparate { face, func, reference, mask });
    }

    fn stencil_op(&mut self, fail: StencilOp, z_fail: StencilOp, pass: StencilOp) {
        self.record(GlCall::StencilOp { fail, z_fail, pass });
    }

    fn stencil_op_separate(&mut self, face: Face, fail: StencilOp, z_fail: StencilOp, pass: StencilOp) {
        self.record(GlCall::StencilOpSeparate { face, fail, z_fail, pass });
    }

    fn stencil_mask(&mut self, mask: u32) {
        self.record(GlCall::StencilMask(mask));
    }

    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.record(GlCall::BlendFunc { src, dst });
    }

    fn blend_func_separate(&mut self, src_color: BlendFactor, dst_color: BlendFactor, src_alpha: BlendFactor, dst_alpha: BlendFactor) {
        self.record(GlCall::BlendFuncSeparate { src_color, dst_color, src_alpha, dst_alpha });
    }

    fn blend_equation(&mut self, op: BlendOp) {
        self.record(GlCall::BlendEquation(op));
    }

    fn blend_equation_separate(&mut self, color_op: BlendOp, alpha_op: BlendOp) {
        self.record(GlCall::BlendEquationSeparate { color_op, alpha_op });
    }

    fn blend_func_indexed(&mut self, index: u32, src: BlendFactor, dst: BlendFactor) {
        self.record(GlCall::BlendFuncIndexed { index, src, dst });
    }

    fn blend_func_separate_indexed(&mut self, index: u32, src_color: BlendFactor, dst_color: BlendFactor, src_alpha: BlendFactor, dst_alpha: BlendFactor) {
        self.record(GlCall::BlendFuncSeparateIndexed { index, src_color, dst_color, src_alpha, dst_alpha });
    }

    fn blend_equation_indexed(&mut self, index: u32, op: BlendOp) {
        self.record(GlCall::BlendEquationIndexed { index, op });
    }

    fn blend_equation_separate_indexed(&mut self, index: u32, color_op: BlendOp, alpha_op: BlendOp) {
        self.record(GlCall::BlendEquationSeparateIndexed { index, color_op, alpha_op });
    }

    fn blend_color(&mut self, color: LinearColor) {
        self.record(GlCall::BlendColor(color));
    }

    fn color_mask_indexed(&mut self, index: u32, mask: ColorWriteMask) {
        self.record(GlCall::ColorMaskIndexed { index, mask });
    }

    fn flush(&mut self) {
        self.record(GlCall::Flush);
    }

    fn use_program(&mut self, program: GlName) {
        self.record(GlCall::UseProgram(program));
    }

    fn active_texture(&mut self, unit: u32) {
        self.record(GlCall::ActiveTexture(unit));
    }

    fn bind_texture(&mut self, target: TextureTarget, name: GlName) {
        self.record(GlCall::BindTexture { target, name });
    }

    fn tex_parameter(&mut self, target: TextureTarget, parameter: TextureParameter) {
        self.record(GlCall::TexParameter { target, parameter });
    }

    fn sampler_parameters(&mut self, sampler: GlName, data: &SamplerData) {
        self.record(GlCall::SamplerParameters { sampler, data: *data });
    }

    fn bind_sampler(&mut self, unit: u32, sampler: GlName) {
        self.record(GlCall::BindSampler { unit, sampler });
    }

    fn bind_image_texture(&mut self, unit: u32, name: GlName, format: ImageFormat) {
        self.record(GlCall::BindImageTexture { unit, name, format });
    }

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        self.record(GlCall::EnableVertexAttribArray(index));
    }

    fn disable_vertex_attrib_array(&mut self, index: u32) {
        self.record(GlCall::DisableVertexAttribArray(index));
    }

    fn vertex_attrib_pointer(&mut self, index: u32, format: AttributeFormat, stride: u32, source: DataSource<'_>) {
        self.record(GlCall::VertexAttribPointer { index, format, stride, offset: offset_of(source), integer: false });
    }

    fn vertex_attrib_integer_pointer(&mut self, index: u32, format: AttributeFormat, stride: u32, source: DataSource<'_>) {
        self.record(GlCall::VertexAttribPointer { index, format, stride, offset: offset_of(source), integer: true });
    }

    fn vertex_attrib_divisor(&mut self, index: u32, divisor: u32) {
        self.record(GlCall::VertexAttribDivisor { index, divisor });
    }

    fn vertex_attrib_4f(&mut self, index: u32, value: [f32; 4]) {
        self.record(GlCall::VertexAttrib4f { index, value });
    }

    fn uniform_4fv(&mut self, location: i32, values: &[f32]) {
        self.record(GlCall::Uniform4fv { location, values: values.to_vec() });
    }

    fn uniform_4iv(&mut self, location: i32, values: &[i32]) {
        self.record(GlCall::Uniform4iv { location, values: values.to_vec() });
    }

    fn uniform_4uiv(&mut self, location: i32, values: &[u32]) {
        self.record(GlCall::Uniform4uiv { location, values: values.to_vec() });
    }

    fn bind_framebuffer(&mut self, name: GlName) {
        self.record(GlCall::BindFramebuffer(name));
    }

    fn framebuffer_texture(&mut self, attachment: FramebufferAttachment, target: TextureTarget, texture: GlName, mip_level: u32, layer: Option<u32>) {
        self.record(GlCall::FramebufferTexture { attachment, target, texture, mip_level, layer });
    }

    fn read_buffer(&mut self, buffer: DrawBuffer) {
        self.record(GlCall::ReadBuffer(buffer));
    }

    fn draw_buffers(&mut self, buffers: &[DrawBuffer]) {
        self.record(GlCall::DrawBuffers(buffers.to_vec()));
    }

    fn invalidate_framebuffer(&mut self, attachments: &[FramebufferAttachment]) {
        self.record(GlCall::InvalidateFramebuffer(attachments.to_vec()));
    }

    fn clear_buffer_color(&mut self, draw_buffer: u32, color: LinearColor) {
        self.record(GlCall::ClearBufferColor { draw_buffer, color });
    }

    fn clear_buffer_depth(&mut self, depth: f32) {
        self.record(GlCall::ClearBufferDepth(depth));
    }

    fn clear_buffer_stencil(&mut self, stencil: u32) {
        self.record(GlCall::ClearBufferStencil(stencil));
    }

    fn clear_buffer_depth_stencil(&mut self, depth: f32, stencil: u32) {
        self.record(GlCall::ClearBufferDepthStencil { depth, stencil });
    }

    fn clear_color(&mut self, color: LinearColor) {
        self.record(GlCall::ClearColor(color));
    }

    fn clear_depth(&mut self, depth: f32) {
        self.record(GlCall::ClearDepth(depth));
    }

    fn clear_stencil(&mut self, stencil: u32) {
        self.record(GlCall::ClearStencil(stencil));
    }

    fn clear(&mut self, flags: ClearFlags) {
        self.record(GlCall::Clear(flags));
    }

    fn patch_vertices(&mut self, count: u32) {
        self.record(GlCall::PatchVertices(count));
    }

    fn draw_arrays(&mut self, mode: DrawMode, first: u32, count: u32) {
        self.record(GlCall::DrawArrays { mode, first, count });
    }

    fn draw_arrays_instanced(&mut self, mode: DrawMode, first: u32, count: u32, instances: u32) {
        self.record(GlCall::DrawArraysInstanced { mode, first, count, instances });
    }

    fn draw_elements(&mut self, mode: DrawMode, count: u32, index_type: IndexType, indices: DataSource<'_>) {
        self.record(GlCall::DrawElements { mode, count, index_type, offset: offset_of(indices) });
    }

    fn draw_range_elements(&mut self, mode: DrawMode, start: u32, end: u32, count: u32, index_type: IndexType, indices: DataSource<'_>) {
        self.record(GlCall::DrawRangeElements { mode, start, end, count, index_type, offset: offset_of(indices) });
    }

    fn draw_elements_instanced(&mut self, mode: DrawMode, count: u32, index_type: IndexType, indices: DataSource<'_>, instances: u32) {
        self.record(GlCall::DrawElementsInstanced { mode, count, index_type, offset: offset_of(indices), instances });
    }

    fn dispatch_compute(&mut self, x: u32, y: u32, z: u32) {
        self.record(GlCall::DispatchCompute { x, y, z });
    }

    fn memory_barrier(&mut self, barriers: BarrierFlags) {
        self.record(GlCall::MemoryBarrier(barriers));
    }

    fn object_label(&self, name: GlName) -> Option<String> {
        self.labels.get(&name).cloned()
    }

    fn gpu_frame_cycles(&mut self) -> Option<u32> {
        self.gpu_frame_cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deleted_names_are_reused() {
        let mut driver = RecordingDriver::new();
        let first = driver.gen_buffer();
        let second = driver.gen_buffer();
        assert_ne!(first, second);

        driver.delete_buffer(first);
        assert_eq!(driver.gen_buffer(), first);
        assert_eq!(driver.gen_buffer(), second + 1);
    }

    #[test]
    fn test_namespaces_are_independent() {
        let mut driver = RecordingDriver::new();
        assert_eq!(driver.gen_buffer(), 1);
        assert_eq!(driver.gen_texture(), 1);
        assert_eq!(driver.create_program(), 1);
    }

    #[test]
    fn test_draw_calls_are_counted() {
        let mut driver = RecordingDriver::new();
        driver.viewport(0, 0, 16, 16);
        driver.draw_arrays(DrawMode::Triangles, 0, 3);
        driver.dispatch_compute(1, 1, 1);
        assert_eq!(driver.draw_call_count(), 2);
        assert_eq!(driver.take_calls().len(), 3);
        assert!(driver.calls().is_empty());
    }
}
