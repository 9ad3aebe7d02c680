//! Program, uniform buffer and shader constant commit
//!
//! Binding a program marks the packed parameter caches of the stages it
//! serves dirty, since packed uniforms are program state in GL. Uniform
//! buffers are bound to consecutive binding points: the vertex stage's slots
//! first, then pixel, geometry, hull and domain, each starting where the
//! previous present stage ended.
//!
//! Drivers with emulated uniform buffers skip binding entirely; their buffer
//! contents reach the shaders through the packed arrays when constants are
//! committed.

use slotmap::SlotMap;

use crate::rhi::capabilities::GraphicsBackendCapabilities;
use crate::rhi::driver::GlDriver;
use crate::rhi::resources::{
    BoundShaderState, ComputeShaderHandle, ResourceRegistry, ShaderBindings, StageUniforms, UniformBuffer,
    UniformBufferHandle,
};
use crate::rhi::shader_params::ShaderParameterCache;
use crate::rhi::state::{ContextState, NameGenerations, PendingState, ResourceGenerations};
use crate::rhi::types::{BufferBindingTarget, BufferUsageHint, GlName, ShaderStage};
use crate::rhi::{RhiError, RhiResult};

/// Zero-filled uniform buffer bound to slots the engine left empty
#[derive(Debug)]
pub(crate) struct DummyUniformBuffer {
    name: Option<GlName>,
    size: usize,
}

impl DummyUniformBuffer {
    pub(crate) const fn new(size: u32) -> Self {
        Self { name: None, size: size as usize }
    }

    fn get_or_create<D: GlDriver>(
        &mut self,
        driver: &mut D,
        context: &mut ContextState,
        buffers: &NameGenerations,
    ) -> GlName {
        if let Some(name) = self.name {
            return name;
        }
        let name = driver.gen_buffer();
        context.cached_bind_buffer(driver, buffers, BufferBindingTarget::Uniform, name);
        let zeros = vec![0_u8; self.size];
        driver.buffer_data(BufferBindingTarget::Uniform, self.size, Some(&zeros), BufferUsageHint::StaticDraw);
        log::debug!("Created {} byte zero-filled dummy uniform buffer {}", self.size, name);
        self.name = Some(name);
        name
    }

    /// Forget the buffer, returning its name for deletion
    pub(crate) fn take(&mut self) -> Option<GlName> {
        self.name.take()
    }
}

/// Bind `count` uniform buffer slots of one stage starting at `first_binding`
fn bind_uniform_buffer_bases<D: GlDriver>(
    driver: &mut D,
    context: &mut ContextState,
    buffers: &NameGenerations,
    uniform_buffers: &SlotMap<UniformBufferHandle, UniformBuffer>,
    dummy: &mut DummyUniformBuffer,
    bound: &[Option<UniformBufferHandle>],
    count: u32,
    first_binding: u32,
    force: bool,
) -> RhiResult<()> {
    for slot in 0..count {
        let name = match bound.get(slot as usize).copied().flatten() {
            Some(handle) => {
                uniform_buffers
                    .get(handle)
                    .ok_or(RhiError::StaleHandle { kind: "uniform buffer" })?
                    .name
            }
            None => dummy.get_or_create(driver, context, buffers),
        };

        let binding = first_binding + slot;
        let tracked = buffers.track(name);
        let cached = context.uniform_buffers.get_mut(binding as usize).ok_or_else(|| {
            RhiError::ContractViolation(format!("uniform buffer binding {binding} exceeds the binding table"))
        })?;
        if force || *cached != Some(tracked) {
            driver.bind_buffer_base(BufferBindingTarget::Uniform, binding, name);
            *cached = Some(tracked);
            // Binding a base also replaces the generic binding
            context.uniform_buffer = Some(tracked);
        }
    }
    Ok(())
}

/// Use the pending graphics program and bind its stages' uniform buffers
pub(crate) fn bind_pending_shader_state<D: GlDriver>(
    driver: &mut D,
    caps: &GraphicsBackendCapabilities,
    pending: &mut PendingState,
    context: &mut ContextState,
    registry: &ResourceRegistry,
    generations: &ResourceGenerations,
    dummy: &mut DummyUniformBuffer,
) -> RhiResult<()> {
    let handle = pending.bound_shader_state.ok_or(RhiError::NoBoundShaderState)?;
    let state = registry.bound_shader_state(handle)?;

    let program = generations.programs.track(state.program.name);
    if context.program != Some(program) {
        driver.use_program(state.program.name);
        context.program = Some(program);
        for stage in ShaderStage::GRAPHICS {
            pending.shader_parameters[stage.index()].mark_all_dirty();
        }
    }

    if caps.uses_emulated_uniform_buffers {
        return Ok(());
    }

    let mut first_binding = 0;
    for stage in ShaderStage::GRAPHICS {
        let Some(bindings) = state.stage(stage) else {
            continue;
        };
        bind_uniform_buffer_bases(
            driver,
            context,
            &generations.buffers,
            &registry.uniform_buffers,
            dummy,
            &pending.uniform_buffers[stage.index()],
            bindings.num_uniform_buffers,
            first_binding,
            false,
        )?;
        first_binding += bindings.num_uniform_buffers;
    }
    Ok(())
}

/// Use a compute program and bind its uniform buffers
///
/// A program change forces every uniform buffer base to be rebound.
pub(crate) fn bind_compute_shader_state<D: GlDriver>(
    driver: &mut D,
    caps: &GraphicsBackendCapabilities,
    pending: &mut PendingState,
    context: &mut ContextState,
    registry: &ResourceRegistry,
    generations: &ResourceGenerations,
    dummy: &mut DummyUniformBuffer,
    handle: ComputeShaderHandle,
) -> RhiResult<()> {
    let shader = registry.compute_shader(handle)?;

    let program = generations.programs.track(shader.program.name);
    let program_changed = context.program != Some(program);
    if program_changed {
        driver.use_program(shader.program.name);
        context.program = Some(program);
        pending.shader_parameters[ShaderStage::Compute.index()].mark_all_dirty();
    }

    if caps.uses_emulated_uniform_buffers {
        return Ok(());
    }
    bind_uniform_buffer_bases(
        driver,
        context,
        &generations.buffers,
        &registry.uniform_buffers,
        dummy,
        &pending.uniform_buffers[ShaderStage::Compute.index()],
        shader.bindings.num_uniform_buffers,
        0,
        program_changed,
    )
}

/// Upload the vertex, pixel and (when present) geometry stage constants
pub(crate) fn commit_graphics_constants<D: GlDriver>(
    driver: &mut D,
    caps: &GraphicsBackendCapabilities,
    pending: &mut PendingState,
    registry: &mut ResourceRegistry,
) -> RhiResult<()> {
    let handle = pending.bound_shader_state.ok_or(RhiError::NoBoundShaderState)?;
    let ResourceRegistry { uniform_buffers, bound_shader_states, .. } = registry;
    let BoundShaderState { program, stages, .. } = bound_shader_states
        .get_mut(handle)
        .ok_or(RhiError::StaleHandle { kind: "bound shader state" })?;

    for stage in [ShaderStage::Vertex, ShaderStage::Pixel, ShaderStage::Geometry] {
        let Some(bindings) = stages[stage.index()].as_ref() else {
            continue;
        };
        commit_stage_constants(
            driver,
            caps,
            bindings,
            &mut program.desc.stages[stage.index()],
            &mut pending.shader_parameters[stage.index()],
            &pending.uniform_buffers[stage.index()],
            uniform_buffers,
        )?;
    }
    Ok(())
}

/// Upload the compute stage's packed globals
pub(crate) fn commit_compute_constants<D: GlDriver>(
    driver: &mut D,
    pending: &mut PendingState,
    registry: &ResourceRegistry,
    handle: ComputeShaderHandle,
) -> RhiResult<()> {
    let shader = registry.compute_shader(handle)?;
    let stage = ShaderStage::Compute.index();
    pending.shader_parameters[stage].commit_packed_globals(
        driver,
        &shader.program.desc.stages[stage].packed_globals,
        &shader.bindings.packed_global_arrays,
    );
    Ok(())
}

fn commit_stage_constants<D: GlDriver>(
    driver: &mut D,
    caps: &GraphicsBackendCapabilities,
    bindings: &ShaderBindings,
    uniforms: &mut StageUniforms,
    parameters: &mut ShaderParameterCache,
    bound: &[Option<UniformBufferHandle>],
    uniform_buffers: &SlotMap<UniformBufferHandle, UniformBuffer>,
) -> RhiResult<()> {
    if caps.uses_emulated_uniform_buffers && bindings.num_uniform_buffers > 0 {
        let contents = (0..bindings.num_uniform_buffers as usize)
            .map(|slot| match bound.get(slot).copied().flatten() {
                Some(handle) => uniform_buffers
                    .get(handle)
                    .map(|buffer| Some((buffer.words(), buffer.unique_id)))
                    .ok_or(RhiError::StaleHandle { kind: "uniform buffer" }),
                None => Ok(None),
            })
            .collect::<RhiResult<Vec<_>>>()?;
        parameters.commit_packed_uniform_buffers(driver, bindings, uniforms, &contents)?;
    }
    parameters.commit_packed_globals(driver, &uniforms.packed_globals, &bindings.packed_global_arrays);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rhi::commit::test_support::CommitFixture;
    use crate::rhi::driver::GlCall;
    use crate::rhi::resources::{
        BoundShaderStateDesc, ComputeShader, LinkedProgram, PackedArrayInfo, PackedUniform, ProgramDesc,
        UniformBufferCopyInfo,
    };
    use crate::rhi::capabilities::GraphicsBackendCapabilities;
    use crate::rhi::types::PackedTypeIndex;

    struct ShaderFixture {
        commit: CommitFixture,
        registry: ResourceRegistry,
        generations: ResourceGenerations,
        dummy: DummyUniformBuffer,
    }

    impl ShaderFixture {
        fn new(caps: GraphicsBackendCapabilities) -> Self {
            Self {
                commit: CommitFixture::new(caps),
                registry: ResourceRegistry::new(),
                generations: ResourceGenerations::new(),
                dummy: DummyUniformBuffer::new(64),
            }
        }

        fn bind(&mut self) -> RhiResult<()> {
            let f = &mut self.commit;
            bind_pending_shader_state(
                &mut f.driver,
                &f.caps,
                &mut f.pending,
                &mut f.context,
                &self.registry,
                &self.generations,
                &mut self.dummy,
            )
        }

        fn bind_compute(&mut self, handle: ComputeShaderHandle) -> RhiResult<()> {
            let f = &mut self.commit;
            bind_compute_shader_state(
                &mut f.driver,
                &f.caps,
                &mut f.pending,
                &mut f.context,
                &self.registry,
                &self.generations,
                &mut self.dummy,
                handle,
            )
        }
    }

    fn uniform_buffer(name: GlName, words: Vec<u32>, unique_id: u64) -> UniformBuffer {
        UniformBuffer {
            name,
            size: 16,
            allocated_size: 16,
            stream_draw: false,
            unique_id,
            shadow: words,
        }
    }

    fn graphics_state(program: GlName, vertex_buffers: u32, pixel_buffers: u32) -> BoundShaderState {
        BoundShaderState::new(
            LinkedProgram::new(program, ProgramDesc::default()),
            BoundShaderStateDesc {
                vertex: ShaderBindings { num_uniform_buffers: vertex_buffers, ..ShaderBindings::default() },
                pixel: ShaderBindings { num_uniform_buffers: pixel_buffers, ..ShaderBindings::default() },
                ..BoundShaderStateDesc::default()
            },
        )
    }

    #[test]
    fn test_bases_follow_stage_order_and_use_dummy() {
        let mut f = ShaderFixture::new(GraphicsBackendCapabilities::desktop_gl4());
        let state = f.registry.bound_shader_states.insert(graphics_state(30, 1, 2));
        let bound = f.registry.uniform_buffers.insert(uniform_buffer(40, vec![0; 4], 1));
        f.commit.pending.bound_shader_state = Some(state);
        f.commit.pending.uniform_buffers[ShaderStage::Pixel.index()][1] = Some(bound);

        f.bind().expect("Should bind shader state");
        let calls = f.commit.driver.take_calls();
        assert_eq!(calls[0], GlCall::UseProgram(30));
        let bases: Vec<_> = calls
            .iter()
            .filter_map(|call| match call {
                GlCall::BindBufferBase { index, name, .. } => Some((*index, *name)),
                _ => None,
            })
            .collect();
        let dummy = bases[0].1;
        assert_eq!(bases, vec![(0, dummy), (1, dummy), (2, 40)]);
        assert_eq!(calls.iter().filter(|call| matches!(call, GlCall::GenBuffer(_))).count(), 1);

        f.bind().expect("Should bind shader state");
        assert!(f.commit.driver.calls().is_empty());
    }

    #[test]
    fn test_program_change_marks_parameters_dirty() {
        let mut f = ShaderFixture::new(GraphicsBackendCapabilities::desktop_gl4());
        let first = f.registry.bound_shader_states.insert(graphics_state(30, 0, 0));
        let second = f.registry.bound_shader_states.insert(graphics_state(31, 0, 0));
        f.commit.pending.bound_shader_state = Some(first);
        f.bind().expect("Should bind shader state");

        let pixel = ShaderStage::Pixel.index();
        f.commit.pending.shader_parameters[pixel].commit_packed_globals(&mut f.commit.driver, &[], &[]);
        assert!(!f.commit.pending.shader_parameters[pixel].dirty_range(PackedTypeIndex::HighP).is_dirty());

        f.commit.pending.bound_shader_state = Some(second);
        f.bind().expect("Should bind shader state");
        assert!(f.commit.pending.shader_parameters[pixel].dirty_range(PackedTypeIndex::HighP).is_dirty());
    }

    #[test]
    fn test_deleted_program_name_is_rebound() {
        let mut f = ShaderFixture::new(GraphicsBackendCapabilities::desktop_gl4());
        let state = f.registry.bound_shader_states.insert(graphics_state(30, 0, 0));
        f.commit.pending.bound_shader_state = Some(state);
        f.bind().expect("Should bind shader state");
        f.commit.driver.clear_calls();

        f.generations.programs.retire(30);
        f.bind().expect("Should bind shader state");
        assert_eq!(f.commit.driver.take_calls(), vec![GlCall::UseProgram(30)]);
    }

    #[test]
    fn test_compute_program_change_forces_bases() {
        let mut f = ShaderFixture::new(GraphicsBackendCapabilities::desktop_gl4());
        let bindings = ShaderBindings { num_uniform_buffers: 1, ..ShaderBindings::default() };
        let first = f.registry.compute_shaders.insert(ComputeShader {
            program: LinkedProgram::new(50, ProgramDesc::default()),
            bindings: bindings.clone(),
        });
        let second = f.registry.compute_shaders.insert(ComputeShader {
            program: LinkedProgram::new(51, ProgramDesc::default()),
            bindings,
        });

        f.bind_compute(first).expect("Should bind compute shader");
        f.bind_compute(second).expect("Should bind compute shader");
        f.bind_compute(second).expect("Should bind compute shader");
        assert_eq!(
            f.commit.driver.count(|call| matches!(call, GlCall::BindBufferBase { index: 0, .. })),
            2
        );
    }

    #[test]
    fn test_missing_shader_state_is_an_error() {
        let mut f = ShaderFixture::new(GraphicsBackendCapabilities::desktop_gl4());
        assert!(matches!(f.bind(), Err(RhiError::NoBoundShaderState)));
    }

    #[test]
    fn test_emulated_buffers_reach_packed_globals() {
        let mut f = ShaderFixture::new(GraphicsBackendCapabilities::es2());
        let mut state = graphics_state(30, 0, 1);
        state.stages[ShaderStage::Pixel.index()] = Some(ShaderBindings {
            num_uniform_buffers: 1,
            flatten_uniform_buffers: true,
            packed_global_arrays: vec![PackedArrayInfo { type_index: PackedTypeIndex::HighP, size: 16 }],
            uniform_buffer_copy_info: vec![UniformBufferCopyInfo {
                source_uniform_buffer: 0,
                source_offset: 0,
                dest_type_index: PackedTypeIndex::HighP,
                dest_offset: 0,
                size: 4,
            }],
            ..ShaderBindings::default()
        });
        state.program.desc.stages[ShaderStage::Pixel.index()].packed_globals =
            vec![PackedUniform { location: 2, type_index: PackedTypeIndex::HighP }];
        let state = f.registry.bound_shader_states.insert(state);
        let value = [1.0_f32, 0.5, 0.25, 1.0];
        let buffer = f
            .registry
            .uniform_buffers
            .insert(uniform_buffer(0, bytemuck::cast_slice(&value).to_vec(), 1));
        f.commit.pending.bound_shader_state = Some(state);
        f.commit.pending.uniform_buffers[ShaderStage::Pixel.index()][0] = Some(buffer);

        f.bind().expect("Should bind shader state");
        assert_eq!(f.commit.driver.count(|call| matches!(call, GlCall::BindBufferBase { .. })), 0);
        f.commit.driver.clear_calls();

        let c = &mut f.commit;
        commit_graphics_constants(&mut c.driver, &c.caps, &mut c.pending, &mut f.registry)
            .expect("Should commit constants");
        assert!(c.driver.calls().contains(&GlCall::Uniform4fv { location: 2, values: value.to_vec() }));
    }
}
