//! Compute program binding and dispatch

use crate::rhi::commit::shader::{bind_compute_shader_state, commit_compute_constants};
use crate::rhi::commit::textures::{setup_textures_for_draw, setup_uavs_for_draw};
use crate::rhi::driver::GlDriver;
use crate::rhi::resources::{ComputeShaderHandle, ResourceRegistry, VertexBufferHandle};
use crate::rhi::types::{BarrierFlags, ShaderStage};
use crate::rhi::{RhiError, RhiResult};

use super::OpenGlRhi;

impl<D: GlDriver> OpenGlRhi<D> {
    /// Select and bind the compute program subsequent dispatches run
    ///
    /// A program change rebinds every compute uniform buffer base.
    pub fn set_compute_shader(&mut self, handle: ComputeShaderHandle) -> RhiResult<()> {
        if self.config.skip_compute {
            return Ok(());
        }
        if !self.config.capabilities.supports_compute_shaders {
            return Err(RhiError::UnsupportedCapability("compute shaders"));
        }
        self.registry.compute_shader(handle)?;
        self.pending.current_compute_shader = Some(handle);

        let Self {
            driver,
            config,
            pending,
            contexts,
            current_context,
            registry,
            generations,
            dummy_uniform_buffer,
            ..
        } = self;
        bind_compute_shader_state(
            driver,
            &config.capabilities,
            pending,
            &mut contexts[current_context.index()],
            registry,
            generations,
            dummy_uniform_buffer,
            handle,
        )
    }

    /// Run the current compute program over a grid of thread groups
    ///
    /// Rebinds the program when the current context does not hold it, then
    /// binds textures and image units, uploads constants and fences the
    /// dispatch with full memory barriers on both sides. Does nothing when compute is switched off in
    /// the configuration.
    pub fn dispatch_compute_shader(&mut self, x: u32, y: u32, z: u32) -> RhiResult<()> {
        if self.config.skip_compute {
            log::trace!("Skipping compute dispatch {}x{}x{}", x, y, z);
            return Ok(());
        }
        if !self.config.capabilities.supports_compute_shaders {
            return Err(RhiError::UnsupportedCapability("compute shaders"));
        }
        let handle = self
            .pending
            .current_compute_shader
            .ok_or_else(|| RhiError::ContractViolation("dispatch without a compute shader".to_string()))?;

        self.profiler.register_gpu_work(1, 0);

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

        bind_compute_shader_state(driver, caps, pending, context, registry, generations, dummy_uniform_buffer, handle)?;

        let ResourceRegistry { textures, samplers, compute_shaders, .. } = &mut *registry;
        let shader = compute_shaders
            .get(handle)
            .ok_or(RhiError::StaleHandle { kind: "compute shader" })?;
        setup_textures_for_draw(
            driver,
            caps,
            pending,
            context,
            &generations.textures,
            &shader.program,
            caps.texture_units_for_stage(ShaderStage::Compute),
            textures,
            samplers,
            warnings,
        )?;
        setup_uavs_for_draw(
            driver,
            pending,
            context,
            &generations.textures,
            &shader.program,
            caps.max_compute_uav_units,
        )?;
        commit_compute_constants(driver, pending, registry, handle)?;

        driver.memory_barrier(BarrierFlags::ALL);
        driver.dispatch_compute(x, y, z);
        driver.memory_barrier(BarrierFlags::ALL);
        Ok(())
    }

    /// Indirect dispatch is not implemented on OpenGL
    pub fn dispatch_indirect_compute_shader(
        &mut self,
        _argument_buffer: VertexBufferHandle,
        _argument_offset: u32,
    ) -> RhiResult<()> {
        self.indirect_not_implemented("dispatch_indirect_compute_shader")
    }
}
