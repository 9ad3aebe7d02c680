//! Pending-state setters
//!
//! Nothing here talks to the driver except sampler binding on drivers with
//! sampler objects, which is not part of any cached state.

use crate::rhi::driver::GlDriver;
use crate::rhi::resources::{
    BoundShaderStateHandle, SamplerHandle, ShaderResourceViewHandle, TextureHandle, UniformBufferHandle,
    UnorderedAccessViewHandle, VertexBufferHandle,
};
use crate::rhi::state::{
    BlendStateData, DepthStencilStateData, RasterizerStateData, TextureStage, UavStage, VertexStream,
};
use crate::rhi::types::*;
use crate::rhi::{RhiError, RhiResult};

use super::OpenGlRhi;

impl<D: GlDriver> OpenGlRhi<D> {
    /// Set the viewport rectangle and depth range
    pub fn set_viewport(&mut self, viewport: IntRect, min_z: f32, max_z: f32) {
        self.pending.viewport = viewport;
        self.pending.depth_min_z = min_z;
        self.pending.depth_max_z = max_z;
    }

    /// Enable or disable the scissor test and set its rectangle
    pub fn set_scissor_rect(&mut self, enabled: bool, rect: IntRect) {
        self.pending.scissor_enabled = enabled;
        self.pending.scissor = rect;
    }

    /// Set the rasterizer state
    pub fn set_rasterizer_state(&mut self, state: RasterizerStateData) {
        self.pending.rasterizer = state;
    }

    /// Set the depth-stencil state and stencil reference value
    pub fn set_depth_stencil_state(&mut self, state: DepthStencilStateData, stencil_ref: u32) {
        self.pending.depth_stencil_state = state;
        self.pending.stencil_ref = stencil_ref;
    }

    /// Set the blend state and constant blend color
    pub fn set_blend_state(&mut self, state: BlendStateData, blend_factor: LinearColor) {
        self.pending.blend = state;
        self.pending.blend_factor = blend_factor;
    }

    /// Select the shaders subsequent draws use
    pub fn set_bound_shader_state(&mut self, handle: BoundShaderStateHandle) -> RhiResult<()> {
        self.registry.bound_shader_state(handle)?;
        self.pending.bound_shader_state = Some(handle);
        Ok(())
    }

    /// Bind a texture to one of a stage's texture slots
    pub fn set_shader_texture(&mut self, stage: ShaderStage, index: u32, texture: TextureHandle) -> RhiResult<()> {
        self.validate_stage(stage)?;
        let unit = self.texture_unit(stage, index)?;
        let texture_data = self.registry.texture(texture)?;
        let num_mips = texture_data.desc.num_mips;
        self.pending.textures[unit] = TextureStage {
            texture: Some(texture),
            target: Some(texture_data.desc.target),
            resource: texture_data.name,
            limit_mip: None,
            num_mips,
            has_mips: num_mips == 0 || num_mips > 1,
        };
        Ok(())
    }

    /// Set the sampler of one of a stage's texture slots
    ///
    /// With sampler objects the sampler is bound right away; otherwise its
    /// parameters are written into the texture at the next draw.
    pub fn set_shader_sampler(&mut self, stage: ShaderStage, index: u32, sampler: SamplerHandle) -> RhiResult<()> {
        self.validate_stage(stage)?;
        let unit = self.texture_unit(stage, index)?;
        let sampler_state = self.registry.sampler(sampler)?;
        if self.config.capabilities.supports_sampler_objects {
            let unit = u32::try_from(unit).unwrap_or(u32::MAX);
            self.driver.bind_sampler(unit, sampler_state.name);
        } else {
            self.pending.samplers[unit] = Some(sampler);
        }
        Ok(())
    }

    /// Bind a uniform buffer to one of a stage's buffer slots
    pub fn set_shader_uniform_buffer(
        &mut self,
        stage: ShaderStage,
        index: u32,
        buffer: UniformBufferHandle,
    ) -> RhiResult<()> {
        self.validate_stage(stage)?;
        self.registry.uniform_buffer(buffer)?;
        let slot = self.pending.uniform_buffers[stage.index()]
            .get_mut(index as usize)
            .ok_or_else(|| {
                RhiError::ContractViolation(format!("uniform buffer slot {index} of the {stage:?} stage is out of range"))
            })?;
        *slot = Some(buffer);
        Ok(())
    }

    /// Write loose shader constants into a stage's packed uniform array
    pub fn set_shader_parameter(
        &mut self,
        stage: ShaderStage,
        type_index: PackedTypeIndex,
        byte_offset: u32,
        bytes: &[u8],
    ) -> RhiResult<()> {
        self.validate_stage(stage)?;
        self.pending.shader_parameters[stage.index()].set(type_index, byte_offset, bytes)
    }

    /// Bind a shader resource view to one of a stage's texture slots
    ///
    /// `None` binds an empty texture buffer. The stage's sampler is replaced
    /// by the device's point sampler.
    pub fn set_shader_resource_view_parameter(
        &mut self,
        stage: ShaderStage,
        index: u32,
        view: Option<ShaderResourceViewHandle>,
    ) -> RhiResult<()> {
        self.validate_stage(stage)?;
        let unit = self.texture_unit(stage, index)?;
        let (target, resource, limit_mip) = match view {
            Some(handle) => {
                let view = self.registry.shader_resource_view(handle)?;
                (view.target, view.resource, view.limit_mip)
            }
            None => (TextureTarget::TextureBuffer, 0, None),
        };
        self.pending.textures[unit] = TextureStage {
            texture: None,
            target: Some(target),
            resource,
            limit_mip,
            num_mips: 0,
            has_mips: true,
        };
        self.set_shader_sampler(stage, index, self.point_sampler)
    }

    /// Bind an image to a compute image unit, `None` unbinds it
    pub fn set_uav_parameter(&mut self, index: u32, view: Option<UnorderedAccessViewHandle>) -> RhiResult<()> {
        self.validate_stage(ShaderStage::Compute)?;
        let stage = match view {
            Some(handle) => {
                let view = self.registry.unordered_access_view(handle)?;
                UavStage { format: view.format, resource: view.resource }
            }
            None => UavStage { format: ImageFormat::R32F, resource: 0 },
        };
        let slot = self
            .pending
            .uavs
            .get_mut(index as usize)
            .ok_or_else(|| RhiError::ContractViolation(format!("image unit {index} is out of range")))?;
        *slot = stage;
        Ok(())
    }

    /// Bind a vertex buffer to a stream, `None` unbinds it
    pub fn set_stream_source(
        &mut self,
        stream_index: u32,
        buffer: Option<VertexBufferHandle>,
        stride: u32,
        offset: u32,
    ) -> RhiResult<()> {
        if let Some(handle) = buffer {
            self.registry.vertex_buffer(handle)?;
        }
        let stream = self
            .pending
            .streams
            .get_mut(stream_index as usize)
            .ok_or_else(|| RhiError::ContractViolation(format!("vertex stream {stream_index} is out of range")))?;
        *stream = VertexStream { buffer, stride, offset };
        Ok(())
    }

    /// Multiple viewports are not implemented on OpenGL
    pub fn set_multiple_viewports(&mut self, _viewports: &[IntRect]) -> RhiResult<()> {
        not_implemented("set_multiple_viewports")
    }

    /// Stream output is not implemented on OpenGL
    pub fn set_stream_out_targets(&mut self, _buffers: &[(VertexBufferHandle, u32)]) -> RhiResult<()> {
        not_implemented("set_stream_out_targets")
    }

    /// Append/consume counters are not implemented on OpenGL
    pub fn set_uav_parameter_with_initial_count(
        &mut self,
        _index: u32,
        _view: Option<UnorderedAccessViewHandle>,
        _initial_count: u32,
    ) -> RhiResult<()> {
        not_implemented("set_uav_parameter_with_initial_count")
    }

    /// Check that a stage-bound setter targets a stage that exists
    fn validate_stage(&self, stage: ShaderStage) -> RhiResult<()> {
        if stage == ShaderStage::Compute {
            if !self.config.capabilities.supports_compute_shaders {
                return Err(RhiError::UnsupportedCapability("compute shaders"));
            }
            return Ok(());
        }

        let handle = self.pending.bound_shader_state.ok_or(RhiError::NoBoundShaderState)?;
        if self.registry.bound_shader_state(handle)?.stage(stage).is_none() {
            return Err(RhiError::ContractViolation(format!(
                "the bound shader state has no {stage:?} shader"
            )));
        }
        Ok(())
    }

    /// Texture unit of slot `index` of a stage
    fn texture_unit(&self, stage: ShaderStage, index: u32) -> RhiResult<usize> {
        let caps = &self.config.capabilities;
        if index >= caps.texture_units_for_stage(stage) {
            return Err(RhiError::ContractViolation(format!(
                "texture slot {index} exceeds the {} units of the {stage:?} stage",
                caps.texture_units_for_stage(stage)
            )));
        }
        let unit = (caps.first_texture_unit(stage) + index) as usize;
        if unit >= self.pending.textures.len() {
            return Err(RhiError::ContractViolation(format!("texture unit {unit} is out of range")));
        }
        Ok(unit)
    }
}

fn not_implemented(operation: &'static str) -> RhiResult<()> {
    log::error!("{} is not supported by the OpenGL RHI", operation);
    Err(RhiError::NotImplemented { operation })
}
