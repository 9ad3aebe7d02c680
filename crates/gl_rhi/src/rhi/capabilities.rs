//! Driver capability set
//!
//! Queried once per device (or loaded from a preset) and read by every commit
//! function to pick between a native path and its fallback. Platform quirks
//! that are not real GL capabilities live here too, as explicit switches.

use serde::{Serialize, Deserialize};

use super::types::{ShaderStage, MAX_SIMULTANEOUS_RENDER_TARGETS};

/// Feature level the driver exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FeatureLevel {
    /// OpenGL ES 2.0 class
    Es2,
    /// OpenGL ES 3.1 class
    Es31,
    /// Desktop GL 3.x class
    Sm4,
    /// Desktop GL 4.3+ class
    Sm5,
}

/// Render target switching heuristic for tile-based mobile drivers
///
/// Some drivers resolve and reload tiles whenever the depth target is
/// dropped while the color target stays the same. When enabled, a
/// `set_render_targets` call that only removes depth is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RenderTargetSwitchHeuristic {
    /// Always honor render target changes
    #[default]
    Disabled,
    /// Skip when the color target did not change
    SkipWhenColorUnchanged,
    /// Skip when the color target did not change or is the backbuffer
    SkipWhenColorUnchangedOrBackbuffer,
}

/// # Graphics Backend Capabilities
///
/// Everything the state layer needs to know about the driver. Each `supports_*`
/// flag gates a native path; when it is off the commit code takes the
/// documented fallback instead.
///
/// ## Design Notes
///
/// `flush_after_separate_blend_change` and `render_target_switch_heuristic`
/// are driver workarounds rather than GL features. They are provisional and
/// should be removed once the drivers they target are no longer supported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphicsBackendCapabilities {
    /// Feature level of the context
    pub feature_level: FeatureLevel,
    /// `glPolygonMode` is available
    pub supports_polygon_mode: bool,
    /// Separate color/alpha blend functions per draw buffer
    pub supports_separate_alpha_blend: bool,
    /// More than one color attachment can be drawn to
    pub supports_multiple_render_targets: bool,
    /// Tessellation stages and `GL_PATCHES`
    pub supports_tessellation: bool,
    /// Compute shaders, image units and memory barriers
    pub supports_compute_shaders: bool,
    /// Instanced draws and attribute divisors
    pub supports_instancing: bool,
    /// `glDrawRangeElements` with a buffer offset
    pub supports_draw_index_offset: bool,
    /// Streamed buffer uploads are cheap enough for immediate-mode draws
    pub supports_fast_buffer_data: bool,
    /// Sampler objects
    pub supports_sampler_objects: bool,
    /// Texture views
    pub supports_texture_view: bool,
    /// `GL_TEXTURE_BASE_LEVEL`
    pub supports_texture_base_level: bool,
    /// `GL_TEXTURE_MAX_LEVEL`
    pub supports_texture_max_level: bool,
    /// 3D textures and `GL_TEXTURE_WRAP_R`
    pub supports_texture_3d: bool,
    /// `GL_TEXTURE_LOD_BIAS`
    pub supports_texture_lod_bias: bool,
    /// Anisotropic filtering
    pub supports_texture_filter_anisotropic: bool,
    /// Depth comparison sampling
    pub supports_texture_compare: bool,
    /// `GL_TEXTURE_CUBE_MAP_SEAMLESS`
    pub supports_seamless_cube_map: bool,
    /// `glInvalidateFramebuffer` / discard
    pub supports_discard_framebuffer: bool,
    /// Non-power-of-two textures must clamp and may not mip (ES2)
    pub has_sampler_restrictions: bool,
    /// Uniform buffers are emulated through packed uniform arrays
    pub uses_emulated_uniform_buffers: bool,
    /// Flush after separate-alpha blend changes (macOS driver workaround)
    pub flush_after_separate_blend_change: bool,
    /// Tile-based render target switching heuristic
    pub render_target_switch_heuristic: RenderTargetSwitchHeuristic,
    /// Color attachments usable at once
    pub max_simultaneous_render_targets: u32,
    /// Generic vertex attributes
    pub max_vertex_attributes: u32,
    /// Pixel stage texture units
    pub max_texture_image_units: u32,
    /// Vertex stage texture units
    pub max_vertex_texture_image_units: u32,
    /// Geometry stage texture units
    pub max_geometry_texture_image_units: u32,
    /// Hull stage texture units
    pub max_hull_texture_image_units: u32,
    /// Domain stage texture units
    pub max_domain_texture_image_units: u32,
    /// Compute stage texture units
    pub max_compute_texture_image_units: u32,
    /// Compute image units
    pub max_compute_uav_units: u32,
    /// Uniform buffer binding slots per stage
    pub max_uniform_buffer_bindings: u32,
    /// Size in bytes of each packed uniform array
    pub packed_uniform_array_size: u32,
}

impl GraphicsBackendCapabilities {
    /// Desktop OpenGL 4.3+ with every optional feature
    pub fn desktop_gl4() -> Self {
        Self {
            feature_level: FeatureLevel::Sm5,
            supports_polygon_mode: true,
            supports_separate_alpha_blend: true,
            supports_multiple_render_targets: true,
            supports_tessellation: true,
            supports_compute_shaders: true,
            supports_instancing: true,
            supports_draw_index_offset: true,
            supports_fast_buffer_data: true,
            supports_sampler_objects: true,
            supports_texture_view: true,
            supports_texture_base_level: true,
            supports_texture_max_level: true,
            supports_texture_3d: true,
            supports_texture_lod_bias: true,
            supports_texture_filter_anisotropic: true,
            supports_texture_compare: true,
            supports_seamless_cube_map: true,
            supports_discard_framebuffer: true,
            has_sampler_restrictions: false,
            uses_emulated_uniform_buffers: false,
            flush_after_separate_blend_change: false,
            render_target_switch_heuristic: RenderTargetSwitchHeuristic::Disabled,
            max_simultaneous_render_targets: MAX_SIMULTANEOUS_RENDER_TARGETS as u32,
            max_vertex_attributes: 16,
            max_texture_image_units: 16,
            max_vertex_texture_image_units: 16,
            max_geometry_texture_image_units: 16,
            max_hull_texture_image_units: 16,
            max_domain_texture_image_units: 16,
            max_compute_texture_image_units: 16,
            max_compute_uav_units: 8,
            max_uniform_buffer_bindings: 12,
            packed_uniform_array_size: 4096,
        }
    }

    /// macOS OpenGL 4.1 core: no compute, tessellation or texture views; flush workaround
    pub fn mac_gl41() -> Self {
        Self {
            feature_level: FeatureLevel::Sm4,
            supports_tessellation: false,
            supports_compute_shaders: false,
            supports_texture_view: false,
            supports_discard_framebuffer: false,
            flush_after_separate_blend_change: true,
            max_compute_texture_image_units: 0,
            max_compute_uav_units: 0,
            ..Self::desktop_gl4()
        }
    }

    /// OpenGL ES 3.1 class mobile driver
    pub fn es31() -> Self {
        Self {
            feature_level: FeatureLevel::Es31,
            supports_polygon_mode: false,
            supports_tessellation: false,
            supports_texture_view: false,
            supports_texture_lod_bias: false,
            supports_seamless_cube_map: false,
            max_geometry_texture_image_units: 0,
            max_hull_texture_image_units: 0,
            max_domain_texture_image_units: 0,
            max_texture_image_units: 16,
            max_vertex_texture_image_units: 16,
            ..Self::desktop_gl4()
        }
    }

    /// OpenGL ES 2.0 class mobile driver
    pub fn es2() -> Self {
        Self {
            feature_level: FeatureLevel::Es2,
            supports_polygon_mode: false,
            supports_separate_alpha_blend: false,
            supports_multiple_render_targets: false,
            supports_tessellation: false,
            supports_compute_shaders: false,
            supports_instancing: false,
            supports_draw_index_offset: false,
            supports_fast_buffer_data: false,
            supports_sampler_objects: false,
            supports_texture_view: false,
            supports_texture_base_level: false,
            supports_texture_max_level: false,
            supports_texture_3d: false,
            supports_texture_lod_bias: false,
            supports_texture_filter_anisotropic: false,
            supports_texture_compare: false,
            supports_seamless_cube_map: false,
            supports_discard_framebuffer: true,
            has_sampler_restrictions: true,
            uses_emulated_uniform_buffers: true,
            flush_after_separate_blend_change: false,
            render_target_switch_heuristic: RenderTargetSwitchHeuristic::SkipWhenColorUnchangedOrBackbuffer,
            max_simultaneous_render_targets: 1,
            max_vertex_attributes: 8,
            max_texture_image_units: 8,
            max_vertex_texture_image_units: 0,
            max_geometry_texture_image_units: 0,
            max_hull_texture_image_units: 0,
            max_domain_texture_image_units: 0,
            max_compute_texture_image_units: 0,
            max_compute_uav_units: 0,
            max_uniform_buffer_bindings: 12,
            packed_uniform_array_size: 1024,
        }
    }

    /// Number of color targets the blend and clear paths iterate
    pub const fn active_render_target_slots(&self) -> usize {
        if self.supports_multiple_render_targets {
            self.max_simultaneous_render_targets as usize
        } else {
            1
        }
    }

    /// First texture unit owned by a stage
    ///
    /// Pixel units come first, followed by vertex, geometry, hull and domain.
    /// Compute programs never coexist with graphics programs and start at 0.
    pub const fn first_texture_unit(&self, stage: ShaderStage) -> u32 {
        let vertex = self.max_texture_image_units;
        let geometry = vertex + self.max_vertex_texture_image_units;
        let hull = geometry + self.max_geometry_texture_image_units;
        let domain = hull + self.max_hull_texture_image_units;
        match stage {
            ShaderStage::Pixel | ShaderStage::Compute => 0,
            ShaderStage::Vertex => vertex,
            ShaderStage::Geometry => geometry,
            ShaderStage::Hull => hull,
            ShaderStage::Domain => domain,
        }
    }

    /// Texture units available to a stage
    pub const fn texture_units_for_stage(&self, stage: ShaderStage) -> u32 {
        match stage {
            ShaderStage::Pixel => self.max_texture_image_units,
            ShaderStage::Vertex => self.max_vertex_texture_image_units,
            ShaderStage::Geometry => self.max_geometry_texture_image_units,
            ShaderStage::Hull => self.max_hull_texture_image_units,
            ShaderStage::Domain => self.max_domain_texture_image_units,
            ShaderStage::Compute => self.max_compute_texture_image_units,
        }
    }

    /// Texture units shared by all graphics stages
    pub const fn max_combined_texture_image_units(&self) -> u32 {
        self.max_texture_image_units
            + self.max_vertex_texture_image_units
            + self.max_geometry_texture_image_units
            + self.max_hull_texture_image_units
            + self.max_domain_texture_image_units
    }

    /// Size of the texture stage tables in pending and context state
    pub fn texture_stage_count(&self) -> usize {
        self.max_combined_texture_image_units()
            .max(self.max_compute_texture_image_units) as usize
    }

    /// Size of the flattened per-stage uniform buffer binding tables
    pub const fn uniform_buffer_binding_count(&self) -> usize {
        ShaderStage::COUNT * self.max_uniform_buffer_bindings as usize
    }

    /// Validate the capability set
    pub fn validate(&self) -> Result<(), String> {
        if self.max_simultaneous_render_targets == 0
            || self.max_simultaneous_render_targets as usize > MAX_SIMULTANEOUS_RENDER_TARGETS
        {
            return Err(format!(
                "max_simultaneous_render_targets must be within 1..={MAX_SIMULTANEOUS_RENDER_TARGETS}, got {}",
                self.max_simultaneous_render_targets
            ));
        }
        if self.max_vertex_attributes == 0 || self.max_vertex_attributes > 32 {
            return Err(format!(
                "max_vertex_attributes must be within 1..=32, got {}",
                self.max_vertex_attributes
            ));
        }
        if self.packed_uniform_array_size % 16 != 0 {
            return Err(format!(
                "packed_uniform_array_size must be a multiple of 16 bytes, got {}",
                self.packed_uniform_array_size
            ));
        }
        if self.supports_compute_shaders && self.feature_level < FeatureLevel::Es31 {
            return Err("Compute shaders require at least the ES 3.1 feature level".to_string());
        }
        if self.supports_tessellation && self.feature_level < FeatureLevel::Sm5 {
            return Err("Tessellation requires the SM5 feature level".to_string());
        }
        Ok(())
    }
}

impl Default for GraphicsBackendCapabilities {
    fn default() -> Self {
        Self::desktop_gl4()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        for caps in [
            GraphicsBackendCapabilities::desktop_gl4(),
            GraphicsBackendCapabilities::mac_gl41(),
            GraphicsBackendCapabilities::es31(),
            GraphicsBackendCapabilities::es2(),
        ] {
            caps.validate().expect("Preset should validate");
        }
    }

    #[test]
    fn test_texture_unit_layout() {
        let caps = GraphicsBackendCapabilities::desktop_gl4();
        assert_eq!(caps.first_texture_unit(ShaderStage::Pixel), 0);
        assert_eq!(caps.first_texture_unit(ShaderStage::Vertex), 16);
        assert_eq!(caps.first_texture_unit(ShaderStage::Geometry), 32);
        assert_eq!(caps.first_texture_unit(ShaderStage::Hull), 48);
        assert_eq!(caps.first_texture_unit(ShaderStage::Domain), 64);
        assert_eq!(caps.first_texture_unit(ShaderStage::Compute), 0);
        assert_eq!(caps.max_combined_texture_image_units(), 80);
    }

    #[test]
    fn test_single_target_without_mrt() {
        assert_eq!(GraphicsBackendCapabilities::es2().active_render_target_slots(), 1);
        assert_eq!(GraphicsBackendCapabilities::desktop_gl4().active_render_target_slots(), 8);
    }

    #[test]
    fn test_validate_rejects_compute_on_es2() {
        let caps = GraphicsBackendCapabilities {
            supports_compute_shaders: true,
            ..GraphicsBackendCapabilities::es2()
        };
        assert!(caps.validate().is_err());
    }
}
