//! Texture unit, sampler fallback and image unit commit
//!
//! Units the current program does not sample are bound to nothing so the
//! driver does not keep textures alive that are also attached to the bound
//! framebuffer.
//!
//! # Sampler Fallback
//!
//! Without sampler objects, sampling parameters live in the texture object.
//! Each texture remembers the sampler last written into it, so parameters are
//! only rewritten when a texture is sampled through a different sampler.

use slotmap::SlotMap;

use crate::rhi::capabilities::GraphicsBackendCapabilities;
use crate::rhi::driver::GlDriver;
use crate::rhi::resources::{LinkedProgram, SamplerHandle, SamplerState, Texture, TextureHandle};
use crate::rhi::state::{CachedTextureStage, ContextState, NameGenerations, PendingState, TextureStage, TrackedName};
use crate::rhi::types::{Capability, GlName, ImageFormat, TextureParameter, TextureTarget, TextureWrap};
use crate::rhi::{RhiError, RhiResult, RhiWarning};

use super::set_enabled;

fn set_active_unit<D: GlDriver>(driver: &mut D, context: &mut ContextState, unit: u32) {
    if context.active_texture != Some(unit) {
        driver.active_texture(unit);
        context.active_texture = Some(unit);
    }
}

fn cached_stage(context: &mut ContextState, unit: u32) -> RhiResult<&mut CachedTextureStage> {
    context
        .textures
        .get_mut(unit as usize)
        .ok_or_else(|| RhiError::ContractViolation(format!("texture unit {unit} exceeds the texture unit table")))
}

/// Bind `resource` to `target` on `unit` unless the unit already holds it
///
/// `target` of `None` leaves the unit empty. Without texture views the mip
/// range is restricted through base and max level instead.
pub(crate) fn cached_setup_texture_stage<D: GlDriver>(
    driver: &mut D,
    caps: &GraphicsBackendCapabilities,
    context: &mut ContextState,
    textures: &NameGenerations,
    unit: u32,
    target: Option<TextureTarget>,
    resource: GlName,
    limit_mip: Option<u32>,
    num_mips: u32,
) -> RhiResult<()> {
    let tracked = if target.is_some() { textures.track(resource) } else { TrackedName::NONE };
    let cached = *cached_stage(context, unit)?;
    if cached.target == target && cached.resource == tracked {
        return Ok(());
    }

    set_active_unit(driver, context, unit);

    if cached.target == target {
        if let Some(target) = target {
            driver.bind_texture(target, resource);
        }
    } else {
        if let Some(previous) = cached.target {
            driver.bind_texture(previous, 0);
        }
        if let Some(target) = target {
            driver.bind_texture(target, resource);
        }
    }

    let stage = cached_stage(context, unit)?;
    match target {
        Some(target) if target != TextureTarget::TextureBuffer && !caps.supports_texture_view => {
            if caps.supports_texture_base_level {
                driver.tex_parameter(target, TextureParameter::BaseLevel(mip_level(limit_mip.unwrap_or(0))));
            }
            if caps.supports_texture_max_level {
                let max_mip = limit_mip.unwrap_or_else(|| num_mips.saturating_sub(1));
                driver.tex_parameter(target, TextureParameter::MaxLevel(mip_level(max_mip)));
            }
            stage.limit_mip = limit_mip;
            stage.num_mips = num_mips;
        }
        _ => {
            stage.limit_mip = None;
            stage.num_mips = 0;
        }
    }

    stage.target = target;
    stage.resource = tracked;
    // Parameters written through the previous object no longer apply
    stage.applied_sampler = None;
    Ok(())
}

fn mip_level(mip: u32) -> i32 {
    i32::try_from(mip).unwrap_or(i32::MAX)
}

/// Bind every texture unit the program samples and empty the rest
///
/// Units past the program's highest sampled unit are emptied up to
/// `max_units`. Sampler parameters are written into the textures when the
/// driver lacks sampler objects; non-power-of-two textures on restricted
/// drivers get their wrap modes clamped and a warning is pushed to `warnings`.
pub(crate) fn setup_textures_for_draw<D: GlDriver>(
    driver: &mut D,
    caps: &GraphicsBackendCapabilities,
    pending: &PendingState,
    context: &mut ContextState,
    generations: &NameGenerations,
    program: &LinkedProgram,
    max_units: u32,
    textures: &mut SlotMap<TextureHandle, Texture>,
    samplers: &mut SlotMap<SamplerHandle, SamplerState>,
    warnings: &mut Vec<RhiWarning>,
) -> RhiResult<()> {
    if caps.supports_seamless_cube_map && context.seamless_cubemap_enabled != pending.seamless_cubemap_enabled {
        set_enabled(driver, Capability::TextureCubeMapSeamless, pending.seamless_cubemap_enabled);
        context.seamless_cubemap_enabled = pending.seamless_cubemap_enabled;
    }

    let first_unused = program.max_texture_stage.map_or(0, |unit| unit + 1);
    for unit in 0..first_unused {
        if !program.needs_texture_stage(unit) {
            cached_setup_texture_stage(driver, caps, context, generations, unit, None, 0, None, 1)?;
            continue;
        }

        let stage = pending.textures.get(unit as usize).ok_or_else(|| {
            RhiError::ContractViolation(format!("program samples texture unit {unit} beyond the unit table"))
        })?;
        cached_setup_texture_stage(
            driver,
            caps,
            context,
            generations,
            unit,
            stage.target,
            stage.resource,
            stage.limit_mip,
            stage.num_mips,
        )?;

        if !caps.supports_sampler_objects {
            let sampler = pending.samplers.get(unit as usize).copied().flatten();
            apply_texture_stage(driver, caps, context, unit, stage, sampler, textures, samplers, warnings)?;
        }
    }

    for unit in first_unused..max_units {
        cached_setup_texture_stage(driver, caps, context, generations, unit, None, 0, None, 1)?;
    }
    Ok(())
}

/// Write a sampler's parameters into the texture bound on `unit`
fn apply_texture_stage<D: GlDriver>(
    driver: &mut D,
    caps: &GraphicsBackendCapabilities,
    context: &mut ContextState,
    unit: u32,
    stage: &TextureStage,
    sampler: Option<SamplerHandle>,
    textures: &mut SlotMap<TextureHandle, Texture>,
    samplers: &mut SlotMap<SamplerHandle, SamplerState>,
    warnings: &mut Vec<RhiWarning>,
) -> RhiResult<()> {
    let (Some(target), Some(sampler_handle)) = (stage.target, sampler) else {
        return Ok(());
    };

    let mut texture = match stage.texture {
        Some(handle) => Some(textures.get_mut(handle).ok_or(RhiError::StaleHandle { kind: "texture" })?),
        None => None,
    };
    let applied = match texture.as_deref() {
        Some(texture) => texture.applied_sampler,
        None => cached_stage(context, unit)?.applied_sampler,
    };
    if applied == Some(sampler_handle) {
        return Ok(());
    }

    set_active_unit(driver, context, unit);

    let sampler = samplers.get_mut(sampler_handle).ok_or(RhiError::StaleHandle { kind: "sampler" })?;
    if caps.has_sampler_restrictions {
        if let Some(texture) = texture.as_deref() {
            if !texture.is_power_of_two() && clamp_wrap_to_edge(sampler) {
                let label = driver.object_label(stage.resource).or_else(|| texture.desc.label.clone());
                log::warn!(
                    "Texture {} (unit {}, resource {}) has a non-clamp wrap mode; switching to clamp to edge",
                    label.as_deref().unwrap_or("<unlabeled>"),
                    unit,
                    stage.resource
                );
                warnings.push(RhiWarning::NonPowerOfTwoWrapClamped { unit, texture: stage.resource, label });
            }
        }
    }

    let data = sampler.data;
    driver.tex_parameter(target, TextureParameter::WrapS(data.wrap_s));
    driver.tex_parameter(target, TextureParameter::WrapT(data.wrap_t));
    if caps.supports_texture_3d {
        driver.tex_parameter(target, TextureParameter::WrapR(data.wrap_r));
    }
    if caps.supports_texture_lod_bias {
        driver.tex_parameter(target, TextureParameter::LodBias(data.lod_bias));
    }
    driver.tex_parameter(target, TextureParameter::MinFilter(data.min_filter.modified_by_mips(stage.has_mips)));
    driver.tex_parameter(target, TextureParameter::MagFilter(data.mag_filter));
    if caps.supports_texture_filter_anisotropic {
        driver.tex_parameter(target, TextureParameter::MaxAnisotropy(data.max_anisotropy));
    }
    if caps.supports_texture_compare {
        driver.tex_parameter(target, TextureParameter::CompareMode(data.compare_mode));
        driver.tex_parameter(target, TextureParameter::CompareFunc(data.compare_func));
    }

    match texture.as_deref_mut() {
        Some(texture) => texture.applied_sampler = Some(sampler_handle),
        None => cached_stage(context, unit)?.applied_sampler = Some(sampler_handle),
    }
    Ok(())
}

/// Force wrap S and T to clamp to edge, returning whether anything changed
fn clamp_wrap_to_edge(sampler: &mut SamplerState) -> bool {
    let mut changed = false;
    for wrap in [&mut sampler.data.wrap_s, &mut sampler.data.wrap_t] {
        if *wrap != TextureWrap::ClampToEdge {
            *wrap = TextureWrap::ClampToEdge;
            changed = true;
        }
    }
    changed
}

/// Bind every image unit the compute program accesses; the rest get `(R32F, 0)`
pub(crate) fn setup_uavs_for_draw<D: GlDriver>(
    driver: &mut D,
    pending: &PendingState,
    context: &mut ContextState,
    generations: &NameGenerations,
    program: &LinkedProgram,
    max_units: u32,
) -> RhiResult<()> {
    for unit in 0..max_units {
        let (format, resource) = if program.needs_uav_stage(unit) {
            let stage = pending.uavs.get(unit as usize).ok_or_else(|| {
                RhiError::ContractViolation(format!("program accesses image unit {unit} beyond the unit table"))
            })?;
            (stage.format, stage.resource)
        } else {
            (ImageFormat::R32F, 0)
        };

        let tracked = generations.track(resource);
        let cached = context.uavs.get_mut(unit as usize).ok_or_else(|| {
            RhiError::ContractViolation(format!("image unit {unit} exceeds the image unit table"))
        })?;
        if cached.format == format && cached.resource == tracked {
            continue;
        }
        driver.bind_image_texture(unit, resource, format);
        cached.format = format;
        cached.resource = tracked;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rhi::commit::test_support::CommitFixture;
    use crate::rhi::driver::GlCall;
    use crate::rhi::resources::{ProgramDesc, TextureDesc};
    use crate::rhi::state::SamplerData;

    fn setup(f: &mut CommitFixture, generations: &NameGenerations, unit: u32, target: TextureTarget, name: GlName) {
        cached_setup_texture_stage(&mut f.driver, &f.caps, &mut f.context, generations, unit, Some(target), name, None, 1)
            .expect("Should set up texture stage");
    }

    fn program_sampling(units: &[bool]) -> LinkedProgram {
        LinkedProgram::new(9, ProgramDesc { texture_stage_needs: units.to_vec(), ..ProgramDesc::default() })
    }

    #[test]
    fn test_unchanged_stage_is_skipped() {
        let mut f = CommitFixture::desktop();
        let generations = NameGenerations::new();
        setup(&mut f, &generations, 0, TextureTarget::Texture2D, 5);
        assert_eq!(
            f.driver.take_calls(),
            vec![GlCall::BindTexture { target: TextureTarget::Texture2D, name: 5 }]
        );

        setup(&mut f, &generations, 0, TextureTarget::Texture2D, 5);
        assert!(f.driver.calls().is_empty());
    }

    #[test]
    fn test_target_change_unbinds_previous_target() {
        let mut f = CommitFixture::desktop();
        let generations = NameGenerations::new();
        setup(&mut f, &generations, 2, TextureTarget::Texture2D, 5);
        f.driver.clear_calls();

        setup(&mut f, &generations, 2, TextureTarget::TextureCube, 6);
        assert_eq!(
            f.driver.take_calls(),
            vec![
                GlCall::BindTexture { target: TextureTarget::Texture2D, name: 0 },
                GlCall::BindTexture { target: TextureTarget::TextureCube, name: 6 },
            ]
        );
    }

    #[test]
    fn test_mip_range_without_texture_views() {
        let mut f = CommitFixture::new(GraphicsBackendCapabilities::es31());
        let generations = NameGenerations::new();
        cached_setup_texture_stage(
            &mut f.driver,
            &f.caps,
            &mut f.context,
            &generations,
            1,
            Some(TextureTarget::Texture2D),
            5,
            None,
            4,
        )
        .expect("Should set up texture stage");
        assert_eq!(
            f.driver.take_calls(),
            vec![
                GlCall::ActiveTexture(1),
                GlCall::BindTexture { target: TextureTarget::Texture2D, name: 5 },
                GlCall::TexParameter { target: TextureTarget::Texture2D, parameter: TextureParameter::BaseLevel(0) },
                GlCall::TexParameter { target: TextureTarget::Texture2D, parameter: TextureParameter::MaxLevel(3) },
            ]
        );
    }

    #[test]
    fn test_deleted_texture_name_is_rebound() {
        let mut f = CommitFixture::desktop();
        let mut generations = NameGenerations::new();
        setup(&mut f, &generations, 0, TextureTarget::Texture2D, 5);
        f.driver.clear_calls();

        generations.retire(5);
        setup(&mut f, &generations, 0, TextureTarget::Texture2D, 5);
        assert_eq!(
            f.driver.take_calls(),
            vec![GlCall::BindTexture { target: TextureTarget::Texture2D, name: 5 }]
        );
    }

    #[test]
    fn test_unused_units_are_emptied() {
        let mut f = CommitFixture::desktop();
        let generations = NameGenerations::new();
        setup(&mut f, &generations, 0, TextureTarget::Texture2D, 5);
        setup(&mut f, &generations, 3, TextureTarget::Texture2D, 7);
        f.driver.clear_calls();

        let mut textures = SlotMap::with_key();
        let mut samplers = SlotMap::with_key();
        let mut warnings = Vec::new();
        let program = program_sampling(&[false, true]);
        setup_textures_for_draw(
            &mut f.driver,
            &f.caps,
            &f.pending,
            &mut f.context,
            &generations,
            &program,
            f.caps.max_combined_texture_image_units(),
            &mut textures,
            &mut samplers,
            &mut warnings,
        )
        .expect("Should set up textures");

        let calls = f.driver.take_calls();
        assert!(calls.contains(&GlCall::ActiveTexture(0)));
        assert!(calls.contains(&GlCall::ActiveTexture(3)));
        assert_eq!(calls.iter().filter(|call| matches!(call, GlCall::BindTexture { name: 0, .. })).count(), 2);
        assert_eq!(f.context.textures[0].target, None);
        assert_eq!(f.context.textures[3].target, None);
    }

    #[test]
    fn test_npot_texture_wrap_clamped_once() {
        let mut f = CommitFixture::new(GraphicsBackendCapabilities::es2());
        let generations = NameGenerations::new();
        let mut textures = SlotMap::with_key();
        let mut samplers = SlotMap::with_key();
        let mut warnings = Vec::new();

        let texture = textures.insert(Texture {
            name: 4,
            desc: TextureDesc::texture_2d(3, 5, 1).with_label("Hud"),
            applied_sampler: None,
        });
        let sampler = samplers.insert(SamplerState { name: 0, data: SamplerData::trilinear_wrap() });
        f.pending.textures[0] = TextureStage {
            texture: Some(texture),
            target: Some(TextureTarget::Texture2D),
            resource: 4,
            limit_mip: None,
            num_mips: 1,
            has_mips: false,
        };
        f.pending.samplers[0] = Some(sampler);
        let program = program_sampling(&[true]);

        for _ in 0..2 {
            setup_textures_for_draw(
                &mut f.driver,
                &f.caps,
                &f.pending,
                &mut f.context,
                &generations,
                &program,
                f.caps.max_combined_texture_image_units(),
                &mut textures,
                &mut samplers,
                &mut warnings,
            )
            .expect("Should set up textures");
        }

        assert_eq!(
            warnings,
            vec![RhiWarning::NonPowerOfTwoWrapClamped { unit: 0, texture: 4, label: Some("Hud".to_string()) }]
        );
        assert_eq!(samplers[sampler].data.wrap_s, TextureWrap::ClampToEdge);
        let calls = f.driver.take_calls();
        assert!(calls.contains(&GlCall::TexParameter {
            target: TextureTarget::Texture2D,
            parameter: TextureParameter::WrapS(TextureWrap::ClampToEdge),
        }));
        assert!(calls.contains(&GlCall::TexParameter {
            target: TextureTarget::Texture2D,
            parameter: TextureParameter::MinFilter(crate::rhi::types::TextureFilter::Linear),
        }));
        assert_eq!(calls.iter().filter(|call| matches!(call, GlCall::TexParameter { .. })).count(), 4);
    }

    #[test]
    fn test_uav_units_bound_once() {
        let mut f = CommitFixture::desktop();
        let generations = NameGenerations::new();
        let program = LinkedProgram::new(
            9,
            ProgramDesc { uav_stage_needs: vec![false, true], ..ProgramDesc::default() },
        );
        f.pending.uavs[1] = crate::rhi::state::UavStage { format: ImageFormat::Rgba8, resource: 12 };

        for _ in 0..2 {
            setup_uavs_for_draw(&mut f.driver, &f.pending, &mut f.context, &generations, &program, 8)
                .expect("Should set up image units");
        }
        assert_eq!(
            f.driver.take_calls(),
            vec![GlCall::BindImageTexture { unit: 1, name: 12, format: ImageFormat::Rgba8 }]
        );
    }
}
