//! Render target clears
//!
//! A clear with an exclude rectangle becomes up to four scissored clears
//! around it:
//!
//! ```text
//! ┌──────┬───────────┬──────┐
//! │      │     3     │      │
//! │      ├───────────┤      │
//! │  1   │ (exclude) │  2   │
//! │      ├───────────┤      │
//! │      │     4     │      │
//! └──────┴───────────┴──────┘
//! ```

use crate::rhi::capabilities::{FeatureLevel, GraphicsBackendCapabilities};
use crate::rhi::commit::framebuffer::commit_framebuffer;
use crate::rhi::commit::viewport::commit_scissor;
use crate::rhi::driver::GlDriver;
use crate::rhi::state::ContextState;
use crate::rhi::types::{ClearFlags, ColorWriteMask, IntRect, LinearColor};
use crate::rhi::{RhiError, RhiResult};

use super::OpenGlRhi;

/// What one clear pass writes
#[derive(Debug, Clone, Copy)]
struct ClearValues<'a> {
    colors: Option<&'a [LinearColor]>,
    depth: Option<f32>,
    stencil: Option<u32>,
}

impl<D: GlDriver> OpenGlRhi<D> {
    /// Clear the first color target, depth and stencil
    ///
    /// `None` leaves that buffer untouched. Pixels inside `exclude` are kept
    /// when it has area.
    pub fn clear(
        &mut self,
        color: Option<LinearColor>,
        depth: Option<f32>,
        stencil: Option<u32>,
        exclude: IntRect,
    ) -> RhiResult<()> {
        let colors = color.map(|color| [color]);
        self.clear_mrt(colors.as_ref().map(|colors| colors.as_slice()), depth, stencil, exclude)
    }

    /// Clear several color targets, depth and stencil
    ///
    /// `colors` must cover every consecutively bound color target. Depth and
    /// stencil are only cleared while a depth-stencil target is bound.
    pub fn clear_mrt(
        &mut self,
        colors: Option<&[LinearColor]>,
        depth: Option<f32>,
        stencil: Option<u32>,
        exclude: IntRect,
    ) -> RhiResult<()> {
        let caps = &self.config.capabilities;
        if caps.feature_level < FeatureLevel::Sm5 && self.pending.framebuffer_setup_invalid {
            return Err(RhiError::ContractViolation(
                "clear without a color or depth target bound".to_string(),
            ));
        }
        if let Some(colors) = colors {
            let active = self.pending.bound_render_target_count();
            if colors.len() < active {
                return Err(RhiError::ContractViolation(format!(
                    "{} clear colors for {} bound render targets",
                    colors.len(),
                    active
                )));
            }
        }

        let viewport = self.pending.viewport;
        let mut around_exclude = exclude.has_area();
        if around_exclude {
            if exclude.is_disjoint_from(&viewport) {
                around_exclude = false;
            } else if exclude.contains_rect(&viewport) {
                return Ok(());
            }
        }

        let has_depth_stencil = self.pending.depth_stencil.is_some();
        let values = ClearValues {
            colors,
            depth: depth.filter(|_| has_depth_stencil),
            stencil: stencil.filter(|_| has_depth_stencil),
        };

        let previous_scissor = (self.pending.scissor_enabled, self.pending.scissor);
        let mut scissor_changed = false;

        self.profiler.register_gpu_work(0, 0);
        let Self { driver, config, pending, contexts, current_context, .. } = self;
        let caps = &config.capabilities;
        let context = &mut contexts[current_context.index()];
        commit_framebuffer(driver, caps, pending, context);

        if !around_exclude {
            if pending.scissor_enabled {
                scissor_changed = true;
            } else if viewport != IntRect::new(0, 0, pending.render_target_width, pending.render_target_height) {
                pending.scissor_enabled = true;
                pending.scissor = viewport;
                scissor_changed = true;
            }
            commit_scissor(driver, pending, context);
        }

        force_write_masks(driver, context, &values);

        if around_exclude {
            let exclude = exclude.clamped_to(&viewport);
            let passes = [
                (exclude.min_x > viewport.min_x)
                    .then(|| IntRect::new(viewport.min_x, viewport.min_y, exclude.min_x, viewport.max_y)),
                (exclude.max_x < viewport.max_x)
                    .then(|| IntRect::new(exclude.max_x, viewport.min_y, viewport.max_x, viewport.max_y)),
                (exclude.max_y < viewport.max_y)
                    .then(|| IntRect::new(exclude.min_x, exclude.max_y, exclude.max_x, viewport.max_y)),
                (viewport.min_y < exclude.min_y)
                    .then(|| IntRect::new(exclude.min_x, viewport.min_y, exclude.max_x, exclude.min_y)),
            ];
            for rect in passes.into_iter().flatten() {
                pending.scissor_enabled = true;
                pending.scissor = rect;
                commit_scissor(driver, pending, context);
                scissor_changed = true;
                clear_with_current_scissor(driver, caps, context, &values);
            }
        } else {
            clear_with_current_scissor(driver, caps, context, &values);
        }

        if scissor_changed {
            (pending.scissor_enabled, pending.scissor) = previous_scissor;
        }
        Ok(())
    }
}

/// Open the write masks of every buffer the clear touches
fn force_write_masks<D: GlDriver>(driver: &mut D, context: &mut ContextState, values: &ClearValues<'_>) {
    if let Some(colors) = values.colors {
        for (slot, cached) in context.blend.render_targets.iter_mut().take(colors.len()).enumerate() {
            if cached.color_write_mask != ColorWriteMask::ALL {
                driver.color_mask_indexed(u32::try_from(slot).unwrap_or(u32::MAX), ColorWriteMask::ALL);
                cached.color_write_mask = ColorWriteMask::ALL;
            }
        }
    }
    if values.depth.is_some() && !context.depth_stencil.z_write_enable {
        driver.depth_mask(true);
        context.depth_stencil.z_write_enable = true;
    }
    if values.stencil.is_some() && context.depth_stencil.stencil_write_mask != u32::MAX {
        driver.stencil_mask(u32::MAX);
        context.depth_stencil.stencil_write_mask = u32::MAX;
    }
}

/// Issue one clear within whatever scissor is committed
#[allow(clippy::float_cmp)]
fn clear_with_current_scissor<D: GlDriver>(
    driver: &mut D,
    caps: &GraphicsBackendCapabilities,
    context: &mut ContextState,
    values: &ClearValues<'_>,
) {
    if caps.supports_multiple_render_targets {
        for (draw_buffer, color) in values.colors.unwrap_or_default().iter().enumerate() {
            driver.clear_buffer_color(u32::try_from(draw_buffer).unwrap_or(u32::MAX), *color);
        }
        match (values.depth, values.stencil) {
            (Some(depth), Some(stencil)) => driver.clear_buffer_depth_stencil(depth, stencil),
            (Some(depth), None) => driver.clear_buffer_depth(depth),
            (None, Some(stencil)) => driver.clear_buffer_stencil(stencil),
            (None, None) => {}
        }
        return;
    }

    let mut flags = ClearFlags::empty();
    if let Some(&color) = values.colors.and_then(<[LinearColor]>::first) {
        if context.clear_color != color {
            driver.clear_color(color);
            context.clear_color = color;
        }
        flags |= ClearFlags::COLOR;
    }
    if let Some(depth) = values.depth {
        if context.clear_depth != depth {
            driver.clear_depth(depth);
            context.clear_depth = depth;
        }
        flags |= ClearFlags::DEPTH;
    }
    if let Some(stencil) = values.stencil {
        if context.clear_stencil != stencil {
            driver.clear_stencil(stencil);
            context.clear_stencil = stencil;
        }
        flags |= ClearFlags::STENCIL;
    }
    if !flags.is_empty() {
        driver.clear(flags);
    }
}
