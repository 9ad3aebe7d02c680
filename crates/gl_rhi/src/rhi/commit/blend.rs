//! Blend state commit
//!
//! Blend state is committed per render target slot. Drivers with separate
//! alpha blending take indexed calls per slot; the others only have the
//! global `glBlendFunc`/`glBlendEquation`, so every enabled target must agree
//! on one setup.
//!
//! The context caches each target's *resolved* setup: when a target does
//! not blend alpha separately its alpha factors and equation are the color
//! ones, which is what the driver ends up holding.

use crate::rhi::capabilities::GraphicsBackendCapabilities;
use crate::rhi::driver::GlDriver;
use crate::rhi::state::{ContextState, PendingState, RenderTargetBlendState};
use crate::rhi::types::Capability;
use crate::rhi::{RhiError, RhiResult};

use super::slot_index;

/// Setup a target actually blends with
const fn resolved(state: &RenderTargetBlendState) -> RenderTargetBlendState {
    if state.separate_alpha_blend_enable {
        return *state;
    }
    RenderTargetBlendState {
        alpha_blend_op: state.color_blend_op,
        alpha_source_blend_factor: state.color_source_blend_factor,
        alpha_dest_blend_factor: state.color_dest_blend_factor,
        ..*state
    }
}

fn same_factors(a: &RenderTargetBlendState, b: &RenderTargetBlendState) -> bool {
    a.color_source_blend_factor == b.color_source_blend_factor
        && a.color_dest_blend_factor == b.color_dest_blend_factor
        && a.alpha_source_blend_factor == b.alpha_source_blend_factor
        && a.alpha_dest_blend_factor == b.alpha_dest_blend_factor
}

fn same_equations(a: &RenderTargetBlendState, b: &RenderTargetBlendState) -> bool {
    a.color_blend_op == b.color_blend_op && a.alpha_blend_op == b.alpha_blend_op
}

/// Store a resolved setup in a cached target, keeping its enable and write mask
fn cache_setup(cached: &mut RenderTargetBlendState, setup: &RenderTargetBlendState) {
    *cached = RenderTargetBlendState {
        alpha_blend_enable: cached.alpha_blend_enable,
        color_write_mask: cached.color_write_mask,
        ..*setup
    };
}

/// # Blend Commit
///
/// Commit blend enables, functions, equations and write masks for the slots
/// holding a render target, then the constant blend color.
///
/// ## Design Notes
///
/// Slot 0 of the default framebuffer counts as occupied. Slots without a
/// target are skipped entirely, so a stale setup on an empty slot can never
/// conflict with the others.
///
/// # Errors
///
/// [`RhiError::IncompatibleBlendStates`] when separate blending is unsupported
/// and two enabled targets need different setups.
pub(crate) fn commit_blend<D: GlDriver>(
    driver: &mut D,
    caps: &GraphicsBackendCapabilities,
    pending: &PendingState,
    context: &mut ContextState,
) -> RhiResult<()> {
    let mut global_setup: Option<(usize, RenderTargetBlendState)> = None;

    for slot in 0..caps.active_render_target_slots() {
        let occupied = pending.render_targets[slot].is_some() || (slot == 0 && pending.framebuffer == 0);
        if !occupied {
            continue;
        }

        let state = pending.blend.render_targets[slot];
        let index = slot_index(slot);

        if context.blend.render_targets[slot].alpha_blend_enable != state.alpha_blend_enable {
            if state.alpha_blend_enable {
                driver.enable_indexed(Capability::Blend, index);
            } else {
                driver.disable_indexed(Capability::Blend, index);
            }
            context.blend.render_targets[slot].alpha_blend_enable = state.alpha_blend_enable;
        }

        if state.alpha_blend_enable {
            let setup = resolved(&state);
            if caps.supports_separate_alpha_blend {
                commit_indexed(driver, caps, index, &setup, &mut context.blend.render_targets[slot]);
            } else if let Some((first, reference)) = global_setup {
                if !same_factors(&reference, &setup) || !same_equations(&reference, &setup) {
                    return Err(RhiError::IncompatibleBlendStates { first, second: slot });
                }
            } else {
                commit_global(driver, &setup, &context.blend.render_targets[slot]);
                for cached in &mut context.blend.render_targets {
                    cache_setup(cached, &setup);
                }
                global_setup = Some((slot, setup));
            }
        }

        let cached = &mut context.blend.render_targets[slot];
        if cached.color_write_mask != state.color_write_mask {
            driver.color_mask_indexed(index, state.color_write_mask);
            cached.color_write_mask = state.color_write_mask;
        }
    }

    if context.blend_factor != pending.blend_factor {
        driver.blend_color(pending.blend_factor);
        context.blend_factor = pending.blend_factor;
    }
    Ok(())
}

fn commit_indexed<D: GlDriver>(
    driver: &mut D,
    caps: &GraphicsBackendCapabilities,
    index: u32,
    setup: &RenderTargetBlendState,
    cached: &mut RenderTargetBlendState,
) {
    let factors_changed = !same_factors(cached, setup);
    let equations_changed = !same_equations(cached, setup);

    if setup.separate_alpha_blend_enable {
        if factors_changed {
            driver.blend_func_separate_indexed(
                index,
                setup.color_source_blend_factor,
                setup.color_dest_blend_factor,
                setup.alpha_source_blend_factor,
                setup.alpha_dest_blend_factor,
            );
        }
        if equations_changed {
            driver.blend_equation_separate_indexed(index, setup.color_blend_op, setup.alpha_blend_op);
        }
        if caps.flush_after_separate_blend_change && (factors_changed || equations_changed) {
            driver.flush();
        }
    } else {
        if factors_changed {
            driver.blend_func_indexed(index, setup.color_source_blend_factor, setup.color_dest_blend_factor);
        }
        if equations_changed {
            driver.blend_equation_indexed(index, setup.color_blend_op);
        }
    }

    cache_setup(cached, setup);
}

fn commit_global<D: GlDriver>(driver: &mut D, setup: &RenderTargetBlendState, cached: &RenderTargetBlendState) {
    if setup.separate_alpha_blend_enable {
        if !same_factors(cached, setup) {
            driver.blend_func_separate(
                setup.color_source_blend_factor,
                setup.color_dest_blend_factor,
                setup.alpha_source_blend_factor,
                setup.alpha_dest_blend_factor,
            );
        }
        if !same_equations(cached, setup) {
            driver.blend_equation_separate(setup.color_blend_op, setup.alpha_blend_op);
        }
    } else {
        if !same_factors(cached, setup) {
            driver.blend_func(setup.color_source_blend_factor, setup.color_dest_blend_factor);
        }
        if !same_equations(cached, setup) {
            driver.blend_equation(setup.color_blend_op);
        }
    }
}
