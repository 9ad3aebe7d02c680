//! Render target binding and discards

use crate::rhi::capabilities::RenderTargetSwitchHeuristic;
use crate::rhi::driver::GlDriver;
use crate::rhi::resources::{AttachmentKey, FramebufferKey, ResourceRegistry};
use crate::rhi::state::RenderTargetView;
use crate::rhi::types::{FramebufferAttachment, GlName, MAX_SIMULTANEOUS_RENDER_TARGETS};
use crate::rhi::{RhiError, RhiResult};

use super::OpenGlRhi;

/// Framebuffer attachment description of a render target view
fn attachment_key(registry: &ResourceRegistry, view: RenderTargetView) -> RhiResult<AttachmentKey> {
    let texture = registry.texture(view.texture)?;
    Ok(AttachmentKey {
        texture: texture.name,
        target: texture.desc.target,
        mip_index: view.mip_index,
        array_slice: view.array_slice,
    })
}

impl<D: GlDriver> OpenGlRhi<D> {
    /// Bind color targets and an optional depth-stencil target
    ///
    /// Resolves (or creates) the framebuffer object for the combination and,
    /// when a color target is bound, resets the viewport to cover its mip.
    /// Binding nothing at all selects the default framebuffer and marks the
    /// setup invalid.
    ///
    /// ## Design Notes
    ///
    /// With a render target switch heuristic enabled, dropping the depth
    /// target while keeping the color target is ignored: tile-based drivers
    /// would otherwise store and reload the whole tile. The color slots are
    /// still updated in that case; depth and framebuffer are not.
    pub fn set_render_targets(
        &mut self,
        render_targets: &[Option<RenderTargetView>],
        depth_stencil: Option<RenderTargetView>,
    ) -> RhiResult<()> {
        if render_targets.len() > MAX_SIMULTANEOUS_RENDER_TARGETS {
            return Err(RhiError::ContractViolation(format!(
                "{} render targets exceed the limit of {}",
                render_targets.len(),
                MAX_SIMULTANEOUS_RENDER_TARGETS
            )));
        }

        let mut key = FramebufferKey::default();
        for (slot, view) in render_targets.iter().enumerate() {
            if let Some(view) = view {
                key.colors[slot] = Some(attachment_key(&self.registry, *view)?);
            }
        }
        if let Some(view) = depth_stencil {
            let has_stencil = self.registry.texture(view.texture)?.desc.has_stencil;
            key.depth_stencil = Some((attachment_key(&self.registry, view)?, has_stencil));
        }

        self.pending.render_targets = [None; MAX_SIMULTANEOUS_RENDER_TARGETS];
        self.pending.render_targets[..render_targets.len()].copy_from_slice(render_targets);
        self.pending.first_nonzero_render_target = render_targets.iter().position(Option::is_some);

        if self.skip_render_target_switch(&key) {
            log::trace!("Render target switch heuristic kept the depth target bound");
            return Ok(());
        }
        self.pending.depth_stencil = depth_stencil;

        if self.pending.first_nonzero_render_target.is_none() && depth_stencil.is_none() {
            self.pending.framebuffer = 0;
            self.pending.framebuffer_setup_invalid = true;
            return Ok(());
        }

        self.pending.framebuffer = match self.framebuffer_cache.get(&key) {
            Some(framebuffer) => framebuffer,
            None => {
                let Self { driver, framebuffer_cache, contexts, current_context, .. } = self;
                let framebuffer = framebuffer_cache.create(driver, key);
                // Creation leaves the new framebuffer bound
                contexts[current_context.index()].framebuffer = None;
                framebuffer
            }
        };
        self.pending.framebuffer_setup_invalid = false;

        if let Some(view) = self.pending.first_render_target() {
            let texture = self.registry.texture(view.texture)?;
            let width = texture.desc.width.checked_shr(view.mip_index).unwrap_or(0).max(1);
            let height = texture.desc.height.checked_shr(view.mip_index).unwrap_or(0).max(1);
            self.pending.viewport.min_x = 0;
            self.pending.viewport.min_y = 0;
            self.pending.viewport.max_x = width;
            self.pending.viewport.max_y = height;
            self.pending.render_target_width = width;
            self.pending.render_target_height = height;
        }
        Ok(())
    }

    /// Apply the render target switch heuristic, recording the new targets
    /// unless the switch is skipped
    fn skip_render_target_switch(&mut self, key: &FramebufferKey) -> bool {
        let heuristic = self.config.capabilities.render_target_switch_heuristic;
        if heuristic == RenderTargetSwitchHeuristic::Disabled {
            return false;
        }

        let new_color: GlName = key.colors[0].map_or(0, |color| color.texture);
        let new_depth = key.depth_stencil.map(|(depth, _)| depth.texture);
        let dropping_depth = new_depth.is_none() && self.pending.depth_stencil.is_some();

        let context = self.context_mut();
        if dropping_depth {
            let unchanged = context.last_es2_color_render_target == Some(new_color);
            let skip = match heuristic {
                RenderTargetSwitchHeuristic::SkipWhenColorUnchanged => unchanged,
                RenderTargetSwitchHeuristic::SkipWhenColorUnchangedOrBackbuffer => new_color == 0 || unchanged,
                RenderTargetSwitchHeuristic::Disabled => false,
            };
            if skip {
                return true;
            }
        }
        context.last_es2_color_render_target = Some(new_color);
        context.last_es2_depth_render_target = Some(new_depth.unwrap_or(0));
        false
    }

    /// Tell the driver the contents of attachments of the bound framebuffer
    /// are no longer needed
    ///
    /// Depth, then stencil, then the color attachments set in the low eight
    /// bits of `color_mask`. Ignored without framebuffer discard support.
    pub fn discard_render_targets(&mut self, depth: bool, stencil: bool, color_mask: u32) {
        if !self.config.capabilities.supports_discard_framebuffer {
            return;
        }

        let mut attachments = Vec::with_capacity(MAX_SIMULTANEOUS_RENDER_TARGETS + 2);
        if depth {
            attachments.push(FramebufferAttachment::Depth);
        }
        if stencil {
            attachments.push(FramebufferAttachment::Stencil);
        }
        for slot in 0..8_u8 {
            if color_mask & (1 << slot) != 0 {
                attachments.push(FramebufferAttachment::Color(slot));
            }
        }
        if !attachments.is_empty() {
            self.driver.invalidate_framebuffer(&attachments);
        }
    }
}
