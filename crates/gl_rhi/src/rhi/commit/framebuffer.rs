//! Framebuffer binding commit

use crate::rhi::capabilities::GraphicsBackendCapabilities;
use crate::rhi::driver::GlDriver;
use crate::rhi::state::{ContextState, PendingState};
use crate::rhi::types::DrawBuffer;

use super::attachment_index;

/// Bind the pending framebuffer and route its draw and read buffers
///
/// Draw and read buffers are part of the framebuffer object, so they are only
/// reissued when the binding changes.
pub(crate) fn commit_framebuffer<D: GlDriver>(
    driver: &mut D,
    caps: &GraphicsBackendCapabilities,
    pending: &PendingState,
    context: &mut ContextState,
) {
    if context.framebuffer == Some(pending.framebuffer) {
        return;
    }
    driver.bind_framebuffer(pending.framebuffer);
    context.framebuffer = Some(pending.framebuffer);

    if !caps.supports_multiple_render_targets {
        return;
    }

    if pending.framebuffer == 0 {
        driver.read_buffer(DrawBuffer::Back);
        driver.draw_buffers(&[DrawBuffer::Back]);
        return;
    }

    let read_buffer = pending
        .first_nonzero_render_target
        .map_or(DrawBuffer::None, |slot| DrawBuffer::ColorAttachment(attachment_index(slot)));
    driver.read_buffer(read_buffer);

    let mut draw_buffers: Vec<DrawBuffer> = pending
        .render_targets
        .iter()
        .take(caps.active_render_target_slots())
        .enumerate()
        .map(|(slot, target)| match target {
            Some(_) => DrawBuffer::ColorAttachment(attachment_index(slot)),
            None => DrawBuffer::None,
        })
        .collect();
    while draw_buffers.len() > 1 && draw_buffers.last() == Some(&DrawBuffer::None) {
        draw_buffers.pop();
    }
    driver.draw_buffers(&draw_buffers);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rhi::capabilities::GraphicsBackendCapabilities;
    use crate::rhi::commit::test_support::CommitFixture;
    use crate::rhi::driver::GlCall;
    use crate::rhi::resources::TextureHandle;
    use crate::rhi::state::RenderTargetView;
    use slotmap::SlotMap;

    #[test]
    fn test_framebuffer_routes_draw_buffers_once() {
        let mut textures: SlotMap<TextureHandle, ()> = SlotMap::with_key();
        let mut f = CommitFixture::desktop();
        f.pending.framebuffer = 4;
        f.pending.render_targets[1] = Some(RenderTargetView::new(textures.insert(())));
        f.pending.first_nonzero_render_target = Some(1);

        commit_framebuffer(&mut f.driver, &f.caps, &f.pending, &mut f.context);
        assert_eq!(
            f.driver.take_calls(),
            vec![
                GlCall::BindFramebuffer(4),
                GlCall::ReadBuffer(DrawBuffer::ColorAttachment(1)),
                GlCall::DrawBuffers(vec![DrawBuffer::None, DrawBuffer::ColorAttachment(1)]),
            ]
        );

        commit_framebuffer(&mut f.driver, &f.caps, &f.pending, &mut f.context);
        assert!(f.driver.calls().is_empty());
    }

    #[test]
    fn test_default_framebuffer_uses_back_buffer() {
        let mut f = CommitFixture::desktop();
        f.context.framebuffer = None;
        commit_framebuffer(&mut f.driver, &f.caps, &f.pending, &mut f.context);
        assert_eq!(
            f.driver.take_calls(),
            vec![
                GlCall::BindFramebuffer(0),
                GlCall::ReadBuffer(DrawBuffer::Back),
                GlCall::DrawBuffers(vec![DrawBuffer::Back]),
            ]
        );
    }

    #[test]
    fn test_single_target_drivers_only_bind() {
        let mut f = CommitFixture::new(GraphicsBackendCapabilities::es2());
        f.pending.framebuffer = 2;
        commit_framebuffer(&mut f.driver, &f.caps, &f.pending, &mut f.context);
        assert_eq!(f.driver.take_calls(), vec![GlCall::BindFramebuffer(2)]);
    }
}
