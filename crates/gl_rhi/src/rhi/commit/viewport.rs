//! Viewport, depth range and scissor commit

use crate::rhi::driver::GlDriver;
use crate::rhi::state::{ContextState, PendingState};
use crate::rhi::types::Capability;

use super::set_enabled;

/// Commit the viewport rectangle and depth range
#[allow(clippy::float_cmp)]
pub(crate) fn commit_viewport<D: GlDriver>(driver: &mut D, pending: &PendingState, context: &mut ContextState) {
    if context.viewport != pending.viewport {
        let viewport = pending.viewport;
        driver.viewport(viewport.min_x, viewport.min_y, viewport.width(), viewport.height());
        context.viewport = viewport;
    }

    if context.depth_min_z != pending.depth_min_z || context.depth_max_z != pending.depth_max_z {
        driver.depth_range(pending.depth_min_z, pending.depth_max_z);
        context.depth_min_z = pending.depth_min_z;
        context.depth_max_z = pending.depth_max_z;
    }
}

/// Commit the scissor test enable and, while enabled, its rectangle
pub(crate) fn commit_scissor<D: GlDriver>(driver: &mut D, pending: &PendingState, context: &mut ContextState) {
    if context.scissor_enabled != pending.scissor_enabled {
        set_enabled(driver, Capability::ScissorTest, pending.scissor_enabled);
        context.scissor_enabled = pending.scissor_enabled;
    }

    if pending.scissor_enabled && context.scissor != pending.scissor {
        let scissor = pending.scissor;
        driver.scissor(scissor.min_x, scissor.min_y, scissor.width(), scissor.height());
        context.scissor = scissor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rhi::commit::test_support::CommitFixture;
    use crate::rhi::driver::GlCall;
    use crate::rhi::types::IntRect;

    #[test]
    fn test_viewport_committed_once() {
        let mut f = CommitFixture::desktop();
        f.pending.viewport = IntRect::new(10, 20, 110, 220);
        f.pending.depth_max_z = 0.5;

        commit_viewport(&mut f.driver, &f.pending, &mut f.context);
        assert_eq!(
            f.driver.take_calls(),
            vec![
                GlCall::Viewport { x: 10, y: 20, width: 100, height: 200 },
                GlCall::DepthRange { near: 0.0, far: 0.5 },
            ]
        );

        commit_viewport(&mut f.driver, &f.pending, &mut f.context);
        assert!(f.driver.calls().is_empty());
    }

    #[test]
    fn test_scissor_rect_ignored_while_disabled() {
        let mut f = CommitFixture::desktop();
        f.pending.scissor = IntRect::new(0, 0, 8, 8);
        commit_scissor(&mut f.driver, &f.pending, &mut f.context);
        assert!(f.driver.calls().is_empty());

        f.pending.scissor_enabled = true;
        commit_scissor(&mut f.driver, &f.pending, &mut f.context);
        assert_eq!(
            f.driver.take_calls(),
            vec![
                GlCall::Enable(Capability::ScissorTest),
                GlCall::Scissor { x: 0, y: 0, width: 8, height: 8 },
            ]
        );

        commit_scissor(&mut f.driver, &f.pending, &mut f.context);
        assert!(f.driver.calls().is_empty());
    }
}
