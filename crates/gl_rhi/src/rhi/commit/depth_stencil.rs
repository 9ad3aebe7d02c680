//! Depth and stencil state commit

use crate::rhi::driver::GlDriver;
use crate::rhi::state::{ContextState, PendingState, StencilFaceCache, StencilFaceState};
use crate::rhi::types::{Capability, Face};

use super::set_enabled;

/// Commit depth test, depth writes, stencil test and stencil functions
///
/// Switching between one- and two-sided stencil forgets the cached stencil
/// functions, operations and read mask: some drivers track the one-sided and
/// separate entry points independently, so the full set is reissued.
pub(crate) fn commit_depth_stencil<D: GlDriver>(driver: &mut D, pending: &PendingState, context: &mut ContextState) {
    let state = &pending.depth_stencil_state;
    let cache = &mut context.depth_stencil;

    if cache.z_enable != state.z_enable {
        set_enabled(driver, Capability::DepthTest, state.z_enable);
        cache.z_enable = state.z_enable;
    }

    if cache.z_write_enable != state.z_write_enable {
        driver.depth_mask(state.z_write_enable);
        cache.z_write_enable = state.z_write_enable;
    }

    if state.z_enable && cache.z_func != Some(state.z_func) {
        driver.depth_func(state.z_func);
        cache.z_func = Some(state.z_func);
    }

    if cache.stencil_enable != state.stencil_enable {
        set_enabled(driver, Capability::StencilTest, state.stencil_enable);
        cache.stencil_enable = state.stencil_enable;
    }

    if cache.two_sided_stencil != state.two_sided_stencil {
        cache.stencil = StencilFaceCache::UNKNOWN;
        cache.ccw_stencil = StencilFaceCache::UNKNOWN;
        cache.stencil_read_mask = None;
        cache.two_sided_stencil = state.two_sided_stencil;
    }

    if !state.stencil_enable {
        return;
    }

    let reference = pending.stencil_ref;
    let read_mask = state.stencil_read_mask;
    let reference_changed = cache.stencil_ref != reference || cache.stencil_read_mask != Some(read_mask);

    if state.two_sided_stencil {
        commit_face(driver, &mut cache.stencil, &state.stencil, Some(Face::Back), reference_changed, reference, read_mask);
        commit_face(
            driver,
            &mut cache.ccw_stencil,
            &state.ccw_stencil,
            Some(Face::Front),
            reference_changed,
            reference,
            read_mask,
        );
        cache.stencil_read_mask = Some(read_mask);
        cache.stencil_ref = reference;
    } else {
        commit_face(driver, &mut cache.stencil, &state.stencil, None, reference_changed, reference, read_mask);
        if reference_changed {
            cache.stencil_read_mask = Some(read_mask);
            cache.stencil_ref = reference;
        }
    }

    if cache.stencil_write_mask != state.stencil_write_mask {
        driver.stencil_mask(state.stencil_write_mask);
        cache.stencil_write_mask = state.stencil_write_mask;
    }
}

/// Commit one face's function and operations; `face` is `None` in one-sided mode
fn commit_face<D: GlDriver>(
    driver: &mut D,
    cache: &mut StencilFaceCache,
    state: &StencilFaceState,
    face: Option<Face>,
    reference_changed: bool,
    reference: u32,
    read_mask: u32,
) {
    if cache.func != Some(state.func) || reference_changed {
        match face {
            Some(face) => driver.stencil_func_separate(face, state.func, reference, read_mask),
            None => driver.stencil_func(state.func, reference, read_mask),
        }
        cache.func = Some(state.func);
    }

    if !cache.ops_match(state) {
        match face {
            Some(face) => driver.stencil_op_separate(face, state.fail, state.z_fail, state.pass),
            None => driver.stencil_op(state.fail, state.z_fail, state.pass),
        }
        cache.fail = Some(state.fail);
        cache.z_fail = Some(state.z_fail);
        cache.pass = Some(state.pass);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rhi::commit::test_support::CommitFixture;
    use crate::rhi::driver::GlCall;
    use crate::rhi::types::{CompareFunction, StencilOp};

    #[test]
    fn test_depth_func_only_while_depth_test_enabled() {
        let mut f = CommitFixture::desktop();
        f.pending.depth_stencil_state.z_func = CompareFunction::GreaterEqual;
        commit_depth_stencil(&mut f.driver, &f.pending, &mut f.context);
        assert!(f.driver.calls().is_empty());

        f.pending.depth_stencil_state.z_enable = true;
        commit_depth_stencil(&mut f.driver, &f.pending, &mut f.context);
        assert_eq!(
            f.driver.take_calls(),
            vec![
                GlCall::Enable(Capability::DepthTest),
                GlCall::DepthFunc(CompareFunction::GreaterEqual),
            ]
        );

        commit_depth_stencil(&mut f.driver, &f.pending, &mut f.context);
        assert!(f.driver.calls().is_empty());
    }

    #[test]
    fn test_one_sided_stencil_committed_once() {
        let mut f = CommitFixture::desktop();
        let state = &mut f.pending.depth_stencil_state;
        state.stencil_enable = true;
        state.stencil.func = CompareFunction::Equal;
        state.stencil.pass = StencilOp::Replace;
        state.stencil_write_mask = 0x0F;
        f.pending.stencil_ref = 3;

        commit_depth_stencil(&mut f.driver, &f.pending, &mut f.context);
        assert_eq!(
            f.driver.take_calls(),
            vec![
                GlCall::Enable(Capability::StencilTest),
                GlCall::StencilFunc { func: CompareFunction::Equal, reference: 3, mask: u32::MAX },
                GlCall::StencilOp { fail: StencilOp::Keep, z_fail: StencilOp::Keep, pass: StencilOp::Replace },
                GlCall::StencilMask(0x0F),
            ]
        );

        commit_depth_stencil(&mut f.driver, &f.pending, &mut f.context);
        assert!(f.driver.calls().is_empty());
    }

    #[test]
    fn test_reference_change_reissues_function_only() {
        let mut f = CommitFixture::desktop();
        f.pending.depth_stencil_state.stencil_enable = true;
        commit_depth_stencil(&mut f.driver, &f.pending, &mut f.context);
        f.driver.clear_calls();

        f.pending.stencil_ref = 9;
        commit_depth_stencil(&mut f.driver, &f.pending, &mut f.context);
        assert_eq!(
            f.driver.take_calls(),
            vec![GlCall::StencilFunc { func: CompareFunction::Always, reference: 9, mask: u32::MAX }]
        );
    }

    #[test]
    fn test_two_sided_toggle_reissues_every_stencil_field() {
        let mut f = CommitFixture::desktop();
        f.pending.depth_stencil_state.stencil_enable = true;
        commit_depth_stencil(&mut f.driver, &f.pending, &mut f.context);
        f.driver.clear_calls();

        // Same functions and operations, only the mode flips
        f.pending.depth_stencil_state.two_sided_stencil = true;
        commit_depth_stencil(&mut f.driver, &f.pending, &mut f.context);
        let calls = f.driver.take_calls();
        for face in [Face::Back, Face::Front] {
            assert!(calls.contains(&GlCall::StencilFuncSeparate {
                face,
                func: CompareFunction::Always,
                reference: 0,
                mask: u32::MAX,
            }));
            assert!(calls.contains(&GlCall::StencilOpSeparate {
                face,
                fail: StencilOp::Keep,
                z_fail: StencilOp::Keep,
                pass: StencilOp::Keep,
            }));
        }
        assert_eq!(calls.len(), 4);

        commit_depth_stencil(&mut f.driver, &f.pending, &mut f.context);
        assert!(f.driver.calls().is_empty());

        f.pending.depth_stencil_state.two_sided_stencil = false;
        commit_depth_stencil(&mut f.driver, &f.pending, &mut f.context);
        assert_eq!(
            f.driver.take_calls(),
            vec![
                GlCall::StencilFunc { func: CompareFunction::Always, reference: 0, mask: u32::MAX },
                GlCall::StencilOp { fail: StencilOp::Keep, z_fail: StencilOp::Keep, pass: StencilOp::Keep },
            ]
        );
    }
}
