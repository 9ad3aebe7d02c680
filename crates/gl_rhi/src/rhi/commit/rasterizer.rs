//! Rasterizer state commit

use crate::rhi::capabilities::GraphicsBackendCapabilities;
use crate::rhi::driver::GlDriver;
use crate::rhi::state::{ContextState, PendingState};
use crate::rhi::types::{Capability, Face};

use super::set_enabled;

/// Scale from normalized depth bias to GL units, assuming a 24-bit depth buffer
#[allow(clippy::cast_precision_loss)]
const DEPTH_BIAS_SCALE: f32 = ((1 << 24) - 1) as f32;

const POLYGON_OFFSET_MODES: [Capability; 2] = [Capability::PolygonOffsetLine, Capability::PolygonOffsetPoint];

/// Commit fill mode, culling and depth bias
#[allow(clippy::float_cmp)]
pub(crate) fn commit_rasterizer<D: GlDriver>(
    driver: &mut D,
    caps: &GraphicsBackendCapabilities,
    pending: &PendingState,
    context: &mut ContextState,
) {
    let state = &pending.rasterizer;
    let cached = &mut context.rasterizer;

    if caps.supports_polygon_mode && cached.fill_mode != state.fill_mode {
        driver.polygon_mode(Face::FrontAndBack, state.fill_mode);
        cached.fill_mode = state.fill_mode;
    }

    if cached.cull_mode != state.cull_mode {
        match state.cull_mode.face() {
            Some(face) => {
                if cached.cull_mode.face().is_none() {
                    driver.enable(Capability::CullFace);
                }
                driver.cull_face(face);
            }
            None => driver.disable(Capability::CullFace),
        }
        cached.cull_mode = state.cull_mode;
    }

    if cached.depth_bias != state.depth_bias || cached.slope_scale_depth_bias != state.slope_scale_depth_bias {
        let depth_bias = state.depth_bias * DEPTH_BIAS_SCALE;
        if depth_bias == 0.0 && state.slope_scale_depth_bias == 0.0 {
            set_polygon_offset(driver, caps, false);
        } else {
            if cached.depth_bias == 0.0 && cached.slope_scale_depth_bias == 0.0 {
                set_polygon_offset(driver, caps, true);
            }
            driver.polygon_offset(state.slope_scale_depth_bias, depth_bias);
        }
        cached.depth_bias = state.depth_bias;
        cached.slope_scale_depth_bias = state.slope_scale_depth_bias;
    }
}

fn set_polygon_offset<D: GlDriver>(driver: &mut D, caps: &GraphicsBackendCapabilities, enabled: bool) {
    set_enabled(driver, Capability::PolygonOffsetFill, enabled);
    if caps.supports_polygon_mode {
        for capability in POLYGON_OFFSET_MODES {
            set_enabled(driver, capability, enabled);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rhi::capabilities::GraphicsBackendCapabilities;
    use crate::rhi::commit::test_support::CommitFixture;
    use crate::rhi::driver::GlCall;
    use crate::rhi::types::{CullMode, FillMode};

    #[test]
    fn test_cull_enable_only_when_leaving_none() {
        let mut f = CommitFixture::desktop();
        f.pending.rasterizer.cull_mode = CullMode::Back;
        commit_rasterizer(&mut f.driver, &f.caps, &f.pending, &mut f.context);
        assert_eq!(
            f.driver.take_calls(),
            vec![GlCall::Enable(Capability::CullFace), GlCall::CullFace(Face::Back)]
        );

        f.pending.rasterizer.cull_mode = CullMode::Front;
        commit_rasterizer(&mut f.driver, &f.caps, &f.pending, &mut f.context);
        assert_eq!(f.driver.take_calls(), vec![GlCall::CullFace(Face::Front)]);

        f.pending.rasterizer.cull_mode = CullMode::None;
        commit_rasterizer(&mut f.driver, &f.caps, &f.pending, &mut f.context);
        assert_eq!(f.driver.take_calls(), vec![GlCall::Disable(Capability::CullFace)]);
    }

    #[test]
    fn test_depth_bias_toggles_polygon_offset() {
        let mut f = CommitFixture::desktop();
        f.pending.rasterizer.slope_scale_depth_bias = 2.0;
        commit_rasterizer(&mut f.driver, &f.caps, &f.pending, &mut f.context);
        assert_eq!(
            f.driver.take_calls(),
            vec![
                GlCall::Enable(Capability::PolygonOffsetFill),
                GlCall::Enable(Capability::PolygonOffsetLine),
                GlCall::Enable(Capability::PolygonOffsetPoint),
                GlCall::PolygonOffset { factor: 2.0, units: 0.0 },
            ]
        );

        commit_rasterizer(&mut f.driver, &f.caps, &f.pending, &mut f.context);
        assert!(f.driver.calls().is_empty());

        f.pending.rasterizer.slope_scale_depth_bias = 0.0;
        commit_rasterizer(&mut f.driver, &f.caps, &f.pending, &mut f.context);
        assert_eq!(f.driver.count(|call| matches!(call, GlCall::Disable(_))), 3);
    }

    #[test]
    fn test_depth_bias_scaled_to_24_bits() {
        let mut f = CommitFixture::desktop();
        f.pending.rasterizer.depth_bias = 1.0;
        commit_rasterizer(&mut f.driver, &f.caps, &f.pending, &mut f.context);
        let units = f.driver.calls().iter().find_map(|call| match call {
            GlCall::PolygonOffset { units, .. } => Some(*units),
            _ => None,
        });
        approx::assert_relative_eq!(units.expect("Should set polygon offset"), 16_777_215.0);
    }

    #[test]
    fn test_fill_mode_needs_polygon_mode_support() {
        let mut f = CommitFixture::new(GraphicsBackendCapabilities::es31());
        f.pending.rasterizer.fill_mode = FillMode::Wireframe;
        commit_rasterizer(&mut f.driver, &f.caps, &f.pending, &mut f.context);
        assert!(f.driver.calls().is_empty());

        let mut f = CommitFixture::desktop();
        f.pending.rasterizer.fill_mode = FillMode::Wireframe;
        commit_rasterizer(&mut f.driver, &f.caps, &f.pending, &mut f.context);
        assert_eq!(f.driver.take_calls(), vec![GlCall::PolygonMode(Face::FrontAndBack, FillMode::Wireframe)]);
    }
}
