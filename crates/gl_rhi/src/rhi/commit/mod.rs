//! Diff-and-commit functions
//!
//! One module per state category. Each function compares the pending state
//! against the current [`ContextState`](crate::rhi::state::ContextState),
//! issues the driver calls for the difference and updates the context to
//! match. A second call with nothing changed in between issues nothing.
//!
//! These functions are crate-private on purpose: only the device's draw,
//! dispatch and clear entry points call them, and always in this order:
//!
//! ```text
//! framebuffer ─► blend ─► viewport ─► scissor ─► rasterizer ─► depth-stencil
//!     ─► program + uniform buffer bases ─► textures / UAVs ─► constants
//!     ─► element array ─► vertex arrays ─► draw
//! ```

pub(crate) mod blend;
pub(crate) mod depth_stencil;
pub(crate) mod framebuffer;
pub(crate) mod rasterizer;
pub(crate) mod shader;
pub(crate) mod textures;
pub(crate) mod vertex_arrays;
pub(crate) mod viewport;

use crate::rhi::driver::GlDriver;
use crate::rhi::types::Capability;

/// Enable or disable a capability
fn set_enabled<D: GlDriver>(driver: &mut D, capability: Capability, enabled: bool) {
    if enabled {
        driver.enable(capability);
    } else {
        driver.disable(capability);
    }
}

/// Table slot as the `u32` index GL takes
fn slot_index(slot: usize) -> u32 {
    u32::try_from(slot).unwrap_or(u32::MAX)
}

/// Render target slot as a color attachment number
fn attachment_index(slot: usize) -> u8 {
    u8::try_from(slot).unwrap_or(u8::MAX)
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::rhi::capabilities::GraphicsBackendCapabilities;
    use crate::rhi::driver::RecordingDriver;
    use crate::rhi::state::{ContextState, PendingState};

    /// Fresh driver, pending and context state for one capability set
    pub(crate) struct CommitFixture {
        pub(crate) caps: GraphicsBackendCapabilities,
        pub(crate) driver: RecordingDriver,
        pub(crate) pending: PendingState,
        pub(crate) context: ContextState,
    }

    impl CommitFixture {
        pub(crate) fn new(caps: GraphicsBackendCapabilities) -> Self {
            Self {
                driver: RecordingDriver::new(),
                pending: PendingState::new(&caps),
                context: ContextState::new(&caps),
                caps,
            }
        }

        pub(crate) fn desktop() -> Self {
            Self::new(GraphicsBackendCapabilities::desktop_gl4())
        }
    }
}
