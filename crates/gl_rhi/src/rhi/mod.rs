//! OpenGL RHI state cache and draw submission
//!
//! Translates an API-agnostic command stream (set texture, set blend state,
//! draw, dispatch, clear) into [`driver::GlDriver`] calls while keeping the
//! number of redundant driver calls to a minimum.
//!
//! ## Architecture
//!
//! ```text
//! set_*() ──► PendingState ──► commit::* (diff) ──► GlDriver
//!                                   │
//!                                   └──► ContextState (mirror of the driver)
//! ```
//!
//! - [`state::PendingState`]: what the engine asked for
//! - [`state::ContextState`]: what the driver currently holds, one per GL context
//! - `commit`: one diff-and-issue function per state category, run in a fixed
//!   order from the draw, dispatch and clear entry points
//! - [`OpenGlRhi`]: the device that owns all of the above

pub mod capabilities;
pub mod driver;
pub mod dynamic_buffers;
pub mod profiling;
pub mod resources;
pub mod shader_params;
pub mod state;
pub mod types;
pub mod zero_stride;

mod commit;
mod device;

pub use capabilities::{FeatureLevel, GraphicsBackendCapabilities, RenderTargetSwitchHeuristic};
pub use device::{ImmediateBuffers, OpenGlRhi};
pub use profiling::{FrameStats, GpuProfiler};
pub use state::{ContextKind, RenderTargetView};

use thiserror::Error;

use crate::config::ConfigError;

/// Broad classes of [`RhiError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The operation exists in the interface but has no implementation
    NotImplemented,
    /// The caller broke a usage contract
    ContractViolation,
    /// A feature was used although the capabilities said it is unavailable
    Unsupported,
    /// The device configuration is unusable
    Configuration,
}

/// Errors returned by RHI entry points
#[derive(Debug, Error)]
pub enum RhiError {
    /// Operation is declared but not implemented on OpenGL
    #[error("{operation} is not implemented")]
    NotImplemented {
        /// Name of the entry point
        operation: &'static str,
    },

    /// Caller violated a precondition
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// Two enabled render targets need different global blend settings
    #[error("Render targets {first} and {second} need different blend settings but separate blend is unsupported")]
    IncompatibleBlendStates {
        /// First enabled render target
        first: usize,
        /// Conflicting render target
        second: usize,
    },

    /// Feature used without driver support
    #[error("Unsupported capability: {0}")]
    UnsupportedCapability(&'static str),

    /// Handle refers to a released resource
    #[error("Stale {kind} handle")]
    StaleHandle {
        /// Resource kind
        kind: &'static str,
    },

    /// `end_draw*_up` without a matching begin
    #[error("No immediate-mode draw in progress")]
    ImmediateDrawNotStarted,

    /// `begin_draw*_up` while another immediate draw is open
    #[error("An immediate-mode draw is already in progress")]
    ImmediateDrawInProgress,

    /// Draw or shader setter without a bound shader state
    #[error("No bound shader state")]
    NoBoundShaderState,

    /// Configuration file could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Configuration values are inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl RhiError {
    /// Category of the error
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::NotImplemented { .. } => ErrorCategory::NotImplemented,
            Self::ContractViolation(_)
            | Self::IncompatibleBlendStates { .. }
            | Self::StaleHandle { .. }
            | Self::ImmediateDrawNotStarted
            | Self::ImmediateDrawInProgress
            | Self::NoBoundShaderState => ErrorCategory::ContractViolation,
            Self::UnsupportedCapability(_) => ErrorCategory::Unsupported,
            Self::Config(_) | Self::InvalidConfiguration(_) => ErrorCategory::Configuration,
        }
    }
}

/// Result type for RHI operations
pub type RhiResult<T> = Result<T, RhiError>;

/// Conditions the RHI corrected on its own
///
/// Each one is also logged at warn level when it happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RhiWarning {
    /// A non-power-of-two texture was sampled with a wrapping mode the driver
    /// cannot honor; wrap S/T were clamped to edge
    NonPowerOfTwoWrapClamped {
        /// Texture unit
        unit: u32,
        /// Driver name of the texture
        texture: types::GlName,
        /// Debug label of the texture, if any
        label: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(
            RhiError::NotImplemented { operation: "draw_primitive_indirect" }.category(),
            ErrorCategory::NotImplemented
        );
        assert_eq!(RhiError::ImmediateDrawNotStarted.category(), ErrorCategory::ContractViolation);
        assert_eq!(
            RhiError::IncompatibleBlendStates { first: 0, second: 2 }.category(),
            ErrorCategory::ContractViolation
        );
        assert_eq!(RhiError::UnsupportedCapability("compute").category(), ErrorCategory::Unsupported);
        assert_eq!(
            RhiError::InvalidConfiguration("bad".to_string()).category(),
            ErrorCategory::Configuration
        );
    }

    #[test]
    fn test_error_messages() {
        let error = RhiError::NotImplemented { operation: "set_stream_out_targets" };
        assert_eq!(error.to_string(), "set_stream_out_targets is not implemented");
        let error = RhiError::StaleHandle { kind: "texture" };
        assert_eq!(error.to_string(), "Stale texture handle");
    }
}
