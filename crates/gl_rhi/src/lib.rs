//! # GL RHI
//!
//! State caching and draw submission for an OpenGL rendering hardware
//! interface.
//!
//! ## Features
//!
//! - **Two-tier state cache**: pending state is diffed against a mirror of
//!   each GL context so only changed state reaches the driver
//! - **Deletion-safe caching**: recycled GL names never alias stale cache
//!   entries
//! - **Immediate-mode draws**: begin/end pairs backed by dynamic rings or heap
//!   scratch memory
//! - **Capability driven**: one code path for desktop GL, GLES 2/3 and macOS
//!   profiles
//! - **Driver agnostic**: every GL entry point goes through [`rhi::driver::GlDriver`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gl_rhi::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RhiConfig::new(GraphicsBackendCapabilities::desktop_gl4());
//!     let mut rhi = OpenGlRhi::new(RecordingDriver::new(), config)?;
//!
//!     rhi.begin_frame();
//!     rhi.clear(Some(LinearColor::BLACK), Some(1.0), None, IntRect::default())?;
//!     rhi.end_frame();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod rhi;

pub use rhi::{OpenGlRhi, RhiError, RhiResult};

/// Common imports for RHI users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, DynamicBufferConfig, RhiConfig, UniformBufferPoolConfig},
        rhi::{
            driver::{GlDriver, RecordingDriver},
            resources::{BoundShaderStateDesc, BufferUsage, TextureDesc, VertexDeclaration, VertexElement},
            state::{BlendStateData, DepthStencilStateData, RasterizerStateData, RenderTargetBlendState},
            types::{IntRect, LinearColor, PrimitiveType, ShaderStage},
            ContextKind, FeatureLevel, GraphicsBackendCapabilities, OpenGlRhi, RenderTargetView, RhiError,
            RhiResult, RhiWarning,
        },
    };
}
