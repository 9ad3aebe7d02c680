//! Two-tier state cache
//!
//! [`PendingState`] records what the engine asked for; [`ContextState`]
//! mirrors what one GL context actually holds. Commit code diffs the two and
//! only issues driver calls for the difference.

pub mod context;
pub mod descriptors;
pub mod pending;
pub mod tracking;

pub use context::{
    AttributeBinding, CachedAttribute, CachedTextureStage, CachedUavStage, ContextKind, ContextState,
    DepthStencilCache, StencilFaceCache,
};
pub use descriptors::{
    BlendStateData, DepthStencilStateData, RasterizerStateData, RenderTargetBlendState, SamplerData,
    StencilFaceState,
};
pub use pending::{
    ImmediateDraw, ImmediateIndices, ImmediateSource, PendingState, RenderTargetView, TextureStage, UavStage,
    VertexStream,
};
pub use tracking::{NameGenerations, ResourceGenerations, TrackedName};
