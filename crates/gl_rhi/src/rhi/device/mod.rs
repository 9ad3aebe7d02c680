//! # OpenGL RHI Device
//!
//! [`OpenGlRhi`] owns the driver, both context mirrors, the pending state and
//! every cache the commit layer reads. Its entry points are split by concern:
//!
//! - `setters`: pending-state writes (`set_*`)
//! - `render_targets`: render target binding and discards
//! - `draw`: indexed and non-indexed draws, indirect stubs
//! - `immediate`: begin/end pairs drawing from scratch memory
//! - `compute`: compute program binding and dispatch
//! - `clear`: color, depth and stencil clears with exclude rectangles
//! - `resources`: resource creation, release and deletion notifications
//!
//! ## Design Notes
//!
//! Entry points destructure `self` so each commit function borrows only the
//! fields it touches. The context mirror used is always the one selected with
//! [`OpenGlRhi::set_current_context`].

mod clear;
mod compute;
mod draw;
mod immediate;
mod render_targets;
mod resources;
mod setters;


pub use immediate::ImmediateBuffers;

use crate::config::RhiConfig;
use crate::rhi::capabilities::GraphicsBackendCapabilities;
use crate::rhi::commit::shader::DummyUniformBuffer;
use crate::rhi::driver::GlDriver;
use crate::rhi::dynamic_buffers::DynamicBufferRing;
use crate::rhi::profiling::GpuProfiler;
use crate::rhi::resources::{FramebufferCache, ResourceRegistry, SamplerHandle, UniformBufferPool};
use crate::rhi::state::{ContextKind, ContextState, PendingState, ResourceGenerations, SamplerData};
use crate::rhi::types::{BufferBindingTarget, GlName};
use crate::rhi::zero_stride::ZeroStrideCache;
use crate::rhi::{RhiError, RhiResult, RhiWarning};

/// # OpenGL RHI
///
/// State cache and draw submission over a [`GlDriver`].
///
/// ## Usage
///
/// ```rust,ignore
/// let mut rhi = OpenGlRhi::new(RecordingDriver::new(), RhiConfig::default())?;
/// rhi.begin_frame();
/// rhi.set_bound_shader_state(shaders)?;
/// rhi.set_stream_source(0, Some(vertices), 12, 0)?;
/// rhi.draw_primitive(PrimitiveType::TriangleList, 0, 1, 1)?;
/// rhi.end_frame();
/// ```
///
/// ## Design Notes
///
/// Nothing here is `Sync`: a device belongs to the thread that owns its GL
/// contexts. Both context mirrors live on the device; deletions invalidate
/// them together through the device-wide [`ResourceGenerations`].
#[derive(Debug)]
pub struct OpenGlRhi<D: GlDriver> {
    driver: D,
    config: RhiConfig,
    pending: PendingState,
    contexts: [ContextState; 2],
    current_context: ContextKind,
    registry: ResourceRegistry,
    generations: ResourceGenerations,
    zero_stride: ZeroStrideCache,
    dummy_uniform_buffer: DummyUniformBuffer,
    uniform_pool: UniformBufferPool,
    framebuffer_cache: FramebufferCache,
    vertex_ring: DynamicBufferRing,
    index_ring: DynamicBufferRing,
    profiler: GpuProfiler,
    warnings: Vec<RhiWarning>,
    point_sampler: SamplerHandle,
    next_uniform_buffer_id: u64,
}

impl<D: GlDriver> OpenGlRhi<D> {
    /// Create a device over `driver`
    ///
    /// Validates the configuration, creates the dynamic buffer rings when the
    /// driver supports fast buffer uploads and creates the point sampler
    /// bound alongside shader resource views.
    pub fn new(driver: D, config: RhiConfig) -> RhiResult<Self> {
        config.validate().map_err(RhiError::InvalidConfiguration)?;

        let caps = &config.capabilities;
        let rings = &config.dynamic_buffers;
        let mut rhi = Self {
            pending: PendingState::new(caps),
            contexts: std::array::from_fn(|_| ContextState::new(caps)),
            current_context: ContextKind::Rendering,
            registry: ResourceRegistry::new(),
            generations: ResourceGenerations::default(),
            zero_stride: ZeroStrideCache::new(),
            dummy_uniform_buffer: DummyUniformBuffer::new(config.dummy_uniform_buffer_size),
            uniform_pool: UniformBufferPool::new(&config.uniform_buffer_pool),
            framebuffer_cache: FramebufferCache::new(),
            vertex_ring: DynamicBufferRing::new(BufferBindingTarget::Array, rings.buffer_count, rings.vertex_buffer_size),
            index_ring: DynamicBufferRing::new(
                BufferBindingTarget::ElementArray,
                rings.buffer_count,
                rings.index_buffer_size,
            ),
            profiler: GpuProfiler::new(),
            warnings: Vec::new(),
            point_sampler: SamplerHandle::default(),
            next_uniform_buffer_id: 1,
            driver,
            config,
        };

        if rhi.config.capabilities.supports_fast_buffer_data {
            let Self { driver, contexts, current_context, generations, vertex_ring, index_ring, .. } = &mut rhi;
            let context = &mut contexts[current_context.index()];
            vertex_ring.init(driver, context, &generations.buffers);
            index_ring.init(driver, context, &generations.buffers);
        }
        rhi.point_sampler = rhi.create_sampler_state(SamplerData::point_clamp());

        log::info!(
            "Created OpenGL RHI: {:?}, {} texture units, {} vertex attributes",
            rhi.config.capabilities.feature_level,
            rhi.config.capabilities.max_combined_texture_image_units(),
            rhi.config.capabilities.max_vertex_attributes
        );
        Ok(rhi)
    }

    /// Start a frame
    ///
    /// Deletes uniform buffers that idled too long in the pool and resets the
    /// render target switch heuristic.
    pub fn begin_frame(&mut self) {
        for name in self.uniform_pool.begin_frame() {
            self.delete_buffer(name);
        }
        for context in &mut self.contexts {
            context.last_es2_color_render_target = None;
            context.last_es2_depth_render_target = None;
        }
    }

    /// Finish a frame, sampling GPU timing and rolling the frame statistics
    pub fn end_frame(&mut self) {
        let cycles = self.driver.gpu_frame_cycles();
        self.profiler.end_frame(cycles);
    }

    /// Release every object the device created for its own use
    ///
    /// Zero-stride expansions, the dummy uniform buffer, pooled uniform
    /// buffers, the dynamic rings and cached framebuffers are deleted.
    /// Engine-created resources stay alive.
    pub fn cleanup(&mut self) {
        self.free_zero_stride_buffers();
        let mut buffers: Vec<GlName> = self.dummy_uniform_buffer.take().into_iter().collect();
        buffers.extend(self.uniform_pool.drain());
        buffers.extend(self.vertex_ring.drain());
        buffers.extend(self.index_ring.drain());
        let buffer_count = buffers.len();
        for name in buffers {
            self.delete_buffer(name);
        }

        let framebuffers = self.framebuffer_cache.drain();
        let framebuffer_count = framebuffers.len();
        for name in framebuffers {
            self.delete_framebuffer(name);
        }
        log::info!(
            "RHI cleanup deleted {} buffers and {} framebuffers",
            buffer_count,
            framebuffer_count
        );
    }

    /// Delete every zero-stride expansion
    ///
    /// Expansions are rebuilt on the next draw that reads a zero-stride stream.
    pub fn free_zero_stride_buffers(&mut self) {
        let expansions = self.zero_stride.drain();
        if !expansions.is_empty() {
            log::debug!("Freeing {} zero-stride expansions", expansions.len());
        }
        for name in expansions {
            self.delete_buffer(name);
        }
    }

    /// Select the context mirror subsequent commits use
    pub fn set_current_context(&mut self, context: ContextKind) {
        if self.current_context != context {
            log::trace!("Switching to {:?} context", context);
            self.current_context = context;
        }
    }

    /// Context mirror in use
    pub const fn current_context(&self) -> ContextKind {
        self.current_context
    }

    /// Cached state of one context
    pub const fn context_state(&self, context: ContextKind) -> &ContextState {
        &self.contexts[context.index()]
    }

    /// State recorded since the last submission
    pub const fn pending_state(&self) -> &PendingState {
        &self.pending
    }

    /// Resources created through this device
    pub const fn resources(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Device configuration
    pub const fn config(&self) -> &RhiConfig {
        &self.config
    }

    /// Driver capabilities
    pub const fn capabilities(&self) -> &GraphicsBackendCapabilities {
        &self.config.capabilities
    }

    /// The underlying driver
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Mutable access to the underlying driver
    ///
    /// Calls made directly on the driver bypass the context mirror.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Draw and work statistics
    pub const fn profiler(&self) -> &GpuProfiler {
        &self.profiler
    }

    /// GPU time of the last completed frame, in driver cycles
    pub const fn gpu_frame_cycles(&self) -> u32 {
        self.profiler.gpu_frame_cycles()
    }

    /// Drain the conditions corrected since the last call
    pub fn take_warnings(&mut self) -> Vec<RhiWarning> {
        std::mem::take(&mut self.warnings)
    }

    fn context_mut(&mut self) -> &mut ContextState {
        &mut self.contexts[self.current_context.index()]
    }

    fn delete_buffer(&mut self, name: GlName) {
        if name == 0 {
            return;
        }
        self.driver.delete_buffer(name);
        self.generations.buffers.retire(name);
    }

    fn delete_framebuffer(&mut self, name: GlName) {
        self.driver.delete_framebuffer(name);
        for context in &mut self.contexts {
            if context.framebuffer == Some(name) {
                context.framebuffer = None;
            }
        }
    }
}
