//! Frame replay demo
//!
//! Replays a small scripted frame against the recording driver and reports
//! how many GL calls the state cache let through. Pass a `.toml` or `.ron`
//! device configuration as the first argument to pick a capability profile.

use gl_rhi::foundation::logging;
use gl_rhi::prelude::*;
use gl_rhi::rhi::resources::{ComputeShaderHandle, IndexBufferHandle, ProgramDesc, ShaderBindings, TextureHandle};
use gl_rhi::rhi::types::ComponentCount;

const TARGET_SIZE: u32 = 256;
const FRAMES: u32 = 3;

pub struct FrameReplay {
    rhi: OpenGlRhi<RecordingDriver>,
    color_target: TextureHandle,
    depth_target: TextureHandle,
    quad_indices: IndexBufferHandle,
    compute: Option<ComputeShaderHandle>,
}

impl FrameReplay {
    pub fn new(config: RhiConfig) -> Result<Self, RhiError> {
        log::info!("Creating device at feature level {:?}", config.capabilities.feature_level);
        let mut rhi = OpenGlRhi::new(RecordingDriver::new(), config)?;

        let color_target = rhi.create_texture(TextureDesc::texture_2d(TARGET_SIZE, TARGET_SIZE, 1).with_label("scene color"));
        let depth_target = rhi.create_texture(TextureDesc::depth_stencil(TARGET_SIZE, TARGET_SIZE));

        let shaders = rhi.create_bound_shader_state(BoundShaderStateDesc {
            declaration: VertexDeclaration::new(vec![VertexElement::float(0, 0, 0, ComponentCount::Three)]),
            vertex: ShaderBindings { in_out_mask: 0b1, ..ShaderBindings::default() },
            ..BoundShaderStateDesc::default()
        });
        rhi.set_bound_shader_state(shaders)?;

        let quad: [f32; 12] = [-1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 1.0, 1.0, 0.0, -1.0, 1.0, 0.0];
        let vertices = rhi.create_vertex_buffer(48, BufferUsage::STATIC, Some(bytemuck::cast_slice(&quad)))?;
        rhi.set_stream_source(0, Some(vertices), 12, 0)?;

        let indices: [u16; 6] = [0, 1, 2, 0, 2, 3];
        let quad_indices = rhi.create_index_buffer(12, 2, BufferUsage::STATIC, Some(bytemuck::cast_slice(&indices)))?;

        let compute = if rhi.capabilities().supports_compute_shaders {
            Some(rhi.create_compute_shader(ShaderBindings::default(), ProgramDesc::default())?)
        } else {
            log::info!("Compute shaders unavailable, skipping the compute pass");
            None
        };

        Ok(Self { rhi, color_target, depth_target, quad_indices, compute })
    }

    pub fn run(&mut self, frames: u32) -> Result<(), RhiError> {
        for frame in 0..frames {
            self.rhi.driver_mut().clear_calls();
            self.replay_frame()?;

            let calls = self.rhi.driver().calls().len();
            let draws = self.rhi.driver().draw_call_count();
            log::info!("Frame {}: {} GL calls for {} draws", frame, calls, draws);
            for warning in self.rhi.take_warnings() {
                log::warn!("{:?}", warning);
            }
        }

        let stats = self.rhi.profiler().last_frame();
        log::info!(
            "Last frame: {} primitives, {} vertices, {} draw calls",
            stats.primitives,
            stats.vertices,
            stats.total_draw_calls()
        );
        Ok(())
    }

    fn replay_frame(&mut self) -> Result<(), RhiError> {
        self.rhi.begin_frame();
        self.rhi.set_render_targets(
            &[Some(RenderTargetView::new(self.color_target))],
            Some(RenderTargetView::new(self.depth_target)),
        )?;
        // Keep the centre of the previous frame, clear the border around it
        let centre = IntRect::new(TARGET_SIZE / 4, TARGET_SIZE / 4, TARGET_SIZE * 3 / 4, TARGET_SIZE * 3 / 4);
        self.rhi.clear(Some(LinearColor::BLACK), Some(1.0), Some(0), centre)?;

        // Opaque pass: the second draw should not touch any state
        self.rhi.set_blend_state(BlendStateData::default(), LinearColor::WHITE);
        self.rhi.draw_indexed_primitive(self.quad_indices, PrimitiveType::TriangleList, 0, 0, 4, 0, 2, 1)?;
        self.rhi.draw_indexed_primitive(self.quad_indices, PrimitiveType::TriangleList, 0, 0, 4, 0, 2, 1)?;

        // Overlay through immediate-mode memory
        self.rhi
            .set_blend_state(BlendStateData::uniform(RenderTargetBlendState::alpha_blended()), LinearColor::WHITE);
        let overlay: [f32; 9] = [0.0, 0.5, 0.0, -0.5, -0.5, 0.0, 0.5, -0.5, 0.0];
        let vertices = self.rhi.begin_draw_primitive_up(PrimitiveType::TriangleList, 1, 3, 12)?;
        vertices.copy_from_slice(bytemuck::cast_slice(&overlay));
        self.rhi.end_draw_primitive_up()?;

        if let Some(compute) = self.compute {
            self.rhi.set_compute_shader(compute)?;
            self.rhi.dispatch_compute_shader(TARGET_SIZE / 8, TARGET_SIZE / 8, 1)?;
        }

        self.rhi.discard_render_targets(true, true, 0);
        self.rhi.end_frame();
        Ok(())
    }
}

fn load_config() -> Result<RhiConfig, Box<dyn std::error::Error>> {
    match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading device configuration from {}", path);
            Ok(RhiConfig::load_from_file(&path)?)
        }
        None => Ok(RhiConfig::new(GraphicsBackendCapabilities::desktop_gl4())),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_with_default_filter("info");

    log::info!("Starting frame replay");
    let config = load_config()?;
    let mut replay = FrameReplay::new(config)?;
    replay.run(FRAMES)?;
    log::info!("Frame replay finished");
    Ok(())
}
