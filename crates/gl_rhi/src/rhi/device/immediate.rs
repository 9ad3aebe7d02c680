//! Immediate-mode ("UP") draws
//!
//! A begin call hands out scratch memory for the caller to fill and the
//! matching end call draws from it. With fast buffer uploads the memory is a
//! region of the dynamic vertex and index rings; otherwise it is a heap
//! buffer read through client pointers.

use crate::rhi::driver::{DataSource, GlDriver};
use crate::rhi::state::{ImmediateDraw, ImmediateIndices, ImmediateSource, PendingState};
use crate::rhi::types::{IndexType, PrimitiveType};
use crate::rhi::{RhiError, RhiResult};

use super::draw::VertexSource;
use super::OpenGlRhi;

/// Writable memory of an indexed immediate-mode draw
#[derive(Debug)]
pub struct ImmediateBuffers<'a> {
    /// Vertex bytes, `num_vertices * vertex_stride` long
    pub vertices: &'a mut [u8],
    /// Index bytes, `num_indices * index_stride` long
    pub indices: &'a mut [u8],
}

/// Grow a scratch buffer to `size` bytes without ever shrinking it
fn scratch(buffer: &mut Vec<u8>, size: usize) -> &mut [u8] {
    if buffer.len() < size {
        buffer.resize(size, 0);
    }
    &mut buffer[..size]
}

fn mismatched_end(operation: &str, open: &str) -> RhiError {
    RhiError::ContractViolation(format!("{operation} called while {open} immediate draw is open"))
}

impl<D: GlDriver> OpenGlRhi<D> {
    /// Start a non-indexed immediate-mode draw
    ///
    /// Returns `num_vertices * vertex_stride` bytes to fill before
    /// [`Self::end_draw_primitive_up`].
    pub fn begin_draw_primitive_up(
        &mut self,
        primitive_type: PrimitiveType,
        num_primitives: u32,
        num_vertices: u32,
        vertex_stride: u32,
    ) -> RhiResult<&mut [u8]> {
        self.check_immediate_begin(num_primitives)?;
        let draw = ImmediateDraw {
            primitive_type,
            num_primitives,
            num_vertices,
            vertex_stride,
            source: self.immediate_source(),
            indices: None,
        };
        let size = draw.vertex_data_size();

        let Self { driver, pending, contexts, current_context, generations, vertex_ring, .. } = self;
        match draw.source {
            ImmediateSource::DynamicRing => {
                let context = &mut contexts[current_context.index()];
                let (_, vertices) = vertex_ring.lock(driver, context, &generations.buffers, size)?;
                pending.immediate = Some(draw);
                Ok(vertices)
            }
            ImmediateSource::Heap => {
                pending.immediate = Some(draw);
                Ok(scratch(&mut pending.up_vertex_data, size))
            }
        }
    }

    /// Draw the vertices written since [`Self::begin_draw_primitive_up`]
    pub fn end_draw_primitive_up(&mut self) -> RhiResult<()> {
        let draw = match self.pending.immediate {
            Some(draw) if draw.indices.is_none() => draw,
            Some(_) => return Err(mismatched_end("end_draw_primitive_up", "an indexed")),
            None => return Err(RhiError::ImmediateDrawNotStarted),
        };
        self.pending.immediate = None;

        let source = match draw.source {
            ImmediateSource::DynamicRing => {
                let Self { driver, contexts, current_context, generations, vertex_ring, .. } = self;
                let region =
                    vertex_ring.unlock(driver, &mut contexts[current_context.index()], &generations.buffers)?;
                VertexSource::Ring { name: region.name, offset: region.offset, stride: draw.vertex_stride }
            }
            ImmediateSource::Heap => VertexSource::Heap { size: draw.vertex_data_size(), stride: draw.vertex_stride },
        };
        let params = draw.primitive_type.draw_parameters(draw.num_primitives);

        self.commit_draw_state()?;
        self.bind_element_array(0);
        self.setup_vertex_source(source, 0, draw.num_vertices)?;
        self.set_patch_size(params);

        self.register_draw(draw.primitive_type, draw.num_primitives, draw.num_vertices);
        self.driver.draw_arrays(params.mode, 0, params.num_elements);
        Ok(())
    }

    /// Start an indexed immediate-mode draw
    ///
    /// `index_stride` must be 2 or 4. Without index offset support the
    /// ring path requires `min_vertex_index` to be 0.
    pub fn begin_draw_indexed_primitive_up(
        &mut self,
        primitive_type: PrimitiveType,
        num_primitives: u32,
        num_vertices: u32,
        vertex_stride: u32,
        min_vertex_index: u32,
        num_indices: u32,
        index_stride: u32,
    ) -> RhiResult<ImmediateBuffers<'_>> {
        let index_type = IndexType::from_stride(index_stride).ok_or_else(|| {
            RhiError::ContractViolation(format!("immediate index stride {index_stride} is neither 2 nor 4"))
        })?;
        self.check_immediate_begin(num_primitives)?;
        let source = self.immediate_source();
        if source == ImmediateSource::DynamicRing
            && min_vertex_index != 0
            && !self.config.capabilities.supports_draw_index_offset
        {
            return Err(RhiError::ContractViolation(format!(
                "minimum vertex index {min_vertex_index} needs index offset support"
            )));
        }

        let draw = ImmediateDraw {
            primitive_type,
            num_primitives,
            num_vertices,
            vertex_stride,
            source,
            indices: Some(ImmediateIndices { min_vertex_index, num_indices, index_type }),
        };
        let vertex_size = draw.vertex_data_size();
        let index_size = draw.index_data_size();

        let Self { driver, pending, contexts, current_context, generations, vertex_ring, index_ring, .. } = self;
        match source {
            ImmediateSource::DynamicRing => {
                let context = &mut contexts[current_context.index()];
                let (_, vertices) = vertex_ring.lock(driver, context, &generations.buffers, vertex_size)?;
                let (_, indices) = index_ring.lock(driver, context, &generations.buffers, index_size)?;
                pending.immediate = Some(draw);
                Ok(ImmediateBuffers { vertices, indices })
            }
            ImmediateSource::Heap => {
                pending.immediate = Some(draw);
                let PendingState { up_vertex_data, up_index_data, .. } = pending;
                Ok(ImmediateBuffers {
                    vertices: scratch(up_vertex_data, vertex_size),
                    indices: scratch(up_index_data, index_size),
                })
            }
        }
    }

    /// Draw the indexed vertices written since
    /// [`Self::begin_draw_indexed_primitive_up`]
    pub fn end_draw_indexed_primitive_up(&mut self) -> RhiResult<()> {
        let (draw, indices) = match self.pending.immediate {
            Some(draw @ ImmediateDraw { indices: Some(indices), .. }) => (draw, indices),
            Some(_) => return Err(mismatched_end("end_draw_indexed_primitive_up", "a non-indexed")),
            None => return Err(RhiError::ImmediateDrawNotStarted),
        };
        self.pending.immediate = None;
        let params = draw.primitive_type.draw_parameters(draw.num_primitives);

        match draw.source {
            ImmediateSource::DynamicRing => {
                let Self { driver, contexts, current_context, generations, vertex_ring, index_ring, .. } = self;
                let context = &mut contexts[current_context.index()];
                let vertex_region = vertex_ring.unlock(driver, context, &generations.buffers)?;
                let index_region = index_ring.unlock(driver, context, &generations.buffers)?;

                self.commit_draw_state()?;
                self.bind_element_array(index_region.name);
                self.setup_vertex_source(
                    VertexSource::Ring {
                        name: vertex_region.name,
                        offset: vertex_region.offset,
                        stride: draw.vertex_stride,
                    },
                    0,
                    draw.num_vertices,
                )?;
                self.set_patch_size(params);

                self.register_draw(draw.primitive_type, draw.num_primitives, draw.num_vertices);
                let offsets = DataSource::BufferOffset(index_region.offset);
                if self.config.capabilities.supports_draw_index_offset {
                    self.driver.draw_range_elements(
                        params.mode,
                        indices.min_vertex_index,
                        indices.min_vertex_index.saturating_add(draw.num_vertices),
                        params.num_elements,
                        indices.index_type,
                        offsets,
                    );
                } else {
                    self.driver
                        .draw_elements(params.mode, params.num_elements, indices.index_type, offsets);
                }
            }
            ImmediateSource::Heap => {
                self.commit_draw_state()?;
                self.bind_element_array(0);
                self.setup_vertex_source(
                    VertexSource::Heap { size: draw.vertex_data_size(), stride: draw.vertex_stride },
                    0,
                    draw.num_vertices,
                )?;
                self.set_patch_size(params);

                self.register_draw(draw.primitive_type, draw.num_primitives, draw.num_vertices);
                let index_data = self.pending.up_index_data.get(..draw.index_data_size()).ok_or_else(|| {
                    RhiError::ContractViolation("immediate index data was never allocated".to_string())
                })?;
                self.driver.draw_elements(
                    params.mode,
                    params.num_elements,
                    indices.index_type,
                    DataSource::Client(index_data),
                );
            }
        }
        Ok(())
    }

    fn check_immediate_begin(&self, num_primitives: u32) -> RhiResult<()> {
        if self.pending.immediate.is_some() {
            return Err(RhiError::ImmediateDrawInProgress);
        }
        if num_primitives == 0 {
            return Err(RhiError::ContractViolation(
                "immediate-mode draw with no primitives".to_string(),
            ));
        }
        Ok(())
    }

    fn immediate_source(&self) -> ImmediateSource {
        if self.config.capabilities.supports_fast_buffer_data
            && self.vertex_ring.is_initialized()
            && self.index_ring.is_initialized()
        {
            ImmediateSource::DynamicRing
        } else {
            ImmediateSource::Heap
        }
    }
}
