//! Vertex attribute commit
//!
//! Every element of the bound vertex declaration that the vertex shader reads
//! is pointed at its stream. Attribute arrays left enabled by earlier draws
//! but not read now are disabled.

use slotmap::SlotMap;

use crate::rhi::capabilities::GraphicsBackendCapabilities;
use crate::rhi::driver::{AttributeFormat, DataSource, GlDriver};
use crate::rhi::resources::{BoundShaderState, VertexBuffer, VertexBufferHandle, VertexElement};
use crate::rhi::state::{AttributeBinding, ContextState, NameGenerations, VertexStream};
use crate::rhi::types::{BufferBindingTarget, GlName};
use crate::rhi::zero_stride::ZeroStrideCache;
use crate::rhi::{RhiError, RhiResult};

/// What one stream slot feeds its attributes from during a draw
#[derive(Debug, Clone, Copy)]
pub(crate) enum StreamBinding<'a> {
    /// Nothing bound; attributes read a constant zero
    Unbound,
    /// A buffer object with a per-vertex stride
    Buffer {
        /// Buffer name
        name: GlName,
        /// Bytes between vertices
        stride: u32,
        /// Byte offset of the first vertex
        offset: usize,
    },
    /// One value shared by every vertex, expanded on demand
    ZeroStride {
        /// Source buffer the expansion is keyed by
        source: VertexBufferHandle,
        /// The shared value
        value: &'a [u8],
    },
    /// Client memory (heap immediate draws)
    Client {
        /// Vertex data
        data: &'a [u8],
        /// Bytes between vertices
        stride: u32,
    },
}

/// Resolve the pending stream table against the vertex buffer registry
pub(crate) fn resolve_streams<'a>(
    streams: &[VertexStream],
    vertex_buffers: &'a SlotMap<VertexBufferHandle, VertexBuffer>,
) -> RhiResult<Vec<StreamBinding<'a>>> {
    streams
        .iter()
        .map(|stream| {
            let Some(handle) = stream.buffer else {
                return Ok(StreamBinding::Unbound);
            };
            let buffer = vertex_buffers
                .get(handle)
                .ok_or(RhiError::StaleHandle { kind: "vertex buffer" })?;
            if buffer.is_zero_stride() {
                let value = buffer.zero_stride_data.as_deref().ok_or_else(|| {
                    RhiError::ContractViolation("zero-stride vertex buffer has no value".to_string())
                })?;
                return Ok(StreamBinding::ZeroStride { source: handle, value });
            }
            Ok(StreamBinding::Buffer { name: buffer.name, stride: stream.stride, offset: stream.offset as usize })
        })
        .collect()
}

/// Point every attribute the vertex shader reads at its stream
///
/// `max_vertices` sizes zero-stride expansions. Returns the names of
/// expansions that were replaced by larger ones; the caller deletes them.
pub(crate) fn setup_vertex_arrays<D: GlDriver>(
    driver: &mut D,
    caps: &GraphicsBackendCapabilities,
    context: &mut ContextState,
    generations: &NameGenerations,
    zero_stride: &mut ZeroStrideCache,
    state: &BoundShaderState,
    streams: &[StreamBinding<'_>],
    base_vertex_index: u32,
    max_vertices: u32,
) -> RhiResult<Vec<GlName>> {
    let attribute_mask = state.attribute_mask();
    let mut used = vec![false; context.vertex_attributes.len()];
    let mut replaced = Vec::new();

    for element in &state.declaration.elements {
        let bit = 1_u32.checked_shl(element.attribute_index).unwrap_or(0);
        if bit == 0 || attribute_mask & bit != bit {
            continue;
        }
        let index = element.attribute_index as usize;
        if index >= used.len() {
            return Err(RhiError::ContractViolation(format!(
                "vertex attribute {index} exceeds the {} supported attributes",
                used.len()
            )));
        }

        match streams.get(element.stream_index as usize).copied().unwrap_or(StreamBinding::Unbound) {
            StreamBinding::Unbound => {
                let cached = &mut context.vertex_attributes[index];
                if cached.enabled {
                    driver.disable_vertex_attrib_array(element.attribute_index);
                    cached.enabled = false;
                }
                driver.vertex_attrib_4f(element.attribute_index, [0.0; 4]);
                continue;
            }
            StreamBinding::Buffer { name, stride, offset } => {
                let pointer = base_vertex_index as usize * stride as usize + offset + element.offset as usize;
                enable_vertex_element_cached(
                    driver,
                    caps,
                    context,
                    generations,
                    element,
                    stride,
                    name,
                    pointer,
                    DataSource::BufferOffset(pointer),
                );
            }
            StreamBinding::ZeroStride { source, value } => {
                let (expansion, old) =
                    zero_stride.find_or_create(driver, context, generations, source, value, element, max_vertices)?;
                replaced.extend(old);
                let stride = u32::try_from(value.len()).unwrap_or(u32::MAX);
                enable_vertex_element_cached(
                    driver,
                    caps,
                    context,
                    generations,
                    element,
                    stride,
                    expansion.name,
                    0,
                    DataSource::BufferOffset(0),
                );
            }
            StreamBinding::Client { data, stride } => {
                let start = element.offset as usize;
                let bytes = data.get(start..).ok_or_else(|| {
                    RhiError::ContractViolation(format!(
                        "attribute offset {start} lies past {} bytes of vertex data",
                        data.len()
                    ))
                })?;
                let pointer = data.as_ptr() as usize + start;
                enable_vertex_element_cached(
                    driver,
                    caps,
                    context,
                    generations,
                    element,
                    stride,
                    0,
                    pointer,
                    DataSource::Client(bytes),
                );
            }
        }
        used[index] = true;
    }

    for (index, cached) in context.vertex_attributes.iter_mut().enumerate() {
        if cached.enabled && !used[index] {
            driver.disable_vertex_attrib_array(super::slot_index(index));
            cached.enabled = false;
        }
    }
    Ok(replaced)
}

/// Enable an attribute array and set its pointer unless the cache already matches
///
/// `pointer` is the cache key: a buffer offset, or the client address.
fn enable_vertex_element_cached<D: GlDriver>(
    driver: &mut D,
    caps: &GraphicsBackendCapabilities,
    context: &mut ContextState,
    generations: &NameGenerations,
    element: &VertexElement,
    stride: u32,
    buffer: GlName,
    pointer: usize,
    source: DataSource<'_>,
) {
    let index = element.attribute_index;
    let binding = AttributeBinding {
        buffer: generations.track(buffer),
        pointer,
        stride,
        format: AttributeFormat {
            components: element.components,
            component_type: element.component_type,
            normalized: element.normalized,
        },
        divisor: element.divisor,
        integer: !element.convert_to_float,
    };

    let cached = &mut context.vertex_attributes[index as usize];
    if !cached.enabled {
        driver.enable_vertex_attrib_array(index);
        cached.enabled = true;
    }
    if cached.binding == Some(binding) {
        return;
    }
    cached.binding = Some(binding);

    context.cached_bind_buffer(driver, generations, BufferBindingTarget::Array, buffer);
    if binding.integer {
        driver.vertex_attrib_integer_pointer(index, binding.format, stride, source);
    } else {
        driver.vertex_attrib_pointer(index, binding.format, stride, source);
    }
    if caps.supports_instancing {
        driver.vertex_attrib_divisor(index, binding.divisor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rhi::commit::test_support::CommitFixture;
    use crate::rhi::driver::GlCall;
    use crate::rhi::resources::{
        BoundShaderStateDesc, BufferUsage, LinkedProgram, ProgramDesc, ShaderBindings, VertexDeclaration,
    };
    use crate::rhi::types::{ComponentCount, VertexComponentType};

    fn shader_state(elements: Vec<VertexElement>, in_out_mask: u32) -> BoundShaderState {
        BoundShaderState::new(
            LinkedProgram::new(1, ProgramDesc::default()),
            BoundShaderStateDesc {
                declaration: VertexDeclaration::new(elements),
                vertex: ShaderBindings { in_out_mask, ..ShaderBindings::default() },
                ..BoundShaderStateDesc::default()
            },
        )
    }

    fn float3() -> AttributeFormat {
        AttributeFormat { components: ComponentCount::Three, component_type: VertexComponentType::Float, normalized: false }
    }

    fn setup(
        f: &mut CommitFixture,
        zero_stride: &mut ZeroStrideCache,
        state: &BoundShaderState,
        streams: &[StreamBinding<'_>],
        base_vertex_index: u32,
        max_vertices: u32,
    ) -> Vec<GlName> {
        let generations = NameGenerations::new();
        setup_vertex_arrays(
            &mut f.driver,
            &f.caps,
            &mut f.context,
            &generations,
            zero_stride,
            state,
            streams,
            base_vertex_index,
            max_vertices,
        )
        .expect("Should set up vertex arrays")
    }

    #[test]
    fn test_attribute_pointer_set_once() {
        let mut f = CommitFixture::desktop();
        let mut zero_stride = ZeroStrideCache::new();
        let state = shader_state(vec![VertexElement::float(0, 0, 4, ComponentCount::Three)], 0b1);
        let streams = [StreamBinding::Buffer { name: 7, stride: 16, offset: 8 }];

        setup(&mut f, &mut zero_stride, &state, &streams, 2, 3);
        assert_eq!(
            f.driver.take_calls(),
            vec![
                GlCall::EnableVertexAttribArray(0),
                GlCall::BindBuffer { target: BufferBindingTarget::Array, name: 7 },
                GlCall::VertexAttribPointer { index: 0, format: float3(), stride: 16, offset: Some(44), integer: false },
                GlCall::VertexAttribDivisor { index: 0, divisor: 0 },
            ]
        );

        setup(&mut f, &mut zero_stride, &state, &streams, 2, 3);
        assert!(f.driver.calls().is_empty());
    }

    #[test]
    fn test_unread_attributes_are_disabled() {
        let mut f = CommitFixture::desktop();
        let mut zero_stride = ZeroStrideCache::new();
        f.context.vertex_attributes[3].enabled = true;
        // Attribute 1 is declared but the shader does not read it
        let state = shader_state(
            vec![VertexElement::float(0, 0, 0, ComponentCount::Three), VertexElement::float(1, 0, 12, ComponentCount::Two)],
            0b1,
        );
        let streams = [StreamBinding::Buffer { name: 7, stride: 20, offset: 0 }];

        setup(&mut f, &mut zero_stride, &state, &streams, 0, 3);
        let calls = f.driver.take_calls();
        assert!(calls.contains(&GlCall::DisableVertexAttribArray(3)));
        assert!(!calls.contains(&GlCall::EnableVertexAttribArray(1)));
        assert!(!f.context.vertex_attributes[3].enabled);
    }

    #[test]
    fn test_unbound_stream_reads_zero() {
        let mut f = CommitFixture::desktop();
        let mut zero_stride = ZeroStrideCache::new();
        f.context.vertex_attributes[2].enabled = true;
        let state = shader_state(vec![VertexElement::float(2, 5, 0, ComponentCount::Four)], 0b100);

        setup(&mut f, &mut zero_stride, &state, &[StreamBinding::Unbound], 0, 3);
        assert_eq!(
            f.driver.take_calls(),
            vec![
                GlCall::DisableVertexAttribArray(2),
                GlCall::VertexAttrib4f { index: 2, value: [0.0; 4] },
            ]
        );
    }

    #[test]
    fn test_integer_attribute_without_instancing() {
        let mut f = CommitFixture::new(GraphicsBackendCapabilities::es2());
        let mut zero_stride = ZeroStrideCache::new();
        let element = VertexElement {
            component_type: VertexComponentType::UnsignedByte,
            components: ComponentCount::Four,
            convert_to_float: false,
            ..VertexElement::float(1, 0, 0, ComponentCount::Four)
        };
        let state = shader_state(vec![element], 0b10);

        setup(&mut f, &mut zero_stride, &state, &[StreamBinding::Buffer { name: 3, stride: 4, offset: 0 }], 0, 1);
        let calls = f.driver.take_calls();
        assert!(calls.iter().any(|call| matches!(call, GlCall::VertexAttribPointer { integer: true, .. })));
        assert!(!calls.iter().any(|call| matches!(call, GlCall::VertexAttribDivisor { .. })));
    }

    #[test]
    fn test_zero_stride_stream_is_expanded() {
        let mut f = CommitFixture::desktop();
        let mut zero_stride = ZeroStrideCache::new();
        let mut buffers: SlotMap<VertexBufferHandle, VertexBuffer> = SlotMap::with_key();
        let value: Vec<u8> = bytemuck::cast_slice(&[1.0_f32, 0.0, 0.0, 1.0]).to_vec();
        let source = buffers.insert(VertexBuffer {
            name: 0,
            size: 16,
            usage: BufferUsage::ZERO_STRIDE,
            zero_stride_data: Some(value),
        });
        let mut pending_streams = [VertexStream::default(); 2];
        pending_streams[1].buffer = Some(source);
        let streams = resolve_streams(&pending_streams, &buffers).expect("Should resolve streams");
        let state = shader_state(vec![VertexElement::float(0, 1, 0, ComponentCount::Four)], 0b1);

        let replaced = setup(&mut f, &mut zero_stride, &state, &streams, 0, 4);
        assert!(replaced.is_empty());
        let calls = f.driver.take_calls();
        let expanded = match calls[0] {
            GlCall::GenBuffer(name) => name,
            ref other => panic!("expected a buffer allocation, got {other:?}"),
        };
        assert!(calls.contains(&GlCall::BufferData {
            target: BufferBindingTarget::Array,
            size: 64,
            initialized: true,
            usage: crate::rhi::types::BufferUsageHint::StaticDraw,
        }));
        assert!(calls.iter().any(|call| matches!(
            call,
            GlCall::VertexAttribPointer { stride: 16, offset: Some(0), .. }
        )));

        let replaced = setup(&mut f, &mut zero_stride, &state, &streams, 0, 8);
        assert_eq!(replaced, vec![expanded]);
    }

    #[test]
    fn test_client_memory_pointer() {
        let mut f = CommitFixture::desktop();
        let mut zero_stride = ZeroStrideCache::new();
        let state = shader_state(vec![VertexElement::float(0, 0, 4, ComponentCount::Three)], 0b1);
        let data = vec![0_u8; 48];
        f.context.array_buffer = Some(crate::rhi::state::TrackedName { name: 7, generation: 0 });

        setup(&mut f, &mut zero_stride, &state, &[StreamBinding::Client { data: &data, stride: 16 }], 0, 3);
        let calls = f.driver.take_calls();
        assert!(calls.contains(&GlCall::BindBuffer { target: BufferBindingTarget::Array, name: 0 }));
        assert!(calls.iter().any(|call| matches!(
            call,
            GlCall::VertexAttribPointer { stride: 16, offset: None, .. }
        )));
        let binding = f.context.vertex_attributes[0].binding.expect("Should cache binding");
        assert_eq!(binding.pointer, data.as_ptr() as usize + 4);
    }
}
