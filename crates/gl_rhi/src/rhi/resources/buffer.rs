//! Buffer resources
//!
//! Vertex, index and uniform buffers as the state layer sees them: a driver
//! name plus the metadata commit code needs (size, stride, usage). Storage
//! management beyond that belongs to the engine's resource code.

use bitflags::bitflags;

use crate::rhi::types::{BufferUsageHint, GlName};

bitflags! {
    /// How a buffer's contents are produced and consumed
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Written once
        const STATIC = 1 << 0;
        /// Rewritten occasionally
        const DYNAMIC = 1 << 1;
        /// Rewritten every frame
        const VOLATILE = 1 << 2;
        /// Holds a single value shared by every vertex; kept on the CPU and
        /// expanded on demand
        const ZERO_STRIDE = 1 << 3;
    }
}

impl BufferUsage {
    /// GL usage hint matching these flags
    pub const fn gl_hint(self) -> BufferUsageHint {
        if self.contains(Self::VOLATILE) {
            BufferUsageHint::StreamDraw
        } else if self.contains(Self::DYNAMIC) {
            BufferUsageHint::DynamicDraw
        } else {
            BufferUsageHint::StaticDraw
        }
    }
}

/// Vertex buffer
#[derive(Debug, Clone)]
pub struct VertexBuffer {
    /// Driver name, 0 for zero-stride buffers that only live on the CPU
    pub name: GlName,
    /// Size in bytes
    pub size: u32,
    /// Usage flags
    pub usage: BufferUsage,
    /// CPU copy of the value for zero-stride buffers
    pub zero_stride_data: Option<Vec<u8>>,
}

impl VertexBuffer {
    /// Whether the buffer holds one value shared by all vertices
    pub const fn is_zero_stride(&self) -> bool {
        self.usage.contains(BufferUsage::ZERO_STRIDE)
    }
}

/// Index buffer
#[derive(Debug, Clone)]
pub struct IndexBuffer {
    /// Driver name
    pub name: GlName,
    /// Size in bytes
    pub size: u32,
    /// Bytes per index, 2 or 4
    pub stride: u32,
    /// Usage flags
    pub usage: BufferUsage,
}

/// Uniform buffer
///
/// On drivers with emulated uniform buffers nothing is uploaded; `shadow`
/// holds the contents and is copied into packed uniform arrays at draw time.
#[derive(Debug, Clone)]
pub struct UniformBuffer {
    /// Driver name, 0 when uniform buffers are emulated
    pub name: GlName,
    /// Requested size in bytes
    pub size: u32,
    /// Size of the pooled allocation backing the buffer
    pub allocated_size: u32,
    /// Allocated with stream-draw usage
    pub stream_draw: bool,
    /// Changes whenever the contents change; never 0
    pub unique_id: u64,
    pub(crate) shadow: Vec<u32>,
}

impl UniformBuffer {
    /// Contents as bytes
    pub fn contents(&self) -> &[u8] {
        bytemuck::cast_slice(&self.shadow)
    }

    /// Contents as 32-bit words
    pub fn words(&self) -> &[u32] {
        &self.shadow
    }

    pub(crate) fn store(&mut self, data: &[u8]) {
        let words = data.len().div_ceil(4);
        self.shadow.clear();
        self.shadow.resize(words, 0);
        bytemuck::cast_slice_mut::<u32, u8>(&mut self.shadow)[..data.len()].copy_from_slice(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_hint() {
        assert_eq!(BufferUsage::STATIC.gl_hint(), BufferUsageHint::StaticDraw);
        assert_eq!(BufferUsage::DYNAMIC.gl_hint(), BufferUsageHint::DynamicDraw);
        assert_eq!((BufferUsage::DYNAMIC | BufferUsage::VOLATILE).gl_hint(), BufferUsageHint::StreamDraw);
    }

    #[test]
    fn test_uniform_shadow_pads_to_words() {
        let mut buffer = UniformBuffer {
            name: 0,
            size: 6,
            allocated_size: 16,
            stream_draw: false,
            unique_id: 1,
            shadow: Vec::new(),
        };
        buffer.store(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(buffer.words().len(), 2);
        assert_eq!(&buffer.contents()[..6], &[1, 2, 3, 4, 5, 6]);
        assert_eq!(&buffer.contents()[6..], &[0, 0]);
    }
}
