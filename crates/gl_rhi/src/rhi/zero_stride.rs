//! Zero-stride attribute expansion
//!
//! GL has no way to feed one attribute value to every vertex from a buffer
//! with a stride of 0. Buffers created with [`BufferUsage::ZERO_STRIDE`] keep
//! their value on the CPU; before a draw the value is replicated into a
//! static buffer large enough for the draw's vertex count, which is then
//! bound with a regular stride.
//!
//! [`BufferUsage::ZERO_STRIDE`]: crate::rhi::resources::BufferUsage::ZERO_STRIDE

use std::collections::HashMap;

use crate::rhi::driver::GlDriver;
use crate::rhi::resources::{VertexBufferHandle, VertexElement};
use crate::rhi::state::{ContextState, NameGenerations};
use crate::rhi::types::{BufferBindingTarget, BufferUsageHint, GlName};
use crate::rhi::{RhiError, RhiResult};

/// A static buffer holding a replicated zero-stride value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZeroStrideExpansion {
    /// Driver name of the expanded buffer
    pub name: GlName,
    /// Size in bytes
    pub size: usize,
}

/// Expanded buffers keyed by their zero-stride source
#[derive(Debug, Default)]
pub struct ZeroStrideCache {
    expansions: HashMap<VertexBufferHandle, ZeroStrideExpansion>,
}

impl ZeroStrideCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Expanded buffer covering `num_vertices` copies of `value`
    ///
    /// `value` is the source buffer's contents; its length is the stride the
    /// expansion is bound with. An existing expansion is reused when it is
    /// large enough, otherwise it is replaced. Returns the expansion and the
    /// name of a replaced buffer the caller must delete.
    pub fn find_or_create<D: GlDriver>(
        &mut self,
        driver: &mut D,
        context: &mut ContextState,
        generations: &NameGenerations,
        source: VertexBufferHandle,
        value: &[u8],
        element: &VertexElement,
        num_vertices: u32,
    ) -> RhiResult<(ZeroStrideExpansion, Option<GlName>)> {
        let size = num_vertices as usize * value.len();
        if let Some(existing) = self.expansions.get(&source) {
            if size <= existing.size {
                return Ok((*existing, None));
            }
        }

        let data = expand_pattern(value, element, size)?;
        let name = driver.gen_buffer();
        context.cached_bind_buffer(driver, generations, BufferBindingTarget::Array, name);
        driver.buffer_data(BufferBindingTarget::Array, size, Some(&data), BufferUsageHint::StaticDraw);

        let expansion = ZeroStrideExpansion { name, size };
        let replaced = self.expansions.insert(source, expansion).map(|old| old.name);
        log::trace!("Expanded zero-stride buffer to {} bytes for {} vertices", size, num_vertices);
        Ok((expansion, replaced))
    }

    /// Drop the expansion of a released source buffer
    pub fn remove_source(&mut self, source: VertexBufferHandle) -> Option<GlName> {
        self.expansions.remove(&source).map(|expansion| expansion.name)
    }

    /// Drop every expansion, returning the names to delete
    pub fn drain(&mut self) -> Vec<GlName> {
        self.expansions.drain().map(|(_, expansion)| expansion.name).collect()
    }

    /// Number of live expansions
    pub fn len(&self) -> usize {
        self.expansions.len()
    }

    /// Whether no expansion is live
    pub fn is_empty(&self) -> bool {
        self.expansions.is_empty()
    }
}

/// Replicate the element-sized pattern at the start of `value` over `size` bytes
///
/// The pattern is the element's component count times its component size and
/// must be 4, 8 or 16 bytes.
pub fn expand_pattern(value: &[u8], element: &VertexElement, size: usize) -> RhiResult<Vec<u8>> {
    let pattern_size = element.size_in_bytes() as usize;
    if !matches!(pattern_size, 4 | 8 | 16) {
        return Err(RhiError::ContractViolation(format!(
            "zero-stride element of {pattern_size} bytes cannot be expanded; expected 4, 8 or 16"
        )));
    }
    let pattern = value.get(..pattern_size).ok_or_else(|| {
        RhiError::ContractViolation(format!(
            "zero-stride source holds {} bytes but its element needs {pattern_size}",
            value.len()
        ))
    })?;

    let mut data = vec![0_u8; size];
    for block in data.chunks_exact_mut(pattern_size) {
        block.copy_from_slice(pattern);
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rhi::capabilities::GraphicsBackendCapabilities;
    use crate::rhi::driver::{GlCall, RecordingDriver};
    use crate::rhi::types::{ComponentCount, VertexComponentType};
    use slotmap::SlotMap;

    fn element(component_type: VertexComponentType, components: ComponentCount) -> VertexElement {
        VertexElement {
            component_type,
            components,
            ..VertexElement::float(0, 0, 0, ComponentCount::One)
        }
    }

    #[test]
    fn test_every_block_matches_source() {
        let cases = [
            (element(VertexComponentType::Float, ComponentCount::One), 4),
            (element(VertexComponentType::Float, ComponentCount::Two), 8),
            (element(VertexComponentType::Float, ComponentCount::Four), 16),
            (element(VertexComponentType::UnsignedByte, ComponentCount::Bgra), 4),
            (element(VertexComponentType::Short, ComponentCount::Four), 8),
        ];
        for (element, pattern_size) in cases {
            let value: Vec<u8> = (1..=pattern_size as u8).collect();
            let data = expand_pattern(&value, &element, pattern_size * 10).expect("Should expand");
            assert_eq!(data.len(), pattern_size * 10);
            for block in data.chunks_exact(pattern_size) {
                assert_eq!(block, value.as_slice());
            }
        }
    }

    #[test]
    fn test_unsupported_pattern_size_is_rejected() {
        let element = element(VertexComponentType::Float, ComponentCount::Three);
        let error = expand_pattern(&[0; 12], &element, 120).unwrap_err();
        assert!(matches!(error, RhiError::ContractViolation(_)));
    }

    #[test]
    fn test_expansion_reused_when_large_enough() {
        let mut handles: SlotMap<VertexBufferHandle, ()> = SlotMap::with_key();
        let source = handles.insert(());
        let mut driver = RecordingDriver::new();
        let mut context = ContextState::new(&GraphicsBackendCapabilities::desktop_gl4());
        let generations = NameGenerations::new();
        let mut cache = ZeroStrideCache::new();
        let element = element(VertexComponentType::Float, ComponentCount::Four);
        let value = [0_u8; 16];

        let (first, replaced) = cache
            .find_or_create(&mut driver, &mut context, &generations, source, &value, &element, 64)
            .expect("Should expand");
        assert!(replaced.is_none());
        assert_eq!(first.size, 1024);

        let (again, _) = cache
            .find_or_create(&mut driver, &mut context, &generations, source, &value, &element, 32)
            .expect("Should reuse");
        assert_eq!(again, first);
        assert_eq!(driver.count(|call| matches!(call, GlCall::GenBuffer(_))), 1);

        let (grown, replaced) = cache
            .find_or_create(&mut driver, &mut context, &generations, source, &value, &element, 128)
            .expect("Should grow");
        assert_eq!(replaced, Some(first.name));
        assert_eq!(grown.size, 2048);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.drain(), vec![grown.name]);
    }
}
