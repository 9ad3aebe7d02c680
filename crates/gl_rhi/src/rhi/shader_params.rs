//! Packed shader parameter cache
//!
//! Loose shader uniforms are packed by the shader compiler into one array per
//! type (highp, mediump, lowp, int, uint). Each stage keeps a CPU copy of those
//! arrays plus a dirty range in 16-byte vectors, so a draw only uploads the
//! vectors that changed since the last commit.
//!
//! Drivers without uniform buffer objects emulate them through the same
//! arrays: the buffer contents are copied into the packed globals (flattened
//! programs) or uploaded through per-buffer packed arrays (unflattened ones).

use crate::rhi::driver::GlDriver;
use crate::rhi::resources::{PackedArrayInfo, PackedUniform, ShaderBindings, StageUniforms};
use crate::rhi::types::PackedTypeIndex;
use crate::rhi::{RhiError, RhiResult};

/// Bytes per packed vector
const VECTOR_SIZE: u32 = 16;
/// 32-bit words per packed vector
const VECTOR_WORDS: usize = 4;

/// Dirty range of one packed array, in vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRange {
    /// First dirty vector
    pub low_vector: u32,
    /// One past the last dirty vector
    pub high_vector: u32,
}

impl DirtyRange {
    /// Whether any vector is dirty
    pub const fn is_dirty(&self) -> bool {
        self.high_vector > self.low_vector
    }
}

/// Per-stage packed uniform storage with dirty tracking
#[derive(Debug, Clone)]
pub struct ShaderParameterCache {
    array_size: u32,
    globals: [Vec<u32>; PackedTypeIndex::COUNT],
    scratch: [Vec<u32>; PackedTypeIndex::COUNT],
    dirty: [DirtyRange; PackedTypeIndex::COUNT],
}

impl ShaderParameterCache {
    /// Create a cache whose packed arrays hold `array_size` bytes each
    ///
    /// Everything starts dirty so the first commit uploads the full arrays.
    pub fn new(array_size: u32) -> Self {
        let words = (array_size / 4) as usize;
        let mut cache = Self {
            array_size,
            globals: std::array::from_fn(|_| vec![0; words]),
            scratch: std::array::from_fn(|_| vec![0; words]),
            dirty: [DirtyRange { low_vector: 0, high_vector: 0 }; PackedTypeIndex::COUNT],
        };
        cache.mark_all_dirty();
        cache
    }

    /// Size in bytes of each packed array
    pub const fn array_size(&self) -> u32 {
        self.array_size
    }

    /// Dirty range of a packed array
    pub const fn dirty_range(&self, type_index: PackedTypeIndex) -> DirtyRange {
        self.dirty[type_index as usize]
    }

    /// Packed array contents as words
    pub fn words(&self, type_index: PackedTypeIndex) -> &[u32] {
        &self.globals[type_index.index()]
    }

    /// Force the next commit to upload every vector
    pub fn mark_all_dirty(&mut self) {
        let vectors = self.array_size / VECTOR_SIZE;
        for range in &mut self.dirty {
            *range = DirtyRange { low_vector: 0, high_vector: vectors };
        }
    }

    /// Copy `bytes` into a packed array at `byte_offset` and widen its dirty range
    pub fn set(&mut self, type_index: PackedTypeIndex, byte_offset: u32, bytes: &[u8]) -> RhiResult<()> {
        let end = usize::try_from(byte_offset)
            .ok()
            .and_then(|offset| offset.checked_add(bytes.len()))
            .filter(|end| *end <= self.array_size as usize)
            .ok_or_else(|| {
                RhiError::ContractViolation(format!(
                    "shader parameter write of {} bytes at offset {} overflows the {} byte {:?} array",
                    bytes.len(),
                    byte_offset,
                    self.array_size,
                    type_index
                ))
            })?;
        if bytes.is_empty() {
            return Ok(());
        }

        let storage = bytemuck::cast_slice_mut::<u32, u8>(&mut self.globals[type_index.index()]);
        storage[byte_offset as usize..end].copy_from_slice(bytes);

        // `end` is bounded by array_size, which is a u32
        #[allow(clippy::cast_possible_truncation)]
        let end_vector = (end as u32).div_ceil(VECTOR_SIZE);
        let range = &mut self.dirty[type_index.index()];
        range.low_vector = range.low_vector.min(byte_offset / VECTOR_SIZE);
        range.high_vector = range.high_vector.max(end_vector);
        Ok(())
    }

    /// Upload the dirty range of every packed global array the program uses
    ///
    /// `uniforms` (program locations) and `arrays` (compiler sizes) are
    /// parallel lists. Every range is reset to empty afterwards.
    pub fn commit_packed_globals<D: GlDriver>(
        &mut self,
        driver: &mut D,
        uniforms: &[PackedUniform],
        arrays: &[PackedArrayInfo],
    ) {
        for (uniform, array) in uniforms.iter().zip(arrays) {
            let range = self.dirty[uniform.type_index.index()];
            if !range.is_dirty() {
                continue;
            }
            let num_vectors = array.size / VECTOR_SIZE;
            let count = (range.high_vector - range.low_vector).min(num_vectors.saturating_sub(range.low_vector));
            if count == 0 {
                continue;
            }
            let start = range.low_vector as usize * VECTOR_WORDS;
            let words = &self.globals[uniform.type_index.index()][start..start + count as usize * VECTOR_WORDS];
            // Offsets into a packed array are bounded by its size
            #[allow(clippy::cast_possible_wrap)]
            let location = uniform.location + range.low_vector as i32;
            upload(driver, uniform.type_index, location, words);
        }

        let reset = DirtyRange { low_vector: self.array_size / VECTOR_SIZE, high_vector: 0 };
        self.dirty = [reset; PackedTypeIndex::COUNT];
    }

    /// Bring emulated uniform buffers into the packed arrays
    ///
    /// `buffers` holds the contents and unique id of each bound slot (`None`
    /// when unbound) for the stage's declared uniform buffers.
    pub fn commit_packed_uniform_buffers<D: GlDriver>(
        &mut self,
        driver: &mut D,
        bindings: &ShaderBindings,
        stage_uniforms: &mut StageUniforms,
        buffers: &[Option<(&[u32], u64)>],
    ) -> RhiResult<()> {
        if bindings.num_uniform_buffers == 0 {
            return Ok(());
        }

        if bindings.flatten_uniform_buffers {
            for copy in &bindings.uniform_buffer_copy_info {
                let (source, _) = bound_buffer(buffers, copy.source_uniform_buffer)?;
                let dest = &mut self.globals[copy.dest_type_index.index()];
                copy_words(source, copy.source_offset, dest, copy.dest_offset, copy.size)?;

                let low = copy.dest_offset / VECTOR_WORDS as u32;
                let high = (copy.dest_offset + copy.size).div_ceil(VECTOR_WORDS as u32);
                let range = &mut self.dirty[copy.dest_type_index.index()];
                range.low_vector = range.low_vector.min(low);
                range.high_vector = range.high_vector.max(high);
            }
            return Ok(());
        }

        let slots = bindings.num_uniform_buffers as usize;
        if stage_uniforms.last_emulated_uniform_buffers.len() < slots {
            stage_uniforms.last_emulated_uniform_buffers.resize(slots, 0);
        }

        for slot in 0..bindings.num_uniform_buffers {
            let (source, unique_id) = bound_buffer(buffers, slot)?;
            let last = &mut stage_uniforms.last_emulated_uniform_buffers[slot as usize];
            if *last == unique_id {
                continue;
            }
            *last = unique_id;

            for copy in bindings
                .uniform_buffer_copy_info
                .iter()
                .filter(|copy| copy.source_uniform_buffer == slot)
            {
                let dest = &mut self.scratch[copy.dest_type_index.index()];
                copy_words(source, copy.source_offset, dest, copy.dest_offset, copy.size)?;
            }

            let locations = stage_uniforms.packed_uniform_buffers.get(slot as usize);
            let arrays = bindings.packed_uniform_buffers.get(slot as usize);
            if let (Some(locations), Some(arrays)) = (locations, arrays) {
                for (uniform, array) in locations.iter().zip(arrays) {
                    let words = ((array.size / VECTOR_SIZE) as usize * VECTOR_WORDS)
                        .min(self.scratch[uniform.type_index.index()].len());
                    upload(driver, uniform.type_index, uniform.location, &self.scratch[uniform.type_index.index()][..words]);
                }
            }
        }
        Ok(())
    }
}

fn bound_buffer<'a>(buffers: &[Option<(&'a [u32], u64)>], slot: u32) -> RhiResult<(&'a [u32], u64)> {
    buffers.get(slot as usize).copied().flatten().ok_or_else(|| {
        RhiError::ContractViolation(format!("emulated uniform buffer slot {slot} has no buffer bound"))
    })
}

fn copy_words(source: &[u32], source_offset: u32, dest: &mut [u32], dest_offset: u32, size: u32) -> RhiResult<()> {
    let source_range = source_offset as usize..(source_offset + size) as usize;
    let dest_range = dest_offset as usize..(dest_offset + size) as usize;
    let (Some(from), Some(to)) = (source.get(source_range), dest.get_mut(dest_range)) else {
        return Err(RhiError::ContractViolation(format!(
            "uniform buffer copy of {size} words ({source_offset} -> {dest_offset}) is out of bounds"
        )));
    };
    to.copy_from_slice(from);
    Ok(())
}

fn upload<D: GlDriver>(driver: &mut D, type_index: PackedTypeIndex, location: i32, words: &[u32]) {
    match type_index {
        PackedTypeIndex::HighP | PackedTypeIndex::MediumP | PackedTypeIndex::LowP => {
            driver.uniform_4fv(location, bytemuck::cast_slice(words));
        }
        PackedTypeIndex::Int => driver.uniform_4iv(location, bytemuck::cast_slice(words)),
        PackedTypeIndex::Uint => driver.uniform_4uiv(location, words),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rhi::driver::{GlCall, RecordingDriver};
    use crate::rhi::resources::UniformBufferCopyInfo;

    fn highp_program(location: i32, size: u32) -> (Vec<PackedUniform>, Vec<PackedArrayInfo>) {
        (
            vec![PackedUniform { location, type_index: PackedTypeIndex::HighP }],
            vec![PackedArrayInfo { type_index: PackedTypeIndex::HighP, size }],
        )
    }

    #[test]
    fn test_set_widens_dirty_range() {
        let mut cache = ShaderParameterCache::new(256);
        let (uniforms, arrays) = highp_program(0, 256);
        let mut driver = RecordingDriver::new();
        cache.commit_packed_globals(&mut driver, &uniforms, &arrays);
        assert!(!cache.dirty_range(PackedTypeIndex::HighP).is_dirty());

        cache.set(PackedTypeIndex::HighP, 36, &[0; 8]).expect("Should write parameter");
        assert_eq!(cache.dirty_range(PackedTypeIndex::HighP), DirtyRange { low_vector: 2, high_vector: 3 });

        cache.set(PackedTypeIndex::HighP, 64, &[0; 32]).expect("Should write parameter");
        assert_eq!(cache.dirty_range(PackedTypeIndex::HighP), DirtyRange { low_vector: 2, high_vector: 6 });
    }

    #[test]
    fn test_commit_uploads_only_dirty_vectors() {
        let mut cache = ShaderParameterCache::new(256);
        let (uniforms, arrays) = highp_program(10, 128);
        let mut driver = RecordingDriver::new();
        cache.commit_packed_globals(&mut driver, &uniforms, &arrays);
        driver.clear_calls();

        let value: [f32; 4] = [1.0, 2.0, 3.0, 4.0];
        cache
            .set(PackedTypeIndex::HighP, 32, bytemuck::cast_slice(&value))
            .expect("Should write parameter");
        cache.commit_packed_globals(&mut driver, &uniforms, &arrays);

        assert_eq!(
            driver.calls(),
            &[GlCall::Uniform4fv { location: 12, values: value.to_vec() }]
        );

        driver.clear_calls();
        cache.commit_packed_globals(&mut driver, &uniforms, &arrays);
        assert!(driver.calls().is_empty());
    }

    #[test]
    fn test_commit_clamps_to_array_size() {
        let mut cache = ShaderParameterCache::new(256);
        let (uniforms, arrays) = highp_program(0, 32);
        let mut driver = RecordingDriver::new();
        cache.commit_packed_globals(&mut driver, &uniforms, &arrays);

        match &driver.calls()[0] {
            GlCall::Uniform4fv { values, .. } => assert_eq!(values.len(), 8),
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[test]
    fn test_set_rejects_overflow() {
        let mut cache = ShaderParameterCache::new(64);
        assert!(matches!(
            cache.set(PackedTypeIndex::Int, 60, &[0; 8]),
            Err(RhiError::ContractViolation(_))
        ));
    }

    #[test]
    fn test_flattened_uniform_buffer_copies_into_globals() {
        let mut cache = ShaderParameterCache::new(128);
        let mut driver = RecordingDriver::new();
        let (uniforms, arrays) = highp_program(0, 128);
        cache.commit_packed_globals(&mut driver, &uniforms, &arrays);

        let bindings = ShaderBindings {
            num_uniform_buffers: 1,
            flatten_uniform_buffers: true,
            uniform_buffer_copy_info: vec![UniformBufferCopyInfo {
                source_uniform_buffer: 0,
                source_offset: 0,
                dest_type_index: PackedTypeIndex::HighP,
                dest_offset: 8,
                size: 4,
            }],
            ..ShaderBindings::default()
        };
        let contents = [7u32, 8, 9, 10];
        let mut stage = StageUniforms::default();
        cache
            .commit_packed_uniform_buffers(&mut driver, &bindings, &mut stage, &[Some((&contents, 1))])
            .expect("Should copy uniform buffer");

        assert_eq!(&cache.words(PackedTypeIndex::HighP)[8..12], &contents);
        assert_eq!(cache.dirty_range(PackedTypeIndex::HighP), DirtyRange { low_vector: 2, high_vector: 3 });
    }

    #[test]
    fn test_unflattened_uniform_buffer_uploads_on_change_only() {
        let mut cache = ShaderParameterCache::new(64);
        let mut driver = RecordingDriver::new();
        let bindings = ShaderBindings {
            num_uniform_buffers: 1,
            packed_uniform_buffers: vec![vec![PackedArrayInfo { type_index: PackedTypeIndex::Int, size: 16 }]],
            uniform_buffer_copy_info: vec![UniformBufferCopyInfo {
                source_uniform_buffer: 0,
                source_offset: 0,
                dest_type_index: PackedTypeIndex::Int,
                dest_offset: 0,
                size: 4,
            }],
            ..ShaderBindings::default()
        };
        let mut stage = StageUniforms {
            packed_uniform_buffers: vec![vec![PackedUniform { location: 3, type_index: PackedTypeIndex::Int }]],
            ..StageUniforms::default()
        };
        let contents = [1u32, 2, 3, 4];

        cache
            .commit_packed_uniform_buffers(&mut driver, &bindings, &mut stage, &[Some((&contents, 5))])
            .expect("Should upload uniform buffer");
        cache
            .commit_packed_uniform_buffers(&mut driver, &bindings, &mut stage, &[Some((&contents, 5))])
            .expect("Should skip unchanged uniform buffer");

        assert_eq!(driver.calls(), &[GlCall::Uniform4iv { location: 3, values: vec![1, 2, 3, 4] }]);
    }

    #[test]
    fn test_unbound_emulated_slot_is_rejected() {
        let mut cache = ShaderParameterCache::new(64);
        let mut driver = RecordingDriver::new();
        let bindings = ShaderBindings { num_uniform_buffers: 1, ..ShaderBindings::default() };
        let mut stage = StageUniforms::default();
        assert!(cache
            .commit_packed_uniform_buffers(&mut driver, &bindings, &mut stage, &[None])
            .is_err());
    }
}
