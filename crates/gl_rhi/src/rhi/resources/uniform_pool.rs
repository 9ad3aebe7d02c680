//! Uniform buffer recycling pool
//!
//! Uniform buffers are created and dropped at a high rate. Rather than
//! deleting their GL storage, freed buffers are parked here, bucketed by
//! rounded size and usage, and handed back out for later allocations.
//!
//! ```text
//! release() ──► pending (safe_frames) ──► free buckets ──► acquire()
//!                                            │
//!                                            └─ idle > max_idle_frames ──► deleted
//! ```
//!
//! A freed buffer may still be referenced by commands in flight, so it only
//! becomes reusable after `safe_frames` frames.

use std::collections::HashMap;

use crate::config::UniformBufferPoolConfig;
use crate::rhi::types::GlName;

/// Smallest bucket size in bytes
const MIN_BUCKET_SIZE: u32 = 16;

/// A GL buffer owned by the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PooledUniformBuffer {
    /// Driver name
    pub name: GlName,
    /// Size of the GL allocation
    pub allocated_size: u32,
    /// Frame the buffer was returned to the pool
    freed_frame: u64,
}

/// Uniform buffer pool bucketed by size and usage
#[derive(Debug)]
pub struct UniformBufferPool {
    safe_frames: u64,
    max_idle_frames: u64,
    frame: u64,
    pending: Vec<(bool, PooledUniformBuffer)>,
    free: HashMap<(u32, bool), Vec<PooledUniformBuffer>>,
}

impl UniformBufferPool {
    /// Create an empty pool
    pub fn new(config: &UniformBufferPoolConfig) -> Self {
        Self {
            safe_frames: u64::from(config.safe_frames),
            max_idle_frames: u64::from(config.max_idle_frames),
            frame: 0,
            pending: Vec::new(),
            free: HashMap::new(),
        }
    }

    /// Allocation size used for a requested size
    pub fn bucket_size(size: u32) -> u32 {
        size.max(MIN_BUCKET_SIZE).next_power_of_two()
    }

    /// Take a reusable buffer for `size` bytes, if one is available
    pub fn acquire(&mut self, size: u32, stream_draw: bool) -> Option<PooledUniformBuffer> {
        let bucket = Self::bucket_size(size);
        self.free.get_mut(&(bucket, stream_draw)).and_then(Vec::pop)
    }

    /// Return a buffer's storage to the pool
    pub fn release(&mut self, name: GlName, allocated_size: u32, stream_draw: bool) {
        if name == 0 {
            return;
        }
        log::trace!("Uniform buffer {} ({} bytes) returned to pool", name, allocated_size);
        self.pending.push((
            stream_draw,
            PooledUniformBuffer {
                name,
                allocated_size,
                freed_frame: self.frame,
            },
        ));
    }

    /// Advance one frame
    ///
    /// Promotes buffers that have waited `safe_frames` and returns the names of
    /// buffers idle longer than `max_idle_frames`, which the caller deletes.
    pub fn begin_frame(&mut self) -> Vec<GlName> {
        self.frame += 1;
        let frame = self.frame;
        let safe_frames = self.safe_frames;

        let (ready, waiting): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .partition(|(_, buffer)| frame.saturating_sub(buffer.freed_frame) >= safe_frames);
        self.pending = waiting;
        for (stream_draw, buffer) in ready {
            self.free
                .entry((buffer.allocated_size, stream_draw))
                .or_default()
                .push(buffer);
        }

        let max_idle = self.max_idle_frames;
        let mut expired = Vec::new();
        for buffers in self.free.values_mut() {
            buffers.retain(|buffer| {
                let keep = frame.saturating_sub(buffer.freed_frame) <= max_idle;
                if !keep {
                    expired.push(buffer.name);
                }
                keep
            });
        }
        self.free.retain(|_, buffers| !buffers.is_empty());

        if !expired.is_empty() {
            log::debug!("Uniform buffer pool cleanup deleted {} idle buffers", expired.len());
        }
        expired
    }

    /// Remove every buffer from the pool, returning the names to delete
    pub fn drain(&mut self) -> Vec<GlName> {
        let mut names: Vec<GlName> = self.pending.drain(..).map(|(_, buffer)| buffer.name).collect();
        names.extend(self.free.drain().flat_map(|(_, buffers)| buffers).map(|buffer| buffer.name));
        names
    }

    /// Buffers that can be handed out right now
    pub fn available_count(&self) -> usize {
        self.free.values().map(Vec::len).sum()
    }

    /// Buffers waiting out their safe frames
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> UniformBufferPool {
        UniformBufferPool::new(&UniformBufferPoolConfig { safe_frames: 2, max_idle_frames: 5 })
    }

    #[test]
    fn test_bucket_sizes() {
        assert_eq!(UniformBufferPool::bucket_size(1), 16);
        assert_eq!(UniformBufferPool::bucket_size(16), 16);
        assert_eq!(UniformBufferPool::bucket_size(17), 32);
        assert_eq!(UniformBufferPool::bucket_size(1000), 1024);
    }

    #[test]
    fn test_buffer_reusable_after_safe_frames() {
        let mut pool = pool();
        pool.release(9, 256, false);
        assert_eq!(pool.pending_count(), 1);

        pool.begin_frame();
        assert!(pool.acquire(200, false).is_none());

        pool.begin_frame();
        assert!(pool.acquire(200, true).is_none(), "usage buckets are separate");
        let buffer = pool.acquire(200, false).expect("Should reuse pooled buffer");
        assert_eq!(buffer.name, 9);
        assert_eq!(pool.available_count(), 0);
    }

    #[test]
    fn test_idle_buffers_expire() {
        let mut pool = pool();
        pool.release(4, 64, true);
        let mut expired = Vec::new();
        for _ in 0..8 {
            expired.extend(pool.begin_frame());
        }
        assert_eq!(expired, vec![4]);
        assert_eq!(pool.available_count(), 0);
    }

    #[test]
    fn test_drain_returns_everything() {
        let mut pool = pool();
        pool.release(1, 16, false);
        pool.release(2, 32, true);
        pool.begin_frame();
        pool.begin_frame();
        pool.release(3, 16, false);

        let mut names = pool.drain();
        names.sort_unstable();
        assert_eq!(names, vec![1, 2, 3]);
    }
}
