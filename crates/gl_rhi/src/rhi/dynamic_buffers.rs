//! Streamed dynamic buffer rings
//!
//! Immediate-mode draws write their vertices and indices into regions locked
//! from a small ring of streamed buffers. Each lock hands out the next
//! 16-byte aligned range of the current buffer; when a request does not fit,
//! the ring advances to the next buffer and orphans it so the driver never
//! has to wait on a range the GPU may still be reading.
//!
//! ```text
//! lock(size) ──► staging bytes ──► unlock() ──► buffer_sub_data(offset)
//!     │
//!     └─ no room ──► next buffer, buffer_data(orphan) ──► offset 0
//! ```

use crate::rhi::driver::GlDriver;
use crate::rhi::state::{ContextState, NameGenerations};
use crate::rhi::types::{BufferBindingTarget, BufferUsageHint, GlName};
use crate::rhi::{RhiError, RhiResult};

/// Alignment of every region handed out
const REGION_ALIGNMENT: usize = 16;

/// Location of an uploaded region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingRegion {
    /// Buffer holding the region
    pub name: GlName,
    /// Byte offset of the region inside the buffer
    pub offset: usize,
}

#[derive(Debug, Clone, Copy)]
struct RingBuffer {
    name: GlName,
    size: usize,
}

#[derive(Debug, Clone, Copy)]
struct RingLock {
    buffer: usize,
    offset: usize,
    size: usize,
}

/// # Dynamic Buffer Ring
///
/// A fixed number of streamed buffers bound to one target, used round-robin.
///
/// ## Design Notes
///
/// Writes go to a CPU staging area and are uploaded with a single
/// `buffer_sub_data` at unlock, so the ring works on drivers without buffer
/// mapping. At most one region is locked at a time.
#[derive(Debug)]
pub struct DynamicBufferRing {
    target: BufferBindingTarget,
    count: usize,
    min_size: usize,
    buffers: Vec<RingBuffer>,
    current: usize,
    offset: usize,
    lock: Option<RingLock>,
    staging: Vec<u8>,
}

impl DynamicBufferRing {
    /// Describe a ring of `count` buffers of at least `min_size` bytes
    ///
    /// No GL objects exist until [`Self::init`].
    pub fn new(target: BufferBindingTarget, count: u32, min_size: u32) -> Self {
        Self {
            target,
            count: count.max(1) as usize,
            min_size: min_size as usize,
            buffers: Vec::new(),
            current: 0,
            offset: 0,
            lock: None,
            staging: Vec::new(),
        }
    }

    /// Create the ring's buffers
    pub fn init<D: GlDriver>(&mut self, driver: &mut D, context: &mut ContextState, generations: &NameGenerations) {
        if !self.buffers.is_empty() {
            return;
        }
        for _ in 0..self.count {
            let name = driver.gen_buffer();
            context.cached_bind_buffer(driver, generations, self.target, name);
            driver.buffer_data(self.target, self.min_size, None, BufferUsageHint::StreamDraw);
            self.buffers.push(RingBuffer { name, size: self.min_size });
        }
        self.current = 0;
        self.offset = 0;
        log::info!(
            "Created {:?} dynamic buffer ring: {} x {} bytes",
            self.target,
            self.count,
            self.min_size
        );
    }

    /// Whether [`Self::init`] created the buffers
    pub fn is_initialized(&self) -> bool {
        !self.buffers.is_empty()
    }

    /// Whether a region is currently locked
    pub const fn is_locked(&self) -> bool {
        self.lock.is_some()
    }

    /// Lock `size` writable bytes
    ///
    /// Returns where the region will live once unlocked together with the
    /// bytes to fill.
    pub fn lock<D: GlDriver>(
        &mut self,
        driver: &mut D,
        context: &mut ContextState,
        generations: &NameGenerations,
        size: usize,
    ) -> RhiResult<(RingRegion, &mut [u8])> {
        if self.lock.is_some() {
            return Err(RhiError::ContractViolation(format!(
                "{:?} dynamic buffer locked twice",
                self.target
            )));
        }
        if self.buffers.is_empty() {
            return Err(RhiError::ContractViolation(format!(
                "{:?} dynamic buffer ring used before initialization",
                self.target
            )));
        }

        let mut offset = self.offset.next_multiple_of(REGION_ALIGNMENT);
        if offset + size > self.buffers[self.current].size {
            self.current = (self.current + 1) % self.buffers.len();
            offset = 0;

            let buffer = &mut self.buffers[self.current];
            buffer.size = buffer.size.max(size);
            context.cached_bind_buffer(driver, generations, self.target, buffer.name);
            driver.buffer_data(self.target, buffer.size, None, BufferUsageHint::StreamDraw);
            log::trace!("Dynamic {:?} ring advanced to buffer {} ({} bytes)", self.target, buffer.name, buffer.size);
        }

        self.lock = Some(RingLock { buffer: self.current, offset, size });
        self.offset = offset + size;
        self.staging.clear();
        self.staging.resize(size, 0);

        let region = RingRegion { name: self.buffers[self.current].name, offset };
        Ok((region, self.staging.as_mut_slice()))
    }

    /// Upload the locked region
    pub fn unlock<D: GlDriver>(
        &mut self,
        driver: &mut D,
        context: &mut ContextState,
        generations: &NameGenerations,
    ) -> RhiResult<RingRegion> {
        let lock = self.lock.take().ok_or_else(|| {
            RhiError::ContractViolation(format!("{:?} dynamic buffer unlocked without a lock", self.target))
        })?;
        let name = self.buffers[lock.buffer].name;

        context.cached_bind_buffer(driver, generations, self.target, name);
        if lock.size > 0 {
            driver.buffer_sub_data(self.target, lock.offset, &self.staging[..lock.size]);
        }
        Ok(RingRegion { name, offset: lock.offset })
    }

    /// Forget every buffer, returning the names to delete
    pub fn drain(&mut self) -> Vec<GlName> {
        self.lock = None;
        self.current = 0;
        self.offset = 0;
        self.staging = Vec::new();
        self.buffers.drain(..).map(|buffer| buffer.name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rhi::capabilities::GraphicsBackendCapabilities;
    use crate::rhi::driver::{GlCall, RecordingDriver};

    struct Fixture {
        driver: RecordingDriver,
        context: ContextState,
        generations: NameGenerations,
        ring: DynamicBufferRing,
    }

    fn fixture(count: u32, min_size: u32) -> Fixture {
        let mut driver = RecordingDriver::new();
        let mut context = ContextState::new(&GraphicsBackendCapabilities::desktop_gl4());
        let generations = NameGenerations::new();
        let mut ring = DynamicBufferRing::new(BufferBindingTarget::Array, count, min_size);
        ring.init(&mut driver, &mut context, &generations);
        driver.clear_calls();
        Fixture { driver, context, generations, ring }
    }

    #[test]
    fn test_init_creates_streamed_buffers() {
        let mut driver = RecordingDriver::new();
        let mut context = ContextState::new(&GraphicsBackendCapabilities::desktop_gl4());
        let mut ring = DynamicBufferRing::new(BufferBindingTarget::ElementArray, 3, 1024);
        ring.init(&mut driver, &mut context, &NameGenerations::new());

        assert!(ring.is_initialized());
        assert_eq!(driver.count(|call| matches!(call, GlCall::GenBuffer(_))), 3);
        assert_eq!(
            driver.count(|call| matches!(
                call,
                GlCall::BufferData { size: 1024, initialized: false, usage: BufferUsageHint::StreamDraw, .. }
            )),
            3
        );
    }

    #[test]
    fn test_regions_advance_and_align() {
        let mut f = fixture(2, 256);
        let (first, bytes) = f.ring.lock(&mut f.driver, &mut f.context, &f.generations, 20).expect("Should lock");
        bytes.fill(7);
        f.ring.unlock(&mut f.driver, &mut f.context, &f.generations).expect("Should unlock");

        let (second, _) = f.ring.lock(&mut f.driver, &mut f.context, &f.generations, 8).expect("Should lock");
        f.ring.unlock(&mut f.driver, &mut f.context, &f.generations).expect("Should unlock");

        assert_eq!(first.offset, 0);
        assert_eq!(second.offset, 32);
        assert_eq!(first.name, second.name);
        assert!(f.driver.calls().contains(&GlCall::BufferSubData {
            target: BufferBindingTarget::Array,
            offset: 0,
            data: vec![7; 20],
        }));
    }

    #[test]
    fn test_full_buffer_moves_to_next_and_orphans() {
        let mut f = fixture(2, 64);
        let (first, _) = f.ring.lock(&mut f.driver, &mut f.context, &f.generations, 48).expect("Should lock");
        f.ring.unlock(&mut f.driver, &mut f.context, &f.generations).expect("Should unlock");
        f.driver.clear_calls();

        let (second, _) = f.ring.lock(&mut f.driver, &mut f.context, &f.generations, 100).expect("Should lock");
        assert_ne!(first.name, second.name);
        assert_eq!(second.offset, 0);
        assert!(f.driver.calls().contains(&GlCall::BufferData {
            target: BufferBindingTarget::Array,
            size: 100,
            initialized: false,
            usage: BufferUsageHint::StreamDraw,
        }));
    }

    #[test]
    fn test_double_lock_is_rejected() {
        let mut f = fixture(1, 64);
        f.ring.lock(&mut f.driver, &mut f.context, &f.generations, 4).expect("Should lock");
        let error = f.ring.lock(&mut f.driver, &mut f.context, &f.generations, 4).unwrap_err();
        assert!(matches!(error, RhiError::ContractViolation(_)));
    }

    #[test]
    fn test_unlock_without_lock_is_rejected() {
        let mut f = fixture(1, 64);
        assert!(f.ring.unlock(&mut f.driver, &mut f.context, &f.generations).is_err());
    }

    #[test]
    fn test_drain_returns_names() {
        let mut f = fixture(3, 64);
        let names = f.ring.drain();
        assert_eq!(names.len(), 3);
        assert!(!f.ring.is_initialized());
    }
}
