//! GPU work accounting
//!
//! Every draw, dispatch and clear registers the work it submitted. The counts
//! are kept per frame and reset by [`GpuProfiler::end_frame`], which also
//! latches the GPU frame time reported by the driver.

use std::collections::HashMap;

use crate::rhi::types::PrimitiveType;

/// Draw calls and primitives submitted for one primitive type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrimitiveStats {
    /// Draw calls
    pub draw_calls: u32,
    /// Primitives, counting every instance
    pub primitives: u64,
}

/// Work submitted during one frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Calls that registered work (draws, dispatches, clears)
    pub work_items: u32,
    /// Primitives submitted
    pub primitives: u64,
    /// Vertices submitted
    pub vertices: u64,
    /// Draw calls per primitive type
    pub draw_calls: HashMap<PrimitiveType, PrimitiveStats>,
}

impl FrameStats {
    /// Draw calls across every primitive type
    pub fn total_draw_calls(&self) -> u32 {
        self.draw_calls.values().map(|stats| stats.draw_calls).sum()
    }
}

/// Per-frame GPU work counters
#[derive(Debug, Default)]
pub struct GpuProfiler {
    frame: FrameStats,
    last_frame: FrameStats,
    gpu_frame_cycles: u32,
    frames: u64,
}

impl GpuProfiler {
    /// Create a profiler with empty counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for submitted work
    pub fn register_gpu_work(&mut self, primitives: u32, vertices: u32) {
        self.frame.work_items += 1;
        self.frame.primitives += u64::from(primitives);
        self.frame.vertices += u64::from(vertices);
    }

    /// Account for one draw call of `primitives` primitives
    pub fn register_draw_call(&mut self, primitive_type: PrimitiveType, primitives: u32) {
        let stats = self.frame.draw_calls.entry(primitive_type).or_default();
        stats.draw_calls += 1;
        stats.primitives += u64::from(primitives);
    }

    /// Counters of the frame in progress
    pub const fn current_frame(&self) -> &FrameStats {
        &self.frame
    }

    /// Counters of the last completed frame
    pub const fn last_frame(&self) -> &FrameStats {
        &self.last_frame
    }

    /// GPU time of the last completed frame, in platform timer cycles
    pub const fn gpu_frame_cycles(&self) -> u32 {
        self.gpu_frame_cycles
    }

    /// Frames completed
    pub const fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Close the frame
    ///
    /// `gpu_frame_cycles` is the driver's timing for the frame, `None` when
    /// the query has no result yet; the previous value is kept then.
    pub fn end_frame(&mut self, gpu_frame_cycles: Option<u32>) {
        if let Some(cycles) = gpu_frame_cycles {
            self.gpu_frame_cycles = cycles;
        }
        self.frames += 1;
        log::debug!(
            "Frame {}: {} draw calls, {} primitives, {} vertices, {} GPU cycles",
            self.frames,
            self.frame.total_draw_calls(),
            self.frame.primitives,
            self.frame.vertices,
            self.gpu_frame_cycles
        );
        self.last_frame = std::mem::take(&mut self.frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_accumulates_until_end_frame() {
        let mut profiler = GpuProfiler::new();
        profiler.register_gpu_work(2, 6);
        profiler.register_gpu_work(0, 0);
        profiler.register_draw_call(PrimitiveType::TriangleList, 2);
        profiler.register_draw_call(PrimitiveType::TriangleList, 4);
        profiler.register_draw_call(PrimitiveType::LineList, 1);

        let frame = profiler.current_frame();
        assert_eq!(frame.work_items, 2);
        assert_eq!(frame.primitives, 2);
        assert_eq!(frame.vertices, 6);
        assert_eq!(frame.total_draw_calls(), 3);
        assert_eq!(frame.draw_calls[&PrimitiveType::TriangleList].primitives, 6);

        profiler.end_frame(Some(1234));
        assert_eq!(profiler.current_frame(), &FrameStats::default());
        assert_eq!(profiler.last_frame().vertices, 6);
        assert_eq!(profiler.gpu_frame_cycles(), 1234);
        assert_eq!(profiler.frame_count(), 1);
    }

    #[test]
    fn test_missing_timing_keeps_previous_value() {
        let mut profiler = GpuProfiler::new();
        profiler.end_frame(Some(50));
        profiler.end_frame(None);
        assert_eq!(profiler.gpu_frame_cycles(), 50);
    }
}
