//! # Device Configuration
//!
//! Everything the OpenGL RHI reads at device creation lives here: the
//! capability set queried from the driver, sizes for the streamed dynamic
//! buffers, uniform buffer pool timing, and a couple of debug switches.
//!
//! ## Design Goals
//!
//! - **Serializable**: Loadable from TOML or RON through [`Config`]
//! - **Partial files**: Every section defaults, so a file only names what it overrides
//! - **Validated**: [`RhiConfig::validate`] runs before the device is built

use serde::{Serialize, Deserialize};

use crate::config::Config;
use crate::rhi::capabilities::GraphicsBackendCapabilities;

/// # Dynamic Buffer Configuration
///
/// Sizing for the streamed vertex and index rings used by immediate-mode
/// draws when the driver supports fast buffer data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicBufferConfig {
    /// Number of buffers in each ring
    pub buffer_count: u32,
    /// Minimum size in bytes of each vertex ring buffer
    pub vertex_buffer_size: u32,
    /// Minimum size in bytes of each index ring buffer
    pub index_buffer_size: u32,
}

impl Default for DynamicBufferConfig {
    fn default() -> Self {
        Self {
            buffer_count: 4,
            vertex_buffer_size: 256 * 1024,
            index_buffer_size: 64 * 1024,
        }
    }
}

/// # Uniform Buffer Pool Configuration
///
/// Controls how long freed uniform buffers wait before reuse and how long an
/// idle pooled buffer survives before its GL name is deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniformBufferPoolConfig {
    /// Frames a freed buffer waits before it can be handed out again
    pub safe_frames: u32,
    /// Frames an unused pooled buffer is kept before deletion
    pub max_idle_frames: u32,
}

impl Default for UniformBufferPoolConfig {
    fn default() -> Self {
        Self {
            safe_frames: 3,
            max_idle_frames: 30,
        }
    }
}

/// # RHI Configuration
///
/// Top-level configuration handed to [`crate::rhi::OpenGlRhi::new`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RhiConfig {
    /// Size of the zero-filled buffer bound to unused uniform buffer slots
    pub dummy_uniform_buffer_size: u32,
    /// Debug switch: turn compute shader binding and dispatch into no-ops
    pub skip_compute: bool,
    /// Driver capabilities; normally filled from a preset or a driver query
    pub capabilities: GraphicsBackendCapabilities,
    /// Streamed dynamic buffer sizing
    pub dynamic_buffers: DynamicBufferConfig,
    /// Uniform buffer recycling
    pub uniform_buffer_pool: UniformBufferPoolConfig,
}

impl RhiConfig {
    /// Create a configuration for the given capability set
    pub fn new(capabilities: GraphicsBackendCapabilities) -> Self {
        Self {
            capabilities,
            ..Self::default()
        }
    }

    /// Set the compute skip switch
    #[must_use]
    pub fn with_skip_compute(mut self, skip: bool) -> Self {
        self.skip_compute = skip;
        self
    }

    /// Override the dynamic buffer sizing
    #[must_use]
    pub fn with_dynamic_buffers(mut self, dynamic_buffers: DynamicBufferConfig) -> Self {
        self.dynamic_buffers = dynamic_buffers;
        self
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        self.capabilities.validate()?;

        if self.dynamic_buffers.buffer_count == 0 {
            return Err("Dynamic buffer ring needs at least one buffer".to_string());
        }
        if self.dynamic_buffers.vertex_buffer_size == 0 || self.dynamic_buffers.index_buffer_size == 0 {
            return Err("Dynamic buffer sizes must be non-zero".to_string());
        }
        if self.dummy_uniform_buffer_size == 0 || self.dummy_uniform_buffer_size % 16 != 0 {
            return Err(format!(
                "Dummy uniform buffer size must be a non-zero multiple of 16, got {}",
                self.dummy_uniform_buffer_size
            ));
        }
        if self.uniform_buffer_pool.max_idle_frames < self.uniform_buffer_pool.safe_frames {
            return Err("Uniform buffer pool idle limit must not be shorter than the safe frame count".to_string());
        }
        Ok(())
    }
}

impl Default for RhiConfig {
    fn default() -> Self {
        Self {
            dummy_uniform_buffer_size: 64 * 1024,
            skip_compute: false,
            capabilities: GraphicsBackendCapabilities::default(),
            dynamic_buffers: DynamicBufferConfig::default(),
            uniform_buffer_pool: UniformBufferPoolConfig::default(),
        }
    }
}

impl Config for RhiConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RhiConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_ring() {
        let config = RhiConfig::default().with_dynamic_buffers(DynamicBufferConfig {
            buffer_count: 0,
            ..DynamicBufferConfig::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unaligned_dummy_buffer() {
        let config = RhiConfig {
            dummy_uniform_buffer_size: 100,
            ..RhiConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
