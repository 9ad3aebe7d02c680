//! Configuration system
//!
//! Device configuration is plain serde data that can be loaded from `.toml`
//! or `.ron` files, so a capability preset can be pinned per platform without
//! touching code.

pub use serde::{Serialize, Deserialize};

pub mod rhi_config;

pub use rhi_config::{DynamicBufferConfig, RhiConfig, UniformBufferPoolConfig};

use std::path::Path;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    ///
    /// The format is picked from the file extension.
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;

        match format {
            ConfigFormat::Toml => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            ConfigFormat::Ron => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match ConfigFormat::from_path(path)? {
            ConfigFormat::Toml => toml::to_string_pretty(self)
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
            ConfigFormat::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// On-disk formats understood by [`Config`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Toml,
    Ron,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_extension_is_rejected() {
        let result = RhiConfig::load_from_file("device.json");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_toml_round_trip_through_disk() {
        let path = std::env::temp_dir().join(format!("gl_rhi_config_{}.toml", std::process::id()));
        let config = RhiConfig::default().with_skip_compute(true);

        config.save_to_file(&path).expect("Should save config");
        let loaded = RhiConfig::load_from_file(&path).expect("Should load config");
        let _ = std::fs::remove_file(&path);

        assert!(loaded.skip_compute);
        assert_eq!(loaded.capabilities, config.capabilities);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let path = std::env::temp_dir().join(format!("gl_rhi_config_{}.ron", std::process::id()));
        std::fs::write(&path, "(skip_compute: true)").expect("Should write config");

        let loaded = RhiConfig::load_from_file(&path).expect("Should load partial config");
        let _ = std::fs::remove_file(&path);

        assert!(loaded.skip_compute);
        assert_eq!(loaded.dynamic_buffers, DynamicBufferConfig::default());
    }

    #[test]
    fn test_demo_profiles_load() {
        let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../rhi_demo/config");

        let es2 = RhiConfig::load_from_file(dir.join("es2.ron")).expect("Should load es2 profile");
        assert_eq!(es2.capabilities, crate::rhi::GraphicsBackendCapabilities::es2());
        assert!(es2.validate().is_ok());

        let desktop = RhiConfig::load_from_file(dir.join("desktop.toml")).expect("Should load desktop profile");
        assert_eq!(desktop.capabilities, crate::rhi::GraphicsBackendCapabilities::desktop_gl4());
        assert_eq!(desktop.dynamic_buffers.buffer_count, 3);
        assert!(desktop.validate().is_ok());
    }
}
