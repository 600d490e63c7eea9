//! Configuration system
//!
//! Configuration types are plain serde structs; implementing [`Config`] gives
//! them file loading and saving with the format chosen by file extension
//! (`.toml` or `.ron`).

use std::path::Path;

pub use serde::{Serialize, Deserialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        match extension_of(path) {
            Some("toml") => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            Some("ron") => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Load configuration from file, or fall back to defaults when no path is given
    fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                log::info!("Loading configuration from {}", path.display());
                Self::load_from_file(path)
            }
            None => {
                log::info!("No configuration file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match extension_of(path) {
            Some("toml") => toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?,
            Some("ron") => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
            _ => return Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

fn extension_of(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
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

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Sample {
        title: String,
        exposure: f32,
    }

    impl Default for Sample {
        fn default() -> Self {
            Self { title: "sample".to_string(), exposure: 1.0 }
        }
    }

    impl Config for Sample {}

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("render_engine_config_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_toml_and_ron_round_trip() {
        let sample = Sample { title: "panel".to_string(), exposure: 2.5 };

        for name in ["cfg.toml", "cfg.ron"] {
            let path = temp_path(name);
            sample.save_to_file(&path).unwrap();
            let loaded = Sample::load_from_file(&path).unwrap();
            assert_eq!(loaded, sample);
            let _ = std::fs::remove_file(&path);
        }
    }

    #[test]
    fn test_unsupported_extension() {
        let path = temp_path("cfg.json");
        std::fs::write(&path, "{}").unwrap();
        let result = Sample::load_from_file(&path);
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let path = temp_path("partial.toml");
        std::fs::write(&path, "exposure = 3.0\n").unwrap();
        let loaded = Sample::load_from_file(&path).unwrap();
        assert_eq!(loaded.title, "sample");
        assert_eq!(loaded.exposure, 3.0);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_or_default_without_path() {
        let loaded = Sample::load_or_default(None).unwrap();
        assert_eq!(loaded, Sample::default());
    }
}
