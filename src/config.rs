use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SurfaceConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    #[serde(rename = "vertex")]
    pub vertex_shader: PathBuf,
    #[serde(rename = "fragment")]
    pub fragment_shader: PathBuf,
    pub clear_color: [f32; 4],
    /// Requested OpenGL core version as `(major, minor)`.
    pub gl_version: (u8, u8),
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "Ray Tracing".to_string(),
            vertex_shader: PathBuf::from("shaders/shader.vert"),
            fragment_shader: PathBuf::from("shaders/shader.frag"),
            clear_color: [0.1, 0.3, 0.8, 0.5],
            gl_version: (3, 3),
        }
    }
}

impl SurfaceConfig {
    pub fn from_toml(src: &str) -> Result<Self, ConfigError> {
        let config: SurfaceConfig = toml::from_str(src)?;

        if config.width == 0 || config.height == 0 {
            return Err(ConfigError::Dimensions(config.width, config.height));
        }

        Ok(config)
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let src = std::fs::read_to_string(path)?;

        Self::from_toml(&src)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file: {0}")]
    Input(#[from] std::io::Error),
    #[error("Invalid config structure: {0}")]
    Format(#[from] toml::de::Error),
    #[error("Invalid window size {0}x{1}")]
    Dimensions(u32, u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(SurfaceConfig::from_toml("").unwrap(), SurfaceConfig::default());
    }

    #[test]
    fn partial_override() {
        let config = SurfaceConfig::from_toml(
            r#"
            width = 800
            height = 600
            fragment = "shaders/tracer.frag"
            clear_color = [0.0, 0.0, 0.0, 1.0]
            "#,
        )
        .unwrap();

        assert_eq!((config.width, config.height), (800, 600));
        assert_eq!(config.fragment_shader, PathBuf::from("shaders/tracer.frag"));
        assert_eq!(config.vertex_shader, PathBuf::from("shaders/shader.vert"));
        assert_eq!(config.clear_color, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn zero_size_is_rejected() {
        assert!(matches!(
            SurfaceConfig::from_toml("width = 0"),
            Err(ConfigError::Dimensions(0, 720))
        ));
    }

    #[test]
    fn wrong_type_is_a_format_error() {
        assert!(matches!(
            SurfaceConfig::from_toml("width = \"wide\""),
            Err(ConfigError::Format(_))
        ));
    }
}
