use std::path::PathBuf;

use clap::Parser;

use raytracing::config::{ConfigError, SurfaceConfig};

#[derive(Debug, Parser)]
pub struct Args {
    /// TOML file with surface settings
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Window width, overrides the config file
    #[arg(long)]
    pub width: Option<u32>,
    /// Window height, overrides the config file
    #[arg(long)]
    pub height: Option<u32>,
    /// Vertex shader source path
    #[arg(long)]
    pub vertex: Option<PathBuf>,
    /// Fragment shader source path
    #[arg(long)]
    pub fragment: Option<PathBuf>,
}

impl Args {
    pub fn surface_config(&self) -> Result<SurfaceConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => SurfaceConfig::load_from_path(path)?,
            None => SurfaceConfig::default(),
        };

        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(vertex) = &self.vertex {
            config.vertex_shader = vertex.clone();
        }
        if let Some(fragment) = &self.fragment {
            config.fragment_shader = fragment.clone();
        }

        if config.width == 0 || config.height == 0 {
            return Err(ConfigError::Dimensions(config.width, config.height));
        }

        Ok(config)
    }
}
