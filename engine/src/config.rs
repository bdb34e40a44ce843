use std::fs;
use std::path::{Path, PathBuf};

use log::*;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, RenderError, Result};

pub const DEFAULT_WIDTH: u32 = 720;
pub const DEFAULT_HEIGHT: u32 = 480;
pub const DEFAULT_TITLE: &str = "vulkan-hello-triangle";
pub const DEFAULT_CLEAR_COLOR: [f32; 4] = [0.0, 0.5, 0.5, 1.0];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            title: DEFAULT_TITLE.to_string(),
        }
    }
}

/// Everything the renderer reads at startup. The defaults reproduce the
/// fixed demo: a 720x480 window cleared to teal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub window: WindowConfig,
    pub clear_color: [f32; 4],
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
    /// Enables `VK_LAYER_KHRONOS_validation` and the debug messenger.
    pub validation: bool,
    /// Reads every uploaded buffer back and compares it with its source.
    pub verify_uploads: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            clear_color: DEFAULT_CLEAR_COLOR,
            vertex_shader: PathBuf::from("./shader.vert.spv"),
            fragment_shader: PathBuf::from("./shader.frag.spv"),
            validation: cfg!(debug_assertions),
            verify_uploads: cfg!(debug_assertions),
        }
    }
}

impl RendererConfig {
    /// Loads a TOML config file, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                info!("Loading configuration from `{}`.", path.display());
                let contents = fs::read_to_string(path)
                    .map_err(|e| RenderError::io("read configuration", path, e))?;
                Self::from_toml(&contents)?
            }
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| {
            RenderError::new(ErrorKind::Config, "parse configuration", e.to_string()).with_source(e)
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(RenderError::new(
                ErrorKind::Config,
                "validate configuration",
                format!(
                    "window size must be non-zero (got {}x{})",
                    self.window.width, self.window.height
                ),
            ));
        }
        Ok(())
    }
}
