use std::fs;
use std::path::{Path, PathBuf};

use log::*;

use crate::config::RendererConfig;
use crate::error::{ErrorKind, RenderError, Result};

/// A compiled SPIR-V blob read from disk.
#[derive(Clone, Debug)]
pub struct ShaderBytecode {
    path: PathBuf,
    bytes: Vec<u8>,
}

impl ShaderBytecode {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening shader `{}`.", path.display());

        let bytes = fs::read(path).map_err(|e| RenderError::io("load shader", path, e))?;

        // SPIR-V is a stream of 32-bit words.
        if bytes.is_empty() || bytes.len() % 4 != 0 {
            return Err(RenderError::new(
                ErrorKind::Io,
                "load shader",
                format!("`{}` has invalid size {}", path.display(), bytes.len()),
            ));
        }

        Ok(Self {
            path: path.to_path_buf(),
            bytes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// The two stages of the graphics pipeline.
#[derive(Clone, Debug)]
pub struct ShaderSet {
    pub vertex: ShaderBytecode,
    pub fragment: ShaderBytecode,
}

impl ShaderSet {
    pub fn load(config: &RendererConfig) -> Result<Self> {
        Ok(Self {
            vertex: ShaderBytecode::load(&config.vertex_shader)?,
            fragment: ShaderBytecode::load(&config.fragment_shader)?,
        })
    }
}
