use log::*;

use crate::config::RendererConfig;
use crate::error::Result;
use crate::scheduler::FrameScheduler;
use crate::setup::{SetupProgress, SetupStage};
use crate::shader::ShaderSet;
use crate::vulkan::VulkanRenderer;
use crate::window::AppWindow;

#[derive(Debug)]
pub struct Renderer {
    pub vk_renderer: VulkanRenderer,
    scheduler: FrameScheduler,
}

impl Renderer {
    /// Loads the shaders, then builds every GPU object for `window`.
    pub unsafe fn create(window: &AppWindow, config: &RendererConfig) -> Result<Self> {
        let mut progress = SetupProgress::new();
        let shaders = load_shaders(config, &mut progress)?;
        let vk_renderer = VulkanRenderer::new(window, config, &shaders, &mut progress)?;

        Ok(Self {
            vk_renderer,
            scheduler: FrameScheduler::new(),
        })
    }

    /// Renders frames until the window closes. Returns the frame count.
    pub unsafe fn render_until_closed(&mut self, window: &mut AppWindow) -> Result<u64> {
        self.vk_renderer
            .render_until_closed(window, &mut self.scheduler)
    }

    pub fn frames(&self) -> u64 {
        self.scheduler.frames()
    }

    /// Destroys our Vulkan app.
    pub unsafe fn destroy(&mut self) {
        self.vk_renderer.destroy();
        info!("Renderer destroyed after {} frames.", self.frames());
    }
}

/// First setup stage. Runs before the instance exists, so a missing file
/// fails without touching the device.
fn load_shaders(config: &RendererConfig, progress: &mut SetupProgress) -> Result<ShaderSet> {
    progress.enter(SetupStage::LoadShaders)?;
    ShaderSet::load(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::env;

    #[test]
    fn missing_shader_stops_setup_before_instance() {
        let config = RendererConfig {
            vertex_shader: env::temp_dir().join("triangle-engine-no-such-shader.vert.spv"),
            ..RendererConfig::default()
        };
        let mut progress = SetupProgress::new();

        let err = load_shaders(&config, &mut progress).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.exit_code(), 5);
        assert_eq!(progress.entered(), &[SetupStage::LoadShaders]);
        assert!(!progress.reached(SetupStage::Pipeline));
    }
}
