use renderer::Renderer;

pub mod config;
pub mod error;
mod renderer;
pub mod scene;
pub mod scheduler;
pub mod setup;
pub mod shader;
mod vulkan;
pub mod window;

pub use config::RendererConfig;
pub use error::{ErrorKind, RenderError, Result};
pub use window::AppWindow;

#[derive(Debug)]
pub struct Engine {
    window: AppWindow,
    renderer: Renderer,
}

impl Engine {
    pub fn new(config: &RendererConfig) -> Result<Engine> {
        let window = AppWindow::new(&config.window)?;
        let renderer = unsafe { Renderer::create(&window, config)? };

        Ok(Engine { window, renderer })
    }

    /// Renders until the window is closed, then tears everything down.
    /// Teardown also runs when the frame loop fails.
    pub fn run(mut self) -> Result<u64> {
        let rendered = unsafe { self.renderer.render_until_closed(&mut self.window) };

        unsafe {
            self.renderer.destroy();
        }

        rendered
    }
}
