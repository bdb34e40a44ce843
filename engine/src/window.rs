use std::time::Duration;

use log::*;
use vulkanalia::vk::{self, KhrSurfaceExtension};
use vulkanalia::window as vk_window;
use vulkanalia::Instance;
use winit::dpi::LogicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::EventLoop;
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowBuilder};

use crate::config::WindowConfig;
use crate::error::{ErrorKind, RenderError, Result, VkResultExt};

/// What the frame loop needs from the windowing system.
pub trait WindowSystem {
    fn poll_events(&mut self);
    fn should_close(&self) -> bool;
}

/// A fixed-size native window with a pollable event queue.
#[derive(Debug)]
pub struct AppWindow {
    event_loop: EventLoop<()>,
    window: Window,
    close_requested: bool,
}

impl AppWindow {
    pub fn new(config: &WindowConfig) -> Result<Self> {
        let event_loop = EventLoop::new().map_err(|e| {
            RenderError::new(ErrorKind::Environment, "initialize windowing", e.to_string()).with_source(e)
        })?;

        let window = WindowBuilder::new()
            .with_title(config.title.as_str())
            .with_inner_size(LogicalSize::new(config.width, config.height))
            .with_resizable(false)
            .build(&event_loop)
            .map_err(|e| {
                RenderError::new(ErrorKind::Environment, "create window", e.to_string()).with_source(e)
            })?;

        info!("Created {}x{} window `{}`.", config.width, config.height, config.title);

        Ok(Self {
            event_loop,
            window,
            close_requested: false,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Instance extensions needed to present to this window.
    pub fn required_extensions(&self) -> Result<&'static [&'static vk::ExtensionName]> {
        let extensions = vk_window::get_required_instance_extensions(&self.window);
        if extensions.is_empty() {
            return Err(RenderError::new(
                ErrorKind::Environment,
                "query required instance extensions",
                "the window system reports no Vulkan extensions",
            ));
        }
        Ok(extensions)
    }

    pub unsafe fn create_surface(&self, instance: &Instance) -> Result<vk::SurfaceKHR> {
        vk_window::create_surface(instance, &self.window, &self.window)
            .or_fail(ErrorKind::Environment, "create window surface")
    }

    pub unsafe fn presentation_support(
        &self,
        instance: &Instance,
        physical_device: vk::PhysicalDevice,
        queue_family: u32,
        surface: vk::SurfaceKHR,
    ) -> Result<bool> {
        instance
            .get_physical_device_surface_support_khr(physical_device, queue_family, surface)
            .or_fail(ErrorKind::Environment, "query presentation support")
    }
}

impl WindowSystem for AppWindow {
    fn poll_events(&mut self) {
        let close_requested = &mut self.close_requested;
        let status = self.event_loop.pump_events(Some(Duration::ZERO), |event, elwt| {
            if let Event::WindowEvent {
                event: WindowEvent::CloseRequested,
                ..
            } = event
            {
                debug!("Close requested.");
                *close_requested = true;
                elwt.exit();
            }
        });

        if let PumpStatus::Exit(_) = status {
            self.close_requested = true;
        }
    }

    fn should_close(&self) -> bool {
        self.close_requested
    }
}
