use command_buffer::{draw_plan, DrawInputs, VulkanCommandBuffer};
use descriptor::TransformDescriptor;
use device::DeviceContext;
use frame::{FrameSlot, SyncPair, VulkanFrameBackend};
use framebuffer::VulkanFramebuffer;
use image::DepthTarget;
use instance::VulkanInstance;
use log::*;
use memory::{BufferKind, GpuBuffer};
use pipeline::VulkanPipeline;
use render_pass::VulkanRenderPass;
use swapchain::Swapchain;
use teardown::Teardown;
use vulkanalia::{
    loader::{LibloadingLoader, LIBRARY},
    vk::{self, DeviceV1_0},
    Entry,
};

use crate::config::RendererConfig;
use crate::error::{ErrorKind, RenderError, Result};
use crate::scene;
use crate::scheduler::FrameScheduler;
use crate::setup::{SetupProgress, SetupStage};
use crate::shader::ShaderSet;
use crate::window::AppWindow;

mod command_buffer;
mod constants;
mod descriptor;
mod device;
mod frame;
mod framebuffer;
mod image;
mod instance;
mod memory;
mod pipeline;
mod render_pass;
mod swapchain;
mod teardown;

/// Per-image state the frame loop needs after setup.
#[derive(Debug)]
struct Frames {
    swapchain: vk::SwapchainKHR,
    sync: SyncPair,
    slots: Vec<FrameSlot>,
}

#[derive(Debug)]
pub struct VulkanRenderer {
    _entry: Entry,
    pub instance: VulkanInstance,
    pub device: DeviceContext,
    teardown: Teardown,
    frames: Frames,
}

impl VulkanRenderer {
    pub unsafe fn new(
        window: &AppWindow,
        config: &RendererConfig,
        shaders: &ShaderSet,
        progress: &mut SetupProgress,
    ) -> Result<VulkanRenderer> {
        let loader = LibloadingLoader::new(LIBRARY).map_err(|e| {
            RenderError::new(ErrorKind::Environment, "load Vulkan library", e.to_string())
        })?;
        let entry = Entry::new(loader).map_err(|b| {
            RenderError::new(ErrorKind::Environment, "load Vulkan entry points", b.to_string())
        })?;

        progress.enter(SetupStage::Instance)?;
        let mut instance = VulkanInstance::new(window, &entry, config.validation)?;
        let device = progress
            .enter(SetupStage::Device)
            .and_then(|()| DeviceContext::new(&entry, &instance, window, config.validation));
        let mut device = match device {
            Ok(device) => device,
            Err(err) => {
                instance.destroy();
                return Err(err);
            }
        };

        let size = window.window().inner_size();
        let fallback_extent = vk::Extent2D {
            width: size.width,
            height: size.height,
        };

        let mut teardown = Teardown::default();
        match VulkanRenderer::build(
            &instance,
            &device,
            fallback_extent,
            config,
            shaders,
            progress,
            &mut teardown,
        ) {
            Ok(frames) => {
                info!("Renderer ready with {} device objects.", teardown.len());
                Ok(VulkanRenderer {
                    _entry: entry,
                    instance,
                    device,
                    teardown,
                    frames,
                })
            }
            Err(err) => {
                if !teardown.is_empty() {
                    warn!("Setup failed, releasing {} device objects.", teardown.len());
                    teardown.unwind(&device.vk_device);
                }
                device.destroy();
                instance.destroy();
                Err(err)
            }
        }
    }

    /// Creates every device object in dependency order. Each one is pushed
    /// onto `teardown` as soon as it exists.
    unsafe fn build(
        instance: &VulkanInstance,
        device: &DeviceContext,
        fallback_extent: vk::Extent2D,
        config: &RendererConfig,
        shaders: &ShaderSet,
        progress: &mut SetupProgress,
        teardown: &mut Teardown,
    ) -> Result<Frames> {
        progress.enter(SetupStage::Swapchain)?;
        let swapchain = Swapchain::new(instance, device, fallback_extent, teardown)?;
        progress.enter(SetupStage::DepthTarget)?;
        let depth = DepthTarget::new(instance, device, swapchain.extent, teardown)?;
        progress.enter(SetupStage::RenderPass)?;
        let render_pass =
            VulkanRenderPass::create(device, swapchain.format, depth.format, teardown)?;
        progress.enter(SetupStage::Framebuffers)?;
        let framebuffers = VulkanFramebuffer::create(
            device,
            render_pass,
            &swapchain.image_views,
            depth.view,
            swapchain.extent,
            teardown,
        )?;

        progress.enter(SetupStage::SceneBuffers)?;
        let vertices = GpuBuffer::upload(device, teardown, BufferKind::Vertex, scene::vertex_bytes())?;
        let indices = GpuBuffer::upload(device, teardown, BufferKind::Index, scene::index_bytes())?;
        let transform =
            GpuBuffer::upload(device, teardown, BufferKind::Uniform, scene::transform_bytes())?;

        if config.verify_uploads {
            vertices.verify(&device.vk_device, scene::vertex_bytes())?;
            indices.verify(&device.vk_device, scene::index_bytes())?;
            transform.verify(&device.vk_device, scene::transform_bytes())?;
            debug!("Verified scene uploads.");
        }

        progress.enter(SetupStage::Descriptor)?;
        let descriptor = TransformDescriptor::new(device, &transform, teardown)?;
        progress.enter(SetupStage::Pipeline)?;
        let pipeline =
            VulkanPipeline::create(device, render_pass, descriptor.layout, shaders, teardown)?;

        progress.enter(SetupStage::CommandBuffers)?;
        let command_pool = VulkanCommandBuffer::create_command_pool(device, teardown)?;
        let command_buffers =
            VulkanCommandBuffer::allocate(device, command_pool, swapchain.image_count())?;

        let inputs = DrawInputs {
            render_pass,
            pipeline,
            descriptor_set: descriptor.set,
            vertex_buffer: vertices.buffer,
            index_buffer: indices.buffer,
            index_count: scene::index_count(),
            extent: swapchain.extent,
            clear_color: config.clear_color,
        };

        for (command_buffer, framebuffer) in command_buffers.iter().zip(framebuffers.iter()) {
            VulkanCommandBuffer::record(device, *command_buffer, &draw_plan(&inputs, *framebuffer))?;
        }

        progress.enter(SetupStage::SyncObjects)?;
        let sync = SyncPair::new(device, teardown)?;
        let fences = frame::create_fences(device, swapchain.image_count(), teardown)?;

        progress.enter(SetupStage::FrameSlots)?;
        let slots = FrameSlot::assemble(
            &swapchain.images,
            &swapchain.image_views,
            &framebuffers,
            &command_buffers,
            &fences,
        )?;

        Ok(Frames {
            swapchain: swapchain.handle,
            sync,
            slots,
        })
    }

    /// Runs the frame loop until `window` asks to close.
    pub unsafe fn render_until_closed(
        &mut self,
        window: &mut AppWindow,
        scheduler: &mut FrameScheduler,
    ) -> Result<u64> {
        let mut backend = VulkanFrameBackend::new(
            &self.device.vk_device,
            self.device.queue,
            self.frames.swapchain,
            self.frames.sync,
            &self.frames.slots,
        );

        scheduler.run(&mut backend, window)
    }

    /// Drains the device, then releases everything in reverse creation order.
    pub unsafe fn destroy(&mut self) {
        if let Err(code) = self.device.vk_device.device_wait_idle() {
            warn!("Device did not drain before teardown: {:?}", code);
        }

        self.teardown.unwind(&self.device.vk_device);
        self.device.destroy();
        self.instance.destroy();
    }
}
