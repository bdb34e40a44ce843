use log::*;
use vulkanalia::vk::{self, DeviceV1_0, KhrSwapchainExtension};
use vulkanalia::Device;

/// A device-owned object scheduled for destruction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Resource {
    Swapchain(vk::SwapchainKHR),
    ImageView(vk::ImageView),
    Image(vk::Image),
    Memory(vk::DeviceMemory),
    Buffer(vk::Buffer),
    RenderPass(vk::RenderPass),
    Framebuffer(vk::Framebuffer),
    DescriptorSetLayout(vk::DescriptorSetLayout),
    DescriptorPool(vk::DescriptorPool),
    PipelineLayout(vk::PipelineLayout),
    Pipeline(vk::Pipeline),
    CommandPool(vk::CommandPool),
    Fence(vk::Fence),
    Semaphore(vk::Semaphore),
}

impl Resource {
    unsafe fn destroy(self, device: &Device) {
        match self {
            Resource::Swapchain(h) => device.destroy_swapchain_khr(h, None),
            Resource::ImageView(h) => device.destroy_image_view(h, None),
            Resource::Image(h) => device.destroy_image(h, None),
            Resource::Memory(h) => device.free_memory(h, None),
            Resource::Buffer(h) => device.destroy_buffer(h, None),
            Resource::RenderPass(h) => device.destroy_render_pass(h, None),
            Resource::Framebuffer(h) => device.destroy_framebuffer(h, None),
            Resource::DescriptorSetLayout(h) => device.destroy_descriptor_set_layout(h, None),
            // Frees the descriptor set allocated from it.
            Resource::DescriptorPool(h) => device.destroy_descriptor_pool(h, None),
            Resource::PipelineLayout(h) => device.destroy_pipeline_layout(h, None),
            Resource::Pipeline(h) => device.destroy_pipeline(h, None),
            // Frees the command buffers allocated from it.
            Resource::CommandPool(h) => device.destroy_command_pool(h, None),
            Resource::Fence(h) => device.destroy_fence(h, None),
            Resource::Semaphore(h) => device.destroy_semaphore(h, None),
        }
    }
}

/// Every device object created so far, in creation order.
///
/// Setup pushes each object the moment it exists, so unwinding after a
/// failure at any stage releases exactly what was built.
#[derive(Debug, Default)]
pub struct Teardown {
    resources: Vec<Resource>,
}

impl Teardown {
    pub fn push(&mut self, resource: Resource) {
        self.resources.push(resource);
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Empties the list, newest first.
    pub fn drain_reversed(&mut self) -> Vec<Resource> {
        let mut resources = std::mem::take(&mut self.resources);
        resources.reverse();
        resources
    }

    pub unsafe fn unwind(&mut self, device: &Device) {
        let resources = self.drain_reversed();
        debug!("Destroying {} device objects.", resources.len());
        for resource in resources {
            resource.destroy(device);
        }
    }
}
