use super::device::DeviceContext;
use super::render_pass::{COLOR_ATTACHMENT, DEPTH_ATTACHMENT};
use super::teardown::{Resource, Teardown};
use crate::error::{ErrorKind, Result, VkResultExt};
use vulkanalia::vk::{self, DeviceV1_0, HasBuilder};

pub struct VulkanFramebuffer;

impl VulkanFramebuffer {
    /// One framebuffer per swapchain view, all sharing `depth_view`.
    pub unsafe fn create(
        device: &DeviceContext,
        render_pass: vk::RenderPass,
        color_views: &[vk::ImageView],
        depth_view: vk::ImageView,
        extent: vk::Extent2D,
        teardown: &mut Teardown,
    ) -> Result<Vec<vk::Framebuffer>> {
        let mut framebuffers = Vec::with_capacity(color_views.len());

        for color_view in color_views {
            let attachments = framebuffer_attachments(*color_view, depth_view);
            let create_info = vk::FramebufferCreateInfo::builder()
                .render_pass(render_pass)
                .attachments(&attachments)
                .width(extent.width)
                .height(extent.height)
                .layers(1);

            let framebuffer = device
                .vk_device
                .create_framebuffer(&create_info, None)
                .or_fail(ErrorKind::Resource, "create framebuffer")?;
            teardown.push(Resource::Framebuffer(framebuffer));
            framebuffers.push(framebuffer);
        }

        Ok(framebuffers)
    }
}

/// Image views in render pass attachment order.
pub fn framebuffer_attachments(color_view: vk::ImageView, depth_view: vk::ImageView) -> [vk::ImageView; 2] {
    let mut attachments = [vk::ImageView::default(); 2];
    attachments[COLOR_ATTACHMENT as usize] = color_view;
    attachments[DEPTH_ATTACHMENT as usize] = depth_view;
    attachments
}
