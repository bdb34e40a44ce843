use vulkanalia::vk::{self, DeviceV1_0, HasBuilder};

use super::device::DeviceContext;
use super::teardown::{Resource, Teardown};
use crate::error::{ErrorKind, Result, VkResultExt};

pub const COLOR_ATTACHMENT: u32 = 0;
pub const DEPTH_ATTACHMENT: u32 = 1;

#[derive(Debug)]
pub struct VulkanRenderPass;

impl VulkanRenderPass {
    pub unsafe fn create(
        device: &DeviceContext,
        color_format: vk::Format,
        depth_format: vk::Format,
        teardown: &mut Teardown,
    ) -> Result<vk::RenderPass> {
        let attachments = attachment_descriptions(color_format, depth_format);

        let color_attachment_ref = vk::AttachmentReference::builder()
            .attachment(COLOR_ATTACHMENT)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);

        let depth_attachment_ref = vk::AttachmentReference::builder()
            .attachment(DEPTH_ATTACHMENT)
            .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

        let color_attachments = &[color_attachment_ref];
        let subpass = vk::SubpassDescription::builder()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(color_attachments)
            .depth_stencil_attachment(&depth_attachment_ref);

        let subpasses = &[subpass];
        let dependencies = subpass_dependencies();
        let info = vk::RenderPassCreateInfo::builder()
            .attachments(&attachments)
            .subpasses(subpasses)
            .dependencies(&dependencies);

        let render_pass = device
            .vk_device
            .create_render_pass(&info, None)
            .or_fail(ErrorKind::Resource, "create render pass")?;
        teardown.push(Resource::RenderPass(render_pass));

        Ok(render_pass)
    }
}

/// Color ends ready for presentation; depth is cleared every frame.
pub fn attachment_descriptions(
    color_format: vk::Format,
    depth_format: vk::Format,
) -> [vk::AttachmentDescription; 2] {
    let color = vk::AttachmentDescription::builder()
        .format(color_format)
        .samples(vk::SampleCountFlags::_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)
        .build();

    let depth = vk::AttachmentDescription::builder()
        .format(depth_format)
        .samples(vk::SampleCountFlags::_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::CLEAR)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
        .build();

    [color, depth]
}

/// Orders the subpass against presentation on both sides.
pub fn subpass_dependencies() -> [vk::SubpassDependency; 2] {
    let color_access =
        vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE;

    let entry = vk::SubpassDependency::builder()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(vk::PipelineStageFlags::BOTTOM_OF_PIPE)
        .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .src_access_mask(vk::AccessFlags::MEMORY_READ)
        .dst_access_mask(color_access)
        .dependency_flags(vk::DependencyFlags::BY_REGION)
        .build();

    let exit = vk::SubpassDependency::builder()
        .src_subpass(0)
        .dst_subpass(vk::SUBPASS_EXTERNAL)
        .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .dst_stage_mask(vk::PipelineStageFlags::BOTTOM_OF_PIPE)
        .src_access_mask(color_access)
        .dst_access_mask(vk::AccessFlags::MEMORY_READ)
        .dependency_flags(vk::DependencyFlags::BY_REGION)
        .build();

    [entry, exit]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_attachment_ends_presentable() {
        let [color, depth] =
            attachment_descriptions(vk::Format::B8G8R8A8_UNORM, vk::Format::D32_SFLOAT);

        assert_eq!(color.format, vk::Format::B8G8R8A8_UNORM);
        assert_eq!(color.load_op, vk::AttachmentLoadOp::CLEAR);
        assert_eq!(color.store_op, vk::AttachmentStoreOp::STORE);
        assert_eq!(color.final_layout, vk::ImageLayout::PRESENT_SRC_KHR);

        assert_eq!(depth.format, vk::Format::D32_SFLOAT);
        assert_eq!(depth.load_op, vk::AttachmentLoadOp::CLEAR);
        assert_eq!(depth.store_op, vk::AttachmentStoreOp::STORE);
        assert_eq!(
            depth.final_layout,
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
        );
    }

    #[test]
    fn dependencies_bracket_the_subpass() {
        let [entry, exit] = subpass_dependencies();

        assert_eq!((entry.src_subpass, entry.dst_subpass), (vk::SUBPASS_EXTERNAL, 0));
        assert_eq!(entry.dst_stage_mask, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT);
        assert_eq!(entry.src_access_mask, vk::AccessFlags::MEMORY_READ);

        assert_eq!((exit.src_subpass, exit.dst_subpass), (0, vk::SUBPASS_EXTERNAL));
        assert_eq!(exit.src_stage_mask, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT);
        assert_eq!(exit.dst_access_mask, vk::AccessFlags::MEMORY_READ);
    }
}
