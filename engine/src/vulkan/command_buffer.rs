use super::device::DeviceContext;
use super::pipeline::VulkanPipeline;
use super::teardown::{Resource, Teardown};
use crate::error::{ErrorKind, Result, VkResultExt};
use log::*;
use vulkanalia::vk::{self, DeviceV1_0, HasBuilder};
use vulkanalia::Device;

/// Everything a slot's draw sequence refers to, apart from its framebuffer.
#[derive(Copy, Clone, Debug)]
pub struct DrawInputs {
    pub render_pass: vk::RenderPass,
    pub pipeline: VulkanPipeline,
    pub descriptor_set: vk::DescriptorSet,
    pub vertex_buffer: vk::Buffer,
    pub index_buffer: vk::Buffer,
    pub index_count: u32,
    pub extent: vk::Extent2D,
    pub clear_color: [f32; 4],
}

/// One recorded command, in the order it lands in the command buffer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum DrawCommand {
    BeginRenderPass {
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        width: u32,
        height: u32,
        clear_color: [f32; 4],
        clear_depth: f32,
        clear_stencil: u32,
    },
    SetViewport { width: f32, height: f32 },
    SetScissor { width: u32, height: u32 },
    BindDescriptorSet {
        layout: vk::PipelineLayout,
        set: vk::DescriptorSet,
    },
    BindPipeline(vk::Pipeline),
    BindVertexBuffer(vk::Buffer),
    BindIndexBuffer(vk::Buffer),
    DrawIndexed { index_count: u32, instance_count: u32 },
    EndRenderPass,
}

/// The fixed draw sequence for the slot rendering into `framebuffer`.
pub fn draw_plan(inputs: &DrawInputs, framebuffer: vk::Framebuffer) -> [DrawCommand; 9] {
    let vk::Extent2D { width, height } = inputs.extent;

    [
        DrawCommand::BeginRenderPass {
            render_pass: inputs.render_pass,
            framebuffer,
            width,
            height,
            clear_color: inputs.clear_color,
            clear_depth: 1.0,
            clear_stencil: 0,
        },
        DrawCommand::SetViewport {
            width: width as f32,
            height: height as f32,
        },
        DrawCommand::SetScissor { width, height },
        DrawCommand::BindDescriptorSet {
            layout: inputs.pipeline.layout,
            set: inputs.descriptor_set,
        },
        DrawCommand::BindPipeline(inputs.pipeline.pipeline),
        DrawCommand::BindVertexBuffer(inputs.vertex_buffer),
        DrawCommand::BindIndexBuffer(inputs.index_buffer),
        DrawCommand::DrawIndexed {
            index_count: inputs.index_count,
            instance_count: 1,
        },
        DrawCommand::EndRenderPass,
    ]
}

#[derive(Debug)]
pub struct VulkanCommandBuffer;

impl VulkanCommandBuffer {
    pub unsafe fn create_command_pool(
        device: &DeviceContext,
        teardown: &mut Teardown,
    ) -> Result<vk::CommandPool> {
        let info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(device.queue_family);

        let command_pool = device
            .vk_device
            .create_command_pool(&info, None)
            .or_fail(ErrorKind::Resource, "create command pool")?;
        teardown.push(Resource::CommandPool(command_pool));

        Ok(command_pool)
    }

    pub unsafe fn allocate(
        device: &DeviceContext,
        command_pool: vk::CommandPool,
        count: usize,
    ) -> Result<Vec<vk::CommandBuffer>> {
        let allocate_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count as u32);

        device
            .vk_device
            .allocate_command_buffers(&allocate_info)
            .or_fail(ErrorKind::Resource, "allocate command buffers")
    }

    /// Records `commands` once. The buffer is never re-recorded.
    pub unsafe fn record(
        device: &DeviceContext,
        command_buffer: vk::CommandBuffer,
        commands: &[DrawCommand],
    ) -> Result<()> {
        let info = vk::CommandBufferBeginInfo::builder();

        device
            .vk_device
            .begin_command_buffer(command_buffer, &info)
            .or_fail(ErrorKind::Resource, "begin command buffer")?;

        for command in commands {
            encode(&device.vk_device, command_buffer, command);
        }

        device
            .vk_device
            .end_command_buffer(command_buffer)
            .or_fail(ErrorKind::Resource, "end command buffer")?;

        debug!("Recorded {} commands.", commands.len());
        Ok(())
    }
}

unsafe fn encode(device: &Device, command_buffer: vk::CommandBuffer, command: &DrawCommand) {
    match *command {
        DrawCommand::BeginRenderPass {
            render_pass,
            framebuffer,
            width,
            height,
            clear_color,
            clear_depth,
            clear_stencil,
        } => {
            let render_area = vk::Rect2D::builder()
                .offset(vk::Offset2D::default())
                .extent(vk::Extent2D { width, height });

            let color_clear_value = vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: clear_color,
                },
            };

            let depth_clear_value = vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: clear_depth,
                    stencil: clear_stencil,
                },
            };

            let clear_values = &[color_clear_value, depth_clear_value];
            let info = vk::RenderPassBeginInfo::builder()
                .render_pass(render_pass)
                .framebuffer(framebuffer)
                .render_area(render_area)
                .clear_values(clear_values);

            device.cmd_begin_render_pass(command_buffer, &info, vk::SubpassContents::INLINE);
        }
        DrawCommand::SetViewport { width, height } => {
            let viewport = vk::Viewport::builder()
                .x(0.0)
                .y(0.0)
                .width(width)
                .height(height)
                .min_depth(0.0)
                .max_depth(1.0);

            device.cmd_set_viewport(command_buffer, 0, &[viewport]);
        }
        DrawCommand::SetScissor { width, height } => {
            let scissor = vk::Rect2D::builder()
                .offset(vk::Offset2D { x: 0, y: 0 })
                .extent(vk::Extent2D { width, height });

            device.cmd_set_scissor(command_buffer, 0, &[scissor]);
        }
        DrawCommand::BindDescriptorSet { layout, set } => {
            device.cmd_bind_descriptor_sets(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                layout,
                0,
                &[set],
                &[],
            );
        }
        DrawCommand::BindPipeline(pipeline) => {
            device.cmd_bind_pipeline(command_buffer, vk::PipelineBindPoint::GRAPHICS, pipeline);
        }
        DrawCommand::BindVertexBuffer(buffer) => {
            device.cmd_bind_vertex_buffers(command_buffer, 0, &[buffer], &[0]);
        }
        DrawCommand::BindIndexBuffer(buffer) => {
            device.cmd_bind_index_buffer(command_buffer, buffer, 0, vk::IndexType::UINT32);
        }
        DrawCommand::DrawIndexed {
            index_count,
            instance_count,
        } => {
            device.cmd_draw_indexed(command_buffer, index_count, instance_count, 0, 0, 0);
        }
        DrawCommand::EndRenderPass => device.cmd_end_render_pass(command_buffer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vulkanalia::vk::Handle;

    fn inputs() -> DrawInputs {
        DrawInputs {
            render_pass: vk::RenderPass::from_raw(1),
            pipeline: VulkanPipeline {
                layout: vk::PipelineLayout::from_raw(2),
                pipeline: vk::Pipeline::from_raw(3),
            },
            descriptor_set: vk::DescriptorSet::from_raw(4),
            vertex_buffer: vk::Buffer::from_raw(5),
            index_buffer: vk::Buffer::from_raw(6),
            index_count: 3,
            extent: vk::Extent2D {
                width: 720,
                height: 480,
            },
            clear_color: [0.0, 0.5, 0.5, 1.0],
        }
    }

    fn framebuffers_in(plan: &[DrawCommand]) -> Vec<vk::Framebuffer> {
        plan.iter()
            .filter_map(|c| match c {
                DrawCommand::BeginRenderPass { framebuffer, .. } => Some(*framebuffer),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn each_plan_references_only_its_framebuffer() {
        let framebuffers = [vk::Framebuffer::from_raw(100), vk::Framebuffer::from_raw(101)];

        for framebuffer in framebuffers {
            let plan = draw_plan(&inputs(), framebuffer);
            assert_eq!(framebuffers_in(&plan), vec![framebuffer]);
        }
    }

    #[test]
    fn plan_follows_fixed_draw_sequence() {
        let plan = draw_plan(&inputs(), vk::Framebuffer::from_raw(100));

        assert!(matches!(plan[0], DrawCommand::BeginRenderPass { clear_depth, clear_stencil: 0, .. } if clear_depth == 1.0));
        assert_eq!(plan[1], DrawCommand::SetViewport { width: 720.0, height: 480.0 });
        assert_eq!(plan[2], DrawCommand::SetScissor { width: 720, height: 480 });
        assert!(matches!(plan[3], DrawCommand::BindDescriptorSet { .. }));
        assert_eq!(plan[4], DrawCommand::BindPipeline(vk::Pipeline::from_raw(3)));
        assert_eq!(plan[5], DrawCommand::BindVertexBuffer(vk::Buffer::from_raw(5)));
        assert_eq!(plan[6], DrawCommand::BindIndexBuffer(vk::Buffer::from_raw(6)));
        assert_eq!(
            plan[7],
            DrawCommand::DrawIndexed {
                index_count: 3,
                instance_count: 1
            }
        );
        assert_eq!(plan[8], DrawCommand::EndRenderPass);
    }

    #[test]
    fn clear_color_comes_from_inputs() {
        let mut inputs = inputs();
        inputs.clear_color = [1.0, 0.0, 0.0, 1.0];

        match draw_plan(&inputs, vk::Framebuffer::from_raw(7))[0] {
            DrawCommand::BeginRenderPass { clear_color, .. } => assert_eq!(clear_color, [1.0, 0.0, 0.0, 1.0]),
            other => panic!("unexpected first command {:?}", other),
        }
    }
}
