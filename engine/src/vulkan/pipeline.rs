use log::*;
use vulkanalia::bytecode::Bytecode;
use vulkanalia::vk::{self, DeviceV1_0, Handle, HasBuilder};

use super::constants;
use super::device::DeviceContext;
use super::teardown::{Resource, Teardown};
use crate::error::{ErrorKind, RenderError, Result, VkResultExt};
use crate::scene::Vertex;
use crate::shader::{ShaderBytecode, ShaderSet};

/// Viewport and scissor are set while recording, once the extent is known.
pub const DYNAMIC_STATES: [vk::DynamicState; 2] = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];

#[derive(Copy, Clone, Debug)]
pub struct VulkanPipeline {
    pub layout: vk::PipelineLayout,
    pub pipeline: vk::Pipeline,
}

impl VulkanPipeline {
    pub unsafe fn create(
        device: &DeviceContext,
        render_pass: vk::RenderPass,
        set_layout: vk::DescriptorSetLayout,
        shaders: &ShaderSet,
        teardown: &mut Teardown,
    ) -> Result<VulkanPipeline> {
        // layout
        let set_layouts = &[set_layout];
        let layout_info = vk::PipelineLayoutCreateInfo::builder().set_layouts(set_layouts);
        let layout = device
            .vk_device
            .create_pipeline_layout(&layout_info, None)
            .or_fail(ErrorKind::Resource, "create pipeline layout")?;
        teardown.push(Resource::PipelineLayout(layout));

        let vertex_shader_module = VulkanPipeline::create_shader_module(device, &shaders.vertex)?;
        let fragment_shader_module =
            match VulkanPipeline::create_shader_module(device, &shaders.fragment) {
                Ok(module) => module,
                Err(err) => {
                    device
                        .vk_device
                        .destroy_shader_module(vertex_shader_module, None);
                    return Err(err);
                }
            };

        let pipeline = VulkanPipeline::create_pipeline(
            device,
            render_pass,
            layout,
            vertex_shader_module,
            fragment_shader_module,
        );

        // The pipeline keeps its own copy of the compiled code.
        device
            .vk_device
            .destroy_shader_module(vertex_shader_module, None);
        device
            .vk_device
            .destroy_shader_module(fragment_shader_module, None);

        let pipeline = pipeline?;
        teardown.push(Resource::Pipeline(pipeline));
        info!("Created graphics pipeline.");

        Ok(VulkanPipeline { layout, pipeline })
    }

    unsafe fn create_pipeline(
        device: &DeviceContext,
        render_pass: vk::RenderPass,
        layout: vk::PipelineLayout,
        vertex_shader_module: vk::ShaderModule,
        fragment_shader_module: vk::ShaderModule,
    ) -> Result<vk::Pipeline> {
        let vert_stage = vk::PipelineShaderStageCreateInfo::builder()
            .stage(vk::ShaderStageFlags::VERTEX)
            .module(vertex_shader_module)
            .name(constants::SHADER_ENTRY_POINT);

        let frag_stage = vk::PipelineShaderStageCreateInfo::builder()
            .stage(vk::ShaderStageFlags::FRAGMENT)
            .module(fragment_shader_module)
            .name(constants::SHADER_ENTRY_POINT);

        let binding_descriptions = &[Vertex::binding_description()];
        let attribute_descriptions = Vertex::attribute_descriptions();
        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::builder()
            .vertex_binding_descriptions(binding_descriptions)
            .vertex_attribute_descriptions(&attribute_descriptions);

        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        // Counts only; the rectangles themselves are dynamic state.
        let viewport_state = vk::PipelineViewportStateCreateInfo {
            viewport_count: 1,
            scissor_count: 1,
            ..Default::default()
        };

        let rasterization_state = rasterization_state();

        // multisampling
        let multisample_state = vk::PipelineMultisampleStateCreateInfo::builder()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::_1);

        let depth_stencil_state = depth_stencil_state();

        // color blending
        let attachments = &[color_blend_attachment()];
        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(false)
            .logic_op(vk::LogicOp::COPY)
            .attachments(attachments)
            .blend_constants([0.0, 0.0, 0.0, 0.0]);

        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&DYNAMIC_STATES);

        let stages = &[vert_stage, frag_stage];
        let info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .depth_stencil_state(&depth_stencil_state)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .render_pass(render_pass)
            .subpass(0);

        Ok(device
            .vk_device
            .create_graphics_pipelines(vk::PipelineCache::null(), &[info], None)
            .or_fail(ErrorKind::Resource, "create graphics pipeline")?
            .0[0])
    }

    unsafe fn create_shader_module(
        device: &DeviceContext,
        shader: &ShaderBytecode,
    ) -> Result<vk::ShaderModule> {
        let bytecode = Bytecode::new(shader.bytes()).map_err(|e| {
            RenderError::new(
                ErrorKind::Resource,
                "create shader module",
                format!("`{}`: {:?}", shader.path().display(), e),
            )
        })?;
        let info = vk::ShaderModuleCreateInfo::builder()
            .code_size(bytecode.code_size())
            .code(bytecode.code());

        device
            .vk_device
            .create_shader_module(&info, None)
            .or_fail(ErrorKind::Resource, "create shader module")
    }
}

pub fn rasterization_state() -> vk::PipelineRasterizationStateCreateInfo {
    vk::PipelineRasterizationStateCreateInfo::builder()
        .depth_clamp_enable(false)
        .rasterizer_discard_enable(false)
        .polygon_mode(vk::PolygonMode::FILL)
        .line_width(1.0)
        .cull_mode(vk::CullModeFlags::NONE)
        .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
        .depth_bias_enable(false)
        .build()
}

pub fn depth_stencil_state() -> vk::PipelineDepthStencilStateCreateInfo {
    let stencil = vk::StencilOpState::builder()
        .fail_op(vk::StencilOp::KEEP)
        .pass_op(vk::StencilOp::KEEP)
        .compare_op(vk::CompareOp::ALWAYS)
        .build();

    vk::PipelineDepthStencilStateCreateInfo::builder()
        .depth_test_enable(true)
        .depth_write_enable(true)
        .depth_compare_op(vk::CompareOp::LESS_OR_EQUAL)
        .depth_bounds_test_enable(false)
        .stencil_test_enable(false)
        .front(stencil)
        .back(stencil)
        .build()
}

/// Blending off, all channels written.
pub fn color_blend_attachment() -> vk::PipelineColorBlendAttachmentState {
    vk::PipelineColorBlendAttachmentState::builder()
        .color_write_mask(vk::ColorComponentFlags::all())
        .blend_enable(false)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_test_uses_less_or_equal() {
        let state = depth_stencil_state();
        assert_eq!(state.depth_test_enable, vk::TRUE);
        assert_eq!(state.depth_write_enable, vk::TRUE);
        assert_eq!(state.depth_compare_op, vk::CompareOp::LESS_OR_EQUAL);
        assert_eq!(state.front.compare_op, vk::CompareOp::ALWAYS);
        assert_eq!(state.back.pass_op, vk::StencilOp::KEEP);
    }

    #[test]
    fn blending_disabled_with_full_write_mask() {
        let attachment = color_blend_attachment();
        assert_eq!(attachment.blend_enable, vk::FALSE);
        assert_eq!(attachment.color_write_mask, vk::ColorComponentFlags::all());
    }

    #[test]
    fn rasterizer_fills_without_culling() {
        let state = rasterization_state();
        assert_eq!(state.polygon_mode, vk::PolygonMode::FILL);
        assert_eq!(state.cull_mode, vk::CullModeFlags::NONE);
        assert_eq!(state.front_face, vk::FrontFace::COUNTER_CLOCKWISE);
        assert_eq!(state.line_width, 1.0);
    }

    #[test]
    fn viewport_and_scissor_are_dynamic() {
        assert!(DYNAMIC_STATES.contains(&vk::DynamicState::VIEWPORT));
        assert!(DYNAMIC_STATES.contains(&vk::DynamicState::SCISSOR));
    }
}
