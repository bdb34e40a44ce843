use vulkanalia::vk::{self, DeviceV1_0, HasBuilder};

use super::device::DeviceContext;
use super::memory::GpuBuffer;
use super::teardown::{Resource, Teardown};
use crate::error::{ErrorKind, Result, VkResultExt};

/// The single descriptor set exposing the transform buffer to the vertex
/// shader at binding 0.
#[derive(Copy, Clone, Debug)]
pub struct TransformDescriptor {
    pub layout: vk::DescriptorSetLayout,
    pub set: vk::DescriptorSet,
}

impl TransformDescriptor {
    pub unsafe fn new(
        device: &DeviceContext,
        uniform: &GpuBuffer,
        teardown: &mut Teardown,
    ) -> Result<TransformDescriptor> {
        let binding = vk::DescriptorSetLayoutBinding::builder()
            .binding(0)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::VERTEX);

        let bindings = &[binding];
        let info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(bindings);

        let layout = device
            .vk_device
            .create_descriptor_set_layout(&info, None)
            .or_fail(ErrorKind::Resource, "create descriptor set layout")?;
        teardown.push(Resource::DescriptorSetLayout(layout));

        let pool_size = vk::DescriptorPoolSize::builder()
            .type_(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(1);

        let pool_sizes = &[pool_size];
        let info = vk::DescriptorPoolCreateInfo::builder()
            .pool_sizes(pool_sizes)
            .max_sets(1);

        let pool = device
            .vk_device
            .create_descriptor_pool(&info, None)
            .or_fail(ErrorKind::Resource, "create descriptor pool")?;
        teardown.push(Resource::DescriptorPool(pool));

        let layouts = &[layout];
        let info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(pool)
            .set_layouts(layouts);

        let set = device
            .vk_device
            .allocate_descriptor_sets(&info)
            .or_fail(ErrorKind::Resource, "allocate descriptor set")?[0];

        let buffer_info = vk::DescriptorBufferInfo::builder()
            .buffer(uniform.buffer)
            .offset(0)
            .range(uniform.size);

        let buffer_infos = &[buffer_info];
        let write = vk::WriteDescriptorSet::builder()
            .dst_set(set)
            .dst_binding(0)
            .dst_array_element(0)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .buffer_info(buffer_infos);

        device
            .vk_device
            .update_descriptor_sets(&[write], &[] as &[vk::CopyDescriptorSet]);

        Ok(TransformDescriptor { layout, set })
    }
}
