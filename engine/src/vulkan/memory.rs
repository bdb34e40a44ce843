use log::*;
use std::slice;
use vulkanalia::vk::{self, DeviceV1_0, HasBuilder};
use vulkanalia::Device;

use super::device::DeviceContext;
use super::teardown::{Resource, Teardown};
use crate::error::{ErrorKind, RenderError, Result, VkResultExt};

/// Where an allocation has to live.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MemoryVisibility {
    /// GPU-only memory, used for images.
    DeviceLocal,
    /// Mappable memory whose writes are visible to the GPU without a flush.
    HostCoherent,
}

impl MemoryVisibility {
    pub fn flags(self) -> vk::MemoryPropertyFlags {
        match self {
            MemoryVisibility::DeviceLocal => vk::MemoryPropertyFlags::DEVICE_LOCAL,
            MemoryVisibility::HostCoherent => {
                vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT
            }
        }
    }
}

/// First memory type allowed by `type_bits` that has every required property.
pub fn select_memory_type(
    properties: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    visibility: MemoryVisibility,
) -> Option<u32> {
    let required = visibility.flags();
    let count = properties.memory_type_count as usize;

    properties.memory_types[..count]
        .iter()
        .enumerate()
        .find(|(i, t)| type_bits & (1 << i) != 0 && t.property_flags.contains(required))
        .map(|(i, _)| i as u32)
}

/// Allocates memory satisfying `requirements`. Binding is left to the caller.
pub unsafe fn allocate(
    device: &DeviceContext,
    requirements: vk::MemoryRequirements,
    visibility: MemoryVisibility,
    stage: &'static str,
) -> Result<vk::DeviceMemory> {
    let memory_type = select_memory_type(
        &device.memory_properties,
        requirements.memory_type_bits,
        visibility,
    )
    .ok_or_else(|| {
        RenderError::new(
            ErrorKind::Environment,
            stage,
            format!("no memory type is {:?}", visibility.flags()),
        )
    })?;

    let info = vk::MemoryAllocateInfo::builder()
        .allocation_size(requirements.size)
        .memory_type_index(memory_type);

    debug!(
        "Allocating {} bytes from memory type {} for {}.",
        requirements.size, memory_type, stage
    );

    device
        .vk_device
        .allocate_memory(&info, None)
        .or_fail(ErrorKind::Resource, stage)
}

/// What a host-uploaded buffer feeds in the pipeline.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BufferKind {
    Vertex,
    Index,
    Uniform,
}

impl BufferKind {
    pub fn usage(self) -> vk::BufferUsageFlags {
        match self {
            BufferKind::Vertex => vk::BufferUsageFlags::VERTEX_BUFFER,
            BufferKind::Index => vk::BufferUsageFlags::INDEX_BUFFER,
            BufferKind::Uniform => vk::BufferUsageFlags::UNIFORM_BUFFER,
        }
    }

    fn stage(self) -> &'static str {
        match self {
            BufferKind::Vertex => "upload vertex buffer",
            BufferKind::Index => "upload index buffer",
            BufferKind::Uniform => "upload uniform buffer",
        }
    }
}

/// A buffer in host-coherent memory, filled once at startup.
#[derive(Copy, Clone, Debug)]
pub struct GpuBuffer {
    pub buffer: vk::Buffer,
    pub memory: vk::DeviceMemory,
    pub size: vk::DeviceSize,
    pub kind: BufferKind,
}

impl GpuBuffer {
    pub unsafe fn upload(
        device: &DeviceContext,
        teardown: &mut Teardown,
        kind: BufferKind,
        bytes: &[u8],
    ) -> Result<GpuBuffer> {
        let stage = kind.stage();
        let size = bytes.len() as vk::DeviceSize;

        let info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(kind.usage())
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = device
            .vk_device
            .create_buffer(&info, None)
            .or_fail(ErrorKind::Resource, stage)?;
        teardown.push(Resource::Buffer(buffer));

        let requirements = device.vk_device.get_buffer_memory_requirements(buffer);
        let memory = allocate(device, requirements, MemoryVisibility::HostCoherent, stage)?;
        teardown.push(Resource::Memory(memory));

        let mapped = map(&device.vk_device, memory, requirements.size, stage)?;
        copy_to_mapped(mapped, bytes);
        device.vk_device.unmap_memory(memory);

        device
            .vk_device
            .bind_buffer_memory(buffer, memory, 0)
            .or_fail(ErrorKind::Resource, stage)?;

        debug!("Uploaded {} bytes as {:?} buffer.", size, kind);

        Ok(GpuBuffer {
            buffer,
            memory,
            size,
            kind,
        })
    }

    /// Copies the buffer contents back out through the same mapping path.
    pub unsafe fn read_back(&self, device: &Device) -> Result<Vec<u8>> {
        let mapped = map(device, self.memory, self.size, "read back buffer")?;
        let bytes = copy_from_mapped(mapped, self.size as usize);
        device.unmap_memory(self.memory);
        Ok(bytes)
    }

    /// Reads the buffer back and fails unless it matches `expected`.
    pub unsafe fn verify(&self, device: &Device, expected: &[u8]) -> Result<()> {
        if self.read_back(device)? == expected {
            Ok(())
        } else {
            Err(RenderError::new(
                ErrorKind::Resource,
                "verify upload",
                format!("{:?} buffer contents differ from source", self.kind),
            ))
        }
    }
}

unsafe fn map<'a>(
    device: &Device,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
    stage: &'static str,
) -> Result<&'a mut [u8]> {
    let ptr = device
        .map_memory(memory, 0, size, vk::MemoryMapFlags::empty())
        .or_fail(ErrorKind::Resource, stage)?;
    Ok(slice::from_raw_parts_mut(ptr.cast::<u8>(), size as usize))
}

/// Writes `bytes` at the start of a mapped range at least as large.
pub fn copy_to_mapped(mapped: &mut [u8], bytes: &[u8]) {
    mapped[..bytes.len()].copy_from_slice(bytes);
}

pub fn copy_from_mapped(mapped: &[u8], len: usize) -> Vec<u8> {
    mapped[..len].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene;

    fn memory_properties(types: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut properties = vk::PhysicalDeviceMemoryProperties::default();
        properties.memory_type_count = types.len() as u32;
        for (i, flags) in types.iter().enumerate() {
            properties.memory_types[i].property_flags = *flags;
        }
        properties
    }

    #[test]
    fn host_coherent_requires_both_flags() {
        let properties = memory_properties(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::HOST_VISIBLE,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        ]);

        assert_eq!(
            select_memory_type(&properties, 0b111, MemoryVisibility::HostCoherent),
            Some(2)
        );
        assert_eq!(
            select_memory_type(&properties, 0b111, MemoryVisibility::DeviceLocal),
            Some(0)
        );
    }

    #[test]
    fn type_bits_exclude_candidates() {
        let properties = memory_properties(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::DEVICE_LOCAL | vk::MemoryPropertyFlags::HOST_VISIBLE,
        ]);

        assert_eq!(
            select_memory_type(&properties, 0b10, MemoryVisibility::DeviceLocal),
            Some(1)
        );
        assert_eq!(
            select_memory_type(&properties, 0b00, MemoryVisibility::DeviceLocal),
            None
        );
    }

    #[test]
    fn types_past_the_reported_count_are_ignored() {
        let mut properties = memory_properties(&[vk::MemoryPropertyFlags::HOST_VISIBLE]);
        properties.memory_types[1].property_flags = vk::MemoryPropertyFlags::DEVICE_LOCAL;

        assert_eq!(
            select_memory_type(&properties, u32::MAX, MemoryVisibility::DeviceLocal),
            None
        );
    }

    #[test]
    fn no_device_local_type_fails_depth_allocation() {
        let properties = memory_properties(&[
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        ]);

        assert_eq!(
            select_memory_type(&properties, u32::MAX, MemoryVisibility::DeviceLocal),
            None
        );
    }

    #[test]
    fn mapped_round_trip_is_byte_identical() {
        for source in [scene::vertex_bytes(), scene::index_bytes(), scene::transform_bytes()] {
            // Allocations are usually rounded up past the requested size.
            let mut mapped = vec![0xAAu8; source.len() + 64];

            copy_to_mapped(&mut mapped, source);
            assert_eq!(copy_from_mapped(&mapped, source.len()), source);
            assert!(mapped[source.len()..].iter().all(|b| *b == 0xAA));
        }
    }

    #[test]
    fn buffer_kinds_map_to_usage() {
        assert_eq!(BufferKind::Vertex.usage(), vk::BufferUsageFlags::VERTEX_BUFFER);
        assert_eq!(BufferKind::Index.usage(), vk::BufferUsageFlags::INDEX_BUFFER);
        assert_eq!(BufferKind::Uniform.usage(), vk::BufferUsageFlags::UNIFORM_BUFFER);
    }
}
