//! The static scene: one colored triangle and a fixed camera.

use std::mem::size_of;

use bytemuck::{Pod, Zeroable};
use vulkanalia::vk::{self, HasBuilder};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl Vertex {
    pub const fn new(position: [f32; 3], color: [f32; 3]) -> Self {
        Self { position, color }
    }

    /// Interleaved position and color, six floats per vertex.
    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription::builder()
            .binding(0)
            .stride(size_of::<Vertex>() as u32)
            .input_rate(vk::VertexInputRate::VERTEX)
            .build()
    }

    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 2] {
        let position = vk::VertexInputAttributeDescription::builder()
            .binding(0)
            .location(0)
            .format(vk::Format::R32G32B32_SFLOAT)
            .offset(0)
            .build();

        let color = vk::VertexInputAttributeDescription::builder()
            .binding(0)
            .location(1)
            .format(vk::Format::R32G32B32_SFLOAT)
            .offset(size_of::<[f32; 3]>() as u32)
            .build();

        [position, color]
    }
}

/// Projection, model and view matrices in column-major order, as the vertex
/// shader's uniform block expects them.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Transform {
    pub projection: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
}

pub static VERTICES: [Vertex; 3] = [
    Vertex::new([1.0, 1.0, 0.0], [1.0, 0.0, 0.0]),
    Vertex::new([-1.0, 1.0, 0.0], [0.0, 1.0, 0.0]),
    Vertex::new([0.0, -1.0, 0.0], [0.0, 0.0, 1.0]),
];

pub static INDICES: [u32; 3] = [0, 1, 2];

// 60 degree FOV, 3:2 aspect, [1, 256] clip range; camera 2.5 units back.
pub static TRANSFORM: Transform = Transform {
    projection: [
        [1.155, 0.0, 0.0, 0.0],
        [0.0, 1.732, 0.0, 0.0],
        [0.0, 0.0, -1.008, -1.0],
        [0.0, 0.0, -2.008, 0.0],
    ],
    model: [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ],
    view: [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, -2.5, 1.0],
    ],
};

pub fn vertex_bytes() -> &'static [u8] {
    bytemuck::cast_slice(&VERTICES)
}

pub fn index_bytes() -> &'static [u8] {
    bytemuck::cast_slice(&INDICES)
}

pub fn transform_bytes() -> &'static [u8] {
    bytemuck::bytes_of(&TRANSFORM)
}

pub fn index_count() -> u32 {
    INDICES.len() as u32
}
