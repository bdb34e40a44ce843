use vulkanalia::{vk, Version};

pub const PORTABILITY_MACOS_VERSION: Version = Version::new(1, 3, 216);
pub const VALIDATION_LAYER: vk::ExtensionName =
    vk::ExtensionName::from_bytes(b"VK_LAYER_KHRONOS_validation");

pub const APPLICATION_NAME: &[u8] = b"vulkan-hello-triangle\0";
pub const ENGINE_NAME: &[u8] = b"No Engine\0";
pub const SHADER_ENTRY_POINT: &[u8] = b"main\0";

/// The only swapchain color format accepted.
pub const PREFERRED_COLOR_FORMAT: vk::Format = vk::Format::B8G8R8A8_UNORM;

/// Depth formats in order of preference.
pub const DEPTH_FORMAT_CANDIDATES: [vk::Format; 5] = [
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D32_SFLOAT,
    vk::Format::D24_UNORM_S8_UINT,
    vk::Format::D16_UNORM_S8_UINT,
    vk::Format::D16_UNORM,
];

/// Composite alpha modes in order of preference.
pub const COMPOSITE_ALPHA_PREFERENCE: [vk::CompositeAlphaFlagsKHR; 4] = [
    vk::CompositeAlphaFlagsKHR::OPAQUE,
    vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED,
    vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED,
    vk::CompositeAlphaFlagsKHR::INHERIT,
];
