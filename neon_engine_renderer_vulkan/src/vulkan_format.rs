/// Conversions from engine descriptors to Vulkan enums and flags

use ash::vk;
use neon_engine::neon::render::{
    AddressMode, BlendFactor, BlendOp, BufferFormat, BufferUsage, ColorWriteMask, CompareOp,
    CullMode, DescriptorKind, Filter, FrontFace, MipmapMode, PolygonMode, PrimitiveType, SampleCount,
    TextureFormat,
};
use neon_engine::neon::shader::ShaderStage;
use neon_engine::neon::{Error, Result};

// ===== FORMATS =====

pub(crate) fn buffer_format_to_vk(format: BufferFormat) -> vk::Format {
    match format {
        // Float formats
        BufferFormat::R32_SFLOAT => vk::Format::R32_SFLOAT,
        BufferFormat::R32G32_SFLOAT => vk::Format::R32G32_SFLOAT,
        BufferFormat::R32G32B32_SFLOAT => vk::Format::R32G32B32_SFLOAT,
        BufferFormat::R32G32B32A32_SFLOAT => vk::Format::R32G32B32A32_SFLOAT,
        // Signed integer formats
        BufferFormat::R32_SINT => vk::Format::R32_SINT,
        BufferFormat::R32G32_SINT => vk::Format::R32G32_SINT,
        BufferFormat::R32G32B32_SINT => vk::Format::R32G32B32_SINT,
        BufferFormat::R32G32B32A32_SINT => vk::Format::R32G32B32A32_SINT,
        // Unsigned integer formats
        BufferFormat::R32_UINT => vk::Format::R32_UINT,
        BufferFormat::R32G32_UINT => vk::Format::R32G32_UINT,
        BufferFormat::R32G32B32_UINT => vk::Format::R32G32B32_UINT,
        BufferFormat::R32G32B32A32_UINT => vk::Format::R32G32B32A32_UINT,
        // Short formats
        BufferFormat::R16_SINT => vk::Format::R16_SINT,
        BufferFormat::R16G16_SINT => vk::Format::R16G16_SINT,
        BufferFormat::R16G16B16A16_SINT => vk::Format::R16G16B16A16_SINT,
        BufferFormat::R16_UINT => vk::Format::R16_UINT,
        BufferFormat::R16G16_UINT => vk::Format::R16G16_UINT,
        BufferFormat::R16G16B16A16_UINT => vk::Format::R16G16B16A16_UINT,
        // Byte formats
        BufferFormat::R8_SINT => vk::Format::R8_SINT,
        BufferFormat::R8G8_SINT => vk::Format::R8G8_SINT,
        BufferFormat::R8G8B8A8_SINT => vk::Format::R8G8B8A8_SINT,
        BufferFormat::R8_UINT => vk::Format::R8_UINT,
        BufferFormat::R8G8_UINT => vk::Format::R8G8_UINT,
        BufferFormat::R8G8B8A8_UINT => vk::Format::R8G8B8A8_UINT,
    }
}

pub(crate) fn texture_format_to_vk(format: TextureFormat) -> vk::Format {
    match format {
        TextureFormat::R8G8B8A8_SRGB => vk::Format::R8G8B8A8_SRGB,
        TextureFormat::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        TextureFormat::B8G8R8A8_SRGB => vk::Format::B8G8R8A8_SRGB,
        TextureFormat::B8G8R8A8_UNORM => vk::Format::B8G8R8A8_UNORM,
        TextureFormat::A2B10G10R10_UNORM => vk::Format::A2B10G10R10_UNORM_PACK32,
        TextureFormat::R16G16B16A16_SFLOAT => vk::Format::R16G16B16A16_SFLOAT,
        TextureFormat::D16_UNORM => vk::Format::D16_UNORM,
        TextureFormat::D32_FLOAT => vk::Format::D32_SFLOAT,
        TextureFormat::D24_UNORM_S8_UINT => vk::Format::D24_UNORM_S8_UINT,
    }
}

/// Engine format of a Vulkan surface or attachment format
///
/// Returns `None` for formats the engine does not render to.
pub(crate) fn texture_format_from_vk(format: vk::Format) -> Option<TextureFormat> {
    match format {
        vk::Format::R8G8B8A8_SRGB => Some(TextureFormat::R8G8B8A8_SRGB),
        vk::Format::R8G8B8A8_UNORM => Some(TextureFormat::R8G8B8A8_UNORM),
        vk::Format::B8G8R8A8_SRGB => Some(TextureFormat::B8G8R8A8_SRGB),
        vk::Format::B8G8R8A8_UNORM => Some(TextureFormat::B8G8R8A8_UNORM),
        vk::Format::A2B10G10R10_UNORM_PACK32 => Some(TextureFormat::A2B10G10R10_UNORM),
        vk::Format::R16G16B16A16_SFLOAT => Some(TextureFormat::R16G16B16A16_SFLOAT),
        vk::Format::D16_UNORM => Some(TextureFormat::D16_UNORM),
        vk::Format::D32_SFLOAT => Some(TextureFormat::D32_FLOAT),
        vk::Format::D24_UNORM_S8_UINT => Some(TextureFormat::D24_UNORM_S8_UINT),
        _ => None,
    }
}

// ===== PIPELINE STATE =====

pub(crate) fn topology_to_vk(primitive_type: PrimitiveType) -> vk::PrimitiveTopology {
    match primitive_type {
        PrimitiveType::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
        PrimitiveType::Line => vk::PrimitiveTopology::LINE_LIST,
    }
}

pub(crate) fn cull_mode_to_vk(mode: CullMode) -> vk::CullModeFlags {
    match mode {
        CullMode::None => vk::CullModeFlags::NONE,
        CullMode::Front => vk::CullModeFlags::FRONT,
        CullMode::Back => vk::CullModeFlags::BACK,
    }
}

pub(crate) fn front_face_to_vk(face: FrontFace) -> vk::FrontFace {
    match face {
        FrontFace::CounterClockwise => vk::FrontFace::COUNTER_CLOCKWISE,
        FrontFace::Clockwise => vk::FrontFace::CLOCKWISE,
    }
}

pub(crate) fn polygon_mode_to_vk(mode: PolygonMode) -> vk::PolygonMode {
    match mode {
        PolygonMode::Fill => vk::PolygonMode::FILL,
        PolygonMode::Line => vk::PolygonMode::LINE,
    }
}

pub(crate) fn compare_op_to_vk(op: CompareOp) -> vk::CompareOp {
    match op {
        CompareOp::Never => vk::CompareOp::NEVER,
        CompareOp::Less => vk::CompareOp::LESS,
        CompareOp::Equal => vk::CompareOp::EQUAL,
        CompareOp::LessOrEqual => vk::CompareOp::LESS_OR_EQUAL,
        CompareOp::Greater => vk::CompareOp::GREATER,
        CompareOp::NotEqual => vk::CompareOp::NOT_EQUAL,
        CompareOp::GreaterOrEqual => vk::CompareOp::GREATER_OR_EQUAL,
        CompareOp::Always => vk::CompareOp::ALWAYS,
    }
}

pub(crate) fn blend_factor_to_vk(factor: BlendFactor) -> vk::BlendFactor {
    match factor {
        BlendFactor::Zero => vk::BlendFactor::ZERO,
        BlendFactor::One => vk::BlendFactor::ONE,
        BlendFactor::SrcColor => vk::BlendFactor::SRC_COLOR,
        BlendFactor::OneMinusSrcColor => vk::BlendFactor::ONE_MINUS_SRC_COLOR,
        BlendFactor::DstColor => vk::BlendFactor::DST_COLOR,
        BlendFactor::OneMinusDstColor => vk::BlendFactor::ONE_MINUS_DST_COLOR,
        BlendFactor::SrcAlpha => vk::BlendFactor::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
        BlendFactor::DstAlpha => vk::BlendFactor::DST_ALPHA,
        BlendFactor::OneMinusDstAlpha => vk::BlendFactor::ONE_MINUS_DST_ALPHA,
    }
}

pub(crate) fn blend_op_to_vk(op: BlendOp) -> vk::BlendOp {
    match op {
        BlendOp::Add => vk::BlendOp::ADD,
        BlendOp::Subtract => vk::BlendOp::SUBTRACT,
        BlendOp::ReverseSubtract => vk::BlendOp::REVERSE_SUBTRACT,
        BlendOp::Min => vk::BlendOp::MIN,
        BlendOp::Max => vk::BlendOp::MAX,
    }
}

pub(crate) fn color_write_mask_to_vk(mask: ColorWriteMask) -> vk::ColorComponentFlags {
    let mut flags = vk::ColorComponentFlags::empty();
    if mask.contains(ColorWriteMask::R) {
        flags |= vk::ColorComponentFlags::R;
    }
    if mask.contains(ColorWriteMask::G) {
        flags |= vk::ColorComponentFlags::G;
    }
    if mask.contains(ColorWriteMask::B) {
        flags |= vk::ColorComponentFlags::B;
    }
    if mask.contains(ColorWriteMask::A) {
        flags |= vk::ColorComponentFlags::A;
    }
    flags
}

pub(crate) fn sample_count_to_vk(count: SampleCount) -> vk::SampleCountFlags {
    match count {
        SampleCount::S1 => vk::SampleCountFlags::TYPE_1,
        SampleCount::S2 => vk::SampleCountFlags::TYPE_2,
        SampleCount::S4 => vk::SampleCountFlags::TYPE_4,
        SampleCount::S8 => vk::SampleCountFlags::TYPE_8,
    }
}

/// Shader stage flag of a program stage
///
/// `Undefined` has no Vulkan stage and is rejected.
pub(crate) fn shader_stage_to_vk(stage: ShaderStage) -> Result<vk::ShaderStageFlags> {
    match stage {
        ShaderStage::Vertex => Ok(vk::ShaderStageFlags::VERTEX),
        ShaderStage::Fragment => Ok(vk::ShaderStageFlags::FRAGMENT),
        ShaderStage::Undefined => Err(Error::InvalidResource(
            "cannot create a shader object for an undefined stage".to_string(),
        )),
    }
}

/// Descriptor type of a layout binding
pub(crate) fn descriptor_kind_to_vk(kind: DescriptorKind) -> vk::DescriptorType {
    match kind {
        DescriptorKind::CombinedImageSampler => vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
        DescriptorKind::SampledImage => vk::DescriptorType::SAMPLED_IMAGE,
        DescriptorKind::Sampler => vk::DescriptorType::SAMPLER,
        DescriptorKind::UniformBuffer => vk::DescriptorType::UNIFORM_BUFFER,
    }
}

// ===== BUFFERS =====

/// Usage flags of a device buffer, always including transfer destination
/// so staging uploads can target it
pub(crate) fn buffer_usage_to_vk(usage: BufferUsage) -> vk::BufferUsageFlags {
    let usage = match usage {
        BufferUsage::Vertex => vk::BufferUsageFlags::VERTEX_BUFFER,
        BufferUsage::Index => vk::BufferUsageFlags::INDEX_BUFFER,
        BufferUsage::Uniform => vk::BufferUsageFlags::UNIFORM_BUFFER,
        BufferUsage::Storage => vk::BufferUsageFlags::STORAGE_BUFFER,
    };
    usage | vk::BufferUsageFlags::TRANSFER_DST
}

// ===== SAMPLERS =====

pub(crate) fn filter_to_vk(filter: Filter) -> vk::Filter {
    match filter {
        Filter::Nearest => vk::Filter::NEAREST,
        Filter::Linear => vk::Filter::LINEAR,
    }
}

pub(crate) fn mipmap_mode_to_vk(mode: MipmapMode) -> vk::SamplerMipmapMode {
    match mode {
        MipmapMode::Nearest => vk::SamplerMipmapMode::NEAREST,
        MipmapMode::Linear => vk::SamplerMipmapMode::LINEAR,
    }
}

pub(crate) fn address_mode_to_vk(mode: AddressMode) -> vk::SamplerAddressMode {
    match mode {
        AddressMode::Repeat => vk::SamplerAddressMode::REPEAT,
        AddressMode::ClampToEdge => vk::SamplerAddressMode::CLAMP_TO_EDGE,
    }
}

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
