/// Sampler state translation for the Vulkan backend
///
/// The renderer creates one sampler per preset at init; this module only
/// maps a `SamplerDesc` to its `VkSamplerCreateInfo`.

use ash::vk;
use neon_engine::neon::render::SamplerDesc;

use crate::vulkan_format::{address_mode_to_vk, compare_op_to_vk, filter_to_vk, mipmap_mode_to_vk};

/// Create info for `desc`
///
/// Anisotropy is clamped to `max_anisotropy_limit`; a clamped level of
/// 1.0 or less disables it.
pub(crate) fn sampler_create_info(desc: &SamplerDesc, max_anisotropy_limit: f32) -> vk::SamplerCreateInfo<'static> {
    let mut create_info = vk::SamplerCreateInfo::default()
        .mag_filter(filter_to_vk(desc.mag_filter))
        .min_filter(filter_to_vk(desc.min_filter))
        .mipmap_mode(mipmap_mode_to_vk(desc.mipmap_mode))
        .address_mode_u(address_mode_to_vk(desc.address_mode_u))
        .address_mode_v(address_mode_to_vk(desc.address_mode_v))
        .address_mode_w(address_mode_to_vk(desc.address_mode_w))
        .mip_lod_bias(desc.mip_lod_bias)
        .min_lod(desc.min_lod)
        .max_lod(desc.max_lod)
        .border_color(vk::BorderColor::FLOAT_OPAQUE_BLACK)
        .unnormalized_coordinates(false);

    create_info = match desc.compare {
        Some(op) => create_info.compare_enable(true).compare_op(compare_op_to_vk(op)),
        None => create_info.compare_enable(false).compare_op(vk::CompareOp::ALWAYS),
    };

    match desc.max_anisotropy.map(|level| level.min(max_anisotropy_limit)) {
        Some(level) if level > 1.0 => create_info.anisotropy_enable(true).max_anisotropy(level),
        _ => create_info.anisotropy_enable(false).max_anisotropy(1.0),
    }
}

#[cfg(test)]
#[path = "vulkan_sampler_tests.rs"]
mod tests;
