/// Sampler presets and sampler descriptor
///
/// The device creates one sampler per preset at init time. Presets are
/// immutable afterwards and shared by every material.

use std::fmt;

use crate::graphics_device::CompareOp;

/// Texture filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    Nearest,
    Linear,
}

/// Mipmap selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MipmapMode {
    Nearest,
    Linear,
}

/// Texture coordinate addressing outside [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    /// Tile the texture
    Repeat,
    /// Clamp to the edge texel
    ClampToEdge,
}

/// Anisotropy level of the anisotropic presets
pub const PRESET_ANISOTROPY: f32 = 4.0;

/// Named sampler configurations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SamplerPreset {
    DefaultLinear,
    DefaultNearest,
    PointClamp,
    PointWrap,
    LinearClamp,
    LinearWrap,
    AnisotropicClamp,
    AnisotropicWrap,
}

impl SamplerPreset {
    /// Every preset, in creation order
    pub const ALL: [SamplerPreset; 8] = [
        SamplerPreset::DefaultLinear,
        SamplerPreset::DefaultNearest,
        SamplerPreset::PointClamp,
        SamplerPreset::PointWrap,
        SamplerPreset::LinearClamp,
        SamplerPreset::LinearWrap,
        SamplerPreset::AnisotropicClamp,
        SamplerPreset::AnisotropicWrap,
    ];

    /// Sampler state of this preset
    pub fn desc(&self) -> SamplerDesc {
        match self {
            SamplerPreset::DefaultLinear => SamplerDesc {
                min_lod: 1.0,
                max_lod: 1.0,
                ..SamplerDesc::new(Filter::Linear, MipmapMode::Linear, AddressMode::ClampToEdge)
            },
            SamplerPreset::DefaultNearest => SamplerDesc {
                min_lod: 1.0,
                max_lod: 1.0,
                ..SamplerDesc::new(Filter::Nearest, MipmapMode::Nearest, AddressMode::ClampToEdge)
            },
            SamplerPreset::PointClamp => SamplerDesc::new(Filter::Nearest, MipmapMode::Nearest, AddressMode::ClampToEdge),
            SamplerPreset::PointWrap => SamplerDesc::new(Filter::Nearest, MipmapMode::Nearest, AddressMode::Repeat),
            SamplerPreset::LinearClamp => SamplerDesc::new(Filter::Linear, MipmapMode::Linear, AddressMode::ClampToEdge),
            SamplerPreset::LinearWrap => SamplerDesc::new(Filter::Linear, MipmapMode::Linear, AddressMode::Repeat),
            SamplerPreset::AnisotropicClamp => SamplerDesc {
                max_anisotropy: Some(PRESET_ANISOTROPY),
                ..SamplerDesc::new(Filter::Linear, MipmapMode::Linear, AddressMode::ClampToEdge)
            },
            SamplerPreset::AnisotropicWrap => SamplerDesc {
                max_anisotropy: Some(PRESET_ANISOTROPY),
                ..SamplerDesc::new(Filter::Linear, MipmapMode::Linear, AddressMode::Repeat)
            },
        }
    }

    /// Preset name, e.g. `AnisotropicWrap`
    pub fn name(&self) -> &'static str {
        match self {
            SamplerPreset::DefaultLinear => "DefaultLinear",
            SamplerPreset::DefaultNearest => "DefaultNearest",
            SamplerPreset::PointClamp => "PointClamp",
            SamplerPreset::PointWrap => "PointWrap",
            SamplerPreset::LinearClamp => "LinearClamp",
            SamplerPreset::LinearWrap => "LinearWrap",
            SamplerPreset::AnisotropicClamp => "AnisotropicClamp",
            SamplerPreset::AnisotropicWrap => "AnisotropicWrap",
        }
    }
}

impl fmt::Display for SamplerPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Descriptor for creating a sampler
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerDesc {
    /// Minification filter
    pub min_filter: Filter,
    /// Magnification filter
    pub mag_filter: Filter,
    /// Mipmap selection
    pub mipmap_mode: MipmapMode,
    pub address_mode_u: AddressMode,
    pub address_mode_v: AddressMode,
    pub address_mode_w: AddressMode,
    /// Bias added to the computed LOD
    pub mip_lod_bias: f32,
    /// LOD clamp
    pub min_lod: f32,
    pub max_lod: f32,
    /// Anisotropic filtering level (None = disabled)
    pub max_anisotropy: Option<f32>,
    /// Depth comparison (None = disabled)
    pub compare: Option<CompareOp>,
}

impl SamplerDesc {
    /// Sampler using `filter` for both minification and magnification, the
    /// same addressing on every axis, and no LOD range, anisotropy or
    /// comparison
    pub fn new(filter: Filter, mipmap_mode: MipmapMode, address_mode: AddressMode) -> Self {
        Self {
            min_filter: filter,
            mag_filter: filter,
            mipmap_mode,
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            address_mode_w: address_mode,
            mip_lod_bias: 0.0,
            min_lod: 0.0,
            max_lod: 0.0,
            max_anisotropy: None,
            compare: None,
        }
    }
}

#[cfg(test)]
#[path = "sampler_tests.rs"]
mod tests;
