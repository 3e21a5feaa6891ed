/// Buffer descriptor and vertex element formats

use std::str::FromStr;

use crate::error::{Error, Result};

/// Buffer usage flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Vertex buffer
    Vertex,
    /// Index buffer
    Index,
    /// Uniform/constant buffer
    Uniform,
    /// Storage buffer
    Storage,
}

/// Descriptor for creating a buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDesc {
    /// Debug name attached to the GPU object
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Buffer usage
    pub usage: BufferUsage,
}

/// Buffer data format for vertex attributes
///
/// Defines the data type and component count of one vertex element. Raw
/// codes follow the VkFormat numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum BufferFormat {
    // Float formats
    R32_SFLOAT,         // float (4 bytes)
    R32G32_SFLOAT,      // vec2 (8 bytes)
    R32G32B32_SFLOAT,   // vec3 (12 bytes)
    R32G32B32A32_SFLOAT, // vec4 (16 bytes)

    // Integer formats (signed)
    R32_SINT,
    R32G32_SINT,
    R32G32B32_SINT,
    R32G32B32A32_SINT,

    // Integer formats (unsigned)
    R32_UINT,
    R32G32_UINT,
    R32G32B32_UINT,
    R32G32B32A32_UINT,

    // Short formats (signed)
    R16_SINT,
    R16G16_SINT,
    R16G16B16A16_SINT,

    // Short formats (unsigned)
    R16_UINT,
    R16G16_UINT,
    R16G16B16A16_UINT,

    // Byte formats (signed)
    R8_SINT,
    R8G8_SINT,
    R8G8B8A8_SINT,

    // Byte formats (unsigned)
    R8_UINT,
    R8G8_UINT,
    R8G8B8A8_UINT,
}

impl BufferFormat {
    /// Every format, in declaration order
    pub const ALL: [BufferFormat; 24] = [
        BufferFormat::R32_SFLOAT,
        BufferFormat::R32G32_SFLOAT,
        BufferFormat::R32G32B32_SFLOAT,
        BufferFormat::R32G32B32A32_SFLOAT,
        BufferFormat::R32_SINT,
        BufferFormat::R32G32_SINT,
        BufferFormat::R32G32B32_SINT,
        BufferFormat::R32G32B32A32_SINT,
        BufferFormat::R32_UINT,
        BufferFormat::R32G32_UINT,
        BufferFormat::R32G32B32_UINT,
        BufferFormat::R32G32B32A32_UINT,
        BufferFormat::R16_SINT,
        BufferFormat::R16G16_SINT,
        BufferFormat::R16G16B16A16_SINT,
        BufferFormat::R16_UINT,
        BufferFormat::R16G16_UINT,
        BufferFormat::R16G16B16A16_UINT,
        BufferFormat::R8_SINT,
        BufferFormat::R8G8_SINT,
        BufferFormat::R8G8B8A8_SINT,
        BufferFormat::R8_UINT,
        BufferFormat::R8G8_UINT,
        BufferFormat::R8G8B8A8_UINT,
    ];

    /// Returns size in bytes for this format
    pub fn size_bytes(&self) -> u32 {
        match self {
            // Float formats
            BufferFormat::R32_SFLOAT | BufferFormat::R32_SINT | BufferFormat::R32_UINT => 4,
            BufferFormat::R32G32_SFLOAT | BufferFormat::R32G32_SINT | BufferFormat::R32G32_UINT => 8,
            BufferFormat::R32G32B32_SFLOAT | BufferFormat::R32G32B32_SINT | BufferFormat::R32G32B32_UINT => 12,
            BufferFormat::R32G32B32A32_SFLOAT | BufferFormat::R32G32B32A32_SINT | BufferFormat::R32G32B32A32_UINT => 16,

            // Short formats
            BufferFormat::R16_SINT | BufferFormat::R16_UINT => 2,
            BufferFormat::R16G16_SINT | BufferFormat::R16G16_UINT => 4,
            BufferFormat::R16G16B16A16_SINT | BufferFormat::R16G16B16A16_UINT => 8,

            // Byte formats
            BufferFormat::R8_SINT | BufferFormat::R8_UINT => 1,
            BufferFormat::R8G8_SINT | BufferFormat::R8G8_UINT => 2,
            BufferFormat::R8G8B8A8_SINT | BufferFormat::R8G8B8A8_UINT => 4,
        }
    }

    /// Raw format code
    pub fn code(&self) -> u32 {
        match self {
            BufferFormat::R8_UINT => 13,
            BufferFormat::R8_SINT => 14,
            BufferFormat::R8G8_UINT => 20,
            BufferFormat::R8G8_SINT => 21,
            BufferFormat::R8G8B8A8_UINT => 41,
            BufferFormat::R8G8B8A8_SINT => 42,
            BufferFormat::R16_UINT => 74,
            BufferFormat::R16_SINT => 75,
            BufferFormat::R16G16_UINT => 81,
            BufferFormat::R16G16_SINT => 82,
            BufferFormat::R16G16B16A16_UINT => 95,
            BufferFormat::R16G16B16A16_SINT => 96,
            BufferFormat::R32_UINT => 98,
            BufferFormat::R32_SINT => 99,
            BufferFormat::R32_SFLOAT => 100,
            BufferFormat::R32G32_UINT => 101,
            BufferFormat::R32G32_SINT => 102,
            BufferFormat::R32G32_SFLOAT => 103,
            BufferFormat::R32G32B32_UINT => 104,
            BufferFormat::R32G32B32_SINT => 105,
            BufferFormat::R32G32B32_SFLOAT => 106,
            BufferFormat::R32G32B32A32_UINT => 107,
            BufferFormat::R32G32B32A32_SINT => 108,
            BufferFormat::R32G32B32A32_SFLOAT => 109,
        }
    }

    /// Format name as written in descriptions, e.g. `R32G32_SFLOAT`
    pub fn name(&self) -> &'static str {
        match self {
            BufferFormat::R32_SFLOAT => "R32_SFLOAT",
            BufferFormat::R32G32_SFLOAT => "R32G32_SFLOAT",
            BufferFormat::R32G32B32_SFLOAT => "R32G32B32_SFLOAT",
            BufferFormat::R32G32B32A32_SFLOAT => "R32G32B32A32_SFLOAT",
            BufferFormat::R32_SINT => "R32_SINT",
            BufferFormat::R32G32_SINT => "R32G32_SINT",
            BufferFormat::R32G32B32_SINT => "R32G32B32_SINT",
            BufferFormat::R32G32B32A32_SINT => "R32G32B32A32_SINT",
            BufferFormat::R32_UINT => "R32_UINT",
            BufferFormat::R32G32_UINT => "R32G32_UINT",
            BufferFormat::R32G32B32_UINT => "R32G32B32_UINT",
            BufferFormat::R32G32B32A32_UINT => "R32G32B32A32_UINT",
            BufferFormat::R16_SINT => "R16_SINT",
            BufferFormat::R16G16_SINT => "R16G16_SINT",
            BufferFormat::R16G16B16A16_SINT => "R16G16B16A16_SINT",
            BufferFormat::R16_UINT => "R16_UINT",
            BufferFormat::R16G16_UINT => "R16G16_UINT",
            BufferFormat::R16G16B16A16_UINT => "R16G16B16A16_UINT",
            BufferFormat::R8_SINT => "R8_SINT",
            BufferFormat::R8G8_SINT => "R8G8_SINT",
            BufferFormat::R8G8B8A8_SINT => "R8G8B8A8_SINT",
            BufferFormat::R8_UINT => "R8_UINT",
            BufferFormat::R8G8_UINT => "R8G8_UINT",
            BufferFormat::R8G8B8A8_UINT => "R8G8B8A8_UINT",
        }
    }
}

impl TryFrom<u32> for BufferFormat {
    type Error = Error;

    fn try_from(code: u32) -> Result<Self> {
        BufferFormat::ALL
            .into_iter()
            .find(|format| format.code() == code)
            .ok_or_else(|| Error::PipelineCreation(format!("Invalid vertex attribute format {}", code)))
    }
}

impl FromStr for BufferFormat {
    type Err = Error;

    /// Parse a format name, or one of the `float`..`float4` shorthands
    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        let shorthand = match name.to_ascii_lowercase().as_str() {
            "float" => Some(BufferFormat::R32_SFLOAT),
            "float2" => Some(BufferFormat::R32G32_SFLOAT),
            "float3" => Some(BufferFormat::R32G32B32_SFLOAT),
            "float4" => Some(BufferFormat::R32G32B32A32_SFLOAT),
            _ => None,
        };

        shorthand
            .or_else(|| {
                BufferFormat::ALL
                    .into_iter()
                    .find(|format| format.name().eq_ignore_ascii_case(name))
            })
            .ok_or_else(|| Error::PipelineCreation(format!("Invalid vertex attribute format '{}'", s)))
    }
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
