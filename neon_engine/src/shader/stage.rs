/// Shader stage identification

use std::fmt;

/// One half of a paired shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStage {
    /// Vertex stage
    Vertex,
    /// Fragment (pixel) stage
    Fragment,
    /// Parse or classification failure
    Undefined,
}

impl ShaderStage {
    /// The stages a graphics program needs, in pipeline order
    pub const PROGRAM: [ShaderStage; 2] = [ShaderStage::Vertex, ShaderStage::Fragment];

    /// Resolve a stage keyword (`vertex`, `fragment`, or its alias `pixel`)
    ///
    /// Anything else yields `Undefined`.
    pub fn from_keyword(keyword: &str) -> ShaderStage {
        match keyword {
            "vertex" => ShaderStage::Vertex,
            "fragment" | "pixel" => ShaderStage::Fragment,
            _ => ShaderStage::Undefined,
        }
    }

    /// Lowercase stage name
    pub fn as_str(&self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
            ShaderStage::Undefined => "undefined",
        }
    }

    /// Conventional file extension of a single-stage source file
    pub fn file_extension(&self) -> Option<&'static str> {
        match self {
            ShaderStage::Vertex => Some("vert"),
            ShaderStage::Fragment => Some("frag"),
            ShaderStage::Undefined => None,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
