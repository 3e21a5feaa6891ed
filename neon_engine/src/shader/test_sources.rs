//! GLSL sources shared by the shader unit tests
//!
//! Written for naga's GLSL frontend: textures and samplers are declared
//! separately and combined at the call site.

use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::shader::{GlslCompiler, ShaderStage, TargetEnvironment};

pub const SPRITE_VERTEX: &str = "#version 450
layout(location = 0) in vec2 a_position;
layout(location = 1) in vec2 a_uv;
layout(location = 0) out vec2 v_uv;

layout(set = 1, binding = 0) uniform Camera {
    mat4 view_projection;
    vec4 tint;
} camera;

void main() {
    v_uv = a_uv;
    gl_Position = camera.view_projection * vec4(a_position, 0.0, 1.0);
}
";

pub const SPRITE_FRAGMENT: &str = "#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 o_color;

layout(set = 2, binding = 0) uniform texture2D u_texture;
layout(set = 2, binding = 1) uniform sampler u_sampler;

layout(set = 3, binding = 0) uniform Material {
    vec4 color;
} material;

void main() {
    o_color = texture(sampler2D(u_texture, u_sampler), v_uv) * material.color;
}
";

/// Fragment stage declaring no resources
pub const PLAIN_FRAGMENT: &str = "#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 o_color;

void main() {
    o_color = vec4(v_uv, 0.0, 1.0);
}
";

/// Both sprite stages in one combined file
pub fn sprite_combined() -> String {
    format!("#type vertex\n{}#type fragment\n{}", SPRITE_VERTEX, SPRITE_FRAGMENT)
}

/// One call observed by [`FakeCompiler`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileCall {
    pub source_name: String,
    pub stage: ShaderStage,
    pub target: TargetEnvironment,
    pub optimize: bool,
}

/// Compiler double producing deterministic words from the source text
///
/// Sources containing `#error` are rejected with a `CompileError`.
#[derive(Debug, Clone, Default)]
pub struct FakeCompiler {
    calls: Arc<Mutex<Vec<CompileCall>>>,
}

impl FakeCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<CompileCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Words the fake produces for `source`
    pub fn words_for(source: &str) -> Vec<u32> {
        let mut words = vec![0x0723_0203, source.len() as u32];
        words.extend(source.bytes().map(u32::from));
        words
    }
}

impl GlslCompiler for FakeCompiler {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn compile(
        &self,
        source: &str,
        stage: ShaderStage,
        target: TargetEnvironment,
        source_name: &str,
        optimize: bool,
    ) -> Result<Vec<u32>> {
        self.calls.lock().unwrap().push(CompileCall {
            source_name: source_name.to_string(),
            stage,
            target,
            optimize,
        });
        if source.contains("#error") {
            return Err(Error::CompileError {
                stage,
                message: format!("{}: #error directive", source_name),
            });
        }
        Ok(Self::words_for(source))
    }
}
