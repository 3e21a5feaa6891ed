/// Binary retargeting through high-level source
///
/// Backends that consume their own binary flavor get it in two visible
/// steps: the portable binary is decompiled to desktop GLSL, and that text
/// is compiled again for the backend's target environment. The
/// decompilation is lossy (names and layout may change) but preserves
/// resource bindings.

use naga::back::glsl;
use naga::front::spv;
use naga::valid::{Capabilities, ValidationFlags, Validator};

use crate::error::{Error, Result};
use crate::shader::cache::{CacheStore, ShaderIdentity};
use crate::shader::naga_compiler::naga_stage;
use crate::shader::{CompiledBinary, ShaderCompiler, ShaderStage, TargetEnvironment};

/// GLSL version produced by [`decompile_to_source`]
pub const DECOMPILED_GLSL_VERSION: u16 = 450;

/// Decompile a SPIR-V binary to desktop GLSL source
///
/// # Errors
///
/// `CompileError` if the binary cannot be parsed, validated or written back
/// as GLSL.
pub fn decompile_to_source(stage: ShaderStage, words: &[u32]) -> Result<String> {
    let decompile_error = |message: String| Error::CompileError {
        stage,
        message: format!("decompilation to GLSL failed: {}", message),
    };

    let shader_stage = naga_stage(stage)
        .ok_or_else(|| decompile_error("undefined shader stage".to_string()))?;

    let module = spv::parse_u8_slice(bytemuck::cast_slice(words), &spv::Options::default())
        .map_err(|e| decompile_error(e.to_string()))?;

    let info = Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|e| decompile_error(e.to_string()))?;

    let options = glsl::Options {
        version: glsl::Version::Desktop(DECOMPILED_GLSL_VERSION),
        ..Default::default()
    };
    let pipeline_options = glsl::PipelineOptions {
        shader_stage,
        entry_point: "main".to_string(),
        multiview: None,
    };

    let mut source = String::new();
    let mut writer = glsl::Writer::new(
        &mut source,
        &module,
        &info,
        &options,
        &pipeline_options,
        naga::proc::BoundsCheckPolicies::default(),
    )
    .map_err(|e| decompile_error(e.to_string()))?;
    writer.write().map_err(|e| decompile_error(e.to_string()))?;

    Ok(source)
}

/// Compile decompiled source for `target` through the cache
///
/// Second half of the retargeting path; the binary lands in the cache file
/// of `target`, separate from the portable binary it was derived from.
pub fn recompile(
    compiler: &ShaderCompiler,
    cache: &CacheStore,
    identity: &ShaderIdentity,
    source: &str,
    stage: ShaderStage,
    target: TargetEnvironment,
    source_changed: bool,
) -> Result<CompiledBinary> {
    compiler.compile(cache, identity, source, stage, target, source_changed)
}

#[cfg(test)]
#[path = "cross_tests.rs"]
mod tests;
