/// Pure-Rust GLSL compiler built on naga

use naga::back::spv;
use naga::front::glsl;
use naga::valid::{Capabilities, ValidationFlags, Validator};

use crate::error::{Error, Result};
use crate::shader::{GlslCompiler, ShaderStage, TargetEnvironment};

/// GLSL to SPIR-V through naga's GLSL frontend and SPIR-V backend
///
/// naga runs no optimization passes, so the `optimize` request only
/// controls whether debug names are kept. Names are always kept here since
/// reflection reports them.
#[derive(Debug, Default, Clone, Copy)]
pub struct NagaCompiler;

impl NagaCompiler {
    pub fn new() -> Self {
        Self
    }
}

pub(crate) fn naga_stage(stage: ShaderStage) -> Option<naga::ShaderStage> {
    match stage {
        ShaderStage::Vertex => Some(naga::ShaderStage::Vertex),
        ShaderStage::Fragment => Some(naga::ShaderStage::Fragment),
        ShaderStage::Undefined => None,
    }
}

impl GlslCompiler for NagaCompiler {
    fn name(&self) -> &'static str {
        "naga"
    }

    fn compile(
        &self,
        source: &str,
        stage: ShaderStage,
        _target: TargetEnvironment,
        source_name: &str,
        _optimize: bool,
    ) -> Result<Vec<u32>> {
        let compile_error = |message: String| Error::CompileError {
            stage,
            message: format!("{}: {}", source_name, message),
        };

        let shader_stage = naga_stage(stage)
            .ok_or_else(|| compile_error("undefined shader stage".to_string()))?;

        let mut frontend = glsl::Frontend::default();
        let module = frontend
            .parse(&glsl::Options::from(shader_stage), source)
            .map_err(|e| compile_error(e.to_string()))?;

        let info = Validator::new(ValidationFlags::all(), Capabilities::all())
            .validate(&module)
            .map_err(|e| compile_error(e.to_string()))?;

        let options = spv::Options {
            flags: spv::WriterFlags::DEBUG | spv::WriterFlags::LABEL_VARYINGS,
            ..Default::default()
        };
        let pipeline_options = spv::PipelineOptions {
            shader_stage,
            entry_point: "main".to_string(),
        };

        spv::write_vec(&module, &info, &options, Some(&pipeline_options))
            .map_err(|e| compile_error(e.to_string()))
    }
}
