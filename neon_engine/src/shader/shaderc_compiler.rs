/// GLSL compiler backed by libshaderc

use crate::error::{Error, Result};
use crate::shader::{GlslCompiler, ShaderStage, TargetEnvironment};

/// GLSL to SPIR-V through shaderc
///
/// Vulkan targets compile against Vulkan 1.2, OpenGL targets against
/// OpenGL 4.5 with automatic binding and location assignment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShadercCompiler;

impl ShadercCompiler {
    pub fn new() -> Self {
        Self
    }
}

impl GlslCompiler for ShadercCompiler {
    fn name(&self) -> &'static str {
        "shaderc"
    }

    fn compile(
        &self,
        source: &str,
        stage: ShaderStage,
        target: TargetEnvironment,
        source_name: &str,
        optimize: bool,
    ) -> Result<Vec<u32>> {
        let kind = match stage {
            ShaderStage::Vertex => shaderc::ShaderKind::Vertex,
            ShaderStage::Fragment => shaderc::ShaderKind::Fragment,
            ShaderStage::Undefined => {
                return Err(Error::CompileError {
                    stage,
                    message: format!("{}: undefined shader stage", source_name),
                })
            }
        };

        let compiler = shaderc::Compiler::new()
            .ok_or_else(|| Error::InitializationFailed("shaderc compiler not available".to_string()))?;
        let mut options = shaderc::CompileOptions::new()
            .ok_or_else(|| Error::InitializationFailed("shaderc options not available".to_string()))?;

        match target {
            TargetEnvironment::Vulkan => {
                options.set_target_env(shaderc::TargetEnv::Vulkan, shaderc::EnvVersion::Vulkan1_2 as u32);
            }
            TargetEnvironment::OpenGl => {
                options.set_target_env(shaderc::TargetEnv::OpenGL, shaderc::EnvVersion::OpenGL4_5 as u32);
                options.set_auto_bind_uniforms(true);
                options.set_auto_map_locations(true);
            }
        }
        if optimize {
            options.set_optimization_level(shaderc::OptimizationLevel::Performance);
        }

        let artifact = compiler
            .compile_into_spirv(source, kind, source_name, "main", Some(&options))
            .map_err(|e| Error::CompileError {
                stage,
                message: e.to_string(),
            })?;

        Ok(artifact.as_binary().to_vec())
    }
}
