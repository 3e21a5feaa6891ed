/// Shader pipeline: preprocessing, compilation, caching, reflection and retargeting

mod stage;
mod preprocessor;
mod cache;
mod compiler;
mod naga_compiler;
#[cfg(feature = "shaderc")]
mod shaderc_compiler;
mod reflect;
mod cross;
mod processor;

#[cfg(test)]
pub(crate) mod test_sources;

pub use stage::ShaderStage;
pub use preprocessor::{split, ShaderSourceBundle, ShaderSourceLayout, COMBINED_EXTENSION, STAGE_MARKER};
pub use cache::{CacheStore, ShaderIdentity, META_SUFFIX};
pub use compiler::{CompiledBinary, GlslCompiler, ShaderCompiler, TargetEnvironment};
pub use naga_compiler::NagaCompiler;
#[cfg(feature = "shaderc")]
pub use shaderc_compiler::ShadercCompiler;
pub use reflect::{reflect, BindingResource, ReflectedMember, SamplerBinding, ShaderResources, UniformBufferResource};
pub use cross::{decompile_to_source, recompile, DECOMPILED_GLSL_VERSION};
pub use processor::{PipelineShaders, ProcessedShader, ShaderProcessorConfig, ShaderScriptProcessor, StageOutput};
