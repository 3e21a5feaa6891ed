/// Shader script processing
///
/// Loads a shader program by name, compiles each stage through the binary
/// cache, optionally retargets it for a native backend, and reflects the
/// resources every stage declares.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::fs::FileSystem;
use crate::log::Diagnostics;
use crate::shader::cache::{CacheStore, ShaderIdentity};
use crate::shader::cross::{decompile_to_source, recompile};
use crate::shader::preprocessor::ShaderSourceLayout;
use crate::shader::reflect::{reflect, ShaderResources};
use crate::shader::{CompiledBinary, ShaderCompiler, ShaderStage, TargetEnvironment};
use crate::{engine_debug, engine_error, engine_info, engine_trace, engine_warn};

const LOG_SOURCE: &str = "neon::shader";

/// Shader processor configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderProcessorConfig {
    /// Directory holding shader sources
    pub shader_root: PathBuf,
    /// Directory holding compiled binaries and their metadata
    pub cache_root: PathBuf,
    /// Second target for backends fed from decompiled source
    pub native_target: Option<TargetEnvironment>,
}

impl Default for ShaderProcessorConfig {
    fn default() -> Self {
        Self {
            shader_root: PathBuf::from("Engine/Shader/GLSL"),
            cache_root: PathBuf::from("Engine/Intermediate/Shader/GLSL"),
            native_target: None,
        }
    }
}

/// Everything produced for one stage
#[derive(Debug, Clone)]
pub struct StageOutput {
    /// Portable binary
    pub binary: CompiledBinary,
    /// Binary for the native target, when one is configured
    pub native: Option<CompiledBinary>,
    /// Resources reflected from the portable binary
    pub resources: ShaderResources,
}

/// A processed shader program
#[derive(Debug, Clone)]
pub struct ProcessedShader {
    /// Name the program was requested by
    pub name: String,
    /// Identity used for cache files
    pub identity: ShaderIdentity,
    /// Whether the sources differed from the recorded fingerprint
    pub recompiled: bool,
    stages: BTreeMap<ShaderStage, StageOutput>,
}

/// Both stages of a program, ready for pipeline creation
#[derive(Debug, Clone, Copy)]
pub struct PipelineShaders<'a> {
    pub vertex: &'a StageOutput,
    pub fragment: &'a StageOutput,
}

impl ProcessedShader {
    /// Output of `stage`, if the program has it
    pub fn stage(&self, stage: ShaderStage) -> Option<&StageOutput> {
        self.stages.get(&stage)
    }

    /// Stages present, in stage order
    pub fn stages(&self) -> impl Iterator<Item = ShaderStage> + '_ {
        self.stages.keys().copied()
    }

    /// The vertex and fragment stages
    ///
    /// # Errors
    ///
    /// `MissingStage` naming the first absent stage.
    pub fn pipeline_shaders(&self) -> Result<PipelineShaders<'_>> {
        let vertex = self
            .stage(ShaderStage::Vertex)
            .ok_or(Error::MissingStage(ShaderStage::Vertex))?;
        let fragment = self
            .stage(ShaderStage::Fragment)
            .ok_or(Error::MissingStage(ShaderStage::Fragment))?;
        Ok(PipelineShaders { vertex, fragment })
    }
}

/// Turns shader sources into compiled, reflected stages
pub struct ShaderScriptProcessor {
    config: ShaderProcessorConfig,
    fs: Arc<dyn FileSystem>,
    compiler: ShaderCompiler,
    cache: CacheStore,
    diagnostics: Diagnostics,
}

impl ShaderScriptProcessor {
    /// Create a processor
    ///
    /// The cache store is rooted at `config.cache_root` and shares `fs`.
    pub fn new(
        config: ShaderProcessorConfig,
        fs: Arc<dyn FileSystem>,
        compiler: ShaderCompiler,
        diagnostics: Diagnostics,
    ) -> Self {
        let cache = CacheStore::new(config.cache_root.clone(), fs.clone(), diagnostics.clone());
        Self {
            config,
            fs,
            compiler,
            cache,
            diagnostics,
        }
    }

    /// Processor configuration
    pub fn config(&self) -> &ShaderProcessorConfig {
        &self.config
    }

    /// Binary cache
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Load, compile and reflect the shader program `name`
    ///
    /// The recorded fingerprint is only updated once every stage succeeded,
    /// so a failed build is retried from source on the next call.
    pub fn process(&self, name: &str) -> Result<ProcessedShader> {
        let layout = ShaderSourceLayout::resolve(self.fs.as_ref(), &self.config.shader_root, name)
            .map_err(|e| {
                engine_error!(self.diagnostics, LOG_SOURCE, "Shader '{}' not found: {}", name, e);
                e
            })?;
        let bundle = layout.load(self.fs.as_ref()).map_err(|e| {
            engine_error!(self.diagnostics, LOG_SOURCE, "Failed to load shader '{}': {}", name, e);
            e
        })?;

        let identity = ShaderIdentity::under_root(layout.identity_path(), &self.config.shader_root);
        if bundle.is_empty() {
            engine_warn!(self.diagnostics, LOG_SOURCE,
                "Shader {} declares no stages", identity.source_path().display());
        }

        let fingerprint_source = bundle.concatenated();
        let targets = self.targets();
        let changed = self.cache.source_changed(&identity, &fingerprint_source, &targets);

        let mut stages = BTreeMap::new();
        for (stage, source) in bundle.iter() {
            let output = self.process_stage(&identity, source, stage, changed)?;
            stages.insert(stage, output);
        }

        if changed {
            self.cache.record_fingerprint(&identity, &fingerprint_source, &targets)?;
        }

        engine_info!(self.diagnostics, LOG_SOURCE, "Processed shader {} ({} stages, {})",
            identity.source_path().display(), stages.len(), if changed { "compiled" } else { "cached" });

        Ok(ProcessedShader {
            name: name.to_string(),
            identity,
            recompiled: changed,
            stages,
        })
    }

    /// Targets every build produces binaries for
    fn targets(&self) -> Vec<TargetEnvironment> {
        let mut targets = vec![TargetEnvironment::Vulkan];
        if let Some(native) = self.native_target() {
            targets.push(native);
        }
        targets
    }

    fn native_target(&self) -> Option<TargetEnvironment> {
        self.config
            .native_target
            .filter(|target| *target != TargetEnvironment::Vulkan)
    }

    fn process_stage(
        &self,
        identity: &ShaderIdentity,
        source: &str,
        stage: ShaderStage,
        changed: bool,
    ) -> Result<StageOutput> {
        let binary = self.compiler.compile(
            &self.cache,
            identity,
            source,
            stage,
            TargetEnvironment::Vulkan,
            changed,
        )?;

        let native = match self.native_target() {
            Some(target) => {
                let native_source = decompile_to_source(stage, &binary.words)?;
                engine_debug!(self.diagnostics, LOG_SOURCE,
                    "Decompiled {} ({} bytes of GLSL)", identity.compile_name(stage), native_source.len());
                Some(recompile(&self.compiler, &self.cache, identity, &native_source, stage, target, changed)?)
            }
            None => None,
        };

        let resources = reflect(stage, &binary.words).map_err(|e| {
            engine_error!(self.diagnostics, LOG_SOURCE, "{}: {}", identity.compile_name(stage), e);
            e
        })?;
        self.log_resources(identity, &resources);

        Ok(StageOutput { binary, native, resources })
    }

    fn log_resources(&self, identity: &ShaderIdentity, resources: &ShaderResources) {
        engine_trace!(self.diagnostics, LOG_SOURCE, "{} {} shader: {} uniform buffers, {} sampled images",
            identity.file_name(), resources.stage, resources.uniform_buffer_count(), resources.sampler_count());

        for buffer in &resources.uniform_buffers {
            engine_trace!(self.diagnostics, LOG_SOURCE,
                "  uniform {}: size = {}, set = {}, binding = {}, members = {}",
                buffer.name, buffer.size, buffer.set, buffer.binding, buffer.member_count());
        }
        for image in &resources.sampled_images {
            engine_trace!(self.diagnostics, LOG_SOURCE,
                "  sampled image {}: set = {}, binding = {}", image.name, image.set, image.binding);
        }
    }
}

#[cfg(test)]
#[path = "processor_tests.rs"]
mod tests;
