/// Shader compilation with the on-disk binary cache

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::log::Diagnostics;
use crate::shader::cache::{CacheStore, ShaderIdentity};
use crate::shader::ShaderStage;
use crate::{engine_error, engine_info, engine_trace, engine_warn};

const LOG_SOURCE: &str = "neon::shader::compiler";

/// Semantics a binary is compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetEnvironment {
    /// Portable SPIR-V with Vulkan semantics, always compiled with the
    /// optimizer requested
    Vulkan,
    /// Binary for backends fed from decompiled native source, never optimized
    /// so the generated source stays readable
    OpenGl,
}

impl TargetEnvironment {
    /// Whether compiles for this target request the optimizer
    ///
    /// The request reaches the compiler backend, which decides what it
    /// means. `ShadercCompiler` runs its performance passes; `NagaCompiler`
    /// has no optimizer and emits the same SPIR-V either way, so builds
    /// without the `shaderc` feature ship unoptimized Vulkan binaries.
    pub fn optimizes(&self) -> bool {
        match self {
            TargetEnvironment::Vulkan => true,
            TargetEnvironment::OpenGl => false,
        }
    }

    /// Short lowercase name, as recorded in cache metadata
    pub fn name(&self) -> &'static str {
        match self {
            TargetEnvironment::Vulkan => "vulkan",
            TargetEnvironment::OpenGl => "opengl",
        }
    }

    /// Cache file suffix of `stage` for this target
    pub fn cache_extension(&self, stage: ShaderStage) -> &'static str {
        match (self, stage) {
            (TargetEnvironment::Vulkan, ShaderStage::Vertex) => ".cached_vulkan.vert",
            (TargetEnvironment::Vulkan, ShaderStage::Fragment) => ".cached_vulkan.frag",
            (TargetEnvironment::OpenGl, ShaderStage::Vertex) => ".cached_opengl.vert",
            (TargetEnvironment::OpenGl, ShaderStage::Fragment) => ".cached_opengl.frag",
            (TargetEnvironment::Vulkan, ShaderStage::Undefined) => ".cached_vulkan",
            (TargetEnvironment::OpenGl, ShaderStage::Undefined) => ".cached_opengl",
        }
    }
}

/// A GLSL to SPIR-V compiler
pub trait GlslCompiler: Send + Sync {
    /// Compiler name for diagnostics
    fn name(&self) -> &'static str;

    /// Compile one stage
    ///
    /// # Arguments
    ///
    /// * `source` - GLSL source of the stage
    /// * `stage` - Stage being compiled
    /// * `target` - Target environment
    /// * `source_name` - Name used in compiler messages
    /// * `optimize` - Run the optimizer
    ///
    /// # Errors
    ///
    /// `CompileError` carrying the compiler output verbatim.
    fn compile(
        &self,
        source: &str,
        stage: ShaderStage,
        target: TargetEnvironment,
        source_name: &str,
        optimize: bool,
    ) -> Result<Vec<u32>>;
}

/// One stage compiled to 32-bit words
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledBinary {
    /// Originating stage
    pub stage: ShaderStage,
    /// Target environment the words were compiled for
    pub target: TargetEnvironment,
    /// SPIR-V words
    pub words: Vec<u32>,
    /// Cache file the words are persisted to
    pub cache_path: PathBuf,
}

impl CompiledBinary {
    /// Words as bytes, in native order
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.words)
    }
}

/// Compiler front end applying the cache policy
///
/// When the source is unchanged the binary is loaded from the cache and the
/// compiler never runs. Otherwise the stage is compiled and the cache file
/// is overwritten.
pub struct ShaderCompiler {
    backend: Box<dyn GlslCompiler>,
    diagnostics: Diagnostics,
}

impl ShaderCompiler {
    /// Wrap a compiler backend
    pub fn new(backend: Box<dyn GlslCompiler>, diagnostics: Diagnostics) -> Self {
        Self { backend, diagnostics }
    }

    /// Compiler used by default: shaderc when the `shaderc` feature is on,
    /// the naga frontend otherwise
    pub fn with_default_backend(diagnostics: Diagnostics) -> Self {
        #[cfg(feature = "shaderc")]
        let backend: Box<dyn GlslCompiler> = Box::new(crate::shader::ShadercCompiler::new());
        #[cfg(not(feature = "shaderc"))]
        let backend: Box<dyn GlslCompiler> = Box::new(crate::shader::NagaCompiler::new());
        Self::new(backend, diagnostics)
    }

    /// Name of the compiler backend
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Compile one stage through the cache
    ///
    /// # Errors
    ///
    /// - `CacheMiss` when `source_changed` is false and no cached binary exists
    /// - `CompileError` when the compiler rejects the source; any stale cache
    ///   file for this stage is removed
    pub fn compile(
        &self,
        cache: &CacheStore,
        identity: &ShaderIdentity,
        source: &str,
        stage: ShaderStage,
        target: TargetEnvironment,
        source_changed: bool,
    ) -> Result<CompiledBinary> {
        if stage == ShaderStage::Undefined {
            return Err(Error::CompileError {
                stage,
                message: format!("{} has no stage to compile", identity.file_name()),
            });
        }

        let cache_path = cache.binary_path(identity, target, stage);

        if !source_changed {
            let words = cache.load_binary(&cache_path).map_err(|e| {
                engine_error!(self.diagnostics, LOG_SOURCE,
                    "Cached {} binary for {} unusable: {}", stage, identity.file_name(), e);
                e
            })?;
            engine_trace!(self.diagnostics, LOG_SOURCE,
                "Using cached {} binary {}", stage, cache_path.display());
            return Ok(CompiledBinary { stage, target, words, cache_path });
        }

        let words = self.compile_fresh(cache, identity, source, stage, target, &cache_path)?;
        cache.store_binary(&cache_path, &words)?;

        engine_info!(self.diagnostics, LOG_SOURCE,
            "Compiled {} with {} ({} words)", identity.compile_name(stage), self.backend.name(), words.len());
        Ok(CompiledBinary { stage, target, words, cache_path })
    }

    fn compile_fresh(
        &self,
        cache: &CacheStore,
        identity: &ShaderIdentity,
        source: &str,
        stage: ShaderStage,
        target: TargetEnvironment,
        cache_path: &Path,
    ) -> Result<Vec<u32>> {
        let name = identity.compile_name(stage);
        match self.backend.compile(source, stage, target, &name, target.optimizes()) {
            Ok(words) => Ok(words),
            Err(err) => {
                engine_error!(self.diagnostics, LOG_SOURCE, "{}", err);
                if let Err(remove_err) = cache.remove_binary(cache_path) {
                    engine_warn!(self.diagnostics, LOG_SOURCE,
                        "Failed to remove stale cache file {}: {}", cache_path.display(), remove_err);
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "compiler_tests.rs"]
mod tests;
