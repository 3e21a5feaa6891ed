/// Persistent store of compiled shader binaries
///
/// One raw binary file per (source identity, target environment, stage),
/// plus one metadata sidecar per source identity holding the fingerprint of
/// the source that produced the binaries and the targets they were built
/// for. Cache files mirror the source's path below the shader root, so
/// equally named shaders in different directories keep separate entries.

use std::ffi::OsString;
use std::hash::Hasher;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fs::FileSystem;
use crate::log::Diagnostics;
use crate::shader::{ShaderStage, TargetEnvironment};
use crate::{engine_debug, engine_trace, engine_warn};

const LOG_SOURCE: &str = "neon::shader::cache";

/// Suffix of the metadata sidecar
pub const META_SUFFIX: &str = ".cached.meta.toml";

/// Identity of a shader source, used to derive cache file names
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderIdentity {
    source_path: PathBuf,
    file_name: String,
    cache_key: PathBuf,
}

impl ShaderIdentity {
    /// Identity of the source at `source_path`, keyed by its file name
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        let source_path = source_path.into();
        let file_name = source_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "shader".to_string());
        let cache_key = PathBuf::from(&file_name);
        Self { source_path, file_name, cache_key }
    }

    /// Identity of a source below `root`, keyed by its path relative to it
    ///
    /// `ui/Sprite.glsl` and `world/Sprite.glsl` get distinct keys. A source
    /// outside `root` falls back to its file name.
    pub fn under_root(source_path: impl Into<PathBuf>, root: &Path) -> Self {
        let mut identity = Self::new(source_path);
        if let Ok(relative) = identity.source_path.strip_prefix(root) {
            if relative.file_name().is_some() {
                identity.cache_key = relative.to_path_buf();
            }
        }
        identity
    }

    /// Path of the source
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// File name of the source
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Relative path cache files are named after
    pub fn cache_key(&self) -> &Path {
        &self.cache_key
    }

    /// Name handed to compilers for one stage, e.g. `shaders/Sprite.glsl (vertex)`
    pub fn compile_name(&self, stage: ShaderStage) -> String {
        format!("{} ({})", self.source_path.display(), stage)
    }
}

/// Content of the metadata sidecar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CacheMeta {
    source: String,
    length: u64,
    fingerprint: String,
    /// Targets the recorded build produced binaries for
    #[serde(default)]
    targets: Vec<String>,
}

/// Shader binary cache
///
/// No locking: callers serialize rebuilds of the same entry.
pub struct CacheStore {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    diagnostics: Diagnostics,
}

impl CacheStore {
    /// Create a store rooted at `root`
    ///
    /// The directory is created on the first write.
    pub fn new(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>, diagnostics: Diagnostics) -> Self {
        Self {
            root: root.into(),
            fs,
            diagnostics,
        }
    }

    /// Cache directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the binary of `stage` compiled for `target`
    pub fn binary_path(
        &self,
        identity: &ShaderIdentity,
        target: TargetEnvironment,
        stage: ShaderStage,
    ) -> PathBuf {
        self.cache_file(identity, target.cache_extension(stage))
    }

    /// Path of the metadata sidecar of `identity`
    pub fn meta_path(&self, identity: &ShaderIdentity) -> PathBuf {
        self.cache_file(identity, META_SUFFIX)
    }

    fn cache_file(&self, identity: &ShaderIdentity, suffix: &str) -> PathBuf {
        let mut name = OsString::from(identity.cache_key().as_os_str());
        name.push(suffix);
        self.root.join(name)
    }

    /// Load a cached binary
    ///
    /// # Errors
    ///
    /// - `CacheMiss` if the file does not exist
    /// - `InvalidResource` if its length is not a whole number of words
    pub fn load_binary(&self, path: &Path) -> Result<Vec<u32>> {
        if !self.fs.exists(path) {
            return Err(Error::CacheMiss(path.to_path_buf()));
        }
        let bytes = match self.fs.read_all(path) {
            Ok(bytes) => bytes,
            Err(Error::NotFound(path)) => return Err(Error::CacheMiss(path)),
            Err(e) => return Err(e),
        };
        if bytes.len() % 4 != 0 {
            return Err(Error::InvalidResource(format!(
                "cached binary {} is {} bytes, not a whole number of words",
                path.display(),
                bytes.len()
            )));
        }

        let words = bytes
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect::<Vec<u32>>();
        engine_trace!(self.diagnostics, LOG_SOURCE, "Loaded {} words from {}", words.len(), path.display());
        Ok(words)
    }

    /// Write a binary, overwriting any existing file
    pub fn store_binary(&self, path: &Path, words: &[u32]) -> Result<()> {
        self.ensure_parent(path)?;
        let bytes: Vec<u8> = words.iter().flat_map(|word| word.to_le_bytes()).collect();
        self.fs.write_all(path, &bytes)?;
        engine_trace!(self.diagnostics, LOG_SOURCE, "Stored {} words to {}", words.len(), path.display());
        Ok(())
    }

    /// Remove a binary that can no longer be trusted
    pub fn remove_binary(&self, path: &Path) -> Result<()> {
        self.fs.remove(path)
    }

    /// Fingerprint of a source text
    pub fn fingerprint(source: &str) -> u64 {
        let mut hasher = FxHasher::default();
        hasher.write(source.as_bytes());
        hasher.write_usize(source.len());
        hasher.finish()
    }

    /// Whether `source` differs from the one recorded for `identity`, or the
    /// recorded build did not cover every one of `targets`
    ///
    /// A missing or unreadable sidecar counts as changed.
    pub fn source_changed(&self, identity: &ShaderIdentity, source: &str, targets: &[TargetEnvironment]) -> bool {
        let meta_path = self.meta_path(identity);
        let recorded = match self.read_meta(&meta_path) {
            Some(meta) => meta,
            None => {
                engine_debug!(self.diagnostics, LOG_SOURCE,
                    "No usable cache metadata for {}", identity.file_name());
                return true;
            }
        };

        let current = Self::meta_for(identity, source, targets);
        if recorded.fingerprint != current.fingerprint || recorded.length != current.length {
            engine_debug!(self.diagnostics, LOG_SOURCE, "Shader {} changed", identity.file_name());
            return true;
        }
        if let Some(missing) = current.targets.iter().find(|target| !recorded.targets.contains(target)) {
            engine_debug!(self.diagnostics, LOG_SOURCE,
                "Shader {} has no recorded {} build", identity.file_name(), missing);
            return true;
        }
        engine_debug!(self.diagnostics, LOG_SOURCE, "Shader {} unchanged", identity.file_name());
        false
    }

    /// Record the fingerprint of `source` and the `targets` it was built for
    /// after a successful build
    pub fn record_fingerprint(&self, identity: &ShaderIdentity, source: &str, targets: &[TargetEnvironment]) -> Result<()> {
        let meta_path = self.meta_path(identity);
        self.ensure_parent(&meta_path)?;
        let meta = Self::meta_for(identity, source, targets);
        let text = toml::to_string(&meta)
            .map_err(|e| Error::InvalidResource(format!("Failed to serialize cache metadata: {}", e)))?;
        self.fs.write_all(&meta_path, text.as_bytes())
    }

    fn meta_for(identity: &ShaderIdentity, source: &str, targets: &[TargetEnvironment]) -> CacheMeta {
        CacheMeta {
            source: identity.source_path().display().to_string(),
            length: source.len() as u64,
            fingerprint: format!("{:016x}", Self::fingerprint(source)),
            targets: targets.iter().map(|target| target.name().to_string()).collect(),
        }
    }

    fn read_meta(&self, path: &Path) -> Option<CacheMeta> {
        let text = self.fs.read_to_string(path).ok()?;
        match toml::from_str::<CacheMeta>(&text) {
            Ok(meta) => Some(meta),
            Err(e) => {
                engine_warn!(self.diagnostics, LOG_SOURCE,
                    "Ignoring corrupt cache metadata {}: {}", path.display(), e);
                None
            }
        }
    }

    fn ensure_parent(&self, path: &Path) -> Result<()> {
        match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => self.fs.create_dir_all(dir),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
