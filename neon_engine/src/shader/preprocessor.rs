/// Shader script preprocessor
///
/// Splits a combined GLSL file into per-stage sources using `#type <stage>`
/// marker lines, or gathers the sources of a per-stage file layout
/// (`<name>.vert` + `<name>.frag`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::fs::FileSystem;
use crate::shader::ShaderStage;

/// Token opening a stage marker line
pub const STAGE_MARKER: &str = "#type";

/// Extension of combined multi-stage sources
pub const COMBINED_EXTENSION: &str = "glsl";

/// Per-stage source text of one shader program
///
/// Holds at most one source per stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderSourceBundle {
    stages: BTreeMap<ShaderStage, String>,
}

impl ShaderSourceBundle {
    /// Create an empty bundle
    pub fn new() -> Self {
        Self::default()
    }

    /// Source of `stage`, if present
    pub fn get(&self, stage: ShaderStage) -> Option<&str> {
        self.stages.get(&stage).map(String::as_str)
    }

    /// Whether `stage` has a source
    pub fn contains(&self, stage: ShaderStage) -> bool {
        self.stages.contains_key(&stage)
    }

    /// Add the source of `stage`
    ///
    /// Fails with `SyntaxError` if the stage already has a source.
    pub fn insert(&mut self, stage: ShaderStage, source: String) -> Result<()> {
        if self.stages.contains_key(&stage) {
            return Err(Error::SyntaxError(format!("duplicate {} stage", stage)));
        }
        self.stages.insert(stage, source);
        Ok(())
    }

    /// Number of stages present
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether no stage is present
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stages and sources in stage order
    pub fn iter(&self) -> impl Iterator<Item = (ShaderStage, &str)> {
        self.stages.iter().map(|(stage, source)| (*stage, source.as_str()))
    }

    /// Concatenate every source in stage order
    ///
    /// Used to fingerprint a program regardless of its file layout.
    pub fn concatenated(&self) -> String {
        self.stages.values().map(String::as_str).collect()
    }
}

/// Split a combined source into per-stage blocks
///
/// A marker is a line starting with `#type` followed by whitespace and a
/// stage keyword. The block of a marker runs from the line after it to the
/// next marker line or the end of the source. Text before the first marker
/// is ignored; a source without markers yields an empty bundle.
///
/// # Errors
///
/// - `SyntaxError` when a marker line has no terminating line break, or a
///   stage appears twice
/// - `UnknownStage` when the keyword is not `vertex`, `fragment` or `pixel`
pub fn split(source: &str) -> Result<ShaderSourceBundle> {
    let markers = marker_positions(source);
    let mut bundle = ShaderSourceBundle::new();

    for (index, &marker) in markers.iter().enumerate() {
        let declaration = marker + STAGE_MARKER.len();
        let eol = source[declaration..]
            .find(['\r', '\n'])
            .map(|offset| declaration + offset)
            .ok_or_else(|| {
                Error::SyntaxError(format!(
                    "stage marker at byte {} has no terminating line break",
                    marker
                ))
            })?;

        let keyword = source[declaration..eol].trim();
        let stage = ShaderStage::from_keyword(keyword);
        if stage == ShaderStage::Undefined {
            return Err(Error::UnknownStage(keyword.to_string()));
        }

        let body_start = if source[eol..].starts_with("\r\n") { eol + 2 } else { eol + 1 };
        let body_end = markers.get(index + 1).copied().unwrap_or(source.len());

        bundle.insert(stage, source[body_start..body_end].to_string())?;
    }

    Ok(bundle)
}

/// Byte offsets of every marker line
fn marker_positions(source: &str) -> Vec<usize> {
    let line_starts = std::iter::once(0).chain(
        source
            .match_indices('\n')
            .map(|(offset, _)| offset + 1)
            .filter(|&start| start < source.len()),
    );

    line_starts
        .filter(|&start| {
            let line = &source[start..];
            line.starts_with(STAGE_MARKER)
                && line[STAGE_MARKER.len()..]
                    .chars()
                    .next()
                    .map_or(true, char::is_whitespace)
        })
        .collect()
}

/// Where the sources of a shader program live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderSourceLayout {
    /// One file holding every stage, split by markers
    Combined(PathBuf),
    /// One file per stage
    PerStage {
        vertex: Option<PathBuf>,
        fragment: Option<PathBuf>,
    },
}

impl ShaderSourceLayout {
    /// Resolve the layout of the shader `name` under `root`
    ///
    /// A name with an extension is a combined file. A bare name resolves to
    /// `<name>.glsl` when it exists, otherwise to `<name>.vert` and
    /// `<name>.frag`.
    pub fn resolve(fs: &dyn FileSystem, root: &Path, name: &str) -> Result<Self> {
        let direct = root.join(name);
        if Path::new(name).extension().is_some() {
            return if fs.exists(&direct) {
                Ok(ShaderSourceLayout::Combined(direct))
            } else {
                Err(Error::NotFound(direct))
            };
        }

        let combined = root.join(format!("{}.{}", name, COMBINED_EXTENSION));
        if fs.exists(&combined) {
            return Ok(ShaderSourceLayout::Combined(combined));
        }

        let stage_path = |stage: ShaderStage| {
            stage
                .file_extension()
                .map(|ext| root.join(format!("{}.{}", name, ext)))
                .filter(|path| fs.exists(path))
        };
        let vertex = stage_path(ShaderStage::Vertex);
        let fragment = stage_path(ShaderStage::Fragment);

        if vertex.is_none() && fragment.is_none() {
            return Err(Error::NotFound(combined));
        }
        Ok(ShaderSourceLayout::PerStage { vertex, fragment })
    }

    /// Read the sources and build the bundle
    pub fn load(&self, fs: &dyn FileSystem) -> Result<ShaderSourceBundle> {
        match self {
            ShaderSourceLayout::Combined(path) => split(&fs.read_to_string(path)?),
            ShaderSourceLayout::PerStage { vertex, fragment } => {
                let mut bundle = ShaderSourceBundle::new();
                for (stage, path) in [(ShaderStage::Vertex, vertex), (ShaderStage::Fragment, fragment)] {
                    if let Some(path) = path {
                        bundle.insert(stage, fs.read_to_string(path)?)?;
                    }
                }
                Ok(bundle)
            }
        }
    }

    /// Path naming this program in cache file names and diagnostics
    pub fn identity_path(&self) -> PathBuf {
        match self {
            ShaderSourceLayout::Combined(path) => path.clone(),
            ShaderSourceLayout::PerStage { vertex, fragment } => vertex
                .as_ref()
                .or(fragment.as_ref())
                .map(|path| path.with_extension(""))
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
#[path = "preprocessor_tests.rs"]
mod tests;
