//! Integration tests for the shader pipeline
//!
//! Sources are compiled with the naga backend from an in-memory file system,
//! so no GPU and no shader toolchain are required.
//!
//! Run with: cargo test --test shader_integration_tests

use neon_engine::neon::fs::{FileSystem, MemoryFileSystem};
use neon_engine::neon::log::{Diagnostics, LogEntry, LogSeverity, Logger};
use neon_engine::neon::shader::{
    decompile_to_source, split, CacheStore, NagaCompiler, ShaderCompiler, ShaderIdentity,
    ShaderProcessorConfig, ShaderScriptProcessor, ShaderStage, TargetEnvironment,
};
use neon_engine::neon::Error;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

const VERTEX: &str = "#version 450
layout(location = 0) in vec2 a_position;
layout(location = 1) in vec2 a_uv;
layout(location = 0) out vec2 v_uv;

layout(set = 1, binding = 0) uniform Camera {
    mat4 view_projection;
} camera;

void main() {
    v_uv = a_uv;
    gl_Position = camera.view_projection * vec4(a_position, 0.0, 1.0);
}
";

const FRAGMENT: &str = "#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 o_color;

layout(set = 2, binding = 0) uniform texture2D u_texture;
layout(set = 2, binding = 1) uniform sampler u_sampler;

void main() {
    o_color = texture(sampler2D(u_texture, u_sampler), v_uv);
}
";

// ============================================================================
// TEST LOGGER IMPLEMENTATION
// ============================================================================

/// Test logger that captures log entries for verification
struct TestLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl TestLogger {
    fn new() -> (Self, Arc<Mutex<Vec<LogEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { entries: entries.clone() }, entries)
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

fn combined() -> String {
    format!("#type vertex\n{}#type fragment\n{}", VERTEX, FRAGMENT)
}

fn config() -> ShaderProcessorConfig {
    ShaderProcessorConfig {
        shader_root: PathBuf::from("shaders"),
        cache_root: PathBuf::from("cache"),
        native_target: None,
    }
}

fn processor(fs: &Arc<MemoryFileSystem>, diagnostics: Diagnostics) -> ShaderScriptProcessor {
    let compiler = ShaderCompiler::new(Box::new(NagaCompiler::new()), diagnostics.clone());
    ShaderScriptProcessor::new(config(), fs.clone(), compiler, diagnostics)
}

// ============================================================================
// PREPROCESSOR
// ============================================================================

#[test]
fn test_split_scenario() {
    let bundle = split("#type vertex\nVERT_BODY\n#type fragment\nFRAG_BODY\n").unwrap();

    assert_eq!(bundle.get(ShaderStage::Vertex), Some("VERT_BODY\n"));
    assert_eq!(bundle.get(ShaderStage::Fragment), Some("FRAG_BODY\n"));
    assert!(matches!(split("#type geometry\nBODY\n"), Err(Error::UnknownStage(_))));
}

// ============================================================================
// PROCESSING
// ============================================================================

#[test]
fn test_process_then_reuse_cache() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.insert("shaders/Sprite.glsl", combined());
    let processor = processor(&fs, Diagnostics::default());

    let first = processor.process("Sprite").unwrap();
    let second = processor.process("Sprite").unwrap();

    assert!(first.recompiled);
    assert!(!second.recompiled);
    for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
        assert_eq!(
            first.stage(stage).unwrap().binary.words,
            second.stage(stage).unwrap().binary.words
        );
    }

    let identity = ShaderIdentity::new("shaders/Sprite.glsl");
    let cache = CacheStore::new("cache", fs.clone(), Diagnostics::default());
    let cached = cache.load_binary(&cache.binary_path(&identity, TargetEnvironment::Vulkan, ShaderStage::Vertex));
    assert_eq!(cached.unwrap(), first.stage(ShaderStage::Vertex).unwrap().binary.words);
}

#[test]
fn test_reflection_through_public_api() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.insert("shaders/Sprite.glsl", combined());
    let shader = processor(&fs, Diagnostics::default()).process("Sprite").unwrap();

    let pair = shader.pipeline_shaders().unwrap();
    assert_eq!(pair.vertex.resources.uniform_buffers[0].size, 64);
    assert_eq!(pair.vertex.resources.uniform_buffers[0].set, 1);
    assert_eq!(pair.fragment.resources.sampler_count(), 1);
    assert_eq!(pair.fragment.resources.separate_samplers.len(), 1);
    assert_eq!(pair.fragment.resources.uniform_buffer_count(), 0);
}

#[test]
fn test_deleted_cache_file_is_a_cache_miss() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.insert("shaders/Sprite.glsl", combined());
    let processor = processor(&fs, Diagnostics::default());
    processor.process("Sprite").unwrap();

    let identity = ShaderIdentity::new("shaders/Sprite.glsl");
    let path = processor
        .cache()
        .binary_path(&identity, TargetEnvironment::Vulkan, ShaderStage::Fragment);
    fs.remove(&path).unwrap();

    assert!(matches!(processor.process("Sprite"), Err(Error::CacheMiss(p)) if p == path));
}

#[test]
fn test_compile_error_is_logged_and_returned() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.insert("shaders/Broken.glsl", "#type vertex\n#version 450\nvoid main() { undefined_call(); }\n");
    let (logger, entries) = TestLogger::new();
    let processor = processor(&fs, Diagnostics::new(logger));

    let result = processor.process("Broken");

    assert!(matches!(result, Err(Error::CompileError { stage: ShaderStage::Vertex, .. })));
    let entries = entries.lock().unwrap();
    assert!(entries.iter().any(|e| e.severity == LogSeverity::Error && e.file.is_some()));
}

// ============================================================================
// CROSS-COMPILATION
// ============================================================================

#[test]
fn test_decompiled_vertex_stage_is_glsl() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.insert("shaders/Sprite.glsl", combined());
    let shader = processor(&fs, Diagnostics::default()).process("Sprite").unwrap();

    let words = &shader.stage(ShaderStage::Vertex).unwrap().binary.words;
    let source = decompile_to_source(ShaderStage::Vertex, words).unwrap();

    assert!(source.starts_with("#version 450"));
    assert!(source.contains("gl_Position"));
}
