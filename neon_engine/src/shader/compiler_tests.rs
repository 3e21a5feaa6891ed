//! Unit tests for compiler.rs

use crate::error::Error;
use crate::fs::{FileSystem, MemoryFileSystem};
use crate::log::Diagnostics;
use crate::shader::cache::{CacheStore, ShaderIdentity};
use crate::shader::test_sources::{FakeCompiler, SPRITE_VERTEX};
use crate::shader::{ShaderCompiler, ShaderStage, TargetEnvironment};
use std::path::PathBuf;
use std::sync::Arc;

struct Fixture {
    fs: Arc<MemoryFileSystem>,
    cache: CacheStore,
    fake: FakeCompiler,
    compiler: ShaderCompiler,
    identity: ShaderIdentity,
}

fn fixture() -> Fixture {
    let fs = Arc::new(MemoryFileSystem::new());
    let cache = CacheStore::new("cache", fs.clone(), Diagnostics::default());
    let fake = FakeCompiler::new();
    let compiler = ShaderCompiler::new(Box::new(fake.clone()), Diagnostics::default());
    Fixture {
        fs,
        cache,
        fake,
        compiler,
        identity: ShaderIdentity::new("shaders/Sprite.glsl"),
    }
}

// ============================================================================
// TARGET ENVIRONMENT
// ============================================================================

#[test]
fn test_target_optimization_policy() {
    assert!(TargetEnvironment::Vulkan.optimizes());
    assert!(!TargetEnvironment::OpenGl.optimizes());
}

#[test]
fn test_target_names() {
    assert_eq!(TargetEnvironment::Vulkan.name(), "vulkan");
    assert_eq!(TargetEnvironment::OpenGl.name(), "opengl");
}

#[test]
fn test_default_backend_follows_shaderc_feature() {
    let compiler = ShaderCompiler::with_default_backend(Diagnostics::default());

    #[cfg(feature = "shaderc")]
    assert_eq!(compiler.backend_name(), "shaderc");
    #[cfg(not(feature = "shaderc"))]
    assert_eq!(compiler.backend_name(), "naga");
}

// ============================================================================
// FRESH COMPILES
// ============================================================================

#[test]
fn test_fresh_compile_persists_binary() {
    let f = fixture();

    let binary = f
        .compiler
        .compile(&f.cache, &f.identity, "vertex body", ShaderStage::Vertex, TargetEnvironment::Vulkan, true)
        .unwrap();

    assert_eq!(binary.stage, ShaderStage::Vertex);
    assert_eq!(binary.target, TargetEnvironment::Vulkan);
    assert_eq!(binary.words, FakeCompiler::words_for("vertex body"));
    assert_eq!(binary.cache_path, PathBuf::from("cache/Sprite.glsl.cached_vulkan.vert"));
    assert_eq!(binary.as_bytes().len(), binary.words.len() * 4);
    assert!(f.fs.exists(&binary.cache_path));

    let calls = f.fake.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].source_name, "shaders/Sprite.glsl (vertex)");
    assert!(calls[0].optimize);
}

#[test]
fn test_opengl_target_is_not_optimized() {
    let f = fixture();

    let binary = f
        .compiler
        .compile(&f.cache, &f.identity, "fragment body", ShaderStage::Fragment, TargetEnvironment::OpenGl, true)
        .unwrap();

    assert_eq!(binary.cache_path, PathBuf::from("cache/Sprite.glsl.cached_opengl.frag"));
    assert!(!f.fake.calls()[0].optimize);
}

#[test]
fn test_fresh_compile_overwrites_cache() {
    let f = fixture();
    let compile = |source: &str| {
        f.compiler
            .compile(&f.cache, &f.identity, source, ShaderStage::Vertex, TargetEnvironment::Vulkan, true)
            .unwrap()
    };

    let first = compile("first");
    let second = compile("second version");

    assert_eq!(first.cache_path, second.cache_path);
    assert_eq!(f.cache.load_binary(&second.cache_path).unwrap(), FakeCompiler::words_for("second version"));
}

// ============================================================================
// CACHE POLICY
// ============================================================================

#[test]
fn test_unchanged_source_round_trips_through_cache() {
    let f = fixture();
    let compile = |changed: bool| {
        f.compiler
            .compile(&f.cache, &f.identity, SPRITE_VERTEX, ShaderStage::Vertex, TargetEnvironment::Vulkan, changed)
            .unwrap()
    };

    let fresh = compile(true);
    let cached_once = compile(false);
    let cached_twice = compile(false);

    assert_eq!(cached_once.words, fresh.words);
    assert_eq!(cached_twice.as_bytes(), fresh.as_bytes());
    assert_eq!(f.fake.calls().len(), 1);
}

#[test]
fn test_unchanged_source_without_cache_file_is_cache_miss() {
    let f = fixture();

    let result = f.compiler.compile(
        &f.cache,
        &f.identity,
        "vertex body",
        ShaderStage::Vertex,
        TargetEnvironment::Vulkan,
        false,
    );

    assert!(matches!(result, Err(Error::CacheMiss(_))));
    assert!(f.fake.calls().is_empty());
}

#[test]
fn test_targets_use_separate_cache_files() {
    let f = fixture();
    f.compiler
        .compile(&f.cache, &f.identity, "body", ShaderStage::Vertex, TargetEnvironment::Vulkan, true)
        .unwrap();

    let native = f.compiler.compile(
        &f.cache,
        &f.identity,
        "body",
        ShaderStage::Vertex,
        TargetEnvironment::OpenGl,
        false,
    );
    assert!(matches!(native, Err(Error::CacheMiss(_))));
}

// ============================================================================
// FAILURES
// ============================================================================

#[test]
fn test_compile_error_carries_stage_and_message() {
    let f = fixture();

    match f.compiler.compile(
        &f.cache,
        &f.identity,
        "#error broken",
        ShaderStage::Fragment,
        TargetEnvironment::Vulkan,
        true,
    ) {
        Err(Error::CompileError { stage, message }) => {
            assert_eq!(stage, ShaderStage::Fragment);
            assert!(message.contains("shaders/Sprite.glsl (fragment)"));
        }
        other => panic!("expected CompileError, got {:?}", other),
    }
}

#[test]
fn test_failed_compile_removes_stale_cache_file() {
    let f = fixture();
    let good = f
        .compiler
        .compile(&f.cache, &f.identity, "good", ShaderStage::Vertex, TargetEnvironment::Vulkan, true)
        .unwrap();
    assert!(f.fs.exists(&good.cache_path));

    let bad = f.compiler.compile(
        &f.cache,
        &f.identity,
        "#error now broken",
        ShaderStage::Vertex,
        TargetEnvironment::Vulkan,
        true,
    );

    assert!(bad.is_err());
    assert!(!f.fs.exists(&good.cache_path));
}

#[test]
fn test_undefined_stage_is_rejected() {
    let f = fixture();
    let result = f.compiler.compile(
        &f.cache,
        &f.identity,
        "body",
        ShaderStage::Undefined,
        TargetEnvironment::Vulkan,
        true,
    );

    assert!(matches!(result, Err(Error::CompileError { stage: ShaderStage::Undefined, .. })));
    assert!(f.fake.calls().is_empty());
}

// ============================================================================
// NAGA BACKEND
// ============================================================================

#[test]
fn test_naga_backend_compiles_glsl() {
    let fs = Arc::new(MemoryFileSystem::new());
    let cache = CacheStore::new("cache", fs, Diagnostics::default());
    let compiler = ShaderCompiler::new(Box::new(crate::shader::NagaCompiler::new()), Diagnostics::default());
    let identity = ShaderIdentity::new("shaders/Sprite.glsl");

    let binary = compiler
        .compile(&cache, &identity, SPRITE_VERTEX, ShaderStage::Vertex, TargetEnvironment::Vulkan, true)
        .unwrap();

    assert_eq!(compiler.backend_name(), "naga");
    assert_eq!(binary.words[0], 0x0723_0203);
}

#[test]
fn test_naga_backend_reports_syntax_errors() {
    let compiler = crate::shader::NagaCompiler::new();
    let result = crate::shader::GlslCompiler::compile(
        &compiler,
        "#version 450\nvoid main() { this is not glsl }\n",
        ShaderStage::Fragment,
        TargetEnvironment::Vulkan,
        "broken.frag",
        true,
    );

    match result {
        Err(Error::CompileError { stage, message }) => {
            assert_eq!(stage, ShaderStage::Fragment);
            assert!(message.starts_with("broken.frag"));
        }
        other => panic!("expected CompileError, got {:?}", other),
    }
}
