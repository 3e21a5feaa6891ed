/// Unit tests for renderer.rs
///
/// The device is a MockGraphicsDevice; shaders are compiled with naga from
/// a MemoryFileSystem.

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Error;
use crate::fs::MemoryFileSystem;
use crate::graphics_device::mock_graphics_device::{
    DeviceEvent, MockDeviceObserver, MockFailure, MockGraphicsDevice,
};
use crate::graphics_device::{BufferFormat, Config, GraphicsPipelineCreateInfo, SamplerPreset};
use crate::log::Diagnostics;
use crate::renderer::Renderer;
use crate::shader::test_sources::sprite_combined;
use crate::shader::{NagaCompiler, ShaderCompiler, ShaderProcessorConfig, ShaderScriptProcessor};

// ============================================================================
// Helpers
// ============================================================================

fn renderer_on(device: MockGraphicsDevice) -> (Renderer, MockDeviceObserver) {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.insert("shaders/Sprite.glsl", sprite_combined());

    let config = ShaderProcessorConfig {
        shader_root: PathBuf::from("shaders"),
        cache_root: PathBuf::from("cache"),
        native_target: None,
    };
    let compiler = ShaderCompiler::new(Box::new(NagaCompiler::new()), Diagnostics::default());
    let processor = ShaderScriptProcessor::new(config, fs, compiler, Diagnostics::default());

    let observer = device.observer();
    (Renderer::new(Box::new(device), processor, Diagnostics::default()), observer)
}

fn sprite_info() -> GraphicsPipelineCreateInfo {
    GraphicsPipelineCreateInfo::new("Sprite")
        .with_vertex_buffer(0, 16)
        .with_attribute(0, 0, BufferFormat::R32G32_SFLOAT, 0)
        .with_attribute(1, 0, BufferFormat::R32G32_SFLOAT, 8)
}

/// Events recorded after the last `SubmitAndWait`
fn teardown_events(observer: &MockDeviceObserver) -> Vec<DeviceEvent> {
    let events = observer.events();
    let start = events
        .iter()
        .rposition(|e| *e == DeviceEvent::SubmitAndWait)
        .map_or(0, |at| at + 1);
    events[start..]
        .iter()
        .filter(|e| !matches!(e, DeviceEvent::ReleaseShader(_)))
        .cloned()
        .collect()
}

// ============================================================================
// INIT
// ============================================================================

#[test]
fn test_init_creates_every_sampler_preset() {
    let (mut renderer, observer) = renderer_on(MockGraphicsDevice::new());
    renderer.init(&Config::default()).unwrap();

    assert!(renderer.is_initialized());
    assert_eq!(observer.live_samplers(), 8);
    for preset in SamplerPreset::ALL {
        assert!(renderer.sampler(preset).is_some(), "{}", preset);
    }

    let created: Vec<_> = observer
        .events()
        .into_iter()
        .filter_map(|e| match e {
            DeviceEvent::CreateSampler(desc) => Some(desc),
            _ => None,
        })
        .collect();
    let expected: Vec<_> = SamplerPreset::ALL.iter().map(|p| p.desc()).collect();
    assert_eq!(created, expected);
}

#[test]
fn test_init_twice_fails() {
    let (mut renderer, _observer) = renderer_on(MockGraphicsDevice::new());
    renderer.init(&Config::default()).unwrap();

    assert!(matches!(
        renderer.init(&Config::default()),
        Err(Error::InitializationFailed(_))
    ));
}

#[test]
fn test_failed_device_init_leaves_nothing_to_clean() {
    let (mut renderer, observer) = renderer_on(MockGraphicsDevice::new().fail_on(MockFailure::Init));

    assert!(renderer.init(&Config::default()).is_err());
    renderer.clean();

    assert_eq!(observer.events(), vec![DeviceEvent::Init]);
}

#[test]
fn test_sampler_failure_cleans_created_samplers() {
    let (mut renderer, observer) = renderer_on(MockGraphicsDevice::new().fail_on(MockFailure::Sampler));

    assert!(renderer.init(&Config::default()).is_err());
    renderer.clean();

    assert_eq!(observer.live_samplers(), 0);
    assert!(!observer.device_alive());
}

// ============================================================================
// PIPELINE
// ============================================================================

#[test]
fn test_create_graphics_pipeline() {
    let (mut renderer, observer) = renderer_on(MockGraphicsDevice::new());
    renderer.init(&Config::default()).unwrap();

    let built = renderer.create_graphics_pipeline(&sprite_info()).unwrap();

    assert_eq!(renderer.pipeline(), Some(&built));
    assert_eq!(built.vertex_input_size, 16);
    assert_eq!(observer.live_pipelines(), 1);
    assert_eq!(observer.live_buffers(), 2);
    assert_eq!(observer.live_shaders(), 0);
}

#[test]
fn test_second_pipeline_is_rejected() {
    let (mut renderer, observer) = renderer_on(MockGraphicsDevice::new());
    renderer.init(&Config::default()).unwrap();
    renderer.create_graphics_pipeline(&sprite_info()).unwrap();

    let result = renderer.create_graphics_pipeline(&sprite_info());
    assert!(matches!(result, Err(Error::PipelineCreation(_))));
    assert_eq!(observer.live_pipelines(), 1);
}

#[test]
fn test_pipeline_before_init_is_rejected() {
    let (mut renderer, observer) = renderer_on(MockGraphicsDevice::new());

    let result = renderer.create_graphics_pipeline(&sprite_info());
    assert!(matches!(result, Err(Error::PipelineCreation(_))));
    assert!(observer.events().is_empty());
}

#[test]
fn test_unknown_shader_fails_pipeline_creation() {
    let (mut renderer, observer) = renderer_on(MockGraphicsDevice::new());
    renderer.init(&Config::default()).unwrap();

    let result = renderer.create_graphics_pipeline(&GraphicsPipelineCreateInfo::new("Missing"));
    assert!(matches!(result, Err(Error::NotFound(_))));
    assert_eq!(renderer.pipeline(), None);
    assert_eq!(observer.live_pipelines(), 0);
}

// ============================================================================
// COMMAND BUFFERS
// ============================================================================

#[test]
fn test_command_buffer_uploads_into_shared_vertex_buffer() {
    let (mut renderer, observer) = renderer_on(MockGraphicsDevice::new());
    renderer.init(&Config::default()).unwrap();
    renderer.create_graphics_pipeline(&sprite_info()).unwrap();

    let vertex: [f32; 4] = [1.0, 2.0, 0.5, 0.5];
    let mut commands = renderer.acquire_command_buffer().unwrap();
    commands.upload_vertices(16, bytemuck::cast_slice(&vertex)).unwrap();
    commands.submit().unwrap();

    let data = observer.buffer_data("Sprite_vertices").unwrap();
    assert_eq!(&data[..16], &[0u8; 16]);
    assert_eq!(&data[16..32], bytemuck::cast_slice::<f32, u8>(&vertex));
}

#[test]
fn test_command_buffer_without_pipeline_rejects_uploads() {
    let (mut renderer, _observer) = renderer_on(MockGraphicsDevice::new());
    renderer.init(&Config::default()).unwrap();

    let mut commands = renderer.acquire_command_buffer().unwrap();
    assert!(matches!(commands.upload_indices(0, &[1]), Err(Error::InvalidResource(_))));
}

// ============================================================================
// TEARDOWN
// ============================================================================

#[test]
fn test_clean_releases_in_dependency_order() {
    let (mut renderer, observer) = renderer_on(MockGraphicsDevice::new());
    renderer.init(&Config::default()).unwrap();
    let built = renderer.create_graphics_pipeline(&sprite_info()).unwrap();
    let samplers: Vec<_> = SamplerPreset::ALL
        .iter()
        .map(|preset| renderer.sampler(*preset).unwrap())
        .collect();

    renderer.clean();

    let mut expected: Vec<_> = samplers.into_iter().map(DeviceEvent::ReleaseSampler).collect();
    expected.extend([
        DeviceEvent::ReleaseBuffer(built.vertex_buffer.handle),
        DeviceEvent::ReleaseBuffer(built.index_buffer.handle),
        DeviceEvent::ReleasePipeline(built.pipeline),
        DeviceEvent::ReleaseWindowFromDevice,
        DeviceEvent::DestroyWindow,
        DeviceEvent::DestroyDevice,
    ]);
    assert_eq!(teardown_events(&observer), expected);
}

#[test]
fn test_clean_twice_releases_nothing_twice() {
    let (mut renderer, observer) = renderer_on(MockGraphicsDevice::new());
    renderer.init(&Config::default()).unwrap();
    renderer.create_graphics_pipeline(&sprite_info()).unwrap();

    renderer.clean();
    let after_first = observer.events().len();
    renderer.clean();

    assert_eq!(observer.events().len(), after_first);
    assert!(!observer
        .events()
        .iter()
        .any(|e| matches!(e, DeviceEvent::InvalidRelease(_))));
    assert!(!renderer.is_initialized());
    assert_eq!(renderer.sampler(SamplerPreset::PointClamp), None);
}

#[test]
fn test_drop_cleans_up() {
    let (mut renderer, observer) = renderer_on(MockGraphicsDevice::new());
    renderer.init(&Config::default()).unwrap();
    renderer.create_graphics_pipeline(&sprite_info()).unwrap();

    drop(renderer);

    assert_eq!(observer.live_samplers(), 0);
    assert_eq!(observer.live_buffers(), 0);
    assert_eq!(observer.live_pipelines(), 0);
    assert_eq!(observer.events().last(), Some(&DeviceEvent::DestroyDevice));
}

#[test]
fn test_clean_without_pipeline_skips_pipeline_objects() {
    let (mut renderer, observer) = renderer_on(MockGraphicsDevice::new());
    renderer.init(&Config::default()).unwrap();
    renderer.clean();

    let events = observer.events();
    assert!(!events.iter().any(|e| matches!(e, DeviceEvent::ReleaseBuffer(_) | DeviceEvent::ReleasePipeline(_))));
    assert_eq!(
        &events[events.len() - 3..],
        &[DeviceEvent::ReleaseWindowFromDevice, DeviceEvent::DestroyWindow, DeviceEvent::DestroyDevice]
    );
}
