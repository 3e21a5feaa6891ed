/// Unit tests for MockGraphicsDevice
///
/// Checks the bookkeeping other tests rely on: event order, liveness
/// tracking, invalid releases and injected failures.

use crate::graphics_device::mock_graphics_device::*;
use crate::graphics_device::{
    BufferDesc, BufferUsage, Config, GraphicsDevice, SamplerPreset,
};

fn buffer_desc(name: &str, size: u64, usage: BufferUsage) -> BufferDesc {
    BufferDesc {
        name: name.to_string(),
        size,
        usage,
    }
}

// ============================================================================
// Lifetime tracking
// ============================================================================

#[test]
fn test_init_records_event() {
    let mut device = MockGraphicsDevice::new();
    let observer = device.observer();
    device.init(&Config::default()).unwrap();

    assert_eq!(observer.events(), vec![DeviceEvent::Init]);
    assert!(observer.device_alive());
    assert_eq!(device.driver_name(), "mock");
}

#[test]
fn test_buffers_start_zeroed() {
    let mut device = MockGraphicsDevice::new();
    let observer = device.observer();
    device.create_buffer(&buffer_desc("vb", 16, BufferUsage::Vertex)).unwrap();

    assert_eq!(observer.buffer_data("vb"), Some(vec![0; 16]));
    assert_eq!(observer.live_buffers(), 1);
}

#[test]
fn test_double_release_is_recorded_as_invalid() {
    let mut device = MockGraphicsDevice::new();
    let observer = device.observer();
    let sampler = device.create_sampler(&SamplerPreset::PointWrap.desc()).unwrap();

    device.release_sampler(sampler);
    device.release_sampler(sampler);

    let events = observer.events();
    assert_eq!(events[1], DeviceEvent::ReleaseSampler(sampler));
    assert!(matches!(events[2], DeviceEvent::InvalidRelease(_)));
    assert_eq!(observer.live_samplers(), 0);
}

#[test]
fn test_destroying_uninitialized_device_is_invalid() {
    let mut device = MockGraphicsDevice::new();
    let observer = device.observer();
    device.destroy_device();

    assert!(matches!(observer.events()[0], DeviceEvent::InvalidRelease(_)));
}

// ============================================================================
// Commands
// ============================================================================

#[test]
fn test_uploads_apply_on_submit() {
    let mut device = MockGraphicsDevice::new();
    let observer = device.observer();
    let buffer = device.create_buffer(&buffer_desc("ib", 8, BufferUsage::Index)).unwrap();

    let commands = device.begin_commands().unwrap();
    device.cmd_upload_buffer(commands, buffer, 4, &[1, 2, 3, 4]).unwrap();
    assert_eq!(observer.buffer_data("ib"), Some(vec![0; 8]));

    device.submit_and_wait(commands).unwrap();
    assert_eq!(observer.buffer_data("ib"), Some(vec![0, 0, 0, 0, 1, 2, 3, 4]));
    assert_eq!(observer.pending_commands(), 0);
}

#[test]
fn test_discarded_uploads_never_apply() {
    let mut device = MockGraphicsDevice::new();
    let observer = device.observer();
    let buffer = device.create_buffer(&buffer_desc("vb", 4, BufferUsage::Vertex)).unwrap();

    let commands = device.begin_commands().unwrap();
    device.cmd_upload_buffer(commands, buffer, 0, &[9, 9, 9, 9]).unwrap();
    device.discard_commands(commands);

    assert_eq!(observer.buffer_data("vb"), Some(vec![0; 4]));
    assert!(device.submit_and_wait(commands).is_err());
}

// ============================================================================
// Failure injection
// ============================================================================

#[test]
fn test_injected_buffer_failure_only_hits_that_usage() {
    let mut device = MockGraphicsDevice::new().fail_on(MockFailure::Buffer(BufferUsage::Index));

    assert!(device.create_buffer(&buffer_desc("vb", 4, BufferUsage::Vertex)).is_ok());
    assert!(device.create_buffer(&buffer_desc("ib", 4, BufferUsage::Index)).is_err());
}

#[test]
fn test_injected_color_format_failure() {
    let device = MockGraphicsDevice::new().fail_on(MockFailure::ColorFormat);
    assert!(device.query_output_color_format().is_err());
}
