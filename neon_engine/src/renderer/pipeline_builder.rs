/// Pipeline builder
///
/// Turns a `GraphicsPipelineCreateInfo` and a processed shader program into
/// a device pipeline plus the shared vertex and index buffers every draw
/// using that pipeline writes into.

use glam::Mat4;

use crate::error::{Error, Result};
use crate::graphics_device::{
    BufferDesc, BufferUsage, ColorBlendState, ColorTargetDesc, CommandBuffer, Config,
    DepthStencilState, DeviceLimits, GraphicsDevice, GraphicsPipelineCreateInfo,
    MultisampleState, PipelineHandle, PipelineObjectDesc, PrimitiveType, RasterizationState,
    ShaderHandle, ShaderObjectDesc, SharedBuffer, TextureFormat, VertexAttribute,
    DescriptorKind, LayoutBinding, sampler_set, uniform_buffer_set,
};
use crate::log::Diagnostics;
use crate::shader::{PipelineShaders, SamplerBinding, ShaderResources, ShaderStage};
use crate::{engine_debug, engine_error, engine_info};

const LOG_SOURCE: &str = "neon::pipeline";

/// Indices per quad (two triangles)
pub const INDICES_PER_QUAD: u32 = 6;

/// Vertices per quad
pub const VERTICES_PER_QUAD: u32 = 4;

/// Size in bytes of one index
pub const INDEX_SIZE: u64 = std::mem::size_of::<u32>() as u64;

/// Pipeline and shared buffers produced by [`PipelineBuilder::build`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltPipeline {
    /// Pipeline object
    pub pipeline: PipelineHandle,
    /// Shared vertex buffer, `max_vertex_buffer_elements * vertex_input_size` bytes
    pub vertex_buffer: SharedBuffer,
    /// Shared index buffer, `max_index_buffer_elements * 4` bytes
    pub index_buffer: SharedBuffer,
    /// Bytes per vertex
    pub vertex_input_size: u32,
    /// Topology the index buffer was filled for
    pub primitive_type: PrimitiveType,
}

// ===== VERTEX LAYOUT =====

/// Bytes per vertex: offset of the last attribute plus its element size
///
/// Attributes are expected in offset order, so only the last one matters.
/// Saturates instead of overflowing; `validate_vertex_layout` rejects such
/// layouts first.
pub fn vertex_input_size(attributes: &[VertexAttribute]) -> u32 {
    attributes
        .last()
        .map_or(0, |last| last.offset.saturating_add(last.format.size_bytes()))
}

/// Check every attribute against the declared vertex buffer slots
pub fn validate_vertex_layout(info: &GraphicsPipelineCreateInfo) -> Result<()> {
    if info.vertex_attributes.is_empty() {
        return Err(Error::PipelineCreation(format!(
            "pipeline '{}' declares no vertex attributes",
            info.shader_name
        )));
    }

    for attribute in &info.vertex_attributes {
        let slot = info
            .vertex_buffers
            .iter()
            .find(|buffer| buffer.slot == attribute.buffer_slot)
            .ok_or_else(|| {
                Error::PipelineCreation(format!(
                    "attribute at location {} reads undeclared buffer slot {}",
                    attribute.location, attribute.buffer_slot
                ))
            })?;

        let end = attribute
            .offset
            .checked_add(attribute.format.size_bytes())
            .ok_or_else(|| {
                Error::PipelineCreation(format!(
                    "attribute at location {} has offset {} past the addressable range",
                    attribute.location, attribute.offset
                ))
            })?;
        if end > slot.pitch {
            return Err(Error::PipelineCreation(format!(
                "attribute at location {} ends at byte {} past the {}-byte pitch of slot {}",
                attribute.location, end, slot.pitch, slot.slot
            )));
        }
    }
    Ok(())
}

// ===== INDEX PATTERNS =====

/// Index buffer contents for quad batches
///
/// Quad `q` covers indices `6q..6q+6` with `{4q, 4q+1, 4q+3, 4q, 4q+3, 4q+2}`.
/// Only whole quads are written; the tail past the last quad stays zero.
pub fn quad_indices(max_indices: u32) -> Vec<u32> {
    let mut indices = vec![0u32; max_indices as usize];
    let quads = max_indices / INDICES_PER_QUAD;

    for q in 0..quads {
        let base = q * VERTICES_PER_QUAD;
        let at = (q * INDICES_PER_QUAD) as usize;
        indices[at..at + INDICES_PER_QUAD as usize].copy_from_slice(&[
            base,
            base + 1,
            base + 3,
            base,
            base + 3,
            base + 2,
        ]);
    }
    indices
}

/// Index buffer contents for line batches: `0..max_indices`
pub fn line_indices(max_indices: u32) -> Vec<u32> {
    (0..max_indices).collect()
}

/// Index pattern for `primitive_type`
pub fn index_pattern(primitive_type: PrimitiveType, max_indices: u32) -> Vec<u32> {
    match primitive_type {
        PrimitiveType::TriangleList => quad_indices(max_indices),
        PrimitiveType::Line => line_indices(max_indices),
    }
}

// ===== PROJECTION =====

/// Perspective projection matching the pipelines' GREATER depth test
///
/// Right-handed, -Z forward, infinite far plane with reversed depth: the
/// near plane maps to 1 and depth falls toward 0 with distance, so nearer
/// fragments win.
pub fn reverse_z_perspective(fov_y_radians: f32, aspect_ratio: f32, z_near: f32) -> Mat4 {
    Mat4::perspective_infinite_reverse_rh(fov_y_radians, aspect_ratio, z_near)
}

// ===== RESOURCE COUNTS =====

/// Check a shader object's slot counts against the reflected resources
///
/// Counts must equal what reflection found (the fragment uniform count being
/// the sum of samplers and uniform buffers) and stay within the device
/// limits. Every reflected resource must sit in the set its stage owns and
/// at a binding the backend layout declares with the same descriptor type:
/// combined image samplers at `0..samplers`, or sampled images at even and
/// their samplers at odd bindings below `2 * samplers`, and uniform buffers
/// below the uniform slot count. Storage resources are never bound.
///
/// Passing means every reflected resource appears in
/// [`ShaderObjectDesc::layout_bindings`], the list backends build their
/// descriptor set layouts from.
pub fn verify_resource_counts(
    desc: &ShaderObjectDesc<'_>,
    resources: &ShaderResources,
    limits: &DeviceLimits,
) -> Result<()> {
    let mismatch = |message: String| Error::ResourceCountMismatch {
        stage: resources.stage,
        message,
    };

    let expected_uniform_buffers = match resources.stage {
        ShaderStage::Fragment => resources.sampler_count() + resources.uniform_buffer_count(),
        _ => resources.uniform_buffer_count(),
    };
    if desc.num_samplers != resources.sampler_count() {
        return Err(mismatch(format!(
            "{} sampler slots declared, {} sampled images reflected",
            desc.num_samplers,
            resources.sampler_count()
        )));
    }
    if desc.num_uniform_buffers != expected_uniform_buffers {
        return Err(mismatch(format!(
            "{} uniform buffer slots declared, {} expected",
            desc.num_uniform_buffers, expected_uniform_buffers
        )));
    }
    if desc.sampler_binding != resources.sampler_binding {
        return Err(mismatch(format!(
            "{:?} sampler binding declared, shader uses {:?}",
            desc.sampler_binding, resources.sampler_binding
        )));
    }

    if let Some(storage) = resources.storage_buffers.iter().chain(&resources.storage_images).next() {
        return Err(mismatch(format!(
            "storage resource '{}' at set {} binding {} has no pipeline slot",
            storage.name, storage.set, storage.binding
        )));
    }

    verify_resource_sets(resources).map_err(mismatch)?;
    verify_sampler_bindings(desc, resources).map_err(mismatch)?;

    if let Some(buffer) = resources
        .uniform_buffers
        .iter()
        .find(|buffer| buffer.binding >= desc.num_uniform_buffers)
    {
        return Err(mismatch(format!(
            "uniform buffer '{}' at binding {} outside {} uniform buffer slots",
            buffer.name, buffer.binding, desc.num_uniform_buffers
        )));
    }

    if desc.num_samplers > limits.max_samplers_per_stage {
        return Err(mismatch(format!(
            "{} sampler slots exceed the device limit of {}",
            desc.num_samplers, limits.max_samplers_per_stage
        )));
    }
    if desc.num_uniform_buffers > limits.max_uniform_buffers_per_stage {
        return Err(mismatch(format!(
            "{} uniform buffer slots exceed the device limit of {}",
            desc.num_uniform_buffers, limits.max_uniform_buffers_per_stage
        )));
    }

    let declared = desc.layout_bindings();
    if let Some((name, binding)) = reflected_bindings(resources)
        .into_iter()
        .find(|(_, binding)| !declared.contains(binding))
    {
        return Err(mismatch(format!(
            "'{}' ({:?} at set {} binding {}) is not in the pipeline layout",
            name, binding.kind, binding.set, binding.binding
        )));
    }
    Ok(())
}

/// Layout binding each reflected resource needs, paired with its name
fn reflected_bindings(resources: &ShaderResources) -> Vec<(&str, LayoutBinding)> {
    let image_kind = match resources.sampler_binding {
        SamplerBinding::Combined => DescriptorKind::CombinedImageSampler,
        SamplerBinding::Separate => DescriptorKind::SampledImage,
    };
    let images = resources.sampled_images.iter().map(|image| (image, image_kind));
    let samplers = resources
        .separate_samplers
        .iter()
        .map(|sampler| (sampler, DescriptorKind::Sampler));

    let mut bindings: Vec<(&str, LayoutBinding)> = images
        .chain(samplers)
        .map(|(resource, kind)| {
            (resource.name.as_str(), LayoutBinding { set: resource.set, binding: resource.binding, kind })
        })
        .collect();
    bindings.extend(resources.uniform_buffers.iter().map(|buffer| {
        (
            buffer.name.as_str(),
            LayoutBinding {
                set: buffer.set,
                binding: buffer.binding,
                kind: DescriptorKind::UniformBuffer,
            },
        )
    }));
    bindings
}

fn verify_resource_sets(resources: &ShaderResources) -> std::result::Result<(), String> {
    let stage = resources.stage;
    let (Some(sampler_set), Some(uniform_set)) = (sampler_set(stage), uniform_buffer_set(stage)) else {
        return Err(format!("{} stage owns no descriptor sets", stage));
    };

    if let Some(resource) = resources
        .sampled_images
        .iter()
        .chain(&resources.separate_samplers)
        .find(|resource| resource.set != sampler_set)
    {
        return Err(format!(
            "'{}' is declared in set {}, {} samplers belong in set {}",
            resource.name, resource.set, stage, sampler_set
        ));
    }
    if let Some(buffer) = resources.uniform_buffers.iter().find(|buffer| buffer.set != uniform_set) {
        return Err(format!(
            "uniform buffer '{}' is declared in set {}, {} uniform buffers belong in set {}",
            buffer.name, buffer.set, stage, uniform_set
        ));
    }
    Ok(())
}

fn verify_sampler_bindings(desc: &ShaderObjectDesc<'_>, resources: &ShaderResources) -> std::result::Result<(), String> {
    let slots = desc.num_samplers;
    match desc.sampler_binding {
        SamplerBinding::Combined => {
            if let Some(sampler) = resources.separate_samplers.first() {
                return Err(format!(
                    "standalone sampler '{}' at binding {} beside combined image samplers",
                    sampler.name, sampler.binding
                ));
            }
            if let Some(image) = resources.sampled_images.iter().find(|image| image.binding >= slots) {
                return Err(format!(
                    "sampled image '{}' at binding {} outside {} sampler slots",
                    image.name, image.binding, slots
                ));
            }
        }
        SamplerBinding::Separate => {
            if resources.separate_samplers.len() != resources.sampled_images.len() {
                return Err(format!(
                    "{} sampled images paired with {} samplers",
                    resources.sampled_images.len(),
                    resources.separate_samplers.len()
                ));
            }
            let width = SamplerBinding::Separate.bindings_per_slot();
            if let Some(image) = resources
                .sampled_images
                .iter()
                .find(|image| image.binding % width != 0 || image.binding / width >= slots)
            {
                return Err(format!(
                    "sampled image '{}' at binding {}, expected an even binding below {}",
                    image.name, image.binding, slots * width
                ));
            }
            if let Some(sampler) = resources
                .separate_samplers
                .iter()
                .find(|sampler| sampler.binding % width != 1 || sampler.binding / width >= slots)
            {
                return Err(format!(
                    "sampler '{}' at binding {}, expected an odd binding below {}",
                    sampler.name, sampler.binding, slots * width
                ));
            }
        }
    }
    Ok(())
}

// ===== BUILDER =====

/// Builds pipelines on a borrowed device
///
/// Every object created here is owned by the device; the returned handles
/// are released by the renderer at teardown.
pub struct PipelineBuilder<'a> {
    device: &'a mut dyn GraphicsDevice,
    config: &'a Config,
    diagnostics: &'a Diagnostics,
}

impl<'a> PipelineBuilder<'a> {
    pub fn new(device: &'a mut dyn GraphicsDevice, config: &'a Config, diagnostics: &'a Diagnostics) -> Self {
        Self {
            device,
            config,
            diagnostics,
        }
    }

    /// Build the pipeline described by `info` from both shader stages
    ///
    /// On failure every object created so far is released again.
    pub fn build(&mut self, info: &GraphicsPipelineCreateInfo, shaders: PipelineShaders<'_>) -> Result<BuiltPipeline> {
        validate_vertex_layout(info)?;
        let vertex_input_size = vertex_input_size(&info.vertex_attributes);

        let color_format = self.device.query_output_color_format().map_err(|e| {
            engine_error!(self.diagnostics, LOG_SOURCE, "Invalid swapchain color format: {}", e);
            Error::PipelineCreation(format!("invalid swapchain color format: {}", e))
        })?;
        if color_format.is_depth() {
            return Err(Error::PipelineCreation(format!(
                "swapchain reports depth format {:?} as its color format",
                color_format
            )));
        }

        let vertex_shader = self.create_shader(&shaders.vertex.binary.words, &shaders.vertex.resources)?;
        let fragment_shader = match self.create_shader(&shaders.fragment.binary.words, &shaders.fragment.resources) {
            Ok(shader) => shader,
            Err(e) => {
                self.device.release_shader(vertex_shader);
                return Err(e);
            }
        };

        let result = self.create_objects(info, vertex_shader, fragment_shader, color_format, vertex_input_size);

        self.device.release_shader(vertex_shader);
        self.device.release_shader(fragment_shader);

        let built = result?;
        engine_info!(self.diagnostics, LOG_SOURCE,
            "Created pipeline '{}' ({:?}, {} bytes per vertex)",
            info.shader_name, info.primitive_type, vertex_input_size);
        Ok(built)
    }

    fn create_shader(&mut self, code: &[u32], resources: &ShaderResources) -> Result<ShaderHandle> {
        let desc = ShaderObjectDesc::from_reflection(code, resources);
        verify_resource_counts(&desc, resources, &self.device.limits()).map_err(|e| {
            engine_error!(self.diagnostics, LOG_SOURCE, "{}", e);
            e
        })?;

        engine_debug!(self.diagnostics, LOG_SOURCE, "Creating {} shader: {} samplers, {} uniform buffers",
            desc.stage, desc.num_samplers, desc.num_uniform_buffers);

        self.device.create_shader(&desc).map_err(|e| {
            engine_error!(self.diagnostics, LOG_SOURCE, "Failed to create {} shader: {}", desc.stage, e);
            Error::PipelineCreation(format!("failed to create {} shader: {}", desc.stage, e))
        })
    }

    fn create_objects(
        &mut self,
        info: &GraphicsPipelineCreateInfo,
        vertex_shader: ShaderHandle,
        fragment_shader: ShaderHandle,
        color_format: TextureFormat,
        vertex_input_size: u32,
    ) -> Result<BuiltPipeline> {
        let desc = PipelineObjectDesc {
            vertex_shader,
            fragment_shader,
            vertex_buffers: &info.vertex_buffers,
            vertex_attributes: &info.vertex_attributes,
            primitive_type: info.primitive_type,
            rasterization: RasterizationState {
                front_face: info.front_face,
                ..RasterizationState::default()
            },
            color_target: ColorTargetDesc {
                format: color_format,
                blend: ColorBlendState::alpha_blending(),
            },
            depth_stencil: DepthStencilState::default(),
            multisample: MultisampleState::default(),
        };

        let pipeline = self.device.create_pipeline(&desc).map_err(|e| {
            engine_error!(self.diagnostics, LOG_SOURCE, "Failed to create pipeline '{}': {}", info.shader_name, e);
            Error::PipelineCreation(format!("failed to create pipeline '{}': {}", info.shader_name, e))
        })?;

        match self.create_buffers(info, vertex_input_size) {
            Ok((vertex_buffer, index_buffer)) => Ok(BuiltPipeline {
                pipeline,
                vertex_buffer,
                index_buffer,
                vertex_input_size,
                primitive_type: info.primitive_type,
            }),
            Err(e) => {
                self.device.release_pipeline(pipeline);
                Err(e)
            }
        }
    }

    fn create_buffers(
        &mut self,
        info: &GraphicsPipelineCreateInfo,
        vertex_input_size: u32,
    ) -> Result<(SharedBuffer, SharedBuffer)> {
        let vertex_size = self.config.max_vertex_buffer_elements as u64 * vertex_input_size as u64;
        let vertex_buffer = self.create_buffer(format!("{}_vertices", info.shader_name), vertex_size, BufferUsage::Vertex)?;

        let index_size = self.config.max_index_buffer_elements as u64 * INDEX_SIZE;
        let index_buffer = match self.create_buffer(format!("{}_indices", info.shader_name), index_size, BufferUsage::Index) {
            Ok(buffer) => buffer,
            Err(e) => {
                self.device.release_buffer(vertex_buffer.handle);
                return Err(e);
            }
        };

        if let Err(e) = self.fill_indices(info.primitive_type, index_buffer) {
            engine_error!(self.diagnostics, LOG_SOURCE, "Failed to upload index pattern: {}", e);
            self.device.release_buffer(vertex_buffer.handle);
            self.device.release_buffer(index_buffer.handle);
            return Err(e);
        }

        Ok((vertex_buffer, index_buffer))
    }

    fn create_buffer(&mut self, name: String, size: u64, usage: BufferUsage) -> Result<SharedBuffer> {
        let desc = BufferDesc { name, size, usage };
        let handle = self.device.create_buffer(&desc).map_err(|e| {
            engine_error!(self.diagnostics, LOG_SOURCE, "Failed to create buffer '{}' ({} bytes): {}", desc.name, size, e);
            e
        })?;
        Ok(SharedBuffer { handle, size })
    }

    fn fill_indices(&mut self, primitive_type: PrimitiveType, index_buffer: SharedBuffer) -> Result<()> {
        let indices = index_pattern(primitive_type, self.config.max_index_buffer_elements);

        let mut commands = CommandBuffer::begin(&mut *self.device, None, Some(index_buffer))?;
        commands.upload_indices(0, &indices)?;
        commands.submit()
    }
}

#[cfg(test)]
#[path = "pipeline_builder_tests.rs"]
mod tests;
