/// Pipeline - Vulkan graphics pipeline with its layout
///
/// Resource slots follow a fixed set convention:
/// - set 0: vertex samplers
/// - set 1: vertex uniform buffers
/// - set 2: fragment samplers
/// - set 3: fragment uniform buffers
///
/// The bindings inside each set are the ones the shader objects carry, so
/// separate textures and samplers get their own descriptor types.

use ash::vk;
use neon_engine::neon::render::{LayoutBinding, PipelineObjectDesc, TextureFormat, RESOURCE_SET_COUNT};
use neon_engine::neon::{Error, Result};
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{
    blend_factor_to_vk, blend_op_to_vk, buffer_format_to_vk, color_write_mask_to_vk, compare_op_to_vk,
    cull_mode_to_vk, descriptor_kind_to_vk, front_face_to_vk, polygon_mode_to_vk, sample_count_to_vk, texture_format_to_vk,
    topology_to_vk,
};
use crate::vulkan_shader::Shader;

/// Number of descriptor sets every pipeline layout declares
pub(crate) const DESCRIPTOR_SET_COUNT: usize = RESOURCE_SET_COUNT as usize;

/// One binding of a planned descriptor set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PlannedBinding {
    pub binding: u32,
    pub descriptor_type: vk::DescriptorType,
    pub stage: vk::ShaderStageFlags,
}

/// One descriptor set of a pipeline layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SetLayoutPlan {
    pub set: u32,
    pub bindings: Vec<PlannedBinding>,
}

impl SetLayoutPlan {
    pub(crate) fn layout_bindings(&self) -> Vec<vk::DescriptorSetLayoutBinding<'static>> {
        self.bindings
            .iter()
            .map(|planned| {
                vk::DescriptorSetLayoutBinding::default()
                    .binding(planned.binding)
                    .descriptor_type(planned.descriptor_type)
                    .descriptor_count(1)
                    .stage_flags(planned.stage)
            })
            .collect()
    }
}

/// Descriptor sets for a vertex/fragment shader pair, in set order
pub(crate) fn descriptor_set_plan(vertex: &Shader, fragment: &Shader) -> [SetLayoutPlan; DESCRIPTOR_SET_COUNT] {
    plan_for_bindings(&[
        (vertex.stage, vertex.bindings.as_slice()),
        (fragment.stage, fragment.bindings.as_slice()),
    ])
}

/// Descriptor sets from each stage's layout bindings
///
/// Bindings outside `0..DESCRIPTOR_SET_COUNT` are dropped; shader objects
/// never carry any.
pub(crate) fn plan_for_bindings(stages: &[(vk::ShaderStageFlags, &[LayoutBinding])]) -> [SetLayoutPlan; DESCRIPTOR_SET_COUNT] {
    std::array::from_fn(|set| {
        let set = set as u32;
        let mut bindings: Vec<PlannedBinding> = stages
            .iter()
            .flat_map(|(stage, bindings)| bindings.iter().map(move |binding| (*stage, binding)))
            .filter(|(_, binding)| binding.set == set)
            .map(|(stage, binding)| PlannedBinding {
                binding: binding.binding,
                descriptor_type: descriptor_kind_to_vk(binding.kind),
                stage,
            })
            .collect();
        bindings.sort_by_key(|planned| planned.binding);
        SetLayoutPlan { set, bindings }
    })
}

pub(crate) struct Pipeline {
    ctx: Arc<GpuContext>,
    /// Vulkan pipeline
    pub(crate) pipeline: vk::Pipeline,
    /// Pipeline layout
    pub(crate) layout: vk::PipelineLayout,
    /// Descriptor set layouts, in set order
    set_layouts: Vec<vk::DescriptorSetLayout>,
}

impl Pipeline {
    /// Create a pipeline rendering to `color_format`, with a `depth_format`
    /// attachment when depth testing is enabled
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        desc: &PipelineObjectDesc<'_>,
        vertex_shader: &Shader,
        fragment_shader: &Shader,
        color_format: TextureFormat,
        depth_format: TextureFormat,
    ) -> Result<Self> {
        // Layout objects are owned by `created` right away so every early
        // return destroys what exists so far
        let mut created = Self {
            ctx,
            pipeline: vk::Pipeline::null(),
            layout: vk::PipelineLayout::null(),
            set_layouts: Vec::with_capacity(DESCRIPTOR_SET_COUNT),
        };
        let device = created.ctx.device.clone();

        unsafe {
            for plan in descriptor_set_plan(vertex_shader, fragment_shader) {
                let bindings = plan.layout_bindings();
                let layout_create = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
                let set_layout = device.create_descriptor_set_layout(&layout_create, None).map_err(|e| {
                    Error::PipelineCreation(format!("Failed to create descriptor set layout {}: {:?}", plan.set, e))
                })?;
                created.set_layouts.push(set_layout);
            }

            let layout_create_info = vk::PipelineLayoutCreateInfo::default().set_layouts(&created.set_layouts);
            created.layout = device
                .create_pipeline_layout(&layout_create_info, None)
                .map_err(|e| Error::PipelineCreation(format!("Failed to create pipeline layout: {:?}", e)))?;

            let needs_depth = desc.depth_stencil.depth_test_enable || desc.depth_stencil.stencil_test_enable;
            let render_pass = create_compatible_render_pass(&device, desc, color_format, depth_format, needs_depth)?;

            let result = create_graphics_pipeline(
                &device,
                desc,
                vertex_shader,
                fragment_shader,
                created.layout,
                render_pass,
            );

            // The pipeline only needs a compatible render pass at creation
            device.destroy_render_pass(render_pass, None);

            created.pipeline = result?;
        }

        Ok(created)
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            if self.pipeline != vk::Pipeline::null() {
                self.ctx.device.destroy_pipeline(self.pipeline, None);
            }
            if self.layout != vk::PipelineLayout::null() {
                self.ctx.device.destroy_pipeline_layout(self.layout, None);
            }
            for set_layout in self.set_layouts.drain(..) {
                self.ctx.device.destroy_descriptor_set_layout(set_layout, None);
            }
        }
    }
}

unsafe fn create_compatible_render_pass(
    device: &ash::Device,
    desc: &PipelineObjectDesc<'_>,
    color_format: TextureFormat,
    depth_format: TextureFormat,
    needs_depth: bool,
) -> Result<vk::RenderPass> {
    let samples = sample_count_to_vk(desc.multisample.sample_count);

    let color_attachment = vk::AttachmentDescription::default()
        .format(texture_format_to_vk(color_format))
        .samples(samples)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);

    let color_attachment_ref = vk::AttachmentReference::default()
        .attachment(0)
        .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);

    let depth_attachment_ref = vk::AttachmentReference::default()
        .attachment(1)
        .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

    let mut attachments = vec![color_attachment];
    if needs_depth {
        attachments.push(
            vk::AttachmentDescription::default()
                .format(texture_format_to_vk(depth_format))
                .samples(samples)
                .load_op(vk::AttachmentLoadOp::CLEAR)
                .store_op(vk::AttachmentStoreOp::DONT_CARE)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::UNDEFINED)
                .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
        );
    }

    let mut subpass = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(std::slice::from_ref(&color_attachment_ref));
    if needs_depth {
        subpass = subpass.depth_stencil_attachment(&depth_attachment_ref);
    }

    let (dst_stage, dst_access) = if needs_depth {
        (
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        )
    } else {
        (vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT, vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
    };

    let dependency = vk::SubpassDependency::default()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(dst_stage)
        .src_access_mask(vk::AccessFlags::empty())
        .dst_stage_mask(dst_stage)
        .dst_access_mask(dst_access);

    let render_pass_info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(std::slice::from_ref(&subpass))
        .dependencies(std::slice::from_ref(&dependency));

    device
        .create_render_pass(&render_pass_info, None)
        .map_err(|e| Error::PipelineCreation(format!("Failed to create render pass for pipeline: {:?}", e)))
}

unsafe fn create_graphics_pipeline(
    device: &ash::Device,
    desc: &PipelineObjectDesc<'_>,
    vertex_shader: &Shader,
    fragment_shader: &Shader,
    layout: vk::PipelineLayout,
    render_pass: vk::RenderPass,
) -> Result<vk::Pipeline> {
    let shader_stages = [
        vk::PipelineShaderStageCreateInfo::default()
            .stage(vertex_shader.stage)
            .module(vertex_shader.module)
            .name(&vertex_shader.entry_point),
        vk::PipelineShaderStageCreateInfo::default()
            .stage(fragment_shader.stage)
            .module(fragment_shader.module)
            .name(&fragment_shader.entry_point),
    ];

    // Vertex input state
    let vertex_bindings: Vec<vk::VertexInputBindingDescription> = desc
        .vertex_buffers
        .iter()
        .map(|buffer| vk::VertexInputBindingDescription {
            binding: buffer.slot,
            stride: buffer.pitch,
            input_rate: vk::VertexInputRate::VERTEX,
        })
        .collect();

    let vertex_attributes: Vec<vk::VertexInputAttributeDescription> = desc
        .vertex_attributes
        .iter()
        .map(|attribute| vk::VertexInputAttributeDescription {
            location: attribute.location,
            binding: attribute.buffer_slot,
            format: buffer_format_to_vk(attribute.format),
            offset: attribute.offset,
        })
        .collect();

    let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
        .vertex_binding_descriptions(&vertex_bindings)
        .vertex_attribute_descriptions(&vertex_attributes);

    let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
        .topology(topology_to_vk(desc.primitive_type))
        .primitive_restart_enable(false);

    // Viewport state (dynamic)
    let viewports = [vk::Viewport::default()];
    let scissors = [vk::Rect2D::default()];
    let viewport_state = vk::PipelineViewportStateCreateInfo::default()
        .viewports(&viewports)
        .scissors(&scissors);

    let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
        .depth_clamp_enable(false)
        .rasterizer_discard_enable(false)
        .polygon_mode(polygon_mode_to_vk(desc.rasterization.polygon_mode))
        .line_width(1.0)
        .cull_mode(cull_mode_to_vk(desc.rasterization.cull_mode))
        .front_face(front_face_to_vk(desc.rasterization.front_face))
        .depth_bias_enable(false);

    let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
        .depth_test_enable(desc.depth_stencil.depth_test_enable)
        .depth_write_enable(desc.depth_stencil.depth_write_enable)
        .depth_compare_op(compare_op_to_vk(desc.depth_stencil.depth_compare_op))
        .depth_bounds_test_enable(false)
        .stencil_test_enable(desc.depth_stencil.stencil_test_enable);

    let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
        .sample_shading_enable(false)
        .rasterization_samples(sample_count_to_vk(desc.multisample.sample_count))
        .alpha_to_coverage_enable(desc.multisample.alpha_to_coverage);

    let blend = &desc.color_target.blend;
    let mut color_blend_attachment = vk::PipelineColorBlendAttachmentState::default()
        .color_write_mask(color_write_mask_to_vk(blend.color_write_mask))
        .blend_enable(blend.blend_enable);
    if blend.blend_enable {
        color_blend_attachment = color_blend_attachment
            .src_color_blend_factor(blend_factor_to_vk(blend.src_color_factor))
            .dst_color_blend_factor(blend_factor_to_vk(blend.dst_color_factor))
            .color_blend_op(blend_op_to_vk(blend.color_blend_op))
            .src_alpha_blend_factor(blend_factor_to_vk(blend.src_alpha_factor))
            .dst_alpha_blend_factor(blend_factor_to_vk(blend.dst_alpha_factor))
            .alpha_blend_op(blend_op_to_vk(blend.alpha_blend_op));
    }

    let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
        .logic_op_enable(false)
        .attachments(std::slice::from_ref(&color_blend_attachment));

    let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
    let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

    let pipeline_create_info = vk::GraphicsPipelineCreateInfo::default()
        .stages(&shader_stages)
        .vertex_input_state(&vertex_input_state)
        .input_assembly_state(&input_assembly_state)
        .viewport_state(&viewport_state)
        .rasterization_state(&rasterization_state)
        .depth_stencil_state(&depth_stencil_state)
        .multisample_state(&multisample_state)
        .color_blend_state(&color_blend_state)
        .dynamic_state(&dynamic_state)
        .layout(layout)
        .render_pass(render_pass)
        .subpass(0);

    let pipelines = device
        .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_create_info], None)
        .map_err(|e| Error::PipelineCreation(format!("Failed to create graphics pipeline: {:?}", e.1)))?;

    pipelines
        .into_iter()
        .next()
        .ok_or_else(|| Error::PipelineCreation("Driver returned no pipeline".to_string()))
}

#[cfg(test)]
#[path = "vulkan_pipeline_tests.rs"]
mod tests;
