/// SPIR-V resource reflection
///
/// Extracts the descriptor resources a compiled stage declares. Pure: no
/// logging, no mutation of the binary.

use crate::error::{Error, Result};
use crate::shader::ShaderStage;

/// One member of a uniform buffer block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectedMember {
    /// Member name (empty if stripped)
    pub name: String,
    /// Byte offset inside the block
    pub offset: usize,
    /// Byte size, if sized
    pub size: Option<usize>,
}

/// Uniform (constant) buffer declared by a stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformBufferResource {
    /// Instance name, or block name when the instance is anonymous
    pub name: String,
    /// Descriptor set
    pub set: u32,
    /// Binding slot
    pub binding: u32,
    /// Declared aggregate byte size
    pub size: usize,
    /// Block members
    pub members: Vec<ReflectedMember>,
}

impl UniformBufferResource {
    /// Number of members in the block
    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

/// Sampled image, sampler or storage resource declared by a stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingResource {
    /// Variable name (empty if stripped)
    pub name: String,
    /// Descriptor set
    pub set: u32,
    /// Binding slot
    pub binding: u32,
}

/// How a stage pairs textures with samplers
///
/// A stage uses one model for all of its sampler slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplerBinding {
    /// Slot `i` is one combined image sampler at binding `i`
    #[default]
    Combined,
    /// Slot `i` is a sampled image at binding `2i` and its sampler at
    /// binding `2i + 1`
    Separate,
}

impl SamplerBinding {
    /// Descriptor bindings one sampler slot occupies
    pub fn bindings_per_slot(&self) -> u32 {
        match self {
            SamplerBinding::Combined => 1,
            SamplerBinding::Separate => 2,
        }
    }
}

/// Resources of one stage, each list ordered by (set, binding)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderResources {
    /// Stage the resources belong to
    pub stage: ShaderStage,
    /// Uniform buffers
    pub uniform_buffers: Vec<UniformBufferResource>,
    /// Combined image samplers and sampled images
    pub sampled_images: Vec<BindingResource>,
    /// Standalone samplers paired with sampled images in the shader
    pub separate_samplers: Vec<BindingResource>,
    /// Storage buffers (reserved, not wired into pipelines)
    pub storage_buffers: Vec<BindingResource>,
    /// Storage images (reserved, not wired into pipelines)
    pub storage_images: Vec<BindingResource>,
    /// Whether sampled images come with standalone samplers
    pub sampler_binding: SamplerBinding,
}

impl ShaderResources {
    /// Resources of a stage that declares nothing
    pub fn empty(stage: ShaderStage) -> Self {
        Self {
            stage,
            uniform_buffers: Vec::new(),
            sampled_images: Vec::new(),
            separate_samplers: Vec::new(),
            storage_buffers: Vec::new(),
            storage_images: Vec::new(),
            sampler_binding: SamplerBinding::Combined,
        }
    }

    /// Number of sampled images
    pub fn sampler_count(&self) -> u32 {
        self.sampled_images.len() as u32
    }

    /// Number of uniform buffers
    pub fn uniform_buffer_count(&self) -> u32 {
        self.uniform_buffers.len() as u32
    }
}

/// Reflect the resources of a compiled stage
///
/// # Errors
///
/// `InvalidResource` if the binary cannot be parsed, two resources of the
/// same category share a binding slot, or the stage mixes combined image
/// samplers with standalone textures and samplers.
pub fn reflect(stage: ShaderStage, words: &[u32]) -> Result<ShaderResources> {
    use spirq::ty::DescriptorType;

    let entry_points = spirq::ReflectConfig::new()
        .spv(words)
        .ref_all_rscs(true)
        .reflect()
        .map_err(|e| Error::InvalidResource(format!("SPIR-V reflection of {} stage failed: {}", stage, e)))?;

    let mut resources = ShaderResources::empty(stage);
    let mut combined = false;
    let mut separate = false;

    for entry_point in &entry_points {
        for var in entry_point.vars.iter() {
            let spirq::var::Variable::Descriptor { name, desc_bind, desc_ty, ty, .. } = var else {
                continue;
            };
            let binding = BindingResource {
                name: name.clone().unwrap_or_default(),
                set: desc_bind.set(),
                binding: desc_bind.bind(),
            };

            match desc_ty {
                DescriptorType::UniformBuffer() => {
                    resources.uniform_buffers.push(uniform_buffer(binding, ty));
                }
                DescriptorType::CombinedImageSampler() => {
                    combined = true;
                    resources.sampled_images.push(binding);
                }
                DescriptorType::SampledImage() => {
                    separate = true;
                    resources.sampled_images.push(binding);
                }
                DescriptorType::Sampler() => {
                    separate = true;
                    resources.separate_samplers.push(binding);
                }
                DescriptorType::StorageBuffer(..) => resources.storage_buffers.push(binding),
                DescriptorType::StorageImage(..) => resources.storage_images.push(binding),
                _ => {}
            }
        }
    }

    if combined && separate {
        return Err(Error::InvalidResource(format!(
            "{} stage mixes combined image samplers with separate textures and samplers",
            stage
        )));
    }
    if separate {
        resources.sampler_binding = SamplerBinding::Separate;
    }

    resources.uniform_buffers.sort_by_key(|ub| (ub.set, ub.binding));
    resources.uniform_buffers.dedup_by(|a, b| a.set == b.set && a.binding == b.binding && a.name == b.name);
    check_unique(stage, "uniform buffer", resources.uniform_buffers.iter().map(|ub| (ub.set, ub.binding)))?;

    for (category, list) in [
        ("sampled image", &mut resources.sampled_images),
        ("sampler", &mut resources.separate_samplers),
        ("storage buffer", &mut resources.storage_buffers),
        ("storage image", &mut resources.storage_images),
    ] {
        list.sort_by_key(|res| (res.set, res.binding));
        list.dedup();
        check_unique(stage, category, list.iter().map(|res| (res.set, res.binding)))?;
    }

    Ok(resources)
}

fn uniform_buffer(binding: BindingResource, ty: &spirq::ty::Type) -> UniformBufferResource {
    let (block_name, members) = match ty {
        spirq::ty::Type::Struct(st) => (
            st.name.clone(),
            st.members
                .iter()
                .map(|m| ReflectedMember {
                    name: m.name.clone().unwrap_or_default(),
                    offset: m.offset.unwrap_or(0),
                    size: m.ty.nbyte(),
                })
                .collect(),
        ),
        _ => (None, Vec::new()),
    };

    let name = if binding.name.is_empty() {
        block_name.unwrap_or_default()
    } else {
        binding.name
    };

    UniformBufferResource {
        name,
        set: binding.set,
        binding: binding.binding,
        size: ty.nbyte().unwrap_or(0),
        members,
    }
}

/// Entry points sharing a variable report it once each; duplicates that
/// survive dedup are distinct variables on one slot.
fn check_unique(stage: ShaderStage, category: &str, slots: impl Iterator<Item = (u32, u32)>) -> Result<()> {
    let mut previous: Option<(u32, u32)> = None;
    for slot in slots {
        if previous == Some(slot) {
            return Err(Error::InvalidResource(format!(
                "{} stage declares two {} resources at set {} binding {}",
                stage, category, slot.0, slot.1
            )));
        }
        previous = Some(slot);
    }
    Ok(())
}

#[cfg(test)]
#[path = "reflect_tests.rs"]
mod tests;
