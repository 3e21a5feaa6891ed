/// Shader object descriptor and the descriptor set convention

use crate::shader::{SamplerBinding, ShaderResources, ShaderStage};

/// Set holding the vertex stage's sampler slots
pub const VERTEX_SAMPLER_SET: u32 = 0;
/// Set holding the vertex stage's uniform buffers
pub const VERTEX_UNIFORM_BUFFER_SET: u32 = 1;
/// Set holding the fragment stage's sampler slots
pub const FRAGMENT_SAMPLER_SET: u32 = 2;
/// Set holding the fragment stage's uniform buffers
pub const FRAGMENT_UNIFORM_BUFFER_SET: u32 = 3;
/// Number of descriptor sets a pipeline layout declares
pub const RESOURCE_SET_COUNT: u32 = 4;

/// Descriptor set `stage`'s sampler slots must be declared in
pub fn sampler_set(stage: ShaderStage) -> Option<u32> {
    match stage {
        ShaderStage::Vertex => Some(VERTEX_SAMPLER_SET),
        ShaderStage::Fragment => Some(FRAGMENT_SAMPLER_SET),
        ShaderStage::Undefined => None,
    }
}

/// Descriptor set `stage`'s uniform buffers must be declared in
pub fn uniform_buffer_set(stage: ShaderStage) -> Option<u32> {
    match stage {
        ShaderStage::Vertex => Some(VERTEX_UNIFORM_BUFFER_SET),
        ShaderStage::Fragment => Some(FRAGMENT_UNIFORM_BUFFER_SET),
        ShaderStage::Undefined => None,
    }
}

/// Descriptor type of a layout binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorKind {
    CombinedImageSampler,
    SampledImage,
    Sampler,
    UniformBuffer,
}

/// One binding of a pipeline's descriptor set layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutBinding {
    pub set: u32,
    pub binding: u32,
    pub kind: DescriptorKind,
}

/// Descriptor for creating one stage's shader object
///
/// Slot counts must cover the resources the stage declares: backends size
/// their binding layouts from them, in the sets given by [`sampler_set`]
/// and [`uniform_buffer_set`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderObjectDesc<'a> {
    /// Stage the code runs in
    pub stage: ShaderStage,
    /// SPIR-V words
    pub code: &'a [u32],
    /// Entry point name
    pub entry_point: &'a str,
    /// Sampler slots
    pub num_samplers: u32,
    /// How each sampler slot maps onto bindings
    pub sampler_binding: SamplerBinding,
    /// Uniform buffer slots
    pub num_uniform_buffers: u32,
    /// Storage buffer slots (reserved, always zero)
    pub num_storage_buffers: u32,
    /// Storage texture slots (reserved, always zero)
    pub num_storage_textures: u32,
}

impl<'a> ShaderObjectDesc<'a> {
    /// Descriptor whose slot counts are the reflected resource counts
    ///
    /// The fragment stage's uniform buffer slot count is the sum of its
    /// sampled images and uniform buffers: samplers draw from the same slot
    /// pool as uniforms there.
    pub fn from_reflection(code: &'a [u32], resources: &ShaderResources) -> Self {
        let num_samplers = resources.sampler_count();
        let num_uniform_buffers = match resources.stage {
            ShaderStage::Fragment => resources.sampler_count() + resources.uniform_buffer_count(),
            _ => resources.uniform_buffer_count(),
        };

        Self {
            stage: resources.stage,
            code,
            entry_point: "main",
            num_samplers,
            sampler_binding: resources.sampler_binding,
            num_uniform_buffers,
            num_storage_buffers: 0,
            num_storage_textures: 0,
        }
    }

    /// Bindings the pipeline layout declares for this stage, ordered by
    /// (set, binding)
    ///
    /// Sampler slots fill the stage's sampler set according to
    /// `sampler_binding`; uniform buffer slots fill its uniform buffer set
    /// at `0..num_uniform_buffers`. An undefined stage declares nothing.
    pub fn layout_bindings(&self) -> Vec<LayoutBinding> {
        let (Some(sampler_set), Some(uniform_set)) = (sampler_set(self.stage), uniform_buffer_set(self.stage)) else {
            return Vec::new();
        };

        let mut bindings = Vec::new();
        for slot in 0..self.num_samplers {
            match self.sampler_binding {
                SamplerBinding::Combined => bindings.push(LayoutBinding {
                    set: sampler_set,
                    binding: slot,
                    kind: DescriptorKind::CombinedImageSampler,
                }),
                SamplerBinding::Separate => {
                    let image = slot * SamplerBinding::Separate.bindings_per_slot();
                    bindings.push(LayoutBinding {
                        set: sampler_set,
                        binding: image,
                        kind: DescriptorKind::SampledImage,
                    });
                    bindings.push(LayoutBinding {
                        set: sampler_set,
                        binding: image + 1,
                        kind: DescriptorKind::Sampler,
                    });
                }
            }
        }
        bindings.extend((0..self.num_uniform_buffers).map(|binding| LayoutBinding {
            set: uniform_set,
            binding,
            kind: DescriptorKind::UniformBuffer,
        }));
        bindings
    }
}

#[cfg(test)]
#[path = "shader_tests.rs"]
mod tests;
