/// Pipeline descriptors and fixed-function state

use bitflags::bitflags;

use crate::graphics_device::{BufferFormat, ShaderHandle, TextureFormat};

/// Primitive topology supported by pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimitiveType {
    /// Triangle list, indexed as quads
    #[default]
    TriangleList,
    /// Line list
    Line,
}

/// Vertex buffer slot description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBufferDescription {
    /// Buffer slot
    pub slot: u32,
    /// Stride in bytes between consecutive vertices
    pub pitch: u32,
}

/// Vertex attribute description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Attribute location in shader
    pub location: u32,
    /// Buffer slot the attribute is read from
    pub buffer_slot: u32,
    /// Format of the attribute (data type and component count)
    pub format: BufferFormat,
    /// Offset in bytes from the start of the vertex
    pub offset: u32,
}

// ===== RASTERIZATION =====

/// Face culling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    /// No culling
    None,
    /// Cull front faces
    Front,
    /// Cull back faces
    Back,
}

/// Front face winding order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrontFace {
    /// Clockwise vertices define front face
    Clockwise,
    /// Counter-clockwise vertices define front face
    #[default]
    CounterClockwise,
}

/// Polygon rendering mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonMode {
    /// Fill polygons
    Fill,
    /// Draw edges only (wireframe)
    Line,
}

/// Rasterization fixed-function state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterizationState {
    /// Face culling mode
    pub cull_mode: CullMode,
    /// Front face winding order
    pub front_face: FrontFace,
    /// Polygon rendering mode
    pub polygon_mode: PolygonMode,
}

impl Default for RasterizationState {
    fn default() -> Self {
        Self {
            cull_mode: CullMode::Back,
            front_face: FrontFace::CounterClockwise,
            polygon_mode: PolygonMode::Fill,
        }
    }
}

// ===== DEPTH =====

/// Comparison operator for depth tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Never,
    Less,
    Equal,
    LessOrEqual,
    Greater,
    NotEqual,
    GreaterOrEqual,
    Always,
}

/// Depth testing state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthStencilState {
    /// Enable depth testing
    pub depth_test_enable: bool,
    /// Enable writing to depth buffer
    pub depth_write_enable: bool,
    /// Depth comparison operator
    pub depth_compare_op: CompareOp,
    /// Enable stencil testing
    pub stencil_test_enable: bool,
}

impl Default for DepthStencilState {
    /// Reverse-Z depth: camera looks down -Z and nearer fragments have
    /// larger depth, so the test keeps the greater value
    fn default() -> Self {
        Self {
            depth_test_enable: true,
            depth_write_enable: true,
            depth_compare_op: CompareOp::Greater,
            stencil_test_enable: false,
        }
    }
}

// ===== COLOR BLEND =====

/// Blend factor for color blending equations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

/// Blend operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendOp {
    /// result = src * srcFactor + dst * dstFactor
    Add,
    /// result = src * srcFactor - dst * dstFactor
    Subtract,
    /// result = dst * dstFactor - src * srcFactor
    ReverseSubtract,
    /// result = min(src, dst)
    Min,
    /// result = max(src, dst)
    Max,
}

bitflags! {
    /// Color channels written by a color target
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ColorWriteMask: u32 {
        const R = 1 << 0;
        const G = 1 << 1;
        const B = 1 << 2;
        const A = 1 << 3;
    }
}

impl Default for ColorWriteMask {
    fn default() -> Self {
        Self::all()
    }
}

/// Color blending state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorBlendState {
    /// Enable blending
    pub blend_enable: bool,
    /// Source color blend factor
    pub src_color_factor: BlendFactor,
    /// Destination color blend factor
    pub dst_color_factor: BlendFactor,
    /// Color blend operation
    pub color_blend_op: BlendOp,
    /// Source alpha blend factor
    pub src_alpha_factor: BlendFactor,
    /// Destination alpha blend factor
    pub dst_alpha_factor: BlendFactor,
    /// Alpha blend operation
    pub alpha_blend_op: BlendOp,
    /// Color write mask
    pub color_write_mask: ColorWriteMask,
}

impl ColorBlendState {
    /// Standard alpha blending
    ///
    /// color = src.rgb * src.a + dst.rgb * (1 - src.a)
    /// alpha = src.a + dst.a * (1 - src.a)
    pub fn alpha_blending() -> Self {
        Self {
            blend_enable: true,
            src_color_factor: BlendFactor::SrcAlpha,
            dst_color_factor: BlendFactor::OneMinusSrcAlpha,
            color_blend_op: BlendOp::Add,
            src_alpha_factor: BlendFactor::One,
            dst_alpha_factor: BlendFactor::OneMinusSrcAlpha,
            alpha_blend_op: BlendOp::Add,
            color_write_mask: ColorWriteMask::all(),
        }
    }
}

impl Default for ColorBlendState {
    fn default() -> Self {
        Self::alpha_blending()
    }
}

// ===== MULTISAMPLE =====

/// Multisample count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleCount {
    /// 1 sample (no multisampling)
    S1,
    S2,
    S4,
    S8,
}

/// Multisampling state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultisampleState {
    /// Number of samples per pixel
    pub sample_count: SampleCount,
    /// Enable alpha-to-coverage
    pub alpha_to_coverage: bool,
}

impl Default for MultisampleState {
    fn default() -> Self {
        Self {
            sample_count: SampleCount::S1,
            alpha_to_coverage: false,
        }
    }
}

// ===== DESCRIPTORS =====

/// What a caller asks for when creating a graphics pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphicsPipelineCreateInfo {
    /// Shader program name, resolved under the shader root
    pub shader_name: String,
    /// Vertex buffer slots
    pub vertex_buffers: Vec<VertexBufferDescription>,
    /// Vertex attributes, ordered by offset
    pub vertex_attributes: Vec<VertexAttribute>,
    /// Primitive topology
    pub primitive_type: PrimitiveType,
    /// Front face winding order
    pub front_face: FrontFace,
}

impl GraphicsPipelineCreateInfo {
    /// Pipeline for `shader_name` with triangle lists and counter-clockwise
    /// front faces
    pub fn new(shader_name: impl Into<String>) -> Self {
        Self {
            shader_name: shader_name.into(),
            vertex_buffers: Vec::new(),
            vertex_attributes: Vec::new(),
            primitive_type: PrimitiveType::TriangleList,
            front_face: FrontFace::CounterClockwise,
        }
    }

    /// Add a vertex buffer slot
    pub fn with_vertex_buffer(mut self, slot: u32, pitch: u32) -> Self {
        self.vertex_buffers.push(VertexBufferDescription { slot, pitch });
        self
    }

    /// Add a vertex attribute
    pub fn with_attribute(mut self, location: u32, buffer_slot: u32, format: BufferFormat, offset: u32) -> Self {
        self.vertex_attributes.push(VertexAttribute {
            location,
            buffer_slot,
            format,
            offset,
        });
        self
    }

    /// Set the primitive topology
    pub fn with_primitive_type(mut self, primitive_type: PrimitiveType) -> Self {
        self.primitive_type = primitive_type;
        self
    }
}

/// Color target of a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorTargetDesc {
    /// Surface format rendered to
    pub format: TextureFormat,
    /// Blending applied when writing
    pub blend: ColorBlendState,
}

/// Everything a backend needs to create a pipeline object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineObjectDesc<'a> {
    /// Vertex shader object
    pub vertex_shader: ShaderHandle,
    /// Fragment shader object
    pub fragment_shader: ShaderHandle,
    /// Vertex buffer slots
    pub vertex_buffers: &'a [VertexBufferDescription],
    /// Vertex attributes
    pub vertex_attributes: &'a [VertexAttribute],
    /// Primitive topology
    pub primitive_type: PrimitiveType,
    /// Rasterization state
    pub rasterization: RasterizationState,
    /// Color target
    pub color_target: ColorTargetDesc,
    /// Depth state
    pub depth_stencil: DepthStencilState,
    /// Multisample state
    pub multisample: MultisampleState,
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
