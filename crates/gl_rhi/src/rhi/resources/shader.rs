//! Shader-side resources
//!
//! The state layer never compiles or links shaders. It consumes what the
//! shader compiler reports about a linked program: packed uniform locations,
//! which texture units and image units are read, how many uniform buffers each
//! stage declares, and how vertex attributes are laid out.

use crate::rhi::types::*;

/// One attribute of a vertex declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexElement {
    /// Vertex stream the attribute reads from
    pub stream_index: u32,
    /// Byte offset inside a vertex of that stream
    pub offset: u32,
    /// Component type in memory
    pub component_type: VertexComponentType,
    /// Component count in memory
    pub components: ComponentCount,
    /// Normalize fixed-point data
    pub normalized: bool,
    /// Instance divisor, 0 for per-vertex data
    pub divisor: u32,
    /// Generic attribute index
    pub attribute_index: u32,
    /// Feed the attribute as float; integer attributes use the I-pointer path otherwise
    pub convert_to_float: bool,
}

impl VertexElement {
    /// A float attribute reading `components` floats at `offset` of `stream_index`
    pub const fn float(attribute_index: u32, stream_index: u32, offset: u32, components: ComponentCount) -> Self {
        Self {
            stream_index,
            offset,
            component_type: VertexComponentType::Float,
            components,
            normalized: false,
            divisor: 0,
            attribute_index,
            convert_to_float: true,
        }
    }

    /// Bytes one value of this element occupies
    pub const fn size_in_bytes(&self) -> u32 {
        self.components.count() * self.component_type.size_in_bytes()
    }
}

/// Ordered list of vertex elements
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexDeclaration {
    /// Elements in declaration order
    pub elements: Vec<VertexElement>,
}

impl VertexDeclaration {
    /// Create a declaration from its elements
    pub fn new(elements: Vec<VertexElement>) -> Self {
        Self { elements }
    }
}

/// Size of one packed uniform array a stage uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedArrayInfo {
    /// Packed array type
    pub type_index: PackedTypeIndex,
    /// Size in bytes
    pub size: u32,
}

/// Copy of a uniform buffer range into a packed global array
///
/// Used by flattened emulated uniform buffers and as the scatter table for
/// unflattened ones. Offsets and sizes are in 32-bit words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformBufferCopyInfo {
    /// Uniform buffer slot the data comes from
    pub source_uniform_buffer: u32,
    /// Word offset inside the uniform buffer
    pub source_offset: u32,
    /// Destination packed array type
    pub dest_type_index: PackedTypeIndex,
    /// Word offset inside the destination array
    pub dest_offset: u32,
    /// Number of words copied
    pub size: u32,
}

/// Per-stage bindings reported by the shader compiler
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderBindings {
    /// Uniform buffer slots the stage declares
    pub num_uniform_buffers: u32,
    /// Packed global arrays, parallel to the program's packed global locations
    pub packed_global_arrays: Vec<PackedArrayInfo>,
    /// Packed arrays of each emulated uniform buffer
    pub packed_uniform_buffers: Vec<Vec<PackedArrayInfo>>,
    /// Uniform buffers are flattened into the packed globals
    pub flatten_uniform_buffers: bool,
    /// Copy table for emulated uniform buffers
    pub uniform_buffer_copy_info: Vec<UniformBufferCopyInfo>,
    /// Vertex attributes the stage reads (vertex stage only)
    pub in_out_mask: u32,
}

/// Location of one packed uniform array in a linked program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedUniform {
    /// Uniform location
    pub location: i32,
    /// Packed array type
    pub type_index: PackedTypeIndex,
}

/// Packed uniform locations of one program stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageUniforms {
    /// Locations of the packed global arrays
    pub packed_globals: Vec<PackedUniform>,
    /// Locations of each emulated uniform buffer's packed arrays
    pub packed_uniform_buffers: Vec<Vec<PackedUniform>>,
    /// Unique id of the uniform buffer last uploaded into each emulated slot
    pub(crate) last_emulated_uniform_buffers: Vec<u64>,
}

/// Link-time description of a program
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramDesc {
    /// Packed uniform locations per stage
    pub stages: [StageUniforms; ShaderStage::COUNT],
    /// Texture units the program samples, indexed by unit
    pub texture_stage_needs: Vec<bool>,
    /// Image units the program accesses, indexed by unit
    pub uav_stage_needs: Vec<bool>,
}

/// A linked program object
#[derive(Debug, Clone)]
pub struct LinkedProgram {
    /// Driver name
    pub name: GlName,
    /// Link-time description
    pub desc: ProgramDesc,
    /// Highest texture unit the program samples
    pub max_texture_stage: Option<u32>,
}

impl LinkedProgram {
    /// Wrap a program name with its description
    pub fn new(name: GlName, desc: ProgramDesc) -> Self {
        let max_texture_stage = desc
            .texture_stage_needs
            .iter()
            .rposition(|needed| *needed)
            .and_then(|unit| u32::try_from(unit).ok());
        Self { name, desc, max_texture_stage }
    }

    /// Whether the program samples a texture unit
    pub fn needs_texture_stage(&self, unit: u32) -> bool {
        self.desc.texture_stage_needs.get(unit as usize).copied().unwrap_or(false)
    }

    /// Whether the program accesses an image unit
    pub fn needs_uav_stage(&self, unit: u32) -> bool {
        self.desc.uav_stage_needs.get(unit as usize).copied().unwrap_or(false)
    }
}

/// Description of a graphics pipeline's shaders
#[derive(Debug, Clone, Default)]
pub struct BoundShaderStateDesc {
    /// Vertex layout
    pub declaration: VertexDeclaration,
    /// Vertex stage bindings
    pub vertex: ShaderBindings,
    /// Pixel stage bindings
    pub pixel: ShaderBindings,
    /// Optional geometry stage
    pub geometry: Option<ShaderBindings>,
    /// Optional hull stage
    pub hull: Option<ShaderBindings>,
    /// Optional domain stage
    pub domain: Option<ShaderBindings>,
    /// Link-time description of the program
    pub program: ProgramDesc,
}

/// Graphics pipeline shaders plus their linked program
#[derive(Debug, Clone)]
pub struct BoundShaderState {
    /// Linked program
    pub program: LinkedProgram,
    /// Vertex layout
    pub declaration: VertexDeclaration,
    pub(crate) stages: [Option<ShaderBindings>; 5],
}

impl BoundShaderState {
    pub(crate) fn new(program: LinkedProgram, desc: BoundShaderStateDesc) -> Self {
        Self {
            program,
            declaration: desc.declaration,
            stages: [Some(desc.vertex), Some(desc.pixel), desc.geometry, desc.hull, desc.domain],
        }
    }

    /// Bindings of a graphics stage, `None` when the stage is absent
    pub fn stage(&self, stage: ShaderStage) -> Option<&ShaderBindings> {
        if stage.is_graphics() {
            self.stages[stage.index()].as_ref()
        } else {
            None
        }
    }

    /// Vertex attributes the vertex shader reads
    pub fn attribute_mask(&self) -> u32 {
        self.stage(ShaderStage::Vertex).map_or(0, |vertex| vertex.in_out_mask)
    }
}

/// Compute shader plus its linked program
#[derive(Debug, Clone)]
pub struct ComputeShader {
    /// Linked program
    pub program: LinkedProgram,
    /// Compute stage bindings
    pub bindings: ShaderBindings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_texture_stage_from_needs() {
        let program = LinkedProgram::new(
            1,
            ProgramDesc {
                texture_stage_needs: vec![true, false, true, false],
                ..ProgramDesc::default()
            },
        );
        assert_eq!(program.max_texture_stage, Some(2));
        assert!(program.needs_texture_stage(2));
        assert!(!program.needs_texture_stage(9));
    }

    #[test]
    fn test_program_without_textures() {
        let program = LinkedProgram::new(1, ProgramDesc::default());
        assert_eq!(program.max_texture_stage, None);
    }

    #[test]
    fn test_element_size() {
        let element = VertexElement::float(0, 0, 0, ComponentCount::Three);
        assert_eq!(element.size_in_bytes(), 12);
        let bgra = VertexElement {
            component_type: VertexComponentType::UnsignedByte,
            components: ComponentCount::Bgra,
            ..element
        };
        assert_eq!(bgra.size_in_bytes(), 4);
    }
}
