//! Value types shared by the RHI front end, the state caches and the driver seam
//!
//! These mirror the GL enums the state layer needs while staying typed: a
//! blend factor can never be passed where a compare function is expected.
//! "No binding" is spelled `None` rather than a sentinel name.

use bitflags::bitflags;
use serde::{Serialize, Deserialize};

/// Native driver object name (buffer, texture, program, framebuffer, sampler)
///
/// `0` is the reserved "no object" name, as in GL.
pub type GlName = u32;

/// Maximum number of simultaneously bound color render targets
pub const MAX_SIMULTANEOUS_RENDER_TARGETS: usize = 8;

/// Maximum number of vertex streams a draw can pull from
pub const MAX_VERTEX_STREAMS: usize = 16;

/// Programmable pipeline stages
///
/// The discriminants are the per-stage slots used by every per-stage table in
/// the RHI (uniform buffers, parameter caches, texture unit layout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderStage {
    /// Vertex shader
    Vertex = 0,
    /// Pixel (fragment) shader
    Pixel = 1,
    /// Geometry shader
    Geometry = 2,
    /// Tessellation control shader
    Hull = 3,
    /// Tessellation evaluation shader
    Domain = 4,
    /// Compute shader
    Compute = 5,
}

impl ShaderStage {
    /// Number of stages
    pub const COUNT: usize = 6;

    /// Graphics stages in uniform buffer binding order
    pub const GRAPHICS: [Self; 5] = [Self::Vertex, Self::Pixel, Self::Geometry, Self::Hull, Self::Domain];

    /// Slot of this stage in per-stage tables
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Whether the stage belongs to the graphics pipeline
    pub const fn is_graphics(self) -> bool {
        !matches!(self, Self::Compute)
    }
}

/// Integer rectangle with inclusive min and exclusive max corners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct IntRect {
    /// Left edge
    pub min_x: u32,
    /// Top edge
    pub min_y: u32,
    /// Right edge (exclusive)
    pub max_x: u32,
    /// Bottom edge (exclusive)
    pub max_y: u32,
}

impl IntRect {
    /// Create a rectangle from its corners
    pub const fn new(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Width, zero for inverted rectangles
    pub const fn width(&self) -> u32 {
        self.max_x.saturating_sub(self.min_x)
    }

    /// Height, zero for inverted rectangles
    pub const fn height(&self) -> u32 {
        self.max_y.saturating_sub(self.min_y)
    }

    /// Whether the rectangle encloses any pixels
    pub const fn has_area(&self) -> bool {
        self.width() > 0 && self.height() > 0
    }

    /// Whether `self` and `other` share no pixels
    pub const fn is_disjoint_from(&self, other: &Self) -> bool {
        self.max_x <= other.min_x
            || self.min_x >= other.max_x
            || self.max_y <= other.min_y
            || self.min_y >= other.max_y
    }

    /// The part of `self` inside `bounds`
    pub fn clamped_to(&self, bounds: &Self) -> Self {
        Self {
            min_x: self.min_x.clamp(bounds.min_x, bounds.max_x),
            min_y: self.min_y.clamp(bounds.min_y, bounds.max_y),
            max_x: self.max_x.clamp(bounds.min_x, bounds.max_x),
            max_y: self.max_y.clamp(bounds.min_y, bounds.max_y),
        }
    }

    /// Whether `self` fully encloses `other`
    pub const fn contains_rect(&self, other: &Self) -> bool {
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && self.max_x >= other.max_x
            && self.max_y >= other.max_y
    }
}

/// Linear-space RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LinearColor {
    /// Red
    pub r: f32,
    /// Green
    pub g: f32,
    /// Blue
    pub b: f32,
    /// Alpha
    pub a: f32,
}

impl LinearColor {
    /// Opaque black
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    /// Opaque white
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    /// All channels zero
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Create a color from its channels
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Channels as an array
    pub const fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Engine-level primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    /// Independent triangles
    TriangleList,
    /// Triangle strip
    TriangleStrip,
    /// Independent lines
    LineList,
    /// Points
    PointList,
    /// Tessellation patches with the given control point count (1..=32)
    ControlPointPatchList(u8),
}

/// GL draw mode a [`PrimitiveType`] translates to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawMode {
    /// `GL_TRIANGLES`
    Triangles,
    /// `GL_TRIANGLE_STRIP`
    TriangleStrip,
    /// `GL_LINES`
    Lines,
    /// `GL_POINTS`
    Points,
    /// `GL_PATCHES`
    Patches,
}

/// Result of translating an engine primitive count into a GL draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawParameters {
    /// GL draw mode
    pub mode: DrawMode,
    /// Number of vertices or indices the draw consumes
    pub num_elements: u32,
    /// Control points per patch, zero for non-patch modes
    pub patch_size: u32,
}

impl PrimitiveType {
    /// Translate a primitive count into the GL mode and element count
    pub const fn draw_parameters(self, num_primitives: u32) -> DrawParameters {
        match self {
            Self::TriangleList => DrawParameters {
                mode: DrawMode::Triangles,
                num_elements: num_primitives * 3,
                patch_size: 0,
            },
            Self::TriangleStrip => DrawParameters {
                mode: DrawMode::TriangleStrip,
                num_elements: num_primitives + 2,
                patch_size: 0,
            },
            Self::LineList => DrawParameters {
                mode: DrawMode::Lines,
                num_elements: num_primitives * 2,
                patch_size: 0,
            },
            Self::PointList => DrawParameters {
                mode: DrawMode::Points,
                num_elements: num_primitives,
                patch_size: 0,
            },
            Self::ControlPointPatchList(control_points) => DrawParameters {
                mode: DrawMode::Patches,
                num_elements: num_primitives * control_points as u32,
                patch_size: control_points as u32,
            },
        }
    }

    /// Number of vertices needed to draw `num_primitives` primitives
    pub const fn vertex_count(self, num_primitives: u32) -> u32 {
        self.draw_parameters(num_primitives).num_elements
    }
}

/// Polygon rasterization mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FillMode {
    /// Vertices only
    Point,
    /// Edges only
    Wireframe,
    /// Filled polygons
    #[default]
    Solid,
}

/// Face selection used by culling and two-sided stencil
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Face {
    /// Front faces
    Front,
    /// Back faces
    Back,
    /// Both faces
    FrontAndBack,
}

/// Face culling selection, `None` disables culling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CullMode {
    /// No culling
    #[default]
    None,
    /// Cull front faces
    Front,
    /// Cull back faces
    Back,
}

impl CullMode {
    /// The face GL culls, `None` when culling is off
    pub const fn face(self) -> Option<Face> {
        match self {
            Self::None => None,
            Self::Front => Some(Face::Front),
            Self::Back => Some(Face::Back),
        }
    }
}

/// Depth and stencil comparison functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareFunction {
    /// Never passes
    Never,
    /// Passes if less
    Less,
    /// Passes if equal
    Equal,
    /// Passes if less or equal
    LessEqual,
    /// Passes if greater
    Greater,
    /// Passes if not equal
    NotEqual,
    /// Passes if greater or equal
    GreaterEqual,
    /// Always passes
    Always,
}

/// Stencil buffer update operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StencilOp {
    /// Keep the current value
    Keep,
    /// Set to zero
    Zero,
    /// Set to the reference value
    Replace,
    /// Increment and clamp
    IncrementSaturate,
    /// Decrement and clamp
    DecrementSaturate,
    /// Bitwise invert
    Invert,
    /// Increment and wrap
    IncrementWrap,
    /// Decrement and wrap
    DecrementWrap,
}

/// Blend source and destination factors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendFactor {
    /// 0
    Zero,
    /// 1
    One,
    /// Source color
    SourceColor,
    /// 1 - source color
    InverseSourceColor,
    /// Source alpha
    SourceAlpha,
    /// 1 - source alpha
    InverseSourceAlpha,
    /// Destination alpha
    DestAlpha,
    /// 1 - destination alpha
    InverseDestAlpha,
    /// Destination color
    DestColor,
    /// 1 - destination color
    InverseDestColor,
    /// Constant blend color
    ConstantBlendFactor,
    /// 1 - constant blend color
    InverseConstantBlendFactor,
}

impl BlendFactor {
    /// Whether the factor reads the constant blend color
    pub const fn uses_blend_factor(self) -> bool {
        matches!(self, Self::ConstantBlendFactor | Self::InverseConstantBlendFactor)
    }
}

/// Blend equations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendOp {
    /// src + dst
    Add,
    /// src - dst
    Subtract,
    /// dst - src
    ReverseSubtract,
    /// min(src, dst)
    Min,
    /// max(src, dst)
    Max,
}

/// Texture binding targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureTarget {
    /// `GL_TEXTURE_2D`
    Texture2D,
    /// `GL_TEXTURE_2D_ARRAY`
    Texture2DArray,
    /// `GL_TEXTURE_2D_MULTISAMPLE`
    Texture2DMultisample,
    /// `GL_TEXTURE_3D`
    Texture3D,
    /// `GL_TEXTURE_CUBE_MAP`
    TextureCube,
    /// `GL_TEXTURE_CUBE_MAP_ARRAY`
    TextureCubeArray,
    /// `GL_TEXTURE_BUFFER`
    TextureBuffer,
}

/// Texture minification and magnification filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureFilter {
    /// Point sampling
    Nearest,
    /// Bilinear sampling
    Linear,
    /// Point sampling from the nearest mip
    NearestMipmapNearest,
    /// Bilinear sampling from the nearest mip
    LinearMipmapNearest,
    /// Point sampling blended between mips
    NearestMipmapLinear,
    /// Trilinear sampling
    LinearMipmapLinear,
}

impl TextureFilter {
    /// Demote mip-sampling filters for textures that have a single level
    pub const fn modified_by_mips(self, has_mips: bool) -> Self {
        if has_mips {
            return self;
        }
        match self {
            Self::LinearMipmapLinear | Self::LinearMipmapNearest => Self::Linear,
            Self::NearestMipmapLinear | Self::NearestMipmapNearest => Self::Nearest,
            other => other,
        }
    }
}

/// Texture coordinate wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureWrap {
    /// Tile
    Repeat,
    /// Clamp to the edge texel
    ClampToEdge,
    /// Tile with mirroring
    MirroredRepeat,
    /// Clamp to the border color
    ClampToBorder,
}

/// Depth texture comparison mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextureCompareMode {
    /// Return raw depth
    #[default]
    None,
    /// Compare against the reference coordinate
    CompareRefToTexture,
}

/// Image unit formats for unordered access views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ImageFormat {
    /// Single 32-bit float
    #[default]
    R32F,
    /// Single 32-bit unsigned integer
    R32UI,
    /// Single 32-bit signed integer
    R32I,
    /// Four 8-bit normalized channels
    Rgba8,
    /// Four 16-bit floats
    Rgba16F,
    /// Four 32-bit floats
    Rgba32F,
}

/// Vertex attribute component types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexComponentType {
    /// `GL_BYTE`
    Byte,
    /// `GL_UNSIGNED_BYTE`
    UnsignedByte,
    /// `GL_SHORT`
    Short,
    /// `GL_UNSIGNED_SHORT`
    UnsignedShort,
    /// `GL_INT`
    Int,
    /// `GL_UNSIGNED_INT`
    UnsignedInt,
    /// `GL_HALF_FLOAT`
    HalfFloat,
    /// `GL_FLOAT`
    Float,
    /// `GL_DOUBLE`
    Double,
}

impl VertexComponentType {
    /// Size of one component in bytes
    pub const fn size_in_bytes(self) -> u32 {
        match self {
            Self::Byte | Self::UnsignedByte => 1,
            Self::Short | Self::UnsignedShort | Self::HalfFloat => 2,
            Self::Int | Self::UnsignedInt | Self::Float => 4,
            Self::Double => 8,
        }
    }
}

/// Component count of a vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentCount {
    /// One component
    One,
    /// Two components
    Two,
    /// Three components
    Three,
    /// Four components
    Four,
    /// Four components in BGRA order (`GL_BGRA` size)
    Bgra,
}

impl ComponentCount {
    /// Number of components in memory
    pub const fn count(self) -> u32 {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
            Self::Four | Self::Bgra => 4,
        }
    }
}

/// Index element size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    /// `GL_UNSIGNED_SHORT`
    U16,
    /// `GL_UNSIGNED_INT`
    U32,
}

impl IndexType {
    /// Index type for a buffer stride, `None` for strides GL cannot express
    pub const fn from_stride(stride: u32) -> Option<Self> {
        match stride {
            2 => Some(Self::U16),
            4 => Some(Self::U32),
            _ => None,
        }
    }

    /// Size of one index in bytes
    pub const fn size_in_bytes(self) -> u32 {
        match self {
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }
}

/// Packed uniform array type slots
///
/// Shaders compiled for the GL backend pack loose uniforms into one array per
/// precision/type, identified by a single-character type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PackedTypeIndex {
    /// High precision float (`h`)
    HighP = 0,
    /// Medium precision float (`m`)
    MediumP = 1,
    /// Low precision float (`l`)
    LowP = 2,
    /// Signed integer (`i`)
    Int = 3,
    /// Unsigned integer (`u`)
    Uint = 4,
}

impl PackedTypeIndex {
    /// Number of packed array types
    pub const COUNT: usize = 5;

    /// All packed array types in slot order
    pub const ALL: [Self; 5] = [Self::HighP, Self::MediumP, Self::LowP, Self::Int, Self::Uint];

    /// Slot of this type in per-type tables
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Map a packed array type name to its slot
    pub const fn from_type_name(name: char) -> Option<Self> {
        match name {
            'h' => Some(Self::HighP),
            'm' => Some(Self::MediumP),
            'l' => Some(Self::LowP),
            'i' => Some(Self::Int),
            'u' => Some(Self::Uint),
            _ => None,
        }
    }
}

/// Buffer binding points the state cache tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferBindingTarget {
    /// `GL_ARRAY_BUFFER`
    Array,
    /// `GL_ELEMENT_ARRAY_BUFFER`
    ElementArray,
    /// `GL_UNIFORM_BUFFER`
    Uniform,
    /// `GL_PIXEL_UNPACK_BUFFER`
    PixelUnpack,
}

/// Buffer data usage hints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsageHint {
    /// Written once, drawn many times
    StaticDraw,
    /// Rewritten occasionally
    DynamicDraw,
    /// Rewritten every use
    StreamDraw,
}

/// Fixed-function toggles driven through `glEnable`/`glDisable`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// `GL_DEPTH_TEST`
    DepthTest,
    /// `GL_STENCIL_TEST`
    StencilTest,
    /// `GL_SCISSOR_TEST`
    ScissorTest,
    /// `GL_CULL_FACE`
    CullFace,
    /// `GL_POLYGON_OFFSET_FILL`
    PolygonOffsetFill,
    /// `GL_POLYGON_OFFSET_LINE`
    PolygonOffsetLine,
    /// `GL_POLYGON_OFFSET_POINT`
    PolygonOffsetPoint,
    /// `GL_BLEND` (indexed per draw buffer)
    Blend,
    /// `GL_TEXTURE_CUBE_MAP_SEAMLESS`
    TextureCubeMapSeamless,
}

/// Framebuffer attachment points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramebufferAttachment {
    /// `GL_COLOR_ATTACHMENT0 + n`
    Color(u8),
    /// `GL_DEPTH_ATTACHMENT`
    Depth,
    /// `GL_STENCIL_ATTACHMENT`
    Stencil,
    /// `GL_DEPTH_STENCIL_ATTACHMENT`
    DepthStencil,
}

/// Read and draw buffer selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawBuffer {
    /// `GL_NONE`
    None,
    /// `GL_BACK` of the default framebuffer
    Back,
    /// `GL_COLOR_ATTACHMENT0 + n`
    ColorAttachment(u8),
}

/// Per-texture parameters set through `glTexParameter`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextureParameter {
    /// `GL_TEXTURE_BASE_LEVEL`
    BaseLevel(i32),
    /// `GL_TEXTURE_MAX_LEVEL`
    MaxLevel(i32),
    /// `GL_TEXTURE_WRAP_S`
    WrapS(TextureWrap),
    /// `GL_TEXTURE_WRAP_T`
    WrapT(TextureWrap),
    /// `GL_TEXTURE_WRAP_R`
    WrapR(TextureWrap),
    /// `GL_TEXTURE_LOD_BIAS`
    LodBias(f32),
    /// `GL_TEXTURE_MIN_FILTER`
    MinFilter(TextureFilter),
    /// `GL_TEXTURE_MAG_FILTER`
    MagFilter(TextureFilter),
    /// `GL_TEXTURE_MAX_ANISOTROPY_EXT`
    MaxAnisotropy(f32),
    /// `GL_TEXTURE_COMPARE_MODE`
    CompareMode(TextureCompareMode),
    /// `GL_TEXTURE_COMPARE_FUNC`
    CompareFunc(CompareFunction),
}

bitflags! {
    /// Which buffers a clear touches
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u32 {
        /// Color attachments
        const COLOR = 1 << 0;
        /// Depth attachment
        const DEPTH = 1 << 1;
        /// Stencil attachment
        const STENCIL = 1 << 2;
    }
}

bitflags! {
    /// Per-render-target color channel write mask
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ColorWriteMask: u8 {
        /// Red channel
        const RED = 1 << 0;
        /// Green channel
        const GREEN = 1 << 1;
        /// Blue channel
        const BLUE = 1 << 2;
        /// Alpha channel
        const ALPHA = 1 << 3;
        /// All channels
        const ALL = Self::RED.bits() | Self::GREEN.bits() | Self::BLUE.bits() | Self::ALPHA.bits();
    }
}

impl Default for ColorWriteMask {
    fn default() -> Self {
        Self::ALL
    }
}

bitflags! {
    /// `glMemoryBarrier` bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BarrierFlags: u32 {
        /// Vertex attribute fetches
        const VERTEX_ATTRIB_ARRAY = 1 << 0;
        /// Index fetches
        const ELEMENT_ARRAY = 1 << 1;
        /// Uniform buffer reads
        const UNIFORM = 1 << 2;
        /// Texture fetches
        const TEXTURE_FETCH = 1 << 3;
        /// Image load/store
        const SHADER_IMAGE_ACCESS = 1 << 5;
        /// Indirect command reads
        const COMMAND = 1 << 6;
        /// Buffer updates
        const BUFFER_UPDATE = 1 << 9;
        /// Framebuffer access
        const FRAMEBUFFER = 1 << 10;
        /// Shader storage access
        const SHADER_STORAGE = 1 << 13;
        /// `GL_ALL_BARRIER_BITS`
        const ALL = u32::MAX;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_translation_table() {
        assert_eq!(
            PrimitiveType::TriangleList.draw_parameters(2),
            DrawParameters { mode: DrawMode::Triangles, num_elements: 6, patch_size: 0 }
        );
        assert_eq!(PrimitiveType::TriangleStrip.vertex_count(4), 6);
        assert_eq!(PrimitiveType::LineList.vertex_count(3), 6);
        assert_eq!(PrimitiveType::PointList.vertex_count(7), 7);

        let patches = PrimitiveType::ControlPointPatchList(4).draw_parameters(5);
        assert_eq!(patches.mode, DrawMode::Patches);
        assert_eq!(patches.num_elements, 20);
        assert_eq!(patches.patch_size, 4);
    }

    #[test]
    fn test_filter_demotion_without_mips() {
        assert_eq!(TextureFilter::LinearMipmapLinear.modified_by_mips(false), TextureFilter::Linear);
        assert_eq!(TextureFilter::LinearMipmapNearest.modified_by_mips(false), TextureFilter::Linear);
        assert_eq!(TextureFilter::NearestMipmapLinear.modified_by_mips(false), TextureFilter::Nearest);
        assert_eq!(TextureFilter::Linear.modified_by_mips(false), TextureFilter::Linear);
        assert_eq!(
            TextureFilter::LinearMipmapLinear.modified_by_mips(true),
            TextureFilter::LinearMipmapLinear
        );
    }

    #[test]
    fn test_index_type_from_stride() {
        assert_eq!(IndexType::from_stride(2), Some(IndexType::U16));
        assert_eq!(IndexType::from_stride(4), Some(IndexType::U32));
        assert_eq!(IndexType::from_stride(1), None);
    }

    #[test]
    fn test_rect_relations() {
        let viewport = IntRect::new(0, 0, 100, 100);
        assert!(IntRect::new(100, 0, 120, 50).is_disjoint_from(&viewport));
        assert!(!IntRect::new(25, 25, 75, 75).is_disjoint_from(&viewport));
        assert!(IntRect::new(0, 0, 200, 200).contains_rect(&viewport));
        assert!(!IntRect::default().has_area());
    }

    #[test]
    fn test_packed_type_names() {
        assert_eq!(PackedTypeIndex::from_type_name('h'), Some(PackedTypeIndex::HighP));
        assert_eq!(PackedTypeIndex::from_type_name('u'), Some(PackedTypeIndex::Uint));
        assert_eq!(PackedTypeIndex::from_type_name('x'), None);
    }
}
