//! Typed node kinds.
//!
//! The host dump identifies nodes by their Blender idname plus a bag of
//! properties. Both are parsed once into [`NodeKind`] so the lowering engine
//! can dispatch with a single exhaustive `match`.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Every node type the exporter knows about.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    // Inputs
    Value,
    Rgb,
    TexCoord,
    UvMap,
    NewGeometry,
    ObjectInfo,
    Fresnel,
    LayerWeight,

    // Math
    Math(MathNode),
    VectorMath(VectorMathNode),
    Clamp(ClampNode),
    MapRange(MapRangeNode),

    // Color
    MixRgb(MixRgbNode),
    Mix(MixNode),
    Invert,
    Gamma,
    BrightContrast,
    HueSaturation,
    Blackbody,
    ColorRamp(ColorRampNode),
    FloatCurve(FloatCurveNode),
    RgbCurve(RgbCurveNode),
    RgbToBw,
    SeparateColor(ColorModeNode),
    CombineColor(ColorModeNode),
    SeparateXyz,
    CombineXyz,

    // Textures
    TexImage(ImageTextureNode),
    TexEnvironment(ImageTextureNode),
    TexChecker,
    TexNoise(NoiseTextureNode),
    TexVoronoi(VoronoiTextureNode),
    TexWave(WaveTextureNode),
    TexGradient(GradientTextureNode),
    TexWhiteNoise,

    // Vector
    Mapping(MappingNode),
    VectorRotate(VectorRotateNode),
    VectorTransform(VectorTransformNode),
    NormalMap(NormalMapNode),
    Bump(BumpNode),

    // Structure
    Group(GroupNode),
    GroupInput,
    GroupOutput,
    Reroute,

    // Shaders
    BsdfDiffuse,
    BsdfGlass,
    BsdfGlossy,
    BsdfTransparent,
    BsdfTranslucent,
    BsdfRefraction,
    BsdfPrincipled,
    Emission,
    Background,
    MixShader,
    AddShader,
    OutputMaterial(OutputNode),
    OutputWorld(OutputNode),

    /// A node idname the exporter has no lowering rule for.
    Unsupported(String),
}

impl NodeKind {
    /// Parse a node kind from its Blender idname and properties.
    ///
    /// Unknown idnames are not an error: they become [`NodeKind::Unsupported`]
    /// and are reported when (and if) the lowering reaches them.
    pub fn from_idname(idname: &str, properties: Value) -> Result<Self, serde_json::Error> {
        let props = match properties {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };

        Ok(match idname {
            "ShaderNodeValue" => NodeKind::Value,
            "ShaderNodeRGB" => NodeKind::Rgb,
            "ShaderNodeTexCoord" => NodeKind::TexCoord,
            "ShaderNodeUVMap" => NodeKind::UvMap,
            "ShaderNodeNewGeometry" => NodeKind::NewGeometry,
            "ShaderNodeObjectInfo" => NodeKind::ObjectInfo,
            "ShaderNodeFresnel" => NodeKind::Fresnel,
            "ShaderNodeLayerWeight" => NodeKind::LayerWeight,

            "ShaderNodeMath" => NodeKind::Math(parse_props(&props)?),
            "ShaderNodeVectorMath" => NodeKind::VectorMath(parse_props(&props)?),
            "ShaderNodeClamp" => NodeKind::Clamp(parse_props(&props)?),
            "ShaderNodeMapRange" => NodeKind::MapRange(parse_props(&props)?),

            "ShaderNodeMixRGB" => NodeKind::MixRgb(parse_props(&props)?),
            "ShaderNodeMix" => NodeKind::Mix(parse_props(&props)?),
            "ShaderNodeInvert" => NodeKind::Invert,
            "ShaderNodeGamma" => NodeKind::Gamma,
            "ShaderNodeBrightContrast" => NodeKind::BrightContrast,
            "ShaderNodeHueSaturation" => NodeKind::HueSaturation,
            "ShaderNodeBlackbody" => NodeKind::Blackbody,
            "ShaderNodeValToRGB" => NodeKind::ColorRamp(parse_props(&props)?),
            "ShaderNodeFloatCurve" => NodeKind::FloatCurve(parse_props(&props)?),
            "ShaderNodeRGBCurve" => NodeKind::RgbCurve(parse_props(&props)?),
            "ShaderNodeRGBToBW" => NodeKind::RgbToBw,
            "ShaderNodeSeparateColor" => NodeKind::SeparateColor(parse_props(&props)?),
            "ShaderNodeCombineColor" => NodeKind::CombineColor(parse_props(&props)?),
            "ShaderNodeSeparateRGB" => NodeKind::SeparateColor(ColorModeNode { mode: ColorMode::Rgb }),
            "ShaderNodeCombineRGB" => NodeKind::CombineColor(ColorModeNode { mode: ColorMode::Rgb }),
            "ShaderNodeSeparateHSV" => NodeKind::SeparateColor(ColorModeNode { mode: ColorMode::Hsv }),
            "ShaderNodeCombineHSV" => NodeKind::CombineColor(ColorModeNode { mode: ColorMode::Hsv }),
            "ShaderNodeSeparateXYZ" => NodeKind::SeparateXyz,
            "ShaderNodeCombineXYZ" => NodeKind::CombineXyz,

            "ShaderNodeTexImage" => NodeKind::TexImage(parse_props(&props)?),
            "ShaderNodeTexEnvironment" => NodeKind::TexEnvironment(parse_props(&props)?),
            "ShaderNodeTexChecker" => NodeKind::TexChecker,
            "ShaderNodeTexNoise" => NodeKind::TexNoise(parse_props(&props)?),
            "ShaderNodeTexVoronoi" => NodeKind::TexVoronoi(parse_props(&props)?),
            "ShaderNodeTexWave" => NodeKind::TexWave(parse_props(&props)?),
            "ShaderNodeTexGradient" => NodeKind::TexGradient(parse_props(&props)?),
            "ShaderNodeTexWhiteNoise" => NodeKind::TexWhiteNoise,

            "ShaderNodeMapping" => NodeKind::Mapping(parse_props(&props)?),
            "ShaderNodeVectorRotate" => NodeKind::VectorRotate(parse_props(&props)?),
            "ShaderNodeVectorTransform" => NodeKind::VectorTransform(parse_props(&props)?),
            "ShaderNodeNormalMap" => NodeKind::NormalMap(parse_props(&props)?),
            "ShaderNodeBump" => NodeKind::Bump(parse_props(&props)?),

            "ShaderNodeGroup" => NodeKind::Group(parse_props(&props)?),
            "NodeGroupInput" => NodeKind::GroupInput,
            "NodeGroupOutput" => NodeKind::GroupOutput,
            "NodeReroute" => NodeKind::Reroute,

            "ShaderNodeBsdfDiffuse" => NodeKind::BsdfDiffuse,
            "ShaderNodeBsdfGlass" => NodeKind::BsdfGlass,
            "ShaderNodeBsdfGlossy" | "ShaderNodeBsdfAnisotropic" => NodeKind::BsdfGlossy,
            "ShaderNodeBsdfTransparent" => NodeKind::BsdfTransparent,
            "ShaderNodeBsdfTranslucent" => NodeKind::BsdfTranslucent,
            "ShaderNodeBsdfRefraction" => NodeKind::BsdfRefraction,
            "ShaderNodeBsdfPrincipled" => NodeKind::BsdfPrincipled,
            "ShaderNodeEmission" => NodeKind::Emission,
            "ShaderNodeBackground" => NodeKind::Background,
            "ShaderNodeMixShader" => NodeKind::MixShader,
            "ShaderNodeAddShader" => NodeKind::AddShader,
            "ShaderNodeOutputMaterial" => NodeKind::OutputMaterial(parse_props(&props)?),
            "ShaderNodeOutputWorld" => NodeKind::OutputWorld(parse_props(&props)?),

            other => NodeKind::Unsupported(other.to_string()),
        })
    }

    /// Short human readable type name used in diagnostics.
    pub fn type_name(&self) -> &str {
        match self {
            NodeKind::Value => "Value",
            NodeKind::Rgb => "RGB",
            NodeKind::TexCoord => "Texture Coordinate",
            NodeKind::UvMap => "UV Map",
            NodeKind::NewGeometry => "Geometry",
            NodeKind::ObjectInfo => "Object Info",
            NodeKind::Fresnel => "Fresnel",
            NodeKind::LayerWeight => "Layer Weight",
            NodeKind::Math(_) => "Math",
            NodeKind::VectorMath(_) => "Vector Math",
            NodeKind::Clamp(_) => "Clamp",
            NodeKind::MapRange(_) => "Map Range",
            NodeKind::MixRgb(_) => "MixRGB",
            NodeKind::Mix(_) => "Mix",
            NodeKind::Invert => "Invert",
            NodeKind::Gamma => "Gamma",
            NodeKind::BrightContrast => "Bright/Contrast",
            NodeKind::HueSaturation => "Hue/Saturation",
            NodeKind::Blackbody => "Blackbody",
            NodeKind::ColorRamp(_) => "Color Ramp",
            NodeKind::FloatCurve(_) => "Float Curve",
            NodeKind::RgbCurve(_) => "RGB Curves",
            NodeKind::RgbToBw => "RGB to BW",
            NodeKind::SeparateColor(_) => "Separate Color",
            NodeKind::CombineColor(_) => "Combine Color",
            NodeKind::SeparateXyz => "Separate XYZ",
            NodeKind::CombineXyz => "Combine XYZ",
            NodeKind::TexImage(_) => "Image Texture",
            NodeKind::TexEnvironment(_) => "Environment Texture",
            NodeKind::TexChecker => "Checker Texture",
            NodeKind::TexNoise(_) => "Noise Texture",
            NodeKind::TexVoronoi(_) => "Voronoi Texture",
            NodeKind::TexWave(_) => "Wave Texture",
            NodeKind::TexGradient(_) => "Gradient Texture",
            NodeKind::TexWhiteNoise => "White Noise Texture",
            NodeKind::Mapping(_) => "Mapping",
            NodeKind::VectorRotate(_) => "Vector Rotate",
            NodeKind::VectorTransform(_) => "Vector Transform",
            NodeKind::NormalMap(_) => "Normal Map",
            NodeKind::Bump(_) => "Bump",
            NodeKind::Group(_) => "Group",
            NodeKind::GroupInput => "Group Input",
            NodeKind::GroupOutput => "Group Output",
            NodeKind::Reroute => "Reroute",
            NodeKind::BsdfDiffuse => "Diffuse BSDF",
            NodeKind::BsdfGlass => "Glass BSDF",
            NodeKind::BsdfGlossy => "Glossy BSDF",
            NodeKind::BsdfTransparent => "Transparent BSDF",
            NodeKind::BsdfTranslucent => "Translucent BSDF",
            NodeKind::BsdfRefraction => "Refraction BSDF",
            NodeKind::BsdfPrincipled => "Principled BSDF",
            NodeKind::Emission => "Emission",
            NodeKind::Background => "Background",
            NodeKind::MixShader => "Mix Shader",
            NodeKind::AddShader => "Add Shader",
            NodeKind::OutputMaterial(_) => "Material Output",
            NodeKind::OutputWorld(_) => "World Output",
            NodeKind::Unsupported(idname) => idname,
        }
    }

    /// True for nodes producing closures rather than values.
    pub fn is_shader(&self) -> bool {
        matches!(
            self,
            NodeKind::BsdfDiffuse
                | NodeKind::BsdfGlass
                | NodeKind::BsdfGlossy
                | NodeKind::BsdfTransparent
                | NodeKind::BsdfTranslucent
                | NodeKind::BsdfRefraction
                | NodeKind::BsdfPrincipled
                | NodeKind::Emission
                | NodeKind::Background
                | NodeKind::MixShader
                | NodeKind::AddShader
        )
    }
}

fn parse_props<T: DeserializeOwned>(value: &Value) -> Result<T, serde_json::Error> {
    T::deserialize(value)
}

// ---------------------------------------------------------------------------
// Math

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MathNode {
    pub operation: MathOperation,
    pub use_clamp: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MathOperation {
    #[default]
    Add,
    Subtract,
    Multiply,
    Divide,
    MultiplyAdd,
    Power,
    Logarithm,
    Sqrt,
    InverseSqrt,
    Absolute,
    Exponent,
    Minimum,
    Maximum,
    LessThan,
    GreaterThan,
    Sign,
    Compare,
    SmoothMin,
    SmoothMax,
    Round,
    Floor,
    Ceil,
    Trunc,
    Fract,
    Modulo,
    FlooredModulo,
    Wrap,
    Snap,
    Pingpong,
    Sine,
    Cosine,
    Tangent,
    Arcsine,
    Arccosine,
    Arctangent,
    Arctan2,
    Sinh,
    Cosh,
    Tanh,
    Radians,
    Degrees,
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct VectorMathNode {
    pub operation: VectorMathOperation,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VectorMathOperation {
    #[default]
    Add,
    Subtract,
    Multiply,
    Divide,
    MultiplyAdd,
    CrossProduct,
    Project,
    Reflect,
    Refract,
    Faceforward,
    DotProduct,
    Distance,
    Length,
    Scale,
    Normalize,
    Absolute,
    Minimum,
    Maximum,
    Floor,
    Ceil,
    Fraction,
    Modulo,
    Wrap,
    Snap,
    Sine,
    Cosine,
    Tangent,
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClampNode {
    pub clamp_type: ClampType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClampType {
    #[default]
    Minmax,
    Range,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MapRangeNode {
    pub interpolation_type: MapRangeInterpolation,
    pub data_type: MapRangeDataType,
    pub clamp: bool,
}

impl Default for MapRangeNode {
    fn default() -> Self {
        Self {
            interpolation_type: MapRangeInterpolation::Linear,
            data_type: MapRangeDataType::Float,
            clamp: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MapRangeInterpolation {
    #[default]
    Linear,
    Stepped,
    Smoothstep,
    Smootherstep,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MapRangeDataType {
    #[default]
    Float,
    FloatVector,
}

// ---------------------------------------------------------------------------
// Color

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlendType {
    #[default]
    Mix,
    Darken,
    Multiply,
    Burn,
    Lighten,
    Screen,
    Dodge,
    Add,
    Overlay,
    SoftLight,
    LinearLight,
    Difference,
    Exclusion,
    Subtract,
    Divide,
    Hue,
    Saturation,
    Color,
    Value,
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MixRgbNode {
    pub blend_type: BlendType,
    pub use_clamp: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MixNode {
    pub data_type: MixDataType,
    pub blend_type: BlendType,
    pub factor_mode: FactorMode,
    pub clamp_factor: bool,
    pub clamp_result: bool,
}

impl Default for MixNode {
    fn default() -> Self {
        Self {
            data_type: MixDataType::Float,
            blend_type: BlendType::Mix,
            factor_mode: FactorMode::Uniform,
            clamp_factor: true,
            clamp_result: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MixDataType {
    #[default]
    Float,
    Vector,
    Rgba,
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FactorMode {
    #[default]
    Uniform,
    NonUniform,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ColorRampNode {
    pub interpolation: RampInterpolation,
    pub elements: Vec<RampElement>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RampInterpolation {
    #[default]
    Linear,
    Ease,
    Constant,
    #[serde(rename = "B_SPLINE")]
    BSpline,
    Cardinal,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RampElement {
    pub position: f64,
    pub color: [f64; 4],
}

/// A single-channel curve given as control points `[x, y]`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FloatCurveNode {
    pub points: Vec<[f64; 2]>,
}

/// RGB curves in Blender order: combined, red, green, blue.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RgbCurveNode {
    pub curves: Vec<Vec<[f64; 2]>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ColorModeNode {
    pub mode: ColorMode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColorMode {
    #[default]
    Rgb,
    Hsv,
    Hsl,
}

// ---------------------------------------------------------------------------
// Textures

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ImageTextureNode {
    /// Name of the referenced host image.
    pub image: Option<String>,
    pub extension: ImageExtension,
    pub interpolation: ImageInterpolation,
    pub projection: ImageProjection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImageExtension {
    #[default]
    Repeat,
    Extend,
    Clip,
    Mirror,
}

// Blender spells these in PascalCase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
pub enum ImageInterpolation {
    #[default]
    Linear,
    Closest,
    Cubic,
    Smart,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImageProjection {
    #[default]
    Flat,
    Box,
    Sphere,
    Tube,
    Equirectangular,
    MirrorBall,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NoiseTextureNode {
    pub noise_dimensions: Dimensions,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum Dimensions {
    #[serde(rename = "1D")]
    One,
    #[serde(rename = "2D")]
    Two,
    #[default]
    #[serde(rename = "3D")]
    Three,
    #[serde(rename = "4D")]
    Four,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct VoronoiTextureNode {
    pub voronoi_dimensions: Dimensions,
    pub feature: VoronoiFeature,
    pub distance: VoronoiDistance,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoronoiFeature {
    #[default]
    F1,
    F2,
    SmoothF1,
    DistanceToEdge,
    NSphereRadius,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoronoiDistance {
    #[default]
    Euclidean,
    Manhattan,
    Chebychev,
    Minkowski,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct WaveTextureNode {
    pub wave_type: WaveType,
    pub bands_direction: WaveDirection,
    pub rings_direction: WaveDirection,
    pub wave_profile: WaveProfile,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WaveType {
    #[default]
    Bands,
    Rings,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WaveDirection {
    #[default]
    X,
    Y,
    Z,
    Diagonal,
    Spherical,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WaveProfile {
    #[default]
    Sin,
    Saw,
    Tri,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GradientTextureNode {
    pub gradient_type: GradientType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GradientType {
    #[default]
    Linear,
    Quadratic,
    Easing,
    Diagonal,
    Spherical,
    QuadraticSphere,
    Radial,
}

// ---------------------------------------------------------------------------
// Vector

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MappingNode {
    pub vector_type: MappingType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MappingType {
    #[default]
    Point,
    Texture,
    Vector,
    Normal,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct VectorRotateNode {
    pub rotation_type: RotationType,
    pub invert: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RotationType {
    #[default]
    AxisAngle,
    XAxis,
    YAxis,
    ZAxis,
    EulerXyz,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct VectorTransformNode {
    pub vector_type: VectorTransformType,
    pub convert_from: TransformSpace,
    pub convert_to: TransformSpace,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VectorTransformType {
    #[default]
    Vector,
    Point,
    Normal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransformSpace {
    #[default]
    World,
    Object,
    Camera,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NormalMapNode {
    pub space: NormalMapSpace,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NormalMapSpace {
    #[default]
    Tangent,
    Object,
    World,
    BlenderObject,
    BlenderWorld,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BumpNode {
    pub invert: bool,
}

// ---------------------------------------------------------------------------
// Structure

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GroupNode {
    /// Name of the node tree this group instantiates.
    pub node_tree: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputNode {
    pub target: OutputTarget,
    pub is_active_output: bool,
}

impl Default for OutputNode {
    fn default() -> Self {
        Self {
            target: OutputTarget::All,
            is_active_output: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutputTarget {
    #[default]
    All,
    Eevee,
    Cycles,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_math_node() {
        let kind = NodeKind::from_idname(
            "ShaderNodeMath",
            json!({ "operation": "ARCTAN2", "use_clamp": true }),
        )
        .unwrap();
        assert_eq!(
            kind,
            NodeKind::Math(MathNode {
                operation: MathOperation::Arctan2,
                use_clamp: true
            })
        );
    }

    #[test]
    fn test_missing_properties_use_defaults() {
        let kind = NodeKind::from_idname("ShaderNodeMapRange", Value::Null).unwrap();
        match kind {
            NodeKind::MapRange(node) => {
                assert!(node.clamp);
                assert_eq!(node.interpolation_type, MapRangeInterpolation::Linear);
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_unknown_operation_is_unsupported() {
        let kind =
            NodeKind::from_idname("ShaderNodeMath", json!({ "operation": "FANCY_NEW_OP" })).unwrap();
        assert_eq!(
            kind,
            NodeKind::Math(MathNode {
                operation: MathOperation::Unsupported,
                use_clamp: false
            })
        );
    }

    #[test]
    fn test_unknown_idname() {
        let kind = NodeKind::from_idname("ShaderNodeHairInfo", Value::Null).unwrap();
        assert_eq!(kind, NodeKind::Unsupported("ShaderNodeHairInfo".to_string()));
        assert_eq!(kind.type_name(), "ShaderNodeHairInfo");
    }

    #[test]
    fn test_parse_several_property_kinds() {
        let output = NodeKind::from_idname(
            "ShaderNodeOutputMaterial",
            json!({ "target": "CYCLES", "is_active_output": false }),
        )
        .unwrap();
        assert_eq!(
            output,
            NodeKind::OutputMaterial(OutputNode {
                target: OutputTarget::Cycles,
                is_active_output: false
            })
        );

        let clamp = NodeKind::from_idname("ShaderNodeClamp", json!({ "clamp_type": "RANGE" })).unwrap();
        assert_eq!(clamp, NodeKind::Clamp(ClampNode { clamp_type: ClampType::Range }));

        let group = NodeKind::from_idname("ShaderNodeGroup", json!({ "node_tree": "Inner" })).unwrap();
        assert_eq!(
            group,
            NodeKind::Group(GroupNode {
                node_tree: Some("Inner".to_string())
            })
        );
    }

    #[test]
    fn test_legacy_separate_rgb() {
        let kind = NodeKind::from_idname("ShaderNodeSeparateRGB", Value::Null).unwrap();
        assert_eq!(kind, NodeKind::SeparateColor(ColorModeNode { mode: ColorMode::Rgb }));
    }

    #[test]
    fn test_image_properties() {
        let kind = NodeKind::from_idname(
            "ShaderNodeTexImage",
            json!({ "image": "wood.png", "extension": "EXTEND", "interpolation": "Closest" }),
        )
        .unwrap();
        match kind {
            NodeKind::TexImage(tex) => {
                assert_eq!(tex.image.as_deref(), Some("wood.png"));
                assert_eq!(tex.extension, ImageExtension::Extend);
                assert_eq!(tex.interpolation, ImageInterpolation::Closest);
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }
}
