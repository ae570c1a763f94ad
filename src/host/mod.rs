//! The host scene graph.
//!
//! This is the read-only input of an export: objects, meshes, lights,
//! materials and their node trees as dumped by the host editor. Everything
//! deserializes with serde so a scene can be loaded from a JSON dump, and
//! the `add_*` methods allow building scenes in code.

pub mod loader;
mod node;
mod tree;

pub use node::*;
pub use tree::{InputRef, Node, NodeId, NodeTree, Socket, TreeError, TreeId};

use crate::types::transform::IDENTITY;
use crate::types::RowMatrix;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The complete host scene.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HostScene {
    pub name: String,
    pub render: RenderSettings,
    /// Name of the active camera object.
    pub camera: Option<String>,
    pub cameras: Vec<HostCamera>,
    pub world: Option<HostWorld>,
    pub node_trees: Vec<NodeTree>,
    pub materials: Vec<HostMaterial>,
    pub meshes: Vec<HostMesh>,
    pub lights: Vec<HostLight>,
    pub images: Vec<HostImage>,
    pub objects: Vec<HostObject>,
    /// Evaluated object instances. When absent every object is instanced once.
    pub instances: Option<Vec<HostInstance>>,

    /// Directory relative image paths are resolved against.
    #[serde(skip)]
    base_dir: Option<PathBuf>,
    #[serde(skip)]
    tree_index: HashMap<String, TreeId>,
}

impl HostScene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Rebuild lookup tables after deserialization.
    pub fn rebuild_index(&mut self) {
        self.tree_index = self
            .node_trees
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.clone(), TreeId(i)))
            .collect();
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    pub fn set_base_dir(&mut self, dir: impl Into<PathBuf>) {
        self.base_dir = Some(dir.into());
    }

    // Lookups

    pub fn tree_id(&self, name: &str) -> Option<TreeId> {
        self.tree_index.get(name).copied()
    }

    /// Panics if `id` was not handed out by this scene.
    pub fn tree(&self, id: TreeId) -> &NodeTree {
        &self.node_trees[id.0]
    }

    pub fn material(&self, name: &str) -> Option<&HostMaterial> {
        self.materials.iter().find(|m| m.name == name)
    }

    pub fn mesh(&self, name: &str) -> Option<&HostMesh> {
        self.meshes.iter().find(|m| m.name == name)
    }

    pub fn light(&self, name: &str) -> Option<&HostLight> {
        self.lights.iter().find(|l| l.name == name)
    }

    pub fn camera_data(&self, name: &str) -> Option<&HostCamera> {
        self.cameras.iter().find(|c| c.name == name)
    }

    pub fn image(&self, name: &str) -> Option<&HostImage> {
        self.images.iter().find(|i| i.name == name)
    }

    pub fn object(&self, name: &str) -> Option<&HostObject> {
        self.objects.iter().find(|o| o.name == name)
    }

    /// Evaluated instances, or one instance per object if the dump has none.
    pub fn resolved_instances(&self) -> Vec<HostInstance> {
        match &self.instances {
            Some(instances) => instances.clone(),
            None => self
                .objects
                .iter()
                .map(|o| HostInstance {
                    object: o.name.clone(),
                    matrix_world: None,
                    generated: false,
                    show_self: true,
                })
                .collect(),
        }
    }

    // Builders

    pub fn add_tree(&mut self, tree: NodeTree) -> TreeId {
        let id = TreeId(self.node_trees.len());
        self.tree_index.insert(tree.name.clone(), id);
        self.node_trees.push(tree);
        id
    }

    pub fn add_material(&mut self, material: HostMaterial) {
        self.materials.push(material);
    }

    pub fn add_mesh(&mut self, mesh: HostMesh) {
        self.meshes.push(mesh);
    }

    pub fn add_light(&mut self, light: HostLight) {
        self.lights.push(light);
    }

    pub fn add_camera(&mut self, camera: HostCamera) {
        self.cameras.push(camera);
    }

    pub fn add_image(&mut self, image: HostImage) {
        self.images.push(image);
    }

    pub fn add_object(&mut self, object: HostObject) {
        self.objects.push(object);
    }

    pub fn add_instance(&mut self, instance: HostInstance) {
        self.instances.get_or_insert_with(Vec::new).push(instance);
    }
}

/// Output resolution.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub resolution_x: u32,
    pub resolution_y: u32,
    pub resolution_percentage: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            resolution_x: 1920,
            resolution_y: 1080,
            resolution_percentage: 100,
        }
    }
}

impl RenderSettings {
    /// Final film size after applying the percentage.
    pub fn film_size(&self) -> [u32; 2] {
        let scale = |v: u32| ((v as u64 * self.resolution_percentage as u64) / 100).max(1) as u32;
        [scale(self.resolution_x), scale(self.resolution_y)]
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostCamera {
    pub name: String,
    /// Horizontal field of view in radians.
    pub angle: f64,
    pub clip_start: f64,
    pub clip_end: f64,
}

impl Default for HostCamera {
    fn default() -> Self {
        Self {
            name: String::new(),
            angle: 0.691_150_4,
            clip_start: 0.1,
            clip_end: 100.0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HostWorld {
    pub node_tree: Option<String>,
    /// Flat background color used when the world has no node tree.
    pub color: [f64; 3],
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostMaterial {
    pub name: String,
    pub node_tree: Option<String>,
    /// False when the material casts no shadows in the viewport engine.
    pub cast_shadows: bool,
}

impl Default for HostMaterial {
    fn default() -> Self {
        Self {
            name: String::new(),
            node_tree: None,
            cast_shadows: true,
        }
    }
}

impl HostMaterial {
    pub fn new(name: impl Into<String>, node_tree: Option<&str>) -> Self {
        Self {
            name: name.into(),
            node_tree: node_tree.map(str::to_string),
            ..Default::default()
        }
    }
}

/// Polygon mesh data.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HostMesh {
    pub name: String,
    pub vertices: Vec<[f64; 3]>,
    pub polygons: Vec<HostPolygon>,
    /// Per-vertex normals used by smooth polygons.
    pub normals: Option<Vec<[f64; 3]>>,
    /// Per-loop texture coordinates, in polygon order.
    pub loop_uvs: Option<Vec<[f64; 2]>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HostPolygon {
    pub vertices: Vec<u32>,
    pub material_index: usize,
    pub smooth: bool,
}

impl HostPolygon {
    pub fn new(vertices: Vec<u32>) -> Self {
        Self {
            vertices,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LightType {
    #[default]
    Point,
    Spot,
    Sun,
    Area,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AreaShape {
    #[default]
    Square,
    Rectangle,
    Disk,
    Ellipse,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostLight {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: LightType,
    pub color: [f64; 3],
    /// Watts for point/spot/area lights, irradiance for sun lights.
    pub energy: f64,
    /// Full cone angle in radians.
    pub spot_size: f64,
    pub spot_blend: f64,
    pub size: f64,
    pub size_y: f64,
    pub shape: AreaShape,
}

impl Default for HostLight {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: LightType::Point,
            color: [1.0, 1.0, 1.0],
            energy: 10.0,
            spot_size: std::f64::consts::FRAC_PI_4,
            spot_blend: 0.15,
            size: 1.0,
            size_y: 1.0,
            shape: AreaShape::Square,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostImage {
    pub name: String,
    /// Path of the image file, relative to the dump's directory if not absolute.
    pub filepath: Option<String>,
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    /// Packed or generated pixels (row-major RGBA floats) when there is no file.
    pub pixels: Option<Vec<f32>>,
    pub colorspace: String,
}

impl Default for HostImage {
    fn default() -> Self {
        Self {
            name: String::new(),
            filepath: None,
            width: 0,
            height: 0,
            channels: 4,
            pixels: None,
            colorspace: "sRGB".to_string(),
        }
    }
}

impl HostImage {
    /// Non-color data is stored linearly.
    pub fn is_linear(&self) -> bool {
        !self.colorspace.eq_ignore_ascii_case("srgb")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectType {
    #[default]
    Mesh,
    Curve,
    Surface,
    Meta,
    Font,
    Curves,
    Light,
    Camera,
    Empty,
    #[serde(other)]
    Other,
}

impl ObjectType {
    /// Object types exported as triangle geometry.
    pub fn is_geometry(self) -> bool {
        matches!(
            self,
            ObjectType::Mesh
                | ObjectType::Curve
                | ObjectType::Surface
                | ObjectType::Meta
                | ObjectType::Font
                | ObjectType::Curves
        )
    }
}

/// Ray visibility toggles of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Visibility {
    pub camera: bool,
    pub shadow: bool,
    pub diffuse: bool,
    pub glossy: bool,
    pub transmission: bool,
}

impl Default for Visibility {
    fn default() -> Self {
        Self {
            camera: true,
            shadow: true,
            diffuse: true,
            glossy: true,
            transmission: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostObject {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ObjectType,
    /// Name of the mesh, light or camera data block.
    pub data: Option<String>,
    pub matrix_world: RowMatrix,
    pub material_slots: Vec<Option<String>>,
    pub visibility: Visibility,
    pub selected: bool,
    /// The evaluated geometry differs from the data block (modifiers).
    pub modified: bool,
}

impl Default for HostObject {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: ObjectType::Mesh,
            data: None,
            matrix_world: IDENTITY,
            material_slots: Vec::new(),
            visibility: Visibility::default(),
            selected: false,
            modified: false,
        }
    }
}

impl HostObject {
    pub fn new(name: impl Into<String>, kind: ObjectType, data: Option<&str>) -> Self {
        Self {
            name: name.into(),
            kind,
            data: data.map(str::to_string),
            ..Default::default()
        }
    }

    pub fn with_matrix(mut self, matrix: RowMatrix) -> Self {
        self.matrix_world = matrix;
        self
    }

    pub fn with_material(mut self, material: Option<&str>) -> Self {
        self.material_slots.push(material.map(str::to_string));
        self
    }
}

/// One evaluated occurrence of an object.
#[derive(Debug, Clone, Deserialize)]
pub struct HostInstance {
    pub object: String,
    /// Instance transform; the object's own matrix when absent.
    #[serde(default)]
    pub matrix_world: Option<RowMatrix>,
    /// Created by a particle system or geometry nodes.
    #[serde(default)]
    pub generated: bool,
    #[serde(default = "default_show_self")]
    pub show_self: bool,
}

fn default_show_self() -> bool {
    true
}

impl HostInstance {
    pub fn of(object: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            matrix_world: None,
            generated: false,
            show_self: true,
        }
    }

    pub fn with_matrix(mut self, matrix: RowMatrix) -> Self {
        self.matrix_world = Some(matrix);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_film_size_percentage() {
        let render = RenderSettings {
            resolution_x: 1920,
            resolution_y: 1080,
            resolution_percentage: 50,
        };
        assert_eq!(render.film_size(), [960, 540]);
    }

    #[test]
    fn test_instances_fall_back_to_objects() {
        let mut scene = HostScene::new("S");
        scene.add_object(HostObject::new("Cube", ObjectType::Mesh, Some("CubeMesh")));
        scene.add_object(HostObject::new("Lamp", ObjectType::Light, Some("Lamp")));

        let instances = scene.resolved_instances();
        assert_eq!(instances.len(), 2);
        assert_eq!(instances[0].object, "Cube");

        scene.add_instance(HostInstance::of("Cube"));
        assert_eq!(scene.resolved_instances().len(), 1);
    }

    #[test]
    fn test_tree_index() {
        let mut scene = HostScene::new("S");
        let id = scene.add_tree(NodeTree::new("Material"));
        assert_eq!(scene.tree_id("Material"), Some(id));
        assert_eq!(scene.tree(id).name, "Material");
        assert_eq!(scene.tree_id("Other"), None);
    }

    #[test]
    fn test_object_type_geometry() {
        assert!(ObjectType::Mesh.is_geometry());
        assert!(ObjectType::Curves.is_geometry());
        assert!(!ObjectType::Light.is_geometry());
    }

    #[test]
    fn test_image_colorspace() {
        let mut image = HostImage::default();
        assert!(!image.is_linear());
        image.colorspace = "Non-Color".to_string();
        assert!(image.is_linear());
    }
}
