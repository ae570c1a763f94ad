//! # Ignis Exporter
//!
//! A Rust library for exporting Blender scenes to the Ignis renderer.
//!
//! ## Overview
//!
//! This library takes a dump of a Blender scene (objects, meshes, lights and
//! shader node trees) as input, and produces an Ignis JSON scene plus the
//! PLY meshes and textures it references. Shader node graphs are compiled
//! into Ignis shading expressions; whatever cannot be translated degrades to
//! a default and is reported as a diagnostic.
//!
//! ## Quick Start
//!
//! ```ignore
//! use ignis_exporter::{export_to_file, load_scene, ExportSettings};
//!
//! // Load a scene dump written by the Blender side
//! let scene = load_scene("dump.json")?;
//!
//! // Export it next to the meshes and textures
//! let report = export_to_file(&scene, &ExportSettings::default(), "out/scene.json")?;
//! for diagnostic in report.diagnostics.entries() {
//!     eprintln!("{}", diagnostic);
//! }
//! ```
//!
//! ## In-memory export
//!
//! [`export`] without a root directory builds the scene description only;
//! no mesh or texture files are written:
//!
//! ```ignore
//! let report = ignis_exporter::export(&scene, &settings, None)?;
//! println!("{}", report.scene.to_json()?);
//! ```

pub mod context;
pub mod diagnostics;
pub mod error;
pub mod export;
pub mod host;
pub mod lower;
pub mod material;
pub mod output;
pub mod scene;
pub mod settings;
pub mod types;

// Re-export main types for convenience
pub use context::{ExportContext, NamePool};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{ExportError, Result, ShapeError};
pub use host::HostScene;
pub use lower::export_node;
pub use material::{export_bsdf, get_emission};
pub use output::SceneDescriptor;
pub use settings::{ExportSettings, TechniqueKind, TechniqueSettings};
pub use types::{Expr, SocketType, SocketValue};

use std::path::Path;

/// Outcome of a successful export.
#[derive(Debug)]
pub struct ExportReport {
    pub scene: SceneDescriptor,
    pub diagnostics: Diagnostics,
}

/// Load a host scene dump from a JSON file.
pub fn load_scene<P: AsRef<Path>>(path: P) -> Result<HostScene> {
    host::loader::load_from_path(path)
}

/// Export `scene`, writing payload files below `root` if given.
pub fn export(scene: &HostScene, settings: &ExportSettings, root: Option<&Path>) -> Result<ExportReport> {
    let mut ctx = ExportContext::new(scene, settings, root);
    scene::export_scene(&mut ctx)?;
    let (scene, diagnostics) = ctx.finish();
    Ok(ExportReport { scene, diagnostics })
}

/// Export `scene` to the scene file `path`.
///
/// Meshes and textures go into directories next to the scene file.
pub fn export_to_file<P: AsRef<Path>>(
    scene: &HostScene,
    settings: &ExportSettings,
    path: P,
) -> Result<ExportReport> {
    let path = path.as_ref();
    let root = path.parent().unwrap_or_else(|| Path::new("."));
    let report = export(scene, settings, Some(root))?;
    export::write_scene_file(&report.scene, path)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = r#"{
        "name": "Scene",
        "node_trees": [
            {
                "name": "Red",
                "nodes": [
                    {
                        "name": "Diffuse BSDF",
                        "type": "ShaderNodeBsdfDiffuse",
                        "inputs": [
                            { "name": "Color", "type": "RGBA", "default": [1, 0, 0, 1] },
                            { "name": "Roughness", "type": "VALUE", "default": 0 }
                        ],
                        "outputs": [{ "name": "BSDF", "type": "SHADER" }]
                    },
                    {
                        "name": "Material Output",
                        "type": "ShaderNodeOutputMaterial",
                        "inputs": [{ "name": "Surface", "type": "SHADER" }]
                    }
                ],
                "links": [
                    { "from_node": "Diffuse BSDF", "from_socket": "BSDF", "to_node": "Material Output", "to_socket": "Surface" }
                ]
            }
        ],
        "materials": [{ "name": "Red", "node_tree": "Red" }],
        "meshes": [
            {
                "name": "Cube",
                "vertices": [[0, 0, 0], [1, 0, 0], [1, 1, 0], [0, 1, 0]],
                "polygons": [{ "vertices": [0, 1, 2, 3] }]
            }
        ],
        "lights": [{ "name": "PointData", "type": "POINT", "color": [1, 1, 1], "energy": 100 }],
        "objects": [
            { "name": "Cube", "type": "MESH", "data": "Cube", "material_slots": ["Red"] },
            {
                "name": "Point",
                "type": "LIGHT",
                "data": "PointData",
                "matrix_world": [[1, 0, 0, 0], [0, 1, 0, 0], [0, 0, 1, 4], [0, 0, 0, 1]]
            }
        ],
        "world": { "color": [0.05, 0.05, 0.05] }
    }"#;

    #[test]
    fn test_export_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let scene = host::loader::load_from_str(DUMP, None).unwrap();
        let path = dir.path().join("scene.json");

        let report = export_to_file(&scene, &ExportSettings::default(), &path).unwrap();
        assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
        assert!(dir.path().join("Meshes").join("Cube.ply").exists());

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["technique"]["type"], "path");
        assert_eq!(json["film"]["size"], serde_json::json!([1920, 1080]));
        assert_eq!(json["shapes"][0]["filename"], "Meshes/Cube.ply");
        assert_eq!(json["entities"][0]["name"], "Cube-Cube");
        assert_eq!(json["entities"][0]["bsdf"], "Red");
        assert_eq!(json["bsdfs"][2]["reflectance"], serde_json::json!([1.0, 0.0, 0.0]));

        let lights = json["lights"].as_array().unwrap();
        assert_eq!(lights[0]["type"], "point");
        assert_eq!(lights[0]["position"], serde_json::json!([0.0, 0.0, 4.0]));
        assert_eq!(lights[1]["name"], "__scene_world");
    }

    #[test]
    fn test_in_memory_export() {
        let scene = host::loader::load_from_str(DUMP, None).unwrap();
        let settings = ExportSettings::default().with_lights(false).with_background(false);
        let report = export(&scene, &settings, None).unwrap();
        assert!(report.scene.lights.is_empty());
        assert_eq!(report.scene.entities.len(), 1);
        assert!(report.scene.dangling_references().is_empty());
    }
}
