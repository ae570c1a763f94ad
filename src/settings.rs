//! Export configuration.

use serde::{Deserialize, Serialize};

/// Main exporter configuration.
///
/// Deserializes from a (partial) JSON object; missing fields take their
/// defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Only export selected objects.
    pub use_selection: bool,
    /// Export materials; otherwise every entity uses a plain diffuse bsdf.
    pub export_materials: bool,
    /// Export lights and emissive entities.
    pub export_lights: bool,
    /// Export the world background as environment light.
    pub enable_background: bool,
    /// Export the active camera and film size.
    pub enable_camera: bool,
    /// Export the rendering technique.
    pub enable_technique: bool,
    /// Rendering technique parameters.
    pub technique: TechniqueSettings,
    /// Directory (relative to the output file) receiving PLY files.
    pub mesh_dir_name: String,
    /// Directory (relative to the output file) receiving texture images.
    pub tex_dir_name: String,
    /// Maximum node group nesting before lowering gives up.
    pub max_group_depth: usize,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            use_selection: false,
            export_materials: true,
            export_lights: true,
            enable_background: true,
            enable_camera: true,
            enable_technique: true,
            technique: TechniqueSettings::default(),
            mesh_dir_name: "Meshes".to_string(),
            tex_dir_name: "Textures".to_string(),
            max_group_depth: 64,
        }
    }
}

impl ExportSettings {
    pub fn with_selection(mut self, use_selection: bool) -> Self {
        self.use_selection = use_selection;
        self
    }

    pub fn with_materials(mut self, export_materials: bool) -> Self {
        self.export_materials = export_materials;
        self
    }

    pub fn with_lights(mut self, export_lights: bool) -> Self {
        self.export_lights = export_lights;
        self
    }

    pub fn with_background(mut self, enable: bool) -> Self {
        self.enable_background = enable;
        self
    }

    pub fn with_camera(mut self, enable: bool) -> Self {
        self.enable_camera = enable;
        self
    }

    pub fn with_technique(mut self, technique: TechniqueSettings) -> Self {
        self.technique = technique;
        self.enable_technique = true;
        self
    }

    pub fn without_technique(mut self) -> Self {
        self.enable_technique = false;
        self
    }

    pub fn with_max_group_depth(mut self, depth: usize) -> Self {
        self.max_group_depth = depth;
        self
    }
}

/// Integrator selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TechniqueKind {
    #[default]
    Path,
    Volpath,
    Ppm,
    Ao,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TechniqueSettings {
    #[serde(rename = "type")]
    pub kind: TechniqueKind,
    pub max_depth: u32,
    pub clamp: f64,
    /// Photons per pass, only used by `ppm`.
    pub photons: u32,
}

impl Default for TechniqueSettings {
    fn default() -> Self {
        Self {
            kind: TechniqueKind::Path,
            max_depth: 8,
            clamp: 0.0,
            photons: 1_000_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings() {
        let settings: ExportSettings =
            serde_json::from_str(r#"{ "export_lights": false, "technique": { "type": "ppm" } }"#)
                .unwrap();
        assert!(!settings.export_lights);
        assert!(settings.export_materials);
        assert_eq!(settings.technique.kind, TechniqueKind::Ppm);
        assert_eq!(settings.technique.max_depth, 8);
        assert_eq!(settings.mesh_dir_name, "Meshes");
    }

    #[test]
    fn test_builder() {
        let settings = ExportSettings::default()
            .with_selection(true)
            .with_camera(false)
            .with_max_group_depth(4);
        assert!(settings.use_selection);
        assert!(!settings.enable_camera);
        assert_eq!(settings.max_group_depth, 4);
    }
}
