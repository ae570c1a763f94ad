//! Canonical scene output types.
//!
//! [`SceneDescriptor`] is the in-memory form of an Ignis scene file. It is
//! filled in append-only order during an export and serialized with serde;
//! empty sections and unset optional parameters are omitted from the JSON.

use crate::types::Expr;
use serde::Serialize;
use std::collections::HashSet;

/// A complete Ignis scene.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SceneDescriptor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technique: Option<Technique>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera: Option<Camera>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub film: Option<Film>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub textures: Vec<Texture>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bsdfs: Vec<Bsdf>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shapes: Vec<Shape>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<Entity>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lights: Vec<Light>,
}

impl SceneDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bsdf(&self, name: &str) -> Option<&Bsdf> {
        self.bsdfs.iter().find(|b| b.name == name)
    }

    pub fn shape(&self, name: &str) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.name == name)
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn light(&self, name: &str) -> Option<&Light> {
        self.lights.iter().find(|l| l.name == name)
    }

    /// List every `bsdf`, `shape` or `entity` reference without a definition.
    pub fn dangling_references(&self) -> Vec<String> {
        let bsdfs: HashSet<&str> = self.bsdfs.iter().map(|b| b.name.as_str()).collect();
        let shapes: HashSet<&str> = self.shapes.iter().map(|s| s.name.as_str()).collect();
        let entities: HashSet<&str> = self.entities.iter().map(|e| e.name.as_str()).collect();

        let mut missing = Vec::new();
        for bsdf in &self.bsdfs {
            if let BsdfKind::Blend { first, second, .. } | BsdfKind::Add { first, second } =
                &bsdf.kind
            {
                for child in [first, second] {
                    if !bsdfs.contains(child.as_str()) {
                        missing.push(format!("bsdf '{}'", child));
                    }
                }
            }
        }
        for entity in &self.entities {
            if !shapes.contains(entity.shape.as_str()) {
                missing.push(format!("shape '{}'", entity.shape));
            }
            if !bsdfs.contains(entity.bsdf.as_str()) {
                missing.push(format!("bsdf '{}'", entity.bsdf));
            }
        }
        for light in &self.lights {
            if let LightKind::Area { entity, .. } = &light.kind {
                if !entities.contains(entity.as_str()) {
                    missing.push(format!("entity '{}'", entity));
                }
            }
        }
        missing
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Rendering technique.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Technique {
    Path { max_depth: u32, clamp: f64 },
    Volpath { max_depth: u32, clamp: f64 },
    Ppm { max_depth: u32, clamp: f64, photons: u32 },
    Ao,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Camera {
    #[serde(rename = "type")]
    pub kind: String,
    /// Field of view in degrees.
    pub fov: f64,
    pub near_clip: f64,
    pub far_clip: f64,
    pub transform: [f64; 16],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Film {
    pub size: [u32; 2],
}

/// An image texture entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Texture {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub filename: String,
    pub wrap_mode: String,
    pub filter_type: String,
    pub linear: bool,
}

/// A named bsdf.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bsdf {
    pub name: String,
    #[serde(flatten)]
    pub kind: BsdfKind,
}

impl Bsdf {
    pub fn new(name: impl Into<String>, kind: BsdfKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Plain diffuse with the given reflectance.
    pub fn diffuse(name: impl Into<String>, reflectance: Expr) -> Self {
        Self::new(name, BsdfKind::Diffuse { reflectance })
    }

    /// Same parameters under a different name.
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BsdfKind {
    Diffuse {
        reflectance: Expr,
    },
    RoughDiffuse {
        reflectance: Expr,
        roughness: Expr,
    },
    Dielectric {
        specular_reflectance: Expr,
        specular_transmittance: Expr,
        #[serde(skip_serializing_if = "Option::is_none")]
        roughness: Option<Expr>,
        int_ior: Expr,
        ext_ior: Expr,
    },
    Conductor {
        specular_reflectance: Expr,
        #[serde(skip_serializing_if = "Option::is_none")]
        roughness: Option<Expr>,
    },
    Principled(Box<PrincipledParams>),
    Blend {
        first: String,
        second: String,
        weight: Expr,
    },
    Add {
        first: String,
        second: String,
    },
}

/// Parameters of a `principled` bsdf; unset entries use the renderer defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PrincipledParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_color: Option<Expr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metallic: Option<Expr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roughness: Option<Expr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anisotropic: Option<Expr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheen: Option<Expr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheen_tint: Option<Expr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clearcoat: Option<Expr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clearcoat_roughness: Option<Expr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flatness: Option<Expr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specular_transmission: Option<Expr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specular_tint: Option<Expr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diffuse_transmission: Option<Expr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ior: Option<Expr>,
}

/// A named shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Shape {
    pub name: String,
    #[serde(flatten)]
    pub kind: ShapeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ShapeKind {
    /// External mesh, path relative to the scene file.
    Ply { filename: String },
    Rectangle {
        width: f64,
        height: f64,
        flip_normals: bool,
    },
}

/// A shape placed in the scene with a bsdf.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    pub name: String,
    pub shape: String,
    pub bsdf: String,
    pub transform: [f64; 16],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadow_visible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_visible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounce_visible: Option<bool>,
}

/// A named light.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Light {
    pub name: String,
    #[serde(flatten)]
    pub kind: LightKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LightKind {
    Point {
        position: [f64; 3],
        intensity: [f64; 3],
    },
    Spot {
        position: [f64; 3],
        direction: [f64; 3],
        intensity: [f64; 3],
        cutoff: f64,
        falloff: f64,
    },
    Direction {
        direction: [f64; 3],
        irradiance: [f64; 3],
    },
    Area {
        entity: String,
        radiance: Expr,
    },
    Env {
        radiance: Expr,
        #[serde(skip_serializing_if = "Option::is_none")]
        transform: Option<[f64; 9]>,
    },
}
