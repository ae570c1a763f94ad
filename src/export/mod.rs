//! Payload and scene file writers.
//!
//! This module writes the files referenced by the scene: PLY meshes,
//! texture images and the scene JSON itself.

pub mod json;
pub mod ply;
pub mod texture;

pub use json::{write_scene, write_scene_file};
pub use ply::{write_ply, write_ply_file, PlyMesh};
pub use texture::register_image;
