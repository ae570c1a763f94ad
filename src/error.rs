//! Error types for the scene exporter.

use thiserror::Error;

/// Result type alias using ExportError.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Main error type for scene export operations.
///
/// Only conditions that make the whole export unusable end up here. Everything
/// recoverable (unsupported nodes, missing materials, broken meshes) is turned
/// into a [`Diagnostic`](crate::diagnostics::Diagnostic) instead.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Failed to parse or write JSON data.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to encode or decode an image.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The host scene dump is structurally invalid (dangling link, unknown socket, ...).
    #[error("Invalid scene: {0}")]
    InvalidScene(String),

    /// Failed to export the scene.
    #[error("Export error: {0}")]
    Export(String),
}

/// Geometry that cannot be written as a mesh.
///
/// Raised per object; the scene assembler reports it and skips the object.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    #[error("mesh '{mesh}': polygon {polygon} has {count} vertices")]
    DegeneratePolygon {
        mesh: String,
        polygon: usize,
        count: usize,
    },

    #[error("mesh '{mesh}': polygon {polygon} references vertex {index} of {vertex_count}")]
    IndexOutOfRange {
        mesh: String,
        polygon: usize,
        index: u32,
        vertex_count: usize,
    },

    #[error("mesh '{mesh}': polygon {polygon} has more than 255 vertices")]
    PolygonTooLarge { mesh: String, polygon: usize },

    #[error("mesh '{mesh}': {uvs} uv coordinates for {loops} face corners")]
    UvCount {
        mesh: String,
        uvs: usize,
        loops: usize,
    },
}
