//! Geometry shapes.
//!
//! A host mesh is split by material slot; every non-empty slot becomes one
//! PLY shape. Shapes are keyed by their base name so instances of the same
//! mesh share the files.

use crate::context::ExportContext;
use crate::error::Result;
use crate::export::ply::{write_ply_file, PlyMesh};
use crate::host::HostObject;
use crate::output::{Shape, ShapeKind};

/// A shape written for one material slot of an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedShape {
    pub name: String,
    pub slot: usize,
}

/// Dedup key of the geometry of `object`.
///
/// Evaluated geometry that differs from the plain mesh data (modifiers,
/// generated instances) is keyed per object.
pub fn shape_name_base(object: &HostObject, generated: bool) -> String {
    let data = object.data.as_deref().unwrap_or(&object.name);
    if object.modified || generated {
        format!("{}-{}", data, object.name)
    } else {
        data.to_string()
    }
}

/// File stem for a shape, free of path separators and other awkward characters.
pub fn shape_file_stem(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Export the geometry of `object` under `base`.
///
/// Broken meshes are reported and yield no shapes. Only failing to write a
/// mesh file is an error.
pub fn export_shape(
    ctx: &mut ExportContext<'_>,
    base: &str,
    object: &HostObject,
) -> Result<Vec<ExportedShape>> {
    let scene = ctx.scene;
    let Some(mesh) = object.data.as_deref().and_then(|d| scene.mesh(d)) else {
        ctx.report_warning(format!("Object '{}' has no mesh data", object.name));
        return Ok(Vec::new());
    };

    let slots = object.material_slots.len().max(1);
    let mut shapes = Vec::new();
    for slot in 0..slots {
        let ply = match PlyMesh::from_host(mesh, |p| p.material_index.min(slots - 1) == slot) {
            Ok(ply) => ply,
            Err(err) => {
                ctx.report_warning(format!("Object '{}' skipped: {}", object.name, err));
                return Ok(Vec::new());
            }
        };
        if ply.is_empty() {
            continue;
        }

        let name = ctx.claim_shape_name(if slots == 1 {
            base.to_string()
        } else {
            format!("{}-{}", base, slot)
        });
        let file_name = ctx.claim_mesh_file(&shape_file_stem(&name));
        if let Some(dir) = ctx.mesh_dir() {
            write_ply_file(&ply, &dir.join(&file_name))?;
        }

        ctx.output.shapes.push(Shape {
            name: name.clone(),
            kind: ShapeKind::Ply {
                filename: format!("{}/{}", ctx.settings.mesh_dir_name, file_name),
            },
        });
        shapes.push(ExportedShape { name, slot });
    }

    log::debug!("Exported {} shape(s) for '{}'", shapes.len(), base);
    Ok(shapes)
}
