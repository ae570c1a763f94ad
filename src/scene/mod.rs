//! Scene assembly.
//!
//! Walks every object instance once, exports its geometry (shared between
//! instances of the same mesh), places entities and lights, then exports
//! each referenced material exactly once.

pub mod camera;
pub mod entity;
pub mod light;
pub mod shape;
pub mod technique;
pub mod world;

pub use entity::export_entity;
pub use light::export_light;
pub use shape::{export_shape, shape_name_base, ExportedShape};

use crate::context::{ExportContext, NamePool};
use crate::error::Result;
use crate::host::{HostInstance, ObjectType};
use crate::material::{
    black_bsdf, default_bsdf, error_bsdf, export_material, BLACK_BSDF, DEFAULT_BSDF, ERROR_BSDF,
};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Assemble the whole scene into `ctx.output`.
///
/// Recoverable problems end up in the context diagnostics. The only error
/// is failing to write a mesh or texture file.
pub fn export_scene(ctx: &mut ExportContext<'_>) -> Result<()> {
    let settings = ctx.settings;
    if settings.enable_technique {
        ctx.output.technique = Some(technique::export_technique(&settings.technique));
    }
    if settings.enable_camera {
        camera::export_camera(ctx);
    }

    ctx.output.bsdfs.push(black_bsdf(BLACK_BSDF));
    ctx.output.bsdfs.push(error_bsdf(ERROR_BSDF));

    let mut shapes: HashMap<String, Vec<ExportedShape>> = HashMap::new();
    let mut names = NamePool::new();
    for instance in ctx.scene.resolved_instances() {
        export_instance(ctx, &instance, &mut shapes, &mut names)?;
    }

    if settings.export_materials {
        let materials = ctx.collected_materials().to_vec();
        for material in &materials {
            export_material(ctx, material);
        }
    } else {
        ctx.output.bsdfs.push(default_bsdf(DEFAULT_BSDF));
    }

    if settings.enable_background {
        world::export_background(ctx);
    }

    if let Some(err) = ctx.take_io_error() {
        return Err(err);
    }
    for dir in [ctx.mesh_dir(), ctx.tex_dir()].into_iter().flatten() {
        remove_if_empty(&dir);
    }

    log::info!(
        "Exported {} shape(s), {} entities, {} light(s), {} bsdf(s)",
        ctx.output.shapes.len(),
        ctx.output.entities.len(),
        ctx.output.lights.len(),
        ctx.output.bsdfs.len()
    );
    Ok(())
}

fn export_instance(
    ctx: &mut ExportContext<'_>,
    instance: &HostInstance,
    shapes: &mut HashMap<String, Vec<ExportedShape>>,
    names: &mut NamePool,
) -> Result<()> {
    let scene = ctx.scene;
    let Some(object) = scene.object(&instance.object) else {
        ctx.report_warning(format!("Instance of unknown object '{}'", instance.object));
        return Ok(());
    };
    if ctx.settings.use_selection && !object.selected {
        return Ok(());
    }
    if !ctx.settings.use_selection && !instance.show_self {
        return Ok(());
    }
    let matrix = instance.matrix_world.unwrap_or(object.matrix_world);

    if object.kind.is_geometry() {
        let base = shape_name_base(object, instance.generated);
        let exported = match shapes.get(&base) {
            Some(exported) => exported.clone(),
            None => {
                let exported = export_shape(ctx, &base, object)?;
                shapes.insert(base, exported.clone());
                exported
            }
        };

        if exported.is_empty() {
            ctx.report_warning(format!(
                "Entity '{}' has no material or shape and will be ignored",
                object.name
            ));
        }
        for shape in &exported {
            export_entity(ctx, names, object, &matrix, shape);
        }
    } else if object.kind == ObjectType::Light && ctx.settings.export_lights {
        let Some(light) = object.data.as_deref().and_then(|d| scene.light(d)) else {
            ctx.report_warning(format!("Light object '{}' has no light data", object.name));
            return Ok(());
        };
        let name = names.claim(object.name.clone());
        export_light(ctx, &name, light, &matrix);
    }
    Ok(())
}

fn remove_if_empty(dir: &Path) {
    let empty = fs::read_dir(dir).map_or(false, |mut entries| entries.next().is_none());
    if empty {
        if let Err(err) = fs::remove_dir(dir) {
            log::debug!("Could not remove {}: {}", dir.display(), err);
        }
    }
}
