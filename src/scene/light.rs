//! Light objects.
//!
//! Point, spot and sun lights map directly onto Ignis lights. Area lights
//! become a black rectangle entity with an `area` light attached, so they
//! show up in reflections like any other emitter.

use crate::context::ExportContext;
use crate::host::{AreaShape, HostLight, LightType};
use crate::material::black_bsdf;
use crate::output::{Entity, Light, LightKind, Shape, ShapeKind};
use crate::types::transform::{flat_matrix, transform_point, transform_vector};
use crate::types::{Expr, RowMatrix};
use glam::DVec3;

/// Export the light `light` placed by the object `name` at `matrix`.
pub fn export_light(ctx: &mut ExportContext<'_>, name: &str, light: &HostLight, matrix: &RowMatrix) {
    let power = [
        light.color[0] * light.energy,
        light.color[1] * light.energy,
        light.color[2] * light.energy,
    ];
    let position = transform_point(matrix, DVec3::ZERO);
    let direction = transform_vector(matrix, DVec3::Z).normalize_or_zero();

    let kind = match light.kind {
        LightType::Point => LightKind::Point {
            position: position.to_array(),
            intensity: power,
        },
        LightType::Spot => {
            let cutoff = (light.spot_size / 2.0).to_degrees();
            LightKind::Spot {
                position: position.to_array(),
                direction: direction.to_array(),
                intensity: power,
                cutoff,
                falloff: cutoff * (1.0 - light.spot_blend),
            }
        }
        LightType::Sun => LightKind::Direction {
            direction: (-direction).to_array(),
            irradiance: power,
        },
        LightType::Area => {
            export_area_geometry(ctx, name, light, matrix);
            LightKind::Area {
                entity: name.to_string(),
                radiance: Expr::color([power[0], power[1], power[2], 1.0]),
            }
        }
    };

    log::debug!("Exported {:?} light '{}'", light.kind, name);
    ctx.output.lights.push(Light {
        name: name.to_string(),
        kind,
    });
}

fn export_area_geometry(ctx: &mut ExportContext<'_>, name: &str, light: &HostLight, matrix: &RowMatrix) {
    let height = match light.shape {
        AreaShape::Square | AreaShape::Disk => light.size,
        AreaShape::Rectangle | AreaShape::Ellipse => light.size_y,
    };
    if matches!(light.shape, AreaShape::Disk | AreaShape::Ellipse) {
        ctx.report_info(format!(
            "Area light '{}' is exported as a rectangle",
            name
        ));
    }

    let shape = ctx.claim_shape_name(format!("{}-shape", name));
    let bsdf = format!("{}-bsdf", name);
    ctx.output.shapes.push(Shape {
        name: shape.clone(),
        kind: ShapeKind::Rectangle {
            width: light.size,
            height,
            flip_normals: true,
        },
    });
    ctx.output.bsdfs.push(black_bsdf(bsdf.as_str()));
    ctx.output.entities.push(Entity {
        name: name.to_string(),
        shape,
        bsdf,
        transform: flat_matrix(matrix),
        shadow_visible: None,
        camera_visible: None,
        bounce_visible: None,
    });
}
