//! World background as environment light.

use crate::context::ExportContext;
use crate::material::{get_emission, surface_socket};
use crate::output::{Light, LightKind};
use crate::types::Expr;

/// Name of the environment light.
pub const WORLD_LIGHT: &str = "__scene_world";

/// Turns the Z-up world into the renderer's Y-up environment lookup.
pub const ENVIRONMENT_MAP_TRANSFORM: [f64; 9] = [0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0];

/// Export the world background, if it emits anything.
///
/// A world without a node tree uses its flat color. Constant radiance is
/// direction independent, so only textured backgrounds get the
/// environment transform.
pub fn export_background(ctx: &mut ExportContext<'_>) {
    let scene = ctx.scene;
    let Some(world) = &scene.world else {
        return;
    };

    let radiance = match world.node_tree.as_deref() {
        Some(tree) => {
            let Some(tree) = scene.tree_id(tree) else {
                ctx.report_warning(format!("World node tree '{}' does not exist", tree));
                return;
            };
            match surface_socket(ctx, tree).and_then(|socket| get_emission(ctx, socket)) {
                Some(radiance) => radiance,
                None => return,
            }
        }
        None => {
            let [r, g, b] = world.color;
            Expr::color([r, g, b, 1.0])
        }
    };

    let transform = match radiance.as_color() {
        Some(c) if c[0] <= 0.0 && c[1] <= 0.0 && c[2] <= 0.0 => return,
        Some(_) => None,
        None => Some(ENVIRONMENT_MAP_TRANSFORM),
    };
    ctx.output.lights.push(Light {
        name: WORLD_LIGHT.to_string(),
        kind: LightKind::Env {
            radiance,
            transform,
        },
    });
}
