//! Entities: shapes placed in the scene with a bsdf.

use super::shape::ExportedShape;
use crate::context::{ExportContext, NamePool};
use crate::host::HostObject;
use crate::material::{material_emission, BLACK_BSDF, DEFAULT_BSDF};
use crate::output::{Entity, Light, LightKind};
use crate::types::transform::flat_matrix;
use crate::types::{Expr, RowMatrix};

struct SlotMaterial {
    bsdf: String,
    emission: Option<Expr>,
    cast_shadows: bool,
}

fn slot_material(ctx: &mut ExportContext<'_>, object: &HostObject, shape: &ExportedShape) -> SlotMaterial {
    let fallback = |bsdf: &str| SlotMaterial {
        bsdf: bsdf.to_string(),
        emission: None,
        cast_shadows: true,
    };
    if !ctx.settings.export_materials {
        return fallback(DEFAULT_BSDF);
    }

    match object.material_slots.get(shape.slot) {
        Some(Some(material)) => {
            ctx.collect_material(material);
            let emission = if ctx.settings.export_lights {
                material_emission(ctx, material)
            } else {
                None
            };
            SlotMaterial {
                bsdf: material.clone(),
                emission,
                cast_shadows: ctx.scene.material(material).map_or(true, |m| m.cast_shadows),
            }
        }
        Some(None) => {
            ctx.report_warning(format!(
                "Empty material slot {} for shape '{}' of object '{}'",
                shape.slot, shape.name, object.name
            ));
            fallback(BLACK_BSDF)
        }
        None => {
            ctx.report_warning(format!("Entity '{}' has no material", object.name));
            fallback(BLACK_BSDF)
        }
    }
}

/// Place `shape` of `object` at `matrix`.
///
/// Entities with an emissive material also get an `area` light.
pub fn export_entity(
    ctx: &mut ExportContext<'_>,
    names: &mut NamePool,
    object: &HostObject,
    matrix: &RowMatrix,
    shape: &ExportedShape,
) {
    let material = slot_material(ctx, object, shape);
    let name = names.claim(format!("{}-{}", object.name, shape.name));
    let visibility = object.visibility;

    let hidden = |visible: bool| if visible { None } else { Some(false) };
    ctx.output.entities.push(Entity {
        name: name.clone(),
        shape: shape.name.clone(),
        bsdf: material.bsdf,
        transform: flat_matrix(matrix),
        shadow_visible: hidden(material.cast_shadows && visibility.shadow),
        camera_visible: hidden(visibility.camera),
        bounce_visible: hidden(visibility.diffuse || visibility.glossy || visibility.transmission),
    });

    if let Some(radiance) = material.emission {
        ctx.output.lights.push(Light {
            name: name.clone(),
            kind: LightKind::Area {
                entity: name,
                radiance,
            },
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostMaterial, HostScene, NodeTree, ObjectType, Visibility};
    use crate::material::test_util::{emission_node, output_node};
    use crate::settings::ExportSettings;
    use crate::types::transform::IDENTITY;

    fn shape(slot: usize) -> ExportedShape {
        ExportedShape {
            name: "Cube".into(),
            slot,
        }
    }

    fn glowing_scene() -> HostScene {
        let mut tree = NodeTree::new("GlowTree");
        let glow = tree.add_node(emission_node("Glow", [1.0, 1.0, 1.0, 1.0], 5.0));
        let out = tree.add_node(output_node());
        tree.link(glow, "Emission", out, "Surface").unwrap();
        let mut scene = HostScene::new("S");
        scene.add_tree(tree);
        scene.add_material(HostMaterial::new("Glow", Some("GlowTree")));
        scene
    }

    #[test]
    fn test_emissive_entity_becomes_area_light() {
        let scene = glowing_scene();
        let object = HostObject::new("Panel", ObjectType::Mesh, Some("Cube")).with_material(Some("Glow"));
        let settings = ExportSettings::default();
        let mut ctx = ExportContext::new(&scene, &settings, None);
        let mut names = NamePool::new();

        export_entity(&mut ctx, &mut names, &object, &IDENTITY, &shape(0));
        let entity = ctx.output.entity("Panel-Cube").unwrap();
        assert_eq!(entity.bsdf, "Glow");
        assert_eq!(entity.transform[0], 1.0);
        assert_eq!(entity.shadow_visible, None);
        assert_eq!(
            ctx.output.light("Panel-Cube").unwrap().kind,
            LightKind::Area {
                entity: "Panel-Cube".into(),
                radiance: Expr::color([5.0, 5.0, 5.0, 1.0]),
            }
        );
        assert_eq!(ctx.collected_materials(), ["Glow".to_string()]);
    }

    #[test]
    fn test_no_area_light_without_lights() {
        let scene = glowing_scene();
        let object = HostObject::new("Panel", ObjectType::Mesh, Some("Cube")).with_material(Some("Glow"));
        let settings = ExportSettings::default().with_lights(false);
        let mut ctx = ExportContext::new(&scene, &settings, None);

        export_entity(&mut ctx, &mut NamePool::new(), &object, &IDENTITY, &shape(0));
        assert!(ctx.output.lights.is_empty());
    }

    #[test]
    fn test_missing_slots_use_black() {
        let scene = HostScene::new("S");
        let object = HostObject::new("Obj", ObjectType::Mesh, Some("Cube")).with_material(None);
        let settings = ExportSettings::default();
        let mut ctx = ExportContext::new(&scene, &settings, None);
        let mut names = NamePool::new();

        export_entity(&mut ctx, &mut names, &object, &IDENTITY, &shape(0));
        export_entity(&mut ctx, &mut names, &object, &IDENTITY, &shape(3));
        assert!(ctx.output.entities.iter().all(|e| e.bsdf == BLACK_BSDF));
        assert_eq!(ctx.output.entities[1].name, "Obj-Cube.001");
        assert_eq!(ctx.diagnostics().warning_count(), 2);
        assert!(ctx.collected_materials().is_empty());
    }

    #[test]
    fn test_materials_disabled() {
        let scene = glowing_scene();
        let object = HostObject::new("Panel", ObjectType::Mesh, Some("Cube")).with_material(Some("Glow"));
        let settings = ExportSettings::default().with_materials(false);
        let mut ctx = ExportContext::new(&scene, &settings, None);

        export_entity(&mut ctx, &mut NamePool::new(), &object, &IDENTITY, &shape(0));
        assert_eq!(ctx.output.entities[0].bsdf, DEFAULT_BSDF);
        assert!(ctx.output.lights.is_empty());
    }

    #[test]
    fn test_visibility_flags() {
        let mut scene = HostScene::new("S");
        let mut material = HostMaterial::new("NoShadow", None);
        material.cast_shadows = false;
        scene.add_material(material);
        let mut object = HostObject::new("Obj", ObjectType::Mesh, Some("Cube")).with_material(Some("NoShadow"));
        object.visibility = Visibility {
            camera: false,
            shadow: true,
            diffuse: false,
            glossy: false,
            transmission: false,
        };
        let settings = ExportSettings::default();
        let mut ctx = ExportContext::new(&scene, &settings, None);

        export_entity(&mut ctx, &mut NamePool::new(), &object, &IDENTITY, &shape(0));
        let entity = &ctx.output.entities[0];
        assert_eq!(entity.shadow_visible, Some(false));
        assert_eq!(entity.camera_visible, Some(false));
        assert_eq!(entity.bounce_visible, Some(false));
    }
}
