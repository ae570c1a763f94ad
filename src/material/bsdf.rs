//! Bsdf translation.

use super::{black_bsdf, with_source};
use crate::context::ExportContext;
use crate::host::{InputRef, NodeKind};
use crate::lower::{atom, pexpr, NodeRef};
use crate::output::{Bsdf, BsdfKind, PrincipledParams};
use crate::types::{Expr, SocketType};

/// Export the bsdf feeding `socket` under `name`.
///
/// Composite children are pushed to the output as `name__1` and `name__2`;
/// the returned bsdf itself is left to the caller. Returns `None` if the
/// socket is unlinked or no supported bsdf can be built from it.
pub fn export_bsdf(ctx: &mut ExportContext<'_>, socket: InputRef, name: &str) -> Option<Bsdf> {
    with_source(ctx, socket, &mut |ctx, n, output| bsdf_of(ctx, n, output, name))
}

fn bsdf_of(ctx: &mut ExportContext<'_>, n: &NodeRef<'_>, output: usize, name: &str) -> Option<Bsdf> {
    let kind = match &n.node.kind {
        NodeKind::BsdfDiffuse => diffuse(ctx, n)?,
        NodeKind::BsdfGlass => dielectric(ctx, n, Transmission::Glass)?,
        NodeKind::BsdfRefraction => dielectric(ctx, n, Transmission::Refraction)?,
        NodeKind::BsdfTransparent => dielectric(ctx, n, Transmission::Transparent)?,
        NodeKind::BsdfGlossy => {
            let color = n.input(ctx, "Color").ok()?;
            let roughness = n.input(ctx, "Roughness").ok()?;
            BsdfKind::Conductor {
                specular_reflectance: color,
                roughness: rough(roughness),
            }
        }
        NodeKind::BsdfTranslucent => {
            let color = n.input(ctx, "Color").ok()?;
            BsdfKind::Principled(Box::new(PrincipledParams {
                base_color: Some(color),
                roughness: Some(Expr::number(1.0)),
                diffuse_transmission: Some(Expr::number(1.0)),
                ..Default::default()
            }))
        }
        NodeKind::BsdfPrincipled => principled(ctx, n)?,
        // Emission is exported separately as a light
        NodeKind::Emission | NodeKind::Background => return Some(black_bsdf(name)),
        NodeKind::MixShader => return mix(ctx, n, name),
        NodeKind::AddShader => return add(ctx, n, name),
        kind if n.node.outputs[output].ty == SocketType::Shader => {
            ctx.report_warning(format!(
                "Bsdf '{}' of type {} is not supported",
                n.name(),
                kind.type_name()
            ));
            return None;
        }
        // A value wired into the surface only emits
        _ => return Some(black_bsdf(name)),
    };
    Some(Bsdf::new(name, kind))
}

/// `Some(roughness)` unless it is the constant zero.
fn rough(roughness: Expr) -> Option<Expr> {
    if roughness.try_extract(1.0) > 0.0 {
        Some(roughness)
    } else {
        None
    }
}

fn diffuse(ctx: &mut ExportContext<'_>, n: &NodeRef<'_>) -> Option<BsdfKind> {
    let reflectance = n.input(ctx, "Color").ok()?;
    let roughness = n.input_or(ctx, "Roughness", Expr::number(0.0));
    Some(match rough(roughness) {
        Some(roughness) => BsdfKind::RoughDiffuse {
            reflectance,
            roughness,
        },
        None => BsdfKind::Diffuse { reflectance },
    })
}

#[derive(Clone, Copy)]
enum Transmission {
    Glass,
    Refraction,
    Transparent,
}

fn dielectric(ctx: &mut ExportContext<'_>, n: &NodeRef<'_>, mode: Transmission) -> Option<BsdfKind> {
    let color = n.input(ctx, "Color").ok()?;
    let (reflectance, roughness, ior) = match mode {
        Transmission::Transparent => (color.clone(), None, Expr::number(1.0)),
        Transmission::Glass | Transmission::Refraction => {
            let roughness = rough(n.input_or(ctx, "Roughness", Expr::number(0.0)));
            let ior = n.input_or(ctx, "IOR", Expr::number(1.45));
            let reflectance = match mode {
                Transmission::Refraction => Expr::black(),
                _ => color.clone(),
            };
            (reflectance, roughness, ior)
        }
    };
    Some(BsdfKind::Dielectric {
        specular_reflectance: reflectance,
        specular_transmittance: color,
        roughness,
        int_ior: ior,
        ext_ior: Expr::number(1.0),
    })
}

/// Index of refraction matching a Blender specular level.
pub fn specular_to_ior(specular: &Expr) -> Expr {
    match specular.as_number() {
        Some(s) => Expr::number(2.0 / (1.0 - (0.08 * s).sqrt()) - 1.0),
        None => pexpr!("(2 / (1 - sqrt(0.08 * {})) - 1)", atom(specular)),
    }
}

fn principled(ctx: &mut ExportContext<'_>, n: &NodeRef<'_>) -> Option<BsdfKind> {
    // Blender 4 renamed several sockets; the old name is tried first
    let mut get = |keys: &[&str]| n.input_any(ctx, keys).ok();

    let base_color = get(&["Base Color"]);
    let metallic = get(&["Metallic"]);
    let roughness = get(&["Roughness"]);
    let anisotropic = get(&["Anisotropic"]);
    let sheen = get(&["Sheen", "Sheen Weight"]);
    let sheen_tint = get(&["Sheen Tint"]);
    let clearcoat = get(&["Clearcoat", "Coat Weight"]);
    let clearcoat_roughness = get(&["Clearcoat Roughness", "Coat Roughness"]);
    let flatness = get(&["Subsurface", "Subsurface Weight"]);
    let specular_transmission = get(&["Transmission", "Transmission Weight"]);
    let specular_tint = get(&["Specular Tint"]);
    let specular = get(&["Specular", "Specular IOR Level"]);
    let ior = get(&["IOR"]);

    let has_transmission = specular_transmission
        .as_ref()
        .map_or(false, |t| t.try_extract(1.0) > 0.0);
    let ior = match (has_transmission, specular) {
        (false, Some(specular)) => Some(specular_to_ior(&specular)),
        _ => ior,
    };

    Some(BsdfKind::Principled(Box::new(PrincipledParams {
        base_color,
        metallic,
        roughness,
        anisotropic,
        sheen,
        sheen_tint,
        clearcoat,
        clearcoat_roughness,
        flatness,
        specular_transmission,
        specular_tint,
        diffuse_transmission: None,
        ior,
    })))
}

/// Export both shader inputs of a composite node as `name__1` / `name__2`.
fn children(
    ctx: &mut ExportContext<'_>,
    n: &NodeRef<'_>,
    first: usize,
    name: &str,
) -> (Option<Bsdf>, Option<Bsdf>) {
    let a = export_bsdf(ctx, n.socket(first), &format!("{}__1", name));
    let b = export_bsdf(ctx, n.socket(first + 1), &format!("{}__2", name));
    (a, b)
}

/// One child is missing: keep the other one under the composite's name.
fn single_branch(ctx: &mut ExportContext<'_>, n: &NodeRef<'_>, name: &str, branch: Option<Bsdf>) -> Option<Bsdf> {
    let bsdf = branch?;
    ctx.report_warning(format!(
        "Shader '{}' of '{}' has only one valid bsdf input",
        n.name(),
        name
    ));
    Some(bsdf.renamed(name))
}

fn mix(ctx: &mut ExportContext<'_>, n: &NodeRef<'_>, name: &str) -> Option<Bsdf> {
    let factor = n.input_at(ctx, 0).ok()?;
    match factor.as_number() {
        Some(f) if f <= 0.0 => return export_bsdf(ctx, n.socket(1), name),
        Some(f) if f >= 1.0 => return export_bsdf(ctx, n.socket(2), name),
        _ => {}
    }

    match children(ctx, n, 1, name) {
        (Some(a), Some(b)) => {
            let kind = BsdfKind::Blend {
                first: a.name.clone(),
                second: b.name.clone(),
                weight: factor,
            };
            ctx.output.bsdfs.push(a);
            ctx.output.bsdfs.push(b);
            Some(Bsdf::new(name, kind))
        }
        (a, b) => single_branch(ctx, n, name, a.or(b)),
    }
}

fn add(ctx: &mut ExportContext<'_>, n: &NodeRef<'_>, name: &str) -> Option<Bsdf> {
    match children(ctx, n, 0, name) {
        (Some(a), Some(b)) => {
            let kind = BsdfKind::Add {
                first: a.name.clone(),
                second: b.name.clone(),
            };
            ctx.output.bsdfs.push(a);
            ctx.output.bsdfs.push(b);
            Some(Bsdf::new(name, kind))
        }
        (a, b) => single_branch(ctx, n, name, a.or(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::*;
    use crate::host::{HostScene, Node, NodeId, NodeTree, Socket, TreeId};
    use crate::settings::ExportSettings;
    use crate::types::SocketValue;

    fn surface(tree: TreeId, out: NodeId) -> InputRef {
        InputRef::new(tree, out, 0)
    }

    fn principled_node(metallic: f64, specular: f64, transmission: f64) -> Node {
        let scalar = |name: &str, v: f64| {
            Socket::new(name, SocketType::Value).with_default(SocketValue::Scalar(v))
        };
        Node::new("Principled BSDF", NodeKind::BsdfPrincipled)
            .with_input(
                Socket::new("Base Color", SocketType::Rgba)
                    .with_default(SocketValue::Color([0.8, 0.8, 0.8, 1.0])),
            )
            .with_input(scalar("Metallic", metallic))
            .with_input(scalar("Roughness", 0.5))
            .with_input(scalar("IOR", 1.45))
            .with_input(scalar("Specular", specular))
            .with_input(scalar("Transmission", transmission))
            .with_input(
                Socket::new("Emission", SocketType::Rgba)
                    .with_default(SocketValue::Color([0.0, 0.0, 0.0, 1.0])),
            )
            .with_input(scalar("Emission Strength", 1.0))
            .with_output(Socket::new("BSDF", SocketType::Shader))
    }

    #[test]
    fn test_principled_scenario() {
        let mut tree = NodeTree::new("Mat");
        let bsdf = tree.add_node(principled_node(0.7, 0.5, 0.0));
        let out = tree.add_node(output_node());
        tree.link(bsdf, "BSDF", out, "Surface").unwrap();
        let mut scene = HostScene::new("S");
        let t = scene.add_tree(tree);
        let settings = ExportSettings::default();
        let mut ctx = ExportContext::new(&scene, &settings, None);

        let exported = export_bsdf(&mut ctx, surface(t, out), "Plastic").unwrap();
        let BsdfKind::Principled(params) = exported.kind else {
            panic!("expected a principled bsdf");
        };
        assert_eq!(params.metallic, Some(Expr::number(0.7)));
        let ior = params.ior.unwrap().as_number().unwrap();
        assert!((ior - 1.5).abs() < 1e-12, "ior = {}", ior);
        assert!(crate::material::get_emission(&mut ctx, surface(t, out)).is_none());
    }

    #[test]
    fn test_principled_transmission_keeps_ior() {
        let mut tree = NodeTree::new("Mat");
        let bsdf = tree.add_node(principled_node(0.0, 0.5, 1.0));
        let out = tree.add_node(output_node());
        tree.link(bsdf, "BSDF", out, "Surface").unwrap();
        let mut scene = HostScene::new("S");
        let t = scene.add_tree(tree);
        let settings = ExportSettings::default();
        let mut ctx = ExportContext::new(&scene, &settings, None);

        let exported = export_bsdf(&mut ctx, surface(t, out), "Glass").unwrap();
        let BsdfKind::Principled(params) = exported.kind else {
            panic!("expected a principled bsdf");
        };
        assert_eq!(params.ior, Some(Expr::number(1.45)));
    }

    #[test]
    fn test_specular_to_ior_text_matches_fold() {
        assert_eq!(
            specular_to_ior(&Expr::new("spec")).as_str(),
            "(2 / (1 - sqrt(0.08 * spec)) - 1)"
        );
        let s: f64 = 0.25;
        let expected = 2.0 / (1.0 - (0.08 * s).sqrt()) - 1.0;
        assert_eq!(specular_to_ior(&Expr::number(s)).as_number(), Some(expected));
    }

    #[test]
    fn test_add_with_one_invalid_branch() {
        let mut tree = NodeTree::new("Mat");
        let diffuse = tree.add_node(diffuse_node("Diffuse", [0.1, 0.2, 0.3, 1.0]));
        let broken = tree.add_node(
            Node::new("Holdout", NodeKind::Unsupported("ShaderNodeHoldout".to_string()))
                .with_output(Socket::new("Holdout", SocketType::Shader)),
        );
        let add = tree.add_node(add_shader_node("Add"));
        let out = tree.add_node(output_node());
        tree.link(broken, "Holdout", add, "Shader").unwrap();
        tree.link(diffuse, "BSDF", add, "Shader_001").unwrap();
        tree.link(add, "Shader", out, "Surface").unwrap();
        let mut scene = HostScene::new("S");
        let t = scene.add_tree(tree);
        let settings = ExportSettings::default();
        let mut ctx = ExportContext::new(&scene, &settings, None);

        let exported = export_bsdf(&mut ctx, surface(t, out), "Paint").unwrap();
        assert_eq!(exported.name, "Paint");
        assert_eq!(
            exported.kind,
            BsdfKind::Diffuse {
                reflectance: Expr::color([0.1, 0.2, 0.3, 1.0])
            }
        );
        assert!(ctx.output.bsdfs.is_empty());
        assert!(ctx.diagnostics().contains("ShaderNodeHoldout is not supported"));
        assert!(ctx.diagnostics().contains("only one valid bsdf input"));
    }

    #[test]
    fn test_mix_exports_children() {
        let mut tree = NodeTree::new("Mat");
        let a = tree.add_node(diffuse_node("A", [1.0, 0.0, 0.0, 1.0]));
        let b = tree.add_node(diffuse_node("B", [0.0, 0.0, 1.0, 1.0]));
        let mix = tree.add_node(mix_shader_node("Mix", 0.25));
        let out = tree.add_node(output_node());
        tree.link(a, "BSDF", mix, "Shader").unwrap();
        tree.link(b, "BSDF", mix, "Shader_001").unwrap();
        tree.link(mix, "Shader", out, "Surface").unwrap();
        let mut scene = HostScene::new("S");
        let t = scene.add_tree(tree);
        let settings = ExportSettings::default();
        let mut ctx = ExportContext::new(&scene, &settings, None);

        let exported = export_bsdf(&mut ctx, surface(t, out), "Mixed").unwrap();
        assert_eq!(
            exported.kind,
            BsdfKind::Blend {
                first: "Mixed__1".to_string(),
                second: "Mixed__2".to_string(),
                weight: Expr::number(0.25),
            }
        );
        let names: Vec<_> = ctx.output.bsdfs.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["Mixed__1", "Mixed__2"]);
    }

    #[test]
    fn test_constant_mix_exports_one_branch() {
        let mut tree = NodeTree::new("Mat");
        let a = tree.add_node(diffuse_node("A", [1.0, 0.0, 0.0, 1.0]));
        let b = tree.add_node(emission_node("B", [1.0, 1.0, 1.0, 1.0], 5.0));
        let mix = tree.add_node(mix_shader_node("Mix", 1.0));
        let out = tree.add_node(output_node());
        tree.link(a, "BSDF", mix, "Shader").unwrap();
        tree.link(b, "Emission", mix, "Shader_001").unwrap();
        tree.link(mix, "Shader", out, "Surface").unwrap();
        let mut scene = HostScene::new("S");
        let t = scene.add_tree(tree);
        let settings = ExportSettings::default();
        let mut ctx = ExportContext::new(&scene, &settings, None);

        let exported = export_bsdf(&mut ctx, surface(t, out), "Lamp").unwrap();
        assert_eq!(exported, black_bsdf("Lamp"));
        assert!(ctx.output.bsdfs.is_empty());
    }
}
