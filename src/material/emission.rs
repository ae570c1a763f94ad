//! Emission extraction.
//!
//! Walks the same shader graph as the bsdf export but only collects emissive
//! terms. `None` means "no light at all", which is different from a black
//! emission: only materials with some emission become area lights.

use super::with_source;
use crate::context::ExportContext;
use crate::host::{InputRef, NodeKind};
use crate::lower::{atom, export_output, lerp, pexpr, NodeRef};
use crate::types::{Expr, SocketType};

/// Emission flowing into `socket`, or `None` if nothing emits.
pub fn get_emission(ctx: &mut ExportContext<'_>, socket: InputRef) -> Option<Expr> {
    with_source(ctx, socket, &mut |ctx, n, output| emission_of(ctx, n, output))
}

fn emission_of(ctx: &mut ExportContext<'_>, n: &NodeRef<'_>, output: usize) -> Option<Expr> {
    match &n.node.kind {
        NodeKind::Emission | NodeKind::Background => scaled(ctx, n, &["Color"], "Strength"),
        NodeKind::BsdfPrincipled => {
            scaled(ctx, n, &["Emission Color", "Emission"], "Emission Strength")
        }
        NodeKind::MixShader => {
            let first = get_emission(ctx, n.socket(1));
            let second = get_emission(ctx, n.socket(2));
            if first.is_none() && second.is_none() {
                return None;
            }
            let factor = n.input_at(ctx, 0).ok()?;
            Some(lerp(
                &first.unwrap_or_else(Expr::black),
                &second.unwrap_or_else(Expr::black),
                &factor,
            ))
        }
        NodeKind::AddShader => {
            let first = get_emission(ctx, n.socket(0));
            let second = get_emission(ctx, n.socket(1));
            match (first, second) {
                (Some(a), Some(b)) => Some(pexpr!("({} + {})", atom(&a), atom(&b))),
                (a, b) => a.or(b),
            }
        }
        kind if kind.is_shader() => None,
        _ => {
            // A plain value wired straight into a shader socket glows
            if n.node.outputs[output].ty == SocketType::Shader {
                return None;
            }
            match export_output(ctx, n, output, SocketType::Rgba) {
                Ok(expr) => Some(expr),
                Err(err) => {
                    ctx.report_warning(err.to_string());
                    None
                }
            }
        }
    }
}

/// `color * strength` of an emitting node, `None` when either is an unlinked
/// zero.
fn scaled(ctx: &mut ExportContext<'_>, n: &NodeRef<'_>, color_keys: &[&str], strength_key: &str) -> Option<Expr> {
    let color_index = n.node.input_index_any(color_keys)?;
    if unlinked_black(ctx, n, color_index) {
        return None;
    }
    let strength_index = n.node.input_index(strength_key);
    if let Some(index) = strength_index {
        if unlinked_black(ctx, n, index) {
            return None;
        }
    }

    let color = n.input_at(ctx, color_index).ok()?;
    let strength = match strength_index {
        Some(index) => n.input_at(ctx, index).ok()?,
        None => return Some(color),
    };
    match (color.as_color(), strength.as_number()) {
        (_, Some(s)) if s == 1.0 => Some(color),
        (Some(c), Some(s)) => Some(Expr::color([c[0] * s, c[1] * s, c[2] * s, c[3]])),
        _ => Some(pexpr!("({} * {})", atom(&color), atom(&strength))),
    }
}

fn unlinked_black(ctx: &ExportContext<'_>, n: &NodeRef<'_>, index: usize) -> bool {
    if ctx.scene.tree(n.tree).is_linked(n.id, index) {
        return false;
    }
    n.node.inputs[index].default.map_or(true, |v| v.is_black())
}

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::*;
    use crate::host::{GroupNode, HostScene, Node, NodeTree, Socket, TreeId};
    use crate::lower::test_util::{rgb_node, texcoord_node};
    use crate::settings::ExportSettings;
    use crate::types::SocketValue;

    fn surface(tree: TreeId, out: crate::host::NodeId) -> InputRef {
        InputRef::new(tree, out, 0)
    }

    #[test]
    fn test_pure_emission() {
        let mut tree = NodeTree::new("Mat");
        let bright = tree.add_node(emission_node("Bright", [1.0, 0.5, 0.25, 1.0], 4.0));
        let dark = tree.add_node(emission_node("Dark", [1.0, 1.0, 1.0, 1.0], 0.0));
        let out = tree.add_node(output_node());
        let out2 = tree.add_node(output_node());
        tree.link(bright, "Emission", out, "Surface").unwrap();
        tree.link(dark, "Emission", out2, "Surface").unwrap();
        let mut scene = HostScene::new("S");
        let t = scene.add_tree(tree);
        let settings = ExportSettings::default();
        let mut ctx = ExportContext::new(&scene, &settings, None);

        assert_eq!(
            get_emission(&mut ctx, surface(t, out)),
            Some(Expr::color([4.0, 2.0, 1.0, 1.0]))
        );
        assert_eq!(get_emission(&mut ctx, surface(t, out2)), None);
    }

    #[test]
    fn test_mix_and_add_emission() {
        let mut tree = NodeTree::new("Mat");
        let coords = tree.add_node(texcoord_node("Coords"));
        let glow = tree.add_node(emission_node("Glow", [1.0, 1.0, 1.0, 1.0], 1.0));
        let lamp = tree.add_node(emission_node("Lamp", [0.0, 0.0, 1.0, 1.0], 2.0));
        let diffuse = tree.add_node(diffuse_node("Diffuse", [0.5, 0.5, 0.5, 1.0]));
        let mix = tree.add_node(mix_shader_node("Mix", 0.5));
        let add = tree.add_node(add_shader_node("Add"));
        let out = tree.add_node(output_node());
        tree.link(coords, "Generated", glow, "Color").unwrap();
        tree.link(diffuse, "BSDF", mix, "Shader").unwrap();
        tree.link(glow, "Emission", mix, "Shader_001").unwrap();
        tree.link(mix, "Shader", add, "Shader").unwrap();
        tree.link(lamp, "Emission", add, "Shader_001").unwrap();
        tree.link(add, "Shader", out, "Surface").unwrap();
        let mut scene = HostScene::new("S");
        let t = scene.add_tree(tree);
        let settings = ExportSettings::default();
        let mut ctx = ExportContext::new(&scene, &settings, None);

        let emission = get_emission(&mut ctx, surface(t, out)).unwrap();
        assert_eq!(
            emission.as_str(),
            "(mix(color(0), max(color(uvw.x, uvw.y, uvw.z, 1), color(0)), 0.5) + color(0, 0, 2, 1))"
        );
    }

    #[test]
    fn test_constant_mix_factor_selects_branch() {
        let mut tree = NodeTree::new("Mat");
        let glow = tree.add_node(emission_node("Glow", [1.0, 1.0, 1.0, 1.0], 3.0));
        let diffuse = tree.add_node(diffuse_node("Diffuse", [0.5, 0.5, 0.5, 1.0]));
        let mix = tree.add_node(mix_shader_node("Mix", 0.0));
        let out = tree.add_node(output_node());
        tree.link(glow, "Emission", mix, "Shader").unwrap();
        tree.link(diffuse, "BSDF", mix, "Shader_001").unwrap();
        tree.link(mix, "Shader", out, "Surface").unwrap();
        let mut scene = HostScene::new("S");
        let t = scene.add_tree(tree);
        let settings = ExportSettings::default();
        let mut ctx = ExportContext::new(&scene, &settings, None);

        assert_eq!(
            get_emission(&mut ctx, surface(t, out)),
            Some(Expr::color([3.0, 3.0, 3.0, 1.0]))
        );
    }

    #[test]
    fn test_color_wired_to_surface() {
        let mut tree = NodeTree::new("Mat");
        let red = tree.add_node(rgb_node("Red", [1.0, 0.0, 0.0, 1.0]));
        let out = tree.add_node(output_node());
        tree.link(red, "Color", out, "Surface").unwrap();
        let mut scene = HostScene::new("S");
        let t = scene.add_tree(tree);
        let settings = ExportSettings::default();
        let mut ctx = ExportContext::new(&scene, &settings, None);

        assert_eq!(
            get_emission(&mut ctx, surface(t, out)),
            Some(Expr::color([1.0, 0.0, 0.0, 1.0]))
        );
    }

    #[test]
    fn test_emission_inside_group() {
        let mut inner = NodeTree::new("Glower");
        let input = inner.add_node(
            Node::new("Group Input", NodeKind::GroupInput)
                .with_output(Socket::new("Tint", SocketType::Rgba)),
        );
        let glow = inner.add_node(emission_node("Glow", [1.0, 1.0, 1.0, 1.0], 2.0));
        let output = inner.add_node(
            Node::new("Group Output", NodeKind::GroupOutput)
                .with_input(Socket::new("Shader", SocketType::Shader)),
        );
        inner.link(input, "Tint", glow, "Color").unwrap();
        inner.link(glow, "Emission", output, "Shader").unwrap();

        let mut tree = NodeTree::new("Mat");
        let group = tree.add_node(
            Node::new(
                "Group",
                NodeKind::Group(GroupNode {
                    node_tree: Some("Glower".to_string()),
                }),
            )
            .with_input(
                Socket::new("Tint", SocketType::Rgba)
                    .with_default(SocketValue::Color([0.5, 0.25, 0.0, 1.0])),
            )
            .with_output(Socket::new("Shader", SocketType::Shader)),
        );
        let out = tree.add_node(output_node());
        tree.link(group, "Shader", out, "Surface").unwrap();
        let mut scene = HostScene::new("S");
        scene.add_tree(inner);
        let t = scene.add_tree(tree);
        let settings = ExportSettings::default();
        let mut ctx = ExportContext::new(&scene, &settings, None);

        assert_eq!(
            get_emission(&mut ctx, surface(t, out)),
            Some(Expr::color([1.0, 0.5, 0.0, 1.0]))
        );
        assert!(ctx.diagnostics().is_empty());
    }
}
