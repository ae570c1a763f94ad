//! Material translation.
//!
//! This module turns the surface output of a material or world node tree
//! into bsdf entries and emission expressions.

pub mod bsdf;
pub mod emission;

pub use bsdf::export_bsdf;
pub use emission::get_emission;

use crate::context::ExportContext;
use crate::host::{InputRef, NodeKind, OutputTarget, TreeId};
use crate::lower::{enter_group, group_input_target, NodeRef};
use crate::output::Bsdf;
use crate::types::Expr;

/// Black diffuse used for empty material slots and lights.
pub const BLACK_BSDF: &str = "__bsdf_black";
/// Stand-in for materials whose bsdf cannot be exported.
pub const ERROR_BSDF: &str = "__bsdf_error";
/// Shared bsdf when material export is disabled.
pub const DEFAULT_BSDF: &str = "__bsdf_default";

/// Obviously wrong pink diffuse.
pub fn error_bsdf(name: impl Into<String>) -> Bsdf {
    Bsdf::diffuse(name, Expr::color([1.0, 0.75, 0.8, 1.0]))
}

pub fn black_bsdf(name: impl Into<String>) -> Bsdf {
    Bsdf::diffuse(name, Expr::number(0.0))
}

pub fn default_bsdf(name: impl Into<String>) -> Bsdf {
    Bsdf::diffuse(name, Expr::color([0.8, 0.8, 0.8, 1.0]))
}

/// The `Surface` input of the active output node of `tree`.
///
/// Eevee-only outputs are ignored; among the rest the active one wins, then
/// the first one found.
pub fn surface_socket(ctx: &ExportContext<'_>, tree: TreeId) -> Option<InputRef> {
    let nodes = ctx.scene.tree(tree);
    let mut candidates = nodes.nodes().filter_map(|(id, node)| match &node.kind {
        NodeKind::OutputMaterial(out) | NodeKind::OutputWorld(out)
            if out.target != OutputTarget::Eevee =>
        {
            Some((id, node, out.is_active_output))
        }
        _ => None,
    });
    let first = candidates.next()?;
    let (id, node, _) = if first.2 {
        first
    } else {
        candidates.find(|c| c.2).unwrap_or(first)
    };
    node.input_index("Surface")
        .map(|index| InputRef::new(tree, id, index))
}

/// Call `visit` with the node and output index feeding `socket`.
///
/// Groups, group inputs and reroutes are looked through; `visit` runs in the
/// group frame the node belongs to. Returns `None` for unlinked sockets.
pub(crate) fn with_source<'a, R>(
    ctx: &mut ExportContext<'a>,
    socket: InputRef,
    visit: &mut dyn FnMut(&mut ExportContext<'a>, &NodeRef<'a>, usize) -> Option<R>,
) -> Option<R> {
    let scene = ctx.scene;
    let tree = scene.tree(socket.tree);
    let (src, output) = tree.incoming(socket.node, socket.socket)?;
    let n = NodeRef {
        tree: socket.tree,
        id: src,
        node: tree.node(src),
    };
    let out = &n.node.outputs[output];

    match &n.node.kind {
        NodeKind::Group(props) => {
            match enter_group(ctx, &n, props.node_tree.as_deref(), &out.identifier, &out.name) {
                Ok(target) => {
                    let frame = ctx.child_frame(n.tree, n.id);
                    ctx.in_frame(frame, |ctx| with_source(ctx, target, visit))
                }
                Err(err) => {
                    ctx.report_warning(err.to_string());
                    None
                }
            }
        }
        NodeKind::GroupInput => match group_input_target(ctx, &n, &out.identifier, &out.name) {
            Ok((parent, target)) => ctx.in_frame(parent, |ctx| with_source(ctx, target, visit)),
            Err(err) => {
                ctx.report_warning(err.to_string());
                None
            }
        },
        NodeKind::Reroute => with_source(ctx, n.socket(0), visit),
        _ => visit(ctx, &n, output),
    }
}

/// Export the bsdf of a host material under the material's name.
///
/// Falls back to the error bsdf (with a warning) when the material has no
/// node tree or its surface cannot be translated.
pub fn export_material(ctx: &mut ExportContext<'_>, name: &str) {
    let scene = ctx.scene;
    let tree = scene
        .material(name)
        .and_then(|m| m.node_tree.as_deref())
        .and_then(|t| scene.tree_id(t));

    let bsdf = tree
        .and_then(|t| surface_socket(ctx, t))
        .and_then(|socket| export_bsdf(ctx, socket, name));

    let bsdf = match bsdf {
        Some(bsdf) => bsdf,
        None => {
            ctx.report_warning(format!("Material '{}' has no valid bsdf", name));
            error_bsdf(name)
        }
    };
    ctx.output.bsdfs.push(bsdf);
}

/// Emission of a host material, if it has any.
pub fn material_emission(ctx: &mut ExportContext<'_>, name: &str) -> Option<Expr> {
    let scene = ctx.scene;
    let tree = scene.tree_id(scene.material(name)?.node_tree.as_deref()?)?;
    let socket = surface_socket(ctx, tree)?;
    get_emission(ctx, socket)
}

#[cfg(test)]
pub(crate) mod test_util {
    //! Shader node builders shared by the material tests.

    use crate::host::{Node, NodeKind, OutputNode, Socket};
    use crate::types::{SocketType, SocketValue};

    pub fn output_node() -> Node {
        Node::new("Material Output", NodeKind::OutputMaterial(OutputNode::default()))
            .with_input(Socket::new("Surface", SocketType::Shader))
            .with_input(Socket::new("Volume", SocketType::Shader))
    }

    pub fn diffuse_node(name: &str, color: [f64; 4]) -> Node {
        Node::new(name, NodeKind::BsdfDiffuse)
            .with_input(Socket::new("Color", SocketType::Rgba).with_default(SocketValue::Color(color)))
            .with_input(Socket::new("Roughness", SocketType::Value).with_default(SocketValue::Scalar(0.0)))
            .with_input(Socket::new("Normal", SocketType::Vector))
            .with_output(Socket::new("BSDF", SocketType::Shader))
    }

    pub fn emission_node(name: &str, color: [f64; 4], strength: f64) -> Node {
        Node::new(name, NodeKind::Emission)
            .with_input(Socket::new("Color", SocketType::Rgba).with_default(SocketValue::Color(color)))
            .with_input(
                Socket::new("Strength", SocketType::Value).with_default(SocketValue::Scalar(strength)),
            )
            .with_output(Socket::new("Emission", SocketType::Shader))
    }

    pub fn mix_shader_node(name: &str, fac: f64) -> Node {
        Node::new(name, NodeKind::MixShader)
            .with_input(Socket::new("Fac", SocketType::Value).with_default(SocketValue::Scalar(fac)))
            .with_input(Socket::new("Shader", SocketType::Shader))
            .with_input(Socket::new("Shader", SocketType::Shader).with_identifier("Shader_001"))
            .with_output(Socket::new("Shader", SocketType::Shader))
    }

    pub fn add_shader_node(name: &str) -> Node {
        Node::new(name, NodeKind::AddShader)
            .with_input(Socket::new("Shader", SocketType::Shader))
            .with_input(Socket::new("Shader", SocketType::Shader).with_identifier("Shader_001"))
            .with_output(Socket::new("Shader", SocketType::Shader))
    }
}

#[cfg(test)]
mod tests {
    use super::test_util::*;
    use super::*;
    use crate::host::{HostMaterial, HostScene, NodeTree, OutputNode};
    use crate::output::BsdfKind;
    use crate::settings::ExportSettings;

    #[test]
    fn test_surface_socket_prefers_active_output() {
        let mut inactive = output_node();
        inactive.kind = NodeKind::OutputMaterial(OutputNode {
            target: OutputTarget::All,
            is_active_output: false,
        });
        let mut eevee = output_node();
        eevee.kind = NodeKind::OutputMaterial(OutputNode {
            target: OutputTarget::Eevee,
            is_active_output: true,
        });
        let mut tree = NodeTree::new("Mat");
        tree.add_node(eevee);
        tree.add_node(inactive);
        let active = tree.add_node(output_node());
        let mut scene = HostScene::new("S");
        let id = scene.add_tree(tree);
        let settings = ExportSettings::default();
        let ctx = ExportContext::new(&scene, &settings, None);

        let socket = surface_socket(&ctx, id).unwrap();
        assert_eq!(socket.node, active);
        assert_eq!(socket.socket, 0);
    }

    #[test]
    fn test_missing_tree_exports_error_bsdf() {
        let mut scene = HostScene::new("S");
        scene.add_material(HostMaterial::new("Broken", Some("Nowhere")));
        let settings = ExportSettings::default();
        let mut ctx = ExportContext::new(&scene, &settings, None);

        export_material(&mut ctx, "Broken");
        assert_eq!(ctx.output.bsdfs, vec![error_bsdf("Broken")]);
        assert!(ctx.diagnostics().contains("no valid bsdf"));
    }

    #[test]
    fn test_material_through_reroute() {
        let mut tree = NodeTree::new("Mat");
        let diffuse = tree.add_node(diffuse_node("Diffuse", [0.2, 0.4, 0.6, 1.0]));
        let reroute = tree.add_node(
            crate::host::Node::new("Reroute", NodeKind::Reroute)
                .with_input(crate::host::Socket::new("Input", crate::types::SocketType::Shader))
                .with_output(crate::host::Socket::new("Output", crate::types::SocketType::Shader)),
        );
        let out = tree.add_node(output_node());
        tree.link(diffuse, "BSDF", reroute, "Input").unwrap();
        tree.link(reroute, "Output", out, "Surface").unwrap();
        let mut scene = HostScene::new("S");
        scene.add_tree(tree);
        scene.add_material(HostMaterial::new("Paint", Some("Mat")));
        let settings = ExportSettings::default();
        let mut ctx = ExportContext::new(&scene, &settings, None);

        export_material(&mut ctx, "Paint");
        assert_eq!(ctx.output.bsdfs.len(), 1);
        assert_eq!(
            ctx.output.bsdfs[0].kind,
            BsdfKind::Diffuse {
                reflectance: Expr::color([0.2, 0.4, 0.6, 1.0])
            }
        );
        assert!(material_emission(&mut ctx, "Paint").is_none());
        assert!(ctx.diagnostics().is_empty());
    }
}
