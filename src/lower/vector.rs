//! Input and vector nodes: coordinates, geometry attributes, transforms and
//! normal perturbation.

use super::{atom, fold1, fold2, pexpr, LowerResult, NodeRef};
use crate::context::ExportContext;
use crate::host::{
    BumpNode, MappingNode, MappingType, NormalMapNode, NormalMapSpace, RotationType, TransformSpace,
    VectorRotateNode, VectorTransformNode, VectorTransformType,
};
use crate::types::{fmt_num, Expr};

/// Step used to sample the height of a bump node.
const BUMP_DELTA: f64 = 1e-3;

pub(super) fn tex_coord(ctx: &mut ExportContext<'_>, n: &NodeRef<'_>, output: &str) -> LowerResult {
    Ok(match output {
        "Generated" | "UV" => ctx.texcoord(),
        "Normal" => Expr::new("N"),
        "Object" => Expr::new("Np"),
        "Camera" => Expr::new("transform_point(P, \"global\", \"camera\")"),
        "Reflection" => Expr::new("(2 * dot(V, N) * N - V)"),
        other => return Err(n.unsupported_operation(format!("{} output", other))),
    })
}

pub(super) fn geometry(n: &NodeRef<'_>, output: &str) -> LowerResult {
    Ok(Expr::new(match output {
        "Position" => "P",
        "Normal" => "N",
        "Tangent" => "Nx",
        "True Normal" => "Ng",
        "Incoming" => "V",
        "Parametric" => "uvw",
        "Backfacing" => "select(frontside, 0, 1)",
        other => return Err(n.unsupported_operation(format!("{} output", other))),
    }))
}

pub(super) fn object_info(n: &NodeRef<'_>, output: &str) -> LowerResult {
    Ok(Expr::new(match output {
        "Object Index" => "entity_id",
        "Random" => "hash(entity_id)",
        other => return Err(n.unsupported_operation(format!("{} output", other))),
    }))
}

/// The node's `Normal` input when linked, the shading normal otherwise.
fn shading_normal(ctx: &mut ExportContext<'_>, n: &NodeRef<'_>) -> LowerResult {
    if n.is_linked(ctx, "Normal") {
        n.input(ctx, "Normal")
    } else {
        Ok(Expr::new("N"))
    }
}

fn dielectric(eta: &Expr, normal: &Expr) -> Expr {
    let inv = fold1(eta, |v| 1.0 / v).unwrap_or_else(|| pexpr!("(1 / {})", atom(eta)));
    pexpr!(
        "fresnel_dielectric(select(frontside, {}, {}), dot(V, {}))",
        eta,
        inv,
        normal
    )
}

pub(super) fn fresnel(ctx: &mut ExportContext<'_>, n: &NodeRef<'_>) -> LowerResult {
    let ior = n.input(ctx, "IOR")?;
    let normal = shading_normal(ctx, n)?;
    Ok(dielectric(&ior, &normal))
}

pub(super) fn layer_weight(ctx: &mut ExportContext<'_>, n: &NodeRef<'_>, output: &str) -> LowerResult {
    let blend = n.input(ctx, "Blend")?;
    let normal = shading_normal(ctx, n)?;
    match output {
        "Fresnel" => {
            let eta = fold1(&blend, |b| 1.0 / (1.0 - b).max(1e-5))
                .unwrap_or_else(|| pexpr!("(1 / max(1 - {}, 0.00001))", atom(&blend)));
            Ok(dielectric(&eta, &normal))
        }
        "Facing" => {
            let exponent = fold1(&blend, |b| {
                let b = b.clamp(0.0, 1.0 - 1e-5);
                if b < 0.5 {
                    2.0 * b
                } else {
                    0.5 / (1.0 - b)
                }
            })
            .unwrap_or_else(|| {
                let b = atom(&blend);
                pexpr!("select({b} < 0.5, 2 * {b}, 0.5 / (1 - {b}))", b = b)
            });
            Ok(pexpr!(
                "(1 - pow(abs(dot(V, {})), {}))",
                normal,
                exponent
            ))
        }
        other => Err(n.unsupported_operation(format!("{} output", other))),
    }
}

fn is_vector(e: &Expr, v: f64) -> bool {
    e.as_vector() == Some([v, v, v])
}

pub(super) fn mapping(ctx: &mut ExportContext<'_>, n: &NodeRef<'_>, props: &MappingNode) -> LowerResult {
    let mut v = n.input(ctx, "Vector")?;
    let location = n.input_or(ctx, "Location", Expr::vector([0.0; 3]));
    let rotation = n.input_or(ctx, "Rotation", Expr::vector([0.0; 3]));
    let scale = n.input_or(ctx, "Scale", Expr::vector([1.0; 3]));

    let translate = |v: Expr, sign: &str| {
        if is_vector(&location, 0.0) {
            v
        } else {
            pexpr!("({} {} {})", v, sign, atom(&location))
        }
    };
    let rotate = |v: Expr, func: &str| {
        if is_vector(&rotation, 0.0) {
            v
        } else {
            pexpr!("{}({}, {})", func, v, rotation)
        }
    };
    let resize = |v: Expr, op: &str| {
        if is_vector(&scale, 1.0) {
            v
        } else {
            pexpr!("({} {} {})", atom(&v), op, atom(&scale))
        }
    };

    match props.vector_type {
        MappingType::Point => {
            v = translate(rotate(resize(v, "*"), "rotate_euler"), "+");
        }
        MappingType::Texture => {
            v = resize(rotate(translate(v, "-"), "rotate_euler_inverse"), "/");
        }
        MappingType::Vector => {
            v = rotate(resize(v, "*"), "rotate_euler");
        }
        MappingType::Normal => {
            v = pexpr!("norm({})", rotate(resize(v, "/"), "rotate_euler"));
        }
    }
    Ok(v)
}

pub(super) fn vector_rotate(
    ctx: &mut ExportContext<'_>,
    n: &NodeRef<'_>,
    props: &VectorRotateNode,
) -> LowerResult {
    let v = n.input(ctx, "Vector")?;
    let center = n.input_or(ctx, "Center", Expr::vector([0.0; 3]));
    let centered = if is_vector(&center, 0.0) {
        v
    } else {
        pexpr!("({} - {})", atom(&v), atom(&center))
    };

    let rotated = match props.rotation_type {
        RotationType::EulerXyz => {
            let rotation = n.input(ctx, "Rotation")?;
            let func = if props.invert {
                "rotate_euler_inverse"
            } else {
                "rotate_euler"
            };
            pexpr!("{}({}, {})", func, centered, rotation)
        }
        axis_type => {
            let axis = match axis_type {
                RotationType::XAxis => Expr::vector([1.0, 0.0, 0.0]),
                RotationType::YAxis => Expr::vector([0.0, 1.0, 0.0]),
                RotationType::ZAxis => Expr::vector([0.0, 0.0, 1.0]),
                _ => n.input(ctx, "Axis")?,
            };
            let angle = n.input(ctx, "Angle")?;
            let angle = if props.invert {
                fold1(&angle, |a| -a).unwrap_or_else(|| pexpr!("-{}", atom(&angle)))
            } else {
                angle
            };
            pexpr!("rotate_axis({}, {}, {})", centered, angle, axis)
        }
    };

    Ok(if is_vector(&center, 0.0) {
        rotated
    } else {
        pexpr!("({} + {})", rotated, atom(&center))
    })
}

fn space_name(space: TransformSpace) -> &'static str {
    match space {
        TransformSpace::World => "global",
        TransformSpace::Object => "object",
        TransformSpace::Camera => "camera",
    }
}

pub(super) fn vector_transform(
    ctx: &mut ExportContext<'_>,
    n: &NodeRef<'_>,
    props: &VectorTransformNode,
) -> LowerResult {
    let v = n.input(ctx, "Vector")?;
    if props.convert_from == props.convert_to {
        return Ok(v);
    }
    let func = match props.vector_type {
        VectorTransformType::Point => "transform_point",
        VectorTransformType::Vector => "transform_direction",
        VectorTransformType::Normal => "transform_normal",
    };
    Ok(pexpr!(
        "{}({}, \"{}\", \"{}\")",
        func,
        v,
        space_name(props.convert_from),
        space_name(props.convert_to)
    ))
}

/// `sum(weight * basis)` over the terms, with constant weights folded.
fn linear_combination(terms: &[(Expr, &str)]) -> Expr {
    let parts: Vec<String> = terms
        .iter()
        .filter_map(|(weight, basis)| match weight.as_number() {
            Some(w) if w == 0.0 => None,
            Some(w) if w == 1.0 => Some(basis.to_string()),
            _ => Some(format!("{} * {}", atom(weight), basis)),
        })
        .collect();
    if parts.is_empty() {
        Expr::vector([0.0; 3])
    } else {
        Expr::new(parts.join(" + "))
    }
}

/// Blend from `base` towards `target` by `strength` and renormalize.
fn blend_normal(base: &Expr, target: Expr, strength: &Expr) -> Expr {
    match strength.as_number() {
        Some(s) if s <= 0.0 => base.clone(),
        Some(s) if s == 1.0 => pexpr!("norm({})", target),
        _ => pexpr!(
            "norm({b} + ({t} - {b}) * {s})",
            b = atom(base),
            t = atom(&target),
            s = atom(strength)
        ),
    }
}

pub(super) fn normal_map(ctx: &mut ExportContext<'_>, n: &NodeRef<'_>, props: &NormalMapNode) -> LowerResult {
    let color = n.input(ctx, "Color")?;
    let strength = n.input_or(ctx, "Strength", Expr::number(1.0));

    // Map [0, 1] color channels to [-1, 1] components
    let component = |i: usize, swizzle: &str| match color.as_color() {
        Some(c) => Expr::number(c[i] * 2.0 - 1.0),
        None => pexpr!("({}.{} * 2 - 1)", atom(&color), swizzle),
    };
    let (x, y, z) = (component(0, "r"), component(1, "g"), component(2, "b"));

    let mapped = match props.space {
        NormalMapSpace::Tangent => {
            if x.as_number() == Some(0.0) && y.as_number() == Some(0.0) {
                // The neutral color maps to the shading normal
                return Ok(Expr::new("N"));
            }
            linear_combination(&[(x, "Nx"), (y, "Ny"), (z, "N")])
        }
        NormalMapSpace::World | NormalMapSpace::BlenderWorld => {
            pexpr!("vec3({}, {}, {})", x, y, z)
        }
        NormalMapSpace::Object | NormalMapSpace::BlenderObject => pexpr!(
            "transform_normal(vec3({}, {}, {}), \"object\", \"global\")",
            x,
            y,
            z
        ),
    };
    Ok(blend_normal(&Expr::new("N"), mapped, &strength))
}

pub(super) fn bump(ctx: &mut ExportContext<'_>, n: &NodeRef<'_>, props: &BumpNode) -> LowerResult {
    let base = shading_normal(ctx, n)?;
    if !n.is_linked(ctx, "Height") {
        return Ok(base);
    }
    let height = n.input(ctx, "Height")?;
    if height.is_constant() {
        return Ok(base);
    }
    let height_x = ctx.with_texcoord_offset([BUMP_DELTA, 0.0, 0.0], |ctx| n.input(ctx, "Height"))?;
    let height_y = ctx.with_texcoord_offset([0.0, BUMP_DELTA, 0.0], |ctx| n.input(ctx, "Height"))?;

    let strength = n.input_or(ctx, "Strength", Expr::number(1.0));
    let distance = n.input_or(ctx, "Distance", Expr::number(1.0));
    let sign = if props.invert { -1.0 } else { 1.0 };
    let factor = fold2(&strength, &distance, |s, d| sign * s * d / BUMP_DELTA).unwrap_or_else(|| {
        pexpr!(
            "({} * {} * {})",
            fmt_num(sign / BUMP_DELTA),
            atom(&strength),
            atom(&distance)
        )
    });
    if factor.as_number() == Some(0.0) {
        return Ok(base);
    }

    let h = atom(&height);
    Ok(pexpr!(
        "norm({} - {} * (({} - {h}) * Nx + ({} - {h}) * Ny))",
        atom(&base),
        atom(&factor),
        height_x,
        height_y,
        h = h
    ))
}

#[cfg(test)]
mod tests {
    use super::super::export_node;
    use super::super::test_util::*;
    use super::*;
    use crate::host::{MathOperation, Node, NodeKind, NodeTree, Socket};
    use crate::settings::ExportSettings;
    use crate::types::{SocketType, SocketValue};

    fn bump_node(invert: bool) -> Node {
        Node::new("Bump", NodeKind::Bump(BumpNode { invert }))
            .with_input(Socket::new("Strength", SocketType::Value).with_default(SocketValue::Scalar(1.0)))
            .with_input(Socket::new("Distance", SocketType::Value).with_default(SocketValue::Scalar(0.1)))
            .with_input(Socket::new("Height", SocketType::Value).with_default(SocketValue::Scalar(1.0)))
            .with_input(Socket::new("Normal", SocketType::Vector))
            .with_output(Socket::new("Normal", SocketType::Vector))
    }

    #[test]
    fn test_bump_samples_shifted_coordinates() {
        let mut tree = NodeTree::new("T");
        let coords = tree.add_node(texcoord_node("Coords"));
        let bump = tree.add_node(bump_node(false));
        let out = tree.add_node(sink("Out", SocketType::Vector));
        tree.link(coords, "Generated", bump, "Height").unwrap();
        tree.link(bump, "Normal", out, "In").unwrap();
        let (scene, t) = scene_with(tree);
        let settings = ExportSettings::default();
        let mut ctx = ExportContext::new(&scene, &settings, None);

        let normal = export_node(&mut ctx, input(t, out, 0));
        assert_eq!(
            normal.as_str(),
            "norm(N - 100 * ((avg((vec3(0.001, 0, 0) + uvw)) - avg(uvw)) * Nx \
             + (avg((vec3(0, 0.001, 0) + uvw)) - avg(uvw)) * Ny))"
        );
        assert_eq!(ctx.texcoord_offset(), [0.0; 3]);
    }

    #[test]
    fn test_bump_without_height_is_identity() {
        let mut tree = NodeTree::new("T");
        let value = tree.add_node(value_node("Height", 0.3));
        let flat = tree.add_node(bump_node(true));
        let constant = tree.add_node(bump_node(true));
        let out = tree.add_node(
            sink("Out", SocketType::Vector).with_input(Socket::new("In2", SocketType::Vector)),
        );
        tree.link(value, "Value", constant, "Height").unwrap();
        tree.link(flat, "Normal", out, "In").unwrap();
        tree.link(constant, "Normal", out, "In2").unwrap();
        let (scene, t) = scene_with(tree);
        let settings = ExportSettings::default();
        let mut ctx = ExportContext::new(&scene, &settings, None);

        assert_eq!(export_node(&mut ctx, input(t, out, 0)).as_str(), "N");
        assert_eq!(export_node(&mut ctx, input(t, out, 1)).as_str(), "N");
    }

    #[test]
    fn test_normal_map() {
        let mut tree = NodeTree::new("T");
        let coords = tree.add_node(texcoord_node("Coords"));
        let neutral = tree.add_node(rgb_node("Neutral", [0.5, 0.5, 1.0, 1.0]));
        let map = |name: &str| {
            Node::new(name, NodeKind::NormalMap(NormalMapNode::default()))
                .with_input(Socket::new("Strength", SocketType::Value).with_default(SocketValue::Scalar(1.0)))
                .with_input(Socket::new("Color", SocketType::Rgba))
                .with_output(Socket::new("Normal", SocketType::Vector))
        };
        let a = tree.add_node(map("A"));
        let b = tree.add_node(map("B"));
        let out = tree.add_node(
            sink("Out", SocketType::Vector).with_input(Socket::new("In2", SocketType::Vector)),
        );
        tree.link(neutral, "Color", a, "Color").unwrap();
        tree.link(coords, "UV", b, "Color").unwrap();
        tree.link(a, "Normal", out, "In").unwrap();
        tree.link(b, "Normal", out, "In2").unwrap();
        let (scene, t) = scene_with(tree);
        let settings = ExportSettings::default();
        let mut ctx = ExportContext::new(&scene, &settings, None);

        assert_eq!(export_node(&mut ctx, input(t, out, 0)).as_str(), "N");
        let c = "max(color(uvw.x, uvw.y, uvw.z, 1), color(0))";
        assert_eq!(
            export_node(&mut ctx, input(t, out, 1)).as_str(),
            format!(
                "norm(({c}.r * 2 - 1) * Nx + ({c}.g * 2 - 1) * Ny + ({c}.b * 2 - 1) * N)",
                c = c
            )
        );
    }

    #[test]
    fn test_mapping_skips_identity_parts() {
        let mut tree = NodeTree::new("T");
        let coords = tree.add_node(texcoord_node("Coords"));
        let mapping = tree.add_node(
            Node::new(
                "Mapping",
                NodeKind::Mapping(MappingNode {
                    vector_type: MappingType::Point,
                }),
            )
            .with_input(Socket::new("Vector", SocketType::Vector))
            .with_input(
                Socket::new("Location", SocketType::Vector)
                    .with_default(SocketValue::Vector([0.0, 0.0, 1.0])),
            )
            .with_input(Socket::new("Rotation", SocketType::Vector))
            .with_input(
                Socket::new("Scale", SocketType::Vector).with_default(SocketValue::Vector([2.0, 2.0, 2.0])),
            )
            .with_output(Socket::new("Vector", SocketType::Vector)),
        );
        let out = tree.add_node(sink("Out", SocketType::Vector));
        tree.link(coords, "UV", mapping, "Vector").unwrap();
        tree.link(mapping, "Vector", out, "In").unwrap();
        let (scene, t) = scene_with(tree);
        let settings = ExportSettings::default();
        let mut ctx = ExportContext::new(&scene, &settings, None);

        assert_eq!(
            export_node(&mut ctx, input(t, out, 0)).as_str(),
            "((uvw * vec3(2, 2, 2)) + vec3(0, 0, 1))"
        );
    }

    #[test]
    fn test_layer_weight_facing_folds_exponent() {
        let mut tree = NodeTree::new("T");
        let weight = tree.add_node(
            Node::new("Weight", NodeKind::LayerWeight)
                .with_input(Socket::new("Blend", SocketType::Value).with_default(SocketValue::Scalar(0.25)))
                .with_input(Socket::new("Normal", SocketType::Vector))
                .with_output(Socket::new("Fresnel", SocketType::Value))
                .with_output(Socket::new("Facing", SocketType::Value)),
        );
        let factor = tree.add_node(math_node("Factor", MathOperation::Multiply));
        let out = tree.add_node(sink("Out", SocketType::Value));
        tree.link(weight, "Facing", factor, "Value").unwrap();
        tree.link(factor, "Value", out, "In").unwrap();
        let (scene, t) = scene_with(tree);
        let settings = ExportSettings::default();
        let mut ctx = ExportContext::new(&scene, &settings, None);

        assert_eq!(
            export_node(&mut ctx, input(t, out, 0)).as_str(),
            "((1 - pow(abs(dot(V, N)), 0.5)) * 0.5)"
        );
    }

    #[test]
    fn test_geometry_outputs() {
        let mut tree = NodeTree::new("T");
        let geo = tree.add_node(
            Node::new("Geometry", NodeKind::NewGeometry)
                .with_output(Socket::new("Backfacing", SocketType::Value))
                .with_output(Socket::new("Pointiness", SocketType::Value)),
        );
        let out = tree.add_node(
            sink("Out", SocketType::Value).with_input(Socket::new("In2", SocketType::Value)),
        );
        tree.link(geo, "Backfacing", out, "In").unwrap();
        tree.link(geo, "Pointiness", out, "In2").unwrap();
        let (scene, t) = scene_with(tree);
        let settings = ExportSettings::default();
        let mut ctx = ExportContext::new(&scene, &settings, None);

        assert_eq!(
            export_node(&mut ctx, input(t, out, 0)).as_str(),
            "select(frontside, 0, 1)"
        );
        assert_eq!(export_node(&mut ctx, input(t, out, 1)).as_str(), "0");
        assert_eq!(ctx.diagnostics().warning_count(), 1);
    }
}
