//! Node graph to expression lowering.
//!
//! [`export_node`] turns an input socket of a shader node tree into an
//! expression of the renderer's shading language by recursively lowering the
//! upstream nodes. Results are memoized per (group frame, socket, texture
//! coordinate offset). Lowering never fails: a node that cannot be lowered is
//! reported and replaced by the destination socket's default value.

pub mod coerce;
mod color;
mod math;
mod texture;
mod vector;

use crate::context::ExportContext;
use crate::host::{InputRef, Node, NodeId, NodeKind, TreeId};
use crate::types::{Expr, SocketType};
use thiserror::Error;

pub use coerce::coerce;
pub(crate) use color::lerp;

/// Why a single node could not be lowered.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LowerError {
    #[error("node '{node}' of type {kind} is not supported")]
    UnsupportedNode { node: String, kind: String },

    #[error("operation {operation} of node '{node}' is not supported")]
    UnsupportedOperation { node: String, operation: String },

    #[error("node '{node}' has no socket '{socket}'")]
    MissingSocket { node: String, socket: String },

    #[error("node '{node}' is missing property '{property}'")]
    MissingProperty { node: String, property: String },

    #[error("group node '{node}' references unknown node tree '{tree}'")]
    UnknownTree { node: String, tree: String },

    #[error("group node '{node}' exceeds the maximum nesting depth of {depth}")]
    GroupDepth { node: String, depth: usize },

    #[error("node tree '{tree}' has no group output")]
    NoGroupOutput { tree: String },

    #[error("group input node '{node}' is used outside of a group")]
    OrphanGroupInput { node: String },

    #[error("shader output of node '{node}' cannot be used as a value")]
    ShaderAsValue { node: String },
}

pub type LowerResult = Result<Expr, LowerError>;

/// Build an [`Expr`] from a format string.
macro_rules! pexpr {
    ($($arg:tt)*) => {
        $crate::types::Expr::new(format!($($arg)*))
    };
}
pub(crate) use pexpr;

/// A node together with its location, as seen by the per-node lowering rules.
#[derive(Clone, Copy)]
pub struct NodeRef<'s> {
    pub tree: TreeId,
    pub id: NodeId,
    pub node: &'s Node,
}

impl<'s> NodeRef<'s> {
    pub fn new(ctx: &ExportContext<'s>, tree: TreeId, id: NodeId) -> Self {
        Self {
            tree,
            id,
            node: ctx.scene.tree(tree).node(id),
        }
    }

    pub fn name(&self) -> &str {
        &self.node.name
    }

    pub fn socket(&self, index: usize) -> InputRef {
        InputRef::new(self.tree, self.id, index)
    }

    pub fn input_index(&self, key: &str) -> Result<usize, LowerError> {
        self.node
            .input_index(key)
            .ok_or_else(|| self.missing_socket(key))
    }

    /// Lower the input with the given identifier or name.
    pub fn input(&self, ctx: &mut ExportContext<'_>, key: &str) -> LowerResult {
        let index = self.input_index(key)?;
        Ok(export_node(ctx, self.socket(index)))
    }

    /// Lower the first existing input among `keys`.
    pub fn input_any(&self, ctx: &mut ExportContext<'_>, keys: &[&str]) -> LowerResult {
        let index = self
            .node
            .input_index_any(keys)
            .ok_or_else(|| self.missing_socket(keys.first().copied().unwrap_or("")))?;
        Ok(export_node(ctx, self.socket(index)))
    }

    /// Lower an input by position (for nodes with duplicate socket names).
    pub fn input_at(&self, ctx: &mut ExportContext<'_>, index: usize) -> LowerResult {
        if index >= self.node.inputs.len() {
            return Err(self.missing_socket(&format!("#{}", index)));
        }
        Ok(export_node(ctx, self.socket(index)))
    }

    /// Lower an input if the node has it, otherwise use `fallback`.
    pub fn input_or(&self, ctx: &mut ExportContext<'_>, key: &str, fallback: Expr) -> Expr {
        match self.node.input_index(key) {
            Some(index) => export_node(ctx, self.socket(index)),
            None => fallback,
        }
    }

    pub fn is_linked(&self, ctx: &ExportContext<'_>, key: &str) -> bool {
        self.node
            .input_index(key)
            .map(|i| ctx.scene.tree(self.tree).is_linked(self.id, i))
            .unwrap_or(false)
    }

    pub fn missing_socket(&self, socket: &str) -> LowerError {
        LowerError::MissingSocket {
            node: self.node.name.clone(),
            socket: socket.to_string(),
        }
    }

    pub fn unsupported_operation(&self, operation: impl std::fmt::Debug) -> LowerError {
        LowerError::UnsupportedOperation {
            node: self.node.name.clone(),
            operation: format!("{:?}", operation),
        }
    }
}

/// Lower the value flowing into `socket`.
///
/// Repeated calls for the same socket under the same group frame and texture
/// coordinate offset return the very same cached expression.
pub fn export_node(ctx: &mut ExportContext<'_>, socket: InputRef) -> Expr {
    if let Some(expr) = ctx.cached(socket) {
        return expr;
    }

    let scene = ctx.scene;
    let tree = scene.tree(socket.tree);
    let node = tree.node(socket.node);
    let dest = &node.inputs[socket.socket];

    let expr = match tree.incoming(socket.node, socket.socket) {
        None => default_value(dest.default, dest.ty),
        Some((src_id, output)) => {
            let src = tree.node(src_id);
            let src_socket = &src.outputs[output];

            if src_socket.ty == SocketType::Shader && dest.ty != SocketType::Shader {
                // A closure wired into a value socket contributes its emission.
                let emission = crate::material::emission::get_emission(ctx, socket)
                    .unwrap_or_else(Expr::black);
                coerce(ctx, emission, SocketType::Rgba, dest.ty)
            } else {
                let source = NodeRef {
                    tree: socket.tree,
                    id: src_id,
                    node: src,
                };
                match lower_output(ctx, &source, &src_socket.identifier, &src_socket.name) {
                    Ok(raw) => coerce(ctx, raw, src_socket.ty, dest.ty),
                    Err(err) => {
                        ctx.report_warning(format!(
                            "{} (used by '{}' of node '{}')",
                            err, dest.name, node.name
                        ));
                        default_value(dest.default, dest.ty)
                    }
                }
            }
        }
    };

    ctx.store(socket, expr.clone());
    expr
}

/// Lower output `output` of `n` directly, converted to `to`.
///
/// Used where a value output feeds a shader socket, which `export_node`
/// would refuse to convert.
pub(crate) fn export_output(
    ctx: &mut ExportContext<'_>,
    n: &NodeRef<'_>,
    output: usize,
    to: SocketType,
) -> LowerResult {
    let socket = n
        .node
        .outputs
        .get(output)
        .ok_or_else(|| n.missing_socket(&format!("#{}", output)))?;
    let raw = lower_output(ctx, n, &socket.identifier, &socket.name)?;
    Ok(coerce(ctx, raw, socket.ty, to))
}

/// Literal for an unlinked socket.
pub fn default_value(value: Option<crate::types::SocketValue>, ty: SocketType) -> Expr {
    match value {
        Some(v) => v.to_expr(ty),
        None => ty.zero(),
    }
}

/// Dispatch on the source node kind.
fn lower_output(
    ctx: &mut ExportContext<'_>,
    n: &NodeRef<'_>,
    output_id: &str,
    output_name: &str,
) -> LowerResult {
    match &n.node.kind {
        NodeKind::Value => output_default(n, output_id, SocketType::Value),
        NodeKind::Rgb => output_default(n, output_id, SocketType::Rgba),
        NodeKind::TexCoord => vector::tex_coord(ctx, n, output_name),
        NodeKind::UvMap => Ok(ctx.texcoord()),
        NodeKind::NewGeometry => vector::geometry(n, output_name),
        NodeKind::ObjectInfo => vector::object_info(n, output_name),
        NodeKind::Fresnel => vector::fresnel(ctx, n),
        NodeKind::LayerWeight => vector::layer_weight(ctx, n, output_name),

        NodeKind::Math(props) => math::math(ctx, n, props),
        NodeKind::VectorMath(props) => math::vector_math(ctx, n, props, output_name),
        NodeKind::Clamp(props) => math::clamp(ctx, n, props),
        NodeKind::MapRange(props) => math::map_range(ctx, n, props),

        NodeKind::MixRgb(props) => color::mix_rgb(ctx, n, props),
        NodeKind::Mix(props) => color::mix(ctx, n, props),
        NodeKind::Invert => color::invert(ctx, n),
        NodeKind::Gamma => color::gamma(ctx, n),
        NodeKind::BrightContrast => color::bright_contrast(ctx, n),
        NodeKind::HueSaturation => color::hue_saturation(ctx, n),
        NodeKind::Blackbody => color::blackbody(ctx, n),
        NodeKind::ColorRamp(props) => color::color_ramp(ctx, n, props, output_name),
        NodeKind::FloatCurve(props) => color::float_curve(ctx, n, props),
        NodeKind::RgbCurve(props) => color::rgb_curve(ctx, n, props),
        NodeKind::RgbToBw => color::rgb_to_bw(ctx, n),
        NodeKind::SeparateColor(props) => color::separate_color(ctx, n, props, output_name),
        NodeKind::CombineColor(props) => color::combine_color(ctx, n, props),
        NodeKind::SeparateXyz => color::separate_xyz(ctx, n, output_name),
        NodeKind::CombineXyz => color::combine_xyz(ctx, n),

        NodeKind::TexImage(props) => texture::image(ctx, n, props, output_name),
        NodeKind::TexEnvironment(props) => texture::environment(ctx, n, props, output_name),
        NodeKind::TexChecker => texture::checker(ctx, n, output_name),
        NodeKind::TexNoise(props) => texture::noise(ctx, n, props, output_name),
        NodeKind::TexVoronoi(props) => texture::voronoi(ctx, n, props, output_name),
        NodeKind::TexWave(props) => texture::wave(ctx, n, props, output_name),
        NodeKind::TexGradient(props) => texture::gradient(ctx, n, props, output_name),
        NodeKind::TexWhiteNoise => texture::white_noise(ctx, n, output_name),

        NodeKind::Mapping(props) => vector::mapping(ctx, n, props),
        NodeKind::VectorRotate(props) => vector::vector_rotate(ctx, n, props),
        NodeKind::VectorTransform(props) => vector::vector_transform(ctx, n, props),
        NodeKind::NormalMap(props) => vector::normal_map(ctx, n, props),
        NodeKind::Bump(props) => vector::bump(ctx, n, props),

        NodeKind::Group(props) => {
            group_begin(ctx, n, props.node_tree.as_deref(), output_id, output_name)
        }
        NodeKind::GroupInput => group_input(ctx, n, output_id, output_name),
        NodeKind::Reroute => n.input_at(ctx, 0),

        kind if kind.is_shader() => Err(LowerError::ShaderAsValue {
            node: n.node.name.clone(),
        }),
        kind => Err(LowerError::UnsupportedNode {
            node: n.node.name.clone(),
            kind: kind.type_name().to_string(),
        }),
    }
}

/// Constant stored on an output socket (value and RGB nodes).
fn output_default(n: &NodeRef<'_>, output_id: &str, ty: SocketType) -> LowerResult {
    let socket = n
        .node
        .outputs
        .iter()
        .find(|s| s.identifier == output_id)
        .or_else(|| n.node.outputs.first())
        .ok_or_else(|| n.missing_socket(output_id))?;
    let value = socket.default.ok_or_else(|| LowerError::MissingProperty {
        node: n.node.name.clone(),
        property: "default".to_string(),
    })?;
    Ok(value.to_expr(ty))
}

/// Where the group node `n` leads: inner tree, its output node and input slot.
pub(crate) fn resolve_group_output(
    ctx: &ExportContext<'_>,
    n: &NodeRef<'_>,
    tree_name: Option<&str>,
    output_id: &str,
    output_name: &str,
) -> Result<InputRef, LowerError> {
    let tree_name = tree_name.ok_or_else(|| LowerError::MissingProperty {
        node: n.node.name.clone(),
        property: "node_tree".to_string(),
    })?;
    let tree_id = ctx
        .scene
        .tree_id(tree_name)
        .ok_or_else(|| LowerError::UnknownTree {
            node: n.node.name.clone(),
            tree: tree_name.to_string(),
        })?;
    let inner = ctx.scene.tree(tree_id);
    let output = inner
        .find_node(|k| matches!(k, NodeKind::GroupOutput))
        .ok_or_else(|| LowerError::NoGroupOutput {
            tree: tree_name.to_string(),
        })?;
    let out_node = inner.node(output);
    let index = out_node
        .input_index(output_id)
        .or_else(|| out_node.input_index(output_name))
        .ok_or_else(|| LowerError::MissingSocket {
            node: out_node.name.clone(),
            socket: output_name.to_string(),
        })?;
    Ok(InputRef::new(tree_id, output, index))
}

/// Enter a group: lower the matching group output socket in a fresh frame.
fn group_begin(
    ctx: &mut ExportContext<'_>,
    n: &NodeRef<'_>,
    tree_name: Option<&str>,
    output_id: &str,
    output_name: &str,
) -> LowerResult {
    let target = enter_group(ctx, n, tree_name, output_id, output_name)?;
    let frame = ctx.child_frame(n.tree, n.id);
    Ok(ctx.in_frame(frame, |ctx| export_node(ctx, target)))
}

/// Depth check plus output resolution shared with the emission walker.
pub(crate) fn enter_group(
    ctx: &ExportContext<'_>,
    n: &NodeRef<'_>,
    tree_name: Option<&str>,
    output_id: &str,
    output_name: &str,
) -> Result<InputRef, LowerError> {
    let max_depth = ctx.settings.max_group_depth;
    if ctx.frames().depth() >= max_depth {
        return Err(LowerError::GroupDepth {
            node: n.node.name.clone(),
            depth: max_depth,
        });
    }
    resolve_group_output(ctx, n, tree_name, output_id, output_name)
}

/// Leave a group: the call site's input, lowered in the enclosing frame.
pub(crate) fn group_input_target(
    ctx: &ExportContext<'_>,
    n: &NodeRef<'_>,
    output_id: &str,
    output_name: &str,
) -> Result<(crate::context::FrameId, InputRef), LowerError> {
    let orphan = || LowerError::OrphanGroupInput {
        node: n.node.name.clone(),
    };
    let (call_tree, call_node) = ctx.frames().call_site().ok_or_else(orphan)?;
    let parent = ctx.frames().parent().ok_or_else(orphan)?;

    let group = ctx.scene.tree(call_tree).node(call_node);
    let index = group
        .input_index(output_id)
        .or_else(|| group.input_index(output_name))
        .ok_or_else(|| LowerError::MissingSocket {
            node: group.name.clone(),
            socket: output_name.to_string(),
        })?;
    Ok((parent, InputRef::new(call_tree, call_node, index)))
}

fn group_input(
    ctx: &mut ExportContext<'_>,
    n: &NodeRef<'_>,
    output_id: &str,
    output_name: &str,
) -> LowerResult {
    let (parent, target) = group_input_target(ctx, n, output_id, output_name)?;
    Ok(ctx.in_frame(parent, |ctx| export_node(ctx, target)))
}

/// The expression as an operand: wrapped in parentheses unless it already
/// is an identifier, literal, call or parenthesized group.
pub fn atom(expr: &Expr) -> String {
    let s = expr.as_str();
    if is_atomic(s) {
        s.to_string()
    } else {
        format!("({})", s)
    }
}

fn is_atomic(s: &str) -> bool {
    let ident = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.';
    if s.is_empty() {
        return false;
    }
    if s.chars().all(ident) {
        return true;
    }
    let Some(open) = s.find('(') else {
        return false;
    };
    if !s[..open].chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return false;
    }
    // The first parenthesis must close at the end, optionally followed by a swizzle
    let mut depth = 0usize;
    for (i, c) in s[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    let rest = &s[open + i + 1..];
                    return rest.is_empty() || (rest.starts_with('.') && rest.chars().all(ident));
                }
            }
            _ => {}
        }
    }
    false
}

/// Fold a unary scalar function over a literal.
pub(crate) fn fold1(a: &Expr, f: impl Fn(f64) -> f64) -> Option<Expr> {
    a.as_number().map(|a| Expr::number(f(a)))
}

/// Fold a binary scalar function over two literals.
pub(crate) fn fold2(a: &Expr, b: &Expr, f: impl Fn(f64, f64) -> f64) -> Option<Expr> {
    Some(Expr::number(f(a.as_number()?, b.as_number()?)))
}

/// Fold a ternary scalar function over three literals.
pub(crate) fn fold3(a: &Expr, b: &Expr, c: &Expr, f: impl Fn(f64, f64, f64) -> f64) -> Option<Expr> {
    Some(Expr::number(f(a.as_number()?, b.as_number()?, c.as_number()?)))
}

#[cfg(test)]
pub(crate) mod test_util {
    //! Small graph builders shared by the lowering tests.

    use crate::host::{HostScene, Node, NodeId, NodeKind, NodeTree, Socket, TreeId};
    use crate::types::{SocketType, SocketValue};

    pub fn value_node(name: &str, v: f64) -> Node {
        Node::new(name, NodeKind::Value)
            .with_output(Socket::new("Value", SocketType::Value).with_default(SocketValue::Scalar(v)))
    }

    pub fn rgb_node(name: &str, c: [f64; 4]) -> Node {
        Node::new(name, NodeKind::Rgb)
            .with_output(Socket::new("Color", SocketType::Rgba).with_default(SocketValue::Color(c)))
    }

    pub fn texcoord_node(name: &str) -> Node {
        let mut node = Node::new(name, NodeKind::TexCoord);
        for out in ["Generated", "Normal", "UV", "Object", "Camera", "Window", "Reflection"] {
            node = node.with_output(Socket::new(out, SocketType::Vector));
        }
        node
    }

    /// A sink node with one input of the given type, used as lowering target.
    pub fn sink(name: &str, ty: SocketType) -> Node {
        Node::new(name, NodeKind::GroupOutput).with_input(Socket::new("In", ty))
    }

    pub fn math_node(name: &str, op: crate::host::MathOperation) -> Node {
        Node::new(
            name,
            NodeKind::Math(crate::host::MathNode {
                operation: op,
                use_clamp: false,
            }),
        )
        .with_input(Socket::new("Value", SocketType::Value).with_default(SocketValue::Scalar(0.5)))
        .with_input(
            Socket::new("Value", SocketType::Value)
                .with_identifier("Value_001")
                .with_default(SocketValue::Scalar(0.5)),
        )
        .with_input(
            Socket::new("Value", SocketType::Value)
                .with_identifier("Value_002")
                .with_default(SocketValue::Scalar(0.5)),
        )
        .with_output(Socket::new("Value", SocketType::Value))
    }

    pub fn scene_with(tree: NodeTree) -> (HostScene, TreeId) {
        let mut scene = HostScene::new("Test");
        let id = scene.add_tree(tree);
        (scene, id)
    }

    pub fn input(tree: TreeId, node: NodeId, socket: usize) -> crate::host::InputRef {
        crate::host::InputRef::new(tree, node, socket)
    }
}
