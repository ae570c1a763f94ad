//! Node trees, sockets and link resolution.

use super::node::NodeKind;
use crate::types::{SocketType, SocketValue};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Index of a node tree inside [`HostScene::node_trees`](super::HostScene).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeId(pub usize);

/// Index of a node inside its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Address of an input socket anywhere in the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputRef {
    pub tree: TreeId,
    pub node: NodeId,
    pub socket: usize,
}

impl InputRef {
    pub fn new(tree: TreeId, node: NodeId, socket: usize) -> Self {
        Self { tree, node, socket }
    }
}

/// Problems found while resolving a tree's links.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    #[error("tree '{tree}' links to unknown node '{node}'")]
    UnknownNode { tree: String, node: String },

    #[error("node '{node}' has no socket {socket}")]
    UnknownSocket { node: String, socket: String },

    #[error("input '{socket}' of node '{node}' has more than one incoming link")]
    DuplicateLink { node: String, socket: String },

    #[error("link from '{from}' to '{to}' closes a cycle")]
    Cycle { from: String, to: String },
}

/// One input or output of a node.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Socket {
    pub name: String,
    /// Stable identifier; differs from the name for duplicated sockets
    /// (e.g. the two `Shader` inputs of a mix shader).
    #[serde(default)]
    pub identifier: String,
    #[serde(rename = "type")]
    pub ty: SocketType,
    /// Constant value used when the socket is not linked.
    #[serde(default)]
    pub default: Option<SocketValue>,
}

impl Socket {
    pub fn new(name: impl Into<String>, ty: SocketType) -> Self {
        let name = name.into();
        Self {
            identifier: name.clone(),
            name,
            ty,
            default: None,
        }
    }

    pub fn with_default(mut self, value: SocketValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }
}

/// A node of a shader graph.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "NodeData")]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub inputs: Vec<Socket>,
    pub outputs: Vec<Socket>,
}

#[derive(Deserialize)]
struct NodeData {
    name: String,
    #[serde(rename = "type")]
    idname: String,
    #[serde(default)]
    properties: Value,
    #[serde(default)]
    inputs: Vec<Socket>,
    #[serde(default)]
    outputs: Vec<Socket>,
}

impl TryFrom<NodeData> for Node {
    type Error = serde_json::Error;

    fn try_from(data: NodeData) -> Result<Self, Self::Error> {
        let kind = NodeKind::from_idname(&data.idname, data.properties)?;
        let fix = |mut sockets: Vec<Socket>| {
            for s in sockets.iter_mut() {
                if s.identifier.is_empty() {
                    s.identifier = s.name.clone();
                }
            }
            sockets
        };
        Ok(Node {
            name: data.name,
            kind,
            inputs: fix(data.inputs),
            outputs: fix(data.outputs),
        })
    }
}

impl Node {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_input(mut self, socket: Socket) -> Self {
        self.inputs.push(socket);
        self
    }

    pub fn with_output(mut self, socket: Socket) -> Self {
        self.outputs.push(socket);
        self
    }

    /// Find an input by identifier first, then by display name.
    pub fn input_index(&self, key: &str) -> Option<usize> {
        find_socket(&self.inputs, key)
    }

    /// Find the first input matching any of `keys`, in order.
    ///
    /// Used for sockets that were renamed between host versions.
    pub fn input_index_any(&self, keys: &[&str]) -> Option<usize> {
        keys.iter().find_map(|k| self.input_index(k))
    }

    pub fn output_index(&self, key: &str) -> Option<usize> {
        find_socket(&self.outputs, key)
    }

    pub fn input(&self, key: &str) -> Option<&Socket> {
        self.input_index(key).map(|i| &self.inputs[i])
    }
}

fn find_socket(sockets: &[Socket], key: &str) -> Option<usize> {
    sockets
        .iter()
        .position(|s| s.identifier == key)
        .or_else(|| sockets.iter().position(|s| s.name == key))
}

/// A node graph: material, world or group tree.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "NodeTreeData")]
pub struct NodeTree {
    pub name: String,
    nodes: Vec<Node>,
    /// Incoming link of every linked input: `(node, input) -> (node, output)`.
    links: HashMap<(NodeId, usize), (NodeId, usize)>,
}

#[derive(Deserialize)]
struct NodeTreeData {
    name: String,
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    links: Vec<LinkData>,
}

#[derive(Deserialize)]
struct LinkData {
    from_node: String,
    from_socket: SocketKey,
    to_node: String,
    to_socket: SocketKey,
}

/// Sockets in the dump are addressed by index, identifier or name.
#[derive(Deserialize)]
#[serde(untagged)]
enum SocketKey {
    Index(usize),
    Name(String),
}

impl SocketKey {
    fn resolve(&self, sockets: &[Socket]) -> Option<usize> {
        match self {
            SocketKey::Index(i) => (*i < sockets.len()).then_some(*i),
            SocketKey::Name(name) => find_socket(sockets, name),
        }
    }

    fn describe(&self) -> String {
        match self {
            SocketKey::Index(i) => format!("#{}", i),
            SocketKey::Name(name) => format!("'{}'", name),
        }
    }
}

impl TryFrom<NodeTreeData> for NodeTree {
    type Error = TreeError;

    fn try_from(data: NodeTreeData) -> Result<Self, Self::Error> {
        let mut tree = NodeTree {
            name: data.name,
            nodes: data.nodes,
            links: HashMap::new(),
        };

        for link in &data.links {
            let from = tree.node_by_name(&link.from_node).ok_or_else(|| TreeError::UnknownNode {
                tree: tree.name.clone(),
                node: link.from_node.clone(),
            })?;
            let to = tree.node_by_name(&link.to_node).ok_or_else(|| TreeError::UnknownNode {
                tree: tree.name.clone(),
                node: link.to_node.clone(),
            })?;

            let output = link
                .from_socket
                .resolve(&tree.node(from).outputs)
                .ok_or_else(|| TreeError::UnknownSocket {
                    node: link.from_node.clone(),
                    socket: link.from_socket.describe(),
                })?;
            let input = link
                .to_socket
                .resolve(&tree.node(to).inputs)
                .ok_or_else(|| TreeError::UnknownSocket {
                    node: link.to_node.clone(),
                    socket: link.to_socket.describe(),
                })?;

            tree.insert_link(from, output, to, input)?;
        }

        Ok(tree)
    }
}

impl NodeTree {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn add_node(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Connect output `output` of `from` to input `input` of `to`.
    pub fn link(
        &mut self,
        from: NodeId,
        output: &str,
        to: NodeId,
        input: &str,
    ) -> Result<(), TreeError> {
        let out = self.node(from).output_index(output).ok_or_else(|| {
            TreeError::UnknownSocket {
                node: self.node(from).name.clone(),
                socket: output.to_string(),
            }
        })?;
        let inp = self
            .node(to)
            .input_index(input)
            .ok_or_else(|| TreeError::UnknownSocket {
                node: self.node(to).name.clone(),
                socket: input.to_string(),
            })?;
        self.insert_link(from, out, to, inp)
    }

    fn insert_link(
        &mut self,
        from: NodeId,
        output: usize,
        to: NodeId,
        input: usize,
    ) -> Result<(), TreeError> {
        if self.depends_on(from, to) {
            return Err(TreeError::Cycle {
                from: self.node(from).name.clone(),
                to: self.node(to).name.clone(),
            });
        }
        if self.links.insert((to, input), (from, output)).is_some() {
            let node = self.node(to);
            return Err(TreeError::DuplicateLink {
                node: node.name.clone(),
                socket: node.inputs[input].name.clone(),
            });
        }
        Ok(())
    }

    /// True if `node` is `target` or reads from it through any chain of links.
    pub fn depends_on(&self, node: NodeId, target: NodeId) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            stack.extend(
                self.links
                    .iter()
                    .filter(|((to, _), _)| *to == current)
                    .map(|(_, (from, _))| *from),
            );
        }
        false
    }

    /// Panics if `id` does not belong to this tree.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn node_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name).map(NodeId)
    }

    /// First node satisfying `pred`.
    pub fn find_node(&self, pred: impl Fn(&NodeKind) -> bool) -> Option<NodeId> {
        self.nodes.iter().position(|n| pred(&n.kind)).map(NodeId)
    }

    /// The output socket feeding `(node, input)`, if linked.
    pub fn incoming(&self, node: NodeId, input: usize) -> Option<(NodeId, usize)> {
        self.links.get(&(node, input)).copied()
    }

    pub fn is_linked(&self, node: NodeId, input: usize) -> bool {
        self.links.contains_key(&(node, input))
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}
