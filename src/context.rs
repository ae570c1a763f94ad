//! Per-export state.
//!
//! One [`ExportContext`] is created for each export run and threaded by
//! `&mut` through every translator. It owns the accumulated output, the
//! expression cache, the group call frames and the diagnostics.

use crate::diagnostics::{Diagnostics, Severity};
use crate::error::ExportError;
use crate::host::{HostScene, InputRef, NodeId, TreeId};
use crate::output::SceneDescriptor;
use crate::settings::ExportSettings;
use crate::types::{fmt_num, Expr};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Handle of a group call frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(usize);

impl FrameId {
    /// The frame of the top-level material or world tree.
    pub const ROOT: FrameId = FrameId(0);
}

#[derive(Debug, Clone)]
struct Frame {
    parent: Option<FrameId>,
    /// The group node that instantiated this frame.
    call_site: Option<(TreeId, NodeId)>,
    depth: usize,
}

/// Arena of group call frames plus the index of the active one.
///
/// Frames are interned by `(parent, call site)`: entering the same group
/// node from the same enclosing frame twice yields the same frame, so cached
/// expressions stay valid, while two distinct group nodes instantiating one
/// tree get distinct frames.
#[derive(Debug, Clone)]
pub struct FrameStack {
    frames: Vec<Frame>,
    interned: HashMap<(FrameId, TreeId, NodeId), FrameId>,
    current: FrameId,
}

impl Default for FrameStack {
    fn default() -> Self {
        Self {
            frames: vec![Frame {
                parent: None,
                call_site: None,
                depth: 0,
            }],
            interned: HashMap::new(),
            current: FrameId::ROOT,
        }
    }
}

impl FrameStack {
    pub fn current(&self) -> FrameId {
        self.current
    }

    pub fn depth(&self) -> usize {
        self.frames[self.current.0].depth
    }

    /// Call site of the active frame, `None` at the root.
    pub fn call_site(&self) -> Option<(TreeId, NodeId)> {
        self.frames[self.current.0].call_site
    }

    pub fn parent(&self) -> Option<FrameId> {
        self.frames[self.current.0].parent
    }

    /// The child frame for a group node called from the active frame.
    pub fn child(&mut self, tree: TreeId, node: NodeId) -> FrameId {
        let key = (self.current, tree, node);
        if let Some(id) = self.interned.get(&key) {
            return *id;
        }
        let id = FrameId(self.frames.len());
        self.frames.push(Frame {
            parent: Some(self.current),
            call_site: Some((tree, node)),
            depth: self.depth() + 1,
        });
        self.interned.insert(key, id);
        id
    }

    fn set_current(&mut self, frame: FrameId) {
        self.current = frame;
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Deduplication key of an exported image texture.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureKey {
    pub path: String,
    pub wrap_mode: &'static str,
    pub filter_type: &'static str,
    pub linear: bool,
}

type CacheKey = (FrameId, InputRef, [u64; 3]);

/// Names handed out so far.
///
/// File name pools compare case-insensitively so two payloads never share a
/// file on case-folding file systems.
#[derive(Debug, Default)]
pub struct NamePool {
    taken: HashSet<String>,
    fold_case: bool,
}

impl NamePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// A case-insensitive pool for file names.
    pub fn files() -> Self {
        Self {
            taken: HashSet::new(),
            fold_case: true,
        }
    }

    fn take(&mut self, name: &str) -> bool {
        if self.fold_case {
            self.taken.insert(name.to_lowercase())
        } else {
            self.taken.insert(name.to_string())
        }
    }

    /// Claim `name`, appending `.001`, `.002`, ... while it is taken.
    pub fn claim(&mut self, name: String) -> String {
        if self.take(&name) {
            return name;
        }
        let mut suffix = 1;
        loop {
            let candidate = format!("{}.{:03}", name, suffix);
            if self.take(&candidate) {
                return candidate;
            }
            suffix += 1;
        }
    }

    /// Claim the file `stem.extension`, appending `_1`, `_2`, ... to the stem while it is taken.
    pub fn claim_file(&mut self, stem: &str, extension: &str) -> String {
        let with_ext = |stem: &str| {
            if extension.is_empty() {
                stem.to_string()
            } else {
                format!("{}.{}", stem, extension)
            }
        };
        let mut file = with_ext(stem);
        let mut suffix = 1;
        while !self.take(&file) {
            file = with_ext(&format!("{}_{}", stem, suffix));
            suffix += 1;
        }
        file
    }
}

/// Context of a single export run.
pub struct ExportContext<'a> {
    pub scene: &'a HostScene,
    pub settings: &'a ExportSettings,
    root: Option<PathBuf>,

    /// The scene being assembled.
    pub output: SceneDescriptor,
    textures: HashMap<TextureKey, String>,
    texture_files: HashMap<String, String>,
    texture_file_names: NamePool,
    shape_names: NamePool,
    mesh_files: NamePool,
    material_names: Vec<String>,
    material_set: HashSet<String>,

    cache: HashMap<CacheKey, Expr>,
    frames: FrameStack,
    offset: [f64; 3],

    diagnostics: Diagnostics,
    io_error: Option<ExportError>,
}

impl<'a> ExportContext<'a> {
    /// Create a context writing payload files below `root`.
    ///
    /// Without a root no mesh or texture files are written; the descriptor
    /// still references them.
    pub fn new(scene: &'a HostScene, settings: &'a ExportSettings, root: Option<&Path>) -> Self {
        Self {
            scene,
            settings,
            root: root.map(Path::to_path_buf),
            output: SceneDescriptor::new(),
            textures: HashMap::new(),
            texture_files: HashMap::new(),
            texture_file_names: NamePool::files(),
            shape_names: NamePool::new(),
            mesh_files: NamePool::files(),
            material_names: Vec::new(),
            material_set: HashSet::new(),
            cache: HashMap::new(),
            frames: FrameStack::default(),
            offset: [0.0; 3],
            diagnostics: Diagnostics::new(),
            io_error: None,
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn mesh_dir(&self) -> Option<PathBuf> {
        self.root.as_ref().map(|r| r.join(&self.settings.mesh_dir_name))
    }

    pub fn tex_dir(&self) -> Option<PathBuf> {
        self.root.as_ref().map(|r| r.join(&self.settings.tex_dir_name))
    }

    // Diagnostics

    pub fn report_info(&mut self, message: impl Into<String>) {
        self.diagnostics.report(Severity::Info, message);
    }

    pub fn report_warning(&mut self, message: impl Into<String>) {
        self.diagnostics.report(Severity::Warning, message);
    }

    pub fn report_error(&mut self, message: impl Into<String>) {
        self.diagnostics.report(Severity::Error, message);
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Keep the first I/O failure raised while lowering; later ones are logged.
    pub fn record_io_error(&mut self, err: ExportError) {
        self.report_error(format!("{}", err));
        if self.io_error.is_none() {
            self.io_error = Some(err);
        }
    }

    pub fn take_io_error(&mut self) -> Option<ExportError> {
        self.io_error.take()
    }

    // Expression cache

    fn cache_key(&self, socket: InputRef) -> CacheKey {
        (
            self.frames.current(),
            socket,
            [
                self.offset[0].to_bits(),
                self.offset[1].to_bits(),
                self.offset[2].to_bits(),
            ],
        )
    }

    pub fn cached(&self, socket: InputRef) -> Option<Expr> {
        self.cache.get(&self.cache_key(socket)).cloned()
    }

    pub fn store(&mut self, socket: InputRef, expr: Expr) {
        let key = self.cache_key(socket);
        self.cache.insert(key, expr);
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    // Group frames

    pub fn frames(&self) -> &FrameStack {
        &self.frames
    }

    /// Interned frame for the group node `(tree, node)` called from the active frame.
    pub fn child_frame(&mut self, tree: TreeId, node: NodeId) -> FrameId {
        self.frames.child(tree, node)
    }

    /// Run `f` with `frame` as the active frame.
    pub fn in_frame<R>(&mut self, frame: FrameId, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = self.frames.current();
        self.frames.set_current(frame);
        let result = f(self);
        self.frames.set_current(saved);
        result
    }

    // Texture coordinates

    pub fn texcoord_offset(&self) -> [f64; 3] {
        self.offset
    }

    /// The texture coordinate under the active offset.
    pub fn texcoord(&self) -> Expr {
        if self.offset == [0.0; 3] {
            Expr::new("uvw")
        } else {
            Expr::new(format!(
                "(vec3({}, {}, {}) + uvw)",
                fmt_num(self.offset[0]),
                fmt_num(self.offset[1]),
                fmt_num(self.offset[2])
            ))
        }
    }

    /// Run `f` with the texture coordinate shifted by `delta`.
    pub fn with_texcoord_offset<R>(
        &mut self,
        delta: [f64; 3],
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let saved = self.offset;
        self.offset = [
            saved[0] + delta[0],
            saved[1] + delta[1],
            saved[2] + delta[2],
        ];
        let result = f(self);
        self.offset = saved;
        result
    }

    // Textures and materials

    pub fn texture_name(&self, key: &TextureKey) -> Option<&str> {
        self.textures.get(key).map(String::as_str)
    }

    pub fn register_texture(&mut self, key: TextureKey, name: String) {
        self.textures.insert(key, name);
    }

    /// True if some registered texture already uses `name`.
    pub fn texture_name_taken(&self, name: &str) -> bool {
        self.textures.values().any(|n| n == name)
    }

    /// Payload file for the image source `source`, and whether it still has to be written.
    ///
    /// Each source gets one file; distinct sources never share a file name.
    pub fn texture_file(&mut self, source: &str, file_name: &str) -> (String, bool) {
        if let Some(file) = self.texture_files.get(source) {
            return (file.clone(), false);
        }
        let path = Path::new(file_name);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.to_string());
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = self.texture_file_names.claim_file(&stem, &extension);
        self.texture_files.insert(source.to_string(), file.clone());
        (file, true)
    }

    // Shapes

    /// A shape name no other shape uses yet.
    pub fn claim_shape_name(&mut self, name: String) -> String {
        self.shape_names.claim(name)
    }

    /// A mesh file name no other shape writes to.
    pub fn claim_mesh_file(&mut self, stem: &str) -> String {
        self.mesh_files.claim_file(stem, "ply")
    }

    /// Remember a material for the second export pass.
    pub fn collect_material(&mut self, name: &str) {
        if self.material_set.insert(name.to_string()) {
            self.material_names.push(name.to_string());
        }
    }

    pub fn collected_materials(&self) -> &[String] {
        &self.material_names
    }

    /// Finish the run.
    pub fn finish(self) -> (SceneDescriptor, Diagnostics) {
        (self.output, self.diagnostics)
    }
}
