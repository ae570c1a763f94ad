//! Loading host scene dumps.

use super::HostScene;
use crate::error::{ExportError, Result};
use std::path::Path;

/// Load a scene dump from a JSON file.
///
/// Relative image paths inside the dump are resolved against the file's
/// directory.
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<HostScene> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    load_from_str(&text, Some(base_dir))
}

/// Load a scene dump from a JSON string.
pub fn load_from_str(text: &str, base_dir: Option<&Path>) -> Result<HostScene> {
    let mut scene: HostScene = serde_json::from_str(text)?;
    scene.rebuild_index();
    if let Some(dir) = base_dir {
        scene.set_base_dir(dir);
    }
    validate(&scene)?;
    log::debug!(
        "Loaded scene '{}': {} objects, {} node trees",
        scene.name,
        scene.objects.len(),
        scene.node_trees.len()
    );
    Ok(scene)
}

/// Reject dangling references that would make the export meaningless.
fn validate(scene: &HostScene) -> Result<()> {
    for material in &scene.materials {
        if let Some(tree) = &material.node_tree {
            if scene.tree_id(tree).is_none() {
                return Err(ExportError::InvalidScene(format!(
                    "material '{}' references unknown node tree '{}'",
                    material.name, tree
                )));
            }
        }
    }
    if let Some(instances) = &scene.instances {
        for inst in instances {
            if scene.object(&inst.object).is_none() {
                return Err(ExportError::InvalidScene(format!(
                    "instance of unknown object '{}'",
                    inst.object
                )));
            }
        }
    }
    Ok(())
}
