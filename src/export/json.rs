//! Scene file output.

use crate::error::Result;
use crate::output::SceneDescriptor;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Serialize `scene` as pretty-printed Ignis JSON.
pub fn write_scene<W: Write>(scene: &SceneDescriptor, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, scene)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Write `scene` to `path`, creating the parent directory if needed.
pub fn write_scene_file(scene: &SceneDescriptor, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    write_scene(scene, BufWriter::new(file))?;
    log::info!("Wrote scene {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{Bsdf, Film};
    use crate::types::Expr;

    #[test]
    fn test_write_scene() {
        let mut scene = SceneDescriptor::new();
        scene.film = Some(Film { size: [640, 480] });
        scene.bsdfs.push(Bsdf::diffuse("Gray", Expr::color([0.5, 0.5, 0.5, 1.0])));

        let mut bytes = Vec::new();
        write_scene(&scene, &mut bytes).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["film"]["size"], serde_json::json!([640, 480]));
        assert_eq!(value["bsdfs"][0]["name"], "Gray");
        assert!(value.get("shapes").is_none());
    }

    #[test]
    fn test_write_scene_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("scene.json");
        write_scene_file(&SceneDescriptor::new(), &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap().trim(), "{}");
    }
}
