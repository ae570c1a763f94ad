//! Camera and film entries.

use crate::context::ExportContext;
use crate::output::{Camera, Film};
use crate::types::transform::{flat_matrix, orient_y_up_z_forward};

/// Export the active camera and the film size.
///
/// The film is always written; the camera only when the scene names an
/// active camera object with camera data.
pub fn export_camera(ctx: &mut ExportContext<'_>) {
    let scene = ctx.scene;
    ctx.output.film = Some(Film {
        size: scene.render.film_size(),
    });

    let Some(name) = scene.camera.as_deref() else {
        log::info!("Scene has no active camera");
        return;
    };
    let Some(object) = scene.object(name) else {
        ctx.report_warning(format!("Camera object '{}' does not exist", name));
        return;
    };
    let Some(data) = object.data.as_deref().and_then(|d| scene.camera_data(d)) else {
        ctx.report_warning(format!("Camera object '{}' has no camera data", name));
        return;
    };

    let matrix = orient_y_up_z_forward(&object.matrix_world, true);
    ctx.output.camera = Some(Camera {
        kind: "perspective".to_string(),
        fov: data.angle.to_degrees(),
        near_clip: data.clip_start,
        far_clip: data.clip_end,
        transform: flat_matrix(&matrix),
    });
}
