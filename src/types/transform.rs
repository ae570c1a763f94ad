//! Matrix helpers for world transforms.
//!
//! The host hands over matrices as row-major `[[f64; 4]; 4]` (Blender's
//! `matrix_world` layout); Ignis expects a flat row-major array of 16 floats.

use glam::{DMat4, DQuat, DVec3, DVec4};

/// Row-major 4x4 matrix as stored in the host dump.
pub type RowMatrix = [[f64; 4]; 4];

pub const IDENTITY: RowMatrix = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Convert a row-major matrix into glam's column-major representation.
pub fn to_mat4(rows: &RowMatrix) -> DMat4 {
    DMat4::from_cols_array_2d(rows).transpose()
}

/// Convert back into row-major rows.
pub fn to_rows(m: &DMat4) -> RowMatrix {
    m.transpose().to_cols_array_2d()
}

/// Flatten a matrix into the 16-element row-major array of the scene format.
pub fn flat_matrix(rows: &RowMatrix) -> [f64; 16] {
    let mut out = [0.0; 16];
    for (r, row) in rows.iter().enumerate() {
        out[r * 4..r * 4 + 4].copy_from_slice(row);
    }
    out
}

/// Transform a point (w = 1).
pub fn transform_point(rows: &RowMatrix, p: DVec3) -> DVec3 {
    to_mat4(rows).transform_point3(p)
}

/// Transform a direction (w = 0).
pub fn transform_vector(rows: &RowMatrix, v: DVec3) -> DVec3 {
    let r = to_mat4(rows) * DVec4::new(v.x, v.y, v.z, 0.0);
    r.truncate()
}

/// Reorient a Blender camera/light frame (-Z forward, Y up) to the renderer's
/// convention by turning it half-way around its local Y axis.
pub fn orient_y_up_z_forward(rows: &RowMatrix, skip_scale: bool) -> RowMatrix {
    let (scale, rotation, translation) = to_mat4(rows).to_scale_rotation_translation();
    let rotation = rotation * DQuat::from_rotation_y(std::f64::consts::PI);
    let scale = if skip_scale { DVec3::ONE } else { scale };
    to_rows(&DMat4::from_scale_rotation_translation(
        scale,
        rotation,
        translation,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translation(x: f64, y: f64, z: f64) -> RowMatrix {
        [
            [1.0, 0.0, 0.0, x],
            [0.0, 1.0, 0.0, y],
            [0.0, 0.0, 1.0, z],
            [0.0, 0.0, 0.0, 1.0],
        ]
    }

    #[test]
    fn test_flat_matrix_is_row_major() {
        let flat = flat_matrix(&translation(1.0, 2.0, 3.0));
        assert_eq!(flat[3], 1.0);
        assert_eq!(flat[7], 2.0);
        assert_eq!(flat[11], 3.0);
        assert_eq!(flat[15], 1.0);
    }

    #[test]
    fn test_transform_point_and_vector() {
        let m = translation(1.0, 2.0, 3.0);
        let p = transform_point(&m, DVec3::ZERO);
        assert_eq!(p, DVec3::new(1.0, 2.0, 3.0));

        let v = transform_vector(&m, DVec3::Z);
        assert_eq!(v, DVec3::Z);
    }

    #[test]
    fn test_orient_flips_forward() {
        let m = orient_y_up_z_forward(&translation(0.0, 0.0, 5.0), true);
        let forward = transform_vector(&m, DVec3::Z);
        assert!((forward - DVec3::new(0.0, 0.0, -1.0)).length() < 1e-9);
        // Translation is kept
        assert!((m[2][3] - 5.0).abs() < 1e-9);
    }
}
