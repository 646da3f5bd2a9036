use glam::{Mat3, Mat4, Vec3};

/// Orientation axes of a bone basis: bones point down +Y, with +X to the
/// right and +Z up.
#[derive(Debug, Clone, Copy)]
pub struct LocalFrame {
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
}

/// Extracts the orientation axes from a transform, ignoring translation.
pub fn local_frame(matrix: &Mat4) -> LocalFrame {
    let rotation = Mat3::from_mat4(*matrix);
    LocalFrame { forward: rotation * Vec3::Y, right: rotation * Vec3::X, up: rotation * Vec3::Z }
}

/// Rotation matrix around an arbitrary axis. A degenerate axis yields the
/// identity, so zero mouse deltas fall through without moving anything.
pub fn axis_rotation(axis: Vec3, angle: f32) -> Mat4 {
    let axis = axis.normalize_or_zero();
    if axis == Vec3::ZERO {
        return Mat4::IDENTITY;
    }
    Mat4::from_axis_angle(axis, angle)
}

/// Conjugates a rotation so it spins around `pivot` instead of the origin.
pub fn pivot_rotation(pivot: Vec3, rotation: Mat4) -> Mat4 {
    Mat4::from_translation(pivot) * rotation * Mat4::from_translation(-pivot)
}

/// Rotates a positional offset without translating it.
pub fn rotate_offset(rotation: &Mat4, offset: Vec3) -> Vec3 {
    rotation.transform_vector3(offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn pivot_rotation_keeps_the_pivot_fixed() {
        let pivot = Vec3::new(3.0, -1.0, 2.0);
        let spin = pivot_rotation(pivot, axis_rotation(Vec3::Z, 1.2));
        assert!(spin.transform_point3(pivot).distance(pivot) < 1e-5);
    }

    #[test]
    fn pivot_rotation_orbits_other_points() {
        let pivot = Vec3::new(1.0, 0.0, 0.0);
        let spin = pivot_rotation(pivot, axis_rotation(Vec3::Z, FRAC_PI_2));
        let moved = spin.transform_point3(Vec3::new(2.0, 0.0, 0.0));
        assert!(moved.distance(Vec3::new(1.0, 1.0, 0.0)) < 1e-5);
    }

    #[test]
    fn rotating_an_offset_preserves_its_length() {
        let rotation = axis_rotation(Vec3::new(0.3, 0.7, -0.2), 0.9);
        let offset = Vec3::new(0.0, -5.0, 1.5);
        let rotated = rotate_offset(&rotation, offset);
        assert!((rotated.length() - offset.length()).abs() < 1e-5);
    }

    #[test]
    fn degenerate_axis_is_a_no_op() {
        assert_eq!(axis_rotation(Vec3::ZERO, 1.0), Mat4::IDENTITY);
        let frame = local_frame(&Mat4::IDENTITY);
        assert_eq!(frame.forward, Vec3::Y);
        assert_eq!(frame.right, Vec3::X);
    }
}
