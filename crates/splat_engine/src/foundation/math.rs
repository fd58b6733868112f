//! Math utilities and types
//!
//! Aliases over nalgebra plus the camera matrices the renderer needs.

pub use nalgebra::{Matrix4, Unit, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Math utility functions
pub mod utils {
    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees.to_radians()
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians.to_degrees()
    }
}

/// Extension trait for Mat4 with camera and rotation helpers
pub trait Mat4Ext {
    /// Rotation of `angle_degrees` about `axis`.
    ///
    /// Returns `None` when the axis has no usable direction or the angle is
    /// not finite.
    fn axis_angle_degrees(axis: Vec3, angle_degrees: f32) -> Option<Mat4>;

    /// Create a perspective projection matrix with depth mapped to `[0, 1]`
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Create a right-handed look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;

    /// Flips Y and Z so right-handed view space lands in Vulkan clip conventions
    fn vulkan_coordinate_transform() -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn axis_angle_degrees(axis: Vec3, angle_degrees: f32) -> Option<Mat4> {
        if !angle_degrees.is_finite() {
            return None;
        }
        let axis = Unit::try_new(axis, f32::EPSILON)?;
        Some(Mat4::from_axis_angle(&axis, angle_degrees.to_radians()))
    }

    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        // P = [1/(a*tan(φ/2))  0            0          0         ]
        //     [0               1/tan(φ/2)   0          0         ]
        //     [0               0            f/(f-n)    -nf/(f-n) ]
        //     [0               0            1          0         ]
        let tan_half_fovy = (fov_y * 0.5).tan();

        let mut result = Mat4::zeros();
        result[(0, 0)] = 1.0 / (aspect * tan_half_fovy);
        result[(1, 1)] = 1.0 / tan_half_fovy;
        result[(2, 2)] = far / (far - near);
        result[(2, 3)] = -(near * far) / (far - near);
        result[(3, 2)] = 1.0;
        result
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        let forward = (target - eye).normalize();
        let right = forward.cross(&up).normalize();
        let camera_up = right.cross(&forward);

        let translation = Mat4::new_translation(&(-eye));

        let rotation = Mat4::new(
            right.x, right.y, right.z, 0.0,
            camera_up.x, camera_up.y, camera_up.z, 0.0,
            -forward.x, -forward.y, -forward.z, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );

        rotation * translation
    }

    fn vulkan_coordinate_transform() -> Mat4 {
        Mat4::new(
            1.0,  0.0,  0.0, 0.0,
            0.0, -1.0,  0.0, 0.0,
            0.0,  0.0, -1.0, 0.0,
            0.0,  0.0,  0.0, 1.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn look_at_maps_target_onto_negative_z() {
        let view = Mat4::look_at(Vec3::new(0.0, 0.0, 20.0), Vec3::zeros(), Vec3::y());
        let target = view.transform_point(&Point3::origin());
        assert_relative_eq!(target.coords, Vec3::new(0.0, 0.0, -20.0), epsilon = 1e-5);
    }

    #[test]
    fn perspective_maps_near_and_far_to_unit_depth() {
        let proj = Mat4::perspective(60f32.to_radians(), 1.0, 1.0, 1000.0);
        let near = proj * Vec4::new(0.0, 0.0, 1.0, 1.0);
        let far = proj * Vec4::new(0.0, 0.0, 1000.0, 1.0);
        assert_relative_eq!(near.z / near.w, 0.0, epsilon = 1e-5);
        assert_relative_eq!(far.z / far.w, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn axis_angle_rejects_degenerate_axis() {
        assert!(Mat4::axis_angle_degrees(Vec3::zeros(), 45.0).is_none());
        assert!(Mat4::axis_angle_degrees(Vec3::z(), f32::NAN).is_none());
    }

    #[test]
    fn axis_angle_uses_degrees() {
        let rot = Mat4::axis_angle_degrees(Vec3::z(), 90.0).unwrap();
        let v = rot.transform_vector(&Vec3::x());
        assert_relative_eq!(v, Vec3::y(), epsilon = 1e-6);
    }
}
