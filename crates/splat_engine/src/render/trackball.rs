//! Virtual trackball
//!
//! Maps window-space cursor positions onto a unit hemisphere facing the
//! viewer and turns two successive samples into an axis-angle rotation.

use crate::foundation::math::{utils, Vec3};

/// Lift above the unit disk so points on the rim keep a positive `z`
const HEMISPHERE_EPSILON: f32 = 0.001;

/// Cursor movements shorter than this on the sphere produce no rotation
pub const VELOCITY_THRESHOLD: f32 = 0.0001;

/// Axis-angle rotation produced by a drag step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    /// Rotation axis; not necessarily normalized
    pub axis: Vec3,
    /// Rotation angle in degrees
    pub angle_degrees: f32,
}

/// Cursor-to-sphere mapping for a viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trackball {
    width: f32,
    height: f32,
}

impl Trackball {
    /// Trackball over a `width` × `height` viewport
    pub fn new(width: u32, height: u32) -> Self {
        let mut trackball = Self { width: 1.0, height: 1.0 };
        trackball.set_viewport(width, height);
        trackball
    }

    /// Track a resized viewport. Zero dimensions are ignored.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.width = width as f32;
        self.height = height as f32;
    }

    /// Current viewport size
    pub fn viewport(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    /// Map a cursor position to a unit vector on the trackball
    ///
    /// `x` is normalized by the viewport height and `y` by the width, then
    /// the point is lifted onto the hemisphere `z = sqrt(1 + ε - d²)` with
    /// `d` clamped to 1.
    pub fn map(&self, x: f64, y: f64) -> Vec3 {
        let (w, h) = (f64::from(self.width), f64::from(self.height));
        let px = ((2.0 * x - h) / h) as f32;
        let py = ((w - 2.0 * y) / w) as f32;

        let d = px.hypot(py).min(1.0);
        let pz = (1.0 + HEMISPHERE_EPSILON - d * d).sqrt();

        let point = Vec3::new(px, py, pz);
        let length = point.norm();
        if length.is_finite() && length > 0.0 {
            point / length
        } else {
            Vec3::z()
        }
    }

    /// Rotation carrying `previous` onto `current`
    ///
    /// `None` when the cursor barely moved or the two points are parallel.
    pub fn rotation_between(previous: &Vec3, current: &Vec3) -> Option<Rotation> {
        if (current - previous).norm() <= VELOCITY_THRESHOLD {
            return None;
        }

        let axis = previous.cross(current);
        if axis.norm() <= f32::EPSILON {
            return None;
        }

        let cosine = previous.dot(current).clamp(-1.0, 1.0);
        let angle_degrees = utils::rad_to_deg(cosine.acos());
        if !angle_degrees.is_finite() {
            return None;
        }

        Some(Rotation { axis, angle_degrees })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mapped_points_are_unit_length() {
        let trackball = Trackball::new(640, 480);
        for &(x, y) in &[(0.0, 0.0), (320.0, 240.0), (639.0, 479.0), (-500.0, 2000.0), (240.0, 320.0)] {
            assert_relative_eq!(trackball.map(x, y).norm(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn mapping_uses_height_for_x_and_width_for_y() {
        let trackball = Trackball::new(400, 200);
        // x' = (2*200 - 200)/200 = 1, y' = (400 - 2*200)/400 = 0
        let p = trackball.map(200.0, 200.0);
        assert_relative_eq!(p.y, 0.0, epsilon = 1e-6);
        assert!(p.x > 0.99);
        assert!(p.z > 0.0);
    }

    #[test]
    fn outside_the_disk_stays_on_the_front_hemisphere() {
        let trackball = Trackball::new(100, 100);
        let p = trackball.map(10_000.0, 10_000.0);
        assert!(p.z > 0.0);
        assert!(p.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn identical_points_give_no_rotation() {
        let trackball = Trackball::new(640, 480);
        let p = trackball.map(100.0, 100.0);
        assert!(Trackball::rotation_between(&p, &p).is_none());
    }

    #[test]
    fn tiny_motion_below_threshold_gives_no_rotation() {
        let a = Vec3::new(0.0, 0.0, 1.0);
        let b = Vec3::new(0.00005, 0.0, 1.0).normalize();
        assert!(Trackball::rotation_between(&a, &b).is_none());
    }

    #[test]
    fn quarter_turn_between_axes() {
        let rotation = Trackball::rotation_between(&Vec3::z(), &Vec3::x()).unwrap();
        assert_relative_eq!(rotation.angle_degrees, 90.0, epsilon = 1e-4);
        assert_relative_eq!(rotation.axis, Vec3::y(), epsilon = 1e-6);
    }

    #[test]
    fn opposite_points_have_no_axis() {
        assert!(Trackball::rotation_between(&Vec3::z(), &-Vec3::z()).is_none());
    }

    #[test]
    fn zero_sized_viewport_is_ignored() {
        let mut trackball = Trackball::new(640, 480);
        trackball.set_viewport(0, 0);
        assert_eq!(trackball.viewport(), (640.0, 480.0));
    }
}
