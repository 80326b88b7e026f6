//! Math utilities and types
//!
//! Provides the fundamental 2D math types used by the scene graph. World
//! transforms are homogeneous 3x3 matrices so translation composes through
//! plain matrix multiplication.

pub use nalgebra::{Matrix3, Vector2, Vector3};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3x3 homogeneous matrix type for 2D transforms
pub type Mat3 = Matrix3<f32>;

/// Local transform representing 2D position, rotation, and scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2D {
    /// Position in the parent's space
    pub position: Vec2,

    /// Rotation in radians, counter-clockwise
    pub rotation: f32,

    /// Scale factors
    pub scale: Vec2,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self {
            position: Vec2::zeros(),
            rotation: 0.0,
            scale: Vec2::new(1.0, 1.0),
        }
    }
}

impl Transform2D {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec2) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Convert to a homogeneous transformation matrix (translation * rotation * scale)
    pub fn to_matrix(&self) -> Mat3 {
        let (s, c) = self.rotation.sin_cos();
        Mat3::new(
            c * self.scale.x, -s * self.scale.y, self.position.x,
            s * self.scale.x,  c * self.scale.y, self.position.y,
            0.0,               0.0,              1.0,
        )
    }
}

/// Apply a homogeneous matrix to a 2D point
pub fn transform_point(matrix: &Mat3, point: Vec2) -> Vec2 {
    let v = matrix * Vector3::new(point.x, point.y, 1.0);
    Vec2::new(v.x, v.y)
}

/// Extract the translation column of a homogeneous matrix
pub fn translation_of(matrix: &Mat3) -> Vec2 {
    Vec2::new(matrix[(0, 2)], matrix[(1, 2)])
}

/// Invert a matrix, falling back to identity when it is not invertible
///
/// A zero scale component is the only way a scene transform becomes
/// degenerate; conversions through such a transform collapse to identity
/// rather than producing NaNs.
pub fn invert_or_identity(matrix: &Mat3) -> Mat3 {
    matrix.try_inverse().unwrap_or_else(Mat3::identity)
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// 2 * Pi
    pub const TAU: f32 = 2.0 * PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f32 = 180.0 / PI;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians * constants::RAD_TO_DEG
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn transform_matrix_composes_trs() {
        let t = Transform2D {
            position: Vec2::new(3.0, 4.0),
            rotation: constants::PI / 2.0,
            scale: Vec2::new(2.0, 2.0),
        };

        // A unit X vector scaled by 2 then rotated 90 degrees lands on +Y,
        // then translates by (3, 4).
        let p = transform_point(&t.to_matrix(), Vec2::new(1.0, 0.0));
        assert_relative_eq!(p.x, 3.0, epsilon = 1e-5);
        assert_relative_eq!(p.y, 6.0, epsilon = 1e-5);
    }

    #[test]
    fn degenerate_inverse_falls_back_to_identity() {
        let t = Transform2D {
            scale: Vec2::new(0.0, 1.0),
            ..Default::default()
        };
        assert_eq!(invert_or_identity(&t.to_matrix()), Mat3::identity());
    }
}
