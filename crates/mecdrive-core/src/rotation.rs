//! Heading rotation between the robot frame and the world frame.
//!
//! Both transforms act on `[x, y, ψ]` vectors: a standard 2D rotation in
//! the x/y block with the heading component passed through unchanged.

use nalgebra::Matrix3;

/// Rotation by heading `psi`, embedded in the 3-dimensional pose space.
///
/// ```text
/// [ cos ψ  -sin ψ  0 ]
/// [ sin ψ   cos ψ  0 ]
/// [   0       0    1 ]
/// ```
///
/// Maps robot-frame vectors to world-frame; the transpose maps back.
#[must_use]
pub fn rotation_matrix(psi: f64) -> Matrix3<f64> {
    let (sin, cos) = psi.sin_cos();
    Matrix3::new(
        cos, -sin, 0.0, //
        sin, cos, 0.0, //
        0.0, 0.0, 1.0,
    )
}

/// Time derivative of [`rotation_matrix`] for angular velocity `psi_dot`.
///
/// Same structure with cos/sin swapped and sign-negated, scaled by ψ̇; the
/// heading row/column derivative is zero. Supplies the Coriolis-like terms
/// of the dynamics model.
#[must_use]
pub fn rotation_matrix_derivative(psi: f64, psi_dot: f64) -> Matrix3<f64> {
    let (sin, cos) = psi.sin_cos();
    Matrix3::new(
        -sin, -cos, 0.0, //
        cos, -sin, 0.0, //
        0.0, 0.0, 0.0,
    ) * psi_dot
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    #[test]
    fn zero_heading_is_identity() {
        assert_relative_eq!(rotation_matrix(0.0), Matrix3::identity(), epsilon = 1e-15);
    }

    #[test]
    fn rotation_is_orthogonal() {
        let rot = rotation_matrix(0.73);
        assert_relative_eq!(rot * rot.transpose(), Matrix3::identity(), epsilon = 1e-12);
        assert_relative_eq!(rot.determinant(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn heading_component_passes_through() {
        let rot = rotation_matrix(1.2);
        let v = rot * Vector3::new(0.0, 0.0, 3.5);
        assert_relative_eq!(v[2], 3.5, epsilon = 1e-15);
        assert_relative_eq!(v[0], 0.0, epsilon = 1e-15);
        assert_relative_eq!(v[1], 0.0, epsilon = 1e-15);
    }

    #[test]
    fn derivative_matches_finite_difference() {
        let psi = 0.4;
        let psi_dot = 2.1;
        let h = 1e-7;

        let analytic = rotation_matrix_derivative(psi, psi_dot);
        // d/dt R(ψ(t)) = dR/dψ · ψ̇
        let numeric = (rotation_matrix(psi + h) - rotation_matrix(psi - h)) / (2.0 * h) * psi_dot;
        assert_relative_eq!(analytic, numeric, epsilon = 1e-6);
    }

    #[test]
    fn derivative_scales_linearly_with_angular_velocity() {
        let a = rotation_matrix_derivative(0.9, 1.0);
        let b = rotation_matrix_derivative(0.9, -2.5);
        assert_relative_eq!(b, a * -2.5, epsilon = 1e-12);
    }
}
