//! Symmetric second-order tensors in a 2-D Cartesian frame.
//!
//! ```text
//!       | XX  XY |
//! T  =  |        |
//!       | XY  YY |
//! ```
//!
//! A real symmetric matrix always has real eigenvalues and an orthonormal eigenbasis, so the
//! decomposition below is closed-form. When the two eigenvalues coincide the tensor is
//! degenerate and its principal directions carry no information.

use crate::error::{FieldError, Result};
use crate::float::approx_eq;
use crate::geom::Vector2;
use nalgebra::Matrix2;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};
use std::fmt;
use std::ops::{Add, Mul, Sub};

/// Principal directions reported for a degenerate tensor.
pub const DEGENERATE_DIRECTIONS: (f64, f64) = (FRAC_PI_4, 3.0 * FRAC_PI_4);

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Tensor {
    pub xx: f64,
    pub yy: f64,
    pub xy: f64,
}

/// Eigenvalues with their principal directions (radians). `value1 >= value2` as computed;
/// `direction1` is the direction of the eigenvector belonging to `value1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Eigen {
    pub value1: f64,
    pub value2: f64,
    pub direction1: f64,
    pub direction2: f64,
    pub degenerate: bool,
}

impl Tensor {
    pub fn new(xx: f64, yy: f64, xy: f64) -> Self {
        Self { xx, yy, xy }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn identity() -> Self {
        Self::new(1.0, 1.0, 0.0)
    }

    pub fn is_zero(&self) -> bool {
        approx_eq(self.xx.abs() + self.yy.abs() + self.xy.abs(), 0.0)
    }

    pub fn approx_eq(&self, other: &Tensor) -> bool {
        approx_eq(self.xx, other.xx) && approx_eq(self.yy, other.yy) && approx_eq(self.xy, other.xy)
    }

    pub fn det(&self) -> f64 {
        self.xx * self.yy - self.xy * self.xy
    }

    /// First invariant, the trace.
    pub fn i1(&self) -> f64 {
        self.xx + self.yy
    }

    /// Second invariant, `XX * YY - XY^2`.
    pub fn i2(&self) -> f64 {
        self.det()
    }

    /// Frobenius norm.
    pub fn norm(&self) -> f64 {
        (self.xx * self.xx + self.yy * self.yy + 2.0 * self.xy * self.xy).sqrt()
    }

    pub fn to_matrix(&self) -> Matrix2<f64> {
        Matrix2::new(self.xx, self.xy, self.xy, self.yy)
    }

    /// Symmetric part of a 2x2 matrix.
    pub fn from_matrix(m: &Matrix2<f64>) -> Self {
        Self::new(m[(0, 0)], m[(1, 1)], 0.5 * (m[(0, 1)] + m[(1, 0)]))
    }

    /// Rebuilds a tensor from two eigenpairs given as value and direction angle.
    pub fn from_eigen(value1: f64, direction1: f64, value2: f64, direction2: f64) -> Self {
        let (s1, c1) = direction1.sin_cos();
        let (s2, c2) = direction2.sin_cos();
        Self::new(
            value1 * c1 * c1 + value2 * c2 * c2,
            value1 * s1 * s1 + value2 * s2 * s2,
            value1 * s1 * c1 + value2 * s2 * c2,
        )
    }

    /// Closed-form eigen decomposition.
    pub fn eigen(&self) -> Eigen {
        let a = 0.5 * (self.xx + self.yy);
        let half_diff = 0.5 * (self.xx - self.yy);
        let r = (half_diff * half_diff + self.xy * self.xy).sqrt();
        let value1 = a + r;
        let value2 = a - r;
        if approx_eq(value1, value2) {
            let (direction1, direction2) = DEGENERATE_DIRECTIONS;
            return Eigen {
                value1,
                value2,
                direction1,
                direction2,
                degenerate: true,
            };
        }

        let mut direction1 = 0.5 * (2.0 * self.xy).atan2(self.xx - self.yy);
        if direction1 <= -FRAC_PI_2 {
            direction1 += PI;
        }
        let direction2 = if direction1 > 0.0 {
            direction1 - FRAC_PI_2
        } else {
            direction1 + FRAC_PI_2
        };
        Eigen {
            value1,
            value2,
            direction1,
            direction2,
            degenerate: false,
        }
    }

    /// Components in a frame rotated counter-clockwise by `theta`.
    pub fn rotate(&self, theta: f64) -> Self {
        let (s, c) = theta.sin_cos();
        self.transform(&Matrix2::new(c, s, -s, c))
    }

    /// Similarity transform `Q T Q^T`.
    pub fn transform(&self, q: &Matrix2<f64>) -> Self {
        Self::from_matrix(&(q * self.to_matrix() * q.transpose()))
    }

    /// Traction on the plane whose normal is `normal`.
    pub fn traction(&self, normal: &Vector2) -> Result<Vector2> {
        let len = normal.norm();
        if !len.is_finite() || approx_eq(len, 0.0) {
            return Err(FieldError::InvalidArgument(
                "traction needs a non-zero normal".to_string(),
            ));
        }
        Ok(self.to_matrix() * (normal / len))
    }
}

impl Add for Tensor {
    type Output = Tensor;

    fn add(self, rhs: Tensor) -> Tensor {
        Tensor::new(self.xx + rhs.xx, self.yy + rhs.yy, self.xy + rhs.xy)
    }
}

impl Sub for Tensor {
    type Output = Tensor;

    fn sub(self, rhs: Tensor) -> Tensor {
        Tensor::new(self.xx - rhs.xx, self.yy - rhs.yy, self.xy - rhs.xy)
    }
}

impl Mul<f64> for Tensor {
    type Output = Tensor;

    fn mul(self, rhs: f64) -> Tensor {
        Tensor::new(self.xx * rhs, self.yy * rhs, self.xy * rhs)
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:e}, {:e}, {:e}", self.xx, self.yy, self.xy)
    }
}

/// Distance between two undirected orientations, in `[0, pi/2]`.
pub fn orientation_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).abs() % PI;
    if d > FRAC_PI_2 {
        PI - d
    } else {
        d
    }
}

/// Shifts `angle` by a multiple of pi to the representative closest to `reference`.
pub fn recenter_angle(angle: f64, reference: f64) -> f64 {
    let turns = ((reference - angle) / PI).round();
    angle + turns * PI
}

#[cfg(test)]
mod tests {
    use super::{orientation_distance, recenter_angle, Tensor};
    use crate::geom::Vector2;
    use nalgebra::SymmetricEigen;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    struct Case {
        tensor: Tensor,
        value1: f64,
        value2: f64,
        direction1: f64,
        direction2: f64,
        degenerate: bool,
    }

    fn reference_cases() -> Vec<Case> {
        vec![
            Case {
                tensor: Tensor::new(20.0, 40.0, 10.0),
                value1: 44.1421356237310,
                value2: 15.8578643762690,
                direction1: 1.178097245096172,
                direction2: -0.392699081698724,
                degenerate: false,
            },
            Case {
                tensor: Tensor::new(20.0, 40.0, -10.0),
                value1: 44.1421356237310,
                value2: 15.8578643762690,
                direction1: -1.178097245096172,
                direction2: 0.392699081698724,
                degenerate: false,
            },
            Case {
                tensor: Tensor::new(40.0, 40.0, 10.0),
                value1: 50.0,
                value2: 30.0,
                direction1: FRAC_PI_4,
                direction2: -FRAC_PI_4,
                degenerate: false,
            },
            Case {
                tensor: Tensor::new(40.0, 40.0, -10.0),
                value1: 50.0,
                value2: 30.0,
                direction1: -FRAC_PI_4,
                direction2: FRAC_PI_4,
                degenerate: false,
            },
            Case {
                tensor: Tensor::new(40.0, -10.0, 0.0),
                value1: 40.0,
                value2: -10.0,
                direction1: 0.0,
                direction2: FRAC_PI_2,
                degenerate: false,
            },
            Case {
                tensor: Tensor::new(40.0, 40.0, 0.0),
                value1: 40.0,
                value2: 40.0,
                direction1: FRAC_PI_4,
                direction2: 3.0 * FRAC_PI_4,
                degenerate: true,
            },
        ]
    }

    #[test]
    fn eigen_matches_reference_values() {
        for case in reference_cases() {
            let e = case.tensor.eigen();
            let t = case.tensor;
            assert!((e.value1 - case.value1).abs() < 1e-9, "value1 of {t}");
            assert!((e.value2 - case.value2).abs() < 1e-9, "value2 of {t}");
            assert!((e.direction1 - case.direction1).abs() < 1e-9, "direction1 of {t}");
            assert!((e.direction2 - case.direction2).abs() < 1e-9, "direction2 of {t}");
            assert_eq!(e.degenerate, case.degenerate, "degeneracy of {t}");
        }
    }

    #[test]
    fn eigen_agrees_with_nalgebra() {
        for t in [
            Tensor::new(3.0, -2.0, 1.5),
            Tensor::new(-7.0, 0.5, -4.0),
            Tensor::new(1e-3, 2e-3, 5e-4),
        ] {
            let e = t.eigen();
            let sym = SymmetricEigen::new(t.to_matrix());
            let max = sym.eigenvalues.max();
            let min = sym.eigenvalues.min();
            assert!((e.value1 - max).abs() < 1e-12, "largest eigenvalue of {t}");
            assert!((e.value2 - min).abs() < 1e-12, "smallest eigenvalue of {t}");

            // The direction1 unit vector must be an eigenvector of value1.
            let v = Vector2::new(e.direction1.cos(), e.direction1.sin());
            let residual = t.to_matrix() * v - v * e.value1;
            assert!(residual.norm() < 1e-9, "direction1 of {t} is not an eigenvector");
        }
    }

    #[test]
    fn direction_ranges_hold() {
        for t in [
            Tensor::new(-1.0, 5.0, 0.0),
            Tensor::new(-1.0, 5.0, -0.0),
            Tensor::new(2.0, 1.0, -3.0),
            Tensor::new(0.0, 0.0, 1.0),
        ] {
            let e = t.eigen();
            assert!(e.direction1 > -FRAC_PI_2 && e.direction1 <= FRAC_PI_2, "{t}");
            let gap = (e.direction1 - e.direction2).abs();
            assert!((gap - FRAC_PI_2).abs() < 1e-12, "directions of {t} not orthogonal");
        }
    }

    #[test]
    fn from_eigen_round_trips() {
        for case in reference_cases() {
            let e = case.tensor.eigen();
            let rebuilt = Tensor::from_eigen(e.value1, e.direction1, e.value2, e.direction2);
            assert!((rebuilt - case.tensor).norm() < 1e-9, "rebuild of {}", case.tensor);
        }
    }

    #[test]
    fn rotation_preserves_invariants() {
        let t = Tensor::new(20.0, 40.0, 10.0);
        let r = t.rotate(0.37);
        assert!((r.i1() - t.i1()).abs() < 1e-9);
        assert!((r.i2() - t.i2()).abs() < 1e-9);
        assert!((r.norm() - t.norm()).abs() < 1e-9);

        // Rotating into the principal frame diagonalizes the tensor.
        let e = t.eigen();
        let p = t.rotate(e.direction1);
        assert!(p.xy.abs() < 1e-9);
        assert!((p.xx - e.value1).abs() < 1e-9);
        assert!((p.yy - e.value2).abs() < 1e-9);
    }

    #[test]
    fn traction_uses_unit_normal() {
        let t = Tensor::new(2.0, 3.0, 1.0);
        let v = t.traction(&Vector2::new(0.0, 5.0)).expect("non-zero normal");
        assert!((v.x - 1.0).abs() < 1e-12 && (v.y - 3.0).abs() < 1e-12);
        assert!(t.traction(&Vector2::zeros()).is_err());
    }

    #[test]
    fn arithmetic_and_predicates() {
        let sum = Tensor::new(1.0, 2.0, 4.0) + Tensor::new(4.0, 5.0, 6.0);
        assert!(sum.approx_eq(&Tensor::new(5.0, 7.0, 10.0)));
        let diff = Tensor::new(1.0, 2.0, 4.0) - Tensor::new(4.0, 5.0, 6.0);
        assert!(diff.approx_eq(&Tensor::new(-3.0, -3.0, -2.0)));
        assert!((Tensor::new(1.0, 2.0, 4.0) * 3.0).approx_eq(&Tensor::new(3.0, 6.0, 12.0)));
        assert!(Tensor::zero().is_zero());
        assert!(!Tensor::identity().is_zero());
        assert_eq!(Tensor::identity().det(), 1.0);
    }

    #[test]
    fn orientation_distance_is_mod_pi() {
        assert!(orientation_distance(0.1, 0.1 + PI).abs() < 1e-12);
        assert!((orientation_distance(0.0, 3.0 * FRAC_PI_4) - FRAC_PI_4).abs() < 1e-12);
        assert!((orientation_distance(-FRAC_PI_4, FRAC_PI_4) - FRAC_PI_2).abs() < 1e-12);
        assert!((orientation_distance(1.4, -1.4) - (PI - 2.8)).abs() < 1e-12);
    }

    #[test]
    fn recenter_moves_by_whole_turns() {
        assert!((recenter_angle(-1.4, 1.4) - (PI - 1.4)).abs() < 1e-12);
        assert!((recenter_angle(0.2, 0.0) - 0.2).abs() < 1e-12);
        assert!((recenter_angle(0.2, 2.0 * PI) - (0.2 + 2.0 * PI)).abs() < 1e-12);
    }
}
