//! Hyperstreamlines: curves everywhere tangent to one principal direction of a tensor field.

use crate::error::{FieldError, Result};
use crate::float::approx_eq;
use crate::geom::Point2;
use crate::interp::cubic_hermite;
use crate::solvers::{Rkf45, Rkf45Settings};
use crate::tensor_field::TensorField;
use crate::traits::SlopeFunction;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

/// Which aligned eigen branch a hyperstreamline follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalFamily {
    /// Branch 1 of the aligned field.
    Major,
    /// Branch 2 of the aligned field.
    Minor,
}

/// Slope of one principal direction family of a field with generated nodes.
pub struct PrincipalSlope<'a> {
    field: &'a TensorField,
    family: PrincipalFamily,
}

impl<'a> PrincipalSlope<'a> {
    pub fn new(field: &'a TensorField, family: PrincipalFamily) -> Self {
        Self { field, family }
    }
}

impl SlopeFunction<f64> for PrincipalSlope<'_> {
    fn slope(&self, x: f64, y: f64) -> Result<f64> {
        let direction = match self.family {
            PrincipalFamily::Major => self.field.direction1(x, y)?,
            PrincipalFamily::Minor => self.field.direction2(x, y)?,
        };
        Ok(direction.tan())
    }
}

/// A polyline with the curve's slope `dy/dx` at every vertex.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Streamline {
    points: Vec<Point2>,
    slopes: Vec<f64>,
}

impl Streamline {
    pub fn new(points: Vec<Point2>, slopes: Vec<f64>) -> Result<Self> {
        if points.len() != slopes.len() {
            return Err(FieldError::InvalidArgument(format!(
                "{} points but {} slopes",
                points.len(),
                slopes.len()
            )));
        }
        Ok(Self { points, slopes })
    }

    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    pub fn slopes(&self) -> &[f64] {
        &self.slopes
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Closed when it has at least four vertices and the first and last coincide.
    pub fn is_looped(&self) -> bool {
        let n = self.points.len();
        if n < 4 {
            return false;
        }
        let (first, last) = (self.points[0], self.points[n - 1]);
        approx_eq(first.x, last.x) && approx_eq(first.y, last.y)
    }

    /// Every `y` where the curve crosses the vertical line at `x`, in vertex order.
    ///
    /// Each segment covering `x` (half-open towards its larger abscissa) contributes one
    /// Hermite-interpolated value. The final vertex of an open curve counts as well.
    pub fn y_at(&self, x: f64) -> Vec<f64> {
        let n = self.points.len();
        if n < 2 {
            return Vec::new();
        }
        let mut ys = Vec::with_capacity(2);
        for i in 0..n - 1 {
            let (a, b) = (i, i + 1);
            let (lo, hi) = if self.points[a].x <= self.points[b].x {
                (a, b)
            } else {
                (b, a)
            };
            let (p0, p1) = (self.points[lo], self.points[hi]);
            if x < p0.x || x >= p1.x {
                continue;
            }
            if let Ok(y) = cubic_hermite(
                p0.x,
                p1.x,
                p0.y,
                p1.y,
                self.slopes[lo],
                self.slopes[hi],
                x,
            ) {
                ys.push(y);
            }
        }
        let last = self.points[n - 1];
        if x == last.x && !self.is_looped() {
            ys.push(last.y);
        }
        ys
    }
}

/// Traces the hyperstreamline of `family` through `seed` in both directions until it
/// leaves the domain or `max_steps` points have been produced each way.
pub fn trace_hyperstreamline(
    field: &TensorField,
    family: PrincipalFamily,
    seed: Point2,
    settings: &Rkf45Settings,
    max_steps: usize,
) -> Result<Streamline> {
    let slope = PrincipalSlope::new(field, family);
    // Surfaces staging errors and an out-of-domain seed before integrating.
    slope.slope(seed.x, seed.y)?;

    let mut solver = Rkf45::<f64>::new(*settings);
    let traced = solver.solve(&slope, seed.x, seed.y, max_steps);

    let mut points = Vec::with_capacity(traced.len());
    let mut slopes = Vec::with_capacity(traced.len());
    for (x, y) in traced {
        match slope.slope(x, y) {
            Ok(s) => {
                points.push(Point2::new(x, y));
                slopes.push(s);
            }
            Err(err) => trace!("dropping streamline vertex ({x}, {y}): {err}"),
        }
    }
    debug!(
        "{family:?} hyperstreamline through ({}, {}) has {} vertices",
        seed.x,
        seed.y,
        points.len()
    );
    Streamline::new(points, slopes)
}

#[cfg(test)]
mod tests {
    use super::{trace_hyperstreamline, PrincipalFamily, Streamline};
    use crate::error::FieldError;
    use crate::geom::{Point2, Rect};
    use crate::quantity::TensorQty;
    use crate::settings::FieldSettings;
    use crate::solvers::Rkf45Settings;
    use crate::tensor_field::TensorField;
    use std::f64::consts::FRAC_PI_8;

    fn uniform_field() -> TensorField {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0).expect("valid rect");
        let mut samples = Vec::new();
        for i in 0..=10 {
            for j in 0..=10 {
                samples.push(TensorQty::from_components(i as f64, j as f64, 20.0, 40.0, 10.0));
            }
        }
        let mut field =
            TensorField::new(rect, 5, 5, samples, FieldSettings::default()).expect("valid field");
        field.align().expect("aligned");
        field.gen_nodes().expect("nodes");
        field
    }

    #[test]
    fn major_family_is_a_straight_line_in_a_uniform_field() {
        let field = uniform_field();
        let seed = Point2::new(5.0, 5.0);
        let line = trace_hyperstreamline(
            &field,
            PrincipalFamily::Major,
            seed,
            &Rkf45Settings::default(),
            500,
        )
        .expect("traced");
        let slope = (3.0 * FRAC_PI_8).tan();
        assert!(line.len() > 2);
        for p in line.points() {
            assert!(
                (p.y - 5.0 - slope * (p.x - 5.0)).abs() < 1e-6,
                "({}, {}) is off the line",
                p.x,
                p.y
            );
        }
        let first = line.points()[0];
        let last = line.points()[line.len() - 1];
        assert!(first.y < 0.01, "backward trace ended at y = {}", first.y);
        assert!(last.y > 9.99, "forward trace ended at y = {}", last.y);
        for s in line.slopes() {
            assert!((s - slope).abs() < 1e-6);
        }
    }

    #[test]
    fn minor_family_is_perpendicular() {
        let field = uniform_field();
        let line = trace_hyperstreamline(
            &field,
            PrincipalFamily::Minor,
            Point2::new(5.0, 5.0),
            &Rkf45Settings::default(),
            500,
        )
        .expect("traced");
        let slope = (-FRAC_PI_8).tan();
        for p in line.points() {
            assert!((p.y - 5.0 - slope * (p.x - 5.0)).abs() < 1e-6);
        }
        let last = line.points()[line.len() - 1];
        assert!(last.x > 9.99, "forward trace ended at x = {}", last.x);
    }

    #[test]
    fn tracing_needs_nodes_and_an_inside_seed() {
        let rect = Rect::new(0.0, 0.0, 1.0, 1.0).expect("valid rect");
        let samples = vec![TensorQty::from_components(0.5, 0.5, 1.0, 2.0, 0.0)];
        let mut field =
            TensorField::new(rect, 1, 1, samples, FieldSettings::default()).expect("valid");
        field.align().expect("aligned");
        let seed = Point2::new(0.5, 0.5);
        let settings = Rkf45Settings::default();
        assert_eq!(
            trace_hyperstreamline(&field, PrincipalFamily::Major, seed, &settings, 10),
            Err(FieldError::NodesNotGenerated)
        );
        field.gen_nodes().expect("nodes");
        let outside = Point2::new(2.0, 0.5);
        assert!(matches!(
            trace_hyperstreamline(&field, PrincipalFamily::Major, outside, &settings, 10),
            Err(FieldError::OutOfDomain { .. })
        ));
    }

    #[test]
    fn y_at_interpolates_between_vertices() {
        // y = x^2 with exact slopes.
        let line = Streamline::new(
            vec![Point2::new(0.0, 0.0), Point2::new(1.0, 1.0), Point2::new(2.0, 4.0)],
            vec![0.0, 2.0, 4.0],
        )
        .expect("matching lengths");
        let ys = line.y_at(1.5);
        assert_eq!(ys.len(), 1);
        assert!((ys[0] - 2.25).abs() < 1e-12);
        assert_eq!(line.y_at(2.0), vec![4.0]);
        assert!(line.y_at(3.0).is_empty());
        assert!(!line.is_looped());
    }

    #[test]
    fn loops_cross_a_vertical_line_twice() {
        let line = Streamline::new(
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 1.0),
                Point2::new(2.0, 0.0),
                Point2::new(1.0, -1.0),
                Point2::new(0.0, 0.0),
            ],
            vec![1.0, 1.0, 0.0, -1.0, -1.0],
        )
        .expect("matching lengths");
        assert!(line.is_looped());
        let ys = line.y_at(0.5);
        assert_eq!(ys.len(), 2);
        assert!((ys[0] - 0.5).abs() < 1e-12);
        assert!((ys[1] + 0.5).abs() < 1e-12);
    }

    #[test]
    fn mismatched_slopes_are_rejected() {
        assert!(Streamline::new(vec![Point2::new(0.0, 0.0)], Vec::new()).is_err());
    }
}
