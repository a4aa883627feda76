use crate::error::{FieldError, Result};
use crate::traits::{lit, Scalar, SlopeFunction};
use log::warn;
use serde::{Deserialize, Serialize};

/// Tolerances and limits of the [`Rkf45`] slope integrator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rkf45Settings {
    /// Below this relative error the next step grows by 20%.
    pub rel_err_min: f64,
    /// Above this relative error the step is rejected and retried smaller.
    pub rel_err_max: f64,
    pub initial_step: f64,
    /// A trace stops once two consecutive points are closer than this.
    pub min_distance: f64,
    /// Floor of the magnitude the local error is measured against.
    pub theta: f64,
    /// Failed steps retried (with halved step and tolerances) before a trace gives up.
    pub max_retries: usize,
    /// Error-control rejections allowed within one step.
    pub max_rejections: usize,
}

impl Default for Rkf45Settings {
    fn default() -> Self {
        Self {
            rel_err_min: 1e-10,
            rel_err_max: 1e-9,
            initial_step: 0.1,
            min_distance: 1e-5,
            theta: 1e-200,
            max_retries: 50,
            max_rejections: 64,
        }
    }
}

/// Travel direction of a curve in the plane, kept between steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Direction after reaching a point with slope `s1`, assuming the tangent turns by
    /// less than 90 degrees per step. Without history the sign of `h` decides.
    fn next<T: Scalar>(previous: Option<Direction>, s1: T, h: T) -> Direction {
        let steep = s1.abs() > T::one();
        let rising = s1 >= T::zero();
        match previous {
            None => match (steep, h > T::zero()) {
                (false, true) => Direction::Right,
                (false, false) => Direction::Left,
                (true, true) => Direction::Up,
                (true, false) => Direction::Down,
            },
            Some(Direction::Up) if steep => Direction::Up,
            Some(Direction::Up) if rising => Direction::Right,
            Some(Direction::Up) => Direction::Left,
            Some(Direction::Down) if steep => Direction::Down,
            Some(Direction::Down) if rising => Direction::Left,
            Some(Direction::Down) => Direction::Right,
            Some(Direction::Right) if !steep => Direction::Right,
            Some(Direction::Right) if rising => Direction::Up,
            Some(Direction::Right) => Direction::Down,
            Some(Direction::Left) if !steep => Direction::Left,
            Some(Direction::Left) if rising => Direction::Down,
            Some(Direction::Left) => Direction::Up,
        }
    }
}

/// Runge-Kutta-Fehlberg 4(5) integrator for curves given by their slope.
///
/// Slopes in `[-1, 1]` are integrated along x; steeper ones along y using the reciprocal
/// slope, so vertical tangents are followed without blowing up. The travel direction is
/// remembered per instance and the step sign is flipped when the curve turns across an axis.
pub struct Rkf45<T: Scalar> {
    settings: Rkf45Settings,
    direction: Option<Direction>,
    rel_err_min: T,
    rel_err_max: T,
}

impl<T: Scalar> Rkf45<T> {
    pub fn new(settings: Rkf45Settings) -> Self {
        Self {
            settings,
            direction: None,
            rel_err_min: lit(settings.rel_err_min),
            rel_err_max: lit(settings.rel_err_max),
        }
    }

    pub fn settings(&self) -> &Rkf45Settings {
        &self.settings
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    /// Forgets the travel direction and restores the configured tolerances.
    pub fn reset(&mut self) {
        self.direction = None;
        self.restore_tolerances();
    }

    fn restore_tolerances(&mut self) {
        self.rel_err_min = lit(self.settings.rel_err_min);
        self.rel_err_max = lit(self.settings.rel_err_max);
    }

    fn tighten_tolerances(&mut self) {
        let floor = T::epsilon() * lit(16.0);
        let half = lit::<T>(0.5);
        self.rel_err_min = (self.rel_err_min * half).max(floor);
        self.rel_err_max = (self.rel_err_max * half).max(floor);
    }

    /// One adaptive step from `(x0, y0)` with trial step `h0`. A positive step heads right
    /// (or up, when integrating along y) unless the remembered direction says otherwise.
    ///
    /// Returns the new point and the suggested next step.
    pub fn step<F>(&mut self, f: &F, x0: T, y0: T, h0: T) -> Result<(T, T, T)>
    where
        F: SlopeFunction<T> + ?Sized,
    {
        let s1 = f.slope(x0, y0)?;
        if s1.is_nan() {
            return Err(FieldError::IntegrationFailed(format!(
                "undefined slope at ({x0:?}, {y0:?})"
            )));
        }
        let dir = Direction::next(self.direction, s1, h0);
        let mut h = h0;
        let next = if s1.abs() <= T::one() {
            if matches!(
                (self.direction, dir),
                (Some(Direction::Up), Direction::Left) | (Some(Direction::Down), Direction::Right)
            ) {
                h = -h;
            }
            self.embedded_step(&|x, y| f.slope(x, y), x0, y0, h, s1)?
        } else {
            if matches!(
                (self.direction, dir),
                (Some(Direction::Right), Direction::Down) | (Some(Direction::Left), Direction::Up)
            ) {
                h = -h;
            }
            // In the swapped frame the first coordinate is y; the slope is dx/dy.
            let swapped = |u: T, v: T| -> Result<T> {
                let d = f.slope(v, u)?;
                if d == T::zero() {
                    Ok(T::infinity())
                } else {
                    Ok(d.recip())
                }
            };
            let (y1, x1, h1) = self.embedded_step(&swapped, y0, x0, h, s1.recip())?;
            (x1, y1, h1)
        };
        self.direction = Some(dir);
        Ok(next)
    }

    /// Fehlberg 4(5) embedded pair along the first coordinate.
    fn embedded_step<G>(&self, f: &G, x0: T, y0: T, h0: T, s1: T) -> Result<(T, T, T)>
    where
        G: Fn(T, T) -> Result<T>,
    {
        let c = |v: f64| lit::<T>(v);
        let theta = c(self.settings.theta);
        let mut h = h0;
        let mut first_rejection = true;
        for _ in 0..=self.settings.max_rejections {
            let hs1 = h * s1;
            let s2 = f(x0 + c(0.25) * h, y0 + c(0.25) * hs1)?;
            let hs2 = h * s2;
            let s3 = f(
                x0 + c(3.0 / 8.0) * h,
                y0 + c(3.0 / 32.0) * hs1 + c(9.0 / 32.0) * hs2,
            )?;
            let hs3 = h * s3;
            let s4 = f(
                x0 + c(12.0 / 13.0) * h,
                y0 + c(1932.0 / 2197.0) * hs1 - c(7200.0 / 2197.0) * hs2
                    + c(7296.0 / 2197.0) * hs3,
            )?;
            let hs4 = h * s4;
            let s5 = f(
                x0 + h,
                y0 + c(439.0 / 216.0) * hs1 - c(8.0) * hs2 + c(3680.0 / 513.0) * hs3
                    - c(845.0 / 4104.0) * hs4,
            )?;
            let hs5 = h * s5;
            let s6 = f(
                x0 + c(0.5) * h,
                y0 - c(8.0 / 27.0) * hs1 + c(2.0) * hs2 - c(3544.0 / 2565.0) * hs3
                    + c(1859.0 / 4104.0) * hs4
                    - c(11.0 / 40.0) * hs5,
            )?;

            let x1 = x0 + h;
            // 4th order solution, and the 5th order one used for the error estimate.
            let y1 = y0
                + h * (c(25.0 / 216.0) * s1 + c(1408.0 / 2565.0) * s3 + c(2197.0 / 4104.0) * s4
                    - c(0.2) * s5);
            let z1 = y0
                + h * (c(16.0 / 135.0) * s1
                    + c(6656.0 / 12825.0) * s3
                    + c(28561.0 / 56430.0) * s4
                    - c(9.0 / 50.0) * s5
                    + c(2.0 / 55.0) * s6);

            let rel_err = (z1 - y1).abs() / y0.abs().max(theta);
            if rel_err <= self.rel_err_max {
                let next = if rel_err < self.rel_err_min {
                    c(1.2) * h
                } else {
                    h
                };
                return Ok((x1, y1, next));
            }
            if first_rejection {
                h = c(0.8) * h * (self.rel_err_max / rel_err).powf(c(0.2));
                first_rejection = false;
            } else {
                h = c(0.5) * h;
            }
        }
        Err(FieldError::IntegrationFailed(format!(
            "step rejected {} times at ({x0:?}, {y0:?})",
            self.settings.max_rejections + 1
        )))
    }

    /// Repeated steps from `(x0, y0)`, initially heading right/up when `forward`.
    ///
    /// A failing step is retried with halved step size and tolerances. The trace ends after
    /// `max_steps` points, when consecutive points get closer than `min_distance`, or when
    /// the retries run out. The seed itself is not included.
    pub fn trace<F>(&mut self, f: &F, x0: T, y0: T, forward: bool, max_steps: usize) -> Vec<(T, T)>
    where
        F: SlopeFunction<T> + ?Sized,
    {
        self.reset();
        let min_distance = lit::<T>(self.settings.min_distance);
        let mut h = lit::<T>(self.settings.initial_step);
        if !forward {
            h = -h;
        }
        let (mut x, mut y) = (x0, y0);
        let mut points = Vec::with_capacity(max_steps);
        'steps: for _ in 0..max_steps {
            let mut retries = 0;
            let (x1, y1, h1) = loop {
                match self.step(f, x, y, h) {
                    Ok(next) => {
                        self.restore_tolerances();
                        break next;
                    }
                    Err(err) => {
                        retries += 1;
                        if retries > self.settings.max_retries {
                            warn!(
                                "trace stopped at ({x:?}, {y:?}) after {} retries: {err}",
                                self.settings.max_retries
                            );
                            break 'steps;
                        }
                        self.tighten_tolerances();
                        h = h * lit(0.5);
                    }
                }
            };
            if (x1 - x).hypot(y1 - y) < min_distance {
                break;
            }
            points.push((x1, y1));
            x = x1;
            y = y1;
            h = h1;
        }
        self.reset();
        points
    }

    /// Traces both ways from the seed and splices the results: the backward trace reversed,
    /// the seed, then the forward trace.
    pub fn solve<F>(&mut self, f: &F, x0: T, y0: T, max_steps: usize) -> Vec<(T, T)>
    where
        F: SlopeFunction<T> + ?Sized,
    {
        let forward = self.trace(f, x0, y0, true, max_steps);
        let mut points = self.trace(f, x0, y0, false, max_steps);
        points.reverse();
        points.push((x0, y0));
        points.extend(forward);
        points
    }
}

#[cfg(test)]
mod tests {
    use super::{Direction, Rkf45, Rkf45Settings};
    use crate::error::{FieldError, Result};

    const LIMIT: f64 = 100.0;

    fn in_domain(x: f64, y: f64) -> Result<()> {
        if x.abs() > LIMIT || y.abs() > LIMIT {
            return Err(FieldError::OutOfDomain { x, y });
        }
        Ok(())
    }

    // dy/dx = x y + x^3 with y(0) = 1 has y = 3 exp(x^2 / 2) - x^2 - 2.
    fn cubic_growth(x: f64, y: f64) -> Result<f64> {
        in_domain(x, y)?;
        Ok(x * y + x * x * x)
    }

    fn cubic_growth_exact(x: f64) -> f64 {
        3.0 * (0.5 * x * x).exp() - x * x - 2.0
    }

    // dy/dx = -x / y: circles around the origin.
    fn circle(x: f64, y: f64) -> Result<f64> {
        in_domain(x, y)?;
        Ok(-x / y)
    }

    #[test]
    fn single_step_is_accurate() {
        let mut solver = Rkf45::<f64>::new(Rkf45Settings::default());
        let (x1, y1, h1) = solver.step(&cubic_growth, 0.0, 1.0, 0.1).expect("step");
        assert!(x1 > 0.0 && x1 <= 0.1, "x1 was {x1}");
        assert!((y1 - cubic_growth_exact(x1)).abs() < 1e-8, "y1 was {y1}");
        assert!(h1 > 0.0);
        assert_eq!(solver.direction(), Some(Direction::Right));
    }

    #[test]
    fn direction_state_is_per_instance() {
        let mut a = Rkf45::<f64>::new(Rkf45Settings::default());
        let b = Rkf45::<f64>::new(Rkf45Settings::default());
        a.step(&circle, 3.0, 0.0, -0.1).expect("step");
        assert_eq!(a.direction(), Some(Direction::Down));
        assert_eq!(b.direction(), None);
        a.reset();
        assert_eq!(a.direction(), None);
    }

    #[test]
    fn steep_slopes_integrate_along_y() {
        let mut solver = Rkf45::<f64>::new(Rkf45Settings::default());
        let (x1, y1, _) = solver.step(&circle, 3.0, 0.0, 0.1).expect("step");
        assert_eq!(solver.direction(), Some(Direction::Up));
        assert!(y1 > 0.0 && y1 <= 0.1, "y1 was {y1}");
        assert!((x1.hypot(y1) - 3.0).abs() < 1e-8);
    }

    #[test]
    fn trace_follows_known_solution_to_the_boundary() {
        let mut solver = Rkf45::<f64>::new(Rkf45Settings::default());
        let points = solver.trace(&cubic_growth, 0.0, 1.0, true, 5000);
        assert!(!points.is_empty());
        for &(x, y) in &points {
            let exact = cubic_growth_exact(x);
            assert!(
                (y - exact).abs() <= 1e-5 * exact.abs(),
                "({x}, {y}) is off the solution {exact}"
            );
        }
        let &(_, last_y) = points.last().expect("non-empty");
        assert!(last_y > 99.9 && last_y <= LIMIT, "trace ended at y = {last_y}");
        assert_eq!(solver.direction(), None);
    }

    #[test]
    fn trace_goes_around_a_circle() {
        let mut solver = Rkf45::<f64>::new(Rkf45Settings::default());
        let points = solver.trace(&circle, 3.0, 0.0, true, 1000);
        assert_eq!(points.len(), 1000);
        for &(x, y) in &points {
            assert!((x.hypot(y) - 3.0).abs() < 1e-5, "({x}, {y}) left the circle");
        }
        assert!(points.iter().any(|&(x, _)| x < -2.9));
        assert!(points.iter().any(|&(_, y)| y < -2.9));
    }

    #[test]
    fn solve_splices_both_directions() {
        let mut solver = Rkf45::<f64>::new(Rkf45Settings::default());
        let points = solver.solve(&circle, 3.0, 0.0, 20);
        assert_eq!(points.len(), 41);
        assert_eq!(points[20], (3.0, 0.0));
        assert!(points[0].1 < 0.0);
        assert!(points[40].1 > 0.0);
    }

    #[test]
    fn trace_from_outside_the_domain_is_empty() {
        let mut solver = Rkf45::<f64>::new(Rkf45Settings {
            max_retries: 3,
            ..Rkf45Settings::default()
        });
        assert!(solver.trace(&circle, 200.0, 0.0, true, 10).is_empty());
    }
}
