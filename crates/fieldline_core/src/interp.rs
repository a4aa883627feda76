//! Interpolation kernels: inverse distance weighting over scattered samples, its
//! orientation-aware variant, the neighbourhood-widening rule that feeds them, and a
//! two-point cubic Hermite used along traced curves.

use crate::error::{FieldError, Result};
use crate::float::approx_eq;
use crate::geom::Point2;
use crate::grid::Grid;
use crate::quantity::{ScalarQty, TensorQty};
use crate::settings::FieldSettings;
use log::trace;

/// Power used when nothing else is configured.
pub const DEFAULT_IDW_POWER: f64 = 3.0;

/// Inverse-distance weights of a sample set relative to one query point.
///
/// Computing the weights once lets several components (XX, YY, XY) share them.
#[derive(Debug, Clone)]
pub struct IdwWeights {
    exact: Option<usize>,
    weights: Vec<f64>,
    total: f64,
    len: usize,
}

impl IdwWeights {
    /// `EmptyInput` when `points` is empty. A point at (numerically) zero distance makes
    /// every subsequent evaluation return that sample's value unchanged.
    pub fn new<I>(points: I, x: f64, y: f64, power: f64) -> Result<Self>
    where
        I: IntoIterator<Item = Point2>,
    {
        let mut weights = Vec::new();
        let mut total = 0.0;
        let mut exact = None;
        let mut len = 0;
        for (i, p) in points.into_iter().enumerate() {
            len += 1;
            if exact.is_some() {
                continue;
            }
            let d = (p.x - x).hypot(p.y - y);
            if approx_eq(d, 0.0) {
                exact = Some(i);
                continue;
            }
            let w = 1.0 / d.powf(power);
            weights.push(w);
            total += w;
        }
        if len == 0 {
            return Err(FieldError::EmptyInput);
        }
        Ok(Self {
            exact,
            weights,
            total,
            len,
        })
    }

    /// Collects `values`, which must match the points one to one.
    fn matching(&self, values: impl IntoIterator<Item = f64>) -> Result<Vec<f64>> {
        let values: Vec<f64> = values.into_iter().collect();
        if values.len() != self.len {
            return Err(FieldError::InvalidArgument(format!(
                "{} values for {} weighted points",
                values.len(),
                self.len
            )));
        }
        Ok(values)
    }

    /// Weighted mean of `values`, given in the same order as the points.
    pub fn mean<I>(&self, values: I) -> Result<f64>
    where
        I: IntoIterator<Item = f64>,
    {
        let values = self.matching(values)?;
        if let Some(i) = self.exact {
            return Ok(values[i]);
        }
        let sum: f64 = values.iter().zip(&self.weights).map(|(v, w)| v * w).sum();
        Ok(sum / self.total)
    }

    /// Weighted mean orientation of undirected `angles` (radians, mod pi).
    ///
    /// Averages the doubled-angle unit vectors and halves the result, so `theta` and
    /// `theta + pi` count as the same orientation. When the vectors cancel out the angle
    /// of the heaviest sample is returned.
    pub fn orientation<I>(&self, angles: I) -> Result<f64>
    where
        I: IntoIterator<Item = f64>,
    {
        let angles = self.matching(angles)?;
        if let Some(i) = self.exact {
            return Ok(angles[i]);
        }
        let mut sx = 0.0;
        let mut sy = 0.0;
        let mut heaviest = (f64::NEG_INFINITY, 0.0);
        for (&angle, &w) in angles.iter().zip(&self.weights) {
            let (s, c) = (2.0 * angle).sin_cos();
            sx += w * c;
            sy += w * s;
            if w > heaviest.0 {
                heaviest = (w, angle);
            }
        }
        if approx_eq(sx.hypot(sy), 0.0) {
            return Ok(heaviest.1);
        }
        Ok(0.5 * sy.atan2(sx))
    }
}

/// Inverse distance weighted value at `(x, y)`.
pub fn idw(samples: &[ScalarQty], x: f64, y: f64, power: f64) -> Result<f64> {
    let weights = IdwWeights::new(samples.iter().map(|s| s.point()), x, y, power)?;
    weights.mean(samples.iter().map(|s| s.value))
}

/// Predicted branch-1 orientation at `(x, y)` from the samples' `direction1`.
pub fn idw_orientation(samples: &[&TensorQty], x: f64, y: f64, power: f64) -> Result<f64> {
    let weights = IdwWeights::new(samples.iter().map(|s| s.point()), x, y, power)?;
    weights.orientation(samples.iter().map(|s| s.direction1))
}

/// Outcome of one neighbourhood-widening step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Widening {
    /// Enough samples were found; interpolate with them.
    Interpolate,
    /// Look one layer further out.
    Widen,
    /// The last layer was reached without enough samples.
    Exhausted,
}

/// Decides what to do after finding `found` samples within `layer` rings of cells.
pub fn widening_decision(layer: usize, found: usize, settings: &FieldSettings) -> Widening {
    if layer >= settings.max_layer() && found < settings.min_neighbor_count {
        return Widening::Exhausted;
    }
    if found >= settings.max_neighbor_count {
        return Widening::Interpolate;
    }
    if found >= settings.min_neighbor_count && layer > settings.min_neighbor_layer {
        return Widening::Interpolate;
    }
    Widening::Widen
}

/// Sample indices gathered around cell `(xi, yi)` by repeatedly applying
/// [`widening_decision`], or `None` when the neighbourhood is exhausted.
pub fn neighborhood(
    grid: &Grid,
    xi: usize,
    yi: usize,
    settings: &FieldSettings,
) -> Result<Option<Vec<usize>>> {
    let mut layer = settings.min_neighbor_layer;
    loop {
        let found = grid.near_qty_indices_at(xi, yi, layer)?;
        match widening_decision(layer, found.len(), settings) {
            Widening::Interpolate if !found.is_empty() => return Ok(Some(found)),
            Widening::Interpolate | Widening::Exhausted => return Ok(None),
            Widening::Widen => {
                trace!(
                    "cell ({xi}, {yi}): {} samples at layer {layer}, widening",
                    found.len()
                );
                layer += 1;
            }
        }
    }
}

/// Two-point cubic Hermite interpolation between `(x0, y0)` and `(x1, y1)` with end
/// slopes `d0` and `d1`.
pub fn cubic_hermite(x0: f64, x1: f64, y0: f64, y1: f64, d0: f64, d1: f64, x: f64) -> Result<f64> {
    if !(x0 < x1) || x < x0 || x > x1 {
        return Err(FieldError::InvalidArgument(format!(
            "hermite abscissa {x} must lie in [{x0}, {x1}] with {x0} < {x1}"
        )));
    }
    let h = x1 - x0;
    let hl = x - x0;
    let hr = x1 - x;
    Ok(((h + 2.0 * hl) * hr * hr * y0 + (h + 2.0 * hr) * hl * hl * y1) / h.powi(3)
        + (hl * hr * hr * d0 - hr * hl * hl * d1) / h.powi(2))
}
