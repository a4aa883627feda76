//! Scattered symmetric tensor samples reconstructed into a continuous field.
//!
//! Usage is staged: build the field, [`TensorField::align`] the eigen branches of every
//! sample, then [`TensorField::gen_nodes`] to reconstruct a tensor at every grid node.
//! Point queries bilinearly interpolate those node tensors.

use crate::error::{FieldError, Result};
use crate::float::approx_eq;
use crate::geom::Rect;
use crate::grid::Grid;
use crate::interp::{idw_orientation, neighborhood, IdwWeights};
use crate::parse::{bounding_rect, grid_resolution};
use crate::quantity::{ScalarQty, TensorComponent, TensorQty};
use crate::scalar_field::ScalarField;
use crate::settings::FieldSettings;
use crate::tensor::{recenter_angle, Tensor};
use log::{debug, trace, warn};

#[derive(Debug, Clone)]
pub struct TensorField {
    samples: Vec<TensorQty>,
    grid: Grid,
    settings: FieldSettings,
    aligned: bool,
    nodes: Option<Vec<TensorQty>>,
}

impl TensorField {
    /// Indexes `samples` on a `cell_xn x cell_yn` grid over `bounds`.
    ///
    /// Zero tensors are dropped first when `settings.discard_zero_samples` is set. A sample
    /// outside `bounds` is an `OutOfDomain` error.
    pub fn new(
        bounds: Rect,
        cell_xn: usize,
        cell_yn: usize,
        samples: Vec<TensorQty>,
        settings: FieldSettings,
    ) -> Result<Self> {
        settings.validate()?;
        let samples: Vec<TensorQty> = if settings.discard_zero_samples {
            samples.into_iter().filter(|s| !s.tensor.is_zero()).collect()
        } else {
            samples
        };
        let mut grid =
            Grid::with_capacity_hint(bounds, cell_xn, cell_yn, settings.avg_samples_per_cell)?;
        for (i, s) in samples.iter().enumerate() {
            grid.add(s.x, s.y, i)?;
        }
        Ok(Self {
            samples,
            grid,
            settings,
            aligned: false,
            nodes: None,
        })
    }

    /// Builds a field over the samples' bounding rectangle, with a grid resolution chosen
    /// from `settings.avg_samples_per_cell`.
    pub fn from_samples(samples: Vec<TensorQty>, settings: FieldSettings) -> Result<Self> {
        let bounds = bounding_rect(&samples)?;
        let (xn, yn) = grid_resolution(&bounds, samples.len(), settings.avg_samples_per_cell);
        debug!(
            "tensor field over [{}, {}] x [{}, {}] with {xn} x {yn} cells",
            bounds.xmin, bounds.xmax, bounds.ymin, bounds.ymax
        );
        Self::new(bounds, xn, yn, samples, settings)
    }

    pub fn samples(&self) -> &[TensorQty] {
        &self.samples
    }

    pub fn sample(&self, index: usize) -> Result<&TensorQty> {
        self.samples.get(index).ok_or(FieldError::IndexOutOfRange {
            index,
            len: self.samples.len(),
        })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn settings(&self) -> &FieldSettings {
        &self.settings
    }

    pub fn nodes(&self) -> Option<&[TensorQty]> {
        self.nodes.as_deref()
    }

    pub fn is_aligned(&self) -> bool {
        self.aligned
    }

    /// Index of the sample located exactly at `(x, y)`, if any.
    pub fn find(&self, x: f64, y: f64) -> Result<Option<usize>> {
        let cell = self.grid.cell(x, y)?;
        Ok(cell.qty_indices().iter().copied().find(|&i| {
            let s = &self.samples[i];
            approx_eq(s.x, x) && approx_eq(s.y, y)
        }))
    }

    /// Samples within `layer` rings of cells around the cell containing `(x, y)`.
    pub fn near_samples(&self, x: f64, y: f64, layer: usize) -> Result<Vec<&TensorQty>> {
        Ok(self
            .grid
            .near_qty_indices(x, y, layer)?
            .into_iter()
            .map(|i| &self.samples[i])
            .collect())
    }

    /// Makes branch 1 of every sample follow one principal-direction family.
    ///
    /// Alignment starts from the first sample of the first non-empty cell and spreads
    /// cell by cell in row-major order. Calling it again is a no-op.
    pub fn align(&mut self) -> Result<()> {
        if self.aligned {
            return Ok(());
        }
        if self.samples.len() <= 1 {
            for s in &mut self.samples {
                s.aligned = true;
            }
            self.aligned = true;
            return Ok(());
        }

        let seed = self
            .grid
            .cells()
            .iter()
            .find_map(|cell| cell.qty_indices().first().copied())
            .ok_or(FieldError::EmptyInput)?;
        self.samples[seed].aligned = true;
        debug!(
            "aligning {} samples from seed {seed} at ({}, {})",
            self.samples.len(),
            self.samples[seed].x,
            self.samples[seed].y
        );

        let full_layer = self.grid.full_layer();
        let mut swaps = 0usize;
        for ci in 0..self.grid.cell_count() {
            let (xi, yi) = self.grid.cell_pos(ci)?;
            let mut layer = self.settings.min_neighbor_layer.min(full_layer);
            while layer <= full_layer {
                let found = self.grid.near_qty_indices_at(xi, yi, layer)?;
                let aligned = found.iter().filter(|&&i| self.samples[i].aligned).count();
                if aligned == 0 {
                    trace!("cell ({xi}, {yi}): no aligned sample at layer {layer}, widening");
                    layer += 1;
                    continue;
                }
                if aligned < found.len() {
                    swaps += self.align_group(&found)?;
                }
                break;
            }
        }
        self.aligned = true;
        debug!("alignment finished with {swaps} branch swaps");
        Ok(())
    }

    /// Aligns the unaligned samples of `group` against its aligned ones, folding each newly
    /// aligned sample into the reference set. Returns the number of swaps.
    fn align_group(&mut self, group: &[usize]) -> Result<usize> {
        let mut refs: Vec<usize> = group
            .iter()
            .copied()
            .filter(|&i| self.samples[i].aligned && !self.samples[i].degenerate)
            .collect();
        let mut degenerate_refs = refs.is_empty();
        if degenerate_refs {
            refs = group
                .iter()
                .copied()
                .filter(|&i| self.samples[i].aligned)
                .collect();
        }

        let power = self.settings.idw_power;
        let mut swaps = 0;
        for &i in group {
            if self.samples[i].aligned {
                continue;
            }
            let predicted = {
                let references: Vec<&TensorQty> = refs.iter().map(|&r| &self.samples[r]).collect();
                idw_orientation(&references, self.samples[i].x, self.samples[i].y, power)?
            };
            let sample = &mut self.samples[i];
            if sample.orient_to(predicted) {
                swaps += 1;
            }
            sample.aligned = true;
            if !sample.degenerate {
                if degenerate_refs {
                    refs.clear();
                    degenerate_refs = false;
                }
                refs.push(i);
            } else if degenerate_refs {
                refs.push(i);
            }
        }
        Ok(swaps)
    }

    /// Reconstructs a tensor at every grid node from the aligned samples.
    pub fn gen_nodes(&mut self) -> Result<()> {
        if !self.aligned {
            return Err(FieldError::NotAligned);
        }
        let power = self.settings.idw_power;
        let mut nodes = Vec::with_capacity(self.grid.node_count());
        let mut zero_filled = 0usize;
        for node in self.grid.nodes() {
            let (x, y) = (node.x, node.y);
            let (xi, yi, _) = self.grid.locate(x, y)?;
            let indices = match neighborhood(&self.grid, xi, yi, &self.settings)? {
                Some(indices) => indices,
                None if self.settings.assign_zero_on_interpolation_failure => {
                    zero_filled += 1;
                    let mut q = TensorQty::new(x, y, Tensor::zero());
                    q.aligned = true;
                    nodes.push(q);
                    continue;
                }
                None => return Err(FieldError::NoNearbyData { x, y }),
            };

            let near: Vec<&TensorQty> = indices.iter().map(|&i| &self.samples[i]).collect();
            let weights = IdwWeights::new(near.iter().map(|s| s.point()), x, y, power)?;
            let tensor = Tensor::new(
                weights.mean(near.iter().map(|s| s.tensor.xx))?,
                weights.mean(near.iter().map(|s| s.tensor.yy))?,
                weights.mean(near.iter().map(|s| s.tensor.xy))?,
            );
            let mut q = TensorQty::new(x, y, tensor);

            let regular: Vec<&TensorQty> = near.iter().copied().filter(|s| !s.degenerate).collect();
            let references = if regular.is_empty() { &near } else { &regular };
            q.orient_to(idw_orientation(references, x, y, power)?);
            q.aligned = true;
            nodes.push(q);
        }
        if zero_filled > 0 {
            warn!(
                "{zero_filled} of {} tensor nodes had no nearby samples and were set to zero",
                nodes.len()
            );
        }
        self.nodes = Some(nodes);
        Ok(())
    }

    fn node_tensors(&self) -> Result<&[TensorQty]> {
        if !self.aligned {
            return Err(FieldError::NotAligned);
        }
        self.nodes.as_deref().ok_or(FieldError::NodesNotGenerated)
    }

    /// Bilinear value of `component` from the four nodes around `(x, y)`.
    pub fn value(&self, x: f64, y: f64, component: TensorComponent) -> Result<f64> {
        let nodes = self.node_tensors()?;
        let (_, _, ci) = self.grid.locate(x, y)?;
        let mut corners = self
            .grid
            .node_indices_of_cell(ci)?
            .map(|ni| nodes[ni].component(component));
        if matches!(
            component,
            TensorComponent::Direction1 | TensorComponent::Direction2
        ) {
            let reference = corners[0];
            for angle in &mut corners[1..] {
                *angle = recenter_angle(*angle, reference);
            }
        }
        Ok(self.grid.cell_at(ci)?.value(x, y, corners))
    }

    pub fn xx(&self, x: f64, y: f64) -> Result<f64> {
        self.value(x, y, TensorComponent::Xx)
    }

    pub fn yy(&self, x: f64, y: f64) -> Result<f64> {
        self.value(x, y, TensorComponent::Yy)
    }

    pub fn xy(&self, x: f64, y: f64) -> Result<f64> {
        self.value(x, y, TensorComponent::Xy)
    }

    pub fn eigenvalue1(&self, x: f64, y: f64) -> Result<f64> {
        self.value(x, y, TensorComponent::Eigenvalue1)
    }

    pub fn eigenvalue2(&self, x: f64, y: f64) -> Result<f64> {
        self.value(x, y, TensorComponent::Eigenvalue2)
    }

    pub fn direction1(&self, x: f64, y: f64) -> Result<f64> {
        self.value(x, y, TensorComponent::Direction1)
    }

    pub fn direction2(&self, x: f64, y: f64) -> Result<f64> {
        self.value(x, y, TensorComponent::Direction2)
    }

    /// Scalar field of `|value1 - value2|` sharing this field's grid, with node values taken
    /// from the reconstructed node tensors.
    pub fn eigen_gap_field(&self) -> Result<ScalarField> {
        let nodes = self.node_tensors()?;
        let samples = self
            .samples
            .iter()
            .map(|s| ScalarQty::new(s.x, s.y, s.eigen_gap()))
            .collect();
        let values = nodes.iter().map(TensorQty::eigen_gap).collect();
        ScalarField::from_parts(samples, self.grid.clone(), self.settings, values)
    }
}
