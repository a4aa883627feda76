use crate::degenerate::{extract_singularities, Singularity};
use crate::error::{FieldError, Result};
use crate::geom::Rect;
use crate::grid::Grid;
use crate::interp::{idw, neighborhood};
use crate::quantity::ScalarQty;
use crate::settings::FieldSettings;
use log::warn;

/// Scattered scalar samples indexed by a grid, with optional reconstructed node values.
#[derive(Debug, Clone)]
pub struct ScalarField {
    samples: Vec<ScalarQty>,
    grid: Grid,
    settings: FieldSettings,
    node_values: Option<Vec<f64>>,
}

impl ScalarField {
    pub fn new(
        bounds: Rect,
        cell_xn: usize,
        cell_yn: usize,
        samples: Vec<ScalarQty>,
        settings: FieldSettings,
    ) -> Result<Self> {
        settings.validate()?;
        let mut grid =
            Grid::with_capacity_hint(bounds, cell_xn, cell_yn, settings.avg_samples_per_cell)?;
        for (i, s) in samples.iter().enumerate() {
            grid.add(s.x, s.y, i)?;
        }
        Ok(Self {
            samples,
            grid,
            settings,
            node_values: None,
        })
    }

    /// A field whose node values are already known. `grid` must index `samples`.
    pub(crate) fn from_parts(
        samples: Vec<ScalarQty>,
        grid: Grid,
        settings: FieldSettings,
        node_values: Vec<f64>,
    ) -> Result<Self> {
        if node_values.len() != grid.node_count() {
            return Err(FieldError::InvalidArgument(format!(
                "expected {} node values, got {}",
                grid.node_count(),
                node_values.len()
            )));
        }
        Ok(Self {
            samples,
            grid,
            settings,
            node_values: Some(node_values),
        })
    }

    pub fn samples(&self) -> &[ScalarQty] {
        &self.samples
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn settings(&self) -> &FieldSettings {
        &self.settings
    }

    pub fn node_values(&self) -> Option<&[f64]> {
        self.node_values.as_deref()
    }

    /// Reconstructs a value at every grid node by adaptive IDW.
    pub fn gen_nodes(&mut self) -> Result<()> {
        let mut values = Vec::with_capacity(self.grid.node_count());
        let mut zero_filled = 0usize;
        for node in self.grid.nodes() {
            let (xi, yi, _) = self.grid.locate(node.x, node.y)?;
            match neighborhood(&self.grid, xi, yi, &self.settings)? {
                Some(indices) => {
                    let near: Vec<ScalarQty> = indices.iter().map(|&i| self.samples[i]).collect();
                    values.push(idw(&near, node.x, node.y, self.settings.idw_power)?);
                }
                None if self.settings.assign_zero_on_interpolation_failure => {
                    zero_filled += 1;
                    values.push(0.0);
                }
                None => {
                    return Err(FieldError::NoNearbyData {
                        x: node.x,
                        y: node.y,
                    })
                }
            }
        }
        if zero_filled > 0 {
            warn!(
                "{zero_filled} of {} scalar nodes had no nearby samples and were set to zero",
                values.len()
            );
        }
        self.node_values = Some(values);
        Ok(())
    }

    /// Bilinear value from the four nodes around `(x, y)`.
    pub fn value(&self, x: f64, y: f64) -> Result<f64> {
        let values = self
            .node_values
            .as_deref()
            .ok_or(FieldError::NodesNotGenerated)?;
        let (_, _, ci) = self.grid.locate(x, y)?;
        let corners = self.grid.node_indices_of_cell(ci)?.map(|ni| values[ni]);
        Ok(self.grid.cell_at(ci)?.value(x, y, corners))
    }

    /// Degenerate points, curves and regions of the node values' zero set.
    pub fn singularities(&self) -> Result<Vec<Singularity>> {
        let values = self
            .node_values
            .as_deref()
            .ok_or(FieldError::NodesNotGenerated)?;
        extract_singularities(&self.grid, values)
    }
}
