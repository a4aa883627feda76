use crate::degenerate::{Shape, Singularity, SingularityCategory};
use crate::geom::Point2;
use crate::parse::parse_tensor_samples;
use crate::scalar_field::ScalarField;
use crate::settings::FieldSettings;
use crate::tensor_field::TensorField;
use anyhow::{bail, Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// A reconstructed field together with its eigen-gap field and degenerate sets.
#[derive(Debug, Clone)]
pub struct TensorFieldAnalysis {
    pub field: TensorField,
    pub eigen_gap: ScalarField,
    pub singularities: Vec<Singularity>,
}

/// A degenerate set in plain coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingularityReport {
    pub category: SingularityCategory,
    pub node_count: usize,
    /// The point, the curve trace or the region border.
    pub path: Vec<Point2>,
}

impl TensorFieldAnalysis {
    pub fn reports(&self) -> Result<Vec<SingularityReport>> {
        self.singularities
            .iter()
            .map(|s| {
                let path = s
                    .path_points(self.field.grid())
                    .context("Singularity refers to a node outside the grid.")?;
                Ok(SingularityReport {
                    category: s.category(),
                    node_count: s.nodes().len(),
                    path,
                })
            })
            .collect()
    }
}

/// Runs the whole pipeline on plain-text samples: parse, index, align, reconstruct nodes,
/// then extract the degenerate sets of the eigenvalue gap.
pub fn analyze_tensor_data(input: &str, settings: FieldSettings) -> Result<TensorFieldAnalysis> {
    let samples = parse_tensor_samples(input, settings.discard_zero_samples);
    if samples.is_empty() {
        bail!("Input contains no well-formed tensor samples.");
    }

    let mut field = TensorField::from_samples(samples, settings)
        .context("Failed to index tensor samples on a grid.")?;
    field
        .align()
        .context("Failed to align eigenvector branches.")?;
    field
        .gen_nodes()
        .context("Failed to reconstruct node tensors.")?;

    let eigen_gap = field
        .eigen_gap_field()
        .context("Failed to build the eigenvalue gap field.")?;
    let singularities = eigen_gap
        .singularities()
        .context("Failed to extract degenerate sets.")?;

    debug!(
        "grid {} x {} cells, {} nodes",
        field.grid().cell_xn(),
        field.grid().cell_yn(),
        field.grid().node_count()
    );
    info!(
        "analyzed {} samples: {} degenerate sets",
        field.samples().len(),
        singularities.len()
    );
    Ok(TensorFieldAnalysis {
        field,
        eigen_gap,
        singularities,
    })
}
