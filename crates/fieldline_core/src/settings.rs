use crate::error::{FieldError, Result};
use serde::{Deserialize, Serialize};

/// Interpolation and ingestion policy shared by a field instance.
///
/// `min_neighbor_layer`/`max_neighbor_layer` and `min_neighbor_count`/`max_neighbor_count`
/// together drive the neighborhood-widening decision in [`crate::interp::widening_decision`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSettings {
    /// Drop input samples whose three tensor components are all zero.
    pub discard_zero_samples: bool,
    /// First cell layer examined around a query point.
    pub min_neighbor_layer: usize,
    /// Last cell layer examined; derived from the counts and density when `None`.
    pub max_neighbor_layer: Option<usize>,
    /// Fewest samples an interpolation may use.
    pub min_neighbor_count: usize,
    /// Sample count at which widening stops immediately.
    pub max_neighbor_count: usize,
    /// Synthesize a zero value instead of failing when no data is found.
    pub assign_zero_on_interpolation_failure: bool,
    /// Expected samples per grid cell; controls grid density and list capacity.
    pub avg_samples_per_cell: f64,
    pub idw_power: f64,
}

impl Default for FieldSettings {
    fn default() -> Self {
        Self {
            discard_zero_samples: false,
            min_neighbor_layer: 0,
            max_neighbor_layer: None,
            min_neighbor_count: 1,
            max_neighbor_count: 8,
            assign_zero_on_interpolation_failure: true,
            avg_samples_per_cell: 0.5,
            idw_power: 3.0,
        }
    }
}

impl FieldSettings {
    /// The effective last layer: the override if set, otherwise the smallest layer with
    /// `(2 * layer + 1)^2 * avg_samples_per_cell >= max_neighbor_count`.
    pub fn max_layer(&self) -> usize {
        if let Some(layer) = self.max_neighbor_layer {
            return layer;
        }
        let ratio = self.max_neighbor_count as f64 / self.avg_samples_per_cell;
        let layer = ((ratio.sqrt() - 1.0) * 0.5).ceil();
        if layer.is_finite() && layer > 0.0 {
            layer as usize
        } else {
            0
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_neighbor_count > self.max_neighbor_count {
            return Err(FieldError::InvalidSettings(format!(
                "min_neighbor_count ({}) exceeds max_neighbor_count ({})",
                self.min_neighbor_count, self.max_neighbor_count
            )));
        }
        if !(self.avg_samples_per_cell.is_finite() && self.avg_samples_per_cell > 0.0) {
            return Err(FieldError::InvalidSettings(
                "avg_samples_per_cell must be positive and finite".to_string(),
            ));
        }
        if self.min_neighbor_layer > self.max_layer() {
            return Err(FieldError::InvalidSettings(format!(
                "min_neighbor_layer ({}) exceeds max neighbor layer ({})",
                self.min_neighbor_layer,
                self.max_layer()
            )));
        }
        if !self.idw_power.is_finite() {
            return Err(FieldError::InvalidSettings(
                "idw_power must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::FieldSettings;
    use crate::error::FieldError;

    #[test]
    fn default_max_layer_matches_density_relation() {
        let settings = FieldSettings::default();
        // sqrt(8 / 0.5) = 4 -> (4 - 1) / 2 = 1.5 -> 2
        assert_eq!(settings.max_layer(), 2);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn explicit_max_layer_overrides_derivation() {
        let settings = FieldSettings {
            max_neighbor_layer: Some(5),
            ..FieldSettings::default()
        };
        assert_eq!(settings.max_layer(), 5);
    }

    #[test]
    fn dense_grid_derives_zero_layers() {
        let settings = FieldSettings {
            avg_samples_per_cell: 16.0,
            ..FieldSettings::default()
        };
        assert_eq!(settings.max_layer(), 0);
    }

    #[test]
    fn validate_rejects_inverted_counts() {
        let settings = FieldSettings {
            min_neighbor_count: 9,
            ..FieldSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(FieldError::InvalidSettings(_))
        ));
    }

    #[test]
    fn validate_rejects_inverted_layers() {
        let settings = FieldSettings {
            min_neighbor_layer: 3,
            max_neighbor_layer: Some(1),
            ..FieldSettings::default()
        };
        assert!(settings.validate().is_err());
    }
}
