//! Sampled quantities: a position plus the value observed there.

use crate::error::FieldError;
use crate::geom::Point2;
use crate::tensor::{orientation_distance, recenter_angle, Tensor};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalarQty {
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

impl ScalarQty {
    pub fn new(x: f64, y: f64, value: f64) -> Self {
        Self { x, y, value }
    }

    pub fn point(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

/// A tensor sample with its decomposition cached.
///
/// `value1`/`direction1` and `value2`/`direction2` always travel together. Right after
/// construction `value1 >= value2`; alignment may swap the two branches so that branch 1
/// follows one continuous principal-direction family across the field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TensorQty {
    pub x: f64,
    pub y: f64,
    pub tensor: Tensor,
    pub value1: f64,
    pub value2: f64,
    pub direction1: f64,
    pub direction2: f64,
    pub degenerate: bool,
    pub aligned: bool,
}

impl TensorQty {
    pub fn new(x: f64, y: f64, tensor: Tensor) -> Self {
        let e = tensor.eigen();
        Self {
            x,
            y,
            tensor,
            value1: e.value1,
            value2: e.value2,
            direction1: e.direction1,
            direction2: e.direction2,
            degenerate: e.degenerate,
            aligned: false,
        }
    }

    pub fn from_components(x: f64, y: f64, xx: f64, yy: f64, xy: f64) -> Self {
        Self::new(x, y, Tensor::new(xx, yy, xy))
    }

    pub fn point(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }

    pub fn swap_eigen_branch(&mut self) {
        std::mem::swap(&mut self.value1, &mut self.value2);
        std::mem::swap(&mut self.direction1, &mut self.direction2);
    }

    /// Puts the branch whose direction is closer to `predicted` into slot 1 and re-centers
    /// both angles by multiples of pi towards the prediction. Returns whether the branches
    /// were swapped.
    pub fn orient_to(&mut self, predicted: f64) -> bool {
        let swapped = orientation_distance(self.direction2, predicted)
            < orientation_distance(self.direction1, predicted);
        if swapped {
            self.swap_eigen_branch();
        }
        self.direction1 = recenter_angle(self.direction1, predicted);
        self.direction2 = recenter_angle(self.direction2, predicted);
        swapped
    }

    pub fn eigen_gap(&self) -> f64 {
        (self.value1 - self.value2).abs()
    }

    pub fn component(&self, component: TensorComponent) -> f64 {
        match component {
            TensorComponent::Xx => self.tensor.xx,
            TensorComponent::Yy => self.tensor.yy,
            TensorComponent::Xy => self.tensor.xy,
            TensorComponent::Eigenvalue1 => self.value1,
            TensorComponent::Eigenvalue2 => self.value2,
            TensorComponent::Direction1 => self.direction1,
            TensorComponent::Direction2 => self.direction2,
            TensorComponent::EigenGap => self.eigen_gap(),
        }
    }
}

/// Scalar view of a tensor sample, used for point queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TensorComponent {
    Xx,
    Yy,
    Xy,
    Eigenvalue1,
    Eigenvalue2,
    Direction1,
    Direction2,
    EigenGap,
}

impl FromStr for TensorComponent {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xx" => Ok(Self::Xx),
            "yy" => Ok(Self::Yy),
            "xy" | "yx" => Ok(Self::Xy),
            "eigenvalue1" | "value1" | "v1" => Ok(Self::Eigenvalue1),
            "eigenvalue2" | "value2" | "v2" => Ok(Self::Eigenvalue2),
            "direction1" | "d1" => Ok(Self::Direction1),
            "direction2" | "d2" => Ok(Self::Direction2),
            "eigen_gap" | "gap" => Ok(Self::EigenGap),
            other => Err(FieldError::InvalidArgument(format!(
                "unknown tensor component '{other}'"
            ))),
        }
    }
}
