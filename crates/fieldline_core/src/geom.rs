use crate::error::{FieldError, Result};
use serde::{Deserialize, Serialize};

/// 2D point type.
pub type Point2 = nalgebra::Point2<f64>;

/// 2D vector type.
pub type Vector2 = nalgebra::Vector2<f64>;

/// Axis-aligned rectangle with `xmin < xmax` and `ymin < ymax`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Rect {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Result<Self> {
        let finite = xmin.is_finite() && ymin.is_finite() && xmax.is_finite() && ymax.is_finite();
        if !finite || xmin >= xmax || ymin >= ymax {
            return Err(FieldError::InvalidBounds(format!(
                "rectangle [{xmin}, {xmax}] x [{ymin}, {ymax}] is empty or not finite"
            )));
        }
        Ok(Self {
            xmin,
            ymin,
            xmax,
            ymax,
        })
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Closed containment test; points on the border are inside.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.xmin && x <= self.xmax && y >= self.ymin && y <= self.ymax
    }

    pub fn center(&self) -> Point2 {
        Point2::new(
            0.5 * (self.xmin + self.xmax),
            0.5 * (self.ymin + self.ymax),
        )
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.xmin < self.xmax && self.ymin < self.ymax
    }
}
