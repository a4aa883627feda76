use crate::error::Result;
use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types that can be used as scalars by the integrators.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// Converts an `f64` constant into `T`, yielding NaN if `T` cannot represent it.
pub fn lit<T: Scalar>(value: f64) -> T {
    T::from_f64(value).unwrap_or_else(T::nan)
}

/// A planar curve family given by its slope `dy/dx` at every point of a domain.
pub trait SlopeFunction<T: Scalar> {
    /// Slope at `(x, y)`. May be infinite for vertical tangents; returns an error outside
    /// the function's domain.
    fn slope(&self, x: T, y: T) -> Result<T>;
}

impl<T: Scalar, F> SlopeFunction<T> for F
where
    F: Fn(T, T) -> Result<T>,
{
    fn slope(&self, x: T, y: T) -> Result<T> {
        self(x, y)
    }
}
