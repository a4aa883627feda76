//! The `fieldline_core` crate reconstructs continuous 2-D symmetric tensor fields from
//! scattered samples and extracts their degenerate points, curves and regions.
//!
//! Key components:
//! - **Grid**: regular cell index over the sample array with expanding-ring neighborhood queries.
//! - **Interp**: inverse distance weighting and the adaptive neighborhood-widening policy.
//! - **TensorField**: eigen-branch alignment and node-centered reconstruction.
//! - **Degenerate**: zero-set discovery and point/curve/region classification on grid nodes.
//! - **Solvers**: RKF45 slope integrator used for hyperstreamline tracing.
pub mod analysis;
pub mod degenerate;
pub mod error;
pub mod float;
pub mod geom;
pub mod grid;
pub mod interp;
pub mod parse;
pub mod quantity;
pub mod scalar_field;
pub mod settings;
pub mod solvers;
pub mod streamline;
pub mod tensor;
pub mod tensor_field;
pub mod traits;

pub use error::{FieldError, Result};
pub use settings::FieldSettings;
