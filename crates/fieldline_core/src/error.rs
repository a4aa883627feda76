use thiserror::Error;

/// Errors produced by grids, fields and the degenerate-region extractor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    #[error("invalid bounds: {0}")]
    InvalidBounds(String),

    #[error("point ({x}, {y}) is out of the field domain")]
    OutOfDomain { x: f64, y: f64 },

    #[error("the grid has not been initialized; construct it with Grid::new")]
    UninitializedGrid,

    #[error("no nearby data to interpolate at ({x}, {y})")]
    NoNearbyData { x: f64, y: f64 },

    #[error("empty input")]
    EmptyInput,

    #[error("the tensor field has not been aligned")]
    NotAligned,

    #[error("node values have not been generated")]
    NodesNotGenerated,

    #[error("index {index} is out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("integration failed: {0}")]
    IntegrationFailed(String),
}

/// Convenience type alias for results using [`FieldError`].
pub type Result<T> = std::result::Result<T, FieldError>;
