use thiserror::Error;

/// Errors from constructing robot geometry or the coupling matrix.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GeometryError {
    #[error("degenerate roller angle on wheel {wheel}: sin({angle}) is zero")]
    DegenerateRollerAngle { wheel: usize, angle: f64 },

    #[error("geometry value is not finite: {field} = {value}")]
    NonFinite { field: &'static str, value: f64 },

    #[error("geometry value must be positive: {field} = {value}")]
    NonPositive { field: &'static str, value: f64 },
}

/// Errors from flat-vector parameter serialization and friction accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParameterError {
    #[error("parameter array length mismatch: expected {expected}, got {got}")]
    ArrayLength { expected: usize, got: usize },

    #[error("per-wheel friction values are not uniform")]
    NonUniformFriction,
}
