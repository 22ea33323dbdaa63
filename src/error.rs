use thiserror::Error;

/// Failures of a single identifier computation.
///
/// Every variant is local to the feature being processed; the computation is
/// deterministic, so the caller decides whether to abort the batch or skip
/// the feature.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("invalid cell {width} x {height} for layer {layer_width} x {layer_height}")]
    InvalidCellGeometry {
        width: f64,
        height: f64,
        layer_width: f64,
        layer_height: f64,
    },

    #[error("invalid grid index {index} for a {num_rows} x {num_cols} grid")]
    InvalidGridIndex {
        index: u64,
        num_rows: u64,
        num_cols: u64,
    },

    #[error("invalid depth {0}: at least one level is required")]
    InvalidDepth(u32),

    #[error("level value {0} cannot be rendered as a letter (expected 1..=52)")]
    InvalidLevelValue(u64),

    #[error("'{0}' is not a level letter (expected a-z or A-Z)")]
    InvalidLevelSymbol(char),
}

pub type Result<T> = std::result::Result<T, GridError>;
