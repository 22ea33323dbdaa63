use crate::encoder::build_identifier;
use crate::error::{GridError, Result};
use crate::model::{CellExtent, GridDimensions, GridFeature, Identifier, LayerExtent};

/// Derives the grid's row and column counts from one cell and the layer extent.
pub fn derive_grid_params(cell: &CellExtent, layer: &LayerExtent) -> Result<GridDimensions> {
    let cell_width = cell.width();
    let cell_height = cell.height();

    let invalid = || GridError::InvalidCellGeometry {
        width: cell_width,
        height: cell_height,
        layer_width: layer.width,
        layer_height: layer.height,
    };

    // NaN はここで弾かれる
    if !(cell_width > 0.0 && cell_height > 0.0)
        || !layer.width.is_finite()
        || !layer.height.is_finite()
    {
        return Err(invalid());
    }

    let num_cols = (layer.width / cell_width).floor();
    let num_rows = (layer.height / cell_height).floor();

    // セルがレイヤーより大きい場合もここで弾かれる
    if !(num_cols >= 1.0 && num_rows >= 1.0) || !num_cols.is_finite() || !num_rows.is_finite()
    {
        return Err(invalid());
    }

    Ok(GridDimensions {
        num_rows: num_rows as u64,
        num_cols: num_cols as u64,
    })
}

/// Identifier of a feature, using its own cell extent to size the grid.
pub fn identify_feature(
    feature: &GridFeature,
    layer: &LayerExtent,
    depth: u32,
) -> Result<Identifier> {
    let dims = derive_grid_params(&feature.cell, layer)?;
    build_identifier(feature.id, dims, depth)
}
