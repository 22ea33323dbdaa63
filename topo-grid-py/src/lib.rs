use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use topo_grid::encoder::{self, render_letters};
use topo_grid::model::{CellExtent, GridDimensions, LayerExtent};
use topo_grid::params::derive_grid_params;
use topo_grid::GridError;

#[pymodule]
#[pyo3(name = "topo_grid")]
fn topo_grid_module(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(find_levels, m)?)?;
    m.add_function(wrap_pyfunction!(find_alphabetic_levels, m)?)?;
    m.add_function(wrap_pyfunction!(get_coords, m)?)?;
    m.add_function(wrap_pyfunction!(get_grid_params, m)?)?;
    m.add_function(wrap_pyfunction!(find_coord_ids, m)?)?;
    Ok(())
}

fn to_py_err(e: GridError) -> PyErr {
    PyErr::new::<PyValueError, _>(e.to_string())
}

#[pyfunction]
pub fn find_levels(coord: u64, depth: u32) -> PyResult<Vec<u64>> {
    encoder::decompose(coord, depth).map_err(to_py_err)
}

#[pyfunction]
pub fn find_alphabetic_levels(coord: u64, depth: u32) -> PyResult<Vec<char>> {
    let levels = encoder::decompose(coord, depth).map_err(to_py_err)?;
    let letters = render_letters(&levels).map_err(to_py_err)?;
    Ok(letters.chars().collect())
}

#[pyfunction]
pub fn get_coords(cell: u64, num_rows: u64, num_cols: u64) -> PyResult<(u64, u64)> {
    let dims = GridDimensions::new(num_rows, num_cols).map_err(to_py_err)?;
    let position = encoder::resolve(cell, dims).map_err(to_py_err)?;
    Ok((position.row, position.col))
}

/// (num_rows, num_cols) を返す
#[pyfunction]
pub fn get_grid_params(
    left: f64,
    right: f64,
    top: f64,
    bottom: f64,
    layer_width: f64,
    layer_height: f64,
) -> PyResult<(u64, u64)> {
    let cell = CellExtent {
        left,
        right,
        top,
        bottom,
    };
    let layer = LayerExtent {
        width: layer_width,
        height: layer_height,
    };
    let dims = derive_grid_params(&cell, &layer).map_err(to_py_err)?;
    Ok((dims.num_rows, dims.num_cols))
}

/// (row_id, col_id) を返す
#[pyfunction]
#[pyo3(signature = (cell, num_rows, num_cols, depth, uppercase=false))]
pub fn find_coord_ids(
    cell: u64,
    num_rows: u64,
    num_cols: u64,
    depth: u32,
    uppercase: bool,
) -> PyResult<(String, String)> {
    let dims = GridDimensions::new(num_rows, num_cols).map_err(to_py_err)?;
    let identifier = encoder::build_identifier(cell, dims, depth).map_err(to_py_err)?;
    let identifier = if uppercase {
        identifier.to_uppercase_rows()
    } else {
        identifier
    };
    Ok((identifier.row_part, identifier.col_part))
}
