//! Hierarchical map-sheet identifiers.
//!
//! A cell's linear index is resolved to a (row, col) position; each 0-based
//! coordinate is then split into `depth` levels by repeated halving, coarsest
//! level first. Row levels are rendered as letters and column levels as
//! decimal digits.
//!
//! ```
//! use topo_grid::encoder::{build_identifier, decompose};
//! use topo_grid::GridDimensions;
//!
//! assert_eq!(decompose(3, 3).unwrap(), vec![1, 2, 2]);
//!
//! let dims = GridDimensions::new(5, 5).unwrap();
//! let id = build_identifier(13, dims, 3).unwrap();
//! assert_eq!((id.row_part.as_str(), id.col_part.as_str()), ("aba", "121"));
//! ```

use crate::error::{GridError, Result};
use crate::model::{GridDimensions, GridPosition, Identifier};

/// Level value `v` renders as the `v`-th symbol of this alphabet.
const LEVEL_ALPHABET: &[u8; 52] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Resolves a 1-based linear cell index to its grid position.
///
/// Cells are numbered down each column: indices `1..=num_rows` fill the first
/// column, the next `num_rows` the second, and so on. `num_cols` only bounds
/// the accepted index range.
pub fn resolve(cell_index: u64, dims: GridDimensions) -> Result<GridPosition> {
    let GridDimensions { num_rows, num_cols } = dims;
    if num_rows == 0 || num_cols == 0 || cell_index == 0 || cell_index > dims.cell_count() {
        return Err(GridError::InvalidGridIndex {
            index: cell_index,
            num_rows,
            num_cols,
        });
    }

    let row = (cell_index - 1) % num_rows + 1;
    // (cell_index - row) は常に num_rows の倍数
    let col = (cell_index - row) / num_rows + 1;

    Ok(GridPosition { row, col })
}

/// Splits a 0-based coordinate into `depth` levels, coarsest first.
///
/// Every level but the last records which half of the remaining range the
/// coordinate falls in; the last level is the 1-based remainder. Coordinates
/// at or above `2^depth` are not rejected and yield a first level above 2.
pub fn decompose(coord: u64, depth: u32) -> Result<Vec<u64>> {
    if depth == 0 {
        return Err(GridError::InvalidDepth(depth));
    }

    let mut levels = Vec::new();
    let mut coord = coord;
    for remaining in (2..=depth).rev() {
        // 2^63 を超える閾値はどの座標よりも大きい
        let level = match 1u64.checked_shl(remaining - 1) {
            Some(threshold) => {
                let level = coord / threshold + 1;
                coord -= threshold * (level - 1);
                level
            }
            None => 1,
        };
        levels.push(level);
    }

    let last = coord
        .checked_add(1)
        .ok_or(GridError::InvalidLevelValue(coord))?;
    levels.push(last);

    Ok(levels)
}

/// Reassembles a coordinate from its levels; the inverse of [`decompose`].
pub fn compose(levels: &[u64]) -> Result<u64> {
    let (&last, upper) = levels.split_last().ok_or(GridError::InvalidDepth(0))?;
    let depth = levels.len();

    let mut coord: u64 = 0;
    for (i, &level) in upper.iter().enumerate() {
        let offset = level.checked_sub(1).ok_or(GridError::InvalidLevelValue(level))?;
        let shift = depth - 1 - i;
        let scaled = match u32::try_from(shift).ok().and_then(|s| 1u64.checked_shl(s)) {
            Some(threshold) => offset.checked_mul(threshold),
            None if offset == 0 => Some(0),
            None => None,
        };
        coord = scaled
            .and_then(|value| coord.checked_add(value))
            .ok_or(GridError::InvalidLevelValue(level))?;
    }

    let remainder = last.checked_sub(1).ok_or(GridError::InvalidLevelValue(last))?;
    coord
        .checked_add(remainder)
        .ok_or(GridError::InvalidLevelValue(last))
}

/// Maps a level value to its letter: 1–26 are `a`–`z`, 27–52 are `A`–`Z`.
pub fn level_letter(value: u64) -> Result<char> {
    value
        .checked_sub(1)
        .and_then(|index| usize::try_from(index).ok())
        .and_then(|index| LEVEL_ALPHABET.get(index))
        .map(|&byte| char::from(byte))
        .ok_or(GridError::InvalidLevelValue(value))
}

pub fn render_letters(levels: &[u64]) -> Result<String> {
    levels.iter().map(|&level| level_letter(level)).collect()
}

pub fn render_digits(levels: &[u64]) -> String {
    levels.iter().map(|level| level.to_string()).collect()
}

/// Reads the level values back out of a rendered letter sequence.
pub fn parse_letters(letters: &str) -> Result<Vec<u64>> {
    letters
        .chars()
        .map(|symbol| {
            u8::try_from(symbol)
                .ok()
                .and_then(|byte| LEVEL_ALPHABET.iter().position(|&b| b == byte))
                .map(|index| index as u64 + 1)
                .ok_or(GridError::InvalidLevelSymbol(symbol))
        })
        .collect()
}

/// Builds the row/column identifier of one cell.
///
/// The row part keeps the mixed-case letter rendering; use
/// [`Identifier::to_uppercase_rows`] for the canonical upper-case form.
pub fn build_identifier(cell_index: u64, dims: GridDimensions, depth: u32) -> Result<Identifier> {
    let position = resolve(cell_index, dims)?;

    let col_levels = decompose(position.col - 1, depth)?;
    let row_levels = decompose(position.row - 1, depth)?;

    Ok(Identifier {
        row_part: render_letters(&row_levels)?,
        col_part: render_digits(&col_levels),
    })
}
