use crate::error::{GridError, Result};

/// Row and column counts of a rectangular index grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridDimensions {
    pub num_rows: u64,
    pub num_cols: u64,
}

impl GridDimensions {
    pub fn new(num_rows: u64, num_cols: u64) -> Result<Self> {
        if num_rows == 0 || num_cols == 0 {
            return Err(GridError::InvalidGridIndex {
                index: 0,
                num_rows,
                num_cols,
            });
        }
        Ok(Self { num_rows, num_cols })
    }

    pub fn cell_count(&self) -> u64 {
        self.num_rows.saturating_mul(self.num_cols)
    }
}

/// 1-based position of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridPosition {
    pub row: u64,
    pub col: u64,
}

impl GridPosition {
    /// Linear cell index that resolves back to this position.
    ///
    /// `None` for a zero row or column, or when the index does not fit in `u64`.
    pub fn cell_index(&self, num_rows: u64) -> Option<u64> {
        if self.row == 0 {
            return None;
        }
        self.col
            .checked_sub(1)?
            .checked_mul(num_rows)?
            .checked_add(self.row)
    }
}

/// Row and column identifiers of one grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub row_part: String,
    pub col_part: String,
}

impl Identifier {
    /// 行IDを大文字に揃えた識別子
    pub fn to_uppercase_rows(&self) -> Self {
        Self {
            row_part: self.row_part.to_uppercase(),
            col_part: self.col_part.clone(),
        }
    }
}

/// Bounding box attributes of a single grid cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellExtent {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl CellExtent {
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }
}

/// Width and height of the whole grid layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerExtent {
    pub width: f64,
    pub height: f64,
}

impl LayerExtent {
    /// Bounding box union of the given cells, or `None` when there are none.
    pub fn from_cells<'a, I>(cells: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a CellExtent>,
    {
        let mut cells = cells.into_iter();
        let first = cells.next()?;

        let (mut min_x, mut max_x) = (first.left, first.right);
        let (mut min_y, mut max_y) = (first.bottom, first.top);
        for cell in cells {
            min_x = min_x.min(cell.left);
            max_x = max_x.max(cell.right);
            min_y = min_y.min(cell.bottom);
            max_y = max_y.max(cell.top);
        }

        Some(Self {
            width: max_x - min_x,
            height: max_y - min_y,
        })
    }
}

/// One input record of a grid layer.
#[derive(Debug, Clone, PartialEq)]
pub struct GridFeature {
    pub id: u64,
    pub cell: CellExtent,
    /// 入力レコードの全フィールド値（入力順）
    pub attributes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions_reject_empty_grid() {
        assert!(GridDimensions::new(0, 3).is_err());
        assert!(GridDimensions::new(3, 0).is_err());

        let dims = GridDimensions::new(5, 4).unwrap();
        assert_eq!(dims.cell_count(), 20);
    }

    #[test]
    fn test_cell_index() {
        let position = GridPosition { row: 3, col: 3 };
        assert_eq!(position.cell_index(5), Some(13));

        assert_eq!(GridPosition { row: 1, col: 0 }.cell_index(5), None);
        assert_eq!(GridPosition { row: 0, col: 1 }.cell_index(5), None);
        assert_eq!(
            GridPosition {
                row: 1,
                col: u64::MAX
            }
            .cell_index(2),
            None
        );
    }

    #[test]
    fn test_uppercase_rows_keeps_columns() {
        let id = Identifier {
            row_part: "abA".to_string(),
            col_part: "122".to_string(),
        };
        let upper = id.to_uppercase_rows();
        assert_eq!(upper.row_part, "ABA");
        assert_eq!(upper.col_part, "122");
    }

    #[test]
    fn test_layer_extent_from_cells() {
        let cells = [
            CellExtent {
                left: 0.0,
                right: 10.0,
                top: 50.0,
                bottom: 40.0,
            },
            CellExtent {
                left: 90.0,
                right: 100.0,
                top: 10.0,
                bottom: 0.0,
            },
        ];

        let extent = LayerExtent::from_cells(&cells).unwrap();
        assert_eq!(extent.width, 100.0);
        assert_eq!(extent.height, 50.0);

        assert!(LayerExtent::from_cells(std::iter::empty::<&CellExtent>()).is_none());
    }
}
