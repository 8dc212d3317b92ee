//! Table types.

use serde::{Deserialize, Serialize};

use super::LayoutElement;
use crate::geometry::BoundingBox;

/// Which detection strategy produced a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableStrategy {
    /// Ruled-grid detection from drawn lines
    Rules,
    /// Machine-learned region detection
    Ml,
}

impl TableStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableStrategy::Rules => "rules",
            TableStrategy::Ml => "ml",
        }
    }
}

impl std::fmt::Display for TableStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A table structure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub bbox: BoundingBox,

    /// One box per row, top to bottom
    pub row_boxes: Vec<BoundingBox>,

    /// One box per column, left to right
    pub col_boxes: Vec<BoundingBox>,

    /// Row-major cell content
    pub cells: Vec<Vec<TableCell>>,

    /// Last header row, if the table has a header
    pub row_header_index: Option<usize>,

    /// Last header column, if the table has one
    pub col_header_index: Option<usize>,

    pub strategy: TableStrategy,
}

impl Table {
    /// Create an empty table over a grid of row and column boxes.
    pub fn new(
        bbox: BoundingBox,
        row_boxes: Vec<BoundingBox>,
        col_boxes: Vec<BoundingBox>,
        strategy: TableStrategy,
    ) -> Self {
        let cells = vec![vec![TableCell::default(); col_boxes.len()]; row_boxes.len()];
        Self {
            bbox,
            row_boxes,
            col_boxes,
            cells,
            row_header_index: None,
            col_header_index: None,
            strategy,
        }
    }

    /// Get the number of rows.
    pub fn row_count(&self) -> usize {
        self.row_boxes.len()
    }

    /// Get the number of columns.
    pub fn column_count(&self) -> usize {
        self.col_boxes.len()
    }

    /// Check if every cell is empty.
    pub fn is_empty(&self) -> bool {
        self.cells.iter().flatten().all(|c| c.items.is_empty())
    }

    /// Cell at a row/column position.
    pub fn cell(&self, row: usize, col: usize) -> Option<&TableCell> {
        self.cells.get(row).and_then(|r| r.get(col))
    }

    /// Locate the cell containing a point.
    pub fn cell_at(&self, x: f32, y: f32) -> Option<(usize, usize)> {
        let row = self
            .row_boxes
            .iter()
            .position(|r| y >= r.y0() && y <= r.y1())?;
        let col = self
            .col_boxes
            .iter()
            .position(|c| x >= c.x0() && x <= c.x1())?;
        Some((row, col))
    }

    /// Get plain text representation of the table: tab-separated cells,
    /// one row per line.
    pub fn plain_text(&self) -> String {
        self.cells
            .iter()
            .map(|row| {
                row.iter()
                    .map(|c| c.plain_text())
                    .collect::<Vec<_>>()
                    .join("\t")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A table cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TableCell {
    /// Cell content
    pub items: Vec<LayoutElement>,
}

impl TableCell {
    pub fn plain_text(&self) -> String {
        self.items
            .iter()
            .map(LayoutElement::plain_text)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x0: f32, y0: f32, x1: f32, y1: f32) -> BoundingBox {
        BoundingBox::new(x0, y0, x1, y1).unwrap()
    }

    fn grid() -> Table {
        let rows = vec![bbox(0.0, 0.0, 200.0, 20.0), bbox(0.0, 20.0, 200.0, 40.0)];
        let cols = vec![
            bbox(0.0, 0.0, 100.0, 40.0),
            bbox(100.0, 0.0, 200.0, 40.0),
        ];
        Table::new(bbox(0.0, 0.0, 200.0, 40.0), rows, cols, TableStrategy::Rules)
    }

    #[test]
    fn test_table_new() {
        let table = grid();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_count(), 2);
        assert!(table.is_empty());
        assert!(table.cell(1, 1).is_some());
        assert!(table.cell(2, 0).is_none());
    }

    #[test]
    fn test_cell_at() {
        let table = grid();
        assert_eq!(table.cell_at(150.0, 10.0), Some((0, 1)));
        assert_eq!(table.cell_at(50.0, 30.0), Some((1, 0)));
        assert_eq!(table.cell_at(250.0, 30.0), None);
    }

    #[test]
    fn test_serialized_cells_are_arrays() {
        let value = serde_json::to_value(grid()).unwrap();
        assert!(value["cells"][0][0].is_array());
        assert_eq!(value["strategy"], "rules");
        assert!(value["row_header_index"].is_null());
    }
}
