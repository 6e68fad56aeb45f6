//! Grid coordinates and the toroidal neighborhood metric.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// A cell position on the SOM grid.
///
/// `row` runs over the grid width `x`, `col` over the height `y`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCoord {
    /// Row position on the grid.
    pub row: usize,
    /// Column position on the grid.
    pub col: usize,
}

impl GridCoord {
    /// Creates a new coordinate.
    #[inline]
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Returns the row-major flat index in a grid with `cols` columns.
    #[inline]
    pub fn flat_index(&self, cols: usize) -> usize {
        self.row * cols + self.col
    }

    /// Inverse of [`GridCoord::flat_index`].
    #[inline]
    pub fn from_flat_index(index: usize, cols: usize) -> Self {
        Self {
            row: index / cols,
            col: index % cols,
        }
    }
}

impl From<(usize, usize)> for GridCoord {
    fn from((row, col): (usize, usize)) -> Self {
        Self { row, col }
    }
}

/// Wrapped distance along one axis of extent `extent`.
#[inline]
fn axis_distance(a: usize, b: usize, extent: usize) -> usize {
    let d = a.abs_diff(b);
    d.min(extent - d)
}

/// Manhattan distance on a torus of shape `(x, y)`.
///
/// Each axis wraps around at its extent, so cells on opposite edges are
/// neighbors. Both coordinates must lie inside `shape`.
#[inline]
pub fn toroidal_distance(a: GridCoord, b: GridCoord, shape: (usize, usize)) -> usize {
    debug_assert!(a.row < shape.0 && b.row < shape.0, "row outside grid");
    debug_assert!(a.col < shape.1 && b.col < shape.1, "col outside grid");

    axis_distance(a.row, b.row, shape.0) + axis_distance(a.col, b.col, shape.1)
}

/// Fixed `(x, y)` grid of cell coordinates.
///
/// Lets the distance to a single reference cell be evaluated for the whole
/// grid in one array operation.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateIndex {
    cells: Array2<GridCoord>,
}

impl CoordinateIndex {
    /// Builds the index for an `x` by `y` grid.
    pub fn new(x: usize, y: usize) -> Self {
        let cells = Array2::from_shape_fn((x, y), |(row, col)| GridCoord::new(row, col));
        Self { cells }
    }

    /// Returns the `(x, y)` extent of the grid.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        self.cells.dim()
    }

    /// Iterates over every coordinate in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &GridCoord> {
        self.cells.iter()
    }

    /// Toroidal distance from `reference` to every cell, shaped like the grid.
    pub fn distance_field(&self, reference: GridCoord) -> Array2<usize> {
        let shape = self.shape();
        self.cells
            .map(|&cell| toroidal_distance(cell, reference, shape))
    }
}
