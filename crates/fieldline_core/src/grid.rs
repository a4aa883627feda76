//! Regular rectangular grid used as a spatial index over an external sample array.
//!
//! The domain is split into `cell_xn * cell_yn` equal cells stored row-major. Each cell keeps
//! the indices of the samples that fall inside it; the samples themselves are owned elsewhere.
//! Grid-line intersections are called nodes and are stored row-major as well
//! (`node_xn = cell_xn + 1`, `node_yn = cell_yn + 1`).
//!
//! Cells are half-open `[lo, hi)` along both axes, except that the domain's upper boundary
//! belongs to the last cell. A point on an interior cell boundary is therefore attributed to
//! the higher-index cell.

use crate::error::{FieldError, Result};
use crate::float::approx_eq;
use crate::geom::{Point2, Rect};
use std::fmt;

/// Offsets of the 8 neighbours of a node, in the order they are reported:
/// ```text
/// 5 6 7
/// 3 * 4
/// 0 1 2
/// ```
const NODE_NEIGHBOR_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// A single grid cell: its sub-rectangle and the indices of the samples it contains.
#[derive(Debug, Clone)]
pub struct Cell {
    qty_indices: Vec<usize>,
    bounds: Rect,
}

impl Cell {
    pub fn qty_indices(&self) -> &[usize] {
        &self.qty_indices
    }

    pub fn bounds(&self) -> &Rect {
        &self.bounds
    }

    pub fn is_empty(&self) -> bool {
        self.qty_indices.is_empty()
    }

    /// Bilinear value at `(x, y)` from the cell's corner values.
    /// See [`bilinear`] for the corner order and extrapolation behaviour.
    pub fn value(&self, x: f64, y: f64, corners: [f64; 4]) -> f64 {
        bilinear(&self.bounds, x, y, corners)
    }
}

/// A grid-line intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub x: f64,
    pub y: f64,
}

impl Node {
    pub fn point(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

#[derive(Debug, Clone)]
pub struct Grid {
    cells: Vec<Cell>,
    nodes: Vec<Node>,
    bounds: Rect,
    xspan: f64,
    yspan: f64,
    cell_xn: usize,
    cell_yn: usize,
    node_xn: usize,
    node_yn: usize,
    capacity_hint: usize,
}

impl Default for Grid {
    /// An unusable grid with zero spans. Every positional query on it reports
    /// [`FieldError::UninitializedGrid`]; construct real grids with [`Grid::new`].
    fn default() -> Self {
        Self {
            cells: Vec::new(),
            nodes: Vec::new(),
            bounds: Rect {
                xmin: 0.0,
                ymin: 0.0,
                xmax: 0.0,
                ymax: 0.0,
            },
            xspan: 0.0,
            yspan: 0.0,
            cell_xn: 0,
            cell_yn: 0,
            node_xn: 0,
            node_yn: 0,
            capacity_hint: 0,
        }
    }
}

impl Grid {
    pub fn new(bounds: Rect, cell_xn: usize, cell_yn: usize) -> Result<Self> {
        Self::with_capacity_hint(bounds, cell_xn, cell_yn, 1.0)
    }

    /// Like [`Grid::new`], reserving `ceil(avg_per_cell)` index slots in every cell.
    pub fn with_capacity_hint(
        bounds: Rect,
        cell_xn: usize,
        cell_yn: usize,
        avg_per_cell: f64,
    ) -> Result<Self> {
        if !bounds.is_valid() {
            return Err(FieldError::InvalidBounds(format!(
                "rectangle [{}, {}] x [{}, {}] is empty",
                bounds.xmin, bounds.xmax, bounds.ymin, bounds.ymax
            )));
        }
        if cell_xn == 0 || cell_yn == 0 {
            return Err(FieldError::InvalidBounds(format!(
                "cell counts must be positive, got {cell_xn} x {cell_yn}"
            )));
        }

        let capacity_hint = if avg_per_cell.is_finite() && avg_per_cell > 0.0 {
            avg_per_cell.ceil() as usize
        } else {
            0
        };
        let xspan = bounds.width() / cell_xn as f64;
        let yspan = bounds.height() / cell_yn as f64;

        let mut cells = Vec::with_capacity(cell_xn * cell_yn);
        for yi in 0..cell_yn {
            for xi in 0..cell_xn {
                let xmin = bounds.xmin + xi as f64 * xspan;
                let ymin = bounds.ymin + yi as f64 * yspan;
                cells.push(Cell {
                    qty_indices: Vec::with_capacity(capacity_hint),
                    bounds: Rect {
                        xmin,
                        ymin,
                        xmax: xmin + xspan,
                        ymax: ymin + yspan,
                    },
                });
            }
        }

        let node_xn = cell_xn + 1;
        let node_yn = cell_yn + 1;
        let mut nodes = Vec::with_capacity(node_xn * node_yn);
        for yi in 0..node_yn {
            for xi in 0..node_xn {
                nodes.push(Node {
                    x: bounds.xmin + xi as f64 * xspan,
                    y: bounds.ymin + yi as f64 * yspan,
                });
            }
        }

        Ok(Self {
            cells,
            nodes,
            bounds,
            xspan,
            yspan,
            cell_xn,
            cell_yn,
            node_xn,
            node_yn,
            capacity_hint,
        })
    }

    pub fn bounds(&self) -> &Rect {
        &self.bounds
    }

    pub fn xspan(&self) -> f64 {
        self.xspan
    }

    pub fn yspan(&self) -> f64 {
        self.yspan
    }

    pub fn cell_xn(&self) -> usize {
        self.cell_xn
    }

    pub fn cell_yn(&self) -> usize {
        self.cell_yn
    }

    pub fn node_xn(&self) -> usize {
        self.node_xn
    }

    pub fn node_yn(&self) -> usize {
        self.node_yn
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn cell_at(&self, ci: usize) -> Result<&Cell> {
        self.cells.get(ci).ok_or(FieldError::IndexOutOfRange {
            index: ci,
            len: self.cells.len(),
        })
    }

    pub fn node(&self, ni: usize) -> Result<Node> {
        self.nodes
            .get(ni)
            .copied()
            .ok_or(FieldError::IndexOutOfRange {
                index: ni,
                len: self.nodes.len(),
            })
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.cell_xn == 0
            || self.cell_yn == 0
            || approx_eq(self.xspan, 0.0)
            || approx_eq(self.yspan, 0.0)
        {
            return Err(FieldError::UninitializedGrid);
        }
        Ok(())
    }

    /// Column and row of a cell index.
    pub fn cell_pos(&self, ci: usize) -> Result<(usize, usize)> {
        self.ensure_initialized()?;
        if ci >= self.cells.len() {
            return Err(FieldError::IndexOutOfRange {
                index: ci,
                len: self.cells.len(),
            });
        }
        Ok((ci % self.cell_xn, ci / self.cell_xn))
    }

    pub fn cell_index(&self, xi: usize, yi: usize) -> usize {
        yi * self.cell_xn + xi
    }

    /// Column and row of a node index.
    pub fn node_pos(&self, ni: usize) -> Result<(usize, usize)> {
        self.ensure_initialized()?;
        if ni >= self.nodes.len() {
            return Err(FieldError::IndexOutOfRange {
                index: ni,
                len: self.nodes.len(),
            });
        }
        Ok((ni % self.node_xn, ni / self.node_xn))
    }

    pub fn node_index(&self, xi: usize, yi: usize) -> usize {
        yi * self.node_xn + xi
    }

    /// Node indices of a cell's corners: lower-left, lower-right, upper-left, upper-right.
    pub fn node_indices_of_cell(&self, ci: usize) -> Result<[usize; 4]> {
        let (xi, yi) = self.cell_pos(ci)?;
        let ll = self.node_index(xi, yi);
        let ul = ll + self.node_xn;
        Ok([ll, ll + 1, ul, ul + 1])
    }

    /// Corner node indices of the cell containing `(x, y)`.
    pub fn node_indices_at(&self, x: f64, y: f64) -> Result<[usize; 4]> {
        let (_, _, ci) = self.locate(x, y)?;
        self.node_indices_of_cell(ci)
    }

    /// Column, row and index of the cell containing `(x, y)`.
    pub fn locate(&self, x: f64, y: f64) -> Result<(usize, usize, usize)> {
        self.ensure_initialized()?;
        if !self.bounds.contains(x, y) {
            return Err(FieldError::OutOfDomain { x, y });
        }
        let xi = (((x - self.bounds.xmin) / self.xspan).floor() as usize).min(self.cell_xn - 1);
        let yi = (((y - self.bounds.ymin) / self.yspan).floor() as usize).min(self.cell_yn - 1);
        Ok((xi, yi, self.cell_index(xi, yi)))
    }

    pub fn cell(&self, x: f64, y: f64) -> Result<&Cell> {
        let (_, _, ci) = self.locate(x, y)?;
        Ok(&self.cells[ci])
    }

    /// Records `qty_index` in the cell containing `(x, y)`. Duplicates are not detected.
    pub fn add(&mut self, x: f64, y: f64, qty_index: usize) -> Result<()> {
        let (_, _, ci) = self.locate(x, y)?;
        self.cells[ci].qty_indices.push(qty_index);
        Ok(())
    }

    /// The cell containing `(x, y)` and the `layer` rings of cells around it.
    ///
    /// ```text
    /// 2 2 2 2 2
    /// 2 1 1 1 2
    /// 2 1 0 1 2
    /// 2 1 1 1 2
    /// 2 2 2 2 2
    /// ```
    /// Layer 0 is always exactly one cell. Near the domain border the square is clipped, so
    /// fewer than `(2 * layer + 1)^2` cells come back.
    pub fn near_cells(&self, x: f64, y: f64, layer: usize) -> Result<Vec<&Cell>> {
        let (xi, yi, _) = self.locate(x, y)?;
        Ok(self
            .near_cell_indices(xi, yi, layer)?
            .into_iter()
            .map(|ci| &self.cells[ci])
            .collect())
    }

    /// Row-major cell indices of the clipped square neighbourhood around cell `(xi, yi)`.
    pub fn near_cell_indices(&self, xi: usize, yi: usize, layer: usize) -> Result<Vec<usize>> {
        self.ensure_initialized()?;
        if xi >= self.cell_xn {
            return Err(FieldError::IndexOutOfRange {
                index: xi,
                len: self.cell_xn,
            });
        }
        if yi >= self.cell_yn {
            return Err(FieldError::IndexOutOfRange {
                index: yi,
                len: self.cell_yn,
            });
        }
        let x_lo = xi.saturating_sub(layer);
        let y_lo = yi.saturating_sub(layer);
        let x_hi = xi.saturating_add(layer).min(self.cell_xn.saturating_sub(1));
        let y_hi = yi.saturating_add(layer).min(self.cell_yn.saturating_sub(1));
        let side = 2 * layer.min(self.cell_xn.max(self.cell_yn)) + 1;
        let mut indices = Vec::with_capacity(side * side);
        for row in y_lo..=y_hi {
            for col in x_lo..=x_hi {
                indices.push(self.cell_index(col, row));
            }
        }
        Ok(indices)
    }

    /// All sample indices in the `layer` neighbourhood of the cell containing `(x, y)`.
    pub fn near_qty_indices(&self, x: f64, y: f64, layer: usize) -> Result<Vec<usize>> {
        let (xi, yi, _) = self.locate(x, y)?;
        self.near_qty_indices_at(xi, yi, layer)
    }

    pub fn near_qty_indices_at(&self, xi: usize, yi: usize, layer: usize) -> Result<Vec<usize>> {
        let cells = self.near_cell_indices(xi, yi, layer)?;
        let mut indices = Vec::with_capacity(cells.len() * self.capacity_hint);
        for ci in cells {
            indices.extend_from_slice(&self.cells[ci].qty_indices);
        }
        Ok(indices)
    }

    /// Layer at which a neighbourhood query covers the whole grid from any cell.
    pub fn full_layer(&self) -> usize {
        self.cell_xn.max(self.cell_yn)
    }

    /// Up to 8 nodes adjacent to `ni`, diagonal neighbours included.
    pub fn adj_node_indices(&self, ni: usize) -> Result<Vec<usize>> {
        let (xi, yi) = self.node_pos(ni)?;
        let mut adjacent = Vec::with_capacity(8);
        for (dx, dy) in NODE_NEIGHBOR_OFFSETS {
            let nx = xi as isize + dx;
            let ny = yi as isize + dy;
            if nx < 0 || ny < 0 || nx >= self.node_xn as isize || ny >= self.node_yn as isize {
                continue;
            }
            adjacent.push(self.node_index(nx as usize, ny as usize));
        }
        Ok(adjacent)
    }

    /// True when both nodes are corners of one shared cell (diagonals count).
    pub fn is_adj_nodes(&self, n1: usize, n2: usize) -> Result<bool> {
        self.ensure_initialized()?;
        if n2 >= self.nodes.len() {
            return Err(FieldError::IndexOutOfRange {
                index: n2,
                len: self.nodes.len(),
            });
        }
        Ok(self.adj_node_indices(n1)?.contains(&n2))
    }
}

/// Area-weighted bilinear interpolation inside `bounds` from the corner values
/// `[lower-left, lower-right, upper-left, upper-right]`.
///
/// No bounds check is performed: outside the rectangle the surface is extrapolated.
pub fn bilinear(bounds: &Rect, x: f64, y: f64, corners: [f64; 4]) -> f64 {
    let [ll, lr, ul, ur] = corners;
    let dx0 = x - bounds.xmin;
    let dx1 = bounds.xmax - x;
    let dy0 = y - bounds.ymin;
    let dy1 = bounds.ymax - y;
    (ll * dx1 * dy1 + lr * dx0 * dy1 + ul * dx1 * dy0 + ur * dx0 * dy0) / bounds.area()
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (ci, cell) in self.cells.iter().enumerate() {
            let (xi, yi) = (ci % self.cell_xn, ci / self.cell_xn);
            write!(
                f,
                "(col: {xi}, row: {yi})\t[x: {} ~ {}, y: {} ~ {}]",
                cell.bounds.xmin, cell.bounds.xmax, cell.bounds.ymin, cell.bounds.ymax
            )?;
            for idx in &cell.qty_indices {
                write!(f, "\t{idx}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
