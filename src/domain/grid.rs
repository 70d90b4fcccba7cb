/// Grid model: three boolean layers over a fixed `rows × cols` index space.
///
/// ## Layers
///
///   - `visited[r][c]`: the traversal has entered cell (r, c)
///   - `v_gap[r][c]`: boundary between (r, c) and (r, c+1) is open, c < cols-1
///   - `h_gap[r][c]`: boundary between (r, c) and (r+1, c) is open, r < rows-1
///
/// Layers are stored row-major in flat vectors. Every accessor checks its
/// index range and panics on a miss: an out-of-range index is a caller bug
/// and must never be clamped or wrapped into a neighbouring cell.

use crate::error::ConfigError;

/// One grid unit, addressed by (row, col).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub const fn new(row: usize, col: usize) -> Self {
        Cell { row, col }
    }
}

/// Direction of travel between two adjacent cells. Also used for impulses.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    /// Canonical candidate order: up, right, down, left.
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Right, Direction::Down, Direction::Left];

    /// Unit step as (d_row, d_col).
    pub fn delta(self) -> (isize, isize) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Right => (0, 1),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }
}

/// An in-bounds neighbour of some cell, with the direction taken to reach it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Neighbor {
    pub cell: Cell,
    pub dir: Direction,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    visited: Vec<bool>,
    v_gap: Vec<bool>, // rows × (cols - 1)
    h_gap: Vec<bool>, // (rows - 1) × cols
}

impl Grid {
    /// Fresh grid: nothing visited, every gap closed.
    pub fn new(rows: usize, cols: usize) -> Result<Self, ConfigError> {
        if rows == 0 || cols == 0 {
            return Err(ConfigError::EmptyGrid { rows, cols });
        }
        let too_large = || ConfigError::GridTooLarge { rows, cols };
        let cells = rows.checked_mul(cols).ok_or_else(too_large)?;

        Ok(Grid {
            rows,
            cols,
            visited: layer(cells).ok_or_else(too_large)?,
            v_gap: layer(rows * (cols - 1)).ok_or_else(too_large)?,
            h_gap: layer((rows - 1) * cols).ok_or_else(too_large)?,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.row < self.rows && cell.col < self.cols
    }

    // ── visited ──

    pub fn is_visited(&self, cell: Cell) -> bool {
        self.visited[self.cell_index(cell)]
    }

    pub fn mark_visited(&mut self, cell: Cell) {
        let i = self.cell_index(cell);
        self.visited[i] = true;
    }

    pub fn all_visited(&self) -> bool {
        self.visited.iter().all(|&v| v)
    }

    // ── gaps ──

    /// Is the boundary between (row, col) and (row, col+1) open?
    pub fn v_gap(&self, row: usize, col: usize) -> bool {
        self.v_gap[self.v_index(row, col)]
    }

    /// Is the boundary between (row, col) and (row+1, col) open?
    pub fn h_gap(&self, row: usize, col: usize) -> bool {
        self.h_gap[self.h_index(row, col)]
    }

    pub fn open_v_gap(&mut self, row: usize, col: usize) {
        let i = self.v_index(row, col);
        self.v_gap[i] = true;
    }

    pub fn open_h_gap(&mut self, row: usize, col: usize) {
        let i = self.h_index(row, col);
        self.h_gap[i] = true;
    }

    /// Open the gap crossed when leaving `cell` in direction `dir`.
    /// Left/right touch the vertical layer at `min(col, next_col)`,
    /// up/down the horizontal layer at `min(row, next_row)`.
    pub fn open_between(&mut self, cell: Cell, dir: Direction) {
        let next = self.step(cell, dir).unwrap_or_else(|| {
            panic!("no cell {dir:?} of ({}, {}) in a {}x{} grid", cell.row, cell.col, self.rows, self.cols)
        });
        if dir.is_vertical() {
            self.open_h_gap(cell.row.min(next.row), cell.col);
        } else {
            self.open_v_gap(cell.row, cell.col.min(next.col));
        }
    }

    /// Can an agent cross from `cell` towards `dir`? Grid edges are closed.
    pub fn is_open(&self, cell: Cell, dir: Direction) -> bool {
        match self.step(cell, dir) {
            None => false,
            Some(next) if dir.is_vertical() => self.h_gap(cell.row.min(next.row), cell.col),
            Some(next) => self.v_gap(cell.row, cell.col.min(next.col)),
        }
    }

    pub fn open_gap_count(&self) -> usize {
        self.v_gap.iter().chain(self.h_gap.iter()).filter(|&&g| g).count()
    }

    // ── topology ──

    /// The adjacent cell in `dir`, if it lies inside the grid.
    pub fn step(&self, cell: Cell, dir: Direction) -> Option<Cell> {
        let (dr, dc) = dir.delta();
        let row = cell.row.checked_add_signed(dr)?;
        let col = cell.col.checked_add_signed(dc)?;
        let next = Cell::new(row, col);
        self.contains(next).then_some(next)
    }

    /// In-bounds neighbours of `cell`, in canonical up/right/down/left order.
    pub fn neighbors(&self, cell: Cell) -> Vec<Neighbor> {
        Direction::ALL
            .iter()
            .filter_map(|&dir| self.step(cell, dir).map(|next| Neighbor { cell: next, dir }))
            .collect()
    }

    // ── Internal ──

    fn cell_index(&self, cell: Cell) -> usize {
        assert!(
            self.contains(cell),
            "cell ({}, {}) outside {}x{} grid", cell.row, cell.col, self.rows, self.cols
        );
        cell.row * self.cols + cell.col
    }

    fn v_index(&self, row: usize, col: usize) -> usize {
        assert!(
            row < self.rows && col + 1 < self.cols,
            "vertical gap ({row}, {col}) outside {}x{} grid", self.rows, self.cols
        );
        row * (self.cols - 1) + col
    }

    fn h_index(&self, row: usize, col: usize) -> usize {
        assert!(
            row + 1 < self.rows && col < self.cols,
            "horizontal gap ({row}, {col}) outside {}x{} grid", self.rows, self.cols
        );
        row * self.cols + col
    }
}

/// An all-closed layer of `len` flags, or None when it cannot be allocated.
fn layer(len: usize) -> Option<Vec<bool>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).ok()?;
    v.resize(len, false);
    Some(v)
}
