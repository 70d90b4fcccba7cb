/// Maze generator: randomized depth-first traversal ("recursive backtracker").
///
/// ## Algorithm
///
///   1. Mark the current cell visited.
///   2. Collect its in-bounds neighbours and arrange them (shuffle).
///   3. For each neighbour in that order: skip it if visited, otherwise open
///      the gap towards it and descend into it.
///
/// Skipping visited cells means every opened gap joins a new cell to the
/// tree, so the result is a spanning tree with exactly `rows*cols - 1` gaps.
///
/// ## Explicit stack
///
/// Depth reaches `rows*cols` on serpentine layouts, so descent is driven by
/// a `Vec<Frame>` instead of the call stack. A frame holds the cell, its
/// arranged candidates and a cursor. Candidates are arranged when a frame is
/// pushed, which is exactly when the recursive form would arrange them, so
/// a given random sequence produces the same maze either way.

use rand::seq::SliceRandom;
use rand::Rng;

use super::grid::{Cell, Grid, Neighbor};
use crate::error::MazeError;

/// Bookkeeping from one generation run.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MazeStats {
    /// Cells entered. Always equals `rows * cols` on success.
    pub visits: usize,
    /// Deepest stack reached.
    pub max_depth: usize,
}

struct Frame {
    cell: Cell,
    candidates: Vec<Neighbor>,
    next: usize,
}

/// Carve `grid` from a uniformly random start cell, shuffling each cell's
/// candidates with `rng` (Fisher–Yates).
pub fn generate<R: Rng + ?Sized>(grid: &mut Grid, rng: &mut R) -> Result<MazeStats, MazeError> {
    let start = Cell::new(rng.gen_range(0..grid.rows()), rng.gen_range(0..grid.cols()));
    carve_from(grid, start, |candidates| candidates.shuffle(rng))
}

/// Carve `grid` starting at `start`. `arrange` reorders each cell's
/// candidate list in place before it is walked.
///
/// The grid must be fresh (nothing visited).
pub fn carve_from<F>(grid: &mut Grid, start: Cell, mut arrange: F) -> Result<MazeStats, MazeError>
where
    F: FnMut(&mut [Neighbor]),
{
    let cells = grid.cell_count();
    let mut stack = reserve_stack(cells)?;

    let mut stats = MazeStats { visits: 0, max_depth: 0 };
    enter(grid, start, &mut arrange, &mut stack, &mut stats);

    while let Some(frame) = stack.last_mut() {
        let next = next_unvisited(grid, frame);
        match next {
            Some(n) => {
                let from = frame.cell;
                grid.open_between(from, n.dir);
                enter(grid, n.cell, &mut arrange, &mut stack, &mut stats);
            }
            None => {
                stack.pop();
            }
        }
    }

    debug_assert_eq!(stats.visits, cells);
    Ok(stats)
}

/// Room for the deepest possible descent, reserved before anything is
/// carved.
fn reserve_stack(cells: usize) -> Result<Vec<Frame>, MazeError> {
    let mut stack = Vec::new();
    stack
        .try_reserve_exact(cells)
        .map_err(|_| MazeError::StackExhausted { cells })?;
    Ok(stack)
}

fn enter<F>(grid: &mut Grid, cell: Cell, arrange: &mut F, stack: &mut Vec<Frame>, stats: &mut MazeStats)
where
    F: FnMut(&mut [Neighbor]),
{
    grid.mark_visited(cell);
    let mut candidates = grid.neighbors(cell);
    arrange(&mut candidates);
    stack.push(Frame { cell, candidates, next: 0 });
    stats.visits += 1;
    stats.max_depth = stats.max_depth.max(stack.len());
}

/// Advance the frame cursor past visited candidates.
fn next_unvisited(grid: &Grid, frame: &mut Frame) -> Option<Neighbor> {
    while frame.next < frame.candidates.len() {
        let n = frame.candidates[frame.next];
        frame.next += 1;
        if !grid.is_visited(n.cell) {
            return Some(n);
        }
    }
    None
}
