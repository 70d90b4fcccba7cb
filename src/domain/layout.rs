/// Wall layout projector: finished grid → static obstacles in arena pixels.
///
/// ## Geometry
///
///   - Arena size = viewport × (1 − margin)
///   - Cell size  = arena size / (cols, rows)
///   - Cell (r, c) spans x ∈ [c·cw, (c+1)·cw], y ∈ [r·ch, (r+1)·ch]
///   - Wall and border thickness are capped at a fifth of the smaller cell
///     side, so small cells (big grids, small terminals) keep open corridors
///
/// ## Emitted obstacles
///
///   - Boundary: four `border` rectangles centered on the arena edges,
///     independent of gap state.
///   - Closed horizontal boundary below (r, c): a `wall` one cell wide,
///     `wall_thickness` tall, centered on y = (r+1)·ch.
///   - Closed vertical boundary right of (r, c): a `wall` one cell tall,
///     `wall_thickness` wide, centered on x = (c+1)·cw.
///
/// Projection is pure: same grid and geometry, same obstacle list.

use super::entity::{Agent, Label, Obstacle};
use super::grid::{Cell, Grid};
use crate::error::ConfigError;

/// Walls and boundary never take more than this share of a cell side;
/// thicker configured values are scaled down to it.
pub const MAX_THICKNESS_FRACTION: f32 = 0.2;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArenaGeometry {
    pub rows: usize,
    pub cols: usize,
    pub width: f32,
    pub height: f32,
    pub cell_w: f32,
    pub cell_h: f32,
    pub wall_thickness: f32,
    pub border_thickness: f32,
}

impl ArenaGeometry {
    pub fn new(
        rows: usize,
        cols: usize,
        viewport: (f32, f32),
        margin: f32,
        wall_thickness: f32,
        border_thickness: f32,
    ) -> Result<Self, ConfigError> {
        let (vw, vh) = viewport;
        if rows == 0 || cols == 0 {
            return Err(ConfigError::EmptyGrid { rows, cols });
        }
        if !(vw > 0.0 && vh > 0.0) {
            return Err(ConfigError::EmptyViewport { width: vw, height: vh });
        }
        if !(0.0..1.0).contains(&margin) {
            return Err(ConfigError::Margin(margin));
        }
        if !(wall_thickness > 0.0) {
            return Err(ConfigError::NonPositive { name: "wall_thickness", value: wall_thickness });
        }
        if !(border_thickness > 0.0) {
            return Err(ConfigError::NonPositive { name: "border_thickness", value: border_thickness });
        }

        let width = vw - vw * margin;
        let height = vh - vh * margin;
        let (cell_w, cell_h) = (width / cols as f32, height / rows as f32);
        let max_thickness = cell_w.min(cell_h) * MAX_THICKNESS_FRACTION;
        Ok(ArenaGeometry {
            rows,
            cols,
            width,
            height,
            cell_w,
            cell_h,
            wall_thickness: wall_thickness.min(max_thickness),
            border_thickness: border_thickness.min(max_thickness),
        })
    }

    /// Largest agent radius that neither touches a wall nor the boundary
    /// while resting at a cell center, so it passes every open gap.
    pub fn clearance(&self) -> f32 {
        let side = self.cell_w.min(self.cell_h);
        ((side - self.wall_thickness) / 2.0).min((side - self.border_thickness) / 2.0)
    }

    /// Reject an agent that could not travel the corridors.
    pub fn check_agent_fits(&self, radius_fraction: f32) -> Result<(), ConfigError> {
        let radius = self.cell_w.min(self.cell_h) * radius_fraction;
        let clearance = self.clearance();
        if radius < clearance {
            Ok(())
        } else {
            Err(ConfigError::AgentTooLarge { radius, clearance })
        }
    }

    /// Pixel center of a cell.
    pub fn cell_center(&self, cell: Cell) -> (f32, f32) {
        (
            cell.col as f32 * self.cell_w + self.cell_w / 2.0,
            cell.row as f32 * self.cell_h + self.cell_h / 2.0,
        )
    }

    pub fn start_cell(&self) -> Cell {
        Cell::new(0, 0)
    }

    pub fn goal_cell(&self) -> Cell {
        Cell::new(self.rows - 1, self.cols - 1)
    }

    /// y of the top face of the bottom boundary.
    pub fn floor_y(&self) -> f32 {
        self.height - self.border_thickness / 2.0
    }
}

/// Project a finished grid into wall obstacles (boundary first).
pub fn project_walls(grid: &Grid, geo: &ArenaGeometry) -> Vec<Obstacle> {
    assert_eq!(
        (grid.rows(), grid.cols()),
        (geo.rows, geo.cols),
        "grid and geometry disagree on dimensions"
    );

    let (w, h) = (geo.width, geo.height);
    let (cw, ch) = (geo.cell_w, geo.cell_h);
    let bt = geo.border_thickness;
    let wt = geo.wall_thickness;

    let mut walls = vec![
        Obstacle::new(w / 2.0, 0.0, w, bt, Label::Border),
        Obstacle::new(w, h / 2.0, bt, h, Label::Border),
        Obstacle::new(w / 2.0, h, w, bt, Label::Border),
        Obstacle::new(0.0, h / 2.0, bt, h, Label::Border),
    ];

    for row in 0..grid.rows() - 1 {
        for col in 0..grid.cols() {
            if grid.h_gap(row, col) { continue; }
            walls.push(Obstacle::new(
                col as f32 * cw + cw / 2.0,
                row as f32 * ch + ch,
                cw,
                wt,
                Label::Wall,
            ));
        }
    }

    for row in 0..grid.rows() {
        for col in 0..grid.cols() - 1 {
            if grid.v_gap(row, col) { continue; }
            walls.push(Obstacle::new(
                col as f32 * cw + cw,
                row as f32 * ch + ch / 2.0,
                wt,
                ch,
                Label::Wall,
            ));
        }
    }

    walls
}

/// Goal marker: centered in the last cell, `scale` × cell size. A sensor,
/// so the agent reaches it instead of bouncing off it.
pub fn goal_obstacle(geo: &ArenaGeometry, scale: f32) -> Obstacle {
    let (x, y) = geo.cell_center(geo.goal_cell());
    Obstacle::sensor(x, y, geo.cell_w * scale, geo.cell_h * scale, Label::Goal)
}

/// Agent at rest in the start cell; radius is a fraction of the smaller
/// cell side.
pub fn spawn_agent(geo: &ArenaGeometry, radius_fraction: f32) -> Agent {
    let (x, y) = geo.cell_center(geo.start_cell());
    Agent::new(x, y, geo.cell_w.min(geo.cell_h) * radius_fraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{maze, physics};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn geo(rows: usize, cols: usize) -> ArenaGeometry {
        ArenaGeometry::new(rows, cols, (1000.0, 500.0), 0.0, 10.0, 30.0).unwrap()
    }

    fn carved(rows: usize, cols: usize, seed: u64) -> Grid {
        let mut g = Grid::new(rows, cols).unwrap();
        maze::generate(&mut g, &mut StdRng::seed_from_u64(seed)).unwrap();
        g
    }

    fn interior(walls: &[Obstacle]) -> usize {
        walls.iter().filter(|o| o.label == Label::Wall).count()
    }

    fn sorted(mut v: Vec<Obstacle>) -> Vec<Obstacle> {
        v.sort_by(|a, b| {
            a.label.cmp(&b.label)
                .then(a.x.total_cmp(&b.x))
                .then(a.y.total_cmp(&b.y))
                .then(a.width.total_cmp(&b.width))
        });
        v
    }

    #[test]
    fn margin_shrinks_arena() {
        let g = ArenaGeometry::new(9, 14, (1000.0, 800.0), 0.05, 10.0, 30.0).unwrap();
        assert!((g.width - 950.0).abs() < 1e-3);
        assert!((g.height - 760.0).abs() < 1e-3);
        assert!((g.cell_w - 950.0 / 14.0).abs() < 1e-4);
        assert!((g.cell_h - 760.0 / 9.0).abs() < 1e-4);
    }

    #[test]
    fn geometry_rejects_bad_input() {
        assert!(matches!(
            ArenaGeometry::new(0, 3, (100.0, 100.0), 0.05, 10.0, 30.0),
            Err(ConfigError::EmptyGrid { .. })
        ));
        assert!(matches!(
            ArenaGeometry::new(3, 3, (0.0, 100.0), 0.05, 10.0, 30.0),
            Err(ConfigError::EmptyViewport { .. })
        ));
        assert_eq!(
            ArenaGeometry::new(3, 3, (100.0, 100.0), 1.0, 10.0, 30.0),
            Err(ConfigError::Margin(1.0))
        );
        assert!(matches!(
            ArenaGeometry::new(3, 3, (100.0, 100.0), 0.05, 0.0, 30.0),
            Err(ConfigError::NonPositive { name: "wall_thickness", .. })
        ));
    }

    #[test]
    fn fresh_grid_projects_every_boundary() {
        // Nothing carved: every interior boundary is a wall.
        let grid = Grid::new(3, 4).unwrap();
        let walls = project_walls(&grid, &geo(3, 4));
        let h = 2 * 4;
        let v = 3 * 3;
        assert_eq!(interior(&walls), h + v);
        assert_eq!(walls.iter().filter(|o| o.label == Label::Border).count(), 4);
    }

    #[test]
    fn carved_grid_projects_closed_gaps_only() {
        let grid = carved(9, 14, 11);
        let walls = project_walls(&grid, &geo(9, 14));
        let boundaries = 8 * 14 + 9 * 13;
        assert_eq!(interior(&walls), boundaries - grid.open_gap_count());
        assert!(walls.iter().all(|o| o.solid));
    }

    #[test]
    fn wall_positions_follow_boundaries() {
        let grid = Grid::new(2, 2).unwrap();
        let geo = geo(2, 2); // cells 500 × 250
        let walls = project_walls(&grid, &geo);

        // Horizontal boundary below (0, 1)
        assert!(walls.iter().any(|o| {
            o.label == Label::Wall && o.x == 750.0 && o.y == 250.0 && o.width == 500.0 && o.height == 10.0
        }));
        // Vertical boundary right of (1, 0)
        assert!(walls.iter().any(|o| {
            o.label == Label::Wall && o.x == 500.0 && o.y == 375.0 && o.width == 10.0 && o.height == 250.0
        }));
    }

    #[test]
    fn boundary_is_independent_of_gaps() {
        let open = carved(4, 4, 5);
        let closed = Grid::new(4, 4).unwrap();
        let g = geo(4, 4);
        let borders = |walls: Vec<Obstacle>| -> Vec<Obstacle> {
            walls.into_iter().filter(|o| o.label == Label::Border).collect()
        };
        assert_eq!(borders(project_walls(&open, &g)), borders(project_walls(&closed, &g)));
    }

    #[test]
    fn projection_is_idempotent() {
        let grid = carved(10, 10, 99);
        let g = geo(10, 10);
        assert_eq!(sorted(project_walls(&grid, &g)), sorted(project_walls(&grid, &g)));
    }

    #[test]
    fn single_cell_has_only_boundary() {
        let grid = carved(1, 1, 0);
        let walls = project_walls(&grid, &geo(1, 1));
        assert_eq!(walls.len(), 4);
        assert_eq!(interior(&walls), 0);
    }

    #[test]
    fn goal_and_agent_placement() {
        let g = geo(2, 4); // cells 250 × 250
        let goal = goal_obstacle(&g, 0.7);
        assert_eq!((goal.x, goal.y), (875.0, 375.0));
        assert!((goal.width - 175.0).abs() < 1e-3);
        assert!((goal.height - 175.0).abs() < 1e-3);
        assert_eq!(goal.label, Label::Goal);
        assert!(goal.sensor && !goal.solid);

        let agent = spawn_agent(&g, 0.25);
        assert_eq!((agent.x, agent.y, agent.radius), (125.0, 125.0, 62.5));
        assert_eq!((agent.vx, agent.vy), (0.0, 0.0));
    }

    #[test]
    fn single_cell_goal_overlaps_spawn() {
        let g = geo(1, 1);
        let goal = goal_obstacle(&g, 0.7);
        let agent = spawn_agent(&g, 0.25);
        assert_eq!((goal.x, goal.y), (agent.x, agent.y));
    }

    #[test]
    fn thickness_is_capped_by_cell_size() {
        // 20 rows in a 304 px tall viewport: cells are ~15 px tall.
        let g = ArenaGeometry::new(20, 14, (640.0, 304.0), 0.05, 10.0, 30.0).unwrap();
        let cap = g.cell_w.min(g.cell_h) * MAX_THICKNESS_FRACTION;
        assert!((g.wall_thickness - cap).abs() < 1e-4);
        assert!((g.border_thickness - cap).abs() < 1e-4);

        // Roomy cells keep the configured values.
        let g = geo(2, 2);
        assert_eq!((g.wall_thickness, g.border_thickness), (10.0, 30.0));
    }

    #[test]
    fn oversized_agent_rejected() {
        let g = geo(2, 4); // cells 250 × 250, clearance 110
        assert!(g.check_agent_fits(0.25).is_ok());
        assert!(matches!(
            g.check_agent_fits(0.45),
            Err(ConfigError::AgentTooLarge { .. })
        ));
        // Thin walls leave more room.
        let thin = ArenaGeometry::new(2, 4, (1000.0, 500.0), 0.0, 1.0, 1.0).unwrap();
        assert!(thin.check_agent_fits(0.45).is_ok());
    }

    #[test]
    fn agent_at_any_cell_center_clears_walls_and_boundary() {
        // Every grid height an 80×24 terminal can show.
        for rows in 1..=40 {
            let g = ArenaGeometry::new(rows, 14, (640.0, 304.0), 0.05, 10.0, 30.0).unwrap();
            g.check_agent_fits(0.25).unwrap();
            let walls = project_walls(&Grid::new(rows, 14).unwrap(), &g);
            let agent = spawn_agent(&g, 0.25);
            for cell in [g.start_cell(), g.goal_cell()] {
                let (x, y) = g.cell_center(cell);
                for w in &walls {
                    assert!(physics::penetration(w, x, y, agent.radius).is_none(), "rows={rows}");
                }
            }
            // Diameter fits every corridor.
            assert!(2.0 * agent.radius < g.cell_w.min(g.cell_h) - g.wall_thickness);
        }
    }
}
