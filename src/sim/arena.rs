/// ArenaState: the complete snapshot of a running maze session.
///
/// ## Lifecycle
///
///   1. `new()` validates config, carves a fresh grid, projects walls and
///      places the goal (last cell) and agent (cell 0,0).
///   2. The step function and the input handler mutate it, never both at
///      once (single-threaded loop).
///   3. `won` flips false → true once, through `handle_collision`. It is a
///      one-shot latch for the session; only `restart()`, which starts a
///      new session on the same maze, clears it.
///
/// The grid is kept read-only after generation so a restart can re-project
/// the same maze.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::config::GameConfig;
use crate::domain::entity::{Agent, Label, Obstacle};
use crate::domain::grid::{Direction, Grid};
use crate::domain::layout::{self, ArenaGeometry};
use crate::domain::maze::{self, MazeStats};
use crate::error::ArenaError;
use super::event::CollisionPair;

#[derive(Clone, Debug)]
pub struct ArenaState {
    pub grid: Grid,
    pub geometry: ArenaGeometry,
    /// Walls and boundary first, goal last.
    pub obstacles: Vec<Obstacle>,
    pub agent: Agent,
    pub won: bool,
    /// Downward force applied to the agent each step. Zero until the win.
    pub gravity: f32,
    pub seed: u64,
    pub tick: u64,
    pub stats: MazeStats,

    /// Indices into `obstacles` the agent touched at the end of the last step.
    pub contacts: Vec<usize>,

    pub impulse: f32,
    pub post_win_gravity: f32,
    pub air_friction: f32,
    pub restitution: f32,
    pub goal_scale: f32,
    pub agent_radius_fraction: f32,
}

impl ArenaState {
    /// Build a session with a maze carved from `seed`.
    /// Fails before any carving if the configuration or viewport is invalid,
    /// or if the ball would not fit the corridors at this size.
    pub fn new(config: &GameConfig, viewport: (f32, f32), seed: u64) -> Result<Self, ArenaError> {
        config.validate()?;
        let geometry = ArenaGeometry::new(
            config.maze.rows,
            config.maze.cols,
            viewport,
            config.arena.margin,
            config.arena.wall_thickness,
            config.arena.border_thickness,
        )?;
        geometry.check_agent_fits(config.arena.agent_radius_fraction)?;

        let mut grid = Grid::new(config.maze.rows, config.maze.cols)?;
        let mut rng = StdRng::seed_from_u64(seed);
        let stats = maze::generate(&mut grid, &mut rng)?;
        info!(
            rows = grid.rows(), cols = grid.cols(), seed,
            visits = stats.visits, max_depth = stats.max_depth,
            "maze generated"
        );

        Ok(ArenaState::from_grid(grid, stats, geometry, config, seed))
    }

    /// Fresh session over an already carved grid.
    pub fn from_grid(grid: Grid, stats: MazeStats, geometry: ArenaGeometry, config: &GameConfig, seed: u64) -> Self {
        let mut obstacles = layout::project_walls(&grid, &geometry);
        obstacles.push(layout::goal_obstacle(&geometry, config.arena.goal_scale));
        let agent = layout::spawn_agent(&geometry, config.arena.agent_radius_fraction);

        ArenaState {
            grid,
            geometry,
            obstacles,
            agent,
            won: false,
            gravity: 0.0,
            seed,
            tick: 0,
            stats,
            contacts: vec![],
            impulse: config.physics.impulse,
            post_win_gravity: config.physics.post_win_gravity,
            air_friction: config.physics.air_friction,
            restitution: config.physics.restitution,
            goal_scale: config.arena.goal_scale,
            agent_radius_fraction: config.arena.agent_radius_fraction,
        }
    }

    /// Same maze, fresh session: walls solid again, agent back at the start.
    pub fn restart(&mut self) {
        let mut obstacles = layout::project_walls(&self.grid, &self.geometry);
        obstacles.push(layout::goal_obstacle(&self.geometry, self.goal_scale));
        self.obstacles = obstacles;
        self.agent = layout::spawn_agent(&self.geometry, self.agent_radius_fraction);
        self.won = false;
        self.gravity = 0.0;
        self.tick = 0;
        self.contacts.clear();
        info!(seed = self.seed, "session restarted");
    }

    /// Add the configured impulse to the agent's velocity along `dir`.
    pub fn apply_directional_impulse(&mut self, dir: Direction) {
        self.agent.push(dir, self.impulse);
        debug!(?dir, vx = self.agent.vx, vy = self.agent.vy, "impulse");
    }

    /// Win reducer. Fires once, on the first ball/goal contact in either
    /// order; every later notification is ignored.
    ///
    /// Effects: `won` latches, gravity switches on, every interior wall
    /// stops being solid. Boundary and goal are left alone: the boundary
    /// keeps the agent inside the arena while it falls.
    pub fn handle_collision(&mut self, pair: CollisionPair) -> bool {
        if self.won || !pair.is_between(Label::Ball, Label::Goal) {
            return false;
        }

        self.won = true;
        self.gravity = self.post_win_gravity;
        for o in self.obstacles.iter_mut().filter(|o| o.label == Label::Wall) {
            o.solid = false;
        }
        info!(tick = self.tick, seed = self.seed, "goal reached");
        true
    }

    pub fn wall_count(&self) -> usize {
        self.obstacles.iter().filter(|o| o.label == Label::Wall).count()
    }

    pub fn goal(&self) -> Option<&Obstacle> {
        self.obstacles.iter().find(|o| o.label == Label::Goal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    const VIEW: (f32, f32) = (1120.0, 720.0);

    fn config(rows: usize, cols: usize) -> GameConfig {
        let mut cfg = GameConfig::default();
        cfg.maze.rows = rows;
        cfg.maze.cols = cols;
        cfg
    }

    fn arena(rows: usize, cols: usize) -> ArenaState {
        ArenaState::new(&config(rows, cols), VIEW, 1234).unwrap()
    }

    fn goal_hit() -> CollisionPair {
        CollisionPair::new(Label::Ball, Label::Goal)
    }

    #[test]
    fn new_session_layout() {
        let a = arena(9, 14);
        assert!(!a.won);
        assert_eq!(a.gravity, 0.0);
        assert!(a.grid.all_visited());
        assert_eq!(a.grid.open_gap_count(), 9 * 14 - 1);
        assert_eq!(a.obstacles.last().map(|o| o.label), Some(Label::Goal));
        assert_eq!(a.obstacles.iter().filter(|o| o.label == Label::Border).count(), 4);
        assert!(a.obstacles.iter().filter(|o| o.label != Label::Goal).all(|o| o.solid));
        assert!(a.goal().map_or(false, |g| g.sensor));
        let (sx, sy) = a.geometry.cell_center(a.geometry.start_cell());
        assert_eq!((a.agent.x, a.agent.y), (sx, sy));
    }

    #[test]
    fn invalid_config_prevents_construction() {
        let err = ArenaState::new(&config(0, 14), VIEW, 1).unwrap_err();
        assert!(matches!(err, ArenaError::Config(ConfigError::EmptyGrid { .. })));

        let err = ArenaState::new(&config(9, 14), (0.0, 720.0), 1).unwrap_err();
        assert!(matches!(err, ArenaError::Config(ConfigError::EmptyViewport { .. })));
    }

    #[test]
    fn ball_that_cannot_fit_prevents_construction() {
        let mut cfg = config(9, 14);
        cfg.arena.agent_radius_fraction = 0.45;
        let err = ArenaState::new(&cfg, VIEW, 1).unwrap_err();
        assert!(matches!(err, ArenaError::Config(ConfigError::AgentTooLarge { .. })));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn unallocatable_grid_is_an_error() {
        // rows * cols fits in usize, the grid layers do not fit in memory.
        let err = ArenaState::new(&config(1 << 32, 1 << 31), VIEW, 1).unwrap_err();
        assert!(matches!(err, ArenaError::Config(ConfigError::GridTooLarge { .. })));
    }

    #[test]
    fn same_seed_same_walls() {
        let a = arena(12, 12);
        let b = arena(12, 12);
        assert_eq!(a.grid, b.grid);
        assert_eq!(a.obstacles, b.obstacles);
    }

    // ── Win latch ──

    #[test]
    fn win_fires_exactly_once() {
        let mut a = arena(5, 5);
        assert!(a.handle_collision(goal_hit()));
        assert!(a.won);
        assert_eq!(a.gravity, a.post_win_gravity);
        assert!(a.obstacles.iter().filter(|o| o.label == Label::Wall).all(|o| !o.solid));

        // Second notification: nothing changes.
        let before = a.obstacles.clone();
        assert!(!a.handle_collision(goal_hit()));
        assert!(a.won);
        assert_eq!(a.obstacles, before);
    }

    #[test]
    fn win_accepts_reversed_pair() {
        let mut a = arena(5, 5);
        assert!(a.handle_collision(CollisionPair::new(Label::Goal, Label::Ball)));
    }

    #[test]
    fn unrelated_pairs_are_ignored() {
        let mut a = arena(5, 5);
        assert!(!a.handle_collision(CollisionPair::new(Label::Ball, Label::Wall)));
        assert!(!a.handle_collision(CollisionPair::new(Label::Wall, Label::Goal)));
        assert!(!a.won);
        assert_eq!(a.gravity, 0.0);
        assert!(a.obstacles.iter().filter(|o| o.label == Label::Wall).all(|o| o.solid));
    }

    #[test]
    fn win_leaves_boundary_and_goal_alone() {
        let mut a = arena(4, 6);
        let goal = a.goal().cloned();
        a.handle_collision(goal_hit());
        assert!(a.obstacles.iter().filter(|o| o.label == Label::Border).all(|o| o.solid));
        assert_eq!(a.goal().cloned(), goal);
        // Released walls stay present.
        assert_eq!(a.wall_count(), (3 * 6 + 4 * 5) - a.grid.open_gap_count());
    }

    #[test]
    fn restart_resets_session_on_same_maze() {
        let mut a = arena(6, 6);
        let walls = a.obstacles.clone();
        a.apply_directional_impulse(Direction::Right);
        a.handle_collision(goal_hit());
        a.tick = 99;

        a.restart();
        assert!(!a.won);
        assert_eq!(a.gravity, 0.0);
        assert_eq!(a.tick, 0);
        assert_eq!(a.obstacles, walls);
        assert_eq!((a.agent.vx, a.agent.vy), (0.0, 0.0));
    }

    // ── Impulses ──

    #[test]
    fn impulses_follow_axes() {
        let mut a = arena(3, 3);
        a.apply_directional_impulse(Direction::Up);
        assert_eq!((a.agent.vx, a.agent.vy), (0.0, -5.0));
        a.apply_directional_impulse(Direction::Right);
        assert_eq!((a.agent.vx, a.agent.vy), (5.0, -5.0));
        a.apply_directional_impulse(Direction::Down);
        a.apply_directional_impulse(Direction::Down);
        assert_eq!((a.agent.vx, a.agent.vy), (5.0, 5.0));
        a.apply_directional_impulse(Direction::Left);
        assert_eq!((a.agent.vx, a.agent.vy), (0.0, 5.0));
    }

    #[test]
    fn impulses_are_not_capped() {
        let mut a = arena(3, 3);
        for _ in 0..50 {
            a.apply_directional_impulse(Direction::Left);
        }
        assert_eq!(a.agent.vx, -250.0);
    }
}
