/// Error taxonomy.
///
/// Construction is the only fallible phase: once a maze is carved nothing
/// downstream can fail, so every variant here is raised before the first
/// frame is drawn.

use thiserror::Error;

/// Rejected configuration. Raised by `GameConfig::validate` and by the
/// constructors that take raw dimensions.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("grid needs at least one row and one column (got {rows}x{cols})")]
    EmptyGrid { rows: usize, cols: usize },

    #[error("grid of {rows}x{cols} cells does not fit in memory addressing")]
    GridTooLarge { rows: usize, cols: usize },

    #[error("viewport must be positive (got {width}x{height})")]
    EmptyViewport { width: f32, height: f32 },

    #[error("margin must be within [0, 1) (got {0})")]
    Margin(f32),

    #[error("{name} must be positive (got {value})")]
    NonPositive { name: &'static str, value: f32 },

    #[error("{name} must be within [{min}, {max}] (got {value})")]
    OutOfRange { name: &'static str, value: f32, min: f32, max: f32 },

    #[error("ball radius {radius} does not fit the corridors (must stay below {clearance}); use fewer rows/cols, a larger viewport or a smaller agent_radius_fraction")]
    AgentTooLarge { radius: f32, clearance: f32 },
}

#[derive(Debug, Error, PartialEq)]
pub enum MazeError {
    /// The explicit traversal stack could not be reserved up front.
    /// Carving never starts, so no partially visited grid escapes.
    #[error("could not reserve a traversal stack for {cells} cells")]
    StackExhausted { cells: usize },
}

#[derive(Debug, Error)]
pub enum ArenaError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("maze generation failed: {0}")]
    Maze(#[from] MazeError),
}
