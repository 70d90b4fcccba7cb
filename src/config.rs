/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.
/// Values are checked by `validate()` before any arena is built.

use serde::Deserialize;
use std::path::PathBuf;
use tracing::warn;

use crate::error::ConfigError;

// ── Public Config Struct ──

#[derive(Clone, Debug, PartialEq)]
pub struct GameConfig {
    pub maze: MazeConfig,
    pub arena: ArenaConfig,
    pub physics: PhysicsConfig,
    pub gamepad: GamepadConfig,
    pub log: LogConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MazeConfig {
    pub rows: usize,
    pub cols: usize,
    pub seed: Option<u64>,      // None = fresh random seed per maze
}

#[derive(Clone, Debug, PartialEq)]
pub struct ArenaConfig {
    pub viewport: Option<(f32, f32)>, // None = derive from terminal size
    pub margin: f32,
    pub wall_thickness: f32,
    pub border_thickness: f32,
    pub goal_scale: f32,
    pub agent_radius_fraction: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PhysicsConfig {
    pub tick_rate_ms: u64,
    pub impulse: f32,           // velocity added per directional command
    pub post_win_gravity: f32,  // downward force once the goal is reached
    pub air_friction: f32,
    pub restitution: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GamepadConfig {
    pub new_maze: Vec<String>,
    pub restart: Vec<String>,
    pub quit: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LogConfig {
    pub file: PathBuf,
    pub level: String,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    maze: TomlMaze,
    #[serde(default)]
    arena: TomlArena,
    #[serde(default)]
    physics: TomlPhysics,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    log: TomlLog,
}

#[derive(Deserialize, Debug)]
struct TomlMaze {
    #[serde(default = "default_rows")]
    rows: usize,
    #[serde(default = "default_cols")]
    cols: usize,
    #[serde(default)]
    seed: Option<u64>,
}

#[derive(Deserialize, Debug)]
struct TomlArena {
    #[serde(default)]
    viewport_width: Option<f32>,
    #[serde(default)]
    viewport_height: Option<f32>,
    #[serde(default = "default_margin")]
    margin: f32,
    #[serde(default = "default_wall_thickness")]
    wall_thickness: f32,
    #[serde(default = "default_border_thickness")]
    border_thickness: f32,
    #[serde(default = "default_goal_scale")]
    goal_scale: f32,
    #[serde(default = "default_radius_fraction")]
    agent_radius_fraction: f32,
}

#[derive(Deserialize, Debug)]
struct TomlPhysics {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_impulse")]
    impulse: f32,
    #[serde(default = "default_post_win_gravity")]
    post_win_gravity: f32,
    #[serde(default = "default_air_friction")]
    air_friction: f32,
    #[serde(default)]
    restitution: f32,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_new_maze")]
    new_maze: Vec<String>,
    #[serde(default = "default_restart")]
    restart: Vec<String>,
    #[serde(default = "default_quit")]
    quit: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlLog {
    #[serde(default = "default_log_file")]
    file: String,
    #[serde(default = "default_log_level")]
    level: String,
}

// ── Defaults ──

fn default_rows() -> usize { 9 }
fn default_cols() -> usize { 14 }
fn default_margin() -> f32 { 0.05 }
fn default_wall_thickness() -> f32 { 10.0 }
fn default_border_thickness() -> f32 { 30.0 }
fn default_goal_scale() -> f32 { 0.7 }
fn default_radius_fraction() -> f32 { 0.25 }
fn default_tick_rate() -> u64 { 16 }         // ~60 steps per second
fn default_impulse() -> f32 { 5.0 }
fn default_post_win_gravity() -> f32 { 0.25 }  // px per step², roughly a 1g fall at 60Hz
fn default_air_friction() -> f32 { 0.01 }

fn default_new_maze() -> Vec<String> { vec!["A".into(), "Start".into()] }
fn default_restart() -> Vec<String> { vec!["Y".into()] }
fn default_quit() -> Vec<String> { vec!["Select".into()] }
fn default_log_file() -> String { "mazeball.log".into() }
fn default_log_level() -> String { "info".into() }

impl Default for TomlMaze {
    fn default() -> Self {
        TomlMaze { rows: default_rows(), cols: default_cols(), seed: None }
    }
}

impl Default for TomlArena {
    fn default() -> Self {
        TomlArena {
            viewport_width: None,
            viewport_height: None,
            margin: default_margin(),
            wall_thickness: default_wall_thickness(),
            border_thickness: default_border_thickness(),
            goal_scale: default_goal_scale(),
            agent_radius_fraction: default_radius_fraction(),
        }
    }
}

impl Default for TomlPhysics {
    fn default() -> Self {
        TomlPhysics {
            tick_rate_ms: default_tick_rate(),
            impulse: default_impulse(),
            post_win_gravity: default_post_win_gravity(),
            air_friction: default_air_friction(),
            restitution: 0.0,
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            new_maze: default_new_maze(),
            restart: default_restart(),
            quit: default_quit(),
        }
    }
}

impl Default for TomlLog {
    fn default() -> Self {
        TomlLog { file: default_log_file(), level: default_log_level() }
    }
}

// ── Loading ──

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_toml(TomlConfig::default(), &[])
    }
}

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        GameConfig::from_toml(toml_cfg, &search_dirs)
    }

    /// Parse a config document. Missing keys take their defaults.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        let toml_cfg = toml::from_str::<TomlConfig>(text)?;
        Ok(GameConfig::from_toml(toml_cfg, &[]))
    }

    fn from_toml(cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        // Only a fully specified viewport overrides the terminal-derived one.
        let viewport = match (cfg.arena.viewport_width, cfg.arena.viewport_height) {
            (Some(w), Some(h)) => Some((w, h)),
            _ => None,
        };

        // Relative log paths land next to an existing config dir, else CWD.
        let log_file = PathBuf::from(&cfg.log.file);
        let log_file = if log_file.is_absolute() {
            log_file
        } else {
            search_dirs.iter()
                .find(|d| d.join("config.toml").exists())
                .map(|d| d.join(&log_file))
                .unwrap_or(log_file)
        };

        GameConfig {
            maze: MazeConfig {
                rows: cfg.maze.rows,
                cols: cfg.maze.cols,
                seed: cfg.maze.seed,
            },
            arena: ArenaConfig {
                viewport,
                margin: cfg.arena.margin,
                wall_thickness: cfg.arena.wall_thickness,
                border_thickness: cfg.arena.border_thickness,
                goal_scale: cfg.arena.goal_scale,
                agent_radius_fraction: cfg.arena.agent_radius_fraction,
            },
            physics: PhysicsConfig {
                tick_rate_ms: cfg.physics.tick_rate_ms,
                impulse: cfg.physics.impulse,
                post_win_gravity: cfg.physics.post_win_gravity,
                air_friction: cfg.physics.air_friction,
                restitution: cfg.physics.restitution,
            },
            gamepad: GamepadConfig {
                new_maze: cfg.gamepad.new_maze,
                restart: cfg.gamepad.restart,
                quit: cfg.gamepad.quit,
            },
            log: LogConfig {
                file: log_file,
                level: cfg.log.level,
            },
        }
    }

    /// Reject values that would produce a degenerate arena.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (rows, cols) = (self.maze.rows, self.maze.cols);
        if rows == 0 || cols == 0 {
            return Err(ConfigError::EmptyGrid { rows, cols });
        }
        if rows.checked_mul(cols).is_none() {
            return Err(ConfigError::GridTooLarge { rows, cols });
        }
        if let Some((w, h)) = self.arena.viewport {
            if !(w > 0.0 && h > 0.0) {
                return Err(ConfigError::EmptyViewport { width: w, height: h });
            }
        }
        if !(0.0..1.0).contains(&self.arena.margin) {
            return Err(ConfigError::Margin(self.arena.margin));
        }

        positive("wall_thickness", self.arena.wall_thickness)?;
        positive("border_thickness", self.arena.border_thickness)?;
        positive("goal_scale", self.arena.goal_scale)?;
        positive("agent_radius_fraction", self.arena.agent_radius_fraction)?;
        positive("tick_rate_ms", self.physics.tick_rate_ms as f32)?;
        positive("impulse", self.physics.impulse)?;
        positive("post_win_gravity", self.physics.post_win_gravity)?;

        within("air_friction", self.physics.air_friction, 0.0, 0.99)?;
        within("restitution", self.physics.restitution, 0.0, 1.0)?;
        Ok(())
    }
}

fn positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}

fn within(name: &'static str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { name, value, min, max })
    }
}

/// Candidate directories to search: exe dir + CWD + data paths (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable (symlinks resolved)
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/mazeball)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/mazeball");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    // 4. System data directory
    let sys = PathBuf::from("/usr/share/mazeball");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
///
/// Runs before the log subscriber exists, so problems go to stderr as well.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() { continue; }
        match std::fs::read_to_string(&path) {
            Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    eprintln!("Warning: config.toml parse error: {e}");
                    eprintln!("Using default settings.");
                    warn!(path = %path.display(), "config parse error, using defaults: {e}");
                    return TomlConfig::default();
                }
            },
            Err(e) => {
                eprintln!("Warning: could not read {}: {e}", path.display());
                warn!(path = %path.display(), "could not read config: {e}");
            }
        }
    }
    TomlConfig::default()
}
