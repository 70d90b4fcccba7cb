/// Entry point and game loop.

mod config;
mod domain;
mod error;
mod sim;
mod ui;

use std::fs::File;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crossterm::event::KeyCode;
use tracing::{error, info, warn};
use tracing_subscriber::filter::LevelFilter;

use config::GameConfig;
use domain::entity::Label;
use domain::grid::Direction;
use error::ArenaError;
use sim::arena::ArenaState;
use sim::event::GameEvent;
use sim::step;
use ui::gamepad::GamepadState;
use ui::input::InputState;
use ui::renderer::{self, Renderer};
use ui::sound::SoundEngine;

const FRAME_SLEEP: Duration = Duration::from_millis(5);

/// Simulation ticks a status message stays on screen.
const MESSAGE_TICKS: u32 = 180;

fn main() {
    let config = GameConfig::load();
    init_logging(&config);

    let seed = config.maze.seed.unwrap_or_else(rand::random);
    let arena = match build_arena(&config, seed) {
        Ok(a) => a,
        Err(e) => {
            error!("cannot build arena: {e}");
            eprintln!("mazeball: {e}");
            std::process::exit(2);
        }
    };

    let mut session = Session::new(arena);
    let mut renderer = Renderer::new();

    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();
    if let Some(sfx) = sound.as_ref() {
        sfx.play_new_maze();
    }

    let result = game_loop(&mut session, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        error!("game loop failed: {e}");
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Mazeball!");
    if session.arena.won {
        println!("Solved seed {} in {} ticks.", session.arena.seed, session.solved_at.unwrap_or(0));
    }
}

/// Route tracing output to the configured log file; stdout belongs to the
/// renderer. Without a writable file, logging stays off.
fn init_logging(config: &GameConfig) {
    let level = config.log.level.parse::<LevelFilter>().unwrap_or_else(|_| {
        eprintln!("Warning: unknown log level {:?}, using info", config.log.level);
        LevelFilter::INFO
    });

    match File::create(&config.log.file) {
        Ok(file) => {
            tracing_subscriber::fmt()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_max_level(level)
                .init();
        }
        Err(e) => {
            eprintln!("Warning: could not open log file {}: {e}", config.log.file.display());
        }
    }
}

/// Arena sized to the configured viewport, or to the terminal when none is set.
fn build_arena(config: &GameConfig, seed: u64) -> Result<ArenaState, ArenaError> {
    let viewport = config.arena.viewport.unwrap_or_else(|| {
        let (cols, rows) = crossterm::terminal::size().unwrap_or((80, 24));
        renderer::viewport_for_terminal(cols, rows)
    });
    ArenaState::new(config, viewport, seed)
}

// ── Session: arena plus front-end state ──

struct Session {
    arena: ArenaState,
    paused: bool,
    message: String,
    message_timer: u32,
    solved_at: Option<u64>,
}

impl Session {
    fn new(arena: ArenaState) -> Self {
        let mut s = Session {
            arena,
            paused: false,
            message: String::new(),
            message_timer: 0,
            solved_at: None,
        };
        s.announce_maze();
        s
    }

    fn set_message(&mut self, msg: String) {
        self.message = msg;
        self.message_timer = MESSAGE_TICKS;
    }

    fn announce_maze(&mut self) {
        let a = &self.arena;
        let msg = format!("New {}×{} maze, seed {}", a.grid.rows(), a.grid.cols(), a.seed);
        self.set_message(msg);
    }

    fn tick_message(&mut self) {
        if self.message_timer > 0 {
            self.message_timer -= 1;
            if self.message_timer == 0 { self.message.clear(); }
        }
    }
}

fn game_loop(
    session: &mut Session,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(config.physics.tick_rate_ms);

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }
        if handle_meta(session, sound, &kb, &gp, config) {
            break;
        }
        if !session.paused {
            apply_impulses(&mut session.arena, &kb, &gp);
        }

        if last_tick.elapsed() >= tick_rate {
            if !session.paused {
                let events = step::step(&mut session.arena);
                process_events(session, sound, &events);
            }
            session.tick_message();
            last_tick = Instant::now();
        }

        renderer.render(&session.arena, session.paused, gp.connected, &session.message)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    info!(seed = session.arena.seed, won = session.arena.won, "quit");
    Ok(())
}

fn process_events(session: &mut Session, sound: Option<&SoundEngine>, events: &[GameEvent]) {
    for event in events {
        match event {
            GameEvent::CollisionStarted(pair) => {
                if pair.involves(Label::Wall) || pair.involves(Label::Border) {
                    if let Some(sfx) = sound { sfx.play_bump(); }
                }
            }
            GameEvent::Won { tick } => {
                if let Some(sfx) = sound { sfx.play_win(); }
                session.solved_at = Some(*tick);
                session.set_message(format!("Solved in {tick} ticks!"));
            }
            GameEvent::WallsReleased { count } => {
                info!(count, "walls released");
            }
        }
    }
}

// ── Key Constants ──

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_RESTART: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];
const KEYS_NEW_MAZE: &[KeyCode] = &[KeyCode::Char('n'), KeyCode::Char('N')];
const KEYS_PAUSE: &[KeyCode] = &[KeyCode::Char('p'), KeyCode::Char('P'), KeyCode::F(1)];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Esc, KeyCode::Char('q'), KeyCode::Char('Q')];

/// One impulse per key press or auto-repeat, plus one per gamepad edge.
fn apply_impulses(arena: &mut ArenaState, kb: &InputState, gp: &GamepadState) {
    let keyed = [
        (Direction::Up, KEYS_UP),
        (Direction::Right, KEYS_RIGHT),
        (Direction::Down, KEYS_DOWN),
        (Direction::Left, KEYS_LEFT),
    ];
    for (dir, keys) in keyed {
        for _ in 0..kb.count(keys) {
            arena.apply_directional_impulse(dir);
        }
    }
    for dir in gp.impulses() {
        arena.apply_directional_impulse(dir);
    }
}

/// Pause, restart, new maze and quit. Returns true to leave the loop.
fn handle_meta(
    session: &mut Session,
    sound: Option<&SoundEngine>,
    kb: &InputState,
    gp: &GamepadState,
    config: &GameConfig,
) -> bool {
    if kb.any_pressed(KEYS_QUIT) || gp.quit_pressed() {
        return true;
    }

    if kb.any_pressed(KEYS_PAUSE) {
        session.paused = !session.paused;
        info!(paused = session.paused, "pause toggled");
        return false;
    }
    if session.paused {
        return false; // Block all other input while paused
    }

    if kb.any_pressed(KEYS_RESTART) || gp.restart_pressed() {
        session.arena.restart();
        session.solved_at = None;
        session.set_message("Restarted".into());
        return false;
    }

    if kb.any_pressed(KEYS_NEW_MAZE) || gp.new_maze_pressed() {
        let seed: u64 = rand::random();
        match build_arena(config, seed) {
            Ok(arena) => {
                session.arena = arena;
                session.solved_at = None;
                session.announce_maze();
                if let Some(sfx) = sound { sfx.play_new_maze(); }
            }
            Err(e) => {
                warn!("new maze failed: {e}");
                session.set_message(format!("New maze failed: {e}"));
            }
        }
    }

    false
}
