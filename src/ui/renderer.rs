/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// The arena lives in continuous pixels; `MapScale` maps it onto terminal
/// cells, assuming a cell is roughly twice as tall as it is wide.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::entity::{Label, Obstacle};
use crate::domain::layout::ArenaGeometry;
use crate::sim::arena::ArenaState;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: [u8; 4],
    ch_len: u8,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells, also used
    /// for `Clear` so the gaps between rows match the cells.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell {
        ch: [b' ', 0, 0, 0],
        ch_len: 1,
        fg: Color::White,
        bg: Cell::BASE_BG,
    };

    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell {
        ch: [b'?', 0, 0, 0],
        ch_len: 1,
        fg: Color::Magenta,
        bg: Color::Magenta,
    };

    /// Normalize bg: Color::Reset → BASE_BG so that every cell gets an
    /// explicit background color (never terminal-default).
    #[inline]
    fn norm_bg(bg: Color) -> Color {
        match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        }
    }

    fn from_char(c: char, fg: Color, bg: Color) -> Self {
        let mut cell = Self::BLANK;
        cell.ch_len = c.encode_utf8(&mut cell.ch).len() as u8;
        cell.fg = fg;
        cell.bg = Self::norm_bg(bg);
        cell
    }

    fn as_str(&self) -> &str {
        std::str::from_utf8(&self.ch[..self.ch_len as usize]).unwrap_or("?")
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Cell::BLANK; w * h],
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y) with given colors. Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::from_char(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::from_char(' ', Color::White, bg));
        }
    }
}

// ── Layout constants ──

/// Arena pixels covered by one terminal column / row at scale 1.
pub const PX_PER_COL: f32 = 8.0;
pub const PX_PER_ROW: f32 = 16.0;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;
/// HUD + gap above the map, message + gap + help below it.
pub const RESERVED_ROWS: usize = MAP_ROW + 3;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const WALL_BG: Color = Color::Rgb { r: 170, g: 170, b: 190 };
const BORDER_BG: Color = Color::Rgb { r: 90, g: 90, b: 130 };
const RELEASED_FG: Color = Color::Rgb { r: 110, g: 110, b: 120 };
const GOAL_BG: Color = Color::Rgb { r: 30, g: 110, b: 50 };
const BALL_FG: Color = Color::Rgb { r: 255, g: 200, b: 40 };
const BANNER: Color = Color::Rgb { r: 255, g: 220, b: 50 };

/// Arena viewport (pixels) that fills a terminal of `cols` × `rows`.
pub fn viewport_for_terminal(cols: u16, rows: u16) -> (f32, f32) {
    let map_rows = (rows as usize).saturating_sub(RESERVED_ROWS).max(1);
    (cols.max(1) as f32 * PX_PER_COL, map_rows as f32 * PX_PER_ROW)
}

// ── MapScale: arena pixels → terminal cells ──

/// Uniform scale fitting the arena (boundary included) into a cell box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MapScale {
    /// Arena coordinate shown at the map's top-left corner.
    origin_x: f32,
    origin_y: f32,
    px_per_col: f32,
    px_per_row: f32,
    pub cols: usize,
    pub rows: usize,
}

impl MapScale {
    pub fn fit(geo: &ArenaGeometry, max_cols: usize, max_rows: usize) -> Self {
        let pad = geo.border_thickness / 2.0;
        let (w, h) = (geo.width + 2.0 * pad, geo.height + 2.0 * pad);
        let k = (w / (PX_PER_COL * max_cols.max(1) as f32))
            .max(h / (PX_PER_ROW * max_rows.max(1) as f32));
        let (px_per_col, px_per_row) = (PX_PER_COL * k, PX_PER_ROW * k);
        MapScale {
            origin_x: -pad,
            origin_y: -pad,
            px_per_col,
            px_per_row,
            cols: ((w / px_per_col).ceil() as usize).clamp(1, max_cols.max(1)),
            rows: ((h / px_per_row).ceil() as usize).clamp(1, max_rows.max(1)),
        }
    }

    fn col_of(&self, x: f32) -> isize {
        ((x - self.origin_x) / self.px_per_col).floor() as isize
    }

    fn row_of(&self, y: f32) -> isize {
        ((y - self.origin_y) / self.px_per_row).floor() as isize
    }

    /// Inclusive cell ranges touched by a rectangle. A rectangle thinner
    /// than a cell still covers the cell it falls in.
    fn span(&self, left: f32, right: f32, top: f32, bottom: f32) -> Option<(usize, usize, usize, usize)> {
        let c0 = self.col_of(left);
        let c1 = self.col_of(right - 1e-3).max(c0);
        let r0 = self.row_of(top);
        let r1 = self.row_of(bottom - 1e-3).max(r0);
        let (cols, rows) = (self.cols as isize, self.rows as isize);
        if c1 < 0 || r1 < 0 || c0 >= cols || r0 >= rows {
            return None;
        }
        Some((
            c0.max(0) as usize,
            c1.min(cols - 1) as usize,
            r0.max(0) as usize,
            r1.min(rows - 1) as usize,
        ))
    }

    /// Cell under an arena point, if on the map.
    fn cell_at(&self, x: f32, y: f32) -> Option<(usize, usize)> {
        let (c, r) = (self.col_of(x), self.row_of(y));
        if c < 0 || r < 0 || c >= self.cols as isize || r >= self.rows as isize {
            return None;
        }
        Some((c as usize, r as usize))
    }
}

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame: back ≠ front for every cell.
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// Draw one frame. `message` is shown under the map when non-empty;
    /// `gamepad` marks a connected controller in the HUD.
    pub fn render(&mut self, arena: &ArenaState, paused: bool, gamepad: bool, message: &str) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        self.front.clear();

        let map_rows = self.term_h.saturating_sub(RESERVED_ROWS).max(1);
        let scale = MapScale::fit(&arena.geometry, self.term_w.max(1), map_rows);

        self.compose_hud(arena, paused, gamepad);
        self.compose_map(arena, &scale);
        self.compose_footer(&scale, message);
        if arena.won {
            self.compose_win_banner(&scale);
        }
        if paused {
            self.compose_pause_overlay(&scale);
        }

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors; ResetColor would fall back to the terminal's
        // own default and show seams between rows.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }

                queue!(self.writer, Print(cell.as_str()))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_hud(&mut self, a: &ArenaState, paused: bool, gamepad: bool) {
        let hud = hud_text(a, paused, gamepad);
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);
    }

    fn compose_map(&mut self, a: &ArenaState, scale: &MapScale) {
        // Goal underneath, then walls, boundary on top, ball last.
        if let Some(goal) = a.goal() {
            self.paint_rect(goal, scale, Cell::from_char(' ', Color::White, GOAL_BG));
        }
        for o in a.obstacles.iter().filter(|o| o.label == Label::Wall) {
            let cell = if o.solid {
                Cell::from_char(' ', Color::White, WALL_BG)
            } else {
                Cell::from_char('░', RELEASED_FG, Color::Reset)
            };
            self.paint_rect(o, scale, cell);
        }
        for o in a.obstacles.iter().filter(|o| o.label == Label::Border) {
            self.paint_rect(o, scale, Cell::from_char(' ', Color::White, BORDER_BG));
        }
        self.paint_agent(a, scale);
    }

    fn paint_rect(&mut self, o: &Obstacle, scale: &MapScale, cell: Cell) {
        if let Some((c0, c1, r0, r1)) = scale.span(o.left(), o.right(), o.top(), o.bottom()) {
            for row in r0..=r1 {
                for col in c0..=c1 {
                    self.front.set(col, MAP_ROW + row, cell);
                }
            }
        }
    }

    /// Cells whose center lies inside the ball; the center cell at least.
    fn paint_agent(&mut self, a: &ArenaState, scale: &MapScale) {
        let ball = &a.agent;
        let r = ball.radius;
        let Some((c0, c1, r0, r1)) = scale.span(ball.x - r, ball.x + r, ball.y - r, ball.y + r) else {
            return;
        };
        for row in r0..=r1 {
            for col in c0..=c1 {
                let cx = scale.origin_x + (col as f32 + 0.5) * scale.px_per_col;
                let cy = scale.origin_y + (row as f32 + 0.5) * scale.px_per_row;
                if (cx - ball.x).hypot(cy - ball.y) <= r {
                    self.paint_ball_cell(col, row);
                }
            }
        }
        if let Some((col, row)) = scale.cell_at(ball.x, ball.y) {
            self.paint_ball_cell(col, row);
        }
    }

    fn paint_ball_cell(&mut self, col: usize, row: usize) {
        let bg = self.front.get(col, MAP_ROW + row).bg;
        self.front.set(col, MAP_ROW + row, Cell::from_char('●', BALL_FG, bg));
    }

    fn compose_footer(&mut self, scale: &MapScale, message: &str) {
        let msg_row = MAP_ROW + scale.rows;
        if !message.is_empty() && msg_row < self.front.height {
            let bar = Color::Rgb { r: 200, g: 180, b: 50 };
            self.front.fill_row(msg_row, bar);
            self.front.put_str(0, msg_row, &format!(" ◈ {} ", message), Color::Black, bar);
        }

        let help_row = msg_row + 2;
        if help_row < self.front.height {
            let help = " ←↑↓→/WASD: Push  R: Restart  N: New maze  P/F1: Pause  Q/Esc: Quit";
            self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
        }
    }

    fn compose_win_banner(&mut self, scale: &MapScale) {
        let lines = [
            "╔══════════════════════════╗",
            "║     ★   SOLVED!   ★      ║",
            "║  N: New maze  R: Replay  ║",
            "╚══════════════════════════╝",
        ];
        self.centered_box(scale, &lines, BANNER, Color::Reset);
    }

    fn compose_pause_overlay(&mut self, scale: &MapScale) {
        let lines = [
            "╔══════════════════════╗",
            "║        PAUSED        ║",
            "║  P / F1   Resume     ║",
            "║  Q / Esc  Quit       ║",
            "╚══════════════════════╝",
        ];
        self.centered_box(scale, &lines, BANNER, Color::Rgb { r: 40, g: 40, b: 40 });
    }

    fn centered_box(&mut self, scale: &MapScale, lines: &[&str], fg: Color, bg: Color) {
        let box_w = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let x = scale.cols.saturating_sub(box_w) / 2;
        let y = MAP_ROW + scale.rows.saturating_sub(lines.len()) / 2;
        for (i, l) in lines.iter().enumerate() {
            self.front.put_str(x, y + i, l, fg, bg);
        }
    }
}

/// Status line: maze size and seed, carving depth, velocity, tick and state.
fn hud_text(a: &ArenaState, paused: bool, gamepad: bool) -> String {
    let state = if paused {
        "PAUSED"
    } else if a.won {
        "SOLVED!"
    } else {
        "ROLLING"
    };
    let pad = if gamepad { "  [pad]" } else { "" };
    format!(
        " MAZEBALL  {}×{}  seed:{}  depth:{}  v=({:+.1},{:+.1})  t:{}  {}{} ",
        a.grid.rows(), a.grid.cols(), a.seed, a.stats.max_depth,
        a.agent.vx, a.agent.vy, a.tick, state, pad,
    )
}
