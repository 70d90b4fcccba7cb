/// Keyboard input collector.
///
/// Every Press or auto-repeat event is one command: holding an arrow key
/// keeps pushing the ball at the terminal's repeat rate, tapping it pushes
/// once. Release events carry no meaning here and are dropped.

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;

pub struct InputState {
    /// Key codes pressed (or auto-repeated) during the last drain, in order.
    /// A key repeated twice in one frame appears twice.
    presses: Vec<KeyCode>,

    /// Raw key events collected during drain, for modifier checks.
    pub raw_events: Vec<KeyEvent>,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
        }
    }

    /// Drain all pending terminal events without blocking.
    /// Call this once per frame, before the simulation tick.
    pub fn drain_events(&mut self) {
        self.presses.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.record(key);
            }
        }
    }

    fn record(&mut self, key: KeyEvent) {
        self.raw_events.push(key);
        if key.kind != KeyEventKind::Release {
            self.presses.push(key.code);
        }
    }

    /// How many times any of these keys fired this frame.
    pub fn count(&self, codes: &[KeyCode]) -> usize {
        self.presses.iter().filter(|c| codes.contains(c)).count()
    }

    /// Was any of these keys pressed this frame?
    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        self.count(codes) > 0
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }
}
