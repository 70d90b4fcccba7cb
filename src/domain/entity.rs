/// Bodies living in the arena: static rectangles (walls, boundary, goal)
/// and the single dynamic circle steered by the player.
///
/// Coordinates are continuous arena pixels, origin at the top-left corner,
/// y growing downwards. Rectangles are stored by center and size.

use super::grid::Direction;

/// Semantic label carried by every body. Collision notifications name
/// bodies by label only.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Label {
    Ball,
    Wall,
    Border,
    Goal,
}

impl Label {
    pub fn as_str(self) -> &'static str {
        match self {
            Label::Ball => "ball",
            Label::Wall => "wall",
            Label::Border => "border",
            Label::Goal => "goal",
        }
    }
}

/// A static rectangle. `solid` decides whether it blocks the agent;
/// a `sensor` never blocks but still reports contact.
#[derive(Clone, Debug, PartialEq)]
pub struct Obstacle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub label: Label,
    pub solid: bool,
    pub sensor: bool,
    /// Downward speed of a released wall segment (0 while static).
    pub fall_speed: f32,
}

impl Obstacle {
    pub fn new(x: f32, y: f32, width: f32, height: f32, label: Label) -> Self {
        Obstacle { x, y, width, height, label, solid: true, sensor: false, fall_speed: 0.0 }
    }

    /// Non-blocking rectangle that only reports contact.
    pub fn sensor(x: f32, y: f32, width: f32, height: f32, label: Label) -> Self {
        Obstacle { solid: false, sensor: true, ..Obstacle::new(x, y, width, height, label) }
    }

    /// Does the agent report contact with this body?
    pub fn reports_contact(&self) -> bool {
        self.solid || self.sensor
    }

    pub fn left(&self) -> f32 { self.x - self.width / 2.0 }
    pub fn right(&self) -> f32 { self.x + self.width / 2.0 }
    pub fn top(&self) -> f32 { self.y - self.height / 2.0 }
    pub fn bottom(&self) -> f32 { self.y + self.height / 2.0 }
}

/// The user-controlled ball.
#[derive(Clone, Debug, PartialEq)]
pub struct Agent {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub radius: f32,
}

impl Agent {
    pub fn new(x: f32, y: f32, radius: f32) -> Self {
        Agent { x, y, vx: 0.0, vy: 0.0, radius }
    }

    /// Add `magnitude` to the velocity component on `dir`'s axis.
    /// The other component is untouched and nothing is clamped: repeated
    /// pushes keep accumulating speed.
    pub fn push(&mut self, dir: Direction, magnitude: f32) {
        match dir {
            Direction::Up => self.vy -= magnitude,
            Direction::Down => self.vy += magnitude,
            Direction::Left => self.vx -= magnitude,
            Direction::Right => self.vx += magnitude,
        }
    }

    pub fn speed(&self) -> f32 {
        self.vx.hypot(self.vy)
    }
}
