/// Events emitted during a simulation step.
/// The presentation layer consumes these for sound and logging.

use crate::domain::entity::Label;

/// Two bodies that started touching, named by label. Order carries no
/// meaning: the physics layer reports whichever body it saw first.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CollisionPair {
    pub a: Label,
    pub b: Label,
}

impl CollisionPair {
    pub fn new(a: Label, b: Label) -> Self {
        CollisionPair { a, b }
    }

    /// Does this pair name exactly `x` and `y`, in either order?
    pub fn is_between(&self, x: Label, y: Label) -> bool {
        (self.a == x && self.b == y) || (self.a == y && self.b == x)
    }

    pub fn involves(&self, label: Label) -> bool {
        self.a == label || self.b == label
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    CollisionStarted(CollisionPair),
    Won { tick: u64 },
    WallsReleased { count: usize },
}
