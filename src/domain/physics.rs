/// Contact math between the agent (circle) and obstacles (axis-aligned
/// rectangles). Pure functions, no world state.
///
/// ## Two queries
///
///   1. PENETRATION: is the circle overlapping the rectangle? If so, along
///      which normal and how deep. Used to push the agent back out.
///   2. TOUCHING: is the circle within `slop` of the rectangle? Used for
///      collision-start bookkeeping, so a body resting against a wall after
///      being pushed out still counts as in contact.
///
/// Normals always point from the rectangle towards the circle center.

use super::entity::{Agent, Obstacle};

/// Distance below which a resting agent still counts as touching.
pub const CONTACT_SLOP: f32 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contact {
    pub nx: f32,
    pub ny: f32,
    pub depth: f32,
}

/// Closest point of the rectangle to (px, py).
#[inline]
fn closest_point(o: &Obstacle, px: f32, py: f32) -> (f32, f32) {
    (px.clamp(o.left(), o.right()), py.clamp(o.top(), o.bottom()))
}

/// Distance from the circle center to the rectangle (0 when inside).
pub fn distance_to(o: &Obstacle, px: f32, py: f32) -> f32 {
    let (qx, qy) = closest_point(o, px, py);
    (px - qx).hypot(py - qy)
}

/// Overlap between a circle and a rectangle, if any.
///
/// Center outside the rectangle: normal runs from the closest point to the
/// center. Center inside: push out through the nearest face.
pub fn penetration(o: &Obstacle, cx: f32, cy: f32, radius: f32) -> Option<Contact> {
    let (qx, qy) = closest_point(o, cx, cy);
    let (dx, dy) = (cx - qx, cy - qy);
    let dist = dx.hypot(dy);

    if dist > 0.0 {
        if dist >= radius { return None; }
        return Some(Contact { nx: dx / dist, ny: dy / dist, depth: radius - dist });
    }

    // Center inside (or exactly on the edge): pick the shallowest face.
    let faces = [
        (cx - o.left(), -1.0, 0.0),
        (o.right() - cx, 1.0, 0.0),
        (cy - o.top(), 0.0, -1.0),
        (o.bottom() - cy, 0.0, 1.0),
    ];
    let (inset, nx, ny) = faces
        .into_iter()
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .unwrap_or((0.0, 0.0, -1.0));
    Some(Contact { nx, ny, depth: inset + radius })
}

pub fn touching(o: &Obstacle, agent: &Agent) -> bool {
    distance_to(o, agent.x, agent.y) <= agent.radius + CONTACT_SLOP
}

/// Move the agent out of the obstacle and cancel the approaching part of
/// its velocity. `restitution` 0 = dead stop along the normal, 1 = mirror.
pub fn resolve(agent: &mut Agent, contact: Contact, restitution: f32) {
    agent.x += contact.nx * contact.depth;
    agent.y += contact.ny * contact.depth;

    let vn = agent.vx * contact.nx + agent.vy * contact.ny;
    if vn < 0.0 {
        let k = (1.0 + restitution) * vn;
        agent.vx -= k * contact.nx;
        agent.vy -= k * contact.ny;
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
