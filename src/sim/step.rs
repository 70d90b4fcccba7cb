/// The step function: advances the arena by one tick.
///
/// Processing order:
///   1. Ambient downward force on the agent (zero before the win)
///   2. Integrate the agent in sub-steps, resolving solid obstacles
///   3. Air friction
///   4. Contact bookkeeping → collision-start pairs
///   5. Win reducer (latched, fires at most once)
///   6. Released walls fall to the floor
///
/// Sub-steps keep each move within half a radius, so an agent no faster than
/// `tunnel_free_speed` cannot jump across a wall between two checks. Sub-steps
/// are capped per tick; beyond that speed a move may skip a thin wall.
/// Velocity is never clamped.

use tracing::debug;

use crate::domain::entity::Label;
use crate::domain::physics;
use super::arena::ArenaState;
use super::event::{CollisionPair, GameEvent};

/// Upper bound on sub-steps per tick; very fast agents move further per
/// sub-step instead of stalling the loop.
const MAX_SUBSTEPS: usize = 256;

/// Longest move between two collision checks, in pixels.
fn substep_len(radius: f32) -> f32 {
    (radius * 0.5).max(0.5)
}

/// Highest speed (px/tick) at which every sub-step stays within half a radius.
pub fn tunnel_free_speed(radius: f32) -> f32 {
    MAX_SUBSTEPS as f32 * substep_len(radius)
}

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(arena: &mut ArenaState) -> Vec<GameEvent> {
    let mut events: Vec<GameEvent> = Vec::new();
    arena.tick += 1;

    arena.agent.vy += arena.gravity;
    integrate_agent(arena);
    let keep = 1.0 - arena.air_friction;
    arena.agent.vx *= keep;
    arena.agent.vy *= keep;

    for pair in resolve_contacts(arena) {
        events.push(GameEvent::CollisionStarted(pair));
        if arena.handle_collision(pair) {
            events.push(GameEvent::Won { tick: arena.tick });
            events.push(GameEvent::WallsReleased { count: arena.wall_count() });
        }
    }

    resolve_released_walls(arena);

    events
}

// ══════════════════════════════════════════════════════════════
// Agent motion
// ══════════════════════════════════════════════════════════════

fn integrate_agent(arena: &mut ArenaState) {
    let agent = &mut arena.agent;
    let substeps = ((agent.speed() / substep_len(agent.radius)).ceil() as usize).clamp(1, MAX_SUBSTEPS);
    let frac = 1.0 / substeps as f32;

    for _ in 0..substeps {
        agent.x += agent.vx * frac;
        agent.y += agent.vy * frac;

        for o in arena.obstacles.iter().filter(|o| o.solid) {
            if let Some(c) = physics::penetration(o, agent.x, agent.y, agent.radius) {
                physics::resolve(agent, c, arena.restitution);
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Contacts
// ══════════════════════════════════════════════════════════════

/// Update the contact set and return the pairs that just started touching.
/// Released walls neither block nor report; the goal sensor reports only.
fn resolve_contacts(arena: &mut ArenaState) -> Vec<CollisionPair> {
    let touching: Vec<usize> = arena.obstacles.iter()
        .enumerate()
        .filter(|(_, o)| o.reports_contact() && physics::touching(o, &arena.agent))
        .map(|(i, _)| i)
        .collect();

    let started: Vec<CollisionPair> = touching.iter()
        .filter(|i| !arena.contacts.contains(i))
        .map(|&i| CollisionPair::new(Label::Ball, arena.obstacles[i].label))
        .collect();

    for pair in &started {
        debug!(a = pair.a.as_str(), b = pair.b.as_str(), tick = arena.tick, "collision start");
    }

    arena.contacts = touching;
    started
}

// ══════════════════════════════════════════════════════════════
// Post-win: falling walls
// ══════════════════════════════════════════════════════════════

/// Released wall segments drop under the ambient force and come to rest
/// on top of the bottom boundary (segments already overlapping it snap up
/// onto it). They never block the agent.
fn resolve_released_walls(arena: &mut ArenaState) {
    if arena.gravity <= 0.0 { return; }
    let floor = arena.geometry.floor_y();

    for o in arena.obstacles.iter_mut() {
        if o.label != Label::Wall || o.solid { continue; }
        o.fall_speed += arena.gravity;
        o.y += o.fall_speed;
        if o.bottom() >= floor {
            o.y = floor - o.height / 2.0;
            o.fall_speed = 0.0;
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::domain::grid::Direction;

    const VIEW: (f32, f32) = (1000.0, 1000.0);

    fn arena(rows: usize, cols: usize, seed: u64) -> ArenaState {
        let mut cfg = GameConfig::default();
        cfg.maze.rows = rows;
        cfg.maze.cols = cols;
        cfg.arena.margin = 0.0;
        ArenaState::new(&cfg, VIEW, seed).unwrap()
    }

    fn won_events(events: &[GameEvent]) -> usize {
        events.iter().filter(|e| matches!(e, GameEvent::Won { .. })).count()
    }

    fn run(arena: &mut ArenaState, ticks: usize) -> Vec<GameEvent> {
        (0..ticks).flat_map(|_| step(arena)).collect()
    }

    #[test]
    fn idle_agent_stays_put() {
        let mut a = arena(5, 5, 1);
        let (x, y) = (a.agent.x, a.agent.y);
        let events = run(&mut a, 30);
        assert_eq!((a.agent.x, a.agent.y), (x, y));
        assert!(events.is_empty());
        assert_eq!(a.tick, 30);
    }

    #[test]
    fn single_cell_is_won_on_first_step() {
        // Start and goal share the only cell: the agent spawns on the goal.
        let mut a = arena(1, 1, 0);
        let events = step(&mut a);
        assert!(a.won);
        assert_eq!(won_events(&events), 1);
        assert!(events.contains(&GameEvent::CollisionStarted(CollisionPair::new(Label::Ball, Label::Goal))));
    }

    #[test]
    fn win_is_reported_once_across_steps() {
        let mut a = arena(1, 1, 0);
        let events = run(&mut a, 120);
        assert_eq!(won_events(&events), 1);
        assert_eq!(a.gravity, a.post_win_gravity);
    }

    #[test]
    fn agent_stops_at_closed_wall() {
        // 1×2 with the single gap forced shut: a wall sits at x = 500.
        let mut a = arena(1, 2, 0);
        a.grid = crate::domain::grid::Grid::new(1, 2).unwrap();
        a.restart();
        assert_eq!(a.wall_count(), 1);

        a.apply_directional_impulse(Direction::Right);
        let events = run(&mut a, 200);

        let wall_face = 500.0 - a.geometry.wall_thickness / 2.0;
        assert!(a.agent.x + a.agent.radius <= wall_face + 0.01);
        assert!(events.iter().any(|e| matches!(
            e, GameEvent::CollisionStarted(p) if p.is_between(Label::Ball, Label::Wall)
        )));
        assert!(!a.won);
    }

    #[test]
    fn fast_agent_does_not_tunnel() {
        let mut a = arena(1, 2, 0);
        a.grid = crate::domain::grid::Grid::new(1, 2).unwrap();
        a.restart();
        for _ in 0..40 {
            a.apply_directional_impulse(Direction::Right); // 200 px/step
        }
        run(&mut a, 5);
        assert!(a.agent.x < 500.0);
    }

    #[test]
    fn agent_just_below_tunnel_free_speed_is_stopped() {
        let mut a = arena(1, 2, 0);
        a.grid = crate::domain::grid::Grid::new(1, 2).unwrap();
        a.restart();
        let limit = tunnel_free_speed(a.agent.radius);
        assert_eq!(limit, 256.0 * a.agent.radius * 0.5);
        a.agent.vx = limit * 0.95;
        step(&mut a);
        assert!(a.agent.x < 500.0);
        assert_eq!(a.agent.vx, 0.0);
    }

    #[test]
    fn open_corridor_reaches_goal() {
        // 1×2 carved: the only gap is open, so pushing right reaches the goal.
        let mut a = arena(1, 2, 0);
        assert_eq!(a.wall_count(), 0);
        a.apply_directional_impulse(Direction::Right);
        let events = run(&mut a, 300);
        assert!(a.won);
        assert_eq!(won_events(&events), 1);
        assert!(events.iter().any(|e| matches!(e, GameEvent::WallsReleased { count: 0 })));
    }

    #[test]
    fn resting_contact_reports_once() {
        let mut a = arena(1, 2, 0);
        a.grid = crate::domain::grid::Grid::new(1, 2).unwrap();
        a.restart();
        a.apply_directional_impulse(Direction::Right);
        let events = run(&mut a, 200);
        let wall_hits = events.iter().filter(|e| matches!(
            e, GameEvent::CollisionStarted(p) if p.involves(Label::Wall)
        )).count();
        assert_eq!(wall_hits, 1);
    }

    #[test]
    fn released_walls_fall_to_the_floor() {
        let mut a = arena(4, 4, 3);
        let released = a.wall_count();
        assert!(a.handle_collision(CollisionPair::new(Label::Ball, Label::Goal)));
        run(&mut a, 2000);

        let floor = a.geometry.floor_y();
        let walls: Vec<_> = a.obstacles.iter().filter(|o| o.label == Label::Wall).collect();
        assert_eq!(walls.len(), released);
        for w in walls {
            assert!((w.bottom() - floor).abs() < 1e-3);
            assert_eq!(w.fall_speed, 0.0);
        }
    }

    #[test]
    fn gravity_pulls_agent_after_win() {
        let mut a = arena(3, 3, 8);
        a.handle_collision(CollisionPair::new(Label::Ball, Label::Goal));
        let y0 = a.agent.y;
        run(&mut a, 10);
        assert!(a.agent.y > y0);
    }

    #[test]
    fn agent_never_leaves_arena() {
        let mut a = arena(3, 3, 8);
        a.handle_collision(CollisionPair::new(Label::Ball, Label::Goal));
        for _ in 0..20 {
            a.apply_directional_impulse(Direction::Down);
            a.apply_directional_impulse(Direction::Left);
        }
        run(&mut a, 600);
        let g = a.geometry;
        assert!(a.agent.x > 0.0 && a.agent.x < g.width);
        assert!(a.agent.y > 0.0 && a.agent.y < g.height);
    }

    // ── Terminal-sized arenas ──

    fn terminal_arena(rows: usize) -> ArenaState {
        let mut cfg = GameConfig::default();
        cfg.maze.rows = rows;
        cfg.maze.cols = 14;
        ArenaState::new(&cfg, crate::ui::renderer::viewport_for_terminal(80, 24), 5).unwrap()
    }

    #[test]
    fn ball_in_goal_cell_wins_on_small_terminal() {
        let mut a = terminal_arena(20);
        let (gx, gy) = a.geometry.cell_center(a.geometry.goal_cell());
        a.agent.x = gx;
        a.agent.y = gy;
        let events = run(&mut a, 200);
        assert!(a.won);
        assert_eq!(won_events(&events), 1);
    }

    #[test]
    fn idle_spawn_is_not_pushed_on_small_terminal() {
        for rows in 1..=20 {
            let mut a = terminal_arena(rows);
            let (x, y) = (a.agent.x, a.agent.y);
            run(&mut a, 10);
            assert_eq!((a.agent.x, a.agent.y), (x, y), "rows={rows}");
        }
    }
}
