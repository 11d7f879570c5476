use crate::config::EdgePolicy;
use crate::game::grid::{apply_edge, Position};
use crate::game::snake::Snake;
use crate::game::types::DeathCause;

/// Read-only view of a remote body used for collision and food placement.
#[derive(Debug, Clone, Copy)]
pub struct EnemyBody<'a> {
    pub name: &'a str,
    pub segments: &'a [Position],
}

pub fn check_self(candidate: Position, own: &Snake) -> Option<DeathCause> {
    own.contains(candidate).then_some(DeathCause::SelfHit)
}

/// Any overlap with any remote segment is lethal, head or body alike.
pub fn check_enemies(candidate: Position, enemies: &[EnemyBody<'_>]) -> Option<DeathCause> {
    enemies
        .iter()
        .find(|enemy| enemy.segments.contains(&candidate))
        .map(|enemy| DeathCause::enemy(enemy.name))
}

/// Self first, then enemies, in the order the tick resolves them.
pub fn check_collision(
    candidate: Position,
    own: &Snake,
    enemies: &[EnemyBody<'_>],
) -> Option<DeathCause> {
    check_self(candidate, own).or_else(|| check_enemies(candidate, enemies))
}

/// Best-effort guess whether a peer that just vanished did so by running into `own`.
///
/// Projects the peer's next head from its last two known segments. Remote clients
/// never report who killed them, so this is the only signal available locally.
pub fn ran_into(
    peer: &[Position],
    own: &Snake,
    tile_count: i32,
    edge_policy: EdgePolicy,
) -> bool {
    let (head, neck) = match peer {
        [head, neck, ..] => (*head, *neck),
        _ => return false,
    };

    let dx = unwrap_delta(head.x - neck.x);
    let dy = unwrap_delta(head.y - neck.y);
    if dx.abs() + dy.abs() != 1 {
        return false;
    }

    match apply_edge(Position::new(head.x + dx, head.y + dy), tile_count, edge_policy) {
        Some(next) => own.contains(next),
        None => false,
    }
}

// A wrapped step shows up as a jump across the whole grid.
fn unwrap_delta(d: i32) -> i32 {
    if d.abs() > 1 {
        -d.signum()
    } else {
        d
    }
}
