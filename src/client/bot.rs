use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::{interval, MissedTickBehavior};

use crate::client::net::RelayStore;
use crate::client::profile::ProfileStore;
use crate::config::{ClientConfig, EdgePolicy, GameConfig};
use crate::game::collision::EnemyBody;
use crate::game::grid::{apply_edge, Direction, Position};
use crate::game::snake::Snake;
use crate::game::types::{GameMode, TickOutcome};
use crate::net::store::{LinkStatus, SharedStore};
use crate::session::GameSession;

const DIRECTIONS: [Direction; 4] = [
    Direction::UP,
    Direction::DOWN,
    Direction::LEFT,
    Direction::RIGHT,
];
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Shortest distance along one axis, honoring wraparound when it applies.
fn axis_distance(a: i32, b: i32, tile_count: i32, edge: EdgePolicy) -> i32 {
    let d = (a - b).abs();
    match edge {
        EdgePolicy::Wrap => d.min(tile_count - d),
        EdgePolicy::Wall => d,
    }
}

fn distance(a: Position, b: Position, tile_count: i32, edge: EdgePolicy) -> i32 {
    axis_distance(a.x, b.x, tile_count, edge) + axis_distance(a.y, b.y, tile_count, edge)
}

/// Greedy one-step lookahead: the safe move that gets closest to the food.
///
/// Returns `None` when every move is fatal, in which case the bot keeps its heading.
pub fn choose_direction(
    snake: &Snake,
    heading: Direction,
    food: Position,
    enemies: &[EnemyBody<'_>],
    tile_count: i32,
    edge: EdgePolicy,
) -> Option<Direction> {
    DIRECTIONS
        .into_iter()
        .filter(|dir| !dir.is_reverse_of(heading))
        .filter_map(|dir| {
            let next = apply_edge(snake.head().step(dir), tile_count, edge)?;
            let blocked = snake.contains(next)
                || enemies.iter().any(|e| e.segments.contains(&next));
            (!blocked).then(|| (dir, distance(next, food, tile_count, edge)))
        })
        .min_by_key(|&(dir, dist)| (dist, dir != heading))
        .map(|(dir, _)| dir)
}

fn steer(session: &mut GameSession) {
    let sim = session.sim();
    if !sim.is_running() {
        return;
    }
    let enemies = session.remote_players().enemy_bodies();
    let choice = choose_direction(
        sim.snake(),
        sim.pending_direction(),
        sim.food(),
        &enemies,
        sim.tile_count(),
        sim.edge_policy(),
    );
    if let Some(dir) = choice {
        session.set_direction(dir);
    }
}

/// Plays multiplayer rounds against the relay until `rounds` deaths (forever if `None`).
pub async fn run(
    game: GameConfig,
    client: ClientConfig,
    name: String,
    rounds: Option<u32>,
) -> anyhow::Result<()> {
    let relay = Arc::new(RelayStore::connect(client.relay_url.clone()));
    let started = Instant::now();
    while relay.status() == LinkStatus::Connecting && started.elapsed() < CONNECT_TIMEOUT {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    if relay.status() != LinkStatus::Online {
        anyhow::bail!("relay at {} is unreachable", client.relay_url);
    }

    let store: Arc<dyn SharedStore> = relay;
    let mut session = GameSession::new(game.clone(), Some(store), ProfileStore::ephemeral());
    let now_ms = || started.elapsed().as_millis() as u64;
    session.start_session(&name, GameMode::Multiplayer);
    tracing::info!(name = %session.player_name(), "bot joined");

    let mut tick = interval(Duration::from_millis(game.tick_ms));
    let mut sync = interval(Duration::from_millis(game.sync_interval_ms));
    let mut sweep = interval(Duration::from_millis(game.ghost_sweep_ms));
    for timer in [&mut tick, &mut sync, &mut sweep] {
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    }

    let mut deaths = 0u32;
    loop {
        tokio::select! {
            _ = tick.tick() => {
                session.pump(now_ms());
                steer(&mut session);
                if let TickOutcome::Died(cause) = session.on_tick(now_ms()) {
                    deaths += 1;
                    tracing::info!(%cause, score = session.state().score, deaths, "bot died");
                    if rounds.is_some_and(|limit| deaths >= limit) {
                        break;
                    }
                    session.respawn();
                }
            }
            _ = sync.tick() => {
                session.on_sync(now_ms());
            }
            _ = sweep.tick() => {
                session.on_sweep(now_ms());
            }
        }
    }

    session.teardown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertical(x: i32, y: i32) -> Snake {
        Snake::new_vertical(Position::new(x, y), 3)
    }

    #[test]
    fn heads_towards_food() {
        let snake = vertical(10, 10);
        let dir = choose_direction(
            &snake,
            Direction::UP,
            Position::new(15, 10),
            &[],
            30,
            EdgePolicy::Wrap,
        );
        assert_eq!(dir, Some(Direction::RIGHT));
    }

    #[test]
    fn prefers_wrapping_when_shorter() {
        let snake = vertical(1, 10);
        let dir = choose_direction(
            &snake,
            Direction::UP,
            Position::new(28, 10),
            &[],
            30,
            EdgePolicy::Wrap,
        );
        assert_eq!(dir, Some(Direction::LEFT));
    }

    #[test]
    fn avoids_enemy_bodies_and_walls() {
        let snake = vertical(0, 10);
        let wall = [Position::new(0, 9)];
        let enemies = [EnemyBody {
            name: "FOO",
            segments: &wall,
        }];
        // Food straight up, but up is blocked and left is off the grid.
        let dir = choose_direction(
            &snake,
            Direction::UP,
            Position::new(0, 2),
            &enemies,
            30,
            EdgePolicy::Wall,
        );
        assert_eq!(dir, Some(Direction::RIGHT));
    }

    #[test]
    fn boxed_in_returns_none() {
        let snake = vertical(5, 5);
        let cells = [Position::new(5, 4), Position::new(4, 5), Position::new(6, 5)];
        let enemies = [EnemyBody {
            name: "BOX",
            segments: &cells,
        }];
        let dir = choose_direction(
            &snake,
            Direction::UP,
            Position::new(0, 0),
            &enemies,
            30,
            EdgePolicy::Wrap,
        );
        assert_eq!(dir, None);
    }
}
