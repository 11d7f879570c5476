use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::{EdgePolicy, GameConfig, FOOD_SCORE, KILL_BONUS, START_LENGTH};
use crate::game::collision::{check_collision, EnemyBody};
use crate::game::food::spawn_food;
use crate::game::grid::{apply_edge, Direction, Position};
use crate::game::snake::Snake;
use crate::game::types::{DeathCause, GameState, RunState, TickOutcome};

/// Tick state machine for the local snake: `Idle -> Running -> Dead -> Running`.
///
/// Direction input is double buffered. `set_direction` only writes `pending`; the
/// tick commits it into `effective` before moving, so two quick inputs can never
/// fold the snake back onto its own neck.
pub struct Simulation {
    tile_count: i32,
    edge_policy: EdgePolicy,

    snake: Snake,
    effective: Direction,
    pending: Direction,
    food: Position,

    state: GameState,
    run_state: RunState,
    death: Option<DeathCause>,

    rng: ChaCha8Rng,
}

impl Simulation {
    pub fn new(config: &GameConfig) -> Self {
        Self::with_rng(config, ChaCha8Rng::from_entropy())
    }

    pub fn with_seed(config: &GameConfig, seed: u64) -> Self {
        Self::with_rng(config, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(config: &GameConfig, rng: ChaCha8Rng) -> Self {
        let center = Position::new(config.tile_count / 2, config.tile_count / 2);
        Self {
            tile_count: config.tile_count,
            edge_policy: config.edge_policy,
            snake: Snake::new_vertical(center, START_LENGTH),
            effective: Direction::UP,
            pending: Direction::UP,
            food: Position::new(0, 0),
            state: GameState::default(),
            run_state: RunState::Idle,
            death: None,
            rng,
        }
    }

    /// Puts a prepared layout into `Running`. Scores start from zero.
    pub fn with_layout(
        config: &GameConfig,
        seed: u64,
        snake: Snake,
        direction: Direction,
        food: Position,
    ) -> Self {
        let mut sim = Self::with_seed(config, seed);
        sim.place(snake, direction, food);
        sim
    }

    /// Replaces the board with a prepared layout and enters `Running` with zeroed stats.
    pub fn place(&mut self, snake: Snake, direction: Direction, food: Position) {
        self.state = GameState {
            is_playing: true,
            max_length: snake.len(),
            ..GameState::default()
        };
        self.snake = snake;
        self.effective = direction;
        self.pending = direction;
        self.food = food;
        self.death = None;
        self.run_state = RunState::Running;
    }

    /// Fresh snake, direction, score and food; enters `Running`.
    pub fn reset(&mut self, enemies: &[EnemyBody<'_>]) {
        self.snake = Snake::spawn(&mut self.rng, self.tile_count);
        self.effective = Direction::UP;
        self.pending = Direction::UP;
        self.state = GameState {
            is_playing: true,
            ..GameState::default()
        };
        self.death = None;
        self.run_state = RunState::Running;
        self.respawn_food(enemies);
    }

    /// Queues a direction for the next tick.
    ///
    /// Rejected while not running, and when it would reverse either the direction in
    /// effect or the one already queued.
    pub fn set_direction(&mut self, dir: Direction) -> bool {
        if self.run_state != RunState::Running {
            return false;
        }
        if dir.is_reverse_of(self.effective) || dir.is_reverse_of(self.pending) {
            return false;
        }
        self.pending = dir;
        true
    }

    pub fn commit_direction(&mut self) -> Direction {
        self.effective = self.pending;
        self.effective
    }

    pub fn tick(&mut self, enemies: &[EnemyBody<'_>]) -> TickOutcome {
        if self.run_state != RunState::Running {
            return TickOutcome::Idle;
        }

        let dir = self.commit_direction();
        let stepped = self.snake.head().step(dir);

        let head = match apply_edge(stepped, self.tile_count, self.edge_policy) {
            Some(head) => head,
            None => return self.die(DeathCause::Wall),
        };

        if let Some(cause) = check_collision(head, &self.snake, enemies) {
            return self.die(cause);
        }

        let ate = head == self.food;
        self.snake.advance(head, ate);

        if ate {
            self.state.score += FOOD_SCORE;
            self.state.max_length = self.state.max_length.max(self.snake.len());
            self.respawn_food(enemies);
            TickOutcome::Ate
        } else {
            TickOutcome::Moved
        }
    }

    /// Credits a kill observed by the caller. The engine never detects these itself.
    pub fn award_kill(&mut self) -> bool {
        if self.run_state != RunState::Running {
            return false;
        }
        self.state.kills += 1;
        self.state.score += KILL_BONUS;
        true
    }

    /// Drops back to `Idle` without recording a death (session teardown).
    pub fn stop(&mut self) {
        self.run_state = RunState::Idle;
        self.state.is_playing = false;
    }

    fn die(&mut self, cause: DeathCause) -> TickOutcome {
        self.run_state = RunState::Dead;
        self.state.is_playing = false;
        self.state.is_dead = true;
        self.death = Some(cause.clone());
        TickOutcome::Died(cause)
    }

    fn respawn_food(&mut self, enemies: &[EnemyBody<'_>]) {
        let snake = &self.snake;
        self.food = spawn_food(&mut self.rng, self.tile_count, |pos| {
            snake.contains(pos) || enemies.iter().any(|e| e.segments.contains(&pos))
        });
    }

    pub fn snake(&self) -> &Snake {
        &self.snake
    }

    pub fn food(&self) -> Position {
        self.food
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn is_running(&self) -> bool {
        self.run_state == RunState::Running
    }

    pub fn death(&self) -> Option<&DeathCause> {
        self.death.as_ref()
    }

    pub fn effective_direction(&self) -> Direction {
        self.effective
    }

    pub fn pending_direction(&self) -> Direction {
        self.pending
    }

    pub fn tile_count(&self) -> i32 {
        self.tile_count
    }

    pub fn edge_policy(&self) -> EdgePolicy {
        self.edge_policy
    }
}
