use rand::Rng;

use crate::config::FOOD_SPAWN_ATTEMPTS;
use crate::game::grid::Position;

/// Picks a random cell for food, retrying while `is_blocked` reports the cell taken.
///
/// Placement is best effort: after `FOOD_SPAWN_ATTEMPTS` misses the last candidate is
/// accepted even though it is occupied, so a crowded grid never stalls the tick.
pub fn spawn_food<R, F>(rng: &mut R, tile_count: i32, is_blocked: F) -> Position
where
    R: Rng,
    F: Fn(Position) -> bool,
{
    let mut candidate = random_cell(rng, tile_count);
    for _ in 1..FOOD_SPAWN_ATTEMPTS {
        if !is_blocked(candidate) {
            return candidate;
        }
        candidate = random_cell(rng, tile_count);
    }

    if is_blocked(candidate) {
        tracing::debug!(?candidate, "no free food cell after retries, accepting occupied cell");
    }
    candidate
}

fn random_cell<R: Rng>(rng: &mut R, tile_count: i32) -> Position {
    Position::new(rng.gen_range(0..tile_count), rng.gen_range(0..tile_count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn avoids_blocked_cells_when_possible() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        // Everything except the bottom-right quadrant is blocked.
        let blocked = |p: Position| p.x < 15 || p.y < 15;
        for _ in 0..50 {
            let food = spawn_food(&mut rng, 30, blocked);
            assert!(!blocked(food), "spawned on {food:?}");
        }
    }

    #[test]
    fn accepts_occupied_cell_when_grid_is_full() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let food = spawn_food(&mut rng, 4, |_| true);
        assert!((0..4).contains(&food.x) && (0..4).contains(&food.y));
    }
}
