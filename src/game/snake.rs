use std::collections::VecDeque;

use rand::Rng;

use crate::config::{SPAWN_MARGIN, START_LENGTH};
use crate::game::grid::Position;

/// Local snake body, head at the front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snake {
    body: VecDeque<Position>,
}

impl Snake {
    /// Vertical body with the head on top, tail trailing downwards.
    pub fn new_vertical(head: Position, length: usize) -> Self {
        let body = (0..length.max(1) as i32)
            .map(|i| Position::new(head.x, head.y + i))
            .collect();
        Self { body }
    }

    pub fn from_segments(segments: impl IntoIterator<Item = Position>) -> Option<Self> {
        let body: VecDeque<Position> = segments.into_iter().collect();
        if body.is_empty() {
            None
        } else {
            Some(Self { body })
        }
    }

    /// Random start keeping `SPAWN_MARGIN` cells from every edge.
    pub fn spawn<R: Rng>(rng: &mut R, tile_count: i32) -> Self {
        let lo = SPAWN_MARGIN.min(tile_count / 2);
        let hi = (tile_count - SPAWN_MARGIN).max(lo + 1);
        let x = rng.gen_range(lo..hi);
        let y = rng.gen_range(lo..hi);
        Self::new_vertical(Position::new(x, y), START_LENGTH)
    }

    pub fn head(&self) -> Position {
        self.body[0]
    }

    pub fn tail(&self) -> Position {
        self.body[self.body.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.body.contains(&pos)
    }

    pub fn segments(&self) -> impl Iterator<Item = &Position> + '_ {
        self.body.iter()
    }

    pub fn to_vec(&self) -> Vec<Position> {
        self.body.iter().copied().collect()
    }

    /// Pushes a new head; the tail is dropped unless the snake grows this step.
    pub fn advance(&mut self, head: Position, grow: bool) {
        self.body.push_front(head);
        if !grow {
            self.body.pop_back();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn spawn_respects_margin() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..200 {
            let snake = Snake::spawn(&mut rng, 30);
            let head = snake.head();
            assert!((5..25).contains(&head.x));
            assert!((5..25).contains(&head.y));
            assert_eq!(snake.len(), START_LENGTH);
            assert_eq!(snake.tail(), Position::new(head.x, head.y + 2));
        }
    }

    #[test]
    fn advance_keeps_or_drops_tail() {
        let mut snake = Snake::new_vertical(Position::new(5, 5), 3);
        snake.advance(Position::new(5, 4), false);
        assert_eq!(
            snake.to_vec(),
            vec![Position::new(5, 4), Position::new(5, 5), Position::new(5, 6)]
        );
        snake.advance(Position::new(5, 3), true);
        assert_eq!(snake.len(), 4);
        assert_eq!(snake.tail(), Position::new(5, 6));
    }

    #[test]
    fn empty_segments_are_not_a_snake() {
        assert!(Snake::from_segments(Vec::new()).is_none());
    }
}
