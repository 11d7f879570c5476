use serde::{Deserialize, Serialize};

use crate::config::EdgePolicy;

/// A tile coordinate. Valid cells satisfy `0 <= x, y < tile_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(self, dir: Direction) -> Self {
        Self {
            x: self.x + dir.dx,
            y: self.y + dir.dy,
        }
    }
}

/// Unit orthogonal step. Only the four constants can exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Direction {
    dx: i32,
    dy: i32,
}

impl Direction {
    pub const UP: Self = Self { dx: 0, dy: -1 };
    pub const DOWN: Self = Self { dx: 0, dy: 1 };
    pub const LEFT: Self = Self { dx: -1, dy: 0 };
    pub const RIGHT: Self = Self { dx: 1, dy: 0 };

    pub fn from_delta(dx: i32, dy: i32) -> Option<Self> {
        match (dx, dy) {
            (0, -1) => Some(Self::UP),
            (0, 1) => Some(Self::DOWN),
            (-1, 0) => Some(Self::LEFT),
            (1, 0) => Some(Self::RIGHT),
            _ => None,
        }
    }

    pub fn dx(self) -> i32 {
        self.dx
    }

    pub fn dy(self) -> i32 {
        self.dy
    }

    pub fn opposite(self) -> Self {
        Self {
            dx: -self.dx,
            dy: -self.dy,
        }
    }

    pub fn is_reverse_of(self, other: Self) -> bool {
        self == other.opposite()
    }
}

pub fn wrap(pos: Position, tile_count: i32) -> Position {
    Position {
        x: pos.x.rem_euclid(tile_count),
        y: pos.y.rem_euclid(tile_count),
    }
}

pub fn is_out_of_bounds(pos: Position, tile_count: i32) -> bool {
    pos.x < 0 || pos.y < 0 || pos.x >= tile_count || pos.y >= tile_count
}

/// Applies the edge policy. `None` means the step left the grid under `Wall`.
pub fn apply_edge(pos: Position, tile_count: i32, policy: EdgePolicy) -> Option<Position> {
    match policy {
        EdgePolicy::Wrap => Some(wrap(pos, tile_count)),
        EdgePolicy::Wall if is_out_of_bounds(pos, tile_count) => None,
        EdgePolicy::Wall => Some(pos),
    }
}

pub fn occupied<'a>(pos: Position, segments: impl IntoIterator<Item = &'a Position>) -> bool {
    segments.into_iter().any(|seg| *seg == pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_maps_negative_and_overflowing_coords() {
        assert_eq!(wrap(Position::new(-1, 30), 30), Position::new(29, 0));
        assert_eq!(wrap(Position::new(-31, 61), 30), Position::new(29, 1));
        assert_eq!(wrap(Position::new(4, 7), 30), Position::new(4, 7));
    }

    #[test]
    fn bounds_are_half_open() {
        assert!(!is_out_of_bounds(Position::new(0, 0), 30));
        assert!(!is_out_of_bounds(Position::new(29, 29), 30));
        assert!(is_out_of_bounds(Position::new(30, 5), 30));
        assert!(is_out_of_bounds(Position::new(5, -1), 30));
    }

    #[test]
    fn wall_policy_rejects_out_of_grid_steps() {
        let off = Position::new(-1, 3);
        assert_eq!(apply_edge(off, 30, EdgePolicy::Wall), None);
        assert_eq!(apply_edge(off, 30, EdgePolicy::Wrap), Some(Position::new(29, 3)));
    }

    #[test]
    fn direction_reversal() {
        assert!(Direction::UP.is_reverse_of(Direction::DOWN));
        assert!(Direction::LEFT.is_reverse_of(Direction::RIGHT));
        assert!(!Direction::UP.is_reverse_of(Direction::LEFT));
        assert!(!Direction::UP.is_reverse_of(Direction::UP));
        assert_eq!(Direction::from_delta(1, 1), None);
    }

    #[test]
    fn occupied_scans_all_segments() {
        let body = [Position::new(1, 1), Position::new(1, 2)];
        let other = [Position::new(7, 7)];
        assert!(occupied(Position::new(1, 2), body.iter()));
        assert!(occupied(Position::new(7, 7), body.iter().chain(other.iter())));
        assert!(!occupied(Position::new(0, 0), body.iter().chain(other.iter())));
    }
}
