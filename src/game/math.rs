use macroquad::prelude::*;

use crate::config::GRID_SIZE_PX;
use crate::game::grid::Position;

/// Where the square board sits on screen and how big one tile is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardLayout {
    pub origin: Vec2,
    pub cell: f32,
    pub tile_count: i32,
}

impl BoardLayout {
    /// Largest board that fits the area below `top` and above `bottom` margins, centered.
    /// Tiles never shrink below a quarter of their nominal size.
    pub fn fit(screen: Vec2, tile_count: i32, top: f32, bottom: f32) -> Self {
        let tiles = tile_count.max(1) as f32;
        let avail_w = screen.x;
        let avail_h = (screen.y - top - bottom).max(0.0);
        let side = avail_w.min(avail_h);
        let cell = (side / tiles).floor().max(GRID_SIZE_PX * 0.25);
        let board = cell * tiles;
        let origin = vec2(
            ((screen.x - board) * 0.5).max(0.0),
            top + ((avail_h - board) * 0.5).max(0.0),
        );
        Self {
            origin,
            cell,
            tile_count,
        }
    }

    pub fn size(&self) -> f32 {
        self.cell * self.tile_count as f32
    }

    pub fn cell_rect(&self, pos: Position) -> Rect {
        Rect::new(
            self.origin.x + pos.x as f32 * self.cell,
            self.origin.y + pos.y as f32 * self.cell,
            self.cell,
            self.cell,
        )
    }
}

/// `#rrggbb` to a color. Anything else falls back to `fallback`.
pub fn hex_color(value: &str, fallback: Color) -> Color {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 {
        return fallback;
    }
    match u32::from_str_radix(hex, 16) {
        Ok(rgb) => Color::from_rgba((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8, 255),
        Err(_) => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_is_centered_and_square() {
        let layout = BoardLayout::fit(vec2(800.0, 700.0), 30, 100.0, 0.0);
        assert_eq!(layout.cell, 20.0);
        assert_eq!(layout.size(), 600.0);
        assert_eq!(layout.origin, vec2(100.0, 100.0));
        let r = layout.cell_rect(Position::new(1, 2));
        assert_eq!((r.x, r.y, r.w), (120.0, 140.0, 20.0));
    }

    #[test]
    fn parses_neon_palette() {
        let c = hex_color("#39ff14", WHITE);
        assert_eq!(
            (c.r, c.g, c.b),
            (0x39 as f32 / 255.0, 1.0, 0x14 as f32 / 255.0)
        );
        assert_eq!(hex_color("nope", RED), RED);
    }
}
