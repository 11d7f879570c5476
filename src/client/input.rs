use macroquad::prelude::*;

use crate::config::SWIPE_THRESHOLD_PX;
use crate::game::grid::Direction;

/// Arrow keys and WASD. Letter keycodes are layout-level, so case never matters.
pub fn direction_for_key(key: KeyCode) -> Option<Direction> {
    match key {
        KeyCode::Up | KeyCode::W => Some(Direction::UP),
        KeyCode::Down | KeyCode::S => Some(Direction::DOWN),
        KeyCode::Left | KeyCode::A => Some(Direction::LEFT),
        KeyCode::Right | KeyCode::D => Some(Direction::RIGHT),
        _ => None,
    }
}

/// Dominant axis of a drag, once it travels further than `threshold` on that axis.
pub fn swipe_direction(dx: f32, dy: f32, threshold: f32) -> Option<Direction> {
    if dx.abs() > dy.abs() {
        if dx.abs() <= threshold {
            return None;
        }
        Some(if dx > 0.0 { Direction::RIGHT } else { Direction::LEFT })
    } else {
        if dy.abs() <= threshold {
            return None;
        }
        Some(if dy > 0.0 { Direction::DOWN } else { Direction::UP })
    }
}

/// Turns touch/drag start and end points into one swipe per gesture.
#[derive(Debug, Default)]
pub struct SwipeTracker {
    start: Option<Vec2>,
}

impl SwipeTracker {
    pub fn begin(&mut self, at: Vec2) {
        self.start = Some(at);
    }

    pub fn end(&mut self, at: Vec2) -> Option<Direction> {
        let start = self.start.take()?;
        let delta = at - start;
        swipe_direction(delta.x, delta.y, SWIPE_THRESHOLD_PX)
    }

    pub fn cancel(&mut self) {
        self.start = None;
    }

    pub fn is_tracking(&self) -> bool {
        self.start.is_some()
    }
}

/// On-screen d-pad: four square buttons in a plus shape around `center`.
#[derive(Debug, Clone, Copy)]
pub struct DPad {
    pub center: Vec2,
    pub button: f32,
}

impl DPad {
    pub fn buttons(&self) -> [(Direction, Rect); 4] {
        let s = self.button;
        let c = self.center;
        let at = |dx: f32, dy: f32| Rect::new(c.x + dx * s - s * 0.5, c.y + dy * s - s * 0.5, s, s);
        [
            (Direction::UP, at(0.0, -1.0)),
            (Direction::DOWN, at(0.0, 1.0)),
            (Direction::LEFT, at(-1.0, 0.0)),
            (Direction::RIGHT, at(1.0, 0.0)),
        ]
    }

    pub fn hit(&self, point: Vec2) -> Option<Direction> {
        self.buttons()
            .into_iter()
            .find(|(_, rect)| rect.contains(point))
            .map(|(dir, _)| dir)
    }

    pub fn draw(&self) {
        for (dir, rect) in self.buttons() {
            draw_rectangle(rect.x, rect.y, rect.w, rect.h, Color::from_rgba(0, 255, 255, 30));
            draw_rectangle_lines(rect.x, rect.y, rect.w, rect.h, 2.0, Color::from_rgba(0, 255, 255, 120));
            let label = match (dir.dx(), dir.dy()) {
                (0, -1) => "^",
                (0, 1) => "v",
                (-1, 0) => "<",
                _ => ">",
            };
            draw_text(label, rect.x + rect.w * 0.38, rect.y + rect.h * 0.65, rect.h * 0.5, WHITE);
        }
    }
}

/// Collects this frame's direction intents from keyboard, swipe and d-pad.
pub fn poll_directions(swipe: &mut SwipeTracker, dpad: Option<&DPad>) -> Vec<Direction> {
    let mut out = Vec::new();
    for key in get_keys_pressed() {
        if let Some(dir) = direction_for_key(key) {
            out.push(dir);
        }
    }

    for touch in touches() {
        match touch.phase {
            TouchPhase::Started => {
                if let Some(dir) = dpad.and_then(|d| d.hit(touch.position)) {
                    out.push(dir);
                } else {
                    swipe.begin(touch.position);
                }
            }
            TouchPhase::Ended => out.extend(swipe.end(touch.position)),
            TouchPhase::Cancelled => swipe.cancel(),
            _ => {}
        }
    }

    let mouse = Vec2::from(mouse_position());
    if is_mouse_button_pressed(MouseButton::Left) {
        if let Some(dir) = dpad.and_then(|d| d.hit(mouse)) {
            out.push(dir);
        } else {
            swipe.begin(mouse);
        }
    }
    if is_mouse_button_released(MouseButton::Left) && swipe.is_tracking() {
        out.extend(swipe.end(mouse));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrows_and_wasd_map_to_directions() {
        assert_eq!(direction_for_key(KeyCode::W), Some(Direction::UP));
        assert_eq!(direction_for_key(KeyCode::Left), Some(Direction::LEFT));
        assert_eq!(direction_for_key(KeyCode::D), Some(Direction::RIGHT));
        assert_eq!(direction_for_key(KeyCode::Space), None);
    }

    #[test]
    fn swipe_needs_to_clear_threshold_on_dominant_axis() {
        assert_eq!(swipe_direction(31.0, 10.0, 30.0), Some(Direction::RIGHT));
        assert_eq!(swipe_direction(-5.0, -40.0, 30.0), Some(Direction::UP));
        assert_eq!(swipe_direction(30.0, 0.0, 30.0), None);
        assert_eq!(swipe_direction(10.0, 20.0, 30.0), None);
    }

    #[test]
    fn tracker_emits_once_per_gesture() {
        let mut tracker = SwipeTracker::default();
        assert_eq!(tracker.end(vec2(100.0, 0.0)), None);
        tracker.begin(vec2(100.0, 100.0));
        assert_eq!(tracker.end(vec2(100.0, 160.0)), Some(Direction::DOWN));
        assert!(!tracker.is_tracking());
    }

    #[test]
    fn dpad_hit_testing() {
        let pad = DPad {
            center: vec2(100.0, 100.0),
            button: 40.0,
        };
        assert_eq!(pad.hit(vec2(100.0, 60.0)), Some(Direction::UP));
        assert_eq!(pad.hit(vec2(140.0, 100.0)), Some(Direction::RIGHT));
        assert_eq!(pad.hit(vec2(100.0, 100.0)), None);
    }
}
