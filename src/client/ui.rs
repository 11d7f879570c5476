use macroquad::prelude::*;

use crate::config::COLOR_SELF;
use crate::game::math::hex_color;
use crate::game::types::GameMode;
use crate::session::GameSession;

const NAME_MAX_LEN: usize = 16;
const CYAN: Color = Color::new(0.0, 1.0, 1.0, 1.0);
const DIM: Color = Color::new(1.0, 1.0, 1.0, 0.55);

/// Start-screen choice.
pub enum StartAction {
    Play(GameMode),
}

pub enum GameOverAction {
    Respawn,
    Menu,
}

/// Single-line text field fed by macroquad's char queue.
#[derive(Debug, Default)]
pub struct NameInput {
    pub text: String,
}

impl NameInput {
    pub fn new(initial: Option<String>) -> Self {
        Self {
            text: initial.unwrap_or_default(),
        }
    }

    pub fn update(&mut self) {
        while let Some(ch) = get_char_pressed() {
            self.push(ch);
        }
        if is_key_pressed(KeyCode::Backspace) {
            self.text.pop();
        }
    }

    fn push(&mut self, ch: char) {
        if ch.is_control() || self.text.chars().count() >= NAME_MAX_LEN {
            return;
        }
        self.text.push(ch.to_ascii_uppercase());
    }
}

pub fn start_screen(input: &mut NameInput, session: &GameSession) -> Option<StartAction> {
    input.update();
    let w = screen_width();
    let x = w * 0.5 - 180.0;
    let neon = hex_color(COLOR_SELF, GREEN);

    draw_text("CYBERSNAKE", x, 90.0, 56.0, neon);
    draw_text(session.status_message(), x, 120.0, 20.0, DIM);

    draw_text("CALLSIGN", x, 170.0, 20.0, CYAN);
    draw_rectangle_lines(x, 180.0, 360.0, 40.0, 2.0, CYAN);
    draw_text(&input.text, x + 10.0, 208.0, 28.0, WHITE);

    let mut action = None;
    if button_hit(x, 240.0, 170.0, 44.0, "MULTIPLAYER") || is_key_pressed(KeyCode::Enter) {
        action = Some(StartAction::Play(GameMode::Multiplayer));
    }
    if button_hit(x + 190.0, 240.0, 170.0, 44.0, "SOLO") {
        action = Some(StartAction::Play(GameMode::Solo));
    }

    let best = session.personal_best();
    let mut y = 330.0;
    for (label, stats) in [("SOLO", &best.singleplayer), ("MULTI", &best.multiplayer)] {
        draw_text(
            &format!(
                "{label:<6} BEST {:>5}  LEN {:>3}  GAMES {:>3}  KILLS {:>3}",
                stats.high_score, stats.max_length, stats.total_games, stats.kills
            ),
            x,
            y,
            18.0,
            DIM,
        );
        y += 24.0;
    }

    global_leaderboard(x, y + 30.0, session);
    action
}

pub fn game_over_screen(session: &GameSession) -> Option<GameOverAction> {
    let w = screen_width();
    let h = screen_height();
    draw_rectangle(0.0, 0.0, w, h, Color::from_rgba(0, 0, 0, 170));

    let x = w * 0.5 - 160.0;
    let y = h * 0.35;
    let state = session.state();
    draw_text("GAME OVER", x, y, 52.0, Color::from_rgba(255, 0, 85, 255));
    draw_text(&format!("KILLED BY {}", session.killer()), x, y + 40.0, 24.0, WHITE);
    draw_text(
        &format!(
            "SCORE {}   KILLS {}   MAX LENGTH {}",
            state.score, state.kills, state.max_length
        ),
        x,
        y + 72.0,
        20.0,
        DIM,
    );

    if button_hit(x, y + 100.0, 150.0, 44.0, "RESPAWN") || is_key_pressed(KeyCode::R) {
        return Some(GameOverAction::Respawn);
    }
    if button_hit(x + 170.0, y + 100.0, 150.0, 44.0, "MENU") || is_key_pressed(KeyCode::Escape) {
        return Some(GameOverAction::Menu);
    }
    None
}

/// Score line, live ranking and kill feed over the board.
pub fn hud(session: &GameSession) {
    let state = session.state();
    draw_text(
        &format!(
            "SCORE {}  KILLS {}  LEN {}  ONLINE {}",
            state.score,
            state.kills,
            session.snake().len(),
            session.player_count()
        ),
        16.0,
        28.0,
        22.0,
        WHITE,
    );

    let right = screen_width() - 220.0;
    draw_text("LIVE", right, 28.0, 18.0, CYAN);
    for (i, entry) in session.live_leaderboard().iter().enumerate() {
        let color = if entry.is_self { hex_color(COLOR_SELF, GREEN) } else { WHITE };
        draw_text(
            &format!("{}. {} {}", i + 1, entry.name, entry.score),
            right,
            48.0 + i as f32 * 18.0,
            16.0,
            color,
        );
    }

    for (i, kill) in session.kill_feed().iter().enumerate() {
        draw_text(
            &format!("{} > {}", kill.killer, kill.victim),
            16.0,
            52.0 + i as f32 * 18.0,
            16.0,
            Color::from_rgba(255, 0, 85, 220),
        );
    }
}

fn global_leaderboard(x: f32, y: f32, session: &GameSession) {
    draw_text("GLOBAL TOP", x, y, 22.0, CYAN);
    let entries = session.leaderboard();
    if entries.is_empty() {
        draw_text("NO SCORES YET", x, y + 26.0, 18.0, DIM);
        return;
    }
    for (i, entry) in entries.iter().enumerate() {
        draw_text(
            &format!("{:>2}. {:<16} {:>6}  {}", i + 1, entry.name, entry.score, entry.date),
            x,
            y + 26.0 + i as f32 * 20.0,
            18.0,
            WHITE,
        );
    }
}

pub fn button_hit(x: f32, y: f32, w: f32, h: f32, label: &str) -> bool {
    let hovered = {
        let (mx, my) = mouse_position();
        mx >= x && mx <= x + w && my >= y && my <= y + h
    };
    let pressed = hovered && is_mouse_button_pressed(MouseButton::Left);
    let col = if hovered { Color::from_rgba(0, 255, 255, 70) } else { Color::from_rgba(0, 0, 0, 60) };
    draw_rectangle(x, y, w, h, col);
    draw_rectangle_lines(x, y, w, h, 2.0, Color::from_rgba(0, 255, 255, 90));
    draw_text(label, x + 16.0, y + h * 0.65, 20.0, WHITE);
    pressed
}
