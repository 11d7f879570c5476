use std::sync::Arc;

use macroquad::prelude::*;

use crate::client::input::{poll_directions, DPad, SwipeTracker};
use crate::client::net::RelayStore;
use crate::client::profile::ProfileStore;
use crate::client::ui::{game_over_screen, hud, start_screen, GameOverAction, NameInput, StartAction};
use crate::config::{
    ClientConfig, GameConfig, COLOR_BG, COLOR_ENEMY, COLOR_FOOD, COLOR_GRID, COLOR_SELF,
};
use crate::game::math::{hex_color, BoardLayout};
use crate::game::timers::SessionTimers;
use crate::game::types::TickOutcome;
use crate::net::store::SharedStore;
use crate::session::GameSession;

const HUD_TOP: f32 = 150.0;
const DPAD_BUTTON: f32 = 56.0;
const DPAD_AREA: f32 = DPAD_BUTTON * 3.0 + 24.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Start,
    Playing,
    GameOver,
}

fn now_ms() -> u64 {
    (get_time() * 1000.0) as u64
}

pub async fn run(game: GameConfig, client: ClientConfig) {
    let store: Arc<dyn SharedStore> = Arc::new(RelayStore::connect(client.relay_url.clone()));
    let profile = ProfileStore::from_dir(client.data_dir.clone());
    let mut session = GameSession::new(game.clone(), Some(store), profile);

    let mut name_input = NameInput::new(session.saved_name());
    let mut screen = Screen::Start;
    let mut timers = SessionTimers::new(&game, now_ms());
    let mut swipe = SwipeTracker::default();

    loop {
        let now = now_ms();
        session.pump(now);
        clear_background(hex_color(COLOR_BG, BLACK));

        let screen_size = vec2(screen_width(), screen_height());
        let layout = BoardLayout::fit(screen_size, game.tile_count, HUD_TOP, DPAD_AREA);
        let dpad = DPad {
            center: vec2(screen_size.x * 0.5, screen_size.y - DPAD_AREA * 0.5),
            button: DPAD_BUTTON,
        };

        match screen {
            Screen::Start => {
                if let Some(StartAction::Play(mode)) = start_screen(&mut name_input, &session) {
                    session.start_session(&name_input.text, mode);
                    timers = SessionTimers::new(&game, now);
                    swipe.cancel();
                    screen = Screen::Playing;
                }
            }
            Screen::Playing => {
                for dir in poll_directions(&mut swipe, Some(&dpad)) {
                    session.set_direction(dir);
                }
                if timers.tick.due(now) {
                    if let TickOutcome::Died(_) = session.on_tick(now) {
                        screen = Screen::GameOver;
                    }
                }
                if timers.sync.due(now) {
                    session.on_sync(now);
                }
                if timers.sweep.due(now) {
                    session.on_sweep(now);
                }
                draw_board(&layout, &session);
                hud(&session);
                dpad.draw();
            }
            Screen::GameOver => {
                if timers.sweep.due(now) {
                    session.on_sweep(now);
                }
                draw_board(&layout, &session);
                hud(&session);
                match game_over_screen(&session) {
                    Some(GameOverAction::Respawn) => {
                        if session.respawn() {
                            timers = SessionTimers::new(&game, now);
                            swipe.cancel();
                            screen = Screen::Playing;
                        }
                    }
                    Some(GameOverAction::Menu) => screen = Screen::Start,
                    None => {}
                }
            }
        }

        next_frame().await;
    }
}

fn draw_board(layout: &BoardLayout, session: &GameSession) {
    let size = layout.size();
    let grid = hex_color(COLOR_GRID, DARKGRAY);
    for i in 0..=layout.tile_count {
        let offset = i as f32 * layout.cell;
        draw_line(
            layout.origin.x + offset,
            layout.origin.y,
            layout.origin.x + offset,
            layout.origin.y + size,
            1.0,
            grid,
        );
        draw_line(
            layout.origin.x,
            layout.origin.y + offset,
            layout.origin.x + size,
            layout.origin.y + offset,
            1.0,
            grid,
        );
    }

    let food = layout.cell_rect(session.food());
    let food_color = hex_color(COLOR_FOOD, RED);
    draw_circle(
        food.x + food.w * 0.5,
        food.y + food.h * 0.5,
        food.w * 0.4,
        food_color,
    );

    let enemy_default = hex_color(COLOR_ENEMY, SKYBLUE);
    for (_, peer) in session.remote_players().iter() {
        let color = hex_color(&peer.color, enemy_default);
        for (i, pos) in peer.snake.iter().enumerate() {
            draw_segment(layout, *pos, color, i == 0);
        }
        if let Some(head) = peer.snake.first() {
            let r = layout.cell_rect(*head);
            draw_text(&peer.name, r.x, r.y - 4.0, 14.0, color);
        }
    }

    if session.sim().is_running() {
        let own = hex_color(COLOR_SELF, GREEN);
        for (i, pos) in session.snake().segments().enumerate() {
            draw_segment(layout, *pos, own, i == 0);
        }
    }
}

fn draw_segment(layout: &BoardLayout, pos: crate::game::grid::Position, color: Color, head: bool) {
    let r = layout.cell_rect(pos);
    let inset = if head { 0.5 } else { 1.5 };
    let fill = if head {
        color
    } else {
        Color::new(color.r, color.g, color.b, 0.8)
    };
    draw_rectangle(r.x + inset, r.y + inset, r.w - inset * 2.0, r.h - inset * 2.0, fill);
}
