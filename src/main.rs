use macroquad::prelude::*;
use tracing_subscriber::EnvFilter;

use cybersnake::client::{bot, master_api};
use cybersnake::config::{
    ClientConfig, GameConfig, ServerConfig, KILL_FEED_LEN, MAX_LEADERBOARD_ENTRIES,
};
use cybersnake::net::dispatcher::DispatcherHandle;
use cybersnake::net::memory::MemoryStore;
use cybersnake::net::ws::WsServer;
use cybersnake::{game, master};

fn window_conf() -> Conf {
    Conf {
        window_title: "CYBERSNAKE".to_owned(),
        window_width: 720,
        window_height: 1000,
        ..Default::default()
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("cybersnake=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("server") => {
            let config = ServerConfig::from_env();
            let store = MemoryStore::new();
            let dispatcher = DispatcherHandle::new(store.clone());
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(async {
                let http_addr = config.http_addr.clone();
                tokio::spawn(async move {
                    if let Err(err) = master::serve(&http_addr, store).await {
                        tracing::error!(%err, "leaderboard api stopped");
                    }
                });
                WsServer::serve(&config.ws_addr, dispatcher).await
            })?;
        }
        Some("bot") => {
            let name = args.next().unwrap_or_else(|| "BOT".to_owned());
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(bot::run(
                GameConfig::from_env(),
                ClientConfig::from_env(),
                name,
                None,
            ))?;
        }
        Some("leaderboard") => {
            let limit = match args.next() {
                Some(raw) => raw.parse()?,
                None => MAX_LEADERBOARD_ENTRIES,
            };
            let client = ClientConfig::from_env();
            let entries = master_api::fetch_leaderboard(&client.api_url, limit)?;
            print!("{}", master_api::format_leaderboard(&entries));
            let kills = master_api::fetch_kill_feed(&client.api_url, KILL_FEED_LEN)?;
            if !kills.is_empty() {
                println!("\nRECENT KILLS");
                print!("{}", master_api::format_kill_feed(&kills));
            }
        }
        Some("client") | None => {
            let game_config = GameConfig::from_env();
            let client = ClientConfig::from_env();
            macroquad::Window::from_config(window_conf(), game::r#loop::run(game_config, client));
        }
        Some(other) => {
            anyhow::bail!("unknown command {other:?}, expected client|server|bot|leaderboard");
        }
    }
    Ok(())
}
