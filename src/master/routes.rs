use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::master::state::{
    HealthResponse, KillFeedResponse, LeaderboardResponse, LimitQuery, PlayersResponse,
};
use crate::net::memory::{server_time_ms, MemoryStore};

pub fn router(store: MemoryStore) -> Router {
    Router::new()
        .route("/leaderboard", get(leaderboard))
        .route("/kills", get(kills))
        .route("/players", get(players))
        .route("/health", get(health))
        .with_state(store)
}

async fn leaderboard(
    State(store): State<MemoryStore>,
    Query(query): Query<LimitQuery>,
) -> Json<LeaderboardResponse> {
    Json(LeaderboardResponse {
        entries: store.leaderboard(query.leaderboard()),
    })
}

async fn kills(
    State(store): State<MemoryStore>,
    Query(query): Query<LimitQuery>,
) -> Json<KillFeedResponse> {
    Json(KillFeedResponse {
        kills: store.kill_feed(query.kills()),
    })
}

async fn players(State(store): State<MemoryStore>) -> Json<PlayersResponse> {
    Json(PlayersResponse {
        online: store.player_count(),
    })
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_owned(),
        server_time: server_time_ms(),
    })
}
