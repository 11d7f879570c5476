pub mod routes;
pub mod state;

use crate::net::memory::MemoryStore;

pub fn router(store: MemoryStore) -> axum::Router {
    routes::router(store)
}

pub async fn serve(addr: &str, store: MemoryStore) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "leaderboard api listening");
    }
    axum::serve(listener, router(store)).await
}
