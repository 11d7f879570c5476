use std::time::Duration;

use cybersnake::client::master_api::{fetch_kill_feed, fetch_leaderboard, format_kill_feed};
use cybersnake::master;
use cybersnake::net::memory::MemoryStore;
use cybersnake::net::messages::LeaderboardRecord;
use cybersnake::net::store::SharedStore;

fn spawn_api(store: MemoryStore) -> String {
    let (addr_tx, addr_rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            addr_tx.send(listener.local_addr().unwrap()).unwrap();
            let _ = axum::serve(listener, master::router(store)).await;
        });
    });
    let addr = addr_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    format!("http://{addr}")
}

#[test]
fn leaderboard_command_reads_scores_and_kills() {
    let store = MemoryStore::new();
    let conn = store.connect();
    conn.submit_score(
        "neo",
        LeaderboardRecord {
            name: "Neo".to_owned(),
            score: 90,
            kills: 1,
            max_length: 7,
            date: "2026-10-19".to_owned(),
        },
    )
    .unwrap();
    conn.report_kill("NEO", "SMITH").unwrap();
    conn.report_kill("TRINITY", "NEO").unwrap();

    let api = spawn_api(store);
    let entries = fetch_leaderboard(&api, 10).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].score, 90);

    let kills = fetch_kill_feed(&api, 1).unwrap();
    assert_eq!(kills.len(), 1);
    assert_eq!(format_kill_feed(&kills), "TRINITY > NEO\n");
}
