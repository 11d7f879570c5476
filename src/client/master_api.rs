use crate::master::state::{KillFeedResponse, LeaderboardResponse};
use crate::net::messages::{KillFeedRecord, LeaderboardEntry};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] Box<ureq::Error>),
    #[error("bad response body: {0}")]
    Body(#[from] std::io::Error),
}

impl From<ureq::Error> for ApiError {
    fn from(err: ureq::Error) -> Self {
        Self::Http(Box::new(err))
    }
}

pub fn fetch_leaderboard(api_url: &str, limit: usize) -> Result<Vec<LeaderboardEntry>, ApiError> {
    let url = format!("{}/leaderboard", api_url.trim_end_matches('/'));
    let body: LeaderboardResponse = ureq::get(&url)
        .query("limit", &limit.to_string())
        .call()?
        .into_json()?;
    Ok(body.entries)
}

pub fn fetch_kill_feed(api_url: &str, limit: usize) -> Result<Vec<KillFeedRecord>, ApiError> {
    let url = format!("{}/kills", api_url.trim_end_matches('/'));
    let body: KillFeedResponse = ureq::get(&url)
        .query("limit", &limit.to_string())
        .call()?
        .into_json()?;
    Ok(body.kills)
}

/// Plain-text table for the `leaderboard` command.
pub fn format_leaderboard(entries: &[LeaderboardEntry]) -> String {
    if entries.is_empty() {
        return "NO SCORES YET\n".to_owned();
    }
    let mut out = String::new();
    for (rank, entry) in entries.iter().enumerate() {
        out.push_str(&format!(
            "{:>2}. {:<16} {:>6}  kills {:>3}  len {:>3}  {}\n",
            rank + 1,
            entry.name,
            entry.score,
            entry.kills,
            entry.max_length,
            entry.date
        ));
    }
    out
}

/// Newest first, one `KILLER > VICTIM` line each. Empty feeds print nothing.
pub fn format_kill_feed(kills: &[KillFeedRecord]) -> String {
    let mut out = String::new();
    for kill in kills {
        out.push_str(&format!("{} > {}\n", kill.killer, kill.victim));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_kill_lines() {
        let kills = vec![
            KillFeedRecord {
                killer: "NEO".to_owned(),
                victim: "SMITH".to_owned(),
                timestamp: 2,
            },
            KillFeedRecord {
                killer: "TRINITY".to_owned(),
                victim: "NEO".to_owned(),
                timestamp: 1,
            },
        ];
        assert_eq!(format_kill_feed(&kills), "NEO > SMITH\nTRINITY > NEO\n");
        assert!(format_kill_feed(&[]).is_empty());
    }

    #[test]
    fn formats_ranked_rows() {
        let entries = vec![LeaderboardEntry {
            id: "neo".to_owned(),
            name: "Neo".to_owned(),
            score: 120,
            kills: 2,
            max_length: 9,
            date: "2026-10-19".to_owned(),
        }];
        let text = format_leaderboard(&entries);
        assert!(text.starts_with(" 1. Neo"), "{text}");
        assert!(text.contains("120"));
        assert_eq!(format_leaderboard(&[]), "NO SCORES YET\n");
    }
}
