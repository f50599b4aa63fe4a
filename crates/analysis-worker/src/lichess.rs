//! Lichess game export client (NDJSON with embedded PGN).

use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::WorkerError;

const LICHESS_BASE_URL: &str = "https://lichess.org";

/// Which games to export for a user.
#[derive(Debug, Clone)]
pub struct GameQuery {
    pub username: String,
    /// Length of the window ending at `end_date`
    pub days: u32,
    /// "blitz", "bullet", "rapid", ...; all speeds when `None`
    pub perf_type: Option<String>,
    /// Last day of the window, inclusive; today when `None`
    pub end_date: Option<NaiveDate>,
    pub max: Option<usize>,
}

impl GameQuery {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            days: 365,
            perf_type: Some("blitz".to_string()),
            end_date: None,
            max: None,
        }
    }

    /// `(since, until)` in epoch milliseconds.
    pub fn time_window(&self, now: DateTime<Utc>) -> (i64, i64) {
        let until = match self.end_date {
            Some(day) => day
                .succ_opt()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
                .unwrap_or(now),
            None => now,
        };
        let since = until - Duration::days(i64::from(self.days));
        (since.timestamp_millis(), until.timestamp_millis())
    }

    fn params(&self, now: DateTime<Utc>) -> Vec<(&'static str, String)> {
        let (since, until) = self.time_window(now);
        let mut params = vec![
            ("pgnInJson", "true".to_string()),
            ("moves", "true".to_string()),
            ("since", since.to_string()),
            ("until", until.to_string()),
        ];
        if let Some(perf) = &self.perf_type {
            params.push(("perfType", perf.clone()));
        }
        if let Some(max) = self.max {
            params.push(("max", max.to_string()));
        }
        params
    }
}

/// One exported game.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LichessGame {
    pub id: String,
    pub pgn: String,
}

pub struct LichessClient {
    client: Client,
    token: Option<String>,
    base_url: String,
}

impl LichessClient {
    pub fn new(token: Option<String>) -> Result<Self, WorkerError> {
        let client = Client::builder()
            .user_agent("fairplay-analysis/0.1")
            .timeout(std::time::Duration::from_secs(120))
            .build()?;
        Ok(Self {
            client,
            token,
            base_url: LICHESS_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Export the games `query` selects, oldest first as Lichess streams them.
    pub async fn fetch_user_games(&self, query: &GameQuery) -> Result<Vec<LichessGame>, WorkerError> {
        let url = format!("{}/api/games/user/{}", self.base_url, query.username);
        let params = query.params(Utc::now());

        let mut request = self
            .client
            .get(&url)
            .query(&params)
            .header("Accept", "application/x-ndjson");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(WorkerError::Lichess(format!("User not found: {}", query.username)));
        }

        if !resp.status().is_success() {
            return Err(WorkerError::Lichess(format!("HTTP {}", resp.status())));
        }

        let text = resp.text().await?;
        let games = parse_ndjson(&text);
        info!(username = %query.username, games = games.len(), "Fetched Lichess games");
        Ok(games)
    }
}

/// Parse an NDJSON export body, skipping malformed lines and games without PGN.
pub fn parse_ndjson(text: &str) -> Vec<LichessGame> {
    let mut results = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<LichessGame>(line) {
            Ok(game) if !game.pgn.is_empty() => results.push(game),
            Ok(game) => warn!(id = %game.id, "Lichess game has no PGN"),
            Err(e) => warn!(error = %e, "Failed to parse Lichess game JSON"),
        }
    }

    results
}
