//! Worker configuration from environment variables

use std::env;

use game_metrics::NormalizerConfig;
use tracing::info;

use crate::error::WorkerError;

/// How long Stockfish searches each position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchLimit {
    /// Fixed depth in plies
    Depth(u32),
    /// Fixed node budget
    Nodes(u32),
}

impl SearchLimit {
    /// UCI `go` command for this limit.
    pub fn go_command(&self) -> String {
        match self {
            SearchLimit::Depth(d) => format!("go depth {d}"),
            SearchLimit::Nodes(n) => format!("go nodes {n}"),
        }
    }
}

impl Default for SearchLimit {
    fn default() -> Self {
        SearchLimit::Depth(20)
    }
}

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    /// Path to Stockfish binary
    pub stockfish_path: String,

    /// Search limit per position
    pub search: SearchLimit,

    /// Stockfish processes evaluating games in parallel
    pub num_workers: usize,

    /// Lichess personal API token, raises the export rate limit
    pub lichess_token: Option<String>,

    pub normalizer: NormalizerConfig,
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, WorkerError> {
        let config = Self::from_lookup(|key| env::var(key).ok())?;
        info!(
            stockfish_path = %config.stockfish_path,
            search = ?config.search,
            num_workers = config.num_workers,
            "Worker config loaded"
        );
        Ok(config)
    }

    /// Build from an arbitrary variable source. Unparsable numbers fall back
    /// to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, WorkerError> {
        let number = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u32>().ok());

        let stockfish_path =
            lookup("STOCKFISH_PATH").unwrap_or_else(|| "/usr/local/bin/stockfish".to_string());

        // A node budget wins over depth when both are set
        let search = match (number("NODES_PER_POSITION"), number("ANALYSIS_DEPTH")) {
            (Some(nodes), _) => SearchLimit::Nodes(nodes),
            (None, Some(depth)) => SearchLimit::Depth(depth),
            (None, None) => SearchLimit::default(),
        };
        if matches!(search, SearchLimit::Depth(0) | SearchLimit::Nodes(0)) {
            return Err(WorkerError::Config("search limit must be positive".into()));
        }

        let num_workers = match number("NUM_WORKERS") {
            Some(0) => return Err(WorkerError::Config("NUM_WORKERS must be at least 1".into())),
            Some(n) => n as usize,
            None => num_cpus::get(),
        };

        let lichess_token = lookup("LICHESS_TOKEN").filter(|t| !t.trim().is_empty());

        let mut normalizer = NormalizerConfig::default();
        if let Some(mate) = lookup("MATE_SCORE_CP").and_then(|v| v.trim().parse::<i32>().ok()) {
            normalizer.mate_score_cp = mate;
        }
        if let Some(initial) = lookup("INITIAL_EVAL").and_then(|v| v.trim().parse::<f64>().ok()) {
            normalizer.initial_eval = initial;
        }

        Ok(Self {
            stockfish_path,
            search,
            num_workers,
            lichess_token,
            normalizer,
        })
    }
}
