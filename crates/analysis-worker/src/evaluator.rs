//! Game evaluation: replay each game, score every position, normalize.

use std::sync::Arc;

use chess_core::replay::replay;
use chess_core::GameData;
use game_metrics::{EvaluationSequence, NormalizerConfig, Score};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::config::SearchLimit;
use crate::error::WorkerError;
use crate::stockfish::StockfishEngine;

/// Evaluate every position of `game`, White's point of view.
///
/// The result holds the initial evaluation followed by one value per ply.
pub async fn evaluate_game(
    engine: &mut StockfishEngine,
    game: &GameData,
    limit: SearchLimit,
    config: &NormalizerConfig,
) -> Result<EvaluationSequence, WorkerError> {
    let positions = replay(&game.moves)?;
    engine.new_game().await?;

    let mut scores = Vec::with_capacity(positions.len());
    for pos in &positions {
        let score = if pos.is_checkmate {
            // No search needed: the side to move is mated
            Score::from_engine(None, Some(0), pos.white_to_move)
        } else {
            let result = engine.evaluate(&pos.fen, limit).await?;
            Score::from_engine(result.cp, result.mate, pos.white_to_move)
        };
        scores.push(score);
    }

    Ok(EvaluationSequence::from_scores(scores, config))
}

/// Evaluate one game on a pool slot; a failure yields an empty sequence.
///
/// A Stockfish failure leaves the process in an unknown state, so the slot
/// gets a fresh engine before the next game is checked out.
async fn evaluate_on_slot(
    engine: &mut StockfishEngine,
    path: &str,
    game: &GameData,
    index: usize,
    limit: SearchLimit,
    config: &NormalizerConfig,
) -> EvaluationSequence {
    match evaluate_game(engine, game, limit, config).await {
        Ok(evals) => evals,
        Err(e) => {
            warn!(
                index,
                white = %game.metadata.white,
                black = %game.metadata.black,
                error = %e,
                "Game analysis failed"
            );
            if matches!(e, WorkerError::Stockfish(_)) {
                match StockfishEngine::new(path).await {
                    Ok(fresh) => {
                        *engine = fresh;
                        info!(index, "Stockfish engine restarted");
                    }
                    Err(e) => error!(index, error = %e, "Stockfish restart failed"),
                }
            }
            EvaluationSequence::failed()
        }
    }
}

/// Pool of Stockfish processes shared by concurrent game evaluations.
pub struct EnginePool {
    path: Arc<str>,
    engines: Vec<Arc<Mutex<StockfishEngine>>>,
    semaphore: Arc<Semaphore>,
}

impl EnginePool {
    /// Spawn `size` engines (one per worker).
    pub async fn spawn(path: &str, size: usize) -> Result<Self, WorkerError> {
        let size = size.max(1);
        info!(num_workers = size, "Creating Stockfish engine pool");

        let mut engines = Vec::with_capacity(size);
        for i in 0..size {
            let engine = StockfishEngine::new(path).await?;
            info!(engine_id = i, "Stockfish engine ready");
            engines.push(Arc::new(Mutex::new(engine)));
        }

        Ok(Self {
            path: Arc::from(path),
            engines,
            semaphore: Arc::new(Semaphore::new(size)),
        })
    }

    /// Evaluate `games` concurrently. Output order matches input order; a
    /// failed game contributes an empty sequence.
    pub async fn evaluate_batch(
        &self,
        games: &[GameData],
        limit: SearchLimit,
        config: &NormalizerConfig,
    ) -> Vec<EvaluationSequence> {
        let total = games.len();
        let mut results = vec![EvaluationSequence::failed(); total];
        let mut tasks = JoinSet::new();

        for (index, game) in games.iter().enumerate() {
            let permit = match self.semaphore.clone().acquire_owned().await {
                Ok(p) => p,
                Err(e) => {
                    error!(error = %e, "Engine pool closed");
                    break;
                }
            };
            let engine = self.engines[index % self.engines.len()].clone();
            let path = self.path.clone();
            let game = game.clone();
            let config = config.clone();

            tasks.spawn(async move {
                let _permit = permit; // Hold until done
                let mut engine = engine.lock().await;
                let evals = evaluate_on_slot(&mut engine, &path, &game, index, limit, &config).await;
                (index, evals)
            });
        }

        let mut done = 0usize;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, evals)) => {
                    results[index] = evals;
                    done += 1;
                    if done % 10 == 0 || done == total {
                        info!(done, total, "Games analyzed");
                    }
                }
                Err(e) => error!(error = %e, "Analysis task panicked"),
            }
        }

        results
    }

    /// Quit every engine.
    pub async fn shutdown(self) {
        info!("Shutting down Stockfish engines");
        for engine in self.engines {
            let mut engine = engine.lock().await;
            engine.quit().await;
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use std::sync::OnceLock;

    use chess_core::pgn::parse_pgn;

    use super::*;

    /// Minimal UCI engine: every search reports `cp 25`. When `crash_on` is
    /// set, the process exits on `go` for any position whose FEN contains it.
    fn fake_engine_script(crash_on: Option<&str>) -> String {
        let crash = crash_on
            .map(|pattern| format!("      case \"$fen\" in *\"{pattern}\"*) exit 1 ;; esac\n"))
            .unwrap_or_default();
        format!(
            "#!/bin/sh\n\
             while IFS= read -r line; do\n\
             \x20 case \"$line\" in\n\
             \x20   uci) echo \"id name fake\"; echo uciok ;;\n\
             \x20   isready) echo readyok ;;\n\
             \x20   \"position fen \"*) fen=\"$line\" ;;\n\
             \x20   go*)\n{crash}\
             \x20     echo \"info depth 1 score cp 25 pv a2a3\"\n\
             \x20     echo \"bestmove a2a3\" ;;\n\
             \x20   quit) exit 0 ;;\n\
             \x20 esac\n\
             done\n"
        )
    }

    struct FakeEngines {
        steady: PathBuf,
        /// Dies on the position after 1. e4
        crashes_after_e4: PathBuf,
    }

    /// Scripts are written once, before any test spawns a process, so no
    /// child can inherit a script that is still open for writing.
    fn fake_engines() -> &'static FakeEngines {
        static ENGINES: OnceLock<FakeEngines> = OnceLock::new();
        ENGINES.get_or_init(|| {
            let write = |name: &str, body: String| {
                let path = std::env::temp_dir().join(format!("fake-uci-{}-{name}", std::process::id()));
                std::fs::write(&path, body).unwrap();
                std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
                path
            };
            FakeEngines {
                steady: write("steady", fake_engine_script(None)),
                crashes_after_e4: write("crash", fake_engine_script(Some("/4P3/8/PPPP1PPP/"))),
            }
        })
    }

    fn game(movetext: &str) -> GameData {
        parse_pgn(&format!("[White \"w\"]\n[Black \"b\"]\n\n{movetext}")).unwrap()
    }

    fn path(p: &Path) -> &str {
        p.to_str().unwrap()
    }

    #[tokio::test]
    async fn test_evaluate_game_scores_every_ply() {
        let mut engine = StockfishEngine::new(path(&fake_engines().steady)).await.unwrap();
        let evals = evaluate_game(
            &mut engine,
            &game("1. d4 d5 *"),
            SearchLimit::Depth(1),
            &NormalizerConfig::default(),
        )
        .await
        .unwrap();
        // cp 25 for the side to move, seen from White
        assert_eq!(evals.as_slice(), &[0.3, -0.25, 0.25]);
        engine.quit().await;
    }

    #[tokio::test]
    async fn test_mated_position_needs_no_search() {
        let mut engine = StockfishEngine::new(path(&fake_engines().steady)).await.unwrap();
        let evals = evaluate_game(
            &mut engine,
            &game("1. f3 e5 2. g4 Qh4# 0-1"),
            SearchLimit::Depth(1),
            &NormalizerConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(evals.ply_count(), 4);
        assert_eq!(evals.as_slice()[4], -10.0);
        engine.quit().await;
    }

    #[tokio::test]
    async fn test_batch_keeps_input_order() {
        let pool = EnginePool::spawn(path(&fake_engines().steady), 2).await.unwrap();
        let games = [game("1. e4 *"), game("1. d4 d5 2. c4 e6 *"), game("1. c4 c5 *")];
        let evals = pool
            .evaluate_batch(&games, SearchLimit::Depth(1), &NormalizerConfig::default())
            .await;
        let lengths: Vec<usize> = evals.iter().map(|e| e.len()).collect();
        assert_eq!(lengths, vec![2, 5, 3]);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_engine_crash_only_fails_its_own_game() {
        let pool = EnginePool::spawn(path(&fake_engines().crashes_after_e4), 1).await.unwrap();
        let games = [game("1. e4 e5 *"), game("1. d4 d5 *"), game("1. c4 c5 *")];
        let evals = pool
            .evaluate_batch(&games, SearchLimit::Depth(1), &NormalizerConfig::default())
            .await;

        assert!(evals[0].is_empty());
        assert_eq!(evals[1].len(), 3);
        assert_eq!(evals[2].len(), 3);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_unreplayable_game_keeps_the_engine() {
        let pool = EnginePool::spawn(path(&fake_engines().steady), 1).await.unwrap();
        let games = [game("1. e4 e4 *"), game("1. d4 d5 *")];
        let evals = pool
            .evaluate_batch(&games, SearchLimit::Depth(1), &NormalizerConfig::default())
            .await;
        assert!(evals[0].is_empty());
        assert_eq!(evals[1].len(), 3);
        pool.shutdown().await;
    }
}
