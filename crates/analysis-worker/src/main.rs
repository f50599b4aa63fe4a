//! Analysis worker CLI
//!
//! Fetches games, evaluates them with a pool of native Stockfish processes,
//! builds performance tables and runs the anomaly tests on them.

use std::fs;
use std::path::{Path, PathBuf};

use anomaly_stats::{
    AnomalyDetector, AnomalyReport, DetectorConfig, MetricTransform, NormalityAudit, Strategy,
    TestOutcome,
};
use chess_core::pgn::{parse_pgn, parse_pgn_file};
use chess_core::GameData;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use game_metrics::{Metric, MetricsConfig, PerformanceTable};
use tracing::{info, warn};

use analysis_worker::{EnginePool, GameQuery, LichessClient, SearchLimit, WorkerConfig};

#[derive(Parser)]
#[command(name = "analysis-worker", version, about = "Engine-based fair-play analysis of chess games")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download a player's games from Lichess as PGN
    Fetch(FetchArgs),
    /// Evaluate games with Stockfish and write a performance table
    Analyze(AnalyzeArgs),
    /// Describe a table and test its columns for normality
    Audit(AuditArgs),
    /// Test a suspect table against a baseline
    Detect(DetectArgs),
}

#[derive(Args)]
struct QueryArgs {
    /// Lichess username of the tracked player
    #[arg(long)]
    username: String,
    #[arg(long, default_value_t = 365)]
    days: u32,
    #[arg(long, default_value = "blitz")]
    perf_type: String,
    /// Last day of the window (YYYY-MM-DD), inclusive
    #[arg(long)]
    end_date: Option<NaiveDate>,
    #[arg(long)]
    max: Option<usize>,
}

impl QueryArgs {
    fn to_query(&self) -> GameQuery {
        let mut query = GameQuery::new(&self.username);
        query.days = self.days;
        query.perf_type = Some(self.perf_type.clone()).filter(|p| p != "all");
        query.end_date = self.end_date;
        query.max = self.max;
        query
    }
}

#[derive(Args)]
struct FetchArgs {
    #[command(flatten)]
    query: QueryArgs,
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args)]
struct AnalyzeArgs {
    #[command(flatten)]
    query: QueryArgs,
    /// Read games from a PGN file instead of Lichess
    #[arg(long)]
    pgn: Option<PathBuf>,
    #[arg(long)]
    out: PathBuf,
    #[arg(long, conflicts_with = "nodes")]
    depth: Option<u32>,
    #[arg(long)]
    nodes: Option<u32>,
    #[arg(long)]
    workers: Option<usize>,
}

#[derive(Clone, Copy, ValueEnum)]
enum MetricArg {
    Accuracy,
    AvgLoss,
    Blunders,
    Mistakes,
    Inaccuracies,
    TotalMoves,
}

impl From<MetricArg> for Metric {
    fn from(m: MetricArg) -> Self {
        match m {
            MetricArg::Accuracy => Metric::Accuracy,
            MetricArg::AvgLoss => Metric::AvgLoss,
            MetricArg::Blunders => Metric::Blunders,
            MetricArg::Mistakes => Metric::Mistakes,
            MetricArg::Inaccuracies => Metric::Inaccuracies,
            MetricArg::TotalMoves => Metric::TotalMoves,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum TransformArg {
    Identity,
    Square,
    Sqrt,
}

impl From<TransformArg> for MetricTransform {
    fn from(t: TransformArg) -> Self {
        match t {
            TransformArg::Identity => MetricTransform::Identity,
            TransformArg::Square => MetricTransform::Square,
            TransformArg::Sqrt => MetricTransform::Sqrt,
        }
    }
}

#[derive(Args)]
struct AuditArgs {
    #[arg(long)]
    table: PathBuf,
    /// Column to audit; every column when omitted
    #[arg(long, value_enum)]
    metric: Option<MetricArg>,
    #[arg(long, value_enum, default_value = "identity")]
    transform: TransformArg,
    /// Keep games with more than this many moves
    #[arg(long, default_value_t = 1)]
    min_moves: u32,
    #[arg(long)]
    json: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    /// Parametric when every normality audit passes
    Auto,
    Parametric,
    NonParametric,
}

#[derive(Args)]
struct DetectArgs {
    /// Reference games of the population
    #[arg(long)]
    baseline: PathBuf,
    /// Games under investigation
    #[arg(long)]
    suspect: PathBuf,
    #[arg(long, value_enum, default_value = "auto")]
    strategy: StrategyArg,
    /// Keep baseline games with more than this many moves
    #[arg(long, default_value_t = 1)]
    min_moves: u32,
    /// Keep suspect games with more than this many moves; unfiltered when omitted
    #[arg(long)]
    suspect_min_moves: Option<u32>,
    #[arg(long)]
    alpha: Option<f64>,
    #[arg(long)]
    json: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Load .env file for local dev
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    match cli.command {
        Command::Fetch(args) => fetch(args).await,
        Command::Analyze(args) => analyze(args).await,
        Command::Audit(args) => audit(args),
        Command::Detect(args) => detect(args),
    }
}

async fn fetch(args: FetchArgs) -> anyhow::Result<()> {
    let config = WorkerConfig::load()?;
    let client = LichessClient::new(config.lichess_token)?;
    let games = client.fetch_user_games(&args.query.to_query()).await?;

    let body = games
        .iter()
        .map(|g| g.pgn.trim())
        .collect::<Vec<_>>()
        .join("\n\n");
    fs::write(&args.out, body + "\n")?;
    info!(games = games.len(), out = %args.out.display(), "PGN written");
    Ok(())
}

async fn load_games(args: &AnalyzeArgs, config: &WorkerConfig) -> anyhow::Result<Vec<GameData>> {
    let parsed: Vec<_> = match &args.pgn {
        Some(path) => {
            let text = fs::read_to_string(path)?;
            parse_pgn_file(&text)
        }
        None => {
            let client = LichessClient::new(config.lichess_token.clone())?;
            client
                .fetch_user_games(&args.query.to_query())
                .await?
                .iter()
                .map(|g| parse_pgn(&g.pgn))
                .collect()
        }
    };

    let mut games = Vec::with_capacity(parsed.len());
    for (index, result) in parsed.into_iter().enumerate() {
        match result {
            Ok(game) => games.push(game),
            Err(e) => warn!(index, error = %e, "Skipping unparsable game"),
        }
    }
    Ok(games)
}

async fn analyze(args: AnalyzeArgs) -> anyhow::Result<()> {
    let mut config = WorkerConfig::load()?;
    if let Some(depth) = args.depth {
        config.search = SearchLimit::Depth(depth);
    }
    if let Some(nodes) = args.nodes {
        config.search = SearchLimit::Nodes(nodes);
    }
    if let Some(workers) = args.workers {
        config.num_workers = workers.max(1);
    }

    let games = load_games(&args, &config).await?;
    if games.is_empty() {
        warn!(username = %args.query.username, "No games to analyze");
    }
    info!(games = games.len(), search = ?config.search, "Starting analysis");

    let pool_size = config.num_workers.min(games.len()).max(1);
    let pool = EnginePool::spawn(&config.stockfish_path, pool_size).await?;
    let evals = pool.evaluate_batch(&games, config.search, &config.normalizer).await;
    pool.shutdown().await;

    let metrics = MetricsConfig {
        normalizer: config.normalizer.clone(),
        ..MetricsConfig::default()
    };
    let table = PerformanceTable::build(&args.query.username, games.iter().zip(evals.iter()), &metrics);
    table.write_csv_path(&args.out)?;

    info!(rows = table.len(), out = %args.out.display(), "Performance table written");
    Ok(())
}

fn load_table(path: &Path, min_moves: Option<u32>) -> anyhow::Result<PerformanceTable> {
    let table = PerformanceTable::read_csv_path(path)?;
    let total = table.len();
    let table = match min_moves {
        Some(min) => table.with_min_moves(min),
        None => table,
    };
    info!(path = %path.display(), rows = table.len(), dropped = total - table.len(), "Table loaded");
    Ok(table)
}

fn print_audit(audit: &NormalityAudit) {
    println!("{} ({}) n={}", audit.name, audit.transform, audit.count);
    if let Some(s) = &audit.summary {
        println!(
            "  mean {:.2}  median {:.2}  mode {:.2} (x{})  std {:.2}  skew {:.3}  kurt {:.3}",
            s.mean, s.median, s.mode, s.mode_count, s.std_dev, s.skewness, s.kurtosis
        );
    }
    if let Some(t) = &audit.omnibus {
        println!("  omnibus K2 = {:.3}, p = {:.4}", t.statistic, t.p_value);
    }
    if let Some(t) = &audit.shapiro_wilk {
        println!("  Shapiro-Wilk W = {:.4}, p = {:.4}", t.statistic, t.p_value);
    }
}

fn audit(args: AuditArgs) -> anyhow::Result<()> {
    let table = load_table(&args.table, Some(args.min_moves))?;

    for c in table.describe() {
        println!(
            "{:<13} count {:>4}  mean {:>7.1}  std {:>7}  min {:>6.1}  max {:>6.1}",
            c.metric.name(),
            c.count,
            c.mean,
            c.std.map(|s| format!("{s:.1}")).unwrap_or_else(|| "-".into()),
            c.min,
            c.max
        );
    }
    println!();

    let metrics: Vec<Metric> = match args.metric {
        Some(m) => vec![m.into()],
        None => Metric::ALL.to_vec(),
    };
    let mut audits = Vec::with_capacity(metrics.len());
    for metric in metrics {
        let audit = NormalityAudit::of_column(&table, metric, args.transform.into())?;
        print_audit(&audit);
        audits.push(audit);
    }

    if let Some(path) = &args.json {
        fs::write(path, serde_json::to_string_pretty(&audits)?)?;
    }
    Ok(())
}

fn print_report(report: &AnomalyReport) {
    println!(
        "Strategy: {} (baseline {} games, suspect {} games, alpha {})",
        report.strategy, report.baseline_games, report.suspect_games, report.alpha
    );
    for r in report.results() {
        match &r.outcome {
            TestOutcome::Completed {
                statistic,
                p_value,
                anomalous,
                ..
            } => {
                let verdict = if *anomalous { "ANOMALOUS" } else { "not anomalous" };
                println!(
                    "  {:<9} {:<20} stat = {:>9.3}  p = {:.4}  {}",
                    r.metric.name(),
                    r.test.to_string(),
                    statistic,
                    p_value,
                    verdict
                );
            }
            TestOutcome::Skipped { reason } => {
                println!("  {:<9} {:<20} skipped: {}", r.metric.name(), r.test.to_string(), reason);
            }
        }
    }
}

fn detect(args: DetectArgs) -> anyhow::Result<()> {
    let baseline = load_table(&args.baseline, Some(args.min_moves))?;
    let suspect = load_table(&args.suspect, args.suspect_min_moves)?;

    let mut config = DetectorConfig::default();
    if let Some(alpha) = args.alpha {
        config.alpha = alpha;
    }
    let detector = AnomalyDetector::new(config);

    let strategy = match args.strategy {
        StrategyArg::Auto => detector.choose_strategy(&baseline, &suspect)?,
        StrategyArg::Parametric => Strategy::Parametric,
        StrategyArg::NonParametric => Strategy::NonParametric,
    };

    let report = detector.detect(&baseline, &suspect, strategy)?;
    print_report(&report);

    if let Some(path) = &args.json {
        fs::write(path, serde_json::to_string_pretty(&report)?)?;
        info!(out = %path.display(), "Report written");
    }
    Ok(())
}
