//! Integration tests: performance tables through the anomaly detector.

mod common;

use anomaly_stats::{AnomalyDetector, DetectorConfig, Strategy, StatsError, TestKind};
use common::{record, synthetic_table, Lcg};
use game_metrics::PerformanceTable;

const STRATEGIES: [Strategy; 2] = [Strategy::Parametric, Strategy::NonParametric];

/// Club-level play: mostly small losses with an occasional blunder.
fn human_loss(rng: &mut Lcg) -> f64 {
    if rng.next_f64() < 0.08 {
        250.0 + rng.next_f64() * 250.0
    } else {
        rng.next_f64() * 80.0
    }
}

fn engine_loss(rng: &mut Lcg) -> f64 {
    rng.next_f64() * 12.0
}

fn weak_loss(rng: &mut Lcg) -> f64 {
    if rng.next_f64() < 0.2 {
        250.0 + rng.next_f64() * 250.0
    } else {
        rng.next_f64() * 150.0
    }
}

fn baseline() -> PerformanceTable {
    synthetic_table(40, 7, human_loss)
}

#[test]
fn test_identical_tables_have_high_p_values() {
    let table = baseline();
    assert_eq!(table.len(), 40);

    let detector = AnomalyDetector::default();
    for strategy in STRATEGIES {
        let report = detector.detect(&table, &table.clone(), strategy).unwrap();
        for r in report.results() {
            let p = r.p_value().unwrap();
            assert!(p >= 0.5 - 1e-12, "{strategy}: {} p = {p}", r.metric.name());
            assert!(!r.is_anomalous());
        }
    }
}

#[test]
fn test_engine_like_games_are_flagged() {
    let suspect = synthetic_table(15, 99, engine_loss);
    let detector = AnomalyDetector::default();

    for strategy in STRATEGIES {
        let report = detector.detect(&baseline(), &suspect, strategy).unwrap();
        assert!(report.accuracy.is_anomalous(), "{strategy}: {:?}", report.accuracy);
        assert!(report.avg_loss.is_anomalous(), "{strategy}: {:?}", report.avg_loss);
        assert!(report.blunders.is_anomalous(), "{strategy}: {:?}", report.blunders);
        assert_eq!(report.suspect_games, 15);
    }
}

#[test]
fn test_weaker_games_are_not_flagged() {
    let suspect = synthetic_table(15, 3, weak_loss);
    let report = AnomalyDetector::default()
        .detect(&baseline(), &suspect, Strategy::NonParametric)
        .unwrap();
    assert!(!report.any_anomalous());
    assert!(report.accuracy.p_value().unwrap() > 0.5);
}

#[test]
fn test_blunders_always_use_rank_test() {
    let suspect = synthetic_table(10, 11, human_loss);
    let report = AnomalyDetector::default()
        .detect(&baseline(), &suspect, Strategy::Parametric)
        .unwrap();
    assert_eq!(report.blunders.test, TestKind::MannWhitneyU);
    assert!(matches!(report.accuracy.test, TestKind::PooledT | TestKind::WelchT));
    assert!(report.variance.is_some());
}

#[test]
fn test_alpha_controls_the_verdict() {
    let suspect = synthetic_table(15, 99, engine_loss);
    let strict = AnomalyDetector::new(DetectorConfig {
        alpha: 0.0,
        ..DetectorConfig::default()
    });
    let report = strict.detect(&baseline(), &suspect, Strategy::NonParametric).unwrap();
    // p < 0 never holds
    assert!(!report.any_anomalous());
}

#[test]
fn test_empty_table_is_rejected_before_testing() {
    let detector = AnomalyDetector::default();
    let empty = PerformanceTable::new();
    for strategy in STRATEGIES {
        assert_eq!(
            detector.detect(&baseline(), &empty, strategy),
            Err(StatsError::EmptySample("suspect"))
        );
        assert_eq!(
            detector.detect(&empty, &baseline(), strategy),
            Err(StatsError::EmptySample("baseline"))
        );
    }
}

#[test]
fn test_tables_loaded_from_csv() {
    let header = "Opponent,Color,Accuracy,AvgLoss,Blunders,Mistakes,Inaccuracies,TotalMoves\n";
    let baseline_csv = format!(
        "{header}a,White,71.2,55.0,2,1,3,40\nb,Black,80.5,38.1,1,2,1,35\nc,White,66.3,61.7,3,1,2,28\n\
         d,Black,76.0,44.4,1,0,4,31\ne,White,73.9,49.2,2,2,2,45\nf,Black,1.0,1.0,0,0,0,1\n"
    );
    let suspect_csv = format!("{header}g,White,97.1,6.2,0,0,1,38\nh,Black,96.4,7.9,0,0,0,42\n");

    let baseline = PerformanceTable::read_csv(baseline_csv.as_bytes())
        .unwrap()
        .with_min_moves(1);
    let suspect = PerformanceTable::read_csv(suspect_csv.as_bytes()).unwrap();
    assert_eq!(baseline.len(), 5);

    let detector = AnomalyDetector::default();
    let report = detector.detect(&baseline, &suspect, Strategy::NonParametric).unwrap();
    // 2 vs 5, no ties: exact p = 1 / C(7, 2)
    assert!((report.accuracy.p_value().unwrap() - 1.0 / 21.0).abs() < 1e-12);
    assert!(report.accuracy.is_anomalous());

    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"strategy\":\"non-parametric\""));
    assert!(json.contains("\"anomalous\":true"));
}

#[test]
fn test_record_fixture_tables() {
    let strong: PerformanceTable = (0..6).map(|i| record(95.0 + i as f64 * 0.5, 8.0 - i as f64, 0)).collect();
    let typical: PerformanceTable = (0..6)
        .map(|i| record(70.0 + i as f64 * 2.0, 50.0 - i as f64 * 3.0, (i % 3) as u32))
        .collect();
    let report = AnomalyDetector::default()
        .detect(&typical, &strong, Strategy::NonParametric)
        .unwrap();
    // Fully separated 6 vs 6
    assert!(report.accuracy.p_value().unwrap() < 0.01);
    assert!(report.avg_loss.p_value().unwrap() < 0.01);
}

#[test]
fn test_all_zero_blunders_keep_the_other_verdicts() {
    let clean = |t: PerformanceTable| -> PerformanceTable {
        t.rows()
            .iter()
            .cloned()
            .map(|mut r| {
                r.blunders = 0;
                r
            })
            .collect()
    };
    let baseline = clean(baseline());
    let suspect = clean(synthetic_table(15, 99, engine_loss));

    for strategy in STRATEGIES {
        let report = AnomalyDetector::default().detect(&baseline, &suspect, strategy).unwrap();
        assert!(report.accuracy.is_anomalous(), "{strategy}");
        assert!(report.avg_loss.is_anomalous(), "{strategy}");
        assert_eq!(
            report.blunders.skip_reason(),
            Some(&StatsError::ZeroVariance("Mann-Whitney U"))
        );
        assert!(!report.blunders.is_anomalous());
    }
}
