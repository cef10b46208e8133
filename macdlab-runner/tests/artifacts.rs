//! Artifact bundles and config files on disk.

use macdlab_core::domain::StrategyParameters;
use macdlab_core::engine::SimulationConfig;
use macdlab_core::synthetic::sine_wave;
use macdlab_runner::config::{BacktestConfig, ConfigError};
use macdlab_runner::export::{load_artifacts, save_artifacts};
use macdlab_runner::runner::run_backtest;

#[test]
fn artifact_bundle_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let bars = sine_wave(300, 100.0, 10.0, 30.0);
    let result = run_backtest(&bars, &StrategyParameters::new(3, 6, 2, 0.8), &SimulationConfig::default()).unwrap();

    let run_dir = save_artifacts(&result, dir.path()).unwrap();
    for name in ["manifest.json", "trades.csv", "equity.csv", "report.csv", "report.md"] {
        assert!(run_dir.join(name).is_file(), "missing {name}");
    }
    assert!(run_dir
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("run_")));

    let loaded = load_artifacts(&run_dir).unwrap();
    assert_eq!(loaded.run_id, result.run_id);
    assert_eq!(loaded.dataset_hash, result.dataset_hash);
    assert_eq!(loaded.trades.len(), result.trades.len());

    let equity = std::fs::read_to_string(run_dir.join("equity.csv")).unwrap();
    assert_eq!(equity.lines().count(), bars.len() + 1);
}

#[test]
fn loading_missing_bundle_fails_with_path() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_artifacts(&dir.path().join("nope")).unwrap_err();
    assert!(err.to_string().contains("manifest.json"));
}

#[test]
fn config_file_loads_and_validates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("macdlab.toml");
    std::fs::write(
        &path,
        r#"
[backtest]
symbol = "ETHUSDT"
interval = "15m"

[optimize]
fast = { start = 2, end = 3 }
slow = { start = 5, end = 6 }
signal = { start = 2, end = 2 }
position_sizes = [0.5]
"#,
    )
    .unwrap();

    let config = BacktestConfig::load(&path).unwrap();
    assert_eq!(config.backtest.symbol, "ETHUSDT");
    assert_eq!(config.optimize.unwrap().search_space().size(), 4);

    std::fs::write(&path, "[strategy]\nposition_size = 0.0\n").unwrap();
    assert!(matches!(BacktestConfig::load(&path), Err(ConfigError::Invalid(_))));
    assert!(matches!(
        BacktestConfig::load(&dir.path().join("missing.toml")),
        Err(ConfigError::Io { .. })
    ));
}
