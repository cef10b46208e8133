//! CSV bar store on disk.

use macdlab_core::synthetic::{random_walk, sine_wave};
use macdlab_runner::data::{load_bars, BarStore, CsvBarStore, DataError};

#[test]
fn save_is_an_idempotent_upsert() {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvBarStore::new(dir.path());
    let bars = random_walk(120, 100.0, 9);

    assert_eq!(store.save("BTCUSDT", &bars[..80]).unwrap(), 80);
    let path = store.symbol_path("BTCUSDT").unwrap();
    let first = std::fs::read_to_string(&path).unwrap();

    assert_eq!(store.save("BTCUSDT", &bars[..80]).unwrap(), 80);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), first);

    // overlapping extension
    assert_eq!(store.save("BTCUSDT", &bars[60..]).unwrap(), 120);
    assert_eq!(store.load("BTCUSDT", None, None).unwrap(), bars);
}

#[test]
fn data_survives_reopening() {
    let dir = tempfile::tempdir().unwrap();
    let bars = sine_wave(50, 100.0, 10.0, 24.0);
    CsvBarStore::new(dir.path()).save("ETHUSDT", &bars).unwrap();

    let reopened = CsvBarStore::new(dir.path());
    assert_eq!(reopened.load("ETHUSDT", None, None).unwrap(), bars);
    assert!(reopened.load("BTCUSDT", None, None).unwrap().is_empty());
}

#[test]
fn range_load_is_inclusive() {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvBarStore::new(dir.path());
    let bars = random_walk(40, 100.0, 2);
    store.save("BTCUSDT", &bars).unwrap();

    let slice = store
        .load("BTCUSDT", Some(bars[10].timestamp), Some(bars[19].timestamp))
        .unwrap();
    assert_eq!(slice, bars[10..20].to_vec());

    let tail = store.load("BTCUSDT", Some(bars[35].timestamp), None).unwrap();
    assert_eq!(tail.len(), 5);
}

#[test]
fn loader_reads_csv_store_without_provider() {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvBarStore::new(dir.path());
    let bars = random_walk(30, 100.0, 5);
    store.save("BTCUSDT", &bars).unwrap();

    assert_eq!(load_bars(&store, None, "BTCUSDT", "1h", None, None).unwrap(), bars);
    assert!(matches!(
        load_bars(&store, None, "SOLUSDT", "1h", None, None),
        Err(DataError::NoData { .. })
    ));
}

#[test]
fn rejects_unsafe_symbols() {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvBarStore::new(dir.path());
    assert!(matches!(
        store.save("../escape", &random_walk(3, 100.0, 1)),
        Err(DataError::InvalidSymbol(_))
    ));
}
