//! Bar persistence keyed by (symbol, timestamp).
//!
//! Layout of the CSV store: `{dir}/{SYMBOL}.csv`, one row per bar sorted by
//! timestamp. Writes go to a `.tmp` sibling and are renamed into place.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use tracing::debug;

use macdlab_core::domain::Bar;

use super::provider::{validate_symbol, DataError};

/// Storage for fetched bars.
pub trait BarStore: Send + Sync {
    /// Upsert bars for a symbol. Re-saving the same bars is a no-op; a bar at
    /// an existing timestamp replaces the stored one. Returns the number of
    /// bars stored for the symbol afterwards.
    fn save(&self, symbol: &str, bars: &[Bar]) -> Result<usize, DataError>;

    /// Load bars with `start <= timestamp <= end`, oldest first. Unknown
    /// symbols yield an empty vector.
    fn load(
        &self,
        symbol: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Bar>, DataError>;
}

type Series = BTreeMap<i64, Bar>;

fn upsert(series: &mut Series, bars: &[Bar]) {
    for bar in bars {
        series.insert(bar.timestamp.timestamp_millis(), bar.clone());
    }
}

fn in_range(series: &Series, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Vec<Bar> {
    let lo = start.map_or(i64::MIN, |t| t.timestamp_millis());
    let hi = end.map_or(i64::MAX, |t| t.timestamp_millis());
    if lo > hi {
        return Vec::new();
    }
    series.range(lo..=hi).map(|(_, b)| b.clone()).collect()
}

// ─── CSV store ──────────────────────────────────────────────────────

/// One CSV file per symbol under a root directory.
pub struct CsvBarStore {
    dir: PathBuf,
}

impl CsvBarStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the CSV file for a symbol.
    pub fn symbol_path(&self, symbol: &str) -> Result<PathBuf, DataError> {
        validate_symbol(symbol)?;
        Ok(self.dir.join(format!("{symbol}.csv")))
    }

    fn read_series(path: &Path) -> Result<Series, DataError> {
        let mut series = Series::new();
        if !path.exists() {
            return Ok(series);
        }
        let mut reader = csv::Reader::from_path(path)?;
        for row in reader.deserialize::<Bar>() {
            let bar = row?;
            series.insert(bar.timestamp.timestamp_millis(), bar);
        }
        Ok(series)
    }

    fn write_series(path: &Path, series: &Series) -> Result<(), DataError> {
        let tmp_path = path.with_extension("csv.tmp");
        {
            let mut writer = csv::Writer::from_path(&tmp_path)?;
            for bar in series.values() {
                writer.serialize(bar)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp_path, path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::Store(format!("atomic rename to {} failed: {e}", path.display()))
        })
    }
}

impl BarStore for CsvBarStore {
    fn save(&self, symbol: &str, bars: &[Bar]) -> Result<usize, DataError> {
        let path = self.symbol_path(symbol)?;
        fs::create_dir_all(&self.dir)?;
        let mut series = Self::read_series(&path)?;
        let before = series.len();
        upsert(&mut series, bars);
        Self::write_series(&path, &series)?;
        debug!(symbol, added = series.len() - before, total = series.len(), "saved bars");
        Ok(series.len())
    }

    fn load(
        &self,
        symbol: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Bar>, DataError> {
        let path = self.symbol_path(symbol)?;
        let series = Self::read_series(&path)?;
        Ok(in_range(&series, start, end))
    }
}

// ─── In-memory store ────────────────────────────────────────────────

/// Process-local store, mainly for tests and one-shot runs.
#[derive(Default)]
pub struct MemoryBarStore {
    series: RwLock<HashMap<String, Series>>,
}

impl MemoryBarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with one symbol.
    pub fn with_bars(symbol: &str, bars: &[Bar]) -> Self {
        let mut series = Series::new();
        upsert(&mut series, bars);
        Self {
            series: RwLock::new(HashMap::from([(symbol.to_string(), series)])),
        }
    }

    fn poisoned() -> DataError {
        DataError::Store("memory store lock poisoned".into())
    }
}

impl BarStore for MemoryBarStore {
    fn save(&self, symbol: &str, bars: &[Bar]) -> Result<usize, DataError> {
        validate_symbol(symbol)?;
        let mut map = self.series.write().map_err(|_| Self::poisoned())?;
        let series = map.entry(symbol.to_string()).or_default();
        upsert(series, bars);
        Ok(series.len())
    }

    fn load(
        &self,
        symbol: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Bar>, DataError> {
        let map = self.series.read().map_err(|_| Self::poisoned())?;
        Ok(map
            .get(symbol)
            .map(|s| in_range(s, start, end))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macdlab_core::synthetic::random_walk;

    #[test]
    fn memory_store_upsert_is_idempotent() {
        let store = MemoryBarStore::new();
        let bars = random_walk(50, 100.0, 1);
        assert_eq!(store.save("BTCUSDT", &bars).unwrap(), 50);
        assert_eq!(store.save("BTCUSDT", &bars).unwrap(), 50);
        assert_eq!(store.save("BTCUSDT", &bars[40..]).unwrap(), 50);
        assert_eq!(store.load("BTCUSDT", None, None).unwrap(), bars);
    }

    #[test]
    fn memory_store_replaces_same_timestamp() {
        let mut bars = random_walk(5, 100.0, 2);
        let store = MemoryBarStore::with_bars("ETHUSDT", &bars);
        bars[2].close = 123.0;
        store.save("ETHUSDT", &bars[2..3]).unwrap();
        let loaded = store.load("ETHUSDT", None, None).unwrap();
        assert_eq!(loaded.len(), 5);
        assert_eq!(loaded[2].close, 123.0);
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let bars = random_walk(10, 100.0, 3);
        let store = MemoryBarStore::with_bars("X", &bars);
        let loaded = store
            .load("X", Some(bars[2].timestamp), Some(bars[5].timestamp))
            .unwrap();
        assert_eq!(loaded, bars[2..=5].to_vec());
        assert!(store
            .load("X", Some(bars[5].timestamp), Some(bars[2].timestamp))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn unknown_symbol_is_empty() {
        let store = MemoryBarStore::new();
        assert!(store.load("NOPE", None, None).unwrap().is_empty());
    }

    #[test]
    fn csv_path_rejects_traversal() {
        let store = CsvBarStore::new("/tmp/bars");
        assert!(store.symbol_path("../secret").is_err());
        assert_eq!(
            store.symbol_path("BTCUSDT").unwrap(),
            PathBuf::from("/tmp/bars/BTCUSDT.csv")
        );
    }
}
