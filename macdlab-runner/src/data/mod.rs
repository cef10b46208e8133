//! Market data: remote providers, local stores and the loader that joins them.

pub mod binance;
pub mod provider;
pub mod store;

pub use binance::BinanceProvider;
pub use provider::{interval_duration, validate_symbol, BarProvider, DataError};
pub use store::{BarStore, CsvBarStore, MemoryBarStore};

use chrono::{DateTime, Utc};
use tracing::info;

use macdlab_core::domain::Bar;

/// Load bars for a symbol, preferring the store.
///
/// When the store has nothing in range and a provider is given, bars are
/// fetched, upserted into the store and the stored range is returned.
/// Without a provider an empty store is `DataError::NoData`.
pub fn load_bars(
    store: &dyn BarStore,
    provider: Option<&dyn BarProvider>,
    symbol: &str,
    interval: &str,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<Vec<Bar>, DataError> {
    validate_symbol(symbol)?;
    interval_duration(interval)?;

    let cached = store.load(symbol, start, end)?;
    if !cached.is_empty() {
        info!(symbol, bars = cached.len(), "loaded bars from store");
        return Ok(cached);
    }

    let Some(provider) = provider else {
        return Err(DataError::NoData {
            symbol: symbol.to_string(),
        });
    };

    let fetched = provider.fetch_bars(symbol, interval, start, end)?;
    let total = store.save(symbol, &fetched)?;
    info!(
        symbol,
        provider = provider.name(),
        fetched = fetched.len(),
        stored = total,
        "fetched bars"
    );

    let bars = store.load(symbol, start, end)?;
    if bars.is_empty() {
        return Err(DataError::NoData {
            symbol: symbol.to_string(),
        });
    }
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use macdlab_core::synthetic::random_walk;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedProvider {
        bars: Vec<Bar>,
        calls: AtomicUsize,
    }

    impl BarProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        fn fetch_bars(
            &self,
            _symbol: &str,
            _interval: &str,
            _start: Option<DateTime<Utc>>,
            _end: Option<DateTime<Utc>>,
        ) -> Result<Vec<Bar>, DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.bars.clone())
        }
    }

    #[test]
    fn fetches_once_then_serves_from_store() {
        let bars = random_walk(30, 100.0, 4);
        let provider = FixedProvider {
            bars: bars.clone(),
            calls: AtomicUsize::new(0),
        };
        let store = MemoryBarStore::new();

        let first = load_bars(&store, Some(&provider), "BTCUSDT", "1h", None, None).unwrap();
        let second = load_bars(&store, Some(&provider), "BTCUSDT", "1h", None, None).unwrap();
        assert_eq!(first, bars);
        assert_eq!(second, bars);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_store_without_provider_is_no_data() {
        let store = MemoryBarStore::new();
        assert!(matches!(
            load_bars(&store, None, "BTCUSDT", "1h", None, None),
            Err(DataError::NoData { .. })
        ));
    }

    #[test]
    fn bad_interval_fails_before_loading() {
        let store = MemoryBarStore::new();
        assert!(matches!(
            load_bars(&store, None, "BTCUSDT", "soon", None, None),
            Err(DataError::InvalidInterval(_))
        ));
    }
}
