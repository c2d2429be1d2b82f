//! The Market State Provider: phase resolution, the 1-minute candle cache,
//! and per-phase breakout range tracking.
//!
//! Grounded in the original `MarketDataService`'s "current asset" pointer,
//! carried here as an explicit field set once per tick by the worker loop
//! (`set_current_asset`/`clear_current_asset`) rather than implicit
//! thread-local/module state — the one place in this component where a
//! cycle-scoped pointer is kept rather than threaded as a parameter, because
//! the range trackers it backs are inherently per-tick-cycle state (see
//! DESIGN.md).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Timelike, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use smol_str::SmolStr;

use fiona_markets::{
    BreakoutRange, BrokerClient, Candle1m, SessionPhase, SessionTimes, TradingAsset,
};

use crate::error::DataError;
use crate::range_store::RangeStore;

struct RangeTracker {
    running_high: Decimal,
    running_low: Decimal,
    start_time: DateTime<Utc>,
    candle_count: u32,
}

/// Combines a `TradingAsset` with its derived `SessionTimes`, set once per
/// worker tick before the phase/range logic runs for that asset.
struct CurrentAsset {
    asset: TradingAsset,
    session_times: SessionTimes,
}

pub struct MarketStateProvider {
    registry: Arc<fiona_markets::BrokerRegistry>,
    default_client: Option<Arc<dyn BrokerClient>>,
    range_store: Arc<dyn RangeStore>,
    default_session_times: SessionTimes,
    current_asset: RwLock<Option<CurrentAsset>>,
    candle_cache: RwLock<HashMap<SmolStr, Vec<Candle1m>>>,
    range_trackers: RwLock<HashMap<(SmolStr, SessionPhase), RangeTracker>>,
}

impl MarketStateProvider {
    pub fn new(
        registry: Arc<fiona_markets::BrokerRegistry>,
        default_client: Option<Arc<dyn BrokerClient>>,
        range_store: Arc<dyn RangeStore>,
    ) -> Self {
        Self {
            registry,
            default_client,
            range_store,
            default_session_times: fiona_markets::default_session_times(),
            current_asset: RwLock::new(None),
            candle_cache: RwLock::new(HashMap::new()),
            range_trackers: RwLock::new(HashMap::new()),
        }
    }

    pub fn set_current_asset(&self, asset: TradingAsset, session_times: SessionTimes) {
        *self.current_asset.write() = Some(CurrentAsset {
            asset,
            session_times,
        });
    }

    pub fn clear_current_asset(&self) {
        *self.current_asset.write() = None;
    }

    /// Resolves the active session phase at `now`, using the current
    /// asset's `SessionTimes` when one is set, else the provider's default.
    ///
    /// Runs the full algorithm (EIA reference window, then configured
    /// window membership, then the weekend/Friday-late gate) with no
    /// current asset set behaving as a non-crypto, non-24/7 asset against
    /// the default windows, so phase resolution with no asset set matches
    /// resolution for an asset whose config is the defaults.
    pub fn get_phase(&self, now: DateTime<Utc>) -> SessionPhase {
        match self.current_asset.read().as_ref() {
            Some(current) => {
                current
                    .session_times
                    .resolve_phase_full(now, current.asset.is_crypto, current.asset.trades_24_7)
            }
            None => self.default_session_times.resolve_phase_full(now, false, false),
        }
    }

    /// Whether `phase` is configured as tradeable for the current asset
    /// (or the default session times if none is set).
    pub fn is_phase_tradeable(&self, phase: SessionPhase) -> bool {
        match self.current_asset.read().as_ref() {
            Some(current) => current.session_times.is_trading_phase(phase),
            None => self.default_session_times.is_trading_phase(phase),
        }
    }

    async fn resolve_broker(&self) -> Result<Arc<dyn BrokerClient>, DataError> {
        if let Some(current) = self.current_asset.read().as_ref() {
            return Ok(self.registry.get_for_asset(&current.asset).await?);
        }
        self.default_client.clone().ok_or(DataError::NoBrokerAvailable)
    }

    /// Fetches a live price from the current (or default) broker and
    /// synthesizes a single-sample bar at `now`'s minute, appending it to
    /// the candle cache for `epic`. Callers combining the result with
    /// historical candles must de-duplicate by minute start.
    pub async fn update_candle_from_price(
        &self,
        epic: &str,
        now: DateTime<Utc>,
    ) -> Result<Candle1m, DataError> {
        let broker = self.resolve_broker().await?;
        let price = broker.get_symbol_price(epic).await?;
        let bucket = minute_bucket(now);
        let candle = Candle1m::from_single_price(SmolStr::new(epic), bucket, price.mid_price());
        self.ingest_candle(epic, candle.clone());
        Ok(candle)
    }

    /// Appends or merges `candle` into the cache for `epic`. Used by
    /// `update_candle_from_price` and by callers preloading historical bars
    /// (e.g. the streaming worker's trade-aggregation path).
    pub fn ingest_candle(&self, epic: &str, candle: Candle1m) {
        let mut cache = self.candle_cache.write();
        let bars = cache.entry(SmolStr::new(epic)).or_default();
        match bars.last_mut() {
            Some(last) if last.time == candle.time => last.absorb(candle.close, 0),
            _ => bars.push(candle),
        }
    }

    /// Returns up to `n` recent candles for `epic` from the cache. When
    /// `closed_only` is true and the newest bar's minute equals `now`'s
    /// minute (i.e. it is still forming), that bar is dropped first.
    pub fn get_recent_candles(&self, epic: &str, n: usize, closed_only: bool, now: DateTime<Utc>) -> Vec<Candle1m> {
        let cache = self.candle_cache.read();
        let Some(bars) = cache.get(epic) else {
            return Vec::new();
        };

        let current_minute = minute_bucket(now);

        let mut bars = bars.clone();
        if closed_only {
            if let Some(last) = bars.last() {
                if last.time == current_minute {
                    bars.pop();
                }
            }
        }

        let start = bars.len().saturating_sub(n);
        bars[start..].to_vec()
    }

    /// Feeds a new mid price into the running high/low tracker for
    /// `(epic, phase)` while `phase` is a range-building phase. A fresh
    /// tracker is started if none exists yet for this epic/phase pair.
    pub fn accumulate_range(&self, epic: &str, phase: SessionPhase, mid: Decimal, now: DateTime<Utc>) {
        let key = (SmolStr::new(epic), phase);
        let mut trackers = self.range_trackers.write();
        trackers
            .entry(key)
            .and_modify(|t| {
                t.running_high = t.running_high.max(mid);
                t.running_low = t.running_low.min(mid);
                t.candle_count += 1;
            })
            .or_insert(RangeTracker {
                running_high: mid,
                running_low: mid,
                start_time: now,
                candle_count: 1,
            });
    }

    pub fn running_range(&self, epic: &str, phase: SessionPhase) -> Option<(Decimal, Decimal, u32)> {
        self.range_trackers
            .read()
            .get(&(SmolStr::new(epic), phase))
            .map(|t| (t.running_high, t.running_low, t.candle_count))
    }

    /// Returns when the open tracker for `(epic, phase)` first started
    /// accumulating, for callers persisting a `BreakoutRange`'s `start_time`.
    pub fn running_range_start_time(&self, epic: &str, phase: SessionPhase) -> Option<DateTime<Utc>> {
        self.range_trackers
            .read()
            .get(&(SmolStr::new(epic), phase))
            .map(|t| t.start_time)
    }

    /// Persists a `BreakoutRange` snapshot for `epic`/`phase`.
    ///
    /// Only persisted when `epic` equals the current asset's epic — a call
    /// for a different epic is a no-op, matching the original's
    /// `set_<phase>_range` contract which is bound to whichever asset is
    /// "current" for this tick.
    pub async fn set_range(
        &self,
        epic: &str,
        phase: SessionPhase,
        high: Decimal,
        low: Decimal,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        candle_count: u32,
        atr: Option<Decimal>,
    ) -> Result<(), DataError> {
        let matches_current = self
            .current_asset
            .read()
            .as_ref()
            .map(|c| c.asset.epic.as_str() == epic)
            .unwrap_or(false);

        if !matches_current {
            return Ok(());
        }

        let tick_size = self
            .current_asset
            .read()
            .as_ref()
            .map(|c| c.asset.tick_size)
            .unwrap_or(Decimal::ONE);

        let mut range = BreakoutRange {
            asset_epic: SmolStr::new(epic),
            phase,
            start_time,
            end_time,
            computed_high: high,
            computed_low: low,
            height_ticks: 0,
            height_points: Decimal::ZERO,
            candle_count,
            atr,
            manual_high: None,
            manual_low: None,
            last_adjusted_by: None,
            last_adjusted_at: None,
        };
        range.recompute_height(tick_size);

        self.range_store.save_range(range).await?;
        Ok(())
    }

    /// Looks up the freshest persisted range for `epic`/`phase`, falling
    /// back to the database only on cache miss; stale ranges (ended more
    /// than 24h ago) are never returned.
    pub async fn latest_range(
        &self,
        epic: &str,
        phase: SessionPhase,
        now: DateTime<Utc>,
    ) -> Result<Option<BreakoutRange>, DataError> {
        Ok(self.range_store.latest_range(epic, phase, now).await?)
    }

    /// Returns a human-readable warning when no candle has been observed
    /// for `epic` within the last `max_age`.
    pub fn check_no_data_warning(&self, epic: &str, now: DateTime<Utc>, max_age: Duration) -> Option<String> {
        let cache = self.candle_cache.read();
        match cache.get(epic).and_then(|bars| bars.last()) {
            Some(last) if now.signed_duration_since(last.time) > max_age => {
                Some(format!("no fresh candle for {epic} in the last {max_age}"))
            }
            None => Some(format!("no candle data observed yet for {epic}")),
            _ => None,
        }
    }

    /// Drops the candle cache and range trackers. Called when a session
    /// phase transitions (range trackers only make sense within the phase
    /// window they were opened in) or on worker shutdown.
    pub fn clear_session_caches(&self) {
        self.candle_cache.write().clear();
        self.range_trackers.write().clear();
    }
}

fn minute_bucket(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(now.time().hour(), now.time().minute(), 0)
        .unwrap()
        .and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fiona_markets::account::{AccountState, OrderRequest, OrderResult, Position};
    use fiona_markets::{BrokerConnectionState, BrokerError, BrokerKind, SymbolPrice};
    use rust_decimal_macros::dec;

    use crate::range_store::InMemoryRangeStore;

    struct FixedPriceClient {
        price: Decimal,
    }

    #[async_trait]
    impl BrokerClient for FixedPriceClient {
        fn kind(&self) -> BrokerKind {
            BrokerKind::Kraken
        }
        fn connection_state(&self) -> BrokerConnectionState {
            BrokerConnectionState::Connected
        }
        async fn connect(&self) -> Result<(), BrokerError> {
            Ok(())
        }
        async fn disconnect(&self) -> Result<(), BrokerError> {
            Ok(())
        }
        async fn get_account_state(&self) -> Result<AccountState, BrokerError> {
            unimplemented!()
        }
        async fn get_open_positions(&self) -> Result<Vec<Position>, BrokerError> {
            unimplemented!()
        }
        async fn get_symbol_price(&self, symbol: &str) -> Result<SymbolPrice, BrokerError> {
            Ok(SymbolPrice {
                symbol: symbol.into(),
                bid: self.price,
                ask: self.price,
                timestamp: Utc::now(),
                day_high: None,
                day_low: None,
            })
        }
        async fn get_historical_candles(
            &self,
            _symbol: &str,
            _since: DateTime<Utc>,
            _limit: usize,
        ) -> Result<Vec<Candle1m>, BrokerError> {
            Ok(Vec::new())
        }
        async fn submit_order(&self, _order: &OrderRequest) -> Result<OrderResult, BrokerError> {
            unimplemented!()
        }
    }

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn provider(price: Decimal) -> MarketStateProvider {
        let registry = Arc::new(fiona_markets::BrokerRegistry::new(HashMap::new()));
        let client: Arc<dyn BrokerClient> = Arc::new(FixedPriceClient { price });
        MarketStateProvider::new(registry, Some(client), Arc::new(InMemoryRangeStore::new()))
    }

    #[tokio::test]
    async fn update_candle_from_price_creates_single_sample_bar() {
        let p = provider(dec!(100.5));
        let now = ts("2026-01-05T14:32:10Z");
        let candle = p.update_candle_from_price("EPIC1", now).await.unwrap();
        assert_eq!(candle.open, dec!(100.5));
        assert_eq!(candle.high, dec!(100.5));
        assert_eq!(candle.low, dec!(100.5));
    }

    #[tokio::test]
    async fn repeated_updates_within_same_minute_absorb_into_one_bar() {
        let p = provider(dec!(100));
        let t1 = ts("2026-01-05T14:32:10Z");
        let t2 = ts("2026-01-05T14:32:40Z");
        p.update_candle_from_price("EPIC1", t1).await.unwrap();
        p.update_candle_from_price("EPIC1", t2).await.unwrap();

        let bars = p.get_recent_candles("EPIC1", 10, false, t2);
        assert_eq!(bars.len(), 1);
    }

    #[tokio::test]
    async fn closed_only_drops_currently_forming_bar() {
        let p = provider(dec!(100));
        let now = ts("2026-01-05T14:32:10Z");
        p.update_candle_from_price("EPIC1", now).await.unwrap();

        let open_bars = p.get_recent_candles("EPIC1", 10, false, now);
        let closed_bars = p.get_recent_candles("EPIC1", 10, true, now);
        assert_eq!(open_bars.len(), 1);
        assert_eq!(closed_bars.len(), 0);
    }

    #[tokio::test]
    async fn set_range_persists_only_for_current_asset_epic() {
        let p = provider(dec!(100));
        let asset = TradingAsset {
            symbol: "WTI".into(),
            epic: "EPIC1".into(),
            broker_kind: BrokerKind::Kraken,
            broker_symbol: None,
            category: "energy".into(),
            tick_size: dec!(0.01),
            is_crypto: false,
            is_active: true,
            trading_mode: Default::default(),
            trades_24_7: true,
        };
        p.set_current_asset(asset, SessionTimes::default());

        let start = ts("2026-01-05T23:00:00Z");
        let end = ts("2026-01-06T08:00:00Z");
        p.set_range("EPIC1", SessionPhase::AsiaRange, dec!(75.50), dec!(75.30), start, end, 4, None)
            .await
            .unwrap();
        p.set_range("OTHER_EPIC", SessionPhase::AsiaRange, dec!(1), dec!(0), start, end, 4, None)
            .await
            .unwrap();

        let found = p.latest_range("EPIC1", SessionPhase::AsiaRange, end).await.unwrap();
        assert!(found.is_some());
        let missing = p.latest_range("OTHER_EPIC", SessionPhase::AsiaRange, end).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn accumulate_range_tracks_running_high_low() {
        let p = provider(dec!(100));
        for mid in [dec!(75.40), dec!(75.50), dec!(75.30), dec!(75.45)] {
            p.accumulate_range("EPIC1", SessionPhase::AsiaRange, mid, Utc::now());
        }
        let (high, low, count) = p.running_range("EPIC1", SessionPhase::AsiaRange).unwrap();
        assert_eq!(high, dec!(75.50));
        assert_eq!(low, dec!(75.30));
        assert_eq!(count, 4);
    }

    #[test]
    fn check_no_data_warning_fires_when_no_candle_observed() {
        let p = provider(dec!(100));
        let warning = p.check_no_data_warning("EPIC1", Utc::now(), Duration::hours(1));
        assert!(warning.is_some());
    }

    #[test]
    fn get_phase_with_no_current_asset_uses_the_default_windows_and_weekend_gate() {
        let p = provider(dec!(100));
        assert_eq!(p.get_phase(ts("2024-01-09T03:00:00Z")), SessionPhase::AsiaRange);
        assert_eq!(p.get_phase(ts("2024-01-09T15:00:00Z")), SessionPhase::UsCoreTrading);
        assert_eq!(p.get_phase(ts("2024-01-13T14:00:00Z")), SessionPhase::Other);
        assert_eq!(p.get_phase(ts("2024-01-12T22:00:00Z")), SessionPhase::FridayLate);
    }

    #[test]
    fn get_phase_for_a_crypto_current_asset_skips_the_weekend_gate() {
        let p = provider(dec!(100));
        let asset = TradingAsset {
            symbol: "BTC".into(),
            epic: "EPIC1".into(),
            broker_kind: BrokerKind::Kraken,
            broker_symbol: None,
            category: "crypto".into(),
            tick_size: dec!(0.01),
            is_crypto: true,
            is_active: true,
            trading_mode: Default::default(),
            trades_24_7: true,
        };
        p.set_current_asset(asset, fiona_markets::default_session_times());

        assert_eq!(p.get_phase(ts("2024-01-13T16:00:00Z")), SessionPhase::UsCoreTrading);
    }
}
