//! Session phases and the per-asset configuration that maps a wall-clock
//! minute-of-day window onto one.
//!
//! Windows wrap around midnight (e.g. `ASIA_RANGE` 23:00-08:00), so matching
//! is done on minute-of-day with explicit wrap-around handling rather than a
//! plain `start <= now <= end` comparison.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// A named trading session.
///
/// `UsCore` is a deprecated alias of `UsCoreTrading`, kept disabled by
/// default so operators who have not migrated their
/// `AssetSessionPhaseConfig` rows see no behavior change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionPhase {
    AsiaRange,
    LondonCore,
    PreUsRange,
    UsCoreTrading,
    UsCore,
    EiaPre,
    EiaPost,
    FridayLate,
    Other,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionPhase::AsiaRange => "ASIA_RANGE",
            SessionPhase::LondonCore => "LONDON_CORE",
            SessionPhase::PreUsRange => "PRE_US_RANGE",
            SessionPhase::UsCoreTrading => "US_CORE_TRADING",
            SessionPhase::UsCore => "US_CORE",
            SessionPhase::EiaPre => "EIA_PRE",
            SessionPhase::EiaPost => "EIA_POST",
            SessionPhase::FridayLate => "FRIDAY_LATE",
            SessionPhase::Other => "OTHER",
        };
        f.write_str(s)
    }
}

/// Error returned by [`SessionPhase`]'s `FromStr` impl for an unrecognized
/// persisted phase label.
#[derive(Debug, thiserror::Error)]
#[error("unrecognized session phase label: {0}")]
pub struct ParsePhaseError(String);

impl std::str::FromStr for SessionPhase {
    type Err = ParsePhaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ASIA_RANGE" => Ok(SessionPhase::AsiaRange),
            "LONDON_CORE" => Ok(SessionPhase::LondonCore),
            "PRE_US_RANGE" => Ok(SessionPhase::PreUsRange),
            "US_CORE_TRADING" => Ok(SessionPhase::UsCoreTrading),
            "US_CORE" => Ok(SessionPhase::UsCore),
            "EIA_PRE" => Ok(SessionPhase::EiaPre),
            "EIA_POST" => Ok(SessionPhase::EiaPost),
            "FRIDAY_LATE" => Ok(SessionPhase::FridayLate),
            "OTHER" => Ok(SessionPhase::Other),
            other => Err(ParsePhaseError(other.to_string())),
        }
    }
}

/// A single minute-of-day window configured for one asset and phase.
///
/// `start_minute`/`end_minute` are the runtime form of the spec's
/// `start_time_utc`/`end_time_utc` HH:MM strings. `priority` breaks ties
/// when two windows for the same asset overlap (higher wins) — the Python
/// original resolved this implicitly via iteration order, which §9 flags as
/// not worth depending on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetSessionPhaseConfig {
    pub phase: SessionPhase,
    /// Minutes since UTC midnight, `0..=1439`.
    pub start_minute: u16,
    /// Minutes since UTC midnight, `0..=1439`.
    pub end_minute: u16,
    pub is_range_build_phase: bool,
    pub is_trading_phase: bool,
    pub enabled: bool,
    pub priority: i32,
}

impl AssetSessionPhaseConfig {
    /// Whether `minute_of_day` falls inside this window, handling wrap-around
    /// (`start_minute > end_minute` means the window crosses midnight).
    ///
    /// The end boundary is exclusive (`start <= m < end`) so that adjacent,
    /// back-to-back windows (e.g. `ASIA_RANGE 00:00-08:00` and
    /// `LONDON_CORE 08:00-11:00`) never both match the shared boundary
    /// minute, and a window's closing minute itself resolves to whatever
    /// comes next (or `OTHER`).
    pub fn contains(&self, minute_of_day: u16) -> bool {
        if !self.enabled {
            return false;
        }
        if self.start_minute <= self.end_minute {
            minute_of_day >= self.start_minute && minute_of_day < self.end_minute
        } else {
            minute_of_day >= self.start_minute || minute_of_day < self.end_minute
        }
    }
}

/// The EIA-release reference instant used by phase resolution's first step:
/// a window of `pre_window` before `reference` resolves to `EIA_PRE`, and
/// `post_window` after it (inclusive) resolves to `EIA_POST`.
#[derive(Debug, Clone, Copy)]
pub struct EiaReference {
    pub reference: DateTime<Utc>,
    pub pre_window: Duration,
    pub post_window: Duration,
}

/// Start of the Friday-late window (minute-of-day, UTC), used by the
/// weekend/Friday-late gate for non-crypto, non-24/7 assets: once a window
/// match fails and it's a Friday at or after this minute, the phase is
/// `FRIDAY_LATE` rather than `OTHER`.
pub const FRIDAY_LATE_START_MINUTE: u16 = 22 * 60;

/// The default session windows used when no per-asset configuration exists:
/// `ASIA_RANGE 00:00-08:00`, `LONDON_CORE 08:00-11:00`,
/// `PRE_US_RANGE 13:00-15:00`, `US_CORE_TRADING 15:00-22:00`.
pub fn default_session_times() -> SessionTimes {
    SessionTimes::new(vec![
        AssetSessionPhaseConfig {
            phase: SessionPhase::AsiaRange,
            start_minute: 0,
            end_minute: 8 * 60,
            is_range_build_phase: true,
            is_trading_phase: false,
            enabled: true,
            priority: 0,
        },
        AssetSessionPhaseConfig {
            phase: SessionPhase::LondonCore,
            start_minute: 8 * 60,
            end_minute: 11 * 60,
            is_range_build_phase: true,
            is_trading_phase: false,
            enabled: true,
            priority: 0,
        },
        AssetSessionPhaseConfig {
            phase: SessionPhase::PreUsRange,
            start_minute: 13 * 60,
            end_minute: 15 * 60,
            is_range_build_phase: true,
            is_trading_phase: false,
            enabled: true,
            priority: 0,
        },
        AssetSessionPhaseConfig {
            phase: SessionPhase::UsCoreTrading,
            start_minute: 15 * 60,
            end_minute: 22 * 60,
            is_range_build_phase: false,
            is_trading_phase: true,
            enabled: true,
            priority: 0,
        },
    ])
}

/// Derived runtime view over the enabled phase configs of one asset, keyed
/// by phase. Built once per tick from the persisted config rows so the
/// phase resolver does not re-parse HH:MM strings on every call.
#[derive(Debug, Clone, Default)]
pub struct SessionTimes {
    windows: Vec<AssetSessionPhaseConfig>,
    eia_reference: Option<EiaReference>,
}

impl SessionTimes {
    pub fn new(mut windows: Vec<AssetSessionPhaseConfig>) -> Self {
        windows.retain(|w| w.enabled);
        Self {
            windows,
            eia_reference: None,
        }
    }

    pub fn with_eia_reference(mut self, eia_reference: EiaReference) -> Self {
        self.eia_reference = Some(eia_reference);
        self
    }

    pub fn windows(&self) -> &[AssetSessionPhaseConfig] {
        &self.windows
    }

    /// Resolves the active [`SessionPhase`] at a given minute of day,
    /// considering only the configured windows (step 2 of phase
    /// resolution). Use [`SessionTimes::resolve_phase_full`] for the
    /// complete algorithm including the EIA and weekend/Friday-late steps.
    ///
    /// At most one enabled window should contain any given minute per the
    /// invariant in spec §3; when configuration error lets more than one
    /// match, the highest `priority` wins, and `US_CORE_TRADING` is
    /// preferred over the deprecated `US_CORE` alias on an exact tie.
    pub fn resolve_phase(&self, minute_of_day: u16) -> SessionPhase {
        self.windows
            .iter()
            .filter(|c| c.contains(minute_of_day))
            .max_by_key(|c| (c.priority, c.phase == SessionPhase::UsCoreTrading))
            .map(|c| c.phase)
            .unwrap_or(SessionPhase::Other)
    }

    /// Full phase resolution at instant `now`: EIA reference window, then
    /// configured window membership, then the weekend/Friday-late gate.
    ///
    /// `is_crypto`/`trades_24_7` assets skip the weekend/Friday-late gate
    /// entirely, matching the current asset's real-time trading hours.
    pub fn resolve_phase_full(&self, now: DateTime<Utc>, is_crypto: bool, trades_24_7: bool) -> SessionPhase {
        if let Some(eia) = &self.eia_reference {
            if now >= eia.reference - eia.pre_window && now < eia.reference {
                return SessionPhase::EiaPre;
            }
            if now >= eia.reference && now <= eia.reference + eia.post_window {
                return SessionPhase::EiaPost;
            }
        }

        let minute_of_day = (now.time().num_seconds_from_midnight() / 60) as u16;
        let gated = !is_crypto && !trades_24_7;

        if gated && matches!(now.weekday(), Weekday::Sat | Weekday::Sun) {
            return SessionPhase::Other;
        }

        let window_match = self.resolve_phase(minute_of_day);
        if window_match != SessionPhase::Other {
            return window_match;
        }

        if gated && now.weekday() == Weekday::Fri && minute_of_day >= FRIDAY_LATE_START_MINUTE {
            return SessionPhase::FridayLate;
        }

        SessionPhase::Other
    }

    pub fn is_range_building(&self, phase: SessionPhase) -> bool {
        self.windows
            .iter()
            .find(|c| c.phase == phase)
            .map(|c| c.is_range_build_phase)
            .unwrap_or(false)
    }

    pub fn is_trading_phase(&self, phase: SessionPhase) -> bool {
        self.windows
            .iter()
            .find(|c| c.phase == phase)
            .map(|c| c.is_trading_phase)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(
        phase: SessionPhase,
        start: u16,
        end: u16,
        priority: i32,
        is_trading: bool,
        is_range: bool,
    ) -> AssetSessionPhaseConfig {
        AssetSessionPhaseConfig {
            phase,
            start_minute: start,
            end_minute: end,
            is_range_build_phase: is_range,
            is_trading_phase: is_trading,
            enabled: true,
            priority,
        }
    }

    #[test]
    fn resolves_simple_window() {
        let times = SessionTimes::new(vec![cfg(
            SessionPhase::UsCoreTrading,
            14 * 60,
            21 * 60,
            0,
            true,
            false,
        )]);
        assert_eq!(times.resolve_phase(15 * 60), SessionPhase::UsCoreTrading);
        assert_eq!(times.resolve_phase(5 * 60), SessionPhase::Other);
    }

    #[test]
    fn wrap_around_window_matches_both_sides_of_midnight() {
        let times = SessionTimes::new(vec![cfg(
            SessionPhase::AsiaRange,
            23 * 60,
            8 * 60,
            0,
            false,
            true,
        )]);
        assert_eq!(times.resolve_phase(23 * 60 + 30), SessionPhase::AsiaRange);
        assert_eq!(times.resolve_phase(60), SessionPhase::AsiaRange);
        assert_eq!(times.resolve_phase(12 * 60), SessionPhase::Other);
    }

    #[test]
    fn disabled_window_never_matches() {
        let mut disabled = cfg(SessionPhase::AsiaRange, 0, 1439, 0, false, true);
        disabled.enabled = false;
        let times = SessionTimes::new(vec![disabled]);
        assert_eq!(times.resolve_phase(0), SessionPhase::Other);
    }

    #[test]
    fn higher_priority_wins_on_overlap() {
        let times = SessionTimes::new(vec![
            cfg(SessionPhase::LondonCore, 7 * 60, 16 * 60, 0, false, true),
            cfg(SessionPhase::PreUsRange, 12 * 60, 14 * 60, 1, false, true),
        ]);
        assert_eq!(times.resolve_phase(13 * 60), SessionPhase::PreUsRange);
    }

    #[test]
    fn legacy_us_core_disabled_by_default() {
        let mut legacy = cfg(SessionPhase::UsCore, 14 * 60, 21 * 60, 0, true, false);
        legacy.enabled = false;
        let times = SessionTimes::new(vec![legacy]);
        assert_eq!(times.resolve_phase(15 * 60), SessionPhase::Other);
    }

    #[test]
    fn is_trading_and_range_flags_come_from_config() {
        let times = SessionTimes::new(vec![
            cfg(SessionPhase::UsCoreTrading, 14 * 60, 21 * 60, 0, true, false),
            cfg(SessionPhase::AsiaRange, 0, 7 * 60, 0, false, true),
        ]);
        assert!(times.is_trading_phase(SessionPhase::UsCoreTrading));
        assert!(!times.is_trading_phase(SessionPhase::AsiaRange));
        assert!(times.is_range_building(SessionPhase::AsiaRange));
        assert!(!times.is_range_building(SessionPhase::UsCoreTrading));
    }

    #[test]
    fn display_and_from_str_round_trip_for_every_variant() {
        let variants = [
            SessionPhase::AsiaRange,
            SessionPhase::LondonCore,
            SessionPhase::PreUsRange,
            SessionPhase::UsCoreTrading,
            SessionPhase::UsCore,
            SessionPhase::EiaPre,
            SessionPhase::EiaPost,
            SessionPhase::FridayLate,
            SessionPhase::Other,
        ];
        for phase in variants {
            let label = phase.to_string();
            assert_eq!(label.parse::<SessionPhase>().unwrap(), phase);
        }
    }

    #[test]
    fn from_str_rejects_unknown_label() {
        assert!("NOT_A_PHASE".parse::<SessionPhase>().is_err());
    }

    #[test]
    fn window_end_boundary_is_exclusive() {
        let times = SessionTimes::new(vec![cfg(SessionPhase::UsCoreTrading, 15 * 60, 22 * 60, 0, true, false)]);
        assert_eq!(times.resolve_phase(22 * 60), SessionPhase::Other);
        assert_eq!(times.resolve_phase(22 * 60 - 1), SessionPhase::UsCoreTrading);
    }

    #[test]
    fn adjacent_windows_do_not_both_match_the_shared_boundary() {
        let times = SessionTimes::new(vec![
            cfg(SessionPhase::AsiaRange, 0, 8 * 60, 0, false, true),
            cfg(SessionPhase::LondonCore, 8 * 60, 11 * 60, 0, false, true),
        ]);
        assert_eq!(times.resolve_phase(8 * 60), SessionPhase::LondonCore);
    }

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn default_windows_resolve_the_full_weekday_cycle() {
        let times = default_session_times();
        assert_eq!(times.resolve_phase_full(ts("2024-01-09T03:00:00Z"), false, false), SessionPhase::AsiaRange);
        assert_eq!(times.resolve_phase_full(ts("2024-01-09T09:00:00Z"), false, false), SessionPhase::LondonCore);
        assert_eq!(times.resolve_phase_full(ts("2024-01-09T13:30:00Z"), false, false), SessionPhase::PreUsRange);
        assert_eq!(times.resolve_phase_full(ts("2024-01-09T15:00:00Z"), false, false), SessionPhase::UsCoreTrading);
        assert_eq!(times.resolve_phase_full(ts("2024-01-09T22:00:00Z"), false, false), SessionPhase::Other);
    }

    #[test]
    fn weekend_overrides_a_window_match_for_a_gated_asset() {
        let times = default_session_times();
        assert_eq!(times.resolve_phase_full(ts("2024-01-13T14:00:00Z"), false, false), SessionPhase::Other);
    }

    #[test]
    fn friday_late_window_applies_once_the_trading_window_has_closed() {
        let times = default_session_times();
        assert_eq!(times.resolve_phase_full(ts("2024-01-12T22:00:00Z"), false, false), SessionPhase::FridayLate);
    }

    #[test]
    fn crypto_asset_skips_weekend_and_friday_late_gating() {
        let times = default_session_times();
        assert_eq!(times.resolve_phase_full(ts("2024-01-13T16:00:00Z"), true, false), SessionPhase::UsCoreTrading);
        assert_eq!(times.resolve_phase_full(ts("2024-01-12T21:00:00Z"), true, false), SessionPhase::UsCoreTrading);
    }

    #[test]
    fn trades_24_7_asset_skips_weekend_and_friday_late_gating() {
        let times = default_session_times();
        assert_eq!(times.resolve_phase_full(ts("2024-01-13T16:00:00Z"), false, true), SessionPhase::UsCoreTrading);
    }

    #[test]
    fn eia_reference_window_takes_priority_over_session_windows() {
        let eia = EiaReference {
            reference: ts("2024-01-09T15:30:00Z"),
            pre_window: Duration::minutes(30),
            post_window: Duration::minutes(15),
        };
        let times = default_session_times().with_eia_reference(eia);

        assert_eq!(times.resolve_phase_full(ts("2024-01-09T15:10:00Z"), false, false), SessionPhase::EiaPre);
        assert_eq!(times.resolve_phase_full(ts("2024-01-09T15:30:00Z"), false, false), SessionPhase::EiaPost);
        assert_eq!(times.resolve_phase_full(ts("2024-01-09T15:45:00Z"), false, false), SessionPhase::EiaPost);
        assert_eq!(times.resolve_phase_full(ts("2024-01-09T15:46:00Z"), false, false), SessionPhase::UsCoreTrading);
    }
}
