//! Penalty table and search limits for railway pathfinding.

use signalbox_core::TILE_LENGTH;

/// Upper bound for [`RailSettings::look_ahead_max_signals`].
pub const MAX_LOOK_AHEAD_SIGNALS: u32 = 64;

/// Largest value accepted for any single penalty or look-ahead term.
pub const MAX_PENALTY: i32 = 1_000_000;

/// Costs and limits consumed by the cost engine and the search driver.
///
/// All penalties are in cost units, where one straight tile costs
/// [`TILE_LENGTH`]. Settings are fixed for the duration of a search; build
/// a [`Pathfinder`](crate::Pathfinder) from them to have them validated.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RailSettings {
    /// Trains may not turn 90° between adjacent tiles.
    pub forbid_90_deg: bool,
    /// Nodes closed before a search gives up.
    pub max_search_nodes: u32,
    /// Treat a red two-way signal right after a junction as a dead end.
    pub firstred_twoway_eol: bool,
    pub firstred_penalty: i32,
    pub firstred_exit_penalty: i32,
    pub lastred_penalty: i32,
    pub lastred_exit_penalty: i32,
    /// Per platform tile driven through.
    pub station_penalty: i32,
    pub slope_penalty: i32,
    pub curve45_penalty: i32,
    pub curve90_penalty: i32,
    pub depot_reverse_penalty: i32,
    pub crossing_penalty: i32,
    /// Signals ahead that count towards the look-ahead penalty.
    pub look_ahead_max_signals: u32,
    pub look_ahead_signal_p0: i32,
    pub look_ahead_signal_p1: i32,
    pub look_ahead_signal_p2: i32,
    pub pbs_cross_penalty: i32,
    pub pbs_station_penalty: i32,
    pub pbs_signal_back_penalty: i32,
    pub doubleslip_penalty: i32,
    pub longer_platform_penalty: i32,
    pub longer_platform_per_tile_penalty: i32,
    pub shorter_platform_penalty: i32,
    pub shorter_platform_per_tile_penalty: i32,
    /// Default cost bound for nearest-depot searches.
    pub max_depot_penalty: i32,
    /// Share computed segments between searches.
    pub segment_cache: bool,
}

impl Default for RailSettings {
    fn default() -> Self {
        Self {
            forbid_90_deg: false,
            max_search_nodes: 10_000,
            firstred_twoway_eol: true,
            firstred_penalty: 10 * TILE_LENGTH,
            firstred_exit_penalty: 100 * TILE_LENGTH,
            lastred_penalty: 10 * TILE_LENGTH,
            lastred_exit_penalty: 100 * TILE_LENGTH,
            station_penalty: 10 * TILE_LENGTH,
            slope_penalty: 2 * TILE_LENGTH,
            curve45_penalty: TILE_LENGTH,
            curve90_penalty: 6 * TILE_LENGTH,
            depot_reverse_penalty: 50 * TILE_LENGTH,
            crossing_penalty: 3 * TILE_LENGTH,
            look_ahead_max_signals: 10,
            look_ahead_signal_p0: 500,
            look_ahead_signal_p1: -100,
            look_ahead_signal_p2: 5,
            pbs_cross_penalty: 3 * TILE_LENGTH,
            pbs_station_penalty: 8 * TILE_LENGTH,
            pbs_signal_back_penalty: 15 * TILE_LENGTH,
            doubleslip_penalty: TILE_LENGTH,
            longer_platform_penalty: 8 * TILE_LENGTH,
            longer_platform_per_tile_penalty: 0,
            shorter_platform_penalty: 40 * TILE_LENGTH,
            shorter_platform_per_tile_penalty: 0,
            max_depot_penalty: 20 * TILE_LENGTH,
            segment_cache: true,
        }
    }
}

/// Invalid settings, reported when a pathfinder is built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("{name} must be in 0..={max} (got {value})")]
    PenaltyRange {
        name: &'static str,
        value: i32,
        max: i32,
    },
    #[error("max_search_nodes must be at least 1")]
    NoSearchNodes,
    #[error("look_ahead_max_signals must be in 1..={max} (got {value})")]
    LookAheadRange { value: u32, max: u32 },
    #[error("look-ahead penalty for signal {index} is outside -{max}..={max}")]
    LookAheadOverflow { index: u32, max: i32 },
}

impl RailSettings {
    /// Check the table for values the cost engine cannot work with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let penalties = [
            ("firstred_penalty", self.firstred_penalty),
            ("firstred_exit_penalty", self.firstred_exit_penalty),
            ("lastred_penalty", self.lastred_penalty),
            ("lastred_exit_penalty", self.lastred_exit_penalty),
            ("station_penalty", self.station_penalty),
            ("slope_penalty", self.slope_penalty),
            ("curve45_penalty", self.curve45_penalty),
            ("curve90_penalty", self.curve90_penalty),
            ("depot_reverse_penalty", self.depot_reverse_penalty),
            ("crossing_penalty", self.crossing_penalty),
            ("pbs_cross_penalty", self.pbs_cross_penalty),
            ("pbs_station_penalty", self.pbs_station_penalty),
            ("pbs_signal_back_penalty", self.pbs_signal_back_penalty),
            ("doubleslip_penalty", self.doubleslip_penalty),
            ("longer_platform_penalty", self.longer_platform_penalty),
            (
                "longer_platform_per_tile_penalty",
                self.longer_platform_per_tile_penalty,
            ),
            ("shorter_platform_penalty", self.shorter_platform_penalty),
            (
                "shorter_platform_per_tile_penalty",
                self.shorter_platform_per_tile_penalty,
            ),
            ("max_depot_penalty", self.max_depot_penalty),
        ];
        if let Some(&(name, value)) = penalties
            .iter()
            .find(|(_, v)| !(0..=MAX_PENALTY).contains(v))
        {
            return Err(SettingsError::PenaltyRange {
                name,
                value,
                max: MAX_PENALTY,
            });
        }
        if self.max_search_nodes == 0 {
            return Err(SettingsError::NoSearchNodes);
        }
        if !(1..=MAX_LOOK_AHEAD_SIGNALS).contains(&self.look_ahead_max_signals) {
            return Err(SettingsError::LookAheadRange {
                value: self.look_ahead_max_signals,
                max: MAX_LOOK_AHEAD_SIGNALS,
            });
        }
        for i in 0..self.look_ahead_max_signals {
            if self.look_ahead_term(i).abs() > MAX_PENALTY as i64 {
                return Err(SettingsError::LookAheadOverflow {
                    index: i,
                    max: MAX_PENALTY,
                });
            }
        }
        Ok(())
    }

    fn look_ahead_term(&self, i: u32) -> i64 {
        let i = i as i64;
        self.look_ahead_signal_p0 as i64
            + i * (self.look_ahead_signal_p1 as i64 + i * self.look_ahead_signal_p2 as i64)
    }

    /// Look-ahead penalty for the n-th signal ahead, `p0 + n·(p1 + n·p2)`,
    /// for every n below [`look_ahead_max_signals`](Self::look_ahead_max_signals).
    pub fn look_ahead_costs(&self) -> Vec<i32> {
        (0..self.look_ahead_max_signals.min(MAX_LOOK_AHEAD_SIGNALS))
            .map(|i| self.look_ahead_term(i).clamp(i32::MIN as i64, i32::MAX as i64) as i32)
            .collect()
    }
}


#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let s: RailSettings =
            serde_json::from_str(r#"{ "curve90_penalty": 0, "forbid_90_deg": true }"#).unwrap();
        assert_eq!(s.curve90_penalty, 0);
        assert!(s.forbid_90_deg);
        assert_eq!(s.station_penalty, RailSettings::default().station_penalty);
    }

    #[test]
    fn settings_round_trip() {
        let s = RailSettings {
            look_ahead_max_signals: 3,
            ..RailSettings::default()
        };
        let json = serde_json::to_string(&s).unwrap();
        let back: RailSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
    }
}
