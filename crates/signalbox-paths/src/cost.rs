//! Segment pricing.
//!
//! [`CostEngine::walk`] follows track from a node's first tile until
//! something ends the segment, adding up per-tile costs on the way. What it
//! finds depends on the layout only once the node is past the signal
//! look-ahead, which is when the result may go into the shared cache.
//! [`CostEngine::finish`] then turns a segment into the node's path cost:
//! destination check, red-signal and platform penalties.

use signalbox_core::{
    Dir, Point, Range, SignalState, SignalType, TILE_CORNER_LENGTH, TILE_LENGTH, TileKind,
    TileMap, TrackBits,
};

use crate::destination::Destination;
use crate::follower::{Follow, FollowError, Follower};
use crate::node::{Node, NodeFlags, NodeKey};
use crate::pbs::{is_safe_waiting_position, is_waiting_position_free};
use crate::segment::{Arrival, CachedSegment, EndSegmentReasons as Esr, SegmentKey};
use crate::settings::RailSettings;
use crate::vehicle::{Order, Vehicle};

/// Segments are cut once they cost more than this.
pub const MAX_SEGMENT_COST: i32 = 10_000;

/// Tiles followed past a waypoint looking for somewhere to wait.
const WAYPOINT_LOOKOUT_TILES: u32 = 20;

/// Result of one walk along a segment.
#[derive(Clone, Debug)]
pub(crate) struct Walk {
    pub segment: CachedSegment,
    /// Every reason the walk stopped, including those not cached.
    pub reasons: Esr,
    /// Speed-limit penalties, charged to the node and never cached.
    pub extra: i32,
    /// Stopped on a red two-way signal right after a junction.
    pub stopped_on_signal: bool,
}

/// Prices segments for one query.
pub struct CostEngine<'a> {
    map: &'a dyn TileMap,
    settings: &'a RailSettings,
    vehicle: &'a dyn Vehicle,
    follower: Follower,
    look_ahead: Vec<i32>,
    treat_first_red_two_way_as_eol: bool,
}

impl<'a> CostEngine<'a> {
    pub fn new(
        map: &'a dyn TileMap,
        settings: &'a RailSettings,
        vehicle: &'a dyn Vehicle,
        follower: Follower,
        treat_first_red_two_way_as_eol: bool,
    ) -> Self {
        Self {
            map,
            settings,
            vehicle,
            follower,
            look_ahead: settings.look_ahead_costs(),
            treat_first_red_two_way_as_eol: settings.firstred_twoway_eol
                && treat_first_red_two_way_as_eol,
        }
    }

    #[inline]
    pub fn map(&self) -> &'a dyn TileMap {
        self.map
    }

    #[inline]
    pub fn follower(&self) -> &Follower {
        &self.follower
    }

    /// Number of signals ahead the look-ahead penalty covers.
    #[inline]
    pub fn look_ahead_len(&self) -> u32 {
        self.look_ahead.len() as u32
    }

    #[inline]
    fn masking(&self) -> bool {
        self.follower.mask_reserved
    }

    // -- per-tile costs -----------------------------------------------------

    /// Cost of moving from the end of one tile onto the next.
    pub fn transition_cost(&self, from: NodeKey, to: NodeKey) -> i32 {
        self.curve_cost(from, to)
            .saturating_add(self.switch_cost(from.tile, to.tile, from.td.exit()))
    }

    fn curve_cost(&self, from: NodeKey, to: NodeKey) -> i32 {
        match from.td.turn(to.td) {
            0 => 0,
            2 if !self.follower.forbid_90_deg => self.settings.curve90_penalty,
            _ => self.settings.curve45_penalty,
        }
    }

    /// Penalty for running from one double-slip style junction straight
    /// into another.
    fn switch_cost(&self, tile1: Point, tile2: Point, exit: Dir) -> i32 {
        if self.map.kind(tile1) != TileKind::Rail || self.map.kind(tile2) != TileKind::Rail {
            return 0;
        }
        let busy = |bits: TrackBits, edge: Dir| {
            bits.iter()
                .filter(|t| {
                    let (a, b) = t.ends();
                    a == edge || b == edge
                })
                .count()
                >= 2
        };
        if busy(self.map.track_bits(tile1), exit)
            && busy(self.map.track_bits(tile2), exit.reverse())
        {
            self.settings.doubleslip_penalty
        } else {
            0
        }
    }

    fn one_tile_cost(&self, key: NodeKey) -> i32 {
        let mut cost = key.td.length();
        if key.td.is_straight() && matches!(self.map.kind(key.tile), TileKind::Crossing { .. }) {
            cost = cost.saturating_add(self.settings.crossing_penalty);
        }
        cost
    }

    fn slope_cost(&self, key: NodeKey) -> i32 {
        if self.map.slope(key.tile).climbs(key.td) {
            self.settings.slope_penalty
        } else {
            0
        }
    }

    /// Signal penalties for running over `key`, updating the node's signal
    /// state.
    fn signal_cost(
        &self,
        node: &mut Node,
        key: NodeKey,
        reasons: &mut Esr,
        last_signal: &mut Option<NodeKey>,
        stopped: &mut bool,
    ) -> i32 {
        if self.map.kind(key.tile) != TileKind::Rail {
            return 0;
        }
        let Some(sig) = self.map.signal(key.tile, key.td.track()) else {
            return 0;
        };
        let along = sig.faces(key.td);
        let against = sig.faces(key.td.reverse());
        if against && !along && sig.kind.is_oneway() {
            *reasons |= Esr::DEAD_END;
            return 0;
        }
        let mut cost: i32 = 0;
        if along {
            node.last_signal_type = sig.kind;
            let look_ahead = self
                .look_ahead
                .get(node.signals_passed as usize)
                .copied()
                .unwrap_or(0);
            if sig.state(key.td) == Some(SignalState::Green) {
                node.flags.remove(NodeFlags::LAST_SIGNAL_WAS_RED);
                if look_ahead < 0 {
                    cost = cost.saturating_sub(look_ahead);
                }
            } else {
                if !sig.kind.is_pbs()
                    && self.treat_first_red_two_way_as_eol
                    && node.flags.contains(NodeFlags::CHOICE_SEEN)
                    && against
                    && node.signals_passed == 0
                {
                    *reasons |= Esr::DEAD_END | Esr::FIRST_TWO_WAY_RED;
                    *stopped = true;
                    return 0;
                }
                node.last_red_type = sig.kind;
                node.flags.insert(NodeFlags::LAST_SIGNAL_WAS_RED);
                if !sig.kind.is_pbs() && look_ahead > 0 {
                    cost = cost.saturating_add(look_ahead);
                }
                if node.signals_passed == 0 {
                    cost = cost.saturating_add(match sig.kind {
                        SignalType::Combo | SignalType::Exit => self.settings.firstred_exit_penalty,
                        SignalType::Block | SignalType::Entry => self.settings.firstred_penalty,
                        SignalType::Pbs | SignalType::PbsOneWay => 0,
                    });
                }
            }
            node.signals_passed += 1;
            *last_signal = Some(key);
        }
        if against && sig.kind.is_pbs() && node.signals_passed < self.look_ahead_len() {
            cost = cost.saturating_add(self.settings.pbs_signal_back_penalty);
        }
        cost
    }

    /// Penalty for running over track other paths have reserved, while still
    /// close enough to the vehicle for the reservation to matter.
    fn reservation_cost(&self, node: &Node, key: NodeKey, skipped: u32) -> i32 {
        if node.signals_passed >= self.look_ahead_len() / 2 {
            return 0;
        }
        if !node.last_signal_type.is_pbs() {
            return 0;
        }
        let tiles = skipped as i32 + 1;
        if self.map.kind(key.tile).is_station() {
            let back = key.td.exit().reverse().offset();
            if (0..tiles).any(|i| self.map.is_station_reserved(key.tile + back * i)) {
                return self.settings.pbs_station_penalty.saturating_mul(tiles);
            }
        }
        if self
            .map
            .reserved_tracks(key.tile)
            .overlaps_track(key.td.track())
        {
            let mut cost = self.settings.pbs_cross_penalty;
            if !key.td.is_straight() {
                cost = cost.saturating_mul(TILE_CORNER_LENGTH) / TILE_LENGTH;
            }
            return cost.saturating_mul(tiles);
        }
        0
    }

    fn speed_penalty(&self, arrival: &Follow) -> i32 {
        let Some(limit) = arrival.speed_limit else {
            return 0;
        };
        let cap = self.vehicle.speed_cap() as i64;
        let limit = limit as i64;
        if limit >= cap {
            return 0;
        }
        let tiles = 4 + arrival.tiles_skipped as i64;
        let penalty = TILE_LENGTH as i64 * (cap - limit) * tiles / cap;
        penalty.min(i32::MAX as i64) as i32
    }

    fn station_cost(&self, platform_tiles: u32) -> i32 {
        let tiles = i32::try_from(platform_tiles).unwrap_or(i32::MAX);
        self.settings.station_penalty.saturating_mul(tiles)
    }

    /// Penalty for a platform of `platform_len` tiles not fitting the train.
    pub fn platform_length_penalty(&self, platform_len: u32) -> i32 {
        let s = self.settings;
        let missing = self.vehicle.length_in_tiles() as i64 - platform_len as i64;
        let per_tile = |base: i32, per: i32, tiles: i64| {
            let tiles = i32::try_from(tiles).unwrap_or(i32::MAX);
            base.saturating_add(per.saturating_mul(tiles))
        };
        if missing < 0 {
            per_tile(
                s.longer_platform_penalty,
                s.longer_platform_per_tile_penalty,
                -missing,
            )
        } else if missing > 0 {
            per_tile(
                s.shorter_platform_penalty,
                s.shorter_platform_per_tile_penalty,
                missing,
            )
        } else {
            0
        }
    }

    /// Penalty for stopping at the vehicle's destination waypoint when no
    /// free waiting spot lies shortly beyond it.
    fn waypoint_penalty(&self, last: NodeKey) -> i32 {
        let Order::Waypoint(id) = self.vehicle.order() else {
            return 0;
        };
        let kind = self.map.kind(last.tile);
        if !kind.is_waypoint() || kind.station_id() != Some(id) {
            return 0;
        }
        if self.map.station_area(id).is_none_or(|a| a.len() <= 1) {
            return 0;
        }
        let ft = self.follower.masking(false);
        let mut tile = last.tile;
        let mut td = Some(last.td);
        let mut budget = WAYPOINT_LOOKOUT_TILES;
        while let Some(cur) = td {
            let Ok(f) = ft.follow(self.map, tile, cur) else {
                break;
            };
            tile = f.new_tile;
            budget -= 1;
            if tile == last.tile || budget == 0 {
                td = None;
                break;
            }
            td = f.new_trackdirs.single();
            if let Some(next) = td {
                if is_safe_waiting_position(self.map, &ft, tile, next, true) {
                    break;
                }
            }
        }
        let waits = td.is_some_and(|td| {
            is_safe_waiting_position(self.map, &ft, tile, td, true)
                && is_waiting_position_free(self.map, &ft, tile, td)
        });
        if waits { 0 } else { self.settings.lastred_penalty }
    }

    // -- segments -----------------------------------------------------------

    /// Walk the segment starting at `node.key`.
    ///
    /// `arrival` is the follow that brought the vehicle onto the first tile
    /// and `from` the tile it came from (`None` for roots). `budget` is the
    /// most the segment may cost before the path counts as too long.
    pub(crate) fn walk(
        &self,
        node: &mut Node,
        arrival: &Follow,
        from: Option<Point>,
        budget: Option<i32>,
    ) -> Walk {
        let key = SegmentKey {
            start: node.key,
            rail_types: self.follower.rail_types,
        };
        let mut seg = CachedSegment::new(
            key,
            Arrival {
                from: arrival.old_tile,
                tiles_skipped: arrival.tiles_skipped,
                is_station: arrival.is_station,
            },
        );
        let mut bounds = seg.bounds.union(Range::tile(arrival.old_tile));
        let mut reasons = Esr::NONE;
        let mut cost: i32 = 0;
        let mut extra: i32 = 0;
        let mut stopped = false;
        let mut transition = 0;
        let mut prev = from;
        let mut cur = node.key;
        let mut tf = *arrival;

        loop {
            let skipped = i32::try_from(tf.tiles_skipped).unwrap_or(i32::MAX);
            let signal =
                self.signal_cost(node, cur, &mut reasons, &mut seg.last_signal, &mut stopped);
            cost = cost
                .saturating_add(transition)
                .saturating_add(self.one_tile_cost(cur))
                .saturating_add(TILE_LENGTH.saturating_mul(skipped))
                .saturating_add(self.slope_cost(cur))
                .saturating_add(signal)
                .saturating_add(self.reservation_cost(node, cur, tf.tiles_skipped));

            let kind = self.map.kind(cur.tile);
            if prev == Some(cur.tile) {
                // Turned around in a depot.
                cost = cost.saturating_add(self.settings.depot_reverse_penalty);
            } else if kind.is_depot() {
                reasons |= Esr::DEPOT;
            } else if kind.is_waypoint() {
                reasons |= Esr::WAYPOINT;
            } else if tf.is_station {
                seg.platform_tiles = tf.tiles_skipped + 1;
                cost = cost.saturating_add(self.station_cost(seg.platform_tiles));
                reasons |= Esr::STATION;
            } else if self.masking()
                && kind == TileKind::Rail
                && self.map.has_signal_on(cur.tile, cur.td)
                && !self.map.is_pbs_signal(cur.tile, cur.td)
            {
                reasons |= Esr::SAFE_TILE;
            }

            if node.signals_passed < self.look_ahead_len() {
                extra = extra.saturating_add(self.speed_penalty(&tf));
            }
            if budget.is_some_and(|b| cost > b) {
                reasons |= Esr::PATH_TOO_LONG;
            }

            let next_follow = match self.follower.follow(self.map, cur.tile, cur.td) {
                Ok(f) => f,
                Err(e) => {
                    reasons |= if e == FollowError::RailType {
                        Esr::RAIL_TYPE
                    } else {
                        Esr::DEAD_END
                    };
                    if self.masking() && !self.map.has_oneway_signal_blocking(cur.tile, cur.td) {
                        reasons |= Esr::SAFE_TILE;
                    }
                    break;
                }
            };
            bounds = bounds.union(Range::tile(next_follow.new_tile));
            let Some(next_td) = next_follow.new_trackdirs.single() else {
                reasons |= Esr::CHOICE_FOLLOWS;
                break;
            };
            let next = NodeKey::new(next_follow.new_tile, next_td);

            if self.masking() && self.map.kind(next.tile) == TileKind::Rail {
                if self.map.is_pbs_signal(next.tile, next.td) {
                    reasons |= Esr::SAFE_TILE;
                } else if self.map.has_signal_on(next.tile, next.td.reverse())
                    && self.map.signal_type(next.tile, next.td.track())
                        == Some(SignalType::PbsOneWay)
                {
                    reasons |= Esr::SAFE_TILE | Esr::DEAD_END;
                    seg.tail_penalty = self.settings.lastred_exit_penalty;
                }
            }
            if self.map.rail_type(next.tile) != self.map.rail_type(cur.tile) {
                reasons |= Esr::RAIL_TYPE;
                break;
            }
            if next == node.key {
                reasons |= Esr::INFINITE_LOOP;
                break;
            }
            if cost > MAX_SEGMENT_COST && self.map.kind(next.tile) == TileKind::Rail {
                reasons |= Esr::SEGMENT_TOO_LONG;
                break;
            }
            if !reasons.is_empty() {
                break;
            }

            transition = self.transition_cost(cur, next);
            prev = Some(cur.tile);
            cur = next;
            tf = next_follow;
        }

        seg.cost = Some(cost);
        seg.end_reason = reasons & Esr::CACHED;
        seg.last = cur;
        seg.bounds = bounds.expand(1);
        Walk {
            segment: seg,
            reasons,
            extra,
            stopped_on_signal: stopped,
        }
    }

    /// Update a node's red-signal state from the current aspect of a cached
    /// segment's last signal.
    pub(crate) fn reuse(&self, node: &mut Node, seg: &CachedSegment) {
        let Some(sig) = seg.last_signal else {
            return;
        };
        if self.map.signal_state(sig.tile, sig.td) == Some(SignalState::Red) {
            node.flags.insert(NodeFlags::LAST_SIGNAL_WAS_RED);
            node.last_red_type = self
                .map
                .signal_type(sig.tile, sig.td.track())
                .unwrap_or_default();
        } else {
            node.flags.remove(NodeFlags::LAST_SIGNAL_WAS_RED);
        }
    }

    /// Turn a walked or cached segment into the node's cost. Returns `false`
    /// when the node should be dropped.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn finish(
        &self,
        node: &mut Node,
        parent_cost: i32,
        entry_cost: i32,
        seg: &CachedSegment,
        reasons: Esr,
        mut extra: i32,
        dest: &dyn Destination,
    ) -> bool {
        node.last = seg.last;
        if reasons.contains(Esr::PATH_TOO_LONG) {
            return false;
        }
        let target_seen = reasons.intersects(Esr::POSSIBLE_TARGET)
            && dest.accepts(self.map, seg.last.tile, seg.last.td);
        if !target_seen && reasons.intersects(Esr::ABORT) {
            return false;
        }
        if reasons.contains(Esr::WAYPOINT) {
            extra = extra.saturating_add(self.waypoint_penalty(seg.last));
        }
        extra = extra.saturating_add(seg.tail_penalty);
        if target_seen {
            node.flags.insert(NodeFlags::TARGET_SEEN);
            if node.flags.contains(NodeFlags::LAST_SIGNAL_WAS_RED) {
                if node.last_red_type == SignalType::Exit {
                    extra = extra.saturating_add(self.settings.lastred_exit_penalty);
                } else if !node.last_red_type.is_pbs() {
                    extra = extra.saturating_add(self.settings.lastred_penalty);
                }
            }
            if reasons.contains(Esr::STATION) {
                extra = extra.saturating_sub(self.station_cost(seg.platform_tiles));
                let len = self
                    .map
                    .platform_length(seg.last.tile, seg.last.td.exit().reverse());
                extra = extra.saturating_add(self.platform_length_penalty(len));
            }
        }
        debug_assert!(seg.is_computed());
        let total = parent_cost as i64
            + entry_cost as i64
            + seg.cost.unwrap_or_default() as i64
            + extra as i64;
        node.cost = total.clamp(0, i32::MAX as i64) as i32;
        true
    }

    /// The follow a cached segment's vehicle arrived by, rebuilt from the
    /// stored arrival.
    #[cfg(test)]
    pub(crate) fn arrival_follow(&self, start: NodeKey, arrival: &Arrival) -> Follow {
        Follow {
            old_tile: arrival.from,
            old_td: start.td,
            exit_dir: start.td.entry().reverse(),
            new_tile: start.tile,
            new_trackdirs: start.td.bits(),
            tiles_skipped: arrival.tiles_skipped,
            is_station: arrival.is_station,
            speed_limit: self.map.speed_limit(arrival.from),
        }
    }

    /// Walk a cached segment again from scratch, as a vehicle past the
    /// look-ahead would.
    #[cfg(test)]
    pub(crate) fn remeasure(&self, seg: &CachedSegment) -> Walk {
        let mut node = Node::root(seg.key.start, 0, false, false);
        node.signals_passed = self.look_ahead_len();
        let follow = self.arrival_follow(seg.key.start, &seg.arrival);
        self.walk(&mut node, &follow, Some(seg.arrival.from), None)
    }
}
