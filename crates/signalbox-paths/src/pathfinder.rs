//! Query entry points.
//!
//! A [`Pathfinder`] owns validated [`RailSettings`] and the [`SegmentCache`]
//! shared by every query it runs. Each query builds a [`CostEngine`] and a
//! [`RailPolicy`] for one vehicle and destination, seeds the search from the
//! origin (and optionally the reversed origin) and turns the cheapest node
//! chain into a [`Route`].

use log::debug;
use signalbox_core::{Point, Range, RailTypes, TILE_LENGTH, TileMap, Trackdir, TrackdirBits};

use crate::cost::CostEngine;
use crate::destination::{AnyDepot, Destination, SafeTile, order_destination};
use crate::error::PathError;
use crate::follower::Follower;
use crate::node::NodeKey;
use crate::policy::RailPolicy;
use crate::route::{Route, RouteStep, SearchStats};
use crate::search::{self, SearchOutcome, Seed};
use crate::segment::SegmentCache;
use crate::settings::{RailSettings, SettingsError};
use crate::vehicle::Vehicle;

/// Where a query starts: a tile and the trackdirs the vehicle may take on it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Origin {
    pub tile: Point,
    pub trackdirs: TrackdirBits,
}

/// A second origin for a vehicle that could also turn around.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReverseOrigin {
    pub tile: Point,
    pub trackdirs: TrackdirBits,
    /// Cost of reversing, added to every route starting here.
    pub penalty: i32,
}

/// Parameters of one query.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathQuery {
    pub origin: Origin,
    pub reverse: Option<ReverseOrigin>,
    /// Routes costing more than this are not reported.
    pub max_cost: Option<i32>,
    /// Stop at a red two-way signal when it is the first signal after a
    /// junction.
    pub treat_first_red_two_way_as_eol: bool,
}

impl PathQuery {
    pub fn new(tile: Point, trackdirs: TrackdirBits) -> Self {
        Self {
            origin: Origin { tile, trackdirs },
            reverse: None,
            max_cost: None,
            treat_first_red_two_way_as_eol: true,
        }
    }

    /// Also search from `tile` after turning around, at `penalty`.
    pub fn with_reverse(mut self, tile: Point, trackdirs: TrackdirBits, penalty: i32) -> Self {
        self.reverse = Some(ReverseOrigin {
            tile,
            trackdirs,
            penalty,
        });
        self
    }

    pub fn with_max_cost(mut self, max_cost: i32) -> Self {
        self.max_cost = Some(max_cost);
        self
    }

    pub fn with_first_red_two_way_as_eol(mut self, on: bool) -> Self {
        self.treat_first_red_two_way_as_eol = on;
        self
    }
}

/// Result of [`Pathfinder::choose_track`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackChoice {
    /// Trackdir to take now.
    pub trackdir: Trackdir,
    pub cost: i32,
    pub route: Route,
}

/// Result of [`Pathfinder::find_nearest_depot`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DepotMatch {
    pub tile: Point,
    pub cost: i32,
    /// The vehicle must turn around first.
    pub reversed: bool,
}

/// Railway pathfinder with a segment cache shared across queries.
///
/// The cache is brought up to date with the map's layout journal at the
/// start of every query, so the map may be edited freely between queries.
#[derive(Debug)]
pub struct Pathfinder {
    settings: RailSettings,
    cache: SegmentCache,
}

impl Pathfinder {
    /// Fails if `settings` do not validate.
    pub fn new(settings: RailSettings) -> Result<Self, SettingsError> {
        settings.validate()?;
        Ok(Self {
            settings,
            cache: SegmentCache::new(),
        })
    }

    pub fn settings(&self) -> &RailSettings {
        &self.settings
    }

    /// Replace the settings. Cached segments priced with the old ones are
    /// dropped before the next query.
    pub fn set_settings(&mut self, settings: RailSettings) -> Result<(), SettingsError> {
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    pub fn cache(&self) -> &SegmentCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut SegmentCache {
        &mut self.cache
    }

    pub fn flush_cache(&mut self) {
        self.cache.flush();
    }

    /// Drop cached segments touching `area`. Returns how many were dropped.
    pub fn invalidate_area(&mut self, area: Range) -> usize {
        self.cache.invalidate_area(area)
    }

    /// The follower queries for `vehicle` use, e.g. to expand a route with
    /// [`Route::tiles`].
    pub fn follower(&self, vehicle: &dyn Vehicle) -> Follower {
        Follower::new(vehicle.compatible_rail_types(), self.settings.forbid_90_deg)
    }

    /// Cheapest route from the query's origin to `destination`.
    pub fn find_path(
        &mut self,
        map: &dyn TileMap,
        vehicle: &dyn Vehicle,
        query: &PathQuery,
        destination: &dyn Destination,
    ) -> Result<Route, PathError> {
        let follower = self
            .follower(vehicle)
            .masking(destination.masks_reserved_tracks());
        self.route(map, vehicle, query, destination, follower)
    }

    /// Pick the trackdir to take on `tile` out of `trackdirs`.
    pub fn choose_track(
        &mut self,
        map: &dyn TileMap,
        vehicle: &dyn Vehicle,
        tile: Point,
        trackdirs: TrackdirBits,
        destination: &dyn Destination,
    ) -> Result<TrackChoice, PathError> {
        let query = PathQuery::new(tile, trackdirs);
        let route = self.find_path(map, vehicle, &query, destination)?;
        let trackdir = route.first_trackdir().ok_or(PathError::NoPath)?;
        Ok(TrackChoice {
            trackdir,
            cost: route.cost,
            route,
        })
    }

    /// Route to wherever the vehicle's current order sends it.
    pub fn find_order_path(
        &mut self,
        map: &dyn TileMap,
        vehicle: &dyn Vehicle,
        query: &PathQuery,
    ) -> Result<Route, PathError> {
        let destination =
            order_destination(map, vehicle.order()).ok_or(PathError::NoDestination)?;
        self.find_path(map, vehicle, query, destination.as_ref())
    }

    /// Nearest depot ahead of `front`, or behind the vehicle when `back` is
    /// given and turning around is cheaper.
    ///
    /// Depots costing more than `max_penalty` are not reported. Without one
    /// the bound is [`RailSettings::max_depot_penalty`].
    pub fn find_nearest_depot(
        &mut self,
        map: &dyn TileMap,
        vehicle: &dyn Vehicle,
        front: NodeKey,
        back: Option<NodeKey>,
        max_penalty: Option<i32>,
    ) -> Result<DepotMatch, PathError> {
        let mut query = PathQuery::new(front.tile, front.td.bits());
        if let Some(back) = back {
            query = query.with_reverse(back.tile, back.td.bits(), reverse_penalty(vehicle));
        }
        query.max_cost = Some(max_penalty.unwrap_or(self.settings.max_depot_penalty));
        let route = self.find_path(map, vehicle, &query, &AnyDepot)?;
        let tile = route.destination().ok_or(PathError::NoPath)?.tile;
        Ok(DepotMatch {
            tile,
            cost: route.cost,
            reversed: route.reversed,
        })
    }

    /// Route to the nearest free safe waiting position, avoiding reserved
    /// track. `extra_rail_types` widens what the vehicle may run on.
    pub fn find_nearest_safe_tile(
        &mut self,
        map: &dyn TileMap,
        vehicle: &dyn Vehicle,
        tile: Point,
        td: Trackdir,
        extra_rail_types: RailTypes,
    ) -> Result<Route, PathError> {
        let follower = Follower::new(
            vehicle.compatible_rail_types() | extra_rail_types,
            self.settings.forbid_90_deg,
        );
        let destination = SafeTile { follower };
        let query = PathQuery::new(tile, td.bits()).with_first_red_two_way_as_eol(false);
        self.route(map, vehicle, &query, &destination, follower.masking(true))
    }

    /// Whether the vehicle reaches `destination` cheaper by turning around
    /// onto `back` than by carrying on from `front`.
    pub fn check_reverse(
        &mut self,
        map: &dyn TileMap,
        vehicle: &dyn Vehicle,
        front: NodeKey,
        back: NodeKey,
        destination: &dyn Destination,
    ) -> Result<bool, PathError> {
        let query = PathQuery::new(front.tile, front.td.bits()).with_reverse(
            back.tile,
            back.td.bits(),
            reverse_penalty(vehicle),
        );
        let route = self.find_path(map, vehicle, &query, destination)?;
        Ok(route.reversed)
    }

    fn route(
        &mut self,
        map: &dyn TileMap,
        vehicle: &dyn Vehicle,
        query: &PathQuery,
        destination: &dyn Destination,
        follower: Follower,
    ) -> Result<Route, PathError> {
        let origin = query.origin.tile;
        let (outcome, stats) = self.run_search(map, vehicle, query, destination, follower)?;
        let best = match outcome.result {
            Ok(id) => id,
            Err(e) => {
                debug!(
                    "no route from {origin}: {e} ({} nodes, {} closed)",
                    stats.nodes_created, stats.nodes_closed
                );
                return Err(e);
            }
        };
        let steps: Vec<RouteStep> = outcome
            .chain(best)
            .into_iter()
            .map(|id| {
                let n = &outcome.nodes[id.index()];
                RouteStep {
                    start: n.key,
                    end: n.last,
                    cost: n.cost,
                }
            })
            .collect();
        let node = &outcome.nodes[best.index()];
        debug!(
            "route from {origin} to {}: cost {}, {} steps, {} nodes, cache {}/{}",
            node.last,
            node.cost,
            steps.len(),
            stats.nodes_created,
            stats.cache_hits,
            stats.cache_hits + stats.cache_misses
        );
        Ok(Route {
            steps,
            cost: node.cost,
            reversed: node.reverse_origin,
            stats,
        })
    }

    /// Run a query and hand back every node it created.
    pub(crate) fn run_search(
        &mut self,
        map: &dyn TileMap,
        vehicle: &dyn Vehicle,
        query: &PathQuery,
        destination: &dyn Destination,
        follower: Follower,
    ) -> Result<(SearchOutcome, SearchStats), PathError> {
        let seeds = origin_seeds(map, query)?;
        self.cache.sync(map, &self.settings);
        let engine = CostEngine::new(
            map,
            &self.settings,
            vehicle,
            follower,
            query.treat_first_red_two_way_as_eol,
        );
        let mut policy = RailPolicy::new(
            engine,
            destination,
            &mut self.cache,
            self.settings.segment_cache,
            query.max_cost,
        );
        let outcome = search::run(
            &mut policy,
            &seeds,
            self.settings.max_search_nodes as usize,
            query.max_cost,
        );
        let (cache_hits, cache_misses) = policy.cache_counts();
        let stats = SearchStats {
            nodes_created: outcome.nodes.len(),
            nodes_closed: outcome.closed,
            cache_hits,
            cache_misses,
        };
        Ok((outcome, stats))
    }
}

/// Cost of turning a vehicle around: one tile length per tile of train.
fn reverse_penalty(vehicle: &dyn Vehicle) -> i32 {
    TILE_LENGTH * vehicle.length_in_tiles().max(1) as i32
}

fn origin_seeds(map: &dyn TileMap, query: &PathQuery) -> Result<Vec<Seed>, PathError> {
    let usable = |tile: Point, tds: TrackdirBits| map.track_bits(tile).trackdirs() & tds;
    let front = usable(query.origin.tile, query.origin.trackdirs);
    if front.is_empty() {
        return Err(PathError::InvalidOrigin {
            tile: query.origin.tile,
        });
    }
    let mut seeds = Vec::new();
    let mut push = |tile: Point, tds: TrackdirBits, cost: i32, reverse: bool| {
        let is_choice = tds.count() > 1;
        seeds.extend(tds.iter().map(|td| Seed {
            key: NodeKey::new(tile, td),
            cost,
            is_choice,
            reverse,
        }));
    };
    push(query.origin.tile, front, 0, false);
    if let Some(rev) = query.reverse {
        push(rev.tile, usable(rev.tile, rev.trackdirs), rev.penalty, true);
    }
    Ok(seeds)
}
