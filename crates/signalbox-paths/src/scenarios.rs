//! End-to-end queries on small hand-drawn layouts.

use signalbox_core::{
    Axis, Dir, Layout, Legend, Point, RailMap, SignalState, SignalType, Slope, TileSpec, Track,
    Trackdir, TrackdirBits,
};

use crate::destination::{AnyDepot, TileTarget, WaypointTarget};
use crate::error::PathError;
use crate::node::NodeKey;
use crate::pathfinder::PathQuery;
use crate::settings::RailSettings;
use crate::testutil::{map, pathfinder, to_station};
use crate::vehicle::{Order, Train};

const EAST: Trackdir = Trackdir::WestToEast;

fn key(x: i32, y: i32, td: Trackdir) -> NodeKey {
    NodeKey::new(Point::new(x, y), td)
}

#[test]
fn straight_line_costs_one_tile_length_per_tile() {
    let m = map("---------1");
    let mut pf = pathfinder(RailSettings::default());
    let train = Train::new(1);
    let route = to_station(&mut pf, &m, &train, Point::new(0, 0), EAST, 1).unwrap();
    assert_eq!(route.cost, 1000);
    assert!(!route.reversed);
    let tiles = route.tiles(&m, &pf.follower(&train));
    assert_eq!(tiles.len(), 10);
    assert!(tiles.iter().all(|k| k.td == EAST));
    assert_eq!(route.destination(), Some(key(9, 0, EAST)));
}

// The short way turns 90° at (1,1); the long way loops round with 45° turns
// only.
const HAIRPIN: &str = "
-*--7
1*7.|
..L-J";

#[test]
fn curve_penalty_decides_between_short_and_long_way() {
    let m = map(HAIRPIN);
    let train = Train::new(1);
    let hairpin = key(1, 1, Trackdir::NorthToWest);

    let mut pf = pathfinder(RailSettings {
        curve90_penalty: 0,
        ..RailSettings::default()
    });
    let short = to_station(&mut pf, &m, &train, Point::new(0, 0), EAST, 1).unwrap();
    let tiles = short.tiles(&m, &pf.follower(&train));
    assert!(tiles.contains(&hairpin));
    assert!(!tiles.iter().any(|k| k.tile == Point::new(4, 0)));
    // Origin tile, 45° into the first corner, double slip into the second,
    // 45° onto the platform.
    assert_eq!(short.cost, 100 + (100 + 71) + (100 + 71) + (100 + 100));

    let mut pf = pathfinder(RailSettings {
        curve90_penalty: 10_000,
        ..RailSettings::default()
    });
    let long = to_station(&mut pf, &m, &train, Point::new(0, 0), EAST, 1).unwrap();
    let tiles = long.tiles(&m, &pf.follower(&train));
    assert!(!tiles.contains(&hairpin));
    assert!(tiles.contains(&key(4, 0, Trackdir::WestToSouth)));
    assert_eq!(long.cost, 1684);
}

fn signal_line(two_way: bool) -> signalbox_core::RailMap {
    let mut m = map("--*---1");
    let p = Point::new(4, 0);
    m.build_signal(p, EAST, SignalType::Block, two_way).unwrap();
    m.set_signal_state(p, EAST, SignalState::Red).unwrap();
    m
}

#[test]
fn red_two_way_signal_after_junction_blocks() {
    let m = signal_line(true);
    let train = Train::new(1);
    let mut pf = pathfinder(RailSettings::default());
    assert_eq!(
        to_station(&mut pf, &m, &train, Point::new(0, 0), EAST, 1),
        Err(PathError::BlockedBySignal)
    );

    // Without the end-of-line rule the signal is passed at the red-signal
    // price.
    let query = PathQuery::new(Point::new(0, 0), EAST.bits()).with_first_red_two_way_as_eol(false);
    let dest = crate::destination::StationTarget::new(&m, 1).unwrap();
    let route = pf.find_path(&m, &train, &query, &dest).unwrap();
    assert_eq!(route.cost, 3200);
}

#[test]
fn red_one_way_signal_is_passable_at_a_price() {
    let m = signal_line(false);
    let train = Train::new(1);
    let settings = RailSettings::default();
    let mut pf = pathfinder(settings.clone());
    let route = to_station(&mut pf, &m, &train, Point::new(0, 0), EAST, 1).unwrap();
    let look_ahead = settings.look_ahead_costs()[0];
    assert_eq!(look_ahead, settings.look_ahead_signal_p0);
    assert_eq!(
        route.cost,
        700 + look_ahead + settings.firstred_penalty + settings.lastred_penalty
    );
}

#[test]
fn short_platform_penalty() {
    let m = map("---11");
    let settings = RailSettings {
        shorter_platform_per_tile_penalty: 50,
        ..RailSettings::default()
    };
    let mut pf = pathfinder(settings.clone());
    let fits = to_station(&mut pf, &m, &Train::new(2), Point::new(0, 0), EAST, 1).unwrap();
    assert_eq!(fits.cost, 500);
    let long = to_station(&mut pf, &m, &Train::new(5), Point::new(0, 0), EAST, 1).unwrap();
    assert_eq!(
        long.cost - fits.cost,
        settings.shorter_platform_penalty + settings.shorter_platform_per_tile_penalty * 3
    );
}

#[test]
fn node_budget_bounds_open_grid_search() {
    let row = "*".repeat(40);
    let layout = vec![row; 40].join("\n");
    let m = map(&layout);
    let mut pf = pathfinder(RailSettings {
        max_search_nodes: 50,
        ..RailSettings::default()
    });
    let query = PathQuery::new(Point::new(20, 20), TrackdirBits::ALL);
    let result = pf.find_path(&m, &Train::new(1), &query, &AnyDepot);
    assert_eq!(result, Err(PathError::BudgetExceeded { limit: 50 }));
}

#[test]
fn tunnel_costs_its_length() {
    let train = Train::new(1);
    let mut pf = pathfinder(RailSettings::default());
    let tunnel = map("-(..)-1");
    let plain = map("------1");
    let through = to_station(&mut pf, &tunnel, &train, Point::new(0, 0), EAST, 1).unwrap();
    pf.flush_cache();
    let along = to_station(&mut pf, &plain, &train, Point::new(0, 0), EAST, 1).unwrap();
    assert_eq!(through.cost, along.cost);
    assert_eq!(through.cost, 700);
}

#[test]
fn nearest_depot_behind_the_train() {
    let m = map(">-----");
    let train = Train::new(1);
    let mut pf = pathfinder(RailSettings::default());
    let front = key(3, 0, EAST);
    let back = key(3, 0, Trackdir::EastToWest);

    let found = pf
        .find_nearest_depot(&m, &train, front, Some(back), None)
        .unwrap();
    assert_eq!(found.tile, Point::new(0, 0));
    assert!(found.reversed);
    assert_eq!(found.cost, 100 + 400);

    assert_eq!(
        pf.find_nearest_depot(&m, &train, front, None, None),
        Err(PathError::NoPath)
    );
    assert_eq!(
        pf.find_nearest_depot(&m, &train, front, Some(back), Some(400)),
        Err(PathError::NoPath)
    );
}

#[test]
fn nearest_depot_defaults_to_the_depot_penalty_bound() {
    let m = map(&format!(">{}", "-".repeat(40)));
    let train = Train::new(1);
    let mut pf = pathfinder(RailSettings::default());
    let front = key(40, 0, Trackdir::EastToWest);

    // 41 tiles away, well past max_depot_penalty.
    assert_eq!(
        pf.find_nearest_depot(&m, &train, front, None, None),
        Err(PathError::NoPath)
    );
    let found = pf
        .find_nearest_depot(&m, &train, front, None, Some(5000))
        .unwrap();
    assert_eq!(found.tile, Point::new(0, 0));
    assert_eq!(found.cost, 4100);
    assert!(!found.reversed);

    let mut lenient = pathfinder(RailSettings {
        max_depot_penalty: 5000,
        ..RailSettings::default()
    });
    assert_eq!(
        lenient
            .find_nearest_depot(&m, &train, front, None, None)
            .map(|d| d.cost),
        Ok(4100)
    );
}

#[test]
fn check_reverse_picks_the_open_side() {
    let train = Train::new(1);
    let mut pf = pathfinder(RailSettings::default());
    let front = key(3, 0, EAST);
    let back = key(3, 0, Trackdir::EastToWest);
    let dest = |m: &signalbox_core::RailMap| crate::destination::StationTarget::new(m, 1).unwrap();

    let behind = map("1-----");
    assert!(pf.check_reverse(&behind, &train, front, back, &dest(&behind)).unwrap());
    pf.flush_cache();
    let ahead = map("-----1");
    assert!(!pf.check_reverse(&ahead, &train, front, back, &dest(&ahead)).unwrap());
}

#[test]
fn choose_track_at_junction() {
    let m = map("--*---1");
    let train = Train::new(1);
    let mut pf = pathfinder(RailSettings::default());
    let dest = crate::destination::StationTarget::new(&m, 1).unwrap();
    let choice = pf
        .choose_track(
            &m,
            &train,
            Point::new(2, 0),
            TrackdirBits::reachable_from(Dir::East),
            &dest,
        )
        .unwrap();
    assert_eq!(choice.trackdir, EAST);
    assert_eq!(choice.cost, choice.route.cost);
}

#[test]
fn tile_target_at_platform_end() {
    let m = map("--111--");
    let settings = RailSettings::default();
    let mut pf = pathfinder(settings.clone());
    let dest = TileTarget::new(Point::new(4, 0));
    let route = pf
        .find_path(
            &m,
            &Train::new(1),
            &PathQuery::new(Point::new(0, 0), EAST.bits()),
            &dest,
        )
        .unwrap();
    assert_eq!(route.destination(), Some(key(4, 0, EAST)));
    assert_eq!(route.cost, 500 + settings.longer_platform_penalty);
}

#[test]
fn safe_tile_in_front_of_signal() {
    let mut m = map("------");
    m.build_signal(Point::new(3, 0), EAST, SignalType::Block, false)
        .unwrap();
    let train = Train::new(1);
    let mut pf = pathfinder(RailSettings::default());
    let route = pf
        .find_nearest_safe_tile(&m, &train, Point::new(0, 0), EAST, Default::default())
        .unwrap();
    assert_eq!(route.destination(), Some(key(3, 0, EAST)));
    assert_eq!(route.cost, 400);

    // Another train holds the track ahead.
    assert!(m.reserve_track(Point::new(1, 0), Track::Horizontal).unwrap());
    assert_eq!(
        pf.find_nearest_safe_tile(&m, &train, Point::new(0, 0), EAST, Default::default()),
        Err(PathError::NoPath)
    );
}

// Past the first signal every segment is shared through the cache.
const CACHED_LINE: &str = "-----*-----*----1";

fn cached_line_settings() -> RailSettings {
    RailSettings {
        look_ahead_max_signals: 1,
        ..RailSettings::default()
    }
}

fn cached_line() -> signalbox_core::RailMap {
    let mut m = map(CACHED_LINE);
    m.build_signal(Point::new(2, 0), EAST, SignalType::Block, false)
        .unwrap();
    m
}

#[test]
fn segment_cache_is_reused_and_invalidated() {
    let mut m = cached_line();
    let settings = cached_line_settings();
    let train = Train::new(1);
    let mut pf = pathfinder(settings.clone());

    let first = to_station(&mut pf, &m, &train, Point::new(0, 0), EAST, 1).unwrap();
    assert_eq!(first.cost, 1700);
    assert_eq!(first.stats.cache_hits, 0);
    assert_eq!(first.stats.cache_misses, 6);
    assert_eq!(pf.cache().len(), 6);

    let second = to_station(&mut pf, &m, &train, Point::new(0, 0), EAST, 1).unwrap();
    assert_eq!(second.steps, first.steps);
    assert_eq!(second.cost, first.cost);
    assert_eq!(second.stats.cache_hits, 6);
    assert_eq!(second.stats.cache_misses, 0);

    // Only the segment running over the new slope is walked again.
    m.set_slope(Point::new(8, 0), Slope::Up(Dir::East)).unwrap();
    let third = to_station(&mut pf, &m, &train, Point::new(0, 0), EAST, 1).unwrap();
    assert_eq!(third.cost, first.cost + settings.slope_penalty);
    assert_eq!(third.stats.cache_misses, 1);

    let mut fresh = pathfinder(settings);
    let cold = to_station(&mut fresh, &m, &train, Point::new(0, 0), EAST, 1).unwrap();
    assert_eq!(cold.cost, third.cost);
    assert_eq!(cold.steps, third.steps);
}

#[test]
fn signal_aspect_changes_need_no_invalidation() {
    let mut m = cached_line();
    let settings = cached_line_settings();
    let train = Train::new(1);
    let mut pf = pathfinder(settings.clone());
    let green = to_station(&mut pf, &m, &train, Point::new(0, 0), EAST, 1).unwrap();

    m.set_signal_state(Point::new(2, 0), EAST, SignalState::Red)
        .unwrap();
    let red = to_station(&mut pf, &m, &train, Point::new(0, 0), EAST, 1).unwrap();
    assert_eq!(pf.cache().len(), 6);
    assert_eq!(
        red.cost,
        green.cost
            + settings.look_ahead_signal_p0
            + settings.firstred_penalty
            + settings.lastred_penalty
    );

    let mut fresh = pathfinder(settings);
    let cold = to_station(&mut fresh, &m, &train, Point::new(0, 0), EAST, 1).unwrap();
    assert_eq!(cold.cost, red.cost);
}

#[test]
fn max_cost_bounds_the_route() {
    let m = map("---------<");
    let train = Train::new(1);
    let mut pf = pathfinder(RailSettings::default());
    let query = PathQuery::new(Point::new(0, 0), EAST.bits());
    let route = pf
        .find_path(&m, &train, &query.with_max_cost(1000), &AnyDepot)
        .unwrap();
    assert_eq!(route.cost, 1000);
    assert_eq!(
        pf.find_path(&m, &train, &query.with_max_cost(999), &AnyDepot),
        Err(PathError::NoPath)
    );
}

/// `-----1` with one signal on (2,0) facing east.
fn signalled_line(kind: SignalType, state: SignalState) -> RailMap {
    let mut m = map("-----1");
    let p = Point::new(2, 0);
    m.build_signal(p, EAST, kind, false).unwrap();
    m.set_signal_state(p, EAST, state).unwrap();
    m
}

#[test]
fn green_signal_repays_a_negative_look_ahead() {
    let m = signalled_line(SignalType::Block, SignalState::Green);
    let settings = RailSettings {
        look_ahead_signal_p0: -300,
        ..RailSettings::default()
    };
    let mut pf = pathfinder(settings);
    let route = to_station(&mut pf, &m, &Train::new(1), Point::new(0, 0), EAST, 1).unwrap();
    assert_eq!(route.cost, 600 + 300);
}

#[test]
fn red_exit_signal_uses_exit_penalties() {
    let m = signalled_line(SignalType::Exit, SignalState::Red);
    let s = RailSettings::default();
    let mut pf = pathfinder(s.clone());
    let route = to_station(&mut pf, &m, &Train::new(1), Point::new(0, 0), EAST, 1).unwrap();
    assert_eq!(
        route.cost,
        600 + s.look_ahead_signal_p0 + s.firstred_exit_penalty + s.lastred_exit_penalty
    );
    assert_eq!(route.cost, 21_100);
}

#[test]
fn red_combo_signal_pays_first_exit_and_plain_last_red() {
    let m = signalled_line(SignalType::Combo, SignalState::Red);
    let s = RailSettings::default();
    let mut pf = pathfinder(s.clone());
    let route = to_station(&mut pf, &m, &Train::new(1), Point::new(0, 0), EAST, 1).unwrap();
    assert_eq!(
        route.cost,
        600 + s.look_ahead_signal_p0 + s.firstred_exit_penalty + s.lastred_penalty
    );
    assert_eq!(route.cost, 12_100);
}

#[test]
fn passing_the_back_of_a_path_signal() {
    let mut m = map("-----1");
    m.build_signal(Point::new(2, 0), Trackdir::EastToWest, SignalType::Pbs, false)
        .unwrap();
    let mut pf = pathfinder(RailSettings::default());
    let route = to_station(&mut pf, &m, &Train::new(1), Point::new(0, 0), EAST, 1).unwrap();
    assert_eq!(route.cost, 600 + 1500);
}

#[test]
fn crossing_a_reservation_near_the_train() {
    let mut m = map("-----1");
    assert!(m.reserve_track(Point::new(3, 0), Track::Horizontal).unwrap());
    let mut pf = pathfinder(RailSettings::default());
    let route = to_station(&mut pf, &m, &Train::new(1), Point::new(0, 0), EAST, 1).unwrap();
    assert_eq!(route.cost, 600 + 300);
}

#[test]
fn reserved_platform_costs_per_platform_tile() {
    let mut m = map("---111");
    assert!(m.reserve_track(Point::new(4, 0), Track::Horizontal).unwrap());
    let mut pf = pathfinder(RailSettings::default());
    let route = to_station(&mut pf, &m, &Train::new(3), Point::new(0, 0), EAST, 1).unwrap();
    assert_eq!(route.cost, 600 + 3 * 800);
}

#[test]
fn safe_tile_behind_one_way_path_signal_pays_exit_penalty() {
    let mut m = map("------");
    m.build_signal(
        Point::new(3, 0),
        Trackdir::EastToWest,
        SignalType::PbsOneWay,
        false,
    )
    .unwrap();
    let mut pf = pathfinder(RailSettings::default());
    let route = pf
        .find_nearest_safe_tile(&m, &Train::new(1), Point::new(0, 0), EAST, Default::default())
        .unwrap();
    assert_eq!(route.destination(), Some(key(2, 0, EAST)));
    assert_eq!(route.cost, 300 + 10_000);
}

fn waypoint_line() -> RailMap {
    let legend = Legend::standard().with('w', TileSpec::Waypoint { id: 5, axis: Axis::X });
    Layout::new("--ww--").unwrap().build(&legend).unwrap()
}

#[test]
fn waypoint_order_checks_for_room_beyond() {
    let mut m = waypoint_line();
    let dest = WaypointTarget::new(&m, 5).unwrap();
    let query = PathQuery::new(Point::new(0, 0), EAST.bits());
    let mut pf = pathfinder(RailSettings::default());

    let passing = Train::new(1);
    assert_eq!(pf.find_path(&m, &passing, &query, &dest).map(|r| r.cost), Ok(300));

    let stopping = Train::new(1).with_order(Order::Waypoint(5));
    assert_eq!(pf.find_path(&m, &stopping, &query, &dest).map(|r| r.cost), Ok(300));

    // The line end past the waypoint is taken.
    assert!(m.reserve_track(Point::new(5, 0), Track::Horizontal).unwrap());
    assert_eq!(pf.find_path(&m, &stopping, &query, &dest).map(|r| r.cost), Ok(1300));
    assert_eq!(pf.find_path(&m, &passing, &query, &dest).map(|r| r.cost), Ok(300));
}

#[test]
fn order_path_follows_the_vehicle_order() {
    let m = map(">---11");
    let mut pf = pathfinder(RailSettings::default());
    let east = PathQuery::new(Point::new(1, 0), EAST.bits());
    let west = PathQuery::new(Point::new(3, 0), Trackdir::EastToWest.bits());

    let for_station = Train::new(2).with_order(Order::Station(1));
    let route = pf.find_order_path(&m, &for_station, &east).unwrap();
    assert_eq!(route.destination(), Some(key(5, 0, EAST)));
    assert_eq!(route.cost, 500);

    let for_depot = Train::new(2).with_order(Order::Depot(Point::new(0, 0)));
    let route = pf.find_order_path(&m, &for_depot, &west).unwrap();
    assert_eq!(route.destination(), Some(key(0, 0, Trackdir::EastToWest)));
    assert_eq!(route.cost, 400);

    assert_eq!(
        pf.find_order_path(&m, &Train::new(2), &east),
        Err(PathError::NoDestination)
    );
    assert_eq!(
        pf.find_order_path(&m, &Train::new(2).with_order(Order::Station(9)), &east),
        Err(PathError::NoDestination)
    );
}

#[test]
fn long_runs_are_split_into_segments() {
    let m = map(&format!("{}1", "-".repeat(120)));
    let mut pf = pathfinder(RailSettings::default());
    let route = to_station(&mut pf, &m, &Train::new(1), Point::new(0, 0), EAST, 1).unwrap();
    assert_eq!(route.cost, 12_100);
    assert_eq!(route.steps.len(), 2);
    assert_eq!(route.steps[0].end, key(100, 0, EAST));
    assert_eq!(route.steps[0].cost, 10_100);
}

#[test]
fn closed_loop_without_target_finds_nothing() {
    let m = map("r-7\n|.|\nL-J");
    let mut pf = pathfinder(RailSettings::default());
    let query = PathQuery::new(Point::new(1, 0), EAST.bits());
    assert_eq!(
        pf.find_path(&m, &Train::new(1), &query, &AnyDepot),
        Err(PathError::NoPath)
    );
}

#[cfg(feature = "serde")]
#[test]
fn settings_load_from_partial_json() {
    let settings: RailSettings =
        serde_json::from_str(r#"{ "curve90_penalty": 0, "forbid_90_deg": true }"#).unwrap();
    assert!(settings.forbid_90_deg);
    let mut pf = pathfinder(settings);
    let route = to_station(&mut pf, &map(HAIRPIN), &Train::new(1), Point::new(0, 0), EAST, 1);
    // The hairpin is forbidden, so only the long way is left.
    assert!(route.unwrap().cost > 1000);
}
