//! Randomised checks over generated networks.

use signalbox_core::{Network, Point, Trackdir};

use crate::cost::CostEngine;
use crate::destination::{NoHeuristic, StationTarget};
use crate::node::{Node, NodeFlags};
use crate::pathfinder::{PathQuery, Pathfinder};
use crate::segment::{CachedSegment, EndSegmentReasons};
use crate::settings::RailSettings;
use crate::testutil::{flip_signals, network, pathfinder};
use crate::vehicle::Train;

const SEEDS: u64 = 6;

/// Settings that put most of a route past the look-ahead, so the shared
/// cache sees real use.
fn short_look_ahead() -> RailSettings {
    RailSettings {
        look_ahead_max_signals: 2,
        ..RailSettings::default()
    }
}

/// A spread of origins and every station as destination.
fn queries(net: &Network) -> Vec<(Point, Trackdir, StationTarget)> {
    let mut out = Vec::new();
    for (tile, td) in net.origins().into_iter().step_by(5).take(16) {
        for &id in &net.stations {
            if let Some(dest) = StationTarget::new(&net.map, id) {
                out.push((tile, td, dest));
            }
        }
    }
    out
}

fn run_all(pf: &mut Pathfinder, net: &Network, train: &Train) {
    for (tile, td, dest) in queries(net) {
        let _ = pf.find_path(&net.map, train, &PathQuery::new(tile, td.bits()), &dest);
    }
}

/// Walk a cached segment again on the current map.
fn fresh(engine: &CostEngine<'_>, seg: &CachedSegment) -> (CachedSegment, Node) {
    let mut node = Node::root(seg.key.start, 0, false, false);
    node.signals_passed = engine.look_ahead_len();
    let follow = engine.arrival_follow(seg.key.start, &seg.arrival);
    let walk = engine.walk(&mut node, &follow, Some(seg.arrival.from), None);
    (walk.segment, node)
}

fn assert_cache_matches_map(pf: &Pathfinder, net: &Network, train: &Train) -> usize {
    let follower = pf.follower(train);
    let engine = CostEngine::new(&net.map, pf.settings(), train, follower, true);
    let mut checked = 0;
    for seg in pf.cache().iter() {
        let walk = engine.remeasure(seg);
        assert_eq!(walk.segment, *seg, "stale segment at {}", seg.key.start);
        assert_eq!(walk.reasons & EndSegmentReasons::CACHED, seg.end_reason);
        checked += 1;
    }
    checked
}

#[test]
fn costs_never_decrease_along_parents() {
    let train = Train::new(2);
    for seed in 0..SEEDS {
        let net = network(seed, 25);
        let mut pf = pathfinder(short_look_ahead());
        for (tile, td, dest) in queries(&net) {
            let query = PathQuery::new(tile, td.bits());
            let follower = pf.follower(&train);
            let Ok((outcome, stats)) = pf.run_search(&net.map, &train, &query, &dest, follower)
            else {
                continue;
            };
            assert_eq!(stats.nodes_created, outcome.nodes.len());
            for node in &outcome.nodes {
                if let Some(parent) = node.parent {
                    let parent = &outcome.nodes[parent.index()];
                    assert!(
                        node.cost >= parent.cost,
                        "seed {seed}: {} costs {} after parent {} at {}",
                        node.key,
                        node.cost,
                        parent.key,
                        parent.cost
                    );
                }
                assert!(node.estimate >= node.cost);
            }
        }
    }
}

#[test]
fn identical_queries_give_identical_routes() {
    let train = Train::new(2);
    for seed in 0..SEEDS {
        let net = network(seed, 25);
        let mut a = pathfinder(RailSettings::default());
        let mut b = pathfinder(RailSettings::default());
        for (tile, td, dest) in queries(&net) {
            let query = PathQuery::new(tile, td.bits());
            let ra = a.find_path(&net.map, &train, &query, &dest);
            let rb = b.find_path(&net.map, &train, &query, &dest);
            assert_eq!(ra, rb, "seed {seed}: {tile} {td}");
        }
    }
}

#[test]
fn heuristic_matches_exhaustive_search() {
    // Without signals a node's cost does not depend on how it was reached,
    // so best-first and plain Dijkstra must agree on every route cost.
    let train = Train::new(2);
    for seed in 0..SEEDS {
        let net = network(seed, 0);
        let mut astar = pathfinder(RailSettings::default());
        let mut dijkstra = pathfinder(RailSettings::default());
        for (tile, td, dest) in queries(&net) {
            let query = PathQuery::new(tile, td.bits());
            let a = astar.find_path(&net.map, &train, &query, &dest);
            let d = dijkstra.find_path(&net.map, &train, &query, &NoHeuristic(dest));
            assert_eq!(
                a.map(|r| r.cost),
                d.map(|r| r.cost),
                "seed {seed}: {tile} {td} to station {}",
                dest.id
            );
        }
    }
}

#[test]
fn warm_and_cold_caches_give_identical_routes() {
    let train = Train::new(2);
    for seed in 0..SEEDS {
        let net = network(seed, 25);
        let mut warm = pathfinder(short_look_ahead());
        run_all(&mut warm, &net, &train);
        for (tile, td, dest) in queries(&net) {
            let query = PathQuery::new(tile, td.bits());
            let mut cold = pathfinder(short_look_ahead());
            let a = warm.find_path(&net.map, &train, &query, &dest);
            let b = cold.find_path(&net.map, &train, &query, &dest);
            match (a, b) {
                (Ok(a), Ok(b)) => {
                    assert_eq!(a.steps, b.steps, "seed {seed}: {tile} {td}");
                    assert_eq!(a.cost, b.cost);
                    assert_eq!(a.reversed, b.reversed);
                }
                (a, b) => assert_eq!(a.err(), b.err(), "seed {seed}: {tile} {td}"),
            }
        }
    }
}

#[test]
fn cached_segments_match_fresh_walks() {
    let train = Train::new(2);
    let mut total = 0;
    for seed in 0..SEEDS {
        let mut net = network(seed, 25);
        let mut pf = pathfinder(short_look_ahead());
        run_all(&mut pf, &net, &train);
        total += assert_cache_matches_map(&pf, &net, &train);

        // Edit the layout under some cached segments; the next query must
        // drop every segment the edit made stale.
        let edited: Vec<Point> = pf
            .cache()
            .iter()
            .map(|seg| seg.last.tile)
            .step_by(3)
            .collect();
        for p in edited {
            let _ = net.map.set_slope(p, signalbox_core::Slope::Up(signalbox_core::Dir::North));
        }
        run_all(&mut pf, &net, &train);
        assert_cache_matches_map(&pf, &net, &train);
    }
    assert!(total > 0, "no segment was ever cached");
}

#[test]
fn cached_signal_state_follows_aspect_changes() {
    let train = Train::new(2);
    for seed in 0..SEEDS {
        let mut net = network(seed, 40);
        let mut pf = pathfinder(short_look_ahead());
        run_all(&mut pf, &net, &train);
        flip_signals(&mut net.map);

        let follower = pf.follower(&train);
        let engine = CostEngine::new(&net.map, pf.settings(), &train, follower, true);
        for seg in pf.cache().iter() {
            let mut reused = Node::root(seg.key.start, 0, false, false);
            engine.reuse(&mut reused, seg);
            let (walked, node) = fresh(&engine, seg);
            // Aspects beyond the look-ahead cost nothing.
            assert_eq!(walked, *seg);
            let red = node.flags.contains(NodeFlags::LAST_SIGNAL_WAS_RED);
            if seg.last_signal.is_some() {
                assert_eq!(
                    reused.flags.contains(NodeFlags::LAST_SIGNAL_WAS_RED),
                    red,
                    "seed {seed}: segment at {}",
                    seg.key.start
                );
                if red {
                    assert_eq!(reused.last_red_type, node.last_red_type);
                }
            } else {
                assert!(!red);
            }
        }
    }
}
