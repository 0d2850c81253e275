//! Helpers shared by the crate's tests.

use rand::SeedableRng;
use rand::rngs::StdRng;
use signalbox_core::{
    Layout, Network, NetworkGen, Point, RailMap, SignalState, TileMap, Trackdir,
};

use crate::destination::StationTarget;
use crate::error::PathError;
use crate::pathfinder::{PathQuery, Pathfinder};
use crate::route::Route;
use crate::settings::RailSettings;
use crate::vehicle::Train;

pub(crate) fn map(layout: &str) -> RailMap {
    Layout::parse_map(layout).expect("test layout should parse")
}

pub(crate) fn pathfinder(settings: RailSettings) -> Pathfinder {
    Pathfinder::new(settings).expect("test settings should validate")
}

/// Route from `tile` heading `td` to station `id`.
pub(crate) fn to_station(
    pf: &mut Pathfinder,
    map: &RailMap,
    train: &Train,
    tile: Point,
    td: Trackdir,
    id: u16,
) -> Result<Route, PathError> {
    let dest = StationTarget::new(map, id).expect("station should exist");
    pf.find_path(map, train, &PathQuery::new(tile, td.bits()), &dest)
}

/// A 17x13 generated network.
pub(crate) fn network(seed: u64, signal_pct: u32) -> Network {
    let mut generator = NetworkGen::new(17, 13, StdRng::seed_from_u64(seed));
    generator.signal_pct = signal_pct;
    generator.stations = 4;
    generator.depots = 2;
    generator.generate()
}

/// Turn every red signal green and every green one red.
pub(crate) fn flip_signals(map: &mut RailMap) {
    let bounds = map.bounds();
    for p in bounds {
        for track in map.track_bits(p).iter() {
            for td in [track.trackdir(false), track.trackdir(true)] {
                let flipped = match map.signal_state(p, td) {
                    Some(SignalState::Red) => SignalState::Green,
                    Some(SignalState::Green) => SignalState::Red,
                    None => continue,
                };
                map.set_signal_state(p, td, flipped)
                    .expect("signal should exist");
            }
        }
    }
}
