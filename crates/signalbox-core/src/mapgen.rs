//! Seeded random railway networks.
//!
//! [`NetworkGen`] lays a lattice of junctions joined by straight lines,
//! drops some of the lines, then sprinkles stations, depots, slopes and
//! signals over what is left. The same seed always yields the same map.

use crate::direction::{Axis, Dir};
use crate::geom::Point;
use crate::map::{RailMap, TileMap};
use crate::tile::{RailType, SignalState, SignalType, Slope, TileKind};
use crate::track::{Track, TrackBits, Trackdir};
use log::debug;
use rand::{Rng, RngExt};

const SIGNAL_TYPES: [SignalType; 6] = [
    SignalType::Block,
    SignalType::Block,
    SignalType::Pbs,
    SignalType::PbsOneWay,
    SignalType::Entry,
    SignalType::Exit,
];

/// A generated map with the stations and depots placed on it.
#[derive(Debug, Clone)]
pub struct Network {
    pub map: RailMap,
    pub stations: Vec<u16>,
    pub depots: Vec<Point>,
}

impl Network {
    /// Every plain straight track tile with its two trackdirs, in row
    /// order. Useful as query origins.
    pub fn origins(&self) -> Vec<(Point, Trackdir)> {
        let mut out = Vec::new();
        for p in self.map.bounds() {
            if self.map.kind(p) != TileKind::Rail {
                continue;
            }
            if let Some(track) = self.map.track_bits(p).single().filter(|t| t.is_straight()) {
                out.push((p, track.trackdir(false)));
                out.push((p, track.trackdir(true)));
            }
        }
        out
    }
}

/// Random network generator.
pub struct NetworkGen<R: Rng> {
    pub rng: R,
    pub width: i32,
    pub height: i32,
    /// Distance between junctions.
    pub spacing: i32,
    /// Percentage of lattice lines kept.
    pub keep_pct: u32,
    /// Percentage of straight tiles given a signal.
    pub signal_pct: u32,
    /// Percentage of signals showing red.
    pub red_pct: u32,
    /// Percentage of straight tiles on a slope.
    pub slope_pct: u32,
    pub stations: u16,
    pub depots: u16,
}

impl<R: Rng> NetworkGen<R> {
    pub fn new(width: i32, height: i32, rng: R) -> Self {
        Self {
            rng,
            width,
            height,
            spacing: 4,
            keep_pct: 80,
            signal_pct: 10,
            red_pct: 30,
            slope_pct: 5,
            stations: 3,
            depots: 1,
        }
    }

    fn pct(&mut self, pct: u32) -> bool {
        self.rng.random_range(0..100u32) < pct
    }

    /// Generate a network.
    pub fn generate(&mut self) -> Network {
        let spacing = self.spacing.max(2);
        let nx = (self.width - 1) / spacing + 1;
        let ny = (self.height - 1) / spacing + 1;
        let mut map = RailMap::new(self.width, self.height);
        let node = |i: i32, j: i32| Point::new(i * spacing, j * spacing);

        // Lattice lines, as (start node, direction).
        let mut lines = Vec::new();
        for j in 0..ny {
            for i in 0..nx {
                if i + 1 < nx && self.pct(self.keep_pct) {
                    lines.push((node(i, j), Dir::East));
                }
                if j + 1 < ny && self.pct(self.keep_pct) {
                    lines.push((node(i, j), Dir::South));
                }
            }
        }

        // Junction tiles get a track between every pair of used edges.
        let mut used: Vec<(Point, Dir)> = Vec::new();
        for &(a, dir) in &lines {
            used.push((a, dir));
            used.push((a + dir.offset() * spacing, dir.reverse()));
        }

        let mut stations = Vec::new();
        for &(a, dir) in &lines {
            let track = Track::along(dir.axis());
            for k in 1..spacing {
                let _ = map.build_track(a + dir.offset() * k, track);
            }
        }
        for j in 0..ny {
            for i in 0..nx {
                let p = node(i, j);
                let dirs: Vec<Dir> = used
                    .iter()
                    .filter(|(q, _)| *q == p)
                    .map(|&(_, d)| d)
                    .collect();
                let _ = map.build_tracks(p, junction_tracks(&dirs));
            }
        }

        // Stations in the middle of random lines.
        for id in 0..self.stations {
            if lines.is_empty() || spacing < 3 {
                break;
            }
            // Lines always run east or south, matching the platform direction.
            let (a, dir) = lines[self.rng.random_range(0..lines.len())];
            let start = a + dir.offset() * (spacing / 2);
            let len = if spacing > 3 { 2 } else { 1 };
            let free = (0..len).all(|k| map.kind(start + dir.offset() * k) == TileKind::Rail);
            if free
                && map
                    .build_station(id, start, dir.axis(), len, RailType::RAIL)
                    .is_ok()
            {
                stations.push(id);
            }
        }

        // Depots hang off junctions on an unused edge.
        let mut depots = Vec::new();
        let mut attempts = 0;
        while depots.len() < self.depots as usize && attempts < 64 {
            attempts += 1;
            let p = node(self.rng.random_range(0..nx), self.rng.random_range(0..ny));
            let dir = Dir::ALL[self.rng.random_range(0..4usize)];
            let d = dir.step(p);
            if map.kind(d) != TileKind::Clear || map.track_bits(p).is_empty() {
                continue;
            }
            let mut dirs: Vec<Dir> = used
                .iter()
                .filter(|(q, _)| *q == p)
                .map(|&(_, e)| e)
                .collect();
            dirs.push(dir);
            let _ = map.build_tracks(p, junction_tracks(&dirs));
            used.push((p, dir));
            if map.build_depot(d, dir.reverse(), RailType::RAIL).is_ok() {
                depots.push(d);
            }
        }

        // Slopes and signals on plain straight tiles.
        for p in map.bounds() {
            if map.kind(p) != TileKind::Rail {
                continue;
            }
            let Some(track) = map.track_bits(p).single().filter(|t| t.is_straight()) else {
                continue;
            };
            let axis = if track == Track::Horizontal { Axis::X } else { Axis::Y };
            if self.pct(self.slope_pct) {
                let up = axis.dirs()[self.rng.random_range(0..2usize)];
                let _ = map.set_slope(p, Slope::Up(up));
            }
            if self.pct(self.signal_pct) {
                let td = track.trackdir(self.rng.random_range(0..2u32) == 1);
                let kind = SIGNAL_TYPES[self.rng.random_range(0..SIGNAL_TYPES.len())];
                let two_way = self.pct(30);
                let _ = map.build_signal(p, td, kind, two_way);
                for td in [td, td.reverse()] {
                    if map.has_signal_on(p, td) && self.pct(self.red_pct) {
                        let _ = map.set_signal_state(p, td, SignalState::Red);
                    }
                }
            }
        }

        debug!(
            "generated {}x{} network: {} lines, {} stations, {} depots",
            self.width,
            self.height,
            lines.len(),
            stations.len(),
            depots.len()
        );
        Network {
            map,
            stations,
            depots,
        }
    }
}

/// Tracks joining every pair of the given edges; a lone edge gets a stub
/// straight towards it.
fn junction_tracks(dirs: &[Dir]) -> TrackBits {
    let mut bits = TrackBits::NONE;
    for (n, &a) in dirs.iter().enumerate() {
        for &b in &dirs[n + 1..] {
            if let Some(td) = Trackdir::from_edges(a, b) {
                bits |= td.track().bits();
            }
        }
    }
    if bits.is_empty() {
        if let Some(&d) = dirs.first() {
            bits = Track::along(d.axis()).bits();
        }
    }
    bits
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn generate(seed: u64) -> Network {
        NetworkGen::new(17, 13, StdRng::seed_from_u64(seed)).generate()
    }

    #[test]
    fn same_seed_same_network() {
        let a = generate(7);
        let b = generate(7);
        for p in a.map.bounds() {
            assert_eq!(a.map.tile(p), b.map.tile(p));
        }
        assert_eq!(a.stations, b.stations);
        assert_eq!(a.depots, b.depots);
    }

    #[test]
    fn junction_tracks_join_edges() {
        assert_eq!(
            junction_tracks(&[Dir::West, Dir::East]),
            TrackBits::HORIZONTAL
        );
        assert_eq!(
            junction_tracks(&[Dir::North, Dir::East, Dir::South]),
            TrackBits::VERTICAL | TrackBits::NORTH_EAST | TrackBits::SOUTH_EAST
        );
        assert_eq!(junction_tracks(&[Dir::North]), TrackBits::VERTICAL);
        assert!(junction_tracks(&[]).is_empty());
    }

    #[test]
    fn stations_have_areas() {
        for seed in 0..8 {
            let net = generate(seed);
            for &id in &net.stations {
                assert!(net.map.station_area(id).is_some());
            }
            for &d in &net.depots {
                assert!(net.map.kind(d).is_depot());
            }
            assert!(!net.origins().is_empty());
        }
    }
}
