//! Search results.

use signalbox_core::{TileMap, Trackdir};

use crate::follower::Follower;
use crate::node::NodeKey;

/// One node of a route: a segment from `start` to `end`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RouteStep {
    pub start: NodeKey,
    pub end: NodeKey,
    /// Path cost up to the end of this step.
    pub cost: i32,
}

/// Counters for one search.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchStats {
    pub nodes_created: usize,
    pub nodes_closed: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

/// The cheapest route found by a query.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Route {
    /// Steps from the origin to the destination.
    pub steps: Vec<RouteStep>,
    pub cost: i32,
    /// The route starts from the reversed origin.
    pub reversed: bool,
    pub stats: SearchStats,
}

impl Route {
    /// Tile and trackdir the route starts on.
    pub fn origin(&self) -> Option<NodeKey> {
        self.steps.first().map(|s| s.start)
    }

    /// Tile and trackdir the route ends on.
    pub fn destination(&self) -> Option<NodeKey> {
        self.steps.last().map(|s| s.end)
    }

    /// Trackdir to take on the origin tile.
    pub fn first_trackdir(&self) -> Option<Trackdir> {
        self.origin().map(|k| k.td)
    }

    /// Every tile the route runs over, in order, found by following each
    /// step's track from its start to its end. Tiles skipped inside
    /// tunnels, on bridges and along platforms are not listed.
    pub fn tiles(&self, map: &dyn TileMap, follower: &Follower) -> Vec<NodeKey> {
        let limit = map.bounds().len() * 12 + 1;
        let mut out = Vec::new();
        for step in &self.steps {
            let mut cur = step.start;
            out.push(cur);
            let mut n = 0;
            while cur != step.end && n < limit {
                let Some(next) = follower
                    .follow(map, cur.tile, cur.td)
                    .ok()
                    .and_then(|f| f.new_trackdirs.single().map(|td| NodeKey::new(f.new_tile, td)))
                else {
                    break;
                };
                cur = next;
                out.push(cur);
                n += 1;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signalbox_core::{Layout, Point, RailType};

    #[test]
    fn tiles_expand_steps() {
        let map = Layout::parse_map("-----").unwrap();
        let route = Route {
            steps: vec![RouteStep {
                start: NodeKey::new(Point::new(1, 0), Trackdir::WestToEast),
                end: NodeKey::new(Point::new(3, 0), Trackdir::WestToEast),
                cost: 300,
            }],
            cost: 300,
            reversed: false,
            stats: SearchStats::default(),
        };
        let tiles = route.tiles(&map, &Follower::new(RailType::RAIL.mask(), false));
        let xs: Vec<i32> = tiles.iter().map(|k| k.tile.x).collect();
        assert_eq!(xs, vec![1, 2, 3]);
        assert_eq!(route.first_trackdir(), Some(Trackdir::WestToEast));
        assert_eq!(route.destination().map(|k| k.tile), Some(Point::new(3, 0)));
    }
}
