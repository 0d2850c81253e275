//! The seam between the generic search driver and railway pricing.

use log::trace;
use signalbox_core::TileMap;

use crate::cost::CostEngine;
use crate::destination::Destination;
use crate::follower::{Follow, FollowError};
use crate::node::{Node, NodeKey, SegmentRef};
use crate::segment::{Arrival, CachedSegment, EndSegmentReasons, SegmentCache, SegmentKey};

/// Hooks the search driver calls while expanding nodes.
pub trait PathfinderPolicy {
    /// The follow a root node at `key` arrives by.
    fn origin(&self, key: NodeKey) -> Follow;

    /// Trackdirs reachable after the end of a node's segment.
    fn follow(&self, from: NodeKey) -> Result<Follow, FollowError>;

    /// Price `node`, reached from `parent` by `arrival`. Returns `false` to
    /// drop the node.
    fn price(&mut self, node: &mut Node, parent: Option<&Node>, arrival: &Follow) -> bool;

    /// Cost plus heuristic for a priced node.
    fn estimate(&self, node: &Node) -> i32;

    /// Whether some node was dropped because a red two-way signal right
    /// after a junction blocked it.
    fn stopped_on_signal(&self) -> bool {
        false
    }
}

/// Railway pricing backed by a [`CostEngine`] and a [`SegmentCache`].
pub struct RailPolicy<'a> {
    engine: CostEngine<'a>,
    destination: &'a dyn Destination,
    cache: &'a mut SegmentCache,
    use_global_cache: bool,
    max_cost: Option<i32>,
    local: Vec<CachedSegment>,
    stopped_on_signal: bool,
    hits: u64,
    misses: u64,
}

impl<'a> RailPolicy<'a> {
    /// `use_global_cache` is narrowed further: bounded searches and
    /// searches avoiding reservations never share segments.
    pub fn new(
        engine: CostEngine<'a>,
        destination: &'a dyn Destination,
        cache: &'a mut SegmentCache,
        use_global_cache: bool,
        max_cost: Option<i32>,
    ) -> Self {
        let use_global_cache =
            use_global_cache && max_cost.is_none() && !destination.masks_reserved_tracks();
        Self {
            engine,
            destination,
            cache,
            use_global_cache,
            max_cost,
            local: Vec::new(),
            stopped_on_signal: false,
            hits: 0,
            misses: 0,
        }
    }

    pub fn engine(&self) -> &CostEngine<'a> {
        &self.engine
    }

    /// Global cache hits and misses during this search.
    pub fn cache_counts(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    /// Segment data behind a node.
    pub fn segment(&self, r: SegmentRef) -> Option<&CachedSegment> {
        match r {
            SegmentRef::Global(id) => self.cache.segment(id),
            SegmentRef::Local(i) => self.local.get(i),
        }
    }

    fn map(&self) -> &'a dyn TileMap {
        self.engine.map()
    }
}

impl PathfinderPolicy for RailPolicy<'_> {
    fn origin(&self, key: NodeKey) -> Follow {
        Follow::origin(self.map(), key.tile, key.td)
    }

    fn follow(&self, from: NodeKey) -> Result<Follow, FollowError> {
        self.engine.follower().follow(self.map(), from.tile, from.td)
    }

    fn price(&mut self, node: &mut Node, parent: Option<&Node>, arrival: &Follow) -> bool {
        let parent_cost = parent.map_or(node.cost, |p| p.cost);
        let entry = parent.map_or(0, |p| self.engine.transition_cost(p.last, node.key));
        let budget = self
            .max_cost
            .map(|m| m.saturating_sub(parent_cost).saturating_sub(entry));
        let from = parent.map(|_| arrival.old_tile);
        let global = self.use_global_cache
            && parent.is_some_and(|p| p.signals_passed >= self.engine.look_ahead_len());

        if global {
            let key = SegmentKey {
                start: node.key,
                rail_types: self.engine.follower().rail_types,
            };
            let arrival_key = Arrival {
                from: arrival.old_tile,
                tiles_skipped: arrival.tiles_skipped,
                is_station: arrival.is_station,
            };
            if let Some(id) = self.cache.lookup(&key, &arrival_key) {
                if let Some(seg) = self.cache.segment(id) {
                    self.hits += 1;
                    self.engine.reuse(node, seg);
                    node.segment = Some(SegmentRef::Global(id));
                    return self.engine.finish(
                        node,
                        parent_cost,
                        entry,
                        seg,
                        seg.end_reason,
                        0,
                        self.destination,
                    );
                }
            }
            self.misses += 1;
        }

        let walk = self.engine.walk(node, arrival, from, budget);
        self.stopped_on_signal |= walk.stopped_on_signal;
        if walk.reasons.contains(EndSegmentReasons::PATH_TOO_LONG) {
            trace!("{} pruned: over the cost bound", node.key);
            node.last = walk.segment.last;
            return false;
        }
        let seg_ref = if global {
            SegmentRef::Global(self.cache.insert(walk.segment.clone()))
        } else {
            self.local.push(walk.segment.clone());
            SegmentRef::Local(self.local.len() - 1)
        };
        node.segment = Some(seg_ref);
        let kept = self.engine.finish(
            node,
            parent_cost,
            entry,
            &walk.segment,
            walk.reasons,
            walk.extra,
            self.destination,
        );
        if !kept {
            trace!("{} pruned: segment ended {:?}", node.key, walk.reasons);
        }
        kept
    }

    fn estimate(&self, node: &Node) -> i32 {
        if node.target_seen() {
            node.cost
        } else {
            node.cost
                .saturating_add(self.destination.estimate(node.last.tile, node.last.td))
        }
    }

    fn stopped_on_signal(&self) -> bool {
        self.stopped_on_signal
    }
}
