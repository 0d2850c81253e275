//! Search nodes and their arena handles.

use signalbox_core::{Point, SignalType, Trackdir};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use crate::segment::SegmentId;

/// A tile entered in one travel direction: the identity of a search node
/// and of a cached segment's first tile.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeKey {
    pub tile: Point,
    pub td: Trackdir,
}

impl NodeKey {
    #[inline]
    pub const fn new(tile: Point, td: Trackdir) -> Self {
        Self { tile, td }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.tile, self.td)
    }
}

/// Index of a node in a search's arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

// ---------------------------------------------------------------------------
// NodeFlags
// ---------------------------------------------------------------------------

/// Boolean node state packed in a byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct NodeFlags(pub u8);

impl NodeFlags {
    pub const NONE: Self = Self(0);
    /// The node's segment ends on an accepted destination.
    pub const TARGET_SEEN: Self = Self(1 << 0);
    /// The last signal passed along the path showed red.
    pub const LAST_SIGNAL_WAS_RED: Self = Self(1 << 1);
    /// The path went through a junction with more than one way on.
    pub const CHOICE_SEEN: Self = Self(1 << 2);

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    #[inline]
    pub fn set(&mut self, other: Self, on: bool) {
        if on {
            self.insert(other);
        } else {
            self.remove(other);
        }
    }
}

impl BitOr for NodeFlags {
    type Output = Self;
    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for NodeFlags {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// Where a node's segment data lives.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SegmentRef {
    /// Shared segment in the pathfinder's cache.
    Global(SegmentId),
    /// Segment private to the current search.
    Local(usize),
}

/// Lifecycle of a node in the open/closed bookkeeping.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeState {
    Open,
    Closed,
    /// Superseded by a cheaper node with the same key.
    Discarded,
}

/// One search node: a segment of track starting at `key`.
#[derive(Clone, Debug)]
pub struct Node {
    pub key: NodeKey,
    pub parent: Option<NodeId>,
    /// Path cost from the origin up to the end of this node's segment.
    pub cost: i32,
    /// `cost` plus the heuristic for the rest of the way.
    pub estimate: i32,
    pub segment: Option<SegmentRef>,
    /// Last tile and trackdir of the segment.
    pub last: NodeKey,
    /// Signals passed along the path, counting this segment.
    pub signals_passed: u32,
    pub last_signal_type: SignalType,
    pub last_red_type: SignalType,
    pub flags: NodeFlags,
    /// Created from a follow offering more than one trackdir.
    pub is_choice: bool,
    /// Root seeded from the reversed origin.
    pub reverse_origin: bool,
}

impl Node {
    /// A root node. `cost` is the initial cost, e.g. a reversing penalty.
    pub fn root(key: NodeKey, cost: i32, is_choice: bool, reverse_origin: bool) -> Self {
        let mut flags = NodeFlags::NONE;
        flags.set(NodeFlags::CHOICE_SEEN, is_choice);
        Self {
            key,
            parent: None,
            cost,
            estimate: cost,
            segment: None,
            last: key,
            signals_passed: 0,
            last_signal_type: SignalType::Pbs,
            last_red_type: SignalType::Block,
            flags,
            is_choice,
            reverse_origin,
        }
    }

    /// A node following `parent`, inheriting its signal state.
    pub fn child(parent: &Node, parent_id: NodeId, key: NodeKey, is_choice: bool) -> Self {
        let mut flags = parent.flags;
        flags.remove(NodeFlags::TARGET_SEEN);
        if is_choice {
            flags.insert(NodeFlags::CHOICE_SEEN);
        }
        Self {
            key,
            parent: Some(parent_id),
            cost: parent.cost,
            estimate: parent.cost,
            segment: None,
            last: key,
            signals_passed: parent.signals_passed,
            last_signal_type: parent.last_signal_type,
            last_red_type: parent.last_red_type,
            flags,
            is_choice,
            reverse_origin: parent.reverse_origin,
        }
    }

    #[inline]
    pub fn target_seen(&self) -> bool {
        self.flags.contains(NodeFlags::TARGET_SEEN)
    }
}
