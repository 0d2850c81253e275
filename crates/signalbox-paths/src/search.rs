//! Best-first search over segment nodes.

use log::trace;
use std::collections::hash_map::Entry;
use std::collections::{BinaryHeap, HashMap};

use crate::error::PathError;
use crate::node::{Node, NodeId, NodeKey, NodeState};
use crate::policy::PathfinderPolicy;

/// A root to start from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Seed {
    pub key: NodeKey,
    /// Initial cost, e.g. a reversing penalty.
    pub cost: i32,
    pub is_choice: bool,
    pub reverse: bool,
}

/// Open-list entry, ordered so the `BinaryHeap` pops the lowest estimate
/// first and the oldest entry among equals.
#[derive(Copy, Clone, Debug)]
struct OpenRef {
    estimate: i32,
    seq: u64,
    id: NodeId,
}

impl Ord for OpenRef {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .estimate
            .cmp(&self.estimate)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

// Equality must agree with `Ord`, which ignores `id`.
impl PartialEq for OpenRef {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for OpenRef {}

impl PartialOrd for OpenRef {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Everything a finished search leaves behind.
#[derive(Debug)]
pub(crate) struct SearchOutcome {
    pub nodes: Vec<Node>,
    pub result: Result<NodeId, PathError>,
    pub closed: usize,
}

impl SearchOutcome {
    /// Node ids from a root to `id`.
    pub fn chain(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = vec![id];
        let mut cur = id;
        while let Some(parent) = self.nodes[cur.0].parent {
            out.push(parent);
            cur = parent;
        }
        out.reverse();
        out
    }
}

struct Search {
    nodes: Vec<Node>,
    states: Vec<NodeState>,
    open: BinaryHeap<OpenRef>,
    index: HashMap<NodeKey, NodeId>,
    seq: u64,
}

impl Search {
    fn new() -> Self {
        Self {
            nodes: Vec::new(),
            states: Vec::new(),
            open: BinaryHeap::new(),
            index: HashMap::new(),
            seq: 0,
        }
    }

    /// Put a priced node on the open list unless a node with the same key is
    /// closed or open with an estimate at least as good.
    fn add(&mut self, node: Node) {
        let id = NodeId(self.nodes.len());
        match self.index.entry(node.key) {
            Entry::Occupied(mut e) => {
                let old = *e.get();
                match self.states[old.0] {
                    NodeState::Open if node.estimate < self.nodes[old.0].estimate => {
                        self.states[old.0] = NodeState::Discarded;
                        e.insert(id);
                    }
                    _ => return,
                }
            }
            Entry::Vacant(e) => {
                e.insert(id);
            }
        }
        self.open.push(OpenRef {
            estimate: node.estimate,
            seq: self.seq,
            id,
        });
        self.seq += 1;
        self.nodes.push(node);
        self.states.push(NodeState::Open);
    }
}

/// Run a best-first search from `seeds`.
///
/// A node is accepted when popped with its target flag set. The search
/// gives up once `max_nodes` nodes were closed, and reports no path when
/// the accepted node costs more than `max_cost`.
pub(crate) fn run<P: PathfinderPolicy>(
    policy: &mut P,
    seeds: &[Seed],
    max_nodes: usize,
    max_cost: Option<i32>,
) -> SearchOutcome {
    let mut s = Search::new();
    for seed in seeds {
        let mut node = Node::root(seed.key, seed.cost, seed.is_choice, seed.reverse);
        let arrival = policy.origin(seed.key);
        if !policy.price(&mut node, None, &arrival) {
            continue;
        }
        node.estimate = policy.estimate(&node);
        s.add(node);
    }

    let mut closed = 0;
    let result = loop {
        let Some(OpenRef { id, .. }) = s.open.pop() else {
            break Err(if policy.stopped_on_signal() {
                PathError::BlockedBySignal
            } else {
                PathError::NoPath
            });
        };
        if s.states[id.0] != NodeState::Open {
            continue;
        }
        let node = &s.nodes[id.0];
        if node.target_seen() {
            if max_cost.is_some_and(|m| node.cost > m) {
                break Err(PathError::NoPath);
            }
            break Ok(id);
        }
        if closed >= max_nodes {
            break Err(PathError::BudgetExceeded { limit: max_nodes });
        }
        s.states[id.0] = NodeState::Closed;
        closed += 1;

        let last = node.last;
        let Ok(follow) = policy.follow(last) else {
            trace!("{last}: no way on");
            continue;
        };
        let is_choice = follow.new_trackdirs.count() > 1;
        for td in follow.new_trackdirs.iter() {
            let key = NodeKey::new(follow.new_tile, td);
            let parent = &s.nodes[id.0];
            let mut child = Node::child(parent, id, key, is_choice);
            if !policy.price(&mut child, Some(parent), &follow) {
                continue;
            }
            child.estimate = policy.estimate(&child);
            s.add(child);
        }
    };

    SearchOutcome {
        nodes: s.nodes,
        result,
        closed,
    }
}
