//! # A* search engine
//!
//! A generic best-first search used at both planning levels. The frontier
//! pairs a binary heap keyed on path cost plus heuristic with a per-node
//! best-cost map, giving decrease-key semantics by re-insertion: stale heap
//! entries are skipped on pop, and a closed set prevents re-expansion of
//! nodes already dequeued as optimal. Ties on total cost break first-in
//! first-out. Edge costs must be positive.

use instant::{Duration, Instant};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

////////////////////////////////////////////////////////////////////////////////
// Timers

/// A wall-clock cutoff shared by every search working on one request.
#[derive(Debug, Clone)]
pub struct Timer {
    deadline: Option<Instant>,
}

impl Timer {
    pub fn finite(budget: Duration) -> Timer {
        Timer {
            deadline: Some(Instant::now() + budget),
        }
    }

    pub fn infinite() -> Timer {
        Timer { deadline: None }
    }

    pub fn expired(&self) -> bool {
        match self.deadline {
            Some(deadline) => Instant::now() > deadline,
            None => false,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Problems

/// An outgoing edge: the action that labels it, its positive cost, and the
/// node it leads to.
#[derive(Debug, Clone)]
pub struct Edge<A, N> {
    pub action: A,
    pub cost: usize,
    pub target: N,
}

/// A search space. Nodes are deduplicated by their canonical id string.
pub trait SearchProblem {
    type Node: Clone;
    type Action: Clone;

    fn node_id(&self, node: &Self::Node) -> String;
    fn successors(
        &self,
        node: &Self::Node,
    ) -> Vec<Edge<Self::Action, Self::Node>>;
    fn is_goal(&self, node: &Self::Node) -> bool;
    fn heuristic(&self, node: &Self::Node) -> f64;
}

/// A successful search: the edges from start to goal (the start itself is
/// not included), their summed cost, and how many frontier insertions the
/// search performed.
#[derive(Debug, Clone)]
pub struct FoundPath<A, N> {
    pub edges: Vec<Edge<A, N>>,
    pub cost: usize,
    pub frontier_insertions: usize,
}

#[derive(Debug, Clone)]
pub enum SearchOutcome<A, N> {
    Found(FoundPath<A, N>),
    Timeout,
    Exhausted,
}

////////////////////////////////////////////////////////////////////////////////
// The engine

struct HeapEntry {
    priority: f64,
    sequence: u64,
    id: String,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    // BinaryHeap is a max-heap; invert so the cheapest entry pops first,
    // and on equal priority the earliest insertion.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .total_cmp(&self.priority)
            .then(other.sequence.cmp(&self.sequence))
    }
}

struct Record<A, N> {
    node: N,
    cost: usize,
    parent: Option<(String, A, usize)>,
}

/// Run A* from `start`. The heuristic is trusted not to need re-opening:
/// cheaper routes to a node still on the frontier are re-inserted with
/// their improved cost, but closed nodes stay closed.
pub fn astar<P: SearchProblem>(
    problem: &P,
    start: P::Node,
    timer: &Timer,
) -> SearchOutcome<P::Action, P::Node> {
    let mut heap = BinaryHeap::new();
    let mut records: HashMap<String, Record<P::Action, P::Node>> =
        HashMap::new();
    let mut closed: HashSet<String> = HashSet::new();
    let mut sequence: u64 = 0;
    let mut insertions: usize = 0;

    let start_id = problem.node_id(&start);
    heap.push(HeapEntry {
        priority: problem.heuristic(&start),
        sequence,
        id: start_id.clone(),
    });
    insertions += 1;
    records.insert(
        start_id,
        Record {
            node: start,
            cost: 0,
            parent: None,
        },
    );

    while let Some(entry) = heap.pop() {
        if timer.expired() {
            return SearchOutcome::Timeout;
        }
        if closed.contains(&entry.id) {
            continue;
        }
        let (node, cost) = match records.get(&entry.id) {
            Some(record) => (record.node.clone(), record.cost),
            None => continue,
        };
        if problem.is_goal(&node) {
            return SearchOutcome::Found(reconstruct(
                &records,
                &entry.id,
                cost,
                insertions,
            ));
        }
        closed.insert(entry.id.clone());

        for edge in problem.successors(&node) {
            let target_id = problem.node_id(&edge.target);
            if closed.contains(&target_id) {
                continue;
            }
            let tentative = cost + edge.cost;
            let better = records
                .get(&target_id)
                .map(|r| tentative < r.cost)
                .unwrap_or(true);
            if !better {
                continue;
            }
            sequence += 1;
            heap.push(HeapEntry {
                priority: tentative as f64
                    + problem.heuristic(&edge.target),
                sequence,
                id: target_id.clone(),
            });
            insertions += 1;
            records.insert(
                target_id,
                Record {
                    node: edge.target,
                    cost: tentative,
                    parent: Some((
                        entry.id.clone(),
                        edge.action,
                        edge.cost,
                    )),
                },
            );
        }
    }

    SearchOutcome::Exhausted
}

fn reconstruct<A: Clone, N: Clone>(
    records: &HashMap<String, Record<A, N>>,
    goal_id: &str,
    cost: usize,
    frontier_insertions: usize,
) -> FoundPath<A, N> {
    let mut edges = vec![];
    let mut current = goal_id.to_owned();
    while let Some(record) = records.get(&current) {
        match &record.parent {
            Some((parent_id, action, edge_cost)) => {
                edges.push(Edge {
                    action: action.clone(),
                    cost: *edge_cost,
                    target: record.node.clone(),
                });
                current = parent_id.clone();
            }
            None => break,
        }
    }
    edges.reverse();
    FoundPath {
        edges,
        cost,
        frontier_insertions,
    }
}
