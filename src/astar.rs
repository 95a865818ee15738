//! The A* engine. Searches a built [Graph] from its start node to its goal
//! node over an externally owned [SearchState], so the same graph can be
//! searched repeatedly (or from several threads, each with its own state).

use crate::Graph;
use log::warn;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// The result of a successful search: the node indices on the route, ordered
/// goal-first and start-last (both included), and the total cost, which equals
/// the settled `g` of the goal.
#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    pub nodes: Vec<usize>,
    pub cost: f64,
}

impl Path {
    /// Number of edges traversed: one less than the number of nodes.
    pub fn steps(&self) -> usize {
        self.nodes.len() - 1
    }
}

/// Per-search bookkeeping, indexed by node. A node is *unseen* while its `g`
/// is infinite, *open* once discovered and *closed* once expanded; closed
/// nodes are never relaxed again.
#[derive(Clone, Debug)]
pub struct SearchState {
    /// Accumulated cost from the start, infinite while unseen.
    pub g: Vec<f64>,
    /// Total priority `g + h`, meaningful once a node has been discovered.
    pub f: Vec<f64>,
    /// Predecessor on the cheapest known route, [None] for the start.
    pub from: Vec<Option<usize>>,
    closed: Vec<bool>,
}

impl SearchState {
    pub fn new(graph: &Graph) -> SearchState {
        let n = graph.node_count();
        SearchState {
            g: vec![f64::INFINITY; n],
            f: vec![f64::INFINITY; n],
            from: vec![None; n],
            closed: vec![false; n],
        }
    }

    /// Returns the state to its freshly-built condition so the graph can be
    /// searched again.
    pub fn reset(&mut self) {
        self.g.fill(f64::INFINITY);
        self.f.fill(f64::INFINITY);
        self.from.fill(None);
        self.closed.fill(false);
    }
}

struct FrontierEntry {
    f: f64,
    index: usize,
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f && self.index == other.index
    }
}
impl Eq for FrontierEntry {}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // First orders per total priority, then per node index, both reversed
        // so that [BinaryHeap] pops the lowest-f, lowest-index entry first.
        // The index suborder makes tie-breaking deterministic.
        match other.f.total_cmp(&self.f) {
            Ordering::Equal => other.index.cmp(&self.index),
            s => s,
        }
    }
}

/// Walks the predecessor links back from the goal. The required output order
/// is goal-first, so unlike the usual reconstruction there is nothing to
/// reverse.
fn reconstruct(state: &SearchState, goal: usize) -> Vec<usize> {
    itertools::unfold(Some(goal), |cursor| {
        let current = *cursor;
        current.map(|ix| {
            *cursor = state.from[ix];
            ix
        })
    })
    .collect()
}

/// Searches `graph` from [Graph::start] to [Graph::goal] over `state`, which
/// must have been built for this graph (or one with the same node count) and
/// be fresh or [reset](SearchState::reset); a state sized for a different
/// graph panics. Returns [None] when the frontier empties without reaching
/// the goal; no path exists in that case and `state` is left as the search
/// ended.
pub fn astar(graph: &Graph, state: &mut SearchState) -> Option<Path> {
    assert_eq!(
        state.g.len(),
        graph.node_count(),
        "search state sized for a different graph"
    );
    let start = graph.start();
    let goal = graph.goal();
    state.g[start] = 0.0;
    state.f[start] = graph.node(start).h;
    let mut frontier = BinaryHeap::new();
    frontier.push(FrontierEntry {
        f: state.f[start],
        index: start,
    });
    while let Some(FrontierEntry { index, .. }) = frontier.pop() {
        if index == goal {
            return Some(Path {
                nodes: reconstruct(state, goal),
                cost: state.g[goal],
            });
        }
        // A node relaxed several times has stale duplicate entries in the
        // heap; all but the cheapest find it already closed.
        if state.closed[index] {
            continue;
        }
        state.closed[index] = true;
        for &edge_ix in &graph.node(index).edges {
            let edge = graph.edge(edge_ix);
            let target = edge.target;
            if state.closed[target] {
                continue;
            }
            let tentative = state.g[index] + edge.weight;
            if tentative < state.g[target] {
                state.g[target] = tentative;
                state.f[target] = tentative + graph.node(target).h;
                state.from[target] = Some(index);
                frontier.push(FrontierEntry {
                    f: state.f[target],
                    index: target,
                });
            }
        }
    }
    warn!("Frontier exhausted without reaching node {}", goal);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Graph;
    use grid_util::grid::{BoolGrid, Grid};

    const SQRT_2: f64 = std::f64::consts::SQRT_2;

    fn search(graph: &Graph) -> Option<Path> {
        let mut state = SearchState::new(graph);
        astar(graph, &mut state)
    }

    #[test]
    fn single_node_is_its_own_goal() {
        // One open interior cell: start and goal coincide.
        let mut grid = BoolGrid::new(3, 3, true);
        grid.set(1, 1, false);
        let graph = Graph::from_grid(&grid).unwrap();
        let path = search(&graph).unwrap();
        assert_eq!(path.nodes, vec![0]);
        assert_eq!(path.steps(), 0);
        assert_eq!(path.cost, 0.0);
    }

    #[test]
    fn straight_corridor() {
        // 1x4 open corridor inside a 6x3 grid.
        let mut grid = BoolGrid::new(6, 3, true);
        for x in 1..5 {
            grid.set(x, 1, false);
        }
        let graph = Graph::from_grid(&grid).unwrap();
        let path = search(&graph).unwrap();
        assert_eq!(path.nodes, vec![3, 2, 1, 0]);
        assert!((path.cost - 3.0).abs() < 1e-12);
    }

    #[test]
    fn diagonal_is_cheaper_than_staircase() {
        let grid = BoolGrid::new(5, 5, false);
        let graph = Graph::from_grid(&grid).unwrap();
        let path = search(&graph).unwrap();
        // (1,1) -> (2,2) -> (3,3), two diagonal steps.
        assert_eq!(path.steps(), 2);
        assert!((path.cost - 2.0 * SQRT_2).abs() < 1e-12);
    }

    #[test]
    fn no_path_is_a_normal_outcome() {
        // A wall splits the interior into two components.
        let mut grid = BoolGrid::new(7, 7, false);
        for y in 0..7 {
            grid.set(3, y, true);
        }
        let graph = Graph::from_grid(&grid).unwrap();
        assert!(search(&graph).is_none());
        assert!(graph.shortest_path().is_none());
    }

    #[test]
    fn equal_cost_routes_break_ties_by_lowest_index() {
        // Blocked centre, two mirror-image optimal routes:
        //   S . .
        //   . # .
        //   . . G
        // Expansion order must prefer the lower node index on equal f, which
        // settles the route through nodes 1 and 4 rather than 3 and 6.
        let mut grid = BoolGrid::new(5, 5, false);
        grid.set(2, 2, true);
        let graph = Graph::from_grid(&grid).unwrap();
        let path = search(&graph).unwrap();
        assert_eq!(path.nodes, vec![7, 4, 1, 0]);
        assert!((path.cost - (2.0 + SQRT_2)).abs() < 1e-12);
    }

    #[test]
    fn goal_cost_matches_edge_weights_along_path() {
        let mut grid = BoolGrid::new(8, 6, false);
        grid.set(3, 2, true);
        grid.set(3, 3, true);
        grid.set(5, 1, true);
        let graph = Graph::from_grid(&grid).unwrap();
        let mut state = SearchState::new(&graph);
        let path = astar(&graph, &mut state).unwrap();
        let mut total = 0.0;
        for pair in path.nodes.windows(2) {
            let (later, earlier) = (pair[0], pair[1]);
            let edge = graph
                .node(earlier)
                .edges
                .iter()
                .map(|&ix| graph.edge(ix))
                .find(|e| e.target == later)
                .expect("path hop without an edge");
            total += edge.weight;
        }
        assert!((state.g[graph.goal()] - total).abs() < 1e-12);
        assert!((path.cost - total).abs() < 1e-12);
    }

    #[test]
    #[should_panic(expected = "search state sized for a different graph")]
    fn state_for_another_graph_is_rejected() {
        let small = Graph::from_grid(&BoolGrid::new(3, 3, false)).unwrap();
        let big = Graph::from_grid(&BoolGrid::new(6, 6, false)).unwrap();
        let mut state = SearchState::new(&small);
        astar(&big, &mut state);
    }

    #[test]
    fn search_is_idempotent_after_reset() {
        let mut grid = BoolGrid::new(9, 9, false);
        for y in 1..6 {
            grid.set(4, y, true);
        }
        let graph = Graph::from_grid(&grid).unwrap();
        let mut state = SearchState::new(&graph);
        let first = astar(&graph, &mut state).unwrap();
        state.reset();
        let second = astar(&graph, &mut state).unwrap();
        assert_eq!(first, second);
    }
}
