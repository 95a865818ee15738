//! # grid_astar
//!
//! Shortest paths on a 2-D grid via the
//! [A* search algorithm](https://en.wikipedia.org/wiki/A*_search_algorithm).
//! A boolean grid of blocked ([true]) and open ([false]) cells is first turned
//! into an explicit weighted directed graph: one node per open interior cell,
//! one directed edge per ordered pair of 8-adjacent open interior cells, with
//! Euclidean edge weights (1 for straight moves, √2 for diagonal ones). The
//! border ring of the grid never produces nodes, whatever its cell values say.
//! A* then searches the graph with the straight-line distance to the goal as
//! heuristic. Pre-computes
//! [connected components](https://en.wikipedia.org/wiki/Component_(graph_theory))
//! to avoid flood-filling behaviour if no path exists.
//!
//! Start and goal are implicit: the first and last node in row-major scan
//! order over the interior. This mirrors the map format the crate was built
//! for, where the entrance is the first open cell and the exit the last one.
pub mod astar;

use grid_util::grid::{BoolGrid, Grid, SimpleGrid};
use grid_util::point::Point;
use log::info;
use petgraph::unionfind::UnionFind;
use smallvec::SmallVec;

use crate::astar::{astar, Path, SearchState};
use core::fmt;
use std::collections::TryReserveError;

/// Marks a grid cell that corresponds to no node in the lookup grid.
const NO_NODE: i32 = -1;

/// A graph vertex corresponding to one open, non-border grid cell.
#[derive(Clone, Debug)]
pub struct Node {
    /// Grid coordinates of the cell this node was made from.
    pub point: Point,
    /// Straight-line distance to the goal node, fixed at build time.
    pub h: f64,
    /// Indices of outgoing edges in the flat edge table. At most 8.
    pub edges: SmallVec<[usize; 8]>,
}

/// A directed weighted connection between two 8-adjacent nodes.
#[derive(Clone, Copy, Debug)]
pub struct Edge {
    pub source: usize,
    pub target: usize,
    /// Euclidean distance between the endpoints: 1 or √2.
    pub weight: f64,
}

/// Why a grid could not be turned into a graph.
#[derive(Debug)]
pub enum GraphError {
    /// The grid has no open interior cell, so start and goal are undefined.
    /// Grids narrower or shorter than 3 cells have no interior at all.
    DegenerateGrid,
    /// The node or edge table could not be allocated.
    Alloc(TryReserveError),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GraphError::DegenerateGrid => write!(f, "grid has no open interior cell"),
            GraphError::Alloc(e) => write!(f, "graph allocation failed: {}", e),
        }
    }
}

impl std::error::Error for GraphError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GraphError::Alloc(e) => Some(e),
            GraphError::DegenerateGrid => None,
        }
    }
}

impl From<TryReserveError> for GraphError {
    fn from(e: TryReserveError) -> GraphError {
        GraphError::Alloc(e)
    }
}

/// [Graph] holds the immutable node and edge tables built from a [BoolGrid],
/// a [SimpleGrid] lookup from cell coordinates back to node indices, and a
/// [UnionFind] over node indices for fast reachability answers. All search
/// bookkeeping lives in [SearchState], so one graph can serve any number of
/// searches.
#[derive(Clone, Debug)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    lookup: SimpleGrid<i32>,
    components: UnionFind<usize>,
}

fn euclidean(a: Point, b: Point) -> f64 {
    let dx = (a.x - b.x) as f64;
    let dy = (a.y - b.y) as f64;
    (dx * dx + dy * dy).sqrt()
}

impl Graph {
    /// Builds the graph for a grid. Interior cells are scanned in row-major
    /// order (top-to-bottom, left-to-right); each open one becomes a node.
    /// Heuristics are filled in once all nodes exist and the goal is known,
    /// then a second scan in the same order creates the edges.
    pub fn from_grid(grid: &BoolGrid) -> Result<Graph, GraphError> {
        let w = grid.width;
        let h = grid.height;
        if w < 3 || h < 3 {
            return Err(GraphError::DegenerateGrid);
        }
        let open_interior = |p: Point| {
            p.x >= 1
                && p.y >= 1
                && (p.x as usize) < w - 1
                && (p.y as usize) < h - 1
                && !grid.get(p.x as usize, p.y as usize)
        };

        // Size the tables up front so each is allocated exactly once.
        let mut node_count = 0;
        let mut edge_count = 0;
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                let p = Point::new(x as i32, y as i32);
                if !open_interior(p) {
                    continue;
                }
                node_count += 1;
                edge_count += p
                    .moore_neighborhood()
                    .into_iter()
                    .filter(|&q| open_interior(q))
                    .count();
            }
        }
        if node_count == 0 {
            return Err(GraphError::DegenerateGrid);
        }
        let mut nodes: Vec<Node> = Vec::new();
        nodes.try_reserve_exact(node_count)?;
        let mut edges: Vec<Edge> = Vec::new();
        edges.try_reserve_exact(edge_count)?;

        let mut lookup: SimpleGrid<i32> = SimpleGrid::new(w, h, NO_NODE);
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                let p = Point::new(x as i32, y as i32);
                if open_interior(p) {
                    lookup.set(x, y, nodes.len() as i32);
                    nodes.push(Node {
                        point: p,
                        h: 0.0,
                        edges: SmallVec::new(),
                    });
                }
            }
        }

        // The goal falls out of scan order: it is simply the last node made.
        let goal_point = nodes[node_count - 1].point;
        for node in &mut nodes {
            node.h = euclidean(node.point, goal_point);
        }

        let mut components: UnionFind<usize> = UnionFind::new(node_count);
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                let source = lookup.get(x, y);
                if source == NO_NODE {
                    continue;
                }
                let source = source as usize;
                for q in nodes[source].point.moore_neighborhood() {
                    // Neighbours of an interior cell are always in bounds.
                    let target = lookup.get(q.x as usize, q.y as usize);
                    if target == NO_NODE {
                        continue;
                    }
                    let target = target as usize;
                    let weight = euclidean(nodes[source].point, q);
                    nodes[source].edges.push(edges.len());
                    edges.push(Edge {
                        source,
                        target,
                        weight,
                    });
                    components.union(source, target);
                }
            }
        }
        info!(
            "Built graph with {} nodes and {} edges",
            node_count, edge_count
        );
        Ok(Graph {
            nodes,
            edges,
            lookup,
            components,
        })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
    pub fn node(&self, ix: usize) -> &Node {
        &self.nodes[ix]
    }
    pub fn edge(&self, ix: usize) -> &Edge {
        &self.edges[ix]
    }
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }
    /// The start node: the first open interior cell in scan order.
    pub fn start(&self) -> usize {
        0
    }
    /// The goal node: the last open interior cell in scan order.
    pub fn goal(&self) -> usize {
        self.nodes.len() - 1
    }
    /// Looks up the node made from the cell at `point`, if any.
    pub fn node_at(&self, point: Point) -> Option<usize> {
        if point.x < 0 || point.y < 0 {
            return None;
        }
        if !self.lookup.index_in_bounds(point.x as usize, point.y as usize) {
            return None;
        }
        match self.lookup.get_point(point) {
            NO_NODE => None,
            ix => Some(ix as usize),
        }
    }
    /// Checks if two nodes are on the same connected component.
    pub fn connected(&self, a: usize, b: usize) -> bool {
        self.components.equiv(a, b)
    }
    /// Runs a full A* search from [start](Self::start) to [goal](Self::goal)
    /// over a fresh [SearchState]. Components are consulted first so an
    /// unreachable goal fails without a search.
    pub fn shortest_path(&self) -> Option<Path> {
        let (start, goal) = (self.start(), self.goal());
        if !self.connected(start, goal) {
            info!("Goal {} is not reachable from start {}", goal, start);
            return None;
        }
        info!("Goal {} is reachable from start {}, searching", goal, start);
        let mut state = SearchState::new(self);
        astar(self, &mut state)
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Nodes:")?;
        for y in 0..self.lookup.height {
            let row = (0..self.lookup.width)
                .map(|x| if self.lookup.get(x, y) == NO_NODE { '#' } else { '.' })
                .collect::<String>();
            writeln!(f, "{}", row)?;
        }
        Ok(())
    }
}
