use grid_astar::Graph;
use grid_util::grid::{BoolGrid, Grid};

// In this example a path is found on a 10x10 map whose border counts as
// blocked no matter what, so only the 8x8 interior is walkable. '#' marks an
// obstacle. The start is the first open interior cell in row-major order
// (top-left area) and the goal the last one (bottom-right area).

const MAP: [&str; 10] = [
    "##########",
    "#........#",
    "#..####..#",
    "#..#..#..#",
    "#..#..#..#",
    "#..####..#",
    "#........#",
    "#..####..#",
    "#........#",
    "##########",
];

fn main() {
    let mut grid = BoolGrid::new(10, 10, false);
    for (y, row) in MAP.iter().enumerate() {
        for (x, cell) in row.chars().enumerate() {
            grid.set(x, y, cell == '#');
        }
    }
    let graph = Graph::from_grid(&grid).expect("map has open interior cells");
    println!("{}", graph);
    match graph.shortest_path() {
        Some(path) => {
            println!("Path of cost {:.3}:", path.cost);
            // The path comes back goal-first; print it start to goal.
            for &ix in path.nodes.iter().rev() {
                let p = graph.node(ix).point;
                println!("({}, {})", p.x, p.y);
            }
        }
        None => println!("IMPOSSIBLE"),
    }
}
