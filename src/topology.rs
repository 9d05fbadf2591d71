//! Neighbor construction for the supported topologies.
//!
//! Every function here is pure: the same `(topology, num_nodes, index)` always
//! yields the same ordered neighbor list.

use crate::selector;
use crate::types::{NodeId, Topology};

const NEWTON_ITERATIONS: usize = 10;
const NEWTON_TOLERANCE: f64 = 1e-4;

/// Approximates the real cube root of `n` with Newton–Raphson.
fn approx_cbrt(n: f64) -> f64 {
    let mut guess = n / 3.0;
    for _ in 0..NEWTON_ITERATIONS {
        let next = guess - (guess * guess * guess - n) / (3.0 * guess * guess);
        let delta = (next - guess).abs();
        guess = next;
        if delta < NEWTON_TOLERANCE {
            break;
        }
    }
    guess
}

/// Side length of the smallest cube holding `n` cells.
///
/// Satisfies `c³ >= n` and `(c - 1)³ < n` for every `n >= 1`.
pub fn cube_size(n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    let covers = |c: usize| c.checked_pow(3).map_or(true, |v| v >= n);

    let mut c = approx_cbrt(n as f64) as usize;
    // Ten iterations from n/3 can still sit far above the root for large n.
    if c > 1 && covers(c - 1) {
        c = (n as f64).cbrt().round() as usize;
    }
    while !covers(c) {
        c += 1;
    }
    while c > 1 && covers(c - 1) {
        c -= 1;
    }
    c
}

/// Cell coordinates `(x, y, z)` of `index` in a cube of side `side`.
pub fn coordinates(index: NodeId, side: usize) -> (usize, usize, usize) {
    (index % side, (index / side) % side, index / (side * side))
}

/// Neighbors of `index` among `num_nodes` nodes.
pub fn neighbors(topology: Topology, num_nodes: usize, index: NodeId) -> Vec<NodeId> {
    if index >= num_nodes {
        return Vec::new();
    }
    match topology {
        Topology::Full => full(num_nodes, index),
        Topology::Line => line(num_nodes, index),
        Topology::Grid3D => grid_3d(num_nodes, index),
        Topology::ImperfectGrid3D => imperfect_grid_3d(num_nodes, index),
    }
}

fn full(num_nodes: usize, index: NodeId) -> Vec<NodeId> {
    (0..num_nodes).filter(|&j| j != index).collect()
}

fn line(num_nodes: usize, index: NodeId) -> Vec<NodeId> {
    let mut out = Vec::with_capacity(2);
    if index > 0 {
        out.push(index - 1);
    }
    if index + 1 < num_nodes {
        out.push(index + 1);
    }
    out
}

fn grid_3d(num_nodes: usize, index: NodeId) -> Vec<NodeId> {
    let side = cube_size(num_nodes);
    let (x, y, z) = coordinates(index, side);
    let linear = |x: usize, y: usize, z: usize| x + y * side + z * side * side;

    let mut candidates = Vec::with_capacity(6);
    if x > 0 {
        candidates.push(linear(x - 1, y, z));
    }
    if x + 1 < side {
        candidates.push(linear(x + 1, y, z));
    }
    if y > 0 {
        candidates.push(linear(x, y - 1, z));
    }
    if y + 1 < side {
        candidates.push(linear(x, y + 1, z));
    }
    if z > 0 {
        candidates.push(linear(x, y, z - 1));
    }
    if z + 1 < side {
        candidates.push(linear(x, y, z + 1));
    }
    // The last layer may be partially filled.
    candidates.retain(|&j| j < num_nodes);
    candidates
}

/// The extra link an imperfect grid adds for `index`. Never equals `index`.
pub fn extra_link(num_nodes: usize, index: NodeId) -> NodeId {
    let draw = selector::next(num_nodes, index as u64);
    if draw != index {
        draw
    } else if index + 1 < num_nodes {
        index + 1
    } else {
        0
    }
}

fn imperfect_grid_3d(num_nodes: usize, index: NodeId) -> Vec<NodeId> {
    let mut out = grid_3d(num_nodes, index);
    if num_nodes > 1 {
        out.push(extra_link(num_nodes, index));
    }
    out
}
