//! Best-first grid search used to plan single-agent paths.

use std::{cmp::Ordering, collections::BinaryHeap};

use kinetic_grid_core::{CellCoord, GridDimensions};

/// Plans a 4-connected path from `start` to `goal` that avoids blocked cells.
///
/// Open entries are ordered by `steps + manhattan(cell, goal)` with ties broken
/// in insertion order. A cell is closed the first time it is popped and never
/// reconsidered, so rediscovering a cell through a cheaper route does not
/// update its parent. The start cell is never tested against `is_blocked`.
///
/// The returned path includes both `start` and `goal`. `None` indicates that
/// the goal is unreachable or lies outside the grid.
#[must_use]
pub fn find_path<F>(
    grid: GridDimensions,
    start: CellCoord,
    goal: CellCoord,
    mut is_blocked: F,
) -> Option<Vec<CellCoord>>
where
    F: FnMut(CellCoord) -> bool,
{
    if start == goal {
        return Some(vec![start]);
    }

    let mut closed = vec![false; grid.cell_count()];
    let mut nodes: Vec<SearchNode> = Vec::new();
    let mut open = BinaryHeap::new();

    nodes.push(SearchNode {
        cell: start,
        steps: 0,
        parent: None,
    });
    open.push(OpenEntry {
        estimate: start.manhattan_distance(goal),
        node: 0,
    });

    while let Some(entry) = open.pop() {
        let Some(&current) = nodes.get(entry.node) else {
            continue;
        };

        if current.cell == goal {
            return Some(reconstruct(&nodes, entry.node));
        }

        if let Some(index) = grid.index(current.cell) {
            if closed[index] {
                continue;
            }
            closed[index] = true;
        }

        for neighbor in current.cell.neighbors() {
            let Some(index) = grid.index(neighbor) else {
                continue;
            };
            if closed[index] || is_blocked(neighbor) {
                continue;
            }

            let steps = current.steps + 1;
            nodes.push(SearchNode {
                cell: neighbor,
                steps,
                parent: Some(entry.node),
            });
            open.push(OpenEntry {
                estimate: steps + neighbor.manhattan_distance(goal),
                node: nodes.len() - 1,
            });
        }
    }

    None
}

#[derive(Clone, Copy, Debug)]
struct SearchNode {
    cell: CellCoord,
    steps: u32,
    parent: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct OpenEntry {
    estimate: u32,
    node: usize,
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the max-heap pops the lowest estimate, oldest entry first.
        other
            .estimate
            .cmp(&self.estimate)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn reconstruct(nodes: &[SearchNode], mut index: usize) -> Vec<CellCoord> {
    let mut path = Vec::new();
    loop {
        let Some(node) = nodes.get(index) else {
            break;
        };
        path.push(node.cell);
        match node.parent {
            Some(parent) => index = parent,
            None => break,
        }
    }
    path.reverse();
    path
}
