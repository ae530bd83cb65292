// THEORY:
// The boundary tracer turns a set of electrodes (one cluster) into the ordered
// outline polygon of their cells. It is a directed wall-following walk: a
// walker stands in a member cell facing one of the four cardinal headings and
// keeps the outside of the zone on its right, so the outline comes out
// counter-clockwise.
//
// Key architectural principles & algorithm steps:
// 1.  **Anchored Start**: The walk starts at the member with the smallest
//     `(x, y)`, facing south. Nothing can lie west or south of it, so its
//     bottom-left corner is always the first vertex emitted.
// 2.  **Transition Priority**: From state `(cell, heading)` the walker tries, in
//     order: turn right (toward the outside), go straight, turn left, and
//     finally turn back in place. Only turns emit vertices; straight runs are
//     collapsed into one edge.
// 3.  **Corner Bookkeeping**: A right turn emits the back-right corner of the
//     current cell, a left turn emits its front-right corner, and a turn back
//     is two left turns in place. Every emitted vertex is therefore one of the
//     diagonal corner codes 1, 3, 5, 7.
// 4.  **Exact Termination**: The walk stops the moment the start state recurs.
//     There are only `4·n` states, so a walk that runs longer than that is
//     reported as an error instead of looping forever.
// 5.  **Outer Outline Only**: The walk follows the 4-connected component of the
//     start cell and traces its outer boundary. Holes are not subtracted.

use crate::core_modules::blueprint::Category;
use crate::core_modules::clustering_edges::{ClusteringEdges, Corner, CornerCode};
use crate::core_modules::electrode_grid::{Direction, GridLookup};

pub mod boundary_tracer {
    use super::*; // Make types from parent module available.
    use crate::error::{BlueprintError, BlueprintResult};
    use std::collections::HashSet;
    use tracing::trace;

    /// Reusable tracer. The membership set keeps its allocation between
    /// clusters, so size it for the largest cluster you expect.
    #[derive(Debug, Default)]
    pub struct BoundaryTracer {
        zone: HashSet<usize>,
    }

    impl BoundaryTracer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_capacity(capacity: usize) -> Self {
            Self {
                zone: HashSet::with_capacity(capacity),
            }
        }

        /// Outline of the cluster made of `members`, labelled `category`.
        ///
        /// A single member yields its four cell corners. Members must be valid
        /// indices on one shank.
        pub fn trace<G: GridLookup + ?Sized>(
            &mut self,
            grid: &G,
            members: &[usize],
            category: Category,
        ) -> BlueprintResult<ClusteringEdges> {
            // --- 1. Validation ---
            let Some(&first) = members.first() else {
                return Err(BlueprintError::EmptyCluster);
            };
            let len = grid.len();
            if let Some(&index) = members.iter().find(|&&i| i >= len) {
                return Err(BlueprintError::IndexOutOfRange { index, len });
            }
            let shank = grid.electrode(first).shank;
            if let Some(other) = members
                .iter()
                .map(|&i| grid.electrode(i).shank)
                .find(|&s| s != shank)
            {
                return Err(BlueprintError::MixedShanks { first: shank, second: other });
            }

            let (dx, dy) = grid.pitch(shank);
            let pitch = (dx as f64, dy as f64);

            if members.len() == 1 {
                let e = grid.electrode(first);
                return Ok(ClusteringEdges::point(category, shank, pitch, e.x as f64, e.y as f64));
            }

            // --- 2. Walk ---
            self.zone.clear();
            self.zone.extend(members.iter().copied());

            let start = members
                .iter()
                .copied()
                .min_by_key(|&i| {
                    let e = grid.electrode(i);
                    (e.x, e.y)
                })
                .unwrap_or(first);

            let corners = self.walk(grid, start, members.len())?;
            trace!(
                shank,
                category,
                members = members.len(),
                vertices = corners.len(),
                "traced cluster outline"
            );
            Ok(ClusteringEdges::new(category, shank, pitch, corners))
        }

        fn walk<G: GridLookup + ?Sized>(&self, grid: &G, start: usize, members: usize) -> BlueprintResult<Vec<Corner>> {
            let cap = 4 * members + 4;
            let corner_of = |cell: usize, code: u8| {
                let e = grid.electrode(cell);
                // codes produced by `front_right`/`back_right` are always 0..8
                let code = CornerCode::new(code).unwrap_or(CornerCode::DISPLACED);
                Corner::new(e.x as f64, e.y as f64, code)
            };
            let step_into = |cell: usize, heading: Direction| {
                grid.neighbor(cell, heading).filter(|j| self.zone.contains(j))
            };

            let home = (start, Direction::South);
            let (mut cell, mut heading) = home;
            let mut corners = Vec::new();
            let mut steps = 0;

            loop {
                steps += 1;
                if steps > cap {
                    return Err(BlueprintError::UnclosedBoundary { steps: cap });
                }

                let right = heading.turn_right();
                let left = heading.turn_left();
                if let Some(next) = step_into(cell, right) {
                    corners.push(corner_of(cell, back_right(heading)));
                    cell = next;
                    heading = right;
                } else if let Some(next) = step_into(cell, heading) {
                    cell = next;
                } else if let Some(next) = step_into(cell, left) {
                    corners.push(corner_of(cell, front_right(heading)));
                    cell = next;
                    heading = left;
                } else {
                    // dead end: two left turns in place
                    corners.push(corner_of(cell, front_right(heading)));
                    heading = left;
                    if (cell, heading) == home {
                        break;
                    }
                    corners.push(corner_of(cell, front_right(heading)));
                    heading = heading.turn_left();
                }

                if (cell, heading) == home {
                    break;
                }
            }
            Ok(corners)
        }
    }

    /// Convenience wrapper around a one-shot [`BoundaryTracer`].
    pub fn trace<G: GridLookup + ?Sized>(
        grid: &G,
        members: &[usize],
        category: Category,
    ) -> BlueprintResult<ClusteringEdges> {
        BoundaryTracer::with_capacity(members.len()).trace(grid, members, category)
    }

    /// Corner code ahead and to the right of a walker facing `heading`.
    fn front_right(heading: Direction) -> u8 {
        (heading.code() + 7) % 8
    }

    /// Corner code behind and to the right of a walker facing `heading`.
    fn back_right(heading: Direction) -> u8 {
        (heading.code() + 5) % 8
    }
}

#[cfg(test)]
mod tests {
    use super::boundary_tracer::{BoundaryTracer, trace};
    use super::*;
    use crate::core_modules::electrode_grid::ElectrodeGrid;
    use crate::error::BlueprintError;

    fn at(grid: &ElectrodeGrid, cells: &[(i32, i32)]) -> Vec<usize> {
        cells
            .iter()
            .map(|&(x, y)| grid.index_of(0, x, y).expect("cell on grid"))
            .collect()
    }

    fn outline(edges: &ClusteringEdges) -> Vec<(f64, f64, u8)> {
        edges.edges.iter().map(|c| (c.x, c.y, c.corner.value())).collect()
    }

    #[test]
    fn plus_sign_has_twelve_vertices() {
        let grid = ElectrodeGrid::rectangular(1, 3, 3, 1, 1);
        let members = at(&grid, &[(1, 1), (1, 0), (1, 2), (0, 1), (2, 1)]);
        let edges = trace(&grid, &members, 1).expect("plus traces");

        assert_eq!(edges.len(), 12);
        assert_eq!(edges.area().unwrap(), 5.0);
        assert_eq!(
            outline(&edges),
            vec![
                (0.0, 1.0, 5),
                (1.0, 1.0, 5),
                (1.0, 0.0, 5),
                (1.0, 0.0, 7),
                (1.0, 1.0, 7),
                (2.0, 1.0, 7),
                (2.0, 1.0, 1),
                (1.0, 1.0, 1),
                (1.0, 2.0, 1),
                (1.0, 2.0, 3),
                (1.0, 1.0, 3),
                (0.0, 1.0, 3),
            ]
        );
    }

    #[test]
    fn single_electrode_is_its_cell() {
        let grid = ElectrodeGrid::rectangular(1, 2, 2, 10, 20);
        let edges = trace(&grid, &[3], 4).expect("single traces");
        let codes: Vec<u8> = edges.edges.iter().map(|c| c.corner.value()).collect();
        assert_eq!(codes, vec![5, 7, 1, 3]);
        assert_eq!(edges.area().unwrap(), 200.0);
        assert_eq!(edges.category, 4);
    }

    #[test]
    fn bar_collapses_straight_runs() {
        let grid = ElectrodeGrid::rectangular(1, 1, 3, 1, 1);
        let edges = trace(&grid, &[2, 0, 1], 1).expect("bar traces");
        assert_eq!(
            outline(&edges),
            vec![(0.0, 0.0, 5), (2.0, 0.0, 7), (2.0, 0.0, 1), (0.0, 0.0, 3)]
        );
        assert_eq!(edges.area().unwrap(), 3.0);
    }

    #[test]
    fn l_shape_outline() {
        let grid = ElectrodeGrid::rectangular(1, 2, 2, 1, 1);
        let members = at(&grid, &[(0, 0), (1, 0), (0, 1)]);
        let edges = trace(&grid, &members, 2).expect("L traces");
        assert_eq!(edges.len(), 6);
        assert_eq!(edges.area().unwrap(), 3.0);
        assert_eq!(edges.convex().area().unwrap(), 4.0);
        assert_eq!(edges.edges[0].corner, CornerCode::SOUTH_WEST);
    }

    #[test]
    fn ring_traces_outer_boundary() {
        let grid = ElectrodeGrid::rectangular(1, 3, 3, 1, 1);
        let members: Vec<usize> = (0..9).filter(|&i| i != 4).collect();
        let edges = trace(&grid, &members, 1).expect("ring traces");
        assert_eq!(edges.len(), 4);
        assert_eq!(edges.area().unwrap(), 9.0);
    }

    #[test]
    fn physical_pitch_scales_outline() {
        let grid = ElectrodeGrid::rectangular(1, 2, 2, 16, 20);
        let edges = trace(&grid, &[0, 1, 2, 3], 1).expect("block traces");
        assert_eq!(edges.len(), 4);
        assert_eq!(edges.area().unwrap(), 4.0 * 16.0 * 20.0);
        assert_eq!(edges.vertices()[0], (-8.0, -10.0));
    }

    #[test]
    fn rejects_bad_member_lists() {
        let grid = ElectrodeGrid::rectangular(2, 2, 2, 1, 1);
        assert_eq!(trace(&grid, &[], 1).unwrap_err(), BlueprintError::EmptyCluster);
        assert_eq!(
            trace(&grid, &[0, 99], 1).unwrap_err(),
            BlueprintError::IndexOutOfRange { index: 99, len: 8 }
        );
        assert_eq!(
            trace(&grid, &[0, 4], 1).unwrap_err(),
            BlueprintError::MixedShanks { first: 0, second: 1 }
        );
    }

    #[test]
    fn tracer_is_reusable() {
        let grid = ElectrodeGrid::rectangular(1, 3, 3, 1, 1);
        let mut tracer = BoundaryTracer::with_capacity(9);
        let a = tracer.trace(&grid, &[0, 1], 1).expect("first");
        let b = tracer.trace(&grid, &[6, 7, 8], 1).expect("second");
        assert_eq!(a.area().unwrap(), 2.0);
        assert_eq!(b.area().unwrap(), 3.0);
    }
}
