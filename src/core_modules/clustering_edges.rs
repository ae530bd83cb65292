// THEORY:
// `ClusteringEdges` is the polygon form of one cluster. Where `Clustering`
// answers "which electrodes belong together?", this answers "what shape do they
// make?", in physical length units, ready for rendering and hit-testing.
//
// Key architectural principles:
// 1.  **Corner-Coded Vertices**: A vertex is stored as the centre of an
//     electrode cell plus a corner code naming which corner (or edge midpoint)
//     of that cell is meant. The real coordinate is only resolved when needed,
//     using the half pitch captured at construction. Code 8 marks a vertex that
//     is already a plain coordinate.
// 2.  **Implicit Closure**: The last vertex connects back to the first.
//     Traced outlines wind counter-clockwise, so their signed area is positive.
// 3.  **Value Semantics**: Every polygon operation (`convex`, `set_corner`,
//     `offset`, simplification) returns a new polygon. A traced outline can be
//     shared freely between readers.

use crate::core_modules::blueprint::Category;
use crate::core_modules::electrode_grid::{Direction, Shank};
use crate::error::{BlueprintError, BlueprintResult};
use serde::{Deserialize, Serialize};

/// Position code of a vertex inside its electrode cell:
///
/// ```text
/// 3 2 1
/// 4 8 0
/// 5 6 7
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CornerCode(u8);

impl CornerCode {
    pub const EAST: CornerCode = CornerCode(0);
    pub const NORTH_EAST: CornerCode = CornerCode(1);
    pub const NORTH: CornerCode = CornerCode(2);
    pub const NORTH_WEST: CornerCode = CornerCode(3);
    pub const WEST: CornerCode = CornerCode(4);
    pub const SOUTH_WEST: CornerCode = CornerCode(5);
    pub const SOUTH: CornerCode = CornerCode(6);
    pub const SOUTH_EAST: CornerCode = CornerCode(7);
    /// Already displaced; the stored coordinate is used verbatim.
    pub const DISPLACED: CornerCode = CornerCode(8);

    pub fn new(code: u8) -> Option<CornerCode> {
        (code <= 8).then_some(CornerCode(code))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_displaced(self) -> bool {
        self.0 == 8
    }

    /// One of the four cell corners (1, 3, 5, 7).
    pub fn is_diagonal(self) -> bool {
        self.0 % 2 == 1
    }

    pub fn direction(self) -> Option<Direction> {
        Direction::from_code(self.0)
    }
}

impl From<Direction> for CornerCode {
    fn from(direction: Direction) -> Self {
        CornerCode(direction.code())
    }
}

/// One polygon vertex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Corner {
    /// Cell centre x, or the vertex itself when `corner` is displaced.
    pub x: f64,
    /// Cell centre y, or the vertex itself when `corner` is displaced.
    pub y: f64,
    pub corner: CornerCode,
}

impl Corner {
    pub fn new(x: f64, y: f64, corner: CornerCode) -> Self {
        Self { x, y, corner }
    }

    pub fn displaced(x: f64, y: f64) -> Self {
        Self::new(x, y, CornerCode::DISPLACED)
    }
}

/// 2D affine map `(x, y) -> (a·x + b·y + tx, c·x + d·y + ty)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Affine {
    pub const IDENTITY: Affine = Affine { a: 1.0, b: 0.0, c: 0.0, d: 1.0, tx: 0.0, ty: 0.0 };

    pub fn scale(sx: f64, sy: f64) -> Self {
        Affine { a: sx, d: sy, ..Self::IDENTITY }
    }

    pub fn translate(tx: f64, ty: f64) -> Self {
        Affine { tx, ty, ..Self::IDENTITY }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (self.a * x + self.b * y + self.tx, self.c * x + self.d * y + self.ty)
    }
}

/// Ordered boundary polygon of one cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringEdges {
    /// Category shared by the cluster.
    pub category: Category,
    /// Shank the cluster lives on.
    pub shank: Shank,
    /// Column pitch used to resolve corner codes.
    pub dx: f64,
    /// Row pitch used to resolve corner codes.
    pub dy: f64,
    /// Vertices in walk order, implicitly closed.
    pub edges: Vec<Corner>,
}

impl ClusteringEdges {
    pub fn new(category: Category, shank: Shank, pitch: (f64, f64), edges: Vec<Corner>) -> Self {
        Self {
            category,
            shank,
            dx: pitch.0,
            dy: pitch.1,
            edges,
        }
    }

    /// The cell outline of a single electrode: its four corners, counter-clockwise
    /// from the bottom-left.
    pub fn point(category: Category, shank: Shank, pitch: (f64, f64), x: f64, y: f64) -> Self {
        let edges = [
            CornerCode::SOUTH_WEST,
            CornerCode::SOUTH_EAST,
            CornerCode::NORTH_EAST,
            CornerCode::NORTH_WEST,
        ]
        .into_iter()
        .map(|code| Corner::new(x, y, code))
        .collect();
        Self::new(category, shank, pitch, edges)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn pitch(&self) -> (f64, f64) {
        (self.dx, self.dy)
    }

    pub fn with_category(&self, category: Category) -> Self {
        Self { category, ..self.clone() }
    }

    pub fn with_shank(&self, shank: Shank) -> Self {
        Self { shank, ..self.clone() }
    }

    fn with_edges(&self, edges: Vec<Corner>) -> Self {
        Self::new(self.category, self.shank, self.pitch(), edges)
    }

    /// Raw x of every vertex (cell centres for undisplaced codes).
    pub fn xs(&self) -> Vec<f64> {
        self.edges.iter().map(|c| c.x).collect()
    }

    pub fn ys(&self) -> Vec<f64> {
        self.edges.iter().map(|c| c.y).collect()
    }

    /// Physical coordinate of one vertex.
    pub fn resolve(&self, corner: &Corner) -> (f64, f64) {
        match corner.corner.direction() {
            Some(direction) => {
                let (ox, oy) = direction.offset();
                (
                    corner.x + ox as f64 * self.dx / 2.0,
                    corner.y + oy as f64 * self.dy / 2.0,
                )
            }
            None => (corner.x, corner.y),
        }
    }

    /// Physical coordinates of every vertex, in walk order.
    pub fn vertices(&self) -> Vec<(f64, f64)> {
        self.edges.iter().map(|c| self.resolve(c)).collect()
    }

    /// Signed shoelace area. Counter-clockwise outlines are positive. A
    /// polygon without vertices has no area and is rejected.
    pub fn area(&self) -> BlueprintResult<f64> {
        let v = self.vertices();
        let n = v.len();
        if n == 0 {
            return Err(BlueprintError::EmptyPolygon);
        }
        let twice: f64 = (0..n)
            .map(|i| {
                let (x0, y0) = v[i];
                let (x1, y1) = v[(i + 1) % n];
                x0 * y1 - x1 * y0
            })
            .sum();
        Ok(twice / 2.0)
    }

    /// Axis-aligned bounding rectangle of the vertices, as four displaced
    /// corners counter-clockwise from the bottom-left.
    pub fn convex(&self) -> Self {
        let v = self.vertices();
        if v.is_empty() {
            return self.clone();
        }
        let (mut x0, mut y0, mut x1, mut y1) = (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for (x, y) in v {
            x0 = x0.min(x);
            y0 = y0.min(y);
            x1 = x1.max(x);
            y1 = y1.max(y);
        }
        self.with_edges(vec![
            Corner::displaced(x0, y0),
            Corner::displaced(x1, y0),
            Corner::displaced(x1, y1),
            Corner::displaced(x0, y1),
        ])
    }

    /// Even-odd ray casting. Points exactly on an edge may land either way.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let v = self.vertices();
        let n = v.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = v[i];
            let (xj, yj) = v[j];
            if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    /// Keeps the four cell corners, pushes each outward by `(dx, dy)` along its
    /// own diagonal and marks it displaced. Edge-midpoint codes are dropped;
    /// vertices that are already displaced pass through unchanged.
    pub fn set_corner(&self, dx: f64, dy: f64) -> BlueprintResult<Self> {
        if dx < 0.0 || dy < 0.0 {
            return Err(BlueprintError::InvalidArgument(format!(
                "corner displacement must be non-negative, got ({dx}, {dy})"
            )));
        }
        Ok(self.set_corner_each([(dx, dy), (-dx, dy), (-dx, -dy), (dx, -dy)]))
    }

    /// Displaces corners 1, 3, 5, 7 by the four given offsets, in that order.
    pub fn set_corner_each(&self, offsets: [(f64, f64); 4]) -> Self {
        let edges = self
            .edges
            .iter()
            .filter_map(|c| {
                let code = c.corner.value();
                if c.corner.is_displaced() {
                    Some(*c)
                } else if c.corner.is_diagonal() {
                    let (ox, oy) = offsets[(code / 2) as usize];
                    Some(Corner::displaced(c.x + ox, c.y + oy))
                } else {
                    None
                }
            })
            .collect();
        self.with_edges(edges)
    }

    /// Drops notch vertices: a vertex whose code matches both the last kept
    /// vertex and the next one, with both legs no longer than `(tx, ty)`.
    pub fn small_corner_removing(&self, tx: f64, ty: f64) -> Self {
        let n = self.edges.len();
        if n < 4 {
            return self.clone();
        }
        let within = |a: &Corner, b: &Corner| (a.x - b.x).abs() <= tx && (a.y - b.y).abs() <= ty;

        let mut kept: Vec<Corner> = Vec::with_capacity(n);
        kept.push(self.edges[0]);
        for i in 1..n {
            let b = self.edges[i];
            let c = if i + 1 < n { self.edges[i + 1] } else { kept[0] };
            let a = kept[kept.len() - 1];
            let notch = a.corner == b.corner && b.corner == c.corner && within(&a, &b) && within(&b, &c);
            if !notch {
                kept.push(b);
            }
        }
        self.with_edges(kept)
    }

    /// Translation that keeps corner codes.
    pub fn offset(&self, x: f64, y: f64) -> Self {
        self.with_edges(
            self.edges
                .iter()
                .map(|c| Corner::new(c.x + x, c.y + y, c.corner))
                .collect(),
        )
    }

    /// Applies `t` to the resolved vertices. The result is fully displaced.
    pub fn transform(&self, t: &Affine) -> Self {
        self.map(|x, y| t.apply(x, y))
    }

    /// Applies `f` to the resolved vertices. The result is fully displaced.
    pub fn map(&self, f: impl Fn(f64, f64) -> (f64, f64)) -> Self {
        self.with_edges(
            self.vertices()
                .into_iter()
                .map(|(x, y)| {
                    let (x, y) = f(x, y);
                    Corner::displaced(x, y)
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corners(raw: &[(f64, f64, u8)]) -> Vec<Corner> {
        raw.iter()
            .map(|&(x, y, c)| Corner::new(x, y, CornerCode::new(c).expect("valid corner code")))
            .collect()
    }

    #[test]
    fn point_polygon_is_unit_cell() {
        let p = ClusteringEdges::point(1, 0, (2.0, 4.0), 10.0, 20.0);
        assert_eq!(p.len(), 4);
        assert_eq!(p.area().unwrap(), 8.0);
        assert_eq!(p.vertices()[0], (9.0, 18.0));
        assert!(p.contains(10.0, 20.0));
        assert!(!p.contains(12.0, 20.0));
    }

    #[test]
    fn convex_bounds_an_l_shape() {
        // L of three unit cells: (0,0), (1,0), (0,1)
        let l = ClusteringEdges::new(
            2,
            0,
            (1.0, 1.0),
            corners(&[
                (0.0, 0.0, 5),
                (1.0, 0.0, 7),
                (1.0, 0.0, 1),
                (0.0, 1.0, 7),
                (0.0, 1.0, 1),
                (0.0, 1.0, 3),
            ]),
        );
        assert_eq!(l.area().unwrap(), 3.0);
        assert!(!l.contains(1.0, 1.0));

        let bounds = l.convex();
        assert_eq!(bounds.area().unwrap(), 4.0);
        assert!(bounds.contains(1.0, 1.0));
        assert!(bounds.edges.iter().all(|c| c.corner.is_displaced()));
        assert_eq!(bounds.vertices()[0], (-0.5, -0.5));
    }

    #[test]
    fn clockwise_area_is_negative() {
        let p = ClusteringEdges::point(1, 0, (1.0, 1.0), 0.0, 0.0);
        let mut reversed = p.clone();
        reversed.edges.reverse();
        assert_eq!(reversed.area().unwrap(), -p.area().unwrap());
    }

    #[test]
    fn empty_polygon_has_no_area() {
        let empty = ClusteringEdges::new(1, 0, (1.0, 1.0), Vec::new());
        assert_eq!(empty.area(), Err(BlueprintError::EmptyPolygon));

        // edge midpoints only: set_corner drops every vertex
        let mids = ClusteringEdges::new(1, 0, (1.0, 1.0), corners(&[(0.0, 0.0, 0), (0.0, 0.0, 6)]));
        let aligned = mids.set_corner(0.5, 0.5).unwrap();
        assert!(aligned.is_empty());
        assert_eq!(aligned.area(), Err(BlueprintError::EmptyPolygon));
    }

    #[test]
    fn set_corner_displaces_diagonals_only() {
        let p = ClusteringEdges::new(
            1,
            0,
            (2.0, 2.0),
            corners(&[(0.0, 0.0, 5), (0.0, 0.0, 6), (4.0, 0.0, 1), (9.0, 9.0, 8)]),
        );
        let q = p.set_corner(1.0, 0.5).unwrap();
        assert_eq!(q.vertices(), vec![(-1.0, -0.5), (5.0, 0.5), (9.0, 9.0)]);
        assert!(p.set_corner(-1.0, 0.0).is_err());

        let each = p.set_corner_each([(1.0, 1.0), (0.0, 0.0), (0.0, 0.0), (0.0, 0.0)]);
        assert_eq!(each.vertices()[1], (5.0, 1.0));
    }

    #[test]
    fn half_pitch_set_corner_matches_resolved_outline() {
        let p = ClusteringEdges::point(1, 0, (2.0, 2.0), 3.0, 3.0);
        let q = p.set_corner(1.0, 1.0).unwrap();
        assert_eq!(p.vertices(), q.vertices());
    }

    #[test]
    fn small_corner_removing_flattens_staircase() {
        // outline of a 4-4-2 diamond, starting at the bottom-left of (1, 2)
        let diamond = ClusteringEdges::new(
            1,
            0,
            (1.0, 1.0),
            corners(&[
                (1.0, 2.0, 5),
                (2.0, 2.0, 5),
                (2.0, 1.0, 5),
                (3.0, 1.0, 7),
                (3.0, 2.0, 7),
                (4.0, 2.0, 7),
                (4.0, 3.0, 1),
                (3.0, 3.0, 1),
                (3.0, 4.0, 1),
                (2.0, 4.0, 3),
                (2.0, 3.0, 3),
                (1.0, 3.0, 3),
            ]),
        );
        let simplified = diamond.small_corner_removing(1.0, 1.0);
        assert_eq!(
            simplified.edges,
            corners(&[
                (1.0, 2.0, 5),
                (2.0, 1.0, 5),
                (3.0, 1.0, 7),
                (4.0, 2.0, 7),
                (4.0, 3.0, 1),
                (3.0, 4.0, 1),
                (2.0, 4.0, 3),
                (1.0, 3.0, 3),
            ])
        );
        // nothing is within a zero tolerance
        assert_eq!(diamond.small_corner_removing(0.0, 0.0), diamond);
    }

    #[test]
    fn offset_keeps_codes_and_transform_displaces() {
        let p = ClusteringEdges::point(1, 0, (1.0, 1.0), 0.0, 0.0);
        let moved = p.offset(3.0, -1.0);
        assert_eq!(moved.edges[0].corner, CornerCode::SOUTH_WEST);
        assert_eq!(moved.vertices()[0], (2.5, -1.5));

        let scaled = p.transform(&Affine::scale(2.0, 2.0));
        assert!(scaled.edges.iter().all(|c| c.corner.is_displaced()));
        assert_eq!(scaled.area().unwrap(), 4.0);

        let shifted = p.map(|x, y| (x + 1.0, y));
        assert_eq!(shifted.vertices()[0], (0.5, -0.5));
        assert_eq!(shifted.with_category(7).category, 7);
    }
}
