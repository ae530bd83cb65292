// THEORY:
// The `BlueprintEditor` is the orchestration layer. It composes clustering,
// boundary tracing and polygon operations into the bulk edits a user actually
// asks for: outline the zones, fill them in, shift them along the shank, grow
// them or shrink them.
//
// Key architectural principles:
// 1.  **Borrowed Session**: An editor borrows one `Blueprint` mutably for the
//     length of an editing session. There is no back-reference from the
//     blueprint to its tools, and no other writer can exist meanwhile.
// 2.  **Snapshot then Write Once**: Every edit reads a copy of the categories,
//     computes the complete result against that copy and writes it back in a
//     single `apply`. An edit that fails validation leaves the blueprint as it
//     was.
// 3.  **Grid-Relative Steps**: Moves, growth and erosion are expressed in grid
//     steps, turned into physical offsets with the pitch of the electrode's own
//     shank.
// 4.  **Zones by Area**: Thresholds compare physical areas. For fill this is
//     the area of the zone's bounding rectangle; for extend, reduce and
//     remove_zones it is the cell area of the zone (`count · dx · dy`).

use crate::config::EditorConfig;
use crate::core_modules::blueprint::{Blueprint, Category, ElectrodeSelector, UNSET};
use crate::core_modules::boundary_tracer::boundary_tracer::BoundaryTracer;
use crate::core_modules::clustering::{CategoryFilter, Clustering, Connectivity};
use crate::core_modules::clustering_edges::{ClusteringEdges, Corner, CornerCode};
use crate::core_modules::electrode_grid::{Direction, GridLookup, Shank};
use crate::core_modules::electrode_mask::ElectrodeMask;
use crate::error::{BlueprintError, BlueprintResult, check_len};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// Inclusive range of accepted zone areas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaThreshold {
    pub lower: f64,
    pub upper: f64,
}

impl AreaThreshold {
    /// Accepts every area.
    pub const ALL: AreaThreshold = AreaThreshold {
        lower: 0.0,
        upper: f64::INFINITY,
    };

    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Areas `>= lower`.
    pub fn at_least(lower: f64) -> Self {
        Self::new(lower, f64::INFINITY)
    }

    /// Areas `<= upper`.
    pub fn at_most(upper: f64) -> Self {
        Self::new(0.0, upper)
    }

    pub fn test(&self, area: f64) -> bool {
        self.lower <= area && area <= self.upper
    }
}

impl Default for AreaThreshold {
    fn default() -> Self {
        Self::ALL
    }
}

/// Grid-step translation. `x` counts columns east, `y` counts rows north.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Movement {
    pub x: i32,
    pub y: i32,
}

impl Movement {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Rows only, the usual way zones slide along a shank.
    pub fn rows(y: i32) -> Self {
        Self { x: 0, y }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0 && self.y == 0
    }
}

/// Per-side grid step counts for extend and reduce. `up` is `+y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AreaChange {
    pub up: u32,
    pub down: u32,
    pub left: u32,
    pub right: u32,
}

impl AreaChange {
    pub fn new(up: u32, down: u32, left: u32, right: u32) -> Self {
        Self { up, down, left, right }
    }

    /// `n` rows up and down.
    pub fn uniform_rows(n: u32) -> Self {
        Self::new(n, n, 0, 0)
    }

    /// `x` columns on both sides and `y` rows on both sides.
    pub fn symmetric(x: u32, y: u32) -> Self {
        Self::new(y, y, x, x)
    }

    pub fn is_zero(&self) -> bool {
        self.up == 0 && self.down == 0 && self.left == 0 && self.right == 0
    }

    /// Swaps up with down and left with right.
    pub fn invert(&self) -> Self {
        Self::new(self.down, self.up, self.right, self.left)
    }

    /// Every offset of the change rectangle, row by row from the bottom-left,
    /// including the zero offset.
    pub fn offsets(&self) -> Vec<Movement> {
        let (left, right) = (self.left as i32, self.right as i32);
        let (down, up) = (self.down as i32, self.up as i32);
        (-down..=up)
            .flat_map(|y| (-left..=right).map(move |x| Movement::new(x, y)))
            .collect()
    }
}

/// Traces the outlines of one group. A group whose members fall apart into
/// several 4-connected pieces (only produced by the clustering fast path, on
/// multi-shank or gapped layouts) yields one outline per piece, ordered by
/// shank and then by smallest member index.
pub fn outline_group<G: GridLookup + ?Sized>(
    tracer: &mut BoundaryTracer,
    grid: &G,
    categories: &[Category],
    members: &[usize],
    small_corner_tolerance: Option<(f64, f64)>,
) -> BlueprintResult<Vec<ClusteringEdges>> {
    if members.is_empty() {
        return Err(BlueprintError::EmptyCluster);
    }
    let len = grid.len();
    if let Some(&index) = members.iter().find(|&&i| i >= len) {
        return Err(BlueprintError::IndexOutOfRange { index, len });
    }

    let mut out = Vec::new();
    for part in split_by_shank(grid, members).into_values() {
        for piece in connected_pieces(grid, &part) {
            let category = categories[piece[0]];
            let mut edges = tracer.trace(grid, &piece, category)?;
            if piece.len() > 1 {
                if let Some((tx, ty)) = small_corner_tolerance {
                    edges = edges.small_corner_removing(tx, ty);
                }
            }
            out.push(edges);
        }
    }
    Ok(out)
}

/// Splits one shank's members into 4-connected pieces by flood fill.
fn connected_pieces<G: GridLookup + ?Sized>(grid: &G, members: &[usize]) -> Vec<Vec<usize>> {
    let mut remaining: HashSet<usize> = members.iter().copied().collect();
    let mut seeds = members.to_vec();
    seeds.sort_unstable();

    let mut pieces = Vec::new();
    let mut stack = Vec::new();
    for seed in seeds {
        if !remaining.remove(&seed) {
            continue;
        }
        let mut piece = vec![seed];
        stack.push(seed);
        while let Some(i) = stack.pop() {
            for &direction in &Direction::CARDINAL {
                if let Some(j) = grid.neighbor(i, direction) {
                    if remaining.remove(&j) {
                        piece.push(j);
                        stack.push(j);
                    }
                }
            }
        }
        piece.sort_unstable();
        pieces.push(piece);
    }
    pieces
}

fn split_by_shank<G: GridLookup + ?Sized>(grid: &G, members: &[usize]) -> BTreeMap<Shank, Vec<usize>> {
    let mut parts: BTreeMap<Shank, Vec<usize>> = BTreeMap::new();
    for &i in members {
        parts.entry(grid.electrode(i).shank).or_default().push(i);
    }
    parts
}

/// One editing session over a borrowed blueprint.
pub struct BlueprintEditor<'a> {
    blueprint: &'a mut Blueprint,
    config: EditorConfig,
}

impl<'a> BlueprintEditor<'a> {
    pub fn new(blueprint: &'a mut Blueprint) -> Self {
        Self::with_config(blueprint, EditorConfig::default())
    }

    pub fn with_config(blueprint: &'a mut Blueprint, config: EditorConfig) -> Self {
        Self { blueprint, config }
    }

    pub fn blueprint(&self) -> &Blueprint {
        &*self.blueprint
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn find_clustering(&self, filter: CategoryFilter, connectivity: Connectivity) -> BlueprintResult<Clustering> {
        Clustering::find(
            self.blueprint.grid().as_ref(),
            self.blueprint.categories(),
            filter,
            connectivity,
        )
    }

    // --- 1. Outlines ---

    /// One outline per 4-connected zone, in group order. Single electrodes
    /// become their cell square.
    pub fn clustering_edges(&self, filter: CategoryFilter) -> BlueprintResult<Vec<ClusteringEdges>> {
        let clustering = self.find_clustering(filter, Connectivity::Four)?;
        let grid = self.blueprint.grid().as_ref();
        let categories = self.blueprint.categories();

        let capacity = clustering.mode_group().map_or(0, |m| m.count);
        let mut tracer = BoundaryTracer::with_capacity(capacity);
        let mut members = Vec::with_capacity(capacity);
        let mut out = Vec::with_capacity(clustering.group_count());
        for group in clustering.groups() {
            clustering.members_into(group, &mut members);
            out.extend(outline_group(
                &mut tracer,
                grid,
                categories,
                &members,
                self.config.small_corner_tolerance,
            )?);
        }
        debug!(?filter, outlines = out.len(), "traced clustering edges");
        Ok(out)
    }

    /// `clustering_edges` reduced to bounding rectangles.
    pub fn clustering_bounds(&self, filter: CategoryFilter) -> BlueprintResult<Vec<ClusteringEdges>> {
        Ok(self
            .clustering_edges(filter)?
            .iter()
            .map(ClusteringEdges::convex)
            .collect())
    }

    // --- 2. Fill ---

    /// Paints every electrode of the polygon's shank whose centre lies inside
    /// it with the polygon's category. Returns the number painted.
    pub fn fill_edges(&mut self, edges: &ClusteringEdges) -> BlueprintResult<usize> {
        let mut out = self.blueprint.categories().to_vec();
        let painted = paint(&*self.blueprint, &mut out, edges)?;
        self.blueprint.apply(&out)?;
        Ok(painted)
    }

    pub fn fill_edges_with(&mut self, edges: &ClusteringEdges, category: Category) -> BlueprintResult<usize> {
        self.fill_edges(&edges.with_category(category))
    }

    /// Fills the bounding rectangle of every zone whose rectangle area lies in
    /// `threshold`.
    pub fn fill(&mut self, filter: CategoryFilter, threshold: &AreaThreshold) -> BlueprintResult<usize> {
        let clustering = self.find_clustering(filter, self.config.zone_connectivity)?;
        let grid = self.blueprint.grid().clone();
        let source = self.blueprint.categories().to_vec();
        let mut out = source.clone();
        let mut painted = 0;
        let mut filled_zones = 0;

        let mut members = Vec::new();
        for group in clustering.groups() {
            clustering.members_into(group, &mut members);
            for (shank, part) in split_by_shank(grid.as_ref(), &members) {
                let rectangle = bounding_rectangle(grid.as_ref(), shank, source[part[0]], &part);
                if threshold.test(rectangle.area()?.abs()) {
                    painted += paint(&*self.blueprint, &mut out, &rectangle)?;
                    filled_zones += 1;
                }
            }
        }

        self.blueprint.apply(&out)?;
        debug!(?filter, filled_zones, painted, "filled zones");
        Ok(painted)
    }

    /// `fill` with the configured threshold.
    pub fn fill_zones(&mut self, filter: CategoryFilter) -> BlueprintResult<usize> {
        let threshold = self.config.fill_threshold;
        self.fill(filter, &threshold)
    }

    // --- 3. Move ---

    /// Translates the selected, set electrodes by `movement` grid steps.
    ///
    /// Sources become unset, a destination off the grid drops the category, and
    /// a moved category replaces a stationary one at its destination. Returns
    /// the number of categories that landed on the grid.
    pub fn move_by(&mut self, movement: Movement, selector: &ElectrodeSelector) -> BlueprintResult<usize> {
        let mask = selector.resolve(&*self.blueprint)?;
        if movement.is_zero() || self.blueprint.is_empty() {
            return Ok(0);
        }

        let grid = self.blueprint.grid().clone();
        let source = self.blueprint.categories();
        let n = source.len();
        let mut out = vec![UNSET; n];
        let mut moving = vec![false; n];
        let mut moved = 0;
        let mut dropped = 0;

        for i in mask.iter_set() {
            if source[i] == UNSET {
                continue;
            }
            moving[i] = true;
            match grid.offset_index(i, movement.x, movement.y) {
                Some(j) => {
                    out[j] = source[i];
                    moved += 1;
                }
                None => dropped += 1,
            }
        }
        for i in 0..n {
            if !moving[i] && out[i] == UNSET {
                out[i] = source[i];
            }
        }

        if dropped > 0 {
            warn!(dropped, ?movement, "moved categories left the grid and were dropped");
        }
        debug!(moved, ?movement, "moved electrodes");
        self.blueprint.apply(&out)?;
        Ok(moved)
    }

    /// Moves every set electrode `step` rows.
    pub fn move_rows(&mut self, step: i32) -> BlueprintResult<usize> {
        self.move_by(Movement::rows(step), &ElectrodeSelector::All)
    }

    /// Destination of each index after `movement`, `None` when it leaves the grid.
    pub fn move_index(&self, indices: &[usize], movement: Movement) -> BlueprintResult<Vec<Option<usize>>> {
        let grid = self.blueprint.grid();
        let len = grid.len();
        indices
            .iter()
            .map(|&i| {
                if i >= len {
                    Err(BlueprintError::IndexOutOfRange { index: i, len })
                } else {
                    Ok(grid.offset_index(i, movement.x, movement.y))
                }
            })
            .collect()
    }

    /// `mask` translated by `movement`. Positions that leave the grid vanish.
    pub fn move_mask(&self, mask: &ElectrodeMask, movement: Movement) -> BlueprintResult<ElectrodeMask> {
        let grid = self.blueprint.grid();
        check_len("moved mask", grid.len(), mask.len())?;
        let mut bits = vec![false; mask.len()];
        for i in mask.iter_set() {
            if let Some(j) = grid.offset_index(i, movement.x, movement.y) {
                bits[j] = true;
            }
        }
        Ok(ElectrodeMask::from_bools(bits))
    }

    // --- 4. Extend / Reduce ---

    /// Grows every qualifying zone of `category` by `change`, writing `value`
    /// into unset electrodes only. Returns the number written.
    pub fn extend(
        &mut self,
        category: Category,
        change: &AreaChange,
        value: Category,
        threshold: &AreaThreshold,
    ) -> BlueprintResult<usize> {
        if change.is_zero() || self.blueprint.is_empty() || value == UNSET {
            return Ok(0);
        }
        let zone = self.zones_passing(category, threshold)?;
        let grid = self.blueprint.grid().clone();
        let mut out = self.blueprint.categories().to_vec();
        let mut written = 0;

        for offset in change.offsets() {
            if offset.is_zero() {
                continue;
            }
            for i in zone.iter_set() {
                if let Some(j) = grid.offset_index(i, offset.x, offset.y) {
                    if out[j] == UNSET {
                        out[j] = value;
                        written += 1;
                    }
                }
            }
        }

        debug!(category, ?change, value, written, "extended zones");
        self.blueprint.apply(&out)?;
        Ok(written)
    }

    /// Erodes every qualifying zone of `category`. An electrode survives only if,
    /// for each non-zero side of `change`, the electrode that many steps away on
    /// that side is also in the zone. Eroded electrodes get `value`.
    pub fn reduce(
        &mut self,
        category: Category,
        change: &AreaChange,
        value: Category,
        threshold: &AreaThreshold,
    ) -> BlueprintResult<usize> {
        if change.is_zero() || self.blueprint.is_empty() {
            return Ok(0);
        }
        let zone = self.zones_passing(category, threshold)?;
        let grid = self.blueprint.grid().clone();

        let probes: Vec<(i32, i32)> = [
            (change.left, (-(change.left as i32), 0)),
            (change.right, (change.right as i32, 0)),
            (change.up, (0, change.up as i32)),
            (change.down, (0, -(change.down as i32))),
        ]
        .into_iter()
        .filter(|&(side, _)| side > 0)
        .map(|(_, step)| step)
        .collect();

        let mut out = self.blueprint.categories().to_vec();
        let mut removed = 0;
        for i in zone.iter_set() {
            let survives = probes.iter().all(|&(cx, ry)| {
                grid.offset_index(i, cx, ry)
                    .is_some_and(|j| zone.get(j))
            });
            if !survives {
                out[i] = value;
                removed += 1;
            }
        }

        debug!(category, ?change, value, removed, "reduced zones");
        self.blueprint.apply(&out)?;
        Ok(removed)
    }

    /// Unsets every whole zone of `category` whose area lies in `threshold`.
    pub fn remove_zones(&mut self, category: Category, threshold: &AreaThreshold) -> BlueprintResult<usize> {
        let zone = self.zones_passing(category, threshold)?;
        let mut out = self.blueprint.categories().to_vec();
        zone.fill(&mut out, UNSET)?;
        let removed = zone.count();
        debug!(category, removed, "removed zones");
        self.blueprint.apply(&out)?;
        Ok(removed)
    }

    /// Union of the `category` zones whose cell area lies in `threshold`.
    fn zones_passing(&self, category: Category, threshold: &AreaThreshold) -> BlueprintResult<ElectrodeMask> {
        let clustering = self.find_clustering(CategoryFilter::Exactly(category), self.config.zone_connectivity)?;
        let grid = self.blueprint.grid();
        let mut bits = vec![false; clustering.len()];
        let mut members = Vec::new();
        for group in clustering.groups() {
            clustering.members_into(group, &mut members);
            let (dx, dy) = grid.pitch(grid.electrode(members[0]).shank);
            let area = members.len() as f64 * dx as f64 * dy as f64;
            if threshold.test(area) {
                for &i in &members {
                    bits[i] = true;
                }
            }
        }
        Ok(ElectrodeMask::from_bools(bits))
    }
}

/// Rectangle spanning the cells of `members`, as corner codes on the extreme
/// cell centres.
fn bounding_rectangle<G: GridLookup + ?Sized>(
    grid: &G,
    shank: Shank,
    category: Category,
    members: &[usize],
) -> ClusteringEdges {
    let (mut x0, mut y0, mut x1, mut y1) = (i32::MAX, i32::MAX, i32::MIN, i32::MIN);
    for &i in members {
        let e = grid.electrode(i);
        x0 = x0.min(e.x);
        y0 = y0.min(e.y);
        x1 = x1.max(e.x);
        y1 = y1.max(e.y);
    }
    let (dx, dy) = grid.pitch(shank);
    let (x0, y0, x1, y1) = (x0 as f64, y0 as f64, x1 as f64, y1 as f64);
    ClusteringEdges::new(
        category,
        shank,
        (dx as f64, dy as f64),
        vec![
            Corner::new(x1, y1, CornerCode::NORTH_EAST),
            Corner::new(x0, y1, CornerCode::NORTH_WEST),
            Corner::new(x0, y0, CornerCode::SOUTH_WEST),
            Corner::new(x1, y0, CornerCode::SOUTH_EAST),
        ],
    )
}

/// Writes `edges.category` into `out` for every electrode of its shank inside
/// the polygon, after aligning corners to the cell boundaries.
fn paint(blueprint: &Blueprint, out: &mut [Category], edges: &ClusteringEdges) -> BlueprintResult<usize> {
    check_len("painted categories", blueprint.len(), out.len())?;
    let aligned = edges.set_corner(edges.dx / 2.0, edges.dy / 2.0)?;
    let mut painted = 0;
    for e in blueprint.grid().electrodes() {
        if e.shank == edges.shank && aligned.contains(e.x as f64, e.y as f64) {
            out[e.index] = edges.category;
            painted += 1;
        }
    }
    Ok(painted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::electrode_grid::ElectrodeGrid;
    use std::sync::Arc;

    /// A `shanks × rows × columns` unit-pitch blueprint. `rows` lists
    /// categories with y = 0 first, shank after shank.
    fn blueprint(shanks: u32, columns: u32, rows: &[&[Category]]) -> Blueprint {
        let per_shank = rows.len() as u32 / shanks;
        let grid = Arc::new(ElectrodeGrid::rectangular(shanks, per_shank, columns, 1, 1));
        let categories: Vec<Category> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Blueprint::from_categories(grid, categories).expect("matching layout")
    }

    fn rows(bp: &Blueprint, columns: usize) -> Vec<Vec<Category>> {
        bp.categories().chunks(columns).map(|c| c.to_vec()).collect()
    }

    fn square_6x6() -> Blueprint {
        blueprint(
            1,
            6,
            &[
                &[0, 0, 0, 0, 0, 0],
                &[0, 1, 1, 1, 1, 0],
                &[0, 1, 1, 1, 1, 0],
                &[0, 1, 1, 1, 1, 0],
                &[0, 1, 1, 1, 1, 0],
                &[0, 0, 0, 0, 0, 0],
            ],
        )
    }

    #[test]
    fn move_rows_drops_categories_off_the_grid() {
        let mut bp = blueprint(
            2,
            2,
            &[&[2, 0], &[1, 2], &[0, 1], &[4, 0], &[3, 4], &[0, 3]],
        );
        let moved = BlueprintEditor::new(&mut bp).move_rows(-1).unwrap();
        assert_eq!(moved, 6);
        assert_eq!(
            rows(&bp, 2),
            vec![vec![1, 2], vec![0, 1], vec![0, 0], vec![3, 4], vec![0, 3], vec![0, 0]]
        );
    }

    #[test]
    fn moved_category_replaces_stationary_one() {
        let layout: &[&[Category]] = &[&[2, 0], &[1, 2], &[0, 1], &[4, 0], &[3, 4], &[0, 3]];

        let mut bp = blueprint(2, 2, layout);
        BlueprintEditor::new(&mut bp)
            .move_by(Movement::rows(1), &ElectrodeSelector::Category(2))
            .unwrap();
        assert_eq!(
            rows(&bp, 2),
            vec![vec![0, 0], vec![2, 0], vec![0, 2], vec![4, 0], vec![3, 4], vec![0, 3]]
        );

        let mut bp = blueprint(2, 2, layout);
        BlueprintEditor::new(&mut bp)
            .move_by(Movement::rows(1), &ElectrodeSelector::Category(1))
            .unwrap();
        assert_eq!(
            rows(&bp, 2),
            vec![vec![2, 0], vec![0, 2], vec![1, 0], vec![4, 0], vec![3, 4], vec![0, 3]]
        );
    }

    #[test]
    fn move_in_two_axes() {
        let mut bp = square_6x6();
        BlueprintEditor::new(&mut bp)
            .move_by(Movement::new(1, 1), &ElectrodeSelector::All)
            .unwrap();
        assert_eq!(
            rows(&bp, 6),
            vec![
                vec![0, 0, 0, 0, 0, 0],
                vec![0, 0, 0, 0, 0, 0],
                vec![0, 0, 1, 1, 1, 1],
                vec![0, 0, 1, 1, 1, 1],
                vec![0, 0, 1, 1, 1, 1],
                vec![0, 0, 1, 1, 1, 1],
            ]
        );

        let before = square_6x6();
        let mut bp = square_6x6();
        assert_eq!(BlueprintEditor::new(&mut bp).move_by(Movement::default(), &ElectrodeSelector::All).unwrap(), 0);
        assert_eq!(bp.categories(), before.categories());
    }

    #[test]
    fn move_with_bad_selector_leaves_blueprint() {
        let mut bp = square_6x6();
        let err = BlueprintEditor::new(&mut bp)
            .move_by(Movement::rows(1), &ElectrodeSelector::Index(vec![100]))
            .unwrap_err();
        assert!(matches!(err, BlueprintError::IndexOutOfRange { .. }));
        assert_eq!(bp.categories(), square_6x6().categories());
    }

    #[test]
    fn move_index_and_mask() {
        let mut bp = blueprint(1, 2, &[&[0, 0], &[0, 0]]);
        let editor = BlueprintEditor::new(&mut bp);
        assert_eq!(
            editor.move_index(&[0, 3], Movement::rows(1)).unwrap(),
            vec![Some(2), None]
        );
        let mask = ElectrodeMask::from_indices(4, &[0, 1]).unwrap();
        assert_eq!(editor.move_mask(&mask, Movement::new(1, 1)).unwrap().as_indices(), vec![3]);
        assert!(editor.move_index(&[4], Movement::rows(1)).is_err());
    }

    #[test]
    fn fill_completes_bounding_rectangles() {
        let mut bp = blueprint(1, 2, &[&[1, 1], &[0, 1], &[1, 1], &[0, 1], &[1, 1]]);
        BlueprintEditor::new(&mut bp).fill(CategoryFilter::AnySet, &AreaThreshold::ALL).unwrap();
        assert_eq!(bp.count(1), 10);

        let mut bp = blueprint(1, 2, &[&[0, 0], &[0, 1], &[1, 1], &[1, 0], &[0, 0]]);
        BlueprintEditor::new(&mut bp).fill(CategoryFilter::AnySet, &AreaThreshold::ALL).unwrap();
        assert_eq!(
            rows(&bp, 2),
            vec![vec![0, 0], vec![1, 1], vec![1, 1], vec![1, 1], vec![0, 0]]
        );
    }

    #[test]
    fn fill_of_an_l_is_its_bounding_box() {
        let mut bp = blueprint(1, 3, &[&[2, 0, 0], &[2, 0, 0], &[2, 2, 2]]);
        let painted = BlueprintEditor::new(&mut bp)
            .fill(CategoryFilter::Exactly(2), &AreaThreshold::at_least(0.0))
            .unwrap();
        assert_eq!(painted, 9);
        assert_eq!(bp.count(2), 9);
    }

    #[test]
    fn fill_respects_area_threshold() {
        let layout: &[&[Category]] = &[&[1, 1], &[1, 0], &[2, 0], &[2, 2], &[2, 2]];

        // zone 1 spans 2x2 (area 4), zone 2 spans 2x3 (area 6)
        let mut bp = blueprint(1, 2, layout);
        BlueprintEditor::new(&mut bp).fill(CategoryFilter::AnySet, &AreaThreshold::new(5.0, 10.0)).unwrap();
        assert_eq!(
            rows(&bp, 2),
            vec![vec![1, 1], vec![1, 0], vec![2, 2], vec![2, 2], vec![2, 2]]
        );

        let mut bp = blueprint(1, 2, layout);
        BlueprintEditor::new(&mut bp).fill(CategoryFilter::AnySet, &AreaThreshold::at_most(4.0)).unwrap();
        assert_eq!(
            rows(&bp, 2),
            vec![vec![1, 1], vec![1, 1], vec![2, 0], vec![2, 2], vec![2, 2]]
        );
    }

    #[test]
    fn fill_edges_paints_polygon_interior() {
        let mut bp = blueprint(2, 3, &[&[0, 0, 0], &[0, 0, 0], &[0, 0, 0], &[0, 0, 0]]);
        let cell = ClusteringEdges::point(7, 1, (1.0, 1.0), 1.0, 0.0);
        let painted = BlueprintEditor::new(&mut bp).fill_edges(&cell.convex()).unwrap();
        assert_eq!(painted, 1);
        assert_eq!(bp.get(7), Some(7));

        let painted = BlueprintEditor::new(&mut bp).fill_edges_with(&cell, 3).unwrap();
        assert_eq!(painted, 1);
        assert_eq!(bp.get(7), Some(3));
    }

    #[test]
    fn clustering_edges_per_zone() {
        let mut bp = blueprint(1, 3, &[&[1, 0, 2], &[1, 0, 2], &[0, 0, 2]]);
        let editor = BlueprintEditor::new(&mut bp);
        let edges = editor.clustering_edges(CategoryFilter::AnySet).unwrap();
        assert_eq!(edges.len(), 2);
        assert_eq!((edges[0].category, edges[0].area().unwrap()), (1, 2.0));
        assert_eq!((edges[1].category, edges[1].area().unwrap()), (2, 3.0));

        let only_two = editor.clustering_edges(CategoryFilter::Exactly(2)).unwrap();
        assert_eq!(only_two.len(), 1);

        let bounds = editor.clustering_bounds(CategoryFilter::AnySet).unwrap();
        assert!(bounds.iter().all(|b| b.len() == 4));
    }

    #[test]
    fn clustering_edges_split_fast_path_by_shank() {
        let mut bp = blueprint(2, 2, &[&[1, 1], &[1, 1]]);
        let edges = BlueprintEditor::new(&mut bp).clustering_edges(CategoryFilter::AnySet).unwrap();
        assert_eq!(edges.len(), 2);
        assert_eq!((edges[0].shank, edges[1].shank), (0, 1));
        assert!(edges.iter().all(|e| e.area().unwrap() == 2.0));
    }

    #[test]
    fn clustering_edges_cover_gapped_shank() {
        // two rows, no column at x = 2: one category everywhere still makes
        // two separate blocks on the shank
        let xs = [0, 1, 3, 4];
        let triples = (0..2).flat_map(|y| xs.iter().map(move |&x| (0, x, y)));
        let grid = Arc::new(ElectrodeGrid::from_electrodes(triples).unwrap());
        let mut bp = Blueprint::from_categories(grid.clone(), vec![1; 8]).unwrap();

        let edges = BlueprintEditor::new(&mut bp).clustering_edges(CategoryFilter::AnySet).unwrap();
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().all(|e| e.area().unwrap() == 4.0));
        for e in grid.electrodes() {
            let covering = edges
                .iter()
                .filter(|o| o.contains(e.x as f64, e.y as f64))
                .count();
            assert_eq!(covering, 1, "electrode {} covered {} times", e.index, covering);
        }
    }

    #[test]
    fn outline_group_rejects_empty_members() {
        let grid = ElectrodeGrid::rectangular(1, 2, 2, 1, 1);
        let mut tracer = BoundaryTracer::new();
        let err = outline_group(&mut tracer, &grid, &[1, 1, 1, 1], &[], None).unwrap_err();
        assert_eq!(err, BlueprintError::EmptyCluster);
        let err = outline_group(&mut tracer, &grid, &[1, 1, 1, 1], &[0, 9], None).unwrap_err();
        assert_eq!(err, BlueprintError::IndexOutOfRange { index: 9, len: 4 });
    }

    #[test]
    fn configured_corner_removal_applies_to_outlines() {
        let mut bp = blueprint(1, 3, &[&[0, 1, 0], &[1, 1, 1], &[0, 1, 0]]);
        let config = EditorConfig {
            small_corner_tolerance: Some((1.0, 1.0)),
            ..EditorConfig::default()
        };
        let edges = BlueprintEditor::with_config(&mut bp, config)
            .clustering_edges(CategoryFilter::AnySet)
            .unwrap();
        assert_eq!(edges[0].len(), 8);
    }

    #[test]
    fn extend_grows_rows() {
        let mut bp = blueprint(1, 2, &[&[0, 0], &[0, 0], &[1, 1], &[0, 0], &[0, 0]]);
        BlueprintEditor::new(&mut bp)
            .extend(1, &AreaChange::uniform_rows(1), 1, &AreaThreshold::ALL)
            .unwrap();
        assert_eq!(
            rows(&bp, 2),
            vec![vec![0, 0], vec![1, 1], vec![1, 1], vec![1, 1], vec![0, 0]]
        );

        let mut bp = blueprint(1, 2, &[&[0, 0], &[0, 0], &[1, 1], &[0, 0], &[0, 0]]);
        let written = BlueprintEditor::new(&mut bp)
            .extend(1, &AreaChange::uniform_rows(1), 2, &AreaThreshold::ALL)
            .unwrap();
        assert_eq!(written, 4);
        assert_eq!(
            rows(&bp, 2),
            vec![vec![0, 0], vec![2, 2], vec![1, 1], vec![2, 2], vec![0, 0]]
        );
    }

    #[test]
    fn extend_by_direction() {
        let reset: &[&[Category]] = &[
            &[0, 0, 0, 0, 0, 0],
            &[0, 0, 0, 0, 0, 0],
            &[0, 0, 1, 1, 0, 0],
            &[0, 0, 1, 1, 0, 0],
            &[0, 0, 0, 0, 0, 0],
            &[0, 0, 0, 0, 0, 0],
        ];
        let grow = |change: AreaChange| {
            let mut bp = blueprint(1, 6, reset);
            BlueprintEditor::new(&mut bp).extend(1, &change, 1, &AreaThreshold::ALL).unwrap();
            bp
        };

        let up = grow(AreaChange::new(1, 0, 0, 0));
        assert_eq!(rows(&up, 6)[4], vec![0, 0, 1, 1, 0, 0]);
        assert_eq!(up.count(1), 6);

        let left = grow(AreaChange::new(0, 0, 1, 0));
        assert_eq!(rows(&left, 6)[2], vec![0, 1, 1, 1, 0, 0]);

        let all = grow(AreaChange::symmetric(1, 1));
        assert_eq!(all.count(1), 16);
        assert_eq!(rows(&all, 6)[1], vec![0, 1, 1, 1, 1, 0]);
    }

    #[test]
    fn extend_skips_zones_outside_threshold() {
        let mut bp = blueprint(1, 4, &[&[1, 0, 0, 0], &[0, 0, 1, 1], &[0, 0, 1, 1]]);
        BlueprintEditor::new(&mut bp)
            .extend(1, &AreaChange::symmetric(1, 0), 3, &AreaThreshold::at_least(2.0))
            .unwrap();
        // the single-electrode zone (area 1) does not grow
        assert_eq!(rows(&bp, 4)[0], vec![1, 0, 0, 0]);
        assert_eq!(rows(&bp, 4)[1], vec![0, 3, 1, 1]);
    }

    #[test]
    fn reduce_erodes_rows() {
        let layout: &[&[Category]] = &[&[2, 2], &[1, 1], &[1, 1], &[1, 1], &[1, 1], &[1, 1], &[0, 0]];
        let mut bp = blueprint(1, 2, layout);
        let removed = BlueprintEditor::new(&mut bp)
            .reduce(1, &AreaChange::uniform_rows(1), UNSET, &AreaThreshold::ALL)
            .unwrap();
        assert_eq!(removed, 4);
        assert_eq!(
            rows(&bp, 2),
            vec![vec![2, 2], vec![0, 0], vec![1, 1], vec![1, 1], vec![1, 1], vec![0, 0], vec![0, 0]]
        );

        let mut bp = blueprint(1, 2, layout);
        BlueprintEditor::new(&mut bp)
            .reduce(1, &AreaChange::uniform_rows(1), 5, &AreaThreshold::ALL)
            .unwrap();
        assert_eq!(rows(&bp, 2)[1], vec![5, 5]);
        assert_eq!(rows(&bp, 2)[5], vec![5, 5]);
    }

    #[test]
    fn reduce_by_direction() {
        let shrink = |change: AreaChange| {
            let mut bp = square_6x6();
            BlueprintEditor::new(&mut bp).reduce(1, &change, UNSET, &AreaThreshold::ALL).unwrap();
            bp
        };

        let up = shrink(AreaChange::new(1, 0, 0, 0));
        assert_eq!(rows(&up, 6)[4], vec![0; 6]);
        assert_eq!(up.count(1), 12);

        let right = shrink(AreaChange::new(0, 0, 0, 1));
        assert_eq!(rows(&right, 6)[1], vec![0, 1, 1, 1, 0, 0]);

        let corner = shrink(AreaChange::new(0, 2, 2, 0));
        assert_eq!(corner.index_of_category(1), vec![3 * 6 + 3, 3 * 6 + 4, 4 * 6 + 3, 4 * 6 + 4]);

        assert_eq!(shrink(AreaChange::new(2, 2, 0, 0)).count(1), 0);
        assert_eq!(shrink(AreaChange::new(0, 3, 3, 0)).index_of_category(1), vec![4 * 6 + 4]);
        assert_eq!(shrink(AreaChange::new(0, 4, 4, 0)).count(1), 0);
    }

    #[test]
    fn reduce_to_nothing() {
        let mut bp = blueprint(1, 2, &[&[0, 0], &[1, 1], &[1, 1], &[0, 0]]);
        BlueprintEditor::new(&mut bp)
            .reduce(1, &AreaChange::uniform_rows(1), UNSET, &AreaThreshold::ALL)
            .unwrap();
        assert_eq!(bp.count(1), 0);
    }

    #[test]
    fn remove_small_zones() {
        let mut bp = blueprint(1, 4, &[&[1, 0, 1, 1], &[0, 0, 1, 1]]);
        let removed = BlueprintEditor::new(&mut bp)
            .remove_zones(1, &AreaThreshold::at_most(1.0))
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(bp.categories(), &[0, 0, 1, 1, 0, 0, 1, 1]);
    }

    #[test]
    fn area_change_offsets_and_inversion() {
        let change = AreaChange::new(1, 0, 1, 0);
        assert_eq!(
            change.offsets(),
            vec![Movement::new(-1, 0), Movement::new(0, 0), Movement::new(-1, 1), Movement::new(0, 1)]
        );
        assert_eq!(change.invert(), AreaChange::new(0, 1, 0, 1));
        assert!(AreaChange::default().is_zero());
        assert!(AreaThreshold::ALL.test(1e12));
        assert!(!AreaThreshold::new(2.0, 3.0).test(3.5));
    }
}
