// THEORY:
// The `ElectrodeGrid` is the fixed geometric substrate of the whole system. It
// owns the ordered list of electrodes of one probe layout and answers the only
// two spatial questions every algorithm above it needs: "where is electrode i?"
// and "which electrode sits at (shank, x, y)?".
//
// Key architectural principles:
// 1.  **Immutability**: A grid is built once from the shank/x/y arrays supplied
//     by the probe description and never changes afterwards. Blueprints share
//     it through an `Arc`, so copying a blueprint never copies geometry.
// 2.  **Pitch as the Unit Step**: `dx`/`dy` are the smallest positive gaps
//     between distinct coordinates on each axis. They turn "one step east"
//     into a physical offset. The global pitch is kept for callers that want
//     it, but neighbour queries use the pitch of the electrode's own shank, so
//     a probe that mixes a fine shank and a coarse shank steps correctly on
//     both.
// 3.  **Misses are Normal**: Looking up a coordinate that has no electrode
//     (grid edge, gap in a staggered shank) yields `None`. It is ordinary
//     control flow, not an error.
// 4.  **One Geometry Seam**: The `GridLookup` trait is the single collaborator
//     interface consumed by clustering, tracing and editing. Any probe layout
//     that can answer these questions can reuse every algorithm unchanged.

use crate::error::{BlueprintError, BlueprintResult, check_len};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Shank number of a multi-shank probe.
pub type Shank = u32;
/// Integer coordinate in physical length units (usually micrometers).
pub type Position = i32;

/// One physical contact point. Identity is `(shank, x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Electrode {
    /// Stable position of this electrode inside the grid.
    pub index: usize,
    pub shank: Shank,
    pub x: Position,
    pub y: Position,
}

/// The eight compass directions of a grid cell, numbered counter-clockwise
/// from east. The numbering doubles as the corner code of a cell:
///
/// ```text
/// 3 2 1
/// 4 8 0
/// 5 6 7
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    East = 0,
    NorthEast = 1,
    North = 2,
    NorthWest = 3,
    West = 4,
    SouthWest = 5,
    South = 6,
    SouthEast = 7,
}

impl Direction {
    /// The four directions used by 4-connectivity.
    pub const CARDINAL: [Direction; 4] = [
        Direction::East,
        Direction::North,
        Direction::West,
        Direction::South,
    ];

    /// All eight directions, in code order.
    pub const ALL: [Direction; 8] = [
        Direction::East,
        Direction::NorthEast,
        Direction::North,
        Direction::NorthWest,
        Direction::West,
        Direction::SouthWest,
        Direction::South,
        Direction::SouthEast,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Direction> {
        Self::ALL.get(code as usize).copied()
    }

    /// Unit offset `(columns, rows)` of this direction. North is `+y`.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::East => (1, 0),
            Direction::NorthEast => (1, 1),
            Direction::North => (0, 1),
            Direction::NorthWest => (-1, 1),
            Direction::West => (-1, 0),
            Direction::SouthWest => (-1, -1),
            Direction::South => (0, -1),
            Direction::SouthEast => (1, -1),
        }
    }

    /// Rotates by `quarter_turns * 90°` counter-clockwise.
    fn rotate(self, eighths: u8) -> Direction {
        Self::ALL[((self.code() + eighths) % 8) as usize]
    }

    /// 90° counter-clockwise.
    pub fn turn_left(self) -> Direction {
        self.rotate(2)
    }

    /// 90° clockwise.
    pub fn turn_right(self) -> Direction {
        self.rotate(6)
    }

    pub fn reverse(self) -> Direction {
        self.rotate(4)
    }

    pub fn is_cardinal(self) -> bool {
        self.code() % 2 == 0
    }
}

/// The geometry questions asked by clustering, tracing and editing.
pub trait GridLookup {
    /// Number of electrodes.
    fn len(&self) -> usize;

    /// Electrode at `index`. Panics when `index >= len()`, like slice indexing.
    fn electrode(&self, index: usize) -> Electrode;

    /// Exact identity lookup. `None` when no electrode sits there.
    fn index_of(&self, shank: Shank, x: Position, y: Position) -> Option<usize>;

    /// Column/row step `(dx, dy)` on `shank`.
    fn pitch(&self, shank: Shank) -> (Position, Position);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The electrode `columns` steps east and `rows` steps north of `index`
    /// on the same shank, if it exists. An axis with zero pitch cannot be
    /// stepped along.
    fn offset_index(&self, index: usize, columns: i32, rows: i32) -> Option<usize> {
        let e = self.electrode(index);
        let (dx, dy) = self.pitch(e.shank);
        if (columns != 0 && dx == 0) || (rows != 0 && dy == 0) {
            return None;
        }
        self.index_of(e.shank, e.x + columns * dx, e.y + rows * dy)
    }

    /// The adjacent electrode in `direction`, if it exists.
    fn neighbor(&self, index: usize, direction: Direction) -> Option<usize> {
        let (columns, rows) = direction.offset();
        self.offset_index(index, columns, rows)
    }
}

/// Immutable electrode layout of one probe.
#[derive(Debug, Clone)]
pub struct ElectrodeGrid {
    electrodes: Vec<Electrode>,
    lookup: HashMap<(Shank, Position, Position), usize>,
    /// Global column pitch across all shanks.
    dx: Position,
    /// Global row pitch across all shanks.
    dy: Position,
    /// Column/row pitch of each shank (already falling back to the global value).
    shank_pitch: BTreeMap<Shank, (Position, Position)>,
}

impl ElectrodeGrid {
    /// Builds a grid from the three parallel arrays of a channel map.
    pub fn new(shank: &[Shank], x: &[Position], y: &[Position]) -> BlueprintResult<Self> {
        check_len("electrode x positions", shank.len(), x.len())?;
        check_len("electrode y positions", shank.len(), y.len())?;
        Self::from_electrodes(
            shank
                .iter()
                .zip(x)
                .zip(y)
                .map(|((&s, &x), &y)| (s, x, y)),
        )
    }

    /// Builds a grid from `(shank, x, y)` triples, in index order.
    pub fn from_electrodes<I>(triples: I) -> BlueprintResult<Self>
    where
        I: IntoIterator<Item = (Shank, Position, Position)>,
    {
        let mut electrodes = Vec::new();
        let mut lookup = HashMap::new();
        for (index, (shank, x, y)) in triples.into_iter().enumerate() {
            if lookup.insert((shank, x, y), index).is_some() {
                return Err(BlueprintError::DuplicateElectrode { shank, x, y });
            }
            electrodes.push(Electrode { index, shank, x, y });
        }
        Ok(Self::assemble(electrodes, lookup))
    }

    /// A dummy probe: `shanks` shanks of `rows × columns` electrodes, index
    /// `s * rows * columns + r * columns + c`, positioned at
    /// `(c * pitch_x, r * pitch_y)`.
    pub fn rectangular(shanks: u32, rows: u32, columns: u32, pitch_x: Position, pitch_y: Position) -> Self {
        let capacity = electrode_count(shanks, rows, columns);
        let mut electrodes = Vec::with_capacity(capacity);
        let mut lookup = HashMap::with_capacity(capacity);
        for s in 0..shanks {
            for r in 0..rows {
                for c in 0..columns {
                    let index = electrodes.len();
                    let x = c as Position * pitch_x;
                    let y = r as Position * pitch_y;
                    lookup.insert((s, x, y), index);
                    electrodes.push(Electrode { index, shank: s, x, y });
                }
            }
        }
        Self::assemble(electrodes, lookup)
    }

    fn assemble(electrodes: Vec<Electrode>, lookup: HashMap<(Shank, Position, Position), usize>) -> Self {
        let dx = axis_pitch(electrodes.iter().map(|e| e.x));
        let dy = axis_pitch(electrodes.iter().map(|e| e.y));

        // --- Per-shank pitch ---
        // A shank with a single column (or row) has no pitch of its own on that
        // axis, so it inherits the global value. When the global value is zero
        // too, the cell is square on the other axis's pitch, or 1 when neither
        // axis has one. Shank pitch is therefore never zero.
        let mut per_shank: BTreeMap<Shank, (Vec<Position>, Vec<Position>)> = BTreeMap::new();
        for e in &electrodes {
            let entry = per_shank.entry(e.shank).or_default();
            entry.0.push(e.x);
            entry.1.push(e.y);
        }
        let shank_pitch = per_shank
            .into_iter()
            .map(|(shank, (xs, ys))| {
                let sx = axis_pitch(xs.into_iter());
                let sy = axis_pitch(ys.into_iter());
                let px = if sx > 0 { sx } else { dx };
                let py = if sy > 0 { sy } else { dy };
                let cell = match (px, py) {
                    (0, 0) => (1, 1),
                    (0, py) => (py, py),
                    (px, 0) => (px, px),
                    pitch => pitch,
                };
                (shank, cell)
            })
            .collect();

        Self {
            electrodes,
            lookup,
            dx,
            dy,
            shank_pitch,
        }
    }

    pub fn len(&self) -> usize {
        self.electrodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.electrodes.is_empty()
    }

    pub fn electrodes(&self) -> &[Electrode] {
        &self.electrodes
    }

    pub fn get(&self, index: usize) -> Option<&Electrode> {
        self.electrodes.get(index)
    }

    /// Smallest positive gap between distinct x values over the whole grid.
    pub fn dx(&self) -> Position {
        self.dx
    }

    /// Smallest positive gap between distinct y values over the whole grid.
    pub fn dy(&self) -> Position {
        self.dy
    }

    /// Sorted distinct shank numbers.
    pub fn shanks(&self) -> Vec<Shank> {
        self.shank_pitch.keys().copied().collect()
    }

    pub fn index_of(&self, shank: Shank, x: Position, y: Position) -> Option<usize> {
        self.lookup.get(&(shank, x, y)).copied()
    }
}

impl GridLookup for ElectrodeGrid {
    fn len(&self) -> usize {
        self.electrodes.len()
    }

    fn electrode(&self, index: usize) -> Electrode {
        self.electrodes[index]
    }

    fn index_of(&self, shank: Shank, x: Position, y: Position) -> Option<usize> {
        ElectrodeGrid::index_of(self, shank, x, y)
    }

    fn pitch(&self, shank: Shank) -> (Position, Position) {
        self.shank_pitch
            .get(&shank)
            .copied()
            .unwrap_or((self.dx, self.dy))
    }
}

/// Electrodes in a `shanks × rows × columns` dummy probe, counted in `usize`.
fn electrode_count(shanks: u32, rows: u32, columns: u32) -> usize {
    shanks as usize * rows as usize * columns as usize
}

/// Minimum difference between consecutive distinct sorted values, or 0 when
/// fewer than two distinct values exist.
fn axis_pitch(values: impl Iterator<Item = Position>) -> Position {
    let distinct: BTreeSet<Position> = values.collect();
    distinct
        .iter()
        .zip(distinct.iter().skip(1))
        .map(|(a, b)| b - a)
        .min()
        .unwrap_or(0)
}
