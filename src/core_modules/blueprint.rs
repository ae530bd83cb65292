// THEORY:
// A `Blueprint` is the mutable half of the model: one category per electrode,
// parallel to a shared, immutable `ElectrodeGrid`. It is what a user paints and
// what every editing operation ultimately rewrites.
//
// Key architectural principles:
// 1.  **Shared Geometry**: The grid lives behind an `Arc`. Cloning a blueprint
//     copies only the category array, so taking a snapshot before an edit is
//     cheap.
// 2.  **One Selector**: Every "which electrodes?" question is expressed as an
//     `ElectrodeSelector` and projected to an `ElectrodeMask` by a single
//     `resolve` call. Operations never grow overloads per selection style.
// 3.  **All or Nothing**: A write whose input has the wrong length, or names an
//     index outside the grid, is rejected before the first category changes.
//     The blueprint is never left half-edited.

use crate::core_modules::electrode_grid::{ElectrodeGrid, Position, Shank};
use crate::core_modules::electrode_mask::ElectrodeMask;
use crate::error::{BlueprintResult, check_len};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Per-electrode label.
pub type Category = i32;

/// Reserved category meaning "no category".
pub const UNSET: Category = 0;

/// Read-only view of one electrode and its current category, passed to
/// predicate selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElectrodeView {
    pub index: usize,
    pub shank: Shank,
    pub x: Position,
    pub y: Position,
    pub category: Category,
}

/// Ways of choosing a subset of electrodes.
pub enum ElectrodeSelector {
    All,
    /// Electrode indices. An index outside the grid is an error.
    Index(Vec<usize>),
    /// A mask parallel to the grid.
    Mask(ElectrodeMask),
    /// `(shank, x, y)` identities. Identities with no electrode are skipped.
    Electrodes(Vec<(Shank, Position, Position)>),
    /// Every electrode currently holding this category.
    Category(Category),
    Predicate(Box<dyn Fn(ElectrodeView) -> bool + Send + Sync>),
}

impl ElectrodeSelector {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(ElectrodeView) -> bool + Send + Sync + 'static,
    {
        ElectrodeSelector::Predicate(Box::new(f))
    }

    /// Projects the selector onto `blueprint` as a mask of its length.
    pub fn resolve(&self, blueprint: &Blueprint) -> BlueprintResult<ElectrodeMask> {
        let len = blueprint.len();
        match self {
            ElectrodeSelector::All => Ok(ElectrodeMask::full(len)),
            ElectrodeSelector::Index(indices) => ElectrodeMask::from_indices(len, indices),
            ElectrodeSelector::Mask(mask) => {
                check_len("selector mask", len, mask.len())?;
                Ok(mask.clone())
            }
            ElectrodeSelector::Electrodes(identities) => {
                let mut mask = ElectrodeMask::new(len);
                for &(shank, x, y) in identities {
                    if let Some(i) = blueprint.grid.index_of(shank, x, y) {
                        mask.set(i, true)?;
                    }
                }
                Ok(mask)
            }
            ElectrodeSelector::Category(category) => Ok(blueprint.mask(*category)),
            ElectrodeSelector::Predicate(predicate) => Ok(ElectrodeMask::from_bools(
                (0..len).map(|i| predicate(blueprint.view(i))).collect(),
            )),
        }
    }
}

impl fmt::Debug for ElectrodeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElectrodeSelector::All => write!(f, "All"),
            ElectrodeSelector::Index(v) => f.debug_tuple("Index").field(v).finish(),
            ElectrodeSelector::Mask(m) => f.debug_tuple("Mask").field(m).finish(),
            ElectrodeSelector::Electrodes(v) => f.debug_tuple("Electrodes").field(v).finish(),
            ElectrodeSelector::Category(c) => f.debug_tuple("Category").field(c).finish(),
            ElectrodeSelector::Predicate(_) => write!(f, "Predicate(..)"),
        }
    }
}

impl From<ElectrodeMask> for ElectrodeSelector {
    fn from(mask: ElectrodeMask) -> Self {
        ElectrodeSelector::Mask(mask)
    }
}

impl From<Vec<usize>> for ElectrodeSelector {
    fn from(indices: Vec<usize>) -> Self {
        ElectrodeSelector::Index(indices)
    }
}

/// Category overlay on an electrode grid.
#[derive(Clone)]
pub struct Blueprint {
    grid: Arc<ElectrodeGrid>,
    categories: Vec<Category>,
}

impl Blueprint {
    /// An all-unset blueprint over `grid`.
    pub fn new(grid: Arc<ElectrodeGrid>) -> Self {
        let categories = vec![UNSET; grid.len()];
        Self { grid, categories }
    }

    pub fn from_categories(grid: Arc<ElectrodeGrid>, categories: Vec<Category>) -> BlueprintResult<Self> {
        check_len("blueprint categories", grid.len(), categories.len())?;
        Ok(Self { grid, categories })
    }

    pub fn grid(&self) -> &Arc<ElectrodeGrid> {
        &self.grid
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Category> {
        self.categories.get(index).copied()
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Electrode `index` with its category. Panics outside the grid.
    pub fn view(&self, index: usize) -> ElectrodeView {
        let e = self.grid.electrodes()[index];
        ElectrodeView {
            index,
            shank: e.shank,
            x: e.x,
            y: e.y,
            category: self.categories[index],
        }
    }

    // --- Writes ---

    pub fn clear(&mut self) {
        self.categories.fill(UNSET);
    }

    pub fn set_all(&mut self, category: Category) {
        self.categories.fill(category);
    }

    /// Assigns `category` to every selected electrode. Returns how many were selected.
    pub fn set(&mut self, category: Category, selector: &ElectrodeSelector) -> BlueprintResult<usize> {
        let mask = selector.resolve(self)?;
        mask.fill(&mut self.categories, category)?;
        Ok(mask.count())
    }

    pub fn unset(&mut self, selector: &ElectrodeSelector) -> BlueprintResult<usize> {
        self.set(UNSET, selector)
    }

    /// Copies `other`'s categories into positions that are currently unset.
    pub fn merge(&mut self, other: &Blueprint) -> BlueprintResult<()> {
        self.merge_categories(&other.categories)
    }

    pub fn merge_categories(&mut self, other: &[Category]) -> BlueprintResult<()> {
        check_len("merged categories", self.categories.len(), other.len())?;
        for (mine, &theirs) in self.categories.iter_mut().zip(other) {
            if *mine == UNSET {
                *mine = theirs;
            }
        }
        Ok(())
    }

    /// Replaces the whole category array.
    pub fn apply(&mut self, categories: &[Category]) -> BlueprintResult<()> {
        check_len("applied categories", self.categories.len(), categories.len())?;
        self.categories.copy_from_slice(categories);
        Ok(())
    }

    // --- Queries ---

    pub fn count(&self, category: Category) -> usize {
        self.categories.iter().filter(|&&c| c == category).count()
    }

    /// Number of selected electrodes holding `category`.
    pub fn count_in(&self, category: Category, selector: &ElectrodeSelector) -> BlueprintResult<usize> {
        let mask = selector.resolve(self)?;
        Ok(mask.iter_set().filter(|&i| self.categories[i] == category).count())
    }

    pub fn index_of_category(&self, category: Category) -> Vec<usize> {
        self.mask(category).as_indices()
    }

    pub fn mask(&self, category: Category) -> ElectrodeMask {
        ElectrodeMask::from_predicate(&self.categories, |&c| c == category)
    }

    pub fn mask_where(&self, selector: &ElectrodeSelector) -> BlueprintResult<ElectrodeMask> {
        selector.resolve(self)
    }

    /// Text picture of the blueprint: one line per distinct y (ascending),
    /// shanks separated by `|`.
    pub fn render_text(&self) -> String {
        render_categories(&self.grid, &self.categories)
    }
}

impl fmt::Debug for Blueprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blueprint")
            .field("electrodes", &self.categories.len())
            .field("categories", &self.categories)
            .finish()
    }
}

impl fmt::Display for Blueprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_text())
    }
}

/// Renders any category array parallel to `grid`. Cells are two characters
/// wide once a category reaches 10.
pub fn render_categories(grid: &ElectrodeGrid, categories: &[Category]) -> String {
    let electrodes = grid.electrodes();
    let xs: BTreeSet<Position> = electrodes.iter().map(|e| e.x).collect();
    let ys: BTreeSet<Position> = electrodes.iter().map(|e| e.y).collect();
    let wide = categories.iter().copied().max().unwrap_or(UNSET) >= 10;

    let mut out = String::new();
    for &y in &ys {
        for (si, shank) in grid.shanks().into_iter().enumerate() {
            if si > 0 {
                out.push('|');
            }
            let mut first = true;
            for &x in &xs {
                let Some(i) = grid.index_of(shank, x, y) else {
                    continue;
                };
                if !first {
                    out.push(' ');
                }
                first = false;
                let c = categories.get(i).copied().unwrap_or(UNSET);
                if wide {
                    out.push_str(&format!("{c:>2}"));
                } else {
                    out.push_str(&c.to_string());
                }
            }
        }
        out.push('\n');
    }
    out
}
