// THEORY:
// `Clustering` is the spatial grouping layer. It takes a category array and
// labels every connected zone of equal category with a group id, much like a
// connected-component pass over a binary image, but on an irregular,
// multi-shank electrode grid.
//
// Key architectural principles & algorithm steps:
// 1.  **Qualification**: A `CategoryFilter` decides which electrodes take part.
//     Everything else gets group 0.
// 2.  **Fast Path**: When every electrode qualifies and they all share one set
//     category, the whole grid is a single group (id 1) and no neighbour is
//     ever looked up.
// 3.  **Disjoint-Set Union**: Each qualifying electrode `i` starts as its own
//     set rooted at `i`. Neighbours (4 or 8 directions, same shank, same
//     category) are unioned. The smaller root always wins and `find` halves
//     paths as it walks, so the pass is near-linear.
// 4.  **Stable Labels**: Because the minimum root wins, the id of a zone is
//     `min(index) + 1`. Labels are therefore deterministic and independent of
//     the order neighbours are visited in.
// 5.  **Immutable Result**: Once built, a `Clustering` is a read-only value.
//     Derived variants (`without_group`) are new values.

use crate::core_modules::blueprint::{Category, UNSET};
use crate::core_modules::electrode_grid::{Direction, GridLookup};
use crate::core_modules::electrode_mask::ElectrodeMask;
use crate::error::{BlueprintResult, check_len};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Which neighbours count as adjacent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    /// East, north, west, south.
    #[default]
    Four,
    /// The four above plus the diagonals.
    Eight,
}

impl Connectivity {
    pub fn directions(self) -> &'static [Direction] {
        match self {
            Connectivity::Four => &Direction::CARDINAL,
            Connectivity::Eight => &Direction::ALL,
        }
    }
}

/// Which electrodes take part in a clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryFilter {
    /// Every electrode with a set category. Adjacent electrodes still need
    /// equal categories to join.
    AnySet,
    Exactly(Category),
}

impl CategoryFilter {
    pub fn accepts(self, category: Category) -> bool {
        match self {
            CategoryFilter::AnySet => category != UNSET,
            CategoryFilter::Exactly(c) => category == c,
        }
    }
}

impl From<Category> for CategoryFilter {
    fn from(category: Category) -> Self {
        CategoryFilter::Exactly(category)
    }
}

/// Largest group and its size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mode {
    pub group: u32,
    pub count: usize,
}

/// Group ids parallel to a grid. 0 means "not clustered".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clustering {
    ids: Vec<u32>,
}

impl Clustering {
    /// Groups the qualifying electrodes of `categories` into connected zones.
    pub fn find<G: GridLookup + ?Sized>(
        grid: &G,
        categories: &[Category],
        filter: CategoryFilter,
        connectivity: Connectivity,
    ) -> BlueprintResult<Self> {
        check_len("clustered categories", grid.len(), categories.len())?;
        let n = categories.len();
        let qualifies: Vec<bool> = categories.iter().map(|&c| filter.accepts(c)).collect();

        // --- 1. Fast Path ---
        if let Some(&first) = categories.first() {
            if first != UNSET && qualifies.iter().all(|&q| q) && categories.iter().all(|&c| c == first) {
                debug!(electrodes = n, "clustering fast path: whole grid is one group");
                return Ok(Self { ids: vec![1; n] });
            }
        }

        // --- 2. Union ---
        let mut parent: Vec<usize> = (0..n).collect();
        for i in 0..n {
            if !qualifies[i] {
                continue;
            }
            for &direction in connectivity.directions() {
                let Some(j) = grid.neighbor(i, direction) else {
                    continue;
                };
                if qualifies[j] && categories[j] == categories[i] {
                    union(&mut parent, i, j);
                }
            }
        }

        // --- 3. Labelling ---
        let mut ids = vec![0u32; n];
        for i in 0..n {
            if qualifies[i] {
                ids[i] = find(&mut parent, i) as u32 + 1;
            }
        }

        let clustering = Self { ids };
        debug!(
            electrodes = n,
            groups = clustering.group_count(),
            ?filter,
            ?connectivity,
            "clustering complete"
        );
        Ok(clustering)
    }

    pub fn from_ids(ids: Vec<u32>) -> Self {
        Self { ids }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<u32> {
        self.ids.get(index).copied()
    }

    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    /// Distinct non-zero ids, ascending.
    pub fn groups(&self) -> Vec<u32> {
        self.ids
            .iter()
            .copied()
            .filter(|&g| g != 0)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn group_count(&self) -> usize {
        self.groups().len()
    }

    pub fn count_of(&self, group: u32) -> usize {
        self.ids.iter().filter(|&&g| g == group).count()
    }

    pub fn members(&self, group: u32) -> Vec<usize> {
        let mut out = Vec::new();
        self.members_into(group, &mut out);
        out
    }

    /// Writes the members of `group` into `out`, reusing its allocation.
    pub fn members_into(&self, group: u32, out: &mut Vec<usize>) {
        out.clear();
        out.extend(
            self.ids
                .iter()
                .enumerate()
                .filter_map(|(i, &g)| (g == group).then_some(i)),
        );
    }

    pub fn mask_group(&self, group: u32) -> ElectrodeMask {
        ElectrodeMask::from_predicate(&self.ids, |&g| g == group)
    }

    /// Every clustered electrode.
    pub fn mask_any(&self) -> ElectrodeMask {
        ElectrodeMask::from_predicate(&self.ids, |&g| g != 0)
    }

    /// The largest group. Ties go to the smaller id.
    pub fn mode_group(&self) -> Option<Mode> {
        let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
        for &g in self.ids.iter().filter(|&&g| g != 0) {
            *counts.entry(g).or_default() += 1;
        }
        let mut best: Option<Mode> = None;
        for (group, count) in counts {
            if best.is_none_or(|m| count > m.count) {
                best = Some(Mode { group, count });
            }
        }
        best
    }

    /// Copy with `group` relabelled to 0.
    pub fn without_group(&self, group: u32) -> Clustering {
        Clustering {
            ids: self
                .ids
                .iter()
                .map(|&g| if g == group { 0 } else { g })
                .collect(),
        }
    }

    /// Copy of `categories` where every electrode outside `group` becomes `zero`.
    pub fn isolate(&self, categories: &[Category], group: u32, zero: Category) -> BlueprintResult<Vec<Category>> {
        check_len("isolated categories", self.ids.len(), categories.len())?;
        Ok(categories
            .iter()
            .zip(&self.ids)
            .map(|(&c, &g)| if g == group { c } else { zero })
            .collect())
    }
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra < rb {
        parent[rb] = ra;
    } else if rb < ra {
        parent[ra] = rb;
    }
}
