// THEORY:
// A `Snapshot` is the persisted form of a blueprint: geometry and categories in
// one self-describing JSON document. It exists so fixtures, the tester binary
// and host applications can exchange blueprints without sharing a probe
// channel-map format.
//
// ```json
// { "electrodes": [ { "shank": 0, "x": 0, "y": 20, "category": 1 } ] }
// ```
//
// Electrode order in the document is the electrode index order of the rebuilt
// grid. A missing `category` reads as unset.

use crate::core_modules::blueprint::{Blueprint, Category, UNSET};
use crate::core_modules::electrode_grid::{ElectrodeGrid, Position, Shank};
use crate::error::{BlueprintError, BlueprintResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectrodeRecord {
    pub shank: Shank,
    pub x: Position,
    pub y: Position,
    #[serde(default)]
    pub category: Category,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub electrodes: Vec<ElectrodeRecord>,
}

impl Snapshot {
    /// Records the grid and current categories of `blueprint`.
    pub fn capture(blueprint: &Blueprint) -> Self {
        let electrodes = blueprint
            .grid()
            .electrodes()
            .iter()
            .zip(blueprint.categories())
            .map(|(e, &category)| ElectrodeRecord {
                shank: e.shank,
                x: e.x,
                y: e.y,
                category,
            })
            .collect();
        Self { electrodes }
    }

    /// Rebuilds the grid and blueprint. Duplicated electrodes are rejected.
    pub fn to_blueprint(&self) -> BlueprintResult<Blueprint> {
        let grid = ElectrodeGrid::from_electrodes(self.electrodes.iter().map(|r| (r.shank, r.x, r.y)))?;
        let categories = self.electrodes.iter().map(|r| r.category).collect();
        Blueprint::from_categories(Arc::new(grid), categories)
    }

    /// Number of electrodes that carry a category.
    pub fn set_count(&self) -> usize {
        self.electrodes.iter().filter(|r| r.category != UNSET).count()
    }

    pub fn from_json(text: &str) -> BlueprintResult<Self> {
        serde_json::from_str(text).map_err(|e| BlueprintError::Snapshot(format!("invalid snapshot JSON: {e}")))
    }

    pub fn to_json(&self) -> BlueprintResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| BlueprintError::Snapshot(format!("failed to encode snapshot: {e}")))
    }

    pub fn read(path: impl AsRef<Path>) -> BlueprintResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| BlueprintError::Snapshot(format!("failed to read '{}': {e}", path.display())))?;
        Self::from_json(&text)
    }

    pub fn write(&self, path: impl AsRef<Path>) -> BlueprintResult<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)
            .map_err(|e| BlueprintError::Snapshot(format!("failed to write '{}': {e}", path.display())))
    }
}

impl From<&Blueprint> for Snapshot {
    fn from(blueprint: &Blueprint) -> Self {
        Self::capture(blueprint)
    }
}
