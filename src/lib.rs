// THEORY:
// This file is the main entry point for the `probe_blueprint` library crate.
// It exposes the blueprint model of a neural probe: a fixed electrode grid, a
// per-electrode category overlay, and the spatial algorithms that group,
// outline and edit zones of equal category.
//
// The primary high-level interface is `BlueprintEditor`, which borrows a
// `Blueprint` for one editing session. The algorithm modules (`core_modules`)
// are public as well so hosts can run clustering or tracing on their own
// geometry through the `GridLookup` trait.

pub mod config;
pub mod core_modules;
pub mod error;

pub use config::EditorConfig;
pub use core_modules::blueprint::{Blueprint, Category, ElectrodeSelector, ElectrodeView, UNSET};
pub use core_modules::blueprint_editor::{AreaChange, AreaThreshold, BlueprintEditor, Movement};
pub use core_modules::clustering::{CategoryFilter, Clustering, Connectivity, Mode};
pub use core_modules::clustering_edges::{ClusteringEdges, Corner, CornerCode};
pub use core_modules::edge_worker_pool::EdgeWorkerPool;
pub use core_modules::electrode_grid::{Direction, Electrode, ElectrodeGrid, GridLookup};
pub use core_modules::electrode_mask::ElectrodeMask;
pub use core_modules::snapshot::Snapshot;
pub use error::{BlueprintError, BlueprintResult};
