pub mod blueprint;
pub mod blueprint_editor;
pub mod boundary_tracer;
pub mod clustering;
pub mod clustering_edges;
pub mod edge_worker_pool;
pub mod electrode_grid;
pub mod electrode_mask;
pub mod snapshot;
