// THEORY:
// Every fallible operation in the crate reports through `BlueprintError`.
// The taxonomy follows three rules:
// 1.  **Precondition violations** (mismatched lengths, indices outside the grid,
//     clusters that are empty or span shanks, area queries on a polygon with
//     no vertices) abort the whole operation before
//     anything is written. They are returned, never silently repaired.
// 2.  **Lookup misses** are not errors. A neighbour that does not exist is an
//     `Option::None` at the grid layer and never reaches this type.
// 3.  **Degenerate geometry** (zero pitch, single-electrode clusters, zero-area
//     polygons) has defined results and is not represented here either.

use thiserror::Error;

/// Errors raised by grid, blueprint, clustering and editing operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlueprintError {
    /// Two arrays or masks that must be parallel have different lengths.
    #[error("length mismatch in {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Which operand was checked.
        what: &'static str,
        /// Required length (usually the grid size).
        expected: usize,
        /// Length that was supplied.
        actual: usize,
    },

    /// An electrode index outside `0..len`.
    #[error("electrode index {index} out of range for grid of {len} electrodes")]
    IndexOutOfRange { index: usize, len: usize },

    /// Two electrodes share the same `(shank, x, y)` identity.
    #[error("duplicate electrode at shank {shank}, x={x}, y={y}")]
    DuplicateElectrode { shank: u32, x: i32, y: i32 },

    /// A cluster operation received no electrodes.
    #[error("cluster has no electrodes")]
    EmptyCluster,

    /// Cluster members were found on more than one shank.
    #[error("cluster spans shanks {first} and {second}")]
    MixedShanks { first: u32, second: u32 },

    /// An area query on a polygon with no vertices.
    #[error("polygon has no vertices")]
    EmptyPolygon,

    /// The boundary walk exceeded the number of reachable states.
    #[error("boundary trace did not close after {steps} steps")]
    UnclosedBoundary { steps: usize },

    /// Negative values where a step count or distance is required.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration could not be read, parsed or validated.
    #[error("configuration error: {0}")]
    Config(String),

    /// A snapshot document could not be encoded or decoded.
    #[error("snapshot error: {0}")]
    Snapshot(String),

    /// The edge worker pool stopped before answering.
    #[error("worker pool unavailable: {0}")]
    WorkerPool(&'static str),
}

/// Convenience alias used across the crate.
pub type BlueprintResult<T> = Result<T, BlueprintError>;

/// Fails with [`BlueprintError::LengthMismatch`] when `actual != expected`.
pub(crate) fn check_len(what: &'static str, expected: usize, actual: usize) -> BlueprintResult<()> {
    if expected != actual {
        return Err(BlueprintError::LengthMismatch {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}
