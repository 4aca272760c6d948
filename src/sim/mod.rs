//! The simulation core: routing table, water state, row partitioning,
//! the reusable barrier, and the per-worker step engine.
//!
//! Everything in here is deterministic for a given elevation grid, rain
//! duration, and absorption rate, regardless of worker count.

pub mod barrier;
pub mod engine;
pub mod grid;
pub mod partition;
pub mod routing;

pub use barrier::CycleBarrier;
pub use engine::{run, SimError, SimOutcome};
pub use grid::WaterGrid;
pub use partition::partition_rows;
pub use routing::TrickleRoutes;
