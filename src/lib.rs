//! Rainfall - Parallel Raindrop Simulation
//!
//! Simulates rain falling on a square elevation grid: each tick, every
//! cell receives rain (while it lasts), absorbs some water into the
//! ground, and spills surplus water toward its lowest neighbors. A
//! fixed pool of worker threads advances the grid in lock-step through
//! a reusable barrier until no surface water remains anywhere.
//!
//! The library exposes the elevation loader, the simulation engine, and
//! the report formatter; `main.rs` is a thin CLI over them.

pub mod elevation;
pub mod report;
pub mod sim;

pub use elevation::{ElevationField, LoadError};
pub use sim::engine::{run, SimError, SimOutcome};
pub use sim::routing::TrickleRoutes;
