//! Mutable per-cell water state.
//!
//! `surface` and `absorbed` are logically partitioned: each worker owns
//! a band of rows and is handed exclusive mutable slices over them.
//! The one genuinely shared-write structure is the outflow buffer,
//! sharded by row behind a mutex: the owning worker overwrites its rows
//! during the spill phase, and after the barrier any worker may read
//! the rows adjacent to its band during the gather phase.

use std::sync::{Mutex, MutexGuard};

/// The two per-cell running totals, flat row-major, zero-filled.
///
/// Invariants held by the engine: `surface` never goes negative and
/// `absorbed` never decreases.
pub struct WaterGrid {
    pub height: usize,
    pub width: usize,
    pub surface: Vec<f64>,
    pub absorbed: Vec<f64>,
}

impl WaterGrid {
    pub fn new(height: usize, width: usize) -> Self {
        WaterGrid {
            height,
            width,
            surface: vec![0.0; height * width],
            absorbed: vec![0.0; height * width],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.surface.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.surface.is_empty()
    }
}

/// Per-tick spill amounts, one lock per grid row.
///
/// Every row is fully overwritten by its owner each tick (cells that do
/// not spill record 0.0), so no stale value survives a tick boundary.
/// Cross-worker reads only happen after the spill barrier, when the
/// values are stable; the locks exist to make the sharing sound, not to
/// arbitrate live contention.
pub struct OutflowBuffer {
    width: usize,
    rows: Vec<Mutex<Vec<f64>>>,
}

impl OutflowBuffer {
    pub fn new(height: usize, width: usize) -> Self {
        OutflowBuffer {
            width,
            rows: (0..height).map(|_| Mutex::new(vec![0.0; width])).collect(),
        }
    }

    /// Lock one row. Callers locking several rows must acquire them in
    /// ascending row order; the engine's gather phase relies on that to
    /// stay deadlock-free.
    #[inline]
    pub fn lock_row(&self, row: usize) -> MutexGuard<'_, Vec<f64>> {
        self.rows[row].lock().unwrap()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }
}
