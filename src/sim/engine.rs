//! The barrier-synchronized step engine.
//!
//! One worker thread per row band, all advancing in lock-step. Each
//! tick runs the same phases on every worker:
//!
//! 1. Rain + absorb + spill over its own rows, recording each cell's
//!    outflow (row lock held while writing).
//! 2. Barrier: no gather read happens until every spill write landed.
//! 3. Gather: pull each owned cell's share of its sources' outflow and
//!    note whether the band ended the tick dry.
//! 4. AND the local verdict into the shared `all_dry` flag.
//! 5. Barrier: every verdict lands before anyone inspects the flag.
//! 6. If the flag held, the tick drained the grid; all workers return
//!    the same step count.
//! 7. Barrier, then reset the flag for the next tick. The third wait
//!    keeps a slow worker from reading a flag already reset for the
//!    tick after this one.
//!
//! The gather phase sums inflow in the routing table's fixed source
//! order, so the final grid is bit-identical for any worker count.

use std::error::Error;
use std::fmt;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::elevation::ElevationField;
use crate::sim::barrier::CycleBarrier;
use crate::sim::grid::{OutflowBuffer, WaterGrid};
use crate::sim::partition::partition_rows;
use crate::sim::routing::TrickleRoutes;

/// How much surface water a non-sink cell can shed per tick.
const SPILL_CAP: f64 = 1.0;

/// Result surface handed back to the caller once the grid is dry.
#[derive(Debug)]
pub struct SimOutcome {
    /// Ticks until the grid was completely dry (1-based; the final
    /// tick is counted).
    pub steps: u64,
    /// Wall-clock duration of the threaded run.
    pub elapsed: Duration,
    pub height: usize,
    pub width: usize,
    /// Final absorbed totals, flat row-major.
    pub absorbed: Vec<f64>,
}

impl SimOutcome {
    #[inline]
    pub fn absorbed_at(&self, row: usize, col: usize) -> f64 {
        self.absorbed[row * self.width + col]
    }
}

/// Ways a run can be refused before any worker is spawned.
#[derive(Debug)]
pub enum SimError {
    NoWorkers,
    BadAbsorbRate(f64),
    /// With zero absorption and rain scheduled, water can never leave
    /// the system, so dryness is unreachable. Surfaced here instead of
    /// looping forever.
    NeverDrains,
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::NoWorkers => write!(f, "worker thread count must be at least 1"),
            SimError::BadAbsorbRate(rate) => {
                write!(f, "absorption rate must be finite and non-negative, got {}", rate)
            }
            SimError::NeverDrains => write!(
                f,
                "absorption rate is 0 while rain is scheduled; the grid would never dry"
            ),
        }
    }
}

impl Error for SimError {}

/// State shared by every worker for the lifetime of the run.
struct Shared<'a> {
    routes: &'a TrickleRoutes,
    width: usize,
    rain_steps: u64,
    absorb_rate: f64,
    outflow: OutflowBuffer,
    barrier: CycleBarrier,
    all_dry: AtomicBool,
}

/// One worker's exclusive view: its row range and mutable slices over
/// exactly those rows of `surface` and `absorbed`.
struct WorkerBand<'a> {
    rows: Range<usize>,
    surface: &'a mut [f64],
    absorbed: &'a mut [f64],
}

/// Run the simulation to natural termination.
///
/// Rain falls on ticks `1..=rain_steps` (the window is inclusive of its
/// final tick). Every validation failure is reported before a single
/// thread is spawned; there is no early-abort path afterwards.
pub fn run(
    field: &ElevationField,
    routes: &TrickleRoutes,
    workers: usize,
    rain_steps: u64,
    absorb_rate: f64,
) -> Result<SimOutcome, SimError> {
    if workers == 0 {
        return Err(SimError::NoWorkers);
    }
    if !absorb_rate.is_finite() || absorb_rate < 0.0 {
        return Err(SimError::BadAbsorbRate(absorb_rate));
    }
    if absorb_rate == 0.0 && rain_steps > 0 {
        return Err(SimError::NeverDrains);
    }
    debug_assert_eq!(routes.len(), field.len(), "routes built for another field");

    let height = field.height;
    let width = field.width;
    let mut grid = WaterGrid::new(height, width);
    let parts = partition_rows(height, workers);

    let shared = Shared {
        routes,
        width,
        rain_steps,
        absorb_rate,
        outflow: OutflowBuffer::new(height, width),
        barrier: CycleBarrier::new(workers),
        all_dry: AtomicBool::new(true),
    };

    log::info!(
        "simulating {}x{} grid on {} workers (rain for {} steps, absorb {} per step)",
        height,
        width,
        workers,
        rain_steps,
        absorb_rate
    );

    let start = Instant::now();
    let steps = {
        let bands = make_bands(&parts, width, &mut grid.surface, &mut grid.absorbed);
        let shared = &shared;
        thread::scope(|scope| {
            let handles: Vec<_> = bands
                .into_iter()
                .map(|band| scope.spawn(move || worker_loop(shared, band)))
                .collect();
            let counts: Vec<u64> = handles
                .into_iter()
                .map(|handle| handle.join().expect("worker thread panicked"))
                .collect();
            // Every worker decides off the same post-barrier flag.
            debug_assert!(
                counts.windows(2).all(|pair| pair[0] == pair[1]),
                "workers disagreed on the step count: {:?}",
                counts
            );
            counts[0]
        })
    };
    let elapsed = start.elapsed();

    log::info!("grid drained after {} steps in {:.3?}", steps, elapsed);

    Ok(SimOutcome {
        steps,
        elapsed,
        height,
        width,
        absorbed: grid.absorbed,
    })
}

/// Carve `surface`/`absorbed` into per-partition mutable row bands.
fn make_bands<'a>(
    parts: &[Range<usize>],
    width: usize,
    mut surface: &'a mut [f64],
    mut absorbed: &'a mut [f64],
) -> Vec<WorkerBand<'a>> {
    let mut bands = Vec::with_capacity(parts.len());
    for rows in parts {
        let cells = rows.len() * width;
        let (surface_band, surface_rest) = surface.split_at_mut(cells);
        let (absorbed_band, absorbed_rest) = absorbed.split_at_mut(cells);
        surface = surface_rest;
        absorbed = absorbed_rest;
        bands.push(WorkerBand {
            rows: rows.clone(),
            surface: surface_band,
            absorbed: absorbed_band,
        });
    }
    bands
}

/// The per-worker tick loop. Returns the 1-based step count at which
/// this worker observed global dryness. A worker with an empty band
/// still executes every barrier wait, or the protocol would stall.
fn worker_loop(shared: &Shared<'_>, band: WorkerBand<'_>) -> u64 {
    let width = shared.width;
    let height = shared.outflow.height();
    let WorkerBand {
        rows,
        surface,
        absorbed,
    } = band;

    let mut step: u64 = 0;
    loop {
        step += 1;
        let raining = step <= shared.rain_steps;

        // Phase 1: rain, absorb, spill over owned rows.
        for (local, row) in rows.clone().enumerate() {
            let base = local * width;
            let mut outflow = shared.outflow.lock_row(row);
            spill_row(
                &mut surface[base..base + width],
                &mut absorbed[base..base + width],
                &mut outflow,
                shared.routes,
                row * width,
                raining,
                shared.absorb_rate,
            );
        }

        shared.barrier.wait();

        // Phase 2: gather inflow and check for dryness. Locks are taken
        // in ascending row order so concurrent multi-row acquisition
        // cannot cycle.
        let mut locally_dry = true;
        for (local, row) in rows.clone().enumerate() {
            let base = local * width;
            let above = (row > 0).then(|| shared.outflow.lock_row(row - 1));
            let own = shared.outflow.lock_row(row);
            let below = (row + 1 < height).then(|| shared.outflow.lock_row(row + 1));
            let row_dry = gather_row(
                &mut surface[base..base + width],
                shared.routes,
                row,
                width,
                above.as_deref().map(|r| &r[..]),
                &own,
                below.as_deref().map(|r| &r[..]),
            );
            locally_dry &= row_dry;
        }

        shared.all_dry.fetch_and(locally_dry, Ordering::SeqCst);

        shared.barrier.wait();

        if shared.all_dry.load(Ordering::SeqCst) {
            return step;
        }

        shared.barrier.wait();
        // Idempotent across workers; nobody reads the flag again until
        // after the next tick's reduce.
        shared.all_dry.store(true, Ordering::SeqCst);
    }
}

/// Phase 1 for one row: rain (while it lasts), soak water into the
/// ground, then shed up to [`SPILL_CAP`] of the remainder toward
/// downhill neighbors. The row's outflow slots are fully overwritten,
/// zeros included, so nothing stale survives the tick.
fn spill_row(
    surface: &mut [f64],
    absorbed: &mut [f64],
    outflow: &mut [f64],
    routes: &TrickleRoutes,
    row_base: usize,
    raining: bool,
    absorb_rate: f64,
) {
    for col in 0..surface.len() {
        if raining {
            surface[col] += 1.0;
        }
        if surface[col] > 0.0 {
            let soaked = surface[col].min(absorb_rate);
            surface[col] -= soaked;
            absorbed[col] += soaked;
        }
        outflow[col] = if surface[col] > 0.0 && !routes.is_sink(row_base + col) {
            let shed = surface[col].min(SPILL_CAP);
            surface[col] -= shed;
            shed
        } else {
            0.0
        };
    }
}

/// Phase 2 for one row: pull each cell's share of its sources' outflow.
/// Sources sit at most one row away, so the three slices cover every
/// case. Returns whether the row ended the tick dry.
fn gather_row(
    surface: &mut [f64],
    routes: &TrickleRoutes,
    row: usize,
    width: usize,
    above: Option<&[f64]>,
    own: &[f64],
    below: Option<&[f64]>,
) -> bool {
    let mut dry = true;
    for col in 0..width {
        let idx = row * width + col;
        let mut inflow = 0.0;
        for &src in routes.sources(idx) {
            let src_row = src / width;
            let outflow_row = if src_row == row {
                own
            } else if src_row + 1 == row {
                above.expect("source row above the grid edge")
            } else {
                below.expect("source row below the grid edge")
            };
            inflow += outflow_row[src % width] / routes.fanout(src) as f64;
        }
        surface[col] += inflow;
        if surface[col] > 0.0 {
            dry = false;
        }
    }
    dry
}
