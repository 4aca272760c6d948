//! Row partitioning: one contiguous band per worker.

use std::ops::Range;

/// Split `0..height` into exactly `workers` contiguous ranges, balanced
/// to within one row. When `workers > height` the trailing ranges are
/// empty; the engine still runs a worker for each so the barrier party
/// count stays consistent.
pub fn partition_rows(height: usize, workers: usize) -> Vec<Range<usize>> {
    assert!(workers > 0, "cannot partition rows across zero workers");

    let base = height / workers;
    let extra = height % workers;

    let mut ranges = Vec::with_capacity(workers);
    let mut start = 0;
    for i in 0..workers {
        let len = base + usize::from(i < extra);
        ranges.push(start..start + len);
        start += len;
    }
    ranges
}
