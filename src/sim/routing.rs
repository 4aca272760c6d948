//! Downhill routing table, precomputed once from the elevation field.
//!
//! For each cell: find the minimum elevation `m` among its 4-connected
//! neighbors (boundary cells simply have fewer candidates). A cell at
//! or below `m` is a sink and routes nowhere; otherwise it routes to
//! every neighbor sitting exactly at `m`, so ties fan water out evenly.
//! Membership depends only on elevation equality, never on traversal
//! order.
//!
//! The builder also records the inverse table: for each cell, the cells
//! that route water into it, in row-major source order. The gather
//! phase sums inflow over that fixed order, which is what makes results
//! bit-identical no matter how the grid is partitioned across workers.

use crate::elevation::ElevationField;

/// Axis-aligned neighbor offsets (up, down, right, left).
const DIRECTIONS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, 1), (0, -1)];

/// The immutable routing tables. Built once, read from every worker
/// thread without synchronization.
pub struct TrickleRoutes {
    /// For each cell, the flat indices water spills to (empty = sink).
    targets: Vec<Vec<usize>>,
    /// For each cell, the flat indices of cells that spill into it.
    sources: Vec<Vec<usize>>,
}

impl TrickleRoutes {
    /// Build the routing tables. Single-threaded: this is a one-time
    /// pass that is cheap relative to the simulation itself.
    pub fn build(field: &ElevationField) -> Self {
        let mut targets: Vec<Vec<usize>> = vec![Vec::new(); field.len()];
        let mut sources: Vec<Vec<usize>> = vec![Vec::new(); field.len()];

        for row in 0..field.height {
            for col in 0..field.width {
                let idx = field.index_of(row, col);

                let mut lowest: Option<i32> = None;
                for (dr, dc) in DIRECTIONS {
                    if let Some((nr, nc)) = neighbor_of(field, row, col, dr, dc) {
                        let elev = field.at(nr, nc);
                        lowest = Some(match lowest {
                            Some(m) => m.min(elev),
                            None => elev,
                        });
                    }
                }

                // No strictly lower neighbor (or no neighbor at all):
                // the cell is a sink and keeps its water.
                let lowest = match lowest {
                    Some(m) if field.at(row, col) > m => m,
                    _ => continue,
                };

                for (dr, dc) in DIRECTIONS {
                    if let Some((nr, nc)) = neighbor_of(field, row, col, dr, dc) {
                        if field.at(nr, nc) == lowest {
                            let nidx = field.index_of(nr, nc);
                            targets[idx].push(nidx);
                            sources[nidx].push(idx);
                        }
                    }
                }
            }
        }

        // Fixed gather order: inflow sources in row-major order, so the
        // per-cell summation sequence never depends on partitioning.
        for list in &mut sources {
            list.sort_unstable();
        }

        let sinks = targets.iter().filter(|t| t.is_empty()).count();
        log::debug!(
            "routing table built: {} cells, {} sinks",
            targets.len(),
            sinks
        );

        TrickleRoutes { targets, sources }
    }

    /// Cells this cell spills to (empty for sinks).
    #[inline]
    pub fn targets(&self, idx: usize) -> &[usize] {
        &self.targets[idx]
    }

    /// Cells that spill into this cell, in row-major order.
    #[inline]
    pub fn sources(&self, idx: usize) -> &[usize] {
        &self.sources[idx]
    }

    /// How many ways this cell's outflow splits.
    #[inline]
    pub fn fanout(&self, idx: usize) -> usize {
        self.targets[idx].len()
    }

    #[inline]
    pub fn is_sink(&self, idx: usize) -> bool {
        self.targets[idx].is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[inline]
fn neighbor_of(
    field: &ElevationField,
    row: usize,
    col: usize,
    dr: isize,
    dc: isize,
) -> Option<(usize, usize)> {
    let nr = row as isize + dr;
    let nc = col as isize + dc;
    if nr >= 0 && (nr as usize) < field.height && nc >= 0 && (nc as usize) < field.width {
        Some((nr as usize, nc as usize))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn field_from(text: &str, dimension: usize) -> ElevationField {
        ElevationField::from_reader(Cursor::new(text), dimension).unwrap()
    }

    #[test]
    fn test_single_cell_is_sink() {
        let field = field_from("7\n", 1);
        let routes = TrickleRoutes::build(&field);
        assert!(routes.is_sink(0));
        assert!(routes.sources(0).is_empty());
    }

    #[test]
    fn test_flat_grid_all_sinks() {
        let field = field_from("5 5 5\n5 5 5\n5 5 5\n", 3);
        let routes = TrickleRoutes::build(&field);
        for idx in 0..routes.len() {
            assert!(routes.is_sink(idx), "cell {} should be a sink", idx);
        }
    }

    #[test]
    fn test_unique_minimum_neighbor() {
        // 2 1: the left cell routes only to the right cell.
        let field = field_from("2 1\n", 2);
        let routes = TrickleRoutes::build(&field);
        assert_eq!(routes.targets(0), &[1]);
        assert!(routes.is_sink(1));
        assert_eq!(routes.sources(1), &[0]);
    }

    #[test]
    fn test_tied_minimums_fan_out() {
        // Center is higher than all four neighbors; north and west tie
        // at the minimum, so the target set has exactly those two.
        let field = field_from("9 1 9\n1 5 3\n9 2 9\n", 3);
        let routes = TrickleRoutes::build(&field);
        let center = field.index_of(1, 1);
        let mut targets = routes.targets(center).to_vec();
        targets.sort_unstable();
        assert_eq!(targets, vec![field.index_of(0, 1), field.index_of(1, 0)]);
        assert_eq!(routes.fanout(center), 2);
    }

    #[test]
    fn test_equal_neighbor_is_not_a_target() {
        // 3 3 1: the middle cell's neighbors are {3, 1}; min is 1, so
        // only the right cell is a target, never the equal-height left.
        let field = field_from("3 3 1\n", 3);
        let routes = TrickleRoutes::build(&field);
        assert_eq!(routes.targets(1), &[2]);
        // The left cell sits at the minimum of its single neighbor,
        // so it is a sink.
        assert!(routes.is_sink(0));
    }

    #[test]
    fn test_boundary_cells_use_existing_neighbors_only() {
        // Corner (0,0) has exactly two neighbors.
        let field = field_from("5 1\n2 9\n", 2);
        let routes = TrickleRoutes::build(&field);
        let corner = field.index_of(0, 0);
        assert_eq!(routes.targets(corner), &[field.index_of(0, 1)]);
    }

    #[test]
    fn test_sources_mirror_targets() {
        let field = field_from("4 3 2\n3 2 1\n2 1 0\n", 3);
        let routes = TrickleRoutes::build(&field);
        for idx in 0..routes.len() {
            for &target in routes.targets(idx) {
                assert!(
                    routes.sources(target).contains(&idx),
                    "target {} missing source {}",
                    target,
                    idx
                );
            }
            for &src in routes.sources(idx) {
                assert!(
                    routes.targets(src).contains(&idx),
                    "source {} missing target {}",
                    src,
                    idx
                );
            }
        }
    }

    #[test]
    fn test_sources_are_row_major_sorted() {
        let field = field_from("9 9 9\n9 0 9\n9 9 9\n", 3);
        let routes = TrickleRoutes::build(&field);
        let center = field.index_of(1, 1);
        let sources = routes.sources(center);
        assert_eq!(sources.len(), 4);
        assert!(sources.windows(2).all(|w| w[0] < w[1]));
    }
}
