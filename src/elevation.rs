//! Elevation grid loading and access.

use std::error::Error;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// An immutable square grid of integer elevations, loaded once before
/// the simulation starts.
#[derive(Debug)]
pub struct ElevationField {
    pub height: usize,
    pub width: usize,
    cells: Vec<i32>,
}

/// Why an elevation source could not be turned into a field.
///
/// Loading is strict: a short row, a long row, a missing row, or an
/// unparsable token all fail the load. Proceeding with a zero-filled or
/// partially filled grid would silently change the simulation result.
#[derive(Debug)]
pub enum LoadError {
    Io(io::Error),
    BadToken {
        line: usize,
        token: String,
    },
    RowWidth {
        line: usize,
        expected: usize,
        found: usize,
    },
    RowCount {
        expected: usize,
        found: usize,
    },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io(err) => write!(f, "failed to read elevation data: {}", err),
            LoadError::BadToken { line, token } => {
                write!(f, "line {}: '{}' is not an integer elevation", line, token)
            }
            LoadError::RowWidth {
                line,
                expected,
                found,
            } => write!(
                f,
                "line {}: expected {} columns, found {}",
                line, expected, found
            ),
            LoadError::RowCount { expected, found } => {
                write!(f, "expected {} rows, found {}", expected, found)
            }
        }
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LoadError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for LoadError {
    fn from(err: io::Error) -> Self {
        LoadError::Io(err)
    }
}

impl ElevationField {
    /// Load a `dimension` x `dimension` field from a file.
    pub fn load(path: &Path, dimension: usize) -> Result<Self, LoadError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), dimension)
    }

    /// Parse a field from any buffered reader: one row per line,
    /// whitespace-separated integers. Row count and per-row column
    /// count must both equal `dimension`.
    pub fn from_reader<R: BufRead>(reader: R, dimension: usize) -> Result<Self, LoadError> {
        let mut cells = Vec::with_capacity(dimension * dimension);
        let mut rows = 0usize;

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                // Tolerate blank lines (typically a trailing newline).
                continue;
            }

            let mut row_len = 0usize;
            for token in line.split_whitespace() {
                let value: i32 = token.parse().map_err(|_| LoadError::BadToken {
                    line: line_no + 1,
                    token: token.to_string(),
                })?;
                cells.push(value);
                row_len += 1;
            }

            if row_len != dimension {
                return Err(LoadError::RowWidth {
                    line: line_no + 1,
                    expected: dimension,
                    found: row_len,
                });
            }
            rows += 1;
        }

        if rows != dimension {
            return Err(LoadError::RowCount {
                expected: dimension,
                found: rows,
            });
        }

        Ok(ElevationField {
            height: dimension,
            width: dimension,
            cells,
        })
    }

    /// Build a field directly from cells (flat row-major). The engine
    /// itself is agnostic to squareness; only the loader enforces the
    /// square-grid invariant of the CLI.
    pub fn from_cells(height: usize, width: usize, cells: Vec<i32>) -> Self {
        assert_eq!(
            cells.len(),
            height * width,
            "cell count must match dimensions"
        );
        ElevationField {
            height,
            width,
            cells,
        }
    }

    /// Calculate the linear index for a (row, col) coordinate.
    #[inline]
    pub fn index_of(&self, row: usize, col: usize) -> usize {
        row * self.width + col
    }

    /// Elevation at a (row, col) coordinate.
    #[inline]
    pub fn at(&self, row: usize, col: usize) -> i32 {
        self.cells[self.index_of(row, col)]
    }

    /// Total cell count.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
