//! Result printing, kept writer-generic so the same report goes to the
//! console and to an optional output file.

use std::io::{self, Write};

use crate::sim::engine::SimOutcome;

/// Render the step count, runtime, and absorbed grid.
pub fn write_report<W: Write>(out: &mut W, outcome: &SimOutcome) -> io::Result<()> {
    writeln!(
        out,
        "Rainfall simulation completed in {} time steps.",
        outcome.steps
    )?;
    writeln!(
        out,
        "Runtime: {:.6} seconds",
        outcome.elapsed.as_secs_f64()
    )?;
    writeln!(out)?;
    writeln!(
        out,
        "The following grid shows the number of raindrops absorbed at each point:"
    )?;

    for row in 0..outcome.height {
        for col in 0..outcome.width {
            if col > 0 {
                write!(out, " ")?;
            }
            write!(out, "{:8.6}", outcome.absorbed_at(row, col))?;
        }
        writeln!(out)?;
    }

    Ok(())
}
