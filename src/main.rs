use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use rainfall::{report, sim, ElevationField, TrickleRoutes};

/// Parallel rainfall simulation over a square elevation grid.
#[derive(Parser, Debug)]
#[command(name = "rainfall")]
#[command(about = "Simulate rain accumulating, absorbing, and trickling downhill", long_about = None)]
struct Args {
    /// Number of worker threads
    threads: usize,

    /// Number of time steps during which rain falls
    rain_steps: u64,

    /// Absorption rate per time step (raindrops per cell)
    absorb_rate: f64,

    /// Grid dimension (the grid is dimension x dimension)
    dimension: usize,

    /// Path to the elevation file, one row of integers per line
    elevation_file: PathBuf,

    /// Also write the report to this file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    anyhow::ensure!(args.threads >= 1, "thread count must be at least 1");
    anyhow::ensure!(args.dimension >= 1, "grid dimension must be at least 1");

    let field = ElevationField::load(&args.elevation_file, args.dimension)
        .with_context(|| format!("loading {}", args.elevation_file.display()))?;
    let routes = TrickleRoutes::build(&field);

    let outcome = sim::run(
        &field,
        &routes,
        args.threads,
        args.rain_steps,
        args.absorb_rate,
    )?;

    let stdout = io::stdout();
    report::write_report(&mut stdout.lock(), &outcome)?;

    if let Some(path) = &args.output {
        let file = File::create(path)
            .with_context(|| format!("creating output file {}", path.display()))?;
        report::write_report(&mut BufWriter::new(file), &outcome)
            .with_context(|| format!("writing report to {}", path.display()))?;
    }

    Ok(())
}
