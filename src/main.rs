use anyhow::Context;
use clap::Parser;
use compute::merge_scores;
use data::{DestLayout, SourceLayout};
use read::load_scores;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod compute;
mod data;
mod read;
mod write;

/// Transfers per-assignment scores from a totals export into a gradebook
/// import file. The output may be left incomplete if the transfer fails.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// Totals export to read the scores from
    totals: PathBuf,
    /// Gradebook file to copy the scores into
    gradebook: PathBuf,
    /// Where to write the updated gradebook
    output: PathBuf,
    /// Number of assignments to transfer
    #[arg(value_parser = parse_assignments)]
    assignments: usize,
    /// Gradebook column (0-based, as named in its header) of the first assignment
    start_column: usize,
    /// Metadata lines at the top of the totals export
    #[arg(long, default_value_t = 8)]
    totals_header_lines: usize,
    /// Totals export column of the student id
    #[arg(long, default_value_t = 0)]
    totals_id_column: usize,
    /// Totals export column of the first assignment
    #[arg(long, default_value_t = 6)]
    totals_score_column: usize,
    /// Header lines at the top of the gradebook
    #[arg(long, default_value_t = 3)]
    gradebook_header_lines: usize,
    /// Gradebook field of the student id, counted after the name split
    #[arg(long, default_value_t = 3)]
    gradebook_id_column: usize,
    /// Extra fields produced by commas inside the gradebook name column
    #[arg(long, default_value_t = 1)]
    name_split: usize,
}

fn parse_assignments(arg: &str) -> Result<usize, String> {
    match arg.parse::<usize>() {
        Ok(0) => Err("must be at least 1".into()),
        Ok(count) => Ok(count),
        Err(e) => Err(e.to_string()),
    }
}

impl Cli {
    fn source_layout(&self) -> SourceLayout {
        SourceLayout {
            header_lines: self.totals_header_lines,
            id_column: self.totals_id_column,
            score_column: self.totals_score_column,
            ..SourceLayout::new(self.assignments)
        }
    }

    fn dest_layout(&self) -> DestLayout {
        DestLayout {
            header_lines: self.gradebook_header_lines,
            id_column: self.gradebook_id_column,
            name_split: self.name_split,
            ..DestLayout::new(self.start_column)
        }
    }
}

/// Whether `a` and `b` name the same file. Paths that don't exist yet can
/// only be compared as written.
fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn run(cli: &Cli) -> Result<(), anyhow::Error> {
    for input in [&cli.totals, &cli.gradebook] {
        if same_file(input, &cli.output) {
            anyhow::bail!(
                "output {} would overwrite input {}",
                cli.output.display(),
                input.display()
            );
        }
    }
    let totals = File::open(&cli.totals)
        .with_context(|| format!("opening totals export {}", cli.totals.display()))?;
    let gradebook = File::open(&cli.gradebook)
        .with_context(|| format!("opening gradebook {}", cli.gradebook.display()))?;
    let output = File::create(&cli.output)
        .with_context(|| format!("creating output {}", cli.output.display()))?;

    let scores = load_scores(totals, &cli.source_layout())
        .with_context(|| format!("reading scores from {}", cli.totals.display()))?;
    if scores.is_empty() {
        warn!("no student rows in {}", cli.totals.display());
    }
    info!(students = scores.len(), assignments = scores.assignments(), "loaded totals export");

    let mut output = BufWriter::new(output);
    let report = merge_scores(&scores, gradebook, &mut output, &cli.dest_layout())
        .with_context(|| format!("merging scores into {}", cli.gradebook.display()))?;
    output.flush()?;
    info!(
        merged = report.rows_merged,
        overwritten = report.overwritten_rows,
        left_out = report.unmatched_students,
        test_student = report.sentinel_reached,
        "wrote {}",
        cli.output.display()
    );
    Ok(())
}

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    run(&Cli::parse())
}
