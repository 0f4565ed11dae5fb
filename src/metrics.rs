//! CSV rows for the plotting scripts, one line per run.
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use crate::harness::RunReport;

pub const HEADER: &str = "algorithm,threads,hashbits,buckets,data_size,duration,cores";

/// Formats one row. Duration is in milliseconds; `hashbits` is empty when the
/// bucket count is not a power of two.
pub fn row(report: &RunReport) -> String {
    let c = &report.config;
    let bits = c.hash_bits().map(|b| b.to_string()).unwrap_or_default();
    format!(
        "{},{},{},{},{},{},{}",
        report.strategy.name(),
        c.num_workers,
        bits,
        c.num_buckets,
        c.num_records,
        report.elapsed.as_micros() as f64 / 1e3,
        report.cores,
    )
}

/// Appends the row for `report` to `path`, writing the header first when the
/// file is new or empty.
pub fn append(path: &Path, report: &RunReport) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    if file.metadata()?.len() == 0 {
        writeln!(file, "{HEADER}")?;
    }
    writeln!(file, "{}", row(report))
}
