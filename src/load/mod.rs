// src/load/mod.rs
use anyhow::{bail, Context, Result};
use csv::ReaderBuilder;
use glob::{glob, Pattern};
use serde::Deserialize;
use std::{
    fs::File,
    io::BufReader,
    ops::RangeInclusive,
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::{debug, info, instrument};

use crate::transform::{self, CountRecord};

/// Columns every sample file must carry in its header row.
pub const REQUIRED_COLUMNS: [&str; 3] = ["dateprel", "nomcommuneprinc", "conclusionprel"];

/// One water sample, as read from a `DIS_PLV_*` export. Other columns are ignored.
/// Empty cells deserialize to `None`.
#[derive(Debug, Clone, Deserialize)]
pub struct Sample {
    pub dateprel: Option<String>,
    pub nomcommuneprinc: Option<String>,
    pub conclusionprel: Option<String>,
}

/// All `<prefix>_<year>_*.txt` files under `dataset_dir`, sorted by path.
/// No match is not an error.
pub fn year_files(dataset_dir: &Path, prefix: &str, year: i32) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/{}_{}_*.txt",
        Pattern::escape(&dataset_dir.to_string_lossy()),
        prefix,
        year
    );
    let mut files = Vec::new();
    for entry in glob(&pattern).with_context(|| format!("invalid glob pattern {}", pattern))? {
        let path = entry.with_context(|| format!("reading matches of {}", pattern))?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Parse one comma-delimited sample file with a header row.
#[instrument(level = "info", skip(path), fields(path = %path.display()))]
pub fn read_samples(path: &Path) -> Result<Vec<Sample>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut rdr = ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(true)
        .from_reader(BufReader::new(file));

    let headers = rdr
        .headers()
        .with_context(|| format!("reading header row of {}", path.display()))?
        .clone();
    for col in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h.trim() == col) {
            bail!("{}: missing required column `{}`", path.display(), col);
        }
    }

    let mut samples = Vec::new();
    for (idx, result) in rdr.deserialize::<Sample>().enumerate() {
        // +2: header row, then 1-based line numbers
        let sample = result
            .with_context(|| format!("CSV parse error in {} at line {}", path.display(), idx + 2))?;
        samples.push(sample);
    }

    debug!(rows = samples.len(), "read sample file");
    Ok(samples)
}

/// Read every year's files, aggregate each year separately, and concatenate
/// the per-year counts in year order.
pub fn load_and_process(
    dataset_dir: &Path,
    prefix: &str,
    years: RangeInclusive<i32>,
) -> Result<Vec<CountRecord>> {
    let mut combined = Vec::new();

    for year in years {
        info!("processing year {}", year);
        let start = Instant::now();

        let files = year_files(dataset_dir, prefix, year)?;
        if files.is_empty() {
            debug!(year, "no files, skipping");
            continue;
        }

        let mut yearly: Vec<Sample> = Vec::new();
        for path in &files {
            yearly.extend(read_samples(path)?);
        }

        let counts = transform::aggregate(&yearly)
            .with_context(|| format!("aggregating samples for {}", year))?;
        info!(
            year,
            files = files.len(),
            samples = yearly.len(),
            groups = counts.len(),
            elapsed = ?start.elapsed(),
            "year done"
        );
        combined.extend(counts);
    }

    Ok(combined)
}
