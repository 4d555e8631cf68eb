// src/transform/mod.rs
pub mod date_parser;

use anyhow::{anyhow, Result};
use chrono::Datelike;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

use crate::load::Sample;
pub use date_parser::parse_sample_date;

/// Conclusion wording of a sample whose drinking water failed quality limits,
/// with or without the hyphen.
static NON_CONFORMING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Eau d'alimentation non[- ]conforme").expect("static regex is valid")
});

/// Number of non-conforming samples for one commune in one month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountRecord {
    pub year: i32,
    /// 1..=12
    pub month: u32,
    /// Uppercased `nomcommuneprinc`.
    pub commune: String,
    pub count: u64,
}

/// True when the conclusion text reports non-conforming drinking water.
/// Matching is case-sensitive; a missing conclusion never matches.
pub fn is_non_conforming(conclusion: Option<&str>) -> bool {
    conclusion.is_some_and(|c| NON_CONFORMING.is_match(c))
}

/// A cell that is absent or only whitespace.
fn present(cell: Option<&str>) -> Option<&str> {
    cell.map(str::trim).filter(|c| !c.is_empty())
}

/// Filter the non-conforming samples and count them per (year, month, commune).
///
/// Every non-blank date is parsed before filtering, so one malformed `dateprel`
/// fails the whole batch. Rows with a blank date or commune never form a group.
/// Output is sorted by (year, month, commune).
#[instrument(level = "debug", skip(samples), fields(rows = samples.len()))]
pub fn aggregate(samples: &[Sample]) -> Result<Vec<CountRecord>> {
    let mut groups: BTreeMap<(i32, u32, String), u64> = BTreeMap::new();
    let mut matched = 0usize;
    let mut incomplete = 0usize;

    for sample in samples {
        let date = match present(sample.dateprel.as_deref()) {
            Some(raw) => Some(
                parse_sample_date(raw).ok_or_else(|| anyhow!("unparseable dateprel {:?}", raw))?,
            ),
            None => None,
        };

        if !is_non_conforming(sample.conclusionprel.as_deref()) {
            continue;
        }
        matched += 1;

        let (Some(date), Some(commune)) = (date, present(sample.nomcommuneprinc.as_deref()))
        else {
            incomplete += 1;
            continue;
        };

        let key = (date.year(), date.month(), commune.to_uppercase());
        *groups.entry(key).or_insert(0) += 1;
    }

    debug!(matched, incomplete, groups = groups.len(), "aggregated samples");

    Ok(groups
        .into_iter()
        .map(|((year, month, commune), count)| CountRecord {
            year,
            month,
            commune,
            count,
        })
        .collect())
}
