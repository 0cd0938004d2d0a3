//! Keyed summation of contribution records
//!
//! The downstream step that turns per-source contributions into the new
//! rank vector. Kept outside the aggregation core.

use crate::error::JobResult;
use crate::io::{for_each_line, open_input, write_lines_atomic};
use rankstep_core::common::{parse_keyed_value, FIELD_SEPARATOR};
use rankstep_core::{ContributionRecord, PageId, RecordResult};
use rustc_hash::FxHashMap;
use std::path::Path;
use tracing::info;

/// Running per-destination sums
#[derive(Debug, Default)]
pub struct Accumulator {
    sums: FxHashMap<PageId, f64>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, destination: &str, amount: f64) {
        match self.sums.get_mut(destination) {
            Some(sum) => *sum += amount,
            None => {
                self.sums.insert(destination.to_string(), amount);
            }
        }
    }

    pub fn add_record(&mut self, record: &ContributionRecord) {
        self.add(&record.destination, record.amount);
    }

    /// Parse a `<destination>\t<amount>` line and add it
    pub fn add_line(&mut self, line: &str) -> RecordResult<()> {
        let (destination, amount) = parse_keyed_value(line)?;
        self.add(&destination, amount);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.sums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sums.is_empty()
    }

    /// Sums sorted by page id
    pub fn into_sorted(self) -> Vec<(PageId, f64)> {
        let mut sums: Vec<_> = self.sums.into_iter().collect();
        sums.sort_by(|a, b| a.0.cmp(&b.0));
        sums
    }
}

/// Sum contribution records per destination, sorted by page id
pub fn accumulate<'a, I>(records: I) -> Vec<(PageId, f64)>
where
    I: IntoIterator<Item = &'a ContributionRecord>,
{
    let mut accumulator = Accumulator::new();
    for record in records {
        accumulator.add_record(record);
    }
    accumulator.into_sorted()
}

/// Sum a contribution file into a `<page>\t<rank>` file
pub fn accumulate_file(input: &Path, output: &Path) -> JobResult<usize> {
    let mut accumulator = Accumulator::new();
    let lines = for_each_line(open_input(input)?, &input.display().to_string(), |line| {
        accumulator.add_line(line)
    })?;

    let pages = accumulator.len();
    write_lines_atomic(
        output,
        accumulator
            .into_sorted()
            .into_iter()
            .map(|(page, rank)| format!("{}{}{}", page, FIELD_SEPARATOR, rank)),
    )?;

    info!(input = %input.display(), lines, pages, "Accumulated contributions");
    Ok(pages)
}
