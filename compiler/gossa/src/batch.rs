//! Parallel harness runs over several entries.

use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::{run, HarnessConfig, HarnessError, RunReport};

/// One entry of a batch: its log and how it ended.
#[derive(Debug)]
pub struct EntryResult {
    pub entry: String,
    /// Everything the harness logged for this entry, verdict included.
    pub log: Vec<u8>,
    pub outcome: Result<RunReport, HarnessError>,
}

impl EntryResult {
    pub fn passed(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn log_text(&self) -> String {
        String::from_utf8_lossy(&self.log).into_owned()
    }
}

/// Results of [`run_batch`], in the order the entries were given.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub results: Vec<EntryResult>,
    pub passed: usize,
    pub failed: usize,
    /// Failures in the fatal tier.
    pub fatal: usize,
    pub elapsed: Duration,
}

impl BatchSummary {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &EntryResult> {
        self.results.iter().filter(|r| !r.passed())
    }
}

/// Run every entry with `base`'s settings, in parallel.
///
/// Each run has its own log and captured output, so a failing program
/// cannot affect the others; fatal failures are counted, not acted on.
#[tracing::instrument(level = "info", skip_all, fields(entries = entries.len()))]
pub fn run_batch(base: &HarnessConfig, entries: &[String]) -> BatchSummary {
    let start = Instant::now();
    let results: Vec<EntryResult> = entries
        .par_iter()
        .map(|entry| {
            let config = base.clone().with_entry(entry.as_str());
            let mut log = Vec::new();
            let outcome = run(&config, &mut log);
            EntryResult {
                entry: entry.clone(),
                log,
                outcome,
            }
        })
        .collect();

    let mut summary = BatchSummary {
        results,
        ..BatchSummary::default()
    };
    for result in &summary.results {
        match &result.outcome {
            Ok(_) => summary.passed += 1,
            Err(error) => {
                summary.failed += 1;
                if error.is_fatal() {
                    summary.fatal += 1;
                }
            }
        }
    }
    summary.elapsed = start.elapsed();
    tracing::info!(
        passed = summary.passed,
        failed = summary.failed,
        "batch finished"
    );
    summary
}

#[cfg(test)]
mod tests;
