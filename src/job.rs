//! Batch runner for one iteration step
//!
//! Reads every transition and rank line before aggregating anything, so a
//! malformed line fails the step without producing any output. The output
//! file is written atomically once aggregation has finished.

use crate::config::StepConfig;
use crate::error::{JobError, JobResult};
use crate::io::{for_each_line, open_input, write_lines_atomic};
use rankstep_core::{
    aggregate_parallel, expand_reporting, group_by_key, load_rank, AggregateError,
    CancellationFlag, ContributionRecord, Diagnostic, DiagnosticLog, DiagnosticSink, GroupOutput,
    Groups, TaggedRecord,
};
use serde::Serialize;
use std::io::BufRead;
use std::path::Path;
use tracing::info;

/// Counters for a finished step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StepReport {
    /// Non-blank transition lines read
    pub transitions: usize,
    /// Share edges produced by expansion
    pub edges: usize,
    /// Rank entries read
    pub ranks: usize,
    /// Distinct source/page keys
    pub groups: usize,
    /// Contribution records emitted
    pub contributions: usize,
    pub dangling_pages: usize,
    pub missing_ranks: usize,
    pub violations: usize,
}

/// Aggregated output of a step, before it is written anywhere
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Per-source output, sorted by source page id
    pub outputs: Vec<GroupOutput>,
    pub report: StepReport,
    pub diagnostics: Vec<Diagnostic>,
}

impl StepResult {
    pub fn contributions(&self) -> impl Iterator<Item = &ContributionRecord> {
        self.outputs.iter().flat_map(|output| output.contributions.iter())
    }
}

/// One PageRank iteration step over transition and rank inputs
pub struct StepJob {
    config: StepConfig,
    cancel: CancellationFlag,
}

impl StepJob {
    pub fn new(config: StepConfig) -> JobResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cancel: CancellationFlag::new(),
        })
    }

    pub fn config(&self) -> &StepConfig {
        &self.config
    }

    /// Handle that aborts the step at the next group boundary
    pub fn cancellation(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    /// Compute contributions from two line readers.
    ///
    /// `transitions_name` and `ranks_name` label errors.
    pub fn compute_from_readers<T, R>(
        &self,
        transitions: T,
        transitions_name: &str,
        ranks: R,
        ranks_name: &str,
    ) -> JobResult<StepResult>
    where
        T: BufRead,
        R: BufRead,
    {
        let log = DiagnosticLog::new();
        let mut records: Vec<TaggedRecord> = Vec::new();

        let transition_lines = for_each_line(transitions, transitions_name, |line| {
            records.extend(expand_reporting(line, &log)?.map(TaggedRecord::Edge));
            Ok(())
        })?;
        let edges = records.len();

        let rank_lines = for_each_line(ranks, ranks_name, |line| {
            records.push(TaggedRecord::Rank(load_rank(line)?));
            Ok(())
        })?;

        if self.cancel.is_cancelled() {
            return Err(AggregateError::Cancelled.into());
        }

        let groups = group_by_key(records);
        let mut outputs = self.aggregate(&groups, &log)?;
        outputs.sort_by(|a, b| a.source.cmp(&b.source));

        let diagnostics = log.into_entries();
        let report = StepReport {
            transitions: transition_lines,
            edges,
            ranks: rank_lines,
            groups: groups.len(),
            contributions: outputs.iter().map(|o| o.contributions.len()).sum(),
            dangling_pages: count(&diagnostics, |d| matches!(d, Diagnostic::DanglingPage { .. })),
            missing_ranks: count(&diagnostics, |d| matches!(d, Diagnostic::MissingRank { .. })),
            violations: count(&diagnostics, |d| {
                matches!(d, Diagnostic::InvariantViolation { .. })
            }),
        };

        Ok(StepResult {
            outputs,
            report,
            diagnostics,
        })
    }

    /// Compute contributions from transition and rank files
    pub fn compute(&self, transitions: &Path, ranks: &Path) -> JobResult<StepResult> {
        info!(
            transitions = %transitions.display(),
            ranks = %ranks.display(),
            damping_factor = self.config.damping_factor,
            "Starting iteration step"
        );
        self.compute_from_readers(
            open_input(transitions)?,
            &transitions.display().to_string(),
            open_input(ranks)?,
            &ranks.display().to_string(),
        )
    }

    /// Compute contributions and write `<destination>\t<amount>` lines to `output`
    pub fn run(&self, transitions: &Path, ranks: &Path, output: &Path) -> JobResult<StepReport> {
        let result = self.compute(transitions, ranks)?;

        if self.cancel.is_cancelled() {
            return Err(AggregateError::Cancelled.into());
        }
        write_lines_atomic(output, result.contributions())?;

        let report = result.report;
        info!(
            output = %output.display(),
            contributions = report.contributions,
            dangling_pages = report.dangling_pages,
            missing_ranks = report.missing_ranks,
            violations = report.violations,
            "Iteration step complete"
        );
        Ok(report)
    }

    fn aggregate(&self, groups: &Groups, sink: &dyn DiagnosticSink) -> JobResult<Vec<GroupOutput>> {
        let options = self.config.aggregate_options();
        let outputs = match self.config.threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
                pool.install(|| aggregate_parallel(groups, &options, sink, &self.cancel))?
            }
            None => aggregate_parallel(groups, &options, sink, &self.cancel)?,
        };
        Ok(outputs)
    }
}

fn count(diagnostics: &[Diagnostic], predicate: impl Fn(&Diagnostic) -> bool) -> usize {
    diagnostics.iter().filter(|d| predicate(d)).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rankstep_core::MissingRankPolicy;
    use std::io::Cursor;

    fn compute(transitions: &str, ranks: &str, config: StepConfig) -> JobResult<StepResult> {
        StepJob::new(config)?.compute_from_readers(
            Cursor::new(transitions.to_string()),
            "transitions",
            Cursor::new(ranks.to_string()),
            "ranks",
        )
    }

    fn lines(result: &StepResult) -> Vec<String> {
        result.contributions().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_reference_example() {
        let result = compute("A\tB,C\nB\tC\n", "A\t1.0\nB\t1.0\n", StepConfig::default()).unwrap();

        assert_eq!(lines(&result), vec!["B\t0.4", "C\t0.4", "C\t0.8"]);
        assert_eq!(
            result.report,
            StepReport {
                transitions: 2,
                edges: 3,
                ranks: 2,
                groups: 2,
                contributions: 3,
                ..StepReport::default()
            }
        );
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_dangling_page_counted() {
        let result = compute("A\tB\nP1\t\n", "A\t1.0\nP1\t1.0\n", StepConfig::default()).unwrap();

        assert_eq!(result.report.dangling_pages, 1);
        assert_eq!(result.report.contributions, 1);
        assert_eq!(result.diagnostics[0].page(), "P1");
    }

    #[test]
    fn test_negative_zero_rank_emits_zero() {
        let result = compute("A\tB\n", "A\t-0.0\n", StepConfig::default()).unwrap();
        assert_eq!(lines(&result), vec!["B\t0"]);
    }

    #[test]
    fn test_malformed_rank_aborts_step() {
        let err = compute("A\tB\nB\tA\n", "A\t1.0\nB\tNaNtext\n", StepConfig::default()).unwrap_err();
        match err {
            JobError::Malformed { input, line_number, source } => {
                assert_eq!(input, "ranks");
                assert_eq!(line_number, 2);
                assert!(source.to_string().contains("NaNtext"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_strict_missing_rank() {
        let config = StepConfig {
            missing_rank: MissingRankPolicy::Error,
            ..StepConfig::default()
        };
        let err = compute("A\tB\n", "", config).unwrap_err();
        assert!(matches!(err, JobError::Aggregate(AggregateError::MissingRank(ref page)) if page == "A"));
    }

    #[test]
    fn test_fixed_thread_pool() {
        let config = StepConfig {
            threads: Some(2),
            ..StepConfig::default()
        };
        let result = compute("A\tB,C\nB\tC\n", "A\t1.0\nB\t1.0\n", config).unwrap();
        assert_eq!(result.report.contributions, 3);
    }

    #[test]
    fn test_cancelled_before_aggregation() {
        let job = StepJob::new(StepConfig::default()).unwrap();
        job.cancellation().cancel();

        let err = job
            .compute_from_readers(Cursor::new("A\tB\n"), "t", Cursor::new("A\t1\n"), "r")
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = StepConfig {
            damping_factor: 2.0,
            ..StepConfig::default()
        };
        assert!(matches!(StepJob::new(config), Err(JobError::Config(_))));
    }
}
