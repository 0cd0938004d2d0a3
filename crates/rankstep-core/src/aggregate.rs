//! Grouped aggregation
//!
//! Joins share edges with prior ranks by source page and emits, for every
//! edge, the damped contribution `share * prior_rank * (1 - damping_factor)`.
//! Groups are independent; [`aggregate_parallel`] fans them out over rayon.

use crate::common::{ContributionRecord, PageId, ShareEdge, TaggedRecord};
use crate::diagnostics::{Diagnostic, DiagnosticSink, Violation};
use crate::error::{AggregateError, AggregateResult};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Damping factor used when none is configured
pub const DEFAULT_DAMPING_FACTOR: f64 = 0.2;

/// Allowed distance of a source's share sum from 1.0
pub const DEFAULT_SHARE_TOLERANCE: f64 = 1e-9;

/// Records grouped by source page
pub type Groups = FxHashMap<PageId, Vec<TaggedRecord>>;

/// What to do with a source that has edges but no prior rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MissingRankPolicy {
    /// Use a prior rank of 0 and report [`Diagnostic::MissingRank`]
    #[default]
    Zero,
    /// Fail the run with [`AggregateError::MissingRank`]
    Error,
}

/// What to do with the output of a group that broke an invariant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ViolationPolicy {
    /// Emit the group's contributions anyway
    #[default]
    PassThrough,
    /// Drop every contribution of the group
    Suppress,
}

/// Aggregation parameters, passed explicitly to every call
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateOptions {
    /// Fraction of rank a page keeps; `1 - damping_factor` is redistributed
    pub damping_factor: f64,
    pub missing_rank: MissingRankPolicy,
    pub on_violation: ViolationPolicy,
    pub share_tolerance: f64,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            damping_factor: DEFAULT_DAMPING_FACTOR,
            missing_rank: MissingRankPolicy::default(),
            on_violation: ViolationPolicy::default(),
            share_tolerance: DEFAULT_SHARE_TOLERANCE,
        }
    }
}

impl AggregateOptions {
    pub fn with_damping_factor(damping_factor: f64) -> Self {
        Self {
            damping_factor,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> AggregateResult<()> {
        if !(0.0..=1.0).contains(&self.damping_factor) {
            return Err(AggregateError::InvalidDampingFactor(self.damping_factor));
        }
        Ok(())
    }
}

/// Contributions emitted by one source page
#[derive(Debug, Clone, PartialEq)]
pub struct GroupOutput {
    pub source: PageId,
    pub contributions: Vec<ContributionRecord>,
}

/// Shared flag checked at every group boundary
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Collect records sharing a source/page key into one group each.
pub fn group_by_key<I>(records: I) -> Groups
where
    I: IntoIterator<Item = TaggedRecord>,
{
    let mut groups = Groups::default();
    for record in records {
        match groups.get_mut(record.key()) {
            Some(members) => members.push(record),
            None => {
                groups.insert(record.key().to_string(), vec![record]);
            }
        }
    }
    groups
}

/// Join one group's prior rank with its edges and emit its contributions.
pub fn aggregate_group(
    source: &str,
    records: &[TaggedRecord],
    options: &AggregateOptions,
    sink: &dyn DiagnosticSink,
) -> AggregateResult<GroupOutput> {
    let mut prior_rank = None;
    let mut rank_count = 0;
    let mut edges: Vec<&ShareEdge> = Vec::new();

    for record in records {
        match record {
            TaggedRecord::Rank(entry) => {
                prior_rank = Some(entry.rank);
                rank_count += 1;
            }
            TaggedRecord::Edge(edge) => edges.push(edge),
        }
    }

    let mut valid = true;
    let mut flag = |violation: Violation| {
        valid = false;
        sink.report(Diagnostic::InvariantViolation {
            source: source.to_string(),
            violation,
        });
    };

    if rank_count > 1 {
        flag(Violation::DuplicateRank { count: rank_count });
    }

    if edges.is_empty() {
        return Ok(GroupOutput {
            source: source.to_string(),
            contributions: Vec::new(),
        });
    }

    let prior_rank = match (prior_rank, options.missing_rank) {
        (Some(rank), _) => rank,
        (None, MissingRankPolicy::Zero) => {
            sink.report(Diagnostic::MissingRank {
                page: source.to_string(),
            });
            0.0
        }
        (None, MissingRankPolicy::Error) => {
            return Err(AggregateError::MissingRank(source.to_string()));
        }
    };

    for edge in &edges {
        if !(edge.share.is_finite() && edge.share > 0.0 && edge.share <= 1.0) {
            flag(Violation::InvalidShare {
                destination: edge.destination.clone(),
                share: edge.share,
            });
        }
    }

    let share_sum: f64 = edges.iter().map(|edge| edge.share).sum();
    if !((share_sum - 1.0).abs() <= options.share_tolerance) {
        flag(Violation::ShareSum { sum: share_sum });
    }

    let redistributed = 1.0 - options.damping_factor;
    let contributions: Vec<ContributionRecord> = edges
        .iter()
        .map(|edge| ContributionRecord {
            destination: edge.destination.clone(),
            amount: edge.share * prior_rank * redistributed,
        })
        .collect();

    for record in &contributions {
        if !(record.amount.is_finite() && record.amount >= 0.0) {
            flag(Violation::InvalidAmount {
                destination: record.destination.clone(),
                amount: record.amount,
            });
        }
    }

    if !valid && options.on_violation == ViolationPolicy::Suppress {
        debug!(source, "Suppressing {} contributions", contributions.len());
        return Ok(GroupOutput {
            source: source.to_string(),
            contributions: Vec::new(),
        });
    }

    Ok(GroupOutput {
        source: source.to_string(),
        contributions,
    })
}

/// Aggregate every group with default policies and the given damping factor.
pub fn aggregate(
    groups: &Groups,
    damping_factor: f64,
    sink: &dyn DiagnosticSink,
) -> AggregateResult<Vec<ContributionRecord>> {
    let options = AggregateOptions::with_damping_factor(damping_factor);
    let outputs = aggregate_with(groups, &options, sink)?;
    Ok(outputs
        .into_iter()
        .flat_map(|output| output.contributions)
        .collect())
}

/// Aggregate every group on the calling thread.
pub fn aggregate_with(
    groups: &Groups,
    options: &AggregateOptions,
    sink: &dyn DiagnosticSink,
) -> AggregateResult<Vec<GroupOutput>> {
    options.validate()?;
    groups
        .iter()
        .map(|(source, records)| aggregate_group(source, records, options, sink))
        .collect()
}

/// Aggregate groups concurrently on the current rayon pool.
///
/// `cancel` is checked before each group; once set, the run fails with
/// [`AggregateError::Cancelled`] and no output is returned.
pub fn aggregate_parallel(
    groups: &Groups,
    options: &AggregateOptions,
    sink: &dyn DiagnosticSink,
    cancel: &CancellationFlag,
) -> AggregateResult<Vec<GroupOutput>> {
    options.validate()?;
    info!(
        groups = groups.len(),
        threads = rayon::current_num_threads(),
        "Aggregating contributions"
    );

    let outputs = groups
        .par_iter()
        .map(|(source, records)| {
            if cancel.is_cancelled() {
                return Err(AggregateError::Cancelled);
            }
            aggregate_group(source, records, options, sink)
        })
        .collect::<AggregateResult<Vec<_>>>()?;

    debug!(
        contributions = outputs.iter().map(|o| o.contributions.len()).sum::<usize>(),
        "Aggregation finished"
    );
    Ok(outputs)
}
