//! One power-iteration step of PageRank over line-oriented records.
//!
//! Three stages, independent of how grouping is physically executed:
//! - [`transition`]: adjacency line to share edges (`1 / out-degree` each)
//! - [`rank`]: prior rank line to [`RankEntry`]
//! - [`aggregate`]: group by source page and emit damped contributions
//!
//! Summing contributions per destination happens downstream.

pub mod common;
pub mod diagnostics;
pub mod error;
pub mod transition;
pub mod rank;
pub mod aggregate;

pub use common::{ContributionRecord, PageId, RankEntry, ShareEdge, TaggedRecord};
pub use diagnostics::{Diagnostic, DiagnosticLog, DiagnosticSink, TracingSink, Violation};
pub use error::{AggregateError, AggregateResult, RecordError, RecordResult};
pub use transition::{expand, expand_reporting, Expansion, ShareEdges, TransitionRecord};
pub use rank::{load_rank, load_ranks};
pub use aggregate::{
    aggregate, aggregate_group, aggregate_parallel, aggregate_with, group_by_key,
    AggregateOptions, CancellationFlag, GroupOutput, Groups, MissingRankPolicy, ViolationPolicy,
    DEFAULT_DAMPING_FACTOR, DEFAULT_SHARE_TOLERANCE,
};
