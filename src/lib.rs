//! Rankstep
//!
//! Batch driver around [`rankstep_core`]: computes one PageRank
//! power-iteration step from a transition file and a prior-rank file.
//!
//! ## Example Usage
//!
//! ```rust
//! use rankstep::{StepConfig, StepJob};
//! use std::io::Cursor;
//!
//! let job = StepJob::new(StepConfig::default()).unwrap();
//! let result = job
//!     .compute_from_readers(
//!         Cursor::new("A\tB,C\nB\tC\n"),
//!         "transitions",
//!         Cursor::new("A\t1.0\nB\t1.0\n"),
//!         "ranks",
//!     )
//!     .unwrap();
//!
//! let lines: Vec<String> = result.contributions().map(|c| c.to_string()).collect();
//! assert_eq!(lines, vec!["B\t0.4", "C\t0.4", "C\t0.8"]);
//! ```

#![warn(clippy::all)]

pub mod accumulate;
pub mod config;
pub mod error;
pub mod export;
pub mod io;
pub mod job;

pub use accumulate::{accumulate, accumulate_file, Accumulator};
pub use config::{ConfigError, ConfigResult, StepConfig};
pub use error::{JobError, JobResult};
pub use export::{export_graph, GraphExport, GraphLink, GraphNode};
pub use job::{StepJob, StepReport, StepResult};

pub use rankstep_core;

/// Get version information
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
