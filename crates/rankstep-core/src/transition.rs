//! Transition expansion
//!
//! Turns one adjacency line `<source>\t<dest1>,<dest2>,...` into one
//! [`ShareEdge`] per destination, each carrying `1 / out-degree`.

use crate::common::{
    split_key_value, strip_line_ending, PageId, ShareEdge, DESTINATION_SEPARATOR, FIELD_SEPARATOR,
};
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::{RecordError, RecordResult};

/// Parsed adjacency record of a single source page
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionRecord {
    pub source: PageId,
    /// Empty for a dangling page
    pub destinations: Vec<PageId>,
}

impl TransitionRecord {
    /// Parse a transition line.
    ///
    /// A missing or blank destination field yields a record with no
    /// destinations. Fields after the destination list are ignored. An empty
    /// source id or an empty destination token is malformed.
    pub fn parse(line: &str) -> RecordResult<Self> {
        let (source, rest) = split_key_value(line);
        if source.is_empty() {
            return Err(RecordError::malformed(line, "missing source page id"));
        }

        let list = rest.and_then(|rest| rest.split(FIELD_SEPARATOR).next());
        let destinations = match list.map(str::trim) {
            None | Some("") => Vec::new(),
            Some(list) => list
                .split(DESTINATION_SEPARATOR)
                .map(|token| {
                    let token = token.trim();
                    if token.is_empty() {
                        Err(RecordError::malformed(line, "empty destination page id"))
                    } else {
                        Ok(token.to_string())
                    }
                })
                .collect::<RecordResult<Vec<_>>>()?,
        };

        Ok(Self {
            source: source.to_string(),
            destinations,
        })
    }

    pub fn is_dangling(&self) -> bool {
        self.destinations.is_empty()
    }

    pub fn out_degree(&self) -> usize {
        self.destinations.len()
    }

    /// Uniform share passed along each link; zero for a dangling page
    pub fn share(&self) -> f64 {
        if self.is_dangling() {
            0.0
        } else {
            1.0 / self.out_degree() as f64
        }
    }

    /// Lazily expand into share edges
    pub fn into_share_edges(self) -> ShareEdges {
        let share = self.share();
        ShareEdges {
            source: self.source,
            share,
            destinations: self.destinations.into_iter(),
        }
    }
}

/// Lazy, finite sequence of edges for one source
#[derive(Debug, Clone)]
pub struct ShareEdges {
    source: PageId,
    share: f64,
    destinations: std::vec::IntoIter<PageId>,
}

impl ShareEdges {
    fn empty(source: PageId) -> Self {
        Self {
            source,
            share: 0.0,
            destinations: Vec::new().into_iter(),
        }
    }
}

impl Iterator for ShareEdges {
    type Item = ShareEdge;

    fn next(&mut self) -> Option<ShareEdge> {
        self.destinations.next().map(|destination| ShareEdge {
            source: self.source.clone(),
            destination,
            share: self.share,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.destinations.size_hint()
    }
}

impl ExactSizeIterator for ShareEdges {}

/// Outcome of expanding one transition line
#[derive(Debug, Clone)]
pub enum Expansion {
    Edges(ShareEdges),
    /// The source has no outbound links
    Dangling(Diagnostic),
}

/// Expand a transition line into share edges or a dangling-page warning.
pub fn expand(line: &str) -> RecordResult<Expansion> {
    let record = TransitionRecord::parse(line)?;
    if record.is_dangling() {
        return Ok(Expansion::Dangling(Diagnostic::DanglingPage {
            page: record.source,
            line: strip_line_ending(line).to_string(),
        }));
    }
    Ok(Expansion::Edges(record.into_share_edges()))
}

/// Expand a transition line, reporting a dangling page to `sink` and
/// yielding no edges for it.
pub fn expand_reporting(line: &str, sink: &dyn DiagnosticSink) -> RecordResult<ShareEdges> {
    match expand(line)? {
        Expansion::Edges(edges) => Ok(edges),
        Expansion::Dangling(warning) => {
            let source = warning.page().to_string();
            sink.report(warning);
            Ok(ShareEdges::empty(source))
        }
    }
}
