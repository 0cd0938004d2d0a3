//! Shared record types and line utilities
//!
//! Every record is immutable once built; each stage produces new records.

use crate::error::{RecordError, RecordResult};
use std::fmt;

/// Page identifier. Opaque, stable across iterations.
pub type PageId = String;

/// Field separator for every line format.
pub const FIELD_SEPARATOR: char = '\t';

/// Separator inside a transition line's destination list.
pub const DESTINATION_SEPARATOR: char = ',';

/// One outbound link of a source page with its uniform share of the source's rank.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShareEdge {
    pub source: PageId,
    pub destination: PageId,
    /// 1 / out-degree of `source`
    pub share: f64,
}

/// Prior rank of a page from the previous iteration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RankEntry {
    pub page: PageId,
    pub rank: f64,
}

/// Partial rank received by `destination` from a single source
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContributionRecord {
    pub destination: PageId,
    pub amount: f64,
}

impl fmt::Display for ContributionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.destination, FIELD_SEPARATOR, self.amount)
    }
}

/// Either side of the transition/rank join, so one group can hold both kinds.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TaggedRecord {
    Edge(ShareEdge),
    Rank(RankEntry),
}

impl TaggedRecord {
    /// Grouping key: the edge's source or the ranked page
    pub fn key(&self) -> &str {
        match self {
            TaggedRecord::Edge(edge) => &edge.source,
            TaggedRecord::Rank(entry) => &entry.page,
        }
    }
}

impl From<ShareEdge> for TaggedRecord {
    fn from(edge: ShareEdge) -> Self {
        TaggedRecord::Edge(edge)
    }
}

impl From<RankEntry> for TaggedRecord {
    fn from(entry: RankEntry) -> Self {
        TaggedRecord::Rank(entry)
    }
}

/// Strip the line terminator, keeping any tabs in place.
pub fn strip_line_ending(line: &str) -> &str {
    line.trim_end_matches(&['\r', '\n'][..])
}

/// Split a line into its trimmed first field and the optional remainder.
pub(crate) fn split_key_value(line: &str) -> (&str, Option<&str>) {
    match strip_line_ending(line).split_once(FIELD_SEPARATOR) {
        Some((key, rest)) => (key.trim(), Some(rest)),
        None => (line.trim(), None),
    }
}

/// Parse a `<page>\t<number>` line. Extra fields are ignored.
///
/// Used for both rank lines and contribution lines; the value must be a
/// finite, non-negative float.
pub fn parse_keyed_value(line: &str) -> RecordResult<(PageId, f64)> {
    let (key, rest) = split_key_value(line);
    if key.is_empty() {
        return Err(RecordError::malformed(line, "missing page id"));
    }

    let raw = match rest.and_then(|rest| rest.split(FIELD_SEPARATOR).next()).map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Err(RecordError::malformed(line, "expected two tab-separated fields")),
    };

    let value: f64 = raw
        .parse()
        .map_err(|_| RecordError::malformed(line, format!("{:?} is not a number", raw)))?;

    if !value.is_finite() {
        return Err(RecordError::malformed(line, format!("{} is not finite", value)));
    }
    if value < 0.0 {
        return Err(RecordError::malformed(line, format!("{} is negative", value)));
    }

    // -0.0 passes the sign check; adding 0.0 folds it to 0.0
    Ok((key.to_string(), value + 0.0))
}
