//! Prior rank loading

use crate::common::{parse_keyed_value, RankEntry};
use crate::error::RecordResult;

/// Parse a `<page>\t<rank>` line.
///
/// Fails when the rank field is missing, unparsable, non-finite, or
/// negative. The error carries the raw line; callers abort the iteration.
pub fn load_rank(line: &str) -> RecordResult<RankEntry> {
    let (page, rank) = parse_keyed_value(line)?;
    Ok(RankEntry { page, rank })
}

/// Parse every non-blank line, stopping at the first malformed one.
pub fn load_ranks<'a, I>(lines: I) -> RecordResult<Vec<RankEntry>>
where
    I: IntoIterator<Item = &'a str>,
{
    lines
        .into_iter()
        .filter(|line| !line.trim().is_empty())
        .map(load_rank)
        .collect()
}
