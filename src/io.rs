//! Line-oriented input and atomic output

use crate::error::{JobError, JobResult};
use rankstep_core::common::strip_line_ending;
use rankstep_core::RecordError;
use std::fmt::Display;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Open a file for line-by-line reading
pub fn open_input(path: &Path) -> JobResult<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| JobError::io(path.display().to_string(), e))
}

/// Feed every non-blank line of `reader` to `parse`.
///
/// Stops at the first read error or malformed line, tagging it with `input`
/// and the 1-based line number. A line that is not valid UTF-8 is malformed.
/// Returns the number of lines parsed.
pub fn for_each_line<R, F>(mut reader: R, input: &str, mut parse: F) -> JobResult<usize>
where
    R: BufRead,
    F: FnMut(&str) -> Result<(), RecordError>,
{
    let malformed = |line_number, source| JobError::Malformed {
        input: input.to_string(),
        line_number,
        source,
    };

    let mut buf = Vec::new();
    let mut line_number = 0;
    let mut parsed = 0;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).map_err(|e| JobError::io(input, e))? == 0 {
            break;
        }
        line_number += 1;

        let line = std::str::from_utf8(&buf).map(strip_line_ending).map_err(|e| {
            malformed(
                line_number,
                RecordError::Malformed {
                    line: String::from_utf8_lossy(&buf).trim_end().to_string(),
                    reason: format!("invalid UTF-8: {}", e),
                },
            )
        })?;
        if line.trim().is_empty() {
            continue;
        }
        parse(line).map_err(|source| malformed(line_number, source))?;
        parsed += 1;
    }
    debug!(input, lines = parsed, "Read input");
    Ok(parsed)
}

/// Write one line per item to `path`, all or nothing.
///
/// Lines go to a temporary file in the destination directory which is
/// renamed over `path` once everything is flushed. On error the temporary
/// file is removed and `path` is left untouched.
pub fn write_lines_atomic<I, D>(path: &Path, lines: I) -> JobResult<usize>
where
    I: IntoIterator<Item = D>,
    D: Display,
{
    let output = path.display().to_string();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let temp = NamedTempFile::new_in(dir).map_err(|e| JobError::io(&output, e))?;
    let mut writer = BufWriter::new(temp);
    let mut written = 0;
    for line in lines {
        writeln!(writer, "{}", line).map_err(|e| JobError::io(&output, e))?;
        written += 1;
    }

    let temp = writer
        .into_inner()
        .map_err(|e| JobError::io(&output, e.into_error()))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| JobError::io(&output, e))?;
    temp.persist(path).map_err(|e| JobError::io(&output, e.error))?;

    debug!(output = %output, lines = written, "Wrote output");
    Ok(written)
}
