// src/convert/header.rs
use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};
use tracing::error;

use super::split_and_drop_first;
use crate::config::ConvertConfig;

/// Column names taken from the header line, first field removed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HeaderInfo {
    pub columns: Vec<String>,
    pub count: usize,
}

impl HeaderInfo {
    pub fn new(columns: Vec<String>) -> Self {
        let count = columns.len();
        HeaderInfo { columns, count }
    }

    /// No usable columns; the file gets skipped.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The comma-joined header row, unquoted.
    pub fn to_row(&self) -> String {
        self.columns.join(",")
    }
}

/// Build the header from the leading lines of a file.
///
/// `lines[0]` is line 1. Returns an empty header when the file is shorter
/// than `config.header_line` or the header line has no separator.
pub fn header_from_lines(lines: &[String], config: &ConvertConfig) -> HeaderInfo {
    let Some(raw) = config
        .header_line
        .checked_sub(1)
        .and_then(|idx| lines.get(idx))
    else {
        return HeaderInfo::default();
    };

    let columns = split_and_drop_first(raw.trim(), &config.separator)
        .into_iter()
        .map(str::to_string)
        .collect();
    HeaderInfo::new(columns)
}

/// Read lines `1..=config.header_line` from `reader`, stopping early at EOF.
pub fn read_leading_lines<R: BufRead>(
    reader: &mut R,
    config: &ConvertConfig,
) -> Result<Vec<String>> {
    // header_line comes from config and may be arbitrarily large
    let mut lines = Vec::with_capacity(config.header_line.min(64));
    let mut buf = String::new();
    while lines.len() < config.header_line {
        buf.clear();
        if reader.read_line(&mut buf).context("reading header lines")? == 0 {
            break;
        }
        lines.push(strip_line_ending(&buf).to_string());
    }
    Ok(lines)
}

/// Extract the header of the file at `path`.
///
/// Read failures are logged and reported as an empty header.
pub fn extract_header<P: AsRef<Path>>(path: P, config: &ConvertConfig) -> HeaderInfo {
    let path = path.as_ref();
    let lines = File::open(path)
        .with_context(|| format!("opening {:?}", path))
        .and_then(|f| read_leading_lines(&mut BufReader::new(f), config));

    match lines {
        Ok(lines) => header_from_lines(&lines, config),
        Err(e) => {
            error!(file = %path.display(), kind = %error_kind(&e), "header extraction failed");
            HeaderInfo::default()
        }
    }
}

/// Short name for what went wrong, e.g. `NotFound` or `InvalidData`.
pub(crate) fn error_kind(err: &anyhow::Error) -> String {
    err.chain()
        .find_map(|e| e.downcast_ref::<std::io::Error>())
        .map(|io| format!("{:?}", io.kind()))
        .unwrap_or_else(|| "Other".to_string())
}

pub(crate) fn strip_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
