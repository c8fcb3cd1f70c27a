// src/convert/rows.rs
use super::split_and_drop_first;
use crate::config::ConvertConfig;

/// Turn one input line into an output row.
///
/// `line_number` is 1-based and `line` carries no line terminator. Returns
/// `None` for excluded lines and for lines with fewer than two fields.
/// Fields are joined with `,` as-is: no quoting, and short rows are not
/// padded out to the header width.
pub fn transform_line(line_number: usize, line: &str, config: &ConvertConfig) -> Option<String> {
    if config.is_excluded(line_number) {
        return None;
    }
    let fields = split_and_drop_first(line, &config.separator);
    if fields.is_empty() {
        return None;
    }
    Some(fields.join(","))
}
