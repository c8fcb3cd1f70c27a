// src/convert/batch.rs
use anyhow::{bail, Context, Result};
use glob::{glob_with, MatchOptions, Pattern};
use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, error, info, instrument, warn};

use super::header::{error_kind, header_from_lines, read_leading_lines, strip_line_ending, HeaderInfo};
use super::rows::transform_line;
use crate::config::ConvertConfig;

/// Why a file produced no output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The leading lines could not be read; carries the I/O error kind.
    Unreadable(String),
    /// File too short, or the header line has no columns after the first.
    NoHeaderColumns,
}

/// Terminal state of one input file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileOutcome {
    Done { output: PathBuf, rows: u64 },
    Skipped(SkipReason),
    /// Conversion stopped part way; `output` may hold a partial file.
    Failed { output: PathBuf, error: String },
}

/// Per-file results of one `convert_folder` run, in processing order.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub files: Vec<(PathBuf, FileOutcome)>,
}

impl BatchSummary {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn done(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Done { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Failed { .. }))
    }

    /// Outcome recorded for `input`, if it was part of the batch.
    pub fn outcome(&self, input: &Path) -> Option<&FileOutcome> {
        self.files
            .iter()
            .find(|(p, _)| p == input)
            .map(|(_, o)| o)
    }

    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Sibling of `input` with the output extension: `a/b.txt` → `a/b.csv`.
///
/// The base name is everything before the last `.` of the file name, so a
/// file called just `.txt` maps to `.csv`.
pub fn output_path(input: &Path, config: &ConvertConfig) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let base = match name.rfind('.') {
        Some(idx) => &name[..idx],
        None => name.as_str(),
    };
    input.with_file_name(format!("{}.{}", base, config.output_extension))
}

/// Regular files in `config.folder` whose extension matches
/// `config.input_extension`, ignoring case.
pub fn list_input_files(config: &ConvertConfig) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/*.{}",
        Pattern::escape(&config.folder.to_string_lossy()),
        Pattern::escape(&config.input_extension)
    );
    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    let mut files = Vec::new();
    for entry in glob_with(&pattern, options).with_context(|| format!("bad glob {:?}", pattern))? {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => warn!("skipping unreadable entry: {}", e),
        }
    }
    Ok(files)
}

/// Convert every matching file in `config.folder`.
///
/// Only an invalid config or a missing folder is returned as an error.
/// Everything that goes wrong with a single file is logged, recorded in the
/// summary, and the batch moves on.
pub fn convert_folder(config: &ConvertConfig) -> Result<BatchSummary> {
    config.validate()?;
    if !config.folder.exists() {
        bail!("folder {:?} does not exist", config.folder);
    }
    if !config.folder.is_dir() {
        bail!("folder {:?} is not a directory", config.folder);
    }

    let mut summary = BatchSummary::default();
    let inputs = list_input_files(config)?;
    if inputs.is_empty() {
        info!(
            folder = %config.folder.display(),
            extension = %config.input_extension,
            "no input files to convert"
        );
        return Ok(summary);
    }

    info!(folder = %config.folder.display(), files = inputs.len(), "conversion started");
    for input in inputs {
        let outcome = convert_file(&input, config);
        summary.files.push((input, outcome));
    }
    info!(
        done = summary.done(),
        skipped = summary.skipped(),
        failed = summary.failed(),
        "conversion finished"
    );
    Ok(summary)
}

/// Convert one file in a single pass over the input.
///
/// The leading lines up to the header are read first; if they yield a
/// header the output is created and the rest of the same stream is
/// transformed into it.
#[instrument(level = "info", skip(input, config), fields(file = %input.display()))]
pub fn convert_file(input: &Path, config: &ConvertConfig) -> FileOutcome {
    debug!("pending");
    let (mut reader, leading) = match open_leading(input, config) {
        Ok(opened) => opened,
        Err(e) => {
            let kind = error_kind(&e);
            error!(kind = %kind, "header extraction failed");
            return FileOutcome::Skipped(SkipReason::Unreadable(kind));
        }
    };

    let header = header_from_lines(&leading, config);
    debug!(columns = header.count, "header extracted");
    if header.is_empty() {
        warn!("no header columns found, skipping");
        return FileOutcome::Skipped(SkipReason::NoHeaderColumns);
    }

    let output = output_path(input, config);
    debug!(output = %output.display(), "converting");
    match write_rows(&mut reader, &leading, &header, &output, config) {
        Ok(rows) => {
            info!(output = %output.display(), rows, "saved");
            FileOutcome::Done { output, rows }
        }
        Err(e) => {
            error!(output = %output.display(), "conversion failed: {:#}", e);
            FileOutcome::Failed {
                output,
                error: format!("{:#}", e),
            }
        }
    }
}

fn open_leading(input: &Path, config: &ConvertConfig) -> Result<(BufReader<File>, Vec<String>)> {
    let file = File::open(input).with_context(|| format!("opening {:?}", input))?;
    let mut reader = BufReader::new(file);
    let leading = read_leading_lines(&mut reader, config)
        .with_context(|| format!("reading {:?}", input))?;
    Ok((reader, leading))
}

/// Write the header row, the non-excluded leading lines, then every row of
/// the remaining input. Returns the number of data rows written.
fn write_rows<R: BufRead>(
    reader: &mut R,
    leading: &[String],
    header: &HeaderInfo,
    output: &Path,
    config: &ConvertConfig,
) -> Result<u64> {
    let file = File::create(output).with_context(|| format!("creating {:?}", output))?;
    let mut out = BufWriter::new(file);
    let eol = config.line_terminator.as_str();

    write_row(&mut out, &header.to_row(), eol)
        .with_context(|| format!("writing header to {:?}", output))?;

    let mut rows = 0u64;
    for (idx, line) in leading.iter().enumerate() {
        if let Some(row) = transform_line(idx + 1, line, config) {
            write_row(&mut out, &row, eol).with_context(|| format!("writing {:?}", output))?;
            rows += 1;
        }
    }

    let mut line_number = leading.len();
    let mut buf = String::new();
    loop {
        buf.clear();
        let n = reader
            .read_line(&mut buf)
            .with_context(|| format!("reading input line {}", line_number + 1))?;
        if n == 0 {
            break;
        }
        line_number += 1;
        if let Some(row) = transform_line(line_number, strip_line_ending(&buf), config) {
            write_row(&mut out, &row, eol).with_context(|| format!("writing {:?}", output))?;
            rows += 1;
        }
    }

    out.flush().with_context(|| format!("flushing {:?}", output))?;
    Ok(rows)
}

fn write_row<W: Write>(out: &mut W, row: &str, eol: &str) -> std::io::Result<()> {
    out.write_all(row.as_bytes())?;
    out.write_all(eol.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LineTerminator;
    use crate::convert::init_test_logging;
    use anyhow::Result;
    use std::{collections::BTreeSet, fs};
    use tempfile::tempdir;

    const SAMPLE: &str = "L1\nL2\nL3\nid\tA\tB\nL5\nr1\tv1\tv2\n";

    fn lf_config(folder: &Path) -> ConvertConfig {
        ConvertConfig {
            line_terminator: LineTerminator::Lf,
            ..ConvertConfig::for_folder(folder)
        }
    }

    #[test]
    fn converts_sample_file() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        fs::write(dir.path().join("log.txt"), SAMPLE)?;

        let summary = convert_folder(&lf_config(dir.path()))?;
        assert_eq!(summary.done(), 1);

        let out = fs::read_to_string(dir.path().join("log.csv"))?;
        assert_eq!(out, "A,B\nv1,v2\n");
        Ok(())
    }

    #[test]
    fn crlf_input_is_stripped() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        let input = dir.path().join("win.txt");
        fs::write(&input, SAMPLE.replace('\n', "\r\n"))?;

        let cfg = ConvertConfig {
            line_terminator: LineTerminator::CrLf,
            ..ConvertConfig::for_folder(dir.path())
        };
        let outcome = convert_file(&input, &cfg);
        assert_eq!(
            outcome,
            FileOutcome::Done {
                output: dir.path().join("win.csv"),
                rows: 1
            }
        );
        assert_eq!(fs::read_to_string(dir.path().join("win.csv"))?, "A,B\r\nv1,v2\r\n");
        Ok(())
    }

    #[test]
    fn only_lines_after_five_become_rows() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        let input = dir.path().join("all.txt");
        fs::write(
            &input,
            "h\t1\nh\t2\nh\t3\nid\tA\nh\t5\nd\t6\nsingle\nd\t8\n",
        )?;

        let outcome = convert_file(&input, &lf_config(dir.path()));
        assert!(matches!(outcome, FileOutcome::Done { rows: 2, .. }));
        assert_eq!(fs::read_to_string(dir.path().join("all.csv"))?, "A\n6\n8\n");
        Ok(())
    }

    #[test]
    fn short_file_is_skipped_without_output() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        fs::write(dir.path().join("short.txt"), "a\tb\nc\td\ne\tf\n")?;

        let summary = convert_folder(&lf_config(dir.path()))?;
        assert_eq!(summary.skipped(), 1);
        assert_eq!(
            summary.outcome(&dir.path().join("short.txt")),
            Some(&FileOutcome::Skipped(SkipReason::NoHeaderColumns))
        );
        assert!(!dir.path().join("short.csv").exists());
        Ok(())
    }

    #[test]
    fn unreadable_header_is_skipped() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        let input = dir.path().join("bin.txt");
        fs::write(&input, [0xff, 0xfe, b'\n'])?;

        let outcome = convert_file(&input, &lf_config(dir.path()));
        assert_eq!(
            outcome,
            FileOutcome::Skipped(SkipReason::Unreadable("InvalidData".to_string()))
        );
        assert!(!dir.path().join("bin.csv").exists());
        Ok(())
    }

    #[test]
    fn write_failure_does_not_stop_batch() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        for name in ["a.txt", "b.txt", "c.txt"] {
            fs::write(dir.path().join(name), SAMPLE)?;
        }
        // b.csv cannot be created as a file
        fs::create_dir(dir.path().join("b.csv"))?;

        let summary = convert_folder(&lf_config(dir.path()))?;
        assert_eq!(summary.files.len(), 3);
        assert_eq!(summary.done(), 2);
        assert_eq!(summary.failed(), 1);
        assert!(matches!(
            summary.outcome(&dir.path().join("b.txt")),
            Some(FileOutcome::Failed { .. })
        ));
        assert_eq!(fs::read_to_string(dir.path().join("c.csv"))?, "A,B\nv1,v2\n");
        Ok(())
    }

    #[test]
    fn read_failure_leaves_partial_output() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        let input = dir.path().join("broken.txt");
        let mut bytes = SAMPLE.as_bytes().to_vec();
        bytes.extend_from_slice(&[b'x', b'\t', 0xff, b'\n', b'y', b'\t', b'1', b'\n']);
        fs::write(&input, bytes)?;

        let outcome = convert_file(&input, &lf_config(dir.path()));
        match outcome {
            FileOutcome::Failed { output, error } => {
                assert_eq!(output, dir.path().join("broken.csv"));
                assert!(error.contains("line 7"), "unexpected error: {}", error);
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(fs::read_to_string(dir.path().join("broken.csv"))?, "A,B\nv1,v2\n");
        Ok(())
    }

    #[test]
    fn leading_lines_outside_exclusions_follow_header() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        let input = dir.path().join("early.txt");
        fs::write(&input, "L1\ta\tb\nid\tA\tB\nr\t1\t2\n")?;

        let cfg = ConvertConfig {
            header_line: 2,
            excluded_lines: BTreeSet::new(),
            ..lf_config(dir.path())
        };
        let outcome = convert_file(&input, &cfg);
        assert!(matches!(outcome, FileOutcome::Done { rows: 2, .. }));
        assert_eq!(fs::read_to_string(dir.path().join("early.csv"))?, "A,B\na,b\n1,2\n");
        Ok(())
    }

    #[test]
    fn missing_folder_aborts() {
        init_test_logging();
        let cfg = ConvertConfig::for_folder("/no/such/folder/for/logconvert");
        let err = convert_folder(&cfg).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn file_as_folder_is_not_a_directory() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        let file = dir.path().join("plain.txt");
        fs::write(&file, SAMPLE)?;

        let err = convert_folder(&ConvertConfig::for_folder(&file)).unwrap_err();
        assert!(err.to_string().contains("is not a directory"), "{}", err);
        Ok(())
    }

    #[test]
    fn huge_header_line_skips_short_file() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        fs::write(dir.path().join("short.txt"), SAMPLE)?;

        let cfg = ConvertConfig {
            header_line: usize::MAX,
            ..lf_config(dir.path())
        };
        assert!(cfg.validate().is_ok());
        let summary = convert_folder(&cfg)?;
        assert_eq!(
            summary.outcome(&dir.path().join("short.txt")),
            Some(&FileOutcome::Skipped(SkipReason::NoHeaderColumns))
        );
        assert!(!dir.path().join("short.csv").exists());
        Ok(())
    }

    #[test]
    fn bare_extension_file_maps_to_bare_output() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        fs::write(dir.path().join(".txt"), SAMPLE)?;

        let cfg = lf_config(dir.path());
        assert_eq!(output_path(&dir.path().join(".txt"), &cfg), dir.path().join(".csv"));

        let summary = convert_folder(&cfg)?;
        assert_eq!(summary.done(), 1);
        assert_eq!(fs::read_to_string(dir.path().join(".csv"))?, "A,B\nv1,v2\n");
        assert!(!dir.path().join(".txt.csv").exists());
        Ok(())
    }

    #[test]
    fn invalid_config_aborts() -> Result<()> {
        let dir = tempdir()?;
        let cfg = ConvertConfig {
            header_line: 0,
            ..ConvertConfig::for_folder(dir.path())
        };
        assert!(convert_folder(&cfg).is_err());
        Ok(())
    }

    #[test]
    fn no_matching_files_is_not_an_error() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        fs::write(dir.path().join("notes.log"), SAMPLE)?;

        let summary = convert_folder(&lf_config(dir.path()))?;
        assert!(summary.is_empty());
        assert!(!dir.path().join("notes.csv").exists());
        Ok(())
    }

    #[test]
    fn listing_ignores_case_and_directories() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("UPPER.TXT"), SAMPLE)?;
        fs::write(dir.path().join("lower.txt"), SAMPLE)?;
        fs::write(dir.path().join("other.csv"), "x")?;
        fs::create_dir(dir.path().join("folder.txt"))?;

        let mut names: Vec<String> = list_input_files(&lf_config(dir.path()))?
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
            .collect();
        names.sort();
        assert_eq!(names, vec!["UPPER.TXT", "lower.txt"]);

        assert_eq!(
            output_path(&dir.path().join("UPPER.TXT"), &lf_config(dir.path())),
            dir.path().join("UPPER.csv")
        );
        Ok(())
    }

    #[test]
    fn output_keeps_inner_dots() {
        let cfg = ConvertConfig::default();
        assert_eq!(
            output_path(Path::new("logs/sap.2025.08.txt"), &cfg),
            PathBuf::from("logs/sap.2025.08.csv")
        );
    }
}
