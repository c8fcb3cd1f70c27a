// src/config.rs
use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::{collections::BTreeSet, fs, path::Path, path::PathBuf};

/// Line ending written after every output row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineTerminator {
    /// Whatever the host platform uses (`\r\n` on Windows, `\n` elsewhere).
    #[default]
    Native,
    Lf,
    CrLf,
}

impl LineTerminator {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineTerminator::Native => {
                if cfg!(windows) {
                    "\r\n"
                } else {
                    "\n"
                }
            }
            LineTerminator::Lf => "\n",
            LineTerminator::CrLf => "\r\n",
        }
    }
}

/// Everything the batch converter needs to know about where the logs live
/// and how they are laid out. Line numbers are 1-based.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    pub folder: PathBuf,
    pub separator: String,
    pub header_line: usize,
    pub excluded_lines: BTreeSet<usize>,
    pub input_extension: String,
    pub output_extension: String,
    pub line_terminator: LineTerminator,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        ConvertConfig {
            folder: PathBuf::from("logs"),
            separator: "\t".to_string(),
            header_line: 4,
            excluded_lines: BTreeSet::from([1, 2, 3, 5]),
            input_extension: "txt".to_string(),
            output_extension: "csv".to_string(),
            line_terminator: LineTerminator::Native,
        }
    }
}

impl ConvertConfig {
    /// Default layout, pointed at `folder`.
    pub fn for_folder(folder: impl Into<PathBuf>) -> Self {
        ConvertConfig {
            folder: folder.into(),
            ..Default::default()
        }
    }

    /// Read a YAML config file. Keys that are absent keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {:?}", path))?;
        let cfg: ConvertConfig = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing config file {:?}", path))?;
        cfg.validate()
            .with_context(|| format!("invalid config in {:?}", path))?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.header_line >= 1, "header_line is 1-based and must be at least 1");
        ensure!(!self.separator.is_empty(), "separator must not be empty");
        ensure!(
            !self.input_extension.is_empty() && !self.output_extension.is_empty(),
            "input_extension and output_extension must not be empty"
        );
        // Same extension would truncate each input before it is read.
        ensure!(
            !self
                .input_extension
                .eq_ignore_ascii_case(&self.output_extension),
            "input and output extension are both {:?}",
            self.input_extension
        );
        Ok(())
    }

    /// True if `line_number` must never be written as a data row.
    pub fn is_excluded(&self, line_number: usize) -> bool {
        line_number == self.header_line || self.excluded_lines.contains(&line_number)
    }
}
