pub mod config;
pub mod convert;

pub use config::{ConvertConfig, LineTerminator};
pub use convert::batch::{convert_file, convert_folder, BatchSummary, FileOutcome, SkipReason};
pub use convert::header::{extract_header, HeaderInfo};
pub use convert::rows::transform_line;
pub use convert::split_and_drop_first;
