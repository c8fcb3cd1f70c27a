// src/convert/mod.rs
pub mod batch;
pub mod header;
pub mod rows;

/// Split `line` on every `separator` and return all fields but the first.
///
/// Empty fields are kept and nothing is trimmed, so `"a\t\tb"` gives
/// `["", "b"]`. A line without the separator has a single field and
/// therefore yields an empty vector.
pub fn split_and_drop_first<'a>(line: &'a str, separator: &str) -> Vec<&'a str> {
    // Trailing empty fields are kept: "x\t1\t\t" gives ["1", "", ""].
    line.split(separator).skip(1).collect()
}

#[cfg(test)]
pub(crate) fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,logconvert=debug")),
        )
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
