use anyhow::Result;
use logconvert::{extract_header, ConvertConfig};
use std::{env, path::Path, process::exit};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    // Expect a log file and, optionally, the config describing its layout.
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        eprintln!("Usage: {} <LOG_FILE> [CONFIG.yaml]", args[0]);
        exit(1);
    }

    let config = match args.get(2) {
        Some(path) => ConvertConfig::load(path)?,
        None => ConvertConfig::default(),
    };

    let header = extract_header(Path::new(&args[1]), &config);
    println!("{}", serde_json::to_string_pretty(&header)?);
    if header.is_empty() {
        exit(2);
    }
    Ok(())
}
