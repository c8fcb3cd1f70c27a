use anyhow::Result;
use logconvert::{convert_folder, ConvertConfig};
use std::{env, process};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    // ─── 2) load config ──────────────────────────────────────────────
    let args: Vec<String> = env::args().collect();
    if args.len() > 2 {
        eprintln!("Usage: {} [CONFIG.yaml]", args[0]);
        process::exit(1);
    }
    let config = match args.get(1) {
        Some(path) => {
            info!("loading config {}", path);
            ConvertConfig::load(path)?
        }
        None => ConvertConfig::default(),
    };

    // ─── 3) convert ──────────────────────────────────────────────────
    match convert_folder(&config) {
        Ok(summary) => {
            if summary.failed() > 0 {
                info!("{} file(s) failed, see errors above", summary.failed());
            }
            Ok(())
        }
        Err(e) => {
            error!("{:#}", e);
            process::exit(1);
        }
    }
}
