mod cli;
mod config;
mod lifecycle;
mod model;
mod storage;
mod store;
mod tracker;

use std::path::PathBuf;
use std::{env, process};

use tracing_subscriber::EnvFilter;

use config::Config;
use lifecycle::{Lifecycle, SystemClock};
use storage::Storage;

/// Environment variable holding the log filter (`tracing_subscriber` directives).
const LOG_ENV: &str = "POMO_LOG";

/// Environment variable overriding the storage root.
const DATA_DIR_ENV: &str = "POMO_DATA_DIR";

fn main() {
    init_logging();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            process::exit(1);
        }
    };

    let root = storage_root(&config).unwrap_or_else(|| {
        eprintln!("Could not determine home directory.");
        process::exit(1);
    });

    let storage = match Storage::new(root) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to initialize storage: {e}");
            process::exit(1);
        }
    };
    tracing::debug!(root = %storage.root().display(), "storage ready");

    let mut lifecycle = Lifecycle::restore(storage, SystemClock);

    if let Err(e) = cli::run(&config, &mut lifecycle) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Storage root: `POMO_DATA_DIR`, then `data-dir` from config, then `~/.pomo/data/`.
fn storage_root(config: &Config) -> Option<PathBuf> {
    if let Ok(dir) = env::var(DATA_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    config.data_dir.clone().or_else(Storage::default_root)
}
