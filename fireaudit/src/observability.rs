//! Tracing init for the CLI.
//!
//! Level resolution: `--verbose` forces debug, otherwise the `--log-level`
//! flag, with `FIREAUDIT_LOG_LEVEL` (env) overriding both and `RUST_LOG`
//! taking final precedence through `EnvFilter`. An optional file layer
//! mirrors the console output without ANSI codes.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::{prelude::*, EnvFilter};

use fireaudit_core::config::ObservabilityConfig;

use crate::cli::Cli;

/// Initialize tracing. Call once at process startup.
pub fn init_tracing(cli: &Cli) {
    let env_cfg = ObservabilityConfig::from_env();
    let level = env_cfg
        .log_level
        .clone()
        .unwrap_or_else(|| {
            if cli.verbose {
                "debug".to_string()
            } else {
                cli.log_level.as_filter().to_string()
            }
        });

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let file_layer = cli.log_file.as_deref().and_then(open_log_file).map(|file| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_ansi(false)
            .with_writer(Arc::new(file))
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

fn open_log_file(path: &Path) -> Option<std::fs::File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("warning: could not open log file {}: {}", path.display(), e);
            None
        }
    }
}
