//! Convert every `*.textproto` file under `testdata/` to `testdata/<name>.json`.
//!
//! Takes no arguments. Logs go to stderr, filtered by `RUST_LOG` (default
//! `info`). Exits with status 1 if any document failed.

use std::process::ExitCode;

use anyhow::Context;
use protomon_json::Config;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<ExitCode> {
    init_tracing();

    let config = Config::new();
    let report = config.run().context("conversion aborted")?;

    info!(
        written = report.written.len(),
        failed = report.failures.len(),
        "done"
    );
    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(1))
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
