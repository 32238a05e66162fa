//! Logging configuration for flowcheck
//!
//! This module provides utilities for initializing and configuring logging
//! using the `log` and `env_logger` crates. The analyses emit through
//! `tracing`, whose `log` bridge routes those events here too.
//!
//! # Usage
//!
//! ```rust,ignore
//! use analysis::logging;
//!
//! // `--verbose` turns on debug output of the analyses, otherwise RUST_LOG
//! // decides (default: warnings only)
//! logging::init_cli(verbose);
//! ```
//!
//! # Log Levels
//!
//! - `warn!` - Skipped array-access records, unresolved indices
//! - `info!` - One line per analysis run
//! - `debug!` - Per block and per record progress
//! - `trace!` - Every set operation and evaluation step
//!
//! # Environment Variable
//!
//! ```bash
//! RUST_LOG=info ./flowcheck avail module.json
//! RUST_LOG=analysis::analysis::available_expressions=trace ./flowcheck avail module.json
//! ```

use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;
use std::sync::Once;

static INIT: Once = Once::new();

/// Log target prefix of everything this crate emits.
const CRATE_TARGET: &str = "analysis";

fn with_format(builder: &mut Builder) -> &mut Builder {
    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{:5}] {} - {}",
            record.level(),
            record.target().trim_start_matches("analysis::analysis::"),
            record.args()
        )
    })
}

/// Logging setup for the `flowcheck` binary.
///
/// Verbose mode shows debug events of the analyses and warnings from
/// everything else. Runs once; later calls are no-ops.
pub fn init_cli(verbose: bool) {
    INIT.call_once(|| {
        let mut builder = if verbose {
            let mut builder = Builder::new();
            builder
                .filter_level(LevelFilter::Warn)
                .filter_module(CRATE_TARGET, LevelFilter::Debug);
            builder
        } else {
            Builder::from_env(Env::default().default_filter_or("warn"))
        };
        with_format(&mut builder).init();
    });
}

/// Logging for tests: captured by the harness, trace level for this crate,
/// safe to call from every test.
pub fn init_test() {
    let _ = with_format(&mut Builder::new())
        .filter_module(CRATE_TARGET, LevelFilter::Trace)
        .is_test(true)
        .try_init();
}
