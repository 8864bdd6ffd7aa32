//! Logging setup for the engine and the `loom` binary
//!
//! The engine logs through the `log` facade and never prints. The `env_logger`
//! backend is installed once per process by whichever entry point runs
//! first.
//!
//! # Levels
//!
//! - `error!` - failures that abort a session
//! - `warn!` - suspicious input that does not block commit
//! - `info!` - session stages (synthesis, discovery, solving, rewrite, commit)
//! - `debug!` - per-unit results
//! - `trace!` - individual edits and expansions
//!
//! # Stages
//!
//! Each engine module is a stage target (`synth::implicits`,
//! `synth::macros`, ...). `init_stages` raises chosen stages to `debug`
//! without flooding the output with every other module:
//!
//! ```bash
//! loom -v --log-stage implicits expand src/
//! RUST_LOG=synth::rewrite=trace loom expand src/
//! ```

use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;
use std::sync::Once;

/// Crates the requested level applies to; dependencies stay at `warn`
const ENGINE_TARGETS: &[&str] = &["loom", "synth", "parser"];

static INIT: Once = Once::new();

fn builder() -> Builder {
    let mut builder = Builder::new();
    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{:5} {}] {}",
            record.level(),
            record.target(),
            record.args()
        )
    });
    builder
}

/// Module path of an engine stage (`implicits` -> `synth::implicits`)
fn stage_target(stage: &str) -> String {
    let stage = stage.trim().trim_start_matches("synth::");
    format!("synth::{}", stage)
}

/// Engine crates at `level`, and each of `stages` at `debug` or finer.
/// Only the first initialization in a process takes effect.
pub fn init_stages(level: LevelFilter, stages: &[String]) {
    INIT.call_once(|| {
        let mut builder = builder();
        builder.filter_level(LevelFilter::Warn);
        for target in ENGINE_TARGETS {
            builder.filter_module(target, level);
        }
        for stage in stages {
            builder.filter_module(&stage_target(stage), level.max(LevelFilter::Debug));
        }
        builder.init();
    });
}

/// Filters from `RUST_LOG`, `warn` when unset
pub fn init_from_env() {
    INIT.call_once(|| {
        builder()
            .parse_env(Env::default().default_filter_or("warn"))
            .init();
    });
}

/// Captured logging for tests; safe to call from every test
pub fn init_test() {
    let _ = builder()
        .filter_level(LevelFilter::Warn)
        .filter_module("synth", LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_targets() {
        assert_eq!(stage_target("implicits"), "synth::implicits");
        assert_eq!(stage_target(" synth::macros "), "synth::macros");
    }

    #[test]
    fn test_init_test_is_repeatable() {
        init_test();
        init_test();
        log::debug!(target: "synth::pipeline", "session started");
    }
}
