//! Benchmark orchestration primitives for the Aria runtime.
//!
//! `aria-bench-core` holds the decision logic behind the `aria-bench`
//! CLI: resolving the effective configuration, driving cargo, scraping
//! the compiled-artifact path out of the build report, and wrapping the
//! final execution in a measurement backend.
//!
//! # Architecture
//!
//! - **config**: merges environment overrides over installation-anchored
//!   defaults into one read-only [`EffectiveConfig`] per invocation
//! - **build**: the two cargo shapes (harness run, build-only)
//! - **locate**: `parse_artifact_path`, the single narrow interface over
//!   cargo's human-readable build report
//! - **invoke**: profiler wrapping, CPU pinning, and the micro-mode
//!   process replacement
//!
//! The CLI in the `aria-bench` crate is the only intended consumer, but
//! everything here is ordinary library code: no global state, no
//! environment mutation, all side effects at the edges.

pub mod build;
pub mod config;
pub mod error;
pub mod invoke;
pub mod locate;

pub use build::BuildRunner;
pub use config::{ConfigOverrides, EffectiveConfig, MICRO_SUFFIX};
pub use error::BenchError;
pub use invoke::{ProfilerKind, exec_runtime, propagated_exit_code, run_profiled};
pub use locate::{BuildArtifact, parse_artifact_path, resolve_artifact};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
