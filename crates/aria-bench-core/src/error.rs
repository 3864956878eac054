//! Error types for aria-bench-core.
//!
//! Every orchestration failure is fatal: the first error anywhere in the
//! build, locate, or execute sequence aborts the invocation. There is no
//! retry or partial-success path. Child processes that run to completion
//! and exit non-zero are *not* errors here; their status is propagated
//! unmodified by the CLI.

use std::process::ExitStatus;

/// Error types for benchmark orchestration.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    /// The external build tool exited non-zero.
    ///
    /// Carries the build tool's own exit status, so the CLI can exit
    /// with it unmodified, and the combined output of the failed
    /// invocation, so the operator sees cargo's own diagnostics.
    #[error("build error: {status}\n\n{report}")]
    Build {
        /// The build tool's exit status, propagated as this process's
        /// own exit code.
        status: ExitStatus,
        /// Combined stdout/stderr of the failed invocation.
        report: String,
    },

    /// No executable path could be extracted from the build report.
    ///
    /// Executing an empty path would produce a confusing downstream
    /// failure, so an unresolved artifact aborts the run instead.
    #[error(
        "no executable path found in the build output.\n\n\
         Expected a line of the form:\n  Executable benches/foo.rs (target/release/deps/foo-abcd1234)\n\n\
         Check that the target filter matches at least one benchmark."
    )]
    ArtifactResolution,

    /// The chosen profiling backend is not present on the host.
    ///
    /// Only `perf` and `valgrind` surface this; a missing `taskset`
    /// degrades to unpinned execution instead.
    #[error("{tool} is not available: {detail}\n\nInstall {tool} and ensure it is on PATH.")]
    BackendUnavailable {
        /// Name of the missing backend binary.
        tool: &'static str,
        /// What the availability probe reported.
        detail: String,
    },

    /// An I/O error occurred while spawning or waiting on a child process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
