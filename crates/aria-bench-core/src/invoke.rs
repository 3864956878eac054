//! Final execution step: run the resolved binary under a measurement
//! backend, or replace this process with the runtime in micro mode.
//!
//! The two shapes are deliberately distinct. Profiling modes wrap the
//! child and wait so the backend's status can be propagated; micro mode
//! takes over the process image via `exec`, making the benchmark's exit
//! code and signal behavior the tool's own. They are never unified.

use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use crate::config::{EffectiveConfig, LIB_DIR_ENV};
use crate::error::BenchError;

/// CPU-pinning wrapper. Optional: when absent, execution proceeds
/// unpinned.
pub const PIN_TOOL: &str = "taskset";

const TIME_TOOL: &str = "/usr/bin/time";
const PERF_TOOL: &str = "perf";
const VALGRIND_TOOL: &str = "valgrind";

/// Measurement backend for the wrapped execution modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfilerKind {
    /// Wall-clock real/user/system timing. No special privileges.
    Time,
    /// Sampling profiler with call-graph capture. Needs performance
    /// counter access.
    Perf,
    /// Instrumentation-based cache/instruction profiling. Slow and
    /// file-descriptor hungry.
    Valgrind,
}

impl ProfilerKind {
    /// The backend binary to invoke.
    pub fn program(&self) -> &'static str {
        match self {
            ProfilerKind::Time => TIME_TOOL,
            ProfilerKind::Perf => PERF_TOOL,
            ProfilerKind::Valgrind => VALGRIND_TOOL,
        }
    }

    /// Backend arguments placed before the benchmark path. The benchmark
    /// itself receives no arguments.
    pub fn args(&self) -> &'static [&'static str] {
        match self {
            ProfilerKind::Time => &[],
            ProfilerKind::Perf => &["record", "-g"],
            ProfilerKind::Valgrind => &["--tool=cachegrind"],
        }
    }
}

/// Runs `exe` under the chosen backend, streaming output, and returns the
/// child's exit status for propagation.
///
/// `perf` and `valgrind` are probed first and a missing backend is fatal;
/// there is no fallback measurement. Valgrind additionally gets the
/// file-descriptor limit raised, since full instrumentation can exhaust
/// the default soft limit.
pub fn run_profiled(
    kind: ProfilerKind,
    exe: &Path,
    config: &EffectiveConfig,
) -> Result<ExitStatus, BenchError> {
    match kind {
        ProfilerKind::Perf => probe_backend(PERF_TOOL)?,
        ProfilerKind::Valgrind => {
            probe_backend(VALGRIND_TOOL)?;
            raise_nofile_limit();
        }
        ProfilerKind::Time => {}
    }

    let mut shown: Vec<&str> = vec![kind.program()];
    shown.extend_from_slice(kind.args());
    println!("Running: {} {}", shown.join(" "), exe.display());
    let status = Command::new(kind.program())
        .args(kind.args())
        .arg(exe)
        .env(LIB_DIR_ENV, config.lib_search_path())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()?;
    Ok(status)
}

/// Checks that a backend binary answers `--version`.
fn probe_backend(tool: &'static str) -> Result<(), BenchError> {
    let output = Command::new(tool).arg("--version").output();
    match output {
        Ok(output) if output.status.success() => Ok(()),
        Ok(output) => Err(BenchError::BackendUnavailable {
            tool,
            detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }),
        Err(err) => Err(BenchError::BackendUnavailable {
            tool,
            detail: err.to_string(),
        }),
    }
}

/// Whether the CPU-pinning wrapper is present on this host.
pub fn pin_tool_available() -> bool {
    Command::new(PIN_TOOL)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Display form of the micro-mode command line: `[taskset <mask>]` when a
/// mask is given, then the runtime, the program, and the pass-through
/// arguments in order. Path rendering is lossy; the command itself is
/// built by [`micro_command`] from the raw path values.
pub fn micro_argv(
    runtime: &Path,
    mask: Option<&str>,
    program: &Path,
    extra_args: &[String],
) -> Vec<String> {
    let mut argv = Vec::new();
    if let Some(mask) = mask {
        argv.push(PIN_TOOL.to_string());
        argv.push(mask.to_string());
    }
    argv.push(runtime.display().to_string());
    argv.push(program.display().to_string());
    argv.extend(extra_args.iter().cloned());
    argv
}

/// Builds the micro-mode command from the path values themselves, so
/// paths survive intact even when they are not valid UTF-8.
fn micro_command(
    runtime: &Path,
    mask: Option<&str>,
    program: &Path,
    extra_args: &[String],
) -> Command {
    let mut cmd = match mask {
        Some(mask) => {
            let mut cmd = Command::new(PIN_TOOL);
            cmd.arg(mask).arg(runtime);
            cmd
        }
        None => Command::new(runtime),
    };
    cmd.arg(program).args(extra_args);
    cmd
}

/// Replaces the current process image with the runtime executing
/// `program`. Pins to the configured mask when the pin tool is available.
///
/// On success this never returns; the returned error is always a spawn
/// failure.
pub fn exec_runtime(
    config: &EffectiveConfig,
    program: &Path,
    extra_args: &[String],
) -> BenchError {
    use std::os::unix::process::CommandExt;

    let runtime = config.runtime_executable();
    let mask = pin_tool_available().then(|| config.affinity_mask.as_str());

    println!(
        "Running: {}",
        micro_argv(&runtime, mask, program, extra_args).join(" ")
    );
    let mut cmd = micro_command(&runtime, mask, program, extra_args);
    cmd.env(LIB_DIR_ENV, config.micro_lib_search_path());
    BenchError::Io(cmd.exec())
}

/// Best-effort raise of `RLIMIT_NOFILE` to the hard limit.
fn raise_nofile_limit() {
    unsafe {
        let mut limit = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        if libc::getrlimit(libc::RLIMIT_NOFILE, &mut limit) != 0 {
            eprintln!("Warning: could not read the open-file limit; leaving it unchanged");
            return;
        }
        if limit.rlim_cur >= limit.rlim_max {
            return;
        }
        limit.rlim_cur = limit.rlim_max;
        if libc::setrlimit(libc::RLIMIT_NOFILE, &limit) != 0 {
            eprintln!(
                "Warning: could not raise the open-file limit to {}; valgrind may run out",
                limit.rlim_max
            );
        }
    }
}

/// Maps a child's exit status to the code this process should exit with.
/// Signal-terminated children follow the shell convention of `128 + N`.
pub fn propagated_exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .unwrap_or_else(|| 128 + status.signal().unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;

    #[test]
    fn affinity_mask_is_forwarded_to_the_pin_tool_unmodified() {
        let argv = micro_argv(
            Path::new("/opt/aria/target/release/aria"),
            Some("0x3"),
            Path::new("/opt/aria/benchmarks/micro/fib.aria"),
            &[],
        );
        assert_eq!(
            argv,
            vec![
                "taskset",
                "0x3",
                "/opt/aria/target/release/aria",
                "/opt/aria/benchmarks/micro/fib.aria",
            ]
        );
    }

    #[test]
    fn missing_pin_tool_means_no_wrapper_at_all() {
        let argv = micro_argv(
            Path::new("/opt/aria/target/release/aria"),
            None,
            Path::new("fib.aria"),
            &["--iterations".to_string(), "100".to_string()],
        );
        assert_eq!(
            argv,
            vec![
                "/opt/aria/target/release/aria",
                "fib.aria",
                "--iterations",
                "100",
            ]
        );
    }

    #[test]
    fn extra_args_keep_their_order() {
        let argv = micro_argv(
            Path::new("aria"),
            None,
            Path::new("p.aria"),
            &["a".to_string(), "b".to_string(), "c".to_string()],
        );
        assert_eq!(&argv[2..], &["a", "b", "c"]);
    }

    #[test]
    fn micro_command_matches_the_displayed_argv() {
        let cmd = micro_command(
            Path::new("/opt/aria/target/release/aria"),
            Some("0x1"),
            Path::new("fib.aria"),
            &["100".to_string()],
        );
        assert_eq!(cmd.get_program(), "taskset");
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(
            args,
            vec!["0x1", "/opt/aria/target/release/aria", "fib.aria", "100"]
        );
    }

    #[test]
    fn micro_command_keeps_non_utf8_paths_intact() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let raw = OsStr::from_bytes(b"/opt/aria/benchmarks/micro/\xfflatin1.aria");
        let cmd = micro_command(Path::new("aria"), None, Path::new(raw), &[]);
        assert_eq!(cmd.get_program(), "aria");
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, vec![raw]);
    }

    #[test]
    fn backend_command_shapes() {
        assert_eq!(ProfilerKind::Time.program(), "/usr/bin/time");
        assert!(ProfilerKind::Time.args().is_empty());
        assert_eq!(ProfilerKind::Perf.args(), &["record", "-g"]);
        assert_eq!(ProfilerKind::Valgrind.args(), &["--tool=cachegrind"]);
    }

    #[test]
    fn child_exit_codes_propagate_unmodified() {
        assert_eq!(propagated_exit_code(ExitStatus::from_raw(0)), 0);
        assert_eq!(propagated_exit_code(ExitStatus::from_raw(2 << 8)), 2);
    }

    #[test]
    fn signaled_children_map_to_128_plus_signo() {
        // Raw wait status 9 is "killed by SIGKILL".
        assert_eq!(propagated_exit_code(ExitStatus::from_raw(9)), 137);
    }
}
