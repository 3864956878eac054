use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use aria_bench_core::{
    BenchError, BuildArtifact, BuildRunner, ConfigOverrides, EffectiveConfig, ProfilerKind,
    exec_runtime, propagated_exit_code, resolve_artifact, run_profiled,
};

/// CLI orchestrator for measuring Aria runtime performance.
#[derive(Parser, Debug)]
#[command(name = "aria-bench", author, version, about = "Benchmark orchestrator for the Aria runtime", long_about = None)]
struct Cli {
    /// Print the resolved configuration as JSON before running.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Mode,
}

/// One variant per measurement strategy, each carrying only the fields it
/// needs. Exactly one of {harness delegation, process replacement,
/// wrapped execution} happens per invocation.
#[derive(Subcommand, Debug)]
enum Mode {
    /// Run the statistical benchmark harness (cargo bench).
    Bench {
        /// Benchmark name filter, forwarded verbatim to the harness.
        target: Option<String>,
    },
    /// Execute a single micro-benchmark program directly, replacing this
    /// process with the runtime.
    Micro {
        /// Path to a program, or a name under the micro-benchmark
        /// directory.
        target: String,
        /// Arguments passed through to the runtime unmodified.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        extra_args: Vec<String>,
    },
    /// Profile a compiled benchmark with the sampling profiler (perf).
    Perf {
        /// Benchmark name filter for the build step.
        target: Option<String>,
    },
    /// Measure a compiled benchmark's wall-clock time.
    Time {
        /// Benchmark name filter for the build step.
        target: Option<String>,
    },
    /// Run a compiled benchmark under valgrind's cache profiler.
    Valgrind {
        /// Benchmark name filter for the build step.
        target: Option<String>,
    },
}

fn main() {
    load_dotenv();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            use clap::error::ErrorKind;
            let _ = err.print();
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            std::process::exit(code);
        }
    };
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(failure_exit_code(&err));
        }
    }
}

/// A failed build exits with the build tool's own status; every other
/// orchestration failure exits 1.
fn failure_exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<BenchError>() {
        Some(BenchError::Build { status, .. }) => propagated_exit_code(*status),
        _ => 1,
    }
}

fn run(cli: Cli) -> Result<i32> {
    let config = EffectiveConfig::resolve(install_root()?, ConfigOverrides::from_env());
    if cli.verbose {
        println!("{}", serde_json::to_string_pretty(&config)?);
    }

    match cli.command {
        Mode::Bench { target } => {
            // The harness manages execution itself; no artifact resolution.
            let status = BuildRunner::new(&config).run_harness(target.as_deref())?;
            Ok(propagated_exit_code(status))
        }
        Mode::Micro { target, extra_args } => {
            let program = config.resolve_micro_program(&target);
            // Only returns on exec failure.
            Err(exec_runtime(&config, &program, &extra_args))
                .with_context(|| format!("executing the runtime on {:?}", program))
        }
        Mode::Perf { target } => run_wrapped(ProfilerKind::Perf, target, &config),
        Mode::Time { target } => run_wrapped(ProfilerKind::Time, target, &config),
        Mode::Valgrind { target } => run_wrapped(ProfilerKind::Valgrind, target, &config),
    }
}

/// Build-only step, locate, then wrapped execution.
fn run_wrapped(
    kind: ProfilerKind,
    target: Option<String>,
    config: &EffectiveConfig,
) -> Result<i32> {
    let artifact = wrapped_artifact(config, target.as_deref())?;
    let status = run_profiled(kind, &artifact.path, config)?;
    Ok(propagated_exit_code(status))
}

/// Resolves the binary a profiling mode should wrap. `ARIA_EXECUTABLE`
/// bypasses the build and locate steps entirely.
fn wrapped_artifact(config: &EffectiveConfig, target: Option<&str>) -> Result<BuildArtifact> {
    if let Some(exe) = &config.executable_override {
        return Ok(BuildArtifact {
            path: exe.clone(),
            report: String::new(),
        });
    }
    let report = BuildRunner::new(config).build_no_run(target)?;
    Ok(resolve_artifact(report)?)
}

fn load_dotenv() {
    if let Ok(root) = install_root() {
        let path = root.join(".env.local");
        let _ = dotenvy::from_path(path);
    }
}

fn install_root() -> Result<PathBuf> {
    // Prefer the build-time workspace root but fall back to the current
    // directory for installed binaries.
    let compiled = Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..");
    if let Ok(path) = compiled.canonicalize() {
        return Ok(path);
    }
    std::env::current_dir().context("resolving install root from current directory")
}
