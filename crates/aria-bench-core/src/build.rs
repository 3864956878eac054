//! Cargo invocation for the two build shapes the orchestrator needs.
//!
//! `bench` mode hands execution to cargo's statistical harness and only
//! cares about the exit status. The profiling modes need a compiled but
//! not-yet-run benchmark binary, so they use the `--no-run` shape and
//! capture cargo's report text for the locator.

use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};

use crate::config::{EffectiveConfig, LIB_DIR_ENV};
use crate::error::BenchError;

const BUILD_TOOL: &str = "cargo";

/// Drives cargo for one invocation. Both entry points block until cargo
/// exits; a non-zero exit is fatal with no retry.
#[derive(Debug, Clone)]
pub struct BuildRunner {
    install_root: PathBuf,
    profile: String,
    lib_search_path: String,
}

impl BuildRunner {
    pub fn new(config: &EffectiveConfig) -> Self {
        Self {
            install_root: config.install_root.clone(),
            profile: config.build_profile.clone(),
            lib_search_path: config.lib_search_path(),
        }
    }

    /// Argument vector for the harness run: profile and filter forwarded
    /// verbatim.
    pub fn harness_args(&self, filter: Option<&str>) -> Vec<String> {
        let mut args = vec![
            "bench".to_string(),
            "--profile".to_string(),
            self.profile.clone(),
        ];
        if let Some(filter) = filter {
            args.push(filter.to_string());
        }
        args
    }

    /// Argument vector for the build-only step.
    pub fn build_only_args(&self, filter: Option<&str>) -> Vec<String> {
        let mut args = self.harness_args(filter);
        args.insert(1, "--no-run".to_string());
        args
    }

    /// Runs the statistical benchmark harness, streaming its output. The
    /// harness manages execution itself; only its exit status comes back.
    pub fn run_harness(&self, filter: Option<&str>) -> Result<ExitStatus, BenchError> {
        let args = self.harness_args(filter);
        println!("Running: {BUILD_TOOL} {}", args.join(" "));
        let status = Command::new(BUILD_TOOL)
            .args(&args)
            .current_dir(&self.install_root)
            // The harness executes the benchmark binaries itself, so the
            // runtime's import path has to travel with it.
            .env(LIB_DIR_ENV, &self.lib_search_path)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()?;
        Ok(status)
    }

    /// Compiles the benchmarks without running them and returns cargo's
    /// combined stdout/stderr text for the locator.
    pub fn build_no_run(&self, filter: Option<&str>) -> Result<String, BenchError> {
        let args = self.build_only_args(filter);
        println!("Building: {BUILD_TOOL} {}", args.join(" "));
        let output = Command::new(BUILD_TOOL)
            .args(&args)
            .current_dir(&self.install_root)
            .output()?;

        // Cargo splits its report across both streams; the locator scans
        // the concatenation.
        let mut report = String::from_utf8_lossy(&output.stdout).into_owned();
        report.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(BenchError::Build {
                status: output.status,
                report: format!("{BUILD_TOOL} {} failed\n\n{report}", args.join(" ")),
            });
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::ConfigOverrides;

    fn runner_with_profile(profile: Option<&str>) -> BuildRunner {
        let config = EffectiveConfig::resolve(
            PathBuf::from("/opt/aria"),
            ConfigOverrides {
                build_profile: profile.map(String::from),
                ..Default::default()
            },
        );
        BuildRunner::new(&config)
    }

    fn runner() -> BuildRunner {
        runner_with_profile(None)
    }

    #[test]
    fn harness_args_forward_profile_and_filter_verbatim() {
        assert_eq!(
            runner().harness_args(Some("hashmap")),
            vec!["bench", "--profile", "release", "hashmap"]
        );
    }

    #[test]
    fn harness_args_omit_the_filter_when_none_is_given() {
        assert_eq!(
            runner().harness_args(None),
            vec!["bench", "--profile", "release"]
        );
    }

    #[test]
    fn build_only_args_add_no_run_and_nothing_else() {
        assert_eq!(
            runner().build_only_args(Some("sort")),
            vec!["bench", "--no-run", "--profile", "release", "sort"]
        );
    }

    #[test]
    fn custom_profile_is_not_rewritten() {
        let runner = runner_with_profile(Some("profiling"));
        assert_eq!(
            runner.harness_args(None),
            vec!["bench", "--profile", "profiling"]
        );
    }
}
