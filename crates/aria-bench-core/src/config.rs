//! Environment-driven configuration for a single benchmark invocation.
//!
//! The resolved [`EffectiveConfig`] is computed exactly once, at the start
//! of the run, by merging caller overrides (environment variables) over
//! defaults anchored to the tool's installation directory. Overrides always
//! win; unset values fall back. No validation is performed here - a
//! malformed path or mask surfaces when it is used, not when it is read.
//!
//! Nothing mutates the config after creation, and nothing mutates this
//! process's environment: resolved values reach child processes through
//! their own environment (`ARIA_LIB_DIR` on every spawned child).

use serde::Serialize;
use std::env;
use std::path::{Path, PathBuf};

/// Selects the cargo profile used for every build step.
pub const BUILD_CONFIG_ENV: &str = "ARIA_BUILD_CONFIG";
/// CPU bitmask handed to `taskset` in micro mode.
pub const CPU_AFFINITY_ENV: &str = "CPU_AFFINITY_MASK";
/// Absolute executable path that bypasses build+locate entirely.
pub const EXECUTABLE_ENV: &str = "ARIA_EXECUTABLE";
/// Colon-joined import search path for the runtime.
pub const LIB_DIR_ENV: &str = "ARIA_LIB_DIR";

/// File extension appended when a micro-benchmark target is rewritten to
/// its conventional location.
pub const MICRO_SUFFIX: &str = ".aria";

const DEFAULT_PROFILE: &str = "release";
const DEFAULT_AFFINITY_MASK: &str = "0x1";
const RUNTIME_BINARY: &str = "aria";

/// Caller-supplied overrides, read from the environment once per run.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub build_profile: Option<String>,
    pub executable: Option<PathBuf>,
    pub lib_dirs: Option<Vec<PathBuf>>,
    pub affinity_mask: Option<String>,
}

impl ConfigOverrides {
    /// Reads the four override variables from the process environment.
    ///
    /// Empty values count as unset, matching how a shell treats
    /// `ARIA_BUILD_CONFIG= aria-bench ...`.
    pub fn from_env() -> Self {
        Self {
            build_profile: non_empty_var(BUILD_CONFIG_ENV),
            executable: non_empty_var(EXECUTABLE_ENV).map(PathBuf::from),
            lib_dirs: non_empty_var(LIB_DIR_ENV)
                .map(|raw| raw.split(':').map(PathBuf::from).collect()),
            affinity_mask: non_empty_var(CPU_AFFINITY_ENV),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|val| !val.is_empty())
}

/// The configuration in effect for one invocation. Read-only after
/// [`EffectiveConfig::resolve`].
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    /// Cargo profile name for build steps.
    pub build_profile: String,
    /// When set, profiling modes skip the build and locate steps.
    pub executable_override: Option<PathBuf>,
    /// Import search path for the runtime, in order.
    pub lib_dirs: Vec<PathBuf>,
    /// CPU bitmask for pinned execution.
    pub affinity_mask: String,
    /// Directory the defaults are anchored to.
    pub install_root: PathBuf,
}

impl EffectiveConfig {
    /// Merges `overrides` over the installation-anchored defaults.
    ///
    /// Pure: reads nothing from the environment and touches no global
    /// state.
    pub fn resolve(install_root: PathBuf, overrides: ConfigOverrides) -> Self {
        let lib_dirs = overrides
            .lib_dirs
            .unwrap_or_else(|| vec![install_root.join("lib"), install_root.join("stdlib")]);
        Self {
            build_profile: overrides
                .build_profile
                .unwrap_or_else(|| DEFAULT_PROFILE.to_string()),
            executable_override: overrides.executable,
            lib_dirs,
            affinity_mask: overrides
                .affinity_mask
                .unwrap_or_else(|| DEFAULT_AFFINITY_MASK.to_string()),
            install_root,
        }
    }

    /// Path of the runtime binary to exec in micro mode: the override when
    /// present, otherwise derived from the profile and install layout.
    pub fn runtime_executable(&self) -> PathBuf {
        match &self.executable_override {
            Some(path) => path.clone(),
            None => self
                .install_root
                .join("target")
                .join(&self.build_profile)
                .join(RUNTIME_BINARY),
        }
    }

    /// Directory holding the single-shot micro-benchmark programs.
    pub fn micro_dir(&self) -> PathBuf {
        self.install_root.join("benchmarks").join("micro")
    }

    /// The colon-joined search path exported to every child.
    pub fn lib_search_path(&self) -> String {
        join_search_path(&self.lib_dirs)
    }

    /// The micro-mode search path: the configured path plus exactly one
    /// additional micro-benchmark directory.
    pub fn micro_lib_search_path(&self) -> String {
        let mut dirs = self.lib_dirs.clone();
        dirs.push(self.micro_dir());
        join_search_path(&dirs)
    }

    /// Resolves a micro-mode target: an existing file is used verbatim,
    /// anything else is rewritten to its conventional location under the
    /// micro-benchmark directory with the fixed suffix appended.
    pub fn resolve_micro_program(&self, target: &str) -> PathBuf {
        let direct = Path::new(target);
        if direct.is_file() {
            return direct.to_path_buf();
        }
        self.micro_dir().join(format!("{target}{MICRO_SUFFIX}"))
    }
}

fn join_search_path(dirs: &[PathBuf]) -> String {
    dirs.iter()
        .map(|dir| dir.display().to_string())
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(overrides: ConfigOverrides) -> EffectiveConfig {
        EffectiveConfig::resolve(PathBuf::from("/opt/aria"), overrides)
    }

    #[test]
    fn defaults_apply_when_nothing_is_overridden() {
        let config = resolved(ConfigOverrides::default());
        assert_eq!(config.build_profile, "release");
        assert_eq!(config.affinity_mask, "0x1");
        assert!(config.executable_override.is_none());
        assert_eq!(config.lib_search_path(), "/opt/aria/lib:/opt/aria/stdlib");
        assert_eq!(
            config.runtime_executable(),
            PathBuf::from("/opt/aria/target/release/aria")
        );
    }

    #[test]
    fn overrides_always_win() {
        let config = resolved(ConfigOverrides {
            build_profile: Some("profiling".into()),
            executable: Some(PathBuf::from("/usr/local/bin/aria")),
            lib_dirs: Some(vec![PathBuf::from("/srv/lib")]),
            affinity_mask: Some("0x3".into()),
        });
        assert_eq!(config.build_profile, "profiling");
        assert_eq!(config.affinity_mask, "0x3");
        assert_eq!(
            config.executable_override,
            Some(PathBuf::from("/usr/local/bin/aria"))
        );
        assert_eq!(config.lib_search_path(), "/srv/lib");
    }

    #[test]
    fn profile_override_moves_the_derived_executable() {
        let config = resolved(ConfigOverrides {
            build_profile: Some("debug".into()),
            ..Default::default()
        });
        assert_eq!(
            config.runtime_executable(),
            PathBuf::from("/opt/aria/target/debug/aria")
        );
    }

    #[test]
    fn micro_search_path_extends_the_configured_path_by_one_directory() {
        // Holds for the defaults and for overridden search paths alike.
        for overrides in [
            ConfigOverrides::default(),
            ConfigOverrides {
                lib_dirs: Some(vec![PathBuf::from("/a"), PathBuf::from("/b")]),
                ..Default::default()
            },
        ] {
            let config = resolved(overrides);
            let base = config.lib_search_path();
            let extended = config.micro_lib_search_path();
            assert!(extended.starts_with(&base));
            assert_eq!(
                extended,
                format!("{base}:{}", config.micro_dir().display())
            );
        }
    }

    #[test]
    fn micro_target_rewritten_to_conventional_location() {
        let config = resolved(ConfigOverrides::default());
        assert_eq!(
            config.resolve_micro_program("fib"),
            PathBuf::from("/opt/aria/benchmarks/micro/fib.aria")
        );
    }

    #[test]
    fn micro_target_used_verbatim_when_it_is_an_existing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let program = dir.path().join("local.aria");
        std::fs::write(&program, "1 + 1").unwrap();

        let config = resolved(ConfigOverrides::default());
        let target = program.display().to_string();
        assert_eq!(config.resolve_micro_program(&target), program);
    }
}
