//! `fluxcase.toml`
//!
//! Settings are looked up in the nearest `fluxcase.toml` at or above the
//! working directory. Every key is optional; command-line flags override
//! whatever the file says.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file name looked up by [`FluxConfig::discover`]
pub const CONFIG_FILE: &str = "fluxcase.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FluxConfig {
    /// `[runner]`
    pub runner: RunnerConfig,
    /// `[output]`
    pub output: OutputConfig,
    /// `[ci]`
    pub ci: CiConfig,
}

/// Where cases run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum IsolationMode {
    /// Reusable worker processes; crashes and overruns cost one worker
    #[default]
    Process,
    /// Threads inside the runner
    InProcess,
}

impl IsolationMode {
    /// Whether cases run in separate processes
    pub fn is_isolated(self) -> bool {
        self == IsolationMode::Process
    }

    /// Name as written in config and reports
    pub fn as_str(self) -> &'static str {
        match self {
            IsolationMode::Process => "process",
            IsolationMode::InProcess => "in-process",
        }
    }
}

impl std::str::FromStr for IsolationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "process" | "isolated" => Ok(IsolationMode::Process),
            "in-process" | "inprocess" | "thread" => Ok(IsolationMode::InProcess),
            other => Err(format!(
                "unknown isolation mode '{}' (expected process or in-process)",
                other
            )),
        }
    }
}

/// `[runner]`: how cases are executed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Where cases run
    pub isolation: IsolationMode,
    /// Parallel workers; defaults to the number of cores
    pub jobs: Option<usize>,
    /// Budget for loop/recursive cases and cases expecting `*`
    pub loop_timeout: String,
    /// Budget for every other case; unbounded when unset
    pub case_timeout: Option<String>,
    /// Time allowed for a worker to start and say hello
    pub worker_timeout: String,
    /// Step budget counted at `checkpoint()`
    pub max_steps: Option<u64>,
    /// Depth at which `enter_frame()` raises a stack overflow
    pub max_depth: u32,
    /// Stack size in bytes for case threads
    pub stack_size: Option<usize>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            isolation: IsolationMode::Process,
            jobs: None,
            loop_timeout: "2s".to_string(),
            case_timeout: None,
            worker_timeout: "10s".to_string(),
            max_steps: None,
            max_depth: fluxcase_core::DEFAULT_MAX_DEPTH,
            stack_size: None,
        }
    }
}

/// `[output]`: report format and files
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// human, json, github or csv
    pub format: String,
    /// Directory for generated files
    pub directory: String,
    /// Write a baseline after every run
    pub save_baseline: bool,
    /// Baseline file; `<directory>/baseline.json` when unset
    pub baseline_path: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "human".to_string(),
            directory: "target/fluxcase".to_string(),
            save_baseline: false,
            baseline_path: None,
        }
    }
}

impl OutputConfig {
    /// Baseline file to read from and write to.
    pub fn baseline_file(&self) -> PathBuf {
        match &self.baseline_path {
            Some(path) => PathBuf::from(path),
            None => Path::new(&self.directory).join("baseline.json"),
        }
    }
}

/// `[ci]`: which verdicts fail the run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CiConfig {
    /// Exit non-zero on any mismatch
    pub fail_on_mismatch: bool,
    /// Exit non-zero on any harness error
    pub fail_on_harness_error: bool,
    /// Exit non-zero on any unparseable case
    pub fail_on_parse_error: bool,
    /// Print GitHub Actions annotations
    pub github_annotations: bool,
}

impl Default for CiConfig {
    fn default() -> Self {
        Self {
            fail_on_mismatch: true,
            fail_on_harness_error: true,
            fail_on_parse_error: true,
            github_annotations: false,
        }
    }
}

impl FluxConfig {
    /// Read a config file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))
    }

    /// Nearest config file at or above the working directory.
    ///
    /// An unreadable file is logged and treated as absent.
    pub fn discover() -> Option<Self> {
        let cwd = std::env::current_dir().ok()?;
        let path = cwd
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE))
            .find(|candidate| candidate.is_file())?;

        match Self::load(&path) {
            Ok(config) => {
                tracing::debug!(path = %path.display(), "Loaded config");
                Some(config)
            }
            Err(e) => {
                tracing::warn!("Ignoring config: {}", e);
                None
            }
        }
    }

    /// Commented template written by `fluxcase init`.
    pub fn default_toml() -> String {
        r#"# fluxcase settings; every key is optional

[runner]
# "process" runs cases in worker processes, "in-process" on threads
isolation = "process"
# jobs = 4
# Budget for loop/recursive cases and cases expecting `*`
loop_timeout = "2s"
# Budget for all other cases (unbounded when unset)
# case_timeout = "10s"
worker_timeout = "10s"
# Step budget counted at checkpoint()
# max_steps = 1000000
# Call depth reported as a stack overflow
max_depth = 1000

[output]
# human, json, github or csv
format = "human"
directory = "target/fluxcase"
save_baseline = false
# baseline_path = "target/fluxcase/baseline.json"

[ci]
fail_on_mismatch = true
fail_on_harness_error = true
fail_on_parse_error = true
github_annotations = false
"#
        .to_string()
    }

    /// Nanoseconds in a duration such as `500ms`, `2s`, `1.5m` or a bare
    /// number of seconds.
    pub fn parse_duration(s: &str) -> anyhow::Result<u64> {
        let s = s.trim();
        let split = s
            .find(|c: char| c.is_alphabetic() || c == 'µ')
            .unwrap_or(s.len());
        let (number, unit) = s.split_at(split);

        let value: f64 = number
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid duration '{}'", s))?;
        if !value.is_finite() || value < 0.0 {
            anyhow::bail!("invalid duration '{}'", s);
        }

        let nanos_per_unit: f64 = match unit.to_ascii_lowercase().as_str() {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "" | "s" => 1e9,
            "m" | "min" => 60e9,
            other => anyhow::bail!("unknown duration unit '{}' in '{}'", other, s),
        };
        Ok((value * nanos_per_unit) as u64)
    }

    /// [`parse_duration`](Self::parse_duration) as a `Duration`.
    pub fn duration(s: &str) -> anyhow::Result<Duration> {
        Self::parse_duration(s).map(Duration::from_nanos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FluxConfig::default();
        assert_eq!(config.runner.loop_timeout, "2s");
        assert_eq!(config.runner.isolation, IsolationMode::Process);
        assert_eq!(config.runner.max_depth, 1000);
        assert!(config.ci.fail_on_mismatch);
        assert!(!config.ci.github_annotations);
        assert_eq!(
            config.output.baseline_file(),
            PathBuf::from("target/fluxcase/baseline.json")
        );
    }

    #[test]
    fn test_parse_duration() {
        let cases = [
            ("3s", 3_000_000_000),
            ("500ms", 500_000_000),
            ("100us", 100_000),
            ("1000ns", 1000),
            ("2m", 120_000_000_000),
            ("1.5s", 1_500_000_000),
            ("2", 2_000_000_000),
        ];
        for (text, nanos) in cases {
            assert_eq!(FluxConfig::parse_duration(text).unwrap(), nanos, "{}", text);
        }
        for bad in ["", "s", "5h", "-1s", "soon"] {
            assert!(FluxConfig::parse_duration(bad).is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: FluxConfig = toml::from_str(
            r#"
            [runner]
            isolation = "in-process"
            loop_timeout = "500ms"
            max_steps = 10000

            [ci]
            fail_on_parse_error = false
            "#,
        )
        .unwrap();
        assert_eq!(config.runner.isolation, IsolationMode::InProcess);
        assert_eq!(config.runner.loop_timeout, "500ms");
        assert_eq!(config.runner.max_steps, Some(10_000));
        assert!(!config.ci.fail_on_parse_error);

        assert_eq!(config.runner.worker_timeout, "10s");
        assert!(config.ci.fail_on_mismatch);
        assert_eq!(config.output.format, "human");
    }

    #[test]
    fn test_template_parses() {
        let config: FluxConfig = toml::from_str(&FluxConfig::default_toml()).unwrap();
        assert_eq!(config.runner.max_depth, 1000);
        assert_eq!(config.output.directory, "target/fluxcase");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[output]\nformat = \"json\"\ndirectory = \"out\"\n").unwrap();

        let config = FluxConfig::load(&path).unwrap();
        assert_eq!(config.output.format, "json");
        assert_eq!(config.output.baseline_file(), PathBuf::from("out/baseline.json"));
        assert_eq!(config.runner.loop_timeout, "2s");

        std::fs::write(&path, "[runner]\nisolation = 3\n").unwrap();
        assert!(FluxConfig::load(&path).is_err());
    }

    #[test]
    fn test_isolation_from_str() {
        assert_eq!("process".parse::<IsolationMode>(), Ok(IsolationMode::Process));
        assert_eq!("In-Process".parse::<IsolationMode>(), Ok(IsolationMode::InProcess));
        assert!("fiber".parse::<IsolationMode>().is_err());
    }
}
