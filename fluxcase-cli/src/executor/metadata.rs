//! Run metadata: which tree, which machine, which settings.

use chrono::Utc;
use fluxcase_report::{ReportConfig, ReportMeta, SCHEMA_VERSION, SystemInfo};
use std::process::Command;

/// Metadata block for a report produced now.
pub fn build_report_meta(config: ReportConfig) -> ReportMeta {
    ReportMeta {
        schema_version: SCHEMA_VERSION,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        git_commit: git_line(&["rev-parse", "HEAD"]),
        git_branch: git_line(&["rev-parse", "--abbrev-ref", "HEAD"]),
        system: system_info(),
        config,
    }
}

fn system_info() -> SystemInfo {
    SystemInfo {
        os: std::env::consts::OS.to_string(),
        os_version: kernel_release().unwrap_or_else(|| std::env::consts::ARCH.to_string()),
        cpu: cpu_model().unwrap_or_else(|| "Unknown".to_string()),
        cpu_cores: num_cpus(),
    }
}

/// First line of a successful `git` invocation in the working directory.
fn git_line(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let line = text.lines().next()?.trim();
    (!line.is_empty()).then(|| line.to_string())
}

#[cfg(target_os = "linux")]
fn cpu_model() -> Option<String> {
    let cpuinfo = std::fs::read_to_string("/proc/cpuinfo").ok()?;
    cpuinfo.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        (key.trim() == "model name").then(|| value.trim().to_string())
    })
}

#[cfg(not(target_os = "linux"))]
fn cpu_model() -> Option<String> {
    None
}

#[cfg(target_os = "linux")]
fn kernel_release() -> Option<String> {
    let release = std::fs::read_to_string("/proc/sys/kernel/osrelease").ok()?;
    Some(release.trim().to_string()).filter(|r| !r.is_empty())
}

#[cfg(not(target_os = "linux"))]
fn kernel_release() -> Option<String> {
    None
}

/// Available parallelism, at least 1.
pub fn num_cpus() -> u32 {
    std::thread::available_parallelism()
        .map(|n| u32::try_from(n.get()).unwrap_or(u32::MAX))
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_carries_config() {
        let meta = build_report_meta(ReportConfig {
            isolation: "in-process".to_string(),
            jobs: 2,
            loop_timeout_ms: 250,
            case_timeout_ms: None,
            max_steps: Some(100),
            max_depth: 64,
        });
        assert_eq!(meta.schema_version, SCHEMA_VERSION);
        assert_eq!(meta.config.jobs, 2);
        assert_eq!(meta.system.os, std::env::consts::OS);
        assert!(meta.system.cpu_cores >= 1);
    }
}
