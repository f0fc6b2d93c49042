#![warn(missing_docs)]
//! Fluxcase CLI Library
//!
//! This module provides the CLI infrastructure for corpus binaries.
//! Use `fluxcase::run()` (or `fluxcase_cli::run()`) in your main function to
//! evaluate every registered method against its declared cases.
//!
//! # Example
//!
//! ```ignore
//! use fluxcase::prelude::*;
//!
//! #[method]
//! #[case("(1, 0) -> divide by zero")]
//! #[case("(4, 2) -> ok")]
//! fn divide(a: i32, b: i32) -> i32 {
//!     ops::div(a, b)
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     fluxcase_cli::run()
//! }
//! ```

mod config;
mod executor;
mod planner;
mod supervisor;
mod worker;

pub use config::*;
pub use executor::{
    CaseExecutionResult, ExecutionConfig, Executor, IsolatedExecutor, build_report,
    case_report_result, format_human_output, num_cpus,
};
pub use planner::{ExecutionPlan, PlannedCase, build_plan};
pub use supervisor::*;
pub use worker::WorkerMain;

use clap::{Parser, Subcommand};
use fluxcase_core::{Tag, execute, execute_with_budget, find_method};
use fluxcase_logic::{Corpus, parse_args};
use fluxcase_report::{
    CaseStatus, OutputFormat, Report, ReportConfig, compare_with_baseline, generate_csv_report,
    generate_github_summary, generate_json_report, parse_json_report,
};
use regex::Regex;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

/// Fluxcase CLI arguments
#[derive(Parser, Debug)]
#[command(name = "fluxcase")]
#[command(author, version, about = "Fluxcase - annotated test-case harness for Rust")]
pub struct Cli {
    /// Optional subcommand (List, Run, Eval); defaults to Run
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Filter methods by regex pattern on their id
    #[arg(default_value = ".*")]
    pub filter: String,

    /// Output format: json, github-summary, csv, human
    #[arg(long)]
    pub format: Option<String>,

    /// Output file (stdout if not specified)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Load a previous report and flag cases whose verdict changed
    /// Optionally specify a path; defaults to config or target/fluxcase/baseline.json
    #[arg(long)]
    pub baseline: Option<Option<PathBuf>>,

    /// Save the report as baseline JSON
    /// Optionally specify a path; defaults to config or target/fluxcase/baseline.json
    #[arg(long)]
    pub save_baseline: Option<Option<PathBuf>>,

    /// Dry run - list methods without executing
    #[arg(long)]
    pub dry_run: bool,

    /// Run methods of this class only
    #[arg(long)]
    pub class: Option<String>,

    /// Filter by tag (loop, recursive)
    #[arg(long)]
    pub tag: Option<String>,

    /// Skip methods with this tag
    #[arg(long)]
    pub skip_tag: Option<String>,

    /// Isolation mode: process or in-process
    #[arg(long)]
    pub isolation: Option<IsolationMode>,

    /// Parallel threads (in-process) or worker processes (isolated)
    #[arg(long, short = 'j')]
    pub jobs: Option<usize>,

    /// Budget for loop/recursive cases, e.g. "2s" or "500ms"
    #[arg(long, global = true)]
    pub loop_timeout: Option<String>,

    /// Budget for every other case
    #[arg(long, global = true)]
    pub case_timeout: Option<String>,

    /// Instruction budget counted by checkpoints
    #[arg(long, global = true)]
    pub max_steps: Option<u64>,

    /// Maximum call depth before a stack overflow is raised
    #[arg(long, global = true)]
    pub max_depth: Option<u32>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Internal: Run as worker process (used by supervisor)
    #[arg(long, hide = true)]
    pub flux_worker: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List all registered methods and their cases
    List,
    /// Run every selected case (default)
    Run,
    /// Write a default fluxcase.toml into the current directory
    Init,
    /// Evaluate one method on one argument list and print the outcome
    Eval {
        /// Method id, `class::name`, or unambiguous bare name
        method: String,
        /// Argument list, e.g. "(1, 0)"
        input: String,
    },
}

/// Run the Fluxcase CLI with the process arguments.
/// This is the main entry point for corpus binaries.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the Fluxcase CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    // Worker mode comes before any other initialization
    if cli.flux_worker {
        return run_worker_mode();
    }

    let filter = if cli.verbose {
        "fluxcase=debug"
    } else {
        "fluxcase=info"
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let config = FluxConfig::discover().unwrap_or_default();

    let format: OutputFormat = cli
        .format
        .as_deref()
        .unwrap_or(&config.output.format)
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    match cli.command {
        Some(Commands::List) => list_methods(&cli),
        Some(Commands::Run) => run_cases(&cli, &config, format),
        Some(Commands::Init) => init_config(),
        Some(Commands::Eval {
            ref method,
            ref input,
        }) => eval_case(&cli, &config, method, input),
        None if cli.dry_run => list_methods(&cli),
        None => run_cases(&cli, &config, format),
    }
}

/// Run as a worker process (IPC mode)
fn run_worker_mode() -> anyhow::Result<()> {
    let mut worker = WorkerMain::new();
    worker
        .run()
        .map_err(|e| anyhow::anyhow!("Worker error: {}", e))
}

fn parse_tag(name: Option<&str>) -> anyhow::Result<Option<Tag>> {
    name.map(|n| {
        Tag::from_name(n)
            .ok_or_else(|| anyhow::anyhow!("unknown tag '{}' (expected loop or recursive)", n))
    })
    .transpose()
}

fn init_config() -> anyhow::Result<()> {
    let path = PathBuf::from(CONFIG_FILE);
    if path.exists() {
        return Err(anyhow::anyhow!("{} already exists", path.display()));
    }
    std::fs::write(&path, FluxConfig::default_toml())?;
    println!("Created {}", path.display());
    Ok(())
}

/// Load the registered corpus and apply the CLI filters.
fn plan_from_cli(cli: &Cli) -> anyhow::Result<ExecutionPlan> {
    let filter_re = Regex::new(&cli.filter)
        .map_err(|e| anyhow::anyhow!("invalid filter '{}': {}", cli.filter, e))?;

    Ok(build_plan(
        Corpus::load(),
        Some(&filter_re),
        cli.class.as_deref(),
        parse_tag(cli.tag.as_deref())?,
        parse_tag(cli.skip_tag.as_deref())?,
    ))
}

fn list_methods(cli: &Cli) -> anyhow::Result<()> {
    println!("Fluxcase Corpus:");

    let plan = plan_from_cli(cli)?;

    let mut classes: Vec<(&str, Vec<_>)> = Vec::new();
    for method in &plan.corpus.methods {
        let class = method.def.class_name();
        match classes.iter_mut().find(|(c, _)| *c == class) {
            Some((_, methods)) => methods.push(method),
            None => classes.push((class, vec![method])),
        }
    }

    for (class, methods) in &classes {
        println!("├── class: {}", class);
        for method in methods {
            let tags = if method.tags().is_empty() {
                String::new()
            } else {
                let names: Vec<&str> = method.tags().iter().map(|t| t.as_str()).collect();
                format!(" [{}]", names.join(", "))
            };
            println!(
                "│   ├── {}{} ({}:{})",
                method.def.signature(),
                tags,
                method.def.file,
                method.def.line
            );
            if cli.verbose {
                for entry in &method.cases {
                    println!("│   │   └── {}", entry.source);
                }
            }
        }
    }

    println!(
        "{} methods, {} cases found.",
        plan.method_count(),
        plan.case_count()
    );

    // Tag counts cover the whole corpus so filters can be discovered
    let mut loop_count = 0;
    let mut recursive_count = 0;
    for method in Corpus::load().methods {
        loop_count += usize::from(method.def.has_tag(Tag::Loop));
        recursive_count += usize::from(method.def.has_tag(Tag::Recursive));
    }
    if loop_count + recursive_count > 0 {
        println!("Tags: loop ({}), recursive ({})", loop_count, recursive_count);
    }

    Ok(())
}

/// Build an ExecutionConfig by layering: fluxcase.toml defaults → CLI overrides.
fn build_execution_config(cli: &Cli, config: &FluxConfig) -> anyhow::Result<ExecutionConfig> {
    let runner = &config.runner;

    let loop_timeout =
        FluxConfig::duration(cli.loop_timeout.as_deref().unwrap_or(&runner.loop_timeout))?;
    let case_timeout = cli
        .case_timeout
        .as_deref()
        .or(runner.case_timeout.as_deref())
        .map(FluxConfig::duration)
        .transpose()?;
    let worker_timeout = FluxConfig::duration(&runner.worker_timeout)?;

    let jobs = cli
        .jobs
        .or(runner.jobs)
        .unwrap_or_else(|| num_cpus() as usize)
        .max(1);

    Ok(ExecutionConfig {
        limits: fluxcase_core::CallLimits {
            max_depth: cli.max_depth.unwrap_or(runner.max_depth),
            max_steps: cli.max_steps.or(runner.max_steps),
        },
        loop_timeout,
        case_timeout,
        stack_size: runner.stack_size,
        worker_timeout,
        worker_binary: None,
        jobs,
        show_progress: !cli.verbose,
    })
}

fn report_config(isolation: IsolationMode, exec: &ExecutionConfig) -> ReportConfig {
    ReportConfig {
        isolation: isolation.as_str().to_string(),
        jobs: exec.jobs,
        loop_timeout_ms: exec.loop_timeout.as_millis() as u64,
        case_timeout_ms: exec.case_timeout.map(|d| d.as_millis() as u64),
        max_steps: exec.limits.max_steps,
        max_depth: exec.limits.max_depth,
    }
}

fn run_cases(cli: &Cli, config: &FluxConfig, format: OutputFormat) -> anyhow::Result<()> {
    let plan = plan_from_cli(cli)?;

    if plan.method_count() == 0 {
        println!("No methods found.");
        return Ok(());
    }

    let isolation = cli.isolation.unwrap_or(config.runner.isolation);
    let exec_config = build_execution_config(cli, config)?;

    eprintln!(
        "Running {} cases of {} methods ({}, {} job(s))...\n",
        plan.case_count(),
        plan.method_count(),
        isolation.as_str(),
        exec_config.jobs
    );

    let start_time = Instant::now();

    let results = if isolation.is_isolated() {
        IsolatedExecutor::new(exec_config.clone()).execute(&plan)
    } else {
        Executor::new(exec_config.clone()).execute(&plan)
    };

    let total_duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;
    let mut report = build_report(
        &results,
        report_config(isolation, &exec_config),
        total_duration_ms,
    );

    if let Some(baseline_path) = resolve_baseline_path(&cli.baseline, config) {
        match load_baseline(&baseline_path) {
            Ok(baseline) => {
                let comparison = compare_with_baseline(&mut report, &baseline);
                if comparison.changed > 0 {
                    tracing::warn!(
                        changed = comparison.changed,
                        "Verdicts changed against baseline; possible nondeterministic corpus methods"
                    );
                }
            }
            Err(e) => {
                eprintln!(
                    "Warning: failed to load baseline {}: {}",
                    baseline_path.display(),
                    e
                );
            }
        }
    }

    if config.ci.github_annotations {
        emit_github_annotations(&report);
    }

    let output = match format {
        OutputFormat::Json => generate_json_report(&report)?,
        OutputFormat::GithubSummary => generate_github_summary(&report),
        OutputFormat::Csv => generate_csv_report(&report),
        OutputFormat::Human => format_human_output(&report, cli.verbose),
    };
    write_output(cli, &output)?;

    save_baseline_if_needed(cli, config, &report)?;

    let failures = failing_counts(&report, &config.ci);
    if !failures.is_empty() {
        eprintln!("\n{}", failures.join(", "));
        std::process::exit(1);
    }

    Ok(())
}

/// Human-readable counts of failures the CI settings treat as fatal.
fn failing_counts(report: &Report, ci: &CiConfig) -> Vec<String> {
    let summary = &report.summary;
    let mut failures = Vec::new();
    if ci.fail_on_mismatch && summary.mismatched > 0 {
        failures.push(format!("{} mismatch(es)", summary.mismatched));
    }
    if ci.fail_on_harness_error && summary.harness_errors > 0 {
        failures.push(format!("{} harness error(s)", summary.harness_errors));
    }
    if ci.fail_on_parse_error && summary.parse_errors > 0 {
        failures.push(format!("{} parse error(s)", summary.parse_errors));
    }
    failures
}

/// Evaluate a single method on one argument list.
fn eval_case(cli: &Cli, config: &FluxConfig, method: &str, input: &str) -> anyhow::Result<()> {
    let def = find_method(method).ok_or_else(|| anyhow::anyhow!("unknown method '{}'", method))?;
    let args = parse_args(input).map_err(|e| anyhow::anyhow!("invalid input '{}': {}", input, e))?;
    let exec_config = build_execution_config(cli, config)?;

    fluxcase_core::install_quiet_panic_hook();

    let budget = if def.is_budgeted() {
        Some(exec_config.loop_timeout)
    } else {
        exec_config.case_timeout
    };

    let execution = match budget {
        Some(budget) => execute_with_budget(
            def,
            args,
            exec_config.limits,
            budget,
            exec_config.stack_size,
        ),
        None => execute(def, &args, exec_config.limits),
    };

    match execution.result {
        Ok(actual) => {
            println!("{}", actual.phrase());
            if cli.verbose {
                if let Some(value) = execution.return_value {
                    eprintln!("returned {} in {:?}", value, execution.duration);
                }
            }
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!("{}: {}", def.id, e)),
    }
}

fn load_baseline(path: &std::path::Path) -> anyhow::Result<Report> {
    let json = std::fs::read_to_string(path)?;
    Ok(parse_json_report(&json)?)
}

fn write_output(cli: &Cli, output: &str) -> anyhow::Result<()> {
    if let Some(ref path) = cli.output {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(path)?;
        file.write_all(output.as_bytes())?;
        eprintln!("Report written to: {}", path.display());
    } else {
        print!("{}", output);
    }
    Ok(())
}

/// Save the report as a baseline JSON file if configured.
fn save_baseline_if_needed(cli: &Cli, config: &FluxConfig, report: &Report) -> anyhow::Result<()> {
    let should_save = cli.save_baseline.is_some() || config.output.save_baseline;
    if !should_save {
        return Ok(());
    }

    // CLI value, then config
    let path = cli
        .save_baseline
        .as_ref()
        .and_then(|opt| opt.clone())
        .unwrap_or_else(|| config.output.baseline_file());

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = generate_json_report(report)?;
    std::fs::write(&path, json)?;
    eprintln!("Baseline saved to: {}", path.display());

    Ok(())
}

fn resolve_baseline_path(
    cli_baseline: &Option<Option<PathBuf>>,
    config: &FluxConfig,
) -> Option<PathBuf> {
    match cli_baseline {
        Some(Some(path)) => Some(path.clone()),
        Some(None) => Some(config.output.baseline_file()),
        None => None,
    }
}

/// Print GitHub Actions workflow commands for failing cases.
fn emit_github_annotations(report: &Report) {
    for line in github_annotations(report) {
        println!("{}", line);
    }
}

fn github_annotations(report: &Report) -> Vec<String> {
    let mut lines = Vec::new();
    for result in &report.results {
        let level = match result.status {
            CaseStatus::Match => {
                if result.baseline_change.is_some() {
                    "warning"
                } else {
                    continue;
                }
            }
            CaseStatus::Mismatch | CaseStatus::HarnessError | CaseStatus::ParseError => "error",
        };

        let detail = result
            .message
            .clone()
            .unwrap_or_else(|| result.status.as_str().replace('_', " "));
        lines.push(format!(
            "::{} file={},line={}::{}#{} {}: {}",
            level, result.file, result.line, result.method_id, result.case_index, result.source, detail
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluxcase_report::{BaselineChange, CaseReportResult, ReportMeta, ReportSummary, SystemInfo};

    fn meta() -> ReportMeta {
        ReportMeta {
            schema_version: 1,
            version: "0.1.0".to_string(),
            timestamp: chrono::Utc::now(),
            git_commit: None,
            git_branch: None,
            system: SystemInfo {
                os: "linux".to_string(),
                os_version: "x86_64".to_string(),
                cpu: "test".to_string(),
                cpu_cores: 1,
            },
            config: ReportConfig {
                isolation: "in-process".to_string(),
                jobs: 1,
                loop_timeout_ms: 2000,
                case_timeout_ms: None,
                max_steps: None,
                max_depth: 1000,
            },
        }
    }

    fn result(index: usize, status: CaseStatus, message: Option<&str>) -> CaseReportResult {
        CaseReportResult {
            method_id: "simple::divide".to_string(),
            method_name: "divide".to_string(),
            class: "Simple".to_string(),
            file: "src/simple.rs".to_string(),
            line: 12,
            tags: Vec::new(),
            case_index: index,
            source: "(1, 0) -> divide by zero".to_string(),
            args: Some("(1, 0)".to_string()),
            expected: vec!["divide by zero".to_string()],
            actual: Some("ok".to_string()),
            status,
            message: message.map(str::to_string),
            return_value: None,
            duration_ns: 10,
            baseline_change: None,
        }
    }

    fn report(results: Vec<CaseReportResult>, mismatched: usize, parse_errors: usize) -> Report {
        Report {
            meta: meta(),
            results,
            methods: Vec::new(),
            summary: ReportSummary {
                total_methods: 1,
                total_cases: 2,
                matched: 0,
                mismatched,
                harness_errors: 0,
                parse_errors,
                timeouts: 0,
                changed_vs_baseline: 0,
                total_duration_ms: 1.0,
            },
            baseline_meta: None,
        }
    }

    #[test]
    fn test_cli_parses_run_flags() {
        let cli = Cli::parse_from([
            "fluxcase",
            "simple::",
            "--isolation",
            "in-process",
            "--loop-timeout",
            "500ms",
            "--tag",
            "loop",
            "--baseline",
        ]);
        assert_eq!(cli.isolation, Some(IsolationMode::InProcess));
        assert_eq!(cli.loop_timeout.as_deref(), Some("500ms"));
        assert_eq!(cli.baseline, Some(None));
        assert_eq!(cli.filter, "simple::");
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_parses_eval() {
        let cli = Cli::parse_from(["fluxcase", "eval", "Simple::divide", "(1, 0)"]);
        match cli.command {
            Some(Commands::Eval { method, input }) => {
                assert_eq!(method, "Simple::divide");
                assert_eq!(input, "(1, 0)");
            }
            other => panic!("expected eval, got {:?}", other),
        }
    }

    #[test]
    fn test_budget_flags_follow_subcommand() {
        let cli = Cli::try_parse_from([
            "fluxcase",
            "eval",
            "spin",
            "(0)",
            "--loop-timeout",
            "100ms",
            "--max-steps",
            "50",
            "-v",
        ])
        .unwrap();
        assert!(matches!(cli.command, Some(Commands::Eval { .. })));
        assert_eq!(cli.loop_timeout.as_deref(), Some("100ms"));
        assert_eq!(cli.max_steps, Some(50));
        assert!(cli.verbose);

        let cli =
            Cli::try_parse_from(["fluxcase", "run", "--max-depth", "8", "--case-timeout", "1s"])
                .unwrap();
        assert!(matches!(cli.command, Some(Commands::Run)));
        assert_eq!(cli.max_depth, Some(8));
        assert_eq!(cli.case_timeout.as_deref(), Some("1s"));
    }

    #[test]
    fn test_parse_tag() {
        assert_eq!(parse_tag(Some("loop")).unwrap(), Some(Tag::Loop));
        assert_eq!(parse_tag(None).unwrap(), None);
        assert!(parse_tag(Some("slow")).is_err());
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "fluxcase",
            "--loop-timeout",
            "250ms",
            "--max-depth",
            "64",
            "-j",
            "3",
        ]);
        let mut config = FluxConfig::default();
        config.runner.case_timeout = Some("1s".to_string());
        config.runner.max_steps = Some(10_000);

        let exec = build_execution_config(&cli, &config).unwrap();
        assert_eq!(exec.loop_timeout, std::time::Duration::from_millis(250));
        assert_eq!(exec.case_timeout, Some(std::time::Duration::from_secs(1)));
        assert_eq!(exec.limits.max_depth, 64);
        assert_eq!(exec.limits.max_steps, Some(10_000));
        assert_eq!(exec.jobs, 3);
    }

    #[test]
    fn test_invalid_duration_is_an_error() {
        let cli = Cli::parse_from(["fluxcase", "--loop-timeout", "soon"]);
        assert!(build_execution_config(&cli, &FluxConfig::default()).is_err());
    }

    #[test]
    fn test_resolve_baseline_path() {
        let config = FluxConfig::default();
        assert_eq!(resolve_baseline_path(&None, &config), None);
        assert_eq!(
            resolve_baseline_path(&Some(None), &config),
            Some(PathBuf::from("target/fluxcase/baseline.json"))
        );
        assert_eq!(
            resolve_baseline_path(&Some(Some(PathBuf::from("old.json"))), &config),
            Some(PathBuf::from("old.json"))
        );
    }

    #[test]
    fn test_failing_counts_respect_ci_switches() {
        let report = report(Vec::new(), 2, 1);
        let mut ci = CiConfig::default();
        assert_eq!(
            failing_counts(&report, &ci),
            vec!["2 mismatch(es)".to_string(), "1 parse error(s)".to_string()]
        );

        ci.fail_on_mismatch = false;
        ci.fail_on_parse_error = false;
        assert!(failing_counts(&report, &ci).is_empty());
    }

    #[test]
    fn test_github_annotations() {
        let mut changed = result(1, CaseStatus::Match, None);
        changed.baseline_change = Some(BaselineChange {
            previous_status: CaseStatus::Mismatch,
            previous_actual: Some("ok".to_string()),
        });
        let report = report(
            vec![
                result(0, CaseStatus::Mismatch, Some("expected divide by zero, got ok")),
                changed,
                result(2, CaseStatus::Match, None),
            ],
            1,
            0,
        );

        let lines = github_annotations(&report);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("::error file=src/simple.rs,line=12::simple::divide#0"));
        assert!(lines[0].ends_with("expected divide by zero, got ok"));
        assert!(lines[1].starts_with("::warning "));
    }
}
