use std::fs;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use opsguard_core::{
    check, collect_doctor_info, load_config_or_default, render_lines, source_for, CheckMode,
    ExitPolicy, PlaybookRunner, SpaceBackendKind,
};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "opsguard",
    version,
    about = "Run the maintenance playbook and warn about partitions running low on space."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print a warning for every partition below the free-space threshold.
    Check(CheckArgs),
    /// Run the playbook with output captured to the log files.
    RunPlaybook(RunPlaybookArgs),
    /// Show environment, effective config and reported partitions.
    Doctor(DoctorArgs),
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum CliCheckMode {
    /// Only the configured mount points.
    Named,
    /// Every mounted filesystem.
    All,
}

impl From<CliCheckMode> for CheckMode {
    fn from(value: CliCheckMode) -> Self {
        match value {
            CliCheckMode::Named => CheckMode::Named,
            CliCheckMode::All => CheckMode::All,
        }
    }
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum CliBackendKind {
    Df,
    Sysinfo,
}

impl From<CliBackendKind> for SpaceBackendKind {
    fn from(value: CliBackendKind) -> Self {
        match value {
            CliBackendKind::Df => SpaceBackendKind::Df,
            CliBackendKind::Sysinfo => SpaceBackendKind::Sysinfo,
        }
    }
}

#[derive(Debug, Args)]
struct CheckArgs {
    #[arg(long, default_value = "named")]
    mode: CliCheckMode,

    /// Disk-usage backend; overrides the config file.
    #[arg(long)]
    backend: Option<CliBackendKind>,

    /// Also print records whose size unit could not be converted.
    #[arg(long)]
    strict: bool,

    /// Threshold in GB; overrides the config file.
    #[arg(long, value_name = "GB")]
    threshold_gb: Option<Decimal>,

    /// JSON config file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Optional JSON output file for the check report.
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct RunPlaybookArgs {
    /// JSON config file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Playbook to run instead of the configured one.
    #[arg(long, value_name = "NAME")]
    playbook: Option<String>,

    /// Exit with the playbook's own exit code.
    #[arg(long)]
    propagate_exit: bool,
}

#[derive(Debug, Args)]
struct DoctorArgs {
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long)]
    backend: Option<CliBackendKind>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Check(args) => run_check_command(args),
        Commands::RunPlaybook(args) => run_playbook_command(args),
        Commands::Doctor(args) => run_doctor_command(args),
    }
}

fn run_check_command(args: CheckArgs) -> Result<()> {
    let mut config = load_config_or_default(args.config.as_deref())?.checker;
    if let Some(backend) = args.backend {
        config.backend = backend.into();
    }
    if let Some(threshold) = args.threshold_gb {
        config.threshold_gb = threshold;
    }
    config.strict_units |= args.strict;

    let source = source_for(config.backend);
    let report = check(&config, args.mode.into(), source.as_ref())?;
    for line in render_lines(&report) {
        println!("{line}");
    }
    tracing::info!(
        low_space = report.low_space_count(),
        findings = report.findings.len(),
        "check complete"
    );

    if let Some(output) = args.json {
        let payload =
            serde_json::to_string_pretty(&report).context("failed to serialize check report")?;
        fs::write(&output, payload)
            .with_context(|| format!("failed to write check report {}", output.display()))?;
    }

    Ok(())
}

fn run_playbook_command(args: RunPlaybookArgs) -> Result<()> {
    let mut config = load_config_or_default(args.config.as_deref())?.runner;
    if let Some(playbook) = args.playbook {
        config.playbook = playbook;
    }
    if args.propagate_exit {
        config.exit_policy = ExitPolicy::Propagate;
    }

    let exit_code = PlaybookRunner::new(config).run_for_exit();
    if exit_code != 0 {
        process::exit(exit_code);
    }
    Ok(())
}

fn run_doctor_command(args: DoctorArgs) -> Result<()> {
    let mut config = load_config_or_default(args.config.as_deref())?;
    if let Some(backend) = args.backend {
        config.checker.backend = backend.into();
    }

    let source = source_for(config.checker.backend);
    let info = collect_doctor_info(&config, source.as_ref());
    println!("OS: {} ({})", info.os, info.arch);
    if let Some(current_dir) = info.current_dir {
        println!("Current directory: {}", current_dir);
    }
    println!("Backend: {:?}", info.backend);
    println!(
        "Threshold: {}GB, named partitions: {}",
        info.config.checker.threshold_gb.normalize(),
        info.config.checker.partitions.join(", ")
    );
    println!(
        "Playbook: {} {} in {} (stdout -> {}, stderr -> {}, exit policy {:?})",
        info.config.runner.program,
        info.config.runner.playbook,
        info.config.runner.working_dir.display(),
        info.config.runner.stdout_log.display(),
        info.config.runner.stderr_log.display(),
        info.config.runner.exit_policy
    );
    println!("Reported partitions: {}", info.partitions.len());
    for partition in info.partitions {
        let available = partition
            .available_gb
            .map(|gb| format!("{}GB", gb.normalize()))
            .unwrap_or_else(|| "unconvertible".to_string());
        println!(
            "- {} avail={} ({})",
            partition.report.source, partition.report.available_raw, available
        );
    }
    for note in info.notes {
        println!("Note: {}", note);
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
