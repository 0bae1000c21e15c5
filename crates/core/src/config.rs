use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::model::SpaceBackendKind;

pub const DEFAULT_THRESHOLD_GB: i64 = 6;
pub const DEFAULT_PARTITIONS: &[&str] = &["/app", "/dblogs", "/datafiles", "/logs", "/"];

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub checker: CheckerConfig,
    pub runner: RunnerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CheckerConfig {
    pub threshold_gb: Decimal,
    pub partitions: Vec<String>,
    /// Report records whose unit could not be converted instead of dropping them.
    pub strict_units: bool,
    pub backend: SpaceBackendKind,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            threshold_gb: Decimal::from(DEFAULT_THRESHOLD_GB),
            partitions: DEFAULT_PARTITIONS.iter().map(|p| p.to_string()).collect(),
            strict_units: false,
            backend: SpaceBackendKind::Df,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExitPolicy {
    /// The wrapper reports success whatever the job did.
    #[default]
    AlwaysSucceed,
    Propagate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunnerConfig {
    pub working_dir: PathBuf,
    pub program: String,
    pub args: Vec<String>,
    pub playbook: String,
    pub stdout_log: PathBuf,
    pub stderr_log: PathBuf,
    pub exit_policy: ExitPolicy,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("/etc/ansible"),
            program: "ansible-playbook".to_string(),
            args: Vec::new(),
            playbook: "site.yml".to_string(),
            stdout_log: PathBuf::from("/tmp/ansible-output.txt"),
            stderr_log: PathBuf::from("/tmp/ansible-error.txt"),
            exit_policy: ExitPolicy::AlwaysSucceed,
        }
    }
}

pub fn load_config(path: &Path) -> Result<AppConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse config {}", path.display()))
}

pub fn load_config_or_default(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => load_config(path),
        None => Ok(AppConfig::default()),
    }
}
