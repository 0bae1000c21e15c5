use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const REPORT_VERSION: &str = "1.0.0";

/// One row as handed back by the disk-usage reporter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartitionReport {
    pub source: String,
    pub available_raw: String,
}

impl PartitionReport {
    pub fn new(source: impl Into<String>, available_raw: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            available_raw: available_raw.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedSpace {
    pub partition: String,
    pub available_gb: Decimal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckMode {
    All,
    #[default]
    Named,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpaceBackendKind {
    #[default]
    Df,
    Sysinfo,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    LowSpace {
        partition: String,
        available_gb: Decimal,
    },
    Unresolved {
        partition: String,
    },
    Skipped {
        partition: String,
        raw: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckReport {
    pub report_version: String,
    pub generated_at: String,
    pub mode: CheckMode,
    pub backend: SpaceBackendKind,
    pub threshold_gb: Decimal,
    pub findings: Vec<Finding>,
}

impl CheckReport {
    pub fn low_space_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|finding| matches!(finding, Finding::LowSpace { .. }))
            .count()
    }
}
