use std::env;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::AppConfig;
use crate::model::{PartitionReport, SpaceBackendKind};
use crate::probe::SpaceSource;
use crate::units::parse_available;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorInfo {
    pub os: String,
    pub arch: String,
    pub current_dir: Option<String>,
    pub backend: SpaceBackendKind,
    pub config: AppConfig,
    pub partitions: Vec<DoctorPartition>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorPartition {
    pub report: PartitionReport,
    pub available_gb: Option<Decimal>,
}

pub fn collect_doctor_info(config: &AppConfig, source: &dyn SpaceSource) -> DoctorInfo {
    let current_dir = env::current_dir()
        .ok()
        .map(|path| path.to_string_lossy().to_string());
    let mut notes = Vec::new();

    let partitions = match source.list_all() {
        Ok(reports) => reports
            .into_iter()
            .map(|report| DoctorPartition {
                available_gb: parse_available(&report.available_raw).ok(),
                report,
            })
            .collect::<Vec<_>>(),
        Err(err) => {
            warn!(error = %err, "disk enumeration failed");
            notes.push(format!("Disk enumeration failed: {err}"));
            Vec::new()
        }
    };

    if partitions.iter().any(|p| p.available_gb.is_none()) {
        notes.push(
            "Some partitions use units outside G/M/K and are ignored by the checker.".to_string(),
        );
    }
    if !config.runner.working_dir.is_dir() {
        notes.push(format!(
            "Playbook directory {} does not exist.",
            config.runner.working_dir.display()
        ));
    }

    DoctorInfo {
        os: env::consts::OS.to_string(),
        arch: env::consts::ARCH.to_string(),
        current_dir,
        backend: config.checker.backend,
        config: config.clone(),
        partitions,
        notes,
    }
}
