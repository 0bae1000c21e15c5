use std::process::Command;

use sysinfo::Disks;
use thiserror::Error;
use tracing::debug;

use crate::model::{PartitionReport, SpaceBackendKind};

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("no filesystem reported for {0}")]
    NotFound(String),
}

/// Source of (device, available space) pairs.
pub trait SpaceSource {
    fn list_all(&self) -> Result<Vec<PartitionReport>, ProbeError>;
    fn lookup(&self, mount: &str) -> Result<PartitionReport, ProbeError>;
}

pub fn source_for(kind: SpaceBackendKind) -> Box<dyn SpaceSource> {
    match kind {
        SpaceBackendKind::Df => Box::new(DfSource::default()),
        SpaceBackendKind::Sysinfo => Box::new(SysinfoSource),
    }
}

#[derive(Debug, Clone)]
pub struct DfSource {
    pub program: String,
    /// Arguments placed before the optional mount point.
    pub args: Vec<String>,
}

impl Default for DfSource {
    fn default() -> Self {
        Self {
            program: "df".to_string(),
            args: vec!["-h".to_string(), "--output=source,avail".to_string()],
        }
    }
}

impl DfSource {
    fn run(&self, mount: Option<&str>) -> Result<String, ProbeError> {
        let mut command = Command::new(&self.program);
        // `df -h` prints `1,5G` under comma-decimal locales.
        command.args(&self.args).env("LC_ALL", "C");
        if let Some(mount) = mount {
            command.arg(mount);
        }

        let output = command.output().map_err(|source| ProbeError::Spawn {
            program: self.program.clone(),
            source,
        })?;
        if !output.status.success() {
            return Err(ProbeError::Failed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl SpaceSource for DfSource {
    fn list_all(&self) -> Result<Vec<PartitionReport>, ProbeError> {
        Ok(parse_df_output(&self.run(None)?))
    }

    fn lookup(&self, mount: &str) -> Result<PartitionReport, ProbeError> {
        parse_df_output(&self.run(Some(mount))?)
            .into_iter()
            .next()
            .ok_or_else(|| ProbeError::NotFound(mount.to_string()))
    }
}

/// Parses `df --output=source,avail`. The first line is the header.
pub fn parse_df_output(stdout: &str) -> Vec<PartitionReport> {
    stdout
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let source = fields.next()?;
            let available = fields.last()?;
            Some(PartitionReport::new(source, available))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SysinfoSource;

impl SysinfoSource {
    fn probes() -> Vec<(String, PartitionReport)> {
        let disks = Disks::new_with_refreshed_list();
        disks
            .list()
            .iter()
            .map(|disk| {
                let mount_point = disk.mount_point().to_string_lossy().to_string();
                let report = PartitionReport::new(
                    disk.name().to_string_lossy().to_string(),
                    human_available(disk.available_space()),
                );
                debug!(mount = %mount_point, source = %report.source, "sysinfo disk");
                (mount_point, report)
            })
            .collect()
    }
}

impl SpaceSource for SysinfoSource {
    fn list_all(&self) -> Result<Vec<PartitionReport>, ProbeError> {
        Ok(Self::probes()
            .into_iter()
            .map(|(_, report)| report)
            .collect())
    }

    fn lookup(&self, mount: &str) -> Result<PartitionReport, ProbeError> {
        let wanted = normalize_unix_mount(mount);
        Self::probes()
            .into_iter()
            .find(|(mount_point, _)| normalize_unix_mount(mount_point) == wanted)
            .map(|(_, report)| report)
            .ok_or_else(|| ProbeError::NotFound(mount.to_string()))
    }
}

/// In-memory reports, looked up by their `source` field.
#[derive(Debug, Clone, Default)]
pub struct FixedSource {
    pub reports: Vec<PartitionReport>,
}

impl FixedSource {
    pub fn new(reports: Vec<PartitionReport>) -> Self {
        Self { reports }
    }
}

impl SpaceSource for FixedSource {
    fn list_all(&self) -> Result<Vec<PartitionReport>, ProbeError> {
        Ok(self.reports.clone())
    }

    fn lookup(&self, mount: &str) -> Result<PartitionReport, ProbeError> {
        self.reports
            .iter()
            .find(|report| report.source == mount)
            .cloned()
            .ok_or_else(|| ProbeError::NotFound(mount.to_string()))
    }
}

/// Renders a byte count the way `df -h` does: 1024-based units, one decimal
/// below 10, rounded up.
pub fn human_available(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["K", "M", "G"];
    let mut size = bytes as f64 / 1024.0;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if size < 10.0 {
        let rounded = (size * 10.0).ceil() / 10.0;
        if rounded < 10.0 {
            return format!("{rounded:.1}{}", UNITS[unit]);
        }
    }
    format!("{}{}", size.ceil() as u64, UNITS[unit])
}

fn normalize_unix_mount(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed == "/" {
        "/".to_string()
    } else {
        trimmed.trim_end_matches('/').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{human_available, normalize_unix_mount, parse_df_output, FixedSource, SpaceSource};
    use crate::config::CheckerConfig;
    use crate::model::{CheckMode, PartitionReport};
    use crate::{check, render_lines};

    #[test]
    fn parses_df_rows_after_header() {
        let stdout = "Filesystem      Avail\n/dev/sda1        5.5G\ntmpfs            3.9G\n\n";
        let reports = parse_df_output(stdout);
        assert_eq!(
            reports,
            vec![
                PartitionReport::new("/dev/sda1", "5.5G"),
                PartitionReport::new("tmpfs", "3.9G"),
            ]
        );
    }

    #[test]
    fn header_only_output_yields_nothing() {
        assert!(parse_df_output("Filesystem Avail\n").is_empty());
    }

    #[test]
    fn fixed_source_lookup_misses_are_errors() {
        let source = FixedSource::new(vec![PartitionReport::new("/app", "1G")]);
        assert!(source.lookup("/app").is_ok());
        let err = source.lookup("/nonexistent").unwrap_err();
        assert_eq!(err.to_string(), "no filesystem reported for /nonexistent");
    }

    #[test]
    fn trailing_slashes_are_ignored_except_root() {
        assert_eq!(normalize_unix_mount("/data/"), "/data");
        assert_eq!(normalize_unix_mount("/"), "/");
    }

    #[test]
    fn renders_bytes_like_df_human_output() {
        assert_eq!(human_available(5_000), "4.9K");
        assert_eq!(human_available(300 * 1024 * 1024), "300M");
        assert_eq!(human_available(58 * 1024 * 1024 * 1024 / 10), "5.8G");
        assert_eq!(human_available(80 * 1024 * 1024 * 1024), "80G");
        assert_eq!(human_available(3 * 1024 * 1024 * 1024 * 1024), "3072G");
    }

    #[test]
    fn byte_count_and_df_string_agree_near_threshold() {
        let bytes = 58 * 1024 * 1024 * 1024 / 10;
        let source = FixedSource::new(vec![
            PartitionReport::new("df_view", "5.8G"),
            PartitionReport::new("sysinfo_view", human_available(bytes)),
        ]);
        let report = check(&CheckerConfig::default(), CheckMode::All, &source).unwrap();
        assert_eq!(
            render_lines(&report),
            vec![
                "Partition df_view has available space less than 6GB: 5.8GB",
                "Partition sysinfo_view has available space less than 6GB: 5.8GB",
            ]
        );
    }
}
