use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use tracing::{debug, warn};

use crate::config::CheckerConfig;
use crate::model::{CheckMode, CheckReport, Finding, PartitionReport, REPORT_VERSION};
use crate::probe::SpaceSource;
use crate::units::normalize;

pub fn check(
    config: &CheckerConfig,
    mode: CheckMode,
    source: &dyn SpaceSource,
) -> Result<CheckReport> {
    let mut findings = Vec::new();

    match mode {
        CheckMode::All => {
            let reports = source
                .list_all()
                .context("failed to enumerate mounted filesystems")?;
            for report in &reports {
                evaluate(config, report, &mut findings);
            }
        }
        CheckMode::Named => {
            for partition in &config.partitions {
                match source.lookup(partition) {
                    Ok(report) => {
                        // Named lookups are reported under the configured mount point.
                        let labelled = PartitionReport {
                            source: partition.clone(),
                            ..report
                        };
                        evaluate(config, &labelled, &mut findings);
                    }
                    Err(err) => {
                        warn!(partition = %partition, error = %err, "partition lookup failed");
                        findings.push(Finding::Unresolved {
                            partition: partition.clone(),
                        });
                    }
                }
            }
        }
    }

    Ok(CheckReport {
        report_version: REPORT_VERSION.to_string(),
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        mode,
        backend: config.backend,
        threshold_gb: config.threshold_gb,
        findings,
    })
}

fn evaluate(config: &CheckerConfig, report: &PartitionReport, findings: &mut Vec<Finding>) {
    let space = match normalize(report) {
        Ok(space) => space,
        Err(err) => {
            debug!(
                partition = %report.source,
                raw = %report.available_raw,
                error = %err,
                "skipping record"
            );
            if config.strict_units {
                findings.push(Finding::Skipped {
                    partition: report.source.clone(),
                    raw: report.available_raw.clone(),
                    reason: err.to_string(),
                });
            }
            return;
        }
    };

    debug!(
        partition = %space.partition,
        available_gb = %space.available_gb,
        "normalized available space"
    );
    if space.available_gb < config.threshold_gb {
        findings.push(Finding::LowSpace {
            partition: space.partition,
            available_gb: space.available_gb,
        });
    }
}

pub fn render_lines(report: &CheckReport) -> Vec<String> {
    let threshold = report.threshold_gb.normalize();
    report
        .findings
        .iter()
        .map(|finding| match finding {
            Finding::LowSpace {
                partition,
                available_gb,
            } => format!(
                "Partition {partition} has available space less than {threshold}GB: {}GB",
                available_gb.normalize()
            ),
            Finding::Unresolved { partition } => {
                format!("Failed to retrieve information for partition {partition}")
            }
            Finding::Skipped {
                partition, reason, ..
            } => format!("Skipped partition {partition}: {reason}"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{check, render_lines};
    use crate::config::CheckerConfig;
    use crate::model::{CheckMode, Finding, PartitionReport};
    use crate::probe::FixedSource;

    fn source(rows: &[(&str, &str)]) -> FixedSource {
        FixedSource::new(
            rows.iter()
                .map(|(name, raw)| PartitionReport::new(*name, *raw))
                .collect(),
        )
    }

    #[test]
    fn reports_only_partitions_below_threshold() {
        let source = source(&[("/dev/sda1", "5.5G"), ("/dev/sda2", "8000M")]);
        let report = check(&CheckerConfig::default(), CheckMode::All, &source).unwrap();

        assert_eq!(
            render_lines(&report),
            vec!["Partition /dev/sda1 has available space less than 6GB: 5.5GB"]
        );
    }

    #[test]
    fn threshold_is_strict() {
        let source = source(&[("/dev/sdb1", "6G"), ("/dev/sdb2", "6000M")]);
        let report = check(&CheckerConfig::default(), CheckMode::All, &source).unwrap();
        assert!(report.findings.is_empty());
    }

    #[test]
    fn enumeration_order_is_preserved() {
        let source = source(&[("b", "1G"), ("a", "2G"), ("c", "300M")]);
        let report = check(&CheckerConfig::default(), CheckMode::All, &source).unwrap();
        assert_eq!(
            render_lines(&report),
            vec![
                "Partition b has available space less than 6GB: 1GB",
                "Partition a has available space less than 6GB: 2GB",
                "Partition c has available space less than 6GB: 0.3GB",
            ]
        );
    }

    #[test]
    fn unknown_units_are_silent_by_default() {
        let source = source(&[("/dev/big", "1.2T"), ("tmpfs", "0")]);
        let report = check(&CheckerConfig::default(), CheckMode::All, &source).unwrap();
        assert!(report.findings.is_empty());
    }

    #[test]
    fn strict_units_reports_skips() {
        let config = CheckerConfig {
            strict_units: true,
            ..CheckerConfig::default()
        };
        let source = source(&[("/dev/big", "1.2T")]);
        let report = check(&config, CheckMode::All, &source).unwrap();
        assert_eq!(
            render_lines(&report),
            vec!["Skipped partition /dev/big: unrecognized unit 'T'"]
        );
    }

    #[test]
    fn named_mode_reports_missing_and_continues() {
        let config = CheckerConfig {
            partitions: vec![
                "/nonexistent".to_string(),
                "/logs".to_string(),
                "/app".to_string(),
            ],
            ..CheckerConfig::default()
        };
        let source = source(&[("/logs", "2.25Gi"), ("/app", "120G")]);
        let report = check(&config, CheckMode::Named, &source).unwrap();

        assert_eq!(
            render_lines(&report),
            vec![
                "Failed to retrieve information for partition /nonexistent",
                "Partition /logs has available space less than 6GB: 2.25GB",
            ]
        );
        assert_eq!(report.low_space_count(), 1);
    }

    #[test]
    fn custom_threshold_appears_in_message() {
        let config = CheckerConfig {
            threshold_gb: Decimal::new(105, 1),
            ..CheckerConfig::default()
        };
        let source = source(&[("/dev/sdc1", "9G")]);
        let report = check(&config, CheckMode::All, &source).unwrap();
        assert_eq!(
            report.findings,
            vec![Finding::LowSpace {
                partition: "/dev/sdc1".to_string(),
                available_gb: Decimal::from(9),
            }]
        );
        assert_eq!(
            render_lines(&report),
            vec!["Partition /dev/sdc1 has available space less than 10.5GB: 9GB"]
        );
    }
}
