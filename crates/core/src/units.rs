use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::model::{NormalizedSpace, PartitionReport};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UnitError {
    #[error("unrecognized unit '{0}'")]
    UnrecognizedUnit(String),
    #[error("invalid magnitude '{0}'")]
    InvalidMagnitude(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeUnit {
    Giga,
    Mega,
    Kilo,
}

impl SizeUnit {
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "G" | "Gi" => Some(Self::Giga),
            "M" | "Mi" => Some(Self::Mega),
            "K" | "Ki" => Some(Self::Kilo),
            _ => None,
        }
    }

    /// Multiplier into gigabytes.
    pub fn factor(self) -> Decimal {
        match self {
            Self::Giga => Decimal::ONE,
            Self::Mega => Decimal::new(1, 3),
            Self::Kilo => Decimal::new(1, 6),
        }
    }
}

/// Splits a human-readable size such as `5.5G` or `512Mi` into digits and
/// unit letters and converts the magnitude into gigabytes.
pub fn parse_available(raw: &str) -> Result<Decimal, UnitError> {
    let magnitude = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect::<String>();
    let suffix = raw
        .chars()
        .filter(|c| !c.is_ascii_digit() && *c != '.' && !c.is_whitespace())
        .collect::<String>();

    let unit = SizeUnit::from_suffix(&suffix).ok_or(UnitError::UnrecognizedUnit(suffix))?;
    let magnitude = Decimal::from_str(&magnitude)
        .map_err(|_| UnitError::InvalidMagnitude(raw.trim().to_string()))?;

    Ok(magnitude * unit.factor())
}

pub fn normalize(report: &PartitionReport) -> Result<NormalizedSpace, UnitError> {
    Ok(NormalizedSpace {
        partition: report.source.clone(),
        available_gb: parse_available(&report.available_raw)?,
    })
}
