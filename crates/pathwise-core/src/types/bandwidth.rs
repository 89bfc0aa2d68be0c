//! Bandwidth values normalized to bits per second.
//!
//! The inventory writes rates as free text ("100 Mbps", "1 GBPS", "1.5 Mbps") or as a
//! value/unit pair. Everything is parsed into integer bits per second so that
//! comparisons never depend on the unit the record happened to use.

use super::PathwiseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const KBPS: u64 = 1_000;
const MBPS: u64 = 1_000_000;
const GBPS: u64 = 1_000_000_000;

/// A data rate in bits per second.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Bandwidth(u64);

impl Bandwidth {
    /// Zero rate.
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn from_bps(bps: u64) -> Self {
        Self(bps)
    }

    #[must_use]
    pub const fn from_kbps(kbps: u64) -> Self {
        Self(kbps.saturating_mul(KBPS))
    }

    #[must_use]
    pub const fn from_mbps(mbps: u64) -> Self {
        Self(mbps.saturating_mul(MBPS))
    }

    #[must_use]
    pub const fn from_gbps(gbps: u64) -> Self {
        Self(gbps.saturating_mul(GBPS))
    }

    /// Raw bits per second.
    #[must_use]
    pub const fn bps(self) -> u64 {
        self.0
    }

    /// Whole megabits per second, rounded down.
    #[must_use]
    pub const fn mbps(self) -> u64 {
        self.0 / MBPS
    }

    /// `self - other`, or `None` when `other` is larger.
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Parse free text such as `"100 Mbps"`, `"1GBPS"` or `"1.5 Mbps"`.
    pub fn parse(text: &str) -> Result<Self, PathwiseError> {
        let trimmed = text.trim();
        let split = trimmed
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(trimmed.len());
        let (number, unit) = trimmed.split_at(split);
        Self::from_parts(number, unit)
    }

    /// Parse a value and a unit held in separate fields.
    pub fn from_parts(value: &str, unit: &str) -> Result<Self, PathwiseError> {
        let invalid = || PathwiseError::InvalidBandwidth(format!("{} {}", value.trim(), unit.trim()));
        let scale = unit_scale(unit).ok_or_else(invalid)?;
        scaled(value.trim(), scale).map(Self).ok_or_else(invalid)
    }
}

/// Multiplier for a unit label. Labels are case-insensitive and may omit "ps".
fn unit_scale(unit: &str) -> Option<u64> {
    match unit.trim().to_ascii_uppercase().as_str() {
        "BPS" | "B" | "" => Some(1),
        "KBPS" | "K" | "KB" => Some(KBPS),
        "MBPS" | "M" | "MB" => Some(MBPS),
        "GBPS" | "G" | "GB" => Some(GBPS),
        _ => None,
    }
}

/// Multiply a decimal string by `scale` without going through floating point.
///
/// Fraction digits finer than the scale are truncated.
fn scaled(number: &str, scale: u64) -> Option<u64> {
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let whole: u64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut total = whole.checked_mul(scale)?;
    let mut place = scale;
    for digit in fraction.bytes() {
        place /= 10;
        if place == 0 {
            break;
        }
        total = total.checked_add(u64::from(digit - b'0') * place)?;
    }
    Some(total)
}

impl FromStr for Bandwidth {
    type Err = PathwiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Bandwidth {
    /// Largest unit that represents the rate exactly.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bps = self.0;
        if bps != 0 && bps % GBPS == 0 {
            write!(f, "{} Gbps", bps / GBPS)
        } else if bps != 0 && bps % MBPS == 0 {
            write!(f, "{} Mbps", bps / MBPS)
        } else if bps != 0 && bps % KBPS == 0 {
            write!(f, "{} Kbps", bps / KBPS)
        } else {
            write!(f, "{} bps", bps)
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
