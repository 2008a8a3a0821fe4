//! Semantic wrappers for sizes, speeds, and durations.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

const DECIMAL_UNITS: [(&str, u64); 4] = [
    ("TB", 1_000_000_000_000),
    ("GB", 1_000_000_000),
    ("MB", 1_000_000),
    ("KB", 1_000),
];

/// Byte quantity, also used for per-second speeds.
///
/// Parses decimal (`KB`, `MB`, ...) and binary (`KiB`, `MiB`, ...) suffixes;
/// a bare number is a byte count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ByteSize(u64);

impl ByteSize {
    /// Zero bytes.
    pub const ZERO: Self = Self(0);

    /// Construct from a raw byte count.
    #[must_use]
    pub const fn from_bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    /// Construct from decimal kilobytes.
    #[must_use]
    pub const fn from_kb(kb: u64) -> Self {
        Self(kb.saturating_mul(1_000))
    }

    /// Raw byte count.
    #[must_use]
    pub const fn bytes(self) -> u64 {
        self.0
    }

    /// Whether the value is zero (commonly "disabled").
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

fn unit_multiplier(unit: &str) -> Option<u64> {
    let multiplier = match unit.to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" => 1_000,
        "m" | "mb" => 1_000_000,
        "g" | "gb" => 1_000_000_000,
        "t" | "tb" => 1_000_000_000_000,
        "kib" => 1 << 10,
        "mib" => 1 << 20,
        "gib" => 1 << 30,
        "tib" => 1 << 40,
        _ => return None,
    };
    Some(multiplier)
}

impl FromStr for ByteSize {
    type Err = CoreError;

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidByteSize {
            value: raw.to_string(),
        };
        let trimmed = raw.trim();
        let split = trimmed
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(trimmed.len());
        let (number, unit) = trimmed.split_at(split);
        let value: f64 = number.parse().map_err(|_| invalid())?;
        let multiplier = unit_multiplier(unit.trim()).ok_or_else(invalid)?;
        let bytes = (value * multiplier as f64).round();
        if !bytes.is_finite() || bytes < 0.0 || bytes > u64::MAX as f64 {
            return Err(invalid());
        }
        Ok(Self(bytes as u64))
    }
}

impl fmt::Display for ByteSize {
    #[allow(clippy::cast_precision_loss)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, size) in DECIMAL_UNITS {
            if self.0 >= size {
                if self.0 % size == 0 {
                    return write!(f, "{} {label}", self.0 / size);
                }
                return write!(f, "{:.2} {label}", self.0 as f64 / size as f64);
            }
        }
        write!(f, "{} B", self.0)
    }
}

impl Serialize for ByteSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawQuantity {
    Number(u64),
    Text(String),
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawQuantity::deserialize(deserializer)? {
            RawQuantity::Number(bytes) => Ok(Self(bytes)),
            RawQuantity::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Duration wrapper with a compact human display (`1d 2h 3m 4s`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SmartTimeSpan(Duration);

impl SmartTimeSpan {
    /// Wrap an existing duration.
    #[must_use]
    pub const fn new(duration: Duration) -> Self {
        Self(duration)
    }

    /// Convert fractional hours; negative and non-finite values collapse to zero.
    #[must_use]
    pub fn from_hours(hours: f64) -> Self {
        if !hours.is_finite() || hours <= 0.0 {
            return Self(Duration::ZERO);
        }
        Self(Duration::try_from_secs_f64(hours * 3_600.0).unwrap_or(Duration::MAX))
    }

    /// Inner duration.
    #[must_use]
    pub const fn duration(self) -> Duration {
        self.0
    }
}

impl From<Duration> for SmartTimeSpan {
    fn from(value: Duration) -> Self {
        Self(value)
    }
}

impl fmt::Display for SmartTimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.0.as_secs();
        if total == 0 {
            return f.write_str("0s");
        }
        let parts = [
            (total / 86_400, "d"),
            ((total % 86_400) / 3_600, "h"),
            ((total % 3_600) / 60, "m"),
            (total % 60, "s"),
        ];
        let mut first = true;
        for (value, suffix) in parts {
            if value == 0 {
                continue;
            }
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{value}{suffix}")?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for SmartTimeSpan {
    type Err = CoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidDuration {
            value: raw.to_string(),
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(invalid());
        }
        if let Ok(secs) = trimmed.parse::<u64>() {
            return Ok(Self(Duration::from_secs(secs)));
        }
        let mut total: u64 = 0;
        for token in trimmed.split_whitespace() {
            let split = token
                .find(|c: char| !c.is_ascii_digit())
                .ok_or_else(invalid)?;
            let (number, suffix) = token.split_at(split);
            let value: u64 = number.parse().map_err(|_| invalid())?;
            let scale = match suffix {
                "d" => 86_400,
                "h" => 3_600,
                "m" => 60,
                "s" => 1,
                _ => return Err(invalid()),
            };
            total = total.saturating_add(value.saturating_mul(scale));
        }
        Ok(Self(Duration::from_secs(total)))
    }
}
