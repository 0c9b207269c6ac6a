//! Memory quantities: parsing `<n><unit>` strings, heap ratios and
//! rendering byte counts back into JVM-compatible size strings.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::AppError;

const KIB: u64 = 1024;
const MIB: u64 = KIB * 1024;
const GIB: u64 = MIB * 1024;

/// Share of the memory limit given to the heap when nothing is configured.
pub const DEFAULT_HEAP_RATIO: f64 = 0.75;

/// Units tried by [`minify_memory_size`] before falling back to kilobytes.
const EXACT_UNITS: [MemoryUnit; 2] = [MemoryUnit::Giga, MemoryUnit::Mega];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryUnit {
    Byte,
    Kilo,
    Mega,
    Giga,
}

impl MemoryUnit {
    /// Case-insensitive unit indicator (`b`, `k`, `m`, `g`).
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'b' => Some(MemoryUnit::Byte),
            'k' => Some(MemoryUnit::Kilo),
            'm' => Some(MemoryUnit::Mega),
            'g' => Some(MemoryUnit::Giga),
            _ => None,
        }
    }

    pub const fn multiplier(self) -> u64 {
        match self {
            MemoryUnit::Byte => 1,
            MemoryUnit::Kilo => KIB,
            MemoryUnit::Mega => MIB,
            MemoryUnit::Giga => GIB,
        }
    }

    pub const fn symbol(self) -> char {
        match self {
            MemoryUnit::Byte => 'B',
            MemoryUnit::Kilo => 'K',
            MemoryUnit::Mega => 'M',
            MemoryUnit::Giga => 'G',
        }
    }
}

/// An exact, non-negative number of bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct MemoryQuantity(u64);

impl MemoryQuantity {
    pub const ZERO: MemoryQuantity = MemoryQuantity(0);

    pub const fn from_bytes(bytes: u64) -> Self {
        MemoryQuantity(bytes)
    }

    pub const fn bytes(self) -> u64 {
        self.0
    }
}

impl TryFrom<i64> for MemoryQuantity {
    type Error = AppError;

    fn try_from(bytes: i64) -> Result<Self, Self::Error> {
        u64::try_from(bytes)
            .map(MemoryQuantity)
            .map_err(|_| AppError::NegativeMemoryLimit(bytes))
    }
}

impl FromStr for MemoryQuantity {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_memory_size(s)
    }
}

/// Parse a size such as `512m`, `2G` or `0` into an exact byte count.
///
/// The last character is the unit and everything before it must be a plain
/// decimal integer. Signs, fractions and whitespace are rejected.
pub fn parse_memory_size(raw: &str) -> Result<MemoryQuantity, AppError> {
    if raw == "0" {
        return Ok(MemoryQuantity::ZERO);
    }

    let mut chars = raw.chars();
    let unit_char = chars
        .next_back()
        .ok_or_else(|| AppError::malformed(raw, "empty value"))?;
    let magnitude = chars.as_str();

    if magnitude.is_empty() {
        return Err(AppError::malformed(raw, "expected <integer><unit>"));
    }
    if !magnitude.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::malformed(
            raw,
            format!("'{}' is not an integer", magnitude),
        ));
    }

    let unit = MemoryUnit::from_char(unit_char).ok_or_else(|| AppError::MalformedMemoryUnit {
        input: raw.to_string(),
        unit: unit_char,
    })?;

    let magnitude: u64 = magnitude
        .parse()
        .map_err(|_| AppError::malformed(raw, "magnitude is out of range"))?;

    magnitude
        .checked_mul(unit.multiplier())
        .map(MemoryQuantity)
        .ok_or_else(|| AppError::malformed(raw, "size exceeds the addressable byte range"))
}

/// Fraction of the memory limit handed to the heap, in `(0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Deserialize)]
#[serde(try_from = "f64")]
pub struct HeapRatio(f64);

impl HeapRatio {
    pub fn new(value: f64) -> Result<Self, AppError> {
        validate_heap_ratio(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for HeapRatio {
    fn default() -> Self {
        HeapRatio(DEFAULT_HEAP_RATIO)
    }
}

impl TryFrom<f64> for HeapRatio {
    type Error = AppError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        validate_heap_ratio(value)
    }
}

impl fmt::Display for HeapRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Accepts ratios greater than 0 and up to and including 1.
pub fn validate_heap_ratio(value: f64) -> Result<HeapRatio, AppError> {
    if !value.is_finite() {
        return Err(AppError::invalid_ratio(value, "not a number"));
    }
    if value > 1.0 {
        return Err(AppError::invalid_ratio(value, "must not exceed 1"));
    }
    if value <= 0.0 {
        return Err(AppError::invalid_ratio(value, "must be greater than 0"));
    }
    Ok(HeapRatio(value))
}

/// Parse a ratio coming from a textual source such as an environment variable.
pub fn parse_heap_ratio(raw: &str) -> Result<f64, AppError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| AppError::invalid_ratio(raw, "not a number"))
}

/// Target heap size in bytes. May be fractional until it is minified.
pub fn calculate_heap_bytes(total: MemoryQuantity, ratio: HeapRatio) -> f64 {
    total.bytes() as f64 * ratio.value()
}

/// A size rendered in the largest unit that represents it, e.g. `384M`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinifiedSize {
    pub magnitude: u64,
    pub unit: MemoryUnit,
}

impl MinifiedSize {
    pub fn bytes(&self) -> u64 {
        self.magnitude.saturating_mul(self.unit.multiplier())
    }
}

impl fmt::Display for MinifiedSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.magnitude, self.unit.symbol())
    }
}

/// Render a byte count as `<n>G` or `<n>M` when it divides exactly,
/// otherwise as kilobytes rounded to the nearest integer.
pub fn minify_memory_size(bytes: f64) -> MinifiedSize {
    for unit in EXACT_UNITS {
        let value = bytes / unit.multiplier() as f64;
        if value.fract() == 0.0 {
            return MinifiedSize {
                magnitude: value as u64,
                unit,
            };
        }
    }

    // Rounded kilobytes are exact by construction.
    MinifiedSize {
        magnitude: (bytes / KIB as f64).round() as u64,
        unit: MemoryUnit::Kilo,
    }
}
