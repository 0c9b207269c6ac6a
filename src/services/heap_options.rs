use std::fmt;

use serde::Deserialize;
use tracing::debug;

use crate::error::AppError;
use crate::utils::memory::{
    calculate_heap_bytes, minify_memory_size, parse_memory_size, validate_heap_ratio,
    MemoryQuantity,
};

/// Container memory limit as supplied by the environment or the config file.
///
/// Strings go through the size parser; integers are taken as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum MemoryLimit {
    Bytes(i64),
    Size(String),
}

impl MemoryLimit {
    pub fn to_quantity(&self) -> Result<MemoryQuantity, AppError> {
        match self {
            MemoryLimit::Size(raw) => parse_memory_size(raw),
            MemoryLimit::Bytes(bytes) => MemoryQuantity::try_from(*bytes),
        }
    }
}

impl From<&str> for MemoryLimit {
    fn from(raw: &str) -> Self {
        MemoryLimit::Size(raw.to_string())
    }
}

impl From<String> for MemoryLimit {
    fn from(raw: String) -> Self {
        MemoryLimit::Size(raw)
    }
}

impl fmt::Display for MemoryLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryLimit::Size(raw) => write!(f, "{}", raw),
            MemoryLimit::Bytes(bytes) => write!(f, "{} bytes", bytes),
        }
    }
}

/// Build the `-Xmx` option for a memory limit and heap ratio.
///
/// Returns an empty list when no limit is known so the JVM keeps its own
/// default heap sizing.
pub fn build_heap_options(
    memory_limit: Option<&MemoryLimit>,
    ratio: f64,
) -> Result<Vec<String>, AppError> {
    let Some(limit) = memory_limit else {
        debug!("No memory limit set, leaving heap size to the JVM");
        return Ok(Vec::new());
    };

    let total = limit.to_quantity()?;
    let ratio = validate_heap_ratio(ratio)?;
    let heap = minify_memory_size(calculate_heap_bytes(total, ratio));

    debug!(
        "Heap for memory limit {} ({} bytes) at ratio {}: {}",
        limit,
        total.bytes(),
        ratio,
        heap
    );

    Ok(vec![format!("-Xmx{}", heap)])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heap(limit: &str, ratio: f64) -> Result<Vec<String>, AppError> {
        build_heap_options(Some(&MemoryLimit::from(limit)), ratio)
    }

    #[test]
    fn three_quarters_of_512m() {
        assert_eq!(heap("512m", 0.75).unwrap(), vec!["-Xmx384M"]);
    }

    #[test]
    fn half_of_1g_is_megabytes() {
        assert_eq!(heap("1g", 0.5).unwrap(), vec!["-Xmx512M"]);
    }

    #[test]
    fn full_ratio_keeps_gigabytes() {
        assert_eq!(heap("2G", 1.0).unwrap(), vec!["-Xmx2G"]);
    }

    #[test]
    fn zero_limit_yields_zero_gigabytes() {
        assert_eq!(heap("0", 0.75).unwrap(), vec!["-Xmx0G"]);
    }

    #[test]
    fn uneven_limit_falls_back_to_kilobytes() {
        assert_eq!(heap("1001m", 0.75).unwrap(), vec!["-Xmx768768K"]);
        assert_eq!(heap("1025k", 0.5).unwrap(), vec!["-Xmx513K"]);
    }

    #[test]
    fn absent_limit_yields_no_option() {
        assert!(build_heap_options(None, 0.75).unwrap().is_empty());
    }

    #[test]
    fn malformed_limits_are_errors() {
        assert!(matches!(
            heap("-5m", 0.75),
            Err(AppError::MalformedMemoryString { .. })
        ));
        assert!(matches!(
            heap("5x", 0.75),
            Err(AppError::MalformedMemoryUnit { .. })
        ));
    }

    #[test]
    fn invalid_ratio_is_an_error() {
        assert!(matches!(
            heap("512m", 1.5),
            Err(AppError::InvalidRatio { .. })
        ));
        assert!(matches!(heap("512m", 0.0), Err(AppError::InvalidRatio { .. })));
    }

    #[test]
    fn byte_limits_are_supported() {
        let limit = MemoryLimit::Bytes(1024 * 1024 * 1024);
        assert_eq!(
            build_heap_options(Some(&limit), 0.5).unwrap(),
            vec!["-Xmx512M"]
        );
        assert!(matches!(
            build_heap_options(Some(&MemoryLimit::Bytes(-512)), 0.5),
            Err(AppError::NegativeMemoryLimit(-512))
        ));
    }

    #[test]
    fn limit_deserializes_from_string_or_number() {
        let size: MemoryLimit = serde_json::from_str("\"512m\"").unwrap();
        assert_eq!(size, MemoryLimit::Size("512m".into()));
        let bytes: MemoryLimit = serde_json::from_str("1048576").unwrap();
        assert_eq!(bytes, MemoryLimit::Bytes(1_048_576));
    }
}
