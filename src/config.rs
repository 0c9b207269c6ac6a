use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::error::AppError;
use crate::services::heap_options::MemoryLimit;
use crate::utils::memory::{parse_heap_ratio, DEFAULT_HEAP_RATIO};

/// How the downloaded artifact turns into a JRE on disk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallerKind {
    /// Self-extracting installer run with a silent response file
    #[default]
    Binary,
    /// Plain `.tar.gz` archive
    Archive,
}

impl InstallerKind {
    fn from_name(name: &str) -> Result<Self, AppError> {
        match name.to_ascii_lowercase().as_str() {
            "binary" => Ok(InstallerKind::Binary),
            "archive" => Ok(InstallerKind::Archive),
            other => Err(AppError::Config(format!(
                "Unknown installer kind '{}' (expected binary or archive)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InstallerConfig {
    pub url: String,
    pub sha256: String,
    #[serde(default)]
    pub kind: InstallerKind,
}

/// Optional JSON config file (`jre.json`)
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JreConfig {
    pub memory_limit: Option<MemoryLimit>,
    pub heap_ratio: Option<f64>,
    pub extra_opts: Option<String>,
    pub installer: Option<InstallerConfig>,
}

impl JreConfig {
    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            AppError::Config(format!("Invalid config file {}: {}", path.display(), e))
        })
    }
}

/// Settings loaded from environment variables, completed by the config file
#[derive(Debug, Clone)]
pub struct Settings {
    pub memory_limit: Option<MemoryLimit>,
    pub heap_ratio: Option<String>,
    pub extra_opts: Option<String>,
    pub tmp_dir: String,
    pub install_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub profile_script: PathBuf,
    pub installer: Option<InstallerConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            memory_limit: None,
            heap_ratio: None,
            extra_opts: None,
            tmp_dir: "/tmp".into(),
            install_dir: PathBuf::from("./.jre"),
            cache_dir: PathBuf::from("./.jre-cache"),
            profile_script: PathBuf::from("./.profile.d/jre.sh"),
            installer: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Settings::default();

        let installer = match (
            std::env::var("JRE_INSTALLER_URL").ok(),
            std::env::var("JRE_INSTALLER_SHA256").ok(),
        ) {
            (Some(url), Some(sha256)) => Some(InstallerConfig {
                url,
                sha256,
                kind: std::env::var("JRE_INSTALLER_KIND")
                    .ok()
                    .map(|k| InstallerKind::from_name(&k))
                    .transpose()?
                    .unwrap_or_default(),
            }),
            (Some(_), None) => {
                return Err(AppError::Config(
                    "JRE_INSTALLER_URL is set but JRE_INSTALLER_SHA256 is missing".into(),
                ))
            }
            _ => None,
        };

        Ok(Self {
            memory_limit: std::env::var("MEMORY_LIMIT").ok().map(MemoryLimit::from),
            heap_ratio: std::env::var("JRE_HEAP_RATIO").ok(),
            extra_opts: std::env::var("JRE_EXTRA_OPTS").ok(),
            tmp_dir: std::env::var("TMPDIR").unwrap_or(defaults.tmp_dir),
            install_dir: std::env::var("JRE_INSTALL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.install_dir),
            cache_dir: std::env::var("JRE_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            profile_script: std::env::var("JRE_PROFILE_SCRIPT")
                .map(PathBuf::from)
                .unwrap_or(defaults.profile_script),
            installer,
        })
    }

    /// Environment first, then the config file at `config_path` if it exists.
    pub fn load(config_path: Option<&Path>) -> Result<Self, AppError> {
        let mut settings = Self::from_env()?;

        let path = config_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("JRE_CONFIG").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("jre.json"));

        if path.exists() {
            info!("Loading config file {}", path.display());
            settings.merge(JreConfig::from_file(&path)?);
        } else if config_path.is_some() {
            return Err(AppError::Config(format!(
                "Config file {} not found",
                path.display()
            )));
        }

        Ok(settings)
    }

    /// Fill unset values from the config file. Environment values win.
    pub fn merge(&mut self, file: JreConfig) {
        if self.memory_limit.is_none() {
            self.memory_limit = file.memory_limit;
        }
        if self.heap_ratio.is_none() {
            self.heap_ratio = file.heap_ratio.map(|r| r.to_string());
        }
        if self.extra_opts.is_none() {
            self.extra_opts = file.extra_opts;
        }
        if self.installer.is_none() {
            self.installer = file.installer;
        }
    }

    /// Configured heap ratio, not yet range-checked.
    pub fn heap_ratio(&self) -> Result<f64, AppError> {
        match &self.heap_ratio {
            Some(raw) => parse_heap_ratio(raw),
            None => Ok(DEFAULT_HEAP_RATIO),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn heap_ratio_defaults_to_three_quarters() {
        let settings = Settings::default();
        assert_eq!(settings.heap_ratio().unwrap(), 0.75);
    }

    #[test]
    fn non_numeric_heap_ratio_is_rejected() {
        let settings = Settings {
            heap_ratio: Some("lots".into()),
            ..Settings::default()
        };
        assert!(matches!(
            settings.heap_ratio(),
            Err(AppError::InvalidRatio { .. })
        ));
    }

    #[test]
    fn environment_wins_over_config_file() {
        let mut settings = Settings {
            memory_limit: Some(MemoryLimit::from("1g")),
            ..Settings::default()
        };
        settings.merge(JreConfig {
            memory_limit: Some(MemoryLimit::from("4g")),
            heap_ratio: Some(0.5),
            extra_opts: Some("-XX:+UseG1GC".into()),
            installer: None,
        });

        assert_eq!(settings.memory_limit, Some(MemoryLimit::from("1g")));
        assert_eq!(settings.heap_ratio().unwrap(), 0.5);
        assert_eq!(settings.extra_opts.as_deref(), Some("-XX:+UseG1GC"));
    }

    #[test]
    fn config_file_is_parsed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "memoryLimit": 536870912,
                "heapRatio": 0.6,
                "installer": {{ "url": "https://example.com/jre.tar.gz", "sha256": "abc", "kind": "archive" }}
            }}"#
        )
        .unwrap();

        let config = JreConfig::from_file(file.path()).unwrap();
        assert_eq!(config.memory_limit, Some(MemoryLimit::Bytes(536_870_912)));
        assert_eq!(config.heap_ratio, Some(0.6));
        let installer = config.installer.unwrap();
        assert_eq!(installer.kind, InstallerKind::Archive);
        assert_eq!(installer.url, "https://example.com/jre.tar.gz");
    }

    #[test]
    fn config_file_rejects_unknown_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "heapRatoi": 0.6 }}"#).unwrap();
        assert!(matches!(
            JreConfig::from_file(file.path()),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn installer_kind_defaults_to_binary() {
        let installer: InstallerConfig =
            serde_json::from_str(r#"{ "url": "https://example.com/ibm-jre.bin", "sha256": "abc" }"#)
                .unwrap();
        assert_eq!(installer.kind, InstallerKind::Binary);
        assert!(InstallerKind::from_name("ARCHIVE").is_ok());
        assert!(InstallerKind::from_name("rpm").is_err());
    }
}
