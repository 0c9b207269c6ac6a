use std::path::{Path, PathBuf};
use std::time::Duration;

use flate2::read::GzDecoder;
use tar::Archive;
use tokio::fs;
use tokio::process::Command;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::{InstallerKind, Settings};
use crate::error::AppError;
use crate::services::downloader::download_verified;
use crate::services::java_opts::{java_options, render};
use crate::templates;

const RESPONSE_FILE_NAME: &str = "response.properties";
const DEFAULT_ARTIFACT_NAME: &str = "jre-installer";

/// An installed JRE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    pub java_home: PathBuf,
}

impl Installation {
    pub fn java_bin(&self) -> PathBuf {
        let name = if cfg!(windows) { "java.exe" } else { "java" };
        self.java_home.join("bin").join(name)
    }
}

/// Result of a full provisioning run
#[derive(Debug, Clone)]
pub struct Provisioned {
    pub installation: Installation,
    pub java_opts: Vec<String>,
    pub profile_script: PathBuf,
}

/// Download, verify and install the configured JRE, then write the profile
/// script exporting `JAVA_HOME` and `JAVA_OPTS`.
pub async fn provision(settings: &Settings) -> Result<Provisioned, AppError> {
    let installer = settings.installer.as_ref().ok_or_else(|| {
        AppError::Config(
            "No installer configured: set JRE_INSTALLER_URL and JRE_INSTALLER_SHA256 \
             or the installer section of the config file"
                .into(),
        )
    })?;

    // Fail on bad memory or ratio settings before downloading anything.
    let java_opts = java_options(settings)?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(300))
        .build()?;
    let artifact = settings.cache_dir.join(artifact_file_name(&installer.url));
    download_verified(&client, &installer.url, &artifact, &installer.sha256).await?;

    let installation = install(&artifact, &settings.install_dir, installer.kind).await?;

    write_profile_script(&settings.profile_script, &installation, &java_opts).await?;

    Ok(Provisioned {
        installation,
        java_opts,
        profile_script: settings.profile_script.clone(),
    })
}

/// Install a verified artifact into `install_dir` and locate its `JAVA_HOME`
pub async fn install(
    artifact: &Path,
    install_dir: &Path,
    kind: InstallerKind,
) -> Result<Installation, AppError> {
    fs::create_dir_all(install_dir).await?;
    let install_dir = fs::canonicalize(install_dir).await?;

    match kind {
        InstallerKind::Binary => run_installer(artifact, &install_dir).await?,
        InstallerKind::Archive => extract_archive(artifact, &install_dir).await?,
    }

    let installation = locate_java_home(&install_dir)?;
    info!("JRE installed at {}", installation.java_home.display());
    Ok(installation)
}

/// Run a self-extracting installer silently with a generated response file
pub async fn run_installer(artifact: &Path, install_dir: &Path) -> Result<(), AppError> {
    make_executable(artifact).await?;

    let response_path = artifact.with_file_name(RESPONSE_FILE_NAME);
    fs::write(&response_path, templates::generate_response_file(install_dir)).await?;

    info!("Running installer {}", artifact.display());
    let output = Command::new(artifact)
        .arg("-i")
        .arg("silent")
        .arg("-f")
        .arg(&response_path)
        .output()
        .await
        .map_err(|e| {
            AppError::Install(format!(
                "Failed to start installer {}: {}",
                artifact.display(),
                e
            ))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AppError::Install(format!(
            "Installer exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(())
}

/// Unpack a `.tar.gz` JRE archive
pub async fn extract_archive(artifact: &Path, install_dir: &Path) -> Result<(), AppError> {
    let artifact = artifact.to_path_buf();
    let dest = install_dir.to_path_buf();

    info!("Extracting {} into {}", artifact.display(), dest.display());
    tokio::task::spawn_blocking(move || -> Result<(), AppError> {
        let tar_gz = std::fs::File::open(&artifact)?;
        let mut archive = Archive::new(GzDecoder::new(tar_gz));
        archive.unpack(&dest).map_err(|e| {
            AppError::Install(format!("Failed to extract {}: {}", artifact.display(), e))
        })
    })
    .await
    .map_err(|e| AppError::Install(format!("Extraction task failed: {}", e)))?
}

/// Find the directory holding `bin/java` under the install dir
pub fn locate_java_home(install_dir: &Path) -> Result<Installation, AppError> {
    for entry in WalkDir::new(install_dir)
        .max_depth(4)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.file_name() != "java" && entry.file_name() != "java.exe" {
            continue;
        }
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(bin_dir) = entry.path().parent() else {
            continue;
        };
        if bin_dir.file_name().map(|n| n == "bin").unwrap_or(false) {
            if let Some(java_home) = bin_dir.parent() {
                return Ok(Installation {
                    java_home: java_home.to_path_buf(),
                });
            }
        }
    }

    Err(AppError::Install(format!(
        "No bin/java found under {}",
        install_dir.display()
    )))
}

async fn write_profile_script(
    path: &Path,
    installation: &Installation,
    java_opts: &[String],
) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let script = templates::generate_profile_script(&installation.java_home, &render(java_opts));
    fs::write(path, script).await?;
    info!("Wrote profile script {}", path.display());
    Ok(())
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> Result<(), AppError> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path).await?.permissions();
    perms.set_mode(perms.mode() | 0o755);
    fs::set_permissions(path, perms).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn make_executable(path: &Path) -> Result<(), AppError> {
    if !path.exists() {
        warn!("Installer {} does not exist", path.display());
    }
    Ok(())
}

/// Last path segment of the artifact URL, used as the cache file name
fn artifact_file_name(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| {
            warn!("Cannot derive a file name from {}, using {}", url, DEFAULT_ARTIFACT_NAME);
            DEFAULT_ARTIFACT_NAME.to_string()
        })
}
