use std::path::{Path, PathBuf};

use futures::StreamExt;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

use crate::error::AppError;

/// Compute the SHA-256 of a file as lowercase hex
pub fn sha256_file(path: &Path) -> Result<String, AppError> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Fail with `ChecksumMismatch` unless the file hashes to `expected`
pub fn verify_checksum(path: &Path, expected: &str) -> Result<(), AppError> {
    let actual = sha256_file(path)?;
    compare_digests(path, expected, &actual)
}

fn compare_digests(path: &Path, expected: &str, actual: &str) -> Result<(), AppError> {
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(AppError::ChecksumMismatch {
            path: path.display().to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

async fn verify_checksum_blocking(path: &Path, expected: &str) -> Result<(), AppError> {
    let path: PathBuf = path.to_path_buf();
    let expected = expected.to_string();
    tokio::task::spawn_blocking(move || verify_checksum(&path, &expected))
        .await
        .map_err(|e| AppError::Download(format!("Checksum task failed: {}", e)))?
}

/// Download `url` to `dest` and verify its SHA-256.
///
/// A file already at `dest` with the right digest is reused. The body is
/// written to a temporary sibling and only renamed into place once verified.
pub async fn download_verified(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    expected_sha256: &str,
) -> Result<(), AppError> {
    if dest.exists() {
        match verify_checksum_blocking(dest, expected_sha256).await {
            Ok(()) => {
                info!("Using cached artifact {}", dest.display());
                return Ok(());
            }
            Err(AppError::ChecksumMismatch { actual, .. }) => {
                warn!(
                    "Cached artifact {} has digest {}, downloading again",
                    dest.display(),
                    actual
                );
            }
            Err(e) => return Err(e),
        }
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await?;
    }

    info!("Downloading {} to {}", url, dest.display());
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(AppError::Download(format!(
            "{} returned HTTP {}",
            url,
            response.status()
        )));
    }

    let temp_path = dest.with_extension("part");
    let mut file = fs::File::create(&temp_path).await?;
    let mut hasher = Sha256::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        hasher.update(&chunk);
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    drop(file);

    let actual = format!("{:x}", hasher.finalize());
    if let Err(e) = compare_digests(dest, expected_sha256, &actual) {
        error!("{}", e);
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }

    fs::rename(&temp_path, dest).await?;
    info!("Downloaded and verified {}", dest.display());
    Ok(())
}
