use anyhow::{anyhow, Context, Result};
use boardkit_core::DownloadResource;
use boardkit_security::verify_sha256_file;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::error::InstallError;
use crate::fs_utils::remove_file_if_exists;
use crate::layout::PrefixLayout;
use crate::progress::{DownloadProgress, ProgressSender};
use crate::types::InstallPhase;

const CHUNK_SIZE: usize = 64 * 1024;

/// Places release archives in the local artifact cache.
pub trait Downloader {
    /// Ensures the archive for `resource` is cached and valid, returning its
    /// path. `label` names the artifact in progress events.
    fn ensure_local(
        &self,
        resource: &DownloadResource,
        label: &str,
        progress: &ProgressSender,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, InstallError>;
}

pub struct DownloadManager {
    layout: PrefixLayout,
    client: reqwest::blocking::Client,
}

enum FetchOutcome {
    Completed { bytes: u64 },
    Cancelled,
}

impl DownloadManager {
    pub fn new(layout: PrefixLayout) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("boardkit/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { layout, client })
    }

    fn open_source(&self, url: &str) -> Result<(Box<dyn Read>, Option<u64>)> {
        if let Some(path) = local_source_path(url) {
            let file = fs::File::open(&path)
                .with_context(|| format!("failed to open local artifact: {}", path.display()))?;
            let len = file.metadata().ok().map(|metadata| metadata.len());
            return Ok((Box::new(file), len));
        }

        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("failed to request {url}"))?
            .error_for_status()
            .with_context(|| format!("server rejected request for {url}"))?;
        let total = response.content_length();
        Ok((Box::new(response), total))
    }

    fn fetch(
        &self,
        resource: &DownloadResource,
        label: &str,
        part_path: &Path,
        progress: &ProgressSender,
        cancel: &CancellationToken,
    ) -> Result<FetchOutcome> {
        let (mut reader, content_length) = self.open_source(&resource.url)?;
        let total = content_length.or(resource.size);

        let mut out = fs::File::create(part_path)
            .with_context(|| format!("failed to create {}", part_path.display()))?;
        let mut buffer = vec![0_u8; CHUNK_SIZE];
        let mut downloaded = 0_u64;
        progress.download(DownloadProgress {
            artifact: label.to_string(),
            downloaded,
            total,
            completed: false,
        });

        loop {
            if cancel.is_cancelled() {
                return Ok(FetchOutcome::Cancelled);
            }
            let read = reader
                .read(&mut buffer)
                .with_context(|| format!("failed reading {}", resource.url))?;
            if read == 0 {
                break;
            }
            out.write_all(&buffer[..read])
                .with_context(|| format!("failed writing {}", part_path.display()))?;
            downloaded += read as u64;
            progress.download(DownloadProgress {
                artifact: label.to_string(),
                downloaded,
                total,
                completed: false,
            });
        }
        out.flush()
            .with_context(|| format!("failed to flush {}", part_path.display()))?;

        Ok(FetchOutcome::Completed { bytes: downloaded })
    }
}

impl Downloader for DownloadManager {
    fn ensure_local(
        &self,
        resource: &DownloadResource,
        label: &str,
        progress: &ProgressSender,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, InstallError> {
        let download_error = |source: anyhow::Error| InstallError::Download {
            artifact: label.to_string(),
            source,
        };

        validate_archive_file_name(&resource.archive_file_name).map_err(download_error)?;
        let expected = resource.sha256_hex().map_err(download_error)?;
        let cache_path = self
            .layout
            .artifact_cache_path(expected, &resource.archive_file_name);

        if cache_path.exists() {
            if verify_sha256_file(&cache_path, expected).map_err(download_error)? {
                debug!(artifact = label, path = %cache_path.display(), "artifact already cached");
                progress.download(finished(label, &cache_path));
                return Ok(cache_path);
            }
            warn!(
                artifact = label,
                path = %cache_path.display(),
                "cached artifact failed checksum verification; downloading again"
            );
            remove_file_if_exists(&cache_path)
                .with_context(|| format!("failed to remove {}", cache_path.display()))
                .map_err(download_error)?;
        }

        if let Some(cache_dir) = cache_path.parent() {
            fs::create_dir_all(cache_dir)
                .with_context(|| format!("failed to create {}", cache_dir.display()))
                .map_err(download_error)?;
        }

        let part_path = cache_path.with_file_name(format!("{}.part", resource.archive_file_name));
        info!(artifact = label, url = %resource.url, "downloading");
        let outcome = self
            .fetch(resource, label, &part_path, progress, cancel)
            .and_then(|outcome| {
                if let FetchOutcome::Completed { .. } = outcome {
                    if !verify_sha256_file(&part_path, expected)? {
                        return Err(anyhow!(
                            "checksum mismatch for {}: expected sha256 {expected}",
                            resource.archive_file_name
                        ));
                    }
                }
                Ok(outcome)
            });

        match outcome {
            Ok(FetchOutcome::Completed { bytes }) => {
                fs::rename(&part_path, &cache_path)
                    .with_context(|| {
                        format!(
                            "failed to move {} to {}",
                            part_path.display(),
                            cache_path.display()
                        )
                    })
                    .map_err(|err| {
                        let _ = remove_file_if_exists(&part_path);
                        download_error(err)
                    })?;
                debug!(artifact = label, bytes, "download complete");
                progress.download(finished(label, &cache_path));
                Ok(cache_path)
            }
            Ok(FetchOutcome::Cancelled) => {
                let _ = remove_file_if_exists(&part_path);
                Err(InstallError::Cancelled {
                    phase: InstallPhase::Downloading,
                })
            }
            Err(err) => {
                let _ = remove_file_if_exists(&part_path);
                Err(download_error(err))
            }
        }
    }
}

fn finished(label: &str, path: &Path) -> DownloadProgress {
    let size = fs::metadata(path).ok().map(|metadata| metadata.len());
    DownloadProgress {
        artifact: label.to_string(),
        downloaded: size.unwrap_or_default(),
        total: size,
        completed: true,
    }
}

/// Resolves `file://` URLs and plain filesystem paths.
fn local_source_path(url: &str) -> Option<PathBuf> {
    if let Some(rest) = url.strip_prefix("file://") {
        return Some(PathBuf::from(rest));
    }
    if url.contains("://") {
        return None;
    }
    Some(PathBuf::from(url))
}

fn validate_archive_file_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
    {
        return Err(anyhow!("invalid archive file name '{name}'"));
    }
    Ok(())
}
