use crate::error::{InstallerError, Result};
use crate::types::{OctoSettings, ReleaseChannel};
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tempfile::TempPath;

pub const ARCHIVE_PREFIX: &str = "octo_skeleton_";
pub const ARCHIVE_SUFFIX: &str = ".zip";

/// A downloaded archive living next to the user's working directory.
///
/// The file is deleted when this value is dropped, so every early return
/// between the download and the explicit [`TempArchive::cleanup`] still
/// removes it.
#[derive(Debug)]
pub struct TempArchive {
    path: TempPath,
}

impl TempArchive {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the archive. Failures are logged and otherwise ignored.
    pub fn cleanup(self) {
        let path = self.path.display().to_string();
        match self.path.close() {
            Ok(()) => tracing::debug!("Removed temporary archive {}", path),
            Err(e) => tracing::debug!("Could not remove temporary archive {}: {}", path, e),
        }
    }
}

pub fn http_client(settings: &OctoSettings) -> Result<reqwest::Client> {
    let mut builder =
        reqwest::Client::builder().user_agent(concat!("octo/", env!("CARGO_PKG_VERSION")));

    // 0 disables the timeout
    if settings.http_timeout_secs > 0 {
        builder = builder.timeout(Duration::from_secs(settings.http_timeout_secs));
    }

    builder.build().map_err(InstallerError::HttpClient)
}

/// Turn a release channel into the URL of the archive to download.
///
/// The stable channel never touches the network. The dev channel reads a
/// small pointer file whose body is the real archive URL.
pub async fn resolve_url(
    client: &reqwest::Client,
    channel: ReleaseChannel,
    settings: &OctoSettings,
) -> Result<String> {
    match channel {
        ReleaseChannel::Stable => Ok(settings.stable_url.clone()),
        ReleaseChannel::Dev => {
            let pointer = &settings.dev_pointer_url;
            tracing::debug!("Reading dev release pointer from {}", pointer);

            let body = get(client, pointer)
                .await?
                .text()
                .await
                .map_err(|e| InstallerError::network(pointer, e))?;

            let url = body.trim();
            if reqwest::Url::parse(url).is_err() {
                return Err(InstallerError::InvalidPointer {
                    url: pointer.clone(),
                    body: url.chars().take(200).collect(),
                });
            }

            tracing::debug!("Dev release pointer resolved to {}", url);
            Ok(url.to_string())
        }
    }
}

/// Download `url` into a uniquely named zip file inside `dir`.
pub async fn download_archive(
    client: &reqwest::Client,
    url: &str,
    dir: &Path,
) -> Result<TempArchive> {
    tracing::info!("Downloading {}...", url);

    let response = get(client, url).await?;
    let total_size = response.content_length().unwrap_or(0);

    let (mut file, path) = tempfile::Builder::new()
        .prefix(ARCHIVE_PREFIX)
        .suffix(ARCHIVE_SUFFIX)
        .tempfile_in(dir)
        .map_err(|e| InstallerError::io(dir, e))?
        .into_parts();
    let archive = TempArchive { path };

    let pb = if total_size > 0 {
        let pb = ProgressBar::new(total_size);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg} {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    } else {
        ProgressBar::new_spinner()
    };
    pb.set_message("Downloading skeleton");

    let mut downloaded = 0u64;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                pb.abandon();
                return Err(InstallerError::network(url, e));
            }
        };
        file.write_all(&chunk)
            .map_err(|e| InstallerError::io(archive.path(), e))?;
        downloaded += chunk.len() as u64;
        pb.set_position(downloaded);
    }

    file.sync_all()
        .map_err(|e| InstallerError::io(archive.path(), e))?;

    pb.finish_and_clear();
    tracing::info!(
        "Downloaded {} bytes to {}",
        downloaded,
        archive.path().display()
    );
    Ok(archive)
}

async fn get(client: &reqwest::Client, url: &str) -> Result<reqwest::Response> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| InstallerError::network(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(InstallerError::HttpStatus {
            url: url.to_string(),
            status,
        });
    }

    Ok(response)
}
