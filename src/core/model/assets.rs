//! Model asset management - downloading the pretrained snapshot
//!
//! The snapshot is fetched from a ModelScope-compatible registry: the file
//! listing is requested once, then every blob is streamed into the model
//! directory. Files already present with the listed size (and checksum, when
//! the listing has one) are left alone, so re-running `cosyvoice-server init`
//! only fetches what is missing or corrupted.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, error, info, warn};

use super::ModelConfig;

#[derive(Debug, Deserialize)]
struct FileListResponse {
    #[serde(rename = "Code", default)]
    code: Option<i64>,
    #[serde(rename = "Message", default)]
    message: Option<String>,
    #[serde(rename = "Data", default)]
    data: Option<FileListData>,
}

#[derive(Debug, Deserialize)]
struct FileListData {
    #[serde(rename = "Files", default)]
    files: Vec<RepoFile>,
}

/// One entry of a registry file listing
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RepoFile {
    #[serde(rename = "Path")]
    pub path: String,
    /// `blob` for files, `tree` for directories
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Size", default)]
    pub size: u64,
    #[serde(rename = "Sha256", default)]
    pub sha256: Option<String>,
}

impl RepoFile {
    fn is_blob(&self) -> bool {
        self.kind == "blob"
    }
}

/// Outcome of a snapshot download
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub downloaded: usize,
    pub skipped: usize,
    pub bytes: u64,
}

/// Download the model snapshot into `config.model_dir`
pub async fn download_assets(config: &ModelConfig) -> Result<DownloadSummary> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("cosyvoice-server/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    info!(
        "Downloading {} (revision {}) from {} into {:?}",
        config.model_id, config.revision, config.registry_url, config.model_dir
    );

    let files = list_files(&client, config).await?;
    fs::create_dir_all(&config.model_dir)
        .await
        .with_context(|| format!("Failed to create {:?}", config.model_dir))?;

    let mut summary = DownloadSummary::default();

    for file in files.iter().filter(|f| f.is_blob()) {
        let dest = safe_join(&config.model_dir, &file.path)?;

        if is_up_to_date(&dest, file).await? {
            debug!("Already present, skipping: {}", file.path);
            summary.skipped += 1;
            continue;
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }

        info!("Downloading {} ({} bytes)", file.path, file.size);
        let bytes = download_file(&client, config, file, &dest).await?;
        summary.downloaded += 1;
        summary.bytes += bytes;
    }

    info!(
        "Model snapshot ready at {:?}: {} downloaded, {} already present",
        config.model_dir, summary.downloaded, summary.skipped
    );

    Ok(summary)
}

/// Fetch the recursive file listing for the configured model
pub async fn list_files(client: &reqwest::Client, config: &ModelConfig) -> Result<Vec<RepoFile>> {
    let url = format!(
        "{}/api/v1/models/{}/repo/files",
        config.registry_url.trim_end_matches('/'),
        config.model_id
    );

    let response = client
        .get(&url)
        .query(&[("Revision", config.revision.as_str()), ("Recursive", "true")])
        .send()
        .await
        .with_context(|| format!("Failed to list model files from {url}"))?;

    if !response.status().is_success() {
        anyhow::bail!(
            "Failed to list files for {}: HTTP {}",
            config.model_id,
            response.status()
        );
    }

    let listing: FileListResponse = response
        .json()
        .await
        .context("Failed to parse model file listing")?;

    if let Some(code) = listing.code {
        if code != 200 {
            anyhow::bail!(
                "Registry rejected file listing for {} (code {}): {}",
                config.model_id,
                code,
                listing.message.unwrap_or_default()
            );
        }
    }

    let files = listing.data.map(|d| d.files).unwrap_or_default();
    if files.is_empty() {
        anyhow::bail!("Registry returned no files for {}", config.model_id);
    }

    Ok(files)
}

/// A local file is current when its size matches the listing and, if the
/// listing carries a checksum, its SHA-256 does too.
async fn is_up_to_date(dest: &Path, file: &RepoFile) -> Result<bool> {
    let Ok(metadata) = fs::metadata(dest).await else {
        return Ok(false);
    };
    if !metadata.is_file() || metadata.len() != file.size {
        return Ok(false);
    }

    let Some(expected) = file.sha256.as_deref().filter(|s| !s.is_empty()) else {
        return Ok(true);
    };

    let mut input = fs::File::open(dest)
        .await
        .with_context(|| format!("Failed to open {:?}", dest))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = input.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    let actual = format!("{:x}", hasher.finalize());
    if actual.eq_ignore_ascii_case(expected) {
        Ok(true)
    } else {
        warn!("Checksum mismatch for existing {}, downloading again", file.path);
        Ok(false)
    }
}

/// Stream one file to `<dest>.part`, verify it, then move it into place
async fn download_file(
    client: &reqwest::Client,
    config: &ModelConfig,
    file: &RepoFile,
    dest: &Path,
) -> Result<u64> {
    let url = format!(
        "{}/api/v1/models/{}/repo",
        config.registry_url.trim_end_matches('/'),
        config.model_id
    );

    let mut response = client
        .get(&url)
        .query(&[
            ("Revision", config.revision.as_str()),
            ("FilePath", file.path.as_str()),
        ])
        .send()
        .await
        .with_context(|| format!("Failed to download {}", file.path))?;

    if !response.status().is_success() {
        anyhow::bail!("Failed to download {}: HTTP {}", file.path, response.status());
    }

    let mut part_name = dest.as_os_str().to_owned();
    part_name.push(".part");
    let part_path = PathBuf::from(part_name);

    let mut out = fs::File::create(&part_path)
        .await
        .with_context(|| format!("Failed to create {:?}", part_path))?;
    let mut hasher = Sha256::new();
    let mut written = 0u64;

    while let Some(chunk) = response
        .chunk()
        .await
        .with_context(|| format!("Download of {} interrupted", file.path))?
    {
        hasher.update(&chunk);
        out.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    out.flush().await?;
    drop(out);

    if let Some(expected) = file.sha256.as_deref().filter(|s| !s.is_empty()) {
        let actual = format!("{:x}", hasher.finalize());
        if !actual.eq_ignore_ascii_case(expected) {
            error!(
                "Checksum mismatch for {}: expected {}, got {}",
                file.path, expected, actual
            );
            let _ = fs::remove_file(&part_path).await;
            anyhow::bail!("Checksum mismatch for {}", file.path);
        }
    }

    fs::rename(&part_path, dest)
        .await
        .with_context(|| format!("Failed to move {:?} into place", part_path))?;

    Ok(written)
}

/// Join a registry-relative path onto `root`, refusing anything that would
/// escape it.
fn safe_join(root: &Path, relative: &str) -> Result<PathBuf> {
    let relative = Path::new(relative);
    let mut joined = root.to_path_buf();

    for component in relative.components() {
        match component {
            Component::Normal(part) => joined.push(part),
            Component::CurDir => {}
            _ => anyhow::bail!("Refusing unsafe path from registry: {:?}", relative),
        }
    }

    if joined == root {
        anyhow::bail!("Registry returned an empty file path");
    }

    Ok(joined)
}

/// Resolve the model directory without downloading anything.
///
/// Fails when the directory is missing or empty, which is fatal at startup.
pub fn ensure_model_present(config: &ModelConfig) -> Result<PathBuf> {
    let dir = &config.model_dir;

    let has_entries = std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false);

    if has_entries {
        Ok(dir.clone())
    } else {
        error!(
            "Model expected at {:?} but not found. Ensure `cosyvoice-server init` populated it.",
            dir
        );
        anyhow::bail!(
            "Model missing at {:?}. Run `cosyvoice-server init` before starting the server.",
            dir
        );
    }
}
