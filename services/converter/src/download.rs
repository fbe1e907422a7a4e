//! Fetching raw NOMAD record archives into the input folder.
//!
//! A source is either a local file or an http(s) URL. Remote files are
//! streamed into a temporary directory first. Zip archives are extracted
//! into the target folder; anything else is copied as-is.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use futures::StreamExt;
use reqwest::{Client, Url};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

/// Where the data comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Local(PathBuf),
    Remote(Url),
}

impl Source {
    /// Classify `name`. Local files must exist.
    pub fn parse(name: &str) -> Result<Self> {
        if name.contains("://") {
            let url = Url::parse(name).with_context(|| format!("Invalid URL {}", name))?;
            return Ok(Source::Remote(url));
        }
        let path = PathBuf::from(name);
        if !path.is_file() {
            bail!("Couldn't find {}", path.display());
        }
        Ok(Source::Local(path))
    }

    /// File name of the source, from the URL path for remote files.
    pub fn file_name(&self) -> String {
        let name = match self {
            Source::Local(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned()),
            Source::Remote(url) => url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        };
        name.unwrap_or_else(|| "download".to_string())
    }

    pub fn is_zip(&self) -> bool {
        self.file_name().to_lowercase().ends_with(".zip")
    }
}

/// Whether `dir` holds no entries. A missing folder counts as empty.
async fn is_empty_dir(dir: &Path) -> Result<bool> {
    if !dir.exists() {
        return Ok(true);
    }
    let mut entries = fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to list {}", dir.display()))?;
    Ok(entries.next_entry().await?.is_none())
}

/// Stream `url` into `dest`.
#[instrument(skip(client), fields(url = %url))]
async fn fetch(client: &Client, url: &Url, dest: &Path) -> Result<u64> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .context("Request failed")?
        .error_for_status()
        .context("Server returned an error status")?;

    let mut file = fs::File::create(dest)
        .await
        .with_context(|| format!("Failed to create {}", dest.display()))?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("Download interrupted")?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    debug!(bytes = written, path = %dest.display(), "Fetched remote file");
    Ok(written)
}

/// Extract every entry of a zip archive under `output`.
async fn extract_zip(archive: &Path, output: &Path) -> Result<()> {
    let archive = archive.to_path_buf();
    let output = output.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let file = std::fs::File::open(&archive)
            .with_context(|| format!("Failed to open {}", archive.display()))?;
        let mut zip = zip::ZipArchive::new(file)
            .map_err(|e| anyhow!("Failed to open zip archive {}: {}", archive.display(), e))?;
        info!(entries = zip.len(), archive = %archive.display(), "Extracting archive");
        zip.extract(&output)
            .map_err(|e| anyhow!("Failed to extract {}: {}", archive.display(), e))?;
        Ok(())
    })
    .await?
}

/// Download `name` (local path or URL) into `output`, which must be empty.
pub async fn download_from_file(name: &str, output: &Path) -> Result<()> {
    let source = Source::parse(name)?;

    if !is_empty_dir(output).await? {
        bail!("The input folder {} is not empty!", output.display());
    }
    fs::create_dir_all(output)
        .await
        .with_context(|| format!("Failed to create {}", output.display()))?;

    // The staging directory lives until the data is in place
    let (local, _staging) = match &source {
        Source::Local(path) => (path.clone(), None),
        Source::Remote(url) => {
            let dir = tempfile::tempdir().context("Failed to create a temporary directory")?;
            let dest = dir.path().join(source.file_name());
            let client = Client::builder()
                .timeout(Duration::from_secs(600))
                .connect_timeout(Duration::from_secs(30))
                .build()
                .context("Failed to create HTTP client")?;
            fetch(&client, url, &dest).await?;
            (dest, Some(dir))
        }
    };

    if source.is_zip() {
        extract_zip(&local, output).await?;
    } else {
        let dest = output.join(source.file_name());
        fs::copy(&local, &dest)
            .await
            .with_context(|| format!("Failed to copy {} to {}", local.display(), dest.display()))?;
    }

    info!(source = %name, output = %output.display(), "Download finished");
    Ok(())
}
