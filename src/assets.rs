//! Asset downloads.
//!
//! Contentful serves asset URLs protocol-relative (`//images.ctfassets.net/...`).
//! Every URL is normalized to `https:` before it is requested or written
//! into a snapshot.
//!
//! Bodies are streamed chunk by chunk to `<assets_dir>/<file_name>` and the
//! file is flushed and synced before the fetch reports success, so a
//! snapshot never points at a half-written file. A failed download removes
//! whatever it had written.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use crate::error::AssetFetchError;

/// Turn a protocol-relative URL into an absolute `https:` URL.
pub fn normalize_url(url: &str) -> String {
    match url.strip_prefix("//") {
        Some(rest) => format!("https://{}", rest),
        None => url.to_string(),
    }
}

/// Make `name` safe to use as a single path component.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

/// Create the asset and data directories if they are missing.
pub async fn prepare_dirs(assets_dir: &Path, data_dir: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(assets_dir).await?;
    tokio::fs::create_dir_all(data_dir).await
}

/// Downloads one remote asset to a local file.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Fetch `remote_url` into `local_file_name`, returning the written path.
    async fn fetch(&self, remote_url: &str, local_file_name: &str)
        -> Result<PathBuf, AssetFetchError>;
}

/// [`AssetFetcher`] over HTTP(S) with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpAssetFetcher {
    http: reqwest::Client,
    assets_dir: PathBuf,
}

impl HttpAssetFetcher {
    pub fn new(assets_dir: impl Into<PathBuf>, timeout: Duration) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, assets_dir))
    }

    pub fn with_client(http: reqwest::Client, assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            http,
            assets_dir: assets_dir.into(),
        }
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    async fn download(&self, url: &str, path: &Path) -> Result<(), String> {
        let mut response = self.http.get(url).send().await.map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status));
        }

        let mut file = tokio::fs::File::create(path)
            .await
            .map_err(|e| format!("create {}: {}", path.display(), e))?;

        while let Some(chunk) = response.chunk().await.map_err(|e| e.to_string())? {
            file.write_all(&chunk)
                .await
                .map_err(|e| format!("write {}: {}", path.display(), e))?;
        }

        file.flush()
            .await
            .map_err(|e| format!("flush {}: {}", path.display(), e))?;
        file.sync_all()
            .await
            .map_err(|e| format!("sync {}: {}", path.display(), e))?;
        Ok(())
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch(
        &self,
        remote_url: &str,
        local_file_name: &str,
    ) -> Result<PathBuf, AssetFetchError> {
        let url = normalize_url(remote_url);
        let file_name = sanitize_file_name(local_file_name);
        let path = self.assets_dir.join(&file_name);

        match self.download(&url, &path).await {
            Ok(()) => Ok(path),
            Err(reason) => {
                let _ = tokio::fs::remove_file(&path).await;
                Err(AssetFetchError {
                    url,
                    file_name,
                    reason,
                })
            }
        }
    }
}
