//! Content access for the storefront: snapshot first, live API second.
//!
//! [`ContentAccess::home_page_with_products`] serves the home page from
//! the exported `data.json` when it can be read, re-attaching the product
//! list under `fields.products`. When the snapshot is missing or corrupt it
//! falls back to a live Contentful fetch and returns the home entry with its
//! links inlined, so both paths expose `fields.products`. The read path
//! never writes.

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Config;
use crate::contentful::{ContentSource, ContentfulClient};
use crate::error::{RemoteFetchError, SnapshotReadError};
use crate::models::{EntityGraph, HomePageView, Snapshot};

/// Home page as returned to the storefront.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HomePage {
    /// Built from the local snapshot.
    Snapshot(HomePageView),
    /// Home entry from the live API, links resolved from `includes`.
    Live(Value),
}

impl HomePage {
    pub fn is_snapshot(&self) -> bool {
        matches!(self, HomePage::Snapshot(_))
    }
}

/// Read and parse a snapshot file.
pub async fn load_snapshot(path: &Path) -> Result<Snapshot, SnapshotReadError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SnapshotReadError::Missing {
                path: path.to_path_buf(),
            })
        }
        Err(source) => {
            return Err(SnapshotReadError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_slice(&bytes).map_err(|source| SnapshotReadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Snapshot-first content facade.
#[derive(Clone)]
pub struct ContentAccess {
    source: Arc<dyn ContentSource>,
    snapshot_path: PathBuf,
    home_page_id: String,
    include_depth: u8,
}

impl ContentAccess {
    pub fn new(
        source: Arc<dyn ContentSource>,
        snapshot_path: impl Into<PathBuf>,
        home_page_id: impl Into<String>,
        include_depth: u8,
    ) -> Self {
        Self {
            source,
            snapshot_path: snapshot_path.into(),
            home_page_id: home_page_id.into(),
            include_depth,
        }
    }

    pub fn from_config(config: &Config, source: Arc<dyn ContentSource>) -> Self {
        Self::new(
            source,
            config.snapshot_path(),
            config.contentful.home_page_id.clone(),
            config.content.include_depth,
        )
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// The home page with its products.
    ///
    /// Fails only if the snapshot is unusable *and* the live fetch fails.
    pub async fn home_page_with_products(&self) -> Result<HomePage, RemoteFetchError> {
        match load_snapshot(&self.snapshot_path).await {
            Ok(snapshot) => {
                debug!(
                    path = %self.snapshot_path.display(),
                    products = snapshot.products.len(),
                    "serving home page from snapshot"
                );
                return Ok(HomePage::Snapshot(snapshot.into_home_page()));
            }
            Err(err) => info!(%err, "local snapshot unavailable, fetching from Contentful"),
        }

        let response = self
            .source
            .fetch_entry(&self.home_page_id, self.include_depth)
            .await?;
        let entry = EntityGraph::from_response(&response)
            .resolve(&self.home_page_id, self.include_depth)
            .ok_or_else(|| RemoteFetchError::NotFound {
                id: self.home_page_id.clone(),
            })?;
        Ok(HomePage::Live(entry))
    }
}

/// CLI entry point for `storefront home`: prints the home page JSON.
pub async fn run_home(config: &Config) -> Result<()> {
    let client = ContentfulClient::new(&config.contentful)?;
    let access = ContentAccess::from_config(config, Arc::new(client));

    let page = access.home_page_with_products().await?;
    eprintln!(
        "Home page served from {}",
        if page.is_snapshot() {
            "snapshot"
        } else {
            "Contentful"
        }
    );
    println!("{}", serde_json::to_string_pretty(&page)?);
    Ok(())
}
